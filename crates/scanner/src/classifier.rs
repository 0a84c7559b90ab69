//! Rule-based role assignment.
//!
//! Rules are evaluated in [`ROLE_RULES`] order and the first match wins, so a file under
//! `tests/` stays `Test` even when its content also declares routes.

use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use recon_protocol::paths::{dir_segments, file_name};
use recon_protocol::{Language, Role};
use regex::Regex;

/// What the classifier sees of one file.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    pub path: &'a str,
    pub language: Language,
    /// `None` for binary or unreadable files.
    pub content: Option<&'a str>,
}

impl<'a> ClassifyInput<'a> {
    pub fn new(path: &'a str, language: Language, content: Option<&'a str>) -> Self {
        Self {
            path,
            language,
            content,
        }
    }

    fn file_name(&self) -> &'a str {
        file_name(self.path)
    }

    fn has_segment(&self, names: &[&str]) -> bool {
        dir_segments(self.path).any(|segment| {
            names
                .iter()
                .any(|name| segment.eq_ignore_ascii_case(name))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleRule {
    BuildManifest,
    ConfigFile,
    TestPath,
    RouteDirectory,
    ModelDirectory,
    AssetPath,
    RouteSyntax,
    SchemaSyntax,
}

impl RoleRule {
    pub fn role(self) -> Role {
        match self {
            RoleRule::BuildManifest => Role::Build,
            RoleRule::ConfigFile => Role::Config,
            RoleRule::TestPath => Role::Test,
            RoleRule::RouteDirectory | RoleRule::RouteSyntax => Role::Route,
            RoleRule::ModelDirectory | RoleRule::SchemaSyntax => Role::Model,
            RoleRule::AssetPath => Role::Asset,
        }
    }
}

pub type RolePredicate = fn(&ClassifyInput<'_>) -> bool;

pub const ROLE_RULES: &[(RoleRule, RolePredicate)] = &[
    (RoleRule::BuildManifest, is_build_manifest),
    (RoleRule::ConfigFile, is_config_file),
    (RoleRule::TestPath, is_test_path),
    (RoleRule::RouteDirectory, is_in_route_directory),
    (RoleRule::ModelDirectory, is_in_model_directory),
    (RoleRule::AssetPath, is_asset),
    (RoleRule::RouteSyntax, declares_routes),
    (RoleRule::SchemaSyntax, declares_schema),
];

/// Assigns a role; returns the rule that fired, if any.
pub fn classify(input: &ClassifyInput<'_>) -> (Role, Option<RoleRule>) {
    ROLE_RULES
        .iter()
        .find(|(_, predicate)| predicate(input))
        .map(|(rule, _)| (rule.role(), Some(*rule)))
        .unwrap_or((Role::Other, None))
}

/// Language from extension or well-known name, then from a shebang line.
pub fn infer_language(path: &str, content: Option<&str>) -> Language {
    let by_path = Language::from_path(path);
    if by_path != Language::Unknown {
        return by_path;
    }
    content
        .and_then(|text| text.lines().next())
        .map(Language::from_shebang)
        .unwrap_or(Language::Unknown)
}

const BUILD_MANIFEST_GLOBS: &[&str] = &[
    "package.json",
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "pnpm-workspace.yaml",
    "bun.lockb",
    "Cargo.toml",
    "Cargo.lock",
    "go.mod",
    "go.sum",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements*.txt",
    "Pipfile",
    "Pipfile.lock",
    "poetry.lock",
    "Gemfile",
    "Gemfile.lock",
    "composer.json",
    "composer.lock",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
    "*.csproj",
    "*.sln",
    "mix.exs",
    "Makefile",
    "makefile",
    "GNUmakefile",
    "CMakeLists.txt",
    "Justfile",
    "justfile",
    "Rakefile",
    "Dockerfile",
    "Dockerfile.*",
    "Containerfile",
    "vite.config.*",
    "webpack.config.*",
    "rollup.config.*",
    "esbuild.config.*",
    "turbo.json",
    "nx.json",
    "lerna.json",
];

const CONFIG_GLOBS: &[&str] = &[
    "tsconfig*.json",
    "jsconfig.json",
    ".env",
    ".env.*",
    "docker-compose*.yml",
    "docker-compose*.yaml",
    "compose.yml",
    "compose.yaml",
    "*.ini",
    "*.cfg",
    "*.conf",
    "*.properties",
    "settings.py",
    "config.py",
    "application.yml",
    "application.yaml",
    "appsettings*.json",
    ".eslintrc*",
    "eslint.config.*",
    ".prettierrc*",
    "prettier.config.*",
    ".babelrc",
    "babel.config.*",
    "jest.config.*",
    "vitest.config.*",
    "tailwind.config.*",
    "postcss.config.*",
    "next.config.*",
    "nuxt.config.*",
    "svelte.config.*",
    "angular.json",
    ".editorconfig",
    ".nvmrc",
    "rustfmt.toml",
    "clippy.toml",
];

const CONFIG_SEGMENTS: &[&str] = &["config", "configs", "conf", "settings", ".github"];

const TEST_SEGMENTS: &[&str] = &["test", "tests", "spec", "specs", "__tests__", "e2e"];

const TEST_FILE_GLOBS: &[&str] = &[
    "*.test.*",
    "*.spec.*",
    "*_test.go",
    "*_test.py",
    "test_*.py",
    "conftest.py",
    "*_spec.rb",
    "*_test.rb",
    "*Test.java",
    "*Tests.java",
    "*Test.kt",
    "*Tests.cs",
];

const ROUTE_SEGMENTS: &[&str] = &[
    "routes",
    "route",
    "router",
    "routers",
    "controllers",
    "controller",
    "endpoints",
];

const MODEL_SEGMENTS: &[&str] = &[
    "models",
    "model",
    "schema",
    "schemas",
    "entities",
    "entity",
    "prisma",
    "migrations",
];

const ASSET_SEGMENTS: &[&str] = &["assets", "static", "public"];

const ASSET_EXTENSIONS: &[&str] = &[
    "css", "scss", "sass", "less", "svg", "png", "jpg", "jpeg", "gif", "webp", "ico", "bmp",
    "avif", "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4", "webm", "wav", "ogg", "pdf",
];

fn glob_set(patterns: &[&str]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => log::warn!("Skipping invalid file-name glob {pattern}: {e}"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        log::warn!("Failed to build file-name glob set: {e}");
        GlobSet::empty()
    })
}

static BUILD_MANIFESTS: Lazy<GlobSet> = Lazy::new(|| glob_set(BUILD_MANIFEST_GLOBS));
static CONFIG_FILES: Lazy<GlobSet> = Lazy::new(|| glob_set(CONFIG_GLOBS));
static TEST_FILES: Lazy<GlobSet> = Lazy::new(|| glob_set(TEST_FILE_GLOBS));

static ROUTE_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?m)(\b(app|router|server|api|routes|r|e|g|mux|fastify)\.(?i:get|post|put|patch|delete|all|route)\s*\(\s*['"`/]"#,
        r#"|@(app|router|bp|blueprint|api)\.(route|get|post|put|patch|delete)\s*\("#,
        r#"|@(Get|Post|Put|Patch|Delete|RequestMapping|GetMapping|PostMapping|PutMapping|PatchMapping|DeleteMapping|RestController)\b"#,
        r#"|#\[(get|post|put|patch|delete)\s*\(\s*""#,
        r#"|\burlpatterns\s*="#,
        r#"|\broutes\.draw\b"#,
        r#"|\bmethod\s*:\s*['"](GET|POST|PUT|PATCH|DELETE)['"]"#,
        r#"|\.route\s*\(\s*"/)"#,
    ))
    .expect("route sniffing pattern is valid")
});

static SCHEMA_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?m)(^\s*model\s+\w+\s*\{"#,
        r#"|(?i:\bcreate\s+table\b)"#,
        r#"|class\s+\w+\s*\(\s*(models\.Model|db\.Model|Base|SQLModel|DeclarativeBase)"#,
        r#"|new\s+(mongoose\.)?Schema\s*\("#,
        r#"|@(Entity|Table)\b"#,
        r#"|\bgorm\.Model\b)"#,
    ))
    .expect("schema sniffing pattern is valid")
});

fn is_build_manifest(input: &ClassifyInput<'_>) -> bool {
    BUILD_MANIFESTS.is_match(input.file_name())
}

fn is_config_file(input: &ClassifyInput<'_>) -> bool {
    if CONFIG_FILES.is_match(input.file_name()) {
        return true;
    }
    matches!(
        input.language,
        Language::Yaml | Language::Toml | Language::Json | Language::Xml
    ) && input.has_segment(CONFIG_SEGMENTS)
}

fn is_test_path(input: &ClassifyInput<'_>) -> bool {
    input.has_segment(TEST_SEGMENTS) || TEST_FILES.is_match(input.file_name())
}

fn is_in_route_directory(input: &ClassifyInput<'_>) -> bool {
    input.language.is_source() && input.has_segment(ROUTE_SEGMENTS)
}

fn is_in_model_directory(input: &ClassifyInput<'_>) -> bool {
    (input.language.is_source() || input.language.is_schema())
        && input.has_segment(MODEL_SEGMENTS)
}

fn is_asset(input: &ClassifyInput<'_>) -> bool {
    if input.has_segment(ASSET_SEGMENTS) {
        return true;
    }
    input
        .file_name()
        .rsplit_once('.')
        .is_some_and(|(_, ext)| {
            ASSET_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

fn declares_routes(input: &ClassifyInput<'_>) -> bool {
    input.language.is_source() && input.content.is_some_and(|text| ROUTE_SYNTAX.is_match(text))
}

fn declares_schema(input: &ClassifyInput<'_>) -> bool {
    (input.language.is_source() || input.language.is_schema())
        && input.content.is_some_and(|text| SCHEMA_SYNTAX.is_match(text))
}
