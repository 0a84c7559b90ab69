//! Technology stack detection from weighted signatures.
//!
//! Every identity carries an ordered list of signatures. A matched signature contributes the
//! weight of its kind once, no matter how many files match it. Identities are listed most
//! specific first inside each layer, which is also the tie-break order.

use crate::manifests::{is_parsed_manifest, ManifestSet};
use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use recon_protocol::paths::file_name;
use recon_protocol::{
    round_score, DependencyInventory, Language, LayerDetection, Role, StackLayer, StackProfile,
    Warning, UNKNOWN_IDENTITY,
};
use recon_scanner::ScannedFile;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// File name (or glob) present anywhere in the tree.
    ManifestFile,
    /// Dependency declared by a parsed manifest, or a literal token in another build file.
    ManifestKeyword,
    /// Regex over source and schema file content.
    ImportPattern,
}

#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub kind: SignatureKind,
    pub pattern: &'static str,
}

#[derive(Debug)]
pub struct StackIdentity {
    pub layer: StackLayer,
    pub name: &'static str,
    pub signatures: &'static [Signature],
}

/// Signature weights and the detection threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StackWeights {
    pub manifest_file: f32,
    pub manifest_keyword: f32,
    pub import_pattern: f32,
    /// Best confidence below this value reports the layer as Unknown.
    pub threshold: f32,
}

impl Default for StackWeights {
    fn default() -> Self {
        Self {
            manifest_file: 0.6,
            manifest_keyword: 0.5,
            import_pattern: 0.2,
            threshold: 0.35,
        }
    }
}

impl StackWeights {
    pub fn weight(&self, kind: SignatureKind) -> f32 {
        match kind {
            SignatureKind::ManifestFile => self.manifest_file,
            SignatureKind::ManifestKeyword => self.manifest_keyword,
            SignatureKind::ImportPattern => self.import_pattern,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("manifestFile", self.manifest_file),
            ("manifestKeyword", self.manifest_keyword),
            ("importPattern", self.import_pattern),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("stack weight {name} must be within [0, 1], got {value}"));
            }
        }
        if !(0.0..=1.0).contains(&self.threshold) || self.threshold == 0.0 {
            return Err(format!(
                "stack threshold must be within (0, 1], got {}",
                self.threshold
            ));
        }
        Ok(())
    }
}

const fn file(pattern: &'static str) -> Signature {
    Signature {
        kind: SignatureKind::ManifestFile,
        pattern,
    }
}

const fn dep(pattern: &'static str) -> Signature {
    Signature {
        kind: SignatureKind::ManifestKeyword,
        pattern,
    }
}

const fn import(pattern: &'static str) -> Signature {
    Signature {
        kind: SignatureKind::ImportPattern,
        pattern,
    }
}

pub const STACK_IDENTITIES: &[StackIdentity] = &[
    // frontend
    StackIdentity {
        layer: StackLayer::Frontend,
        name: "Next.js",
        signatures: &[
            file("next.config.*"),
            dep("next"),
            import(r#"from\s+['"]next/"#),
        ],
    },
    StackIdentity {
        layer: StackLayer::Frontend,
        name: "Nuxt",
        signatures: &[file("nuxt.config.*"), dep("nuxt"), import(r#"from\s+['"]#app['"]"#)],
    },
    StackIdentity {
        layer: StackLayer::Frontend,
        name: "SvelteKit",
        signatures: &[file("svelte.config.*"), dep("@sveltejs/kit"), import(r#"from\s+['"]\$app/"#)],
    },
    StackIdentity {
        layer: StackLayer::Frontend,
        name: "Angular",
        signatures: &[file("angular.json"), dep("@angular/core"), import(r#"from\s+['"]@angular/"#)],
    },
    StackIdentity {
        layer: StackLayer::Frontend,
        name: "React",
        signatures: &[
            dep("react"),
            dep("react-dom"),
            import(r#"(from\s+['"]react['"]|require\(\s*['"]react['"]\s*\))"#),
        ],
    },
    StackIdentity {
        layer: StackLayer::Frontend,
        name: "Vue",
        signatures: &[file("*.vue"), dep("vue"), import(r#"from\s+['"]vue['"]"#)],
    },
    StackIdentity {
        layer: StackLayer::Frontend,
        name: "Svelte",
        signatures: &[file("*.svelte"), dep("svelte"), import(r#"from\s+['"]svelte['"]"#)],
    },
    StackIdentity {
        layer: StackLayer::Frontend,
        name: "SolidJS",
        signatures: &[dep("solid-js"), import(r#"from\s+['"]solid-js['"]"#)],
    },
    // backend
    StackIdentity {
        layer: StackLayer::Backend,
        name: "NestJS",
        signatures: &[file("nest-cli.json"), dep("@nestjs/core"), import(r#"from\s+['"]@nestjs/"#)],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Express",
        signatures: &[
            dep("express"),
            import(r#"(from\s+['"]express['"]|require\(\s*['"]express['"]\s*\))"#),
        ],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Fastify",
        signatures: &[
            dep("fastify"),
            import(r#"(from\s+['"]fastify['"]|require\(\s*['"]fastify['"]\s*\))"#),
        ],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Koa",
        signatures: &[dep("koa"), import(r#"(from\s+['"]koa['"]|require\(\s*['"]koa['"]\s*\))"#)],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Hono",
        signatures: &[dep("hono"), import(r#"from\s+['"]hono['"]"#)],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Django",
        signatures: &[file("manage.py"), dep("django"), import(r"(?m)^\s*(from|import)\s+django\b")],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "FastAPI",
        signatures: &[dep("fastapi"), import(r"(?m)^\s*from\s+fastapi\s+import\b")],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Flask",
        signatures: &[dep("flask"), import(r"(?m)^\s*from\s+flask\s+import\b")],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Ruby on Rails",
        signatures: &[file("config.ru"), dep("rails"), import(r"\bRails\.application\b")],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Laravel",
        signatures: &[file("artisan"), dep("laravel/framework"), import(r"\buse\s+Illuminate\\")],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Spring Boot",
        signatures: &[
            file("mvnw"),
            dep("spring-boot"),
            import(r"(?m)^\s*import\s+org\.springframework\."),
        ],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "ASP.NET Core",
        signatures: &[
            file("appsettings.json"),
            dep("Microsoft.AspNetCore"),
            import(r"(?m)^\s*using\s+Microsoft\.AspNetCore\b"),
        ],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Gin",
        signatures: &[dep("github.com/gin-gonic/gin"), import(r#""github\.com/gin-gonic/gin""#)],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Echo",
        signatures: &[dep("github.com/labstack/echo*"), import(r#""github\.com/labstack/echo"#)],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Chi",
        signatures: &[dep("github.com/go-chi/chi*"), import(r#""github\.com/go-chi/chi"#)],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Axum",
        signatures: &[dep("axum"), import(r"\buse\s+axum::")],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Actix Web",
        signatures: &[dep("actix-web"), import(r"\buse\s+actix_web::")],
    },
    StackIdentity {
        layer: StackLayer::Backend,
        name: "Rocket",
        signatures: &[dep("rocket"), import(r"#\[macro_use\]\s*extern\s+crate\s+rocket|\buse\s+rocket::")],
    },
    // database
    StackIdentity {
        layer: StackLayer::Database,
        name: "PostgreSQL",
        signatures: &[
            dep("pg"),
            dep("psycopg2*"),
            dep("asyncpg"),
            dep("github.com/lib/pq"),
            dep("github.com/jackc/pgx*"),
            dep("tokio-postgres"),
            import(r#"(?i)provider\s*=\s*"postgres(ql)?"|postgres(ql)?://"#),
        ],
    },
    StackIdentity {
        layer: StackLayer::Database,
        name: "MySQL",
        signatures: &[
            dep("mysql"),
            dep("mysql2"),
            dep("pymysql"),
            dep("mysqlclient"),
            dep("github.com/go-sql-driver/mysql"),
            import(r#"(?i)provider\s*=\s*"mysql"|mysql://"#),
        ],
    },
    StackIdentity {
        layer: StackLayer::Database,
        name: "MongoDB",
        signatures: &[
            dep("mongoose"),
            dep("mongodb"),
            dep("pymongo"),
            dep("motor"),
            dep("mongoid"),
            dep("go.mongodb.org/mongo-driver*"),
            import(r#"(?i)provider\s*=\s*"mongodb"|mongodb(\+srv)?://"#),
        ],
    },
    StackIdentity {
        layer: StackLayer::Database,
        name: "SQLite",
        signatures: &[
            file("*.sqlite3"),
            file("*.sqlite"),
            dep("sqlite3"),
            dep("better-sqlite3"),
            dep("rusqlite"),
            dep("aiosqlite"),
            import(r#"(?i)provider\s*=\s*"sqlite"|sqlite:///"#),
        ],
    },
    StackIdentity {
        layer: StackLayer::Database,
        name: "Redis",
        signatures: &[dep("redis"), dep("ioredis"), import(r"redis://")],
    },
    // build tool
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Vite",
        signatures: &[file("vite.config.*"), dep("vite")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Webpack",
        signatures: &[file("webpack.config.*"), dep("webpack")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Turborepo",
        signatures: &[file("turbo.json"), dep("turbo")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "pnpm",
        signatures: &[file("pnpm-lock.yaml"), file("pnpm-workspace.yaml")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Yarn",
        signatures: &[file("yarn.lock"), file(".yarnrc*")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "npm",
        signatures: &[file("package.json"), file("package-lock.json")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Cargo",
        signatures: &[file("Cargo.toml"), file("Cargo.lock")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Go Modules",
        signatures: &[file("go.mod"), file("go.sum")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Gradle",
        signatures: &[file("build.gradle*"), file("settings.gradle*"), file("gradlew")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Maven",
        signatures: &[file("pom.xml"), dep("maven-compiler-plugin")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Poetry",
        signatures: &[file("poetry.lock"), file("poetry.toml")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Pipenv",
        signatures: &[file("Pipfile"), file("Pipfile.lock")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "pip",
        signatures: &[file("requirements*.txt"), file("setup.py")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Bundler",
        signatures: &[file("Gemfile"), file("Gemfile.lock")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Composer",
        signatures: &[file("composer.json"), file("composer.lock")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "MSBuild",
        signatures: &[file("*.csproj"), file("*.sln")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "CMake",
        signatures: &[file("CMakeLists.txt")],
    },
    StackIdentity {
        layer: StackLayer::BuildTool,
        name: "Make",
        signatures: &[file("Makefile"), file("makefile"), file("GNUmakefile")],
    },
];

enum CompiledSignature {
    File(GlobMatcher),
    Keyword(&'static str, Regex),
    Import(Regex),
    Invalid,
}

/// Build files whose text mentions package names incidentally (lockfiles list transitive
/// packages, container and task files hold shell commands), so they never count as keywords.
const UNSCANNED_BUILD_GLOBS: &[&str] = &[
    "*.lock",
    "*.lockb",
    "*-lock.json",
    "*-lock.yaml",
    "npm-shrinkwrap.json",
    "go.sum",
    "Dockerfile",
    "Dockerfile.*",
    "Containerfile",
    "Makefile",
    "makefile",
    "GNUmakefile",
    "Justfile",
    "justfile",
    "Rakefile",
    "CMakeLists.txt",
];

static UNSCANNED_BUILD_FILES: Lazy<GlobSet> = Lazy::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in UNSCANNED_BUILD_GLOBS {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => log::warn!("Skipping invalid build-file glob {pattern}: {e}"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        log::warn!("Failed to build build-file glob set: {e}");
        GlobSet::empty()
    })
});

/// Whole-token pattern for a declared dependency name. A trailing `*` lets the name continue
/// (`psycopg2*` also matches `psycopg2-binary`); otherwise the next character must end the name.
fn keyword_pattern(name: &str) -> Result<Regex, regex::Error> {
    let (token, open_ended) = match name.strip_suffix('*') {
        Some(token) => (token, true),
        None => (name, false),
    };
    let tail = if open_ended { "" } else { r"(?:[^\w.-]|$)" };
    Regex::new(&format!(
        r"(?m)(?:^|[^\w.@/-]){}{tail}",
        regex::escape(token)
    ))
}

fn is_keyword_scanned(path: &str) -> bool {
    !is_parsed_manifest(path) && !UNSCANNED_BUILD_FILES.is_match(file_name(path))
}

/// Compiled form of [`STACK_IDENTITIES`], index-aligned with it.
static COMPILED: Lazy<Vec<Vec<CompiledSignature>>> = Lazy::new(|| {
    STACK_IDENTITIES
        .iter()
        .map(|identity| {
            identity
                .signatures
                .iter()
                .map(|sig| compile_signature(identity.name, sig))
                .collect()
        })
        .collect()
});

fn compile_signature(identity: &str, sig: &Signature) -> CompiledSignature {
    match sig.kind {
        SignatureKind::ManifestFile => match Glob::new(sig.pattern) {
            Ok(glob) => CompiledSignature::File(glob.compile_matcher()),
            Err(e) => {
                log::warn!("Invalid file signature {} for {identity}: {e}", sig.pattern);
                CompiledSignature::Invalid
            }
        },
        SignatureKind::ManifestKeyword => match keyword_pattern(sig.pattern) {
            Ok(re) => CompiledSignature::Keyword(sig.pattern, re),
            Err(e) => {
                log::warn!("Invalid keyword signature {} for {identity}: {e}", sig.pattern);
                CompiledSignature::Invalid
            }
        },
        SignatureKind::ImportPattern => match Regex::new(sig.pattern) {
            Ok(re) => CompiledSignature::Import(re),
            Err(e) => {
                log::warn!("Invalid import signature {} for {identity}: {e}", sig.pattern);
                CompiledSignature::Invalid
            }
        },
    }
}

/// Stack profile plus what the manifests declared.
#[derive(Debug, Clone)]
pub struct StackDetection {
    pub profile: StackProfile,
    pub dependencies: DependencyInventory,
    pub warnings: Vec<Warning>,
}

struct Candidate {
    name: &'static str,
    confidence: f32,
    evidence: Vec<String>,
}

struct Evidence<'a> {
    files: &'a [ScannedFile],
    manifests: &'a ManifestSet,
    /// Build files that are not parsed for dependencies, searched for whole dependency tokens.
    unparsed_build_files: Vec<&'a ScannedFile>,
}

impl<'a> Evidence<'a> {
    fn matches(&self, sig: &Signature, compiled: &CompiledSignature) -> Option<String> {
        match compiled {
            CompiledSignature::File(matcher) => self
                .files
                .iter()
                .find(|f| matcher.is_match(file_name(f.path())))
                .map(|f| format!("manifest file {}", f.path())),
            CompiledSignature::Keyword(name, re) => {
                if let Some(manifest) = self.manifests.declares(name) {
                    return Some(format!("dependency {name} in {manifest}"));
                }
                let token = name.trim_end_matches('*');
                self.unparsed_build_files
                    .iter()
                    .find(|f| f.text().is_some_and(|text| re.is_match(text)))
                    .map(|f| format!("keyword {token} in {}", f.path()))
            }
            CompiledSignature::Import(re) => self
                .files
                .iter()
                .filter(|f| f.language().is_source() || f.language().is_schema())
                .find(|f| f.text().is_some_and(|text| re.is_match(text)))
                .map(|f| format!("import pattern in {}", f.path())),
            CompiledSignature::Invalid => {
                log::debug!("Skipping invalid signature {}", sig.pattern);
                None
            }
        }
    }
}

/// Detects every stack layer from the classified files.
pub fn detect_stack(files: &[ScannedFile], weights: &StackWeights) -> StackDetection {
    let manifests = ManifestSet::collect(files);
    let evidence = Evidence {
        files,
        manifests: &manifests,
        unparsed_build_files: files
            .iter()
            .filter(|f| f.role() == Role::Build && is_keyword_scanned(f.path()))
            .collect(),
    };

    let mut best: BTreeMap<StackLayer, Candidate> = BTreeMap::new();
    for (identity, compiled) in STACK_IDENTITIES.iter().zip(COMPILED.iter()) {
        let mut total = 0.0f32;
        let mut observed = Vec::new();
        for (sig, compiled) in identity.signatures.iter().zip(compiled) {
            if let Some(found) = evidence.matches(sig, compiled) {
                total += weights.weight(sig.kind);
                observed.push(found);
            }
        }
        let confidence = round_score(total.min(1.0));
        let replace = best
            .get(&identity.layer)
            .map_or(true, |current| confidence > current.confidence);
        if replace {
            best.insert(
                identity.layer,
                Candidate {
                    name: identity.name,
                    confidence,
                    evidence: observed,
                },
            );
        }
    }

    let mut warnings = manifests.warnings.clone();
    let mut resolve = |layer: StackLayer| -> LayerDetection {
        let Some(candidate) = best.remove(&layer) else {
            return LayerDetection::unknown(0.0, None, Vec::new());
        };
        if candidate.confidence >= weights.threshold {
            log::debug!(
                "{}: {} ({:.3})",
                layer.as_str(),
                candidate.name,
                candidate.confidence
            );
            return LayerDetection::detected(
                candidate.name,
                candidate.confidence,
                candidate.evidence,
            );
        }
        let message = if candidate.confidence > 0.0 {
            format!(
                "{}: best match {} at {:.3} is below threshold {:.2}",
                layer.as_str(),
                candidate.name,
                candidate.confidence,
                weights.threshold
            )
        } else {
            format!("{}: no signatures matched", layer.as_str())
        };
        warnings.push(Warning::low_confidence(message));
        let name = (candidate.confidence > 0.0).then(|| candidate.name.to_string());
        LayerDetection::unknown(candidate.confidence, name, candidate.evidence)
    };

    let profile = StackProfile {
        frontend: resolve(StackLayer::Frontend),
        backend: resolve(StackLayer::Backend),
        database: resolve(StackLayer::Database),
        build_tool: resolve(StackLayer::BuildTool),
        primary_language: primary_language(files),
    };
    warnings.sort();

    StackDetection {
        profile,
        dependencies: manifests.inventory(),
        warnings,
    }
}

/// Most frequent source language by file count; ties go to the earlier `Language` variant.
pub fn primary_language(files: &[ScannedFile]) -> String {
    let mut counts: BTreeMap<Language, usize> = BTreeMap::new();
    for file in files {
        if file.language().is_source() {
            *counts.entry(file.language()).or_default() += 1;
        }
    }
    let mut winner: Option<(Language, usize)> = None;
    for (language, count) in counts {
        if winner.map_or(true, |(_, best)| count > best) {
            winner = Some((language, count));
        }
    }
    winner
        .map(|(language, _)| language.display_name().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use recon_protocol::{FileRecord, WarningKind};
    use recon_scanner::{classify, infer_language, ClassifyInput};
    use std::sync::Arc;

    fn scanned(path: &str, content: &str) -> ScannedFile {
        let language = infer_language(path, Some(content));
        let (role, _) = classify(&ClassifyInput::new(path, language, Some(content)));
        ScannedFile {
            record: FileRecord {
                path: path.to_string(),
                role,
                language,
                line_count: content.lines().count(),
            },
            content: Some(Arc::from(content)),
        }
    }

    #[test]
    fn single_backend_manifest_leaves_frontend_unknown() {
        let files = vec![
            scanned("app.py", "from flask import Flask\napp = Flask(__name__)\n"),
            scanned("requirements.txt", "flask==3.0\n"),
        ];
        let detection = detect_stack(&files, &StackWeights::default());
        let profile = &detection.profile;

        assert_eq!(profile.backend.identity, "Flask");
        assert_eq!(profile.backend.confidence, 0.7);
        assert_eq!(
            profile.backend.evidence,
            vec![
                "dependency flask in requirements.txt".to_string(),
                "import pattern in app.py".to_string(),
            ]
        );
        assert!(profile.frontend.is_unknown());
        assert_eq!(profile.build_tool.identity, "pip");
        assert_eq!(profile.primary_language, "Python");
        assert!(detection
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::LowConfidenceDetection
                && w.message.starts_with("frontend")));
    }

    #[test]
    fn specific_identities_beat_generic_ones() {
        let files = vec![
            scanned(
                "package.json",
                r#"{"dependencies":{"next":"14","react":"18","react-dom":"18","pg":"8"}}"#,
            ),
            scanned("next.config.js", "module.exports = {}\n"),
            scanned("pages/index.tsx", "import React from 'react'\n"),
        ];
        let profile = detect_stack(&files, &StackWeights::default()).profile;
        assert_eq!(profile.frontend.identity, "Next.js");
        assert_eq!(profile.frontend.confidence, 1.0);
        assert_eq!(profile.database.identity, "PostgreSQL");
        assert_eq!(profile.build_tool.identity, "npm");
    }

    #[test]
    fn below_threshold_keeps_candidate_and_confidence() {
        let files = vec![scanned("src/App.jsx", "import React from 'react'\n")];
        let profile = detect_stack(&files, &StackWeights::default()).profile;
        assert!(profile.frontend.is_unknown());
        assert_eq!(profile.frontend.confidence, 0.2);
        assert_eq!(profile.frontend.candidate.as_deref(), Some("React"));

        let lenient = StackWeights {
            threshold: 0.1,
            ..StackWeights::default()
        };
        let profile = detect_stack(&files, &lenient).profile;
        assert_eq!(profile.frontend.identity, "React");
    }

    #[test]
    fn confidences_stay_within_bounds() {
        let files = vec![
            scanned("Cargo.toml", "[dependencies]\naxum = \"0.7\"\nrusqlite = \"0.31\"\n"),
            scanned("Cargo.lock", "# generated\n"),
            scanned("src/main.rs", "use axum::Router;\nfn main() {}\n"),
        ];
        let profile = detect_stack(&files, &StackWeights::default()).profile;
        for layer in StackLayer::ALL {
            let detection = profile.layer(layer);
            assert!((0.0..=1.0).contains(&detection.confidence));
        }
        assert_eq!(profile.backend.identity, "Axum");
        assert_eq!(profile.database.identity, "SQLite");
        assert_eq!(profile.build_tool.identity, "Cargo");
        assert_eq!(profile.build_tool.confidence, 1.0);
    }

    #[test]
    fn unparsed_build_files_are_keyword_scanned() {
        let files = vec![scanned(
            "pom.xml",
            "<project><artifactId>spring-boot-starter-web</artifactId></project>\n",
        )];
        let profile = detect_stack(&files, &StackWeights::default()).profile;
        assert_eq!(profile.backend.identity, "Spring Boot");
        assert_eq!(profile.build_tool.identity, "Maven");
    }

    #[test]
    fn keywords_match_whole_dependency_names_only() {
        let files = vec![
            scanned("app.py", "from flask import Flask\napp = Flask(__name__)\n"),
            scanned("requirements.txt", "flask==3.0\n"),
            scanned(
                "Dockerfile",
                "FROM python:3.12\nRUN apt-get update && apt-get upgrade -y\nRUN pip install psycopg2-binary\n",
            ),
            scanned(
                "pom.xml",
                "<project><artifactId>invite-service</artifactId><artifactId>spring-boot-starter-webflux</artifactId></project>\n",
            ),
        ];
        let profile = detect_stack(&files, &StackWeights::default()).profile;
        assert_eq!(profile.backend.identity, "Flask");
        assert_eq!(profile.database.identity, UNKNOWN_IDENTITY);
        assert_eq!(profile.database.confidence, 0.0);
        assert_ne!(profile.build_tool.identity, "Vite");
        assert!(profile
            .backend
            .evidence
            .iter()
            .all(|e| !e.contains("spring-boot-starter-web")));
    }

    #[test]
    fn open_ended_keywords_allow_suffixes() {
        let re = keyword_pattern("psycopg2*").unwrap();
        assert!(re.is_match("deps = [psycopg2-binary]"));
        let exact = keyword_pattern("pg").unwrap();
        assert!(exact.is_match("\"pg\": \"^8\""));
        assert!(!exact.is_match("apt-get upgrade"));
        assert!(!exact.is_match("node-pg"));
    }

    #[test]
    fn primary_language_breaks_ties_by_declaration_order() {
        let files = vec![
            scanned("a.py", "x = 1\n"),
            scanned("b.ts", "export const x = 1\n"),
        ];
        assert_eq!(primary_language(&files), "TypeScript");
        assert_eq!(primary_language(&[scanned("README.md", "# hi\n")]), "Unknown");
    }

    #[test]
    fn default_weights_validate() {
        assert!(StackWeights::default().validate().is_ok());
        let bad = StackWeights {
            threshold: 0.0,
            ..StackWeights::default()
        };
        assert!(bad.validate().is_err());
    }
}
