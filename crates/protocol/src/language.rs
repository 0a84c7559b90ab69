use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Language of a scanned file, inferred from extension, well-known name or shebang.
///
/// Declaration order doubles as the tie-break order when picking a primary language.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Rust,
    Go,
    Java,
    Kotlin,
    CSharp,
    Ruby,
    Php,
    Swift,
    Scala,
    C,
    Cpp,
    Vue,
    Svelte,
    Sql,
    Prisma,
    GraphQl,
    Html,
    Css,
    Shell,
    Dockerfile,
    Makefile,
    Markdown,
    Json,
    Yaml,
    Toml,
    Xml,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "py" | "pyw" => Language::Python,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "cs" => Language::CSharp,
            "rb" | "rake" => Language::Ruby,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "scala" | "sc" => Language::Scala,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "vue" => Language::Vue,
            "svelte" => Language::Svelte,
            "sql" => Language::Sql,
            "prisma" => Language::Prisma,
            "graphql" | "gql" => Language::GraphQl,
            "html" | "htm" | "hbs" | "ejs" | "erb" | "jinja" | "j2" => Language::Html,
            "css" | "scss" | "sass" | "less" => Language::Css,
            "sh" | "bash" | "zsh" | "fish" => Language::Shell,
            "md" | "mdx" | "rst" | "adoc" => Language::Markdown,
            "json" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "toml" => Language::Toml,
            "xml" => Language::Xml,
            _ => Language::Unknown,
        }
    }

    /// Detect language from a bare file name (files that carry no extension).
    pub fn from_file_name(name: &str) -> Self {
        match name {
            "Dockerfile" | "Containerfile" => Language::Dockerfile,
            "Makefile" | "makefile" | "GNUmakefile" => Language::Makefile,
            "Gemfile" | "Rakefile" | "Guardfile" => Language::Ruby,
            "Pipfile" => Language::Toml,
            _ => Language::Unknown,
        }
    }

    /// Detect language from an interpreter line such as `#!/usr/bin/env python3`.
    pub fn from_shebang(first_line: &str) -> Self {
        let Some(rest) = first_line.strip_prefix("#!") else {
            return Language::Unknown;
        };
        let interpreter = rest
            .split_whitespace()
            .filter(|token| *token != "-S")
            .map(|token| token.rsplit('/').next().unwrap_or(token))
            .find(|token| *token != "env")
            .unwrap_or("");
        match interpreter {
            name if name.starts_with("python") => Language::Python,
            "node" | "nodejs" | "deno" | "bun" => Language::JavaScript,
            "ts-node" | "tsx" => Language::TypeScript,
            "ruby" => Language::Ruby,
            "php" => Language::Php,
            "sh" | "bash" | "zsh" | "dash" | "fish" => Language::Shell,
            _ => Language::Unknown,
        }
    }

    /// Detect language from a path, falling back to well-known file names.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let by_ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown);
        if by_ext != Language::Unknown {
            return by_ext;
        }
        path.file_name()
            .and_then(|name| name.to_str())
            .map(Self::from_file_name)
            .unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Scala => "scala",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Vue => "vue",
            Language::Svelte => "svelte",
            Language::Sql => "sql",
            Language::Prisma => "prisma",
            Language::GraphQl => "graphql",
            Language::Html => "html",
            Language::Css => "css",
            Language::Shell => "shell",
            Language::Dockerfile => "dockerfile",
            Language::Makefile => "makefile",
            Language::Markdown => "markdown",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Xml => "xml",
            Language::Unknown => "unknown",
        }
    }

    /// Human label used in rendered documents.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::TypeScript => "TypeScript",
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Rust => "Rust",
            Language::Go => "Go",
            Language::Java => "Java",
            Language::Kotlin => "Kotlin",
            Language::CSharp => "C#",
            Language::Ruby => "Ruby",
            Language::Php => "PHP",
            Language::Swift => "Swift",
            Language::Scala => "Scala",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::Vue => "Vue",
            Language::Svelte => "Svelte",
            Language::Sql => "SQL",
            Language::Prisma => "Prisma",
            Language::GraphQl => "GraphQL",
            Language::Html => "HTML",
            Language::Css => "CSS",
            Language::Shell => "Shell",
            Language::Dockerfile => "Dockerfile",
            Language::Makefile => "Makefile",
            Language::Markdown => "Markdown",
            Language::Json => "JSON",
            Language::Yaml => "YAML",
            Language::Toml => "TOML",
            Language::Xml => "XML",
            Language::Unknown => "Unknown",
        }
    }

    /// Programming languages whose files carry application logic.
    pub fn is_source(self) -> bool {
        matches!(
            self,
            Language::TypeScript
                | Language::JavaScript
                | Language::Python
                | Language::Rust
                | Language::Go
                | Language::Java
                | Language::Kotlin
                | Language::CSharp
                | Language::Ruby
                | Language::Php
                | Language::Swift
                | Language::Scala
                | Language::C
                | Language::Cpp
                | Language::Vue
                | Language::Svelte
        )
    }

    /// Schema-definition languages (DDL, Prisma, GraphQL SDL).
    pub fn is_schema(self) -> bool {
        matches!(self, Language::Sql | Language::Prisma | Language::GraphQl)
    }

    /// Languages that usually hold view-layer templates or components.
    pub fn is_view(self) -> bool {
        matches!(self, Language::Html | Language::Vue | Language::Svelte)
    }

    /// Get typical line-comment prefixes for this language
    pub fn comment_prefixes(self) -> &'static [&'static str] {
        match self {
            Language::TypeScript
            | Language::JavaScript
            | Language::Rust
            | Language::Go
            | Language::Java
            | Language::Kotlin
            | Language::CSharp
            | Language::Swift
            | Language::Scala
            | Language::C
            | Language::Cpp
            | Language::Vue
            | Language::Svelte
            | Language::Prisma => &["//", "/*", "*"],
            Language::Php => &["//", "#", "/*", "*"],
            Language::Python
            | Language::Ruby
            | Language::Shell
            | Language::Dockerfile
            | Language::Makefile
            | Language::Yaml
            | Language::Toml
            | Language::GraphQl => &["#"],
            Language::Sql => &["--", "/*"],
            Language::Html | Language::Xml | Language::Markdown => &["<!--"],
            Language::Css => &["/*", "*"],
            Language::Json | Language::Unknown => &[],
        }
    }

    /// Keywords and operators counted as branch points by the complexity heuristic.
    pub fn branch_keywords(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["if", "elif", "for", "while", "except", "and", "or", "case"],
            Language::Ruby => &[
                "if", "elsif", "unless", "for", "while", "until", "when", "rescue", "&&", "||",
            ],
            Language::Rust => &["if", "for", "while", "loop", "match", "&&", "||", "?"],
            Language::Go => &["if", "for", "case", "select", "&&", "||"],
            Language::Sql | Language::Prisma | Language::GraphQl => &["case", "when"],
            Language::Shell => &["if", "elif", "for", "while", "case", "&&", "||"],
            language if language.is_source() => &[
                "if", "for", "while", "case", "catch", "&&", "||", "?", "switch",
            ],
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("TSX"), Language::TypeScript);
        assert_eq!(Language::from_extension("prisma"), Language::Prisma);
        assert_eq!(Language::from_extension("gql"), Language::GraphQl);
        assert_eq!(Language::from_extension("bin"), Language::Unknown);
    }

    #[test]
    fn test_from_path_falls_back_to_file_name() {
        assert_eq!(Language::from_path("src/routes/items.ts"), Language::TypeScript);
        assert_eq!(Language::from_path("Dockerfile"), Language::Dockerfile);
        assert_eq!(Language::from_path("deploy/Makefile"), Language::Makefile);
        assert_eq!(Language::from_path("Gemfile"), Language::Ruby);
        assert_eq!(Language::from_path("LICENSE"), Language::Unknown);
    }

    #[test]
    fn test_from_shebang() {
        assert_eq!(
            Language::from_shebang("#!/usr/bin/env python3"),
            Language::Python
        );
        assert_eq!(Language::from_shebang("#!/usr/bin/env -S node"), Language::JavaScript);
        assert_eq!(Language::from_shebang("#!/bin/bash"), Language::Shell);
        assert_eq!(Language::from_shebang("echo hi"), Language::Unknown);
    }

    #[test]
    fn test_language_groups() {
        assert!(Language::TypeScript.is_source());
        assert!(!Language::Sql.is_source());
        assert!(Language::Sql.is_schema());
        assert!(Language::Vue.is_view());
        assert!(Language::Python.comment_prefixes().contains(&"#"));
        assert!(Language::Go.branch_keywords().contains(&"select"));
        assert!(Language::Markdown.branch_keywords().is_empty());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Language::GraphQl).unwrap();
        assert_eq!(json, "\"graphql\"");
        let json = serde_json::to_string(&Language::CSharp).unwrap();
        assert_eq!(json, "\"csharp\"");
    }
}
