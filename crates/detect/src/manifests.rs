//! Declared-dependency parsing for the manifests the stack detector understands.

use once_cell::sync::Lazy;
use recon_protocol::paths::file_name;
use recon_protocol::{DependencyInventory, ManifestDependencies, Warning};
use recon_scanner::ScannedFile;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use toml::Value as TomlValue;

/// Dependency names declared by one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedManifest {
    pub production: BTreeSet<String>,
    pub development: BTreeSet<String>,
}

impl ParsedManifest {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.production
            .iter()
            .chain(self.development.iter())
            .map(String::as_str)
    }
}

type ParseFn = fn(&str, &str) -> Result<ParsedManifest, String>;

struct ManifestParser {
    matches: fn(&str) -> bool,
    ecosystem: &'static str,
    parse: ParseFn,
}

const MANIFEST_PARSERS: &[ManifestParser] = &[
    ManifestParser {
        matches: |name| name == "package.json",
        ecosystem: "npm",
        parse: parse_package_json,
    },
    ManifestParser {
        matches: |name| name == "composer.json",
        ecosystem: "composer",
        parse: parse_composer_json,
    },
    ManifestParser {
        matches: |name| name == "Cargo.toml",
        ecosystem: "cargo",
        parse: parse_cargo_toml,
    },
    ManifestParser {
        matches: |name| name == "pyproject.toml",
        ecosystem: "pypi",
        parse: parse_pyproject_toml,
    },
    ManifestParser {
        matches: |name| name.starts_with("requirements") && name.ends_with(".txt"),
        ecosystem: "pypi",
        parse: parse_requirements_txt,
    },
    ManifestParser {
        matches: |name| name == "Pipfile",
        ecosystem: "pypi",
        parse: parse_pipfile,
    },
    ManifestParser {
        matches: |name| name == "go.mod",
        ecosystem: "go",
        parse: parse_go_mod,
    },
    ManifestParser {
        matches: |name| name == "Gemfile",
        ecosystem: "rubygems",
        parse: parse_gemfile,
    },
];

/// True when `path` names a manifest whose dependencies are parsed.
pub fn is_parsed_manifest(path: &str) -> bool {
    let name = file_name(path);
    MANIFEST_PARSERS.iter().any(|parser| (parser.matches)(name))
}

/// Every parsed manifest in the tree, in path order.
#[derive(Debug, Clone, Default)]
pub struct ManifestSet {
    pub entries: Vec<(String, &'static str, ParsedManifest)>,
    pub warnings: Vec<Warning>,
}

impl ManifestSet {
    pub fn collect(files: &[ScannedFile]) -> Self {
        let mut set = ManifestSet::default();
        for file in files {
            let name = file_name(file.path());
            let Some(parser) = MANIFEST_PARSERS.iter().find(|p| (p.matches)(name)) else {
                continue;
            };
            let Some(text) = file.text() else {
                continue;
            };
            match (parser.parse)(name, text) {
                Ok(parsed) => {
                    set.entries
                        .push((file.path().to_string(), parser.ecosystem, parsed));
                }
                Err(e) => {
                    log::debug!("Failed to parse manifest {}: {e}", file.path());
                    set.warnings.push(Warning::partial_extraction(
                        file.path(),
                        format!("could not parse {} manifest: {e}", parser.ecosystem),
                    ));
                }
            }
        }
        set
    }

    /// True when any manifest declares `name` (case-insensitive).
    ///
    /// A trailing `*` turns the name into a prefix, e.g. `@nestjs/*`.
    pub fn declares(&self, name: &str) -> Option<&str> {
        let lowered = name.to_ascii_lowercase();
        let (needle, prefix) = match lowered.strip_suffix('*') {
            Some(stem) => (stem.to_string(), true),
            None => (lowered, false),
        };
        self.entries.iter().find_map(|(path, _, parsed)| {
            parsed
                .names()
                .any(|dep| {
                    let dep = dep.to_ascii_lowercase();
                    if prefix {
                        dep.starts_with(&needle)
                    } else {
                        dep == needle
                    }
                })
                .then_some(path.as_str())
        })
    }

    pub fn inventory(&self) -> DependencyInventory {
        let manifests: Vec<ManifestDependencies> = self
            .entries
            .iter()
            .map(|(path, ecosystem, parsed)| ManifestDependencies {
                file: path.clone(),
                ecosystem: (*ecosystem).to_string(),
                production: parsed.production.iter().cloned().collect(),
                development: parsed.development.iter().cloned().collect(),
            })
            .collect();
        let total_count = manifests
            .iter()
            .map(|m| m.production.len() + m.development.len())
            .sum();
        DependencyInventory {
            manifests,
            total_count,
        }
    }
}

fn json_keys(value: Option<&JsonValue>) -> impl Iterator<Item = String> + '_ {
    value
        .and_then(JsonValue::as_object)
        .into_iter()
        .flat_map(|map| map.keys().cloned())
}

fn parse_package_json(_name: &str, text: &str) -> Result<ParsedManifest, String> {
    let json: JsonValue = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let mut parsed = ParsedManifest::default();
    for key in ["dependencies", "peerDependencies", "optionalDependencies"] {
        parsed.production.extend(json_keys(json.get(key)));
    }
    parsed
        .development
        .extend(json_keys(json.get("devDependencies")));
    Ok(parsed)
}

fn parse_composer_json(_name: &str, text: &str) -> Result<ParsedManifest, String> {
    let json: JsonValue = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let is_package = |name: &String| name != "php" && !name.starts_with("ext-");
    let mut parsed = ParsedManifest::default();
    parsed
        .production
        .extend(json_keys(json.get("require")).filter(is_package));
    parsed
        .development
        .extend(json_keys(json.get("require-dev")).filter(is_package));
    Ok(parsed)
}

fn toml_keys<'a>(value: Option<&'a TomlValue>) -> impl Iterator<Item = String> + 'a {
    value
        .and_then(TomlValue::as_table)
        .into_iter()
        .flat_map(|table| table.keys().cloned())
}

fn parse_cargo_toml(_name: &str, text: &str) -> Result<ParsedManifest, String> {
    let doc: TomlValue = toml::from_str(text).map_err(|e| e.to_string())?;
    let mut parsed = ParsedManifest::default();
    parsed.production.extend(toml_keys(doc.get("dependencies")));
    parsed.production.extend(toml_keys(
        doc.get("workspace").and_then(|w| w.get("dependencies")),
    ));
    for key in ["dev-dependencies", "build-dependencies"] {
        parsed.development.extend(toml_keys(doc.get(key)));
    }
    Ok(parsed)
}

static PEP508_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)").expect("requirement name pattern is valid")
});

/// PEP 503 normalized name of a requirement specifier, if it has one.
fn python_requirement_name(spec: &str) -> Option<String> {
    let caps = PEP508_NAME.captures(spec)?;
    let name = caps.get(1)?.as_str();
    Some(name.to_ascii_lowercase().replace(['_', '.'], "-"))
}

fn python_names_from_array(value: Option<&TomlValue>) -> impl Iterator<Item = String> + '_ {
    value
        .and_then(TomlValue::as_array)
        .into_iter()
        .flatten()
        .filter_map(TomlValue::as_str)
        .filter_map(python_requirement_name)
}

fn parse_pyproject_toml(_name: &str, text: &str) -> Result<ParsedManifest, String> {
    let doc: TomlValue = toml::from_str(text).map_err(|e| e.to_string())?;
    let mut parsed = ParsedManifest::default();

    if let Some(project) = doc.get("project") {
        parsed
            .production
            .extend(python_names_from_array(project.get("dependencies")));
        if let Some(extras) = project
            .get("optional-dependencies")
            .and_then(TomlValue::as_table)
        {
            for group in extras.values() {
                parsed
                    .development
                    .extend(python_names_from_array(Some(group)));
            }
        }
    }

    if let Some(poetry) = doc.get("tool").and_then(|t| t.get("poetry")) {
        let normalize = |name: String| python_requirement_name(&name);
        parsed.production.extend(
            toml_keys(poetry.get("dependencies"))
                .filter(|name| name != "python")
                .filter_map(normalize),
        );
        parsed.development.extend(
            toml_keys(poetry.get("dev-dependencies")).filter_map(normalize),
        );
        if let Some(groups) = poetry.get("group").and_then(TomlValue::as_table) {
            for group in groups.values() {
                parsed
                    .development
                    .extend(toml_keys(group.get("dependencies")).filter_map(normalize));
            }
        }
    }

    if let Some(groups) = doc.get("dependency-groups").and_then(TomlValue::as_table) {
        for group in groups.values() {
            parsed
                .development
                .extend(python_names_from_array(Some(group)));
        }
    }

    Ok(parsed)
}

fn parse_requirements_txt(name: &str, text: &str) -> Result<ParsedManifest, String> {
    let development = name.contains("dev") || name.contains("test");
    let mut parsed = ParsedManifest::default();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with('-') {
            continue;
        }
        let Some(dep) = python_requirement_name(line) else {
            continue;
        };
        if development {
            parsed.development.insert(dep);
        } else {
            parsed.production.insert(dep);
        }
    }
    Ok(parsed)
}

fn parse_pipfile(_name: &str, text: &str) -> Result<ParsedManifest, String> {
    let doc: TomlValue = toml::from_str(text).map_err(|e| e.to_string())?;
    let normalize = |name: String| python_requirement_name(&name);
    let mut parsed = ParsedManifest::default();
    parsed
        .production
        .extend(toml_keys(doc.get("packages")).filter_map(normalize));
    parsed
        .development
        .extend(toml_keys(doc.get("dev-packages")).filter_map(normalize));
    Ok(parsed)
}

fn parse_go_mod(_name: &str, text: &str) -> Result<ParsedManifest, String> {
    let mut parsed = ParsedManifest::default();
    let mut in_block = false;
    for line in text.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        if in_block {
            if line == ")" {
                in_block = false;
            } else if let Some(module) = line.split_whitespace().next() {
                parsed.production.insert(module.to_string());
            }
            continue;
        }
        let Some(rest) = line.strip_prefix("require") else {
            continue;
        };
        let rest = rest.trim();
        if rest == "(" {
            in_block = true;
        } else if let Some(module) = rest.split_whitespace().next() {
            parsed.production.insert(module.to_string());
        }
    }
    Ok(parsed)
}

static GEM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*gem\s+["']([^"']+)["']"#).expect("gem line pattern is valid")
});

static GEM_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*group\s+(.+?)\s+do\s*$").expect("gem group pattern is valid")
});

fn parse_gemfile(_name: &str, text: &str) -> Result<ParsedManifest, String> {
    let mut parsed = ParsedManifest::default();
    // Depth of nested `do` blocks and whether the innermost group is dev-only.
    let mut groups: Vec<bool> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = GEM_GROUP.captures(line) {
            let names = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let dev_only = !names.contains(":production") && !names.contains(":default");
            groups.push(dev_only);
            continue;
        }
        if line.trim() == "end" {
            groups.pop();
            continue;
        }
        if let Some(caps) = GEM_LINE.captures(line) {
            let gem = caps[1].to_string();
            if groups.last().copied().unwrap_or(false) {
                parsed.development.insert(gem);
            } else {
                parsed.production.insert(gem);
            }
        }
    }
    Ok(parsed)
}
