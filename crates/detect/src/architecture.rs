//! Architecture classification from role distribution and directory shape.
//!
//! Rules run in order (layered, component-based, monolithic); the first one that holds
//! wins. Evidence keeps the observation of every rule that ran, so an Unknown verdict
//! still explains what was looked at.

use recon_protocol::paths::dir_segments;
use recon_protocol::{round_score, ArchitectureKind, ArchitecturePattern, Role, Warning};
use recon_scanner::ScannedFile;
use std::collections::{BTreeMap, BTreeSet};

/// Wrapper directories that hold the real top level of many projects.
pub const WRAPPER_DIRS: &[&str] = &["src", "app", "lib", "server", "backend", "api"];

pub const ROUTE_LAYER_DIRS: &[&str] = &[
    "routes",
    "route",
    "router",
    "routers",
    "controllers",
    "controller",
    "endpoints",
    "handlers",
];

pub const MODEL_LAYER_DIRS: &[&str] = &[
    "models",
    "model",
    "schema",
    "schemas",
    "entities",
    "entity",
    "prisma",
    "migrations",
    "db",
];

pub const VIEW_LAYER_DIRS: &[&str] = &[
    "views",
    "view",
    "templates",
    "components",
    "pages",
    "layouts",
    "screens",
    "ui",
];

/// Directories whose children are components rather than the directory itself.
const COMPONENT_CONTAINERS: &[&str] = &["modules", "features", "domains", "apps", "packages", "services"];

const LAYERED_MIN_CONSISTENCY: f32 = 0.7;
const COMPONENT_MIN_COUNT: usize = 3;
const COMPONENT_MIN_KINDS: usize = 2;
const COMPONENT_MIN_SHARE: f32 = 0.5;
const MONOLITHIC_MIN_BASE_SHARE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerKind {
    Route,
    Model,
    View,
}

impl LayerKind {
    fn as_str(self) -> &'static str {
        match self {
            LayerKind::Route => "route",
            LayerKind::Model => "model",
            LayerKind::View => "view",
        }
    }
}

/// Architecture verdict plus the layout facts the diagram builder reuses.
#[derive(Debug, Clone)]
pub struct ArchitectureReport {
    pub pattern: ArchitecturePattern,
    /// Wrapper directory the top level is measured under; empty for the tree root.
    pub base: String,
    /// Component directories (root-relative), set only for ComponentBased.
    pub components: Vec<String>,
    pub warnings: Vec<Warning>,
}

fn is_named(dir: &str, names: &[&str]) -> bool {
    let lowered = dir.to_ascii_lowercase();
    names.iter().any(|name| *name == lowered)
}

fn is_layer_dir(dir: &str) -> bool {
    is_named(dir, ROUTE_LAYER_DIRS) || is_named(dir, MODEL_LAYER_DIRS) || is_named(dir, VIEW_LAYER_DIRS)
}

/// Layer a file belongs to, if any.
pub fn layer_kind(file: &ScannedFile) -> Option<LayerKind> {
    match file.role() {
        Role::Route => return Some(LayerKind::Route),
        Role::Model => return Some(LayerKind::Model),
        Role::Test | Role::Build | Role::Config => return None,
        _ => {}
    }
    let language = file.language();
    if language.is_view() {
        return Some(LayerKind::View);
    }
    let in_view_dir = dir_segments(file.path())
        .any(|segment| is_named(segment, VIEW_LAYER_DIRS));
    (language.is_source() && in_view_dir).then_some(LayerKind::View)
}

/// Wrapper holding at least half of the role-bearing files, or empty for the root.
pub fn layout_base(bearing: &[(&str, LayerKind)]) -> String {
    if bearing.is_empty() {
        return String::new();
    }
    let mut best: Option<(&str, usize)> = None;
    for wrapper in WRAPPER_DIRS {
        let count = bearing
            .iter()
            .filter(|(path, _)| path.split('/').next() == Some(*wrapper) && path.contains('/'))
            .count();
        if count * 2 >= bearing.len() && best.map_or(true, |(_, c)| count > c) {
            best = Some((*wrapper, count));
        }
    }
    best.map(|(wrapper, _)| wrapper.to_string())
        .unwrap_or_default()
}

/// Path relative to the layout base, or `None` when the file lives outside it.
pub fn relative_to_base<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    if base.is_empty() {
        return Some(path);
    }
    path.strip_prefix(base)?.strip_prefix('/')
}

/// First directory below the base, or `None` for files sitting directly in it.
pub fn top_dir<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    let rel = relative_to_base(base, path)?;
    rel.split_once('/').map(|(dir, _)| dir)
}

fn join_base(base: &str, dir: &str) -> String {
    if base.is_empty() {
        dir.to_string()
    } else {
        format!("{base}/{dir}")
    }
}

struct RuleOutcome {
    matched: bool,
    score: f32,
}

pub fn classify_architecture(files: &[ScannedFile]) -> ArchitectureReport {
    let bearing: Vec<(&str, LayerKind)> = files
        .iter()
        .filter_map(|file| layer_kind(file).map(|kind| (file.path(), kind)))
        .collect();
    let base = layout_base(&bearing);
    let mut evidence = Vec::new();
    if !base.is_empty() {
        evidence.push(format!("layout base {base}/ holds most role-bearing files"));
    }

    let layered = layered_rule(&base, &bearing, &mut evidence);
    if layered.matched {
        return report(ArchitectureKind::LayeredMvc, layered.score, base, Vec::new(), evidence);
    }

    let (component, components) = component_rule(&base, &bearing, &mut evidence);
    if component.matched {
        return report(ArchitectureKind::ComponentBased, component.score, base, components, evidence);
    }

    let monolithic = monolithic_rule(&base, files, &mut evidence);
    if monolithic.matched {
        return report(ArchitectureKind::Monolithic, monolithic.score, base, Vec::new(), evidence);
    }

    let best = layered.score.max(component.score).max(monolithic.score);
    let mut result = report(ArchitectureKind::Unknown, best, base, Vec::new(), evidence);
    result.warnings.push(Warning::low_confidence(format!(
        "architecture: no pattern matched (best partial score {:.3})",
        result.pattern.confidence
    )));
    result
}

fn report(
    name: ArchitectureKind,
    score: f32,
    base: String,
    components: Vec<String>,
    evidence: Vec<String>,
) -> ArchitectureReport {
    log::debug!("Architecture: {name} ({score:.3})");
    ArchitectureReport {
        pattern: ArchitecturePattern {
            name,
            confidence: round_score(score.clamp(0.0, 1.0)),
            evidence,
        },
        base,
        components,
        warnings: Vec::new(),
    }
}

fn layered_rule(base: &str, bearing: &[(&str, LayerKind)], evidence: &mut Vec<String>) -> RuleOutcome {
    let mut layer_dirs: BTreeMap<(LayerKind, &str), usize> = BTreeMap::new();
    for (path, _) in bearing {
        let Some(dir) = top_dir(base, path) else {
            continue;
        };
        let layer = if is_named(dir, ROUTE_LAYER_DIRS) {
            LayerKind::Route
        } else if is_named(dir, MODEL_LAYER_DIRS) {
            LayerKind::Model
        } else if is_named(dir, VIEW_LAYER_DIRS) {
            LayerKind::View
        } else {
            continue;
        };
        *layer_dirs.entry((layer, dir)).or_default() += 1;
    }

    for ((layer, dir), count) in &layer_dirs {
        evidence.push(format!(
            "{} layer directory {} ({count} files)",
            layer.as_str(),
            join_base(base, dir)
        ));
    }

    let has_layer = |kind: LayerKind| layer_dirs.keys().any(|(layer, _)| *layer == kind);
    if !has_layer(LayerKind::Route) || !has_layer(LayerKind::Model) {
        evidence.push("no distinct route and model layer directories".to_string());
        return RuleOutcome {
            matched: false,
            score: 0.0,
        };
    }

    let mut total = 0usize;
    let mut consistent = 0usize;
    for (path, kind) in bearing {
        let names = match kind {
            LayerKind::Route => ROUTE_LAYER_DIRS,
            LayerKind::Model => MODEL_LAYER_DIRS,
            LayerKind::View => continue,
        };
        total += 1;
        if dir_segments(path).any(|segment| is_named(segment, names)) {
            consistent += 1;
        }
    }
    let consistency = if total == 0 {
        0.0
    } else {
        consistent as f32 / total as f32
    };
    evidence.push(format!(
        "role-to-directory consistency {consistency:.2} ({consistent} of {total} route/model files)"
    ));
    RuleOutcome {
        matched: consistency >= LAYERED_MIN_CONSISTENCY,
        score: consistency,
    }
}

fn component_dir(base: &str, path: &str) -> Option<String> {
    let rel = relative_to_base(base, path)?;
    let mut parts = rel.split('/');
    let first = parts.next()?;
    // The last part is the file name, so a component needs at least one more segment.
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() || is_layer_dir(first) {
        return None;
    }
    if is_named(first, COMPONENT_CONTAINERS) {
        if rest.len() < 2 {
            return None;
        }
        return Some(join_base(base, &format!("{first}/{}", rest[0])));
    }
    Some(join_base(base, first))
}

fn component_rule(
    base: &str,
    bearing: &[(&str, LayerKind)],
    evidence: &mut Vec<String>,
) -> (RuleOutcome, Vec<String>) {
    let mut owned: BTreeMap<String, (BTreeSet<LayerKind>, usize)> = BTreeMap::new();
    for (path, kind) in bearing {
        if let Some(dir) = component_dir(base, path) {
            let entry = owned.entry(dir).or_default();
            entry.0.insert(*kind);
            entry.1 += 1;
        }
    }

    let qualifying: Vec<(&String, &(BTreeSet<LayerKind>, usize))> = owned
        .iter()
        .filter(|(_, (kinds, _))| kinds.len() >= COMPONENT_MIN_KINDS)
        .collect();
    for (dir, (kinds, count)) in &qualifying {
        let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
        evidence.push(format!(
            "component {dir} owns {} ({count} files)",
            kinds.join(", ")
        ));
    }

    let held: usize = qualifying.iter().map(|(_, (_, count))| *count).sum();
    let share = if bearing.is_empty() {
        0.0
    } else {
        held as f32 / bearing.len() as f32
    };
    if qualifying.is_empty() {
        evidence.push("no self-contained component directories".to_string());
    } else {
        evidence.push(format!(
            "{} component directories hold {:.0}% of role-bearing files",
            qualifying.len(),
            share * 100.0
        ));
    }

    let matched = qualifying.len() >= COMPONENT_MIN_COUNT && share >= COMPONENT_MIN_SHARE;
    let components = if matched {
        qualifying.iter().map(|(dir, _)| (*dir).clone()).collect()
    } else {
        Vec::new()
    };
    (
        RuleOutcome {
            matched,
            score: share,
        },
        components,
    )
}

fn monolithic_rule(base: &str, files: &[ScannedFile], evidence: &mut Vec<String>) -> RuleOutcome {
    let sources: Vec<&ScannedFile> = files
        .iter()
        .filter(|f| f.language().is_source() && f.role() != Role::Test)
        .collect();
    if sources.is_empty() {
        evidence.push("no source files".to_string());
        return RuleOutcome {
            matched: false,
            score: 0.0,
        };
    }

    let role_dirs: BTreeSet<&str> = sources
        .iter()
        .filter_map(|f| top_dir(base, f.path()))
        .filter(|dir| is_layer_dir(dir))
        .collect();
    let at_base = sources
        .iter()
        .filter(|f| relative_to_base(base, f.path()).is_some_and(|rel| !rel.contains('/')))
        .count();
    let share = at_base as f32 / sources.len() as f32;
    let level = if base.is_empty() {
        "the top level".to_string()
    } else {
        format!("{base}/")
    };
    evidence.push(format!(
        "{at_base} of {} source files at {level}",
        sources.len()
    ));

    if !role_dirs.is_empty() {
        let dirs: Vec<&str> = role_dirs.into_iter().collect();
        evidence.push(format!("role-specific directories present: {}", dirs.join(", ")));
        return RuleOutcome {
            matched: false,
            score: 0.0,
        };
    }

    RuleOutcome {
        matched: share >= MONOLITHIC_MIN_BASE_SHARE,
        score: share,
    }
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
    fn routes_and_models_under_src_are_layered() {
        let files = vec![
            scanned("src/routes/items.ts", "export {}"),
            scanned("src/routes/users.ts", "export {}"),
            scanned("src/models/item.ts", "export {}"),
            scanned("src/models/user.ts", "export {}"),
            scanned("src/views/home.html", "<p/>"),
            scanned("src/index.ts", "export {}"),
        ];
        let report = classify_architecture(&files);
        assert_eq!(report.pattern.name, ArchitectureKind::LayeredMvc);
        assert_eq!(report.base, "src");
        assert_eq!(report.pattern.confidence, 1.0);
        assert_eq!(
            report.pattern.evidence,
            vec![
                "layout base src/ holds most role-bearing files".to_string(),
                "route layer directory src/routes (2 files)".to_string(),
                "model layer directory src/models (2 files)".to_string(),
                "view layer directory src/views (1 files)".to_string(),
                "role-to-directory consistency 1.00 (4 of 4 route/model files)".to_string(),
            ]
        );
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn feature_directories_are_component_based() {
        let mut files = Vec::new();
        for feature in ["users", "orders", "billing"] {
            files.push(scanned(
                &format!("src/{feature}/{feature}.routes.ts"),
                "router.get('/x', h)",
            ));
            files.push(scanned(
                &format!("src/{feature}/{feature}.model.ts"),
                "@Entity()\nexport class X {}",
            ));
        }
        let report = classify_architecture(&files);
        assert_eq!(report.pattern.name, ArchitectureKind::ComponentBased);
        assert_eq!(
            report.components,
            vec!["src/billing", "src/orders", "src/users"]
        );
        assert_eq!(report.pattern.confidence, 1.0);
    }

    #[test]
    fn flat_tree_is_monolithic() {
        let files = vec![
            scanned("app.py", "print(1)"),
            scanned("utils.py", "x = 1"),
            scanned("db.py", "x = 2"),
            scanned("helpers/strings.py", "x = 3"),
            scanned("requirements.txt", "flask"),
        ];
        let report = classify_architecture(&files);
        assert_eq!(report.pattern.name, ArchitectureKind::Monolithic);
        assert_eq!(report.pattern.confidence, 0.75);
        assert_eq!(
            report.pattern.evidence.last().map(String::as_str),
            Some("3 of 4 source files at the top level")
        );
    }

    #[test]
    fn ambiguous_layout_is_unknown_with_warning() {
        let files = vec![
            scanned("pkg/a/one.go", "package a"),
            scanned("pkg/b/two.go", "package b"),
            scanned("cmd/tool/main.go", "package main"),
        ];
        let report = classify_architecture(&files);
        assert_eq!(report.pattern.name, ArchitectureKind::Unknown);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::LowConfidenceDetection);
        assert!(!report.pattern.evidence.is_empty());
    }

    #[test]
    fn base_and_top_dir_helpers() {
        assert_eq!(relative_to_base("src", "src/routes/a.ts"), Some("routes/a.ts"));
        assert_eq!(relative_to_base("src", "srcx/a.ts"), None);
        assert_eq!(top_dir("", "routes/a.ts"), Some("routes"));
        assert_eq!(top_dir("", "main.ts"), None);
    }
}
