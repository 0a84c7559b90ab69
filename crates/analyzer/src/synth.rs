//! Assembles the aggregate record from the outputs of every upstream phase.

use recon_detect::{ArchitectureReport, StackDetection};
use recon_extract::{RouteExtraction, SchemaExtraction};
use recon_graph::build_diagram;
use recon_protocol::{
    AnalysisDepth, AnalysisMeta, AnalysisResult, Endpoint, EntryPoint, MetricsSummary,
    SchemaEntity, RECORD_SCHEMA_VERSION, TOOL_NAME,
};
use recon_scanner::ScanOutput;

/// Entities named individually in the inferred feature list.
const FEATURED_ENTITIES: usize = 3;

/// Features listed when extraction ran but no rule matched.
const DEFAULT_FEATURES: &[&str] = &["Data management", "API endpoints", "Business logic"];

/// Everything the phases before the barrier produced; sections not run at the chosen depth are `None`.
pub struct Upstream<'a> {
    pub scan: &'a ScanOutput,
    pub stack: StackDetection,
    pub entry_points: Vec<EntryPoint>,
    pub architecture: Option<ArchitectureReport>,
    pub metrics: Option<MetricsSummary>,
    pub routes: Option<RouteExtraction>,
    pub schema: Option<SchemaExtraction>,
}

/// Name a tree is reported under: its directory name, or `"source"` for a bare root.
pub fn source_name(scan: &ScanOutput) -> String {
    scan.root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "source".to_string())
}

/// Feature list inferred from the API surface and the persisted entities.
pub fn infer_features(endpoints: &[Endpoint], entities: &[SchemaEntity]) -> Vec<String> {
    let mut features = Vec::new();
    let paths: Vec<String> = endpoints.iter().map(|e| e.path.to_ascii_lowercase()).collect();

    let auth_paths = paths.iter().any(|p| p.contains("auth") || p.contains("login"));
    if auth_paths || endpoints.iter().any(|e| e.auth_required) {
        features.push("User authentication system".to_string());
    }
    let user_entity = entities.iter().any(|e| e.name.eq_ignore_ascii_case("user"));
    if user_entity || paths.iter().any(|p| p.contains("user")) {
        features.push("User management".to_string());
    }
    if paths.iter().any(|p| p.starts_with("/api/")) {
        features.push("RESTful API".to_string());
    }
    for entity in entities.iter().take(FEATURED_ENTITIES) {
        features.push(format!("{} data management", entity.name));
    }

    if features.is_empty() {
        features = DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect();
    }
    features
}

/// Builds the immutable record by value. The diagram is derived here because it needs the
/// architecture layout and the scanned files together.
pub fn synthesize(depth: AnalysisDepth, upstream: Upstream<'_>) -> AnalysisResult {
    let Upstream {
        scan,
        stack,
        entry_points,
        architecture,
        metrics,
        routes,
        schema,
    } = upstream;

    let mut warnings = scan.warnings.clone();
    warnings.extend(stack.warnings);

    let diagram = match (&architecture, depth.runs_extraction()) {
        (Some(report), true) => Some(build_diagram(&scan.files, report)),
        _ => None,
    };
    let architecture_pattern = architecture.map(|report| {
        warnings.extend(report.warnings);
        report.pattern
    });

    let endpoints = routes
        .map(|routes| {
            warnings.extend(routes.warnings);
            routes.endpoints
        })
        .unwrap_or_default();
    let schema_entities = schema
        .map(|schema| {
            warnings.extend(schema.warnings);
            schema.entities
        })
        .unwrap_or_default();

    let inferred_features = if depth.runs_extraction() {
        infer_features(&endpoints, &schema_entities)
    } else {
        Vec::new()
    };

    warnings.sort();
    warnings.dedup();

    AnalysisResult {
        meta: AnalysisMeta {
            tool: TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: RECORD_SCHEMA_VERSION,
            source_name: source_name(scan),
            depth,
            fingerprint: scan.fingerprint.clone(),
        },
        stack_profile: stack.profile,
        architecture_pattern,
        endpoints,
        schema_entities,
        metrics,
        file_records: scan.records(),
        dependencies: stack.dependencies,
        entry_points,
        inferred_features,
        diagram,
        warnings,
    }
}
