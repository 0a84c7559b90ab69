use crate::language::Language;
use crate::warning::Warning;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identity reported for a layer or pattern whose evidence stays below threshold.
pub const UNKNOWN_IDENTITY: &str = "Unknown";

/// Functional classification of a scanned file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum Role {
    Route,
    Model,
    Config,
    Build,
    Test,
    Asset,
    Other,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Route,
        Role::Model,
        Role::Config,
        Role::Build,
        Role::Test,
        Role::Asset,
        Role::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Route => "Route",
            Role::Model => "Model",
            Role::Config => "Config",
            Role::Build => "Build",
            Role::Test => "Test",
            Role::Asset => "Asset",
            Role::Other => "Other",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scanned regular file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Root-relative, `/`-separated path.
    pub path: String,
    pub role: Role,
    pub language: Language,
    /// Zero for binary or unreadable files.
    pub line_count: usize,
}

/// How much of the pipeline runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    /// File classification and stack detection.
    Quick,
    /// Adds architecture classification and metrics.
    Full,
    /// Adds endpoint and schema extraction plus the dependency diagram.
    Deep,
}

impl AnalysisDepth {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisDepth::Quick => "quick",
            AnalysisDepth::Full => "full",
            AnalysisDepth::Deep => "deep",
        }
    }

    pub fn runs_architecture(self) -> bool {
        self >= AnalysisDepth::Full
    }

    pub fn runs_metrics(self) -> bool {
        self >= AnalysisDepth::Full
    }

    pub fn runs_extraction(self) -> bool {
        self >= AnalysisDepth::Deep
    }
}

impl Default for AnalysisDepth {
    fn default() -> Self {
        Self::Full
    }
}

impl fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisDepth {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "full" => Ok(Self::Full),
            "deep" => Ok(Self::Deep),
            other => Err(format!(
                "unknown analysis depth '{other}' (expected quick, full or deep)"
            )),
        }
    }
}

/// Independently detected technology layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StackLayer {
    Frontend,
    Backend,
    Database,
    BuildTool,
}

impl StackLayer {
    pub const ALL: [StackLayer; 4] = [
        StackLayer::Frontend,
        StackLayer::Backend,
        StackLayer::Database,
        StackLayer::BuildTool,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StackLayer::Frontend => "frontend",
            StackLayer::Backend => "backend",
            StackLayer::Database => "database",
            StackLayer::BuildTool => "buildTool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayerDetection {
    /// Detected identity, or `"Unknown"` when the best match is below threshold.
    pub identity: String,
    /// Normalized score in `[0, 1]`.
    pub confidence: f32,
    /// Best below-threshold identity, kept for Unknown layers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    /// Matched signatures, in signature declaration order.
    pub evidence: Vec<String>,
}

impl LayerDetection {
    pub fn detected(identity: impl Into<String>, confidence: f32, evidence: Vec<String>) -> Self {
        Self {
            identity: identity.into(),
            confidence,
            candidate: None,
            evidence,
        }
    }

    pub fn unknown(confidence: f32, candidate: Option<String>, evidence: Vec<String>) -> Self {
        Self {
            identity: UNKNOWN_IDENTITY.to_string(),
            confidence,
            candidate,
            evidence,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.identity == UNKNOWN_IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StackProfile {
    pub frontend: LayerDetection,
    pub backend: LayerDetection,
    pub database: LayerDetection,
    pub build_tool: LayerDetection,
    pub primary_language: String,
}

impl StackProfile {
    pub fn layer(&self, layer: StackLayer) -> &LayerDetection {
        match layer {
            StackLayer::Frontend => &self.frontend,
            StackLayer::Backend => &self.backend,
            StackLayer::Database => &self.database,
            StackLayer::BuildTool => &self.build_tool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ArchitectureKind {
    #[serde(rename = "LayeredMVC")]
    LayeredMvc,
    ComponentBased,
    Monolithic,
    Unknown,
}

impl ArchitectureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchitectureKind::LayeredMvc => "LayeredMVC",
            ArchitectureKind::ComponentBased => "ComponentBased",
            ArchitectureKind::Monolithic => "Monolithic",
            ArchitectureKind::Unknown => UNKNOWN_IDENTITY,
        }
    }
}

impl fmt::Display for ArchitectureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchitecturePattern {
    pub name: ArchitectureKind,
    pub confidence: f32,
    /// Observations in the order the rules evaluated them.
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRef {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{}#{symbol}", self.file),
            None => f.write_str(&self.file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Upper-case HTTP verb, or `ANY` for declarations that accept every verb.
    pub method: String,
    /// Route pattern exactly as declared.
    pub path: String,
    pub handler_ref: HandlerRef,
    pub auth_required: bool,
    /// 1-based line of the declaration.
    pub line: usize,
    /// Declaration idiom that produced this endpoint.
    pub idiom: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Identifier,
    Relation,
    Unknown,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Identifier => "identifier",
            FieldType::Relation => "relation",
            FieldType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub nullable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::OneToOne => "one-to-one",
            RelationKind::OneToMany => "one-to-many",
            RelationKind::ManyToMany => "many-to-many",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Field that carries the relation.
    pub field: String,
    /// Resolved entity name; `null` when no extracted entity matches.
    pub target_entity: Option<String>,
    pub kind: RelationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEntity {
    pub name: String,
    pub file: String,
    pub fields: Vec<SchemaField>,
    pub relations: Vec<Relation>,
}

/// Project-level metrics.
///
/// `complexity_score` is a bounded heuristic built from branching-keyword density and file
/// size. It is meant for comparing projects against each other and is not a cyclomatic count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_loc: usize,
    pub file_count: usize,
    pub average_file_size: f64,
    pub complexity_score: f64,
    pub blank_lines: usize,
    pub comment_lines: usize,
    pub files_by_language: BTreeMap<String, usize>,
    pub files_by_role: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDependencies {
    pub file: String,
    pub ecosystem: String,
    pub production: Vec<String>,
    pub development: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyInventory {
    pub manifests: Vec<ManifestDependencies>,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub file: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagramNode {
    /// Root-relative directory, `.` for files at the root.
    pub id: String,
    pub label: String,
    pub roles: Vec<Role>,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
    /// Number of import statements observed along this edge.
    pub weight: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDiagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMeta {
    pub tool: String,
    pub version: String,
    pub schema_version: u32,
    pub source_name: String,
    pub depth: AnalysisDepth,
    /// SHA-256 over the sorted paths and bytes of every scanned file.
    pub fingerprint: String,
}

/// Aggregate root of one analysis run; the structured record is its JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub meta: AnalysisMeta,
    pub stack_profile: StackProfile,
    pub architecture_pattern: Option<ArchitecturePattern>,
    pub endpoints: Vec<Endpoint>,
    pub schema_entities: Vec<SchemaEntity>,
    pub metrics: Option<MetricsSummary>,
    pub file_records: Vec<FileRecord>,
    pub dependencies: DependencyInventory,
    pub entry_points: Vec<EntryPoint>,
    pub inferred_features: Vec<String>,
    pub diagram: Option<DependencyDiagram>,
    pub warnings: Vec<Warning>,
}
