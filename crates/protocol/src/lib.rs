//! Shared data model for recon.
//!
//! Every type here is part of the structured analysis record (`analysis.json`). Downstream
//! consumers read that record as their input specification, so field names are stable
//! camelCase and unknown detections are explicit `"Unknown"` values rather than omissions.

use anyhow::Result;
use serde::Serialize;

pub mod language;
pub mod model;
pub mod paths;
pub mod warning;

pub use language::Language;
pub use model::{
    AnalysisDepth, AnalysisMeta, AnalysisResult, ArchitectureKind, ArchitecturePattern,
    DependencyDiagram, DependencyInventory, DiagramEdge, DiagramNode, Endpoint, EntryPoint,
    FieldType, FileRecord, HandlerRef, LayerDetection, ManifestDependencies, MetricsSummary,
    Relation, RelationKind, Role, SchemaEntity, SchemaField, StackLayer, StackProfile,
    UNKNOWN_IDENTITY,
};
pub use warning::{Warning, WarningKind};

/// Bumped whenever the structured record changes shape.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

pub const TOOL_NAME: &str = "recon";

/// JSON Schema of the structured record, for consumers that validate their input.
pub fn record_json_schema() -> Result<serde_json::Value> {
    let schema = schemars::schema_for!(AnalysisResult);
    serde_json::to_value(schema).map_err(Into::into)
}

/// Pretty JSON with a trailing newline; the byte layout is stable for identical values.
pub fn serialize_record<T: Serialize>(value: &T) -> Result<String> {
    let mut raw = serde_json::to_string_pretty(value)?;
    raw.push('\n');
    Ok(raw)
}

/// Rounds a score to three decimals so serialized confidences stay readable and stable.
pub fn round_score(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_describes_record_sections() {
        let schema = record_json_schema().unwrap();
        let text = schema.to_string();
        for key in ["stackProfile", "fileRecords", "schemaEntities", "warnings"] {
            assert!(text.contains(key), "schema should mention {key}");
        }
    }

    #[test]
    fn round_score_keeps_three_decimals() {
        assert_eq!(round_score(0.70000005), 0.7);
        assert_eq!(round_score(1.0), 1.0);
        assert_eq!(round_score(0.12345), 0.123);
    }
}
