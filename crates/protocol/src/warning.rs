use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-fatal conditions accumulated during a run.
///
/// Acquisition failures are not listed here: they abort the run before any record exists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum WarningKind {
    FileUnreadable,
    LowConfidenceDetection,
    PartialExtraction,
    UnresolvedRelationReference,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::FileUnreadable => "FileUnreadable",
            WarningKind::LowConfidenceDetection => "LowConfidenceDetection",
            WarningKind::PartialExtraction => "PartialExtraction",
            WarningKind::UnresolvedRelationReference => "UnresolvedRelationReference",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Field order matters: the derived `Ord` sorts by kind, then file, then message.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub kind: WarningKind,
    pub file: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, file: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            file,
            message: message.into(),
        }
    }

    pub fn file_unreadable(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(WarningKind::FileUnreadable, Some(file.into()), message)
    }

    pub fn low_confidence(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LowConfidenceDetection, None, message)
    }

    pub fn partial_extraction(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(WarningKind::PartialExtraction, Some(file.into()), message)
    }

    pub fn unresolved_relation(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            WarningKind::UnresolvedRelationReference,
            Some(file.into()),
            message,
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "[{}] {file}: {}", self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_sort_by_kind_then_file() {
        let mut warnings = vec![
            Warning::unresolved_relation("models/item.ts", "userId"),
            Warning::file_unreadable("b.png", "binary content"),
            Warning::file_unreadable("a.png", "binary content"),
            Warning::low_confidence("frontend"),
        ];
        warnings.sort();
        let files: Vec<_> = warnings.iter().map(|w| w.file.as_deref()).collect();
        assert_eq!(
            files,
            vec![Some("a.png"), Some("b.png"), None, Some("models/item.ts")]
        );
    }

    #[test]
    fn display_includes_kind_and_file() {
        let warning = Warning::partial_extraction("routes/x.js", "no known route idiom");
        assert_eq!(
            warning.to_string(),
            "[PartialExtraction] routes/x.js: no known route idiom"
        );
    }
}
