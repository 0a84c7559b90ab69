use recon_protocol::{Language, MetricsSummary, Role};
use recon_scanner::ScannedFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weights of the complexity heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsWeights {
    /// Added per branching keyword or operator.
    pub branch_weight: f64,
    /// Added per hundred lines.
    pub size_weight: f64,
    pub max_score: f64,
}

impl Default for MetricsWeights {
    fn default() -> Self {
        Self {
            branch_weight: 1.0,
            size_weight: 0.5,
            max_score: 100.0,
        }
    }
}

impl MetricsWeights {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("branchWeight", self.branch_weight),
            ("sizeWeight", self.size_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("metrics {name} must be a non-negative number, got {value}"));
            }
        }
        if !self.max_score.is_finite() || self.max_score <= 0.0 {
            return Err(format!(
                "metrics maxScore must be positive, got {}",
                self.max_score
            ));
        }
        Ok(())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_comment(line: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| line.starts_with(prefix))
}

/// Branch points on one line: whole-word keywords plus operator occurrences.
fn count_branches(line: &str, keywords: &[&str]) -> usize {
    let mut count = 0;
    for keyword in keywords {
        if keyword.chars().all(|c| c.is_ascii_alphabetic()) {
            count += line
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .filter(|word| word == keyword)
                .count();
        } else {
            count += line.matches(keyword).count();
        }
    }
    count
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct LineStats {
    blank: usize,
    comment: usize,
    branches: usize,
}

fn line_stats(language: Language, text: &str) -> LineStats {
    let prefixes = language.comment_prefixes();
    let keywords = language.branch_keywords();
    let mut stats = LineStats::default();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            stats.blank += 1;
        } else if is_comment(trimmed, prefixes) {
            stats.comment += 1;
        } else {
            stats.branches += count_branches(trimmed, keywords);
        }
    }
    stats
}

/// Project metrics over classified files.
///
/// `complexity_score` averages `branch_weight * branches + size_weight * lines / 100` over every
/// scanned file and clamps it to `max_score`. It is a comparison aid, not a cyclomatic count.
pub fn compute_metrics(files: &[ScannedFile], weights: &MetricsWeights) -> MetricsSummary {
    let file_count = files.len();
    let mut total_loc = 0usize;
    let mut blank_lines = 0usize;
    let mut comment_lines = 0usize;
    let mut complexity_sum = 0.0f64;
    let mut files_by_language: BTreeMap<String, usize> = BTreeMap::new();
    let mut files_by_role: BTreeMap<String, usize> = BTreeMap::new();

    for file in files {
        *files_by_language
            .entry(file.language().display_name().to_string())
            .or_default() += 1;
        *files_by_role.entry(file.role().as_str().to_string()).or_default() += 1;

        if file.role() == Role::Other && !file.language().is_source() {
            continue;
        }
        if file.role() != Role::Other {
            total_loc += file.record.line_count;
        }

        let Some(text) = file.text() else {
            continue;
        };
        let stats = line_stats(file.language(), text);
        blank_lines += stats.blank;
        comment_lines += stats.comment;
        if file.language().is_source() || file.language().is_schema() {
            complexity_sum += weights.branch_weight * stats.branches as f64
                + weights.size_weight * file.record.line_count as f64 / 100.0;
        }
    }

    let (average_file_size, complexity_score) = if file_count == 0 {
        (0.0, 0.0)
    } else {
        (
            round2(total_loc as f64 / file_count as f64),
            round2((complexity_sum / file_count as f64).min(weights.max_score)),
        )
    };
    log::debug!("Metrics: {total_loc} loc over {file_count} files, complexity {complexity_score}");

    MetricsSummary {
        total_loc,
        file_count,
        average_file_size,
        complexity_score,
        blank_lines,
        comment_lines,
        files_by_language,
        files_by_role,
    }
}
