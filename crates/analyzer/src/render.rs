//! Reconstructed specification document: a pure Markdown rendering of one record.

use recon_graph::{render_mermaid, ModuleGraph};
use recon_protocol::{
    AnalysisResult, Language, LayerDetection, Relation, Role, SchemaEntity, StackLayer,
};
use std::collections::BTreeMap;

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// `12345` -> `12,345`
fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `my-shop_api` -> `My Shop Api`
fn title_case(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn not_computed(md: &mut String, result: &AnalysisResult) {
    md.push_str(&format!(
        "_Not computed at `{}` depth._\n\n",
        result.meta.depth
    ));
}

fn layer_cell(detection: &LayerDetection) -> String {
    match (&detection.candidate, detection.is_unknown()) {
        (Some(candidate), true) => format!("Unknown (best guess: {candidate})"),
        _ => detection.identity.clone(),
    }
}

fn render_stack(md: &mut String, result: &AnalysisResult) {
    let stack = &result.stack_profile;
    md.push_str("## Technology Stack\n\n");
    md.push_str(&format!("- Primary language: **{}**\n\n", stack.primary_language));
    md.push_str("| Layer | Detected | Confidence | Evidence |\n");
    md.push_str("|---|---|---:|---|\n");
    for layer in StackLayer::ALL {
        let detection = stack.layer(layer);
        let evidence = if detection.evidence.is_empty() {
            "-".to_string()
        } else {
            escape_cell(&detection.evidence.join("; "))
        };
        md.push_str(&format!(
            "| {} | {} | {:.2} | {} |\n",
            layer.as_str(),
            escape_cell(&layer_cell(detection)),
            detection.confidence,
            evidence
        ));
    }
    md.push('\n');
}

fn render_architecture(md: &mut String, result: &AnalysisResult) {
    md.push_str("## Architecture\n\n");
    match &result.architecture_pattern {
        Some(pattern) => {
            md.push_str(&format!(
                "**Pattern:** {} (confidence {:.2})\n\n",
                pattern.name, pattern.confidence
            ));
            if !pattern.evidence.is_empty() {
                md.push_str("Evidence:\n\n");
                for item in &pattern.evidence {
                    md.push_str(&format!("- {item}\n"));
                }
                md.push('\n');
            }
        }
        None => not_computed(md, result),
    }

    md.push_str("### Entry Points\n\n");
    if result.entry_points.is_empty() {
        md.push_str("No entry points detected.\n\n");
    } else {
        for entry in &result.entry_points {
            md.push_str(&format!("- `{}` ({})\n", entry.file, entry.kind));
        }
        md.push('\n');
    }
}

fn render_features(md: &mut String, result: &AnalysisResult) {
    md.push_str("## Inferred Features\n\n");
    if result.inferred_features.is_empty() {
        not_computed(md, result);
        return;
    }
    for feature in &result.inferred_features {
        md.push_str(&format!("- {feature}\n"));
    }
    md.push('\n');
}

fn render_api(md: &mut String, result: &AnalysisResult) {
    md.push_str(&format!("## API Surface ({} endpoints)\n\n", result.endpoints.len()));
    if !result.meta.depth.runs_extraction() {
        not_computed(md, result);
        return;
    }
    if result.endpoints.is_empty() {
        md.push_str("No API endpoints detected.\n\n");
        return;
    }

    let mut by_method: BTreeMap<&str, usize> = BTreeMap::new();
    for endpoint in &result.endpoints {
        *by_method.entry(endpoint.method.as_str()).or_default() += 1;
    }
    let summary: Vec<String> = by_method
        .iter()
        .map(|(method, count)| format!("{method} {count}"))
        .collect();
    md.push_str(&format!("By method: {}\n\n", summary.join(", ")));

    md.push_str("| Method | Path | Handler | Auth |\n");
    md.push_str("|---|---|---|---|\n");
    for endpoint in &result.endpoints {
        md.push_str(&format!(
            "| {} | `{}` | `{}:{}` | {} |\n",
            endpoint.method,
            escape_cell(&endpoint.path),
            escape_cell(&endpoint.handler_ref.to_string()),
            endpoint.line,
            if endpoint.auth_required { "yes" } else { "no" }
        ));
    }
    md.push('\n');
}

fn field_summary(entity: &SchemaEntity) -> String {
    entity
        .fields
        .iter()
        .map(|field| {
            let optional = if field.nullable { "?" } else { "" };
            format!("{}{optional}: {}", field.name, field.field_type.as_str())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_schema(md: &mut String, result: &AnalysisResult) {
    md.push_str(&format!(
        "## Data Schema ({} entities)\n\n",
        result.schema_entities.len()
    ));
    if !result.meta.depth.runs_extraction() {
        not_computed(md, result);
        return;
    }
    if result.schema_entities.is_empty() {
        md.push_str("No persisted entities detected.\n\n");
        return;
    }

    md.push_str("| Entity | File | Fields |\n");
    md.push_str("|---|---|---|\n");
    for entity in &result.schema_entities {
        md.push_str(&format!(
            "| {} | `{}` | {} |\n",
            entity.name,
            entity.file,
            escape_cell(&field_summary(entity))
        ));
    }
    md.push('\n');

    let relations: Vec<(&SchemaEntity, &Relation)> = result
        .schema_entities
        .iter()
        .flat_map(|entity| entity.relations.iter().map(move |relation| (entity, relation)))
        .collect();
    if relations.is_empty() {
        return;
    }
    md.push_str("### Relations\n\n");
    md.push_str("| From | Field | Kind | To |\n");
    md.push_str("|---|---|---|---|\n");
    for (entity, relation) in relations {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            entity.name,
            relation.field,
            relation.kind.as_str(),
            relation.target_entity.as_deref().unwrap_or("_unresolved_")
        ));
    }
    md.push('\n');
}

fn render_metrics(md: &mut String, result: &AnalysisResult) {
    md.push_str("## Code Metrics\n\n");
    let Some(metrics) = &result.metrics else {
        not_computed(md, result);
        return;
    };
    md.push_str("| Metric | Value |\n");
    md.push_str("|---|---:|\n");
    md.push_str(&format!("| Files | {} |\n", group_thousands(metrics.file_count)));
    md.push_str(&format!("| Lines of code | {} |\n", group_thousands(metrics.total_loc)));
    md.push_str(&format!("| Blank lines | {} |\n", group_thousands(metrics.blank_lines)));
    md.push_str(&format!(
        "| Comment lines | {} |\n",
        group_thousands(metrics.comment_lines)
    ));
    md.push_str(&format!("| Average file size | {:.2} |\n", metrics.average_file_size));
    md.push_str(&format!(
        "| Complexity score (heuristic) | {:.2} |\n\n",
        metrics.complexity_score
    ));

    let mut languages: Vec<(&String, &usize)> = metrics.files_by_language.iter().collect();
    languages.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    md.push_str("### Files by Language\n\n");
    for (language, count) in languages {
        md.push_str(&format!("- {language}: {count}\n"));
    }
    md.push_str("\n### Files by Role\n\n");
    for role in Role::ALL {
        if let Some(count) = metrics.files_by_role.get(role.as_str()) {
            md.push_str(&format!("- {role}: {count}\n"));
        }
    }
    md.push('\n');
}

fn render_dependencies(md: &mut String, result: &AnalysisResult) {
    let deps = &result.dependencies;
    md.push_str(&format!("## Dependencies ({} declared)\n\n", deps.total_count));
    if deps.manifests.is_empty() {
        md.push_str("No dependency manifests parsed.\n\n");
        return;
    }
    for manifest in &deps.manifests {
        md.push_str(&format!(
            "### `{}` ({})\n\n- Production ({}): {}\n- Development ({}): {}\n\n",
            manifest.file,
            manifest.ecosystem,
            manifest.production.len(),
            code_list(&manifest.production),
            manifest.development.len(),
            code_list(&manifest.development)
        ));
    }
}

fn code_list(names: &[String]) -> String {
    if names.is_empty() {
        return "-".to_string();
    }
    names
        .iter()
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_diagram(md: &mut String, result: &AnalysisResult) {
    md.push_str("## Dependency Diagram\n\n");
    let Some(diagram) = &result.diagram else {
        not_computed(md, result);
        return;
    };
    md.push_str("Directory-level import references.\n\n");
    md.push_str("```mermaid\n");
    md.push_str(&render_mermaid(diagram));
    md.push_str("```\n\n");

    let cycles = ModuleGraph::from(diagram).import_cycles();
    if !cycles.is_empty() {
        md.push_str("Import cycles:\n\n");
        for cycle in cycles {
            md.push_str(&format!("- {}\n", cycle.join(" <-> ")));
        }
        md.push('\n');
    }
}

fn has_file(result: &AnalysisResult, names: &[&str]) -> bool {
    result.file_records.iter().any(|record| {
        let name = recon_protocol::paths::file_name(&record.path);
        names.contains(&name)
    })
}

fn render_setup(md: &mut String, result: &AnalysisResult) {
    md.push_str("## Setup Hints\n\n");
    let primary = result.stack_profile.primary_language.as_str();
    let commands = if primary == Language::JavaScript.display_name()
        || primary == Language::TypeScript.display_name()
    {
        Some("npm install\nnpm run dev\nnpm test\n")
    } else if primary == Language::Python.display_name() {
        Some("python -m venv venv\nsource venv/bin/activate\npip install -r requirements.txt\npython app.py\n")
    } else if primary == Language::Rust.display_name() {
        Some("cargo build\ncargo test\ncargo run\n")
    } else if primary == Language::Go.display_name() {
        Some("go mod download\ngo test ./...\ngo run .\n")
    } else {
        None
    };
    match commands {
        Some(commands) => md.push_str(&format!("```bash\n{commands}```\n\n")),
        None => md.push_str("No setup steps inferred for this stack.\n\n"),
    }

    if has_file(result, &["docker-compose.yml", "docker-compose.yaml", "compose.yaml"]) {
        md.push_str("With Docker Compose:\n\n```bash\ndocker-compose up -d\n```\n\n");
    } else if has_file(result, &["Dockerfile"]) {
        md.push_str("With Docker:\n\n```bash\ndocker build -t app .\n```\n\n");
    }
}

fn render_warnings(md: &mut String, result: &AnalysisResult) {
    md.push_str(&format!("## Warnings ({})\n\n", result.warnings.len()));
    if result.warnings.is_empty() {
        md.push_str("None.\n\n");
        return;
    }
    for warning in &result.warnings {
        md.push_str(&format!("- {warning}\n"));
    }
    md.push('\n');
}

/// Render the reconstructed specification for a record
pub fn render_markdown(result: &AnalysisResult) -> String {
    let meta = &result.meta;
    let architecture = result
        .architecture_pattern
        .as_ref()
        .map_or("an undetermined", |pattern| pattern.name.as_str());
    let loc: usize = result.file_records.iter().map(|r| r.line_count).sum();

    let mut md = String::new();
    md.push_str(&format!("# {}: Reconstructed Specification\n\n", title_case(&meta.source_name)));
    md.push_str(&format!(
        "A {} application using {} architecture, based on analysis of {} files with {} lines.\n\n",
        result.stack_profile.primary_language,
        architecture,
        group_thousands(result.file_records.len()),
        group_thousands(loc)
    ));
    md.push_str(&format!("- Tool: `{} {}`\n", meta.tool, meta.version));
    md.push_str(&format!("- Depth: `{}`\n", meta.depth));
    md.push_str(&format!("- Fingerprint: `{}`\n\n", meta.fingerprint));

    render_stack(&mut md, result);
    render_architecture(&mut md, result);
    render_features(&mut md, result);
    render_api(&mut md, result);
    render_schema(&mut md, result);
    render_metrics(&mut md, result);
    render_dependencies(&mut md, result);
    render_diagram(&mut md, result);
    render_setup(&mut md, result);
    render_warnings(&mut md, result);

    md.push_str("---\n\n");
    md.push_str("Reconstructed by static analysis. Runtime behavior and business rules are not captured.\n");
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_and_titles() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(title_case("my-shop_api"), "My Shop Api");
        assert_eq!(escape_cell("a|b"), "a\\|b");
    }
}
