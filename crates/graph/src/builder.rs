use crate::imports::import_refs;
use crate::resolve::TreeIndex;
use crate::types::ModuleGraph;
use recon_detect::architecture::relative_to_base;
use recon_detect::ArchitectureReport;
use recon_protocol::paths::path_prefix_matches;
use recon_protocol::{DependencyDiagram, DiagramNode, Role};
use recon_scanner::ScannedFile;
use std::collections::{BTreeMap, BTreeSet};

/// Id of the node holding files that sit directly at the tree root.
pub const ROOT_NODE: &str = ".";

/// Maps files onto diagram nodes using the layout facts of an architecture report
pub struct DiagramBuilder {
    base: String,
    components: Vec<String>,
}

fn participates(file: &ScannedFile) -> bool {
    let language = file.language();
    matches!(file.role(), Role::Route | Role::Model | Role::Other)
        && (language.is_source() || language.is_schema() || language.is_view())
}

impl DiagramBuilder {
    pub fn new(report: &ArchitectureReport) -> Self {
        let mut components = report.components.clone();
        // Deepest first so nested components win over their containers.
        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self {
            base: report.base.clone(),
            components,
        }
    }

    /// Node id of the directory `path` is grouped under.
    pub fn node_id(&self, path: &str) -> String {
        if let Some(component) = self
            .components
            .iter()
            .find(|component| path != component.as_str() && path_prefix_matches(component, path))
        {
            return component.clone();
        }

        match relative_to_base(&self.base, path) {
            Some(rel) => match rel.split_once('/') {
                Some((dir, _)) if self.base.is_empty() => dir.to_string(),
                Some((dir, _)) => format!("{}/{dir}", self.base),
                None if self.base.is_empty() => ROOT_NODE.to_string(),
                None => self.base.clone(),
            },
            None => match path.split_once('/') {
                Some((dir, _)) => dir.to_string(),
                None => ROOT_NODE.to_string(),
            },
        }
    }

    fn label(&self, id: &str) -> String {
        if id == ROOT_NODE {
            return "(root)".to_string();
        }
        match relative_to_base(&self.base, id) {
            Some(rel) if !rel.is_empty() => rel.to_string(),
            _ => id.to_string(),
        }
    }

    /// Build the module graph from scanned files
    pub fn build(&self, files: &[ScannedFile]) -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        let index = TreeIndex::new(files.iter().map(ScannedFile::path));

        // Phase 1: Group participating files into directory nodes
        let mut members: BTreeMap<String, (BTreeSet<Role>, usize)> = BTreeMap::new();
        for file in files.iter().filter(|file| participates(file)) {
            let entry = members.entry(self.node_id(file.path())).or_default();
            entry.0.insert(file.role());
            entry.1 += 1;
        }
        for (id, (roles, file_count)) in &members {
            graph.add_node(DiagramNode {
                id: id.clone(),
                label: self.label(id),
                roles: roles.iter().copied().collect(),
                file_count: *file_count,
            });
        }

        // Phase 2: Resolve import statements to edges between nodes
        let mut sorted: Vec<&ScannedFile> = files.iter().filter(|file| participates(file)).collect();
        sorted.sort_by(|a, b| a.path().cmp(b.path()));
        for file in sorted {
            let Some(text) = file.text() else {
                continue;
            };
            let Some(from) = graph.find_node(&self.node_id(file.path())) else {
                continue;
            };
            for import in import_refs(file.path(), file.language(), text) {
                let Some(target) = index.resolve(file.path(), &import) else {
                    continue;
                };
                if let Some(to) = graph.find_node(&self.node_id(&target.member_path())) {
                    graph.add_import(from, to);
                }
            }
        }

        log::debug!(
            "Dependency graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }
}

/// Directory-level dependency diagram of a scanned tree.
pub fn build_diagram(files: &[ScannedFile], report: &ArchitectureReport) -> DependencyDiagram {
    DiagramBuilder::new(report).build(files).to_diagram()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use recon_protocol::{ArchitectureKind, ArchitecturePattern};

    fn report(base: &str, components: &[&str]) -> ArchitectureReport {
        ArchitectureReport {
            pattern: ArchitecturePattern {
                name: ArchitectureKind::Unknown,
                confidence: 0.0,
                evidence: Vec::new(),
            },
            base: base.to_string(),
            components: components.iter().map(|c| c.to_string()).collect(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn nodes_follow_layout_base() {
        let builder = DiagramBuilder::new(&report("src", &[]));
        assert_eq!(builder.node_id("src/routes/items.ts"), "src/routes");
        assert_eq!(builder.node_id("src/routes/v1/items.ts"), "src/routes");
        assert_eq!(builder.node_id("src/index.ts"), "src");
        assert_eq!(builder.node_id("scripts/seed.ts"), "scripts");
        assert_eq!(builder.node_id("server.ts"), ROOT_NODE);
        assert_eq!(builder.label("src/routes"), "routes");
        assert_eq!(builder.label(ROOT_NODE), "(root)");
    }

    #[test]
    fn components_take_precedence() {
        let builder = DiagramBuilder::new(&report("src", &["src/modules/billing", "src/modules/users"]));
        assert_eq!(builder.node_id("src/modules/users/routes.ts"), "src/modules/users");
        assert_eq!(builder.node_id("src/modules/users/models/user.ts"), "src/modules/users");
        assert_eq!(builder.node_id("src/shared/db.ts"), "src/shared");
    }
}
