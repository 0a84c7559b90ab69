use recon_protocol::DependencyDiagram;
use std::collections::HashMap;

fn escape(label: &str) -> String {
    label.replace('"', "#quot;")
}

/// Mermaid `flowchart` source for a diagram; node ids are positional so output is stable.
pub fn render_mermaid(diagram: &DependencyDiagram) -> String {
    let mut out = String::from("flowchart LR\n");
    let mut ids: HashMap<&str, String> = HashMap::new();

    for (i, node) in diagram.nodes.iter().enumerate() {
        let id = format!("n{i}");
        let roles: Vec<&str> = node.roles.iter().map(|role| role.as_str()).collect();
        let files = if node.file_count == 1 { "file" } else { "files" };
        let detail = if roles.is_empty() {
            format!("{} {files}", node.file_count)
        } else {
            format!("{}, {} {files}", roles.join("/"), node.file_count)
        };
        out.push_str(&format!(
            "    {id}[\"{}<br/>{}\"]\n",
            escape(&node.label),
            escape(&detail)
        ));
        ids.insert(node.id.as_str(), id);
    }

    for edge in &diagram.edges {
        let (Some(from), Some(to)) = (ids.get(edge.from.as_str()), ids.get(edge.to.as_str())) else {
            continue;
        };
        if edge.weight > 1 {
            out.push_str(&format!("    {from} -->|{}| {to}\n", edge.weight));
        } else {
            out.push_str(&format!("    {from} --> {to}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use recon_protocol::{DiagramEdge, DiagramNode, Role};

    #[test]
    fn renders_nodes_and_weighted_edges() {
        let diagram = DependencyDiagram {
            nodes: vec![
                DiagramNode {
                    id: "src/models".into(),
                    label: "models".into(),
                    roles: vec![Role::Model],
                    file_count: 2,
                },
                DiagramNode {
                    id: "src/routes".into(),
                    label: "routes".into(),
                    roles: vec![Role::Route, Role::Other],
                    file_count: 1,
                },
            ],
            edges: vec![DiagramEdge {
                from: "src/routes".into(),
                to: "src/models".into(),
                weight: 3,
            }],
        };

        assert_eq!(
            render_mermaid(&diagram),
            "flowchart LR\n    n0[\"models<br/>Model, 2 files\"]\n    n1[\"routes<br/>Route/Other, 1 file\"]\n    n1 -->|3| n0\n"
        );
    }

    #[test]
    fn empty_diagram_is_just_the_header() {
        assert_eq!(render_mermaid(&DependencyDiagram::default()), "flowchart LR\n");
    }
}
