//! # Recon Graph
//!
//! Directory-level dependency diagram of a scanned tree.
//!
//! ## Architecture
//!
//! ```text
//! ScannedFile[] + ArchitectureReport
//!     │
//!     ├──> Diagram Builder
//!     │      ├─ Group files into directory nodes (components, or top level under the base)
//!     │      ├─ Extract import statements per language
//!     │      └─ Resolve imports against the tree index
//!     │
//!     ├──> Module Graph (petgraph)
//!     │      ├─ Nodes: directories with their roles and file counts
//!     │      └─ Edges: imports, weighted by statement count
//!     │
//!     └──> Output
//!            ├─ Sorted DependencyDiagram
//!            └─ Mermaid flowchart
//! ```

mod builder;
mod imports;
mod mermaid;
mod resolve;
mod types;

pub use builder::{build_diagram, DiagramBuilder, ROOT_NODE};
pub use imports::{import_refs, ImportRef};
pub use mermaid::render_mermaid;
pub use resolve::{Target, TreeIndex};
pub use types::ModuleGraph;
