//! Stack, architecture and entry-point detection over classified files.
//!
//! Every detector here is a pure function of the scan output; the analyzer runs them on
//! separate blocking tasks.

pub mod architecture;
pub mod entrypoints;
pub mod manifests;
pub mod stack;

pub use architecture::{classify_architecture, layer_kind, ArchitectureReport, LayerKind};
pub use entrypoints::{discover_entry_points, entrypoint_rank};
pub use manifests::{ManifestSet, ParsedManifest};
pub use stack::{
    detect_stack, primary_language, Signature, SignatureKind, StackDetection, StackIdentity,
    StackWeights, STACK_IDENTITIES,
};
