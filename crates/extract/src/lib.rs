//! Endpoint and persisted-schema extraction.
//!
//! Both extractors read only Route- and Model-classified files from a scan, recognize a fixed
//! table of declaration idioms, and report what they could not read as warnings instead of
//! failing. Output order is a function of file paths and positions only.

mod source;

pub mod endpoints;
pub mod schema;

pub use endpoints::{
    extract_endpoints, extract_file_endpoints, RouteExtraction, RouteIdiom, RouteSource,
    ROUTE_IDIOMS,
};
pub use schema::{
    extract_file_entities, extract_schema, ModelSource, SchemaExtraction, SchemaIdiom,
    SCHEMA_IDIOMS,
};
