//! Endpoint extraction from Route-classified files.
//!
//! Each file is matched against [`ROUTE_IDIOMS`] in order and the first idiom whose
//! detector accepts the text extracts the file. Adding a framework means appending a
//! detector and extractor pair, or teaching an existing idiom a new declaration shape.

mod auth;
mod declarative;
mod decorator;
mod router_call;

use crate::source;
use recon_protocol::{Endpoint, HandlerRef, Language, Role, Warning};
use recon_scanner::ScannedFile;

/// A Route file as seen by an idiom.
#[derive(Debug, Clone, Copy)]
pub struct RouteSource<'a> {
    pub path: &'a str,
    pub language: Language,
    pub text: &'a str,
}

impl<'a> RouteSource<'a> {
    pub fn new(path: &'a str, language: Language, text: &'a str) -> Self {
        Self {
            path,
            language,
            text,
        }
    }

    fn quotes(&self) -> &'static [u8] {
        source::quote_chars(self.language)
    }

    fn line(&self, offset: usize) -> usize {
        source::line_of(self.text, offset)
    }

    fn handler(&self, symbol: Option<String>) -> HandlerRef {
        HandlerRef {
            file: self.path.to_string(),
            symbol,
        }
    }

    fn non_literal_path(&self, offset: usize, method: &str, raw: &str) -> Warning {
        Warning::partial_extraction(
            self.path,
            format!(
                "line {}: skipped {method} route whose path `{}` is not a literal",
                self.line(offset),
                compact(raw)
            ),
        )
    }
}

/// Endpoints and warnings produced by one idiom over one file.
#[derive(Debug, Default)]
pub struct RouteExtraction {
    pub endpoints: Vec<Endpoint>,
    pub warnings: Vec<Warning>,
}

/// A declaration idiom: a cheap detector plus the extractor it gates.
pub struct RouteIdiom {
    pub name: &'static str,
    pub detect: fn(&str) -> bool,
    pub extract: fn(&RouteSource<'_>) -> RouteExtraction,
}

pub const ROUTER_CALL: &str = "router-call";
pub const DECORATOR: &str = "decorator";
pub const DECLARATIVE: &str = "declarative";

/// Ordered idiom table; the first matching detector wins.
pub const ROUTE_IDIOMS: &[RouteIdiom] = &[
    RouteIdiom {
        name: ROUTER_CALL,
        detect: router_call::detect,
        extract: router_call::extract,
    },
    RouteIdiom {
        name: DECORATOR,
        detect: decorator::detect,
        extract: decorator::extract,
    },
    RouteIdiom {
        name: DECLARATIVE,
        detect: declarative::detect,
        extract: declarative::extract,
    },
];

/// Extracts endpoints from a single file, or warns when no idiom recognizes it.
pub fn extract_file_endpoints(source: &RouteSource<'_>) -> RouteExtraction {
    match ROUTE_IDIOMS.iter().find(|idiom| (idiom.detect)(source.text)) {
        Some(idiom) => {
            let extraction = (idiom.extract)(source);
            log::debug!(
                "{}: {} endpoint(s) via {}",
                source.path,
                extraction.endpoints.len(),
                idiom.name
            );
            extraction
        }
        None => RouteExtraction {
            endpoints: Vec::new(),
            warnings: vec![Warning::partial_extraction(
                source.path,
                "no route declaration idiom recognized",
            )],
        },
    }
}

/// Extracts endpoints from every readable Route file.
///
/// The result is sorted by (file, line, method, path) so it does not depend on input order.
pub fn extract_endpoints(files: &[ScannedFile]) -> RouteExtraction {
    let mut out = RouteExtraction::default();
    for file in files.iter().filter(|file| file.role() == Role::Route) {
        let Some(text) = file.text() else {
            continue;
        };
        let extraction = extract_file_endpoints(&RouteSource::new(file.path(), file.language(), text));
        out.endpoints.extend(extraction.endpoints);
        out.warnings.extend(extraction.warnings);
    }
    out.endpoints.sort_by(|a, b| {
        a.handler_ref
            .file
            .cmp(&b.handler_ref.file)
            .then(a.line.cmp(&b.line))
            .then_with(|| a.method.cmp(&b.method))
            .then_with(|| a.path.cmp(&b.path))
    });
    out.endpoints.dedup();
    out.warnings.sort();
    out
}

/// Joins a controller prefix and a route path with single slashes.
fn join_route(prefix: &str, path: &str) -> String {
    let parts: Vec<&str> = [prefix, path]
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect();
    format!("/{}", parts.join("/"))
}

fn compact(raw: &str) -> String {
    let single: String = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if single.chars().count() > 60 {
        format!("{}...", single.chars().take(57).collect::<String>())
    } else {
        single
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn idiom_order_is_fixed() {
        let names: Vec<&str> = ROUTE_IDIOMS.iter().map(|idiom| idiom.name).collect();
        assert_eq!(names, vec![ROUTER_CALL, DECORATOR, DECLARATIVE]);
    }

    #[test]
    fn unrecognized_files_warn() {
        let source = RouteSource::new("src/routes/index.ts", Language::TypeScript, "export {}\n");
        let out = extract_file_endpoints(&source);
        assert!(out.endpoints.is_empty());
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].file.as_deref(), Some("src/routes/index.ts"));
    }

    #[test]
    fn prefixes_join_cleanly() {
        assert_eq!(join_route("items", ":id"), "/items/:id");
        assert_eq!(join_route("/api/", "/"), "/api");
        assert_eq!(join_route("", ""), "/");
    }
}
