//! Router method calls: `app.get('/x', h)`, `r.GET("/x", h)`, `.route("/x", get(h))`.

use super::{auth, RouteExtraction, RouteSource, ROUTER_CALL};
use crate::source::{self, CallArgs};
use once_cell::sync::Lazy;
use recon_protocol::paths::path_prefix_matches;
use recon_protocol::{Endpoint, Warning};
use regex::Regex;

static CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:\b([A-Za-z_$][\w$]*)|\))\s*\.\s*",
        r"(get|post|put|patch|delete|head|options|all|any|route",
        r"|GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS|Any",
        r"|Get|Post|Put|Patch|Delete|Head|Options|HandleFunc|Handle)\s*\(",
    ))
    .expect("router call pattern is valid")
});

static CHAINED_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\.\s*(get|post|put|patch|delete|head|options|all)\s*\(")
        .expect("chained method pattern is valid")
});

static METHOD_ROUTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(get|post|put|patch|delete|head|options|any)\s*\(")
        .expect("method router pattern is valid")
});

static GORILLA_METHODS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\.\s*Methods\s*\(").expect("gorilla methods pattern is valid")
});

static GATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_$][\w$]*)\s*\.\s*(?:use|Use)\s*\(").expect("gate pattern is valid")
});

static GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_$][\w$]*)\s*:?=\s*[A-Za-z_$][\w$]*\s*\.\s*(?:Group|group)\s*\(")
        .expect("group pattern is valid")
});

static WRAPPED_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$.]*\s*\(\s*([A-Za-z_$][\w$.]*)\s*\)$")
        .expect("wrapped handler pattern is valid")
});

/// Receivers that conventionally hold a router, server or route group.
const ROUTER_RECEIVERS: &[&str] = &[
    "app", "router", "routes", "route", "api", "server", "r", "e", "g", "mux", "fastify",
    "instance", "group", "grp", "v1", "v2", "v3", "admin", "public", "private", "protected",
    "authorized", "authed", "secured", "web", "koa", "hono", "http",
];

const ROUTER_SUFFIXES: &[&str] = &["router", "routes", "app", "api", "group", "server"];

fn is_router_receiver(receiver: &str) -> bool {
    let lower = receiver.to_ascii_lowercase();
    ROUTER_RECEIVERS.contains(&lower.as_str())
        || ROUTER_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Receiver of a call; `None` for chained calls such as `Router::new().route(..)`.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    receiver: Option<&'a str>,
    method: &'a str,
    method_offset: usize,
    call: CallArgs<'a>,
}

#[derive(Debug)]
enum Shape {
    /// Looks like a route declaration with a literal path.
    Route(String),
    /// Looks like a route declaration but the path is computed.
    Computed,
    /// Not a route declaration.
    Other,
}

fn shape(candidate: &Candidate<'_>) -> Shape {
    let Some(first) = candidate.call.args.first() else {
        return Shape::Other;
    };
    if first.starts_with('{') || first.starts_with('[') {
        return Shape::Other;
    }
    let chain_route = candidate.method == "route" && candidate.call.args.len() == 1;
    if candidate.call.args.len() < 2 && !chain_route {
        return Shape::Other;
    }
    let known = candidate.receiver.is_some_and(is_router_receiver);
    match source::string_literal(first) {
        Some(path) if path.starts_with('/') || path.contains(" /") || known => Shape::Route(path),
        Some(_) => Shape::Other,
        None if candidate.receiver.is_some_and(is_router_receiver) => Shape::Computed,
        None => Shape::Other,
    }
}

fn candidates<'a>(text: &'a str, quotes: &[u8]) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    for caps in CALL.captures_iter(text) {
        let (Some(whole), Some(method)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let receiver = caps.get(1);
        // `@app.get(...)` is a decorator, handled by its own idiom.
        if let Some(receiver) = receiver {
            if text[..receiver.start()].ends_with('@') {
                continue;
            }
        }
        let open = whole.end() - 1;
        let Some(call) = source::call_args(text, open, quotes) else {
            continue;
        };
        out.push(Candidate {
            receiver: receiver.map(|m| m.as_str()),
            method: method.as_str(),
            method_offset: method.start(),
            call,
        });
    }
    out
}

pub fn detect(text: &str) -> bool {
    candidates(text, b"\"'`")
        .iter()
        .any(|candidate| !matches!(shape(candidate), Shape::Other))
}

/// An auth gate installed by `x.use(auth)` or `x := y.Group("/p", auth)`.
#[derive(Debug)]
struct Gate {
    receiver: String,
    prefix: Option<String>,
    offset: usize,
}

fn gates(text: &str, quotes: &[u8]) -> Vec<Gate> {
    let mut out = Vec::new();
    for caps in GATE.captures_iter(text) {
        let (Some(whole), Some(receiver)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(call) = source::call_args(text, whole.end() - 1, quotes) else {
            continue;
        };
        let prefix = call.args.first().and_then(|arg| source::string_literal(arg));
        let middleware = if prefix.is_some() { &call.args[1..] } else { &call.args[..] };
        let prefix = prefix.map(|prefix| prefix.trim_end_matches('/').to_string());
        if middleware.iter().any(|arg| auth::mentions_auth(arg)) {
            out.push(Gate {
                receiver: receiver.as_str().to_string(),
                prefix,
                offset: whole.start(),
            });
        }
    }
    for caps in GROUP.captures_iter(text) {
        let (Some(whole), Some(receiver)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(call) = source::call_args(text, whole.end() - 1, quotes) else {
            continue;
        };
        if call.args.iter().skip(1).any(|arg| auth::mentions_auth(arg)) {
            out.push(Gate {
                receiver: receiver.as_str().to_string(),
                prefix: None,
                offset: whole.start(),
            });
        }
    }
    out
}

fn gated(gates: &[Gate], receiver: Option<&str>, path: &str, offset: usize) -> bool {
    gates.iter().any(|gate| {
        gate.offset < offset
            && receiver.map_or(true, |receiver| receiver == gate.receiver)
            && gate
                .prefix
                .as_deref()
                .map_or(true, |prefix| path_prefix_matches(prefix, path))
    })
}

fn handler_symbol(arg: &str) -> Option<String> {
    source::symbol_of(arg).or_else(|| {
        WRAPPED_HANDLER
            .captures(arg.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn verb(method: &str) -> String {
    match method.to_ascii_lowercase().as_str() {
        "all" | "any" | "handle" | "handlefunc" => "ANY".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

struct Emitter<'s, 'a> {
    source: &'s RouteSource<'a>,
    gates: Vec<Gate>,
    out: RouteExtraction,
}

impl Emitter<'_, '_> {
    /// Emits one endpoint; `args` are the call arguments after the path.
    fn emit(
        &mut self,
        method: String,
        path: &str,
        receiver: Option<&str>,
        offset: usize,
        args: &[&str],
    ) {
        let (middleware, handler) = match args.split_last() {
            Some((last, rest)) => (rest, handler_symbol(last)),
            None => (&[][..], None),
        };
        let auth_required = middleware.iter().any(|arg| auth::mentions_auth(arg))
            || gated(&self.gates, receiver, path, offset);
        self.out.endpoints.push(Endpoint {
            method,
            path: path.to_string(),
            handler_ref: self.source.handler(handler),
            auth_required,
            line: self.source.line(offset),
            idiom: ROUTER_CALL.to_string(),
        });
    }
}

pub fn extract(source: &RouteSource<'_>) -> RouteExtraction {
    let text = source.text;
    let quotes = source.quotes();
    let mut emitter = Emitter {
        source,
        gates: gates(text, quotes),
        out: RouteExtraction::default(),
    };
    // Chained `.get(..)` calls consumed by a preceding `.route('/x')`.
    let mut consumed_until = 0usize;

    for candidate in candidates(text, quotes) {
        if candidate.method_offset < consumed_until {
            continue;
        }
        let path = match shape(&candidate) {
            Shape::Route(path) => path,
            Shape::Computed => {
                let warning = source.non_literal_path(
                    candidate.method_offset,
                    &verb(candidate.method),
                    candidate.call.args[0],
                );
                emitter.out.warnings.push(warning);
                continue;
            }
            Shape::Other => continue,
        };
        let rest = &candidate.call.args[1..];
        let offset = candidate.method_offset;

        match candidate.method {
            "route" if rest.is_empty() => {
                // Express `router.route('/x').get(h).post(h)`.
                let mut cursor = candidate.call.end + 1;
                while let Some(caps) = CHAINED_METHOD.captures(&text[cursor..]) {
                    let (Some(whole), Some(method)) = (caps.get(0), caps.get(1)) else {
                        break;
                    };
                    let method_offset = cursor + method.start();
                    let Some(call) = source::call_args(text, cursor + whole.end() - 1, quotes)
                    else {
                        break;
                    };
                    emitter.emit(
                        verb(method.as_str()),
                        &path,
                        candidate.receiver,
                        method_offset,
                        &call.args,
                    );
                    cursor = call.end + 1;
                }
                consumed_until = cursor;
            }
            "route" => {
                // axum `.route("/x", get(list).post(create))`.
                let router = rest.last().copied().unwrap_or_default();
                for caps in METHOD_ROUTER.captures_iter(router) {
                    let (Some(whole), Some(method)) = (caps.get(0), caps.get(1)) else {
                        continue;
                    };
                    let handler = source::call_args(router, whole.end() - 1, quotes)
                        .map(|call| call.args)
                        .unwrap_or_default();
                    emitter.emit(verb(method.as_str()), &path, candidate.receiver, offset, &handler);
                }
            }
            "HandleFunc" | "Handle" => {
                // Go 1.22 `"GET /items/{id}"` patterns and gorilla `.Methods("GET")`.
                let (methods, path) = match path.split_once(' ') {
                    Some((method, pattern)) if method.chars().all(|c| c.is_ascii_uppercase()) => {
                        (vec![method.to_string()], pattern.trim().to_string())
                    }
                    _ => {
                        let after = &text[candidate.call.end + 1..];
                        let methods = GORILLA_METHODS
                            .find(after)
                            .and_then(|m| {
                                source::call_args(text, candidate.call.end + m.end(), quotes)
                            })
                            .map(|call| {
                                call.args
                                    .iter()
                                    .filter_map(|arg| source::string_literal(arg))
                                    .map(|m| m.to_ascii_uppercase())
                                    .collect::<Vec<_>>()
                            })
                            .filter(|methods| !methods.is_empty())
                            .unwrap_or_else(|| vec!["ANY".to_string()]);
                        (methods, path.clone())
                    }
                };
                for method in methods {
                    emitter.emit(method, &path, candidate.receiver, offset, rest);
                }
            }
            method => emitter.emit(verb(method), &path, candidate.receiver, offset, rest),
        }
    }

    if emitter.out.endpoints.is_empty() && emitter.out.warnings.is_empty() {
        emitter.out.warnings.push(Warning::partial_extraction(
            source.path,
            "router calls found but no route could be extracted",
        ));
    }
    emitter.out
}
