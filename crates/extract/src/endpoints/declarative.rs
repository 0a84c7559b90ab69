//! Route tables: Django `urlpatterns`, Rails `routes.draw`, hapi `{ method, path }` objects.

use super::{auth, RouteExtraction, RouteSource, DECLARATIVE};
use crate::source;
use once_cell::sync::Lazy;
use recon_protocol::Endpoint;
use regex::Regex;

static DJANGO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\burlpatterns\b").expect("django pattern is valid"));

static RAILS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\broutes\.draw\b").expect("rails pattern is valid"));

static HAPI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bmethod\s*:\s*[\['"]"#).expect("hapi pattern is valid")
});

static DJANGO_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(path|re_path|url)\s*\(").expect("django path pattern is valid"));

static VIEW_WRAPPER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(login_required|permission_required|staff_member_required|user_passes_test",
        r"|[\w.]*auth\w*)\s*(?:\([^()]*\))?\s*\(",
    ))
    .expect("view wrapper pattern is valid")
});

static AS_VIEW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.as_view\s*\([\s\S]*\)$").expect("as_view pattern is valid"));

static RAILS_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(get|post|put|patch|delete|match)\s+['"]([^'"]+)['"](.*)$"#)
        .expect("rails verb pattern is valid")
});

static RAILS_RESOURCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(resources|resource)\s+:(\w+)(.*)$").expect("rails resources pattern is valid")
});

static RAILS_SCOPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(namespace\s+:(\w+)|scope\s+(?:path:\s*)?['"]/?([^'"]*)['"]|authenticated?\b)"#)
        .expect("rails scope pattern is valid")
});

static RAILS_TO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:to:\s*|=>\s*)['"]([\w/]+#\w+)['"]"#).expect("rails to pattern is valid")
});

static RAILS_VIA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"via:\s*(?:\[([^\]]*)\]|:(\w+))").expect("rails via pattern is valid")
});

static RAILS_FILTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(only|except):\s*(?:\[([^\]]*)\]|%i\[([^\]]*)\]|:(\w+))")
        .expect("rails filter pattern is valid")
});

static DO_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdo(?:\s*\|[^|]*\|)?\s*$").expect("do block pattern is valid"));

static AUTH_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bauth\s*:\s*(false\b)?").expect("auth key pattern is valid")
});

pub fn detect(text: &str) -> bool {
    DJANGO.is_match(text) || RAILS.is_match(text) || HAPI.is_match(text)
}

pub fn extract(source: &RouteSource<'_>) -> RouteExtraction {
    let mut out = RouteExtraction::default();
    if DJANGO.is_match(source.text) {
        django(source, &mut out);
    }
    if RAILS.is_match(source.text) {
        rails(source, &mut out);
    }
    if HAPI.is_match(source.text) {
        hapi(source, &mut out);
    }
    out
}

fn endpoint(
    source: &RouteSource<'_>,
    method: &str,
    path: &str,
    symbol: Option<String>,
    auth_required: bool,
    line: usize,
) -> Endpoint {
    Endpoint {
        method: method.to_string(),
        path: path.to_string(),
        handler_ref: source.handler(symbol),
        auth_required,
        line,
        idiom: DECLARATIVE.to_string(),
    }
}

fn django(source: &RouteSource<'_>, out: &mut RouteExtraction) {
    let text = source.text;
    let quotes = source.quotes();
    for caps in DJANGO_PATH.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        // `os.path(..)` and friends.
        if text[..whole.start()].ends_with('.') {
            continue;
        }
        let Some(call) = source::call_args(text, whole.end() - 1, quotes) else {
            continue;
        };
        let [route, view, ..] = call.args.as_slice() else {
            continue;
        };
        if view.starts_with("include") {
            continue;
        }
        let Some(path) = source::string_literal(route) else {
            out.warnings
                .push(source.non_literal_path(whole.start(), "ANY", route));
            continue;
        };

        let mut view = view.trim();
        let mut auth_required = false;
        while let Some(wrapper) = VIEW_WRAPPER.find(view) {
            auth_required = true;
            let open = wrapper.end() - 1;
            match source::block_at(view, open, quotes) {
                Some(inner) => {
                    view = source::split_top_level(inner, quotes)
                        .first()
                        .copied()
                        .unwrap_or_default()
                }
                None => break,
            }
        }
        let view = AS_VIEW.replace(view, "");
        let symbol = source::symbol_of(&view);
        out.endpoints.push(endpoint(
            source,
            "ANY",
            &path,
            symbol,
            auth_required,
            source.line(whole.start()),
        ));
    }
}

/// One open `do` block in a Rails routes file.
#[derive(Debug, Default, Clone)]
struct Scope {
    path: String,
    controller_ns: String,
    auth: bool,
}

const REST_ACTIONS: &[(&str, &str, &str)] = &[
    ("index", "GET", ""),
    ("create", "POST", ""),
    ("new", "GET", "/new"),
    ("edit", "GET", "/:id/edit"),
    ("show", "GET", "/:id"),
    ("update", "PATCH", "/:id"),
    ("update", "PUT", "/:id"),
    ("destroy", "DELETE", "/:id"),
];

fn symbols(raw: &str) -> Vec<String> {
    raw.split([',', ' '])
        .map(|item| item.trim().trim_start_matches(':').trim_matches(['\'', '"']))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn rails(source: &RouteSource<'_>, out: &mut RouteExtraction) {
    let mut stack: Vec<Scope> = Vec::new();
    let mut offset = 0usize;
    for raw_line in source.text.split_inclusive('\n') {
        let line_start = offset;
        offset += raw_line.len();
        let line = raw_line.trim();
        let scope = stack.last().cloned().unwrap_or_default();
        let opens_block = DO_BLOCK.is_match(line);

        if line == "end" {
            stack.pop();
            continue;
        }
        let line_no = source.line(line_start);

        if let Some(caps) = RAILS_VERB.captures(line) {
            let verb = caps.get(1).map_or("", |m| m.as_str());
            let declared = caps.get(2).map_or("", |m| m.as_str());
            let rest = caps.get(3).map_or("", |m| m.as_str());
            let methods = if verb == "match" {
                RAILS_VIA
                    .captures(rest)
                    .map(|via| {
                        symbols(via.get(1).or(via.get(2)).map_or("", |m| m.as_str()))
                            .into_iter()
                            .map(|m| if m == "all" { "ANY".to_string() } else { m.to_ascii_uppercase() })
                            .collect()
                    })
                    .unwrap_or_else(|| vec!["ANY".to_string()])
            } else {
                vec![verb.to_ascii_uppercase()]
            };
            let path = format!("{}/{}", scope.path, declared.trim_start_matches('/'));
            let symbol = RAILS_TO
                .captures(rest)
                .and_then(|to| to.get(1))
                .map(|m| format!("{}{}", scope.controller_ns, m.as_str()));
            for method in methods {
                out.endpoints
                    .push(endpoint(source, &method, &path, symbol.clone(), scope.auth, line_no));
            }
            if opens_block {
                stack.push(scope);
            }
            continue;
        }

        if let Some(caps) = RAILS_RESOURCES.captures(line) {
            let singular = caps.get(1).is_some_and(|m| m.as_str() == "resource");
            let name = caps.get(2).map_or("", |m| m.as_str());
            let rest = caps.get(3).map_or("", |m| m.as_str());
            let (only, except) = match RAILS_FILTER.captures(rest) {
                Some(filter) => {
                    let listed = symbols(
                        filter
                            .get(2)
                            .or(filter.get(3))
                            .or(filter.get(4))
                            .map_or("", |m| m.as_str()),
                    );
                    if filter.get(1).is_some_and(|m| m.as_str() == "only") {
                        (Some(listed), Vec::new())
                    } else {
                        (None, listed)
                    }
                }
                None => (None, Vec::new()),
            };
            let base = format!("{}/{}", scope.path, name);
            let controller = if singular {
                format!("{}{}s", scope.controller_ns, name)
            } else {
                format!("{}{}", scope.controller_ns, name)
            };
            for (action, method, suffix) in REST_ACTIONS {
                if singular && *action == "index" {
                    continue;
                }
                if only.as_ref().is_some_and(|only| !only.iter().any(|a| a == action))
                    || except.iter().any(|a| a == action)
                {
                    continue;
                }
                let suffix = if singular {
                    suffix.replace("/:id", "")
                } else {
                    suffix.to_string()
                };
                out.endpoints.push(endpoint(
                    source,
                    method,
                    &format!("{base}{suffix}"),
                    Some(format!("{controller}#{action}")),
                    scope.auth,
                    line_no,
                ));
            }
            if opens_block {
                let member = if singular {
                    base
                } else {
                    let single = name.strip_suffix('s').unwrap_or(name);
                    format!("{base}/:{single}_id")
                };
                stack.push(Scope {
                    path: member,
                    ..scope
                });
            }
            continue;
        }

        if opens_block {
            let mut next = scope.clone();
            if let Some(caps) = RAILS_SCOPE.captures(line) {
                if let Some(ns) = caps.get(2) {
                    next.path = format!("{}/{}", scope.path, ns.as_str());
                    next.controller_ns = format!("{}{}/", scope.controller_ns, ns.as_str());
                } else if let Some(path) = caps.get(3) {
                    if !path.as_str().is_empty() {
                        next.path = format!("{}/{}", scope.path, path.as_str());
                    }
                } else {
                    next.auth = true;
                }
            }
            stack.push(next);
        }
    }
}

/// Value of a top-level `key: value` entry of an object literal.
/// Start of the innermost object literal that encloses `offset`.
fn enclosing_object(text: &str, offset: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, byte) in text.as_bytes()[..offset].iter().enumerate().rev() {
        match byte {
            b'}' => depth += 1,
            b'{' if depth == 0 => return Some(index),
            b'{' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn hapi(source: &RouteSource<'_>, out: &mut RouteExtraction) {
    let text = source.text;
    let quotes = source.quotes();
    let mut seen = Vec::new();
    for found in HAPI.find_iter(text) {
        let Some(open) = enclosing_object(text, found.start()) else {
            continue;
        };
        if seen.contains(&open) {
            continue;
        }
        seen.push(open);
        let Some(object) = source::block_at(text, open, quotes) else {
            continue;
        };
        let entries = source::split_top_level(object, quotes);
        let value = |key: &str| source::entry_value(&entries, key);
        let Some(raw_path) = value("path") else {
            continue;
        };
        let methods: Vec<String> = value("method")
            .map(|raw| {
                let raw = raw.trim();
                let listed = match raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
                    Some(inner) => source::split_top_level(inner, quotes),
                    None => vec![raw],
                };
                listed
                    .into_iter()
                    .filter_map(source::string_literal)
                    .map(|m| if m == "*" { "ANY".to_string() } else { m.to_ascii_uppercase() })
                    .collect()
            })
            .unwrap_or_default();
        if methods.is_empty() {
            continue;
        }
        let line = source.line(open);
        let Some(path) = source::string_literal(raw_path) else {
            out.warnings
                .push(source.non_literal_path(open, &methods.join(","), raw_path));
            continue;
        };
        let symbol = value("handler").and_then(source::symbol_of);
        let auth_required = AUTH_KEY
            .captures_iter(object)
            .any(|caps| caps.get(1).is_none())
            || value("pre").is_some_and(auth::mentions_auth);
        for method in methods {
            out.endpoints
                .push(endpoint(source, &method, &path, symbol.clone(), auth_required, line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use recon_protocol::Language;

    type Row = (String, String, Option<String>, bool, usize);

    fn run(path: &str, language: Language, text: &str) -> RouteExtraction {
        extract(&RouteSource::new(path, language, text))
    }

    fn rows(out: &RouteExtraction) -> Vec<Row> {
        out.endpoints
            .iter()
            .map(|e| {
                (
                    e.method.clone(),
                    e.path.clone(),
                    e.handler_ref.symbol.clone(),
                    e.auth_required,
                    e.line,
                )
            })
            .collect()
    }

    #[test]
    fn django_paths_with_wrapped_views() {
        let text = "from django.urls import path, include\n\
                    urlpatterns = [\n\
                    \x20   path('items/', views.item_list, name='items'),\n\
                    \x20   path('items/<int:pk>/', login_required(views.ItemDetail.as_view()), name='item'),\n\
                    \x20   path('api/', include('api.urls')),\n\
                    \x20   re_path(r'^legacy/$', views.legacy),\n\
                    ]\n";
        let out = run("shop/urls.py", Language::Python, text);
        assert_eq!(
            rows(&out),
            vec![
                ("ANY".into(), "items/".into(), Some("views.item_list".into()), false, 3),
                ("ANY".into(), "items/<int:pk>/".into(), Some("views.ItemDetail".into()), true, 4),
                ("ANY".into(), "^legacy/$".into(), Some("views.legacy".into()), false, 6),
            ]
        );
    }

    #[test]
    fn rails_verbs_resources_and_scopes() {
        let text = "Rails.application.routes.draw do\n\
                    \x20 get 'health', to: 'status#show'\n\
                    \x20 resources :items, only: [:index, :show]\n\
                    \x20 namespace :admin do\n\
                    \x20   resources :users, except: %i[new edit update]\n\
                    \x20 end\n\
                    \x20 authenticate :user do\n\
                    \x20   resource :profile, only: :show\n\
                    \x20 end\n\
                    end\n";
        let out = run("config/routes.rb", Language::Ruby, text);
        assert_eq!(
            rows(&out),
            vec![
                ("GET".into(), "/health".into(), Some("status#show".into()), false, 2),
                ("GET".into(), "/items".into(), Some("items#index".into()), false, 3),
                ("GET".into(), "/items/:id".into(), Some("items#show".into()), false, 3),
                ("GET".into(), "/admin/users".into(), Some("admin/users#index".into()), false, 5),
                ("POST".into(), "/admin/users".into(), Some("admin/users#create".into()), false, 5),
                ("GET".into(), "/admin/users/:id".into(), Some("admin/users#show".into()), false, 5),
                (
                    "DELETE".into(),
                    "/admin/users/:id".into(),
                    Some("admin/users#destroy".into()),
                    false,
                    5
                ),
                ("GET".into(), "/profile".into(), Some("profiles#show".into()), true, 8),
            ]
        );
    }

    #[test]
    fn hapi_route_objects() {
        let text = "server.route([\n\
                    \x20 { method: 'GET', path: '/items', handler: items.list },\n\
                    \x20 {\n\
                    \x20   method: ['POST', 'PUT'],\n\
                    \x20   path: '/items/{id}',\n\
                    \x20   options: { auth: 'jwt' },\n\
                    \x20   handler: (request, h) => h.response().code(201)\n\
                    \x20 },\n\
                    \x20 { method: 'GET', path: '/public', options: { auth: false }, handler: open },\n\
                    ]);\n";
        let out = run("src/routes/items.js", Language::JavaScript, text);
        assert_eq!(
            rows(&out),
            vec![
                ("GET".into(), "/items".into(), Some("items.list".into()), false, 2),
                ("POST".into(), "/items/{id}".into(), None, true, 3),
                ("PUT".into(), "/items/{id}".into(), None, true, 3),
                ("GET".into(), "/public".into(), Some("open".into()), false, 9),
            ]
        );
    }

    #[test]
    fn computed_django_route_warns() {
        let out = run(
            "urls.py",
            Language::Python,
            "urlpatterns = [path(PREFIX + 'x/', views.x)]\n",
        );
        assert!(out.endpoints.is_empty());
        assert_eq!(out.warnings.len(), 1);
    }
}
