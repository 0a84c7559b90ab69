//! Decorator and annotation routes: Flask, FastAPI, NestJS, Spring, actix/rocket.

use super::{auth, join_route, RouteExtraction, RouteSource, DECORATOR};
use crate::source;
use once_cell::sync::Lazy;
use recon_protocol::{Endpoint, Language};
use regex::Regex;
use std::collections::HashMap;

static DETECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)^[ \t]*(?:@\s*[\w.]+\.(?:route|api_route|get|post|put|patch|delete|head|options)\s*\(",
        r"|@(?:Get|Post|Put|Patch|Delete|Head|Options|All)\s*\(",
        r"|@(?:Get|Post|Put|Patch|Delete|Request)Mapping\b",
        r"|#\[\s*(?:get|post|put|patch|delete|head|options)\s*\()",
    ))
    .expect("decorator detect pattern is valid")
});

static RECEIVER_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@\s*([\w.]+)\.(route|api_route|get|post|put|patch|delete|head|options)\s*\(")
        .expect("receiver route pattern is valid")
});

static NEST_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(Get|Post|Put|Patch|Delete|Head|Options|All)\s*\(")
        .expect("nest route pattern is valid")
});

static SPRING_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(Get|Post|Put|Patch|Delete|Request)Mapping\b").expect("spring pattern is valid")
});

static ATTRIBUTE_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\[\s*(get|post|put|patch|delete|head|options)\s*\(")
        .expect("attribute route pattern is valid")
});

static CONTROLLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(?:Controller|RestController|RequestMapping|Path)\b")
        .expect("controller pattern is valid")
});

static CLASS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:class|interface|object)\s+[A-Za-z_]").expect("class pattern is valid")
});

static REQUEST_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"RequestMethod\.([A-Z]+)").expect("request method pattern is valid")
});

static ROUTER_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_]\w*)\s*=\s*(?:APIRouter|Blueprint)\s*\(")
        .expect("router object pattern is valid")
});

static PY_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)").expect("def pattern is valid")
});

static RUST_FN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bfn\s+([A-Za-z_]\w*)").expect("fn pattern is valid"));

static CALLABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z_$][\w$]*)\s*(?:<[^<>()]*>)?\s*\(").expect("callable pattern is valid")
});

const NOT_HANDLER_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "new", "public", "private",
    "protected", "static", "async", "override", "final", "synchronized", "fun",
];

pub fn detect(text: &str) -> bool {
    DETECT.is_match(text)
}

#[derive(Debug, Clone, Copy)]
struct Decorator<'a> {
    text: &'a str,
    offset: usize,
}

/// What a single decorator declares.
enum Declared<'a> {
    Routes {
        methods: Vec<String>,
        paths: Vec<String>,
        /// Whether the path is relative to a controller-level prefix.
        nested: bool,
        receiver: Option<&'a str>,
    },
    Computed {
        method: String,
        raw: &'a str,
    },
    NotRoute,
}

/// Keyword argument value, for `name=value` (Python, Java) or `name: value` (TS objects).
/// String literals of a single literal or a `[..]` / `{..}` literal list.
fn literals(raw: &str, quotes: &[u8]) -> Option<Vec<String>> {
    let raw = raw.trim();
    if let Some(single) = source::string_literal(raw) {
        return Some(vec![single]);
    }
    let inner = raw
        .strip_prefix(['[', '{', '('])
        .and_then(|rest| rest.strip_suffix([']', '}', ')']))?;
    source::split_top_level(inner, quotes)
        .into_iter()
        .map(source::string_literal)
        .collect()
}

fn decorator_args<'a>(decorator: &'a str, quotes: &[u8]) -> Vec<&'a str> {
    decorator
        .find('(')
        .and_then(|open| source::call_args(decorator, open, quotes))
        .map(|call| call.args)
        .unwrap_or_default()
}

fn declared<'a>(decorator: &'a str, quotes: &[u8]) -> Declared<'a> {
    if let Some(caps) = RECEIVER_ROUTE.captures(decorator) {
        let (Some(receiver), Some(verb)) = (caps.get(1), caps.get(2)) else {
            return Declared::NotRoute;
        };
        let args = decorator_args(decorator, quotes);
        let methods = match verb.as_str() {
            "route" | "api_route" => source::keyword(&args, &["methods"])
                .and_then(|raw| literals(raw, quotes))
                .map(|methods| methods.iter().map(|m| m.to_ascii_uppercase()).collect())
                .unwrap_or_else(|| vec!["GET".to_string()]),
            other => vec![other.to_ascii_uppercase()],
        };
        let Some(raw) =
            source::positional(&args).or_else(|| source::keyword(&args, &["rule", "path"]))
        else {
            return Declared::NotRoute;
        };
        return match source::string_literal(raw) {
            Some(path) => Declared::Routes {
                methods,
                paths: vec![path],
                nested: false,
                receiver: Some(receiver.as_str()),
            },
            None => Declared::Computed {
                method: methods.join(","),
                raw,
            },
        };
    }

    let (methods, args) = if let Some(caps) = NEST_ROUTE.captures(decorator) {
        let method = match caps.get(1).map(|m| m.as_str()) {
            Some("All") | None => "ANY".to_string(),
            Some(verb) => verb.to_ascii_uppercase(),
        };
        (vec![method], decorator_args(decorator, quotes))
    } else if let Some(caps) = SPRING_ROUTE.captures(decorator) {
        let args = decorator_args(decorator, quotes);
        let methods = match caps.get(1).map(|m| m.as_str()) {
            Some("Request") | None => {
                let listed: Vec<String> = REQUEST_METHOD
                    .captures_iter(decorator)
                    .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
                    .collect();
                if listed.is_empty() {
                    vec!["ANY".to_string()]
                } else {
                    listed
                }
            }
            Some(verb) => vec![verb.to_ascii_uppercase()],
        };
        (methods, args)
    } else if let Some(caps) = ATTRIBUTE_ROUTE.captures(decorator) {
        let method = caps
            .get(1)
            .map(|m| m.as_str().to_ascii_uppercase())
            .unwrap_or_default();
        (vec![method], decorator_args(decorator, quotes))
    } else {
        return Declared::NotRoute;
    };

    let raw = source::positional(&args).or_else(|| source::keyword(&args, &["value", "path"]));
    let paths = match raw {
        None => Some(vec![String::new()]),
        Some(raw) => literals(raw, quotes),
    };
    match (paths, raw) {
        (Some(paths), _) => Declared::Routes {
            methods,
            paths,
            nested: true,
            receiver: None,
        },
        (None, Some(raw)) => Declared::Computed {
            method: methods.join(","),
            raw,
        },
        (None, None) => Declared::NotRoute,
    }
}

/// Prefix and auth carried by a router object such as `APIRouter(prefix=..)`.
#[derive(Debug, Default, Clone)]
struct RouterObject {
    prefix: Option<String>,
    auth: bool,
}

fn router_objects(text: &str, quotes: &[u8]) -> HashMap<String, RouterObject> {
    let mut out = HashMap::new();
    for caps in ROUTER_OBJECT.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(call) = source::call_args(text, whole.end() - 1, quotes) else {
            continue;
        };
        let prefix = source::keyword(&call.args, &["prefix", "url_prefix"])
            .and_then(source::string_literal);
        let auth = call.args.iter().any(|arg| auth::depends_on_user(arg));
        out.insert(name.as_str().to_string(), RouterObject { prefix, auth });
    }
    out
}

struct Walker<'s, 'a> {
    source: &'s RouteSource<'a>,
    quotes: &'static [u8],
    routers: HashMap<String, RouterObject>,
    class_prefix: String,
    class_auth: bool,
    out: RouteExtraction,
}

impl<'a> Walker<'_, 'a> {
    fn handler_name(&self, target: &str) -> Option<String> {
        let name = match self.source.language {
            Language::Python => PY_DEF.captures(target).and_then(|caps| caps.get(1)),
            Language::Rust => RUST_FN.captures(target).and_then(|caps| caps.get(1)),
            _ => CALLABLE
                .captures_iter(target)
                .filter_map(|caps| caps.get(1))
                .find(|m| !NOT_HANDLER_NAMES.contains(&m.as_str())),
        };
        name.map(|m| m.as_str().to_string())
    }

    /// Declaration text from `offset` up to the end of its signature.
    fn signature(&self, offset: usize) -> &'a str {
        let text = self.source.text;
        let mut end = offset;
        for (index, line) in text[offset..].split_inclusive('\n').enumerate() {
            end += line.len();
            let trimmed = line.trim_end();
            if index >= 12 || trimmed.ends_with(':') || trimmed.contains('{') || trimmed.ends_with(';')
            {
                break;
            }
        }
        &text[offset..end]
    }

    fn flush(&mut self, pending: &[Decorator<'a>], target_offset: usize) {
        let text = self.source.text;
        let target_end = text[target_offset..]
            .find('\n')
            .map_or(text.len(), |i| target_offset + i);
        let target = &text[target_offset..target_end];
        let guarded = pending.iter().any(|d| auth::is_guard_decorator(d.text));

        if CLASS_LINE.is_match(target) {
            self.class_prefix = pending
                .iter()
                .filter(|d| CONTROLLER.is_match(d.text))
                .find_map(|controller| {
                    let args = decorator_args(controller.text, self.quotes);
                    source::positional(&args)
                        .or_else(|| source::keyword(&args, &["value", "path"]))
                        .and_then(|raw| source::first_literal(raw, self.quotes))
                })
                .unwrap_or_default();
            self.class_auth = guarded;
            return;
        }

        let anonymous = pending.iter().any(|d| auth::is_anonymous_marker(d.text));
        let signature = self.signature(target_offset);
        let handler = self.handler_name(target);
        let base_auth = guarded
            || (self.class_auth && !anonymous)
            || auth::depends_on_user(signature);

        for decorator in pending {
            match declared(decorator.text, self.quotes) {
                Declared::NotRoute => {}
                Declared::Computed { method, raw } => {
                    let warning = self.source.non_literal_path(decorator.offset, &method, raw);
                    self.out.warnings.push(warning);
                }
                Declared::Routes {
                    methods,
                    paths,
                    nested,
                    receiver,
                } => {
                    let router = receiver.and_then(|name| self.routers.get(name)).cloned();
                    let auth_required = base_auth
                        || auth::depends_on_user(decorator.text)
                        || router.as_ref().is_some_and(|router| router.auth);
                    let line = self.source.line(decorator.offset);
                    for path in &paths {
                        let path = if nested {
                            join_route(&self.class_prefix, path)
                        } else {
                            match router.as_ref().and_then(|router| router.prefix.as_deref()) {
                                Some(prefix) => join_route(prefix, path),
                                None => path.clone(),
                            }
                        };
                        for method in &methods {
                            self.out.endpoints.push(Endpoint {
                                method: method.clone(),
                                path: path.clone(),
                                handler_ref: self.source.handler(handler.clone()),
                                auth_required,
                                line,
                                idiom: DECORATOR.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }
}

/// End offset of a decorator starting at `start`, spanning lines while brackets are open.
fn decorator_end(text: &str, start: usize, line_end: usize, quotes: &[u8]) -> usize {
    let line = &text[start..line_end];
    let open = if line.starts_with("#[") {
        Some(start + 1)
    } else {
        line.find('(').and_then(|i| {
            // `@login_required def f(..)` on one line: the paren belongs to the target.
            let head = &line[..i];
            (!head.trim_end().contains(char::is_whitespace)).then_some(start + i)
        })
    };
    match open.and_then(|open| source::closing_delimiter(text, open, quotes)) {
        Some(close) => close + 1,
        None => {
            let word_end = line
                .find(char::is_whitespace)
                .map_or(line_end, |i| start + i);
            word_end.min(line_end)
        }
    }
}

pub fn extract(source: &RouteSource<'_>) -> RouteExtraction {
    let text = source.text;
    let quotes = source.quotes();
    let mut walker = Walker {
        source,
        quotes,
        routers: router_objects(text, quotes),
        class_prefix: String::new(),
        class_auth: false,
        out: RouteExtraction::default(),
    };
    let mut pending: Vec<Decorator<'_>> = Vec::new();
    let mut pos = 0usize;

    while pos < text.len() {
        let line_end = text[pos..].find('\n').map_or(text.len(), |i| pos + i);
        let line = &text[pos..line_end];
        let trimmed = line.trim_start();
        let start = pos + (line.len() - trimmed.len());

        if trimmed.starts_with('@') || trimmed.starts_with("#[") {
            let end = decorator_end(text, start, line_end, quotes);
            pending.push(Decorator {
                text: text[start..end].trim_end(),
                offset: start,
            });
            let rest_end = text[end..].find('\n').map_or(text.len(), |i| end + i);
            let rest = &text[end..rest_end];
            let rest_trimmed = rest.trim_start();
            if rest_trimmed.is_empty() || rest_trimmed.starts_with('@') {
                // Decorators sharing a line are re-scanned from the next one.
                pos = if rest_trimmed.starts_with('@') {
                    end + (rest.len() - rest_trimmed.len())
                } else {
                    rest_end + 1
                };
                continue;
            }
            let target = end + (rest.len() - rest_trimmed.len());
            walker.flush(&pending, target);
            pending.clear();
            pos = rest_end + 1;
            continue;
        }

        let is_comment = trimmed.starts_with("//")
            || trimmed.starts_with("/*")
            || trimmed.starts_with('*')
            || trimmed.starts_with('#');
        if !trimmed.is_empty() && !is_comment && !pending.is_empty() {
            walker.flush(&pending, start);
            pending.clear();
        }
        pos = line_end + 1;
    }

    walker.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type Row = (String, String, Option<String>, bool, usize);

    fn run(path: &str, language: Language, text: &str) -> Vec<Row> {
        extract(&RouteSource::new(path, language, text))
            .endpoints
            .into_iter()
            .map(|e| (e.method, e.path, e.handler_ref.symbol, e.auth_required, e.line))
            .collect()
    }

    fn row(method: &str, path: &str, symbol: &str, auth: bool, line: usize) -> Row {
        (method.into(), path.into(), Some(symbol.into()), auth, line)
    }

    #[test]
    fn flask_routes_with_methods_and_guards() {
        let text = "from flask import Blueprint\n\
                    bp = Blueprint('items', __name__, url_prefix='/items')\n\
                    \n\
                    @bp.route('/', methods=['GET', 'POST'])\n\
                    def index():\n    pass\n\
                    \n\
                    @bp.route('/<int:item_id>')\n\
                    @login_required\n\
                    def show(item_id):\n    pass\n";
        assert_eq!(
            run("app/views.py", Language::Python, text),
            vec![
                row("GET", "/items", "index", false, 4),
                row("POST", "/items", "index", false, 4),
                row("GET", "/items/<int:item_id>", "show", true, 8),
            ]
        );
    }

    #[test]
    fn fastapi_current_user_dependencies() {
        let text = "router = APIRouter()\n\
                    \n\
                    @router.get(\"/items\")\n\
                    async def list_items(db: Session = Depends(get_db)):\n    ...\n\
                    \n\
                    @router.post(\"/items\", status_code=201)\n\
                    async def create_item(\n    item: ItemIn,\n    user: User = Depends(get_current_user),\n):\n    ...\n";
        assert_eq!(
            run("app/routers/items.py", Language::Python, text),
            vec![
                row("GET", "/items", "list_items", false, 3),
                row("POST", "/items", "create_item", true, 7),
            ]
        );
    }

    #[test]
    fn nest_controllers_prefix_and_guard() {
        let text = "@Controller('items')\n\
                    export class ItemsController {\n\
                    \x20 @Get()\n\
                    \x20 findAll() {}\n\
                    \n\
                    \x20 @Get(':id')\n\
                    \x20 findOne(@Param('id') id: string) {}\n\
                    \n\
                    \x20 @Post()\n\
                    \x20 @UseGuards(JwtAuthGuard)\n\
                    \x20 create(@Body() dto: CreateItemDto) {}\n\
                    }\n";
        assert_eq!(
            run("src/items/items.controller.ts", Language::TypeScript, text),
            vec![
                row("GET", "/items", "findAll", false, 3),
                row("GET", "/items/:id", "findOne", false, 6),
                row("POST", "/items", "create", true, 9),
            ]
        );
    }

    #[test]
    fn spring_mappings_and_class_level_security() {
        let text = "@RestController\n\
                    @RequestMapping(\"/api/orders\")\n\
                    @PreAuthorize(\"isAuthenticated()\")\n\
                    public class OrderController {\n\
                    \x20   @GetMapping\n\
                    \x20   public List<Order> list() { return service.all(); }\n\
                    \x20   @GetMapping(\"/{id}\")\n\
                    \x20   public ResponseEntity<Order> get(@PathVariable Long id) { return null; }\n\
                    \x20   @RequestMapping(value = \"/sync\", method = RequestMethod.PUT)\n\
                    \x20   public void sync() {}\n\
                    }\n";
        assert_eq!(
            run("src/main/java/app/OrderController.java", Language::Java, text),
            vec![
                row("GET", "/api/orders", "list", true, 5),
                row("GET", "/api/orders/{id}", "get", true, 7),
                row("PUT", "/api/orders/sync", "sync", true, 9),
            ]
        );
    }

    #[test]
    fn actix_attribute_macros() {
        let text = "#[get(\"/health\")]\nasync fn health() -> impl Responder { \"ok\" }\n\n#[post(\"/items\")]\npub async fn create(body: web::Json<Item>) -> HttpResponse { todo!() }\n";
        assert_eq!(
            run("src/routes.rs", Language::Rust, text),
            vec![
                row("GET", "/health", "health", false, 1),
                row("POST", "/items", "create", false, 4),
            ]
        );
    }

    #[test]
    fn computed_decorator_paths_warn() {
        let out = extract(&RouteSource::new(
            "app/api.py",
            Language::Python,
            "@app.get(PREFIX + '/x')\ndef x():\n    pass\n",
        ));
        assert!(out.endpoints.is_empty());
        assert_eq!(out.warnings.len(), 1);
    }
}
