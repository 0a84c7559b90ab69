//! Import statements per language, reduced to references the resolver can place in the tree.

use once_cell::sync::Lazy;
use recon_protocol::paths::{file_name, join_normalized, parent_dir};
use recon_protocol::Language;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRef {
    /// Path relative to the importing file's directory (`./x`, `../y`, `require_relative`).
    Relative(String),
    /// Segments below a directory fixed by the statement itself (`crate::`, `from ..x`, `@/`).
    Anchored { dir: String, segments: Vec<String> },
    /// Dotted or slashed module path, placed by matching directories and files in the tree.
    Module(Vec<String>),
}

static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)(?:^|[^\w.$])(?:import\s+(?:type\s+)?(?:[\w*{}\s,$]+?\s+from\s+)?|export\s+(?:type\s+)?[\w*{}\s,$]+?\s+from\s+|require\s*\(\s*|import\s*\(\s*)['"]([^'"\n]+)['"]"#,
    )
    .expect("js import pattern is valid")
});

static PY_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*from[ \t]+(\.*)([\w.]*)[ \t]+import[ \t]+\(?([\w*, \t]+)")
        .expect("python from pattern is valid")
});

static PY_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*import[ \t]+([\w.]+(?:[ \t]+as[ \t]+\w+)?(?:[ \t]*,[ \t]*[\w.]+(?:[ \t]+as[ \t]+\w+)?)*)")
        .expect("python import pattern is valid")
});

static RUST_USE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?use[ \t]+(crate|super|self)::([^;]+);")
        .expect("rust use pattern is valid")
});

static GO_SINGLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]+)?"([^"]+)""#)
        .expect("go import pattern is valid")
});

static GO_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^[ \t]*import[ \t]*\((.*?)\)").expect("go import block pattern is valid")
});

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"\n]+)""#).expect("quoted string pattern is valid"));

static JVM_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*import[ \t]+(?:static[ \t]+)?([\w.]+)")
        .expect("jvm import pattern is valid")
});

static CSHARP_USING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*using[ \t]+(?:static[ \t]+)?([\w.]+)[ \t]*;")
        .expect("csharp using pattern is valid")
});

static PHP_USE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*use[ \t]+([\w\\]+)(?:[ \t]+as[ \t]+\w+)?[ \t]*;")
        .expect("php use pattern is valid")
});

static RUBY_REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*require(_relative)?[ \t(]+['"]([^'"]+)['"]"#)
        .expect("ruby require pattern is valid")
});

static C_INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*#[ \t]*include[ \t]+"([^"]+)""#).expect("include pattern is valid")
});

/// Every import reference in `text`, in source order.
pub fn import_refs(path: &str, language: Language, text: &str) -> Vec<ImportRef> {
    match language {
        Language::TypeScript
        | Language::JavaScript
        | Language::Vue
        | Language::Svelte => js_refs(text),
        Language::Python => python_refs(path, text),
        Language::Rust => rust_refs(path, text),
        Language::Go => go_refs(text),
        Language::Java | Language::Kotlin | Language::Scala => {
            dotted(&JVM_IMPORT, text, '.')
        }
        Language::CSharp => dotted(&CSHARP_USING, text, '.'),
        Language::Php => dotted(&PHP_USE, text, '\\'),
        Language::Ruby => ruby_refs(text),
        Language::C | Language::Cpp => C_INCLUDE
            .captures_iter(text)
            .map(|caps| ImportRef::Relative(caps[1].to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn segments(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn js_refs(text: &str) -> Vec<ImportRef> {
    JS_IMPORT
        .captures_iter(text)
        .filter_map(|caps| {
            let spec = caps.get(1)?.as_str();
            if spec.starts_with('.') {
                return Some(ImportRef::Relative(spec.to_string()));
            }
            // Common bundler aliases for the source root.
            let aliased = spec
                .strip_prefix("@/")
                .or_else(|| spec.strip_prefix("~/"))?;
            Some(ImportRef::Anchored {
                dir: "src".to_string(),
                segments: segments(aliased, '/'),
            })
        })
        .collect()
}

fn python_refs(path: &str, text: &str) -> Vec<ImportRef> {
    let mut refs = Vec::new();
    for caps in PY_FROM.captures_iter(text) {
        let dots = caps[1].len();
        let module = segments(&caps[2], '.');
        if dots == 0 {
            refs.push(ImportRef::Module(module));
            continue;
        }
        let mut dir = parent_dir(path).to_string();
        for _ in 1..dots {
            dir = parent_dir(&dir).to_string();
        }
        if module.is_empty() {
            // `from . import views` names sibling modules.
            for name in caps[3].split(',').map(str::trim).filter(|n| !n.is_empty() && *n != "*") {
                let name = name.split_whitespace().next().unwrap_or(name);
                refs.push(ImportRef::Anchored { dir: dir.clone(), segments: vec![name.to_string()] });
            }
        } else {
            refs.push(ImportRef::Anchored { dir, segments: module });
        }
    }
    for caps in PY_IMPORT.captures_iter(text) {
        for item in caps[1].split(',') {
            let module = item.split_whitespace().next().unwrap_or_default();
            refs.push(ImportRef::Module(segments(module, '.')));
        }
    }
    refs
}

/// Expands one level of `{a, b::c}` grouping in a `use` tail.
fn expand_use_tree(tail: &str) -> Vec<String> {
    let tail = tail.split_whitespace().collect::<Vec<_>>().join(" ");
    let Some(open) = tail.find('{') else {
        return vec![tail];
    };
    let prefix = tail[..open].trim();
    let inner = tail[open + 1..].trim_end_matches('}');
    let mut depth = 0usize;
    let mut items = Vec::new();
    let mut start = 0;
    for (i, ch) in inner.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&inner[start..]);
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty() && *item != "self")
        .map(|item| {
            let item = item.split('{').next().unwrap_or(item);
            format!("{prefix}{item}")
        })
        .collect()
}

fn rust_module_dir(path: &str) -> String {
    let name = file_name(path);
    let dir = parent_dir(path);
    if matches!(name, "mod.rs" | "lib.rs" | "main.rs") {
        dir.to_string()
    } else {
        join_normalized(dir, name.trim_end_matches(".rs"))
    }
}

fn rust_crate_dir(path: &str) -> String {
    let mut dir = parent_dir(path);
    loop {
        if file_name(dir) == "src" {
            return dir.to_string();
        }
        if dir.is_empty() {
            return parent_dir(path).to_string();
        }
        dir = parent_dir(dir);
    }
}

fn rust_refs(path: &str, text: &str) -> Vec<ImportRef> {
    let mut refs = Vec::new();
    for caps in RUST_USE.captures_iter(text) {
        let dir = match &caps[1] {
            "crate" => rust_crate_dir(path),
            "super" => parent_dir(&rust_module_dir(path)).to_string(),
            _ => rust_module_dir(path),
        };
        for item in expand_use_tree(&caps[2]) {
            let item = item.split(" as ").next().unwrap_or(&item).to_string();
            let segments: Vec<String> = segments(&item, ':')
                .into_iter()
                .filter(|s| s != "*")
                .collect();
            refs.push(ImportRef::Anchored { dir: dir.clone(), segments });
        }
    }
    refs
}

fn go_refs(text: &str) -> Vec<ImportRef> {
    let mut refs: Vec<ImportRef> = GO_SINGLE
        .captures_iter(text)
        .map(|caps| ImportRef::Module(segments(&caps[1], '/')))
        .collect();
    for block in GO_BLOCK.captures_iter(text) {
        for caps in QUOTED.captures_iter(&block[1]) {
            refs.push(ImportRef::Module(segments(&caps[1], '/')));
        }
    }
    refs
}

fn dotted(pattern: &Regex, text: &str, separator: char) -> Vec<ImportRef> {
    pattern
        .captures_iter(text)
        .map(|caps| ImportRef::Module(segments(&caps[1], separator)))
        .collect()
}

fn ruby_refs(text: &str) -> Vec<ImportRef> {
    RUBY_REQUIRE
        .captures_iter(text)
        .map(|caps| {
            let target = caps[2].to_string();
            if caps.get(1).is_some() || target.starts_with('.') {
                ImportRef::Relative(target)
            } else {
                ImportRef::Module(segments(&target, '/'))
            }
        })
        .collect()
}
