//! Lexical helpers shared by the endpoint and schema idioms.
//!
//! None of this is a parser. The scanners only know enough about quotes, comments and
//! bracket nesting to slice call arguments and declaration bodies out of source text.

use once_cell::sync::Lazy;
use recon_protocol::Language;
use regex::Regex;

static KEYWORD_ARG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s*[=:]\s*([^=][\s\S]*)$").expect("keyword arg pattern is valid")
});

static SYMBOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$]*(?:(?:\.|::)[A-Za-z_$][\w$]*)*$")
        .expect("symbol pattern is valid")
});

/// Quote characters that open string literals in `language`.
///
/// Rust is limited to `"` because lifetimes would otherwise read as unterminated literals.
pub fn quote_chars(language: Language) -> &'static [u8] {
    match language {
        Language::Rust => b"\"",
        Language::Go => b"\"`",
        Language::Java | Language::Kotlin | Language::CSharp | Language::Scala => b"\"'",
        Language::Python | Language::Ruby | Language::Php => b"\"'",
        _ => b"\"'`",
    }
}

/// 1-based line number of a byte offset.
pub fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

/// Index of the last byte of the string literal or comment starting at `i`, if one does.
fn skip_trivia(bytes: &[u8], i: usize, quotes: &[u8]) -> Option<usize> {
    let b = bytes[i];
    if b == b'/' {
        return match bytes.get(i + 1) {
            Some(b'/') => Some(
                bytes[i..]
                    .iter()
                    .position(|c| *c == b'\n')
                    .map(|pos| i + pos)
                    .unwrap_or(bytes.len() - 1),
            ),
            Some(b'*') => Some(
                bytes[i + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map(|pos| i + 2 + pos + 1)
                    .unwrap_or(bytes.len() - 1),
            ),
            _ => None,
        };
    }
    if !quotes.contains(&b) {
        return None;
    }
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            c if c == b => return Some(j),
            _ => j += 1,
        }
    }
    Some(bytes.len() - 1)
}

/// Index of the delimiter closing the bracket at `open` (`(`, `[` or `{`).
pub fn closing_delimiter(text: &str, open: usize, quotes: &[u8]) -> Option<usize> {
    let bytes = text.as_bytes();
    if !matches!(bytes.get(open), Some(b'(' | b'[' | b'{')) {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if let Some(end) = skip_trivia(bytes, i, quotes) {
            i = end + 1;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Inner text of the bracketed block opening at `open`.
pub fn block_at<'a>(text: &'a str, open: usize, quotes: &[u8]) -> Option<&'a str> {
    closing_delimiter(text, open, quotes).map(|close| &text[open + 1..close])
}

/// Splits `inner` on top-level commas; empty trailing pieces are dropped.
pub fn split_top_level<'a>(inner: &'a str, quotes: &[u8]) -> Vec<&'a str> {
    split_on(inner, b',', quotes)
}

/// Splits `inner` on a top-level separator byte.
pub fn split_on<'a>(inner: &'a str, separator: u8, quotes: &[u8]) -> Vec<&'a str> {
    let bytes = inner.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = skip_trivia(bytes, i, quotes) {
            i = end + 1;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(inner[start..].trim());
    while parts.last().is_some_and(|part| part.is_empty()) {
        parts.pop();
    }
    parts
}

/// Top-level members of a declaration body, one per line or `;`.
///
/// Nested `{..}` blocks at bracket depth zero (method bodies, accessor blocks, inline object
/// types) collapse to `{}` and comments are dropped. With `commas`, top-level commas also end
/// a member and `<..>` nesting is respected so generic arguments stay whole.
pub fn members(body: &str, quotes: &[u8], commas: bool) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut angle = 0usize;
    let mut flush = |current: &mut String| {
        let member = current.trim();
        if !member.is_empty() {
            out.push(member.to_string());
        }
        current.clear();
    };
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = skip_trivia(bytes, i, quotes) {
            if bytes[i] == b'/' {
                // A line comment stops on its newline, which still separates members.
                i = if bytes[end] == b'\n' { end } else { end + 1 };
            } else {
                current.push_str(&body[i..=end]);
                i = end + 1;
            }
            continue;
        }
        let b = bytes[i];
        match b {
            b'{' if depth == 0 => {
                current.push_str("{}");
                i = closing_delimiter(body, i, quotes).map_or(bytes.len(), |close| close + 1);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'<' if commas => angle += 1,
            b'>' if commas && i > 0 && bytes[i - 1] != b'=' => angle = angle.saturating_sub(1),
            b'\n' | b';' if depth == 0 => {
                flush(&mut current);
                i += 1;
                continue;
            }
            b',' if commas && depth == 0 && angle == 0 => {
                flush(&mut current);
                i += 1;
                continue;
            }
            _ => {}
        }
        let next = (i + 1..=bytes.len())
            .find(|j| body.is_char_boundary(*j))
            .unwrap_or(bytes.len());
        current.push_str(&body[i..next]);
        i = next;
    }
    flush(&mut current);
    out
}

/// Leading annotations of a member (`@Column(..)`, `[Key]`, `#[sea_orm(..)]`) and the rest.
pub fn split_annotations<'a>(member: &'a str, quotes: &[u8]) -> (Vec<&'a str>, &'a str) {
    let mut annotations = Vec::new();
    let mut rest = member.trim_start();
    loop {
        let end = if rest.starts_with('@') {
            let name_end = rest[1..]
                .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '.' | ':')))
                .map_or(rest.len(), |pos| pos + 1);
            if rest[name_end..].starts_with('(') {
                closing_delimiter(rest, name_end, quotes).map(|close| close + 1)
            } else {
                Some(name_end)
            }
        } else if rest.starts_with("#[") {
            closing_delimiter(rest, 1, quotes).map(|close| close + 1)
        } else if rest.starts_with('[') {
            closing_delimiter(rest, 0, quotes).map(|close| close + 1)
        } else {
            None
        };
        match end {
            Some(end) if end > 1 => {
                annotations.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            _ => return (annotations, rest),
        }
    }
}

/// Arguments of a call whose opening parenthesis sits at `open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArgs<'a> {
    pub args: Vec<&'a str>,
    /// Byte index of the closing parenthesis.
    pub end: usize,
}

pub fn call_args<'a>(text: &'a str, open: usize, quotes: &[u8]) -> Option<CallArgs<'a>> {
    let end = closing_delimiter(text, open, quotes)?;
    Some(CallArgs {
        args: split_top_level(&text[open + 1..end], quotes),
        end,
    })
}

/// Content of a plain string literal, or `None` when the argument is computed.
///
/// Python string prefixes (`r`, `u`, `b`) are accepted; interpolating literals are not.
pub fn string_literal(arg: &str) -> Option<String> {
    let arg = arg.trim();
    let body = arg.trim_start_matches(['r', 'u', 'b', 'R', 'U', 'B']);
    let quote = body.chars().next()?;
    if !matches!(quote, '"' | '\'' | '`') || body.len() < 2 || !body.ends_with(quote) {
        return None;
    }
    let inner = &body[1..body.len() - 1];
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return None;
        }
    }
    if quote == '`' && inner.contains("${") {
        return None;
    }
    Some(inner.to_string())
}

/// Dotted or path-qualified identifier named by an argument, if it is one.
pub fn symbol_of(arg: &str) -> Option<String> {
    let arg = arg.trim();
    SYMBOL.is_match(arg).then(|| arg.to_string())
}

/// Value of a `name=value` (or `name: value`) argument whose name is one of `names`.
pub fn keyword<'a>(args: &[&'a str], names: &[&str]) -> Option<&'a str> {
    args.iter().copied().find_map(|arg| {
        let caps = KEYWORD_ARG.captures(arg)?;
        let key = caps.get(1)?.as_str();
        names
            .contains(&key)
            .then(|| caps.get(2).map(|m| m.as_str().trim()))
            .flatten()
    })
}

/// First argument that is not a keyword argument.
pub fn positional<'a>(args: &[&'a str]) -> Option<&'a str> {
    args.iter().copied().find(|arg| !KEYWORD_ARG.is_match(arg))
}

/// Value of an object-literal entry, tolerating quoted keys.
pub fn entry_value<'o>(entries: &[&'o str], key: &str) -> Option<&'o str> {
    entries.iter().copied().find_map(|entry| {
        let (name, value) = entry.split_once(':')?;
        (name.trim().trim_matches(['\'', '"']) == key).then(|| value.trim())
    })
}

/// First string literal inside `text`, in order of appearance.
pub fn first_literal(text: &str, quotes: &[u8]) -> Option<String> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|b| quotes.contains(b))?;
    let end = skip_trivia(bytes, start, quotes)?;
    string_literal(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const JS: &[u8] = b"\"'`";

    #[test]
    fn call_args_respect_nesting_and_strings() {
        let text = "router.get('/a,b', auth({ roles: ['x', 'y'] }), (req, res) => res.send(')'));";
        let open = text.find('(').unwrap();
        let call = call_args(text, open, JS).unwrap();
        assert_eq!(
            call.args,
            vec![
                "'/a,b'",
                "auth({ roles: ['x', 'y'] })",
                "(req, res) => res.send(')')"
            ]
        );
        assert_eq!(&text[call.end..], ");");
    }

    #[test]
    fn comments_do_not_close_blocks() {
        let text = "{ // }\n a: 1, /* } */ b: 2 }";
        assert_eq!(closing_delimiter(text, 0, JS), Some(text.len() - 1));
    }

    #[test]
    fn block_body_outlives_the_quote_set() {
        let text = String::from("model User { id: Int, tags: [String] } trailing");
        let open = text.find('{').unwrap();
        let body = {
            let quotes = vec![b'"'];
            block_at(&text, open, &quotes)
        };
        assert_eq!(body, Some(" id: Int, tags: [String] "));
        assert_eq!(block_at("{ never closed", 0, JS), None);
    }

    #[test]
    fn literals_and_symbols() {
        assert_eq!(string_literal("'/items'"), Some("/items".to_string()));
        assert_eq!(string_literal("r'^items/$'"), Some("^items/$".to_string()));
        assert_eq!(string_literal("`/items/${id}`"), None);
        assert_eq!(string_literal("'/a' + '/b'"), None);
        assert_eq!(string_literal("PATH"), None);
        assert_eq!(symbol_of("controller.list"), Some("controller.list".to_string()));
        assert_eq!(symbol_of("handlers::list_items"), Some("handlers::list_items".to_string()));
        assert_eq!(symbol_of("(req, res) => {}"), None);
    }

    #[test]
    fn line_numbers_are_one_based() {
        let text = "a\nb\nc";
        assert_eq!(line_of(text, 0), 1);
        assert_eq!(line_of(text, 2), 2);
        assert_eq!(line_of(text, 4), 3);
    }

    #[test]
    fn trailing_commas_are_dropped() {
        assert_eq!(split_top_level("a, b,\n", JS), vec!["a", "b"]);
        assert_eq!(split_top_level("", JS), Vec::<&str>::new());
    }

    #[test]
    fn members_collapse_nested_blocks() {
        let body = "\n  @Column({ nullable: true })\n  name: string; // display\n  greet(): string {\n    return `hi;`;\n  }\n  tags: Record<string, number>, age: number\n";
        assert_eq!(
            members(body, JS, true),
            vec![
                "@Column({ nullable: true })",
                "name: string",
                "greet(): string {}",
                "tags: Record<string, number>",
                "age: number"
            ]
        );
        assert_eq!(
            members("public string Name { get; set; }\n", b"\"'", false),
            vec!["public string Name {}"]
        );
    }

    #[test]
    fn annotations_split_off_members() {
        let (annotations, rest) =
            split_annotations("@Id @GeneratedValue(strategy = AUTO) private Long id", JS);
        assert_eq!(annotations, vec!["@Id", "@GeneratedValue(strategy = AUTO)"]);
        assert_eq!(rest, "private Long id");
        let (annotations, rest) = split_annotations("[Key] public int Id {}", JS);
        assert_eq!(annotations, vec!["[Key]"]);
        assert_eq!(rest, "public int Id {}");
        let (annotations, rest) = split_annotations("#[sea_orm(primary_key)]", b"\"");
        assert_eq!(annotations, vec!["#[sea_orm(primary_key)]"]);
        assert_eq!(rest, "");
    }
}
