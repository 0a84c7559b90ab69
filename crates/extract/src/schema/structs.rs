//! Typed record declarations: TypeScript / Java / C# / Kotlin classes and interfaces
//! (TypeORM, JPA, EF Core annotations included), Go structs with gorm tags, Rust structs.

use super::{normalize, orm, ModelSource, RawEntity, RawField};
use crate::source;
use once_cell::sync::Lazy;
use recon_protocol::{FieldType, Language, RelationKind};
use regex::Regex;
use std::collections::HashSet;

static CLASS_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:export|default|public|private|protected|internal|abstract|data|open|sealed|partial|final|static|declare|case|inline|value)\s+)*(?:class|interface|record)\s+(\w+)\s*(?:<[^>{(\n]*>)?",
    )
    .expect("class head pattern is valid")
});

static TS_OBJECT_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:export\s+)?(?:declare\s+)?type\s+(\w+)\s*(?:<[^>=]*>)?\s*=\s*\{")
        .expect("object alias pattern is valid")
});

static OPAQUE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)\benum\s+(?:class\s+)?(\w+)|\btype\s+(\w+)\s*=\s*['"|]|^type\s+(\w+)\s+(?:string|bool|u?int\w*|float\w*|byte|rune)\s*$"#,
    )
    .expect("opaque type pattern is valid")
});

static TS_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:public|private|protected|readonly|declare|static|override|abstract|export)\s+)*(\w+)\s*([?!])?\s*:\s*(.+?)\s*(?:=[^>].*)?$",
    )
    .expect("ts member pattern is valid")
});

static TYPED_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:public|private|protected|internal|static|final|transient|volatile|virtual|override|required|readonly|const|abstract|sealed|new)\s+)*([\w.?<>\[\], ]+?)\s+(\w+)\s*(?:\{\})?\s*(?:=.*)?$",
    )
    .expect("typed member pattern is valid")
});

static PROPERTY_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:private|public|internal|protected|override|open|lateinit|final|const|abstract)\s+)*(?:val|var|let)\s+(\w+)\s*:\s*(.+?)\s*(?:=.*)?$",
    )
    .expect("property member pattern is valid")
});

const NON_ENTITY_TYPES: &[&str] = &[
    "Array", "Record", "Map", "HashMap", "BTreeMap", "Dictionary", "Object", "Promise", "Buffer",
    "Uint8Array", "JSON", "Json", "JsonNode", "JsonValue", "Value", "Function", "Set", "Any",
    "Unit", "Blob", "TimeSpan", "Duration", "Self", "Partial", "Omit", "Pick", "Readonly",
    "Class", "Type", "Error", "RegExp", "Symbol",
];

const LIST_WRAPPERS: &[&str] = &[
    "Array", "ReadonlyArray", "List", "ArrayList", "LinkedList", "Set", "HashSet", "TreeSet",
    "Collection", "ICollection", "IEnumerable", "IList", "IReadOnlyCollection", "IReadOnlyList",
    "ISet", "Vec", "VecDeque", "Seq", "MutableList", "MutableSet", "Iterable",
];

const NULLABLE_WRAPPERS: &[&str] = &["Option", "Optional", "Nullable", "Maybe"];

const TRANSPARENT_WRAPPERS: &[&str] = &[
    "Box", "Arc", "Rc", "Lazy", "Ref", "Reference", "IdentifiedReference", "Relation", "Promise",
    "Mapped",
];

/// A declared type reduced to its element type.
#[derive(Debug, Clone, PartialEq)]
struct TypeShape {
    base: String,
    nullable: bool,
    list: bool,
}

fn type_shape(raw: &str) -> TypeShape {
    let mut nullable = false;
    let mut list = false;

    let mut ty = raw.trim().to_string();
    let parts = source::split_on(&ty, b'|', b"\"'`");
    if parts.len() > 1 {
        let kept: Vec<&str> = parts
            .iter()
            .copied()
            .filter(|part| !matches!(*part, "null" | "undefined" | "nil"))
            .collect();
        nullable = kept.len() < parts.len();
        ty = match kept.as_slice() {
            [single] => single.to_string(),
            many if many.iter().all(|part| source::string_literal(part).is_some()) => {
                "string".to_string()
            }
            _ => String::new(),
        };
    }

    loop {
        let current = ty.trim().to_string();
        if let Some(rest) = current.strip_suffix('?') {
            nullable = true;
            ty = rest.to_string();
        } else if let Some(rest) = current.strip_prefix('*') {
            nullable = true;
            ty = rest.to_string();
        } else if let Some(rest) = current.strip_suffix("[]") {
            list = true;
            ty = rest.to_string();
        } else if let Some(rest) = current.strip_prefix("[]") {
            list = true;
            ty = rest.to_string();
        } else if current.starts_with("map[") {
            ty = "map".to_string();
            break;
        } else if let Some((outer, inner)) = current
            .strip_suffix('>')
            .and_then(|head| head.split_once('<'))
        {
            let outer = outer.rsplit(['.', ':']).next().unwrap_or(outer).trim();
            let first = inner.split(',').next().unwrap_or(inner);
            if LIST_WRAPPERS.contains(&outer) {
                list = true;
            } else if NULLABLE_WRAPPERS.contains(&outer) {
                nullable = true;
            } else if !TRANSPARENT_WRAPPERS.contains(&outer) {
                ty = current;
                break;
            }
            ty = first.to_string();
        } else {
            ty = current;
            break;
        }
    }
    TypeShape {
        base: ty,
        nullable,
        list,
    }
}

/// Entity named by a type, when it is a bare capitalized name outside the known vocabulary.
fn relation_target(base: &str, opaque: &HashSet<String>) -> Option<String> {
    let plain = base.chars().all(|c| c.is_alphanumeric() || c == '_');
    let capitalized = base.chars().next().is_some_and(char::is_uppercase);
    (plain
        && capitalized
        && normalize(base) == FieldType::Unknown
        && !NON_ENTITY_TYPES.contains(&base)
        && !opaque.contains(base))
    .then(|| base.to_string())
}

fn typed_field(name: &str, raw_type: &str, opaque: &HashSet<String>) -> RawField {
    let shape = type_shape(raw_type);
    let mut field = match relation_target(&shape.base, opaque) {
        Some(target) => {
            let mut field = RawField::new(name, FieldType::Relation);
            field.target = Some(target);
            field
        }
        None => RawField::new(name, normalize(&shape.base)),
    };
    field.nullable = shape.nullable;
    field.list = shape.list;
    field
}

fn opaque_types(text: &str) -> HashSet<String> {
    OPAQUE_TYPE
        .captures_iter(text)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

fn annotation_name(annotation: &str) -> &str {
    let body = annotation.trim_start_matches(['@', '#', '[']);
    let head = body
        .split(|c: char| c == '(' || c == ']' || c == ',' || c.is_whitespace())
        .next()
        .unwrap_or(body);
    head.rsplit([':', '.']).next().unwrap_or(head)
}

fn annotation_args<'a>(annotation: &'a str, quotes: &[u8]) -> Vec<&'a str> {
    annotation
        .find('(')
        .and_then(|open| source::call_args(annotation, open, quotes))
        .map(|call| call.args)
        .unwrap_or_default()
}

/// Option value from either `key = value` arguments or a `{ key: value }` options object.
fn option<'a>(args: &[&'a str], key: &str, quotes: &[u8]) -> Option<&'a str> {
    source::keyword(args, &[key]).or_else(|| {
        args.iter().copied().find_map(|arg| {
            let inner = arg.trim().strip_prefix('{')?.strip_suffix('}')?;
            source::entry_value(&source::split_top_level(inner, quotes), key)
        })
    })
}

/// Target of `() => User`, `type => User`, `"User"` or `User.class`.
fn relation_argument(arg: &str) -> Option<String> {
    let arg = arg.trim();
    let target = arg.rsplit("=>").next().unwrap_or(arg).trim();
    let target = target.strip_suffix(".class").unwrap_or(target);
    source::string_literal(target).or_else(|| source::symbol_of(target))
}

/// Applies ORM annotations to a field; join columns land in `covered`.
fn apply_annotations(
    field: &mut RawField,
    annotations: &[&str],
    quotes: &[u8],
    covered: &mut Vec<String>,
) {
    for annotation in annotations {
        let args = annotation_args(annotation, quotes);
        let flag = |key: &str| option(&args, key, quotes).map(|value| value.trim() == "true");
        match annotation_name(annotation) {
            "PrimaryGeneratedColumn" | "PrimaryColumn" | "ObjectIdColumn" | "Id" | "Key"
            | "EmbeddedId" | "PrimaryKey" => field.primary = true,
            "Column" | "Property" => {
                if let Some(nullable) = flag("nullable") {
                    field.nullable = nullable;
                }
                if flag("unique") == Some(true) {
                    field.unique = true;
                }
            }
            "Unique" => field.unique = true,
            "NotNull" | "NonNull" | "Required" | "NotBlank" | "NotEmpty" => field.nullable = false,
            "Nullable" => field.nullable = true,
            kind @ ("ManyToOne" | "OneToMany" | "OneToOne" | "ManyToMany") => {
                if field.target.is_none() {
                    field.target = args.first().and_then(|arg| relation_argument(arg));
                }
                if field.target.is_some() {
                    field.field_type = FieldType::Relation;
                }
                match kind {
                    "OneToMany" => field.list = true,
                    "OneToOne" => {
                        field.unique = true;
                        field.kind = Some(RelationKind::OneToOne);
                    }
                    "ManyToMany" => {
                        field.list = true;
                        field.kind = Some(RelationKind::ManyToMany);
                    }
                    _ => {}
                }
            }
            "JoinColumn" => {
                if let Some(column) = option(&args, "name", quotes).and_then(source::string_literal) {
                    covered.push(column);
                }
            }
            _ if annotation.starts_with("#[") => {
                if annotation.contains("primary_key") {
                    field.primary = true;
                }
                if annotation.contains("unique") {
                    field.unique = true;
                }
            }
            _ => {}
        }
    }
}

/// Field declared by one member in the syntax of `language`.
fn member_field(member: &str, language: Language, opaque: &HashSet<String>) -> Option<RawField> {
    if member.split_whitespace().any(|word| word == "static") {
        return None;
    }
    match language {
        Language::TypeScript | Language::JavaScript | Language::Vue | Language::Svelte => {
            let caps = TS_MEMBER.captures(member)?;
            let name = caps.get(1)?.as_str();
            let mut field = typed_field(name, caps.get(3)?.as_str(), opaque);
            if caps.get(2).is_some_and(|m| m.as_str() == "?") {
                field.nullable = true;
            }
            Some(field)
        }
        Language::Kotlin | Language::Scala | Language::Swift => {
            let caps = PROPERTY_MEMBER
                .captures(member)
                .or_else(|| TS_MEMBER.captures(member))?;
            let (name, raw_type) = match caps.len() {
                3 => (caps.get(1)?, caps.get(2)?),
                _ => (caps.get(1)?, caps.get(3)?),
            };
            Some(typed_field(name.as_str(), raw_type.as_str(), opaque))
        }
        _ => {
            let declaration = member.split('=').next().unwrap_or(member);
            if declaration.contains('(') {
                return None;
            }
            let caps = TYPED_MEMBER.captures(member)?;
            let raw_type = caps.get(1)?.as_str().trim();
            if matches!(
                raw_type.split_whitespace().last(),
                Some("class" | "enum" | "interface" | "record" | "struct" | "return" | "event")
            ) {
                return None;
            }
            Some(typed_field(caps.get(2)?.as_str(), raw_type, opaque))
        }
    }
}

/// Fields of a list of members, carrying annotations that sit on their own lines.
fn collect_fields(
    members: &[String],
    language: Language,
    quotes: &[u8],
    opaque: &HashSet<String>,
    entity: &mut RawEntity,
) {
    let mut pending: Vec<&str> = Vec::new();
    for member in members {
        let (annotations, rest) = source::split_annotations(member, quotes);
        pending.extend(annotations);
        if rest.is_empty() {
            continue;
        }
        if let Some(mut field) = member_field(rest, language, opaque) {
            apply_annotations(&mut field, &pending, quotes, &mut entity.covered);
            if field.target.is_none() && field.field_type == FieldType::Relation {
                field.field_type = FieldType::Unknown;
            }
            entity.fields.push(field);
        }
        pending.clear();
    }
}

pub fn detect_classes(text: &str) -> bool {
    CLASS_HEAD.is_match(text) || TS_OBJECT_ALIAS.is_match(text)
}

pub fn extract_classes(source: &ModelSource<'_>) -> Vec<RawEntity> {
    if source.language == Language::Python {
        return orm::extract_python_classes(source);
    }
    let text = source.text;
    let quotes = source.quotes();
    let language = source.language;
    let commas = matches!(
        language,
        Language::TypeScript | Language::JavaScript | Language::Vue | Language::Svelte
    );
    let opaque = opaque_types(text);

    // (declaration start, name, offset where the header continues)
    let mut heads: Vec<(usize, &str, usize)> = CLASS_HEAD
        .captures_iter(text)
        .chain(TS_OBJECT_ALIAS.captures_iter(text))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            let resume = if whole.as_str().ends_with('{') {
                whole.end() - 1
            } else {
                whole.end()
            };
            Some((whole.start(), name.as_str(), resume))
        })
        .collect();
    heads.sort_by_key(|head| head.0);

    let mut out = Vec::new();
    for (index, &(_, name, resume)) in heads.iter().enumerate() {
        let bound = heads.get(index + 1).map_or(text.len(), |next| next.0);
        let mut entity = RawEntity::new(name);
        let mut pos = resume.min(bound);

        let header = &text[pos..bound];
        if header.trim_start().starts_with('(') {
            let open = pos + (header.len() - header.trim_start().len());
            if let Some(params) = source::call_args(text, open, quotes) {
                let params: Vec<String> = params.args.iter().map(|p| p.to_string()).collect();
                collect_fields(&params, language, quotes, &opaque, &mut entity);
            }
            pos = source::closing_delimiter(text, open, quotes).map_or(bound, |close| close + 1);
        }

        if pos < bound {
            let header = &text[pos..bound];
            if let Some(stop) = header.find(['{', ';', '}']) {
                if header.as_bytes()[stop] == b'{' {
                    if let Some(body) = source::block_at(text, pos + stop, quotes) {
                        let members = source::members(body, quotes, commas);
                        collect_fields(&members, language, quotes, &opaque, &mut entity);
                    }
                }
            }
        }

        if !entity.fields.is_empty() {
            out.push(entity);
        }
    }
    out
}

static GO_STRUCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*type\s+(\w+)\s+struct\s*\{").expect("go struct pattern is valid")
});

static GO_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_]\w*(?:\s*,\s*[A-Za-z_]\w*)*)\s+([^\s`]+(?:\s*\{\})?)\s*(`[^`]*`)?$")
        .expect("go field pattern is valid")
});

static GORM_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"gorm:"([^"]*)""#).expect("gorm tag pattern is valid"));

pub fn detect_go(text: &str) -> bool {
    GO_STRUCT.is_match(text)
}

fn apply_gorm_tag(field: &mut RawField, tag: &str, covered: &mut Vec<String>) {
    for setting in tag.split(';').map(str::trim) {
        let (key, value) = setting.split_once(':').unwrap_or((setting, ""));
        match key.trim().to_ascii_lowercase().as_str() {
            "primarykey" | "primary_key" => field.primary = true,
            "unique" | "uniqueindex" => field.unique = true,
            "not null" => field.nullable = false,
            "foreignkey" => covered.extend(value.split(',').map(|c| c.trim().to_string())),
            "many2many" => {
                field.list = true;
                field.kind = Some(RelationKind::ManyToMany);
            }
            _ => {}
        }
    }
}

pub fn extract_go(source: &ModelSource<'_>) -> Vec<RawEntity> {
    let text = source.text;
    let quotes = source.quotes();
    let opaque = opaque_types(text);
    let mut out = Vec::new();
    for caps in GO_STRUCT.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(body) = source::block_at(text, whole.end() - 1, quotes) else {
            continue;
        };
        let mut entity = RawEntity::new(name.as_str());
        for member in source::members(body, quotes, false) {
            let Some(field) = GO_FIELD.captures(&member) else {
                continue;
            };
            let (Some(names), Some(raw_type)) = (field.get(1), field.get(2)) else {
                continue;
            };
            let raw_type = raw_type.as_str();
            let qualified_null = raw_type
                .rsplit('.')
                .next()
                .is_some_and(|last| raw_type.contains('.') && last.starts_with("Null"));
            let tag = field.get(3).map(|m| m.as_str()).unwrap_or_default();
            for field_name in names.as_str().split(',').map(str::trim) {
                let mut raw = typed_field(field_name, raw_type, &opaque);
                raw.nullable |= qualified_null;
                if let Some(gorm) = GORM_TAG.captures(tag).and_then(|c| c.get(1)) {
                    apply_gorm_tag(&mut raw, gorm.as_str(), &mut entity.covered);
                }
                entity.fields.push(raw);
            }
        }
        out.push(entity);
    }
    out
}

static RUST_STRUCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?\s+)?struct\s+(\w+)\s*(?:<[^>{]*>)?\s*(?:where[^{]*)?\{")
        .expect("rust struct pattern is valid")
});

static RUST_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(\w+)\s*:\s*(.+?)\s*,?$").expect("rust field pattern is valid")
});

pub fn detect_rust(text: &str) -> bool {
    RUST_STRUCT.is_match(text)
}

pub fn extract_rust(source: &ModelSource<'_>) -> Vec<RawEntity> {
    let text = source.text;
    let quotes = source.quotes();
    let opaque = opaque_types(text);
    let mut out = Vec::new();
    for caps in RUST_STRUCT.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(body) = source::block_at(text, whole.end() - 1, quotes) else {
            continue;
        };
        let mut entity = RawEntity::new(name.as_str());
        let mut pending: Vec<String> = Vec::new();
        // Fields end with commas, so split on those as well as newlines.
        for member in source::members(body, quotes, true) {
            let (annotations, rest) = source::split_annotations(&member, quotes);
            pending.extend(annotations.iter().map(|a| a.to_string()));
            if rest.is_empty() {
                continue;
            }
            if let Some(field) = RUST_FIELD.captures(rest) {
                if let (Some(field_name), Some(raw_type)) = (field.get(1), field.get(2)) {
                    let mut raw = typed_field(field_name.as_str(), raw_type.as_str(), &opaque);
                    let attributes: Vec<&str> = pending.iter().map(String::as_str).collect();
                    apply_annotations(&mut raw, &attributes, quotes, &mut entity.covered);
                    entity.fields.push(raw);
                }
            }
            pending.clear();
        }
        out.push(entity);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn summary(entity: &RawEntity) -> Vec<(&str, FieldType, bool, bool, Option<&str>)> {
        entity
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.as_str(),
                    f.field_type,
                    f.nullable,
                    f.list,
                    f.target.as_deref(),
                )
            })
            .collect()
    }

    #[test]
    fn type_shapes_unwrap_wrappers() {
        let shape = |raw: &str| {
            let s = type_shape(raw);
            (s.base, s.nullable, s.list)
        };
        assert_eq!(shape("Tag[]"), ("Tag".to_string(), false, true));
        assert_eq!(shape("User | null"), ("User".to_string(), true, false));
        assert_eq!(shape("Promise<Array<Post>>"), ("Post".to_string(), false, true));
        assert_eq!(shape("Option<Vec<String>>"), ("String".to_string(), true, true));
        assert_eq!(shape("[]*Order"), ("Order".to_string(), true, true));
        assert_eq!(shape("List<Post>?"), ("Post".to_string(), true, true));
        assert_eq!(shape("'draft' | 'published'"), ("string".to_string(), false, false));
        assert_eq!(shape("map[string]int"), ("map".to_string(), false, false));
        assert_eq!(
            shape("DateTime<Utc>"),
            ("DateTime<Utc>".to_string(), false, false)
        );
    }

    #[test]
    fn typeorm_entities() {
        let text = r#"
import { Entity, PrimaryGeneratedColumn, Column, ManyToOne, OneToMany, JoinColumn } from 'typeorm';

export enum Status { Draft = 'draft', Live = 'live' }

@Entity()
export class Article {
  @PrimaryGeneratedColumn('uuid')
  id: string;

  @Column({ unique: true })
  slug: string;

  @Column({ type: 'text', nullable: true })
  body: string;

  @Column({ type: 'enum', enum: Status })
  status: Status;

  @ManyToOne(() => Account, (account) => account.articles)
  @JoinColumn({ name: 'owner_id' })
  owner: Account;

  @Column()
  owner_id: string;

  @OneToMany(() => Comment, (comment) => comment.article)
  comments: Comment[];

  get title(): string {
    return this.slug;
  }
}
"#;
        let source = ModelSource::new("src/entities/article.ts", Language::TypeScript, text);
        let entities = extract_classes(&source);
        assert_eq!(entities.len(), 1);
        let article = &entities[0];
        assert_eq!(article.name, "Article");
        assert_eq!(
            summary(article),
            vec![
                ("id", FieldType::String, false, false, None),
                ("slug", FieldType::String, false, false, None),
                ("body", FieldType::String, true, false, None),
                ("status", FieldType::Unknown, false, false, None),
                ("owner", FieldType::Relation, false, false, Some("Account")),
                ("owner_id", FieldType::String, false, false, None),
                ("comments", FieldType::Relation, false, true, Some("Comment")),
            ]
        );
        assert!(article.fields[0].primary);
        assert!(article.fields[1].unique);
        assert_eq!(article.covered, vec!["owner_id".to_string()]);
    }

    #[test]
    fn type_aliases_and_interfaces() {
        let text = "export type Profile = {\n  handle: string,\n  links: Array<string>,\n  owner?: User,\n};\n\nexport interface Repo {\n  find(id: string): Promise<Profile>;\n}\n";
        let source = ModelSource::new("src/models/profile.ts", Language::TypeScript, text);
        let entities = extract_classes(&source);
        assert_eq!(entities.len(), 1);
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("handle", FieldType::String, false, false, None),
                ("links", FieldType::String, false, true, None),
                ("owner", FieldType::Relation, true, false, Some("User")),
            ]
        );
    }

    #[test]
    fn jpa_entities() {
        let text = r#"
package com.shop.model;

@Entity
@Table(name = "orders")
public class Order {
    @Id
    @GeneratedValue(strategy = GenerationType.IDENTITY)
    private Long id;

    @Column(nullable = false, unique = true)
    private String reference;

    @ManyToOne(fetch = FetchType.LAZY)
    @JoinColumn(name = "customer_id")
    private Customer customer;

    @OneToMany(mappedBy = "order")
    private List<OrderLine> lines = new ArrayList<>();

    private static final long serialVersionUID = 1L;

    public Long getId() {
        return id;
    }
}
"#;
        let source = ModelSource::new("src/main/java/com/shop/model/Order.java", Language::Java, text);
        let entities = extract_classes(&source);
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("id", FieldType::Integer, false, false, None),
                ("reference", FieldType::String, false, false, None),
                ("customer", FieldType::Relation, false, false, Some("Customer")),
                ("lines", FieldType::Relation, false, true, Some("OrderLine")),
            ]
        );
        assert!(entities[0].fields[0].primary);
        assert!(entities[0].fields[1].unique);
        assert_eq!(entities[0].covered, vec!["customer_id".to_string()]);
    }

    #[test]
    fn csharp_properties_and_kotlin_data_classes() {
        let csharp = "public class Invoice\n{\n    [Key]\n    public int Id { get; set; }\n    public string? Notes { get; set; }\n    public int CustomerId { get; set; }\n    public virtual ICollection<InvoiceLine> Lines { get; set; } = new List<InvoiceLine>();\n    public decimal Total() => 0m;\n}\n";
        let source = ModelSource::new("Models/Invoice.cs", Language::CSharp, csharp);
        let entities = extract_classes(&source);
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("Id", FieldType::Integer, false, false, None),
                ("Notes", FieldType::String, true, false, None),
                ("CustomerId", FieldType::Integer, false, false, None),
                ("Lines", FieldType::Relation, false, true, Some("InvoiceLine")),
            ]
        );
        assert!(entities[0].fields[0].primary);

        let kotlin = "@Entity\ndata class Member(\n    @Id val id: Long,\n    val email: String?,\n    val team: Team,\n)\n\nclass Team(val name: String)\n";
        let source = ModelSource::new("src/main/kotlin/Member.kt", Language::Kotlin, kotlin);
        let entities = extract_classes(&source);
        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Member", "Team"]);
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("id", FieldType::Integer, false, false, None),
                ("email", FieldType::String, true, false, None),
                ("team", FieldType::Relation, false, false, Some("Team")),
            ]
        );
        assert!(entities[0].fields[0].primary);
    }

    #[test]
    fn python_dataclasses_go_through_annotations() {
        let text = "from dataclasses import dataclass, field\n\n@dataclass\nclass Note:\n    title: str\n    tags: list[str] = field(default_factory=list)\n    author: Optional[Author] = None\n\nclass Color(Enum):\n    RED = 1\n";
        let source = ModelSource::new("app/models.py", Language::Python, text);
        let entities = extract_classes(&source);
        assert_eq!(entities.len(), 1);
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("title", FieldType::String, false, false, None),
                ("tags", FieldType::String, false, true, None),
                ("author", FieldType::Relation, true, false, Some("Author")),
            ]
        );
    }

    #[test]
    fn gorm_structs() {
        let text = "package models\n\ntype Status string\n\ntype Post struct {\n\tgorm.Model\n\tTitle    string `gorm:\"not null;uniqueIndex\"`\n\tState    Status\n\tAuthorID uint\n\tAuthor   *User   `gorm:\"foreignKey:AuthorID\"`\n\tTags     []Tag   `gorm:\"many2many:post_tags;\"`\n\tSummary  sql.NullString\n\tX, Y     float64\n\tPublishedAt time.Time\n}\n";
        let source = ModelSource::new("internal/models/post.go", Language::Go, text);
        let entities = extract_go(&source);
        let post = &entities[0];
        assert_eq!(
            summary(post),
            vec![
                ("Title", FieldType::String, false, false, None),
                ("State", FieldType::Unknown, false, false, None),
                ("AuthorID", FieldType::Integer, false, false, None),
                ("Author", FieldType::Relation, true, false, Some("User")),
                ("Tags", FieldType::Relation, false, true, Some("Tag")),
                ("Summary", FieldType::String, true, false, None),
                ("X", FieldType::Float, false, false, None),
                ("Y", FieldType::Float, false, false, None),
                ("PublishedAt", FieldType::Date, false, false, None),
            ]
        );
        assert!(post.fields[0].unique);
        assert_eq!(post.fields[4].kind, Some(RelationKind::ManyToMany));
        assert_eq!(post.covered, vec!["AuthorID".to_string()]);
    }

    #[test]
    fn rust_structs() {
        let text = "#[derive(Clone, Debug, DeriveEntityModel)]\n#[sea_orm(table_name = \"posts\")]\npub struct Model {\n    #[sea_orm(primary_key)]\n    pub id: i32,\n    /// Headline.\n    pub title: String,\n    pub author_id: Option<i32>,\n    pub tags: Vec<Tag>,\n    pub meta: serde_json::Value,\n    pub created_at: DateTime<Utc>,\n}\n";
        let source = ModelSource::new("src/entity/post.rs", Language::Rust, text);
        let entities = extract_rust(&source);
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("id", FieldType::Integer, false, false, None),
                ("title", FieldType::String, false, false, None),
                ("author_id", FieldType::Integer, true, false, None),
                ("tags", FieldType::Relation, false, true, Some("Tag")),
                ("meta", FieldType::Unknown, false, false, None),
                ("created_at", FieldType::Date, false, false, None),
            ]
        );
        assert!(entities[0].fields[0].primary);
    }
}
