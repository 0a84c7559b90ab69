//! Runtime ORM declarations: Django / SQLAlchemy / SQLModel classes and Mongoose schemas.

use super::{normalize, ModelSource, RawEntity, RawField};
use crate::source;
use once_cell::sync::Lazy;
use recon_protocol::{FieldType, RelationKind};
use regex::Regex;
use std::collections::HashMap;

static PY_MODEL_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:")
        .expect("python class pattern is valid")
});

static PY_ASSIGN_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+)\s*(?::\s*([^=]+?))?\s*=\s*([\w.]+)\s*\(")
        .expect("python assignment pattern is valid")
});

static PY_ANNOTATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+)\s*:\s*([^=#]+?)\s*(?:=.*)?(?:#.*)?$").expect("annotation pattern is valid")
});

const PY_TYPE_BUILTINS: &[&str] = &[
    "Any", "Dict", "dict", "JSON", "Json", "Tuple", "tuple", "ClassVar", "Callable", "Enum",
];

fn is_model_base(base: &str) -> bool {
    let last = base.trim().rsplit('.').next().unwrap_or_default();
    matches!(last, "Base" | "SQLModel" | "DeclarativeBase" | "Document" | "Model")
        || (last.ends_with("Model") && last != "BaseModel")
}

fn model_classes(text: &str, models_only: bool) -> impl Iterator<Item = regex::Captures<'_>> {
    PY_MODEL_CLASS.captures_iter(text).filter(move |caps| {
        !models_only
            || caps.get(3).is_some_and(|bases| {
                bases
                    .as_str()
                    .split(',')
                    .filter(|base| !base.contains('='))
                    .any(is_model_base)
            })
    })
}

pub fn detect_python(text: &str) -> bool {
    model_classes(text, true).next().is_some()
}

/// Python annotation reduced to its element type, with optionality and collection flags.
struct Annotation {
    base: String,
    nullable: bool,
    list: bool,
}

fn parse_annotation(raw: &str) -> Annotation {
    let mut base = raw.trim().to_string();
    let mut nullable = false;
    let mut list = false;
    loop {
        let trimmed = base.trim().trim_matches(['"', '\'']).trim().to_string();
        if let Some(rest) = trimmed.strip_suffix("| None").or_else(|| trimmed.strip_prefix("None |"))
        {
            nullable = true;
            base = rest.to_string();
            continue;
        }
        let Some((outer, inner)) = trimmed
            .split_once('[')
            .and_then(|(outer, rest)| rest.strip_suffix(']').map(|inner| (outer.trim(), inner)))
        else {
            base = trimmed;
            break;
        };
        let outer = outer.rsplit('.').next().unwrap_or(outer);
        match outer {
            "Optional" => nullable = true,
            "List" | "list" | "Set" | "set" | "Sequence" | "FrozenSet" | "Iterable" => list = true,
            "Mapped" | "Annotated" => {}
            _ => {
                base = outer.to_string();
                break;
            }
        }
        // `Annotated[int, ...]` keeps only its first argument.
        base = inner.split(',').next().unwrap_or(inner).to_string();
    }
    Annotation {
        base,
        nullable,
        list,
    }
}

fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim() == "True")
}

fn is_false(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim() == "False")
}

fn looks_plural(name: &str) -> bool {
    name.ends_with('s') && !name.ends_with("ss")
}

/// Target named by a relation argument: a string literal or a bare symbol.
fn reference(arg: &str) -> Option<String> {
    source::string_literal(arg).or_else(|| source::symbol_of(arg))
}

fn annotated_field(name: &str, annotation: &Annotation) -> RawField {
    let field_type = normalize(&annotation.base);
    let relation = field_type == FieldType::Unknown
        && annotation.base.chars().next().is_some_and(char::is_uppercase)
        && !PY_TYPE_BUILTINS.contains(&annotation.base.as_str());
    let mut field = if relation {
        let mut field = RawField::new(name, FieldType::Relation);
        field.target = Some(annotation.base.clone());
        field
    } else {
        RawField::new(name, field_type)
    };
    field.nullable = annotation.nullable;
    field.list = annotation.list;
    field
}

fn call_field(
    entity: &str,
    name: &str,
    annotation: Option<&Annotation>,
    callee: &str,
    args: &[&str],
) -> Option<RawField> {
    let kind = callee.rsplit('.').next().unwrap_or(callee);
    let kwarg = |key: &str| source::keyword(args, &[key]);
    let self_reference = |raw: &str| {
        reference(raw).map(|target| {
            if target == "self" {
                entity.to_string()
            } else {
                target
            }
        })
    };

    let mut field = match kind {
        "ForeignKey" | "OneToOneField" | "ManyToManyField" => {
            let mut field = RawField::new(name, FieldType::Relation);
            field.target = source::positional(args)
                .or_else(|| kwarg("to"))
                .and_then(self_reference);
            field.unique = kind == "OneToOneField";
            if kind == "ManyToManyField" {
                field.list = true;
                field.kind = Some(RelationKind::ManyToMany);
            }
            field.nullable = is_true(kwarg("null"));
            field
        }
        "Column" | "mapped_column" | "Field" => {
            let declared = args
                .iter()
                .copied()
                .filter(|arg| !arg.contains('=') && source::string_literal(arg).is_none())
                .find(|arg| !arg.trim_start().starts_with("ForeignKey"));
            let mut field = match (declared, annotation) {
                (Some(raw), _) => RawField::new(name, normalize(raw)),
                (None, Some(annotation)) => annotated_field(name, annotation),
                (None, None) => RawField::new(name, FieldType::Unknown),
            };
            let foreign_key = args
                .iter()
                .find_map(|arg| {
                    let arg = arg.trim();
                    let open = arg.strip_prefix("ForeignKey")?.find('(')? + "ForeignKey".len();
                    let call = source::call_args(arg, open, b"\"'")?;
                    call.args.first().and_then(|first| source::string_literal(first))
                })
                .or_else(|| kwarg("foreign_key").and_then(source::string_literal));
            if foreign_key.is_some() {
                field.target = foreign_key;
                field.field_type = match field.field_type {
                    FieldType::Relation => FieldType::Unknown,
                    other => other,
                };
            }
            field.primary = is_true(kwarg("primary_key"));
            field.unique = is_true(kwarg("unique"));
            field.nullable = match kwarg("nullable") {
                Some(value) => value.trim() == "True",
                None => match annotation {
                    Some(annotation) => annotation.nullable,
                    None => kind != "Field",
                },
            } && !field.primary;
            field
        }
        "relationship" | "relation" | "Relationship" | "ReferenceField" | "ListField" => {
            let target = source::positional(args)
                .and_then(self_reference)
                .or_else(|| kwarg("argument").and_then(self_reference))
                .or_else(|| annotation.map(|a| a.base.clone()));
            let mut field = RawField::new(name, FieldType::Relation);
            field.target = target;
            field.list = match (annotation, kwarg("uselist")) {
                (_, Some(uselist)) => uselist.trim() == "True",
                (Some(annotation), None) => annotation.list,
                (None, None) => kind == "ListField" || looks_plural(name),
            };
            field.nullable = annotation.is_some_and(|a| a.nullable);
            if kwarg("secondary").is_some() {
                field.list = true;
                field.kind = Some(RelationKind::ManyToMany);
            }
            field
        }
        _ if kind.ends_with("Field") || kind.ends_with("Property") => {
            let mut field = RawField::new(name, normalize(kind));
            field.nullable = is_true(kwarg("null")) || is_false(kwarg("required"));
            field.primary = is_true(kwarg("primary_key"));
            field.unique = is_true(kwarg("unique"));
            field
        }
        _ => return annotation.map(|annotation| annotated_field(name, annotation)),
    };
    if field.target.is_none() && field.field_type == FieldType::Relation {
        field.field_type = FieldType::Unknown;
    }
    Some(field)
}

/// Statements at the first indentation level of the class body starting at `body_start`.
fn class_statements(text: &str, body_start: usize, class_indent: usize) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut field_indent = None;
    let mut offset = body_start;
    let mut in_docstring = false;
    for line in text[body_start..].split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let content = line.trim();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        if indent <= class_indent {
            break;
        }
        let quotes = content.matches("\"\"\"").count() + content.matches("'''").count();
        if in_docstring || quotes > 0 {
            if quotes % 2 == 1 {
                in_docstring = !in_docstring;
            }
            continue;
        }
        let level = *field_indent.get_or_insert(indent);
        if indent == level {
            out.push((start + indent, content));
        }
    }
    out
}

pub fn extract_python(source: &ModelSource<'_>) -> Vec<RawEntity> {
    python_entities(source, true)
}

/// Plain annotated classes (dataclasses, pydantic models); field-less classes are dropped.
pub(super) fn extract_python_classes(source: &ModelSource<'_>) -> Vec<RawEntity> {
    python_entities(source, false)
        .into_iter()
        .filter(|entity| !entity.fields.is_empty())
        .collect()
}

fn python_entities(source: &ModelSource<'_>, models_only: bool) -> Vec<RawEntity> {
    let text = source.text;
    let quotes = source.quotes();
    let mut out = Vec::new();
    for caps in model_classes(text, models_only) {
        let (Some(whole), Some(indent), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let mut entity = RawEntity::new(name.as_str());
        for (offset, statement) in class_statements(text, whole.end(), indent.as_str().len()) {
            if statement.starts_with("def ")
                || statement.starts_with("async ")
                || statement.starts_with("class ")
                || statement.starts_with('@')
            {
                continue;
            }
            let field_name = statement
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .next()
                .unwrap_or_default();
            if field_name.is_empty()
                || field_name.starts_with('_')
                || field_name.chars().all(|c| c.is_uppercase() || c == '_' || c.is_numeric())
            {
                continue;
            }
            if let Some(call) = PY_ASSIGN_CALL.captures(statement) {
                let (Some(head), Some(callee)) = (call.get(0), call.get(3)) else {
                    continue;
                };
                if callee.as_str().ends_with("Manager") {
                    continue;
                }
                let annotation = call.get(2).map(|a| parse_annotation(a.as_str()));
                let Some(args) = source::call_args(text, offset + head.end() - 1, quotes) else {
                    continue;
                };
                if let Some(field) = call_field(
                    &entity.name,
                    field_name,
                    annotation.as_ref(),
                    callee.as_str(),
                    &args.args,
                ) {
                    entity.fields.push(field);
                }
            } else if let Some(annotated) = PY_ANNOTATED.captures(statement) {
                let Some(raw) = annotated.get(2) else {
                    continue;
                };
                if raw.as_str().contains("ClassVar") {
                    continue;
                }
                entity
                    .fields
                    .push(annotated_field(field_name, &parse_annotation(raw.as_str())));
            }
        }
        out.push(entity);
    }
    out
}

static MONGOOSE_SCHEMA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?:const|let|var)\s+(\w+)\s*(?::\s*[\w.<>]+\s*)?=\s*)?new\s+(?:mongoose\.)?Schema\s*(?:<[^>(]*>)?\s*\(",
    )
    .expect("mongoose schema pattern is valid")
});

static MONGOOSE_MODEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bmodel\s*(?:<[^>(]*>)?\(\s*['"`](\w+)['"`]\s*,\s*(\w+)"#)
        .expect("mongoose model pattern is valid")
});

pub fn detect_mongoose(text: &str) -> bool {
    MONGOOSE_SCHEMA.is_match(text)
}

fn mongoose_required(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim().trim_start_matches('[').trim_start();
        v.starts_with("true")
    })
}

fn mongoose_field(name: &str, value: &str, quotes: &[u8]) -> RawField {
    let value = value.trim();
    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        let element = source::split_top_level(inner, quotes)
            .first()
            .copied()
            .unwrap_or_default();
        let mut field = mongoose_field(name, element, quotes);
        field.list = true;
        return field;
    }
    if let Some(inner) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) {
        let entries = source::split_top_level(inner, quotes);
        let declared = source::entry_value(&entries, "type");
        let mut field = match declared {
            Some(declared) if declared.starts_with('[') => {
                let mut field = mongoose_field(name, declared, quotes);
                field.list = true;
                field
            }
            Some(declared) => RawField::new(name, normalize(declared)),
            None => RawField::new(name, FieldType::Unknown),
        };
        if let Some(target) = source::entry_value(&entries, "ref").and_then(source::string_literal) {
            field.field_type = FieldType::Relation;
            field.target = Some(target);
        }
        field.nullable = !mongoose_required(source::entry_value(&entries, "required"));
        field.unique = source::entry_value(&entries, "unique").is_some_and(|v| v == "true");
        return field;
    }
    let mut field = RawField::new(name, normalize(value));
    field.nullable = true;
    field
}

pub fn extract_mongoose(source: &ModelSource<'_>) -> Vec<RawEntity> {
    let text = source.text;
    let quotes = source.quotes();
    let models: HashMap<&str, &str> = MONGOOSE_MODEL
        .captures_iter(text)
        .filter_map(|caps| Some((caps.get(2)?.as_str(), caps.get(1)?.as_str())))
        .collect();

    let mut out = Vec::new();
    for caps in MONGOOSE_SCHEMA.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let variable = caps.get(1).map(|m| m.as_str());
        let name = match variable {
            Some(var) => models.get(var).map(|name| name.to_string()).unwrap_or_else(|| {
                let stem = var.strip_suffix("Schema").unwrap_or(var);
                let mut chars = stem.chars();
                chars
                    .next()
                    .map(|first| first.to_uppercase().chain(chars).collect())
                    .unwrap_or_else(|| source.stem_name())
            }),
            None => source.stem_name(),
        };
        let Some(call) = source::call_args(text, whole.end() - 1, quotes) else {
            continue;
        };
        let Some(definition) = call
            .args
            .first()
            .and_then(|first| first.strip_prefix('{'))
            .and_then(|first| first.strip_suffix('}'))
        else {
            continue;
        };
        let mut entity = RawEntity::new(name);
        for entry in source::split_top_level(definition, quotes) {
            let Some((key, value)) = entry.split_once(':') else {
                continue;
            };
            let key = key.trim().trim_matches(['"', '\'']);
            if key.is_empty() || key.contains(char::is_whitespace) {
                continue;
            }
            entity.fields.push(mongoose_field(key, value, quotes));
        }
        out.push(entity);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use recon_protocol::Language;

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
    fn django_models() {
        let text = r#"from django.db import models


class Author(models.Model):
    """A writer.

    name = not a field
    """
    name = models.CharField(max_length=120)
    bio = models.TextField(null=True, blank=True)
    mentor = models.ForeignKey('self', null=True, on_delete=models.SET_NULL)

    objects = models.Manager()

    class Meta:
        ordering = ["name"]

    def __str__(self):
        return self.name


class Book(models.Model):
    STATUS_CHOICES = [("d", "Draft")]
    title = models.CharField(
        max_length=200,
        unique=True,
    )
    author = models.ForeignKey(Author, on_delete=models.CASCADE)
    editor = models.OneToOneField("Author", on_delete=models.CASCADE)
    genres = models.ManyToManyField("Genre")
"#;
        let source = ModelSource::new("library/models.py", Language::Python, text);
        let entities = extract_python(&source);
        assert_eq!(entities.len(), 2);
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("name", FieldType::String, false, false, None),
                ("bio", FieldType::String, true, false, None),
                ("mentor", FieldType::Relation, true, false, Some("Author")),
            ]
        );
        assert_eq!(
            summary(&entities[1]),
            vec![
                ("title", FieldType::String, false, false, None),
                ("author", FieldType::Relation, false, false, Some("Author")),
                ("editor", FieldType::Relation, false, false, Some("Author")),
                ("genres", FieldType::Relation, false, true, Some("Genre")),
            ]
        );
        assert!(entities[1].fields[0].unique);
        assert!(entities[1].fields[2].unique);
        assert_eq!(entities[1].fields[3].kind, Some(RelationKind::ManyToMany));
    }

    #[test]
    fn sqlalchemy_declarative_and_mapped_columns() {
        let text = r#"
class User(Base):
    __tablename__ = "users"
    id = Column(Integer, primary_key=True)
    email = Column(String(255), unique=True, nullable=False)
    posts = relationship("Post", back_populates="author")


class Post(Base):
    __tablename__ = "posts"
    id: Mapped[int] = mapped_column(primary_key=True)
    author_id: Mapped[int] = mapped_column(ForeignKey("users.id"))
    summary: Mapped[Optional[str]]
    author: Mapped["User"] = relationship(back_populates="posts")
"#;
        let source = ModelSource::new("app/models.py", Language::Python, text);
        let entities = extract_python(&source);
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("id", FieldType::Integer, false, false, None),
                ("email", FieldType::String, false, false, None),
                ("posts", FieldType::Relation, false, true, Some("Post")),
            ]
        );
        assert!(entities[0].fields[0].primary);
        assert_eq!(
            summary(&entities[1]),
            vec![
                ("id", FieldType::Integer, false, false, None),
                ("author_id", FieldType::Integer, false, false, Some("users.id")),
                ("summary", FieldType::String, true, false, None),
                ("author", FieldType::Relation, false, false, Some("User")),
            ]
        );
    }

    #[test]
    fn sqlmodel_tables() {
        let text = r#"
class Hero(SQLModel, table=True):
    id: int | None = Field(default=None, primary_key=True)
    name: str = Field(index=True)
    team_id: int | None = Field(default=None, foreign_key="team.id")
    team: Optional["Team"] = Relationship(back_populates="heroes")
"#;
        let source = ModelSource::new("app/models.py", Language::Python, text);
        let entities = extract_python(&source);
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("id", FieldType::Integer, false, false, None),
                ("name", FieldType::String, false, false, None),
                ("team_id", FieldType::Integer, true, false, Some("team.id")),
                ("team", FieldType::Relation, true, false, Some("Team")),
            ]
        );
    }

    #[test]
    fn plain_classes_are_not_models() {
        assert!(!detect_python("class Helper(object):\n    pass\n"));
        assert!(!detect_python("class Payload(BaseModel):\n    name: str\n"));
        assert!(detect_python("class Item(db.Model):\n    id = db.Column(db.Integer)\n"));
    }

    #[test]
    fn mongoose_schemas() {
        let text = r#"
const mongoose = require('mongoose');

const orderSchema = new mongoose.Schema({
  customer: { type: mongoose.Schema.Types.ObjectId, ref: 'User', required: true },
  items: [{ type: Schema.Types.ObjectId, ref: 'Product' }],
  total: { type: Number, required: [true, 'total is required'] },
  note: String,
  'placedAt': { type: Date, default: Date.now },
}, { timestamps: true });

module.exports = mongoose.model('Order', orderSchema);
"#;
        let source = ModelSource::new("models/order.js", Language::JavaScript, text);
        let entities = extract_mongoose(&source);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "Order");
        assert_eq!(
            summary(&entities[0]),
            vec![
                ("customer", FieldType::Relation, false, false, Some("User")),
                ("items", FieldType::Relation, true, true, Some("Product")),
                ("total", FieldType::Float, false, false, None),
                ("note", FieldType::String, true, false, None),
                ("placedAt", FieldType::Date, true, false, None),
            ]
        );
    }

    #[test]
    fn mongoose_schema_name_falls_back_to_variable() {
        let text = "const profileSchema = new Schema({ handle: { type: String, unique: true } });\n";
        let source = ModelSource::new("models/profile.js", Language::JavaScript, text);
        let entities = extract_mongoose(&source);
        assert_eq!(entities[0].name, "Profile");
        assert!(entities[0].fields[0].unique);
    }
}
