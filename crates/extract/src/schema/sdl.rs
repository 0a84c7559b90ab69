//! Schema languages: Prisma models, SQL `CREATE TABLE`, GraphQL object types.

use super::{normalize, ModelSource, RawEntity, RawField};
use crate::source;
use once_cell::sync::Lazy;
use recon_protocol::FieldType;
use regex::Regex;
use std::collections::HashSet;

static PRISMA_MODEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*model\s+(\w+)\s*\{").expect("prisma model pattern is valid")
});

static PRISMA_ENUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:enum|type)\s+(\w+)\s*\{").expect("prisma enum pattern is valid")
});

static PRISMA_RELATION_FIELDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@relation\([^)]*\bfields\s*:\s*\[([^\]]*)\]")
        .expect("prisma relation pattern is valid")
});

const PRISMA_SCALARS: &[&str] = &[
    "String", "Boolean", "Int", "BigInt", "Float", "Decimal", "DateTime", "Json", "Bytes",
    "Unsupported",
];

pub fn detect_prisma(text: &str) -> bool {
    PRISMA_MODEL.is_match(text)
}

pub fn extract_prisma(source: &ModelSource<'_>) -> Vec<RawEntity> {
    let text = source.text;
    let opaque: HashSet<&str> = PRISMA_ENUM
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    let mut out = Vec::new();
    for caps in PRISMA_MODEL.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(body) = source::block_at(text, whole.end() - 1, b"\"") else {
            continue;
        };
        let mut entity = RawEntity::new(name.as_str());
        for line in body.lines().map(str::trim) {
            if line.is_empty() || line.starts_with("//") || line.starts_with("@@") {
                continue;
            }
            let Some((field_name, rest)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            let rest = rest.trim_start();
            let (raw_type, attributes) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let list = raw_type.ends_with("[]");
            let nullable = raw_type.ends_with('?');
            let base = raw_type.trim_end_matches(['?', '[', ']']);

            let mut field = if PRISMA_SCALARS.contains(&base) {
                RawField::new(field_name, normalize(base))
            } else if opaque.contains(base) {
                RawField::new(field_name, FieldType::Unknown)
            } else {
                let mut field = RawField::new(field_name, FieldType::Relation);
                field.target = Some(base.to_string());
                field
            };
            field.nullable = nullable;
            field.list = list;
            field.primary = attributes.contains("@id");
            field.unique = attributes.contains("@unique");
            if let Some(fields) = PRISMA_RELATION_FIELDS.captures(attributes).and_then(|c| c.get(1))
            {
                entity.covered.extend(
                    fields
                        .as_str()
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string),
                );
            }
            entity.fields.push(field);
        }
        out.push(entity);
    }
    out
}

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bcreate\s+(?:temporary\s+)?table\s+(?:if\s+not\s+exists\s+)?([`"\[]?[\w.]+[`"\]]?(?:\.[`"\[]?\w+[`"\]]?)?)\s*\("#)
        .expect("create table pattern is valid")
});

static SQL_REFERENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\breferences\s+([`"\[]?[\w.]+[`"\]]?)"#).expect("references pattern is valid")
});

static SQL_TABLE_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:constraint\s+\S+\s+)?(primary\s+key|foreign\s+key|unique|key|index|check|exclude)\b")
        .expect("table constraint pattern is valid")
});

static PAREN_COLUMNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]*)\)").expect("column list pattern is valid"));

fn unquote_identifier(raw: &str) -> String {
    raw.trim_matches(|c| c == '`' || c == '"' || c == '[' || c == ']')
        .to_string()
}

fn column_list(text: &str) -> Vec<String> {
    PAREN_COLUMNS
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|cols| {
            cols.as_str()
                .split(',')
                .map(|c| unquote_identifier(c.trim()))
                .collect()
        })
        .unwrap_or_default()
}

fn strip_line_comments(entry: &str) -> String {
    entry
        .lines()
        .map(|line| line.split("--").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn detect_sql(text: &str) -> bool {
    CREATE_TABLE.is_match(text)
}

pub fn extract_sql(source: &ModelSource<'_>) -> Vec<RawEntity> {
    let text = source.text;
    let mut out = Vec::new();
    for caps in CREATE_TABLE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let table = name
            .as_str()
            .rsplit('.')
            .next()
            .map(unquote_identifier)
            .unwrap_or_default();
        let Some(body) = source::block_at(text, whole.end() - 1, b"'\"`") else {
            continue;
        };
        let mut entity = RawEntity::new(table);
        let mut constraints = Vec::new();
        for entry in source::split_top_level(body, b"'\"`") {
            let entry = strip_line_comments(entry);
            let entry = entry.trim();
            if SQL_TABLE_CONSTRAINT.is_match(entry) {
                constraints.push(entry.to_string());
                continue;
            }
            let mut tokens = entry.split_whitespace();
            let (Some(column), Some(raw_type)) = (tokens.next(), tokens.next()) else {
                continue;
            };
            let upper = entry.to_ascii_uppercase();
            let mut field = RawField::new(unquote_identifier(column), normalize(raw_type));
            field.primary = upper.contains("PRIMARY KEY");
            field.unique = upper.contains("UNIQUE");
            field.nullable = !upper.contains("NOT NULL") && !field.primary;
            field.target = SQL_REFERENCES
                .captures(entry)
                .and_then(|caps| caps.get(1))
                .map(|m| unquote_identifier(m.as_str()));
            entity.fields.push(field);
        }

        for constraint in &constraints {
            let upper = constraint.to_ascii_uppercase();
            let columns = column_list(constraint);
            let target = SQL_REFERENCES
                .captures(constraint)
                .and_then(|caps| caps.get(1))
                .map(|m| unquote_identifier(m.as_str()));
            for field in entity
                .fields
                .iter_mut()
                .filter(|field| columns.iter().any(|c| c.eq_ignore_ascii_case(&field.name)))
            {
                if upper.contains("PRIMARY KEY") {
                    field.primary = true;
                    field.nullable = false;
                } else if upper.contains("FOREIGN KEY") {
                    field.target = target.clone();
                } else if upper.contains("UNIQUE") && columns.len() == 1 {
                    field.unique = true;
                }
            }
        }
        out.push(entity);
    }
    out
}

static GRAPHQL_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:extend\s+)?type\s+(\w+)(?:\s+implements\s+[\w&,\s]+?)?\s*(?:@\w+(?:\([^)]*\))?\s*)*\{")
        .expect("graphql type pattern is valid")
});

static GRAPHQL_OPAQUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:enum|scalar|input|union)\s+(\w+)").expect("graphql opaque pattern is valid")
});

static GRAPHQL_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+)\s*(?:\([^)]*\))?\s*:\s*(\[)?\s*(\w+)\s*(!)?\s*(\])?\s*(!)?")
        .expect("graphql field pattern is valid")
});

const GRAPHQL_ROOTS: &[&str] = &["Query", "Mutation", "Subscription"];
const GRAPHQL_SCALARS: &[&str] = &["ID", "String", "Int", "Float", "Boolean"];

pub fn detect_graphql(text: &str) -> bool {
    GRAPHQL_TYPE.is_match(text)
}

pub fn extract_graphql(source: &ModelSource<'_>) -> Vec<RawEntity> {
    let text = source.text;
    let opaque: HashSet<&str> = GRAPHQL_OPAQUE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    let mut out = Vec::new();
    for caps in GRAPHQL_TYPE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if GRAPHQL_ROOTS.contains(&name.as_str()) {
            continue;
        }
        let Some(body) = source::block_at(text, whole.end() - 1, b"\"") else {
            continue;
        };
        let mut entity = RawEntity::new(name.as_str());
        for line in body.lines().map(str::trim) {
            let Some(field) = GRAPHQL_FIELD.captures(line) else {
                continue;
            };
            let (Some(field_name), Some(type_name)) = (field.get(1), field.get(3)) else {
                continue;
            };
            let list = field.get(2).is_some();
            let required = if list {
                field.get(6).is_some()
            } else {
                field.get(4).is_some()
            };
            let type_name = type_name.as_str();
            let mut raw = if GRAPHQL_SCALARS.contains(&type_name) || opaque.contains(type_name) {
                RawField::new(field_name.as_str(), normalize(type_name))
            } else {
                let mut raw = RawField::new(field_name.as_str(), FieldType::Relation);
                raw.target = Some(type_name.to_string());
                raw
            };
            raw.list = list;
            raw.nullable = !required;
            entity.fields.push(raw);
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

    fn fields(entity: &RawEntity) -> Vec<(&str, FieldType, bool, Option<&str>)> {
        entity
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.field_type, f.nullable, f.target.as_deref()))
            .collect()
    }

    #[test]
    fn prisma_models_relations_and_enums() {
        let text = r#"
datasource db { provider = "postgresql" url = env("DATABASE_URL") }

enum Role { USER ADMIN }

model User {
  id     Int     @id @default(autoincrement())
  email  String  @unique
  role   Role    @default(USER)
  posts  Post[]
}

model Post {
  id        Int      @id
  title     String
  published Boolean? @default(false)
  author    User     @relation(fields: [authorId], references: [id])
  authorId  Int
  createdAt DateTime @default(now())
  @@index([authorId])
}
"#;
        let source = ModelSource::new("prisma/schema.prisma", Language::Prisma, text);
        let entities = extract_prisma(&source);
        assert_eq!(entities.len(), 2);
        assert_eq!(
            fields(&entities[0]),
            vec![
                ("id", FieldType::Integer, false, None),
                ("email", FieldType::String, false, None),
                ("role", FieldType::Unknown, false, None),
                ("posts", FieldType::Relation, false, Some("Post")),
            ]
        );
        assert!(entities[0].fields[0].primary);
        assert!(entities[0].fields[3].list);
        assert_eq!(entities[1].covered, vec!["authorId".to_string()]);
        assert_eq!(entities[1].fields[2], {
            let mut f = RawField::new("published", FieldType::Boolean);
            f.nullable = true;
            f
        });
    }

    #[test]
    fn sql_tables_with_inline_and_table_constraints() {
        let text = "CREATE TABLE IF NOT EXISTS \"users\" (\n  id SERIAL PRIMARY KEY,\n  email VARCHAR(255) NOT NULL UNIQUE,\n  bio TEXT\n);\n\ncreate table orders (\n  id integer not null,\n  user_id integer references users(id),\n  total numeric(10, 2) not null,\n  coupon_id integer,\n  primary key (id),\n  constraint fk_coupon foreign key (coupon_id) references coupons (id)\n);\n";
        let source = ModelSource::new("db/schema.sql", Language::Sql, text);
        let entities = extract_sql(&source);
        assert_eq!(entities[0].name, "users");
        assert_eq!(
            fields(&entities[0]),
            vec![
                ("id", FieldType::Identifier, false, None),
                ("email", FieldType::String, false, None),
                ("bio", FieldType::String, true, None),
            ]
        );
        assert!(entities[0].fields[1].unique);
        assert_eq!(entities[1].name, "orders");
        assert_eq!(
            fields(&entities[1]),
            vec![
                ("id", FieldType::Integer, false, None),
                ("user_id", FieldType::Integer, true, Some("users")),
                ("total", FieldType::Float, false, None),
                ("coupon_id", FieldType::Integer, true, Some("coupons")),
            ]
        );
        assert!(entities[1].fields[0].primary);
    }

    #[test]
    fn graphql_object_types() {
        let text = "scalar DateTime\nenum Status { OPEN CLOSED }\n\ntype Query { items: [Item!]! }\n\ntype Item @key(fields: \"id\") {\n  id: ID!\n  title: String\n  status: Status!\n  owner: User!\n  tags: [Tag!]!\n  createdAt: DateTime!\n}\n";
        let source = ModelSource::new("src/schema/schema.graphql", Language::GraphQl, text);
        let entities = extract_graphql(&source);
        assert_eq!(entities.len(), 1);
        assert_eq!(
            fields(&entities[0]),
            vec![
                ("id", FieldType::Identifier, false, None),
                ("title", FieldType::String, true, None),
                ("status", FieldType::Unknown, false, None),
                ("owner", FieldType::Relation, false, Some("User")),
                ("tags", FieldType::Relation, false, Some("Tag")),
                ("createdAt", FieldType::Date, false, None),
            ]
        );
        assert!(entities[0].fields[4].list);
    }
}
