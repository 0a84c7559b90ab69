//! Persisted-schema extraction from Model-classified files.
//!
//! Idioms produce [`RawEntity`] values per file; relation targets are resolved only once
//! every file has been read, so a `User` declared in another file still resolves.

mod orm;
mod relations;
mod sdl;
mod structs;
mod types;

pub use relations::{naming_stem, EntityIndex};
pub use types::normalize;

use crate::source;
use recon_protocol::{
    FieldType, Language, RelationKind, Role, SchemaEntity, SchemaField, Warning,
};
use recon_scanner::ScannedFile;
use relations::PendingRelation;
use std::collections::HashSet;

/// A Model file as seen by an idiom.
#[derive(Debug, Clone, Copy)]
pub struct ModelSource<'a> {
    pub path: &'a str,
    pub language: Language,
    pub text: &'a str,
}

impl<'a> ModelSource<'a> {
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

    /// File stem with the first letter upper-cased, used when a declaration carries no name.
    fn stem_name(&self) -> String {
        let name = recon_protocol::paths::file_name(self.path);
        let stem = name.split('.').next().unwrap_or(name);
        let mut chars = stem.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// A field as declared, before relation resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub list: bool,
    pub unique: bool,
    pub primary: bool,
    /// Explicitly referenced entity, as written.
    pub target: Option<String>,
    /// Kind stated by the declaration itself (`ManyToManyField`, `@OneToOne`).
    pub kind: Option<RelationKind>,
}

impl RawField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            list: false,
            unique: false,
            primary: false,
            target: None,
            kind: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity {
    pub name: String,
    pub fields: Vec<RawField>,
    /// Columns owned by an explicit relation (`@relation(fields: [authorId])`).
    pub covered: Vec<String>,
}

impl RawEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            covered: Vec::new(),
        }
    }
}

/// A schema declaration idiom.
pub struct SchemaIdiom {
    pub name: &'static str,
    pub detect: fn(&str) -> bool,
    pub extract: fn(&ModelSource<'_>) -> Vec<RawEntity>,
}

/// Ordered idiom table; the first matching detector wins for a file.
pub const SCHEMA_IDIOMS: &[SchemaIdiom] = &[
    SchemaIdiom {
        name: "prisma",
        detect: sdl::detect_prisma,
        extract: sdl::extract_prisma,
    },
    SchemaIdiom {
        name: "sql",
        detect: sdl::detect_sql,
        extract: sdl::extract_sql,
    },
    SchemaIdiom {
        name: "graphql",
        detect: sdl::detect_graphql,
        extract: sdl::extract_graphql,
    },
    SchemaIdiom {
        name: "python-orm",
        detect: orm::detect_python,
        extract: orm::extract_python,
    },
    SchemaIdiom {
        name: "mongoose",
        detect: orm::detect_mongoose,
        extract: orm::extract_mongoose,
    },
    SchemaIdiom {
        name: "class-entity",
        detect: structs::detect_classes,
        extract: structs::extract_classes,
    },
    SchemaIdiom {
        name: "go-struct",
        detect: structs::detect_go,
        extract: structs::extract_go,
    },
    SchemaIdiom {
        name: "rust-struct",
        detect: structs::detect_rust,
        extract: structs::extract_rust,
    },
];

#[derive(Debug, Default)]
pub struct SchemaExtraction {
    pub entities: Vec<SchemaEntity>,
    pub warnings: Vec<Warning>,
}

/// Raw entities of one file, or a warning when nothing recognizable is declared there.
pub fn extract_file_entities(source: &ModelSource<'_>) -> Result<Vec<RawEntity>, Warning> {
    let Some(idiom) = SCHEMA_IDIOMS.iter().find(|idiom| (idiom.detect)(source.text)) else {
        return Err(Warning::partial_extraction(
            source.path,
            "no schema declaration idiom recognized",
        ));
    };
    let entities = (idiom.extract)(source);
    log::debug!(
        "{}: {} entit(ies) via {}",
        source.path,
        entities.len(),
        idiom.name
    );
    if entities.is_empty() {
        return Err(Warning::partial_extraction(
            source.path,
            format!("{} declarations found but no entity could be extracted", idiom.name),
        ));
    }
    Ok(entities)
}

fn schema_field(field: &RawField) -> SchemaField {
    let field_type = if field.primary
        || matches!(field.name.as_str(), "id" | "_id" | "ID" | "Id")
    {
        FieldType::Identifier
    } else {
        field.field_type
    };
    SchemaField {
        name: field.name.clone(),
        field_type,
        nullable: field.nullable && !field.primary,
    }
}

/// Extracts and resolves entities from every readable Model file.
///
/// Entities come out sorted by (name, file); fields and relations keep declaration order.
pub fn extract_schema(files: &[ScannedFile]) -> SchemaExtraction {
    let mut warnings = Vec::new();
    let mut raw: Vec<(String, RawEntity)> = Vec::new();
    for file in files.iter().filter(|file| file.role() == Role::Model) {
        let Some(text) = file.text() else {
            continue;
        };
        match extract_file_entities(&ModelSource::new(file.path(), file.language(), text)) {
            Ok(entities) => raw.extend(
                entities
                    .into_iter()
                    .map(|entity| (file.path().to_string(), entity)),
            ),
            Err(warning) => warnings.push(warning),
        }
    }
    raw.sort_by(|a, b| a.1.name.cmp(&b.1.name).then_with(|| a.0.cmp(&b.0)));

    let index = EntityIndex::new(raw.iter().map(|(_, entity)| entity.name.as_str()));
    let pending: Vec<Vec<PendingRelation>> = raw
        .iter()
        .map(|(file, entity)| relations::build_relations(entity, file, &index, &mut warnings))
        .collect();

    // Reciprocal list relations are many-to-many on both sides.
    let list_targets: HashSet<(&str, &str)> = raw
        .iter()
        .zip(&pending)
        .flat_map(|((_, entity), relations)| {
            relations.iter().filter(|r| r.list).filter_map(move |r| {
                r.relation
                    .target_entity
                    .as_deref()
                    .map(|target| (entity.name.as_str(), target))
            })
        })
        .collect();

    let entities = raw
        .iter()
        .zip(&pending)
        .map(|((file, entity), relations)| SchemaEntity {
            name: entity.name.clone(),
            file: file.clone(),
            fields: entity.fields.iter().map(schema_field).collect(),
            relations: relations
                .iter()
                .map(|pending| {
                    let mut relation = pending.relation.clone();
                    let reciprocal = pending.list
                        && relation.target_entity.as_deref().is_some_and(|target| {
                            list_targets.contains(&(target, entity.name.as_str()))
                        });
                    if reciprocal {
                        relation.kind = RelationKind::ManyToMany;
                    }
                    relation
                })
                .collect(),
        })
        .collect();

    warnings.sort();
    SchemaExtraction { entities, warnings }
}
