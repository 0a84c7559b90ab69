//! Relation inference and target resolution across every extracted entity.

use super::RawEntity;
use once_cell::sync::Lazy;
use recon_protocol::{Relation, RelationKind, Warning};
use regex::Regex;

static FOREIGN_KEY_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)_*(_ids|Ids|IDs|_id|Id|ID)$").expect("foreign key name pattern is valid")
});

/// Comparison key: lower-case with separators removed, so `order_item` meets `OrderItem`.
pub fn name_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn singular(key: &str) -> &str {
    if key.ends_with("ies") || key.ends_with("sses") {
        return &key[..key.len() - 2];
    }
    match key.strip_suffix('s') {
        Some(stem) if !stem.ends_with('s') && !stem.is_empty() => stem,
        _ => key,
    }
}

fn same_entity(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (a, b) = (singular(a), singular(b));
    // `categories` -> `categori` meets `category` -> `category` through the y/i swap.
    a == b || a.strip_suffix('i').zip(b.strip_suffix('y')).is_some_and(|(x, y)| x == y)
        || b.strip_suffix('i').zip(a.strip_suffix('y')).is_some_and(|(x, y)| x == y)
}

/// Reduces a raw reference (`'app.User'`, `users.id`, `"Post"`) to an entity-ish name.
pub fn clean_target(raw: &str) -> String {
    let raw = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`' || c == '[' || c == ']');
    raw.split(['.', ':'])
        .filter(|segment| !segment.is_empty() && !segment.eq_ignore_ascii_case("id"))
        .last()
        .unwrap_or(raw)
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
        .to_string()
}

/// Stem named by a foreign-key style field (`userId`, `user_id`, `UserID`), plus whether the
/// field holds a list of keys.
pub fn naming_stem(field: &str) -> Option<(String, bool)> {
    let caps = FOREIGN_KEY_NAME.captures(field)?;
    let stem = caps.get(1)?.as_str().trim_end_matches('_');
    if stem.is_empty() {
        return None;
    }
    let list = caps
        .get(2)
        .is_some_and(|suffix| suffix.as_str().to_ascii_lowercase().ends_with('s'));
    Some((stem.to_string(), list))
}

/// Entity names known to the run, in output order.
#[derive(Debug, Default)]
pub struct EntityIndex {
    entries: Vec<(String, String)>,
}

impl EntityIndex {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            entries: names
                .into_iter()
                .map(|name| (name_key(name), name.to_string()))
                .collect(),
        }
    }

    /// Resolves a reference case-insensitively, tolerating simple plural table names.
    pub fn resolve(&self, target: &str) -> Option<String> {
        let key = name_key(&clean_target(target));
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(candidate, _)| same_entity(candidate, &key))
            })
            .map(|(_, name)| name.clone())
    }
}

/// A relation before reciprocal many-to-many detection.
#[derive(Debug, Clone)]
pub struct PendingRelation {
    pub relation: Relation,
    pub list: bool,
}

fn inferred_kind(list: bool, unique: bool) -> RelationKind {
    if unique && !list {
        RelationKind::OneToOne
    } else {
        RelationKind::OneToMany
    }
}

/// Relations of one entity: explicit references first-class, naming convention as fallback.
pub fn build_relations(
    entity: &RawEntity,
    file: &str,
    index: &EntityIndex,
    warnings: &mut Vec<Warning>,
) -> Vec<PendingRelation> {
    let explicit_keys: Vec<String> = entity
        .fields
        .iter()
        .filter(|field| field.target.is_some())
        .flat_map(|field| {
            let target = field.target.as_deref().map(clean_target).unwrap_or_default();
            [name_key(&field.name), name_key(&target)]
        })
        .collect();
    let covered: Vec<String> = entity.covered.iter().map(|name| name_key(name)).collect();

    let mut out = Vec::new();
    for field in &entity.fields {
        let (raw_target, list, kind) = match &field.target {
            Some(target) => (
                target.clone(),
                field.list,
                field.kind.unwrap_or_else(|| inferred_kind(field.list, field.unique)),
            ),
            None => {
                if field.primary || covered.contains(&name_key(&field.name)) {
                    continue;
                }
                let Some((stem, list)) = naming_stem(&field.name) else {
                    continue;
                };
                let stem_key = name_key(&stem);
                if explicit_keys.iter().any(|key| same_entity(key, &stem_key)) {
                    continue;
                }
                let list = list || field.list;
                (stem, list, inferred_kind(list, field.unique))
            }
        };

        let mut target_entity = index.resolve(&raw_target);
        if target_entity.is_none() && name_key(&raw_target) == "parent" {
            target_entity = Some(entity.name.clone());
        }
        if target_entity.is_none() {
            warnings.push(Warning::unresolved_relation(
                file,
                format!(
                    "{}.{} references `{}`, which matches no extracted entity",
                    entity.name,
                    field.name,
                    clean_target(&raw_target)
                ),
            ));
        }
        out.push(PendingRelation {
            relation: Relation {
                field: field.name.clone(),
                target_entity,
                kind,
            },
            list,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn foreign_key_names() {
        assert_eq!(naming_stem("userId"), Some(("user".to_string(), false)));
        assert_eq!(naming_stem("user_id"), Some(("user".to_string(), false)));
        assert_eq!(naming_stem("OwnerID"), Some(("Owner".to_string(), false)));
        assert_eq!(naming_stem("tagIds"), Some(("tag".to_string(), true)));
        assert_eq!(naming_stem("id"), None);
        assert_eq!(naming_stem("_id"), None);
        assert_eq!(naming_stem("uuid"), None);
        assert_eq!(naming_stem("paid"), None);
    }

    #[test]
    fn targets_resolve_case_and_plural_insensitively() {
        let index = EntityIndex::new(["Category", "OrderItem", "User", "users_archive"]);
        assert_eq!(index.resolve("users.id"), Some("User".to_string()));
        assert_eq!(index.resolve("'app.User'"), Some("User".to_string()));
        assert_eq!(index.resolve("categories"), Some("Category".to_string()));
        assert_eq!(index.resolve("order_items"), Some("OrderItem".to_string()));
        assert_eq!(index.resolve("Invoice"), None);
    }

    #[test]
    fn cleaned_targets_drop_key_columns_and_quotes() {
        assert_eq!(clean_target("\"team.id\""), "team");
        assert_eq!(clean_target("Schema.Types.ObjectId"), "ObjectId");
        assert_eq!(clean_target("[Post]"), "Post");
    }
}
