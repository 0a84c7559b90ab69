use crate::imports::ImportRef;
use recon_protocol::paths::{join_normalized, parent_dir};
use std::collections::{BTreeMap, HashMap, HashSet};

const INDEX_STEMS: &[&str] = &["index", "mod", "__init__"];

/// Paths of the scanned tree, addressable the way import statements name them.
pub struct TreeIndex {
    files: HashSet<String>,
    /// Extension-less path -> file path (first in path order wins).
    stems: HashMap<String, String>,
    dirs: HashSet<String>,
    /// Trailing segments (two or more) of every stem and directory -> shortest such path.
    suffixes: BTreeMap<String, String>,
}

/// Where an import landed: a file, or a directory standing for its package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(String),
    Dir(String),
}

impl Target {
    /// A path inside the target, suitable for node assignment.
    pub fn member_path(&self) -> String {
        match self {
            Target::File(path) => path.clone(),
            Target::Dir(dir) => join_normalized(dir, "_"),
        }
    }
}

fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}

fn record_suffixes(suffixes: &mut BTreeMap<String, String>, path: &str, target: &str) {
    let parts: Vec<&str> = path.split('/').collect();
    for start in 0..parts.len().saturating_sub(1) {
        let key = parts[start..].join("/");
        suffixes
            .entry(key)
            .and_modify(|existing| {
                if (target.len(), target) < (existing.len(), existing.as_str()) {
                    *existing = target.to_string();
                }
            })
            .or_insert_with(|| target.to_string());
    }
}

impl TreeIndex {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut sorted: Vec<&str> = paths.into_iter().collect();
        sorted.sort_unstable();

        let mut files = HashSet::new();
        let mut stems = HashMap::new();
        let mut dirs = HashSet::new();
        let mut suffixes = BTreeMap::new();
        for path in sorted {
            files.insert(path.to_string());
            let stem = strip_extension(path);
            stems.entry(stem.to_string()).or_insert_with(|| path.to_string());
            record_suffixes(&mut suffixes, stem, path);

            let mut dir = parent_dir(path);
            while !dir.is_empty() && dirs.insert(dir.to_string()) {
                record_suffixes(&mut suffixes, dir, dir);
                dir = parent_dir(dir);
            }
        }
        Self { files, stems, dirs, suffixes }
    }

    fn to_target(&self, path: &str) -> Target {
        if self.dirs.contains(path) {
            Target::Dir(path.to_string())
        } else {
            Target::File(path.to_string())
        }
    }

    /// Exact lookup: the file itself, the file without its extension, or a package directory.
    pub fn lookup(&self, path: &str) -> Option<Target> {
        if path.is_empty() {
            return None;
        }
        if self.files.contains(path) {
            return Some(Target::File(path.to_string()));
        }
        if let Some(file) = self.stems.get(path) {
            return Some(Target::File(file.clone()));
        }
        if self.dirs.contains(path) {
            let index = INDEX_STEMS
                .iter()
                .find_map(|stem| self.stems.get(&join_normalized(path, stem)));
            return Some(match index {
                Some(file) => Target::File(file.clone()),
                None => Target::Dir(path.to_string()),
            });
        }
        None
    }

    /// Longest prefix of `segments` that exists below `dir`.
    fn lookup_anchored(&self, dir: &str, segments: &[String]) -> Option<Target> {
        for len in (1..=segments.len()).rev() {
            let candidate = join_normalized(dir, &segments[..len].join("/"));
            if let Some(target) = self.lookup(&candidate) {
                return Some(target);
            }
        }
        None
    }

    fn lookup_suffix(&self, segments: &[String]) -> Option<Target> {
        for len in (2..=segments.len()).rev() {
            let prefix = &segments[..len];
            for start in 0..=len - 2 {
                let key = prefix[start..].join("/");
                if let Some(path) = self.suffixes.get(&key) {
                    return Some(self.to_target(path));
                }
            }
        }
        None
    }

    /// Resolves an import made from `importer` to a path in the tree.
    pub fn resolve(&self, importer: &str, import: &ImportRef) -> Option<Target> {
        match import {
            ImportRef::Relative(spec) => {
                let joined = join_normalized(parent_dir(importer), spec);
                self.lookup(&joined)
            }
            ImportRef::Anchored { dir, segments } => {
                if segments.is_empty() {
                    return self.lookup(dir);
                }
                self.lookup_anchored(dir, segments)
            }
            ImportRef::Module(segments) => {
                if segments.is_empty() {
                    return None;
                }
                // Package roots: the importer's own ancestors first, then the tree root.
                let mut dir = parent_dir(importer);
                loop {
                    if let Some(target) = self.lookup_anchored(dir, segments) {
                        return Some(target);
                    }
                    if dir.is_empty() {
                        break;
                    }
                    dir = parent_dir(dir);
                }
                self.lookup_suffix(segments)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index() -> TreeIndex {
        TreeIndex::new([
            "src/routes/items.ts",
            "src/controllers/items.ts",
            "src/lib/index.ts",
            "app/models.py",
            "app/api/routes.py",
            "internal/db/db.go",
            "cmd/server/main.go",
            "src/main/java/com/shop/model/Order.java",
        ])
    }

    fn module(parts: &[&str]) -> ImportRef {
        ImportRef::Module(parts.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn relative_imports_drop_extensions_and_find_index_files() {
        let index = index();
        assert_eq!(
            index.resolve("src/routes/items.ts", &ImportRef::Relative("../controllers/items".into())),
            Some(Target::File("src/controllers/items.ts".into()))
        );
        assert_eq!(
            index.resolve("src/routes/items.ts", &ImportRef::Relative("../lib".into())),
            Some(Target::File("src/lib/index.ts".into()))
        );
        assert_eq!(
            index.resolve("src/routes/items.ts", &ImportRef::Relative("./missing".into())),
            None
        );
    }

    #[test]
    fn module_paths_search_ancestors_then_suffixes() {
        let index = index();
        assert_eq!(
            index.resolve("app/api/routes.py", &module(&["models"])),
            Some(Target::File("app/models.py".into()))
        );
        assert_eq!(
            index.resolve(
                "cmd/server/main.go",
                &module(&["github.com", "acme", "shop", "internal", "db"])
            ),
            Some(Target::Dir("internal/db".into()))
        );
        assert_eq!(
            index.resolve("x/Y.java", &module(&["com", "shop", "model", "Order"])),
            Some(Target::File("src/main/java/com/shop/model/Order.java".into()))
        );
        assert_eq!(index.resolve("app/api/routes.py", &module(&["os"])), None);
    }
}
