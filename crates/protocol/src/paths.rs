use std::path::Path;

/// Root-relative, `/`-separated form of `path`, or `None` when it lies outside `root`.
pub fn normalize_relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let rel = rel.to_string_lossy().into_owned();
    Some(rel.replace('\\', "/"))
}

/// True when `path` equals `prefix` or lives below it on a segment boundary.
pub fn path_prefix_matches(prefix: &str, path: &str) -> bool {
    if path == prefix {
        return true;
    }

    if !path.starts_with(prefix) {
        return false;
    }

    path.as_bytes().get(prefix.len()) == Some(&b'/')
}

/// Directory part of a relative path; empty for root-level files.
pub fn parent_dir(rel_path: &str) -> &str {
    rel_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

pub fn file_name(rel_path: &str) -> &str {
    rel_path.rsplit('/').next().unwrap_or(rel_path)
}

/// Directory segments of a relative path (the file name is excluded).
pub fn dir_segments(rel_path: &str) -> impl Iterator<Item = &str> {
    parent_dir(rel_path).split('/').filter(|s| !s.is_empty())
}

/// Resolves `.` and `..` segments of a `/`-separated relative path.
pub fn join_normalized(base_dir: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = PathBuf::from("/repo");
        let file = root.join("src").join("routes").join("items.ts");
        assert_eq!(
            normalize_relative_path(&root, &file).as_deref(),
            Some("src/routes/items.ts")
        );
        assert_eq!(normalize_relative_path(&root, Path::new("/other/x")), None);
    }

    #[test]
    fn prefix_matches_on_segment_boundary() {
        assert!(path_prefix_matches("src", "src/lib.rs"));
        assert!(path_prefix_matches("src", "src"));
        assert!(!path_prefix_matches("src", "src2/lib.rs"));
    }

    #[test]
    fn path_helpers() {
        assert_eq!(parent_dir("src/routes/items.ts"), "src/routes");
        assert_eq!(parent_dir("main.py"), "");
        assert_eq!(file_name("src/routes/items.ts"), "items.ts");
        let segments: Vec<_> = dir_segments("src/routes/items.ts").collect();
        assert_eq!(segments, vec!["src", "routes"]);
        assert_eq!(join_normalized("src/routes", "../models/item"), "src/models/item");
        assert_eq!(join_normalized("", "./lib/db"), "lib/db");
    }
}
