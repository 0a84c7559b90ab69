use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};

/// Walks a source tree and lists the regular files worth classifying.
pub struct FileWalker {
    root: PathBuf,
    respect_gitignore: bool,
    excluded: Vec<PathBuf>,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            respect_gitignore: true,
            excluded: Vec::new(),
        }
    }

    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.respect_gitignore = yes;
        self
    }

    /// Root-relative files or directories left out of the walk.
    pub fn exclude(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.excluded
            .extend(paths.into_iter().filter(|p| !p.as_os_str().is_empty()));
        self
    }

    /// Lists regular files under the root, sorted by path.
    ///
    /// Only the tree's own ignore files count. Global and repo-local git excludes are skipped
    /// so two machines walking the same tree see the same files.
    pub fn walk(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let excluded = self.excluded.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .parents(false)
            .ignore(self.respect_gitignore)
            .git_ignore(self.respect_gitignore)
            .require_git(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(false);
        builder.filter_entry(move |entry| {
            !FileWalker::is_ignored_scope(entry.path(), &root)
                && !FileWalker::is_excluded(entry.path(), &root, &excluded)
        });

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if Self::is_noise_file(path) {
                        log::debug!("Skipping noise file {}", path.display());
                        continue;
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort();
        log::debug!("Walk found {} files under {}", files.len(), self.root.display());
        files
    }

    fn is_ignored_scope(path: &Path, root: &Path) -> bool {
        if let Ok(relative) = path.strip_prefix(root) {
            for component in relative.components() {
                if let Component::Normal(name) = component {
                    let lowered = name.to_string_lossy().to_lowercase();
                    if IGNORED_SCOPES.iter().any(|ignored| ignored == &lowered) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn is_excluded(path: &Path, root: &Path, excluded: &[PathBuf]) -> bool {
        match path.strip_prefix(root) {
            Ok(relative) => excluded.iter().any(|skip| relative.starts_with(skip)),
            Err(_) => false,
        }
    }

    fn is_noise_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| {
                NOISE_FILE_NAMES
                    .iter()
                    .any(|candidate| name.eq_ignore_ascii_case(candidate))
            })
    }
}

/// Version-control metadata, dependency caches and build output.
pub const IGNORED_SCOPES: &[&str] = &[
    // VCS / tooling
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    // dependency caches
    "node_modules",
    "bower_components",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".gradle",
    ".cache",
    // build output
    "target",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    ".svelte-kit",
    "coverage",
];

const NOISE_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

#[cfg(test)]
mod tests {
    use super::FileWalker;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn relative(root: &std::path::Path, files: &[std::path::PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn skips_ignored_directories() {
        let temp = tempdir().unwrap();
        let deps = temp.path().join("node_modules").join("express");
        fs::create_dir_all(&deps).unwrap();
        fs::write(deps.join("index.js"), b"module.exports = {}").unwrap();
        let git = temp.path().join(".git");
        fs::create_dir_all(&git).unwrap();
        fs::write(git.join("HEAD"), b"ref: refs/heads/main").unwrap();
        fs::write(temp.path().join("server.js"), b"require('express')").unwrap();

        let files = FileWalker::new(temp.path()).walk();

        assert_eq!(relative(temp.path(), &files), vec!["server.js"]);
    }

    #[test]
    fn honors_gitignore_without_a_repository() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("generated")).unwrap();
        fs::write(temp.path().join("generated").join("api.ts"), b"export {}").unwrap();
        fs::write(temp.path().join(".gitignore"), b"/generated\n").unwrap();
        fs::write(temp.path().join("main.ts"), b"export {}").unwrap();

        let files = FileWalker::new(temp.path()).walk();
        assert_eq!(relative(temp.path(), &files), vec![".gitignore", "main.ts"]);

        let files = FileWalker::new(temp.path()).respect_gitignore(false).walk();
        assert_eq!(
            relative(temp.path(), &files),
            vec![".gitignore", "generated/api.ts", "main.ts"]
        );
    }

    #[test]
    fn excluded_paths_are_skipped_by_component() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("recon-out")).unwrap();
        fs::write(temp.path().join("recon-out").join("analysis.json"), b"{}").unwrap();
        fs::create_dir_all(temp.path().join("recon-outline")).unwrap();
        fs::write(temp.path().join("recon-outline").join("notes.md"), b"# notes").unwrap();
        fs::write(temp.path().join("app.py"), b"print(1)").unwrap();

        let files = FileWalker::new(temp.path())
            .exclude([std::path::PathBuf::from("recon-out"), std::path::PathBuf::new()])
            .walk();
        assert_eq!(
            relative(temp.path(), &files),
            vec!["app.py", "recon-outline/notes.md"]
        );
    }

    #[test]
    fn keeps_hidden_config_files() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(".env.example"), b"PORT=3000").unwrap();
        fs::write(temp.path().join(".DS_Store"), b"\0\0").unwrap();

        let files = FileWalker::new(temp.path()).walk();
        assert_eq!(relative(temp.path(), &files), vec![".env.example"]);
    }
}
