use recon_protocol::{EntryPoint, Role};
use recon_scanner::ScannedFile;

/// Rank of a lower-cased path as a starting point for reading the code, plus its kind.
///
/// Lower ranks first. Library roots rank below executables so they never crowd out mains.
pub fn entrypoint_rank(file_lc: &str) -> Option<(usize, &'static str)> {
    // Obvious executables at the root.
    match file_lc {
        "main.rs" | "main.py" | "__main__.py" | "main.go" | "main.ts" | "main.js" => {
            return Some((0, "main"))
        }
        "app.py" | "server.py" | "index.js" | "server.js" | "app.js" | "server.ts"
        | "app.ts" | "index.ts" | "wsgi.py" | "asgi.py" => return Some((0, "server")),
        "manage.py" | "artisan" | "config.ru" => return Some((1, "framework")),
        _ => {}
    }

    // Common "src root" mains.
    match file_lc {
        "src/main.rs" | "src/main.py" | "src/__main__.py" | "src/main.ts" | "src/main.js" => {
            return Some((1, "main"))
        }
        "src/app.py" | "src/server.py" | "src/index.js" | "src/index.ts" | "src/server.ts"
        | "src/server.js" | "src/app.ts" | "src/app.js" => return Some((1, "server")),
        "program.cs" | "src/program.cs" => return Some((1, "main")),
        _ => {}
    }

    // Nested mains in monorepos and multi-crate layouts.
    if [
        "/src/main.rs",
        "/src/main.py",
        "/src/__main__.py",
        "/src/main.ts",
    ]
    .iter()
    .any(|suffix| file_lc.ends_with(suffix))
    {
        return Some((2, "main"));
    }
    if ["/src/index.js", "/src/index.ts", "/src/server.ts", "/src/app.py"]
        .iter()
        .any(|suffix| file_lc.ends_with(suffix))
    {
        return Some((2, "server"));
    }

    // Go: `cmd/<name>/main.go`.
    if file_lc.starts_with("cmd/") && file_lc.ends_with("/main.go") {
        return Some((2, "main"));
    }

    // Java/Kotlin Spring-style application classes.
    if file_lc.ends_with("application.java") || file_lc.ends_with("application.kt") {
        return Some((2, "main"));
    }

    if matches!(file_lc, "lib.rs" | "src/lib.rs") || file_lc.ends_with("/src/lib.rs") {
        return Some((3, "library"));
    }

    if file_lc == "src/__init__.py" {
        return Some((3, "library"));
    }
    if file_lc.starts_with("src/")
        && file_lc.ends_with("/__init__.py")
        && file_lc.split('/').count() == 3
    {
        return Some((4, "library"));
    }

    None
}

/// Ranked entry points, best first; equal ranks sort by path.
pub fn discover_entry_points(files: &[ScannedFile]) -> Vec<EntryPoint> {
    let mut ranked: Vec<(usize, &str, &'static str)> = files
        .iter()
        .filter(|file| file.role() != Role::Test)
        .filter_map(|file| {
            let lc = file.path().to_ascii_lowercase();
            entrypoint_rank(&lc).map(|(rank, kind)| (rank, file.path(), kind))
        })
        .collect();
    ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    ranked
        .into_iter()
        .map(|(_, file, kind)| EntryPoint {
            file: file.to_string(),
            kind: kind.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use recon_protocol::{FileRecord, Language};

    fn record(path: &str) -> ScannedFile {
        ScannedFile {
            record: FileRecord {
                path: path.to_string(),
                role: Role::Other,
                language: Language::from_path(path),
                line_count: 1,
            },
            content: None,
        }
    }

    #[test]
    fn mains_rank_ahead_of_library_roots() {
        let files = vec![
            record("crates/core/src/lib.rs"),
            record("src/lib.rs"),
            record("crates/cli/src/main.rs"),
            record("cmd/api/main.go"),
            record("README.md"),
        ];
        let found: Vec<(String, String)> = discover_entry_points(&files)
            .into_iter()
            .map(|e| (e.file, e.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("cmd/api/main.go".to_string(), "main".to_string()),
                ("crates/cli/src/main.rs".to_string(), "main".to_string()),
                ("crates/core/src/lib.rs".to_string(), "library".to_string()),
                ("src/lib.rs".to_string(), "library".to_string()),
            ]
        );
    }

    #[test]
    fn server_files_are_recognized() {
        assert_eq!(entrypoint_rank("app.py"), Some((0, "server")));
        assert_eq!(entrypoint_rank("src/index.ts"), Some((1, "server")));
        assert_eq!(entrypoint_rank("manage.py"), Some((1, "framework")));
        assert_eq!(entrypoint_rank("src/utils.ts"), None);
    }
}
