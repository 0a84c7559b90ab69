use pretty_assertions::assert_eq;
use proptest::prelude::*;
use recon_extract::{extract_endpoints, extract_schema};
use recon_protocol::{RelationKind, WarningKind};
use recon_scanner::{scan_tree, CancelToken, ScanOptions, ScannedFile};
use std::fs;
use tempfile::tempdir;

fn write(root: &std::path::Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const ITEMS_ROUTES: &str = r#"import { Router } from 'express';
import { requireAuth } from '../middleware/auth';
import * as items from '../controllers/items';

const router = Router();

router.get('/items', items.list);
router.get('/items/:id', items.show);
router.post('/items', requireAuth, items.create);
router.put('/items/:id', items.update);
router.delete('/items/:id', items.remove);

export default router;
"#;

#[tokio::test]
async fn five_verb_handlers_one_guarded() -> anyhow::Result<()> {
    let temp = tempdir()?;
    write(temp.path(), "src/routes/items.ts", ITEMS_ROUTES);
    write(
        temp.path(),
        "src/middleware/auth.ts",
        "export function requireAuth(req, res, next) { next(); }\n",
    );

    let scan = scan_tree(temp.path(), &ScanOptions::default(), &CancelToken::new()).await?;
    let out = extract_endpoints(&scan.files);

    assert_eq!(out.endpoints.len(), 5);
    assert_eq!(out.endpoints.iter().filter(|e| e.auth_required).count(), 1);
    let guarded = out.endpoints.iter().find(|e| e.auth_required).unwrap();
    assert_eq!((guarded.method.as_str(), guarded.path.as_str()), ("POST", "/items"));
    assert_eq!(guarded.handler_ref.symbol.as_deref(), Some("items.create"));
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    Ok(())
}

#[tokio::test]
async fn dangling_foreign_key_is_reported_once() -> anyhow::Result<()> {
    let temp = tempdir()?;
    write(
        temp.path(),
        "src/models/item.ts",
        "export interface Item {\n  id: string;\n  userId: string;\n  title: string;\n}\n",
    );

    let scan = scan_tree(temp.path(), &ScanOptions::default(), &CancelToken::new()).await?;
    let out = extract_schema(&scan.files);

    assert_eq!(out.entities.len(), 1);
    let item = &out.entities[0];
    assert_eq!(item.name, "Item");
    assert_eq!(item.file, "src/models/item.ts");
    assert_eq!(item.relations.len(), 1);
    assert_eq!(item.relations[0].target_entity, None);
    assert_eq!(item.relations[0].kind, RelationKind::OneToMany);
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].kind, WarningKind::UnresolvedRelationReference);
    Ok(())
}

#[tokio::test]
async fn mixed_frameworks_in_one_tree() -> anyhow::Result<()> {
    let temp = tempdir()?;
    write(
        temp.path(),
        "api/routes/users.py",
        "from fastapi import APIRouter, Depends\n\nrouter = APIRouter(prefix=\"/users\")\n\n@router.get(\"/\")\nasync def list_users():\n    return []\n\n@router.delete(\"/{user_id}\")\nasync def delete_user(user_id: int, user = Depends(get_current_user)):\n    return None\n",
    );
    write(
        temp.path(),
        "api/models/user.py",
        "class User(Base):\n    __tablename__ = \"users\"\n    id = Column(Integer, primary_key=True)\n    team_id = Column(Integer, ForeignKey(\"teams.id\"))\n\n\nclass Team(Base):\n    __tablename__ = \"teams\"\n    id = Column(Integer, primary_key=True)\n    members = relationship(\"User\")\n",
    );

    let scan = scan_tree(temp.path(), &ScanOptions::default(), &CancelToken::new()).await?;

    let routes = extract_endpoints(&scan.files);
    let summary: Vec<(&str, &str, bool)> = routes
        .endpoints
        .iter()
        .map(|e| (e.method.as_str(), e.path.as_str(), e.auth_required))
        .collect();
    assert_eq!(
        summary,
        vec![("GET", "/users", false), ("DELETE", "/users/{user_id}", true)]
    );

    let schema = extract_schema(&scan.files);
    let names: Vec<&str> = schema.entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Team", "User"]);
    assert_eq!(
        schema.entities[1].relations[0].target_entity.as_deref(),
        Some("Team")
    );
    assert_eq!(
        schema.entities[0].relations[0].target_entity.as_deref(),
        Some("User")
    );
    assert!(schema.warnings.is_empty(), "{:?}", schema.warnings);
    Ok(())
}

fn fixture_files() -> Vec<ScannedFile> {
    let temp = tempdir().unwrap();
    write(temp.path(), "src/routes/items.ts", ITEMS_ROUTES);
    write(
        temp.path(),
        "src/routes/users.ts",
        "router.get('/users', users.list);\nrouter.post('/users', authenticate, users.create);\n",
    );
    write(
        temp.path(),
        "src/models/post.ts",
        "export interface Post {\n  id: string;\n  authorId: string;\n  tags: Tag[];\n}\n",
    );
    write(
        temp.path(),
        "src/models/tag.ts",
        "export interface Tag {\n  id: string;\n  posts: Post[];\n}\n",
    );
    write(
        temp.path(),
        "src/models/author.ts",
        "export interface Author {\n  id: string;\n  teamId?: string;\n}\n",
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let scan = runtime
        .block_on(scan_tree(
            temp.path(),
            &ScanOptions::default(),
            &CancelToken::new(),
        ))
        .unwrap();
    scan.files
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn output_does_not_depend_on_file_order(seed in any::<u64>()) {
        let files = fixture_files();
        let mut shuffled = files.clone();
        // Deterministic Fisher-Yates driven by the seed.
        let mut state = seed;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }

        let endpoints = extract_endpoints(&files);
        let reordered = extract_endpoints(&shuffled);
        prop_assert_eq!(&endpoints.endpoints, &reordered.endpoints);
        prop_assert_eq!(&endpoints.warnings, &reordered.warnings);

        let schema = extract_schema(&files);
        let reordered = extract_schema(&shuffled);
        prop_assert_eq!(&schema.entities, &reordered.entities);
        prop_assert_eq!(&schema.warnings, &reordered.warnings);
    }
}
