//! Database repository layer
//!
//! Provides query and insert operations for projects, versions, assets,
//! and comments. The in-memory [`Studio`](crate::studio::Studio) state is
//! the source of truth; this layer mirrors it so projects survive restarts.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::types::{
    Asset, AssetContent, AssetKind, Comment, GenerationVersion, Plugin, Project, VersionStats,
};

/// Thread-safe wrapper around a SQLite connection.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Project operations
    // ============================================

    /// Insert or update a project row (name, pointer, plugins).
    ///
    /// Assets and versions are mirrored separately as they change.
    pub fn upsert_project(&self, project: &Project) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let current_ordinal = project
            .current_version
            .and_then(|i| project.versions.get(i))
            .map(|v| v.ordinal);
        let plugins = serde_json::to_string(&project.plugins)?;
        conn.execute(
            r#"
            INSERT INTO projects (id, name, current_ordinal, plugins, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                current_ordinal = excluded.current_ordinal,
                plugins = excluded.plugins,
                updated_at = excluded.updated_at
            "#,
            params![
                project.id,
                project.name,
                current_ordinal,
                plugins,
                project.created_at.to_rfc3339(),
                project.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load all projects, fully hydrated with assets and version history.
    pub fn load_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, current_ordinal, plugins, created_at, updated_at
             FROM projects ORDER BY created_at",
        )?;
        let rows: Vec<(Project, Option<u32>)> = stmt
            .query_map([], |row| {
                let plugins_str: String = row.get("plugins")?;
                let plugins: Vec<Plugin> =
                    serde_json::from_str(&plugins_str).unwrap_or_default();
                Ok((
                    Project {
                        id: row.get("id")?,
                        name: row.get("name")?,
                        assets: Vec::new(),
                        versions: Vec::new(),
                        current_version: None,
                        plugins,
                        comments: Vec::new(),
                        created_at: parse_ts(row, "created_at")?,
                        updated_at: parse_ts(row, "updated_at")?,
                    },
                    row.get("current_ordinal")?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;

        let mut projects = Vec::with_capacity(rows.len());
        for (mut project, current_ordinal) in rows {
            project.assets = Self::query_assets(&conn, &project.id)?;
            project.versions = Self::query_versions(&conn, &project.id)?;
            project.comments = Self::query_comments(&conn, &project.id)?;
            project.current_version = current_ordinal.and_then(|ord| {
                project.versions.iter().position(|v| v.ordinal == ord)
            });
            projects.push(project);
        }
        Ok(projects)
    }

    /// Delete a project and everything attached to it.
    pub fn delete_project(&self, project_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM projects WHERE id = ?", [project_id])?;
        Ok(())
    }

    // ============================================
    // Version operations
    // ============================================

    /// Insert a version record.
    pub fn insert_version(&self, project_id: &str, version: &GenerationVersion) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let snapshot = serde_json::to_string(&version.file_snapshot)?;
        let primary = serde_json::to_string(&version.primary_files)?;
        conn.execute(
            r#"
            INSERT INTO versions (
                project_id, ordinal, prompt, raw_response, reasoning,
                file_snapshot, primary_files,
                added_lines, removed_lines, approx_tokens, elapsed_secs, model,
                created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                project_id,
                version.ordinal,
                version.prompt,
                version.raw_response,
                version.reasoning_summary,
                snapshot,
                primary,
                version.stats.added_lines as i64,
                version.stats.removed_lines as i64,
                version.stats.approx_tokens as i64,
                version.stats.elapsed_secs as i64,
                version.stats.model,
                version.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All versions for a project, ordered by creation time.
    pub fn list_versions(&self, project_id: &str) -> Result<Vec<GenerationVersion>> {
        let conn = self.conn.lock().unwrap();
        Self::query_versions(&conn, project_id)
    }

    /// Delete a single version by ordinal.
    pub fn delete_version(&self, project_id: &str, ordinal: u32) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM versions WHERE project_id = ?1 AND ordinal = ?2",
            params![project_id, ordinal],
        )?;
        if affected == 0 {
            return Err(Error::VersionNotFound(ordinal));
        }
        Ok(())
    }

    fn query_versions(conn: &Connection, project_id: &str) -> Result<Vec<GenerationVersion>> {
        let mut stmt = conn.prepare(
            "SELECT ordinal, prompt, raw_response, reasoning, file_snapshot, primary_files,
                    added_lines, removed_lines, approx_tokens, elapsed_secs, model, created_at
             FROM versions WHERE project_id = ? ORDER BY created_at",
        )?;
        let versions = stmt
            .query_map([project_id], Self::row_to_version)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(versions)
    }

    fn row_to_version(row: &Row) -> rusqlite::Result<GenerationVersion> {
        let snapshot_str: String = row.get("file_snapshot")?;
        let primary_str: String = row.get("primary_files")?;
        let file_snapshot: BTreeMap<String, AssetContent> =
            serde_json::from_str(&snapshot_str).unwrap_or_default();
        let primary_files: Vec<String> =
            serde_json::from_str(&primary_str).unwrap_or_default();

        Ok(GenerationVersion {
            ordinal: row.get("ordinal")?,
            prompt: row.get("prompt")?,
            raw_response: row.get("raw_response")?,
            reasoning_summary: row.get("reasoning")?,
            file_snapshot,
            primary_files,
            stats: VersionStats {
                added_lines: row.get::<_, i64>("added_lines")? as usize,
                removed_lines: row.get::<_, i64>("removed_lines")? as usize,
                approx_tokens: row.get::<_, i64>("approx_tokens")? as u64,
                elapsed_secs: row.get::<_, i64>("elapsed_secs")? as u64,
                model: row.get("model")?,
            },
            created_at: parse_ts(row, "created_at")?,
        })
    }

    // ============================================
    // Asset operations
    // ============================================

    /// Insert or update one asset by (project, name).
    pub fn upsert_asset(&self, project_id: &str, asset: &Asset) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let is_text = asset.content.as_text().is_some();
        conn.execute(
            r#"
            INSERT INTO assets (project_id, name, kind, is_text, content, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(project_id, name) DO UPDATE SET
                kind = excluded.kind,
                is_text = excluded.is_text,
                content = excluded.content,
                updated_at = excluded.updated_at
            "#,
            params![
                project_id,
                asset.name,
                asset.kind.as_str(),
                is_text,
                asset.content.as_bytes(),
                asset.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All assets for a project, ordered by name.
    pub fn list_assets(&self, project_id: &str) -> Result<Vec<Asset>> {
        let conn = self.conn.lock().unwrap();
        Self::query_assets(&conn, project_id)
    }

    /// Delete one asset by name.
    pub fn delete_asset(&self, project_id: &str, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM assets WHERE project_id = ?1 AND name = ?2",
            params![project_id, name],
        )?;
        Ok(())
    }

    fn query_assets(conn: &Connection, project_id: &str) -> Result<Vec<Asset>> {
        let mut stmt = conn.prepare(
            "SELECT name, kind, is_text, content, updated_at
             FROM assets WHERE project_id = ? ORDER BY name",
        )?;
        let assets = stmt
            .query_map([project_id], Self::row_to_asset)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assets)
    }

    fn row_to_asset(row: &Row) -> rusqlite::Result<Asset> {
        let kind_str: String = row.get("kind")?;
        let is_text: bool = row.get("is_text")?;
        let bytes: Vec<u8> = row.get("content")?;
        let content = if is_text {
            AssetContent::Text(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            AssetContent::Binary(bytes)
        };
        Ok(Asset {
            name: row.get("name")?,
            content,
            kind: kind_str.parse().unwrap_or(AssetKind::Text),
            updated_at: parse_ts(row, "updated_at")?,
        })
    }

    // ============================================
    // Comment operations
    // ============================================

    /// Append a comment to a project.
    pub fn insert_comment(&self, project_id: &str, comment: &Comment) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO comments (id, project_id, author, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id,
                project_id,
                comment.author,
                comment.text,
                comment.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All comments for a project, ordered by creation time.
    pub fn list_comments(&self, project_id: &str) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        Self::query_comments(&conn, project_id)
    }

    fn query_comments(conn: &Connection, project_id: &str) -> Result<Vec<Comment>> {
        let mut stmt = conn.prepare(
            "SELECT id, author, body, created_at
             FROM comments WHERE project_id = ? ORDER BY created_at",
        )?;
        let comments = stmt
            .query_map([project_id], |row| {
                Ok(Comment {
                    id: row.get("id")?,
                    author: row.get("author")?,
                    text: row.get("body")?,
                    created_at: parse_ts(row, "created_at")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }
}

fn parse_ts(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(column)?;
    Ok(DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn version(ordinal: u32) -> GenerationVersion {
        let mut snapshot = BTreeMap::new();
        snapshot.insert(
            "index.html".to_string(),
            AssetContent::Text(format!("<p>v{}</p>", ordinal)),
        );
        GenerationVersion {
            ordinal,
            prompt: "make a page".to_string(),
            raw_response: "[FILENAME]index.html[/FILENAME]".to_string(),
            reasoning_summary: "Did things".to_string(),
            file_snapshot: snapshot,
            primary_files: vec!["index.html".to_string()],
            stats: VersionStats {
                added_lines: 3,
                removed_lines: 1,
                approx_tokens: 120,
                elapsed_secs: 7,
                model: "gemini-3-flash".to_string(),
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_project_round_trip() {
        let db = db();
        let mut project = Project::new("Sunrise Bakery");
        project.plugins.push(Plugin::new("confetti", "", "var plugin = {};"));

        db.upsert_project(&project).unwrap();
        for asset in &project.assets {
            db.upsert_asset(&project.id, asset).unwrap();
        }

        let loaded = db.load_projects().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Sunrise Bakery");
        assert_eq!(loaded[0].plugins.len(), 1);
        assert_eq!(loaded[0].assets.len(), 1);
        assert_eq!(loaded[0].assets[0].name, "index.html");
    }

    #[test]
    fn test_upsert_project_updates_name() {
        let db = db();
        let mut project = Project::new("Before");
        db.upsert_project(&project).unwrap();
        project.name = "After".to_string();
        db.upsert_project(&project).unwrap();

        let loaded = db.load_projects().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "After");
    }

    #[test]
    fn test_version_round_trip_and_order() {
        let db = db();
        let project = Project::new("Test");
        db.upsert_project(&project).unwrap();

        db.insert_version(&project.id, &version(1)).unwrap();
        db.insert_version(&project.id, &version(2)).unwrap();

        let versions = db.list_versions(&project.id).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].ordinal, 1);
        assert_eq!(versions[1].ordinal, 2);
        assert_eq!(versions[0].entry_code(), Some("<p>v1</p>"));
        assert_eq!(versions[1].stats.approx_tokens, 120);
    }

    #[test]
    fn test_current_version_pointer_survives_reload() {
        let db = db();
        let mut project = Project::new("Test");
        project.versions.push(version(1));
        project.versions.push(version(2));
        project.current_version = Some(0);
        db.upsert_project(&project).unwrap();
        db.insert_version(&project.id, &project.versions[0]).unwrap();
        db.insert_version(&project.id, &project.versions[1]).unwrap();

        let loaded = db.load_projects().unwrap();
        assert_eq!(loaded[0].current_version, Some(0));
    }

    #[test]
    fn test_delete_missing_version() {
        let db = db();
        let project = Project::new("Test");
        db.upsert_project(&project).unwrap();
        assert!(matches!(
            db.delete_version(&project.id, 9),
            Err(Error::VersionNotFound(9))
        ));
    }

    #[test]
    fn test_binary_asset_round_trip() {
        let db = db();
        let project = Project::new("Test");
        db.upsert_project(&project).unwrap();

        let mut logo = Asset::new("logo.png", "");
        logo.content = AssetContent::Binary(vec![0x89, 0x50, 0x4e, 0x47]);
        db.upsert_asset(&project.id, &logo).unwrap();

        let assets = db.list_assets(&project.id).unwrap();
        let loaded = assets.iter().find(|a| a.name == "logo.png").unwrap();
        assert_eq!(loaded.content, AssetContent::Binary(vec![0x89, 0x50, 0x4e, 0x47]));
        assert_eq!(loaded.kind, AssetKind::Image);
    }

    #[test]
    fn test_delete_project_cascades() {
        let db = db();
        let project = Project::new("Test");
        db.upsert_project(&project).unwrap();
        db.insert_version(&project.id, &version(1)).unwrap();
        db.insert_comment(&project.id, &Comment::new("sam", "nice header"))
            .unwrap();

        db.delete_project(&project.id).unwrap();

        assert!(db.load_projects().unwrap().is_empty());
        assert!(db.list_versions(&project.id).unwrap().is_empty());
        assert!(db.list_comments(&project.id).unwrap().is_empty());
    }

    #[test]
    fn test_comments_ordered_by_creation() {
        let db = db();
        let project = Project::new("Test");
        db.upsert_project(&project).unwrap();

        let mut first = Comment::new("sam", "first");
        first.created_at = Utc::now() - chrono::Duration::seconds(10);
        let second = Comment::new("alex", "second");
        db.insert_comment(&project.id, &first).unwrap();
        db.insert_comment(&project.id, &second).unwrap();

        let comments = db.list_comments(&project.id).unwrap();
        assert_eq!(comments[0].text, "first");
        assert_eq!(comments[1].text, "second");
    }
}
