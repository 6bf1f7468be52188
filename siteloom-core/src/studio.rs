//! Studio application state
//!
//! The `Studio` owns every project and the active-project pointer; all
//! mutation goes through its methods so that asset-name uniqueness, the
//! append-only version history, and the at-most-one-generation guard hold
//! at every step.
//!
//! In-memory state is the source of truth. When a database is attached,
//! mutations are mirrored to it; a failed mirror write during an internal
//! sync is logged and the session continues, while explicit user actions
//! (posting a comment, direct asset upserts) surface the failure.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{
    Asset, AssetContent, AssetKind, Comment, GenerationVersion, Project, UNTITLED_PROJECT,
};

/// Prompt prefix length used when auto-naming a project from its first
/// generation.
const AUTO_NAME_LEN: usize = 30;

pub struct Studio {
    projects: Vec<Project>,
    active: usize,
    db: Option<Database>,
    generating: HashSet<String>,
    last_preview_error: Option<String>,
}

impl Studio {
    /// Create an in-memory studio seeded with one untitled project.
    pub fn new() -> Self {
        Self {
            projects: vec![Project::new(UNTITLED_PROJECT)],
            active: 0,
            db: None,
            generating: HashSet::new(),
            last_preview_error: None,
        }
    }

    /// Create a studio backed by `db`, loading persisted projects.
    ///
    /// An empty store still yields one untitled project, same as [`new`](Self::new).
    pub fn with_database(db: Database) -> Result<Self> {
        let mut projects = db.load_projects()?;
        if projects.is_empty() {
            let seed = Project::new(UNTITLED_PROJECT);
            if let Err(e) = db.upsert_project(&seed) {
                tracing::warn!(error = %e, "Failed to persist seed project");
            }
            projects.push(seed);
        }
        tracing::info!(count = projects.len(), "Loaded projects");
        Ok(Self {
            projects,
            active: 0,
            db: Some(db),
            generating: HashSet::new(),
            last_preview_error: None,
        })
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn active_project(&self) -> &Project {
        &self.projects[self.active]
    }

    pub fn active_project_mut(&mut self) -> &mut Project {
        &mut self.projects[self.active]
    }

    // ============================================
    // Project operations
    // ============================================

    /// Create a project and make it active.
    pub fn create_project(&mut self, name: impl Into<String>) -> &Project {
        let project = Project::new(name);
        self.sync_project_row(&project);
        for asset in &project.assets {
            self.sync_asset(&project.id, asset);
        }
        self.projects.push(project);
        self.active = self.projects.len() - 1;
        self.active_project()
    }

    /// Make the project with `id` active.
    pub fn switch_project(&mut self, id: &str) -> Result<()> {
        match self.projects.iter().position(|p| p.id == id) {
            Some(index) => {
                self.active = index;
                Ok(())
            }
            None => Err(Error::ProjectNotFound(id.to_string())),
        }
    }

    /// Delete a project. The studio never ends up empty: deleting the last
    /// project seeds a fresh untitled one.
    pub fn delete_project(&mut self, id: &str) -> Result<()> {
        let index = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;

        let removed = self.projects.remove(index);
        self.generating.remove(&removed.id);
        if let Some(db) = &self.db {
            if let Err(e) = db.delete_project(&removed.id) {
                tracing::warn!(project = %removed.id, error = %e, "Failed to delete persisted project");
            }
        }

        if self.projects.is_empty() {
            self.create_project(UNTITLED_PROJECT);
        } else {
            self.active = 0;
        }
        Ok(())
    }

    // ============================================
    // Asset operations
    // ============================================

    /// Update an asset's content, creating the asset if it does not exist.
    pub fn update_asset(&mut self, name: &str, content: impl Into<AssetContent>) {
        let content = content.into();
        let project = &mut self.projects[self.active];
        match project.asset_mut(name) {
            Some(asset) => {
                asset.content = content;
                asset.updated_at = Utc::now();
            }
            None => {
                let mut asset = Asset::new(name, "");
                asset.content = content;
                project.assets.push(asset);
            }
        }
        project.updated_at = Utc::now();
        let (id, asset) = {
            let p = self.active_project();
            (p.id.clone(), p.asset(name).cloned())
        };
        if let Some(asset) = asset {
            self.sync_asset(&id, &asset);
        }
    }

    /// Create a new asset, failing if the name is taken.
    pub fn create_asset(
        &mut self,
        name: &str,
        content: impl Into<AssetContent>,
    ) -> Result<()> {
        if self.active_project().asset(name).is_some() {
            return Err(Error::DuplicateAsset(name.to_string()));
        }
        let mut asset = Asset::new(name, "");
        asset.content = content.into();
        let id = self.active_project().id.clone();
        self.sync_asset(&id, &asset);
        let project = self.active_project_mut();
        project.assets.push(asset);
        project.updated_at = Utc::now();
        Ok(())
    }

    /// Create a folder marker asset.
    pub fn create_folder(&mut self, name: &str) -> Result<()> {
        if self.active_project().asset(name).is_some() {
            return Err(Error::DuplicateAsset(name.to_string()));
        }
        let asset = Asset::folder(name);
        let id = self.active_project().id.clone();
        self.sync_asset(&id, &asset);
        self.active_project_mut().assets.push(asset);
        Ok(())
    }

    /// Delete an asset. Deleting a folder also removes every asset whose
    /// name is prefixed by `name + "/"`.
    pub fn delete_asset(&mut self, name: &str) -> Result<()> {
        let project = &mut self.projects[self.active];
        let asset = project
            .asset(name)
            .ok_or_else(|| Error::AssetNotFound(name.to_string()))?;

        let removed: Vec<String> = if asset.is_folder() {
            let prefix = format!("{}/", name);
            project
                .assets
                .iter()
                .filter(|a| a.name == name || a.name.starts_with(&prefix))
                .map(|a| a.name.clone())
                .collect()
        } else {
            vec![name.to_string()]
        };

        project.assets.retain(|a| !removed.contains(&a.name));
        project.updated_at = Utc::now();

        let id = project.id.clone();
        if let Some(db) = &self.db {
            for gone in &removed {
                if let Err(e) = db.delete_asset(&id, gone) {
                    tracing::warn!(asset = %gone, error = %e, "Failed to delete persisted asset");
                }
            }
        }
        Ok(())
    }

    /// Rename an asset. Renaming a folder rewrites every child path; the
    /// asset's kind is re-inferred from the new name.
    pub fn rename_asset(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if old_name == new_name || new_name.is_empty() {
            return Ok(());
        }
        if self.active_project().asset(new_name).is_some() {
            return Err(Error::DuplicateAsset(new_name.to_string()));
        }

        let project = &mut self.projects[self.active];
        let is_folder = project
            .asset(old_name)
            .ok_or_else(|| Error::AssetNotFound(old_name.to_string()))?
            .is_folder();

        let mut renamed: Vec<(String, String)> = vec![(old_name.to_string(), new_name.to_string())];
        if is_folder {
            let prefix = format!("{}/", old_name);
            for asset in &project.assets {
                if asset.name.starts_with(&prefix) {
                    let child = format!("{}{}", new_name, &asset.name[old_name.len()..]);
                    renamed.push((asset.name.clone(), child));
                }
            }
        }

        for (from, to) in &renamed {
            if let Some(asset) = project.asset_mut(from) {
                asset.name = to.clone();
                if !asset.is_folder() {
                    asset.kind = AssetKind::from_name(to);
                }
                asset.updated_at = Utc::now();
            }
        }
        project.updated_at = Utc::now();

        let id = project.id.clone();
        if let Some(db) = &self.db {
            for (from, _) in &renamed {
                if let Err(e) = db.delete_asset(&id, from) {
                    tracing::warn!(asset = %from, error = %e, "Failed to delete persisted asset");
                }
            }
        }
        let moved: Vec<Asset> = renamed
            .iter()
            .filter_map(|(_, to)| self.active_project().asset(to).cloned())
            .collect();
        for asset in &moved {
            self.sync_asset(&id, asset);
        }
        Ok(())
    }

    /// Point-in-time copy of every non-folder asset's content.
    pub fn snapshot_assets(&self) -> BTreeMap<String, AssetContent> {
        self.active_project()
            .assets
            .iter()
            .filter(|a| !a.is_folder())
            .map(|a| (a.name.clone(), a.content.clone()))
            .collect()
    }

    // ============================================
    // Version operations
    // ============================================

    /// Append a version, move the pointer to it, and auto-name the project
    /// from the first prompt when it is still untitled.
    pub fn add_version(&mut self, version: GenerationVersion) {
        let project = &mut self.projects[self.active];
        project.versions.push(version);
        project.current_version = Some(project.versions.len() - 1);

        if project.versions.len() == 1 && project.name == UNTITLED_PROJECT {
            let prompt = &project.versions[0].prompt;
            let prefix: String = prompt.chars().take(AUTO_NAME_LEN).collect();
            project.name = if prompt.chars().count() > AUTO_NAME_LEN {
                format!("{}...", prefix)
            } else {
                prefix
            };
        }
        project.updated_at = Utc::now();

        let (snapshot, id) = {
            let p = self.active_project();
            (p.clone(), p.id.clone())
        };
        self.sync_project_row(&snapshot);
        if let (Some(db), Some(version)) = (&self.db, snapshot.versions.last()) {
            if let Err(e) = db.insert_version(&id, version) {
                tracing::warn!(project = %id, error = %e, "Failed to persist version");
            }
        }
    }

    /// Roll the live assets back (or forward) to a version's snapshot and
    /// move the pointer to it.
    pub fn select_version(&mut self, ordinal: u32) -> Result<()> {
        let project = &mut self.projects[self.active];
        let index = project
            .versions
            .iter()
            .position(|v| v.ordinal == ordinal)
            .ok_or(Error::VersionNotFound(ordinal))?;

        let snapshot = project.versions[index].file_snapshot.clone();
        project.current_version = Some(index);
        // Whatever error the previous composition surfaced no longer applies
        self.last_preview_error = None;

        for (name, content) in snapshot {
            self.update_asset(&name, content);
        }
        let row = self.active_project().clone();
        self.sync_project_row(&row);
        Ok(())
    }

    /// Delete one version. Other versions' snapshots are untouched.
    pub fn delete_version(&mut self, ordinal: u32) -> Result<()> {
        let project = &mut self.projects[self.active];
        let index = project
            .versions
            .iter()
            .position(|v| v.ordinal == ordinal)
            .ok_or(Error::VersionNotFound(ordinal))?;

        project.versions.remove(index);
        project.current_version = match project.current_version {
            Some(current) if current == index => project.versions.len().checked_sub(1),
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
        project.updated_at = Utc::now();

        let id = project.id.clone();
        if let Some(db) = &self.db {
            if let Err(e) = db.delete_version(&id, ordinal) {
                tracing::warn!(project = %id, ordinal, error = %e, "Failed to delete persisted version");
            }
        }
        let row = self.active_project().clone();
        self.sync_project_row(&row);
        Ok(())
    }

    // ============================================
    // Generation guard
    // ============================================

    /// Claim the active project for a generation. At most one generation
    /// may run per project; a second attempt is rejected.
    pub fn begin_generation(&mut self) -> Result<()> {
        let id = self.active_project().id.clone();
        if self.generating.contains(&id) {
            return Err(Error::GenerationInProgress(
                self.active_project().name.clone(),
            ));
        }
        self.generating.insert(id);
        Ok(())
    }

    /// Release the generation claim on the active project.
    pub fn finish_generation(&mut self) {
        let id = self.active_project().id.clone();
        self.generating.remove(&id);
    }

    pub fn is_generating(&self) -> bool {
        self.generating.contains(&self.active_project().id)
    }

    // ============================================
    // Preview errors
    // ============================================

    /// Record a runtime error reported by the composed preview.
    pub fn record_preview_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "Preview reported an error");
        self.last_preview_error = Some(message);
    }

    pub fn last_preview_error(&self) -> Option<&str> {
        self.last_preview_error.as_deref()
    }

    pub fn clear_preview_error(&mut self) {
        self.last_preview_error = None;
    }

    // ============================================
    // Comments
    // ============================================

    /// Post a comment on the active project. Unlike internal syncs, a
    /// persistence failure here is returned to the caller.
    pub fn add_comment(&mut self, author: &str, text: &str) -> Result<Comment> {
        let comment = Comment::new(author, text);
        let id = self.active_project().id.clone();
        if let Some(db) = &self.db {
            db.insert_comment(&id, &comment)?;
        }
        self.active_project_mut().comments.push(comment.clone());
        Ok(comment)
    }

    // ============================================
    // Persistence sync
    // ============================================

    fn sync_project_row(&self, project: &Project) {
        if let Some(db) = &self.db {
            if let Err(e) = db.upsert_project(project) {
                tracing::warn!(project = %project.id, error = %e, "Failed to persist project");
            }
        }
    }

    fn sync_asset(&self, project_id: &str, asset: &Asset) {
        if let Some(db) = &self.db {
            if let Err(e) = db.upsert_asset(project_id, asset) {
                tracing::warn!(asset = %asset.name, error = %e, "Failed to persist asset");
            }
        }
    }
}

impl Default for Studio {
    fn default() -> Self {
        Self::new()
    }
}
