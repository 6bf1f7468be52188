//! Preview composition
//!
//! Turns a project's asset set into a single resolvable entry document:
//! revoke the previous generation of locations, mint fresh ones for every
//! supporting asset, rewrite the entry's references, inject the runtime
//! shim, and mint the entry itself last.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::preview::blobs::{Blob, BlobStore};
use crate::preview::resolver::{resolve_assets, rewrite_references, ResolvedLocations};
use crate::preview::runtime::render_shim;
use crate::types::{Asset, Plugin, ENTRY_DOCUMENT};

/// Result of one composition pass.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Location of the composed entry document.
    pub entry_location: String,
    /// Locations minted for the supporting assets.
    pub asset_locations: ResolvedLocations,
}

/// Owns the blob store so that each compose pass can release the previous
/// pass's locations before minting new ones.
#[derive(Debug, Default)]
pub struct PreviewComposer {
    store: BlobStore,
}

impl PreviewComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose a preview of `assets`, optionally substituting `override_entry`
    /// for the stored entry document content (used for live streaming views).
    pub fn compose(
        &mut self,
        assets: &[Asset],
        override_entry: Option<&str>,
        plugins: &[&Plugin],
    ) -> Result<Composition> {
        self.store.revoke_all();

        let asset_locations = resolve_assets(&mut self.store, assets);

        let entry_source = match override_entry {
            Some(content) => content.to_string(),
            None => assets
                .iter()
                .find(|a| a.name == ENTRY_DOCUMENT)
                .and_then(|a| a.content.as_text())
                .unwrap_or("")
                .to_string(),
        };

        let rewritten = rewrite_references(&entry_source, &asset_locations);
        let shim = render_shim(plugins);
        let document = inject_shim(&rewritten, &shim);

        let entry_location = self
            .store
            .create(document.into_bytes(), "text/html".to_string());

        tracing::debug!(
            assets = asset_locations.len(),
            plugins = plugins.len(),
            "Composed preview"
        );

        Ok(Composition {
            entry_location,
            asset_locations,
        })
    }

    /// Dereference a minted location.
    pub fn blob(&self, location: &str) -> Option<&Blob> {
        self.store.get(location)
    }

    /// Write a standalone copy of the project to `dir`: assets verbatim under
    /// their stored names, plus the shim-injected entry document. References
    /// are left as relative names, which resolve naturally on disk.
    pub fn export_to_dir(
        &self,
        dir: &Path,
        assets: &[Asset],
        plugins: &[&Plugin],
    ) -> Result<()> {
        fs::create_dir_all(dir)?;

        for asset in assets {
            if asset.is_folder() {
                fs::create_dir_all(dir.join(&asset.name))?;
                continue;
            }
            let path = dir.join(&asset.name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            if asset.name == ENTRY_DOCUMENT {
                let entry = asset.content.as_text().ok_or_else(|| {
                    Error::Compose("entry document is not text".to_string())
                })?;
                let shim = render_shim(plugins);
                fs::write(&path, inject_shim(entry, &shim))?;
            } else {
                fs::write(&path, asset.content.as_bytes())?;
            }
        }

        tracing::info!(dir = %dir.display(), count = assets.len(), "Exported project");
        Ok(())
    }
}

/// Place the shim right after `<head>`, else right after `<body>`, else at
/// the front of the document.
fn inject_shim(document: &str, shim: &str) -> String {
    let lower = document.to_lowercase();
    if let Some(pos) = lower.find("<head>") {
        let at = pos + "<head>".len();
        format!("{}\n{}{}", &document[..at], shim, &document[at..])
    } else if let Some(pos) = lower.find("<body") {
        // attributes possible on <body ...>
        if let Some(close) = document[pos..].find('>') {
            let at = pos + close + 1;
            return format!("{}\n{}{}", &document[..at], shim, &document[at..]);
        }
        format!("{}\n{}", shim, document)
    } else {
        format!("{}\n{}", shim, document)
    }
}
