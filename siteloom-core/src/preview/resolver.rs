//! Asset reference resolution
//!
//! Mints one resolvable location per non-folder asset, in dependency order:
//! binary/other assets first (they reference nothing), then stylesheets
//! (may reference images), then scripts (may reference styles/images), then
//! secondary markup (may reference any of the above). The entry document is
//! excluded here; the composer handles it last.
//!
//! Ordering is the point: an asset's textual content is rewritten against
//! the locations minted so far *before* that asset itself is minted, so each
//! asset must only be minted after everything it can reference already was.

use regex::{Captures, Regex};

use crate::preview::blobs::BlobStore;
use crate::types::{mime_for_name, Asset, AssetKind, ENTRY_DOCUMENT};

/// Name -> location mapping, preserving mint order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedLocations {
    entries: Vec<(String, String)>,
}

impl ResolvedLocations {
    pub fn location(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, url)| url.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, u)| (n.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: &str, url: String) {
        self.entries.push((name.to_string(), url));
    }
}

/// Rewrite references to resolved assets inside one asset's textual content.
///
/// Matches `src=`/`href=` attribute forms and the CSS `url(...)` form, with
/// optional quoting and an optional leading `./` or `/`. The key is matched
/// case-insensitively; the asset name is matched case-sensitively.
pub fn rewrite_references(content: &str, locations: &ResolvedLocations) -> String {
    let mut updated = content.to_string();
    for (name, url) in locations.iter() {
        let pattern = format!(
            r#"(?:(?i)(src|href|url))\s*([=(])\s*["']?\s*\.?/?{}\s*["']?\s*(\)?)"#,
            regex::escape(name)
        );
        // Per-name pattern; asset sets are small enough that compiling on
        // the fly is cheap next to the network round trip
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(asset = name, error = %e, "Skipping unrewritable asset name");
                continue;
            }
        };
        updated = re
            .replace_all(&updated, |caps: &Captures| {
                let key = &caps[1];
                let close = &caps[3];
                if key.eq_ignore_ascii_case("url") {
                    format!("url(\"{}\"{}", url, close)
                } else {
                    format!("{}{}\"{}\"{}", key, &caps[2], url, close)
                }
            })
            .into_owned();
    }
    updated
}

/// Mint locations for all non-folder, non-entry assets in dependency order,
/// rewriting each textual asset against the locations minted before it.
pub fn resolve_assets(store: &mut BlobStore, assets: &[Asset]) -> ResolvedLocations {
    let mut resolved = ResolvedLocations::default();

    let participants: Vec<&Asset> = assets.iter().filter(|a| !a.is_folder()).collect();

    let other: Vec<&Asset> = participants
        .iter()
        .copied()
        .filter(|a| !matches!(a.kind, AssetKind::Css | AssetKind::Script | AssetKind::Html))
        .collect();
    let css: Vec<&Asset> = participants
        .iter()
        .copied()
        .filter(|a| a.kind == AssetKind::Css)
        .collect();
    let scripts: Vec<&Asset> = participants
        .iter()
        .copied()
        .filter(|a| a.kind == AssetKind::Script)
        .collect();
    let markup: Vec<&Asset> = participants
        .iter()
        .copied()
        .filter(|a| a.kind == AssetKind::Html && a.name != ENTRY_DOCUMENT)
        .collect();

    for tier in [other, css, scripts, markup] {
        for asset in tier {
            let bytes = match asset.content.as_text() {
                Some(text) => rewrite_references(text, &resolved).into_bytes(),
                None => asset.content.as_bytes().to_vec(),
            };
            let url = store.create(bytes, mime_for_name(&asset.name));
            resolved.insert(&asset.name, url);
        }
    }

    resolved
}
