//! Core domain types for siteloom
//!
//! These types model one studio workspace: projects that own assets,
//! generation versions, and plugins.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Project** | One website-in-progress; owns its assets, versions, and plugins exclusively |
//! | **Asset** | A named file in a project; `/` in the name denotes folder nesting |
//! | **Entry document** | The designated root file of a composed preview, conventionally `index.html` |
//! | **GenerationVersion** | One completed generation: prompt, raw response, and a full file snapshot |
//! | **Plugin** | User-authored style + script evaluated fresh inside every composed preview |
//! | **Snapshot** | A complete point-in-time copy of asset contents, never a delta |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================
// Assets
// ============================================

/// Kind of asset, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Markup documents (.html, .htm)
    Html,
    /// Stylesheets (.css)
    Css,
    /// Scripts (.js, .mjs)
    Script,
    /// Images (.png, .jpg, .jpeg, .svg, .gif, .webp)
    Image,
    /// Anything else, treated as plain text
    Text,
    /// Content-less path prefix for nesting; has no content
    Folder,
}

impl AssetKind {
    /// Infer the kind from an asset name's extension.
    pub fn from_name(name: &str) -> Self {
        match extension(name) {
            Some("html") | Some("htm") => AssetKind::Html,
            Some("css") => AssetKind::Css,
            Some("js") | Some("mjs") => AssetKind::Script,
            Some("png") | Some("jpg") | Some("jpeg") | Some("svg") | Some("gif")
            | Some("webp") => AssetKind::Image,
            _ => AssetKind::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Html => "html",
            AssetKind::Css => "css",
            AssetKind::Script => "script",
            AssetKind::Image => "image",
            AssetKind::Text => "text",
            AssetKind::Folder => "folder",
        }
    }
}

impl std::str::FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(AssetKind::Html),
            "css" => Ok(AssetKind::Css),
            "script" => Ok(AssetKind::Script),
            "image" => Ok(AssetKind::Image),
            "text" => Ok(AssetKind::Text),
            "folder" => Ok(AssetKind::Folder),
            _ => Err(format!("unknown asset kind: {}", s)),
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn extension(name: &str) -> Option<&str> {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => Some(ext),
        _ => None,
    }
}

/// MIME type for a named asset, as used when minting resolvable locations.
pub fn mime_for_name(name: &str) -> &'static str {
    match extension(name) {
        Some("js") | Some("mjs") => "application/javascript",
        Some("css") => "text/css",
        Some("html") | Some("htm") => "text/html",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "text/plain",
    }
}

/// Text or binary payload of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AssetContent {
    Text(String),
    Binary(Vec<u8>),
}

impl AssetContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AssetContent::Text(s) => s.as_bytes(),
            AssetContent::Binary(b) => b,
        }
    }

    /// Textual view of the content; `None` for binary payloads.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AssetContent::Text(s) => Some(s),
            AssetContent::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<String> for AssetContent {
    fn from(s: String) -> Self {
        AssetContent::Text(s)
    }
}

impl From<&str> for AssetContent {
    fn from(s: &str) -> Self {
        AssetContent::Text(s.to_string())
    }
}

/// A named file (or folder marker) within a project.
///
/// Names are unique within a project; `/` denotes folder nesting. A folder
/// asset carries no content and exists only as a path prefix for children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Path-like name, unique within the project
    pub name: String,
    /// Text or binary payload (empty for folders)
    pub content: AssetContent,
    /// Kind inferred from the extension, or `Folder`
    pub kind: AssetKind,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// Create a file asset, inferring the kind from the name.
    pub fn new(name: impl Into<String>, content: impl Into<AssetContent>) -> Self {
        let name = name.into();
        let kind = AssetKind::from_name(&name);
        Self {
            name,
            content: content.into(),
            kind,
            updated_at: Utc::now(),
        }
    }

    /// Create a folder marker asset.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: AssetContent::Text(String::new()),
            kind: AssetKind::Folder,
            updated_at: Utc::now(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == AssetKind::Folder
    }

    /// Derived size metric shown in asset lists (content length / 4, one
    /// decimal, `k` suffix).
    pub fn approximate_size(&self) -> String {
        crate::format::format_approx_size(self.content.len())
    }
}

// ============================================
// Generation versions
// ============================================

/// Per-version statistics shown alongside history entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionStats {
    /// Lines added relative to the previous entry document
    pub added_lines: usize,
    /// Lines removed relative to the previous entry document
    pub removed_lines: usize,
    /// Approximate tokens in the raw response (`ceil(chars / 4)`)
    pub approx_tokens: u64,
    /// Wall-clock generation time in seconds
    pub elapsed_secs: u64,
    /// Model that produced this version
    pub model: String,
}

/// One completed generation within a project.
///
/// `file_snapshot` is a full point-in-time copy of every non-folder asset's
/// content as of this version, so any past version can rebuild its own
/// complete preview independent of later edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationVersion {
    /// Monotonically increasing ordinal, starting at 1 per project
    pub ordinal: u32,
    /// The user prompt that triggered this generation
    pub prompt: String,
    /// Full streamed response text
    pub raw_response: String,
    /// Extracted reasoning, or a fallback summary
    pub reasoning_summary: String,
    /// Asset name -> content at this version (full copy, not a delta)
    pub file_snapshot: BTreeMap<String, AssetContent>,
    /// Asset names touched by this generation
    pub primary_files: Vec<String>,
    /// Display statistics
    pub stats: VersionStats,
    /// When this version was recorded
    pub created_at: DateTime<Utc>,
}

impl GenerationVersion {
    /// The entry document's content at this version, if present.
    pub fn entry_code(&self) -> Option<&str> {
        self.file_snapshot
            .get(ENTRY_DOCUMENT)
            .and_then(|c| c.as_text())
    }
}

/// Conventional name of the entry document.
pub const ENTRY_DOCUMENT: &str = "index.html";

// ============================================
// Plugins
// ============================================

/// Display metadata for a plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// User-authored plugin code, evaluated fresh in every composed preview.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginCode {
    /// Optional page-scoped style text
    #[serde(default)]
    pub style: Option<String>,
    /// Script text; evaluated as a factory yielding `{ hooks: {...} }`
    #[serde(default)]
    pub script: String,
}

/// A plugin owned by a project.
///
/// No state survives across compositions; every recomposition re-evaluates
/// enabled plugins from scratch inside the composed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plugin {
    pub id: String,
    pub enabled: bool,
    pub metadata: PluginMetadata,
    pub code: PluginCode,
}

impl Plugin {
    pub fn new(name: impl Into<String>, description: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            enabled: true,
            metadata: PluginMetadata {
                name: name.into(),
                description: description.into(),
            },
            code: PluginCode {
                style: None,
                script: script.into(),
            },
        }
    }
}

// ============================================
// Comments
// ============================================

/// A project-scoped comment, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

// ============================================
// Projects
// ============================================

/// Default project name before the first generation renames it.
pub const UNTITLED_PROJECT: &str = "Untitled Project";

/// One website-in-progress.
///
/// A project exclusively owns its assets (current live state), versions
/// (append-only history), and plugins. Exactly one project is active at a
/// time in a [`Studio`](crate::studio::Studio).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub assets: Vec<Asset>,
    pub versions: Vec<GenerationVersion>,
    /// Index into `versions` of the currently displayed version
    pub current_version: Option<usize>,
    pub plugins: Vec<Plugin>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create an empty project seeded with a blank entry document.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            assets: vec![Asset::new(ENTRY_DOCUMENT, "<!-- Initial Index -->")],
            versions: Vec::new(),
            current_version: None,
            plugins: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }

    pub fn asset_mut(&mut self, name: &str) -> Option<&mut Asset> {
        self.assets.iter_mut().find(|a| a.name == name)
    }

    /// Next version ordinal (1 for the first generation).
    pub fn next_ordinal(&self) -> u32 {
        self.versions.iter().map(|v| v.ordinal).max().unwrap_or(0) + 1
    }

    /// Enabled plugins, in array order.
    pub fn enabled_plugins(&self) -> Vec<&Plugin> {
        self.plugins.iter().filter(|p| p.enabled).collect()
    }
}
