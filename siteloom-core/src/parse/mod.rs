//! Response parsing
//!
//! Turns raw accumulated model text into a reasoning string plus an ordered
//! set of named files. Designed to be called repeatedly on growing prefixes
//! of a streamed response: it never fails, and a marker that is still
//! incomplete in one snapshot simply matches on a later, more complete one.

pub mod response;

pub use response::parse_response;

/// One file extracted from a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path-like filename as declared in the response
    pub name: String,
    /// File content, trimmed of surrounding whitespace
    pub content: String,
}

/// Best-effort parse of a raw response: reasoning plus ordered files.
///
/// File names are unique; the first occurrence of a name wins and later
/// matches for the same name are discarded, regardless of which extraction
/// stage produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Extracted reasoning text (may be empty)
    pub reasoning: String,
    /// Files in discovery order
    pub files: Vec<GeneratedFile>,
}
