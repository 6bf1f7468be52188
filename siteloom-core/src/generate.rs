//! Generation pipeline
//!
//! Orchestrates one prompt round trip: claim the project's generation
//! guard, stream the backend response, re-parse every accumulated snapshot
//! to surface live reasoning, then parse the final text into files, record
//! a version with real diff stats, and apply the files to the live assets.
//!
//! A transport failure records no version; snapshots already surfaced
//! through the reasoning callback are the caller's to keep or discard.
//! The guard is released on every exit path.

use std::time::Instant;

use crate::backend::BackendClient;
use crate::diff::count_line_changes;
use crate::error::Result;
use crate::format::approx_tokens;
use crate::parse::parse_response;
use crate::studio::Studio;
use crate::types::{GenerationVersion, VersionStats, ENTRY_DOCUMENT};

/// Summary fallback when the response carried no reasoning block.
const DEFAULT_SUMMARY: &str = "Updated files based on prompt.";

/// What one completed generation produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Ordinal of the recorded version
    pub ordinal: u32,
    /// Names of the files the response contained
    pub files: Vec<String>,
    /// Final reasoning summary
    pub summary: String,
}

/// Run one generation against the active project.
///
/// `on_reasoning` is invoked with the freshest extracted reasoning each time
/// a snapshot arrives that contains any; it drives live "thinking" feedback.
pub async fn run_generation(
    studio: &mut Studio,
    client: &BackendClient,
    prompt: &str,
    mut on_reasoning: impl FnMut(&str),
) -> Result<GenerationOutcome> {
    studio.begin_generation()?;
    let result = generate_inner(studio, client, prompt, &mut on_reasoning).await;
    studio.finish_generation();
    result
}

async fn generate_inner(
    studio: &mut Studio,
    client: &BackendClient,
    prompt: &str,
    on_reasoning: &mut impl FnMut(&str),
) -> Result<GenerationOutcome> {
    let started = Instant::now();
    tracing::info!(prompt_len = prompt.len(), "Starting generation");
    studio.clear_preview_error();

    let mut stream = client
        .start_generation(prompt, &studio.active_project().versions)
        .await?;

    let mut raw = String::new();
    while let Some(snapshot) = stream.next_snapshot().await {
        raw = snapshot?;
        let parsed = parse_response(&raw);
        if !parsed.reasoning.is_empty() {
            on_reasoning(&parsed.reasoning);
        }
    }

    let parsed = parse_response(&raw);
    let elapsed_secs = started.elapsed().as_secs();

    let previous_entry = studio
        .active_project()
        .current_version
        .and_then(|i| studio.active_project().versions.get(i))
        .and_then(|v| v.entry_code())
        .unwrap_or("")
        .to_string();

    // Full point-in-time copy of the live assets, overlaid with what this
    // generation produced
    let mut file_snapshot = studio.snapshot_assets();
    for file in &parsed.files {
        file_snapshot.insert(file.name.clone(), file.content.clone().into());
    }

    let new_entry = file_snapshot
        .get(ENTRY_DOCUMENT)
        .and_then(|c| c.as_text())
        .unwrap_or("");
    let (added_lines, removed_lines) = count_line_changes(&previous_entry, new_entry);

    let summary = if parsed.reasoning.is_empty() {
        DEFAULT_SUMMARY.to_string()
    } else {
        parsed.reasoning.clone()
    };

    let ordinal = studio.active_project().next_ordinal();
    let version = GenerationVersion {
        ordinal,
        prompt: prompt.to_string(),
        raw_response: raw.clone(),
        reasoning_summary: summary.clone(),
        file_snapshot,
        primary_files: parsed.files.iter().map(|f| f.name.clone()).collect(),
        stats: VersionStats {
            added_lines: added_lines as usize,
            removed_lines: removed_lines as usize,
            approx_tokens: approx_tokens(&raw),
            elapsed_secs,
            model: client.model().to_string(),
        },
        created_at: chrono::Utc::now(),
    };

    if parsed.files.is_empty() {
        // Nothing attributable to any file; still recorded, as a no-op
        tracing::warn!(ordinal, "Generation produced no files");
    }

    studio.add_version(version);
    for file in &parsed.files {
        studio.update_asset(&file.name, file.content.as_str());
    }

    tracing::info!(
        ordinal,
        files = parsed.files.len(),
        elapsed_secs,
        "Generation complete"
    );

    Ok(GenerationOutcome {
        ordinal,
        files: parsed.files.iter().map(|f| f.name.clone()).collect(),
        summary,
    })
}
