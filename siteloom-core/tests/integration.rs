//! Integration tests for the siteloom generation pipeline
//!
//! These cover the end-to-end scenarios the components must agree on:
//! parsing a full raw response into versioned assets, resolving and
//! composing a multi-asset preview, and persisting projects across
//! database connections.

use std::collections::BTreeMap;

use chrono::Utc;
use siteloom_core::db::Database;
use siteloom_core::parse::parse_response;
use siteloom_core::preview::PreviewComposer;
use siteloom_core::studio::Studio;
use siteloom_core::types::{
    Asset, AssetContent, GenerationVersion, Plugin, VersionStats, ENTRY_DOCUMENT,
};
use tempfile::TempDir;

fn version_from_response(ordinal: u32, prompt: &str, raw: &str) -> GenerationVersion {
    siteloom_core::logging::init_test();
    let parsed = parse_response(raw);
    let mut snapshot = BTreeMap::new();
    for file in &parsed.files {
        snapshot.insert(file.name.clone(), AssetContent::Text(file.content.clone()));
    }
    GenerationVersion {
        ordinal,
        prompt: prompt.to_string(),
        raw_response: raw.to_string(),
        reasoning_summary: parsed.reasoning.clone(),
        file_snapshot: snapshot,
        primary_files: parsed.files.iter().map(|f| f.name.clone()).collect(),
        stats: VersionStats::default(),
        created_at: Utc::now(),
    }
}

// ============================================
// Parse -> version -> assets
// ============================================

#[test]
fn test_red_button_scenario() {
    let raw = r#"[FILENAME]index.html[/FILENAME]<button style="color:red">Click</button>"#;
    let parsed = parse_response(raw);

    assert_eq!(parsed.files.len(), 1);
    assert_eq!(parsed.files[0].name, "index.html");
    assert_eq!(
        parsed.files[0].content,
        r#"<button style="color:red">Click</button>"#
    );

    let mut studio = Studio::new();
    studio.add_version(version_from_response(
        studio.active_project().next_ordinal(),
        "build a red button",
        raw,
    ));
    for file in &parse_response(raw).files {
        studio.update_asset(&file.name, file.content.as_str());
    }

    let project = studio.active_project();
    assert_eq!(project.versions.len(), 1);
    assert_eq!(project.versions[0].ordinal, 1);
    assert_eq!(
        project.asset(ENTRY_DOCUMENT).unwrap().content.as_text(),
        Some(r#"<button style="color:red">Click</button>"#)
    );
}

#[test]
fn test_ordinal_is_previous_max_plus_one() {
    let mut studio = Studio::new();
    for prompt in ["first", "second", "third"] {
        let ordinal = studio.active_project().next_ordinal();
        studio.add_version(version_from_response(
            ordinal,
            prompt,
            "[FILENAME]index.html[/FILENAME]<p>x</p>",
        ));
    }
    let ordinals: Vec<u32> = studio
        .active_project()
        .versions
        .iter()
        .map(|v| v.ordinal)
        .collect();
    assert_eq!(ordinals, vec![1, 2, 3]);

    // Deleting the middle version does not reuse ordinals
    studio.delete_version(2).unwrap();
    assert_eq!(studio.active_project().next_ordinal(), 4);
}

#[test]
fn test_multi_file_response_updates_all_assets() {
    let raw = "\
[REASONING]Split markup and style.[/REASONING]\n\
[FILENAME]index.html[/FILENAME]\n<link href=\"style.css\">\n\
[FILENAME]style.css[/FILENAME]\nbody{color:red}\n";
    let parsed = parse_response(raw);
    assert_eq!(parsed.reasoning, "Split markup and style.");
    assert_eq!(parsed.files.len(), 2);

    let mut studio = Studio::new();
    for file in &parsed.files {
        studio.update_asset(&file.name, file.content.as_str());
    }
    assert!(studio.active_project().asset("style.css").is_some());
}

// ============================================
// Resolution and composition
// ============================================

#[test]
fn test_stylesheet_and_image_resolution() {
    let mut composer = PreviewComposer::new();
    let mut logo = Asset::new("logo.png", "");
    logo.content = AssetContent::Binary(vec![0x89, 0x50, 0x4e, 0x47]);
    let assets = vec![
        Asset::new(
            "index.html",
            "<html><head><link href=\"style.css\"></head></html>",
        ),
        Asset::new("style.css", "body{background:url(logo.png)}"),
        logo,
    ];

    let composition = composer.compose(&assets, None, &[]).unwrap();

    let css_url = composition.asset_locations.location("style.css").unwrap();
    let png_url = composition
        .asset_locations
        .location("logo.png")
        .unwrap()
        .to_string();

    let css = composer.blob(css_url).unwrap();
    let css_text = String::from_utf8(css.content.clone()).unwrap();
    assert!(!css_text.contains("logo.png"));
    assert!(css_text.contains(&png_url));
}

#[test]
fn test_recompose_does_not_leak_locations() {
    let mut composer = PreviewComposer::new();
    let assets = vec![
        Asset::new("index.html", "<html></html>"),
        Asset::new("style.css", "body{}"),
    ];

    let first = composer.compose(&assets, None, &[]).unwrap();
    let second = composer.compose(&assets, None, &[]).unwrap();

    assert!(composer.blob(&first.entry_location).is_none());
    for (_, url) in first.asset_locations.iter() {
        assert!(composer.blob(url).is_none());
    }
    assert!(composer.blob(&second.entry_location).is_some());
}

#[test]
fn test_composed_document_carries_plugin_host() {
    let mut composer = PreviewComposer::new();
    let assets = vec![Asset::new("index.html", "<html><head></head></html>")];
    let plugin = Plugin::new("sparkle", "adds sparkles", "var plugin = {};");

    let composition = composer.compose(&assets, None, &[&plugin]).unwrap();
    let html = String::from_utf8(
        composer
            .blob(&composition.entry_location)
            .unwrap()
            .content
            .clone(),
    )
    .unwrap();

    assert!(html.contains("sparkle"));
    assert!(html.contains("requestAnimationFrame"));
    assert!(html.contains("preview-error"));
    assert!(html.contains("instance.hooks.onRender"));
}

// ============================================
// Persistence across connections
// ============================================

#[test]
fn test_project_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("studio.db");

    {
        let db = Database::open(&db_path).unwrap();
        db.migrate().unwrap();
        let mut studio = Studio::with_database(db).unwrap();
        studio.add_version(version_from_response(
            1,
            "a tiny landing page for a bakery",
            "[FILENAME]index.html[/FILENAME]<h1>Bread</h1>",
        ));
        studio.update_asset(ENTRY_DOCUMENT, "<h1>Bread</h1>");
        studio.add_comment("sam", "warmer colors please").unwrap();
    }

    let db = Database::open(&db_path).unwrap();
    db.migrate().unwrap();
    let studio = Studio::with_database(db).unwrap();

    let project = studio.active_project();
    assert_eq!(project.name, "a tiny landing page for a bake...");
    assert_eq!(project.versions.len(), 1);
    assert_eq!(project.versions[0].entry_code(), Some("<h1>Bread</h1>"));
    assert_eq!(project.current_version, Some(0));
    assert_eq!(
        project.asset(ENTRY_DOCUMENT).unwrap().content.as_text(),
        Some("<h1>Bread</h1>")
    );
    assert_eq!(project.comments.len(), 1);
    assert_eq!(project.comments[0].text, "warmer colors please");
}

#[test]
fn test_rollback_after_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("studio.db");

    {
        let db = Database::open(&db_path).unwrap();
        db.migrate().unwrap();
        let mut studio = Studio::with_database(db).unwrap();
        studio.add_version(version_from_response(
            1,
            "v1",
            "[FILENAME]index.html[/FILENAME]<p>one</p>",
        ));
        studio.update_asset(ENTRY_DOCUMENT, "<p>one</p>");
        studio.add_version(version_from_response(
            2,
            "v2",
            "[FILENAME]index.html[/FILENAME]<p>two</p>",
        ));
        studio.update_asset(ENTRY_DOCUMENT, "<p>two</p>");
    }

    let db = Database::open(&db_path).unwrap();
    db.migrate().unwrap();
    let mut studio = Studio::with_database(db).unwrap();

    studio.select_version(1).unwrap();
    assert_eq!(
        studio
            .active_project()
            .asset(ENTRY_DOCUMENT)
            .unwrap()
            .content
            .as_text(),
        Some("<p>one</p>")
    );
}
