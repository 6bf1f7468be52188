//! siteloom - prompt-to-website generation studio
//!
//! CLI front end over siteloom-core: run generations, browse and roll back
//! version history, manage assets, and export a standalone copy of a site.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/siteloom/studio.db
//! - Logs: $XDG_STATE_HOME/siteloom/siteloom.log
//! - Config: $XDG_CONFIG_HOME/siteloom/config.toml

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use siteloom_core::format::{format_elapsed, format_relative_time, format_tokens};
use siteloom_core::preview::PreviewComposer;
use siteloom_core::{BackendClient, Config, Database, Studio};

#[derive(Parser)]
#[command(name = "siteloom")]
#[command(about = "Prompt-to-website generation studio")]
#[command(version)]
struct Args {
    /// Operate on this project instead of the first created one
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one generation against the active project
    Generate {
        /// Natural-language instructions for the site
        prompt: String,
    },
    /// Generate a fix for a preview error
    Fix {
        /// Error message from the preview; defaults to the last one recorded
        message: Option<String>,
    },
    /// List projects
    Projects,
    /// Create a new project and make it active
    New {
        /// Project name
        name: String,
    },
    /// Show the active project's version history
    Versions,
    /// Roll the live assets back to a version's snapshot
    Rollback {
        /// Version ordinal (as shown by `versions`)
        ordinal: u32,
    },
    /// List the active project's assets
    Assets,
    /// Write a standalone copy of the site to a directory
    Export {
        /// Output directory
        dir: PathBuf,
    },
    /// Post a comment on the active project
    Comment {
        /// Comment text
        text: String,
        /// Author handle
        #[arg(long, default_value = "anonymous")]
        author: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        siteloom_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("siteloom starting");

    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let mut studio = Studio::with_database(db).context("failed to load projects")?;
    if let Some(id) = &args.project {
        studio
            .switch_project(id)
            .with_context(|| format!("no project with id {}", id))?;
    }

    match args.command {
        Command::Generate { prompt } => generate(&mut studio, config, &prompt).await,
        Command::Fix { message } => {
            let message = match message.or_else(|| studio.last_preview_error().map(str::to_string))
            {
                Some(message) => message,
                None => anyhow::bail!("no preview error recorded; pass the error message"),
            };
            let prompt = siteloom_core::preview::fix_prompt(&message);
            generate(&mut studio, config, &prompt).await
        }
        Command::Projects => {
            for project in studio.projects() {
                println!(
                    "{}  {}  ({} versions, updated {})",
                    project.id,
                    project.name,
                    project.versions.len(),
                    format_relative_time(project.updated_at)
                );
            }
            Ok(())
        }
        Command::New { name } => {
            let project = studio.create_project(name);
            println!("Created project {} ({})", project.name, project.id);
            Ok(())
        }
        Command::Versions => {
            let project = studio.active_project();
            if project.versions.is_empty() {
                println!("No versions yet - run `siteloom generate \"...\"` first");
                return Ok(());
            }
            for (index, version) in project.versions.iter().enumerate() {
                let marker = if project.current_version == Some(index) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} v{:<3} +{} -{}  {}  {}  {}  \"{}\"",
                    marker,
                    version.ordinal,
                    version.stats.added_lines,
                    version.stats.removed_lines,
                    format_tokens(version.stats.approx_tokens),
                    format_elapsed(version.stats.elapsed_secs),
                    format_relative_time(version.created_at),
                    version.prompt
                );
            }
            Ok(())
        }
        Command::Rollback { ordinal } => {
            studio.select_version(ordinal)?;
            println!("Rolled back to v{}", ordinal);
            Ok(())
        }
        Command::Assets => {
            for asset in &studio.active_project().assets {
                if asset.is_folder() {
                    println!("{}/", asset.name);
                } else {
                    println!("{}  {}  {}", asset.name, asset.kind, asset.approximate_size());
                }
            }
            Ok(())
        }
        Command::Export { dir } => {
            let composer = PreviewComposer::new();
            let project = studio.active_project();
            composer.export_to_dir(&dir, &project.assets, &project.enabled_plugins())?;
            println!("Exported {} to {}", project.name, dir.display());
            Ok(())
        }
        Command::Comment { text, author } => {
            let comment = studio
                .add_comment(&author, &text)
                .context("failed to post comment")?;
            println!("Posted comment {}", comment.id);
            Ok(())
        }
    }
}

async fn generate(studio: &mut Studio, config: Config, prompt: &str) -> Result<()> {
    config
        .backend
        .validate()
        .context("backend configuration is incomplete")?;
    let client = BackendClient::new(config.backend).context("failed to create backend client")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {wide_msg}")
            .expect("valid template"),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner.set_message("Thinking...");

    let outcome = siteloom_core::run_generation(studio, &client, prompt, |reasoning| {
        // Show the freshest line of reasoning while the stream runs
        if let Some(line) = reasoning.lines().rev().find(|l| !l.trim().is_empty()) {
            spinner.set_message(line.trim().to_string());
        }
    })
    .await?;

    spinner.finish_and_clear();

    println!("v{}  {}", outcome.ordinal, outcome.summary);
    if outcome.files.is_empty() {
        println!("(no files in response - recorded as a no-op version)");
    } else {
        for name in &outcome.files {
            println!("  updated {}", name);
        }
    }
    Ok(())
}
