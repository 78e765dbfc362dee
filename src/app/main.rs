//! # Argus
//!
//! A command-line tool for tagging images with a pretrained classifier,
//! embedding the tags into each image's metadata, and searching the tagged
//! collection.

mod args;
mod core;

use anyhow::Result;
use args::{Args, Commands};
use clap::Parser;
use core::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse();

    match args.command {
        Commands::Process {
            path,
            tagged,
            threshold,
            character_threshold,
            exclude,
            model,
        } => {
            let config = AppConfig {
                model,
                source_dir: path.into(),
                tagged_dir: tagged.into(),
                general_threshold: threshold,
                character_threshold,
                exclude_tags: exclude,
            };
            let report = core::run_process(config).await?;
            println!(
                "Processed {} files, relocated {}. Total errors: {}",
                report.processed, report.relocated, report.total_errors
            );
        }
        Commands::Tag { path, tags } => match core::run_tag(&path, &tags) {
            Ok(canonical) => println!("Tags updated successfully: {}", canonical.display()),
            Err(e) => {
                eprintln!("Failed to update tags: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Index { tagged, db } => {
            let count = core::run_index(&tagged, &db)?;
            println!("Indexing complete: {} images", count);
        }
        Commands::Search { query, tagged } => {
            let results = core::run_search(&tagged, &query)?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::AllTags { db } => {
            let tags = core::run_all_tags(&db)?;
            for tag in tags {
                println!("{}", tag);
            }
        }
    }

    Ok(())
}
