//! `bananafit tryon`: run the whole workflow once from the command line.

use bananafit_config::AppConfig;
use bananafit_core::{ImageAsset, InlineImage, LocalFile};
use bananafit_workflow::{OperationOutcome, WorkflowCoordinator};
use std::path::PathBuf;
use tracing::info;

/// Where the garment comes from.
pub enum Garment {
    /// Preset id, http(s) URL, or file path.
    Source(String),
    /// Text description to generate from.
    Prompt(String),
}

pub async fn run(
    person: String,
    garment: Garment,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let coordinator = bananafit_gateway::build_coordinator(&config)?;

    println!("🍌 BananaFit Try-On");
    println!("   Model: {}", config.generation.model);

    let image = try_on(&coordinator, &person, &garment).await?;
    let path = out.unwrap_or_else(|| default_output(&image));
    tokio::fs::write(&path, image.decode()?).await?;

    println!("✅ Saved {}", path.display());
    Ok(())
}

enum Source {
    Asset(ImageAsset),
    File(PathBuf),
}

/// Preset ids win, then http(s) URLs; anything else is a file path.
fn resolve(value: &str, preset: Option<ImageAsset>) -> Source {
    if let Some(asset) = preset {
        Source::Asset(asset)
    } else if value.starts_with("http://") || value.starts_with("https://") {
        Source::Asset(ImageAsset::preset(value, value))
    } else {
        Source::File(PathBuf::from(value))
    }
}

fn default_output(image: &InlineImage) -> PathBuf {
    PathBuf::from(format!("banana-fit-result.{}", image.file_extension()))
}

fn expect_applied(step: &str, outcome: OperationOutcome) -> Result<(), String> {
    match outcome {
        OperationOutcome::Applied => Ok(()),
        OperationOutcome::Rejected => Err(format!("{step}: rejected by the workflow")),
        OperationOutcome::Failed(notice) => Err(format!("{} ({})", notice.message, notice.detail)),
    }
}

async fn try_on(
    coordinator: &WorkflowCoordinator,
    person: &str,
    garment: &Garment,
) -> Result<InlineImage, String> {
    let outcome = match resolve(person, coordinator.find_person(person)) {
        Source::Asset(asset) => coordinator.choose_person_from_catalog(&asset).await,
        Source::File(path) => coordinator.upload_person(&LocalFile::path(path)).await,
    };
    expect_applied("person", outcome)?;
    println!("   Person loaded");

    let outcome = match garment {
        Garment::Source(value) => match resolve(value, coordinator.find_clothing(value)) {
            Source::Asset(asset) => coordinator.choose_clothing(&asset).await,
            Source::File(path) => coordinator.upload_clothing(&LocalFile::path(path)).await,
        },
        Garment::Prompt(prompt) => {
            println!("   Generating garment...");
            coordinator.generate_clothing(prompt).await
        }
    };
    expect_applied("clothing", outcome)?;
    println!("   Clothing ready, composing...");

    expect_applied("try-on", coordinator.generate_result().await)?;
    let snapshot = coordinator.snapshot();
    info!(history = snapshot.history_len, "Try-on finished");
    snapshot
        .result
        .ok_or_else(|| "try-on finished without a result".to_string())
}
