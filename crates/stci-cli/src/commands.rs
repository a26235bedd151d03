use crate::output;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use std::path::Path;
use stci_core::{
    CollectionPipeline, ConfigFileSource, FixtureSource, Indexer, IndexingPipeline, Methodology,
    OpenRouterSource, PriceSource, StorageBackend,
};

pub struct CollectOptions {
    pub date: NaiveDate,
    pub fixtures: bool,
    pub multi: bool,
    pub drift_threshold: f64,
    pub no_fallback: bool,
    pub dry_run: bool,
}

pub async fn collect(
    storage: &dyn StorageBackend,
    data_dir: &Path,
    options: CollectOptions,
) -> Result<()> {
    let pipeline = CollectionPipeline::new(storage, options.dry_run);

    let summary = if options.multi {
        let mut sources: Vec<Box<dyn PriceSource>> = vec![Box::new(OpenRouterSource::default())];
        sources.push(Box::new(ConfigFileSource::openai(data_dir)));
        sources.push(Box::new(ConfigFileSource::anthropic(data_dir)));
        sources.push(Box::new(ConfigFileSource::google(data_dir)));

        pipeline
            .run_multi(&sources, options.date, options.drift_threshold)
            .await
    } else {
        let fixture = FixtureSource::default_for(data_dir);
        if options.fixtures {
            pipeline.run_single(&fixture, None, options.date).await
        } else {
            let primary = OpenRouterSource::default();
            let fallback: Option<&dyn PriceSource> =
                if options.no_fallback { None } else { Some(&fixture) };
            pipeline.run_single(&primary, fallback, options.date).await
        }
    }
    .with_context(|| format!("collection failed for {}", options.date))?;

    output::print_collection_summary(&summary);
    Ok(())
}

pub fn index(
    storage: &dyn StorageBackend,
    methodology_path: &Path,
    date: NaiveDate,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let methodology = if methodology_path.exists() {
        Methodology::load(methodology_path)?
    } else {
        tracing::warn!(
            path = %methodology_path.display(),
            "methodology document not found, using defaults"
        );
        Methodology::default()
    };

    let pipeline = IndexingPipeline::new(storage, Indexer::new(methodology), dry_run);
    let (result, path) = pipeline
        .run(date)
        .with_context(|| format!("indexing failed for {date}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        output::print_index_output(&result, &path, dry_run);
    }
    Ok(())
}

pub fn latest(storage: &dyn StorageBackend, json: bool) -> Result<()> {
    match stci_core::load_latest_index(storage)? {
        Some(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output::print_index_output(&result, "latest", false);
            }
            Ok(())
        }
        None => {
            eprintln!("{}", "no computed index found".red());
            std::process::exit(1);
        }
    }
}
