//! Terminal rendering for run summaries and index output.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Table};
use stci_core::{CollectionSummary, DailyIndexOutput};

pub fn print_collection_summary(summary: &CollectionSummary) {
    println!("{}", "=== Collection Complete ===".bold());
    if summary.dry_run {
        println!("{}", "(dry run - nothing written)".yellow());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["source", "observations"]);
    for (source, count) in &summary.source_counts {
        let count_cell = if *count == 0 {
            Cell::new("FAILED/empty")
        } else {
            Cell::new(count)
        };
        table.add_row(vec![Cell::new(source), count_cell]);
    }
    println!("{table}");

    println!("Date:            {}", summary.date);
    println!("Total fetched:   {}", summary.total_fetched);
    println!("After dedup:     {}", summary.after_dedup);
    println!("Valid stored:    {}", summary.valid);
    println!("Invalid dropped: {}", summary.invalid);
    println!("Observations:    {}", summary.observations_path);
    for raw in &summary.raw_paths {
        println!("Raw archive:     {raw}");
    }

    if summary.drift_warnings.is_empty() {
        println!("{}", "No significant drift detected".green());
    } else {
        println!(
            "{}",
            format!("{} drift warning(s):", summary.drift_warnings.len()).yellow()
        );
        for warning in summary.drift_warnings.iter().take(5) {
            println!("  {} {warning}", "DRIFT:".yellow());
        }
        if summary.drift_warnings.len() > 5 {
            println!("  ... and {} more", summary.drift_warnings.len() - 5);
        }
    }
}

pub fn print_index_output(output: &DailyIndexOutput, path: &str, dry_run: bool) {
    println!("{}", format!("=== STCI {} ===", output.date).bold());
    if dry_run {
        println!("{}", "(dry run - nothing written)".yellow());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        "index",
        "input $/1M",
        "output $/1M",
        "blended $/1M",
        "models",
        "dispersion",
    ]);
    for (name, index) in &output.indices {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.2}", index.input_rate)),
            Cell::new(format!("{:.2}", index.output_rate)),
            Cell::new(format!("{:.2}", index.blended_rate)),
            Cell::new(index.model_count),
            Cell::new(
                index
                    .dispersion
                    .map(|d| format!("{d:.2}"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    println!("{table}");

    println!("Methodology:       v{}", output.methodology_version);
    println!("Observations:      {}", output.observation_count);
    println!("Verification hash: {}", output.verification_hash);
    println!("Output:            {path}");
}
