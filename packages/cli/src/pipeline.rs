//! Full pipeline orchestrator.
//!
//! Loads every city once, then runs the selected steps against that one
//! dataset: print the summary, render the map, write the JSON export.
//! Uses `indicatif` progress bars for the load and render steps.

use std::path::PathBuf;
use std::time::Instant;

use dialoguer::{Confirm, Input, MultiSelect};
use school_safety_analytics::export::write_export;
use school_safety_cli_utils::{IndicatifProgress, MultiProgress};
use school_safety_generate::config::MapConfig;
use school_safety_generate::map::render_map_with_progress;
use school_safety_generate::report::format_report;
use school_safety_generate::{DEFAULT_TOP, data_dir, output_dir};
use school_safety_source::load_all_cities_with_progress;

/// Steps available after loading.
enum PipelineStep {
    Summary,
    Map,
    Export,
}

impl PipelineStep {
    const ALL: &[Self] = &[Self::Summary, Self::Map, Self::Export];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Summary => "Print city summary",
            Self::Map => "Render safety map",
            Self::Export => "Export all records as JSON",
        }
    }
}

fn prompt_dir(prompt: &str, default: PathBuf) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .default(default.display().to_string())
        .interact_text()?;
    Ok(PathBuf::from(input.trim()))
}

/// Runs the full pipeline orchestrator.
///
/// The `multi` parameter is the shared [`MultiProgress`] that is also
/// registered with the log bridge, so all `log::info!` output is
/// automatically suspended while progress bars redraw.
///
/// # Errors
///
/// Returns an error if user prompts, loading, or any selected step fails.
/// A loader error stops the pipeline before any output is written.
pub fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline_start = Instant::now();

    // --- 1. Select steps ---
    let step_labels: Vec<&str> = PipelineStep::ALL.iter().map(PipelineStep::label).collect();
    let defaults = vec![true; PipelineStep::ALL.len()];

    let selected_steps = MultiSelect::new()
        .with_prompt("Pipeline steps (space=toggle, a=all, enter=confirm)")
        .items(&step_labels)
        .defaults(&defaults)
        .interact()?;

    if selected_steps.is_empty() {
        println!("No steps selected.");
        return Ok(());
    }

    let has = |step: fn(&PipelineStep) -> bool| {
        selected_steps.iter().any(|&i| step(&PipelineStep::ALL[i]))
    };
    let has_summary = has(|s| matches!(s, PipelineStep::Summary));
    let has_map = has(|s| matches!(s, PipelineStep::Map));
    let has_export = has(|s| matches!(s, PipelineStep::Export));

    // --- 2. Paths and options ---
    let data = prompt_dir("Data directory", data_dir())?;
    let output = if has_map || has_export {
        prompt_dir("Output directory", output_dir())?
    } else {
        output_dir()
    };

    let config = if has_map
        && Confirm::new()
            .with_prompt("Use a map config override file?")
            .default(false)
            .interact()?
    {
        let path: String = Input::new().with_prompt("Config path").interact_text()?;
        MapConfig::load(Some(PathBuf::from(path.trim()).as_path()))?
    } else {
        MapConfig::embedded()?
    };

    // --- 3. Load ---
    println!();
    let total_steps = selected_steps.len() + 1;
    let mut current_step = 1usize;

    let load_bar = IndicatifProgress::cities_bar(
        multi,
        &format!("[{current_step}/{total_steps}] Discovering city files"),
    );
    let dataset = load_all_cities_with_progress(&data, &load_bar)?;

    // --- 4. Summary ---
    if has_summary {
        current_step += 1;
        log::info!("[{current_step}/{total_steps}] Summary");
        multi.suspend(|| print!("{}", format_report(&dataset, None, DEFAULT_TOP)));
    }

    // --- 5. Map ---
    if has_map {
        current_step += 1;
        let render_bar = IndicatifProgress::stages_bar(
            multi,
            &format!("[{current_step}/{total_steps}] Rendering map"),
        );
        let report = render_map_with_progress(&dataset, &config, &output, &render_bar)?;
        if !report.warnings.is_empty() {
            log::warn!(
                "{} record(s) left off the map; see warnings above",
                report.warnings.len()
            );
        }
        if let Some(extent) = report.extent {
            log::info!(
                "Map extent: lat {:.4}..{:.4}, lon {:.4}..{:.4}",
                extent.min().y,
                extent.max().y,
                extent.min().x,
                extent.max().x
            );
        }
    }

    // --- 6. Export ---
    if has_export {
        current_step += 1;
        log::info!("[{current_step}/{total_steps}] Exporting records");
        write_export(&output, None, dataset.records())?;
    }

    log::info!(
        "Pipeline complete in {:.1}s",
        pipeline_start.elapsed().as_secs_f64()
    );
    Ok(())
}
