//! Interactive menu for the generate tool.
//!
//! Lets users pick an output and a city without memorizing CLI flags.
//! Paths default to the workspace `data/` and `data/generated/`
//! directories.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use school_safety_analytics_models::ALL_CITIES;
use school_safety_source::load_all_cities;

use crate::{DEFAULT_TOP, MapArgs, data_dir, export_records, generate_map, output_dir, summarize};

/// Actions offered by the menu.
enum GenerateAction {
    Map,
    Export,
    Summary,
}

impl GenerateAction {
    const ALL: &[Self] = &[Self::Map, Self::Export, Self::Summary];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Map => "Render safety map",
            Self::Export => "Export records as JSON",
            Self::Summary => "Print city summary",
        }
    }
}

/// Prompts for a directory, defaulting to `default`.
fn prompt_dir(prompt: &str, default: PathBuf) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .default(default.display().to_string())
        .interact_text()?;
    Ok(PathBuf::from(input.trim()))
}

/// Lists the loaded cities and lets the user pick one (or "All").
///
/// # Errors
///
/// Returns an error if the dataset cannot be loaded or input fails.
pub fn prompt_city(data: &std::path::Path) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let dataset = load_all_cities(data)?;
    let mut choices = vec![ALL_CITIES];
    choices.extend(dataset.cities());

    let idx = Select::new()
        .with_prompt("Which city?")
        .items(&choices)
        .default(0)
        .interact()?;

    Ok((idx > 0).then(|| choices[idx].to_string()))
}

/// Runs the interactive generation menu.
///
/// # Errors
///
/// Returns an error if user input or the selected step fails.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = GenerateAction::ALL.iter().map(GenerateAction::label).collect();

    let selection = Select::new()
        .with_prompt("What would you like to generate?")
        .items(&labels)
        .default(0)
        .interact()?;

    let data = prompt_dir("Data directory", data_dir())?;

    match GenerateAction::ALL[selection] {
        GenerateAction::Map => {
            let output = prompt_dir("Output directory", output_dir())?;
            let use_config = Confirm::new()
                .with_prompt("Use a map config override file?")
                .default(false)
                .interact()?;
            let config = if use_config {
                let path: String = Input::new().with_prompt("Config path").interact_text()?;
                Some(PathBuf::from(path.trim()))
            } else {
                None
            };

            let report = generate_map(&MapArgs {
                data_dir: data,
                output_dir: output,
                config,
            })?;
            println!(
                "Map written to {} ({} markers, {} warnings)",
                report.output_path.display(),
                report.marker_count,
                report.warnings.len()
            );
        }
        GenerateAction::Export => {
            let output = prompt_dir("Output directory", output_dir())?;
            let city = prompt_city(&data)?;
            let path = export_records(&data, &output, city.as_deref())?;
            println!("Export written to {}", path.display());
        }
        GenerateAction::Summary => {
            let city = prompt_city(&data)?;
            let top: usize = Input::new()
                .with_prompt("Rows per ranking")
                .default(DEFAULT_TOP)
                .interact_text()?;
            print!("{}", summarize(&data, city.as_deref(), top)?);
        }
    }

    Ok(())
}
