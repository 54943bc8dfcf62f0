#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI tool for rendering the school safety map, exporting records, and
//! printing dashboard summaries.
//!
//! Run without a subcommand for an interactive menu.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use school_safety_generate::{
    DEFAULT_TOP, MapArgs, data_dir, export_records, generate_map, output_dir, summarize,
};

#[derive(Parser)]
#[command(name = "school_safety_generate", about = "School safety map generator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the interactive HTML map
    Map {
        /// Directory holding `<city>_<category>.json` files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Directory to write `all_cities_safety_map.html` into
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// TOML file merged over the built-in map settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write the merged records as JSON
    Export {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Only export this city (e.g. "Delhi"); "All" or omitted exports everything
        #[arg(long)]
        city: Option<String>,
    },
    /// Print city summaries, rankings, and distributions
    Summary {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Narrow the school-level sections to this city
        #[arg(long)]
        city: Option<String>,
        /// Rows in each ranking
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return school_safety_generate::interactive::run();
    };

    match command {
        Commands::Map {
            data_dir: data,
            output_dir: output,
            config,
        } => {
            let report = generate_map(&MapArgs {
                data_dir: data.unwrap_or_else(data_dir),
                output_dir: output.unwrap_or_else(output_dir),
                config,
            })?;
            println!(
                "Map written to {} ({} markers, {} warnings)",
                report.output_path.display(),
                report.marker_count,
                report.warnings.len()
            );
        }
        Commands::Export {
            data_dir: data,
            output_dir: output,
            city,
        } => {
            let path = export_records(
                &data.unwrap_or_else(data_dir),
                &output.unwrap_or_else(output_dir),
                city.as_deref(),
            )?;
            println!("Export written to {}", path.display());
        }
        Commands::Summary {
            data_dir: data,
            city,
            top,
        } => {
            print!(
                "{}",
                summarize(&data.unwrap_or_else(data_dir), city.as_deref(), top)?
            );
        }
    }

    Ok(())
}
