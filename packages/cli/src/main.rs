#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive CLI orchestrator for the school safety toolchain.
//!
//! Provides a single entry point that runs the whole load, summarize,
//! render, export flow, or hands off to the generate tool's own menu for a
//! single step.
//!
//! Uses `indicatif-log-bridge` (via [`school_safety_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod pipeline;

use dialoguer::Select;

/// Top-level tool selection.
enum Tool {
    RunPipeline,
    Generate,
}

impl Tool {
    const ALL: &[Self] = &[Self::RunPipeline, Self::Generate];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::RunPipeline => "Run full pipeline",
            Self::Generate => "Run a single step",
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = school_safety_cli_utils::init_logger();

    println!("School Safety Map Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::RunPipeline => pipeline::run(&multi)?,
        Tool::Generate => school_safety_generate::interactive::run()?,
    }

    Ok(())
}
