//! stemsplit CLI entry point

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use stemsplit::config::{Cli, RunConfig};
use stemsplit::pipeline::{self, RunOutcome};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    // Validate inputs
    if let Err(e) = validate_inputs(&cli) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    // Resolve settings document + overrides
    let config = RunConfig::from_cli(&cli);

    match pipeline::run(&cli.input, &config) {
        Ok(RunOutcome::Succeeded {
            output_dir,
            metadata,
            stems,
            drum_parts,
        }) => {
            println!();
            println!("Track: {}", metadata);
            println!(
                "Summary: {} stems, {} drum parts written to {}",
                stems.len(),
                drum_parts.len(),
                output_dir.display()
            );
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Planned { files, .. }) => {
            println!("Would write {} files", files.len());
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Failed { reason }) => {
            eprintln!("Error: {}", reason);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = cli.log_level().to_string().to_lowercase();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn validate_inputs(cli: &Cli) -> Result<(), String> {
    if !cli.input.is_file() {
        return Err(format!(
            "Input file does not exist: {}\n\n  Tip: Check the path is correct and accessible.\n  Example:\n    stemsplit ~/Music/song.mp3 -o ./stems",
            cli.input.display()
        ));
    }

    if let Some(config) = &cli.config {
        if config.is_dir() {
            return Err(format!(
                "Config path is a directory: {}\n\n  Tip: Point --config at a YAML file, e.g. {}",
                config.display(),
                config.join("config.yaml").display()
            ));
        }
    }

    // The output directory is created automatically, but its parent must exist
    if let Some(output) = &cli.output {
        let parent = output.parent().map(PathBuf::from).unwrap_or_default();
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(format!(
                "Output parent directory does not exist: {}\n\n  Tip: Example: mkdir -p {}",
                parent.display(),
                parent.display()
            ));
        }
    }

    Ok(())
}
