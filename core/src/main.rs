use clap::Parser;
use log::{error, info};
use sarcopipe_core::cli::{Cli, Command, OutputFormat};
use sarcopipe_core::convert::Converter;
use sarcopipe_core::retention::enforce_patient_limit;
use sarcopipe_core::sarcopenia::{calculate_sarcopenia, REPORT_FILE};
use sarcopipe_core::{
    run_pipeline, select_volume, AssessmentReport, LogSink, PatientDetails, PipelineConfig,
    Segmenter, Selection, SelectionReport, SelectorConfig,
};
use std::process;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

fn run(command: Command) -> sarcopipe_core::Result<()> {
    let mut sink = LogSink;

    match command {
        Command::Select {
            directory,
            id,
            marker,
            format,
        } => {
            if !directory.is_dir() {
                return Err(format!("{} is not a directory", directory.display()).into());
            }
            info!("Processing directory: {}", directory.display());

            let config = SelectorConfig::default().with_marker(marker);
            let selection = select_volume(&directory, id.as_deref(), &config, &mut sink)?;
            output_selection(selection.as_ref(), format)?;
        }
        Command::Convert {
            input,
            output_base,
            id,
        } => {
            let selection =
                Converter::from_env().convert(&input, &output_base, id.as_deref(), &mut sink)?;
            println!("{}", SelectionReport::new(selection.as_ref()));
        }
        Command::Evaluate {
            patient_dir,
            output,
        } => {
            let output = output.unwrap_or_else(|| patient_dir.join(REPORT_FILE));
            let assessment = calculate_sarcopenia(&patient_dir, &output, &mut sink)?;
            println!("{}", AssessmentReport::new(&assessment));
        }
        Command::Run {
            input,
            name,
            age,
            weight,
            gender,
            height,
            results_dir,
            keep,
            segmenter_cwd,
        } => {
            let details = PatientDetails {
                name,
                age,
                weight,
                gender,
                height,
            };
            let mut segmenter = Segmenter::from_env();
            if let Some(dir) = segmenter_cwd {
                segmenter = segmenter.with_working_dir(dir);
            }
            let config = PipelineConfig::default()
                .with_results_dir(results_dir)
                .with_max_patients(keep)
                .with_segmenter(segmenter);

            let outcome = run_pipeline(&input, &details, &config, &mut sink)?;
            println!("{}", SelectionReport::new(outcome.selection.as_ref()));
            match &outcome.assessment {
                Some(assessment) => println!("{}", AssessmentReport::new(assessment)),
                None => println!("No assessment produced for {}", outcome.patient_dir.display()),
            }
        }
        Command::Prune { results_dir, keep } => {
            let removed = enforce_patient_limit(&results_dir, keep, &mut sink)?;
            for folder in removed {
                println!("{}", folder.display());
            }
        }
    }

    Ok(())
}

fn output_selection(
    selection: Option<&Selection>,
    format: OutputFormat,
) -> sarcopipe_core::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", SelectionReport::new(selection));
        }
        OutputFormat::Paths => {
            if let Some(selection) = selection {
                println!("{}", selection.path.display());
            }
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                let json = serde_json::to_string_pretty(&selection).map_err(|e| {
                    sarcopipe_core::SarcopipeError::InvalidValue(format!(
                        "Failed to serialize to JSON: {}",
                        e
                    ))
                })?;
                println!("{}", json);
            }
            #[cfg(not(feature = "json"))]
            {
                let _ = selection;
                return Err("JSON output requires the 'json' feature \
                            (rebuild with: cargo build --features json)"
                    .into());
            }
        }
    }
    Ok(())
}
