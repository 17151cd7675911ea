use crate::analyzers::CorrelationAnalyzer;
use crate::cli::args::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{RawObservations, RawTable};
use crate::processors::{IntegrityChecker, SeriesPipeline, PIPELINE_STAGES};
use crate::readers::ObservationReader;
use crate::utils::filename::generate_default_parquet_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn, Level};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Process {
            input,
            output_file,
            config,
            compression,
            delimiter,
            mmap,
            fine_interval,
            coarse_interval,
            max_workers,
            validate_only,
            correlations,
        } => {
            let mut settings = PipelineConfig::load(config.as_deref())?;
            if let Some(minutes) = fine_interval {
                settings = settings.with_fine_interval_minutes(minutes);
            }
            if let Some(minutes) = coarse_interval {
                settings = settings.with_coarse_interval_minutes(minutes);
            }
            if let Some(workers) = max_workers {
                settings = settings.with_max_workers(workers);
            }
            settings.validate_config()?;

            let output_file = output_file
                .unwrap_or_else(|| generate_default_parquet_filename(settings.coarse_interval_minutes));

            println!("Processing station log...");
            println!("Input file: {}", input.display());
            println!("Output file: {}", output_file.display());
            println!(
                "Grid: {} min, Bins: {} min, Workers: {}",
                settings.fine_interval_minutes, settings.coarse_interval_minutes, settings.max_workers
            );

            let table = read_table(&input, &settings, delimiter, mmap)?;
            let pipeline = SeriesPipeline::new(settings)?;

            let progress = ProgressReporter::new_stages(PIPELINE_STAGES, "Processing data...", false);
            let output = tokio::task::spawn_blocking(move || {
                let result = pipeline.run_table(&table, Some(&progress));
                if let Ok(output) = &result {
                    progress.finish_with_message(&format!(
                        "Aggregated {} rows into {} bins",
                        output.enriched.len(),
                        output.aggregated.len()
                    ));
                }
                result
            })
            .await??;

            let checker = IntegrityChecker::new();
            println!("\n{}", checker.generate_summary(&output.integrity));

            if correlations {
                let matrix = CorrelationAnalyzer::new().analyze(&output.aggregated)?;
                println!("\n{}", matrix.summary());
            }

            if validate_only {
                println!("Validation complete - no output file written");
                return Ok(());
            }

            println!(
                "Writing {} rows to Parquet file...",
                output.aggregated.len()
            );
            let writer = ParquetWriter::new().with_compression(&compression)?;

            if let Some(parent) = output_file.parent() {
                std::fs::create_dir_all(parent)?;
            }

            writer.write_series(&output.aggregated, &output_file)?;

            let file_info = writer.get_file_info(&output_file)?;
            println!("\n{}", file_info.summary());

            println!("Processing complete!");
        }

        Commands::Validate {
            input,
            config,
            delimiter,
        } => {
            let settings = PipelineConfig::load(config.as_deref())?;

            println!("Validating station log...");
            println!("Input file: {}", input.display());

            let table = read_table(&input, &settings, delimiter, false)?;
            let pipeline = SeriesPipeline::new(settings)?;

            let progress = ProgressReporter::new_spinner("Reconciling onto grid...", false);
            let report = tokio::task::spawn_blocking(move || {
                let raw = RawObservations::parse(&table)?;
                let reconciled = pipeline.reconcile(&raw)?;
                progress.finish_with_message("Validation complete");
                IntegrityChecker::new().check_integrity(&reconciled)
            })
            .await??;

            let checker = IntegrityChecker::new();
            println!("\n{}", checker.generate_summary(&report));

            let unusable = report.unusable_fields();
            if unusable.is_empty() {
                println!("✅ Every field has data to interpolate from");
            } else {
                println!(
                    "⚠️  {} field(s) have no observations and will stop processing",
                    unusable.len()
                );
            }
        }

        Commands::Info { file } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;

            println!("\nFile Details:");
            println!("{}", file_info.summary());
        }
    }

    Ok(())
}

fn read_table(
    input: &Path,
    settings: &PipelineConfig,
    delimiter: char,
    mmap: bool,
) -> Result<RawTable> {
    if !delimiter.is_ascii() {
        return Err(ProcessingError::Config(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            delimiter
        )));
    }

    ObservationReader::new()
        .with_timestamp_format(&settings.timestamp_format)
        .with_delimiter(delimiter as u8)
        .with_mmap(mmap)
        .read_path(input)
}

/// `--verbose` raises the level to DEBUG; `--log-file` sends output to a file instead
/// of stderr.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if let Err(e) = installed {
        warn!("Logging already initialised: {}", e);
    } else {
        debug!(verbose, "Logging initialised");
    }
    Ok(())
}
