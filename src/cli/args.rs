use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "irradiance-processor")]
#[command(about = "Reconstructs and enriches weather station irradiance series")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconstruct, enrich and aggregate a raw station log
    Process {
        #[arg(short, long, help = "Input CSV export of the station log")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/irradiance-{N}min-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, help = "Configuration file (TOML, JSON or YAML)")]
        config: Option<PathBuf>,

        #[arg(short, long, default_value = "snappy")]
        compression: String,

        #[arg(long, help = "CSV delimiter", default_value = ",")]
        delimiter: char,

        #[arg(long, help = "Read the input through a memory map")]
        mmap: bool,

        #[arg(long, help = "Fine grid interval in minutes")]
        fine_interval: Option<i64>,

        #[arg(long, help = "Aggregation bin width in minutes")]
        coarse_interval: Option<i64>,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long, default_value = "false")]
        validate_only: bool,

        #[arg(long, help = "Print the Spearman correlation matrix")]
        correlations: bool,
    },

    /// Report grid coverage and gaps without writing output
    Validate {
        #[arg(short, long, help = "Input CSV export of the station log")]
        input: PathBuf,

        #[arg(long, help = "Configuration file (TOML, JSON or YAML)")]
        config: Option<PathBuf>,

        #[arg(long, help = "CSV delimiter", default_value = ",")]
        delimiter: char,
    },

    /// Display information about a Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,
    },
}
