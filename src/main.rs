use anyhow::{anyhow, bail, Context};
use clap::Parser;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::debug;

use evproc::logging::init_logging;
use evproc::{
    DefaultProcedureFactory, ErrorStrategy, EventPipeline, InputFormat, PipelineConfig,
    ProcedureFactory, Resolved,
};

#[derive(Parser)]
#[command(name = "evproc")]
#[command(about = "Run event procedures (count, describe, exclude, output, ...) over a line stream")]
#[command(version)]
struct Args {
    /// Input format
    #[arg(short = 'f', long = "input-format", value_enum, default_value = "line")]
    input_format: InputFormat,

    /// Input file (default: stdin)
    #[arg(short = 'i', long = "input")]
    input_file: Option<PathBuf>,

    /// Fail on first error instead of skipping lines
    #[arg(long)]
    fail_fast: bool,

    /// Debug mode - log processing details to stderr
    #[arg(long)]
    debug: bool,

    /// Maximum line length
    #[arg(long, default_value = "1048576")] // 1MB
    max_line_length: usize,

    /// Buffer size for I/O
    #[arg(long, default_value = "65536")] // 64KB
    buffer_size: usize,

    /// Procedure label; `evproc help` lists them
    #[arg(value_name = "PROCEDURE", allow_hyphen_values = true)]
    procedure: String,

    /// Procedure arguments, e.g. `-o name,level` for output
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    arguments: Vec<String>,
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = PipelineConfig {
        error_strategy: if args.fail_fast {
            ErrorStrategy::FailFast
        } else {
            ErrorStrategy::Skip
        },
        buffer_size: args.buffer_size,
        max_line_length: args.max_line_length,
        input_format: args.input_format,
    };

    let factory = DefaultProcedureFactory::new();
    let Resolved {
        mut procedure,
        remaining_arguments,
    } = factory
        .find(&args.procedure, 0, &args.arguments)?
        .ok_or_else(|| {
            anyhow!(
                "unknown procedure '{}', run 'evproc help' for a list",
                args.procedure
            )
        })?;

    if !remaining_arguments.is_empty() {
        bail!(
            "unrecognized arguments for {}: {}",
            procedure.name(),
            remaining_arguments.join(" ")
        );
    }

    let mut pipeline = EventPipeline::new(config);
    let stats = match &args.input_file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file '{}'", path.display()))?;
            pipeline.run_reader(file, procedure.as_mut())
        }
        None => pipeline.run_reader(io::stdin().lock(), procedure.as_mut()),
    }
    .with_context(|| format!("{} failed", procedure.name()))?;

    debug!(
        lines = stats.lines_seen,
        events = stats.events_processed,
        errors = stats.errors,
        elapsed = ?stats.processing_time,
        rate = ?stats.rate(),
        "final statistics"
    );
    for parse_error in &stats.parse_errors {
        debug!(
            line = parse_error.line_number,
            format = %parse_error.format_name,
            error = %parse_error.error,
            "parse error"
        );
    }

    Ok(())
}
