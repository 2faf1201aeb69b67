use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing::info;

use kira_align::config::ConfigLoader;
use kira_align::error::KiraError;
use kira_align::exec::SystemRunner;
use kira_align::logging::{LogCapture, init_tracing};
use kira_align::output::JsonOutput;
use kira_align::pipeline::{DEFAULT_TEMP_ROOT, DEFAULT_THREADS, Pipeline, RunRequest};

#[derive(Parser)]
#[command(name = "kira-align")]
#[command(about = "Align a set of reads with BWA and publish the BAM plus a JSON summary")]
#[command(version, author)]
struct Cli {
    /// Location for input file(s), multiple inputs joined by '+'
    /// (supported: sra://, s3://, ftp://, or local path)
    #[arg(long)]
    input: String,

    /// Sample name, used as the prefix of the published files
    #[arg(long)]
    sample_name: String,

    /// Reference FASTA, optionally gzipped (supported: s3:// or local path)
    #[arg(long)]
    ref_db: String,

    /// Folder to place results (supported: s3:// or local path)
    #[arg(long)]
    output_folder: String,

    /// Number of threads to use aligning
    #[arg(long, default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Folder used for temporary files
    #[arg(long, default_value = DEFAULT_TEMP_ROOT)]
    temp_folder: String,

    /// Tool configuration (defaults to ./kira-align.json when present)
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    let capture = LogCapture::new();
    init_tracing(&capture);

    if let Err(report) = run(capture) {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(kira.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run(capture: LogCapture) -> miette::Result<()> {
    let cli = Cli::parse();
    if cli.threads == 0 {
        return Err(KiraError::Validation("--threads must be at least 1".to_string()).into());
    }

    let request = RunRequest {
        reads: cli.input.parse()?,
        sample: cli.sample_name.parse()?,
        reference: cli.ref_db.parse()?,
        destination: cli.output_folder.parse()?,
        threads: cli.threads,
        temp_root: Utf8PathBuf::from(cli.temp_folder),
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    info!("Sample: {}", request.sample);
    info!("Input: {}", request.reads.joined());
    info!("Reference: {}", request.reference);
    info!("Output: {}", request.destination);

    let pipeline = Pipeline::new(SystemRunner::new(), config, capture);
    let summary = pipeline.run(&request)?;
    JsonOutput::print_summary(&summary).map_err(|err| KiraError::Filesystem(err.to_string()))?;
    Ok(())
}
