use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use etdb_downloads::app::App;
use etdb_downloads::catalog::HttpCatalogClient;
use etdb_downloads::domain::CategoryFilter;
use etdb_downloads::error::EtdbError;
use etdb_downloads::output::{plan_summary, report_summary, ConsoleSink};
use etdb_downloads::source::IpfsGateway;
use etdb_downloads::transfer::{NullSink, TransferSink};

#[derive(Parser)]
#[command(name = "etdb-dl")]
#[command(about = "Bulk downloader for ETDB tomography records, resumable per run directory")]
#[command(version, author)]
struct Cli {
    /// File categories to download: "all" or a comma-separated list of
    /// TiltSeries, Reconstructions, Subvolumes, Videos, Images, Others.
    #[arg(long, default_value = "all")]
    types: String,

    /// Existing run directory to resume instead of starting a fresh one.
    #[arg(long)]
    resume: Option<Utf8PathBuf>,

    /// Maximum number of simultaneous file transfers.
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,

    /// Suppress per-file progress output; implies --yes.
    #[arg(long)]
    non_interactive: bool,

    /// Catalog index endpoint.
    #[arg(long, default_value = HttpCatalogClient::DEFAULT_INDEX_URL)]
    index_url: String,

    /// IPFS gateway serving the file bytes.
    #[arg(long, default_value = IpfsGateway::DEFAULT_GATEWAY_URL)]
    gateway_url: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(etdb) = report.downcast_ref::<EtdbError>() {
            return ExitCode::from(map_exit_code(etdb));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EtdbError) -> u8 {
    match error {
        EtdbError::Catalog(_) | EtdbError::CatalogStatus { .. } | EtdbError::Stream(_) => 3,
        EtdbError::InvalidCategory(_) | EtdbError::InvalidThreads(_) => 2,
        EtdbError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let filter = cli.types.parse::<CategoryFilter>().into_diagnostic()?;
    if cli.threads == 0 {
        return Err(EtdbError::InvalidThreads("must be at least 1".to_string())).into_diagnostic();
    }

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime.block_on(run_download(cli, filter))
}

async fn run_download(cli: Cli, filter: CategoryFilter) -> miette::Result<()> {
    let catalog = HttpCatalogClient::new(&cli.index_url).into_diagnostic()?;
    let gateway = IpfsGateway::new(&cli.gateway_url).into_diagnostic()?;
    let app = App::new(catalog, gateway);

    let prepared = app.prepare(cli.resume, &filter).await.into_diagnostic()?;
    println!("{}", plan_summary(&prepared.plan));
    println!("Run directory: {}", prepared.run_dir.root());

    if prepared.plan.is_empty() {
        println!("Nothing left to download.");
        return Ok(());
    }

    if !cli.yes && !cli.non_interactive && !confirm().into_diagnostic()? {
        println!("Aborted.");
        return Ok(());
    }

    let console = ConsoleSink;
    let null = NullSink;
    let sink: &dyn TransferSink = if cli.non_interactive { &null } else { &console };
    let report = app
        .execute(&prepared, cli.threads, sink)
        .await
        .into_diagnostic()?;

    println!("{}", report_summary(&report));
    for failed in &report.failed {
        eprintln!(
            "failed: {} : {} ({})",
            failed.location, failed.filename, failed.error
        );
    }
    if !report.failed.is_empty() {
        println!(
            "Re-run with --resume {} to retry the failed files.",
            prepared.run_dir.root()
        );
    }
    Ok(())
}

fn confirm() -> io::Result<bool> {
    print!("Would you like to proceed? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
