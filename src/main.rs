mod config;
mod directory;
mod error;
mod geo;
mod locator;
mod logging;
mod orchestrator;
mod probes;
mod report;
mod selector;
mod sink;
mod traits;
mod types;
mod utils;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::Settings;
use directory::Directory;
use locator::{HttpLocator, StaticLocator};
use log::info;
use logging::LogLevel;
use orchestrator::{Orchestrator, RunOptions};
use probes::HttpProbe;
use reqwest::Client;
use sink::{ConsoleSink, FileSink};
use std::io::IsTerminal;
use std::path::PathBuf;
use traits::{Locator, ReportSink};
use types::{Coordinate, UserInfo};

#[derive(Parser)]
#[command(name = "speedprobe", version)]
#[command(about = "Measure latency and throughput against nearby speedtest.net servers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Diagnostic log level (RUST_LOG is also honoured)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    log_level: LogLevel,

    /// Write the report to this file instead of the console
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Settings file. Defaults to ~/.config/speedprobe/settings.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Your latitude; skips the IP-based location lookup
    #[arg(long, requires = "lon", allow_negative_numbers = true, global = true)]
    lat: Option<f64>,

    /// Your longitude; skips the IP-based location lookup
    #[arg(long, requires = "lat", allow_negative_numbers = true, global = true)]
    lon: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show servers ranked by distance (e.g., speedprobe list -n 10)
    List {
        /// Only show the N nearest servers
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Benchmark servers (e.g., speedprobe test -s 1234 -s 5678). This is the default command
    Test(TestArgs),
}

#[derive(Args, Default)]
struct TestArgs {
    /// Server id to test; repeatable. Defaults to the nearest server
    #[arg(long = "server", short = 's', value_delimiter = ',')]
    servers: Vec<u32>,

    /// Benchmark several servers concurrently
    #[arg(long)]
    parallel: bool,

    /// Smaller transfers: less memory and traffic, lower accuracy on fast links
    #[arg(long)]
    saving_mode: bool,

    /// Also print the results as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Everything a command needs, wired once from the CLI flags.
struct Session {
    settings: Settings,
    client: Client,
    sink: Box<dyn ReportSink>,
    locator: Box<dyn Locator>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logger(cli.log_level.into())?;

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let client = utils::build_client(settings.catalog.request_timeout())?;

    // 报告输出目标在启动时确定, 运行期间不再切换
    let sink: Box<dyn ReportSink> = match &cli.log_file {
        Some(path) => {
            let file = FileSink::create(path)
                .with_context(|| format!("Cannot open report file {:?}", path))?;
            info!("Writing report to {:?}", file.path());
            Box::new(file)
        }
        None => Box::new(ConsoleSink),
    };

    let locator: Box<dyn Locator> = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => Box::new(StaticLocator::new(Coordinate::new(lat, lon))),
        _ => Box::new(HttpLocator::new(client.clone(), &settings.catalog.locator)),
    };

    let session = Session {
        settings,
        client,
        sink,
        locator,
    };

    match cli.command.unwrap_or_else(|| Commands::Test(TestArgs::default())) {
        Commands::List { limit } => handle_list(&session, limit).await?,
        Commands::Test(args) => handle_test(&session, &args).await?,
    }

    Ok(())
}

// --- Handlers ---

async fn handle_list(session: &Session, limit: Option<usize>) -> Result<()> {
    let user = locate(session).await?;
    let catalog = Directory::new(session.client.clone(), &session.settings.catalog)
        .fetch_catalog(user.coordinate)
        .await?;

    let limit = limit.unwrap_or(catalog.len());
    for server in catalog.iter().take(limit) {
        session.sink.line(&server.to_string())?;
    }

    Ok(())
}

async fn handle_test(session: &Session, args: &TestArgs) -> Result<()> {
    let user = locate(session).await?;

    // 目录获取失败直接终止, 不做任何测速
    let catalog = Directory::new(session.client.clone(), &session.settings.catalog)
        .fetch_catalog(user.coordinate)
        .await?;
    let selection = selector::select(&catalog, &args.servers)?;
    if let Some(notice) = selection.fallback_notice() {
        session.sink.line(&notice)?;
    }

    // 传输探测可能比目录请求慢得多, 单独使用探测超时
    let probe_client = utils::build_client(session.settings.probe.timeout())?;
    let probe = HttpProbe::new(probe_client, &session.settings.probe, args.saving_mode);
    let options = RunOptions {
        probe_timeout: session.settings.probe.timeout(),
        parallel: args.parallel,
        show_progress: std::io::stderr().is_terminal(),
    };

    session.sink.line("")?;
    let report = Orchestrator::new(&probe, session.sink.as_ref(), options)
        .run(&selection.targets)
        .await?;

    if args.json {
        println!("{}", report.to_json()?);
    }

    Ok(())
}

async fn locate(session: &Session) -> Result<UserInfo> {
    let user = session
        .locator
        .locate()
        .await
        .context("Could not determine your location; pass --lat and --lon to set it")?;
    session.sink.line(&user.to_string())?;
    Ok(user)
}
