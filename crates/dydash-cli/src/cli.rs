//! Argument parsing and command dispatch.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dydash_core::catalog::DEFAULT_PAGE_SIZE;
use dydash_core::{FileType, SortKey};
use dydash_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, command_span, init_logging};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliResult, HttpDashboardApi, parse_url};
use crate::commands::config::{handle_config_get, handle_config_reset, handle_config_save};
use crate::commands::download::{handle_download_start, handle_download_stop};
use crate::commands::files::{
    handle_files_list, handle_files_preview, handle_files_stats, handle_files_thumbnail,
};
use crate::commands::links::{
    handle_links_add, handle_links_clear, handle_links_list, handle_links_remove,
    handle_links_update,
};
use crate::commands::logs::handle_logs;
use crate::commands::status::handle_status;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub(crate) const DEFAULT_ITEMS_PER_LINK: u64 = 10;

/// Parses CLI arguments, installs logging, and executes the requested
/// command. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format,
        build_sha: option_env!("DYDASH_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let span = command_span(command_name, &trace_id);
    let result = execute(cli, &trace_id).instrument(span).await;

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn execute(cli: Cli, trace_id: &str) -> CliResult<()> {
    let api = HttpDashboardApi::connect(
        cli.api_url.clone(),
        Duration::from_secs(cli.timeout),
        trace_id,
    )?;
    let ctx = AppContext::new(api);
    dispatch(cli, &ctx).await
}

pub(crate) async fn dispatch(cli: Cli, ctx: &AppContext) -> CliResult<()> {
    let output = cli.output;
    match cli.command {
        Command::Config(config) => match config {
            ConfigCommand::Get => handle_config_get(ctx, output).await,
            ConfigCommand::Save(args) => handle_config_save(ctx, args, output).await,
            ConfigCommand::Reset => handle_config_reset(ctx, output).await,
        },
        Command::Links(links) => match links {
            LinksCommand::List => handle_links_list(ctx, output).await,
            LinksCommand::Add(args) => handle_links_add(ctx, args).await,
            LinksCommand::Update(args) => handle_links_update(ctx, args).await,
            LinksCommand::Remove(args) => handle_links_remove(ctx, args).await,
            LinksCommand::Clear => handle_links_clear(ctx).await,
        },
        Command::Files(files) => match files {
            FilesCommand::Ls(args) => handle_files_list(ctx, args, output).await,
            FilesCommand::Stats => handle_files_stats(ctx, output).await,
            FilesCommand::Thumbnail(args) => handle_files_thumbnail(ctx, args, output).await,
            FilesCommand::Preview(args) => handle_files_preview(ctx, args).await,
        },
        Command::Download(download) => match download {
            DownloadCommand::Start(args) => handle_download_start(ctx, args, output).await,
            DownloadCommand::Stop => handle_download_stop(ctx).await,
        },
        Command::Status(args) => handle_status(ctx, args, output).await,
        Command::Logs => handle_logs(ctx, output).await,
    }
}

#[derive(Parser)]
#[command(name = "dydash", about = "Terminal dashboard for the Douyin downloader backend")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "DYDASH_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "DYDASH_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "DYDASH_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level when RUST_LOG is unset"
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        env = "DYDASH_LOG_FORMAT",
        value_parser = parse_log_format,
        default_value = "pretty"
    )]
    pub(crate) log_format: LogFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Show, replace, or reset the download configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage the configured links.
    #[command(subcommand)]
    Links(LinksCommand),
    /// Browse downloaded files.
    #[command(subcommand)]
    Files(FilesCommand),
    /// Start or stop a download job.
    #[command(subcommand)]
    Download(DownloadCommand),
    /// Show download progress.
    Status(StatusArgs),
    /// Print the backend log.
    Logs,
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    Get,
    Save(ConfigSaveArgs),
    Reset,
}

#[derive(Args)]
pub(crate) struct ConfigSaveArgs {
    #[arg(short = 'f', long = "file", help = "JSON file with the fields to change")]
    pub(crate) file: PathBuf,
}

#[derive(Subcommand)]
pub(crate) enum LinksCommand {
    List,
    Add(LinkAddArgs),
    Update(LinkUpdateArgs),
    Remove(LinkIndexArgs),
    Clear,
}

#[derive(Args)]
pub(crate) struct LinkAddArgs {
    #[arg(help = "Share link or profile URL")]
    pub(crate) link: String,
}

#[derive(Args)]
pub(crate) struct LinkUpdateArgs {
    #[arg(help = "Zero-based position as shown by `links list`")]
    pub(crate) index: usize,
    #[arg(help = "Replacement link")]
    pub(crate) link: String,
}

#[derive(Args)]
pub(crate) struct LinkIndexArgs {
    #[arg(help = "Zero-based position as shown by `links list`")]
    pub(crate) index: usize,
}

#[derive(Subcommand)]
pub(crate) enum FilesCommand {
    Ls(FilesListArgs),
    Stats,
    Thumbnail(FilePathArgs),
    Preview(FilePreviewArgs),
}

#[derive(Args)]
pub(crate) struct FilesListArgs {
    #[arg(long = "type", value_parser = parse_file_type)]
    pub(crate) file_type: Option<FileType>,
    #[arg(long)]
    pub(crate) source: Option<String>,
    #[arg(long, value_parser = parse_sort_key, default_value = "date-desc")]
    pub(crate) sort: SortKey,
    #[arg(long)]
    pub(crate) search: Option<String>,
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub(crate) page: i64,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub(crate) page_size: usize,
}

impl Default for FilesListArgs {
    fn default() -> Self {
        Self {
            file_type: None,
            source: None,
            sort: SortKey::default(),
            search: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Args)]
pub(crate) struct FilePathArgs {
    #[arg(help = "Path as listed by `files ls`")]
    pub(crate) path: String,
}

#[derive(Args)]
pub(crate) struct FilePreviewArgs {
    #[arg(help = "Path as listed by `files ls`")]
    pub(crate) path: String,
    #[arg(long, help = "Where to write the media bytes")]
    pub(crate) out: PathBuf,
}

#[derive(Subcommand)]
pub(crate) enum DownloadCommand {
    Start(DownloadStartArgs),
    Stop,
}

#[derive(Args)]
pub(crate) struct DownloadStartArgs {
    #[arg(
        long,
        value_delimiter = ',',
        help = "Only download these zero-based link positions"
    )]
    pub(crate) only: Vec<usize>,
    #[arg(
        long,
        default_value_t = DEFAULT_ITEMS_PER_LINK,
        help = "Works assumed for links without a known count"
    )]
    pub(crate) estimate: u64,
}

#[derive(Args)]
pub(crate) struct StatusArgs {
    #[arg(long, help = "Keep polling until interrupted")]
    pub(crate) watch: bool,
    #[arg(long, requires = "watch", help = "Stop after this many updates")]
    pub(crate) ticks: Option<usize>,
    #[arg(long, default_value_t = 1000, help = "Milliseconds between polls")]
    pub(crate) interval_ms: u64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Config(ConfigCommand::Get) => "config_get",
        Command::Config(ConfigCommand::Save(_)) => "config_save",
        Command::Config(ConfigCommand::Reset) => "config_reset",
        Command::Links(LinksCommand::List) => "links_list",
        Command::Links(LinksCommand::Add(_)) => "links_add",
        Command::Links(LinksCommand::Update(_)) => "links_update",
        Command::Links(LinksCommand::Remove(_)) => "links_remove",
        Command::Links(LinksCommand::Clear) => "links_clear",
        Command::Files(FilesCommand::Ls(_)) => "files_ls",
        Command::Files(FilesCommand::Stats) => "files_stats",
        Command::Files(FilesCommand::Thumbnail(_)) => "files_thumbnail",
        Command::Files(FilesCommand::Preview(_)) => "files_preview",
        Command::Download(DownloadCommand::Start(_)) => "download_start",
        Command::Download(DownloadCommand::Stop) => "download_stop",
        Command::Status(_) => "status",
        Command::Logs => "logs",
    }
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse()
}

fn parse_file_type(input: &str) -> Result<FileType, String> {
    FileType::parse(&input.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown file type '{input}' (video, audio, image, data, other)"))
}

fn parse_sort_key(input: &str) -> Result<SortKey, String> {
    input.parse()
}
