use std::process;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use netcon::export::{Row, export_all, sorted_games};
use netcon::scraper::{ALLOWED_DOMAINS, LIST_PAGE};
use netcon::sheets::{CALENDAR_RANGE, GAMES_RANGE, SHEETS_API_URL, SPREADSHEET_ID};
use netcon::utils::RunSummary;
use netcon::{CrawlConfig, Crawler, GameStore, GoogleSheets, SheetSink, SheetsConfig, SheetsError};

#[derive(Parser)]
#[command(name = "netcon")]
#[command(
    about = "Crawls the netconplay.com game listing and exports it to Google Sheets",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "sheets",
        help = "Where to send the exported rows"
    )]
    output: OutputFormat,

    #[arg(long, default_value = LIST_PAGE, help = "First listing page to crawl")]
    list_page: String,

    #[arg(
        long,
        default_value_t = 5,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Listing pages fetched at the same time"
    )]
    list_parallelism: u16,

    #[arg(
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Game pages fetched at the same time"
    )]
    detail_parallelism: u16,

    #[arg(long, default_value_t = 30, help = "Request timeout in seconds")]
    timeout: u64,

    #[arg(long, default_value = SPREADSHEET_ID, help = "Target spreadsheet id")]
    spreadsheet_id: String,

    #[arg(long, default_value = GAMES_RANGE, help = "Range for the games table")]
    games_range: String,

    #[arg(long, default_value = CALENDAR_RANGE, help = "Range for the calendar import")]
    calendar_range: String,

    #[arg(long, default_value = SHEETS_API_URL, hide = true)]
    sheets_api_url: String,

    #[arg(
        long,
        env = "SHEETS_ACCESS_TOKEN",
        hide_env_values = true,
        help = "OAuth access token with the spreadsheets scope"
    )]
    access_token: Option<String>,
}

impl Cli {
    fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            list_page: self.list_page.clone(),
            allowed_domains: ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            list_parallelism: usize::from(self.list_parallelism),
            detail_parallelism: usize::from(self.detail_parallelism),
            timeout: Duration::from_secs(self.timeout),
        }
    }

    fn sheets_config(&self) -> SheetsConfig {
        SheetsConfig {
            api_url: self.sheets_api_url.clone(),
            spreadsheet_id: self.spreadsheet_id.clone(),
            games_range: self.games_range.clone(),
            calendar_range: self.calendar_range.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Overwrite both ranges of the spreadsheet
    Sheets,
    /// Print both grids as JSON
    Json,
    /// Print one line per game
    Text,
    /// Print the merged records as JSON
    Records,
}

/// Prints each grid to stdout instead of uploading it.
struct StdoutSink;

impl SheetSink for StdoutSink {
    async fn overwrite(&self, range: &str, rows: &[Row]) -> Result<(), SheetsError> {
        let json = serde_json::to_string_pretty(&serde_json::json!({
            "range": range,
            "values": rows,
        }))?;
        println!("{}", json);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let sheets_config = cli.sheets_config();
    let sheets = match cli.output {
        OutputFormat::Sheets => Some(GoogleSheets::new(&sheets_config).unwrap_or_else(|e| {
            log::error!("Error creating Sheets client: {}", e);
            process::exit(1);
        })),
        _ => None,
    };

    let crawler = Crawler::new(cli.crawl_config()).unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });
    let store = GameStore::new();

    log::info!("Crawling game listing from {}...", crawler.config().list_page);
    let stats = crawler.crawl_listing(&store).await.unwrap_or_else(|e| {
        log::error!("Error crawling game listing: {}", e);
        process::exit(1);
    });
    log::info!("Listing done: {}", stats);
    if store.is_empty() {
        log::warn!("No games found on the listing");
    }

    let stats = crawler.crawl_details(&store).await.unwrap_or_else(|e| {
        log::error!("Error crawling game details: {}", e);
        process::exit(1);
    });
    log::info!("Details done: {}", stats);

    let summary = RunSummary::from_store(&store);
    match cli.output {
        OutputFormat::Json | OutputFormat::Records => {
            log::info!("Total games: {}", summary.total)
        }
        _ => {
            println!("Total games: {}", summary.total);
            print!("{}", summary);
        }
    }

    let exported = match (cli.output, sheets) {
        (OutputFormat::Sheets, Some(sheets)) => {
            export_all(&store, &sheets, &sheets_config).await
        }
        (OutputFormat::Json, _) => export_all(&store, &StdoutSink, &sheets_config).await,
        (OutputFormat::Records, _) => {
            serde_json::to_string_pretty(&sorted_games(&store))
                .map(|json| println!("{}", json))
                .map_err(SheetsError::from)
        }
        _ => {
            for game in sorted_games(&store) {
                println!("{}", game);
            }
            Ok(())
        }
    };

    if let Err(e) = exported {
        log::error!("Unable to export games: {}", e);
        process::exit(1);
    }
}
