pub mod export;
pub mod parser;
pub mod scraper;
pub mod sheets;
pub mod store;
pub mod types;
pub mod utils;

pub use scraper::{CrawlConfig, Crawler, ScraperError};
pub use sheets::{GoogleSheets, SheetSink, SheetsConfig, SheetsError};
pub use store::GameStore;
pub use types::GameRecord;
