pub mod catalog;
pub mod catalog_contract;
pub mod config;
pub mod format;
pub mod logging;
pub mod models;
pub mod paths;
pub mod testing;

pub use catalog::{CatalogError, CatalogResult, CatalogService, ListRequest};
pub use config::{
    ApiConfig, BrowseConfig, Config, ConfigError, LogLevel, LoggingConfig, UploadResetPolicy,
    ValidationError, API_BASE_URL_ENV, MAX_PAGE_SIZE,
};
pub use format::format_time;
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use models::{CatalogPage, ContinuationToken, StreamUrl, Track, TrackKey};
pub use paths::{AppDirs, DirsError};

pub const APP_NAME: &str = "musify";
pub const APP_AUTHOR: &str = "Musify";
pub const APP_QUALIFIER: &str = "io";
