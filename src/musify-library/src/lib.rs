mod browser;
mod merge;

pub use browser::{BrowseState, BrowserSettings, CatalogBrowser, FetchOutcome};
pub use merge::{append_page, replace_page};
