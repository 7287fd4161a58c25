pub mod app;
pub mod help;
pub mod theme;
pub use app::{run_ui, UiContext, UiError};
pub use theme::Theme;
