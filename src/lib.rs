pub mod api;
pub mod config;
pub mod dialect;
pub mod error;
pub mod formatter;
pub mod lexer;
pub mod mode;
pub mod report;
pub mod token;

// Re-export the main public API
pub use api::{format_string, get_matching_paths, run};
pub use config::{load_config, FormatterConfig, IndentType, KeywordCase};
pub use dialect::{Dialect, KeywordType};
pub use error::SqltidyError;
pub use formatter::TokenizedFormatter;
pub use mode::Mode;
