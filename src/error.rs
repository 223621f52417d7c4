use thiserror::Error;

/// User-facing errors.
#[derive(Error, Debug)]
pub enum SqltidyError {
    #[error("sqltidy config error: {0}")]
    Config(String),

    #[error("sqltidy config error: invalid {option} {value:?}, expected {expected}")]
    InvalidValue {
        option: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("sqltidy equivalence error: {0}")]
    Equivalence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] globset::Error),
}
