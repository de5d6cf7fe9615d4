use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty slot list, bad offsets, etc.).
    ConfigValidation(String),
    /// The claim batch is empty — no cutoff can be derived, nothing to run.
    EmptyExtract,
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::EmptyExtract => write!(f, "claim extract contains no data rows"),
        }
    }
}

impl std::error::Error for ReconError {}
