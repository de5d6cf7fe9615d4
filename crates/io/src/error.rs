use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("cannot read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{table}: missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("worksheet '{0}' not found")]
    SheetNotFound(String),

    #[error("claim extract: {0}")]
    Schema(String),

    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
}
