//! `warrec-io` — loading and exporting for the warranty reconciliation
//! pipeline: catalog CSV fetch/decode, claim-extract import, and the two
//! downloadable report workbooks.

pub mod csv;
pub mod error;
pub mod fetch;
pub mod xlsx;

pub use csv::{CatalogLoadReport, RowError};
pub use error::IoError;
pub use fetch::CatalogFetcher;
pub use xlsx::{export_parts_differences, export_settlement, import_claims, ExtractImport};
