//! Catalog fetching — blocking HTTP with bounded retry, or local files for
//! offline runs. A snapshot load is complete-or-fail: if either source
//! cannot be fetched, no snapshot is produced.

use std::thread;
use std::time::Duration;

use warrec_recon::catalog::{Catalog, CatalogSnapshot};
use warrec_recon::config::{CatalogSourceConfig, SourcesConfig};
use warrec_recon::model::CatalogSource;

use crate::csv::{decode_bytes, parse_catalog, CatalogLoadReport};
use crate::error::IoError;

const MAX_RETRIES: u32 = 3;
const FETCH_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("warrec/", env!("CARGO_PKG_VERSION"));

pub struct CatalogFetcher {
    http: reqwest::blocking::Client,
}

impl CatalogFetcher {
    pub fn new() -> Result<Self, IoError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IoError::Fetch {
                url: String::new(),
                reason: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self { http })
    }

    /// GET a catalog body. Transport errors and 5xx responses retry with
    /// backoff; 4xx responses fail immediately.
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, IoError> {
        let mut last_reason = String::new();

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                thread::sleep(Duration::from_secs(1 << attempt));
                log::debug!("retrying {url} (attempt {})", attempt + 1);
            }

            match self.http.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.bytes().map(|b| b.to_vec()).map_err(|e| {
                            IoError::Fetch { url: url.into(), reason: e.to_string() }
                        });
                    }
                    last_reason = format!("HTTP {status}");
                    if !status.is_server_error() {
                        break;
                    }
                }
                Err(e) => last_reason = e.to_string(),
            }
        }

        Err(IoError::Fetch { url: url.into(), reason: last_reason })
    }

    /// Load one catalog from its configured location (URL or file path).
    pub fn load_catalog(
        &self,
        source: CatalogSource,
        config: &CatalogSourceConfig,
    ) -> Result<(Catalog, CatalogLoadReport), IoError> {
        let location = config.location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            let bytes = self.fetch_bytes(location)?;
            parse_catalog(source, &config.columns, &decode_bytes(&bytes))
        } else {
            crate::csv::load_catalog_file(std::path::Path::new(location), source, &config.columns)
        }
    }

    /// Load both catalogs into a fresh immutable snapshot. Callers hand the
    /// snapshot to a [`warrec_recon::CatalogCache`] to publish it.
    pub fn load_snapshot(
        &self,
        sources: &SourcesConfig,
    ) -> Result<(CatalogSnapshot, Vec<CatalogLoadReport>), IoError> {
        let (catalog_a, report_a) = self.load_catalog(CatalogSource::CatalogA, &sources.catalog_a)?;
        let (catalog_b, report_b) = self.load_catalog(CatalogSource::CatalogB, &sources.catalog_b)?;

        log::debug!(
            "snapshot loaded: {} + {} catalog rows",
            catalog_a.entries.len(),
            catalog_b.entries.len()
        );

        Ok((
            CatalogSnapshot {
                catalog_a,
                catalog_b,
                loaded_at: chrono::Utc::now().naive_utc(),
            },
            vec![report_a, report_b],
        ))
    }
}
