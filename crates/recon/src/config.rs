use serde::Deserialize;

use crate::error::ReconError;
use crate::model::DealerGroup;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Pipeline configuration: catalog source locations and column names, the
/// claim-extract layout descriptor, dealer-group suffix rules, and the
/// settlement scope. Everything template-specific lives here, not in code.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub extract: ExtractLayout,
    #[serde(default)]
    pub dealer_groups: DealerGroupRules,
    #[serde(default)]
    pub settlement: SettlementConfig,
}

// ---------------------------------------------------------------------------
// Catalog sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub catalog_a: CatalogSourceConfig,
    pub catalog_b: CatalogSourceConfig,
}

/// Where one catalog lives and which columns carry its data.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSourceConfig {
    /// HTTP(S) URL or local file path.
    pub location: String,
    #[serde(default)]
    pub columns: CatalogColumns,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogColumns {
    pub part_number: String,
    pub price: String,
    pub date: String,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            part_number: "NP".into(),
            price: "FOB".into(),
            date: "Date".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Claim-extract layout
// ---------------------------------------------------------------------------

/// Declarative description of the uploaded claim-extract template: where the
/// header row sits, where data starts, which leading columns are non-data,
/// and which header names carry each field. Header names are matched after
/// whitespace normalization (runs of whitespace collapse to one space).
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractLayout {
    #[serde(default = "default_sheet")]
    pub sheet: String,
    /// 0-based index of the header row (template: second physical row).
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    /// 0-based index of the first data row (template: seventh physical row).
    #[serde(default = "default_data_start_row")]
    pub data_start_row: usize,
    /// Leading non-data columns to ignore.
    #[serde(default = "default_skip_columns")]
    pub skip_columns: usize,
    #[serde(default)]
    pub columns: ClaimColumns,
    /// The repeated (part number, quantity) slot pairs, in slot order.
    #[serde(default = "default_part_slots")]
    pub part_slots: Vec<SlotColumns>,
    #[serde(default = "default_operation_slots")]
    pub operation_slots: Vec<OperationColumns>,
    #[serde(default = "default_sublet_columns")]
    pub sublet_columns: Vec<String>,
}

impl Default for ExtractLayout {
    fn default() -> Self {
        Self {
            sheet: default_sheet(),
            header_row: default_header_row(),
            data_start_row: default_data_start_row(),
            skip_columns: default_skip_columns(),
            columns: ClaimColumns::default(),
            part_slots: default_part_slots(),
            operation_slots: default_operation_slots(),
            sublet_columns: default_sublet_columns(),
        }
    }
}

fn default_sheet() -> String {
    "MonthlyERP".into()
}
fn default_header_row() -> usize {
    1
}
fn default_data_start_row() -> usize {
    6
}
fn default_skip_columns() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimColumns {
    pub dealer_code: String,
    pub claim_no: String,
    pub vin: String,
    pub model: String,
    pub date_sold: String,
    pub date_repaired: String,
    pub mileage: String,
    pub status: String,
    pub claimed_parts: String,
    pub claimed_labor: String,
    pub claimed_sublet: String,
    pub claimed_total: String,
    pub remitted_parts: String,
    pub remitted_labor: String,
    pub remitted_sublet: String,
    pub remitted_total: String,
}

impl Default for ClaimColumns {
    fn default() -> Self {
        Self {
            dealer_code: "Dealer Code".into(),
            claim_no: "Claim No.".into(),
            vin: "VIN".into(),
            model: "Model Basic".into(),
            date_sold: "Date Sold".into(),
            date_repaired: "Date Repaired".into(),
            mileage: "Mileage".into(),
            status: "Evaluation Results*".into(),
            claimed_parts: "Claim Amount Parts".into(),
            claimed_labor: "Claim Amount Labor".into(),
            claimed_sublet: "Claim Amount Sublet".into(),
            claimed_total: "Claim Amount Total".into(),
            remitted_parts: "Parts Remittance Amount".into(),
            remitted_labor: "Labor Remittance Amount".into(),
            remitted_sublet: "Sublet Remittance Amount".into(),
            remitted_total: "Total Remittance Amount".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotColumns {
    pub part_number: String,
    pub quantity: String,
    #[serde(default)]
    pub price_total: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationColumns {
    pub code: String,
    pub hours: String,
}

fn default_part_slots() -> Vec<SlotColumns> {
    ["A", "B", "C", "D", "E"]
        .iter()
        .map(|s| SlotColumns {
            part_number: format!("Part No. ({s})"),
            quantity: format!("Part Quantity ({s})"),
            price_total: Some(format!("Parts Price Total ({s})")),
        })
        .collect()
}

fn default_operation_slots() -> Vec<OperationColumns> {
    ["A", "B", "C"]
        .iter()
        .map(|s| OperationColumns {
            code: format!("Operation Code ({s})"),
            hours: format!("Operation Hour ({s})"),
        })
        .collect()
}

fn default_sublet_columns() -> Vec<String> {
    vec![
        "Sublet Amount(A)".into(),
        "Sublet Amount (B)".into(),
        "Sublet Amount (C)".into(),
        "Sublet Amount (D)".into(),
    ]
}

// ---------------------------------------------------------------------------
// Dealer groups + settlement
// ---------------------------------------------------------------------------

/// Dealer-code suffix → group mapping. The suffix is the trailing character
/// of the trimmed dealer code.
#[derive(Debug, Clone, Deserialize)]
pub struct DealerGroupRules {
    pub group1_suffix: String,
    pub group2_suffix: String,
    pub group3_suffix: String,
}

impl Default for DealerGroupRules {
    fn default() -> Self {
        Self {
            group1_suffix: "N".into(),
            group2_suffix: "C".into(),
            group3_suffix: "L".into(),
        }
    }
}

impl DealerGroupRules {
    pub fn classify(&self, dealer_code: &str) -> DealerGroup {
        let code = dealer_code.trim();
        if code.ends_with(&self.group1_suffix) {
            DealerGroup::Group1
        } else if code.ends_with(&self.group2_suffix) {
            DealerGroup::Group2
        } else if code.ends_with(&self.group3_suffix) {
            DealerGroup::Group3
        } else {
            DealerGroup::Other
        }
    }
}

/// Which dealer group the settlement report is scoped to. The payable
/// formula itself (parts at resolved price + 50% labor + full sublet) is
/// fixed business policy, not configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    pub dealer_group: DealerGroup,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            dealer_group: DealerGroup::Group1,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.sources.catalog_a.location.trim().is_empty()
            || self.sources.catalog_b.location.trim().is_empty()
        {
            return Err(ReconError::ConfigValidation(
                "both catalog source locations are required".into(),
            ));
        }

        if self.extract.part_slots.is_empty() {
            return Err(ReconError::ConfigValidation(
                "extract layout needs at least one part slot".into(),
            ));
        }

        if self.extract.header_row >= self.extract.data_start_row {
            return Err(ReconError::ConfigValidation(format!(
                "header_row ({}) must precede data_start_row ({})",
                self.extract.header_row, self.extract.data_start_row
            )));
        }

        let g = &self.dealer_groups;
        for (name, suffix) in [
            ("group1_suffix", &g.group1_suffix),
            ("group2_suffix", &g.group2_suffix),
            ("group3_suffix", &g.group3_suffix),
        ] {
            if suffix.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "dealer group rule '{name}' must not be empty"
                )));
            }
        }
        if g.group1_suffix == g.group2_suffix
            || g.group1_suffix == g.group3_suffix
            || g.group2_suffix == g.group3_suffix
        {
            return Err(ReconError::ConfigValidation(
                "dealer group suffixes must be distinct".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
