use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog input
// ---------------------------------------------------------------------------

/// Which invoice catalog a price row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    CatalogA,
    CatalogB,
}

impl std::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CatalogA => write!(f, "catalog_a"),
            Self::CatalogB => write!(f, "catalog_b"),
        }
    }
}

/// One price row from an invoice catalog. Immutable once loaded; duplicates
/// per part number are resolved by `as_of` at query/window time.
#[derive(Debug, Clone, Serialize)]
pub struct PriceCatalogEntry {
    pub part_number: String,
    /// Reference unit price (FOB) in minor units. Never a float.
    pub fob_cents: i64,
    pub as_of: NaiveDateTime,
    pub source: CatalogSource,
}

// ---------------------------------------------------------------------------
// Claim input
// ---------------------------------------------------------------------------

/// Dealer network group, derived from a suffix code on the dealer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealerGroup {
    Group1,
    Group2,
    Group3,
    Other,
}

impl std::fmt::Display for DealerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Group1 => write!(f, "group1"),
            Self::Group2 => write!(f, "group2"),
            Self::Group3 => write!(f, "group3"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Workflow status of a claim as coded by the payer ("1".."4").
/// Unknown codes are preserved so summaries never silently drop a claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Return,
    Reject,
    Pending,
    Approve,
    Other(String),
}

impl EvaluationStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => Self::Return,
            "2" => Self::Reject,
            "3" => Self::Pending,
            "4" => Self::Approve,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Return => write!(f, "Return"),
            Self::Reject => write!(f, "Reject"),
            Self::Pending => write!(f, "Pending"),
            Self::Approve => write!(f, "Approve"),
            Self::Other(code) => write!(f, "Other({code})"),
        }
    }
}

/// One repeated part slot on the wide claim row (slots A through E).
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartSlot {
    pub part_number: Option<String>,
    pub quantity: Option<i64>,
    pub price_total_cents: Option<i64>,
}

/// One repeated operation slot on the wide claim row (slots A through C).
#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationSlot {
    pub code: Option<String>,
    pub hours: Option<f64>,
}

/// Parts / labor / sublet / total amount quadruple, in minor units.
/// Missing source cells default to 0, never to "unknown".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AmountSet {
    pub parts_cents: i64,
    pub labor_cents: i64,
    pub sublet_cents: i64,
    pub total_cents: i64,
}

impl AmountSet {
    pub fn add(&mut self, other: &AmountSet) {
        self.parts_cents += other.parts_cents;
        self.labor_cents += other.labor_cents;
        self.sublet_cents += other.sublet_cents;
        self.total_cents += other.total_cents;
    }

    /// Component-wise `self − other`.
    pub fn minus(&self, other: &AmountSet) -> AmountSet {
        AmountSet {
            parts_cents: self.parts_cents - other.parts_cents,
            labor_cents: self.labor_cents - other.labor_cents,
            sublet_cents: self.sublet_cents - other.sublet_cents,
            total_cents: self.total_cents - other.total_cents,
        }
    }

    /// Two-decimal fixed-point presentation, e.g. `"1,234.56"` per
    /// component. Summary tables are displayed in this form.
    pub fn formatted(&self) -> FormattedAmounts {
        FormattedAmounts {
            parts: crate::money::format_cents(self.parts_cents),
            labor: crate::money::format_cents(self.labor_cents),
            sublet: crate::money::format_cents(self.sublet_cents),
            total: crate::money::format_cents(self.total_cents),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedAmounts {
    pub parts: String,
    pub labor: String,
    pub sublet: String,
    pub total: String,
}

/// One wide-form warranty claim row, as ingested from the monthly extract.
///
/// `dealer_group` is derived during normalization; whatever the loader put
/// there is recomputed from `dealer_code` on every run.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimRecord {
    pub dealer_code: String,
    pub dealer_group: DealerGroup,
    pub claim_no: String,
    pub vin: String,
    pub model: String,
    pub date_sold: Option<NaiveDate>,
    pub date_repaired: NaiveDate,
    pub mileage: Option<i64>,
    pub status: EvaluationStatus,
    pub parts: Vec<PartSlot>,
    pub operations: Vec<OperationSlot>,
    pub sublet_amounts_cents: Vec<i64>,
    /// Amounts claimed by the dealer.
    pub claimed: AmountSet,
    /// Amounts actually remitted by the payer.
    pub remitted: AmountSet,
}

impl ClaimRecord {
    /// Claim identity within a batch. Claim numbers alone are not unique
    /// across dealers, so every join keys on (dealer_code, claim_no).
    pub fn key(&self) -> ClaimKey {
        ClaimKey {
            dealer_code: self.dealer_code.clone(),
            claim_no: self.claim_no.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClaimKey {
    pub dealer_code: String,
    pub claim_no: String,
}

// ---------------------------------------------------------------------------
// Flattened ledgers
// ---------------------------------------------------------------------------

/// One part line from the long-form parts ledger. Invariant: `quantity > 0`
/// and `part_number` non-empty — rows violating this never leave the
/// normalizer.
#[derive(Debug, Clone, Serialize)]
pub struct PartLineItem {
    pub dealer_code: String,
    pub dealer_group: DealerGroup,
    pub claim_no: String,
    pub vin: String,
    pub part_number: String,
    pub quantity: i64,
}

/// One operation line from the labor ledger.
#[derive(Debug, Clone, Serialize)]
pub struct LaborLineItem {
    pub dealer_code: String,
    pub dealer_group: DealerGroup,
    pub claim_no: String,
    pub vin: String,
    pub operation_code: String,
    pub hours: f64,
}

/// A part line with its resolved reference price.
///
/// `resolved == false` means the part was absent from both catalogs within
/// the cutoff window; the price defaults to 0 but the line stays visible
/// downstream. A genuinely zero-priced catalog row has `resolved == true`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPartLineItem {
    pub line: PartLineItem,
    pub resolved: bool,
    pub source: Option<CatalogSource>,
    pub fob_cents: i64,
    pub claim_amount_cents: i64,
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Amounts summed per evaluation status — used for both the claimed-amount
/// and remittance-amount summaries.
#[derive(Debug, Clone, Serialize)]
pub struct AmountSummaryRow {
    pub status: EvaluationStatus,
    pub claim_count: usize,
    pub amounts: AmountSet,
}

/// Per-claim `remittance − claimed` quadruple (Approve-status claims only).
#[derive(Debug, Clone, Serialize)]
pub struct ClaimDifferenceRow {
    pub dealer_code: String,
    pub dealer_group: DealerGroup,
    pub claim_no: String,
    pub vin: String,
    pub difference: AmountSet,
}

/// Approved-only difference analysis. A non-zero `totals` signals
/// systematic under/over-payment.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovedDifferences {
    pub rows: Vec<ClaimDifferenceRow>,
    pub totals: AmountSet,
}

// ---------------------------------------------------------------------------
// Parts-level reconciliation
// ---------------------------------------------------------------------------

/// Per approved claim: bottom-up resolved parts total vs the payer's stated
/// parts remittance. `difference_cents = reported − resolved`.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimPartsDifference {
    pub dealer_code: String,
    pub dealer_group: DealerGroup,
    pub claim_no: String,
    pub vin: String,
    pub resolved_parts_cents: i64,
    pub reported_parts_cents: i64,
    pub difference_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartsReconciliation {
    pub claims: Vec<ClaimPartsDifference>,
    pub total_difference_cents: i64,
    /// Part-line drill-down restricted to claims with non-zero difference.
    pub detail: Vec<ResolvedPartLineItem>,
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// One payable line of the settlement report.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementLine {
    pub dealer_code: String,
    pub claim_no: String,
    pub vin: String,
    pub resolved_parts_cents: i64,
    pub labor_half_cents: i64,
    pub sublet_cents: i64,
    pub total_payable_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementReport {
    pub dealer_group: DealerGroup,
    pub lines: Vec<SettlementLine>,
    pub total_payable_cents: i64,
    /// Headline figure: sum of Total Remittance Amount over the scoped
    /// claims. Top-down, independent of the bottom-up recomputation.
    pub amount_recognized_cents: i64,
}

// ---------------------------------------------------------------------------
// Diagnostics + result
// ---------------------------------------------------------------------------

/// A claim number shared by claims from more than one dealer. Joins in this
/// engine key on (dealer, claim_no) so nothing merges, but the collision is
/// surfaced for operator review.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimCollision {
    pub claim_no: String,
    pub dealer_codes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    /// Part numbers absent from both catalogs within the cutoff window.
    pub unresolved_parts: Vec<String>,
    pub claim_collisions: Vec<ClaimCollision>,
    /// Part slots discarded during flattening (missing part number kept a
    /// quantity, or quantity missing / non-positive).
    pub dropped_part_slots: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
    /// Maximum repair date in the batch; catalog freshness cutoff.
    pub cutoff: NaiveDate,
    pub claim_count: usize,
    pub approved_count: usize,
    pub part_line_count: usize,
}

/// Everything one pipeline run produces. Recomputed fresh per run; nothing
/// persists between runs.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub meta: RunMeta,
    pub status_summary: Vec<AmountSummaryRow>,
    pub remittance_summary: Vec<AmountSummaryRow>,
    pub approved_differences: ApprovedDifferences,
    pub parts_reconciliation: PartsReconciliation,
    pub settlement: SettlementReport,
    /// The cleaned wide claim table, dealer groups derived — the rows the
    /// evaluation-status filter runs over.
    pub claims: Vec<ClaimRecord>,
    /// Full resolved parts ledger over approved claims.
    pub part_lines: Vec<ResolvedPartLineItem>,
    pub labor_lines: Vec<LaborLineItem>,
    pub diagnostics: Diagnostics,
}
