use crate::catalog::CatalogSnapshot;
use crate::config::PipelineConfig;
use crate::error::ReconError;
use crate::model::{ClaimRecord, Diagnostics, EvaluationStatus, PipelineResult, RunMeta};
use crate::{normalize, reconcile, resolve, settlement, summary};

/// Run the full reconciliation pipeline over one claim batch against a
/// catalog snapshot. Pure and stateless: identical inputs produce identical
/// summaries, and nothing is emitted on error — the run either returns a
/// complete `PipelineResult` or fails as a whole.
pub fn run(
    config: &PipelineConfig,
    snapshot: &CatalogSnapshot,
    mut claims: Vec<ClaimRecord>,
) -> Result<PipelineResult, ReconError> {
    if claims.is_empty() {
        return Err(ReconError::EmptyExtract);
    }

    normalize::derive_dealer_groups(&mut claims, &config.dealer_groups);

    // Catalog freshness cutoff: the latest repair in the batch
    let cutoff = claims
        .iter()
        .map(|c| c.date_repaired)
        .max()
        .expect("non-empty batch");
    let window_a = snapshot.catalog_a.windowed(cutoff);
    let window_b = snapshot.catalog_b.windowed(cutoff);
    log::debug!(
        "cutoff {cutoff}: {} / {} catalog parts in window",
        window_a.len(),
        window_b.len()
    );

    // Per-status summaries run over all claims regardless of status
    let status_summary = summary::status_summary(&claims);
    let remittance_summary = summary::remittance_summary(&claims);
    let approved_differences = summary::approved_differences(&claims);

    // Everything part-level is scoped to approved claims
    let approved: Vec<ClaimRecord> = claims
        .iter()
        .filter(|c| c.status == EvaluationStatus::Approve)
        .cloned()
        .collect();

    let (part_lines, dropped_part_slots) = normalize::flatten_parts(&approved);
    let labor_lines = normalize::flatten_labor(&claims);
    let resolved = resolve::resolve_lines(part_lines, &window_a, &window_b);

    let parts_reconciliation = reconcile::parts_reconciliation(&approved, &resolved);
    let settlement =
        settlement::build_settlement(&approved, &resolved, config.settlement.dealer_group);

    let mut unresolved_parts: Vec<String> = resolved
        .iter()
        .filter(|item| !item.resolved)
        .map(|item| item.line.part_number.clone())
        .collect();
    unresolved_parts.sort();
    unresolved_parts.dedup();

    let claim_collisions = normalize::detect_claim_collisions(&claims);

    Ok(PipelineResult {
        meta: RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            cutoff,
            claim_count: claims.len(),
            approved_count: approved.len(),
            part_line_count: resolved.len(),
        },
        status_summary,
        remittance_summary,
        approved_differences,
        parts_reconciliation,
        settlement,
        claims,
        part_lines: resolved,
        labor_lines,
        diagnostics: Diagnostics {
            unresolved_parts,
            claim_collisions,
            dropped_part_slots,
        },
    })
}
