//! Claim normalization — dealer-group derivation, wide→long flattening of
//! the repeated part/operation slots, and batch-level identity checks.

use std::collections::BTreeMap;

use crate::config::DealerGroupRules;
use crate::model::{ClaimCollision, ClaimRecord, LaborLineItem, PartLineItem};

/// Recompute `dealer_group` from the dealer code on every record. The
/// loader's value is advisory only; the pipeline trusts this derivation.
pub fn derive_dealer_groups(claims: &mut [ClaimRecord], rules: &DealerGroupRules) {
    for claim in claims.iter_mut() {
        claim.dealer_code = claim.dealer_code.trim().to_string();
        claim.dealer_group = rules.classify(&claim.dealer_code);
    }
}

/// Flatten the part slots of each claim into the long-form parts ledger.
///
/// A slot survives only with a non-empty part number and quantity > 0;
/// everything else is dropped and counted. Returns (ledger, dropped count).
pub fn flatten_parts(claims: &[ClaimRecord]) -> (Vec<PartLineItem>, usize) {
    let mut lines = Vec::new();
    let mut dropped = 0usize;

    for claim in claims {
        for slot in &claim.parts {
            let part_number = match &slot.part_number {
                Some(np) if !np.trim().is_empty() => np.trim().to_string(),
                _ => {
                    // An empty slot (no part, no quantity) is normal padding,
                    // not a data problem.
                    if slot.quantity.is_some() {
                        dropped += 1;
                    }
                    continue;
                }
            };
            let quantity = match slot.quantity {
                Some(q) if q > 0 => q,
                _ => {
                    dropped += 1;
                    continue;
                }
            };
            lines.push(PartLineItem {
                dealer_code: claim.dealer_code.clone(),
                dealer_group: claim.dealer_group,
                claim_no: claim.claim_no.clone(),
                vin: claim.vin.clone(),
                part_number,
                quantity,
            });
        }
    }

    if dropped > 0 {
        log::debug!("parts ledger: dropped {dropped} slot(s) with missing part or non-positive quantity");
    }
    (lines, dropped)
}

/// Flatten the operation slots into the labor ledger. Slots without an
/// operation code or without hours are skipped silently (they are padding).
pub fn flatten_labor(claims: &[ClaimRecord]) -> Vec<LaborLineItem> {
    let mut lines = Vec::new();
    for claim in claims {
        for slot in &claim.operations {
            let (Some(code), Some(hours)) = (&slot.code, slot.hours) else {
                continue;
            };
            if code.trim().is_empty() {
                continue;
            }
            lines.push(LaborLineItem {
                dealer_code: claim.dealer_code.clone(),
                dealer_group: claim.dealer_group,
                claim_no: claim.claim_no.clone(),
                vin: claim.vin.clone(),
                operation_code: code.trim().to_string(),
                hours,
            });
        }
    }
    lines
}

/// Claim numbers are only unique within a dealer's claim set. Any claim
/// number appearing under more than one dealer code is reported so an
/// operator can chase the upstream extract.
pub fn detect_claim_collisions(claims: &[ClaimRecord]) -> Vec<ClaimCollision> {
    let mut dealers_by_claim: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for claim in claims {
        let dealers = dealers_by_claim.entry(&claim.claim_no).or_default();
        if !dealers.contains(&claim.dealer_code.as_str()) {
            dealers.push(&claim.dealer_code);
        }
    }

    dealers_by_claim
        .into_iter()
        .filter(|(_, dealers)| dealers.len() > 1)
        .map(|(claim_no, mut dealers)| {
            dealers.sort_unstable();
            log::warn!(
                "claim number '{claim_no}' appears under {} dealers: {}",
                dealers.len(),
                dealers.join(", ")
            );
            ClaimCollision {
                claim_no: claim_no.to_string(),
                dealer_codes: dealers.into_iter().map(String::from).collect(),
            }
        })
        .collect()
}
