use serde::{Deserialize, Serialize};

// ============================================================================
// Pricing - integer minor units (cents)
// ============================================================================
//
// Parent totals must equal the sum of child totals exactly. Each child keeps
// its own basket subtotal; the parent's tax and service-fee cents are
// distributed across children by largest remainder so no cent is ever lost
// or duplicated.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: i64,
    pub tax: i64,
    pub service_fee: i64,
    pub total: i64,
}

impl Pricing {
    pub fn zero() -> Self {
        Self {
            subtotal: 0,
            tax: 0,
            service_fee: 0,
            total: 0,
        }
    }
}

/// Tax and service-fee rates in basis points (1/100th of a percent).
#[derive(Debug, Clone, Copy)]
pub struct PricingRates {
    pub tax_bps: u32,
    pub service_fee_bps: u32,
}

impl Default for PricingRates {
    fn default() -> Self {
        // 7% tax, 2.5% service fee
        Self {
            tax_bps: 700,
            service_fee_bps: 250,
        }
    }
}

impl PricingRates {
    pub fn price(&self, subtotal: i64) -> Pricing {
        let tax = apply_bps(subtotal, self.tax_bps);
        let service_fee = apply_bps(subtotal, self.service_fee_bps);
        Pricing {
            subtotal,
            tax,
            service_fee,
            total: subtotal + tax + service_fee,
        }
    }
}

fn apply_bps(amount: i64, bps: u32) -> i64 {
    (i128::from(amount) * i128::from(bps) / 10_000) as i64
}

/// Split `amount` proportionally to `weights`, largest remainder first, so
/// the shares always sum to `amount` exactly. Zero-weight inputs fall back
/// to an even split.
pub fn split_proportionally(amount: i64, weights: &[i64]) -> Vec<i64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let total_weight: i128 = weights.iter().map(|w| i128::from(*w)).sum();
    let even = vec![1i64; weights.len()];
    let weights: &[i64] = if total_weight == 0 { &even } else { weights };
    let total_weight: i128 = weights.iter().map(|w| i128::from(*w)).sum();

    let mut shares: Vec<i64> = Vec::with_capacity(weights.len());
    let mut remainders: Vec<(usize, i128)> = Vec::with_capacity(weights.len());

    for (idx, weight) in weights.iter().enumerate() {
        let numerator = i128::from(amount) * i128::from(*weight);
        shares.push((numerator / total_weight) as i64);
        remainders.push((idx, numerator % total_weight));
    }

    let assigned: i64 = shares.iter().sum();
    let mut leftover = amount - assigned;

    // Hand leftover cents to the largest remainders, index order on ties.
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (idx, _) in remainders {
        if leftover == 0 {
            break;
        }
        shares[idx] += 1;
        leftover -= 1;
    }

    shares
}

/// Derive each child's pricing from the parent's and the per-basket
/// subtotals. Invariant: total(parent) == Σ total(children).
pub fn child_pricings(parent: &Pricing, basket_subtotals: &[i64]) -> Vec<Pricing> {
    let tax_shares = split_proportionally(parent.tax, basket_subtotals);
    let fee_shares = split_proportionally(parent.service_fee, basket_subtotals);

    basket_subtotals
        .iter()
        .zip(tax_shares)
        .zip(fee_shares)
        .map(|((subtotal, tax), service_fee)| Pricing {
            subtotal: *subtotal,
            tax,
            service_fee,
            total: subtotal + tax + service_fee,
        })
        .collect()
}
