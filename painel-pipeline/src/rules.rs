//! Threshold-based business rules over the filtered views.
//!
//! Classifies stock positions and produces the advisory entries behind the
//! recommendations panel. Nothing here mutates data; output is
//! classification and candidate lists for the presentation layer to word.

use serde::Serialize;

use crate::aggregate::{sales_quantity_by_product, stock_by_product};
use crate::filter::FilteredView;
use crate::types::ProductId;

// ---------------------------------------------------------------------------
// Business constants
// ---------------------------------------------------------------------------
//
// The two excess thresholds genuinely differ between report sections: the
// single-product panel flags excess at 3x minimum, while the multi-product
// stagnant report uses 2x minimum plus a sell-through floor.

/// Single-product view: quantity above this multiple of minimum is excess.
const EXCESS_SINGLE_FACTOR: f64 = 3.0;
/// Stagnant report: quantity must exceed this multiple of minimum.
const EXCESS_MULTI_FACTOR: f64 = 2.0;
/// Stagnant report: sold/stock ratio below this marks low sell-through.
const STAGNANT_SELL_THROUGH: f64 = 0.1;

/// Stock position classification for a single product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StockLevel {
    /// Below minimum; replenish now.
    Critical,
    /// Far above minimum; candidate for promotion or discount.
    Excess,
    Adequate,
}

/// Classify one product's stock position against its minimum.
///
/// `minimum` is a float because the single-product panel averages the
/// minimum across locations.
pub fn classify_stock_level(quantity: i64, minimum: f64) -> StockLevel {
    let quantity = quantity as f64;
    if quantity < minimum {
        StockLevel::Critical
    } else if quantity > minimum * EXCESS_SINGLE_FACTOR {
        StockLevel::Excess
    } else {
        StockLevel::Adequate
    }
}

/// A product holding well above minimum while selling almost nothing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StagnantProduct {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub stock_quantity: i64,
    pub minimum: i64,
    pub sold_quantity: i64,
}

/// Find products with excess stock and low sell-through: grouped stock
/// (quantity and minimum summed across locations) joined against
/// per-product sales sums, flagged when quantity > 2x minimum and sold
/// quantity is under 10% of the stock on hand.
pub fn stagnant_products(view: &FilteredView) -> Vec<StagnantProduct> {
    let sold = sales_quantity_by_product(&view.sales);
    stock_by_product(&view.stock)
        .into_iter()
        .filter_map(|totals| {
            let sold_quantity = sold.get(&totals.product_id).copied().unwrap_or(0);
            let overstocked =
                totals.quantity as f64 > totals.minimum as f64 * EXCESS_MULTI_FACTOR;
            let low_sell_through =
                (sold_quantity as f64) < totals.quantity as f64 * STAGNANT_SELL_THROUGH;
            (overstocked && low_sell_through).then_some(StagnantProduct {
                product_id: totals.product_id,
                name: totals.name,
                stock_quantity: totals.quantity,
                minimum: totals.minimum,
                sold_quantity,
            })
        })
        .collect()
}

/// Number of products at rupture risk (summed stock below summed minimum).
pub fn rupture_risk_count(view: &FilteredView) -> usize {
    stock_by_product(&view.stock)
        .iter()
        .filter(|t| t.quantity < t.minimum)
        .count()
}

/// The supplier with the shortest mean delivery lead time among delivered
/// purchases. Ties keep the first supplier in name order; `None` when no
/// purchase in range was delivered.
pub fn recommended_supplier(view: &FilteredView) -> Option<String> {
    use std::collections::BTreeMap;

    let mut lead_times: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for p in view.purchases.iter().filter(|p| p.status.is_delivered()) {
        let entry = lead_times.entry(p.supplier.as_str()).or_insert((0, 0));
        entry.0 += p.lead_time_days;
        entry.1 += 1;
    }

    let mut best: Option<(&str, f64)> = None;
    for (supplier, (sum, count)) in lead_times {
        let mean = sum as f64 / count as f64;
        match best {
            Some((_, best_mean)) if mean >= best_mean => {}
            _ => best = Some((supplier, mean)),
        }
    }
    best.map(|(supplier, _)| supplier.to_string())
}

/// Everything the recommendations panel needs in one pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendations {
    /// Products at rupture risk; drives the "replenish immediately" entry.
    pub rupture_risk: usize,
    /// Promotion/discount candidates.
    pub stagnant: Vec<StagnantProduct>,
    /// Partner to prioritize for fast replenishment.
    pub recommended_supplier: Option<String>,
}

pub fn recommendations(view: &FilteredView) -> Recommendations {
    Recommendations {
        rupture_risk: rupture_risk_count(view),
        stagnant: stagnant_products(view),
        recommended_supplier: recommended_supplier(view),
    }
}
