//! Aggregation engine: grouped reductions over the filtered views.
//!
//! Every operation here is a stateless pure function over its inputs and is
//! total: empty input produces an empty table or zero/`None` scalar, never
//! an error. The presentation layer decides how to render "no data".
//!
//! Spend, purchase volume and lead-time reductions cover delivered
//! purchases only; non-delivered orders stay visible in raw filtered views
//! but never contribute to those numbers.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::filter::FilteredView;
use crate::types::{ProductId, PurchaseRow, SaleRow, StockRow, StoreId};

// ---------------------------------------------------------------------------
// Output tables
// ---------------------------------------------------------------------------

/// The scalar indicators at the top of the dashboard.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeadlineMetrics {
    /// Sum of sale amounts in range.
    pub revenue: f64,
    /// Value of current stock (quantity x reference unit value).
    pub stock_value: f64,
    /// Sum of delivered purchase amounts in range.
    pub purchase_spend: f64,
    /// Products whose summed stock is below their summed minimum.
    pub critical_count: usize,
    /// Mean delivery lead time in days; `None` with no delivered purchases.
    pub avg_lead_time: Option<f64>,
}

/// One row of the critical-stock ranking.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CriticalStock {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub minimum: i64,
    pub deficit: i64,
}

/// One row of the top-sellers ranking.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub revenue: f64,
}

/// One row of the top-spend ranking (delivered purchases).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductSpend {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub amount: f64,
}

/// Per-supplier scorecard over delivered purchases.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SupplierStats {
    pub supplier: String,
    pub avg_unit_price: f64,
    pub avg_lead_time: f64,
    pub total_quantity: i64,
    pub total_amount: f64,
}

/// Quantities sold and purchased in one calendar month. Months present in
/// either series appear in both, zero-filled on the missing side.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyFlow {
    /// First day of the month.
    pub month: NaiveDate,
    pub sold: i64,
    pub purchased: i64,
}

/// Sales breakdown for one store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoreSales {
    pub store_id: StoreId,
    pub revenue: f64,
    pub quantity: i64,
    pub transactions: usize,
}

/// Revenue for one category.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategorySales {
    pub category: String,
    pub revenue: f64,
    pub quantity: i64,
}

/// The single-product "360" panel: stock position, sales and delivered
/// purchases side by side, plus the supplier with the largest spend.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductOverview {
    pub stock_quantity: i64,
    /// Mean minimum across the product's locations.
    pub stock_minimum: f64,
    pub sold_quantity: i64,
    pub revenue: f64,
    pub purchased_quantity: i64,
    pub purchase_amount: f64,
    /// Supplier with the largest summed amount over all filtered purchases,
    /// delivered or not.
    pub principal_supplier: Option<String>,
}

/// Stock, sales and delivered-purchase quantities for one product, used by
/// the consolidated comparison chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductFlow {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub stock_quantity: i64,
    pub sold_quantity: i64,
    pub purchased_quantity: i64,
}

// ---------------------------------------------------------------------------
// Shared grouped accumulators
// ---------------------------------------------------------------------------

/// Per-product stock totals across locations.
#[derive(Clone, Debug)]
pub(crate) struct StockTotals {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub minimum: i64,
}

/// Group stock rows by product, summing quantity and minimum separately.
/// Output is ordered by product id.
pub(crate) fn stock_by_product(stock: &[StockRow]) -> Vec<StockTotals> {
    let mut groups: BTreeMap<ProductId, StockTotals> = BTreeMap::new();
    for row in stock {
        groups
            .entry(row.product_id)
            .and_modify(|totals| {
                totals.quantity += row.quantity;
                totals.minimum += row.minimum;
            })
            .or_insert_with(|| StockTotals {
                product_id: row.product_id,
                name: row.name.clone(),
                category: row.category.clone(),
                quantity: row.quantity,
                minimum: row.minimum,
            });
    }
    groups.into_values().collect()
}

/// Per-product sold quantity, ordered by product id.
pub(crate) fn sales_quantity_by_product(sales: &[SaleRow]) -> BTreeMap<ProductId, i64> {
    let mut sold: BTreeMap<ProductId, i64> = BTreeMap::new();
    for row in sales {
        *sold.entry(row.product_id).or_insert(0) += row.quantity;
    }
    sold
}

/// Descending order for float sort keys; NaN sinks to the end so garbage
/// from division by zero never tops a ranking.
fn desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

// ---------------------------------------------------------------------------
// Headline metrics
// ---------------------------------------------------------------------------

pub fn headline(view: &FilteredView) -> HeadlineMetrics {
    let revenue = view.sales.iter().map(|s| s.amount).sum();

    // Rows with no catalog match have no unit value and contribute nothing.
    let stock_value = view
        .stock
        .iter()
        .filter_map(StockRow::total_value)
        .sum();

    let delivered: Vec<&PurchaseRow> = view
        .purchases
        .iter()
        .filter(|p| p.status.is_delivered())
        .collect();
    let purchase_spend = delivered.iter().map(|p| p.amount).sum();
    let avg_lead_time = if delivered.is_empty() {
        None
    } else {
        let total: i64 = delivered.iter().map(|p| p.lead_time_days).sum();
        Some(total as f64 / delivered.len() as f64)
    };

    let critical_count = stock_by_product(&view.stock)
        .iter()
        .filter(|t| t.quantity < t.minimum)
        .count();

    HeadlineMetrics {
        revenue,
        stock_value,
        purchase_spend,
        critical_count,
        avg_lead_time,
    }
}

// ---------------------------------------------------------------------------
// Ranked tables
// ---------------------------------------------------------------------------

/// Products below their minimum, worst deficit first, capped at `top_n`.
pub fn critical_stock(view: &FilteredView, top_n: usize) -> Vec<CriticalStock> {
    let mut critical: Vec<CriticalStock> = stock_by_product(&view.stock)
        .into_iter()
        .filter(|t| t.quantity < t.minimum)
        .map(|t| CriticalStock {
            product_id: t.product_id,
            name: t.name,
            category: t.category,
            quantity: t.quantity,
            minimum: t.minimum,
            deficit: t.minimum - t.quantity,
        })
        .collect();
    critical.sort_by(|a, b| b.deficit.cmp(&a.deficit));
    critical.truncate(top_n);
    critical
}

/// Best-selling products by quantity, capped at `top_n`.
pub fn top_sellers(view: &FilteredView, top_n: usize) -> Vec<ProductSales> {
    let mut groups: BTreeMap<ProductId, ProductSales> = BTreeMap::new();
    for row in &view.sales {
        groups
            .entry(row.product_id)
            .and_modify(|g| {
                g.quantity += row.quantity;
                g.revenue += row.amount;
            })
            .or_insert_with(|| ProductSales {
                product_id: row.product_id,
                name: row.name.clone(),
                category: row.category.clone(),
                quantity: row.quantity,
                revenue: row.amount,
            });
    }
    let mut ranked: Vec<ProductSales> = groups.into_values().collect();
    ranked.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    ranked.truncate(top_n);
    ranked
}

/// Products with the largest delivered purchase spend, capped at `top_n`.
pub fn top_spend(view: &FilteredView, top_n: usize) -> Vec<ProductSpend> {
    let mut groups: BTreeMap<ProductId, ProductSpend> = BTreeMap::new();
    for row in view.purchases.iter().filter(|p| p.status.is_delivered()) {
        groups
            .entry(row.product_id)
            .and_modify(|g| {
                g.quantity += row.quantity;
                g.amount += row.amount;
            })
            .or_insert_with(|| ProductSpend {
                product_id: row.product_id,
                name: row.name.clone(),
                category: row.category.clone(),
                quantity: row.quantity,
                amount: row.amount,
            });
    }
    let mut ranked: Vec<ProductSpend> = groups.into_values().collect();
    ranked.sort_by(|a, b| desc(a.amount, b.amount));
    ranked.truncate(top_n);
    ranked
}

/// Supplier scorecard over delivered purchases, largest spend first.
pub fn supplier_scorecard(view: &FilteredView) -> Vec<SupplierStats> {
    struct Acc {
        price_sum: f64,
        lead_sum: i64,
        count: usize,
        quantity: i64,
        amount: f64,
    }

    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for row in view.purchases.iter().filter(|p| p.status.is_delivered()) {
        let acc = groups.entry(row.supplier.clone()).or_insert(Acc {
            price_sum: 0.0,
            lead_sum: 0,
            count: 0,
            quantity: 0,
            amount: 0.0,
        });
        acc.price_sum += row.unit_price;
        acc.lead_sum += row.lead_time_days;
        acc.count += 1;
        acc.quantity += row.quantity;
        acc.amount += row.amount;
    }

    let mut scorecard: Vec<SupplierStats> = groups
        .into_iter()
        .map(|(supplier, acc)| SupplierStats {
            supplier,
            avg_unit_price: acc.price_sum / acc.count as f64,
            avg_lead_time: acc.lead_sum as f64 / acc.count as f64,
            total_quantity: acc.quantity,
            total_amount: acc.amount,
        })
        .collect();
    scorecard.sort_by(|a, b| desc(a.total_amount, b.total_amount));
    scorecard
}

// ---------------------------------------------------------------------------
// Time series and breakdowns
// ---------------------------------------------------------------------------

fn month_of(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .expect("first day of month is always valid")
}

/// Monthly sold and delivered-purchased quantities, aligned over the union
/// of months present in either series, ascending by month.
pub fn monthly_series(view: &FilteredView) -> Vec<MonthlyFlow> {
    let mut months: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
    for sale in &view.sales {
        months.entry(month_of(sale.date)).or_insert((0, 0)).0 += sale.quantity;
    }
    for purchase in view.purchases.iter().filter(|p| p.status.is_delivered()) {
        months.entry(month_of(purchase.date)).or_insert((0, 0)).1 += purchase.quantity;
    }
    months
        .into_iter()
        .map(|(month, (sold, purchased))| MonthlyFlow { month, sold, purchased })
        .collect()
}

/// Sales totals per store, ordered by store id.
pub fn store_breakdown(view: &FilteredView) -> Vec<StoreSales> {
    let mut groups: BTreeMap<StoreId, StoreSales> = BTreeMap::new();
    for row in &view.sales {
        groups
            .entry(row.store_id)
            .and_modify(|g| {
                g.revenue += row.amount;
                g.quantity += row.quantity;
                g.transactions += 1;
            })
            .or_insert_with(|| StoreSales {
                store_id: row.store_id,
                revenue: row.amount,
                quantity: row.quantity,
                transactions: 1,
            });
    }
    groups.into_values().collect()
}

/// Revenue per category, largest first. Sales whose product id missed the
/// catalog have no category and are skipped rather than grouped under a
/// placeholder.
pub fn category_revenue(view: &FilteredView) -> Vec<CategorySales> {
    let mut groups: BTreeMap<String, CategorySales> = BTreeMap::new();
    for row in &view.sales {
        let Some(category) = &row.category else { continue };
        groups
            .entry(category.clone())
            .and_modify(|g| {
                g.revenue += row.amount;
                g.quantity += row.quantity;
            })
            .or_insert_with(|| CategorySales {
                category: category.clone(),
                revenue: row.amount,
                quantity: row.quantity,
            });
    }
    let mut ranked: Vec<CategorySales> = groups.into_values().collect();
    ranked.sort_by(|a, b| desc(a.revenue, b.revenue));
    ranked
}

// ---------------------------------------------------------------------------
// Single-product and consolidated views
// ---------------------------------------------------------------------------

/// The 360 panel for a view already narrowed to one product.
///
/// Minimum is the mean across locations (not the sum), matching the
/// single-product report. Purchased quantity and amount are
/// delivered-only; the principal supplier ranks over all filtered
/// purchases regardless of status.
pub fn product_overview(view: &FilteredView) -> ProductOverview {
    let stock_quantity: i64 = view.stock.iter().map(|r| r.quantity).sum();
    let stock_minimum = if view.stock.is_empty() {
        0.0
    } else {
        view.stock.iter().map(|r| r.minimum).sum::<i64>() as f64 / view.stock.len() as f64
    };

    let sold_quantity: i64 = view.sales.iter().map(|r| r.quantity).sum();
    let revenue: f64 = view.sales.iter().map(|r| r.amount).sum();

    let delivered = view.purchases.iter().filter(|p| p.status.is_delivered());
    let (purchased_quantity, purchase_amount) = delivered
        .fold((0i64, 0.0f64), |(q, a), p| (q + p.quantity, a + p.amount));

    let mut spend_by_supplier: BTreeMap<&str, f64> = BTreeMap::new();
    for p in &view.purchases {
        *spend_by_supplier.entry(p.supplier.as_str()).or_insert(0.0) += p.amount;
    }
    // Strictly-greater replacement keeps the first supplier on ties.
    let mut principal: Option<(&str, f64)> = None;
    for (supplier, amount) in spend_by_supplier {
        match principal {
            Some((_, best)) if amount <= best => {}
            _ => principal = Some((supplier, amount)),
        }
    }
    let principal_supplier = principal.map(|(supplier, _)| supplier.to_string());

    ProductOverview {
        stock_quantity,
        stock_minimum,
        sold_quantity,
        revenue,
        purchased_quantity,
        purchase_amount,
        principal_supplier,
    }
}

/// Stock, sales and delivered-purchase quantities per product, missing
/// sides zero-filled, top sellers first, capped at `top_n`.
pub fn product_flows(view: &FilteredView, top_n: usize) -> Vec<ProductFlow> {
    let sold = sales_quantity_by_product(&view.sales);

    let mut purchased: BTreeMap<ProductId, i64> = BTreeMap::new();
    for row in view.purchases.iter().filter(|p| p.status.is_delivered()) {
        *purchased.entry(row.product_id).or_insert(0) += row.quantity;
    }

    let mut flows: Vec<ProductFlow> = stock_by_product(&view.stock)
        .into_iter()
        .map(|t| ProductFlow {
            product_id: t.product_id,
            name: t.name,
            stock_quantity: t.quantity,
            sold_quantity: sold.get(&t.product_id).copied().unwrap_or(0),
            purchased_quantity: purchased.get(&t.product_id).copied().unwrap_or(0),
        })
        .collect();
    flows.sort_by(|a, b| b.sold_quantity.cmp(&a.sold_quantity));
    flows.truncate(top_n);
    flows
}
