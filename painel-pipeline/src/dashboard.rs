//! Dashboard evaluation boundary.
//!
//! The single entry point the rendering collaborator calls: one
//! `FilterSpec` in, every headline scalar, ranked table, series and
//! recommendation out. Each call filters once and runs every aggregation
//! over the shared filtered views; nothing is retained between calls.

use serde::Serialize;

use crate::aggregate::{
    self, CategorySales, CriticalStock, HeadlineMetrics, MonthlyFlow, ProductFlow,
    ProductOverview, ProductSales, ProductSpend, StoreSales, SupplierStats,
};
use crate::dataset::Dataset;
use crate::filter::{self, FilterSpec, Selection};
use crate::rules::{self, Recommendations, StockLevel};
use crate::types::ProductId;

/// Presentation-defined caps for the ranked tables.
#[derive(Clone, Copy, Debug)]
pub struct ResultLimits {
    pub critical: usize,
    pub rankings: usize,
    pub flows: usize,
}

impl Default for ResultLimits {
    fn default() -> Self {
        Self {
            critical: 20,
            rankings: 10,
            flows: 20,
        }
    }
}

/// The 360 panel, only produced when the filter narrows to one product.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SingleProductView {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub overview: ProductOverview,
    pub level: StockLevel,
}

/// Everything one filter evaluation hands to the presentation layer.
#[derive(Clone, Debug, Serialize)]
pub struct DashboardView {
    pub headline: HeadlineMetrics,
    pub critical_stock: Vec<CriticalStock>,
    pub top_sellers: Vec<ProductSales>,
    pub top_spend: Vec<ProductSpend>,
    pub suppliers: Vec<SupplierStats>,
    pub monthly: Vec<MonthlyFlow>,
    pub stores: Vec<StoreSales>,
    pub categories: Vec<CategorySales>,
    pub product_flows: Vec<ProductFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_product: Option<SingleProductView>,
    pub recommendations: Recommendations,
}

/// Evaluate one filter selection against the loaded dataset.
pub fn evaluate(dataset: &Dataset, spec: &FilterSpec, limits: &ResultLimits) -> DashboardView {
    let view = filter::apply(dataset, spec);
    log::debug!(
        "filtered views: {} stock, {} sales, {} purchases",
        view.stock.len(),
        view.sales.len(),
        view.purchases.len()
    );

    let single_product = match &spec.products {
        Selection::Only(ids) if ids.len() == 1 => {
            let overview = aggregate::product_overview(&view);
            let level =
                rules::classify_stock_level(overview.stock_quantity, overview.stock_minimum);
            Some(SingleProductView {
                product_id: ids[0],
                overview,
                level,
            })
        }
        _ => None,
    };

    DashboardView {
        headline: aggregate::headline(&view),
        critical_stock: aggregate::critical_stock(&view, limits.critical),
        top_sellers: aggregate::top_sellers(&view, limits.rankings),
        top_spend: aggregate::top_spend(&view, limits.rankings),
        suppliers: aggregate::supplier_scorecard(&view),
        monthly: aggregate::monthly_series(&view),
        stores: aggregate::store_breakdown(&view),
        categories: aggregate::category_revenue(&view),
        product_flows: aggregate::product_flows(&view, limits.flows),
        single_product,
        recommendations: rules::recommendations(&view),
    }
}
