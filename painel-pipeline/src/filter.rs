//! Filter engine: derive the three filtered views from a filter selection.
//!
//! Dimension selections are tri-state on purpose: "no restriction" and
//! "restricted to a set that happens to match nothing" are different
//! states, and conflating them is how an empty multiselect accidentally
//! hides the whole dashboard. `Selection::All` passes everything;
//! `Selection::Only(vec![])` passes nothing.

use chrono::NaiveDate;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::types::{ProductId, PurchaseRow, SaleRow, StockRow, StoreId};

/// Tri-state dimension filter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Selection<T> {
    /// No restriction; every row passes.
    All,
    /// Restricted to this set. An empty set matches nothing.
    Only(Vec<T>),
}

impl<T: PartialEq> Selection<T> {
    pub fn allows(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(values) => values.contains(value),
        }
    }

    /// Left-join semantics for restricted dimensions: a row whose joined
    /// attribute is absent cannot satisfy a restriction.
    pub fn allows_opt(&self, value: Option<&T>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(values) => value.map_or(false, |v| values.contains(v)),
        }
    }
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

/// Inclusive date range. Callers clamp to the dataset's bounds before
/// building the spec; `start` must not exceed `end`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "date range start after end");
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The combined user-selected filter state. Rebuilt from scratch on every
/// interaction; evaluating it never mutates the dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterSpec {
    pub categories: Selection<String>,
    pub products: Selection<ProductId>,
    pub stores: Selection<StoreId>,
    pub period: DateRange,
}

impl FilterSpec {
    /// Spec with no dimension restrictions over the given period.
    pub fn unrestricted(period: DateRange) -> Self {
        Self {
            categories: Selection::All,
            products: Selection::All,
            stores: Selection::All,
            period,
        }
    }
}

/// The three filtered views every aggregation consumes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilteredView {
    pub stock: Vec<StockRow>,
    pub sales: Vec<SaleRow>,
    pub purchases: Vec<PurchaseRow>,
}

/// Apply a filter selection to the dataset.
///
/// Category and product restrictions apply to all three tables. The store
/// restriction applies only to sales; the date range applies to sales (by
/// sale date) and purchases (by order date), inclusive on both ends.
/// Dimensions compose with AND. Empty views are valid output.
pub fn apply(dataset: &Dataset, spec: &FilterSpec) -> FilteredView {
    let stock = dataset
        .stock
        .iter()
        .filter(|row| {
            spec.categories.allows_opt(row.category.as_ref())
                && spec.products.allows(&row.product_id)
        })
        .cloned()
        .collect();

    let sales = dataset
        .sales
        .iter()
        .filter(|row| {
            spec.categories.allows_opt(row.category.as_ref())
                && spec.products.allows(&row.product_id)
                && spec.stores.allows(&row.store_id)
                && spec.period.contains(row.date)
        })
        .cloned()
        .collect();

    let purchases = dataset
        .purchases
        .iter()
        .filter(|row| {
            spec.categories.allows_opt(row.category.as_ref())
                && spec.products.allows(&row.product_id)
                && spec.period.contains(row.date)
        })
        .cloned()
        .collect();

    FilteredView { stock, sales, purchases }
}
