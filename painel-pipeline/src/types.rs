//! Domain types shared across the pipeline.
//!
//! Two layers of record types exist: the `Raw*Record` structs in
//! [`crate::loader`] mirror the CSV files column-for-column, while the row
//! types here are the post-join shape every downstream computation works on.
//! Catalog attributes on joined rows are `Option`s: a product id with no
//! catalog match keeps its row with absent name/category/unit value
//! (left-join semantics, never a hard failure).

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// Product identifier (`produto_id` in every source file).
pub type ProductId = u32;

/// Store identifier (`loja_id` in the sales file).
pub type StoreId = u32;

// ---------------------------------------------------------------------------
// Catalog dimension
// ---------------------------------------------------------------------------

/// One catalog entry. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    /// Reference unit value used to price stock on hand.
    pub unit_value: f64,
}

// ---------------------------------------------------------------------------
// Purchase delivery status
// ---------------------------------------------------------------------------

/// Delivery status of a purchase order.
///
/// Only delivered orders contribute to spend, volume and lead-time
/// aggregates. Anything that is not the literal "Entregue" marker is kept
/// verbatim so filtered views can still show it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PurchaseStatus {
    Delivered,
    Other(String),
}

impl PurchaseStatus {
    /// Marker value used by the source files for delivered orders.
    pub const DELIVERED: &'static str = "Entregue";

    pub fn parse(raw: &str) -> Self {
        if raw == Self::DELIVERED {
            PurchaseStatus::Delivered
        } else {
            PurchaseStatus::Other(raw.to_string())
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, PurchaseStatus::Delivered)
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseStatus::Delivered => write!(f, "{}", Self::DELIVERED),
            PurchaseStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

// ---------------------------------------------------------------------------
// Joined fact rows
// ---------------------------------------------------------------------------

/// Current stock at one location, after snapshot reduction and catalog join.
#[derive(Clone, Debug, PartialEq)]
pub struct StockRow {
    pub product_id: ProductId,
    pub location: String,
    pub reference_date: NaiveDate,
    pub quantity: i64,
    pub minimum: i64,
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit_value: Option<f64>,
}

impl StockRow {
    /// Value of the stock on hand, `None` when the catalog lookup missed.
    pub fn total_value(&self) -> Option<f64> {
        self.unit_value.map(|v| self.quantity as f64 * v)
    }
}

/// One sales transaction, after catalog join.
#[derive(Clone, Debug, PartialEq)]
pub struct SaleRow {
    pub sale_id: u64,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub date: NaiveDate,
    pub quantity: i64,
    pub amount: f64,
    pub name: Option<String>,
    pub category: Option<String>,
}

/// One purchase order, after catalog join.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseRow {
    pub purchase_id: u64,
    pub product_id: ProductId,
    pub supplier: String,
    pub date: NaiveDate,
    pub quantity: i64,
    pub unit_price: f64,
    pub amount: f64,
    pub status: PurchaseStatus,
    pub lead_time_days: i64,
    pub name: Option<String>,
    pub category: Option<String>,
}
