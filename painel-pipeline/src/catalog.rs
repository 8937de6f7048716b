//! Product catalog: the dimension table every fact table joins against.
//!
//! Two sources produce the same `Product` shape:
//!   (a) an explicit catalog file (`produto_id;produto_nome;categoria;
//!       preco_unitario`), or
//!   (b) derivation from the product ids observed across the fact tables,
//!       when no catalog file ships with the dataset.
//!
//! Derivation assigns the category from an ordered list of inclusive
//! id-range rules (first match wins) and prices each product at its mean
//! historical purchase unit price.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::ops::RangeInclusive;

use serde::Deserialize;

use crate::error::LoadResult;
use crate::loader::{read_records, RawPurchaseRecord, RawSaleRecord, RawStockRecord};
use crate::types::{Product, ProductId};

// ---------------------------------------------------------------------------
// Derivation constants
// ---------------------------------------------------------------------------

/// Unit value assigned to a derived product with no purchase history.
pub const DEFAULT_UNIT_VALUE: f64 = 50.0;

/// Category label for ids no range rule covers.
pub const FALLBACK_CATEGORY: &str = "Outros";

/// Ordered id-range to category mapping used by catalog derivation.
/// First matching range wins.
pub struct CategoryRule {
    pub ids: RangeInclusive<ProductId>,
    pub label: &'static str,
}

pub const DEFAULT_CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule { ids: 1..=40, label: "Alimentos" },
    CategoryRule { ids: 41..=70, label: "Bebidas" },
    CategoryRule { ids: 71..=100, label: "Limpeza" },
    CategoryRule { ids: 101..=130, label: "Higiene Pessoal" },
    CategoryRule { ids: 131..=160, label: "Eletronicos" },
];

// ---------------------------------------------------------------------------
// Variant (a): explicit catalog file
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawProductRecord {
    #[serde(rename = "produto_id")]
    id: ProductId,
    #[serde(rename = "produto_nome")]
    name: String,
    #[serde(rename = "categoria")]
    category: String,
    #[serde(rename = "preco_unitario")]
    unit_value: f64,
}

/// Load the catalog from an explicit catalog file, normalizing the source
/// column names to the canonical `Product` shape.
pub fn load_catalog<R: Read>(reader: R, file: &str) -> LoadResult<Vec<Product>> {
    let raw: Vec<RawProductRecord> = read_records(reader, file)?;
    Ok(raw
        .into_iter()
        .map(|r| Product {
            id: r.id,
            name: r.name,
            category: r.category,
            unit_value: r.unit_value,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Variant (b): derived catalog
// ---------------------------------------------------------------------------

/// Derive a catalog from the union of product ids seen in the fact tables.
///
/// Unit value is the mean purchase unit price over the product's whole
/// purchase history (any delivery status), falling back to
/// [`DEFAULT_UNIT_VALUE`] for products never purchased. Output is sorted
/// by product id.
pub fn derive_catalog(
    stock: &[RawStockRecord],
    sales: &[RawSaleRecord],
    purchases: &[RawPurchaseRecord],
    rules: &[CategoryRule],
) -> Vec<Product> {
    // Mean purchase price per product. BTreeMap keeps the id order stable.
    let mut price_sums: BTreeMap<ProductId, (f64, usize)> = BTreeMap::new();
    for p in purchases {
        let entry = price_sums.entry(p.product_id).or_insert((0.0, 0));
        entry.0 += p.unit_price;
        entry.1 += 1;
    }

    let mut ids: BTreeSet<ProductId> = BTreeSet::new();
    ids.extend(stock.iter().map(|r| r.product_id));
    ids.extend(sales.iter().map(|r| r.product_id));
    ids.extend(purchases.iter().map(|r| r.product_id));

    let mut unpriced = 0usize;
    let products: Vec<Product> = ids
        .iter()
        .map(|&id| {
            let unit_value = match price_sums.get(&id) {
                Some(&(sum, count)) if count > 0 => sum / count as f64,
                _ => {
                    unpriced += 1;
                    DEFAULT_UNIT_VALUE
                }
            };
            Product {
                id,
                name: format!("Produto {}", id),
                category: category_for(id, rules).to_string(),
                unit_value,
            }
        })
        .collect();

    if unpriced > 0 {
        log::info!(
            "derived catalog: {} of {} products have no purchase history, priced at {}",
            unpriced,
            products.len(),
            DEFAULT_UNIT_VALUE
        );
    }
    products
}

/// First matching range rule wins; unmapped ids fall back to "Outros".
fn category_for(id: ProductId, rules: &[CategoryRule]) -> &'static str {
    rules
        .iter()
        .find(|rule| rule.ids.contains(&id))
        .map(|rule| rule.label)
        .unwrap_or(FALLBACK_CATEGORY)
}
