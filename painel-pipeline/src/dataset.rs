//! Dataset assembly: load, reduce, join, and cache for the session.
//!
//! All four tables are loaded once, joined against the catalog, and held
//! immutable for the process lifetime. Filter evaluation never mutates the
//! dataset; concurrent readers are safe by construction.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use once_cell::sync::OnceCell;

use crate::catalog::{self, DEFAULT_CATEGORY_RULES};
use crate::error::{DataLoadError, LoadResult};
use crate::loader::{self, RawPurchaseRecord, RawSaleRecord, RawStockRecord};
use crate::snapshot::latest_snapshots;
use crate::types::{Product, ProductId, PurchaseRow, SaleRow, StockRow};

/// Default file names inside a dataset directory.
const STOCK_FILE: &str = "FCD_estoque.csv";
const SALES_FILE: &str = "FCD_vendas.csv";
const PURCHASES_FILE: &str = "FCD_compras.csv";
const CATALOG_FILE: &str = "FCD_produtos.csv";

/// Where each source file lives. `catalog` is optional: without it the
/// catalog is derived from the fact tables.
#[derive(Clone, Debug)]
pub struct DatasetPaths {
    pub stock: PathBuf,
    pub sales: PathBuf,
    pub purchases: PathBuf,
    pub catalog: Option<PathBuf>,
}

impl DatasetPaths {
    /// Conventional layout: the four `FCD_*.csv` files in one directory.
    /// The catalog file participates only if present.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let catalog_path = dir.join(CATALOG_FILE);
        Self {
            stock: dir.join(STOCK_FILE),
            sales: dir.join(SALES_FILE),
            purchases: dir.join(PURCHASES_FILE),
            catalog: catalog_path.is_file().then_some(catalog_path),
        }
    }
}

/// The immutable in-memory dataset every pipeline evaluation reads from.
///
/// Stock is already snapshot-reduced; all three fact tables carry their
/// left-joined catalog attributes.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub products: Vec<Product>,
    pub stock: Vec<StockRow>,
    pub sales: Vec<SaleRow>,
    pub purchases: Vec<PurchaseRow>,
}

impl Dataset {
    /// Load all sources from disk and assemble the joined dataset.
    pub fn load(paths: &DatasetPaths) -> LoadResult<Dataset> {
        let stock_raw = loader::load_stock(open(&paths.stock)?, &name_of(&paths.stock))?;
        let sales_raw = loader::load_sales(open(&paths.sales)?, &name_of(&paths.sales))?;
        let purchases_raw =
            loader::load_purchases(open(&paths.purchases)?, &name_of(&paths.purchases))?;

        let products = match &paths.catalog {
            Some(path) => catalog::load_catalog(open(path)?, &name_of(path))?,
            None => {
                log::info!("no catalog file, deriving products from fact tables");
                catalog::derive_catalog(
                    &stock_raw,
                    &sales_raw,
                    &purchases_raw,
                    DEFAULT_CATEGORY_RULES,
                )
            }
        };

        Ok(Self::assemble(products, stock_raw, sales_raw, purchases_raw))
    }

    /// Pure assembly step: snapshot-reduce stock, then left-join every fact
    /// table against the catalog. Split out from [`Dataset::load`] so tests
    /// can build datasets without touching the filesystem.
    pub fn assemble(
        products: Vec<Product>,
        stock_raw: Vec<RawStockRecord>,
        sales_raw: Vec<RawSaleRecord>,
        purchases_raw: Vec<RawPurchaseRecord>,
    ) -> Dataset {
        let by_id: HashMap<ProductId, &Product> =
            products.iter().map(|p| (p.id, p)).collect();

        let stock = latest_snapshots(stock_raw)
            .into_iter()
            .map(|r| {
                let product = by_id.get(&r.product_id);
                StockRow {
                    product_id: r.product_id,
                    location: r.location,
                    reference_date: r.reference_date,
                    quantity: r.quantity,
                    minimum: r.minimum,
                    name: product.map(|p| p.name.clone()),
                    category: product.map(|p| p.category.clone()),
                    unit_value: product.map(|p| p.unit_value),
                }
            })
            .collect::<Vec<_>>();

        let sales = sales_raw
            .into_iter()
            .map(|r| {
                let product = by_id.get(&r.product_id);
                SaleRow {
                    sale_id: r.sale_id,
                    product_id: r.product_id,
                    store_id: r.store_id,
                    date: r.date,
                    quantity: r.quantity,
                    amount: r.amount,
                    name: product.map(|p| p.name.clone()),
                    category: product.map(|p| p.category.clone()),
                }
            })
            .collect::<Vec<_>>();

        let purchases = purchases_raw
            .into_iter()
            .map(|r| {
                let product = by_id.get(&r.product_id);
                PurchaseRow {
                    purchase_id: r.purchase_id,
                    product_id: r.product_id,
                    supplier: r.supplier,
                    date: r.date,
                    quantity: r.quantity,
                    unit_price: r.unit_price,
                    amount: r.amount,
                    status: r.status,
                    lead_time_days: r.lead_time_days,
                    name: product.map(|p| p.name.clone()),
                    category: product.map(|p| p.category.clone()),
                }
            })
            .collect::<Vec<_>>();

        let unmatched = stock.iter().filter(|r| r.category.is_none()).count()
            + sales.iter().filter(|r| r.category.is_none()).count()
            + purchases.iter().filter(|r| r.category.is_none()).count();
        if unmatched > 0 {
            log::warn!("{} fact rows reference product ids missing from the catalog", unmatched);
        }
        log::info!(
            "dataset assembled: {} products, {} stock positions, {} sales, {} purchases",
            products.len(),
            stock.len(),
            sales.len(),
            purchases.len()
        );

        Dataset { products, stock, sales, purchases }
    }

    /// One-time process-wide load; later calls return the cached dataset
    /// regardless of `paths`. The cache is read-only after initialization.
    pub fn load_cached(paths: &DatasetPaths) -> LoadResult<Arc<Dataset>> {
        static DATASET: OnceCell<Arc<Dataset>> = OnceCell::new();
        DATASET
            .get_or_try_init(|| Dataset::load(paths).map(Arc::new))
            .cloned()
    }

    /// Min and max sale dates, for clamping user-supplied ranges before
    /// they reach the filter engine. `None` when there are no sales at all.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.sales.iter().map(|s| s.date).min()?;
        let max = self.sales.iter().map(|s| s.date).max()?;
        Some((min, max))
    }

    /// Distinct categories in the catalog, sorted, for filter choices.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> =
            self.products.iter().map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

fn open(path: &Path) -> LoadResult<File> {
    File::open(path).map_err(|source| DataLoadError::Io {
        file: name_of(path),
        source,
    })
}

fn name_of(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::types::PurchaseStatus;

    fn product(id: ProductId, name: &str, category: &str, unit_value: f64) -> Product {
        Product { id, name: name.into(), category: category.into(), unit_value }
    }

    fn stock_snap(product_id: ProductId, date: (i32, u32, u32), qty: i64) -> RawStockRecord {
        RawStockRecord {
            product_id,
            location: "Loja 1".into(),
            reference_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            quantity: qty,
            minimum: 30,
        }
    }

    fn sale(product_id: ProductId, date: (i32, u32, u32)) -> RawSaleRecord {
        RawSaleRecord {
            sale_id: 1,
            product_id,
            store_id: 1,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            quantity: 2,
            amount: 40.0,
        }
    }

    #[test]
    fn assemble_joins_catalog_attributes() {
        let dataset = Dataset::assemble(
            vec![product(1, "Arroz 5kg", "Alimentos", 25.0)],
            vec![stock_snap(1, (2024, 1, 1), 10)],
            vec![sale(1, (2024, 1, 15))],
            vec![],
        );
        assert_eq!(dataset.stock[0].name.as_deref(), Some("Arroz 5kg"));
        assert_eq!(dataset.sales[0].category.as_deref(), Some("Alimentos"));
        assert_eq!(dataset.stock[0].total_value(), Some(250.0));
    }

    #[test]
    fn unmatched_product_id_keeps_row_with_absent_attributes() {
        let dataset = Dataset::assemble(
            vec![product(1, "Arroz 5kg", "Alimentos", 25.0)],
            vec![stock_snap(99, (2024, 1, 1), 10)],
            vec![sale(99, (2024, 1, 15))],
            vec![],
        );
        assert_eq!(dataset.stock.len(), 1);
        assert_eq!(dataset.stock[0].name, None);
        assert_eq!(dataset.stock[0].total_value(), None);
        assert_eq!(dataset.sales[0].category, None);
    }

    #[test]
    fn assemble_reduces_snapshots_before_join() {
        let dataset = Dataset::assemble(
            vec![product(1, "Arroz 5kg", "Alimentos", 25.0)],
            vec![stock_snap(1, (2024, 1, 1), 50), stock_snap(1, (2024, 2, 1), 10)],
            vec![],
            vec![],
        );
        assert_eq!(dataset.stock.len(), 1);
        assert_eq!(dataset.stock[0].quantity, 10);
    }

    #[test]
    fn date_bounds_span_sales() {
        let dataset = Dataset::assemble(
            vec![],
            vec![],
            vec![sale(1, (2024, 1, 15)), sale(1, (2024, 3, 2)), sale(1, (2024, 2, 1))],
            vec![],
        );
        assert_eq!(
            dataset.date_bounds(),
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
            ))
        );
        let empty = Dataset::assemble(vec![], vec![], vec![], vec![]);
        assert_eq!(empty.date_bounds(), None);
    }

    #[test]
    fn categories_are_sorted_and_distinct() {
        let dataset = Dataset::assemble(
            vec![
                product(1, "a", "Limpeza", 1.0),
                product(2, "b", "Alimentos", 1.0),
                product(3, "c", "Limpeza", 1.0),
            ],
            vec![],
            vec![],
            vec![],
        );
        assert_eq!(dataset.categories(), vec!["Alimentos", "Limpeza"]);
    }

    #[test]
    fn purchase_status_survives_assembly() {
        let raw = RawPurchaseRecord {
            purchase_id: 501,
            product_id: 1,
            supplier: "Atacadao Sul".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            quantity: 100,
            unit_price: 20.0,
            amount: 2000.0,
            status: PurchaseStatus::Other("Em Transito".into()),
            lead_time_days: 7,
        };
        let dataset = Dataset::assemble(vec![], vec![], vec![], vec![raw]);
        assert!(!dataset.purchases[0].status.is_delivered());
    }
}
