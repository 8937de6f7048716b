//! CSV fact-table loaders.
//!
//! Parses the three semicolon-separated fact files into `Raw*Record`
//! structs. Expected columns:
//!   stock:     produto_id, localizacao, data_referencia, quantidade_estoque,
//!              estoque_minimo
//!   sales:     venda_id, produto_id, loja_id, data_venda,
//!              quantidade_vendida, valor_total
//!   purchases: purchase_id, produto_id, fornecedor, data_compra,
//!              quantidade_comprada, valor_unitario, valor_total,
//!              status_compra, prazo_entrega_dias
//!
//! Stock reference dates are ISO (`2024-01-31`); sale and purchase dates are
//! day-first (`31/01/2024`). A date that does not match its expected format
//! is a load error, not a skipped row.

use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::error::{DataLoadError, LoadResult};
use crate::types::{ProductId, PurchaseStatus, StoreId};

/// Raw stock snapshot row, pre-reduction and pre-join.
#[derive(Clone, Debug, Deserialize)]
pub struct RawStockRecord {
    #[serde(rename = "produto_id")]
    pub product_id: ProductId,
    #[serde(rename = "localizacao")]
    pub location: String,
    #[serde(rename = "data_referencia", deserialize_with = "de_iso_date")]
    pub reference_date: NaiveDate,
    #[serde(rename = "quantidade_estoque")]
    pub quantity: i64,
    #[serde(rename = "estoque_minimo")]
    pub minimum: i64,
}

/// Raw sales transaction row, pre-join.
#[derive(Clone, Debug, Deserialize)]
pub struct RawSaleRecord {
    #[serde(rename = "venda_id")]
    pub sale_id: u64,
    #[serde(rename = "produto_id")]
    pub product_id: ProductId,
    #[serde(rename = "loja_id")]
    pub store_id: StoreId,
    #[serde(rename = "data_venda", deserialize_with = "de_day_first_date")]
    pub date: NaiveDate,
    #[serde(rename = "quantidade_vendida")]
    pub quantity: i64,
    #[serde(rename = "valor_total")]
    pub amount: f64,
}

/// Raw purchase order row, pre-join.
#[derive(Clone, Debug, Deserialize)]
pub struct RawPurchaseRecord {
    #[serde(rename = "purchase_id")]
    pub purchase_id: u64,
    #[serde(rename = "produto_id")]
    pub product_id: ProductId,
    #[serde(rename = "fornecedor")]
    pub supplier: String,
    #[serde(rename = "data_compra", deserialize_with = "de_day_first_date")]
    pub date: NaiveDate,
    #[serde(rename = "quantidade_comprada")]
    pub quantity: i64,
    #[serde(rename = "valor_unitario")]
    pub unit_price: f64,
    #[serde(rename = "valor_total")]
    pub amount: f64,
    #[serde(rename = "status_compra", deserialize_with = "de_status")]
    pub status: PurchaseStatus,
    #[serde(rename = "prazo_entrega_dias")]
    pub lead_time_days: i64,
}

/// Load stock snapshot rows from a CSV reader.
pub fn load_stock<R: Read>(reader: R, file: &str) -> LoadResult<Vec<RawStockRecord>> {
    read_records(reader, file)
}

/// Load sales rows from a CSV reader.
pub fn load_sales<R: Read>(reader: R, file: &str) -> LoadResult<Vec<RawSaleRecord>> {
    read_records(reader, file)
}

/// Load purchase rows from a CSV reader.
pub fn load_purchases<R: Read>(reader: R, file: &str) -> LoadResult<Vec<RawPurchaseRecord>> {
    read_records(reader, file)
}

/// Shared deserialization loop for all semicolon-separated sources.
///
/// `file` only labels errors; callers pass whatever name the user will
/// recognize. Line numbers are 1-based and count the header row.
pub(crate) fn read_records<T, R>(reader: R, file: &str) -> LoadResult<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        let record: T = result.map_err(|e| DataLoadError::Malformed {
            file: file.to_string(),
            line: line_num + 2,
            message: error_message(&e),
        })?;
        records.push(record);
    }

    log::debug!("loaded {} records from '{}'", records.len(), file);
    Ok(records)
}

/// csv::Error Display embeds its own byte position; unwrap deserialize
/// errors to the cause so our file/line framing is not duplicated.
fn error_message(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err: cause, .. } => cause.to_string(),
        _ => err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Field deserializers
// ---------------------------------------------------------------------------

const ISO_DATE: &str = "%Y-%m-%d";
const DAY_FIRST_DATE: &str = "%d/%m/%Y";

fn de_iso_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    parse_date(deserializer, ISO_DATE, "YYYY-MM-DD")
}

fn de_day_first_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    parse_date(deserializer, DAY_FIRST_DATE, "DD/MM/YYYY")
}

fn parse_date<'de, D>(deserializer: D, format: &str, label: &str) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(&raw, format).map_err(|_| {
        serde::de::Error::custom(format!("invalid date '{}', expected {}", raw, label))
    })
}

fn de_status<'de, D>(deserializer: D) -> Result<PurchaseStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(PurchaseStatus::parse(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCK_CSV: &str = "\
produto_id;localizacao;data_referencia;quantidade_estoque;estoque_minimo
1;Loja 1;2024-01-01;50;30
1;Loja 1;2024-02-01;10;30
2;Deposito Central;2024-02-01;200;40
";

    const SALES_CSV: &str = "\
venda_id;produto_id;loja_id;data_venda;quantidade_vendida;valor_total
1001;1;1;15/01/2024;3;75.50
1002;2;2;20/02/2024;1;199.90
";

    const PURCHASES_CSV: &str = "\
purchase_id;produto_id;fornecedor;data_compra;quantidade_comprada;valor_unitario;valor_total;status_compra;prazo_entrega_dias
501;1;Atacadao Sul;10/01/2024;100;20.00;2000.00;Entregue;7
502;2;Distribuidora Norte;12/01/2024;50;90.00;4500.00;Pendente;12
";

    #[test]
    fn load_stock_sample() {
        let records = load_stock(STOCK_CSV.as_bytes(), "stock.csv").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].product_id, 1);
        assert_eq!(records[0].location, "Loja 1");
        assert_eq!(
            records[0].reference_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(records[1].quantity, 10);
        assert_eq!(records[2].minimum, 40);
    }

    #[test]
    fn load_sales_parses_day_first_dates() {
        let records = load_sales(SALES_CSV.as_bytes(), "sales.csv").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert!((records[0].amount - 75.50).abs() < 1e-9);
        assert_eq!(records[1].store_id, 2);
    }

    #[test]
    fn load_purchases_parses_status() {
        let records = load_purchases(PURCHASES_CSV.as_bytes(), "purchases.csv").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].status.is_delivered());
        assert_eq!(
            records[1].status,
            PurchaseStatus::Other("Pendente".to_string())
        );
        assert_eq!(records[0].lead_time_days, 7);
    }

    #[test]
    fn bad_date_is_a_load_error_with_line_number() {
        let csv_data = "\
venda_id;produto_id;loja_id;data_venda;quantidade_vendida;valor_total
1001;1;1;2024-01-15;3;75.50
";
        let err = load_sales(csv_data.as_bytes(), "sales.csv").unwrap_err();
        match err {
            DataLoadError::Malformed { file, line, message } => {
                assert_eq!(file, "sales.csv");
                assert_eq!(line, 2);
                assert!(message.contains("2024-01-15"), "message: {}", message);
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn missing_column_is_a_load_error() {
        let csv_data = "\
venda_id;produto_id;loja_id;data_venda;quantidade_vendida
1001;1;1;15/01/2024;3
";
        let err = load_sales(csv_data.as_bytes(), "sales.csv").unwrap_err();
        assert!(matches!(err, DataLoadError::Malformed { .. }));
    }
}
