use std::env;
use std::process;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use painel_pipeline::dashboard::{self, DashboardView, ResultLimits};
use painel_pipeline::dataset::{Dataset, DatasetPaths};
use painel_pipeline::filter::{DateRange, FilterSpec, Selection};
use painel_pipeline::types::{ProductId, StoreId};

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ReportJson<'a> {
    generated_at: String,
    filter: &'a FilterSpec,
    load_ms: u128,
    evaluate_ms: u128,
    dashboard: &'a DashboardView,
}

// ---------------------------------------------------------------------------
// Human-readable output
// ---------------------------------------------------------------------------

fn print_human(view: &DashboardView, spec: &FilterSpec, load_ms: u128, evaluate_ms: u128) {
    println!();
    println!("  PAINEL INTEGRADO \u{00b7} Estoque \u{00b7} Vendas \u{00b7} Compras");
    println!(
        "  Periodo: {} a {}",
        spec.period.start.format("%d/%m/%Y"),
        spec.period.end.format("%d/%m/%Y")
    );
    println!("  {:\u{2500}<64}", "");

    let h = &view.headline;
    println!("  Receita Total        R$ {:>12.2}", h.revenue);
    println!("  Valor do Estoque     R$ {:>12.2}", h.stock_value);
    println!("  Gasto em Compras     R$ {:>12.2}", h.purchase_spend);
    println!("  Produtos Criticos    {:>15}", h.critical_count);
    match h.avg_lead_time {
        Some(days) => println!("  Prazo de Reposicao   {:>10.1} dias", days),
        None => println!("  Prazo de Reposicao   {:>15}", "N/A"),
    }
    println!("  {:\u{2500}<64}", "");

    if view.critical_stock.is_empty() {
        println!("  Nenhum produto com estoque critico.");
    } else {
        println!("  Estoque critico (deficit em unidades):");
        for row in &view.critical_stock {
            println!(
                "    {:<28} {:>6} / {:<6} deficit {:>5}",
                row.name.as_deref().unwrap_or("(sem cadastro)"),
                row.quantity,
                row.minimum,
                row.deficit,
            );
        }
    }
    println!();

    if !view.top_sellers.is_empty() {
        println!("  Mais vendidos:");
        for (i, row) in view.top_sellers.iter().enumerate() {
            println!(
                "    {:>2}. {:<26} {:>6} un  R$ {:>10.2}",
                i + 1,
                row.name.as_deref().unwrap_or("(sem cadastro)"),
                row.quantity,
                row.revenue,
            );
        }
        println!();
    }

    if !view.suppliers.is_empty() {
        println!("  Fornecedores (compras entregues):");
        for s in &view.suppliers {
            println!(
                "    {:<26} R$ {:>10.2}  prazo medio {:>4.1} dias",
                s.supplier, s.total_amount, s.avg_lead_time,
            );
        }
        println!();
    }

    let rec = &view.recommendations;
    if rec.rupture_risk > 0 {
        println!("  ! {} produtos em risco de ruptura de estoque", rec.rupture_risk);
    }
    if !rec.stagnant.is_empty() {
        println!(
            "  ! {} produtos com excesso de estoque e baixa venda",
            rec.stagnant.len()
        );
    }
    if let Some(supplier) = &rec.recommended_supplier {
        println!("  Fornecedor recomendado: {}", supplier);
    }

    println!();
    println!(
        "  Carga {}ms \u{00b7} Avaliacao {}ms \u{00b7} Total {}ms",
        load_ms,
        evaluate_ms,
        load_ms + evaluate_ms
    );
    println!();
}

// ---------------------------------------------------------------------------
// Argument handling
// ---------------------------------------------------------------------------

fn usage() -> ! {
    eprintln!(
        "Usage: painel-server <data-dir> [--categories a,b] [--products 1,2] \
         [--stores 1,2] [--from DD/MM/YYYY] [--to DD/MM/YYYY] [--top N] [--json]"
    );
    eprintln!();
    eprintln!("Expects FCD_estoque.csv, FCD_vendas.csv and FCD_compras.csv in");
    eprintln!("<data-dir>; FCD_produtos.csv is used when present, otherwise the");
    eprintln!("catalog is derived from the fact tables.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --categories  Comma-separated category names (default: all)");
    eprintln!("  --products    Comma-separated product ids (default: all)");
    eprintln!("  --stores      Comma-separated store ids (default: all)");
    eprintln!("  --from/--to   Date range, clamped to the data (default: full)");
    eprintln!("  --top         Ranking size (default: 10)");
    eprintln!("  --json        Output as JSON instead of formatted text");
    process::exit(1);
}

fn parse_date_arg(raw: &str, flag: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").unwrap_or_else(|_| {
        eprintln!("Error: {} expects a DD/MM/YYYY date, got '{}'", flag, raw);
        process::exit(1);
    })
}

fn parse_id_list<T: std::str::FromStr>(raw: &str, flag: &str) -> Vec<T> {
    raw.split(',')
        .map(|part| {
            part.trim().parse().unwrap_or_else(|_| {
                eprintln!("Error: {} contains an invalid id: '{}'", flag, part);
                process::exit(1);
            })
        })
        .collect()
}

fn take_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", flag);
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let data_dir = &args[1];
    let mut categories: Selection<String> = Selection::All;
    let mut products: Selection<ProductId> = Selection::All;
    let mut stores: Selection<StoreId> = Selection::All;
    let mut from: Option<NaiveDate> = None;
    let mut to: Option<NaiveDate> = None;
    let mut top: usize = 10;
    let mut json_output = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--categories" => {
                let value = take_value(&args, i, "--categories");
                categories =
                    Selection::Only(value.split(',').map(|s| s.trim().to_string()).collect());
                i += 2;
            }
            "--products" => {
                products = Selection::Only(parse_id_list(
                    take_value(&args, i, "--products"),
                    "--products",
                ));
                i += 2;
            }
            "--stores" => {
                stores =
                    Selection::Only(parse_id_list(take_value(&args, i, "--stores"), "--stores"));
                i += 2;
            }
            "--from" => {
                from = Some(parse_date_arg(take_value(&args, i, "--from"), "--from"));
                i += 2;
            }
            "--to" => {
                to = Some(parse_date_arg(take_value(&args, i, "--to"), "--to"));
                i += 2;
            }
            "--top" => {
                top = take_value(&args, i, "--top").parse().unwrap_or_else(|_| {
                    eprintln!("Error: --top requires a positive integer");
                    process::exit(1);
                });
                i += 2;
            }
            "--json" => {
                json_output = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
            }
        }
    }

    let load_start = Instant::now();
    let paths = DatasetPaths::from_dir(data_dir);
    let dataset = match Dataset::load_cached(&paths) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error loading dataset: {}", e);
            process::exit(1);
        }
    };
    let load_ms = load_start.elapsed().as_millis();
    log::info!(
        "dataset ready: {} products, {} sales, {} purchases",
        dataset.products.len(),
        dataset.sales.len(),
        dataset.purchases.len()
    );

    // Clamp the requested range to the data before it reaches the core.
    let (data_min, data_max) = dataset
        .date_bounds()
        .unwrap_or_else(|| {
            let today = Utc::now().date_naive();
            (today, today)
        });
    let start = from.unwrap_or(data_min).clamp(data_min, data_max);
    let end = to.unwrap_or(data_max).clamp(data_min, data_max);
    if start > end {
        eprintln!(
            "Error: --from {} is after --to {}",
            start.format("%d/%m/%Y"),
            end.format("%d/%m/%Y")
        );
        process::exit(1);
    }

    let spec = FilterSpec {
        categories,
        products,
        stores,
        period: DateRange::new(start, end),
    };
    let limits = ResultLimits {
        rankings: top,
        ..ResultLimits::default()
    };

    let evaluate_start = Instant::now();
    let view = dashboard::evaluate(&dataset, &spec, &limits);
    let evaluate_ms = evaluate_start.elapsed().as_millis();

    if json_output {
        let report = ReportJson {
            generated_at: Utc::now().to_rfc3339(),
            filter: &spec,
            load_ms,
            evaluate_ms,
            dashboard: &view,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_human(&view, &spec, load_ms, evaluate_ms);
    }
}
