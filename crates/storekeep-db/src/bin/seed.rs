//! # Seed Data Generator
//!
//! Populates the database with a catalog and a customer base for development.
//!
//! ## Usage
//! ```bash
//! # 200 products, 50 customers (default)
//! cargo run -p storekeep-db --bin seed
//!
//! # Custom amounts
//! cargo run -p storekeep-db --bin seed -- --products 1000 --customers 300
//!
//! # Specify database path
//! cargo run -p storekeep-db --bin seed -- --db ./data/storekeep.db
//! ```
//!
//! Products cycle through the categories below with a size suffix; prices
//! and stock are derived from the index so reruns are reproducible.
//! Customers start with empty metrics (segment `new`).

use chrono::Utc;
use std::env;
use storekeep_core::{Customer, CustomerMetrics, CustomerStatus, Money, Product};
use storekeep_db::{generate_customer_id, generate_product_id, Database, DbConfig};

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Cozinha", &["Caneca", "Prato Raso", "Bule", "Jarra", "Tigela", "Travessa"]),
    ("Decoração", &["Vaso", "Castiçal", "Porta-Retrato", "Almofada", "Quadro"]),
    ("Têxtil", &["Toalha de Mesa", "Pano de Prato", "Guardanapo", "Cortina"]),
    ("Papelaria", &["Caderno", "Agenda", "Bloco de Notas", "Caneta Tinteiro"]),
];

const SIZES: &[(&str, i64)] = &[("P", 0), ("M", 1_000), ("G", 2_500)];

const FIRST_NAMES: &[&str] = &["Ana", "Bruno", "Carla", "Diego", "Elisa", "Fábio", "Gabi", "Hugo"];
const LAST_NAMES: &[&str] = &["Souza", "Lima", "Costa", "Rocha", "Alves", "Melo"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut product_count: usize = 200;
    let mut customer_count: usize = 50;
    let mut db_path = String::from("./storekeep_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    product_count = args[i + 1].parse().unwrap_or(product_count);
                    i += 1;
                }
            }
            "--customers" | "-c" => {
                if i + 1 < args.len() {
                    customer_count = args[i + 1].parse().unwrap_or(customer_count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Storekeep Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --products <N>   Products to generate (default: 200)");
                println!("  -c, --customers <N>  Customers to generate (default: 50)");
                println!("  -d, --db <PATH>      Database file path (default: ./storekeep_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Storekeep Seed Data Generator");
    println!("=============================");
    println!("Database:  {}", db_path);
    println!("Products:  {}", product_count);
    println!("Customers: {}", customer_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut products = 0;
    'catalog: for round in 0.. {
        for (category, names) in CATEGORIES {
            for name in names.iter() {
                for (size, addon) in SIZES {
                    if products >= product_count {
                        break 'catalog;
                    }
                    let product = generate_product(category, name, size, *addon, round, products);
                    if let Err(e) = db.products().insert(&product).await {
                        eprintln!("Failed to insert {}: {}", product.name, e);
                        continue;
                    }
                    products += 1;
                }
            }
        }
    }
    println!("✓ {} products", products);

    let mut customers = 0;
    for seed in 0..customer_count {
        let customer = generate_customer(seed);
        match db.customers().insert(&customer).await {
            Ok(()) => customers += 1,
            Err(e) => eprintln!("Failed to insert {}: {}", customer.name, e),
        }
    }
    println!("✓ {} customers", customers);

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}

fn generate_product(
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    round: usize,
    seed: usize,
) -> Product {
    let now = Utc::now();
    let full_name = if round == 0 {
        format!("{} {}", name, size)
    } else {
        format!("{} {} #{}", name, size, round + 1)
    };

    Product {
        id: generate_product_id(),
        name: full_name,
        category: category.to_string(),
        // R$ 9,90 .. R$ 89,90 plus size addon
        price: Money::from_cents(990 + ((seed * 37) % 8_000) as i64 + price_addon),
        stock: (seed % 41) as i64,
        low_stock_alert: 3 + (seed % 5) as i64,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn generate_customer(seed: usize) -> Customer {
    let now = Utc::now();
    let first = FIRST_NAMES[seed % FIRST_NAMES.len()];
    let last = LAST_NAMES[(seed / FIRST_NAMES.len()) % LAST_NAMES.len()];

    Customer {
        id: generate_customer_id(),
        name: format!("{} {}", first, last),
        phone: format!("119{:08}", seed),
        email: Some(format!("{}.{}{}@example.com", first.to_lowercase(), last.to_lowercase(), seed)),
        cpf: None,
        status: CustomerStatus::Active,
        metrics: CustomerMetrics::default(),
        created_at: now,
        updated_at: now,
    }
}
