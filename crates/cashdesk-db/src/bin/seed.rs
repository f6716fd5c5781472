//! # Seed Data Generator
//!
//! Populates a development database with a catalog and a handful of sales.
//!
//! ## Usage
//! ```bash
//! # 500 products, 50 sales (defaults)
//! cargo run -p cashdesk-db --bin seed
//!
//! # Custom amounts
//! cargo run -p cashdesk-db --bin seed -- --count 2000 --sales 200
//!
//! # Specify database path
//! cargo run -p cashdesk-db --bin seed -- --db ./data/cashdesk.db
//! ```
//!
//! Each product has:
//! - Unique SKU: `{CATEGORY}-{NAME}-{INDEX}`
//! - Price: $1.99 - $9.99 plus a size addon
//! - Cost: 55-75% of price
//! - Stock: 20 - 120

use cashdesk_core::{
    CheckoutTotals, Money, NewProduct, NewTransaction, NewTransactionItem, PaymentType, Product,
};
use cashdesk_db::{Database, DbConfig, DbError};
use std::env;

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Sparkling Water",
            "Cola",
            "Lemon Soda",
            "Iced Tea",
            "Cold Brew",
            "Orange Juice",
            "Energy Drink",
            "Kombucha",
        ],
    ),
    (
        "SNK",
        &[
            "Sea Salt Chips",
            "Pretzel Twists",
            "Trail Mix",
            "Granola Bar",
            "Dark Chocolate",
            "Rice Crackers",
            "Popcorn",
            "Jerky",
        ],
    ),
    (
        "DRY",
        &[
            "Whole Milk",
            "Oat Milk",
            "Greek Yogurt",
            "Cheddar",
            "Butter",
            "Cream Cheese",
            "Eggs",
            "Kefir",
        ],
    ),
    (
        "HOM",
        &[
            "Paper Towels",
            "Dish Soap",
            "Sponges",
            "Trash Bags",
            "Light Bulb",
            "Batteries AA",
            "Matches",
            "Foil Roll",
        ],
    ),
];

const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Regular", 75),
    ("Large", 150),
    ("Family", 300),
    ("Multipack", 450),
];

const PAYMENT_TYPES: &[PaymentType] = &[
    PaymentType::Cash,
    PaymentType::Card,
    PaymentType::DigitalWallet,
    PaymentType::BankTransfer,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut sales: usize = 50;
    let mut db_path = String::from("./cashdesk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(sales);
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
                println!("Cashdesk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 500)");
                println!("  -s, --sales <N>    Number of sample sales to record (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./cashdesk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Cashdesk Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!("Sales:    {}", sales);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    if !db.products().list_active(1).await?.is_empty() {
        println!("⚠ Database already has products");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut catalog: Vec<Product> = Vec::with_capacity(count);

    'outer: for (category_idx, (category, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                if catalog.len() >= count {
                    break 'outer;
                }
                let seed = category_idx * 1000 + name_idx * 10 + size_idx;
                let product = generate_product(category, name, size, *addon, seed);
                match db.products().insert(&product).await {
                    Ok(inserted) => catalog.push(inserted),
                    Err(e) => eprintln!("Failed to insert {}: {}", product.sku, e),
                }
            }
        }
    }

    println!(
        "✓ Generated {} products in {:?}",
        catalog.len(),
        start.elapsed()
    );

    if catalog.is_empty() {
        return Ok(());
    }

    let tax_rate = db.settings().get_or_create().await?.tax_rate();
    let mut recorded = 0;
    let mut short = 0;

    for n in 0..sales {
        let items: Vec<NewTransactionItem> = (0..(1 + n % 4))
            .map(|k| {
                let product = &catalog[(n * 7 + k * 13) % catalog.len()];
                NewTransactionItem::new(&product.id, 1 + ((n + k) % 3) as i64, product.price_cents)
            })
            .collect();

        let discount = if n % 5 == 0 { Money::from_cents(50) } else { Money::zero() };
        let totals = CheckoutTotals::compute(&items, tax_rate, discount)?;
        let header = NewTransaction {
            customer_id: None,
            user_id: format!("cashier-{}", 1 + n % 3),
            total_cents: totals.total.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            payment_type: PAYMENT_TYPES[n % PAYMENT_TYPES.len()],
            notes: None,
        };

        match db.transactions().create_transaction(&header, &items).await {
            Ok(_) => recorded += 1,
            Err(DbError::Core(e)) => {
                short += 1;
                eprintln!("Sale {} rejected: {}", n, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("✓ Recorded {} sales ({} rejected)", recorded, short);

    let today = db.reports().daily_revenue(None).await?;
    println!("  Revenue {}: {}", today.date, today.revenue);

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

fn generate_product(category: &str, name: &str, size: &str, addon: i64, seed: usize) -> NewProduct {
    let tag: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();

    let price_cents = 199 + ((seed * 17) % 800) as i64 + addon;
    let cost_pct = 55 + (seed % 21) as i64;

    NewProduct {
        sku: format!("{}-{}-{:04}", category, tag, seed),
        name: format!("{} {}", name, size),
        description: None,
        barcode: Some(format!("200{:010}", seed)),
        price_cents,
        cost_cents: price_cents * cost_pct / 100,
        stock_quantity: 20 + (seed % 101) as i64,
        min_stock_level: 5,
        category_id: Some(category.to_string()),
    }
}
