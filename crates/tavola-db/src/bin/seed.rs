//! # Menu Seeder
//!
//! Populates the database with a sample menu for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tavola.db
//! cargo run -p tavola-db --bin seed
//!
//! # Specify database path
//! cargo run -p tavola-db --bin seed -- --db ./data/tavola.db
//! ```
//!
//! Every dish gets a price derived from its position so repeated runs on
//! fresh databases produce the same menu.

use std::env;
use tavola_core::{NewCategory, NewProduct};
use tavola_db::{Database, DbConfig};

/// Categories with their dishes and base prices in cents.
const MENU: &[(&str, &[(&str, &str, i64)])] = &[
    (
        "Antipasti",
        &[
            ("Bruschetta", "Grilled bread, tomatoes, basil", 690),
            ("Caprese", "Mozzarella, tomatoes, olive oil", 890),
            ("Arancini", "Fried risotto balls with ragù", 790),
            ("Carpaccio", "Thin sliced beef, rocket, parmesan", 1290),
        ],
    ),
    (
        "Pizza",
        &[
            ("Margherita", "Tomato, mozzarella, basil", 1250),
            ("Marinara", "Tomato, garlic, oregano", 990),
            ("Diavola", "Spicy salami, chili", 1490),
            ("Quattro Formaggi", "Four cheeses", 1590),
            ("Capricciosa", "Ham, mushrooms, artichokes, olives", 1550),
        ],
    ),
    (
        "Pasta",
        &[
            ("Carbonara", "Guanciale, egg yolk, pecorino", 1390),
            ("Cacio e Pepe", "Pecorino, black pepper", 1190),
            ("Amatriciana", "Guanciale, tomato, pecorino", 1350),
            ("Lasagna", "Baked layers with ragù and béchamel", 1450),
        ],
    ),
    (
        "Dolci",
        &[
            ("Tiramisù", "Mascarpone, espresso, cocoa", 690),
            ("Panna Cotta", "Vanilla cream with berries", 590),
            ("Cannoli", "Ricotta-filled pastry shells", 650),
        ],
    ),
    (
        "Bevande",
        &[
            ("Acqua Minerale", "Still or sparkling, 0.5l", 250),
            ("Limonata", "Homemade lemonade", 390),
            ("Espresso", "Single shot", 220),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tavola.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tavola Menu Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tavola.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tavola Menu Seeder");
    println!("==================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut session = db.begin().await?;

    let existing = session.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut generated = 0;
    for (category_name, dishes) in MENU {
        let category = session
            .categories()
            .create(&NewCategory {
                name: category_name.to_string(),
            })
            .await?;

        for (name, summary, price_cents) in dishes.iter() {
            let product = NewProduct {
                name: name.to_string(),
                summary: summary.to_string(),
                price_cents: *price_cents,
                category_id: category.id,
                picture_data: None,
            };
            session.products().create(&product, None).await?;
            generated += 1;
        }

        println!("  {}: {} dishes", category.name, dishes.len());
    }

    session.commit().await?;

    println!();
    println!("✓ Seeded {} categories and {} products", MENU.len(), generated);

    Ok(())
}
