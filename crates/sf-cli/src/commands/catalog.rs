//! `sf catalog import`: seed categories and products from a JSON file.
//!
//! File shape:
//! ```json
//! {
//!   "categories": [{ "name": "Home Decor", "description": "..." }],
//!   "products": [{ "category": "home-decor", "name": "Brass Lamp", "price": "899.00", "stock": 10 }]
//! }
//! ```
//! A product names its category by slug; every other field is a product
//! field. Rows whose slug already exists are skipped, so re-running an
//! import is harmless.

use std::fs;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use sf_core::catalog::{category_slug, product_slug, validate_prices, validate_stock};
use sf_core::ShopError;
use sf_db::catalog::{NewCategory, NewProduct};

#[derive(Debug, Deserialize)]
struct ImportFile {
    #[serde(default)]
    categories: Vec<NewCategory>,
    #[serde(default)]
    products: Vec<Map<String, Value>>,
}

/// A product row split into its category slug and the product fields.
struct ImportProduct {
    category: String,
    fields: Map<String, Value>,
}

impl ImportProduct {
    fn from_row(index: usize, mut row: Map<String, Value>) -> Result<Self> {
        let category = match row.remove("category") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(anyhow!("products[{index}]: \"category\" (slug) is required")),
        };
        Ok(Self { category, fields: row })
    }

    fn with_category_id(&self, index: usize, category_id: i64) -> Result<NewProduct> {
        let mut fields = self.fields.clone();
        fields.insert("category_id".to_string(), Value::from(category_id));
        serde_json::from_value(Value::Object(fields))
            .with_context(|| format!("products[{index}] does not match the product schema"))
    }
}

fn read_file(path: &str) -> Result<(Vec<NewCategory>, Vec<ImportProduct>)> {
    let bytes = fs::read(path).with_context(|| format!("read import file failed: {}", path))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let file: ImportFile = serde_json::from_slice(bytes).context("import file must be valid JSON")?;

    let products = file
        .products
        .into_iter()
        .enumerate()
        .map(|(i, row)| ImportProduct::from_row(i, row))
        .collect::<Result<Vec<_>>>()?;
    Ok((file.categories, products))
}

/// Everything that can be checked without a database.
fn validate(categories: &[NewCategory], products: &[ImportProduct]) -> Result<()> {
    for (i, c) in categories.iter().enumerate() {
        if c.name.trim().is_empty() {
            return Err(anyhow!("categories[{i}]: name is required"));
        }
        category_slug(&c.name, c.slug.as_deref()).with_context(|| format!("categories[{i}]"))?;
    }
    for (i, p) in products.iter().enumerate() {
        // Placeholder id; the real one is looked up at import time.
        let np = p.with_category_id(i, 0)?;
        if np.name.trim().is_empty() {
            return Err(anyhow!("products[{i}]: name is required"));
        }
        validate_prices(np.price, np.discount_price).with_context(|| format!("products[{i}]"))?;
        validate_stock(np.stock).with_context(|| format!("products[{i}]"))?;
        product_slug(&np.name, 0, np.slug.as_deref()).with_context(|| format!("products[{i}]"))?;
    }
    Ok(())
}

fn is_slug_taken(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ShopError>(),
        Some(ShopError::Validation { field: "slug" | "name", .. })
    )
}

pub async fn import(config_paths: &[String], path: &str, dry_run: bool) -> Result<()> {
    let (categories, products) = read_file(path)?;
    validate(&categories, &products)?;

    if dry_run {
        println!(
            "import_ok=true dry_run=true categories={} products={}",
            categories.len(),
            products.len()
        );
        return Ok(());
    }

    let (pool, _) = super::connect(config_paths).await?;

    let mut created_categories = 0usize;
    let mut skipped_categories = 0usize;
    for c in &categories {
        match sf_db::catalog::create_category(&pool, c).await {
            Ok(_) => created_categories += 1,
            Err(e) if is_slug_taken(&e) => {
                tracing::info!(name = %c.name, "category exists; skipped");
                skipped_categories += 1;
            }
            Err(e) => return Err(e),
        }
    }

    let mut created_products = 0usize;
    let mut skipped_products = 0usize;
    for (i, p) in products.iter().enumerate() {
        let category = sf_db::catalog::fetch_category_by_slug(&pool, &p.category)
            .await
            .with_context(|| format!("products[{i}]"))?;
        let np = p.with_category_id(i, category.id)?;
        match sf_db::catalog::create_product(&pool, &np).await {
            Ok(_) => created_products += 1,
            Err(e) if is_slug_taken(&e) => {
                tracing::info!(name = %np.name, "product exists; skipped");
                skipped_products += 1;
            }
            Err(e) => return Err(e),
        }
    }

    println!(
        "import_ok=true dry_run=false categories_created={} categories_skipped={} products_created={} products_skipped={}",
        created_categories, skipped_categories, created_products, skipped_products
    );
    Ok(())
}
