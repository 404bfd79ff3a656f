//! Catalog reads and staff writes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sf_core::catalog::{
    category_slug, product_slug, validate_prices, validate_stock, PageWindow, ProductSort,
};
use sf_core::ShopError;
use sf_schemas::{Category, Money, Product};
use sqlx::PgPool;

use crate::rows::{category_from_row, product_from_row, CATEGORY_COLUMNS, PRODUCT_COLUMNS};
use crate::{is_foreign_key_violation, is_unique_violation};

pub const RELATED_LIMIT: i64 = 4;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub banner_image: Option<String>,
}

pub async fn create_category(pool: &PgPool, new: &NewCategory) -> Result<Category> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(ShopError::validation("name", "this field is required").into());
    }
    let slug = category_slug(name, new.slug.as_deref())?;

    let sql = format!(
        "insert into categories (name, slug, description, banner_image) \
         values ($1, $2, $3, $4) returning {CATEGORY_COLUMNS}"
    );
    let res = sqlx::query(&sql)
        .bind(name)
        .bind(&slug)
        .bind(new.description.trim())
        .bind(&new.banner_image)
        .fetch_one(pool)
        .await;

    match res {
        Ok(row) => {
            let c = category_from_row(&row)?;
            tracing::info!(category_id = c.id, slug = %c.slug, "category created");
            Ok(c)
        }
        Err(e) if is_unique_violation(&e, "uq_categories_name") => {
            Err(ShopError::validation("name", "a category with this name exists").into())
        }
        Err(e) if is_unique_violation(&e, "uq_categories_slug") => {
            Err(ShopError::validation("slug", format!("slug {slug:?} is taken")).into())
        }
        Err(e) => Err(anyhow::Error::new(e).context("insert category failed")),
    }
}

/// All categories by name.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>> {
    let sql = format!("select {CATEGORY_COLUMNS} from categories order by name, id");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("list_categories failed")?;
    rows.iter().map(category_from_row).collect()
}

pub async fn fetch_category_by_slug(pool: &PgPool, slug: &str) -> Result<Category> {
    let sql = format!("select {CATEGORY_COLUMNS} from categories where slug = $1");
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("fetch_category_by_slug failed")?
        .ok_or_else(|| ShopError::not_found("category", slug))?;
    category_from_row(&row)
}

// ---------------------------------------------------------------------------
// Products: staff writes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub category_id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub discount_price: Option<Money>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Partial update. The slug never changes after creation. For the nullable
/// columns, `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub discount_price: Option<Option<Money>>,
    pub stock: Option<i32>,
    pub image: Option<Option<String>>,
    pub is_active: Option<bool>,
}

pub async fn create_product(pool: &PgPool, new: &NewProduct) -> Result<Product> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(ShopError::validation("name", "this field is required").into());
    }
    validate_prices(new.price, new.discount_price)?;
    validate_stock(new.stock)?;
    let slug = product_slug(name, new.category_id, new.slug.as_deref())?;

    let res = sqlx::query(
        r#"
        insert into products (
          category_id, name, slug, sku, short_description, description,
          price, discount_price, stock, image, is_active
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
        )
        returning id
        "#,
    )
    .bind(new.category_id)
    .bind(name)
    .bind(&slug)
    .bind(new.sku.trim())
    .bind(new.short_description.trim())
    .bind(new.description.trim())
    .bind(new.price.minor())
    .bind(new.discount_price.map(Money::minor))
    .bind(new.stock)
    .bind(&new.image)
    .bind(new.is_active)
    .fetch_one(pool)
    .await;

    let id: i64 = match res {
        Ok(row) => sqlx::Row::try_get(&row, "id")?,
        Err(e) if is_unique_violation(&e, "uq_products_slug") => {
            return Err(ShopError::validation("slug", format!("slug {slug:?} is taken")).into())
        }
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(ShopError::not_found("category", new.category_id).into())
        }
        Err(e) => return Err(anyhow::Error::new(e).context("insert product failed")),
    };

    tracing::info!(product_id = id, slug = %slug, "product created");
    fetch_product(pool, id).await
}

pub async fn update_product(pool: &PgPool, product_id: i64, patch: &ProductPatch) -> Result<Product> {
    let mut tx = pool.begin().await.context("begin update_product failed")?;

    let sql = format!("select {PRODUCT_COLUMNS} from products p where p.id = $1 for update");
    let row = sqlx::query(&sql)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock product failed")?
        .ok_or_else(|| ShopError::not_found("product", product_id))?;
    let mut p = product_from_row(&row)?;

    if let Some(v) = patch.category_id {
        p.category_id = v;
    }
    if let Some(v) = &patch.name {
        let v = v.trim();
        if v.is_empty() {
            return Err(ShopError::validation("name", "this field is required").into());
        }
        p.name = v.to_string();
    }
    if let Some(v) = &patch.sku {
        p.sku = v.trim().to_string();
    }
    if let Some(v) = &patch.short_description {
        p.short_description = v.trim().to_string();
    }
    if let Some(v) = &patch.description {
        p.description = v.trim().to_string();
    }
    if let Some(v) = patch.price {
        p.price = v;
    }
    if let Some(v) = patch.discount_price {
        p.discount_price = v;
    }
    if let Some(v) = patch.stock {
        p.stock = v;
    }
    if let Some(v) = &patch.image {
        p.image = v.clone();
    }
    if let Some(v) = patch.is_active {
        p.is_active = v;
    }

    validate_prices(p.price, p.discount_price)?;
    validate_stock(p.stock)?;

    let res = sqlx::query(
        r#"
        update products
        set category_id = $2,
            name = $3,
            sku = $4,
            short_description = $5,
            description = $6,
            price = $7,
            discount_price = $8,
            stock = $9,
            image = $10,
            is_active = $11
        where id = $1
        "#,
    )
    .bind(p.id)
    .bind(p.category_id)
    .bind(&p.name)
    .bind(&p.sku)
    .bind(&p.short_description)
    .bind(&p.description)
    .bind(p.price.minor())
    .bind(p.discount_price.map(Money::minor))
    .bind(p.stock)
    .bind(&p.image)
    .bind(p.is_active)
    .execute(&mut *tx)
    .await;

    match res {
        Ok(_) => {}
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(ShopError::not_found("category", p.category_id).into())
        }
        Err(e) => return Err(anyhow::Error::new(e).context("update product failed")),
    }

    tx.commit().await.context("commit update_product failed")?;
    tracing::info!(product_id, "product updated");
    Ok(p)
}

/// Refused with `ProductInUse` once any order line references the product.
pub async fn delete_product(pool: &PgPool, product_id: i64) -> Result<()> {
    let res = sqlx::query("delete from products where id = $1")
        .bind(product_id)
        .execute(pool)
        .await;

    match res {
        Ok(r) if r.rows_affected() == 0 => Err(ShopError::not_found("product", product_id).into()),
        Ok(_) => {
            tracing::info!(product_id, "product deleted");
            Ok(())
        }
        Err(e) if is_foreign_key_violation(&e) => Err(ShopError::ProductInUse(product_id).into()),
        Err(e) => Err(anyhow::Error::new(e).context("delete product failed")),
    }
}

// ---------------------------------------------------------------------------
// Products: reads
// ---------------------------------------------------------------------------

/// Any product, active or not.
pub async fn fetch_product(pool: &PgPool, product_id: i64) -> Result<Product> {
    let sql = format!("select {PRODUCT_COLUMNS} from products p where p.id = $1");
    let row = sqlx::query(&sql)
        .bind(product_id)
        .fetch_optional(pool)
        .await
        .context("fetch_product failed")?
        .ok_or_else(|| ShopError::not_found("product", product_id))?;
    product_from_row(&row)
}

/// Storefront detail: active products only.
pub async fn fetch_product_by_slug(pool: &PgPool, slug: &str) -> Result<Product> {
    let sql = format!("select {PRODUCT_COLUMNS} from products p where p.slug = $1 and p.is_active");
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("fetch_product_by_slug failed")?
        .ok_or_else(|| ShopError::not_found("product", slug))?;
    product_from_row(&row)
}

/// Up to [`RELATED_LIMIT`] other active products from the same category.
pub async fn related_products(pool: &PgPool, product: &Product) -> Result<Vec<Product>> {
    let sql = format!(
        "select {PRODUCT_COLUMNS} from products p \
         where p.category_id = $1 and p.id <> $2 and p.is_active \
         order by p.created_at desc, p.id desc limit $3"
    );
    let rows = sqlx::query(&sql)
        .bind(product.category_id)
        .bind(product.id)
        .bind(RELATED_LIMIT)
        .fetch_all(pool)
        .await
        .context("related_products failed")?;
    rows.iter().map(product_from_row).collect()
}

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category_slug: Option<String>,
    pub search: Option<String>,
    pub sort: ProductSort,
    /// Raw page parameter; clamped by [`PageWindow::resolve`].
    pub page: Option<String>,
    pub per_page: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub category: Option<Category>,
    pub products: Vec<Product>,
    pub window: PageWindow,
}

fn order_by(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => "p.created_at desc, p.id desc",
        ProductSort::NameAsc => "p.name asc, p.id asc",
        ProductSort::NameDesc => "p.name desc, p.id desc",
        ProductSort::PriceLow => "coalesce(nullif(p.discount_price, 0), p.price) asc, p.id asc",
        ProductSort::PriceHigh => "coalesce(nullif(p.discount_price, 0), p.price) desc, p.id desc",
    }
}

/// `%`, `_` and `\` match literally in the search term.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Active products, filtered, sorted and paged.
pub async fn list_products(pool: &PgPool, q: &ProductQuery) -> Result<ProductPage> {
    let category = match q.category_slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => Some(fetch_category_by_slug(pool, slug).await?),
        None => None,
    };
    let category_id = category.as_ref().map(|c| c.id);
    let pattern = q
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    let filter = "p.is_active \
                  and ($1::bigint is null or p.category_id = $1) \
                  and ($2::text is null or p.name ilike $2)";

    let count_sql = format!("select count(*)::bigint from products p where {filter}");
    let (total,): (i64,) = sqlx::query_as(&count_sql)
        .bind(category_id)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("count products failed")?;

    let window = PageWindow::resolve(q.page.as_deref(), q.per_page, total);

    let sql = format!(
        "select {PRODUCT_COLUMNS} from products p where {filter} \
         order by {} limit $3 offset $4",
        order_by(q.sort)
    );
    let rows = sqlx::query(&sql)
        .bind(category_id)
        .bind(&pattern)
        .bind(window.per_page)
        .bind(window.offset())
        .fetch_all(pool)
        .await
        .context("list_products failed")?;

    Ok(ProductPage {
        category,
        products: rows.iter().map(product_from_row).collect::<Result<_>>()?,
        window,
    })
}
