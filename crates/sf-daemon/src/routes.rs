//! Axum router and all HTTP handlers for sf-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Every handler checks identity and parses its input
//! before it touches storage, so refusals never cost a connection.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sf_core::cart::{add_quantity, quantity_change, CartView};
use sf_core::catalog::{effective_price, ProductSort};
use sf_core::checkout::validate_shipping;
use sf_core::identity::{
    authorize_login_merge, can_view_order, require_staff, require_user, resolve_owner, ResolvedOwner,
};
use sf_core::orders::{DateRange, OrderFilter};
use sf_core::ShopError;
use sf_db::catalog::{NewCategory, NewProduct, ProductQuery};
use sf_schemas::{CartOwner, Identity, ShippingDetails};
use tracing::info;

use crate::{
    api_types::{
        required_int, CartAddForm, CartCountResponse, CartMutationResponse, CartRemoveForm,
        CartResponse, CartUpdateForm, CheckoutForm, DateRangeParams, HealthResponse, LoginEvent,
        OrderListResponse, ProductDetailResponse, ProductListParams, ProductPatchRequest,
        StaffOrderParams, StatusForm, TrackingForm,
    },
    error::ApiError,
    extract::{ApiForm, ApiJson, ApiPath, ApiQuery},
    identity::{mint_session_key, session_cookie_header, Caller},
    state::{uptime_secs, AppState},
};

type ApiResult<T = Response> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        // catalog
        .route("/categories/", get(categories))
        .route("/products/", get(products))
        .route("/category/:slug/", get(category_products))
        .route("/product/:slug/", get(product_detail))
        // cart
        .route("/cart/", get(cart_view))
        .route("/cart/count", get(cart_count))
        .route("/cart/add", post(cart_add))
        .route("/cart/update", post(cart_update))
        .route("/cart/remove", post(cart_remove))
        .route("/session/login", post(session_login))
        // orders
        .route("/checkout/", post(checkout))
        .route("/order/:id/", get(order_detail))
        .route("/my-orders/", get(my_orders))
        .route("/my-orders/:id/", get(my_order_detail))
        // staff
        .route("/owner/orders/", get(staff_orders))
        .route("/owner/order/:id/status/", post(staff_set_status))
        .route("/owner/order/:id/tracking/", post(staff_update_tracking))
        .route("/owner/categories/", post(staff_create_category))
        .route("/owner/products/", post(staff_create_product))
        .route("/owner/product/:id/", post(staff_update_product))
        .route("/owner/product/:id/delete", post(staff_delete_product))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub(crate) async fn categories(State(st): State<Arc<AppState>>) -> ApiResult {
    let cats = sf_db::catalog::list_categories(&st.pool).await?;
    Ok(Json(cats).into_response())
}

fn product_query(st: &AppState, category_slug: Option<String>, p: ProductListParams) -> ProductQuery {
    ProductQuery {
        category_slug,
        search: p.q,
        sort: ProductSort::parse(p.sort.as_deref()),
        page: p.page,
        per_page: st.page_size(),
    }
}

pub(crate) async fn products(
    State(st): State<Arc<AppState>>,
    ApiQuery(mut p): ApiQuery<ProductListParams>,
) -> ApiResult {
    let category = p.category.take();
    let page = sf_db::catalog::list_products(&st.pool, &product_query(&st, category, p)).await?;
    Ok(Json(page).into_response())
}

pub(crate) async fn category_products(
    State(st): State<Arc<AppState>>,
    ApiPath(slug): ApiPath<String>,
    ApiQuery(p): ApiQuery<ProductListParams>,
) -> ApiResult {
    let page = sf_db::catalog::list_products(&st.pool, &product_query(&st, Some(slug), p)).await?;
    Ok(Json(page).into_response())
}

pub(crate) async fn product_detail(State(st): State<Arc<AppState>>, ApiPath(slug): ApiPath<String>) -> ApiResult {
    let product = sf_db::catalog::fetch_product_by_slug(&st.pool, &slug).await?;
    let related = sf_db::catalog::related_products(&st.pool, &product).await?;
    Ok(Json(ProductDetailResponse {
        effective_price: effective_price(product.price, product.discount_price),
        product,
        related,
    })
    .into_response())
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

/// The caller's cart, minting a session for a first-time anonymous browser.
async fn caller_cart(st: &AppState, identity: &Identity) -> ApiResult<(i64, Option<String>)> {
    let ResolvedOwner { owner, minted_session } = resolve_owner(identity, mint_session_key);
    let cart_id = sf_db::cart::resolve_cart(&st.pool, &owner).await?;
    Ok((cart_id, minted_session))
}

/// Attach `Set-Cookie` when a session was minted for this request.
fn with_session(st: &AppState, minted: Option<String>, body: impl IntoResponse) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(v) = minted
        .as_deref()
        .and_then(|key| session_cookie_header(st.session_cookie(), key))
    {
        headers.insert(header::SET_COOKIE, v);
    }
    (headers, body).into_response()
}

fn mutation_response(view: &CartView, sub: Option<sf_schemas::Money>) -> Json<CartMutationResponse> {
    Json(CartMutationResponse {
        success: true,
        cart_count: view.count(),
        total: view.total(),
        sub,
    })
}

pub(crate) async fn cart_view(State(st): State<Arc<AppState>>, Caller(identity): Caller) -> ApiResult {
    let (cart_id, minted) = caller_cart(&st, &identity).await?;
    let view = sf_db::cart::load_cart(&st.pool, cart_id).await?;
    Ok(with_session(&st, minted, Json(CartResponse::from(view))))
}

/// Header badge count. A browser with no session has nothing in a cart, so
/// no cart or session is created here.
pub(crate) async fn cart_count(State(st): State<Arc<AppState>>, Caller(identity): Caller) -> ApiResult {
    let owner = match (identity.user_id, identity.session_key) {
        (Some(user_id), _) => CartOwner::User(user_id),
        (None, Some(key)) => CartOwner::Session(key),
        (None, None) => return Ok(Json(CartCountResponse { cart_count: 0 }).into_response()),
    };
    let cart_id = sf_db::cart::resolve_cart(&st.pool, &owner).await?;
    let cart_count = sf_db::cart::cart_count(&st.pool, cart_id).await?;
    Ok(Json(CartCountResponse { cart_count }).into_response())
}

pub(crate) async fn cart_add(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiForm(form): ApiForm<CartAddForm>,
) -> ApiResult {
    let product_id = required_int("product_id", form.product_id.as_deref())?;
    let quantity = add_quantity(
        crate::api_types::form_int("quantity", form.quantity.as_deref())?.unwrap_or(1),
    )?;

    let (cart_id, minted) = caller_cart(&st, &identity).await?;
    let view = sf_db::cart::cart_add(&st.pool, cart_id, product_id, quantity).await?;
    info!(cart_id, product_id, quantity, "cart line added");
    Ok(with_session(&st, minted, mutation_response(&view, None)))
}

pub(crate) async fn cart_update(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiForm(form): ApiForm<CartUpdateForm>,
) -> ApiResult {
    let item_id = required_int("item_id", form.item_id.as_deref())?;
    let change = quantity_change(required_int("quantity", form.quantity.as_deref())?)?;

    let (cart_id, minted) = caller_cart(&st, &identity).await?;
    let view = sf_db::cart::cart_update(&st.pool, cart_id, item_id, change).await?;
    let sub = view.line(item_id).map(|l| l.subtotal());
    Ok(with_session(&st, minted, mutation_response(&view, sub)))
}

pub(crate) async fn cart_remove(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiForm(form): ApiForm<CartRemoveForm>,
) -> ApiResult {
    let item_id = required_int("item_id", form.item_id.as_deref())?;

    let (cart_id, minted) = caller_cart(&st, &identity).await?;
    let view = sf_db::cart::cart_remove(&st.pool, cart_id, item_id).await?;
    Ok(with_session(&st, minted, mutation_response(&view, None)))
}

/// Fired by the auth collaborator once a browser session becomes a user. The
/// request must carry that user's identity and that browser's session cookie.
pub(crate) async fn session_login(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiJson(ev): ApiJson<LoginEvent>,
) -> ApiResult {
    let key = authorize_login_merge(&identity, ev.user_id, &ev.session_key)?;
    let summary = sf_db::cart::merge_on_login(&st.pool, key, ev.user_id).await?;
    Ok(Json(summary).into_response())
}

// ---------------------------------------------------------------------------
// Checkout and customer orders
// ---------------------------------------------------------------------------

pub(crate) async fn checkout(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiForm(form): ApiForm<CheckoutForm>,
) -> ApiResult {
    let user_id = require_user(&identity)?;
    let shipping = validate_shipping(&ShippingDetails::from(form))?;

    let cart_id = sf_db::cart::resolve_cart(&st.pool, &CartOwner::User(user_id)).await?;
    let placed = sf_db::checkout::checkout(
        &st.pool,
        cart_id,
        Some(user_id),
        &shipping,
        st.config.checkout.stock_policy,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(placed)).into_response())
}

pub(crate) async fn order_detail(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiPath(order_id): ApiPath<i64>,
) -> ApiResult {
    require_user(&identity)?;
    let detail = sf_db::orders::fetch_order_detail(&st.pool, order_id).await?;
    can_view_order(&identity, detail.order.user_id)?;
    Ok(Json(detail).into_response())
}

pub(crate) async fn my_orders(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiQuery(p): ApiQuery<DateRangeParams>,
) -> ApiResult {
    let user_id = require_user(&identity)?;
    let range = DateRange::or_last_days(
        p.start_date.as_deref(),
        p.end_date.as_deref(),
        Utc::now().date_naive(),
        u64::from(st.config.orders.my_orders_default_days),
    );
    let orders = sf_db::orders::list_orders_for_user(&st.pool, user_id, range).await?;
    Ok(Json(OrderListResponse {
        orders,
        range: Some(range),
    })
    .into_response())
}

/// Customer view of one order. Someone else's order does not exist here,
/// even for staff; staff use `/order/:id/`.
pub(crate) async fn my_order_detail(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiPath(order_id): ApiPath<i64>,
) -> ApiResult {
    let user_id = require_user(&identity)?;
    let detail = sf_db::orders::fetch_order_detail(&st.pool, order_id).await?;
    if detail.order.user_id != Some(user_id) {
        return Err(ShopError::not_found("order", order_id).into());
    }
    Ok(Json(detail).into_response())
}

// ---------------------------------------------------------------------------
// Staff: orders
// ---------------------------------------------------------------------------

pub(crate) async fn staff_orders(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiQuery(p): ApiQuery<StaffOrderParams>,
) -> ApiResult {
    require_staff(&identity)?;
    let filter = OrderFilter::from_query(
        p.status.as_deref(),
        p.start_date.as_deref(),
        p.end_date.as_deref(),
    )?;
    let orders = sf_db::orders::list_orders(&st.pool, &filter).await?;
    Ok(Json(OrderListResponse {
        orders,
        range: filter.range,
    })
    .into_response())
}

pub(crate) async fn staff_set_status(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiPath(order_id): ApiPath<i64>,
    ApiForm(form): ApiForm<StatusForm>,
) -> ApiResult {
    let actor = require_staff(&identity)?;
    let change = sf_db::orders::set_order_status(
        &st.pool,
        order_id,
        form.status.as_deref().unwrap_or_default(),
        form.note.as_deref(),
        Some(actor),
        st.config.orders.transition_policy,
    )
    .await?;
    Ok(Json(change).into_response())
}

pub(crate) async fn staff_update_tracking(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiPath(order_id): ApiPath<i64>,
    ApiForm(form): ApiForm<TrackingForm>,
) -> ApiResult {
    require_staff(&identity)?;
    let patch = form.into_patch()?;
    let tracking = sf_db::orders::update_tracking_details(&st.pool, order_id, &patch).await?;
    Ok(Json(tracking).into_response())
}

// ---------------------------------------------------------------------------
// Staff: catalog
// ---------------------------------------------------------------------------

pub(crate) async fn staff_create_category(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiJson(new): ApiJson<NewCategory>,
) -> ApiResult {
    require_staff(&identity)?;
    let cat = sf_db::catalog::create_category(&st.pool, &new).await?;
    Ok((StatusCode::CREATED, Json(cat)).into_response())
}

pub(crate) async fn staff_create_product(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiJson(new): ApiJson<NewProduct>,
) -> ApiResult {
    require_staff(&identity)?;
    let product = sf_db::catalog::create_product(&st.pool, &new).await?;
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

pub(crate) async fn staff_update_product(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiPath(product_id): ApiPath<i64>,
    ApiJson(req): ApiJson<ProductPatchRequest>,
) -> ApiResult {
    require_staff(&identity)?;
    let product = sf_db::catalog::update_product(&st.pool, product_id, &req.into_patch()).await?;
    Ok(Json(product).into_response())
}

pub(crate) async fn staff_delete_product(
    State(st): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiPath(product_id): ApiPath<i64>,
) -> ApiResult {
    require_staff(&identity)?;
    sf_db::catalog::delete_product(&st.pool, product_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
