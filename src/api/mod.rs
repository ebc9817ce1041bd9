//! HTTP API over per-session carts.

pub mod error;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::Catalog;
use crate::domain::aggregates::{
    whatsapp_url, CartStore, CheckoutError, CustomerDetails, LineItem, ModifierChoice, OrderSummary, Product,
};
use crate::domain::value_objects::{Price, Quantity};
use crate::storage::JsonFileStorage;
pub use error::ApiError;

const MAX_SESSION_LEN: usize = 64;
const MAX_OPEN_CARTS: usize = 10_000;

type SessionCart = CartStore<JsonFileStorage>;
type SessionSlot = Arc<Mutex<Option<SessionCart>>>;

/// Carts held in memory, keyed by session id and backed by `{dir}/{session}.json`.
///
/// A cart stays cached only while it has items or an open drawer. Carts are
/// written through on every change, so anything evicted reopens from disk.
#[derive(Debug)]
pub struct CartSessions {
    dir: PathBuf,
    capacity: usize,
    carts: Mutex<HashMap<String, SessionSlot>>,
}

impl CartSessions {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self::with_capacity(dir, MAX_OPEN_CARTS) }

    /// Past `capacity` cached carts, idle ones are dropped before caching another.
    pub fn with_capacity(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self { dir: dir.into(), capacity: capacity.max(1), carts: Mutex::new(HashMap::new()) }
    }

    /// Number of carts currently held in memory.
    pub fn open_carts(&self) -> usize { self.carts.lock().unwrap_or_else(|e| e.into_inner()).len() }

    /// Runs `f` against the session's cart on the blocking pool, opening it on first use.
    ///
    /// Requests for one session are serialized; other sessions are not blocked.
    pub async fn with_cart<R, F>(&self, session: &str, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut SessionCart) -> R + Send + 'static,
        R: Send + 'static,
    {
        if !is_valid_session(session) {
            return Err(ApiError::BadRequest(format!("invalid session id: {session}")));
        }
        let slot = self.slot(session)?;
        let task_slot = Arc::clone(&slot);
        let path = self.dir.join(format!("{session}.json"));
        let name = session.to_string();

        let (result, retained) = tokio::task::spawn_blocking(move || {
            let mut guard = task_slot.lock().unwrap_or_else(|e| e.into_inner());
            let cart = guard.get_or_insert_with(|| {
                tracing::debug!(session = %name, "opening cart");
                CartStore::open(JsonFileStorage::new(path))
            });
            let result = f(cart);
            for event in cart.take_events() {
                tracing::info!(session = %name, ?event, "cart event");
            }
            let retained = !cart.is_empty() || cart.is_open();
            if !retained {
                *guard = None;
            }
            (result, retained)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("cart task failed: {e}")))?;

        if !retained {
            self.release(session, slot);
        }
        Ok(result)
    }

    fn slot(&self, session: &str) -> Result<SessionSlot, ApiError> {
        let mut carts = self.carts.lock().map_err(|_| ApiError::Internal("cart sessions lock poisoned".into()))?;
        if let Some(slot) = carts.get(session) {
            return Ok(Arc::clone(slot));
        }
        if carts.len() >= self.capacity {
            let before = carts.len();
            carts.retain(|_, slot| Arc::strong_count(slot) > 1);
            tracing::info!(evicted = before - carts.len(), remaining = carts.len(), "evicted idle carts");
        }
        Ok(Arc::clone(carts.entry(session.to_string()).or_default()))
    }

    /// Forgets the session unless another request still holds its slot.
    fn release(&self, session: &str, slot: SessionSlot) {
        let Ok(mut carts) = self.carts.lock() else { return };
        let idle = carts.get(session).is_some_and(|held| Arc::ptr_eq(held, &slot)) && Arc::strong_count(&slot) == 2;
        if idle && slot.lock().is_ok_and(|cart| cart.is_none()) {
            carts.remove(session);
        }
    }
}

fn is_valid_session(session: &str) -> bool {
    !session.is_empty()
        && session.len() <= MAX_SESSION_LEN
        && session.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub carts: Arc<CartSessions>,
    pub whatsapp_number: Arc<str>,
}

impl AppState {
    pub fn new(catalog: Catalog, carts: CartSessions, whatsapp_number: &str) -> Self {
        Self { catalog: Arc::new(catalog), carts: Arc::new(carts), whatsapp_number: whatsapp_number.into() }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "ezpods-storefront"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/cart/:session", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items", post(add_item))
        .route("/api/v1/cart/:session/items/:item_id", put(update_quantity).delete(remove_item))
        .route("/api/v1/cart/:session/toggle", post(toggle_cart))
        .route("/api/v1/cart/:session/checkout", post(checkout))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub total_items: u64,
    pub total_price: Price,
    pub is_open: bool,
}

impl CartView {
    fn of(cart: &SessionCart) -> Self {
        Self { items: cart.items().to_vec(), total_items: cart.total_items(), total_price: cart.total_price(), is_open: cart.is_open() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default, deserialize_with = "choices_or_empty")]
    pub modifiers: Vec<ModifierChoice>,
    #[serde(default)]
    pub quantity: Quantity,
}

/// Anything other than an array counts as "no modifiers".
fn choices_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ModifierChoice>, D::Error> {
    match Value::deserialize(deserializer)? {
        v @ Value::Array(_) => serde_json::from_value(v).map_err(serde::de::Error::custom),
        _ => Ok(vec![]),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest { pub quantity: i64 }

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest { pub open: Option<bool> }

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order: OrderSummary,
    pub description: String,
    pub message: String,
    pub whatsapp_url: String,
}

async fn list_products(State(s): State<AppState>) -> Json<Vec<Product>> {
    Json(s.catalog.visible_products().cloned().collect())
}

async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>, ApiError> {
    s.catalog.product(&id).cloned().map(Json).ok_or(ApiError::NotFound(format!("product {id}")))
}

async fn create_session() -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(serde_json::json!({ "sessionId": Uuid::now_v7().to_string() })))
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<CartView>, ApiError> {
    s.carts.with_cart(&session, |cart| Json(CartView::of(cart))).await
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<CartView>, ApiError> {
    s.carts.with_cart(&session, |cart| {
        cart.clear_cart();
        Json(CartView::of(cart))
    })
    .await
}

async fn add_item(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddItemRequest>) -> Result<Json<CartView>, ApiError> {
    let product = s.catalog.product(&r.product_id).ok_or_else(|| ApiError::NotFound(format!("product {}", r.product_id)))?;
    if r.quantity.is_zero() {
        return Err(ApiError::BadRequest("quantity must be at least 1".into()));
    }
    product.validate_selection(&r.modifiers)?;
    let product = product.clone();
    s.carts.with_cart(&session, move |cart| {
        cart.add_item(&product, &r.modifiers, r.quantity.value());
        Json(CartView::of(cart))
    })
    .await
}

async fn update_quantity(
    State(s): State<AppState>,
    Path((session, item_id)): Path<(String, String)>,
    Json(r): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let quantity = u32::try_from(r.quantity.max(0)).unwrap_or(u32::MAX);
    s.carts.with_cart(&session, move |cart| {
        cart.update_quantity(&item_id, quantity);
        Json(CartView::of(cart))
    })
    .await
}

async fn remove_item(State(s): State<AppState>, Path((session, item_id)): Path<(String, String)>) -> Result<Json<CartView>, ApiError> {
    s.carts.with_cart(&session, move |cart| {
        cart.remove_item(&item_id);
        Json(CartView::of(cart))
    })
    .await
}

async fn toggle_cart(State(s): State<AppState>, Path(session): Path<String>, body: Option<Json<ToggleRequest>>) -> Result<Json<CartView>, ApiError> {
    let open = body.and_then(|Json(r)| r.open);
    s.carts.with_cart(&session, move |cart| {
        cart.toggle_cart(open);
        Json(CartView::of(cart))
    })
    .await
}

async fn checkout(State(s): State<AppState>, Path(session): Path<String>, Json(customer): Json<CustomerDetails>) -> Result<Json<CheckoutResponse>, ApiError> {
    customer.validate().map_err(CheckoutError::from)?;
    let order = s.carts.with_cart(&session, |cart| {
        let order = OrderSummary::from_cart(cart)?;
        cart.clear_cart();
        cart.toggle_cart(Some(false));
        Ok::<_, CheckoutError>(order)
    })
    .await??;
    tracing::info!(session = %session, order_id = %order.order_id, total = %order.total, "order placed");
    let message = order.cart_message();
    Ok(Json(CheckoutResponse {
        description: order.description(),
        whatsapp_url: whatsapp_url(&s.whatsapp_number, &message),
        message,
        order,
    }))
}
