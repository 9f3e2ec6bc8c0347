//! REST router over the exchange.
//!
//! One [`Exchange`] per process behind a mutex: the lock is the sequencing
//! layer that gives every call its place in the single total order. Used by
//! the binary and by integration tests; create with [`create_router`].
//! Uses Extension for state so the router is `Router<()>` and works with
//! `into_make_service()`.

use axum::{
    extract::{Extension, Path, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::{Arc, Mutex};

use crate::auth::{require_admin, require_api_key_or_anonymous, AuthConfig, AuthUser};
use crate::engine::Exchange;
use crate::error::ExchangeError;
use crate::types::{AccountId, AssetId, Order, OrderId, Side};

/// Shared app state: one exchange per process.
#[derive(Clone)]
pub struct AppState {
    pub(crate) exchange: Arc<Mutex<Exchange>>,
}

/// Builds the REST router around a fresh exchange.
pub fn create_router(auth: AuthConfig) -> Router<()> {
    create_router_with(Exchange::new(), auth)
}

/// Builds the REST router around an existing exchange (e.g. restored from a
/// snapshot). Returns `Router<()>` so you can call `.into_make_service()`.
pub fn create_router_with(exchange: Exchange, auth: AuthConfig) -> Router<()> {
    let state = AppState {
        exchange: Arc::new(Mutex::new(exchange)),
    };
    Router::new()
        .route("/health", get(health))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/orders", post(create_order))
        .route("/orders/cancel", post(cancel_order))
        .route("/orders/:asset/:id", get(get_order))
        .route("/markets/:asset", get(get_market))
        .route("/balances/:asset/:account", get(get_balance))
        .route("/admin/fees", post(set_fees))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            let config = auth.clone();
            async move { require_api_key_or_anonymous(req, next, config).await }
        }))
        .layer(Extension(state))
}

fn status_for(error: ExchangeError) -> StatusCode {
    match error {
        ExchangeError::InvalidOrder
        | ExchangeError::InsufficientBalance
        | ExchangeError::AmountOverflow => StatusCode::BAD_REQUEST,
        ExchangeError::Unauthorized => StatusCode::FORBIDDEN,
        ExchangeError::OrderNotFound | ExchangeError::InvalidMarket => StatusCode::NOT_FOUND,
    }
}

fn error_response(error: ExchangeError) -> Response {
    (
        status_for(error),
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(serde::Deserialize)]
struct FundsRequest {
    asset: u64,
    amount: u64,
}

async fn deposit(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<FundsRequest>,
) -> Response {
    let mut guard = state.exchange.lock().expect("lock");
    match guard.deposit(AssetId(body.asset), auth.account, body.amount) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "deposited": body.amount })))
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn withdraw(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<FundsRequest>,
) -> Response {
    let mut guard = state.exchange.lock().expect("lock");
    match guard.withdraw(AssetId(body.asset), auth.account, body.amount) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "withdrawn": body.amount })))
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(serde::Deserialize)]
struct OrderRequest {
    asset: u64,
    amount: u64,
    price: u64,
    sell: bool,
}

async fn create_order(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<OrderRequest>,
) -> Response {
    let side = if body.sell { Side::Sell } else { Side::Buy };
    let mut guard = state.exchange.lock().expect("lock");
    match guard.create_order(AssetId(body.asset), auth.account, body.amount, body.price, side) {
        Ok(id) => (StatusCode::OK, Json(serde_json::json!({ "order_id": id.0 }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(serde::Deserialize)]
struct CancelRequest {
    asset: u64,
    order_id: u64,
}

async fn cancel_order(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CancelRequest>,
) -> Response {
    let mut guard = state.exchange.lock().expect("lock");
    match guard.cancel_order(AssetId(body.asset), auth.account, OrderId(body.order_id)) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "canceled": true }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// Resting-order view returned to clients: `sell` flag instead of a side
/// enum, `amount` is the unfilled remainder.
#[derive(serde::Serialize)]
struct OrderView {
    owner: u64,
    amount: u64,
    price: u64,
    prev: u64,
    next: u64,
    sell: bool,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            owner: order.owner.0,
            amount: order.remaining,
            price: order.price,
            prev: order.prev.0,
            next: order.next.0,
            sell: order.side.is_sell(),
        }
    }
}

async fn get_order(
    Extension(state): Extension<AppState>,
    Path((asset, id)): Path<(u64, u64)>,
) -> Response {
    let guard = state.exchange.lock().expect("lock");
    match guard.get_order(AssetId(asset), OrderId(id)) {
        Ok(order) => (StatusCode::OK, Json(OrderView::from(order))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_market(
    Extension(state): Extension<AppState>,
    Path(asset): Path<u64>,
) -> Response {
    let guard = state.exchange.lock().expect("lock");
    match guard.get_market_info(AssetId(asset)) {
        Ok(info) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "best_bid": info.best_bid.0,
                "best_ask": info.best_ask.0,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_balance(
    Extension(state): Extension<AppState>,
    Path((asset, account)): Path<(u64, u64)>,
) -> Response {
    let guard = state.exchange.lock().expect("lock");
    let balance = guard.get_balance(AssetId(asset), AccountId(account));
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "available": balance.available,
            "reserved": balance.reserved,
        })),
    )
        .into_response()
}

#[derive(serde::Deserialize)]
struct FeesRequest {
    maker_rate: u64,
    taker_rate: u64,
    withdraw_rate: u64,
    maker_rebate: bool,
    collector: u64,
}

async fn set_fees(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<FeesRequest>,
) -> Response {
    if let Err(forbidden) = require_admin(&auth) {
        return forbidden;
    }
    let mut guard = state.exchange.lock().expect("lock");
    guard.set_fee_rates(body.maker_rate, body.taker_rate, body.maker_rebate);
    guard.set_withdraw_rate(body.withdraw_rate);
    guard.set_fee_collector(AccountId(body.collector));
    (StatusCode::OK, Json(serde_json::json!({ "updated": true }))).into_response()
}
