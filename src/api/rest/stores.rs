use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::store::{DeliveryZone, GeoPoint, Product, Store};
use crate::pricing;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stores", post(create_store).get(list_stores))
        .route(
            "/stores/:id/products",
            post(create_product).get(list_products),
        )
        .route("/products/:id", patch(update_product))
        .route("/zones", post(create_zone).get(list_zones))
}

#[derive(Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub branch: Option<String>,
    pub address: Option<String>,
    pub location: GeoPoint,
    #[serde(default)]
    pub requires_till_funding: bool,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Decimal,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub price: Option<Decimal>,
    pub in_stock: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateZoneRequest {
    pub name: String,
    pub fee: Decimal,
}

async fn create_store(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateStoreRequest>,
) -> Result<Json<Store>, AppError> {
    actor.require_role(Role::Admin)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if !payload.location.is_valid() {
        return Err(AppError::BadRequest(
            "store coordinates are out of range".to_string(),
        ));
    }

    let store = Store {
        id: Uuid::new_v4(),
        name: payload.name,
        branch: payload.branch,
        address: payload.address,
        location: payload.location,
        requires_till_funding: payload.requires_till_funding,
        is_active: true,
        created_at: Utc::now(),
    };

    state.stores.insert(store.id, store.clone());
    Ok(Json(store))
}

async fn list_stores(State(state): State<Arc<AppState>>) -> Json<Vec<Store>> {
    let stores = state
        .stores
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(stores)
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Json<Product>, AppError> {
    actor.require_role(Role::Admin)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.price <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "price must be greater than zero".to_string(),
        ));
    }
    if !state.stores.contains_key(&store_id) {
        return Err(AppError::NotFound(format!("store {store_id} not found")));
    }

    let product = Product {
        id: Uuid::new_v4(),
        store_id,
        name: payload.name,
        price: pricing::round_money(payload.price),
        in_stock: payload.in_stock,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    state.products.insert(product.id, product.clone());
    Ok(Json(product))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<Uuid>,
) -> Result<Json<Vec<Product>>, AppError> {
    if !state.stores.contains_key(&store_id) {
        return Err(AppError::NotFound(format!("store {store_id} not found")));
    }

    let products = state
        .products
        .iter()
        .filter(|entry| entry.value().store_id == store_id)
        .map(|entry| entry.value().clone())
        .collect();

    Ok(Json(products))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    actor.require_role(Role::Admin)?;

    let mut product = state
        .products
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;

    if let Some(price) = payload.price {
        if price <= Decimal::ZERO {
            return Err(AppError::BadRequest(
                "price must be greater than zero".to_string(),
            ));
        }
        product.price = pricing::round_money(price);
    }
    if let Some(in_stock) = payload.in_stock {
        product.in_stock = in_stock;
    }
    product.updated_at = Utc::now();

    Ok(Json(product.clone()))
}

async fn create_zone(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateZoneRequest>,
) -> Result<Json<DeliveryZone>, AppError> {
    actor.require_role(Role::Admin)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.fee <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "fee must be greater than zero".to_string(),
        ));
    }

    let zone = DeliveryZone {
        id: Uuid::new_v4(),
        name: payload.name,
        fee: pricing::round_money(payload.fee),
        created_at: Utc::now(),
    };

    state.zones.insert(zone.id, zone.clone());
    Ok(Json(zone))
}

async fn list_zones(State(state): State<Arc<AppState>>) -> Json<Vec<DeliveryZone>> {
    let zones = state
        .zones
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(zones)
}
