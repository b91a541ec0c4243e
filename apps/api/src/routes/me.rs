//! The authenticated user's own data: profile, address book and orders.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use tavola_core::{Address, AddressChanges, NewAddress, NewOrder, Page, UserChanges, Validate, ValidationErrors};

use crate::error::ApiResult;
use crate::extract::{ApiPath, AuthUser, ListQuery, ValidJson};
use crate::services::email::{order_confirmation, spawn_send};
use crate::services::{OrderService, OrderView, UserService, UserView};
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/me", get(get_me).patch(update_me))
        .route("/me/addresses", get(list_addresses).post(add_address))
        .route("/me/addresses/{id}", patch(update_address).delete(delete_address))
        .route("/me/orders", get(list_orders).post(create_order))
        .route("/me/orders/{id}", get(get_order))
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub delivery_address: Address,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order: NewOrder,
    pub delivery_address: NewAddress,
}

impl Validate for CreateOrderRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_nested("order", self.order.validate());
        errors.check_nested("delivery_address", self.delivery_address.validate());
        errors.into_result()
    }
}

// =============================================================================
// Profile
// =============================================================================

async fn get_me(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<UserView>> {
    let mut session = state.db.begin().await?;
    let view = UserService::new(&mut session).view(user).await?;
    Ok(Json(view))
}

async fn update_me(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ValidJson(changes): ValidJson<UserChanges>,
) -> ApiResult<Json<UserView>> {
    let mut session = state.db.begin().await?;
    let mut service = UserService::new(&mut session);
    let updated = service.update_user(user.id, &changes).await?;
    let view = service.view(updated).await?;
    session.commit().await?;
    Ok(Json(view))
}

// =============================================================================
// Addresses
// =============================================================================

async fn list_addresses(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ListQuery(params): ListQuery,
) -> ApiResult<Json<Vec<Address>>> {
    let mut session = state.db.begin().await?;
    let page = UserService::new(&mut session)
        .list_addresses(user.id, &params)
        .await?;
    Ok(Json(page.items))
}

async fn add_address(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ValidJson(address): ValidJson<NewAddress>,
) -> ApiResult<(StatusCode, Json<AddressResponse>)> {
    let mut session = state.db.begin().await?;
    let delivery_address = UserService::new(&mut session)
        .add_address(user.id, &address)
        .await?;
    session.commit().await?;
    Ok((StatusCode::CREATED, Json(AddressResponse { delivery_address })))
}

async fn update_address(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidJson(changes): ValidJson<AddressChanges>,
) -> ApiResult<Json<AddressResponse>> {
    let mut session = state.db.begin().await?;
    let delivery_address = UserService::new(&mut session)
        .update_address(user.id, id, &changes)
        .await?;
    session.commit().await?;
    Ok(Json(AddressResponse { delivery_address }))
}

async fn delete_address(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let mut session = state.db.begin().await?;
    UserService::new(&mut session).delete_address(user.id, id).await?;
    session.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Orders
// =============================================================================

async fn create_order(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ValidJson(request): ValidJson<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderView>)> {
    let mut session = state.db.begin().await?;
    let (order, address) = OrderService::new(&mut session)
        .create_order(&user, &request.order, &request.delivery_address)
        .await?;
    session.commit().await?;

    spawn_send(state.mailer.clone(), order_confirmation(&user, &order, &address));

    Ok((
        StatusCode::CREATED,
        Json(OrderView {
            order,
            delivery_address: Some(address),
        }),
    ))
}

async fn list_orders(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ListQuery(params): ListQuery,
) -> ApiResult<Json<Page<OrderView>>> {
    let mut session = state.db.begin().await?;
    let page = OrderService::new(&mut session)
        .list_orders(user.id, &params)
        .await?;
    Ok(Json(page))
}

async fn get_order(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<OrderView>> {
    let mut session = state.db.begin().await?;
    let view = OrderService::new(&mut session).get_order(user.id, id).await?;
    Ok(Json(view))
}
