//! Read-only catalog. Products are public; categories need a login.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use tavola_core::{Category, Page, Product};

use crate::error::ApiResult;
use crate::extract::{ApiPath, AuthUser, ListQuery};
use crate::services::{CategoryService, ProductService};
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product: Product,
}

async fn list_categories(
    State(state): State<SharedState>,
    _user: AuthUser,
    ListQuery(params): ListQuery,
) -> ApiResult<Json<Page<Category>>> {
    let mut session = state.db.begin().await?;
    let page = CategoryService::new(&mut session)
        .list_categories(&params)
        .await?;
    Ok(Json(page))
}

async fn list_products(
    State(state): State<SharedState>,
    ListQuery(params): ListQuery,
) -> ApiResult<Json<Page<Product>>> {
    let mut session = state.db.begin().await?;
    let page = ProductService::new(&mut session).list_products(&params).await?;
    Ok(Json(page))
}

async fn get_product(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ProductResponse>> {
    let mut session = state.db.begin().await?;
    let product = ProductService::new(&mut session).get_product(id).await?;
    Ok(Json(ProductResponse { product }))
}
