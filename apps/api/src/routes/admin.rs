//! Catalog and account management. Every handler requires [`AdminUser`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use tracing::info;

use tavola_core::{
    Category, CategoryChanges, NewCategory, NewProduct, NewUserByAdmin, Page, Product,
    ProductChanges, User,
};

use crate::error::ApiResult;
use crate::extract::{AdminUser, ApiPath, ListQuery, ValidJson};
use crate::services::{AdminUserView, CategoryService, ProductService, UserService};
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/categories", get(list_categories).post(create_category))
        .route(
            "/admin/categories/{id}",
            patch(update_category).delete(delete_category),
        )
        .route("/admin/products", get(list_products).post(create_product))
        .route(
            "/admin/products/{id}",
            patch(update_product).delete(delete_product),
        )
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/{id}", get(get_user).delete(delete_user))
}

// =============================================================================
// Categories
// =============================================================================

async fn create_category(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ValidJson(payload): ValidJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let mut session = state.db.begin().await?;
    let category = CategoryService::new(&mut session).create_category(&payload).await?;
    session.commit().await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn list_categories(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ListQuery(params): ListQuery,
) -> ApiResult<Json<Page<Category>>> {
    let mut session = state.db.begin().await?;
    let page = CategoryService::new(&mut session).list_categories(&params).await?;
    Ok(Json(page))
}

async fn update_category(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ValidJson(changes): ValidJson<CategoryChanges>,
) -> ApiResult<Json<Category>> {
    let mut session = state.db.begin().await?;
    let category = CategoryService::new(&mut session).update_category(id, &changes).await?;
    session.commit().await?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let mut session = state.db.begin().await?;
    CategoryService::new(&mut session).delete_category(id).await?;
    session.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

async fn create_product(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ValidJson(payload): ValidJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let mut session = state.db.begin().await?;
    let product = ProductService::new(&mut session)
        .create_product(&payload, &state.pictures)
        .await?;

    if let Err(e) = session.commit().await {
        if let Some(path) = &product.image_file {
            state.pictures.remove(path).await;
        }
        return Err(e.into());
    }

    info!(admin_id = admin.id, product_id = product.id, "Product published");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ListQuery(params): ListQuery,
) -> ApiResult<Json<Page<Product>>> {
    let mut session = state.db.begin().await?;
    let page = ProductService::new(&mut session).list_products(&params).await?;
    Ok(Json(page))
}

async fn update_product(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ValidJson(changes): ValidJson<ProductChanges>,
) -> ApiResult<Json<Product>> {
    let mut session = state.db.begin().await?;
    let product = ProductService::new(&mut session).update_product(id, &changes).await?;
    session.commit().await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let mut session = state.db.begin().await?;
    ProductService::new(&mut session).delete_product(id).await?;
    session.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Users
// =============================================================================

async fn create_user(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ValidJson(payload): ValidJson<NewUserByAdmin>,
) -> ApiResult<(StatusCode, Json<AdminUserView>)> {
    let mut session = state.db.begin().await?;
    let view = UserService::new(&mut session).create_user_by_admin(&payload).await?;
    session.commit().await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_users(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ListQuery(params): ListQuery,
) -> ApiResult<Json<Page<User>>> {
    let mut session = state.db.begin().await?;
    let page = UserService::new(&mut session).list_users(&params).await?;
    Ok(Json(page))
}

async fn get_user(
    State(state): State<SharedState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<AdminUserView>> {
    let mut session = state.db.begin().await?;
    let view = UserService::new(&mut session).get_admin_view(id).await?;
    Ok(Json(view))
}

async fn delete_user(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let mut session = state.db.begin().await?;
    UserService::new(&mut session).delete_user(id).await?;
    session.commit().await?;
    info!(admin_id = admin.id, user_id = id, "User removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
