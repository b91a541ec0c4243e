//! Catalog products, including picture upload.

use tracing::info;

use tavola_core::{ListParams, NewProduct, Page, Product, ProductChanges, Validate};
use tavola_db::{DbSession, ProductRepository};

use crate::error::{ApiError, ApiResult};
use crate::services::picture::PictureStore;

pub struct ProductService<'s> {
    session: &'s mut DbSession,
}

impl<'s> ProductService<'s> {
    pub fn new(session: &'s mut DbSession) -> Self {
        ProductService { session }
    }

    async fn ensure_category_exists(&mut self, category_id: i64) -> ApiResult<()> {
        match self.session.categories().find_by_id(category_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::CategoryDoesNotExist(category_id)),
        }
    }

    async fn ensure_name_free(&mut self, name: &str, owner: Option<i64>) -> ApiResult<()> {
        match self.session.products().find_by_name(name).await? {
            Some(existing) if Some(existing.id) != owner => Err(ApiError::AlreadyExists(format!(
                "Product with name '{}' already exists.",
                name
            ))),
            _ => Ok(()),
        }
    }

    /// Creates the product, storing its picture first when one is sent.
    /// The picture file is removed again if the insert fails.
    pub async fn create_product(
        &mut self,
        product: &NewProduct,
        pictures: &PictureStore,
    ) -> ApiResult<Product> {
        product.validate()?;
        self.ensure_category_exists(product.category_id).await?;
        self.ensure_name_free(&product.name, None).await?;

        let image_file = match &product.picture_data {
            Some(picture) => Some(pictures.save(picture).await?),
            None => None,
        };

        match self.session.products().create(product, image_file.as_deref()).await {
            Ok(created) => {
                info!(
                    product_id = created.id,
                    name = %created.name,
                    price = %created.price(),
                    "Product created"
                );
                Ok(created)
            }
            Err(e) => {
                if let Some(path) = &image_file {
                    pictures.remove(path).await;
                }
                Err(e.into())
            }
        }
    }

    pub async fn update_product(&mut self, id: i64, changes: &ProductChanges) -> ApiResult<Product> {
        changes.validate()?;
        if let Some(category_id) = changes.category_id {
            self.ensure_category_exists(category_id).await?;
        }
        if let Some(name) = &changes.name {
            self.ensure_name_free(name, Some(id)).await?;
        }

        let product = self.session.products().update(id, changes).await?;
        info!(product_id = id, price = %product.price(), "Product updated");
        Ok(product)
    }

    pub async fn get_product(&mut self, id: i64) -> ApiResult<Product> {
        self.session
            .products()
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Product with id '{}' does not exist.", id)))
    }

    /// Fails while past orders reference the product.
    pub async fn delete_product(&mut self, id: i64) -> ApiResult<()> {
        if self.session.products().delete(id).await? {
            info!(product_id = id, "Product deleted");
        }
        Ok(())
    }

    pub async fn list_products(&mut self, params: &ListParams) -> ApiResult<Page<Product>> {
        let sort = params.resolve(ProductRepository::SORTABLE)?;
        let (products, total) = self.session.products().list(params, sort).await?;
        Ok(Page::new(products, total, params))
    }
}
