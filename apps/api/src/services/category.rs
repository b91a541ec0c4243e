//! Menu categories.

use tracing::info;

use tavola_core::{Category, CategoryChanges, ListParams, NewCategory, Page, Validate};
use tavola_db::{CategoryRepository, DbSession};

use crate::error::{ApiError, ApiResult};

pub struct CategoryService<'s> {
    session: &'s mut DbSession,
}

impl<'s> CategoryService<'s> {
    pub fn new(session: &'s mut DbSession) -> Self {
        CategoryService { session }
    }

    async fn ensure_name_free(&mut self, name: &str, owner: Option<i64>) -> ApiResult<()> {
        match self.session.categories().find_by_name(name).await? {
            Some(existing) if Some(existing.id) != owner => Err(ApiError::AlreadyExists(format!(
                "Category with name '{}' already exists.",
                name
            ))),
            _ => Ok(()),
        }
    }

    pub async fn create_category(&mut self, category: &NewCategory) -> ApiResult<Category> {
        category.validate()?;
        self.ensure_name_free(&category.name, None).await?;

        let created = self.session.categories().create(category).await?;
        info!(category_id = created.id, name = %created.name, "Category created");
        Ok(created)
    }

    pub async fn update_category(&mut self, id: i64, changes: &CategoryChanges) -> ApiResult<Category> {
        changes.validate()?;
        if let Some(name) = &changes.name {
            self.ensure_name_free(name, Some(id)).await?;
        }
        Ok(self.session.categories().update(id, changes).await?)
    }

    /// Fails while products still belong to the category.
    pub async fn delete_category(&mut self, id: i64) -> ApiResult<()> {
        if self.session.categories().delete(id).await? {
            info!(category_id = id, "Category deleted");
        }
        Ok(())
    }

    pub async fn list_categories(&mut self, params: &ListParams) -> ApiResult<Page<Category>> {
        let sort = params.resolve(CategoryRepository::SORTABLE)?;
        let (categories, total) = self.session.categories().list(params, sort).await?;
        Ok(Page::new(categories, total, params))
    }
}
