use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::{
        Scope,
        category::{CategoryModel, CategoryPayload},
        validation,
    },
    store::CategoryRepository,
};

const DUPLICATE: &str = "A category with this name already exists";

#[derive(Clone, Debug)]
pub struct CategoryService {
    repo: CategoryRepository,
}

fn validate(payload: &CategoryPayload) -> Result<String, ApiError> {
    let name = validation::non_empty("name", &payload.name)?;
    if let Some(color) = &payload.color {
        validation::hex_color("color", color)?;
    }
    Ok(name)
}

impl CategoryService {
    pub fn new(repo: CategoryRepository) -> Self {
        Self { repo }
    }

    pub async fn create(&self, user_id: Uuid, payload: &CategoryPayload) -> Result<CategoryModel, ApiError> {
        let name = validate(payload)?;
        self.repo
            .create(user_id, &name, payload.color.as_deref())
            .await
            .map_err(|e| ApiError::from_write(e, DUPLICATE))
    }

    pub async fn list(&self, scope: Scope) -> Result<Vec<CategoryModel>, ApiError> {
        Ok(self.repo.list(scope).await?)
    }

    pub async fn get(&self, scope: Scope, id: Uuid) -> Result<CategoryModel, ApiError> {
        self.repo
            .find(scope, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Category"))
    }

    pub async fn update(
        &self,
        scope: Scope,
        id: Uuid,
        payload: &CategoryPayload,
    ) -> Result<CategoryModel, ApiError> {
        let name = validate(payload)?;
        self.repo
            .update(scope, id, &name, payload.color.as_deref())
            .await
            .map_err(|e| ApiError::from_write(e, DUPLICATE))?
            .ok_or_else(|| ApiError::not_found("Category"))
    }

    pub async fn delete(&self, scope: Scope, id: Uuid) -> Result<(), ApiError> {
        if !self.repo.delete(scope, id).await? {
            return Err(ApiError::not_found("Category"));
        }
        Ok(())
    }

    /// Callers may only file things under categories they can see.
    pub async fn ensure_visible(&self, scope: Scope, id: Option<Uuid>) -> Result<(), ApiError> {
        if let Some(id) = id {
            if self.repo.find(scope, id).await?.is_none() {
                return Err(ApiError::validation("category_id does not exist"));
            }
        }
        Ok(())
    }
}
