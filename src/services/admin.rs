//! User and group administration.

use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::{
        group::{GroupModel, GroupPayload},
        user::{UpdateUser, UserModel},
        validation,
    },
    store::{GroupRepository, UserRepository},
};

const DUPLICATE_GROUP: &str = "A group with this name already exists";

fn normalize_user_update(update: &UpdateUser) -> Result<UpdateUser, ApiError> {
    let mut update = update.clone();
    if let Some(name) = &update.name {
        update.name = Some(validation::non_empty("name", name)?);
    }
    Ok(update)
}

#[derive(Clone, Debug)]
pub struct AdminService {
    users: UserRepository,
    groups: GroupRepository,
}

impl AdminService {
    pub fn new(users: UserRepository, groups: GroupRepository) -> Self {
        Self { users, groups }
    }

    pub async fn list_users(&self) -> Result<Vec<UserModel>, ApiError> {
        Ok(self.users.list(None).await?)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserModel, ApiError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))
    }

    pub async fn update_user(&self, id: Uuid, update: &UpdateUser) -> Result<UserModel, ApiError> {
        let update = normalize_user_update(update)?;
        self.users
            .update(id, &update)
            .await
            .map_err(|e| ApiError::from_write(e, "Conflicting user update"))?
            .ok_or_else(|| ApiError::not_found("User"))
    }

    pub async fn delete_user(&self, acting_admin: Uuid, id: Uuid) -> Result<(), ApiError> {
        if acting_admin == id {
            return Err(ApiError::validation("You cannot delete your own account"));
        }
        if !self.users.delete(id).await? {
            return Err(ApiError::not_found("User"));
        }
        Ok(())
    }

    pub async fn create_group(&self, payload: &GroupPayload) -> Result<GroupModel, ApiError> {
        let name = validation::non_empty("name", &payload.name)?;
        self.groups
            .create(&name, payload.description.as_deref())
            .await
            .map_err(|e| ApiError::from_write(e, DUPLICATE_GROUP))
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupModel>, ApiError> {
        Ok(self.groups.list().await?)
    }

    pub async fn get_group(&self, id: Uuid) -> Result<GroupModel, ApiError> {
        self.groups
            .find(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Group"))
    }

    pub async fn update_group(&self, id: Uuid, payload: &GroupPayload) -> Result<GroupModel, ApiError> {
        let name = validation::non_empty("name", &payload.name)?;
        self.groups
            .update(id, &name, payload.description.as_deref())
            .await
            .map_err(|e| ApiError::from_write(e, DUPLICATE_GROUP))?
            .ok_or_else(|| ApiError::not_found("Group"))
    }

    pub async fn delete_group(&self, id: Uuid) -> Result<(), ApiError> {
        if !self.groups.delete(id).await? {
            return Err(ApiError::not_found("Group"));
        }
        Ok(())
    }

    pub async fn group_members(&self, id: Uuid) -> Result<Vec<UserModel>, ApiError> {
        self.get_group(id).await?;
        Ok(self.users.list(Some(id)).await?)
    }

    pub async fn me(&self, id: Uuid) -> Result<UserModel, ApiError> {
        self.get_user(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_updates_store_trimmed_names() {
        let update = UpdateUser {
            name: Some("  Grace Hopper ".into()),
            ..UpdateUser::default()
        };
        let normalized = normalize_user_update(&update).unwrap();
        assert_eq!(normalized.name.as_deref(), Some("Grace Hopper"));

        let blank = UpdateUser {
            name: Some("   ".into()),
            ..UpdateUser::default()
        };
        assert!(normalize_user_update(&blank).is_err());
    }
}
