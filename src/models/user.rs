use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(UnknownRole(value)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserModel {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub group_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Admin update of a user; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` detaches the user from its group.
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub group_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let user = UserModel {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            name: None,
            role: Role::User,
            group_id: None,
            is_active: true,
            created_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn update_distinguishes_null_from_missing_group() {
        let detach: UpdateUser = serde_json::from_str(r#"{"group_id": null}"#).unwrap();
        assert_eq!(detach.group_id, Some(None));

        let untouched: UpdateUser = serde_json::from_str(r#"{"name": "Ada"}"#).unwrap();
        assert_eq!(untouched.group_id, None);
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!(Role::try_from("admin".to_string()).unwrap(), Role::Admin);
        assert!(Role::try_from("root".to_string()).is_err());
    }
}
