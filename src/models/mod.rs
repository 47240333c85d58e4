pub mod analytics;
pub mod category;
pub mod group;
pub mod qr_code;
pub mod short_url;
pub mod user;
pub mod validation;

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Which rows a caller may see: admins see everything, users only their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Owner(Uuid),
}

impl Scope {
    pub fn owner(&self) -> Option<Uuid> {
        match self {
            Scope::All => None,
            Scope::Owner(id) => Some(*id),
        }
    }
}

/// Distinguishes a missing field (`None`) from an explicit `null` (`Some(None)`)
/// in partial updates. Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
