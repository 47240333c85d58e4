pub mod analytics;
pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod extractors;
pub mod groups;
pub mod health;
pub mod qr_codes;
pub mod redirect;
pub mod settings;
pub mod short_urls;
pub mod users;
