pub mod admin;
pub mod analytics;
pub mod auth;
pub mod category;
pub mod qr_code;
pub mod qr_image;
pub mod redirect;
pub mod settings;
pub mod short_url;
