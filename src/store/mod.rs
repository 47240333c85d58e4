pub mod cache;
pub mod category;
pub mod event;
pub mod group;
pub mod qr_code;
pub mod settings;
pub mod short_url;
pub mod user;

pub use cache::CacheRepository;
pub use category::CategoryRepository;
pub use event::EventRepository;
pub use group::GroupRepository;
pub use qr_code::QrCodeRepository;
pub use settings::SettingsRepository;
pub use short_url::ShortUrlRepository;
pub use user::UserRepository;
