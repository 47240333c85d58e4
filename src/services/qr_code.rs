use chrono::Utc;
use nanoid::nanoid;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    analytics::RequestInfo,
    errors::ApiError,
    models::{
        Scope,
        analytics::ResourceAnalytics,
        qr_code::{NewQrCode, QrCodeDraft, QrCodeFilter, QrCodeModel, QrType, UpdateQrCode},
        validation,
    },
    services::{
        analytics::AnalyticsService,
        category::CategoryService,
        qr_image,
        redirect::availability,
        settings::{QrDefaults, SettingsService},
    },
    store::{QrCodeRepository, event::EventTarget},
};

const RESOURCE: &str = "QR code";
const KEY_LENGTH: usize = 8;
const KEY_ATTEMPTS: usize = 3;

/// Turns a create request into an insertable draft, applying `defaults` for
/// styling the caller left out.
pub fn prepare(new: NewQrCode, defaults: &QrDefaults) -> Result<QrCodeDraft, ApiError> {
    let name = validation::non_empty("name", &new.name)?;

    let content = match (&new.qr_type, &new.wifi) {
        (QrType::Wifi, Some(wifi)) => {
            validation::non_empty("wifi.ssid", &wifi.ssid)?;
            wifi.to_payload()
        }
        _ => validation::non_empty("content", &new.content)?,
    };
    if new.qr_type == QrType::Url {
        validation::http_url("content", &content)?;
    }

    if let Some(max_scans) = new.max_scans {
        validation::positive("max_scans", max_scans)?;
    }
    if new.expires_at.is_some_and(|at| at <= Utc::now()) {
        return Err(ApiError::validation("expires_at must be in the future"));
    }

    let foreground_color = new.foreground_color.unwrap_or_else(|| defaults.foreground_color.clone());
    let background_color = new.background_color.unwrap_or_else(|| defaults.background_color.clone());
    validation::hex_color("foreground_color", &foreground_color)?;
    validation::hex_color("background_color", &background_color)?;
    let size = new.size.unwrap_or(defaults.size);
    validation::qr_size(size)?;

    Ok(QrCodeDraft {
        name,
        content,
        qr_type: new.qr_type,
        // Only URLs can be routed through the redirect endpoint.
        is_dynamic: new.is_dynamic && new.qr_type == QrType::Url,
        category_id: new.category_id,
        expires_at: new.expires_at,
        max_scans: new.max_scans,
        foreground_color,
        background_color,
        size,
    })
}

/// Validates `update` and returns it with trimmed text fields.
fn validate_update(existing: &QrCodeModel, update: &UpdateQrCode) -> Result<UpdateQrCode, ApiError> {
    let mut update = update.clone();
    if let Some(name) = &update.name {
        update.name = Some(validation::non_empty("name", name)?);
    }
    if let Some(content) = &update.content {
        let content = validation::non_empty("content", content)?;
        if existing.qr_type == QrType::Url {
            validation::http_url("content", &content)?;
        }
        update.content = Some(content);
    }
    if let Some(Some(max_scans)) = update.max_scans {
        validation::positive("max_scans", max_scans)?;
    }
    if let Some(color) = &update.foreground_color {
        validation::hex_color("foreground_color", color)?;
    }
    if let Some(color) = &update.background_color {
        validation::hex_color("background_color", color)?;
    }
    if let Some(size) = update.size {
        validation::qr_size(size)?;
    }
    Ok(update)
}

#[derive(Clone, Debug)]
pub struct QrCodeService {
    repo: QrCodeRepository,
    categories: CategoryService,
    settings: SettingsService,
    analytics: AnalyticsService,
    base_url: String,
}

impl QrCodeService {
    pub fn new(
        repo: QrCodeRepository,
        categories: CategoryService,
        settings: SettingsService,
        analytics: AnalyticsService,
        base_url: String,
    ) -> Self {
        Self {
            repo,
            categories,
            settings,
            analytics,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[instrument(name = "Service: Create QR code", skip(self, new))]
    pub async fn create(&self, user_id: Uuid, scope: Scope, new: NewQrCode) -> Result<QrCodeModel, ApiError> {
        let defaults = self.settings.qr_defaults().await;
        let draft = prepare(new, &defaults)?;
        self.categories.ensure_visible(scope, draft.category_id).await?;

        // Keys are random; retry the rare collision instead of reporting it.
        for _ in 0..KEY_ATTEMPTS {
            let short_key = nanoid!(KEY_LENGTH);
            match self.repo.store(user_id, &short_key, &draft).await {
                Ok(qr) => return Ok(qr),
                Err(e) => match ApiError::from_write(e, "short key collision") {
                    ApiError::Conflict(_) => tracing::warn!("QR short key collision, retrying"),
                    other => return Err(other),
                },
            }
        }
        Err(ApiError::Internal(anyhow::anyhow!(
            "could not allocate a unique short key"
        )))
    }

    pub async fn list(&self, scope: Scope, filter: &QrCodeFilter) -> Result<Vec<QrCodeModel>, ApiError> {
        Ok(self.repo.list(scope, filter).await?)
    }

    pub async fn get(&self, scope: Scope, id: Uuid) -> Result<QrCodeModel, ApiError> {
        self.repo
            .find(scope, id)
            .await?
            .ok_or_else(|| ApiError::not_found(RESOURCE))
    }

    #[instrument(name = "Service: Update QR code", skip(self, update))]
    pub async fn update(&self, scope: Scope, id: Uuid, update: &UpdateQrCode) -> Result<QrCodeModel, ApiError> {
        let existing = self.get(scope, id).await?;
        let update = validate_update(&existing, update)?;
        if let Some(category_id) = update.category_id {
            self.categories.ensure_visible(scope, category_id).await?;
        }
        self.repo
            .update(scope, id, &update)
            .await
            .map_err(|e| ApiError::from_write(e, "Conflicting QR code update"))?
            .ok_or_else(|| ApiError::not_found(RESOURCE))
    }

    pub async fn delete(&self, scope: Scope, id: Uuid) -> Result<(), ApiError> {
        if !self.repo.delete(scope, id).await? {
            return Err(ApiError::not_found(RESOURCE));
        }
        Ok(())
    }

    pub fn redirect_url(&self, short_key: &str) -> String {
        format!("{}/qr-redirect/{}", self.base_url, short_key)
    }

    pub async fn image(&self, scope: Scope, id: Uuid) -> Result<String, ApiError> {
        let qr = self.get(scope, id).await?;
        let payload = qr.encoded_payload(|key| self.redirect_url(key));
        let svg = qr_image::render_svg(
            &payload,
            qr.size.max(validation::MIN_QR_SIZE) as u32,
            &qr.foreground_color,
            &qr.background_color,
        )?;
        Ok(svg)
    }

    pub async fn analytics(&self, scope: Scope, id: Uuid, days: i64) -> Result<ResourceAnalytics, ApiError> {
        let qr = self.get(scope, id).await?;
        Ok(self.analytics.qr_code(qr.id, days).await?)
    }

    #[instrument(name = "Service: Resolve QR by id", skip(self, request))]
    pub async fn resolve_by_id(&self, id: Uuid, request: RequestInfo) -> Result<String, ApiError> {
        let qr = self.repo.find(Scope::All, id).await?;
        self.redirect(qr, request).await
    }

    #[instrument(name = "Service: Resolve QR by key", skip(self, request))]
    pub async fn resolve_by_key(&self, short_key: &str, request: RequestInfo) -> Result<String, ApiError> {
        let qr = self.repo.find_by_key(short_key).await?;
        self.redirect(qr, request).await
    }

    async fn redirect(&self, qr: Option<QrCodeModel>, request: RequestInfo) -> Result<String, ApiError> {
        let qr = qr.ok_or_else(|| ApiError::not_found(RESOURCE))?;
        let target = qr
            .redirect_target()
            .ok_or_else(|| ApiError::not_found(RESOURCE))?
            .to_string();
        availability(qr.is_active, qr.expires_at, qr.scan_count, qr.max_scans, Utc::now())
            .into_result(RESOURCE)?;

        if self.repo.increment_scans(qr.id).await?.is_none() {
            // Changed between the read and the increment.
            let current = self
                .repo
                .find(Scope::All, qr.id)
                .await?
                .ok_or_else(|| ApiError::not_found(RESOURCE))?;
            availability(
                current.is_active,
                current.expires_at,
                current.scan_count,
                current.max_scans,
                Utc::now(),
            )
            .into_result(RESOURCE)?;
            return Err(ApiError::Gone("This link has reached its usage limit"));
        }

        self.analytics
            .record_in_background(EventTarget::QrScan(qr.id), request);
        Ok(target)
    }
}
