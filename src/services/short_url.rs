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
        short_url::{NewShortUrl, ShortUrlCreated, ShortUrlModel, UpdateShortUrl},
        validation,
    },
    services::{analytics::AnalyticsService, category::CategoryService, redirect::availability},
    store::{CacheRepository, ShortUrlRepository, cache::short_url_key, event::EventTarget},
};

const RESOURCE: &str = "Short URL";
const CODE_LENGTH: usize = 7;
const CODE_ATTEMPTS: usize = 3;

fn validate_new(new: &NewShortUrl) -> Result<(), ApiError> {
    validation::http_url("original_url", &new.original_url)?;
    if let Some(code) = &new.custom_code {
        validation::short_code(code)?;
    }
    if let Some(max_clicks) = new.max_clicks {
        validation::positive("max_clicks", max_clicks)?;
    }
    if new.expires_at.is_some_and(|at| at <= Utc::now()) {
        return Err(ApiError::validation("expires_at must be in the future"));
    }
    Ok(())
}

fn validate_update(update: &UpdateShortUrl) -> Result<(), ApiError> {
    if let Some(url) = &update.original_url {
        validation::http_url("original_url", url)?;
    }
    if let Some(Some(max_clicks)) = update.max_clicks {
        validation::positive("max_clicks", max_clicks)?;
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct ShortUrlService {
    repo: ShortUrlRepository,
    cache: CacheRepository,
    categories: CategoryService,
    analytics: AnalyticsService,
    base_url: String,
}

impl ShortUrlService {
    pub fn new(
        repo: ShortUrlRepository,
        cache: CacheRepository,
        categories: CategoryService,
        analytics: AnalyticsService,
        base_url: String,
    ) -> Self {
        Self {
            repo,
            cache,
            categories,
            analytics,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn public_link(&self, short_code: &str) -> String {
        format!("{}/s/{}", self.base_url, short_code)
    }

    #[instrument(name = "Service: Shorten url", skip(self, new))]
    pub async fn shorten(&self, user_id: Uuid, scope: Scope, new: NewShortUrl) -> Result<ShortUrlCreated, ApiError> {
        validate_new(&new)?;
        self.categories.ensure_visible(scope, new.category_id).await?;

        let short_url = match &new.custom_code {
            Some(code) => self
                .repo
                .store(code, user_id, &new)
                .await
                .map_err(|e| ApiError::from_write(e, "This short code is already taken"))?,
            None => self.store_with_generated_code(user_id, &new).await?,
        };

        Ok(ShortUrlCreated {
            short_url_link: self.public_link(&short_url.short_code),
            short_url,
        })
    }

    async fn store_with_generated_code(&self, user_id: Uuid, new: &NewShortUrl) -> Result<ShortUrlModel, ApiError> {
        for _ in 0..CODE_ATTEMPTS {
            let short_code = nanoid!(CODE_LENGTH);
            match self.repo.store(&short_code, user_id, new).await {
                Ok(short_url) => return Ok(short_url),
                Err(e) => match ApiError::from_write(e, "short code collision") {
                    ApiError::Conflict(_) => tracing::warn!("Short code collision, retrying"),
                    other => return Err(other),
                },
            }
        }
        Err(ApiError::Internal(anyhow::anyhow!(
            "could not allocate a unique short code"
        )))
    }

    pub async fn list(&self, scope: Scope) -> Result<Vec<ShortUrlModel>, ApiError> {
        Ok(self.repo.list(scope).await?)
    }

    pub async fn get(&self, scope: Scope, id: Uuid) -> Result<ShortUrlModel, ApiError> {
        self.repo
            .find(scope, id)
            .await?
            .ok_or_else(|| ApiError::not_found(RESOURCE))
    }

    #[instrument(name = "Service: Update short url", skip(self, update))]
    pub async fn update(&self, scope: Scope, id: Uuid, update: &UpdateShortUrl) -> Result<ShortUrlModel, ApiError> {
        validate_update(update)?;
        if let Some(category_id) = update.category_id {
            self.categories.ensure_visible(scope, category_id).await?;
        }
        let short_url = self
            .repo
            .update(scope, id, update)
            .await
            .map_err(|e| ApiError::from_write(e, "Conflicting short URL update"))?
            .ok_or_else(|| ApiError::not_found(RESOURCE))?;
        self.evict(&short_url.short_code).await;
        Ok(short_url)
    }

    pub async fn delete(&self, scope: Scope, id: Uuid) -> Result<(), ApiError> {
        let deleted = self
            .repo
            .delete(scope, id)
            .await?
            .ok_or_else(|| ApiError::not_found(RESOURCE))?;
        self.evict(&deleted.short_code).await;
        Ok(())
    }

    pub async fn analytics(&self, scope: Scope, id: Uuid, days: i64) -> Result<ResourceAnalytics, ApiError> {
        let short_url = self.get(scope, id).await?;
        Ok(self.analytics.short_url(short_url.id, days).await?)
    }

    async fn evict(&self, short_code: &str) {
        if let Err(e) = self.cache.delete(&short_url_key(short_code)).await {
            tracing::warn!(short_code, "Failed to evict cached short url: {:?}", e);
        }
    }

    /// Looks the code up (cache first), applies the availability rules and
    /// counts the click. Returns the target to redirect to.
    #[instrument(name = "Service: Resolve url", skip(self, request))]
    pub async fn resolve(&self, short_code: &str, request: RequestInfo) -> Result<String, ApiError> {
        let key = short_url_key(short_code);

        // 1. Try Cache
        let cached = self.cache.get_json::<ShortUrlModel>(&key).await;
        let short_url = match cached {
            Some(short_url) => short_url,
            None => {
                // 2. Try DB
                let short_url = self
                    .repo
                    .fetch(short_code)
                    .await?
                    .ok_or_else(|| {
                        tracing::warn!("Url was not found");
                        ApiError::not_found(RESOURCE)
                    })?;
                if let Err(e) = self.cache.set_json(&key, &short_url).await {
                    tracing::warn!("Failed to backfill url cache: {:?}", e);
                }
                short_url
            }
        };

        availability(
            short_url.is_active,
            short_url.expires_at,
            short_url.click_count,
            short_url.max_clicks,
            Utc::now(),
        )
        .into_result(RESOURCE)?;

        if self.repo.increment_clicks(short_url.id).await?.is_none() {
            // The cached copy was stale or the last click raced us.
            self.evict(short_code).await;
            let current = self
                .repo
                .fetch(short_code)
                .await?
                .ok_or_else(|| ApiError::not_found(RESOURCE))?;
            availability(
                current.is_active,
                current.expires_at,
                current.click_count,
                current.max_clicks,
                Utc::now(),
            )
            .into_result(RESOURCE)?;
            return Err(ApiError::Gone("This link has reached its usage limit"));
        }

        self.analytics
            .record_in_background(EventTarget::ShortUrlClick(short_url.id), request);
        Ok(short_url.original_url)
    }
}
