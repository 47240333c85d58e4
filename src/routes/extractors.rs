//! Custom Axum extractors

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use uuid::Uuid;

use crate::errors::ApiError;

/// Extract and validate a UUID from path
pub struct ValidUuid(pub Uuid);

impl<S> FromRequestParts<S> for ValidUuid
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::validation("id is required"))?;

        let uuid = Uuid::parse_str(&id).map_err(|_| ApiError::validation("id must be a UUID"))?;

        Ok(Self(uuid))
    }
}

/// JSON body whose rejections come back as `{"error": ...}` with status 400.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string counterpart of [`ApiJson`].
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analytics::SummaryQuery;
    use axum::body::Body;
    use axum::http::header;

    fn parts(uri: &str) -> Parts {
        let (parts, _) = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn query_rejections_are_validation_errors() {
        let mut bad = parts("/api/analytics/summary?days=lots");
        let result = ApiQuery::<SummaryQuery>::from_request_parts(&mut bad, &()).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let mut good = parts("/api/analytics/summary?days=7");
        let ApiQuery(query) = ApiQuery::<SummaryQuery>::from_request_parts(&mut good, &())
            .await
            .unwrap();
        assert_eq!(query.window_days(), 7);
    }

    #[tokio::test]
    async fn json_rejections_are_validation_errors() {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let result = ApiJson::<serde_json::Value>::from_request(request, &()).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let missing_content_type = Request::builder()
            .method("POST")
            .body(Body::from("{}"))
            .unwrap();
        let result = ApiJson::<serde_json::Value>::from_request(missing_content_type, &()).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
