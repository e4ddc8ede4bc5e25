//! Request extractors whose rejections use the same `{code, message, fields}`
//! body as every other client error.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// JSON request body. A value of the wrong type is reported under the name
/// of the field that holds it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::field(NON_FIELD_ERRORS, e.body_text()))?;
        decode_json(&bytes).map(JsonBody)
    }
}

pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> ApiResult<T> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if inner.is_data() && path != "." {
            ApiError::field(&path, message(&inner))
        } else {
            ApiError::field(NON_FIELD_ERRORS, message(&inner))
        }
    })?;
    de.end()
        .map_err(|e| ApiError::field(NON_FIELD_ERRORS, message(&e)))?;
    Ok(value)
}

/// serde_json's message without the trailing ` at line L column C`.
fn message(err: &serde_json::Error) -> String {
    let text = err.to_string();
    match text.rfind(" at line ") {
        Some(at) => text[..at].to_string(),
        None => text,
    }
}

/// Query string parameters. A malformed query string becomes a 400 instead
/// of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::field(NON_FIELD_ERRORS, e.body_text()))?;
        Ok(QueryParams(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldErrors;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        count: Option<u32>,
    }

    fn fields(err: ApiError) -> FieldErrors {
        match err {
            ApiError::Validation(fields) => fields,
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn wrong_type_is_reported_on_its_field() {
        let errors = fields(decode_json::<Body>(br#"{"title": 123}"#).unwrap_err());
        let msg = &errors.get("title").unwrap()[0];
        assert!(msg.starts_with("invalid type: integer `123`"), "{msg}");
        assert!(!msg.contains("line"), "{msg}");

        let errors = fields(decode_json::<Body>(br#"{"title": "ok", "count": -1}"#).unwrap_err());
        assert!(errors.get("count").is_some());
        assert!(errors.get("title").is_none());
    }

    #[test]
    fn broken_json_is_a_non_field_error() {
        let errors = fields(decode_json::<Body>(br#"{"title": "#).unwrap_err());
        assert!(errors.get(NON_FIELD_ERRORS).is_some());

        let errors = fields(decode_json::<Body>(br#"{"title": "a"} trailing"#).unwrap_err());
        assert!(errors.get(NON_FIELD_ERRORS).is_some());

        let errors = fields(decode_json::<Body>(br#""just text""#).unwrap_err());
        assert!(errors.get(NON_FIELD_ERRORS).is_some());
    }

    #[test]
    fn valid_body_decodes() {
        let body: Body = decode_json(br#"{"title": "Run", "count": 3}"#).unwrap();
        assert_eq!(body.title.as_deref(), Some("Run"));
        assert_eq!(body.count, Some(3));
    }
}
