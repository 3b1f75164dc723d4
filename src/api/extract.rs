//! Body and query extractors whose decode failures carry the offending field,
//! so a bad date or a non-numeric id answers like any other validation error.

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures::future::{LocalBoxFuture, Ready, ready};
use serde::de::DeserializeOwned;
use serde_path_to_error::{Path, Segment};

use crate::error::{AppError, AppResult};

/// Reported when the body as a whole cannot be read.
const BODY_FIELD: &str = "body";

/// JSON request body.
#[derive(Debug)]
pub struct FieldJson<T>(pub T);

impl<T> FieldJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned + 'static> FromRequest for FieldJson<T> {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let is_json = is_json(req);
        let body = web::Bytes::from_request(req, payload);
        Box::pin(async move {
            if !is_json {
                return Err(AppError::validation(BODY_FIELD, "expected an application/json body").into());
            }
            let bytes = body.await?;
            Ok(FieldJson(decode_json(&bytes)?))
        })
    }
}

/// Query string.
#[derive(Debug)]
pub struct FieldQuery<T>(pub T);

impl<T> FieldQuery<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned> FromRequest for FieldQuery<T> {
    type Error = AppError;
    type Future = Ready<Result<Self, AppError>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(decode_query(req.query_string()).map(FieldQuery))
    }
}

fn is_json(req: &HttpRequest) -> bool {
    let content_type = req
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence == "application/json" || essence.ends_with("+json")
}

pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> AppResult<T> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut de)
        .map_err(|e| field_error(e.path(), &e.inner().to_string()))?;
    de.end()
        .map_err(|e| AppError::validation(BODY_FIELD, without_position(&e.to_string())))?;
    Ok(value)
}

/// Blank parameters are dropped first, so `?date=` means "no date filter".
pub fn decode_query<T: DeserializeOwned>(query: &str) -> AppResult<T> {
    let present: String = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form_urlencoded::parse(query.as_bytes()).filter(|(_, v)| !v.trim().is_empty()))
        .finish();
    let de = serde_urlencoded::Deserializer::new(form_urlencoded::parse(present.as_bytes()));
    serde_path_to_error::deserialize(de).map_err(|e| field_error(e.path(), &e.inner().to_string()))
}

fn field_error(path: &Path, message: &str) -> AppError {
    let mut field = dotted(path);
    let message = without_position(message);

    if let Some(missing) = missing_field(message) {
        if !field.is_empty() {
            field.push('.');
        }
        field.push_str(missing);
        return AppError::validation(field.clone(), format!("{} is required", field));
    }
    if field.is_empty() {
        field.push_str(BODY_FIELD);
    }
    AppError::validation(field, message)
}

/// Joins path segments the way batch validation names fields: `students.0.status`.
fn dotted(path: &Path) -> String {
    path.iter()
        .filter_map(|segment| match segment {
            Segment::Seq { index } => Some(index.to_string()),
            Segment::Map { key } => Some(key.clone()),
            Segment::Enum { variant } => Some(variant.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn missing_field(message: &str) -> Option<&str> {
    message.strip_prefix("missing field `")?.strip_suffix('`')
}

fn without_position(message: &str) -> &str {
    match message.find(" at line ") {
        Some(at) => &message[..at],
        None => message,
    }
}
