//! Strict json request decoding.
//!
//! Every json body the service accepts goes through [`decode_json`], either
//! directly or through the [`StrictJson`] extractor. Failures are split into
//! [`MalformedRequest`]s, which carry the status the client should see, and
//! unclassified errors which the boundary turns into a 500.

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::http::{header, StatusCode};
use actix_web::web::BytesMut;
use actix_web::{FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::Error;

pub const DEFAULT_BODY_LIMIT: usize = 1_048_576;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedRequest {
    status: StatusCode,
    msg: String,
}

impl MalformedRequest {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> MalformedRequest {
        MalformedRequest {
            status,
            msg: msg.into(),
        }
    }

    fn bad_request(msg: impl Into<String>) -> MalformedRequest {
        MalformedRequest::new(StatusCode::BAD_REQUEST, msg)
    }

    fn too_large(limit: usize) -> MalformedRequest {
        MalformedRequest::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Request body must not be larger than {} bytes", limit),
        )
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl Display for MalformedRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.msg)
    }
}

impl StdError for MalformedRequest {}

#[derive(Debug)]
pub enum DecodeError {
    Malformed(MalformedRequest),
    Unclassified(Box<dyn StdError + Send + Sync>),
}

impl From<MalformedRequest> for DecodeError {
    fn from(request: MalformedRequest) -> DecodeError {
        DecodeError::Malformed(request)
    }
}

pub fn check_content_type(content_type: Option<&str>) -> Result<(), MalformedRequest> {
    let content_type = match content_type {
        Some(content_type) => content_type,
        None => return Ok(()),
    };

    let mime = content_type.split(';').next().unwrap_or_default().trim();
    if mime.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else {
        Err(MalformedRequest::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type header is not application/json",
        ))
    }
}

/// Decodes exactly one json value of type `T` from `body`. Fields not present
/// on `T` are only rejected if `T` is declared with `deny_unknown_fields`.
pub fn decode_json<T: DeserializeOwned>(
    content_type: Option<&str>,
    body: &[u8],
    limit: usize,
) -> Result<T, DecodeError> {
    check_content_type(content_type)?;

    if body.len() > limit {
        return Err(MalformedRequest::too_large(limit).into());
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(MalformedRequest::bad_request("Request body must not be empty").into());
    }

    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let value = T::deserialize(&mut deserializer).map_err(|err| classify(err, body))?;

    deserializer.end().map_err(|_| {
        MalformedRequest::bad_request("Request body must only contain a single JSON object")
    })?;

    Ok(value)
}

fn classify(err: serde_json::Error, body: &[u8]) -> DecodeError {
    let offset = byte_offset(body, err.line(), err.column());

    let request = match err.classify() {
        Category::Syntax => MalformedRequest::bad_request(format!(
            "Request body contains badly-formed JSON (at position {})",
            offset
        )),
        Category::Eof => MalformedRequest::bad_request("Request body contains badly-formed JSON"),
        Category::Data => {
            let message = err.to_string();
            if let Some(field) = backticked(&message, "unknown field `") {
                MalformedRequest::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("Request body contains unknown field \"{}\"", field),
                )
            } else if let Some(field) = backticked(&message, "missing field `") {
                MalformedRequest::bad_request(format!(
                    "Request body is missing required field \"{}\"",
                    field
                ))
            } else if message.starts_with("invalid") || message.starts_with("unknown variant") {
                MalformedRequest::bad_request(format!(
                    "Request body contains an invalid value (at position {})",
                    offset
                ))
            } else {
                MalformedRequest::bad_request("Request body could not be decoded")
            }
        }
        Category::Io => return DecodeError::Unclassified(Box::new(err)),
    };

    DecodeError::Malformed(request)
}

fn backticked<'a>(message: &'a str, prefix: &str) -> Option<&'a str> {
    message.strip_prefix(prefix)?.split('`').next()
}

/// serde_json reports 1-based lines and byte columns, clients get a flat offset
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = body
        .split(|byte| *byte == b'\n')
        .take(line.saturating_sub(1))
        .map(|line| line.len() + 1)
        .sum();

    (line_start + column).min(body.len())
}

#[derive(Clone, Debug)]
pub struct StrictJsonConfig {
    limit: usize,
}

impl StrictJsonConfig {
    pub fn limit(mut self, limit: usize) -> StrictJsonConfig {
        self.limit = limit;
        self
    }
}

impl Default for StrictJsonConfig {
    fn default() -> StrictJsonConfig {
        StrictJsonConfig {
            limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Extractor counterpart of `web::Json` that decodes through [`decode_json`].
#[derive(Debug)]
pub struct StrictJson<T>(pub T);

impl<T> StrictJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for StrictJson<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: DeserializeOwned + 'static> FromRequest for StrictJson<T> {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<StrictJson<T>, Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let limit = req
            .app_data::<StrictJsonConfig>()
            .map(|config| config.limit)
            .unwrap_or(DEFAULT_BODY_LIMIT);
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
        let content_length = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        let mut payload = payload.take();

        Box::pin(async move {
            check_content_type(content_type.as_deref())?;

            if content_length.map_or(false, |length| length > limit) {
                return Err(MalformedRequest::too_large(limit).into());
            }

            let mut body = BytesMut::new();
            while let Some(chunk) = payload.next().await {
                let chunk = chunk.map_err(|err| {
                    DecodeError::Unclassified(Box::<dyn StdError + Send + Sync>::from(
                        err.to_string(),
                    ))
                })?;
                if body.len() + chunk.len() > limit {
                    return Err(MalformedRequest::too_large(limit).into());
                }
                body.extend_from_slice(&chunk);
            }

            let value = decode_json(content_type.as_deref(), &body, limit)?;

            Ok(StrictJson(value))
        })
    }
}
