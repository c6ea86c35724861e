use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;

use crate::config::Config;
use crate::error::Error;

/// Attaches credentials to outbound calls made on the service's behalf.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, Error>;
}

#[derive(Debug, Clone, Copy)]
pub struct Anonymous;

#[async_trait]
impl Authenticator for Anonymous {
    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, Error> {
        Ok(request)
    }
}

#[derive(Clone)]
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> BearerToken {
        BearerToken {
            token: token.into(),
        }
    }
}

impl Debug for BearerToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

#[async_trait]
impl Authenticator for BearerToken {
    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, Error> {
        Ok(request.bearer_auth(&self.token))
    }
}

pub fn from_config(config: &Config) -> Arc<dyn Authenticator> {
    match &config.dispatch_token {
        Some(token) if !token.is_empty() => Arc::new(BearerToken::new(token.clone())),
        _ => Arc::new(Anonymous),
    }
}
