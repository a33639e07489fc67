//! Authenticated request gateway.
//!
//! Every outbound request goes through [`Gateway::request`], which attaches
//! a bearer token when an identity is present and normalizes failure
//! signaling. The gateway never parses response bodies and never turns a
//! non-2xx status into an error; callers decide what a status means.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tracing::warn;

use crate::auth::IdentityProvider;

/// Request body variants the gateway knows how to dispatch.
pub enum RequestBody {
    Json(Value),
    /// Binary form data; carries its own content type.
    Multipart(reqwest::multipart::Form),
}

/// Options for a gateway request.
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Wraps outbound requests with bearer credentials.
pub struct Gateway {
    base_url: String,
    http: reqwest::Client,
    provider: Arc<dyn IdentityProvider>,
}

impl Gateway {
    /// Creates a gateway against the given base URL.
    ///
    /// # Errors
    /// Returns an error if the base URL is not well-formed.
    pub fn new(base_url: impl Into<String>, provider: Arc<dyn IdentityProvider>) -> Result<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/');
        url::Url::parse(trimmed).with_context(|| format!("Invalid base URL: {base_url}"))?;

        Ok(Self {
            base_url: trimmed.to_string(),
            http: reqwest::Client::new(),
            provider,
        })
    }

    /// Dispatches a request, attaching a bearer token when available.
    ///
    /// Token acquisition failure degrades to an unauthenticated request
    /// rather than failing the call. An unauthorized (401) response is
    /// logged but returned as-is; retry and logout policy belong to callers.
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Response> {
        let url = if endpoint.starts_with("http") {
            endpoint.to_string()
        } else {
            format!("{}{endpoint}", self.base_url)
        };

        let mut request = self.http.request(options.method, &url);

        if self.provider.current().is_some() {
            match self.provider.id_token(false).await {
                Ok(id_token) => request = request.bearer_auth(id_token.raw),
                Err(err) => {
                    warn!(error = %err, "bearer token unavailable; sending request unauthenticated");
                }
            }
        }

        let caller_set_content_type = options.headers.contains_key(header::CONTENT_TYPE);
        let is_multipart = matches!(options.body, Some(RequestBody::Multipart(_)));
        request = request.headers(options.headers);

        match options.body {
            Some(RequestBody::Json(value)) => {
                request = request.body(serde_json::to_vec(&value).context("Failed to serialize request body")?);
            }
            Some(RequestBody::Multipart(form)) => {
                request = request.multipart(form);
            }
            None => {}
        }

        if !caller_set_content_type && !is_multipart {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%url, "unauthorized response; credentials may have expired");
        }

        Ok(response)
    }

    /// `GET` convenience.
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        self.request(endpoint, RequestOptions::default()).await
    }

    /// `PUT` with a JSON body.
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn put_json(&self, endpoint: &str, body: Value) -> Result<Response> {
        self.request(
            endpoint,
            RequestOptions {
                method: Method::PUT,
                body: Some(RequestBody::Json(body)),
                ..RequestOptions::default()
            },
        )
        .await
    }

    /// Bodyless `PUT` convenience (e.g. mark-read endpoints).
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn put(&self, endpoint: &str) -> Result<Response> {
        self.request(
            endpoint,
            RequestOptions {
                method: Method::PUT,
                ..RequestOptions::default()
            },
        )
        .await
    }

    /// `DELETE` convenience.
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn delete(&self, endpoint: &str) -> Result<Response> {
        self.request(
            endpoint,
            RequestOptions {
                method: Method::DELETE,
                ..RequestOptions::default()
            },
        )
        .await
    }
}
