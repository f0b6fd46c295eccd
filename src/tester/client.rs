// Module: Client
// Thin wrapper around reqwest behind the `Requester` seam, so the unit
// tester can be driven by a fake in tests. The response body is read in
// full before returning, which releases the underlying connection.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid http method '{0}'")]
    InvalidMethod(String),

    #[error("can't parse url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[async_trait]
pub trait Requester: Send + Sync {
    async fn make(&self, request: Request) -> Result<Response, ClientError>;
}

pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            // Um único cliente reutilizado mantém o pool de conexões.
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Requester for Client {
    async fn make(&self, request: Request) -> Result<Response, ClientError> {
        let full_url = format!("{}{}", self.base_url, request.url);
        let url = Url::parse(&full_url).map_err(|source| ClientError::InvalidUrl {
            url: full_url.clone(),
            source,
        })?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ClientError::InvalidMethod(request.method.clone()))?;

        let mut builder = self.http.request(method, url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: full_url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|text| (key.as_str().to_string(), text.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                url: full_url,
                source,
            })?
            .to_vec();

        Ok(Response {
            status,
            content_type,
            headers,
            body,
        })
    }
}
