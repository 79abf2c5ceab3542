//! HTTP client implementation

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use azure_models::ApiResponse;

use crate::errors::DeployError;

/// Extra request headers, as name/value pairs
pub type Headers<'a> = &'a [(&'a str, &'a str)];

/// HTTP client bound to one service base URL
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str) -> Result<Self, DeployError> {
        Url::parse(base_url)
            .map_err(|e| DeployError::ConfigError(format!("Invalid base URL {}: {}", base_url, e)))?;

        let client = Client::builder()
            .user_agent(concat!("botdeploy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Start a request with bearer auth and extra headers
    pub fn request(&self, method: Method, path: &str, token: &str, headers: Headers<'_>) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));

        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, DeployError> {
        self.get_with_headers(path, token, &[]).await
    }

    /// Make a GET request with extra headers
    pub async fn get_with_headers<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        headers: Headers<'_>,
    ) -> Result<T, DeployError> {
        let response = self.request(Method::GET, path, token, headers).send().await?;
        parse_json(Method::GET, response).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        self.post_with_headers(path, token, body, &[]).await
    }

    /// Make a POST request with extra headers
    pub async fn post_with_headers<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: &str,
        body: &B,
        headers: Headers<'_>,
    ) -> Result<T, DeployError> {
        let response = self
            .request(Method::POST, path, token, headers)
            .json(body)
            .send()
            .await?;
        parse_json(Method::POST, response).await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let response = self
            .request(Method::PUT, path, token, &[])
            .json(body)
            .send()
            .await?;
        parse_json(Method::PUT, response).await
    }

    /// Send a request and keep the status instead of failing on non-2xx
    pub async fn send_with_status<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, DeployError> {
        let mut request = self.request(method, path, token, &[]);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        if (200..300).contains(&status) {
            let body = serde_json::from_str(non_empty_json(&text))?;
            Ok(ApiResponse::ok(status, body))
        } else {
            let error = serde_json::from_str(&text)
                .unwrap_or_else(|_| serde_json::Value::String(text.clone()));
            Ok(ApiResponse::failed(status, error))
        }
    }
}

/// Parse a JSON response body, turning non-2xx into `HttpStatus`
pub async fn parse_json<T: DeserializeOwned>(method: Method, response: Response) -> Result<T, DeployError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        error!("HTTP {} failed: {} - {}", method, status, text);
        return Err(DeployError::HttpStatus {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(serde_json::from_str(non_empty_json(&text))?)
}

// Some endpoints answer 2xx with an empty body
fn non_empty_json(text: &str) -> &str {
    if text.trim().is_empty() {
        "null"
    } else {
        text
    }
}
