//! HTTP client for communicating with the Libris API server.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// API response wrapper matching the server's ApiResponse format.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Error body the server renders for failed requests.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Debug, Deserialize)]
struct ErrorInfo {
    code: String,
    message: String,
}

/// HTTP client for the Libris API.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client pointing at the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Perform a GET request and deserialize the response data.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        self.send_json(self.client.get(&url), "GET", &url).await
    }

    /// Perform a POST request with a JSON body and deserialize the response.
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        self.send_json(self.client.post(&url).json(body), "POST", &url)
            .await
    }

    /// Perform a DELETE request. The server answers `204 No Content`.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        Ok(())
    }

    /// Perform a raw GET request and return the full JSON value (for health endpoint).
    ///
    /// A `503` still carries a health body, so it is returned rather than failed.
    pub async fn get_raw(&self, path: &str) -> Result<serde_json::Value> {
        let url = self.url(path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        url: &str,
    ) -> Result<T> {
        let resp = request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let api_resp: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))?;

        if api_resp.success {
            api_resp
                .data
                .ok_or_else(|| anyhow::anyhow!("API returned success but no data"))
        } else {
            Err(anyhow::anyhow!(
                "API error: {}",
                api_resp.error.unwrap_or_else(|| "Unknown error".into())
            ))
        }
    }
}

/// Build an error from a failed response, preferring the server's message.
fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => anyhow::anyhow!(
            "API error ({}): {} [{}]",
            status,
            parsed.error.message,
            parsed.error.code
        ),
        Err(_) => anyhow::anyhow!("API error ({}): {}", status, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_uses_server_message() {
        let body = r#"{"success":false,"error":{"code":"RECORD_NOT_FOUND","numericCode":1000,"message":"Client with ID 9 not found","timestamp":"2024-01-01T00:00:00Z"}}"#;
        let err = api_error(StatusCode::NOT_FOUND, body);
        assert_eq!(
            err.to_string(),
            "API error (404 Not Found): Client with ID 9 not found [RECORD_NOT_FOUND]"
        );
    }

    #[test]
    fn test_api_error_falls_back_to_raw_body() {
        let err = api_error(StatusCode::BAD_REQUEST, "Invalid URL");
        assert_eq!(err.to_string(), "API error (400 Bad Request): Invalid URL");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/health"), "http://localhost:8080/health");
    }
}
