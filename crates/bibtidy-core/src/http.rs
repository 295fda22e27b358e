//! HTTP client for DOI lookups

use reqwest::{header, Client};
use url::Url;
use std::time::Duration;
use thiserror::Error;

use crate::settings::FetchSettings;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("Timeout")]
    Timeout,
    #[error("Rate limited")]
    RateLimited,
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Parse error: {message}")]
    ParseError { message: String },
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after redirects
    pub url: Url,
    pub body: String,
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(settings: &FetchSettings) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone());
        if !settings.use_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|e| HttpError::RequestFailed {
            message: e.to_string(),
        })?;

        Ok(Self { client })
    }

    /// GET `url`, following redirects, optionally with an `Accept` header
    pub async fn get(&self, url: &str, accept: Option<&str>) -> Result<HttpResponse, HttpError> {
        let url = Url::parse(url).map_err(|_| HttpError::InvalidUrl {
            url: url.to_string(),
        })?;

        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }

        let response = request.send().await.map_err(request_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();

        if status == 429 {
            return Err(HttpError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(HttpError::Status {
                status,
                url: final_url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| HttpError::ParseError {
            message: e.to_string(),
        })?;

        Ok(HttpResponse {
            status,
            url: final_url,
            body,
        })
    }
}

fn request_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout
    } else {
        HttpError::RequestFailed {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url() {
        let client = HttpClient::new(&FetchSettings::default()).unwrap();
        let err = client.get("not a url", None).await.unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl { .. }));
    }
}
