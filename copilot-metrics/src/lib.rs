// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Retrieve GitHub Copilot usage metrics for an organization.
//!
//! Requests are authenticated either with a long-lived access token or with a
//! short-lived installation access token minted for a GitHub App.

mod app_token;
pub mod cli;
pub mod config;
mod error;
pub mod installations_api;
pub mod metrics_api;
pub mod pipeline;

use reqwest::{
    blocking::{Client, ClientBuilder, RequestBuilder, Response},
    Method,
};
use serde_json::Value;

pub use crate::app_token::{AppClaims, AppToken, AppTokenEncoder, MAX_TOKEN_LIFETIME};
pub use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Base URL of the public GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// A blocking client for the subset of the GitHub REST API we need.
pub struct GitHubClient {
    client: Client,
    api_url: String,
}

impl GitHubClient {
    /// Create a new client talking to the API rooted at `api_url`.
    ///
    /// A trailing `/` on the URL is ignored.
    pub fn new(api_url: impl AsRef<str>) -> Result<Self> {
        let client = ClientBuilder::default()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.as_ref().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Start a request against `path` authenticated with a bearer `token`.
    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(token)
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    pub fn send_request(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.build()?;
        let method = request.method().to_string();
        let url = request.url().to_string();

        log::debug!("{} {}", method, url);

        let response = self.client.execute(request)?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.bytes()?;

            let message = if let Ok(value) = serde_json::from_slice::<Value>(body.as_ref()) {
                serde_json::to_string_pretty(&value).unwrap_or_default()
            } else {
                String::from_utf8_lossy(body.as_ref()).into()
            };

            log::debug!("{} {} failed with HTTP {}", method, url, status.as_u16());

            Err(Error::Http {
                method,
                url,
                status: status.as_u16(),
                message,
            })
        }
    }
}
