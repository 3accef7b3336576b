// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("signing error: invalid PEM formatted private key")]
    InvalidPemPrivateKey,

    #[error("signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("GitHub API error:\n{method} {url}\nHTTP {status}\n{message}")]
    Http {
        method: String,
        url: String,
        status: u16,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("installation not found for organization: {0}")]
    InstallationNotFound(String),
}

impl Error {
    /// Whether this error stems from how the program was invoked.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether the private key could not be used to sign an assertion.
    pub fn is_signing(&self) -> bool {
        matches!(self, Self::InvalidPemPrivateKey | Self::Signing(_))
    }
}
