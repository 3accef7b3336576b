// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! GitHub App JWT assertions.

use {
    crate::{Error, Result},
    jsonwebtoken::{Algorithm, EncodingKey, Header},
    serde::{Deserialize, Serialize},
    std::{path::Path, time::SystemTime},
};

/// Longest lifetime GitHub accepts for an app JWT, in seconds.
pub const MAX_TOKEN_LIFETIME: u64 = 600;

/// Claims of a JWT authenticating as a GitHub App.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AppClaims {
    /// Issued at, seconds since the UNIX epoch.
    pub iat: u64,
    /// Expiration, seconds since the UNIX epoch.
    pub exp: u64,
    /// The app's client ID (or app ID).
    pub iss: String,
}

/// A compact, signed JWT for use with the GitHub App endpoints.
pub type AppToken = String;

/// Issues JWTs asserting the identity of a GitHub App.
///
/// See https://docs.github.com/en/apps/creating-github-apps/authenticating-with-a-github-app/generating-a-json-web-token-jwt-for-a-github-app
///
/// Tokens are derived from:
///
/// * The client ID of the app (`Iv1.0123456789abcdef`). The numeric app ID is
///   also accepted by GitHub.
/// * An RSA private key generated in the app settings, downloaded as PEM.
#[derive(Clone)]
pub struct AppTokenEncoder {
    client_id: String,
    encoding_key: EncodingKey,
}

impl AppTokenEncoder {
    /// Construct an instance from an [EncodingKey] instance.
    pub fn from_jwt_encoding_key(client_id: String, encoding_key: EncodingKey) -> Self {
        Self {
            client_id,
            encoding_key,
        }
    }

    /// Construct an instance from a PEM encoded RSA private key.
    ///
    /// Both PKCS#1 (`RSA PRIVATE KEY`, what GitHub hands out) and PKCS#8
    /// (`PRIVATE KEY`) documents are accepted.
    pub fn from_rsa_pem(client_id: String, pem_data: &[u8]) -> Result<Self> {
        let parsed = pem::parse(pem_data).map_err(|_| Error::InvalidPemPrivateKey)?;

        if !matches!(parsed.tag(), "RSA PRIVATE KEY" | "PRIVATE KEY") {
            return Err(Error::InvalidPemPrivateKey);
        }

        let encoding_key = EncodingKey::from_rsa_pem(pem_data)?;

        Ok(Self::from_jwt_encoding_key(client_id, encoding_key))
    }

    /// Construct an instance from a PEM encoded RSA private key in a filesystem path.
    pub fn from_rsa_pem_path(client_id: String, path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;

        Self::from_rsa_pem(client_id, &data)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The claims of a token issued at `now` (seconds since the UNIX epoch).
    pub fn claims_at(&self, now: u64) -> AppClaims {
        AppClaims {
            iat: now,
            exp: now + MAX_TOKEN_LIFETIME,
            iss: self.client_id.clone(),
        }
    }

    /// Mint a token issued at `now`.
    pub fn token_at(&self, now: u64) -> Result<AppToken> {
        let header = Header::new(Algorithm::RS256);

        Ok(jsonwebtoken::encode(
            &header,
            &self.claims_at(now),
            &self.encoding_key,
        )?)
    }

    /// Mint a new token valid for the maximum lifetime from the current time.
    pub fn new_token(&self) -> Result<AppToken> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("calculating UNIX time should never fail")
            .as_secs();

        self.token_at(now)
    }
}
