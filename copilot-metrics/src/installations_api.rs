// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! GitHub App installation endpoints.
//!
//! See also <https://docs.github.com/en/rest/apps/apps>.

use {
    crate::{Error, GitHubClient, Result},
    reqwest::Method,
    serde::Deserialize,
};

impl GitHubClient {
    /// List the installations reachable by the app identified by `jwt`.
    pub fn list_installations(&self, jwt: &str) -> Result<Vec<Installation>> {
        let req = self.request(Method::GET, "/app/installations", jwt);
        Ok(self.send_request(req)?.json()?)
    }

    /// Exchange an app JWT for an installation access token.
    pub fn create_installation_token(
        &self,
        jwt: &str,
        installation_id: u64,
    ) -> Result<InstallationToken> {
        let req = self.request(
            Method::POST,
            &format!("/app/installations/{installation_id}/access_tokens"),
            jwt,
        );
        Ok(self.send_request(req)?.json()?)
    }

    /// Invalidate the installation access token used to authenticate.
    pub fn revoke_installation_token(&self, token: &str) -> Result<()> {
        let req = self.request(Method::DELETE, "/installation/token", token);
        self.send_request(req)?;
        Ok(())
    }
}

/// Find the id of the installation whose account login is `organization`.
///
/// The comparison is exact and case-sensitive.
pub fn find_installation_id(installations: &[Installation], organization: &str) -> Result<u64> {
    for installation in installations {
        log::debug!(
            "installation {}: {}",
            installation.id,
            installation.account.login
        );

        if installation.account.login == organization {
            return Ok(installation.id);
        }
    }

    Err(Error::InstallationNotFound(organization.to_string()))
}

#[derive(Clone, Debug, Deserialize)]
pub struct Installation {
    pub id: u64,
    pub account: Account,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: Option<String>,
}
