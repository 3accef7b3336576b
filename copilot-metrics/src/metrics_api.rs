// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Copilot metrics API.

use {
    crate::{GitHubClient, Result},
    reqwest::Method,
};

impl GitHubClient {
    /// Fetch the Copilot metrics of `organization`.
    ///
    /// The response body is returned verbatim.
    pub fn get_copilot_metrics(&self, token: &str, organization: &str) -> Result<String> {
        let req = self.request(
            Method::GET,
            &format!("/orgs/{organization}/copilot/metrics"),
            token,
        );
        Ok(self.send_request(req)?.text()?)
    }
}
