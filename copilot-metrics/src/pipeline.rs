// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The metrics retrieval sequence.
//!
//! With a static token, metrics are fetched directly. With a GitHub App, a JWT
//! is minted, the installation for the organization is looked up, the JWT is
//! exchanged for an installation token, metrics are fetched and the
//! installation token is revoked.
//!
//! Every step returns early on error, aborting the remaining steps. A minted
//! token is not revoked when a later step fails; it stays valid until GitHub
//! expires it.

use {
    crate::{
        config::Credentials,
        installations_api::{find_installation_id, Installation, InstallationToken},
        AppTokenEncoder, GitHubClient, Result,
    },
    log::debug,
    std::io::Write,
};

/// The remote operations the sequence depends on.
pub trait GitHubApi {
    fn list_installations(&self, jwt: &str) -> Result<Vec<Installation>>;

    fn create_installation_token(
        &self,
        jwt: &str,
        installation_id: u64,
    ) -> Result<InstallationToken>;

    fn get_copilot_metrics(&self, token: &str, organization: &str) -> Result<String>;

    fn revoke_installation_token(&self, token: &str) -> Result<()>;
}

impl GitHubApi for GitHubClient {
    fn list_installations(&self, jwt: &str) -> Result<Vec<Installation>> {
        GitHubClient::list_installations(self, jwt)
    }

    fn create_installation_token(
        &self,
        jwt: &str,
        installation_id: u64,
    ) -> Result<InstallationToken> {
        GitHubClient::create_installation_token(self, jwt, installation_id)
    }

    fn get_copilot_metrics(&self, token: &str, organization: &str) -> Result<String> {
        GitHubClient::get_copilot_metrics(self, token, organization)
    }

    fn revoke_installation_token(&self, token: &str) -> Result<()> {
        GitHubClient::revoke_installation_token(self, token)
    }
}

/// A bearer token for the metrics request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccessToken {
    token: String,
    minted: bool,
}

impl AccessToken {
    /// A token supplied by the operator. Never revoked.
    pub fn supplied(token: impl ToString) -> Self {
        Self {
            token: token.to_string(),
            minted: false,
        }
    }

    /// A token issued during this run. Revoked after use.
    pub fn minted(token: impl ToString) -> Self {
        Self {
            token: token.to_string(),
            minted: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn is_minted(&self) -> bool {
        self.minted
    }
}

/// Obtain an installation access token for `organization` as the app behind `encoder`.
pub fn mint_installation_token(
    api: &impl GitHubApi,
    encoder: &AppTokenEncoder,
    organization: &str,
) -> Result<AccessToken> {
    let jwt = encoder.new_token()?;

    let installations = api.list_installations(&jwt)?;
    let installation_id = find_installation_id(&installations, organization)?;
    debug!("using installation {installation_id} for {organization}");

    let token = api.create_installation_token(&jwt, installation_id)?;
    if let Some(expires_at) = &token.expires_at {
        debug!("installation token expires at {expires_at}");
    }

    Ok(AccessToken::minted(token.token))
}

/// Obtain the token used to fetch metrics.
pub fn authenticate(
    api: &impl GitHubApi,
    credentials: &Credentials,
    organization: &str,
) -> Result<AccessToken> {
    match credentials {
        Credentials::Token(token) => Ok(AccessToken::supplied(token)),
        Credentials::App {
            pem_file,
            client_id,
        } => {
            let encoder = AppTokenEncoder::from_rsa_pem_path(client_id.clone(), pem_file)?;
            mint_installation_token(api, &encoder, organization)
        }
    }
}

/// Revoke `token` if it was minted by this run.
///
/// The response body is not inspected, but a non-2xx status is still an error.
pub fn release(api: &impl GitHubApi, token: &AccessToken) -> Result<()> {
    if !token.is_minted() {
        return Ok(());
    }

    api.revoke_installation_token(token.as_str())
}

/// Write the Copilot metrics of `organization` to `out`.
pub fn run(
    api: &impl GitHubApi,
    credentials: &Credentials,
    organization: &str,
    out: &mut impl Write,
) -> Result<()> {
    let token = authenticate(api, credentials, organization)?;

    let metrics = api.get_copilot_metrics(token.as_str(), organization)?;
    writeln!(out, "{metrics}")?;
    out.flush()?;

    release(api, &token)
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{installations_api::Account, Error},
        std::cell::RefCell,
    };

    const PRIVATE_KEY_PEM: &[u8] = include_bytes!("testdata/app-private-key.pem");

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    enum Call {
        ListInstallations,
        CreateToken(u64),
        GetMetrics,
        Revoke,
    }

    /// Records calls and fails the first call matching `fail_on`.
    #[derive(Default)]
    struct RecordingApi {
        calls: RefCell<Vec<Call>>,
        tokens: RefCell<Vec<String>>,
        fail_on: Option<Call>,
    }

    impl RecordingApi {
        fn failing_on(call: Call) -> Self {
            Self {
                fail_on: Some(call),
                ..Default::default()
            }
        }

        fn record(&self, call: Call, token: &str) -> Result<()> {
            self.calls.borrow_mut().push(call);
            self.tokens.borrow_mut().push(token.to_string());

            if self.fail_on == Some(call) {
                Err(Error::Http {
                    method: "GET".into(),
                    url: "https://api.github.com/".into(),
                    status: 500,
                    message: "boom".into(),
                })
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl GitHubApi for RecordingApi {
        fn list_installations(&self, jwt: &str) -> Result<Vec<Installation>> {
            self.record(Call::ListInstallations, jwt)?;

            Ok(vec![
                Installation {
                    id: 7,
                    account: Account {
                        login: "other".into(),
                    },
                },
                Installation {
                    id: 42,
                    account: Account {
                        login: "acme".into(),
                    },
                },
            ])
        }

        fn create_installation_token(
            &self,
            jwt: &str,
            installation_id: u64,
        ) -> Result<InstallationToken> {
            self.record(Call::CreateToken(installation_id), jwt)?;

            Ok(InstallationToken {
                token: "ghs_minted".into(),
                expires_at: Some("2024-01-01T00:00:00Z".into()),
            })
        }

        fn get_copilot_metrics(&self, token: &str, organization: &str) -> Result<String> {
            self.record(Call::GetMetrics, token)?;

            Ok(format!(r#"[{{"org":"{organization}"}}]"#))
        }

        fn revoke_installation_token(&self, token: &str) -> Result<()> {
            self.record(Call::Revoke, token)
        }
    }

    fn app_credentials() -> (tempfile::NamedTempFile, Credentials) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PRIVATE_KEY_PEM).unwrap();

        let credentials = Credentials::App {
            pem_file: file.path().to_path_buf(),
            client_id: "Iv1.deadbeef".into(),
        };

        (file, credentials)
    }

    #[test]
    fn static_token_single_call() {
        let api = RecordingApi::default();
        let mut out = Vec::new();

        run(&api, &Credentials::Token("ghp_static".into()), "acme", &mut out).unwrap();

        assert_eq!(api.calls(), vec![Call::GetMetrics]);
        assert_eq!(*api.tokens.borrow(), vec!["ghp_static".to_string()]);
        assert_eq!(String::from_utf8(out).unwrap(), "[{\"org\":\"acme\"}]\n");
    }

    #[test]
    fn app_four_calls_in_order() {
        let api = RecordingApi::default();
        let (_file, credentials) = app_credentials();
        let mut out = Vec::new();

        run(&api, &credentials, "acme", &mut out).unwrap();

        assert_eq!(
            api.calls(),
            vec![
                Call::ListInstallations,
                Call::CreateToken(42),
                Call::GetMetrics,
                Call::Revoke,
            ]
        );

        let tokens = api.tokens.borrow();
        // The same JWT authenticates both app calls.
        assert_eq!(tokens[0], tokens[1]);
        assert_eq!(tokens[0].split('.').count(), 3);
        assert_eq!(tokens[2], "ghs_minted");
        assert_eq!(tokens[3], "ghs_minted");
        assert_eq!(String::from_utf8(out).unwrap(), "[{\"org\":\"acme\"}]\n");
    }

    #[test]
    fn failure_aborts_remaining_calls() {
        let cases = [
            (Call::ListInstallations, vec![Call::ListInstallations]),
            (
                Call::CreateToken(42),
                vec![Call::ListInstallations, Call::CreateToken(42)],
            ),
            (
                Call::GetMetrics,
                vec![Call::ListInstallations, Call::CreateToken(42), Call::GetMetrics],
            ),
        ];

        for (fail_on, expected) in cases {
            let api = RecordingApi::failing_on(fail_on);
            let (_file, credentials) = app_credentials();
            let mut out = Vec::new();

            let err = run(&api, &credentials, "acme", &mut out).unwrap_err();

            assert!(matches!(err, Error::Http { status: 500, .. }));
            assert_eq!(api.calls(), expected);
            assert!(out.is_empty());
        }
    }

    #[test]
    fn static_token_failure() {
        let api = RecordingApi::failing_on(Call::GetMetrics);
        let mut out = Vec::new();

        assert!(run(&api, &Credentials::Token("ghp_static".into()), "acme", &mut out).is_err());
        assert_eq!(api.calls(), vec![Call::GetMetrics]);
    }

    #[test]
    fn revoke_failure_is_error() {
        let api = RecordingApi::failing_on(Call::Revoke);
        let (_file, credentials) = app_credentials();
        let mut out = Vec::new();

        let err = run(&api, &credentials, "acme", &mut out).unwrap_err();

        assert!(matches!(err, Error::Http { status: 500, .. }));
        assert_eq!(
            api.calls(),
            vec![
                Call::ListInstallations,
                Call::CreateToken(42),
                Call::GetMetrics,
                Call::Revoke,
            ]
        );
        // Metrics were already emitted when revocation failed.
        assert!(!out.is_empty());
    }

    #[test]
    fn unknown_organization() {
        let api = RecordingApi::default();
        let (_file, credentials) = app_credentials();
        let mut out = Vec::new();

        let err = run(&api, &credentials, "missing", &mut out).unwrap_err();

        assert!(matches!(err, Error::InstallationNotFound(org) if org == "missing"));
        assert_eq!(api.calls(), vec![Call::ListInstallations]);
    }

    #[test]
    fn unreadable_key_makes_no_calls() {
        let api = RecordingApi::default();
        let dir = tempfile::tempdir().unwrap();
        let credentials = Credentials::App {
            pem_file: dir.path().join("missing.pem"),
            client_id: "1".into(),
        };

        let err = authenticate(&api, &credentials, "acme").unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn supplied_token_not_released() {
        let api = RecordingApi::default();

        release(&api, &AccessToken::supplied("ghp_static")).unwrap();
        assert!(api.calls().is_empty());

        release(&api, &AccessToken::minted("ghs_minted")).unwrap();
        assert_eq!(api.calls(), vec![Call::Revoke]);
    }
}
