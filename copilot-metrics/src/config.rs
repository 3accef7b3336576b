// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Resolution of credentials and settings from arguments and environment.
//!
//! Every value can come from a command line argument or from one or more
//! environment variables. The environment is captured once in an
//! [EnvSnapshot] so resolution never consults process state directly.

use {
    crate::{Error, Result, DEFAULT_API_URL},
    log::debug,
    std::{
        collections::BTreeMap,
        io::{BufRead, Write},
        path::PathBuf,
    },
};

pub const PEM_FILE_ENV: &[&str] = &["GH_PEM_PATH", "GH_PEM_FILE"];
pub const CLIENT_ID_ENV: &[&str] = &["GH_APP_ID", "GH_CLIENT_ID"];
pub const TOKEN_ENV: &str = "GH_TOKEN";
pub const ORGANIZATION_ENV: &str = "GH_ORG";
pub const API_URL_ENV: &str = "GH_API_URL";

/// An immutable copy of environment variables.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the environment of the current process.
    ///
    /// Variables that aren't valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    /// Obtain the non-empty value of a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Obtain the value of the first variable in `keys` that is set.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Credential values as given on the command line.
#[derive(Clone, Debug, Default)]
pub struct CredentialArgs {
    pub token: Option<String>,
    pub pem_file: Option<PathBuf>,
    pub client_id: Option<String>,
}

/// How requests are authenticated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Credentials {
    /// A long-lived access token supplied by the operator.
    Token(String),
    /// A GitHub App private key and client ID used to mint an installation token.
    App { pem_file: PathBuf, client_id: String },
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolve the single authentication mode to use.
pub fn resolve_credentials(args: &CredentialArgs, env: &EnvSnapshot) -> Result<Credentials> {
    let pem_file = args
        .pem_file
        .clone()
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| env.first_of(PEM_FILE_ENV).map(PathBuf::from));
    let client_id = non_empty(args.client_id.as_deref())
        .or_else(|| env.first_of(CLIENT_ID_ENV))
        .map(String::from);
    let token = non_empty(args.token.as_deref());

    let has_app = pem_file.is_some() || client_id.is_some();

    if token.is_some() && has_app {
        return Err(Error::Config(
            "you cannot use both a personal access token and a GitHub App".into(),
        ));
    }

    if has_app {
        return match (pem_file, client_id) {
            (Some(pem_file), Some(client_id)) => {
                debug!(
                    "authenticating as GitHub App {} with key {}",
                    client_id,
                    pem_file.display()
                );
                Ok(Credentials::App {
                    pem_file,
                    client_id,
                })
            }
            (None, _) => Err(Error::Config(
                "a GitHub App requires a PEM file (--pem_file or GH_PEM_PATH)".into(),
            )),
            (_, None) => Err(Error::Config(
                "a GitHub App requires a client ID (--client_id or GH_APP_ID)".into(),
            )),
        };
    }

    match token.or_else(|| env.get(TOKEN_ENV)) {
        Some(token) => {
            debug!("authenticating with personal access token");
            Ok(Credentials::Token(token.to_string()))
        }
        None => Err(Error::Config(
            "you must specify either a personal access token or a GitHub App".into(),
        )),
    }
}

/// Whether `name` can be an account login.
///
/// Logins only contain ASCII alphanumerics, `-` and `_`, so they are safe to
/// use verbatim as a URL path segment.
fn is_login(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Resolve the organization to query.
///
/// `prompt` is only invoked when neither the argument nor the environment
/// supply a name. The name is used exactly as given.
pub fn resolve_organization(
    arg: Option<&str>,
    env: &EnvSnapshot,
    prompt: impl FnOnce() -> std::io::Result<String>,
) -> Result<String> {
    let organization = match non_empty(arg).or_else(|| env.get(ORGANIZATION_ENV)) {
        Some(organization) => organization.to_string(),
        None => prompt()?,
    };

    if organization.is_empty() {
        Err(Error::Config("you must specify an organization name".into()))
    } else if !is_login(&organization) {
        Err(Error::Config(format!(
            "invalid organization name: {organization:?}"
        )))
    } else {
        Ok(organization)
    }
}

/// Ask for an organization name on `output` and read one line from `input`.
pub fn prompt_organization(
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> std::io::Result<String> {
    write!(output, "Enter organization name: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    Ok(line.trim().to_string())
}

/// Resolve the base URL of the REST API.
pub fn resolve_api_url(arg: Option<&str>, env: &EnvSnapshot) -> String {
    non_empty(arg)
        .or_else(|| env.get(API_URL_ENV))
        .unwrap_or(DEFAULT_API_URL)
        .to_string()
}
