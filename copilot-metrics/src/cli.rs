// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use {
    crate::{
        config::{
            prompt_organization, resolve_api_url, resolve_credentials, resolve_organization,
            CredentialArgs, EnvSnapshot,
        },
        pipeline, Error, GitHubClient,
    },
    anyhow::{Context, Result},
    clap::{error::ErrorKind, ArgAction, CommandFactory, Parser},
    log::LevelFilter,
    std::path::PathBuf,
};

/// Retrieve metrics from the Copilot Usage API using a GitHub App or personal access token.
///
/// Values not given as arguments are read from the environment: GH_ORG,
/// GH_PEM_PATH (or GH_PEM_FILE), GH_APP_ID (or GH_CLIENT_ID), GH_TOKEN and
/// GH_API_URL.
#[derive(Parser)]
#[command(author, version, about, long_about)]
pub struct Args {
    /// Organization to query. Prompted for if not given.
    pub org: Option<String>,

    /// Additional logging of method calls. Can be specified multiple times
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to the PEM file
    #[arg(
        short = 'p',
        long = "pem_file",
        alias = "pem-file",
        value_name = "PATH",
        help_heading = "GitHub App"
    )]
    pub pem_file: Option<PathBuf>,

    /// Client ID (or App ID) for the GitHub App
    #[arg(
        short = 'c',
        long = "client_id",
        alias = "client-id",
        value_name = "ID",
        help_heading = "GitHub App"
    )]
    pub client_id: Option<String>,

    /// Personal access token
    #[arg(
        short = 't',
        long,
        value_name = "TOKEN",
        help_heading = "Personal Access Token"
    )]
    pub token: Option<String>,

    /// Base URL of the GitHub REST API
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,
}

impl Args {
    pub fn credential_args(&self) -> CredentialArgs {
        CredentialArgs {
            token: self.token.clone(),
            pem_file: self.pem_file.clone(),
            client_id: self.client_id.clone(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn init_logging(&self) {
        let log_level = self.log_level();

        let mut builder = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(log_level.as_str()),
        );

        // Disable log context except at higher log levels.
        if log_level < LevelFilter::Debug {
            builder
                .format_timestamp(None)
                .format_level(false)
                .format_target(false);
        }

        // Connection level chatter drowns out the request log.
        if log_level == LevelFilter::Debug {
            builder.filter_module("rustls", LevelFilter::Error);
            builder.filter_module("hyper", LevelFilter::Info);
        }

        builder.init();
    }
}

/// Turn configuration errors into a usage error, which exits the process.
fn or_usage<T>(result: crate::Result<T>) -> Result<T> {
    match result {
        Err(Error::Config(message)) => Args::command()
            .error(ErrorKind::ValueValidation, message)
            .exit(),
        other => Ok(other?),
    }
}

pub fn main_impl() -> Result<()> {
    let args = Args::parse();

    args.init_logging();

    let env = EnvSnapshot::from_process();

    let credentials = or_usage(resolve_credentials(&args.credential_args(), &env))?;
    let organization = or_usage(resolve_organization(args.org.as_deref(), &env, || {
        prompt_organization(&mut std::io::stdin().lock(), &mut std::io::stdout())
    }))?;

    let client = GitHubClient::new(resolve_api_url(args.api_url.as_deref(), &env))
        .context("constructing HTTP client")?;

    pipeline::run(
        &client,
        &credentials,
        &organization,
        &mut std::io::stdout().lock(),
    )
    .with_context(|| format!("retrieving Copilot metrics for {organization}"))?;

    Ok(())
}
