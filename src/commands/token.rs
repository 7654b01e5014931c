use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
  aws::{AwsCli, AwsCommand},
  kubernetes::ExecCredential,
  sso::SessionStore,
};

/// Input arguments for the `get-token` command
#[derive(Args, Debug, Default, Serialize, Deserialize)]
pub struct GetTokenInput {
  /// Name of the EKS cluster to get a token for
  #[arg(long)]
  pub cluster_name: String,

  /// AWS region the cluster is in
  #[arg(long)]
  pub region: String,

  /// AWS profile to use for SSO login and token retrieval
  ///
  /// When unset, the AWS CLI falls back to its own profile resolution
  #[arg(long, env = "AWS_PROFILE")]
  pub profile: Option<String>,
}

impl GetTokenInput {
  /// Obtain an EKS token and print it to stdout as an exec credential
  pub fn get_token(&self) -> Result<()> {
    let cli = AwsCommand::default();
    let store = SessionStore::new()?;
    debug!("Using SSO cache at {}", store.cache_dir().display());

    let credential = fetch_credential(&cli, &store, self)?;
    credential.print()?;

    Ok(())
  }

  fn profile(&self) -> Option<&str> {
    self.profile.as_deref()
  }
}

/// Drive the token flow: CLI check, session check (with a single login and
/// re-check when needed), token fetch, credential construction
fn fetch_credential<C: AwsCli>(cli: &C, store: &SessionStore, input: &GetTokenInput) -> Result<ExecCredential> {
  cli.check_available()?;

  ensure_valid_session(cli, store, input.profile())?;

  let token = cli.get_token(&input.cluster_name, &input.region, input.profile())?;
  debug!("EKS token expires at {}", token.status.expiration_timestamp);

  Ok(ExecCredential::new(token.status.token, token.status.expiration_timestamp))
}

/// Make sure an unexpired SSO session exists, running `aws sso login` once
/// when the cache has none
///
/// A login that completes without producing a valid session is fatal; there
/// is no second attempt
fn ensure_valid_session<C: AwsCli>(cli: &C, store: &SessionStore, profile: Option<&str>) -> Result<()> {
  let err = match store.find_valid_session() {
    Ok(session) => {
      debug!("SSO session is valid until {}", session.expires_at);
      return Ok(());
    }
    Err(err) => err,
  };

  warn!("SSO session status: {err}");
  cli.sso_login(profile)?;

  store
    .find_valid_session()
    .context("failed to find valid session after login")?;

  Ok(())
}
