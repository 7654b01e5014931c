use std::{
  io,
  process::{Command, Stdio},
};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from driving the external AWS CLI
#[derive(Debug, Error)]
pub enum AwsCliError {
  #[error("AWS CLI is not installed or not in PATH: {reason}")]
  NotInstalled { reason: String },

  #[error("AWS SSO login failed: {reason}")]
  LoginFailed { reason: String },

  #[error("failed to get EKS token: {reason}")]
  GetToken { reason: String },

  #[error("failed to parse EKS token response: {0}")]
  ParseToken(#[from] serde_json::Error),
}

/// Token document emitted by `aws eks get-token`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EksToken {
  pub kind: String,
  pub api_version: String,
  pub status: EksTokenStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EksTokenStatus {
  /// Instant the presigned token stops being accepted
  pub expiration_timestamp: DateTime<Utc>,

  /// Presigned bearer token (`k8s-aws-v1.` prefixed)
  pub token: String,
}

/// Operations this tool needs from the AWS CLI
///
/// Trait wrapper to support testing
pub trait AwsCli {
  /// Confirm the CLI binary can be executed
  fn check_available(&self) -> Result<(), AwsCliError>;

  /// Run the interactive SSO login flow
  fn sso_login(&self, profile: Option<&str>) -> Result<(), AwsCliError>;

  /// Retrieve a presigned EKS authentication token
  fn get_token(&self, cluster_name: &str, region: &str, profile: Option<&str>) -> Result<EksToken, AwsCliError>;
}

/// Invokes the installed `aws` binary
#[derive(Debug)]
pub struct AwsCommand {
  program: String,
}

impl Default for AwsCommand {
  fn default() -> Self {
    Self::new("aws")
  }
}

impl AwsCommand {
  pub fn new<S: Into<String>>(program: S) -> Self {
    Self {
      program: program.into(),
    }
  }
}

impl AwsCli for AwsCommand {
  fn check_available(&self) -> Result<(), AwsCliError> {
    // Output is captured, not inherited, so stdout stays reserved for the credential JSON
    match Command::new(&self.program).arg("--version").output() {
      Ok(output) if output.status.success() => Ok(()),
      Ok(output) => Err(AwsCliError::NotInstalled {
        reason: output.status.to_string(),
      }),
      Err(err) => Err(AwsCliError::NotInstalled { reason: err.to_string() }),
    }
  }

  fn sso_login(&self, profile: Option<&str>) -> Result<(), AwsCliError> {
    info!("Starting AWS SSO login...");

    // The login flow prints its verification URL and device code to stdout;
    // route both child streams to stderr so the user still sees them while
    // stdout carries nothing but the eventual credential JSON
    let status = Command::new(&self.program)
      .args(login_args(profile))
      .stdout(Stdio::from(io::stderr()))
      .stderr(Stdio::inherit())
      .status()
      .map_err(|err| AwsCliError::LoginFailed { reason: err.to_string() })?;

    if !status.success() {
      return Err(AwsCliError::LoginFailed {
        reason: status.to_string(),
      });
    }

    info!("AWS SSO login completed");
    Ok(())
  }

  fn get_token(&self, cluster_name: &str, region: &str, profile: Option<&str>) -> Result<EksToken, AwsCliError> {
    let args = token_args(cluster_name, region, profile);
    debug!("Running: {} {}", self.program, args.join(" "));

    let output = Command::new(&self.program)
      .args(&args)
      .output()
      .map_err(|err| AwsCliError::GetToken { reason: err.to_string() })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(AwsCliError::GetToken {
        reason: format!("{}\nstderr: {}", output.status, stderr.trim()),
      });
    }

    let token: EksToken = serde_json::from_slice(&output.stdout)?;
    Ok(token)
  }
}

/// Arguments for `aws sso login`; `--profile` is passed only when one is set
fn login_args(profile: Option<&str>) -> Vec<String> {
  let mut args = vec!["sso".to_owned(), "login".to_owned()];

  if let Some(profile) = profile.filter(|profile| !profile.is_empty()) {
    args.push("--profile".to_owned());
    args.push(profile.to_owned());
  }

  args
}

/// Arguments for `aws eks get-token`; `--profile` is passed only when one is set
fn token_args(cluster_name: &str, region: &str, profile: Option<&str>) -> Vec<String> {
  let mut args = vec![
    "eks".to_owned(),
    "get-token".to_owned(),
    "--cluster-name".to_owned(),
    cluster_name.to_owned(),
    "--region".to_owned(),
    region.to_owned(),
  ];

  if let Some(profile) = profile.filter(|profile| !profile.is_empty()) {
    args.push("--profile".to_owned());
    args.push(profile.to_owned());
  }

  args
}
