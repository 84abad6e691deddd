//! [`LedgerClient`] backed by an external signer command.
//!
//! The signer owns key loading, transaction construction, and submission.
//! It is invoked once per mutation:
//!
//! ```text
//! <cmd> verify-membership         --member <MINT> --collection <MINT> --keypair <PATH>
//! <cmd> set-and-verify-membership --member <MINT> --collection <MINT> --keypair <PATH>
//! <cmd> update-uri                --member <MINT> --uri <URI>         --keypair <PATH>
//! ```
//!
//! and must print one JSON object on stdout:
//!
//! ```text
//! {"signature": "5Xq..."}                       on success
//! {"error": "...", "logs": ["Program log: ..."]} on failure
//! ```

use async_trait::async_trait;
use reconcile_types::{env_var_or, ConfigError, LedgerError};
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ledger::{AuthorityIdentity, LedgerClient, MutationReceipt, MutationRequest};

/// What the signer prints on stdout.
#[derive(Debug, Deserialize)]
struct SignerReply {
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    logs: Vec<String>,
}

/// Runs an operator-supplied signer program for every mutation.
#[derive(Debug, Clone)]
pub struct SignerCommandLedger {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl SignerCommandLedger {
    /// Default per-submission timeout in seconds (can be overridden by env).
    const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Parse a command line such as `node sign.js --cluster devnet`.
    ///
    /// Words are split on whitespace; quoting is not interpreted.
    pub fn from_command_line(command: &str) -> Result<Self, ConfigError> {
        let mut words = command.split_whitespace().map(String::from);
        let program = words.next().ok_or(ConfigError::MissingField("signer command"))?;
        Ok(Self {
            program,
            leading_args: words.collect(),
            timeout: Duration::from_secs(env_var_or(
                "RECONCILE_SIGNER_TIMEOUT_SECS",
                Self::DEFAULT_TIMEOUT_SECS,
            )),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn arguments(&self, request: &MutationRequest, authority: &AuthorityIdentity) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push(request.action().to_string());
        args.push("--member".to_string());
        args.push(request.member().to_string());
        match request {
            MutationRequest::VerifyMembership { collection, .. }
            | MutationRequest::SetAndVerifyMembership { collection, .. } => {
                args.push("--collection".to_string());
                args.push(collection.clone());
            }
            MutationRequest::UpdateUri { uri, .. } => {
                args.push("--uri".to_string());
                args.push(uri.clone());
            }
        }
        args.push("--keypair".to_string());
        args.push(authority.keypair_path.display().to_string());
        args
    }
}

/// Find the signer's JSON reply: the whole stdout, or failing that its last
/// line that parses (signers often log progress before the reply).
fn parse_reply(stdout: &str) -> Option<SignerReply> {
    let trimmed = stdout.trim();
    serde_json::from_str(trimmed).ok().or_else(|| {
        trimmed
            .lines()
            .rev()
            .map(str::trim)
            .filter(|l| l.starts_with('{'))
            .find_map(|l| serde_json::from_str(l).ok())
    })
}

fn interpret(
    success: bool,
    status: &str,
    stdout: &str,
    stderr: &str,
) -> Result<MutationReceipt, LedgerError> {
    let stderr_lines: Vec<String> = stderr
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(String::from)
        .collect();

    match parse_reply(stdout) {
        Some(SignerReply {
            signature: Some(signature),
            error: None,
            ..
        }) if success && !signature.is_empty() => Ok(MutationReceipt { signature }),
        Some(reply) => {
            let message = reply
                .error
                .unwrap_or_else(|| format!("signer exited with {} without a signature", status));
            let logs = if reply.logs.is_empty() {
                stderr_lines
            } else {
                reply.logs
            };
            Err(LedgerError::new(message).with_logs(logs))
        }
        None => Err(LedgerError::new(format!(
            "signer exited with {} and no JSON reply",
            status
        ))
        .with_logs(stderr_lines)),
    }
}

#[async_trait]
impl LedgerClient for SignerCommandLedger {
    async fn submit(
        &self,
        request: &MutationRequest,
        authority: &AuthorityIdentity,
    ) -> Result<MutationReceipt, LedgerError> {
        let args = self.arguments(request, authority);
        debug!(
            program = %self.program,
            action = request.action(),
            member = %request.member(),
            "invoking signer"
        );

        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(LedgerError::new(format!(
                    "failed to launch signer {}: {}",
                    self.program, e
                )))
            }
            Err(_) => {
                // The child is killed on drop, possibly after it broadcast.
                warn!(
                    member = %request.member(),
                    timeout_secs = self.timeout.as_secs(),
                    "signer killed after timeout; the transaction may still land"
                );
                return Err(LedgerError::new(format!(
                    "signer timed out after {}s; outcome unknown",
                    self.timeout.as_secs()
                )));
            }
        };

        interpret(
            output.status.success(),
            &output.status.to_string(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
    }
}
