//! Output formatting for collection-reconcile
//!
//! Human-readable renderings for repair, retarget, and inspect results.
//! Audit reports render through their own `Display`.

use reconcile_core::{
    PartialFetch, RepairOutcome, RepairReport, RetargetPlan, RetargetReport, RetargetStatus,
    StateBook,
};
use reconcile_transport::IndexUnavailable;
use reconcile_types::{ConfigError, FailureClass, FailureReason, LedgerError, Member};
use serde::Serialize;

const RULE: &str = "======================================================================";

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// What the operator should do about a failure of this class.
pub fn failure_hint(class: FailureClass) -> Option<&'static str> {
    match class {
        FailureClass::AuthorityMismatch => {
            Some("the keypair must be the collection update authority")
        }
        FailureClass::AccountOwnershipMismatch => {
            Some("a derived account has an unexpected owner; check both mints")
        }
        FailureClass::OutcomeUnknown => {
            Some("the transaction may have landed; run audit before retrying")
        }
        FailureClass::Transient => Some("safe to retry"),
        FailureClass::AlreadyVerified | FailureClass::Rejected => None,
    }
}

fn format_failure(out: &mut String, member: &str, reason: &FailureReason) {
    out.push_str(&format!(
        "  \x1b[31m✗\x1b[0m {} [{}] {}\n",
        member, reason.class, reason.message
    ));
    for line in &reason.logs {
        out.push_str(&format!("      | {}\n", line));
    }
    if let Some(hint) = failure_hint(reason.class) {
        out.push_str(&format!("      hint: {}\n", hint));
    }
}

/// Summary of one repair pass.
pub fn format_repair_report(report: &RepairReport, states: &StateBook, collection: &str) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push_str("\nMembership Repair\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "Attempted: {}  Confirmed: {}  Already verified: {}  Awaiting index: {}  \
         Failed: {}  Skipped: {}\n",
        report.attempted(),
        report.count(RepairOutcome::Confirmed),
        report.count(RepairOutcome::AlreadyVerified),
        report.count(RepairOutcome::PropagationTimeout),
        report.failed.len(),
        report.skipped.len(),
    ));

    if !report.succeeded.is_empty() {
        out.push_str("\n[Succeeded]\n");
        for repaired in &report.succeeded {
            let state = states
                .state(&repaired.member)
                .map(|s| s.name())
                .unwrap_or("unknown");
            let outcome = match repaired.outcome {
                RepairOutcome::Confirmed => "confirmed",
                RepairOutcome::AlreadyVerified => "already verified",
                RepairOutcome::PropagationTimeout => "submitted, index not yet updated",
            };
            out.push_str(&format!(
                "  \x1b[32m✓\x1b[0m {} {} ({})",
                repaired.member, outcome, state
            ));
            if let Some(sig) = &repaired.signature {
                out.push_str(&format!(" sig {}", sig));
            }
            out.push('\n');
        }
    }

    if !report.failed.is_empty() {
        out.push_str("\n[Failed]\n");
        for failed in &report.failed {
            format_failure(&mut out, failed.member.as_str(), &failed.reason);
        }
        let retryable: Vec<&str> = report
            .failed
            .iter()
            .filter(|f| f.reason.class.is_retryable())
            .map(|f| f.member.as_str())
            .collect();
        if !retryable.is_empty() {
            out.push_str(&format!(
                "\nRetry with: repair --collection {} {}\n",
                collection,
                retryable.join(" ")
            ));
        }
    }

    if !report.skipped.is_empty() {
        out.push_str(&format!(
            "\nStopped early; not attempted: {}\n",
            report
                .skipped
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        ));
    }
    out
}

/// Plan preview followed by the outcome of applying it.
pub fn format_retarget(plan: &RetargetPlan, report: &RetargetReport) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push_str(if report.dry_run {
        "\nMetadata URI Retarget (dry run)\n"
    } else {
        "\nMetadata URI Retarget\n"
    });
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "Planned: {}  Unchanged: {}  Skipped: {}\n",
        plan.entries.len(),
        plan.unchanged.len(),
        plan.skipped.len()
    ));

    if !report.applied.is_empty() {
        out.push_str("\n[Updates]\n");
        for outcome in &report.applied {
            let status = match outcome.status {
                RetargetStatus::Updated => "updated",
                RetargetStatus::PropagationPending => "submitted, index not yet updated",
                RetargetStatus::DryRun => "would update",
            };
            out.push_str(&format!("  {} -> {} ({})\n", outcome.member, outcome.uri, status));
        }
    }
    if !report.failed.is_empty() {
        out.push_str("\n[Failed]\n");
        for failed in &report.failed {
            format_failure(&mut out, failed.member.as_str(), &failed.reason);
        }
    }
    if !report.unreachable.is_empty() {
        out.push_str("\n[Unreachable metadata]\n");
        for missing in &report.unreachable {
            out.push_str(&format!(
                "  \x1b[31m✗\x1b[0m {} -> {}: {}\n",
                missing.member, missing.uri, missing.detail
            ));
        }
    }
    if !plan.skipped.is_empty() {
        out.push_str("\n[Not planned]\n");
        for skip in &plan.skipped {
            out.push_str(&format!("  {}: {}\n", skip.member, skip.reason));
        }
    }
    if !report.skipped.is_empty() {
        out.push_str(&format!(
            "\nStopped early; {} update(s) not attempted\n",
            report.skipped.len()
        ));
    }
    out
}

/// One member as the index reports it.
pub fn format_member(member: &Member, collection: Option<&str>) -> String {
    let shown = |v: &Option<String>| v.clone().unwrap_or_else(|| "<none>".to_string());
    let mut out = format!("{}\n", member.id);
    out.push_str(&format!("  Name:         {}\n", shown(&member.display_name)));
    out.push_str(&format!("  Symbol:       {}\n", shown(&member.symbol)));
    out.push_str(&format!(
        "  Royalties:    {}\n",
        member
            .royalty_bps
            .map(|bps| format!("{} bps", bps))
            .unwrap_or_else(|| "<none>".to_string())
    ));
    let link = match (&member.group_value, member.membership_verified) {
        (Some(value), true) => format!("{} (verified)", value),
        (Some(value), false) => format!("{} (unverified)", value),
        (None, _) => "<none>".to_string(),
    };
    out.push_str(&format!("  Collection:   {}\n", link));
    if let Some(expected) = collection {
        if !member.is_linked_to(expected) {
            out.push_str(&format!("  \x1b[33m!\x1b[0m not linked to {}\n", expected));
        }
    }
    out.push_str(&format!("  Metadata URI: {}\n", shown(&member.metadata_uri)));
    out.push_str(&format!("  Image:        {}\n", shown(&member.image_uri)));
    for creator in &member.creators {
        out.push_str(&format!(
            "  Creator:      {} share {}{}\n",
            creator.address,
            creator.share,
            if creator.verified { " (verified)" } else { "" }
        ));
    }
    out
}

/// Kind of error that stopped a run, read off the error chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum FatalKind {
    Config,
    IncompleteFetch,
    Index,
    Ledger(FailureClass),
    Other,
}

impl FatalKind {
    fn of(error: &anyhow::Error) -> Self {
        for cause in error.chain() {
            if cause.is::<ConfigError>() {
                return FatalKind::Config;
            }
            if cause.is::<PartialFetch>() {
                return FatalKind::IncompleteFetch;
            }
            if cause.is::<IndexUnavailable>() {
                return FatalKind::Index;
            }
            if let Some(ledger) = cause.downcast_ref::<LedgerError>() {
                return FatalKind::Ledger(ledger.classify().class);
            }
        }
        FatalKind::Other
    }

    fn hint(self) -> Option<&'static str> {
        match self {
            FatalKind::Config => Some("pass the flag or set the matching environment variable"),
            FatalKind::IncompleteFetch => {
                Some("the index failed part-way; rerun once it answers every page")
            }
            FatalKind::Index => Some("check --index-url and its API key"),
            FatalKind::Ledger(class) => failure_hint(class),
            FatalKind::Other => None,
        }
    }
}

/// Format a run-stopping error for stderr.
pub fn format_error(error: &anyhow::Error, json_output: bool) -> String {
    let kind = FatalKind::of(error);
    let causes: Vec<String> = error.chain().skip(1).map(|c| c.to_string()).collect();

    if json_output {
        #[derive(Serialize)]
        struct ErrorJson {
            error: String,
            kind: FatalKind,
            #[serde(skip_serializing_if = "Option::is_none")]
            hint: Option<&'static str>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            causes: Vec<String>,
        }

        let err = ErrorJson {
            error: error.to_string(),
            kind,
            hint: kind.hint(),
            causes,
        };
        return serde_json::to_string_pretty(&err).unwrap_or_else(|_| "{}".to_string());
    }

    let mut out = format!("\x1b[31mError:\x1b[0m {}\n", error);
    for cause in &causes {
        out.push_str(&format!("  because: {}\n", cause));
    }
    if let Some(hint) = kind.hint() {
        out.push_str(&format!("  hint: {}\n", hint));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile_core::{FailedMember, RepairedMember};
    use reconcile_types::{FailureClass, MemberId};

    #[test]
    fn test_repair_report_lists_logs_and_retry_hint() {
        let report = RepairReport {
            succeeded: vec![RepairedMember {
                member: MemberId::new("A"),
                outcome: RepairOutcome::Confirmed,
                signature: Some("sig1".to_string()),
            }],
            failed: vec![FailedMember {
                member: MemberId::new("B"),
                reason: FailureReason {
                    class: FailureClass::Transient,
                    message: "Blockhash not found".to_string(),
                    logs: vec!["Program log: retry".to_string()],
                },
            }],
            skipped: Vec::new(),
        };
        let text = format_repair_report(&report, &StateBook::new(), "Col");
        assert!(text.contains("A confirmed"));
        assert!(text.contains("[transient] Blockhash not found"));
        assert!(text.contains("| Program log: retry"));
        assert!(text.contains("hint: safe to retry"));
        assert!(text.contains("Retry with: repair --collection Col B"));
    }

    #[test]
    fn test_outcome_unknown_is_not_offered_for_retry() {
        let report = RepairReport {
            failed: vec![FailedMember {
                member: MemberId::new("B"),
                reason: FailureReason::new(
                    FailureClass::OutcomeUnknown,
                    "signer timed out after 120s; outcome unknown",
                ),
            }],
            ..Default::default()
        };
        let text = format_repair_report(&report, &StateBook::new(), "Col");
        assert!(text.contains("run audit before retrying"));
        assert!(!text.contains("Retry with"));
    }

    #[test]
    fn test_config_error_gets_hint() {
        let error = anyhow::Error::new(ConfigError::MissingField("signer command"))
            .context("mutating commands need --signer-cmd or RECONCILE_SIGNER_CMD");
        let text = format_error(&error, false);
        assert!(text.contains("Error:\x1b[0m mutating commands need --signer-cmd"));
        assert!(text.contains("because: missing required setting: signer command"));
        assert!(text.contains("hint: pass the flag"));

        let json: serde_json::Value = serde_json::from_str(&format_error(&error, true)).unwrap();
        assert_eq!(json["kind"], "config");
        assert_eq!(json["causes"][0], "missing required setting: signer command");
    }

    #[test]
    fn test_partial_fetch_error_kind() {
        let partial = PartialFetch {
            page: 2,
            members_discarded: 1000,
            detail: "index overloaded".to_string(),
        };
        let error =
            anyhow::Error::new(partial).context("refusing to retarget from an incomplete fetch");
        let json: serde_json::Value = serde_json::from_str(&format_error(&error, true)).unwrap();
        assert_eq!(json["kind"], "incomplete_fetch");
        assert!(json["hint"].as_str().unwrap().contains("rerun"));
    }

    #[test]
    fn test_ledger_error_kind_follows_failure_class() {
        let error = anyhow::Error::new(
            LedgerError::new("simulation failed")
                .with_logs(vec!["Program log: Incorrect collection update authority".into()]),
        );
        let json: serde_json::Value = serde_json::from_str(&format_error(&error, true)).unwrap();
        assert_eq!(json["kind"]["ledger"], "authority_mismatch");
        assert_eq!(json["hint"], "the keypair must be the collection update authority");
        assert!(json.get("causes").is_none());
    }

    #[test]
    fn test_member_without_link() {
        let member = Member::bare("M1");
        let text = format_member(&member, Some("Col"));
        assert!(text.contains("Collection:   <none>"));
        assert!(text.contains("not linked to Col"));
    }
}
