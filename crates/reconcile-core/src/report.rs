//! Audit report aggregation.

use chrono::{DateTime, Utc};
use reconcile_types::{ExpectedContract, Issue, IssueKind, Member, MemberId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::fetcher::PartialFetch;
use crate::rules::evaluate;

const RULE: &str = "======================================================================";

/// Frequency of one issue kind across the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueCount {
    pub kind: IssueKind,
    pub label: &'static str,
    pub count: usize,
}

/// Every issue found on one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberIssues {
    pub member_id: MemberId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub issues: Vec<Issue>,
}

/// Structured result of one audit run.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub contract: ExpectedContract,
    /// False when pagination stopped early; counts then cover nothing.
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_fetch: Option<String>,
    pub total: usize,
    pub verified: usize,
    pub unverified: usize,
    /// Percentage of members whose link is verified (0 for an empty group).
    pub verification_rate: f64,
    pub consistent: usize,
    /// Percentage of members with no issues (0 for an empty group).
    pub consistency_rate: f64,
    /// Issue kinds by descending count, ties by label.
    pub histogram: Vec<IssueCount>,
    /// Members with at least one issue, in fetch order.
    pub members: Vec<MemberIssues>,
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl AuditReport {
    /// Evaluate every member and aggregate the results.
    pub fn build(contract: &ExpectedContract, members: &[Member]) -> Self {
        let mut tallies: BTreeMap<IssueKind, usize> = BTreeMap::new();
        let mut flagged = Vec::new();
        let mut verified = 0;

        for member in members {
            if member.membership_verified {
                verified += 1;
            }
            let issues = evaluate(member, contract);
            if issues.is_empty() {
                continue;
            }
            for issue in &issues {
                *tallies.entry(issue.kind).or_default() += 1;
            }
            flagged.push(MemberIssues {
                member_id: member.id.clone(),
                display_name: member.display_name.clone(),
                issues,
            });
        }

        let mut histogram: Vec<IssueCount> = tallies
            .into_iter()
            .map(|(kind, count)| IssueCount {
                kind,
                label: kind.label(),
                count,
            })
            .collect();
        histogram.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(b.label)));

        let total = members.len();
        let consistent = total - flagged.len();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            contract: contract.clone(),
            complete: true,
            partial_fetch: None,
            total,
            verified,
            unverified: total - verified,
            verification_rate: percent(verified, total),
            consistent,
            consistency_rate: percent(consistent, total),
            histogram,
            members: flagged,
        }
    }

    /// A report for a fetch that did not finish. It never passes.
    pub fn incomplete(contract: &ExpectedContract, failure: &PartialFetch) -> Self {
        let mut report = Self::build(contract, &[]);
        report.complete = false;
        report.partial_fetch = Some(failure.to_string());
        report
    }

    /// Build from a fetch result, complete or not.
    pub fn from_fetch(
        contract: &ExpectedContract,
        fetched: &Result<Vec<Member>, PartialFetch>,
    ) -> Self {
        match fetched {
            Ok(members) => Self::build(contract, members),
            Err(failure) => Self::incomplete(contract, failure),
        }
    }

    /// Complete and free of issues.
    pub fn passed(&self) -> bool {
        self.complete && self.members.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.members.iter().map(|m| m.issues.len()).sum()
    }

    /// Members with at least one issue the repair workflow can fix.
    pub fn repair_candidates(&self) -> Vec<MemberId> {
        let mut ids: Vec<MemberId> = self
            .members
            .iter()
            .filter(|m| m.issues.iter().any(|i| i.kind.auto_repairable()))
            .map(|m| m.member_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.contract;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Collection Consistency Audit")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Collection:   {}", c.group_value)?;
        writeln!(f, "Content id:   {}", c.expected_content_id)?;
        writeln!(f, "Name prefix:  {:?}", c.name_prefix)?;
        writeln!(f, "Symbol:       {:?}", c.symbol)?;
        writeln!(f, "Royalties:    {} bps", c.royalty_bps)?;
        writeln!(f, "Creator:      {}", c.expected_creator_address)?;
        writeln!(f, "Run:          {} at {}", self.run_id, self.generated_at.to_rfc3339())?;
        writeln!(f, "{}", RULE)?;

        if let Some(partial) = &self.partial_fetch {
            writeln!(f)?;
            writeln!(f, "INCOMPLETE: {}", partial)?;
            writeln!(f, "No members were evaluated; rerun once the index responds.")?;
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "[Verification Status]")?;
        writeln!(f, "  Verified:          {}", self.verified)?;
        writeln!(f, "  Not verified:      {}", self.unverified)?;
        writeln!(f, "  Verification rate: {:.2}%", self.verification_rate)?;
        writeln!(f)?;
        writeln!(f, "[Consistency Check]")?;
        writeln!(
            f,
            "  Consistent members: {}/{} ({:.2}%)",
            self.consistent, self.total, self.consistency_rate
        )?;
        writeln!(
            f,
            "  Members with issues: {}/{}",
            self.members.len(),
            self.total
        )?;

        if self.members.is_empty() {
            writeln!(f)?;
            writeln!(f, "Collection is fully consistent.")?;
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "[Issue Frequency]")?;
        for entry in &self.histogram {
            writeln!(f, "  {:<40} {}", entry.label, entry.count)?;
        }
        writeln!(f)?;
        writeln!(f, "[Detailed Issues]")?;
        for member in &self.members {
            match &member.display_name {
                Some(name) => writeln!(f, "  * {} ({})", member.member_id, name)?,
                None => writeln!(f, "  * {}", member.member_id)?,
            }
            for issue in &member.issues {
                writeln!(f, "    - {}", issue)?;
            }
        }
        Ok(())
    }
}
