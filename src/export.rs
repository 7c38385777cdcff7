//! Export of a session's audit trail.
//!
//! [`ExportReport`] is the data an exported document must contain; a
//! [`ReportAssembler`] turns it into bytes. Rendering and styling beyond a
//! plain Markdown summary belong to downstream tooling.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::belief::BeliefVector;
use crate::error::{SimError, SimResult};
use crate::ledger::TurnRecord;
use crate::session::{SessionId, SessionSnapshot};

/// Formula text printed with every report.
pub const BAYESIAN_UPDATE_FORMULA: &str = "P(H|E) = P(E|H) * P(H) / P(E)";
/// Expected-loss definition.
pub const EXPECTED_LOSS_FORMULA: &str = "E[L] = Σ P(Threat_i) * Impact_i";
/// The one ROI definition used throughout reports.
pub const ROI_FORMULA: &str = "ROI = (Loss_Before - Loss_After - Cost) / Cost";

const ASSUMPTIONS: [&str; 5] = [
    "Bayesian inference assumes threat probabilities are independent",
    "Action effectiveness is based on historical data and expert assessment",
    "Attacker behavior follows rational decision-making patterns",
    "Defense actions have immediate and lasting effects",
    "Asset values are static throughout the simulation",
];

/// Formulas section of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formulas {
    /// Belief update rule.
    pub bayesian_update: String,
    /// Expected-loss definition.
    pub expected_loss: String,
    /// ROI definition.
    pub roi: String,
}

impl Default for Formulas {
    fn default() -> Self {
        Self {
            bayesian_update: BAYESIAN_UPDATE_FORMULA.to_string(),
            expected_loss: EXPECTED_LOSS_FORMULA.to_string(),
            roi: ROI_FORMULA.to_string(),
        }
    }
}

/// Everything an exported document carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    /// Session the report was taken from.
    pub session_id: SessionId,
    /// Title of the played scenario.
    pub scenario_title: String,
    /// When the report was built.
    pub generated_at: DateTime<Utc>,
    /// Scenario came from the fallback source.
    pub degraded: bool,
    /// Completed turns.
    pub turns_taken: u32,
    /// Turns allowed.
    pub turn_limit: u32,
    /// Beliefs after the last turn.
    pub final_beliefs: BeliefVector,
    /// Human-readable label per hypothesis, in `final_beliefs` order.
    pub hypothesis_labels: Vec<(String, String)>,
    /// Mass of `final_beliefs`, for the reader to check.
    pub beliefs_sum: f64,
    /// Expected loss after the last turn.
    pub final_expected_loss: f64,
    /// Oldest first.
    pub history: Vec<TurnRecord>,
    /// Hex blake3 digest of the ledger.
    pub ledger_digest: String,
    /// Formula text.
    pub formulas: Formulas,
    /// Modeling assumptions.
    pub assumptions: Vec<String>,
}

impl ExportReport {
    /// Builds the report from a session snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let hypothesis_labels = snapshot
            .beliefs
            .hypotheses()
            .map(|id| (id.to_string(), snapshot.scenario.hypothesis_label(id)))
            .collect();

        Self {
            session_id: snapshot.session_id,
            scenario_title: snapshot.scenario.title.clone(),
            generated_at: Utc::now(),
            degraded: snapshot.degraded,
            turns_taken: snapshot.turn_index,
            turn_limit: snapshot.turn_limit,
            final_beliefs: snapshot.beliefs.clone(),
            hypothesis_labels,
            beliefs_sum: snapshot.beliefs.sum(),
            final_expected_loss: snapshot.expected_loss,
            history: snapshot.ledger.chronological().cloned().collect(),
            ledger_digest: snapshot.ledger.digest(),
            formulas: Formulas::default(),
            assumptions: ASSUMPTIONS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Inputs of the first action, as shown in the "ROI inputs" section.
    #[must_use]
    pub fn first_action(&self) -> Option<&TurnRecord> {
        self.history.first()
    }
}

/// Turns a report into a document.
pub trait ReportAssembler {
    /// MIME type of the produced document.
    fn content_type(&self) -> &'static str;

    /// Renders the report.
    fn assemble(&self, report: &ExportReport) -> SimResult<String>;
}

/// Machine-readable audit trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAssembler {
    /// Indent the output.
    pub pretty: bool,
}

impl ReportAssembler for JsonReportAssembler {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn assemble(&self, report: &ExportReport) -> SimResult<String> {
        let out = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        out.map_err(|e| SimError::internal(format!("failed to serialize report: {e}")))
    }
}

/// Printable Markdown summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownReportAssembler;

impl MarkdownReportAssembler {
    fn render(report: &ExportReport, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# Simulation Export Report")?;
        writeln!(out)?;
        writeln!(out, "**Scenario:** {}", report.scenario_title)?;
        writeln!(out, "**Generated:** {}", report.generated_at.to_rfc3339())?;
        if report.degraded {
            writeln!(out)?;
            writeln!(out, "> Offline Mode: using local scenario")?;
        }

        writeln!(out)?;
        writeln!(out, "## Final Attacker Beliefs")?;
        writeln!(out)?;
        for (id, label) in &report.hypothesis_labels {
            let mass = report.final_beliefs.get(id).unwrap_or(0.0);
            writeln!(out, "- {label} ({id}): {mass:.3}")?;
        }

        writeln!(out)?;
        writeln!(out, "## Simulation Summary")?;
        writeln!(out)?;
        writeln!(out, "- Total Turns: {} of {}", report.turns_taken, report.turn_limit)?;
        writeln!(out, "- Final Expected Loss: ${:.2}", report.final_expected_loss)?;
        writeln!(out, "- Total Actions Taken: {}", report.history.len())?;
        writeln!(out, "- Beliefs Sum: {:.3}", report.beliefs_sum)?;
        writeln!(out, "- Ledger Digest: `{}`", report.ledger_digest)?;

        writeln!(out)?;
        writeln!(out, "## Action History")?;
        writeln!(out)?;
        writeln!(
            out,
            "| Turn | Action | Cost | ROI | Expected Loss Before | Expected Loss After | Rationale |"
        )?;
        writeln!(out, "|---|---|---|---|---|---|---|")?;
        for r in &report.history {
            writeln!(
                out,
                "| {} | {} | ${} | {:.2} | ${:.2} | ${:.2} | {} |",
                r.turn,
                r.action_name,
                r.cost,
                r.roi,
                r.expected_loss_before,
                r.expected_loss_after,
                r.rationale.replace('|', "\\|")
            )?;
        }

        writeln!(out)?;
        writeln!(out, "## ROI Inputs")?;
        writeln!(out)?;
        writeln!(out, "{}", report.formulas.roi)?;
        if let Some(first) = report.first_action() {
            writeln!(
                out,
                "- First action inputs: loss_before=${:.2}, loss_after=${:.2}, cost=${}",
                first.expected_loss_before, first.expected_loss_after, first.cost
            )?;
        }

        writeln!(out)?;
        writeln!(out, "## Formulas")?;
        writeln!(out)?;
        writeln!(out, "- Bayesian Update: `{}`", report.formulas.bayesian_update)?;
        writeln!(out, "- Expected Loss: `{}`", report.formulas.expected_loss)?;
        writeln!(out, "- ROI: `{}`", report.formulas.roi)?;

        writeln!(out)?;
        writeln!(out, "## Assumptions & Methodology")?;
        writeln!(out)?;
        for a in &report.assumptions {
            writeln!(out, "- {a}")?;
        }
        writeln!(
            out,
            "- Simulation limited to {} turns",
            report.turn_limit
        )?;
        Ok(())
    }
}

impl ReportAssembler for MarkdownReportAssembler {
    fn content_type(&self) -> &'static str {
        "text/markdown"
    }

    fn assemble(&self, report: &ExportReport) -> SimResult<String> {
        let mut out = String::new();
        Self::render(report, &mut out)
            .map_err(|e| SimError::internal(format!("failed to render report: {e}")))?;
        Ok(out)
    }
}
