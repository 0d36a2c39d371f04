//! Stage-by-stage bring-up report.

/// The stages of the bring-up sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Pre-hardware validation of the descriptor.
    Validate,
    /// Clock-distribution device programming.
    ClockTree,
    /// Two-phase reset/power sequencing.
    ResetSequence,
    /// Transmit link establishment.
    LinkTx,
    /// Receive link establishment.
    LinkRx,
    /// Transmit pattern self-test ladder.
    SelfTestTx,
    /// Receive pattern self-test ladder.
    SelfTestRx,
    /// Transmit DMA streaming start.
    StreamTx,
    /// Receive DMA capture start.
    StreamRx,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::ClockTree => "clock-tree",
            Self::ResetSequence => "reset-sequence",
            Self::LinkTx => "link-tx",
            Self::LinkRx => "link-rx",
            Self::SelfTestTx => "self-test-tx",
            Self::SelfTestRx => "self-test-rx",
            Self::StreamTx => "stream-tx",
            Self::StreamRx => "stream-rx",
        };
        f.write_str(name)
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    /// The stage completed.
    Passed,
    /// The stage failed; the reason is the error's display text.
    Failed(String),
    /// The stage never ran because an earlier failure made it moot.
    Skipped,
}

/// One stage's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    /// Which stage.
    pub stage: Stage,
    /// How it ended.
    pub status: StageStatus,
}

/// Terminal outcome of a bring-up run.
#[derive(Debug, Clone, Default)]
pub struct BringupReport {
    records: Vec<StageRecord>,
}

impl BringupReport {
    pub(crate) fn record(&mut self, stage: Stage, status: StageStatus) {
        self.records.push(StageRecord { stage, status });
    }

    /// All stage records, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageRecord] {
        &self.records
    }

    /// Status of one stage, if it was recorded.
    #[must_use]
    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.status)
    }

    /// True when no stage failed.
    #[must_use]
    pub fn success(&self) -> bool {
        !self
            .records
            .iter()
            .any(|r| matches!(r.status, StageStatus::Failed(_)))
    }

    /// The first failed stage, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StageRecord> {
        self.records
            .iter()
            .find(|r| matches!(r.status, StageStatus::Failed(_)))
    }

    /// Human-readable summary, one line per stage, ending in either a
    /// success marker or the first failed stage.
    #[must_use]
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for record in &self.records {
            match &record.status {
                StageStatus::Passed => {
                    let _ = writeln!(out, "  {:16} passed", record.stage.to_string());
                }
                StageStatus::Failed(reason) => {
                    let _ = writeln!(out, "  {:16} FAILED: {reason}", record.stage.to_string());
                }
                StageStatus::Skipped => {
                    let _ = writeln!(out, "  {:16} skipped", record.stage.to_string());
                }
            }
        }
        match self.first_failure() {
            None => out.push_str("done.\n"),
            Some(record) => {
                let _ = writeln!(out, "bring-up failed at stage {}", record.stage);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_ends_with_done_on_success() {
        let mut report = BringupReport::default();
        report.record(Stage::Validate, StageStatus::Passed);
        report.record(Stage::ClockTree, StageStatus::Passed);
        assert!(report.success());
        assert!(report.summary().ends_with("done.\n"));
    }

    #[test]
    fn summary_names_first_failed_stage() {
        let mut report = BringupReport::default();
        report.record(Stage::Validate, StageStatus::Passed);
        report.record(Stage::LinkTx, StageStatus::Failed("no lock".into()));
        report.record(Stage::SelfTestTx, StageStatus::Skipped);
        assert!(!report.success());
        assert!(report.summary().contains("failed at stage link-tx"));
    }
}
