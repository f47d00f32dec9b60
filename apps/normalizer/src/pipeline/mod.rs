pub mod orchestrator;

use std::fmt;

/// Pipeline stage that degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Conversion,
    Extraction,
    Recognition,
    StructuredExtraction,
    /// The run itself died (panicked or was cancelled) before producing a record.
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Conversion => "conversion",
            Stage::Extraction => "extraction",
            Stage::Recognition => "recognition",
            Stage::StructuredExtraction => "structured_extraction",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: String,
}

/// Failure markers collected across one pipeline run. Only `Input` and
/// `Aborted` failures are fatal; everything else just lowers the record's
/// quality.
#[derive(Debug, Default, Clone)]
pub struct FailureLog {
    failures: Vec<StageFailure>,
}

impl FailureLog {
    pub fn record(&mut self, stage: Stage, reason: impl Into<String>) {
        self.failures.push(StageFailure {
            stage,
            reason: reason.into(),
        });
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal().is_some()
    }

    /// First failure that forces an error record.
    pub fn fatal(&self) -> Option<&StageFailure> {
        self.failures
            .iter()
            .find(|f| matches!(f.stage, Stage::Input | Stage::Aborted))
    }

    pub fn failures(&self) -> &[StageFailure] {
        &self.failures
    }

    pub fn into_diagnostics(self) -> Vec<String> {
        self.failures
            .into_iter()
            .map(|f| format!("{}: {}", f.stage, f.reason))
            .collect()
    }
}
