/// Everything that can keep a check from producing a real measurement.
///
/// None of these variants ever escape the process: the [`Runner`] boundary
/// turns them into an `UNKNOWN` status line. A resource that was requested
/// but is absent is deliberately *not* an error; checks report it as a
/// synthetic critical record instead.
///
/// [`Runner`]: crate::Runner
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("unexpected output from {what}: {detail}")]
    Parse { what: String, detail: String },

    #[error("Commandline incomplete!")]
    IncompleteArgs,

    #[error("warning threshold {warning} is not less severe than critical threshold {critical}")]
    InvalidThresholds { warning: f64, critical: f64 },
}

impl CheckError {
    pub fn parse(what: impl Into<String>, detail: impl Into<String>) -> Self {
        CheckError::Parse {
            what: what.into(),
            detail: detail.into(),
        }
    }
}
