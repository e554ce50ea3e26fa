use std::cmp::Ordering;
use std::fmt;

/// A service state as understood by Nagios/Icinga.
///
/// The ordering follows severity: `Ok < Warning < Critical`. `Unknown` ranks
/// highest so that an unevaluable record dominates an aggregation, but checks
/// should only produce it when a resource could not be evaluated at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    /// The process exit code the monitoring host dispatches on.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
        }
    }

    fn severity(&self) -> u8 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            ServiceState::Ok => "OK",
            ServiceState::Warning => "WARNING",
            ServiceState::Critical => "CRITICAL",
            ServiceState::Unknown => "UNKNOWN",
        };
        f.write_str(word)
    }
}

impl PartialOrd for ServiceState {
    fn partial_cmp(&self, other: &ServiceState) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceState {
    fn cmp(&self, other: &ServiceState) -> Ordering {
        self.severity().cmp(&other.severity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ServiceState::Ok.exit_code(), 0);
        assert_eq!(ServiceState::Warning.exit_code(), 1);
        assert_eq!(ServiceState::Critical.exit_code(), 2);
        assert_eq!(ServiceState::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_status_words() {
        assert_eq!(ServiceState::Ok.to_string(), "OK");
        assert_eq!(ServiceState::Warning.to_string(), "WARNING");
        assert_eq!(ServiceState::Critical.to_string(), "CRITICAL");
        assert_eq!(ServiceState::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ServiceState::Ok < ServiceState::Warning);
        assert!(ServiceState::Warning < ServiceState::Critical);
        assert!(ServiceState::Critical < ServiceState::Unknown);
        assert_eq!(
            ServiceState::Warning.max(ServiceState::Critical),
            ServiceState::Critical
        );
    }
}
