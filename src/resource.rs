use std::process;

use crate::{PerfData, ServiceState};

/// The result of one check invocation, from the perspective of the
/// monitoring host: a state, a one-line summary, optional per-record detail
/// lines and optional performance data.
///
/// The state is normally derived from the pushed records (the most severe one
/// wins); [`Resource::set_state`] overrides that for checks whose aggregate
/// state does not come from per-record evaluation.
///
/// ```
/// use icinga_checks::{Resource, ServiceState};
///
/// let mut resource = Resource::new("All monitored containers are online!");
/// resource.push_record(ServiceState::Ok, "web with image nginx:latest, Uptime: 2 days");
/// assert_eq!(resource.state(), ServiceState::Ok);
/// assert_eq!(
///     resource.to_check_string(),
///     "OK - All monitored containers are online!\n\n[OK] web with image nginx:latest, Uptime: 2 days"
/// );
/// ```
#[derive(Debug, Default)]
pub struct Resource {
    state: Option<ServiceState>,
    summary: String,
    detail: Vec<String>,
    record_states: Vec<ServiceState>,
    perf_data: Vec<PerfData>,
}

impl Resource {
    pub fn new(summary: impl Into<String>) -> Self {
        Resource {
            summary: summary.into(),
            ..Resource::default()
        }
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    /// Overrides the state derived from the pushed records.
    pub fn set_state(&mut self, state: ServiceState) {
        self.state = Some(state);
    }

    /// Adds one evaluated record: a detail line tagged with its own state,
    /// which participates in the aggregate state.
    pub fn push_record(&mut self, state: ServiceState, line: impl Into<String>) {
        self.detail.push(format!("[{}] {}", state, line.into()));
        self.record_states.push(state);
    }

    /// Adds an untagged detail line that does not affect the aggregate state.
    pub fn push_note(&mut self, line: impl Into<String>) {
        self.detail.push(line.into());
    }

    pub fn push_perf_data(&mut self, perf: PerfData) {
        self.perf_data.push(perf);
    }

    /// The most severe state among the pushed records, `Ok` when there are
    /// none, unless a state was set explicitly.
    pub fn state(&self) -> ServiceState {
        if let Some(state) = self.state {
            return state;
        }
        self.record_states
            .iter()
            .copied()
            .max()
            .unwrap_or(ServiceState::Ok)
    }

    /// Renders the plugin output:
    ///
    /// ```text
    /// <STATE> - <summary>[\n\n<detail>] [| <perfdata>]
    /// ```
    ///
    /// `|` separates human text from perf data, so any pipe inside the text
    /// is replaced rather than letting it corrupt the metrics block.
    pub fn to_check_string(&self) -> String {
        let mut out = format!("{} - {}", self.state(), sanitize(&self.summary));

        if !self.detail.is_empty() {
            out.push_str("\n\n");
            let lines: Vec<String> = self.detail.iter().map(|l| sanitize(l)).collect();
            out.push_str(&lines.join("\n"));
        }

        if !self.perf_data.is_empty() {
            out.push_str(" |");
            for perf in &self.perf_data {
                out.push(' ');
                out.push_str(&perf.to_string());
            }
        }

        out
    }

    /// Prints the check output and terminates with the matching exit code.
    pub fn print_and_exit(&self) -> ! {
        println!("{}", self.to_check_string());
        process::exit(self.state().exit_code());
    }
}

fn sanitize(text: &str) -> String {
    text.replace('|', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Unit;

    #[test]
    fn test_summary_only() {
        let mut resource = Resource::new("No containers currently running on this system!");
        resource.set_state(ServiceState::Ok);
        assert_eq!(
            resource.to_check_string(),
            "OK - No containers currently running on this system!"
        );
    }

    #[test]
    fn test_aggregate_is_max_severity() {
        let mut resource = Resource::new("Some monitored containers are offline!");
        for _ in 0..9 {
            resource.push_record(ServiceState::Ok, "fine");
        }
        resource.push_record(ServiceState::Critical, "broken");
        assert_eq!(resource.state(), ServiceState::Critical);
    }

    #[test]
    fn test_empty_resource_is_ok() {
        assert_eq!(Resource::new("nothing to do").state(), ServiceState::Ok);
    }

    #[test]
    fn test_explicit_state_wins() {
        let mut resource = Resource::new("ceph is fine");
        resource.push_record(ServiceState::Critical, "osd down");
        resource.set_state(ServiceState::Warning);
        assert_eq!(resource.state(), ServiceState::Warning);
    }

    #[test]
    fn test_detail_and_perf_data_rendering() {
        let mut resource = Resource::new("Storage warning. Please check:");
        resource.push_record(ServiceState::Warning, "Name: local, Usage: 82% (82 GB / 100 GB)");
        resource.push_perf_data(
            PerfData::new("local", 82.0)
                .unit(Unit::Percentage)
                .warning(80.0)
                .critical(90.0)
                .min(0.0)
                .max(100.0),
        );
        assert_eq!(
            resource.to_check_string(),
            "WARNING - Storage warning. Please check:\n\n\
             [WARNING] Name: local, Usage: 82% (82 GB / 100 GB) | local=82%;80;90;0;100"
        );
    }

    #[test]
    fn test_pipe_is_sanitized() {
        let mut resource = Resource::new("value = a|b");
        resource.set_state(ServiceState::Ok);
        assert_eq!(resource.to_check_string(), "OK - value = a/b");
    }

    #[test]
    fn test_notes_do_not_affect_state() {
        let mut resource = Resource::new("All monitored containers are online!");
        resource.push_record(ServiceState::Ok, "web is running");
        resource.push_note("Some online containers are not in monitoring:");
        resource.push_note(" - db");
        assert_eq!(resource.state(), ServiceState::Ok);
        assert!(resource.to_check_string().contains(" - db"));
    }
}
