use std::fmt::Display;

use crate::{Resource, ServiceState};

/// The outermost boundary of a check.
///
/// Whatever happens inside the check closure, the process ends with a valid
/// status line and exit code. Unclassified failures become `UNKNOWN` with a
/// "could not retrieve status" message; a check with more specific failure
/// wording installs it via [`Runner::on_error`].
///
/// ```no_run
/// use icinga_checks::{CheckError, Resource, Runner};
///
/// fn do_check() -> Result<Resource, CheckError> {
///     Ok(Resource::new("everything is fine"))
/// }
///
/// fn main() {
///     Runner::new().safe_run(do_check).print_and_exit();
/// }
/// ```
pub struct Runner<E> {
    on_error: Option<Box<dyn FnOnce(&E) -> (ServiceState, String)>>,
}

impl<E: Display> Runner<E> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Runner { on_error: None }
    }

    /// Replaces the default error handler. The closure maps the error to the
    /// state and message that get reported.
    pub fn on_error(mut self, f: impl FnOnce(&E) -> (ServiceState, String) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn safe_run(self, f: impl FnOnce() -> Result<Resource, E>) -> RunnerResult {
        match f() {
            Ok(resource) => RunnerResult::Finished(resource),
            Err(err) => {
                let (state, message) = match self.on_error {
                    Some(handler) => handler(&err),
                    None => (
                        ServiceState::Unknown,
                        format!("could not retrieve status: {}", err),
                    ),
                };
                RunnerResult::Failed(state, message)
            }
        }
    }
}

pub enum RunnerResult {
    Finished(Resource),
    Failed(ServiceState, String),
}

impl RunnerResult {
    pub fn state(&self) -> ServiceState {
        match self {
            RunnerResult::Finished(resource) => resource.state(),
            RunnerResult::Failed(state, _) => *state,
        }
    }

    pub fn to_check_string(&self) -> String {
        match self {
            RunnerResult::Finished(resource) => resource.to_check_string(),
            RunnerResult::Failed(state, message) => format!("{} - {}", state, message),
        }
    }

    pub fn print_and_exit(self) -> ! {
        println!("{}", self.to_check_string());
        std::process::exit(self.state().exit_code());
    }
}
