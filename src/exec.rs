use std::process::Command;

use serde::de::DeserializeOwned;

use crate::CheckError;

/// One external probe invocation: the program, its arguments and whether it
/// has to run through sudo. All the vendor CLIs behind these checks are
/// wrapped in this so fetch failures surface uniformly.
#[derive(Debug)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
    sudo: bool,
}

impl CommandProbe {
    pub fn new(program: impl Into<String>) -> Self {
        CommandProbe {
            program: program.into(),
            args: Vec::new(),
            sudo: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Runs the command through `sudo`, as the monitoring user does for the
    /// vendor CLIs that require root.
    pub fn sudo(mut self) -> Self {
        self.sudo = true;
        self
    }

    fn command_line(&self) -> String {
        let mut parts = Vec::new();
        if self.sudo {
            parts.push("sudo");
        }
        parts.push(&self.program);
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }

    /// Runs the probe and returns its stdout. Spawn failures and non-zero
    /// exits are fetch errors carrying the command line for the report.
    pub fn run(&self) -> Result<String, CheckError> {
        let mut command = if self.sudo {
            let mut c = Command::new("sudo");
            c.arg(&self.program);
            c
        } else {
            Command::new(&self.program)
        };
        command.args(&self.args);

        let output = command.output().map_err(|source| CheckError::Spawn {
            command: self.command_line(),
            source,
        })?;

        if !output.status.success() {
            return Err(CheckError::CommandFailed {
                command: self.command_line(),
                status: output.status.to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| {
            CheckError::parse(self.command_line(), format!("output is not UTF-8: {}", e))
        })
    }

    /// Runs the probe and decodes its stdout as JSON into `T`. A shape
    /// mismatch is a parse error, not a crash.
    pub fn run_json<T: DeserializeOwned>(&self) -> Result<T, CheckError> {
        let stdout = self.run()?;
        serde_json::from_str(&stdout)
            .map_err(|e| CheckError::parse(self.command_line(), e.to_string()))
    }
}

/// The local hostname, used both in messages and in the `pvesh`/PBS API
/// paths that embed the node name. Linux only, like the checks themselves.
pub fn hostname() -> Result<String, CheckError> {
    let raw = std::fs::read_to_string("/proc/sys/kernel/hostname").map_err(|source| {
        CheckError::Spawn {
            command: "/proc/sys/kernel/hostname".to_string(),
            source,
        }
    })?;
    Ok(raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_run_captures_stdout() {
        let out = CommandProbe::new("echo").arg("hello").run().unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = CommandProbe::new("/nonexistent/probe-binary")
            .run()
            .unwrap_err();
        assert!(matches!(err, CheckError::Spawn { .. }));
    }

    #[test]
    fn test_nonzero_exit_is_command_failed() {
        let err = CommandProbe::new("sh")
            .args(["-c", "exit 3"])
            .run()
            .unwrap_err();
        match err {
            CheckError::CommandFailed { command, .. } => assert_eq!(command, "sh -c exit 3"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_run_json_decodes_and_rejects() {
        #[derive(Debug, Deserialize)]
        struct Version {
            version: String,
        }

        let v: Version = CommandProbe::new("echo")
            .arg(r#"{"version": "7.4-3"}"#)
            .run_json()
            .unwrap();
        assert_eq!(v.version, "7.4-3");

        let err = CommandProbe::new("echo")
            .arg("not json")
            .run_json::<Version>()
            .unwrap_err();
        assert!(matches!(err, CheckError::Parse { .. }));
    }

    #[test]
    fn test_hostname_is_nonempty() {
        let name = hostname().unwrap();
        assert!(!name.is_empty());
    }
}
