//! Renders a check's clap definition as an Icinga 2 `CheckCommand` object so
//! the plugin can be registered on the monitoring host without hand-written
//! configuration. Triggered by setting the `GENERATE_ICINGA_COMMAND`
//! environment variable before running the check.

use crate::CheckError;

pub struct CheckCommandConfig {
    arguments: Vec<CommandArgument>,
}

struct CommandArgument {
    flag: String,
    variable: String,
    description: Option<String>,
    is_switch: bool,
    default_value: Option<String>,
}

impl CheckCommandConfig {
    pub fn from_command(cmd: &clap::Command) -> Result<Self, CheckError> {
        let mut arguments = Vec::new();

        for arg in cmd.get_arguments() {
            let Some(long) = arg.get_long() else {
                // help/version and other flags without a long form have no
                // place in a CheckCommand definition
                continue;
            };

            let is_switch = {
                let values = arg.get_possible_values();
                values.len() == 2
                    && values.iter().any(|v| v.get_name() == "true")
                    && values.iter().any(|v| v.get_name() == "false")
            };

            arguments.push(CommandArgument {
                flag: format!("--{}", long),
                variable: long.replace('-', "_"),
                description: arg.get_help().map(|s| s.to_string()),
                is_switch,
                default_value: arg
                    .get_default_values()
                    .first()
                    .and_then(|v| v.to_str())
                    .map(|s| s.to_string()),
            });
        }

        Ok(CheckCommandConfig { arguments })
    }

    pub fn render(&self, name: &str) -> Result<String, CheckError> {
        let exe = std::env::current_exe().map_err(|source| CheckError::Spawn {
            command: "current_exe".to_string(),
            source,
        })?;
        let exe = exe.to_string_lossy();

        let mut out = format!("object CheckCommand \"{}\" {{\n", name);
        out.push_str(&format!("  command = [ \"{}\" ]\n", exe));
        out.push_str("  arguments = {\n");
        for arg in &self.arguments {
            out.push_str(&format!("  \"{}\" = {{\n", arg.flag));
            if arg.is_switch {
                out.push_str(&format!("    set_if = \"${}$\"\n", arg.variable));
            } else {
                out.push_str(&format!("    value = \"${}$\"\n", arg.variable));
            }
            if let Some(description) = &arg.description {
                out.push_str(&format!(
                    "    description = \"{}\"\n",
                    escape(description)
                ));
            }
            out.push_str("  }\n");
        }
        out.push_str("\n");

        for arg in &self.arguments {
            if let Some(default_value) = &arg.default_value {
                out.push_str(&format!(
                    "  vars.{} = \"{}\"\n",
                    arg.variable,
                    escape(default_value)
                ));
            }
        }

        out.push_str("}\n");
        Ok(out)
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('$', "\\$")
}

/// When `GENERATE_ICINGA_COMMAND` is set, prints the CheckCommand object for
/// this check and exits instead of running it.
pub fn print_command_config_if_requested(name: &str, cmd: &clap::Command) {
    if std::env::var("GENERATE_ICINGA_COMMAND").is_err() {
        return;
    }

    match CheckCommandConfig::from_command(cmd).and_then(|c| c.render(name)) {
        Ok(out) => {
            println!("{}", out.trim());
            std::process::exit(0);
        }
        Err(err) => {
            println!("UNKNOWN - could not generate command config: {}", err);
            std::process::exit(crate::ServiceState::Unknown.exit_code());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};

    fn sample_command() -> Command {
        Command::new("check_sample")
            .arg(
                Arg::new("warning")
                    .long("warning")
                    .help("Warning in percent"),
            )
            .arg(
                Arg::new("critical")
                    .long("critical")
                    .help("Critical in percent")
                    .default_value("90"),
            )
            .arg(
                Arg::new("reverse")
                    .long("reverse")
                    .action(ArgAction::SetTrue)
                    .help("Reverse the result"),
            )
    }

    #[test]
    fn test_render_check_command() {
        let config = CheckCommandConfig::from_command(&sample_command()).unwrap();
        let out = config.render("check_sample").unwrap();

        assert!(out.starts_with("object CheckCommand \"check_sample\" {"));
        assert!(out.contains("\"--warning\" = {"));
        assert!(out.contains("    value = \"$warning$\""));
        assert!(out.contains("    set_if = \"$reverse$\""));
        assert!(out.contains("  vars.critical = \"90\""));
        assert!(out.trim_end().ends_with('}'));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"say "hi" for $5"#), r#"say \"hi\" for \$5"#);
    }
}
