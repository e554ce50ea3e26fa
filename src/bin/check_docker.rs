//! Checks Docker containers. Without `--name` every container on the host is
//! monitored; with `--name` only the listed ones are, and a requested
//! container that does not exist is reported as critical instead of crashing
//! the check.

use clap::{CommandFactory, Parser};
use serde::Deserialize;

use icinga_checks::{icinga, CheckError, CommandProbe, Resource, Runner, ServiceState};

#[derive(Parser, Debug)]
#[command(name = "check_docker")]
struct Args {
    /// Name of docker container to be monitored (separated by ',')
    #[arg(long)]
    name: Option<String>,
}

/// One line of `docker ps --all --format {{json .}}`.
#[derive(Debug, Deserialize)]
struct ContainerRow {
    #[serde(rename = "Names")]
    name: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "RunningFor", default)]
    running_for: String,
}

impl ContainerRow {
    fn is_running(&self) -> bool {
        self.state.contains("running")
    }

    /// Synthetic placeholder for a requested container docker knows nothing
    /// about.
    fn absent(name: &str) -> Self {
        ContainerRow {
            name: name.to_string(),
            image: "n/a".to_string(),
            state: "off".to_string(),
            running_for: String::new(),
        }
    }

    fn uptime(&self) -> &str {
        self.running_for.trim_end_matches(" ago")
    }
}

fn main() {
    icinga::print_command_config_if_requested("check_docker", &Args::command());
    let args = Args::parse();

    Runner::new()
        .on_error(|_err: &CheckError| {
            (
                ServiceState::Unknown,
                "Could not get container list. Please check permissions!".to_string(),
            )
        })
        .safe_run(|| {
            let rows = fetch_containers()?;
            Ok(evaluate(rows, args.name.as_deref()))
        })
        .print_and_exit()
}

fn fetch_containers() -> Result<Vec<ContainerRow>, CheckError> {
    let stdout = CommandProbe::new("docker")
        .args(["ps", "--all", "--format", "{{json .}}"])
        .run()?;
    parse_container_lines(&stdout)
}

fn parse_container_lines(stdout: &str) -> Result<Vec<ContainerRow>, CheckError> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| CheckError::parse("docker ps", e.to_string()))
        })
        .collect()
}

fn evaluate(rows: Vec<ContainerRow>, names: Option<&str>) -> Resource {
    let requested: Vec<&str> = names
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();

    if rows.is_empty() && requested.is_empty() {
        let mut resource = Resource::new("No containers currently running on this system!");
        resource.set_state(ServiceState::Ok);
        return resource;
    }

    // with --name only the listed containers are monitored, missing ones get
    // a synthetic record; without it everything docker reports is monitored
    let monitored: Vec<ContainerRow> = if requested.is_empty() {
        rows
    } else {
        let mut monitored = Vec::new();
        let mut remaining = rows;
        for name in &requested {
            match remaining.iter().position(|row| &row.name == name) {
                Some(idx) => monitored.push(remaining.remove(idx)),
                None => monitored.push(ContainerRow::absent(name)),
            }
        }
        let unmonitored: Vec<String> = remaining
            .iter()
            .filter(|row| row.is_running())
            .map(|row| row.name.clone())
            .collect();
        return build_resource(monitored, unmonitored);
    };

    build_resource(monitored, Vec::new())
}

fn build_resource(monitored: Vec<ContainerRow>, unmonitored: Vec<String>) -> Resource {
    let mut resource = Resource::new("");

    for row in &monitored {
        if row.is_running() {
            resource.push_record(
                ServiceState::Ok,
                format!(
                    "{} with image {}, Uptime: {}",
                    row.name,
                    row.image,
                    row.uptime()
                ),
            );
        } else {
            resource.push_record(
                ServiceState::Critical,
                format!("{} with image {} is not running!", row.name, row.image),
            );
        }
    }

    if !unmonitored.is_empty() {
        resource.push_note("");
        resource.push_note("Some online containers are not in monitoring:");
        for name in unmonitored {
            resource.push_note(format!(" - {}", name));
        }
    }

    if resource.state() == ServiceState::Ok {
        resource.set_summary("All monitored containers are online!");
    } else {
        resource.set_summary("Some monitored containers are offline!");
    }

    resource
}
