//! Checks a BigBlueButton cluster behind a Scalelite load balancer. The
//! Scalelite status table provides one row per BBB server; each row is
//! evaluated against the fixed administrative/operational state table and the
//! meeting/user/video counts are folded into cluster totals.

use clap::{CommandFactory, Parser};

use icinga_checks::{
    hostname, icinga, CheckError, CommandProbe, PerfData, Resource, Runner, ServiceState,
};

#[derive(Parser, Debug)]
#[command(name = "check_bbb_cluster")]
struct Args {}

/// One row of `rake status`: hostname, administrative state, operational
/// status and the per-server counters.
#[derive(Debug, PartialEq)]
struct BbbServer {
    hostname: String,
    state: String,
    status: String,
    meetings: u64,
    users: u64,
    largest_meeting: u64,
    videos: u64,
    // carried for schema completeness, the status line does not show it
    #[allow(dead_code)]
    load: String,
    version: String,
}

impl BbbServer {
    /// The fixed state table: enabled+offline is critical, disabled+offline
    /// is a warning, a disabled but online server is fine and only flagged.
    fn service_state(&self) -> ServiceState {
        match (self.state.as_str(), self.status.as_str()) {
            ("enabled", "offline") => ServiceState::Critical,
            ("disabled", "offline") => ServiceState::Warning,
            _ => ServiceState::Ok,
        }
    }

    fn flag(&self) -> Option<&'static str> {
        match (self.state.as_str(), self.status.as_str()) {
            ("enabled", "offline") => Some("enabled but offline"),
            ("disabled", "offline") => Some("disabled and offline"),
            ("disabled", _) => Some("disabled in Scalelite"),
            _ => None,
        }
    }
}

/// Cluster-wide totals, folded from the per-server rows.
#[derive(Debug, Default, PartialEq)]
struct ClusterTotals {
    meetings: u64,
    users: u64,
    videos: u64,
}

impl ClusterTotals {
    fn fold(servers: &[BbbServer]) -> Self {
        servers.iter().fold(ClusterTotals::default(), |acc, s| {
            ClusterTotals {
                meetings: acc.meetings + s.meetings,
                users: acc.users + s.users,
                videos: acc.videos + s.videos,
            }
        })
    }
}

fn main() {
    icinga::print_command_config_if_requested("check_bbb_cluster", &Args::command());
    let _args = Args::parse();

    Runner::<CheckError>::new()
        .safe_run(|| {
            let stdout = CommandProbe::new("docker")
                .sudo()
                .args(["exec", "scalelite-api", "./bin/rake", "status"])
                .run()?;
            let servers = parse_status_table(&stdout)?;
            let local = hostname()?;
            Ok(evaluate(&local, &servers))
        })
        .print_and_exit()
}

/// Parses the Scalelite status table. The first line is the column header;
/// every following non-empty line must have exactly nine fields.
fn parse_status_table(stdout: &str) -> Result<Vec<BbbServer>, CheckError> {
    stdout
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(parse_status_line)
        .collect()
}

fn parse_status_line(line: &str) -> Result<BbbServer, CheckError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 9 {
        return Err(CheckError::parse(
            "rake status",
            format!("expected 9 fields, got {}: {}", fields.len(), line),
        ));
    }

    let count = |idx: usize, name: &str| -> Result<u64, CheckError> {
        fields[idx].parse().map_err(|_| {
            CheckError::parse(
                "rake status",
                format!("non-numeric {} for {}: {}", name, fields[0], fields[idx]),
            )
        })
    };

    Ok(BbbServer {
        // short hostname, the domain just clutters the status line
        hostname: fields[0].split('.').next().unwrap_or(fields[0]).to_string(),
        state: fields[1].to_string(),
        status: fields[2].to_string(),
        meetings: count(3, "meetings")?,
        users: count(4, "users")?,
        largest_meeting: count(5, "largest meeting")?,
        videos: count(6, "videos")?,
        load: fields[7].to_string(),
        version: fields[8].to_string(),
    })
}

fn evaluate(local_hostname: &str, servers: &[BbbServer]) -> Resource {
    let totals = ClusterTotals::fold(servers);

    let mut resource = Resource::new(format!(
        "{} - Meetings: {}, User: {}, Video: {}",
        local_hostname, totals.meetings, totals.users, totals.videos
    ));

    for server in servers {
        let mut line = format!(
            "{} Meetings: {}, Users: {}, Videos: {}, Largest-Meeting: {}, BBB-Version: {}",
            server.hostname,
            server.meetings,
            server.users,
            server.videos,
            server.largest_meeting,
            server.version
        );
        if let Some(flag) = server.flag() {
            line.push_str(&format!(" ({})", flag));
        }
        resource.push_record(server.service_state(), line);
    }

    resource.push_perf_data(PerfData::new("total_meetings", totals.meetings as f64));
    resource.push_perf_data(PerfData::new("total_user", totals.users as f64));
    resource.push_perf_data(PerfData::new("total_video", totals.videos as f64));

    resource
}
