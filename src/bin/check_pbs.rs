//! Checks a Proxmox Backup Server: pending package updates, physical disk
//! health, datastore usage with the estimated-full horizon, and the outcome
//! of the last garbage collection run.

use chrono::{Local, TimeZone, Utc};
use clap::{CommandFactory, Parser, ValueEnum};
use serde::Deserialize;

use icinga_checks::util::{bytes_to_tb, format_duration};
use icinga_checks::{
    format_value, hostname, icinga, CheckError, CommandProbe, Direction, PerfData, Resource,
    Runner, ServiceState, Thresholds,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Info {
    HostVersion,
    DiskStatus,
    DatastoreStatus,
    GarbageCollectionStatus,
}

#[derive(Parser, Debug)]
#[command(name = "check_pbs")]
struct Args {
    /// Info category to choose
    #[arg(short, long, value_enum)]
    info: Info,

    /// Warning in days (datastore-status); for host-version its presence
    /// selects the severity of a pending update
    #[arg(short, long)]
    warning: Option<f64>,

    /// Critical in days (datastore-status); for host-version its presence
    /// selects the severity of a pending update
    #[arg(short, long)]
    critical: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PackageVersion {
    #[serde(rename = "Package")]
    package: String,
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "OldVersion", default)]
    old_version: String,
    #[serde(rename = "ExtraInfo", default)]
    extra_info: String,
}

#[derive(Debug, Deserialize)]
struct DiskEntry {
    #[serde(default)]
    vendor: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    size: u64,
    devpath: String,
    #[serde(default = "unknown")]
    status: String,
}

fn unknown() -> String {
    "UNKNOWN".to_string()
}

#[derive(Debug, Deserialize)]
struct DatastoreUsage {
    store: String,
    #[serde(default)]
    used: u64,
    #[serde(default)]
    total: u64,
    #[serde(rename = "estimated-full-date", default)]
    estimated_full_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    #[serde(default)]
    worker_type: String,
    #[serde(default)]
    worker_id: String,
    #[serde(default)]
    starttime: i64,
    #[serde(default)]
    endtime: Option<i64>,
    #[serde(default)]
    status: String,
}

fn main() {
    icinga::print_command_config_if_requested("check_pbs", &Args::command());
    let args = Args::parse();

    Runner::new()
        .on_error(report_error)
        .safe_run(|| run(&args))
        .print_and_exit()
}

fn run(args: &Args) -> Result<Resource, CheckError> {
    match args.info {
        Info::HostVersion => {
            let versions: Vec<PackageVersion> = CommandProbe::new("proxmox-backup-manager")
                .sudo()
                .args(["versions", "--output-format", "json"])
                .run_json()?;
            evaluate_version(
                &hostname()?,
                &versions,
                args.warning.is_some(),
                args.critical.is_some(),
            )
        }
        Info::DiskStatus => {
            let disks: Vec<DiskEntry> = CommandProbe::new("proxmox-backup-manager")
                .sudo()
                .args(["disk", "list", "--output-format", "json"])
                .run_json()?;
            Ok(evaluate_disks(&disks))
        }
        Info::DatastoreStatus => {
            let thresholds =
                Thresholds::require_args(args.warning, args.critical, Direction::LowerIsWorse)?;
            let stores: Vec<DatastoreUsage> = CommandProbe::new("proxmox-backup-debug")
                .sudo()
                .args(["api", "get", "status/datastore-usage", "--output-format", "json"])
                .run_json()?;
            Ok(evaluate_datastores(
                &stores,
                &thresholds,
                Utc::now().timestamp(),
            ))
        }
        Info::GarbageCollectionStatus => {
            let tasks_path = format!("nodes/{}/tasks", hostname()?);
            let tasks: Vec<TaskEntry> = CommandProbe::new("proxmox-backup-debug")
                .sudo()
                .args([
                    "api",
                    "get",
                    tasks_path.as_str(),
                    "--typefilter",
                    "garbage_collection",
                    "--limit",
                    "2",
                    "--output-format",
                    "json",
                ])
                .run_json()?;
            Ok(evaluate_garbage_collection(&tasks))
        }
    }
}

fn evaluate_version(
    host: &str,
    versions: &[PackageVersion],
    warning_requested: bool,
    critical_requested: bool,
) -> Result<Resource, CheckError> {
    let entry = versions.first().ok_or_else(|| {
        CheckError::parse("proxmox-backup-manager versions", "empty version list")
    })?;

    let update_pending = entry.version != entry.old_version;
    if update_pending && (warning_requested || critical_requested) {
        let mut resource = Resource::new(format!(
            "{} - {} {}, newest is {}",
            host, entry.package, entry.extra_info, entry.version
        ));
        resource.set_state(if critical_requested {
            ServiceState::Critical
        } else {
            ServiceState::Warning
        });
        return Ok(resource);
    }

    let mut resource = Resource::new(format!("{} - {} {}", host, entry.package, entry.extra_info));
    resource.set_state(ServiceState::Ok);
    Ok(resource)
}

fn disk_is_healthy(status: &str) -> bool {
    matches!(status.to_uppercase().as_str(), "OK" | "PASSED" | "UNKNOWN")
}

fn evaluate_disks(disks: &[DiskEntry]) -> Resource {
    let mut resource = Resource::new("");

    for disk in disks {
        let state = if disk_is_healthy(&disk.status) {
            ServiceState::Ok
        } else {
            ServiceState::Critical
        };
        resource.push_record(
            state,
            format!(
                "Name: {} {}, Size: {} TB, Path: {}",
                disk.vendor.replace(' ', ""),
                disk.model,
                format_value(bytes_to_tb(disk.size)),
                disk.devpath
            ),
        );
    }

    if resource.state() == ServiceState::Ok {
        resource.set_summary("All disks are ok!");
    } else {
        resource.set_summary("One or more disks are in error state. Please check:");
    }
    resource
}

fn evaluate_datastores(
    stores: &[DatastoreUsage],
    thresholds: &Thresholds,
    now_ts: i64,
) -> Resource {
    let mut resource = Resource::new("");

    for store in stores {
        let used_tb = bytes_to_tb(store.used);
        let total_tb = bytes_to_tb(store.total);
        let pct = if store.total == 0 {
            0.0
        } else {
            ((store.used as f64 / store.total as f64) * 10_000.0).round() / 100.0
        };

        let full_ts = store.estimated_full_date.unwrap_or(now_ts);
        let days_until_full = (full_ts - now_ts).div_euclid(86_400);
        let full_date = Local
            .timestamp_opt(full_ts, 0)
            .single()
            .map(|d| d.format("%d.%m.%Y %H:%M:%S").to_string())
            .unwrap_or_else(|| "n/a".to_string());

        resource.push_record(
            thresholds.evaluate(days_until_full as f64),
            format!(
                "{} - Usage: {} / {} TB = {}% - Estimated Full: {} ({} days)",
                store.store,
                format_value(used_tb),
                format_value(total_tb),
                format_value(pct),
                full_date,
                days_until_full
            ),
        );
        resource.push_perf_data(
            PerfData::new(format!("{}_usage", store.store), used_tb)
                .warning(total_tb * 0.8)
                .critical(total_tb * 0.9)
                .min(0.0)
                .max(total_tb),
        );
        resource.push_perf_data(PerfData::new(
            format!("{}_full", store.store),
            days_until_full as f64,
        ));
    }

    let summary = match resource.state() {
        ServiceState::Critical | ServiceState::Warning => {
            "One or more datastores are running full. Please check:"
        }
        _ => "All datastores are ok!",
    };
    resource.set_summary(summary);
    resource
}

fn evaluate_garbage_collection(tasks: &[TaskEntry]) -> Resource {
    let finished = tasks.iter().find_map(|task| {
        task.endtime.map(|endtime| (task, endtime))
    });

    match finished {
        Some((task, endtime)) => {
            if task.status == "OK" {
                let mut resource = Resource::new(format!(
                    "Last {} at {} was successful! Runtime was {}",
                    task.worker_type,
                    task.worker_id,
                    format_duration(endtime - task.starttime)
                ));
                resource.set_state(ServiceState::Ok);
                resource
            } else {
                let mut resource = Resource::new(format!(
                    "Last {} at {} failed!",
                    task.worker_type, task.worker_id
                ));
                resource.set_state(ServiceState::Warning);
                resource
            }
        }
        None => {
            let mut resource = Resource::new("No finished garbage collection task found!");
            resource.set_state(ServiceState::Unknown);
            resource
        }
    }
}

fn report_error(err: &CheckError) -> (ServiceState, String) {
    let message = match err {
        CheckError::IncompleteArgs => "Commandline incomplete!".to_string(),
        other => format!("could not retrieve status: {}", other),
    };
    (ServiceState::Unknown, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TB: u64 = 1024 * 1024 * 1024 * 1024;

    fn version_entry(version: &str, old_version: &str) -> PackageVersion {
        PackageVersion {
            package: "proxmox-backup-server".to_string(),
            version: version.to_string(),
            old_version: old_version.to_string(),
            extra_info: "2.4-1".to_string(),
        }
    }

    #[test]
    fn test_version_up_to_date_is_ok() {
        let resource =
            evaluate_version("pbs01", &[version_entry("2.4-1", "2.4-1")], true, false).unwrap();
        assert_eq!(resource.state(), ServiceState::Ok);
        assert_eq!(
            resource.to_check_string(),
            "OK - pbs01 - proxmox-backup-server 2.4-1"
        );
    }

    #[test]
    fn test_pending_update_severity_follows_flags() {
        let entries = [version_entry("2.4-2", "2.4-1")];

        let resource = evaluate_version("pbs01", &entries, true, false).unwrap();
        assert_eq!(resource.state(), ServiceState::Warning);
        assert_eq!(
            resource.to_check_string(),
            "WARNING - pbs01 - proxmox-backup-server 2.4-1, newest is 2.4-2"
        );

        let resource = evaluate_version("pbs01", &entries, false, true).unwrap();
        assert_eq!(resource.state(), ServiceState::Critical);

        let resource = evaluate_version("pbs01", &entries, false, false).unwrap();
        assert_eq!(resource.state(), ServiceState::Ok);
    }

    #[test]
    fn test_empty_version_list_is_parse_error() {
        assert!(matches!(
            evaluate_version("pbs01", &[], false, false),
            Err(CheckError::Parse { .. })
        ));
    }

    #[test]
    fn test_disk_status() {
        let disks: Vec<DiskEntry> = serde_json::from_str(
            r#"[
                {"vendor": "ATA ", "model": "WDC WD40EFRX", "size": 1649267441664,
                 "devpath": "/dev/sda", "status": "passed"},
                {"vendor": "ATA ", "model": "WDC WD40EFRX", "size": 1649267441664,
                 "devpath": "/dev/sdb", "status": "SMART error"}
            ]"#,
        )
        .unwrap();
        let resource = evaluate_disks(&disks);
        assert_eq!(resource.state(), ServiceState::Critical);

        let out = resource.to_check_string();
        assert!(out.contains("[OK] Name: ATA WDC WD40EFRX, Size: 1.5 TB, Path: /dev/sda"));
        assert!(out.contains("[CRITICAL] Name: ATA WDC WD40EFRX, Size: 1.5 TB, Path: /dev/sdb"));
    }

    #[test]
    fn test_datastore_days_until_full() {
        let now = 1_700_000_000i64;
        let day = 86_400i64;
        let stores = vec![DatastoreUsage {
            store: "backup".to_string(),
            used: TB,
            total: 2 * TB,
            estimated_full_date: Some(now + 20 * day),
        }];
        let thresholds = Thresholds::new(30.0, 7.0, Direction::LowerIsWorse).unwrap();

        let resource = evaluate_datastores(&stores, &thresholds, now);
        assert_eq!(resource.state(), ServiceState::Warning);

        let out = resource.to_check_string();
        assert!(out.starts_with(
            "WARNING - One or more datastores are running full. Please check:"
        ));
        assert!(out.contains("backup - Usage: 1 / 2 TB = 50%"));
        assert!(out.contains("(20 days)"));
        assert!(out.ends_with("| backup_usage=1;1.6;1.8;0;2 backup_full=20"));
    }

    #[test]
    fn test_datastore_imminent_full_is_critical() {
        let now = 1_700_000_000i64;
        let stores = vec![DatastoreUsage {
            store: "backup".to_string(),
            used: TB,
            total: TB,
            estimated_full_date: Some(now + 3 * 86_400),
        }];
        let thresholds = Thresholds::new(30.0, 7.0, Direction::LowerIsWorse).unwrap();
        let resource = evaluate_datastores(&stores, &thresholds, now);
        assert_eq!(resource.state(), ServiceState::Critical);
    }

    #[test]
    fn test_garbage_collection_states() {
        let ok_task = TaskEntry {
            worker_type: "garbage_collection".to_string(),
            worker_id: "backup".to_string(),
            starttime: 1_700_000_000,
            endtime: Some(1_700_000_000 + 7384),
            status: "OK".to_string(),
        };
        let resource = evaluate_garbage_collection(&[ok_task]);
        assert_eq!(resource.state(), ServiceState::Ok);
        assert_eq!(
            resource.to_check_string(),
            "OK - Last garbage_collection at backup was successful! Runtime was 2:03:04"
        );

        let failed_task = TaskEntry {
            worker_type: "garbage_collection".to_string(),
            worker_id: "backup".to_string(),
            starttime: 1_700_000_000,
            endtime: Some(1_700_000_100),
            status: "task aborted".to_string(),
        };
        let resource = evaluate_garbage_collection(&[failed_task]);
        assert_eq!(resource.state(), ServiceState::Warning);
        assert_eq!(
            resource.to_check_string(),
            "WARNING - Last garbage_collection at backup failed!"
        );
    }

    #[test]
    fn test_unfinished_tasks_only_is_unknown() {
        let running = TaskEntry {
            worker_type: "garbage_collection".to_string(),
            worker_id: "backup".to_string(),
            starttime: 1_700_000_000,
            endtime: None,
            status: String::new(),
        };
        let resource = evaluate_garbage_collection(&[running]);
        assert_eq!(resource.state(), ServiceState::Unknown);
        assert_eq!(
            resource.to_check_string(),
            "UNKNOWN - No finished garbage collection task found!"
        );
    }
}
