//! Checks a Proxmox VE node through `pvesh`: cluster quorum members, ceph
//! health, storage usage, physical disk health, VM snapshot age and the
//! installed version.

use std::collections::BTreeMap;

use chrono::Utc;
use clap::{CommandFactory, Parser, ValueEnum};
use serde::Deserialize;

use icinga_checks::util::{bytes_to_gb, format_duration};
use icinga_checks::{
    format_value, hostname, icinga, CheckError, CommandProbe, Direction, PerfData, Resource,
    Runner, ServiceState, Thresholds,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Info {
    HostVersion,
    ClusterStatus,
    CephStatus,
    StorageStatus,
    DiskStatus,
    VmsStatus,
}

#[derive(Parser, Debug)]
#[command(name = "check_proxmox")]
struct Args {
    /// Info category to choose
    #[arg(short, long, value_enum)]
    info: Info,

    /// Warning in percent (storage-status) or days (vms-status)
    #[arg(short, long)]
    warning: Option<f64>,

    /// Critical in percent (storage-status) or days (vms-status)
    #[arg(short, long)]
    critical: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PveVersion {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ClusterEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    ip: String,
    #[serde(default)]
    online: u8,
}

#[derive(Debug, Deserialize)]
struct CephStatus {
    health: CephHealth,
}

#[derive(Debug, Deserialize)]
struct CephHealth {
    status: String,
    #[serde(default)]
    checks: BTreeMap<String, CephCheck>,
}

#[derive(Debug, Deserialize)]
struct CephCheck {
    summary: CephSummary,
}

#[derive(Debug, Deserialize)]
struct CephSummary {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StorageEntry {
    storage: String,
    #[serde(default)]
    active: u8,
    #[serde(default)]
    used: u64,
    #[serde(default)]
    total: u64,
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
    health: String,
}

fn unknown() -> String {
    "UNKNOWN".to_string()
}

#[derive(Debug, Deserialize)]
struct VmEntry {
    vmid: u64,
    #[serde(default)]
    name: String,
    status: String,
    #[serde(default)]
    uptime: i64,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    name: String,
    #[serde(default)]
    snaptime: Option<i64>,
}

fn main() {
    icinga::print_command_config_if_requested("check_proxmox", &Args::command());
    let args = Args::parse();

    Runner::new()
        .on_error(report_error)
        .safe_run(|| run(&args))
        .print_and_exit()
}

fn pvesh<T: for<'de> Deserialize<'de>>(path: &str) -> Result<T, CheckError> {
    CommandProbe::new("pvesh")
        .sudo()
        .args(["get", path, "--output-format", "json"])
        .run_json()
}

fn run(args: &Args) -> Result<Resource, CheckError> {
    match args.info {
        Info::HostVersion => {
            let version: PveVersion = pvesh("/version")?;
            let mut resource = Resource::new(format!(
                "{} - Proxmox Version: {}",
                hostname()?,
                version.version
            ));
            resource.set_state(ServiceState::Ok);
            Ok(resource)
        }
        Info::ClusterStatus => {
            let entries: Vec<ClusterEntry> = pvesh("/cluster/status")?;
            Ok(evaluate_cluster(&entries))
        }
        Info::CephStatus => {
            let status: CephStatus = pvesh("/cluster/ceph/status")?;
            Ok(evaluate_ceph(&status))
        }
        Info::StorageStatus => {
            let thresholds =
                Thresholds::require_args(args.warning, args.critical, Direction::HigherIsWorse)?;
            let entries: Vec<StorageEntry> =
                pvesh(&format!("/nodes/{}/storage", hostname()?))?;
            Ok(evaluate_storage(&entries, &thresholds))
        }
        Info::DiskStatus => {
            let disks: Vec<DiskEntry> = pvesh(&format!("/nodes/{}/disks/list", hostname()?))?;
            Ok(evaluate_disks(&disks))
        }
        Info::VmsStatus => {
            let thresholds =
                Thresholds::require_args(args.warning, args.critical, Direction::HigherIsWorse)?;
            let node = hostname()?;
            let vms: Vec<VmEntry> = pvesh(&format!("/nodes/{}/qemu", node))?;
            // one secondary fetch per VM for its snapshot list
            let mut vms_with_snapshots = Vec::with_capacity(vms.len());
            for vm in vms {
                let snapshots: Vec<Snapshot> =
                    pvesh(&format!("/nodes/{}/qemu/{}/snapshot", node, vm.vmid))?;
                vms_with_snapshots.push((vm, snapshots));
            }
            Ok(evaluate_vms(
                &vms_with_snapshots,
                &thresholds,
                Utc::now().timestamp(),
            ))
        }
    }
}

fn evaluate_cluster(entries: &[ClusterEntry]) -> Resource {
    let mut resource = Resource::new("");

    for entry in entries.iter().filter(|e| e.kind == "node") {
        if entry.online == 1 {
            resource.push_record(
                ServiceState::Ok,
                format!("{} with IP {} is online", entry.name, entry.ip),
            );
        } else {
            resource.push_record(
                ServiceState::Critical,
                format!("{} with IP {} is offline", entry.name, entry.ip),
            );
        }
    }

    if resource.state() == ServiceState::Ok {
        resource.set_summary("All host(s) are ok!");
    } else {
        resource.set_summary("One or more host(s) are offline!");
    }
    resource
}

fn evaluate_ceph(status: &CephStatus) -> Resource {
    let (state, summary, prefix) = match status.health.status.as_str() {
        "HEALTH_OK" => (ServiceState::Ok, "Ceph is healthy!", None),
        "HEALTH_WARN" => (
            ServiceState::Warning,
            "Ceph is in warn state. Please check:",
            Some("Warning"),
        ),
        "HEALTH_ERR" => (
            ServiceState::Critical,
            "Ceph is in error state. Please check:",
            Some("Error"),
        ),
        _ => (
            ServiceState::Unknown,
            "Unable to get ceph health status!",
            None,
        ),
    };

    let mut resource = Resource::new(summary);
    resource.set_state(state);
    if let Some(prefix) = prefix {
        for (name, check) in &status.health.checks {
            resource.push_note(format!(
                "{}: {} Message: {}",
                prefix, name, check.summary.message
            ));
        }
    }
    resource
}

fn evaluate_storage(entries: &[StorageEntry], thresholds: &Thresholds) -> Resource {
    let mut resource = Resource::new("");

    for entry in entries.iter().filter(|e| e.active == 1) {
        let usage = if entry.total == 0 {
            0.0
        } else {
            (entry.used as f64 / entry.total as f64 * 100.0).round()
        };
        let state = thresholds.evaluate(usage);
        resource.push_record(
            state,
            format!(
                "Name: {}, Usage: {}% ({} GB / {} GB)",
                entry.storage,
                format_value(usage),
                format_value(bytes_to_gb(entry.used)),
                format_value(bytes_to_gb(entry.total))
            ),
        );
        resource.push_perf_data(
            PerfData::new(&entry.storage, usage)
                .warning(thresholds.warning())
                .critical(thresholds.critical())
                .min(0.0)
                .max(bytes_to_gb(entry.total)),
        );
    }

    let summary = match resource.state() {
        ServiceState::Critical => "Storage critical. Please check:",
        ServiceState::Warning => "Storage warning. Please check:",
        _ => "Storage OK!",
    };
    resource.set_summary(summary);
    resource
}

fn disk_is_healthy(health: &str) -> bool {
    matches!(health.to_uppercase().as_str(), "OK" | "PASSED" | "UNKNOWN")
}

fn evaluate_disks(disks: &[DiskEntry]) -> Resource {
    let mut resource = Resource::new("");

    for disk in disks {
        let name = if disk.vendor.contains("unknown") || disk.vendor.is_empty() {
            disk.model.clone()
        } else {
            format!("{} {}", disk.vendor.replace(' ', ""), disk.model)
        };
        let state = if disk_is_healthy(&disk.health) {
            ServiceState::Ok
        } else {
            ServiceState::Critical
        };
        resource.push_record(
            state,
            format!(
                "Name: {}, Size: {} GB, Path: {}",
                name,
                format_value(bytes_to_gb(disk.size)),
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

fn evaluate_vms(
    vms: &[(VmEntry, Vec<Snapshot>)],
    thresholds: &Thresholds,
    now_ts: i64,
) -> Resource {
    let mut resource = Resource::new("");

    for (vm, snapshots) in vms {
        let mut line = format!(
            "Name: {}({}), Status: {}, Uptime: {}",
            vm.name,
            vm.vmid,
            vm.status,
            format_duration(vm.uptime)
        );

        let mut vm_state = ServiceState::Ok;
        let aged: Vec<String> = snapshots
            .iter()
            .filter(|s| s.name != "current")
            .map(|s| {
                let age_days = (now_ts - s.snaptime.unwrap_or(now_ts)) / 86_400;
                vm_state = vm_state.max(thresholds.evaluate(age_days as f64));
                format!("{} ({} days)", s.name, age_days)
            })
            .collect();
        if !aged.is_empty() {
            line.push_str(&format!(", {} Snapshot(s): {}", aged.len(), aged.join(", ")));
        }

        resource.push_record(vm_state, line);
    }

    if resource.state() == ServiceState::Ok {
        resource.set_summary("All VMs are OK!");
    } else {
        resource.set_summary("One or more vms have old snapshots. Please check:");
    }
    resource
}

fn report_error(err: &CheckError) -> (ServiceState, String) {
    let message = match err {
        CheckError::IncompleteArgs => "Commandline incomplete!".to_string(),
        other => format!("could not retrieve status: {}", other),
    };
    (ServiceState::Unknown, message)
}
