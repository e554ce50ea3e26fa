//! Checks an APC UPS through `apcaccess`, reporting a single status field
//! with optional threshold evaluation and performance data.

use clap::{CommandFactory, Parser, ValueEnum};

use icinga_checks::{
    icinga, CheckError, CommandProbe, Direction, PerfData, Resource, Runner, ServiceState,
    Thresholds,
};

const APCACCESS: &str = "/usr/sbin/apcaccess";

#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "UPPER")]
enum Field {
    Version,
    Model,
    Status,
    Linev,
    Loadpct,
    Bcharge,
    Timeleft,
    Battdate,
}

impl Field {
    fn as_str(&self) -> &'static str {
        match self {
            Field::Version => "VERSION",
            Field::Model => "MODEL",
            Field::Status => "STATUS",
            Field::Linev => "LINEV",
            Field::Loadpct => "LOADPCT",
            Field::Bcharge => "BCHARGE",
            Field::Timeleft => "TIMELEFT",
            Field::Battdate => "BATTDATE",
        }
    }

    fn perf_label(&self) -> String {
        self.as_str().to_lowercase()
    }
}

#[derive(Parser, Debug)]
#[command(name = "check_apcups")]
struct Args {
    /// Info category to choose
    #[arg(short, long, value_enum)]
    info: Field,

    /// Warning value
    #[arg(short, long)]
    warning: Option<f64>,

    /// Critical value
    #[arg(short, long)]
    critical: Option<f64>,

    /// Reverse the result (lower values are worse)
    #[arg(short, long)]
    reverse: bool,

    /// Include performance data in the output
    #[arg(short, long)]
    prefdata: bool,
}

fn main() {
    icinga::print_command_config_if_requested("check_apcups", &Args::command());
    let args = Args::parse();

    Runner::new()
        .on_error(report_error)
        .safe_run(|| run(&args))
        .print_and_exit()
}

fn run(args: &Args) -> Result<Resource, CheckError> {
    let direction = if args.reverse {
        Direction::LowerIsWorse
    } else {
        Direction::HigherIsWorse
    };
    // reject an incomplete commandline before touching the UPS
    let thresholds = Thresholds::from_args(args.warning, args.critical, direction)?;

    let output = CommandProbe::new(APCACCESS)
        .args(["-p", args.info.as_str()])
        .run()?;

    evaluate(args.info, &output, thresholds, args.prefdata)
}

fn evaluate(
    field: Field,
    output: &str,
    thresholds: Option<Thresholds>,
    prefdata: bool,
) -> Result<Resource, CheckError> {
    let value = output
        .split_whitespace()
        .next()
        .ok_or_else(|| CheckError::parse(APCACCESS, format!("empty value for {}", field.as_str())))?;

    let mut resource = Resource::new(format!("Value = {}", output.replace('\n', "")));

    match thresholds {
        Some(thresholds) => {
            let measurement: f64 = value.parse().map_err(|_| {
                CheckError::parse(
                    APCACCESS,
                    format!("non-numeric value for {}: {}", field.as_str(), value),
                )
            })?;
            resource.set_state(thresholds.evaluate(measurement));
            if prefdata {
                resource.push_perf_data(
                    PerfData::new(field.perf_label(), measurement)
                        .warning(thresholds.warning())
                        .critical(thresholds.critical()),
                );
            }
        }
        None => {
            resource.set_state(ServiceState::Ok);
            if prefdata {
                // string fields like STATUS or BATTDATE have no numeric
                // representation and stay out of the perf data block
                if let Ok(measurement) = value.parse::<f64>() {
                    resource.push_perf_data(PerfData::new(field.perf_label(), measurement));
                }
            }
        }
    }

    Ok(resource)
}

fn report_error(err: &CheckError) -> (ServiceState, String) {
    let message = match err {
        CheckError::Spawn { .. } | CheckError::CommandFailed { .. } => {
            "Could not get value. Please check if apcaccess is installed and configured!".to_string()
        }
        CheckError::IncompleteArgs => "Commandline incomplete!".to_string(),
        other => format!("could not retrieve status: {}", other),
    };
    (ServiceState::Unknown, message)
}
