use std::fmt;

/// Unit of measurement appended to a perf data value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Unit {
    #[default]
    None,
    Seconds,
    Percentage,
    Bytes,
    MegaBytes,
    GigaBytes,
    TeraBytes,
    Counter,
    Other(String),
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::None => "",
            Unit::Seconds => "s",
            Unit::Percentage => "%",
            Unit::Bytes => "B",
            Unit::MegaBytes => "MB",
            Unit::GigaBytes => "GB",
            Unit::TeraBytes => "TB",
            Unit::Counter => "c",
            Unit::Other(other) => other,
        };
        f.write_str(s)
    }
}

/// A single entry of the performance data block after the `|` separator.
///
/// Renders as `label=value[unit][;warn][;crit][;min][;max]`. Trailing empty
/// fields are dropped, interior semicolons stay in place as placeholders:
///
/// ```
/// use icinga_checks::PerfData;
///
/// let perf = PerfData::new("usage", 82.0).warning(80.0).critical(90.0).min(0.0);
/// assert_eq!(perf.to_string(), "usage=82;80;90;0");
/// ```
#[derive(Clone, Debug)]
pub struct PerfData {
    label: String,
    value: f64,
    unit: Unit,
    warning: Option<f64>,
    critical: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl PerfData {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        PerfData {
            label: label.into(),
            value,
            unit: Unit::None,
            warning: None,
            critical: None,
            min: None,
            max: None,
        }
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn warning(mut self, warning: f64) -> Self {
        self.warning = Some(warning);
        self
    }

    pub fn critical(mut self, critical: f64) -> Self {
        self.critical = Some(critical);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Labels may not contain `=`, quotes are doubled and anything with
    /// spaces gets single-quoted so graphing tools keep the label intact.
    fn quoted_label(&self) -> String {
        let label = self.label.replace('=', "_").replace('\'', "''");
        if label.contains(' ') {
            format!("'{}'", label)
        } else {
            label
        }
    }
}

/// Perf data values print as integers when whole, otherwise with up to two
/// decimal places.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.2}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

impl fmt::Display for PerfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = format!(
            "{}={}{}",
            self.quoted_label(),
            format_value(self.value),
            self.unit
        );
        for field in [&self.warning, &self.critical, &self.min, &self.max] {
            s.push(';');
            if let Some(v) = field {
                s.push_str(&format_value(*v));
            }
        }
        f.write_str(s.trim_end_matches(';'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value() {
        assert_eq!(PerfData::new("test", 12.0).to_string(), "test=12");
    }

    #[test]
    fn test_unit_and_thresholds() {
        let perf = PerfData::new("load", 82.5)
            .unit(Unit::Percentage)
            .warning(80.0)
            .critical(90.0)
            .min(0.0)
            .max(100.0);
        assert_eq!(perf.to_string(), "load=82.5%;80;90;0;100");
    }

    #[test]
    fn test_placeholder_semicolons_kept() {
        let perf = PerfData::new("test", 12.0).warning(14.0).min(0.0);
        assert_eq!(perf.to_string(), "test=12;14;;0");
    }

    #[test]
    fn test_trailing_fields_dropped() {
        let perf = PerfData::new("test", 12.0).warning(14.0);
        assert_eq!(perf.to_string(), "test=12;14");
    }

    #[test]
    fn test_label_sanitizing() {
        assert_eq!(PerfData::new("te=st", 0.0).to_string(), "te_st=0");
        assert_eq!(PerfData::new("te'st", 0.0).to_string(), "te''st=0");
        assert_eq!(PerfData::new("te st", 0.0).to_string(), "'te st'=0");
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(format_value(12.0), "12");
        assert_eq!(format_value(12.5), "12.5");
        assert_eq!(format_value(12.25), "12.25");
        assert_eq!(format_value(0.8), "0.8");
    }
}
