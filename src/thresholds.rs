use crate::{CheckError, ServiceState};

/// Which side of a threshold is the bad one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Exceeding the bound is worse (disk usage, load, snapshot age).
    HigherIsWorse,
    /// Falling below the bound is worse (battery charge, days until full).
    LowerIsWorse,
}

/// A validated (warning, critical) pair with a direction.
///
/// Comparison is inclusive at the bound: with `HigherIsWorse` a measurement
/// equal to the critical value is already critical, with `LowerIsWorse` a
/// measurement equal to it is likewise critical.
///
/// ```
/// use icinga_checks::{Direction, ServiceState, Thresholds};
///
/// let t = Thresholds::new(80.0, 90.0, Direction::HigherIsWorse).unwrap();
/// assert_eq!(t.evaluate(82.0), ServiceState::Warning);
/// assert_eq!(t.evaluate(90.0), ServiceState::Critical);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Thresholds {
    warning: f64,
    critical: f64,
    direction: Direction,
}

impl Thresholds {
    /// Fails when the warning bound is not strictly less severe than the
    /// critical bound in the given direction.
    pub fn new(warning: f64, critical: f64, direction: Direction) -> Result<Self, CheckError> {
        let ordered = match direction {
            Direction::HigherIsWorse => warning < critical,
            Direction::LowerIsWorse => warning > critical,
        };
        if !ordered {
            return Err(CheckError::InvalidThresholds { warning, critical });
        }
        Ok(Thresholds {
            warning,
            critical,
            direction,
        })
    }

    /// Builds thresholds from the uniform `-w`/`-c` CLI surface. The pair is
    /// all-or-nothing: a lone warning or critical value is an incomplete
    /// commandline and is rejected before any external call is made.
    pub fn from_args(
        warning: Option<f64>,
        critical: Option<f64>,
        direction: Direction,
    ) -> Result<Option<Self>, CheckError> {
        match (warning, critical) {
            (Some(w), Some(c)) => Ok(Some(Thresholds::new(w, c, direction)?)),
            (None, None) => Ok(None),
            _ => Err(CheckError::IncompleteArgs),
        }
    }

    /// Like [`Thresholds::from_args`] but for sub-checks where the thresholds
    /// are mandatory.
    pub fn require_args(
        warning: Option<f64>,
        critical: Option<f64>,
        direction: Direction,
    ) -> Result<Self, CheckError> {
        Thresholds::from_args(warning, critical, direction)?.ok_or(CheckError::IncompleteArgs)
    }

    pub fn warning(&self) -> f64 {
        self.warning
    }

    pub fn critical(&self) -> f64 {
        self.critical
    }

    pub fn evaluate(&self, measurement: f64) -> ServiceState {
        let crossed = |bound: f64| match self.direction {
            Direction::HigherIsWorse => measurement >= bound,
            Direction::LowerIsWorse => measurement <= bound,
        };
        if crossed(self.critical) {
            ServiceState::Critical
        } else if crossed(self.warning) {
            ServiceState::Warning
        } else {
            ServiceState::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_is_worse_inclusive_bounds() {
        let t = Thresholds::new(15.0, 30.0, Direction::HigherIsWorse).unwrap();
        assert_eq!(t.evaluate(12.0), ServiceState::Ok);
        assert_eq!(t.evaluate(15.0), ServiceState::Warning);
        assert_eq!(t.evaluate(18.0), ServiceState::Warning);
        assert_eq!(t.evaluate(30.0), ServiceState::Critical);
        assert_eq!(t.evaluate(35.0), ServiceState::Critical);
    }

    #[test]
    fn test_lower_is_worse_inclusive_bounds() {
        let t = Thresholds::new(30.0, 15.0, Direction::LowerIsWorse).unwrap();
        assert_eq!(t.evaluate(35.0), ServiceState::Ok);
        assert_eq!(t.evaluate(30.0), ServiceState::Warning);
        assert_eq!(t.evaluate(20.0), ServiceState::Warning);
        assert_eq!(t.evaluate(15.0), ServiceState::Critical);
        assert_eq!(t.evaluate(10.0), ServiceState::Critical);
    }

    #[test]
    fn test_misordered_bounds_rejected() {
        assert!(matches!(
            Thresholds::new(90.0, 80.0, Direction::HigherIsWorse),
            Err(CheckError::InvalidThresholds { .. })
        ));
        assert!(matches!(
            Thresholds::new(15.0, 30.0, Direction::LowerIsWorse),
            Err(CheckError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn test_from_args_is_all_or_nothing() {
        assert!(Thresholds::from_args(None, None, Direction::HigherIsWorse)
            .unwrap()
            .is_none());
        assert!(
            Thresholds::from_args(Some(80.0), Some(90.0), Direction::HigherIsWorse)
                .unwrap()
                .is_some()
        );
        assert!(matches!(
            Thresholds::from_args(Some(80.0), None, Direction::HigherIsWorse),
            Err(CheckError::IncompleteArgs)
        ));
        assert!(matches!(
            Thresholds::require_args(None, None, Direction::HigherIsWorse),
            Err(CheckError::IncompleteArgs)
        ));
    }
}
