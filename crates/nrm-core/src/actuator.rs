use uuid::Uuid;

use crate::rcstring::RcString;
use nrm_proto::ActuatorKindSpec;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ActuatorError {
    #[error("value {value} is not in the admissible domain for this actuator")]
    OutOfDomain { value: f64 },
    #[error("discrete actuator has no admissible choices")]
    NoChoices,
}

/// The admissible-value policy for an actuator: either a fixed list of
/// discrete choices, or a continuous `[min, max]` range.
#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorKind {
    Discrete { choices: Vec<f64> },
    Continuous { min: f64, max: f64 },
}

impl ActuatorKind {
    pub fn from_spec(spec: &ActuatorKindSpec) -> Self {
        match spec {
            ActuatorKindSpec::Discrete { choices } => ActuatorKind::Discrete {
                choices: choices.clone(),
            },
            ActuatorKindSpec::Continuous { min, max } => {
                ActuatorKind::Continuous { min: *min, max: *max }
            }
        }
    }

    pub fn to_spec(&self) -> ActuatorKindSpec {
        match self {
            ActuatorKind::Discrete { choices } => ActuatorKindSpec::Discrete {
                choices: choices.clone(),
            },
            ActuatorKind::Continuous { min, max } => {
                ActuatorKindSpec::Continuous { min: *min, max: *max }
            }
        }
    }

    /// True if `value` is exactly one of the admissible values.
    pub fn validate(&self, value: f64) -> bool {
        match self {
            ActuatorKind::Discrete { choices } => choices.iter().any(|c| *c == value),
            ActuatorKind::Continuous { min, max } => value >= *min && value <= *max,
        }
    }

    /// Maps a requested value onto the nearest admissible one: the closest
    /// discrete choice, or the clamped bound for a continuous range.
    pub fn corrected_value(&self, value: f64) -> Result<f64, ActuatorError> {
        match self {
            ActuatorKind::Discrete { choices } => choices
                .iter()
                .copied()
                .min_by(|a, b| {
                    (a - value)
                        .abs()
                        .partial_cmp(&(b - value).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .ok_or(ActuatorError::NoChoices),
            ActuatorKind::Continuous { min, max } => Ok(value.clamp(*min, *max)),
        }
    }
}

/// A controllable knob with a current value, owned by whichever client
/// registered it.
#[derive(Debug, Clone, PartialEq)]
pub struct Actuator {
    pub uuid: Uuid,
    pub name: RcString,
    pub kind: ActuatorKind,
    pub value: f64,
    pub clientid: Uuid,
}

impl Actuator {
    pub fn new(
        uuid: Uuid,
        name: impl Into<RcString>,
        kind: ActuatorKind,
        initial_value: f64,
        clientid: Uuid,
    ) -> Result<Self, ActuatorError> {
        let value = kind.corrected_value(initial_value)?;
        Ok(Actuator {
            uuid,
            name: name.into(),
            kind,
            value,
            clientid,
        })
    }

    /// Attempts to actuate to `value`. Only a value the validator accepts
    /// is ever committed; an inadmissible value is rejected and `self.value`
    /// is left untouched, unlike `new`'s registration-time correction.
    pub fn actuate(&mut self, value: f64) -> Result<f64, ActuatorError> {
        if !self.kind.validate(value) {
            return Err(ActuatorError::OutOfDomain { value });
        }
        self.value = value;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_actuator_snaps_to_nearest_choice() {
        let kind = ActuatorKind::Discrete {
            choices: vec![1.0, 2.0, 4.0],
        };
        assert_eq!(kind.corrected_value(2.9).unwrap(), 2.0);
        assert_eq!(kind.corrected_value(3.1).unwrap(), 4.0);
        assert!(kind.validate(4.0));
        assert!(!kind.validate(3.0));
    }

    #[test]
    fn continuous_actuator_clamps_to_domain() {
        let kind = ActuatorKind::Continuous { min: 0.0, max: 10.0 };
        assert_eq!(kind.corrected_value(-5.0).unwrap(), 0.0);
        assert_eq!(kind.corrected_value(15.0).unwrap(), 10.0);
        assert_eq!(kind.corrected_value(5.0).unwrap(), 5.0);
    }

    #[test]
    fn empty_discrete_choices_is_an_error() {
        let kind = ActuatorKind::Discrete { choices: vec![] };
        assert_eq!(kind.corrected_value(1.0), Err(ActuatorError::NoChoices));
    }

    #[test]
    fn actuate_accepts_an_admissible_value() {
        let mut a = Actuator::new(
            Uuid::new_v4(),
            "fan0",
            ActuatorKind::Continuous { min: 0.0, max: 1.0 },
            0.5,
            Uuid::new_v4(),
        )
        .unwrap();
        let accepted = a.actuate(1.0).unwrap();
        assert_eq!(accepted, 1.0);
        assert_eq!(a.value, 1.0);
    }

    #[test]
    fn actuate_rejects_an_out_of_domain_value_without_mutating() {
        let mut a = Actuator::new(
            Uuid::new_v4(),
            "valve0",
            ActuatorKind::Discrete { choices: vec![0.0, 0.5, 1.0] },
            0.0,
            Uuid::new_v4(),
        )
        .unwrap();
        let err = a.actuate(0.3).unwrap_err();
        assert_eq!(err, ActuatorError::OutOfDomain { value: 0.3 });
        assert_eq!(a.value, 0.0);
    }
}
