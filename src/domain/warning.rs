// Warning bands for water parameters
use serde::Serialize;
use std::fmt;

pub const PH_LOW: f64 = 6.5;
pub const PH_HIGH: f64 = 8.0;
pub const TEMPERATURE_LOW: f64 = 20.0;
pub const TEMPERATURE_HIGH: f64 = 28.0;
pub const AMMONIA_MODERATE: f64 = 0.2;
pub const AMMONIA_HIGH: f64 = 0.5;

const NO_ACTION: &str = "No immediate action";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Caution,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Ph,
    Temperature,
    Ammonia,
}

impl Parameter {
    pub const ALL: [Parameter; 3] = [Parameter::Ph, Parameter::Temperature, Parameter::Ammonia];

    pub fn label(self) -> &'static str {
        match self {
            Parameter::Ph => "pH",
            Parameter::Temperature => "Temperature",
            Parameter::Ammonia => "Ammonia",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub parameter: Parameter,
    pub label: &'static str,
    pub suggestion: &'static str,
    pub severity: Severity,
}

impl Warning {
    fn new(
        parameter: Parameter,
        label: &'static str,
        suggestion: &'static str,
        severity: Severity,
    ) -> Self {
        Self {
            parameter,
            label,
            suggestion,
            severity,
        }
    }
}

/// Classifies one reading into exactly three warnings, in the order
/// pH, temperature, ammonia.
pub fn classify(ph: f64, temperature: f64, ammonia: f64) -> [Warning; 3] {
    [
        classify_ph(ph),
        classify_temperature(temperature),
        classify_ammonia(ammonia),
    ]
}

/// Most severe band across a set of warnings.
pub fn worst(warnings: &[Warning]) -> Severity {
    warnings
        .iter()
        .map(|w| w.severity)
        .max()
        .unwrap_or(Severity::Ok)
}

fn classify_ph(ph: f64) -> Warning {
    if ph < PH_LOW {
        Warning::new(
            Parameter::Ph,
            "pH too low",
            "Add pH buffer or check CO₂",
            Severity::Caution,
        )
    } else if ph > PH_HIGH {
        Warning::new(
            Parameter::Ph,
            "pH too high",
            "Perform partial water change",
            Severity::Caution,
        )
    } else {
        Warning::new(Parameter::Ph, "pH OK", NO_ACTION, Severity::Ok)
    }
}

fn classify_temperature(temperature: f64) -> Warning {
    if temperature < TEMPERATURE_LOW {
        Warning::new(
            Parameter::Temperature,
            "Temperature too low",
            "Increase heater temperature",
            Severity::Caution,
        )
    } else if temperature > TEMPERATURE_HIGH {
        Warning::new(
            Parameter::Temperature,
            "Temperature too high",
            "Cool the tank or improve ventilation",
            Severity::Danger,
        )
    } else {
        Warning::new(
            Parameter::Temperature,
            "Temperature OK",
            NO_ACTION,
            Severity::Ok,
        )
    }
}

fn classify_ammonia(ammonia: f64) -> Warning {
    if ammonia > AMMONIA_HIGH {
        Warning::new(
            Parameter::Ammonia,
            "High Ammonia Level",
            "Perform partial water change immediately",
            Severity::Danger,
        )
    } else if ammonia > AMMONIA_MODERATE {
        Warning::new(
            Parameter::Ammonia,
            "Moderate Ammonia",
            "Check filter and feed less",
            Severity::Caution,
        )
    } else {
        Warning::new(Parameter::Ammonia, "Ammonia OK", NO_ACTION, Severity::Ok)
    }
}
