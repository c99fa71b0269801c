// Input validation for readings and credentials
use super::reading::WaterReading;
use super::warning::Parameter;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

pub const PH_RANGE: (f64, f64) = (0.0, 14.0);
pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 40.0);
pub const AMMONIA_RANGE: (f64, f64) = (0.0, 10.0);

pub fn bounds(parameter: Parameter) -> (f64, f64) {
    match parameter {
        Parameter::Ph => PH_RANGE,
        Parameter::Temperature => TEMPERATURE_RANGE,
        Parameter::Ammonia => AMMONIA_RANGE,
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Profile name cannot be empty.")]
    EmptyName,
    #[error("Profile name must contain letters.")]
    NumericName,
    #[error("Profile name already exists. Please use a different name.")]
    DuplicateName,
    #[error("No profile named '{0}' exists.")]
    UnknownProfile(String),
    #[error("{}", missing_message(.0))]
    Missing(Vec<Parameter>),
    #[error("{0} must be a valid number.")]
    NotANumber(Parameter),
    #[error("{parameter} must be between {min} and {max}.")]
    OutOfRange {
        parameter: Parameter,
        min: f64,
        max: f64,
    },
    #[error("{0} cannot be empty.")]
    EmptyField(&'static str),
    #[error("{0} cannot contain spaces.")]
    ContainsSpaces(&'static str),
    #[error("Username cannot contain path separators.")]
    UnsafeUsername,
    #[error("Passwords do not match.")]
    PasswordMismatch,
}

fn missing_message(missing: &[Parameter]) -> String {
    match missing {
        [only] => format!("Please input value for {}.", only),
        [first, second] => format!("Please input values for {} and {}.", first, second),
        _ => {
            let labels: Vec<&str> = missing.iter().map(|p| p.label()).collect();
            match labels.split_last() {
                Some((last, rest)) => {
                    format!("Please input values for {}, and {}.", rest.join(", "), last)
                }
                None => "Please input values.".to_string(),
            }
        }
    }
}

/// Every violation found in one submission. Displays one message per line.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn first(&self) -> Option<&ValidationError> {
        self.0.first()
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|e| e.to_string()).collect()
    }

    fn check(errors: Vec<ValidationError>) -> Result<(), ValidationErrors> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        ValidationErrors(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("\n"))
    }
}

impl std::error::Error for ValidationErrors {}

/// A numeric field as submitted: a JSON number or the text typed into a form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    fn is_blank(&self) -> bool {
        matches!(self, RawNumber::Text(text) if text.trim().is_empty())
    }

    fn parse(&self) -> Option<f64> {
        let value = match self {
            RawNumber::Number(value) => *value,
            RawNumber::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Measurements {
    #[serde(default, alias = "pH")]
    pub ph: Option<RawNumber>,
    #[serde(default)]
    pub temperature: Option<RawNumber>,
    #[serde(default)]
    pub ammonia: Option<RawNumber>,
}

impl Measurements {
    pub fn new(
        ph: impl Into<RawNumber>,
        temperature: impl Into<RawNumber>,
        ammonia: impl Into<RawNumber>,
    ) -> Self {
        Self {
            ph: Some(ph.into()),
            temperature: Some(temperature.into()),
            ammonia: Some(ammonia.into()),
        }
    }

    fn field(&self, parameter: Parameter) -> Option<&RawNumber> {
        match parameter {
            Parameter::Ph => self.ph.as_ref(),
            Parameter::Temperature => self.temperature.as_ref(),
            Parameter::Ammonia => self.ammonia.as_ref(),
        }
        .filter(|raw| !raw.is_blank())
    }
}

/// A new-profile submission: a name plus the three measurements.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingInput {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "pH")]
    pub ph: Option<RawNumber>,
    #[serde(default)]
    pub temperature: Option<RawNumber>,
    #[serde(default)]
    pub ammonia: Option<RawNumber>,
}

impl ReadingInput {
    pub fn new(name: &str, measurements: Measurements) -> Self {
        Self {
            name: name.to_string(),
            ph: measurements.ph,
            temperature: measurements.temperature,
            ammonia: measurements.ammonia,
        }
    }

    pub fn measurements(&self) -> Measurements {
        Measurements {
            ph: self.ph.clone(),
            temperature: self.temperature.clone(),
            ammonia: self.ammonia.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReading {
    pub name: String,
    pub ph: f64,
    pub temperature: f64,
    pub ammonia: f64,
}

impl ValidatedReading {
    pub fn into_reading(self) -> WaterReading {
        WaterReading::new(self.name, self.ph, self.temperature, self.ammonia)
    }
}

/// Edited values for an existing row. Timestamp and id are not editable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReadingEdit {
    pub name: String,
    #[serde(alias = "pH")]
    pub ph: f64,
    pub temperature: f64,
    pub ammonia: f64,
}

pub fn check_profile_name(name: &str, existing: &[String]) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().all(char::is_numeric) {
        return Err(ValidationError::NumericName);
    }
    let lowered = name.to_lowercase();
    if existing.iter().any(|e| e.to_lowercase() == lowered) {
        return Err(ValidationError::DuplicateName);
    }
    Ok(())
}

pub fn check_range(parameter: Parameter, value: f64) -> Result<f64, ValidationError> {
    let (min, max) = bounds(parameter);
    if !value.is_finite() {
        return Err(ValidationError::NotANumber(parameter));
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            parameter,
            min,
            max,
        });
    }
    Ok(value)
}

/// Validates the three measurements, reporting every failure at once.
pub fn validate_measurements(
    measurements: &Measurements,
) -> Result<(f64, f64, f64), ValidationErrors> {
    let mut errors = Vec::new();

    let missing: Vec<Parameter> = Parameter::ALL
        .into_iter()
        .filter(|p| measurements.field(*p).is_none())
        .collect();
    if !missing.is_empty() {
        errors.push(ValidationError::Missing(missing));
    }

    let mut values = [0.0; 3];
    for (slot, parameter) in values.iter_mut().zip(Parameter::ALL) {
        let Some(raw) = measurements.field(parameter) else {
            continue;
        };
        match raw.parse() {
            Some(value) => match check_range(parameter, value) {
                Ok(value) => *slot = value,
                Err(e) => errors.push(e),
            },
            None => errors.push(ValidationError::NotANumber(parameter)),
        }
    }

    ValidationErrors::check(errors)?;
    let [ph, temperature, ammonia] = values;
    Ok((ph, temperature, ammonia))
}

/// Validates a reading that introduces a new profile.
pub fn validate_new_reading(
    input: &ReadingInput,
    existing_profiles: &[String],
) -> Result<ValidatedReading, ValidationErrors> {
    let mut errors = Vec::new();
    if let Err(e) = check_profile_name(&input.name, existing_profiles) {
        errors.push(e);
    }

    match validate_measurements(&input.measurements()) {
        Ok((ph, temperature, ammonia)) => {
            ValidationErrors::check(errors)?;
            Ok(ValidatedReading {
                name: input.name.trim().to_string(),
                ph,
                temperature,
                ammonia,
            })
        }
        Err(ValidationErrors(more)) => {
            errors.extend(more);
            Err(ValidationErrors(errors))
        }
    }
}

/// Validates a follow-up reading for a profile that already exists. The
/// stored name takes the existing profile's spelling.
pub fn validate_profile_reading(
    profile: &str,
    measurements: &Measurements,
    existing_profiles: &[String],
) -> Result<ValidatedReading, ValidationErrors> {
    let wanted = profile.trim().to_lowercase();
    let canonical = existing_profiles
        .iter()
        .find(|e| e.to_lowercase() == wanted)
        .cloned();

    let mut errors = Vec::new();
    if canonical.is_none() {
        errors.push(ValidationError::UnknownProfile(profile.trim().to_string()));
    }

    match (validate_measurements(measurements), canonical) {
        (Ok((ph, temperature, ammonia)), Some(name)) => Ok(ValidatedReading {
            name,
            ph,
            temperature,
            ammonia,
        }),
        (Ok(_), None) => Err(ValidationErrors(errors)),
        (Err(ValidationErrors(more)), _) => {
            errors.extend(more);
            Err(ValidationErrors(errors))
        }
    }
}

pub fn validate_edit(edit: &ReadingEdit) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if edit.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }
    for (parameter, value) in Parameter::ALL
        .into_iter()
        .zip([edit.ph, edit.temperature, edit.ammonia])
    {
        if let Err(e) = check_range(parameter, value) {
            errors.push(e);
        }
    }
    ValidationErrors::check(errors)
}

pub fn validate_credentials(username: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    for (value, field) in [(username, "Username"), (password, "Password")] {
        if value.is_empty() {
            errors.push(ValidationError::EmptyField(field));
        } else if value.contains(' ') {
            errors.push(ValidationError::ContainsSpaces(field));
        }
    }
    if username.contains(['/', '\\']) || username == "." || username == ".." {
        errors.push(ValidationError::UnsafeUsername);
    }
    ValidationErrors::check(errors)
}

pub fn validate_registration(
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationErrors> {
    validate_credentials(username, password)?;
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch.into());
    }
    Ok(())
}
