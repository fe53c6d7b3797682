//! Mandatory `name=value` program parameters checked against a declared
//! schema.

use std::collections::BTreeMap;

use crate::error::ParamError;

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    name: String,
    description: String,
}

impl ParamSpec {
    /// Declare a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str { &self.name }
}

/// The parameters a program requires. Every declared parameter is
/// mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSchema {
    specs: Vec<ParamSpec>,
}

impl ParamSchema {
    /// Build a schema from its declarations.
    #[must_use]
    pub fn new(specs: impl IntoIterator<Item = ParamSpec>) -> Self {
        Self {
            specs: specs.into_iter().collect(),
        }
    }

    fn declares(&self, name: &str) -> bool { self.specs.iter().any(|spec| spec.name == name) }

    /// Parse `name=value` arguments into integer values.
    ///
    /// A repeated parameter keeps its last value.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidFormat`] for an argument without `=`,
    /// [`ParamError::Unknown`] for an undeclared name,
    /// [`ParamError::InvalidValue`] for a non-integer value and
    /// [`ParamError::Missing`] listing every declared name not supplied.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokenflow::params::{ParamSchema, ParamSpec};
    ///
    /// let schema = ParamSchema::new([ParamSpec::new("laps", "circuits to run")]);
    /// let values = schema.parse(&["laps=3".to_owned()]).expect("valid");
    /// assert_eq!(values.get("laps"), Some(3));
    /// ```
    pub fn parse(&self, args: &[String]) -> Result<ParamValues, ParamError> {
        let mut values = BTreeMap::new();
        for arg in args {
            let (name, raw) = arg
                .split_once('=')
                .ok_or_else(|| ParamError::InvalidFormat(arg.clone()))?;
            if !self.declares(name) {
                return Err(ParamError::Unknown(name.to_owned()));
            }
            let value = raw.trim().parse::<i64>().map_err(|_| ParamError::InvalidValue {
                name: name.to_owned(),
                value: raw.to_owned(),
            })?;
            values.insert(name.to_owned(), value);
        }
        let missing: Vec<String> = self
            .specs
            .iter()
            .filter(|spec| !values.contains_key(&spec.name))
            .map(|spec| spec.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(ParamError::Missing(missing));
        }
        Ok(ParamValues { values })
    }

    /// Aligned `name - description` listing of the declared parameters.
    #[must_use]
    pub fn help(&self) -> String {
        let width = self.specs.iter().map(|spec| spec.name.len()).max().unwrap_or(0);
        self.specs
            .iter()
            .map(|spec| format!("  {:<width$} - {}\n", spec.name, spec.description))
            .collect()
    }
}

/// Parsed parameter values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamValues {
    values: BTreeMap<String, i64>,
}

impl ParamValues {
    /// Value of `name`, if supplied.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<i64> { self.values.get(name).copied() }

    /// Value of `name` as a `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Missing`] when `name` was not supplied and
    /// [`ParamError::InvalidValue`] when the value does not fit a `u32`.
    pub fn get_u32(&self, name: &str) -> Result<u32, ParamError> {
        let value = self
            .get(name)
            .ok_or_else(|| ParamError::Missing(vec![name.to_owned()]))?;
        u32::try_from(value).map_err(|_| ParamError::InvalidValue {
            name: name.to_owned(),
            value: value.to_string(),
        })
    }
}
