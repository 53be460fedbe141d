/*!
A thin key-value configuration reader.

Per the specification, parsing a configuration file or command line is an
external collaborator's job; this crate only consumes an already-built
map. `Config` wraps that map with typed accessors that return
`PgNetError::Configuration` on a missing or ill-typed key instead of
panicking, since malformed configuration is a configuration error, not an
implementation-invariant violation (spec.md error kind 1 vs 2).
*/

use std::collections::HashMap;

use crate::error::{PgNetError, Result};

/// A single configuration value. Lists are kept untyped to cover both
/// `off_cores`/`off_routers` (usize lists) and `watch_power_gating_routers`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<ConfigValue>),
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}
impl From<usize> for ConfigValue {
    fn from(v: usize) -> Self {
        ConfigValue::Int(v as i64)
    }
}
impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}
impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}
impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

/// A key -> value map handed to the simulator by an external configuration
/// loader. See spec.md section 6 for the recognized, non-exhaustive key
/// list.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, ConfigValue>,
}

impl Config {
    pub fn new() -> Self {
        Config {
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_usize(&self, key: &str) -> Result<usize> {
        match self.values.get(key) {
            Some(ConfigValue::Int(i)) if *i >= 0 => Ok(*i as usize),
            Some(other) => Err(PgNetError::Configuration(format!(
                "expected a non-negative integer for `{key}`, found {other:?}"
            ))),
            None => Err(PgNetError::Configuration(format!("missing key `{key}`"))),
        }
    }

    pub fn get_usize_or(&self, key: &str, default: usize) -> Result<usize> {
        match self.values.get(key) {
            Some(_) => self.get_usize(key),
            None => Ok(default),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        match self.values.get(key) {
            Some(ConfigValue::Float(f)) => Ok(*f),
            Some(ConfigValue::Int(i)) => Ok(*i as f64),
            Some(other) => Err(PgNetError::Configuration(format!(
                "expected a number for `{key}`, found {other:?}"
            ))),
            None => Err(PgNetError::Configuration(format!("missing key `{key}`"))),
        }
    }

    pub fn get_f64_or(&self, key: &str, default: f64) -> Result<f64> {
        match self.values.get(key) {
            Some(_) => self.get_f64(key),
            None => Ok(default),
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            Some(ConfigValue::Bool(b)) => Ok(*b),
            Some(other) => Err(PgNetError::Configuration(format!(
                "expected a boolean for `{key}`, found {other:?}"
            ))),
            None => Ok(default),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        match self.values.get(key) {
            Some(ConfigValue::Str(s)) => Ok(s.as_str()),
            Some(other) => Err(PgNetError::Configuration(format!(
                "expected a string for `{key}`, found {other:?}"
            ))),
            None => Err(PgNetError::Configuration(format!("missing key `{key}`"))),
        }
    }

    pub fn get_str_or<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str> {
        match self.values.get(key) {
            Some(_) => self.get_str(key),
            None => Ok(default),
        }
    }

    pub fn get_usize_list(&self, key: &str) -> Result<Vec<usize>> {
        match self.values.get(key) {
            Some(ConfigValue::List(items)) => items
                .iter()
                .map(|v| match v {
                    ConfigValue::Int(i) if *i >= 0 => Ok(*i as usize),
                    other => Err(PgNetError::Configuration(format!(
                        "expected a non-negative integer in list `{key}`, found {other:?}"
                    ))),
                })
                .collect(),
            Some(other) => Err(PgNetError::Configuration(format!(
                "expected a list for `{key}`, found {other:?}"
            ))),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_round_trip() {
        let mut cfg = Config::new();
        cfg.set("k", 4usize)
            .set("n", 4usize)
            .set("powergate_type", "flov")
            .set("speculative", true)
            .set("off_cores", ConfigValue::List(vec![ConfigValue::Int(3), ConfigValue::Int(7)]));
        assert_eq!(cfg.get_usize("k").unwrap(), 4);
        assert_eq!(cfg.get_str("powergate_type").unwrap(), "flov");
        assert!(cfg.get_bool_or("speculative", false).unwrap());
        assert_eq!(cfg.get_usize_list("off_cores").unwrap(), vec![3, 7]);
        assert_eq!(cfg.get_usize_or("missing", 9).unwrap(), 9);
    }

    #[test]
    fn missing_required_key_is_configuration_error() {
        let cfg = Config::new();
        match cfg.get_usize("k") {
            Err(PgNetError::Configuration(_)) => {}
            other => panic!("expected a Configuration error, got {other:?}"),
        }
    }
}
