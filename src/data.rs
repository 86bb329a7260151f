use crate::error::{ChartError, Result};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Value of a variable on a measurement. Comparison is strict: the text
/// `"1"` and the number `1` are different values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VariableValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl VariableValue {
    /// Convert a JSON scalar. `null` means the variable is not set.
    fn from_json(value: &Value) -> std::result::Result<Option<Self>, String> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(VariableValue::Text(s.clone()))),
            Value::Number(n) => n
                .as_f64()
                .map(|f| Some(VariableValue::Number(f)))
                .ok_or_else(|| format!("number {} is out of range", n)),
            Value::Bool(b) => Ok(Some(VariableValue::Bool(*b))),
            other => Err(format!("expected a scalar, found {}", other)),
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Text(s) => f.write_str(s),
            VariableValue::Number(n) => write!(f, "{}", n),
            VariableValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Text(value.to_string())
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        VariableValue::Number(value)
    }
}

/// One benchmark run: its variable assignments, raw samples and the factors
/// that convert those samples into each displayable unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    variables: Vec<(String, VariableValue)>,
    samples: Vec<f64>,
    units: Vec<(String, f64)>,
}

impl Measurement {
    pub fn new(
        variables: Vec<(String, VariableValue)>,
        samples: Vec<f64>,
        units: Vec<(String, f64)>,
    ) -> Self {
        Self {
            variables,
            samples,
            units,
        }
    }

    /// Variables in the order they were declared.
    pub fn variables(&self) -> &[(String, VariableValue)] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&VariableValue> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Unit table in declaration order.
    pub fn units(&self) -> &[(String, f64)] {
        &self.units
    }

    pub fn factor(&self, unit: &str) -> Option<f64> {
        self.units.iter().find(|(n, _)| n == unit).map(|(_, f)| *f)
    }

    fn from_json(index: usize, value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| malformed(index, "measurement must be an object"))?;

        let mut variables = Vec::new();
        if let Some(vars) = obj.get("variables") {
            let vars = vars
                .as_object()
                .ok_or_else(|| malformed(index, "'variables' must be an object"))?;
            for (name, raw) in vars {
                let value = VariableValue::from_json(raw)
                    .map_err(|e| malformed(index, &format!("variable '{}': {}", name, e)))?;
                if let Some(value) = value {
                    variables.push((name.clone(), value));
                }
            }
        }

        let raw_samples = ["values", "samples", "numbers"]
            .iter()
            .find_map(|key| obj.get(*key))
            .ok_or_else(|| malformed(index, "missing 'values'"))?
            .as_array()
            .ok_or_else(|| malformed(index, "'values' must be an array"))?;
        let samples = raw_samples
            .iter()
            .map(|s| {
                s.as_f64()
                    .ok_or_else(|| malformed(index, &format!("non-numeric sample {}", s)))
            })
            .collect::<Result<Vec<f64>>>()?;

        let raw_units = obj
            .get("units")
            .ok_or_else(|| malformed(index, "missing 'units'"))?
            .as_object()
            .ok_or_else(|| malformed(index, "'units' must be an object"))?;
        let units = raw_units
            .iter()
            .map(|(name, factor)| {
                factor.as_f64().map(|f| (name.clone(), f)).ok_or_else(|| {
                    malformed(index, &format!("unit '{}' has non-numeric factor {}", name, factor))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            variables,
            samples,
            units,
        })
    }

    // Samples are divided by these factors, so each must be positive.
    fn check_factors(&self, index: usize) -> Result<()> {
        if self.units.is_empty() {
            return Err(malformed(index, "'units' is empty"));
        }
        match self.units.iter().find(|(_, f)| !(*f > 0.0 && f.is_finite())) {
            Some((name, factor)) => Err(malformed(
                index,
                &format!("unit '{}' must have a positive factor, found {}", name, factor),
            )),
            None => Ok(()),
        }
    }

    fn has_same_units(&self, other: &Measurement) -> bool {
        let mut mine: Vec<&str> = self.units.iter().map(|(n, _)| n.as_str()).collect();
        let mut theirs: Vec<&str> = other.units.iter().map(|(n, _)| n.as_str()).collect();
        mine.sort_unstable();
        theirs.sort_unstable();
        mine == theirs
    }
}

impl Serialize for Measurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Pairs<'a, V>(&'a [(String, V)]);

        impl<V: Serialize> Serialize for Pairs<'_, V> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (k, v) in self.0 {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }

        let mut s = serializer.serialize_struct("Measurement", 3)?;
        s.serialize_field("variables", &Pairs(&self.variables))?;
        s.serialize_field("units", &Pairs(&self.units))?;
        s.serialize_field("values", &self.samples)?;
        s.end()
    }
}

/// A loaded benchmark result file. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub name: String,
    #[serde(serialize_with = "serialize_details")]
    pub details: Vec<(String, String)>,
    pub measurements: Vec<Measurement>,
}

pub(crate) fn serialize_details<S: Serializer>(
    details: &[(String, String)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(details.len()))?;
    for (k, v) in details {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

impl ResultSet {
    pub fn new(
        name: impl Into<String>,
        measurements: Vec<Measurement>,
        details: Vec<(String, String)>,
    ) -> Result<Self> {
        let set = Self {
            name: name.into(),
            details,
            measurements,
        };
        set.check_units()?;
        Ok(set)
    }

    /// Read a dataset from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let value: Value = serde_json::from_reader(reader)?;
        Self::from_value(&value)
    }

    pub fn from_json(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(&value)
    }

    /// Build a result set from an already parsed JSON document.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            ChartError::DataFormat("result set must be a JSON object".to_string())
        })?;

        let name = match obj.get("name") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => {
                return Err(ChartError::DataFormat(format!(
                    "'name' must be a string, found {}",
                    other
                )))
            }
        };

        let details = match obj.get("details") {
            Some(Value::Object(map)) => details_from_map(map),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(ChartError::DataFormat(
                    "'details' must be an object".to_string(),
                ))
            }
        };

        let measurements = obj
            .get("measurements")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ChartError::DataFormat("'measurements' must be an array".to_string())
            })?
            .iter()
            .enumerate()
            .map(|(i, m)| Measurement::from_json(i, m))
            .collect::<Result<Vec<_>>>()?;

        Self::new(name, measurements, details)
    }

    /// Details as `key: value` lines, sorted by key.
    pub fn details_lines(&self) -> Vec<String> {
        let mut sorted: Vec<&(String, String)> = self.details.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted
            .into_iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect()
    }

    // Unit selection reads the first unit table only, so every other
    // measurement must offer the same units with usable factors.
    fn check_units(&self) -> Result<()> {
        let Some(first) = self.measurements.first() else {
            return Ok(());
        };
        for (i, m) in self.measurements.iter().enumerate() {
            m.check_factors(i)?;
            if !m.has_same_units(first) {
                let names: Vec<&str> = m.units.iter().map(|(n, _)| n.as_str()).collect();
                let expected: Vec<&str> = first.units.iter().map(|(n, _)| n.as_str()).collect();
                return Err(malformed(
                    i,
                    &format!(
                        "units [{}] differ from [{}] of the first measurement",
                        names.join(", "),
                        expected.join(", ")
                    ),
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn details_from_map(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect()
}

fn malformed(index: usize, message: &str) -> ChartError {
    ChartError::DataFormat(format!("measurement {}: {}", index, message))
}
