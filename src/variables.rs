use crate::data::{Measurement, VariableValue};
use serde::Serialize;

/// Distinct variable names of a measurement list and the distinct values each
/// takes, both in first-seen order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VariableIndex {
    pub names: Vec<String>,
    pub values: Vec<Vec<VariableValue>>,
}

impl VariableIndex {
    pub fn values(&self, name: &str) -> Option<&[VariableValue]> {
        self.position(name).map(|i| self.values[i].as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of distinct values, 0 for unknown names.
    pub fn value_count(&self, name: &str) -> usize {
        self.values(name).map_or(0, <[_]>::len)
    }

    /// A variable with a single value cannot tell measurements apart.
    pub fn is_multi_valued(&self, name: &str) -> bool {
        self.value_count(name) > 1
    }

    pub fn multi_valued(&self) -> impl Iterator<Item = &str> + '_ {
        self.names
            .iter()
            .zip(&self.values)
            .filter(|(_, values)| values.len() > 1)
            .map(|(name, _)| name.as_str())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

pub fn extract_variables<'a, I>(measurements: I) -> VariableIndex
where
    I: IntoIterator<Item = &'a Measurement>,
{
    let measurements: Vec<&Measurement> = measurements.into_iter().collect();
    let mut names: Vec<String> = Vec::new();
    for m in &measurements {
        for (name, _) in m.variables() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    let values = names
        .iter()
        .map(|name| extract_values(measurements.iter().copied(), name))
        .collect();
    VariableIndex { names, values }
}

/// Distinct values of `name`, skipping measurements that do not set it.
pub fn extract_values<'a, I>(measurements: I, name: &str) -> Vec<VariableValue>
where
    I: IntoIterator<Item = &'a Measurement>,
{
    let mut values: Vec<VariableValue> = Vec::new();
    for value in measurements.into_iter().filter_map(|m| m.variable(name)) {
        if !values.contains(value) {
            values.push(value.clone());
        }
    }
    values
}

/// Measurements whose `name` variable equals `value`. Without a name every
/// measurement passes.
pub fn filter_by_value<'a, I>(
    measurements: I,
    name: Option<&str>,
    value: &VariableValue,
) -> Vec<&'a Measurement>
where
    I: IntoIterator<Item = &'a Measurement>,
{
    measurements
        .into_iter()
        .filter(|m| match name {
            None => true,
            Some(name) => m.variable(name) == Some(value),
        })
        .collect()
}
