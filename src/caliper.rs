//! Conversion of Caliper (v0.5) result files into a [`ResultSet`].
//!
//! Only the `TIME` measurement set is read. Each Caliper measurement becomes
//! one [`Measurement`] whose samples are the `processed` values of its runs.

use crate::data::{details_from_map, Measurement, ResultSet, VariableValue};
use crate::error::{ChartError, Result};
use serde_json::Value;

pub fn preprocess(results: &Value) -> Result<ResultSet> {
    let benchmark = lookup(results, &["run", "benchmarkName"])?
        .as_str()
        .ok_or_else(|| shape("run.benchmarkName", "a string"))?;
    let simple_name = benchmark.rsplit('.').next().unwrap_or(benchmark);

    let mut details = details_from_map(
        lookup(results, &["environment", "propertyMap"])?
            .as_object()
            .ok_or_else(|| shape("environment.propertyMap", "an object"))?,
    );
    details.push(("benchmark.classname".to_string(), benchmark.to_string()));
    let timestamp = lookup(results, &["run", "executedTimestamp"])?;
    details.push((
        "benchmark.executionTime".to_string(),
        timestamp.as_str().map_or_else(|| timestamp.to_string(), str::to_string),
    ));

    let measurements = lookup(results, &["run", "measurements"])?
        .as_array()
        .ok_or_else(|| shape("run.measurements", "an array"))?
        .iter()
        .map(measurement)
        .collect::<Result<Vec<_>>>()?;

    ResultSet::new(simple_name, measurements, details)
}

fn measurement(entry: &Value) -> Result<Measurement> {
    let variables = lookup(entry, &["k", "variables"])?
        .as_object()
        .ok_or_else(|| shape("k.variables", "an object"))?
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => VariableValue::Text(s.clone()),
                other => VariableValue::Text(other.to_string()),
            };
            (name.clone(), value)
        })
        .collect();

    let times = lookup(entry, &["v", "measurementSetMap", "TIME"])?;
    let units = lookup(times, &["unitNames"])?
        .as_object()
        .ok_or_else(|| shape("TIME.unitNames", "an object"))?
        .iter()
        .map(|(name, factor)| {
            factor
                .as_f64()
                .map(|f| (name.clone(), f))
                .ok_or_else(|| shape("TIME.unitNames", "numeric factors"))
        })
        .collect::<Result<Vec<_>>>()?;

    let samples = lookup(times, &["measurements"])?
        .as_array()
        .ok_or_else(|| shape("TIME.measurements", "an array"))?
        .iter()
        .map(|run| {
            lookup(run, &["processed"])?
                .as_f64()
                .ok_or_else(|| shape("TIME.measurements[].processed", "a number"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Measurement::new(variables, samples, units))
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut current = value;
    for (depth, key) in path.iter().enumerate() {
        current = current.get(*key).ok_or_else(|| {
            ChartError::DataFormat(format!("caliper results lack '{}'", path[..=depth].join(".")))
        })?;
    }
    Ok(current)
}

fn shape(path: &str, expected: &str) -> ChartError {
    ChartError::DataFormat(format!("caliper results: '{}' must be {}", path, expected))
}
