use crate::data::Measurement;
use crate::error::{ChartError, Result};
use crate::scale::LinearScale;
use tracing::debug;

const TICK_COUNT: usize = 5;

/// Pick the unit whose axis labels are the most compact for the largest
/// sample in `measurements`.
///
/// Candidates come from the first measurement's unit table; a loaded
/// [`ResultSet`](crate::data::ResultSet) guarantees all tables share the
/// same units. Ties go to the unit listed first.
pub fn select_best_unit<'a, I>(measurements: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Measurement>,
{
    let mut iter = measurements.into_iter().peekable();
    let first = *iter.peek().ok_or(ChartError::EmptyInput("select a unit for"))?;
    let peak = iter
        .flat_map(|m| m.samples().iter().copied())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(0.0);

    let mut best: Option<(&str, usize)> = None;
    for (name, factor) in first.units() {
        let length = label_length(peak / factor);
        debug!(unit = %name, length, "unit label length");
        if best.map_or(true, |(_, shortest)| length < shortest) {
            best = Some((name.as_str(), length));
        }
    }

    best.map(|(name, _)| name.to_string())
        .ok_or_else(|| ChartError::DataFormat("measurement has no units".to_string()))
}

/// Length of the comma-joined tick labels of an axis over `[0, max]`.
fn label_length(max: f64) -> usize {
    let labels = LinearScale::new(0.0, max).tick_labels(TICK_COUNT);
    labels.join(",").chars().count()
}
