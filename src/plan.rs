//! Turns measurements and a resolved view into the chart tree handed to
//! renderers: sections, then rows, then groups, each group summarised as
//! max/median/min in a single display unit.

use crate::config::ResolvedConfig;
use crate::data::{Measurement, VariableValue};
use crate::error::{ChartError, Result};
use crate::units::select_best_unit;
use crate::variables::{extract_values, filter_by_value};
use serde::Serialize;
use tracing::debug;

/// The three bars drawn for a group.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    pub max: f64,
    pub median: f64,
    pub min: f64,
}

impl Summary {
    /// Summarise `values`; an empty slice gives an empty bar (all zeros).
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            let (lower, upper) = (sorted[n / 2 - 1], sorted[n / 2]);
            lower + (upper - lower) * 0.5
        };
        Self {
            max: sorted[n - 1],
            median,
            min: sorted[0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPlan {
    /// `None` for the single implicit group of a chart without groups.
    pub label: Option<VariableValue>,
    #[serde(flatten)]
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowPlan {
    /// `None` for the single implicit row of a chart without rows.
    pub label: Option<VariableValue>,
    pub groups: Vec<GroupPlan>,
}

/// A single bar chart.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartNode {
    pub rows: Vec<RowPlan>,
}

impl ChartNode {
    /// Largest bar in the chart, 0 when there are no bars.
    pub fn max_value(&self) -> f64 {
        self.rows
            .iter()
            .flat_map(|r| r.groups.iter())
            .map(|g| g.summary.max)
            .fold(0.0, f64::max)
    }

    /// Group labels in first-seen order across all rows.
    pub fn group_labels(&self) -> Vec<Option<&VariableValue>> {
        let mut labels: Vec<Option<&VariableValue>> = Vec::new();
        for group in self.rows.iter().flat_map(|r| r.groups.iter()) {
            if !labels.contains(&group.label.as_ref()) {
                labels.push(group.label.as_ref());
            }
        }
        labels
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub variable: String,
    pub label: VariableValue,
    pub plan: ChartPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPlan {
    Sections(Vec<Section>),
    Chart(ChartNode),
}

/// A leaf chart together with the section values leading to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf<'a> {
    pub path: Vec<(&'a str, &'a VariableValue)>,
    pub chart: &'a ChartNode,
}

impl ChartPlan {
    /// Every chart in the tree, depth first.
    pub fn leaves(&self) -> Vec<Leaf<'_>> {
        let mut out = Vec::new();
        collect_leaves(self, &mut Vec::new(), &mut out);
        out
    }
}

fn collect_leaves<'a>(
    plan: &'a ChartPlan,
    path: &mut Vec<(&'a str, &'a VariableValue)>,
    out: &mut Vec<Leaf<'a>>,
) {
    match plan {
        ChartPlan::Chart(chart) => out.push(Leaf {
            path: path.clone(),
            chart,
        }),
        ChartPlan::Sections(sections) => {
            for section in sections {
                path.push((section.variable.as_str(), &section.label));
                collect_leaves(&section.plan, path, out);
                path.pop();
            }
        }
    }
}

/// A chart tree with the unit every bar in it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub unit: String,
    pub root: ChartPlan,
}

/// Build the chart tree for `measurements`.
///
/// When the configuration names no unit, one is selected for the whole
/// measurement list so that every section shares the same scale.
pub fn build_plan<'a, I>(measurements: I, config: &ResolvedConfig) -> Result<Plan>
where
    I: IntoIterator<Item = &'a Measurement>,
{
    let measurements: Vec<&Measurement> = measurements.into_iter().collect();
    let first = *measurements
        .first()
        .ok_or(ChartError::EmptyInput("plan a chart for"))?;

    let unit = match &config.unit {
        Some(unit) if first.factor(unit).is_some() => unit.clone(),
        Some(unit) => return Err(ChartError::UnknownUnit(unit.clone())),
        None => {
            let unit = select_best_unit(measurements.iter().copied())?;
            debug!(%unit, "selected display unit");
            unit
        }
    };

    let root = build_level(&measurements, config, &config.sections, &unit)?;
    Ok(Plan { unit, root })
}

fn build_level(
    measurements: &[&Measurement],
    config: &ResolvedConfig,
    sections: &[String],
    unit: &str,
) -> Result<ChartPlan> {
    let Some((name, rest)) = sections.split_first() else {
        return build_chart(measurements, config, unit).map(ChartPlan::Chart);
    };

    let mut children = Vec::new();
    for value in extract_values(measurements.iter().copied(), name) {
        let subset = filter_by_value(measurements.iter().copied(), Some(name.as_str()), &value);
        children.push(Section {
            variable: name.clone(),
            plan: build_level(&subset, config, rest, unit)?,
            label: value,
        });
    }
    Ok(ChartPlan::Sections(children))
}

fn build_chart(
    measurements: &[&Measurement],
    config: &ResolvedConfig,
    unit: &str,
) -> Result<ChartNode> {
    let rows = config.rows.as_deref();
    let groups = config.groups.as_deref();

    let mut row_plans = Vec::new();
    for row in labels(measurements, rows) {
        let row_measurements = narrow(measurements, rows, row.as_ref());
        let mut group_plans = Vec::new();
        for group in labels(&row_measurements, groups) {
            let group_measurements = narrow(&row_measurements, groups, group.as_ref());
            let values = converted(&group_measurements, unit)?;
            group_plans.push(GroupPlan {
                label: group,
                summary: Summary::of(&values),
            });
        }
        row_plans.push(RowPlan {
            label: row,
            groups: group_plans,
        });
    }
    Ok(ChartNode { rows: row_plans })
}

// Distinct values of the variable, or one implicit unlabelled entry when no
// variable is chosen.
fn labels(measurements: &[&Measurement], name: Option<&str>) -> Vec<Option<VariableValue>> {
    match name {
        Some(name) => extract_values(measurements.iter().copied(), name)
            .into_iter()
            .map(Some)
            .collect(),
        None => vec![None],
    }
}

fn narrow<'a>(
    measurements: &[&'a Measurement],
    name: Option<&str>,
    value: Option<&VariableValue>,
) -> Vec<&'a Measurement> {
    match value {
        Some(value) => filter_by_value(measurements.iter().copied(), name, value),
        None => measurements.to_vec(),
    }
}

/// All samples of `measurements` expressed in `unit`.
pub fn converted(measurements: &[&Measurement], unit: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for m in measurements {
        let factor = m
            .factor(unit)
            .ok_or_else(|| ChartError::UnknownUnit(unit.to_string()))?;
        values.extend(m.samples().iter().map(|s| s / factor));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_config, ViewConfig};
    use crate::variables::extract_variables;

    fn measurement(vars: &[(&str, &str)], samples: &[f64]) -> Measurement {
        Measurement::new(
            vars.iter()
                .map(|(n, v)| (n.to_string(), VariableValue::from(*v)))
                .collect(),
            samples.to_vec(),
            vec![("ns".to_string(), 1.0), ("ms".to_string(), 1e6)],
        )
    }

    fn plan_for(data: &[Measurement], config: ViewConfig) -> Plan {
        let resolved = resolve_config(&extract_variables(data), config).unwrap();
        build_plan(data, &resolved).unwrap()
    }

    fn chart(plan: &ChartPlan) -> &ChartNode {
        match plan {
            ChartPlan::Chart(chart) => chart,
            ChartPlan::Sections(_) => panic!("expected a chart, got sections"),
        }
    }

    #[test]
    fn test_summary() {
        let s = Summary::of(&[3.0, 1.0, 2.0]);
        assert_eq!((s.max, s.median, s.min), (3.0, 2.0, 1.0));
        let s = Summary::of(&[10.0, 20.0]);
        assert_eq!(s.median, 15.0);
        assert_eq!(Summary::of(&[]), Summary::default());
        assert_eq!(Summary::of(&[]).max, 0.0);
    }

    #[test]
    fn test_summary_is_ordered() {
        let inputs: [&[f64]; 4] = [
            &[5.0],
            &[9.0, -1.0, 4.5, 4.5],
            &[0.1, 0.2, 0.3, 1e9, 7.0],
            &[2.0, 2.0, 2.0],
        ];
        for values in inputs {
            let s = Summary::of(values);
            assert!(s.min <= s.median && s.median <= s.max, "{:?}", s);
        }
    }

    #[test]
    fn test_groups_only() {
        let data = vec![
            Measurement::new(
                vec![("impl".to_string(), "A".into())],
                vec![10.0, 20.0],
                vec![("ms".to_string(), 1.0)],
            ),
            Measurement::new(
                vec![("impl".to_string(), "B".into())],
                vec![5.0],
                vec![("ms".to_string(), 1.0)],
            ),
        ];
        let plan = plan_for(
            &data,
            ViewConfig {
                groups: Some("impl".to_string()),
                ..ViewConfig::default()
            },
        );
        assert_eq!(plan.unit, "ms");
        let chart = chart(&plan.root);
        assert_eq!(chart.rows.len(), 1);
        assert_eq!(chart.rows[0].label, None);
        let groups = &chart.rows[0].groups;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, Some("A".into()));
        assert_eq!(
            groups[0].summary,
            Summary {
                max: 20.0,
                median: 15.0,
                min: 10.0
            }
        );
        assert_eq!(groups[1].label, Some("B".into()));
        assert_eq!(
            groups[1].summary,
            Summary {
                max: 5.0,
                median: 5.0,
                min: 5.0
            }
        );
    }

    #[test]
    fn test_rows_groups_and_sections() {
        let data = vec![
            measurement(&[("parser", "gson"), ("input", "rap"), ("vm", "java")], &[1e6, 3e6]),
            measurement(&[("parser", "jackson"), ("input", "rap"), ("vm", "java")], &[2e6]),
            measurement(&[("parser", "gson"), ("input", "caliper"), ("vm", "java")], &[4e6]),
            measurement(&[("parser", "jackson"), ("input", "caliper"), ("vm", "java")], &[]),
            measurement(&[("parser", "gson"), ("input", "rap"), ("vm", "dalvik")], &[5e6]),
        ];
        let plan = plan_for(
            &data,
            ViewConfig {
                groups: Some("parser".to_string()),
                unit: Some("ms".to_string()),
                ..ViewConfig::default()
            },
        );
        assert_eq!(plan.unit, "ms");

        let ChartPlan::Sections(sections) = &plan.root else {
            panic!("expected sections");
        };
        // rows default to input, vm becomes the section variable
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].variable, "vm");
        assert_eq!(sections[0].label, "java".into());
        assert_eq!(sections[1].label, "dalvik".into());

        let java = chart(&sections[0].plan);
        let rows: Vec<_> = java.rows.iter().map(|r| r.label.clone()).collect();
        assert_eq!(
            rows,
            vec![
                Some(VariableValue::from("rap")),
                Some(VariableValue::from("caliper"))
            ]
        );
        let rap = &java.rows[0].groups;
        assert_eq!(rap[0].summary.median, 2.0);
        assert_eq!(rap[1].summary.max, 2.0);
        let caliper = &java.rows[1].groups;
        assert_eq!(caliper[1].label, Some("jackson".into()));
        assert_eq!(caliper[1].summary, Summary::default());

        let dalvik = chart(&sections[1].plan);
        assert_eq!(dalvik.rows.len(), 1);
        assert_eq!(dalvik.rows[0].groups.len(), 1);
        assert_eq!(dalvik.rows[0].groups[0].summary.min, 5.0);
    }

    #[test]
    fn test_unit_fixed_across_sections() {
        // The dalvik section alone would prefer ns.
        let data = vec![
            measurement(&[("vm", "java")], &[4_200_000.0]),
            measurement(&[("vm", "dalvik")], &[420.0]),
        ];
        let plan = plan_for(&data, ViewConfig::default());
        assert_eq!(plan.unit, "ms");
        assert_eq!(select_best_unit(std::iter::once(&data[1])).unwrap(), "ns");
        let leaves = plan.root.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[1].path, vec![("vm", &VariableValue::from("dalvik"))]);
        assert_eq!(leaves[1].chart.rows[0].groups[0].summary.max, 0.00042);
    }

    #[test]
    fn test_unknown_unit() {
        let data = vec![measurement(&[], &[1.0])];
        let resolved = resolve_config(
            &extract_variables(&data),
            ViewConfig {
                unit: Some("furlongs".to_string()),
                ..ViewConfig::default()
            },
        )
        .unwrap();
        assert!(matches!(
            build_plan(&data, &resolved),
            Err(ChartError::UnknownUnit(u)) if u == "furlongs"
        ));
    }

    #[test]
    fn test_empty_measurements() {
        let data: Vec<Measurement> = vec![];
        let resolved = resolve_config(&extract_variables(&data), ViewConfig::default()).unwrap();
        assert!(matches!(
            build_plan(&data, &resolved),
            Err(ChartError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_chart_helpers() {
        let data = vec![
            measurement(&[("r", "1"), ("g", "x")], &[3.0]),
            measurement(&[("r", "2"), ("g", "y")], &[9.0]),
            measurement(&[("r", "2"), ("g", "x")], &[1.0]),
        ];
        let plan = plan_for(
            &data,
            ViewConfig {
                rows: Some("r".to_string()),
                groups: Some("g".to_string()),
                unit: Some("ns".to_string()),
                ..ViewConfig::default()
            },
        );
        let chart = chart(&plan.root);
        assert_eq!(chart.max_value(), 9.0);
        let x = VariableValue::from("x");
        let y = VariableValue::from("y");
        assert_eq!(chart.group_labels(), vec![Some(&x), Some(&y)]);
    }
}
