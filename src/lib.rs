// Library exports for benchcharts

pub mod caliper;
pub mod config;
pub mod controls;
pub mod data;
pub mod error;
pub mod export;
pub mod graph;
pub mod plan;
pub mod query;
pub mod scale;
pub mod units;
pub mod variables;

use config::{resolve_config, ResolvedConfig, ViewConfig};
use controls::VariableControl;
use data::ResultSet;
use error::Result;
use plan::{build_plan, ChartPlan};
use serde::Serialize;
use std::path::Path;
use tracing::debug;
use variables::VariableIndex;

/// Everything a renderer needs to draw one state of the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub name: String,
    pub unit: String,
    pub config: ResolvedConfig,
    pub controls: Vec<VariableControl>,
    pub plan: ChartPlan,
    #[serde(serialize_with = "data::serialize_details")]
    pub details: Vec<(String, String)>,
}

/// Recompute the view after a configuration change. `variables` is the index
/// of `results`, computed once per loaded result set.
pub fn build_view(
    results: &ResultSet,
    variables: &VariableIndex,
    config: ViewConfig,
) -> Result<ChartView> {
    let config = resolve_config(variables, config)?;
    let plan = build_plan(&results.measurements, &config)?;
    debug!(unit = %plan.unit, leaves = plan.root.leaves().len(), "built chart plan");
    Ok(ChartView {
        name: results.name.clone(),
        unit: plan.unit,
        controls: controls::controls(variables, &config),
        config,
        plan: plan.root,
        details: results.details.clone(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// The full view as pretty-printed JSON
    #[default]
    Json,
    /// One record per bar group
    Csv,
    /// A plain-text report
    Text,
    /// Charts as an SVG document
    Svg,
    /// Charts as a PNG image
    Png,
}

impl OutputFormat {
    /// Guess the format from an output file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "txt" => Some(Self::Text),
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Render a view to bytes in the requested format.
pub fn render(view: &ChartView, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Json => {
            let mut out = serde_json::to_vec_pretty(view)?;
            out.push(b'\n');
            Ok(out)
        }
        OutputFormat::Csv => {
            let mut out = Vec::new();
            export::write_csv(view, &mut out)?;
            Ok(out)
        }
        OutputFormat::Text => export::to_text(view).map(String::into_bytes),
        OutputFormat::Svg => graph::render_svg(view).map(String::into_bytes),
        OutputFormat::Png => graph::render_png(view),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::{select, Binding};
    use crate::variables::extract_variables;
    use serde_json::Value;

    const RESULTS: &str = r#"{
        "name": "ReadBenchmark",
        "details": { "os.name": "Linux" },
        "measurements": [
            { "variables": { "parser": "gson", "input": "rap" },
              "units": { "ns": 1, "us": 1000, "ms": 1000000 }, "values": [2000000, 4000000] },
            { "variables": { "parser": "jackson", "input": "rap" },
              "units": { "ns": 1, "us": 1000, "ms": 1000000 }, "values": [1000000] },
            { "variables": { "parser": "gson", "input": "caliper" },
              "units": { "ns": 1, "us": 1000, "ms": 1000000 }, "values": [6000000] }
        ]
    }"#;

    #[test]
    fn test_build_view() {
        let results = ResultSet::from_json(RESULTS).unwrap();
        let variables = extract_variables(&results.measurements);
        let view = build_view(&results, &variables, ViewConfig::default()).unwrap();
        assert_eq!(view.name, "ReadBenchmark");
        assert_eq!(view.unit, "ms");
        assert_eq!(view.config.rows.as_deref(), Some("parser"));
        assert_eq!(view.config.sections, vec!["input"]);
        assert_eq!(view.plan.leaves().len(), 2);
        assert_eq!(view.controls.len(), 2);
    }

    #[test]
    fn test_rebuild_after_selection() {
        let results = ResultSet::from_json(RESULTS).unwrap();
        let variables = extract_variables(&results.measurements);
        let config = select(ViewConfig::default(), "input", Binding::Groups).unwrap();
        let view = build_view(&results, &variables, config).unwrap();
        assert_eq!(view.config.rows.as_deref(), Some("parser"));
        assert_eq!(view.config.groups.as_deref(), Some("input"));
        assert!(view.config.sections.is_empty());
        assert_eq!(view.plan.leaves().len(), 1);
    }

    #[test]
    fn test_json_output() {
        let results = ResultSet::from_json(RESULTS).unwrap();
        let variables = extract_variables(&results.measurements);
        let view = build_view(&results, &variables, ViewConfig::default()).unwrap();
        let json: Value = serde_json::from_slice(&render(&view, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["unit"], "ms");
        assert_eq!(json["details"]["os.name"], "Linux");
        assert_eq!(json["config"]["rows"], "parser");
        assert_eq!(json["controls"][0]["binding"], "rows");
        let first = &json["plan"]["sections"][0];
        assert_eq!(first["variable"], "input");
        assert_eq!(first["label"], "rap");
        let gson = &first["plan"]["chart"]["rows"][0];
        assert_eq!(gson["label"], "gson");
        assert_eq!(gson["groups"][0]["label"], Value::Null);
        assert_eq!(gson["groups"][0]["median"], 3.0);
    }

    #[test]
    fn test_every_format_has_help() {
        use clap::ValueEnum;
        for format in OutputFormat::value_variants() {
            let value = format.to_possible_value().unwrap();
            assert!(value.get_help().is_some(), "no help for {}", value.get_name());
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("out/chart.SVG")), Some(OutputFormat::Svg));
        assert_eq!(OutputFormat::from_path(Path::new("chart.png")), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(Path::new("chart")), None);
        assert_eq!(OutputFormat::from_path(Path::new("chart.gif")), None);
    }
}
