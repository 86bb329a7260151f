//! Tabular and plain-text renderings of a [`ChartView`].

use crate::error::{ChartError, Result};
use crate::plan::{ChartNode, Leaf};
use crate::scale::{format_grouped, tick_precision, LinearScale};
use crate::ChartView;
use std::fmt::{self, Write as _};
use std::io;

const CSV_HEADER: [&str; 7] = ["section", "row", "group", "max", "median", "min", "unit"];

/// One record per group of every chart, in plan order.
pub fn write_csv<W: io::Write>(view: &ChartView, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for leaf in view.plan.leaves() {
        let section = section_title(&leaf, "/");
        for row in &leaf.chart.rows {
            let row_label = row.label.as_ref().map(ToString::to_string).unwrap_or_default();
            for group in &row.groups {
                let group_label = group.label.as_ref().map(ToString::to_string).unwrap_or_default();
                let s = &group.summary;
                writer.write_record([
                    section.clone(),
                    row_label.clone(),
                    group_label,
                    s.max.to_string(),
                    s.median.to_string(),
                    s.min.to_string(),
                    view.unit.clone(),
                ])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// A readable report: the charts as indented lines, then the details.
pub fn to_text(view: &ChartView) -> Result<String> {
    let mut out = String::new();
    write_report(&mut out, view).map_err(|e| ChartError::Render(e.to_string()))?;
    Ok(out)
}

fn write_report(out: &mut impl fmt::Write, view: &ChartView) -> fmt::Result {
    let title = if view.name.is_empty() { "Benchmark" } else { &view.name };
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "=".repeat(title.chars().count()))?;
    writeln!(out, "unit: {}", view.unit)?;

    for leaf in view.plan.leaves() {
        writeln!(out)?;
        if !leaf.path.is_empty() {
            writeln!(out, "[{}]", section_title(&leaf, " / "))?;
        }
        write_chart(out, leaf.chart, &view.unit)?;
    }

    let details = sorted_details(&view.details);
    if !details.is_empty() {
        writeln!(out, "\nDetails")?;
        for (key, value) in details {
            writeln!(out, "  {}: {}", key, value)?;
        }
    }
    Ok(())
}

fn write_chart(out: &mut impl fmt::Write, chart: &ChartNode, unit: &str) -> fmt::Result {
    let precision = value_precision(chart.max_value());
    let fmt = |v: f64| format_grouped(v, precision);
    for row in &chart.rows {
        // without a groups variable each row is a single line
        let grouped = row.groups.iter().any(|g| g.label.is_some());
        let mut indent = "";
        if let (true, Some(label)) = (grouped, &row.label) {
            writeln!(out, "{}", label)?;
            indent = "  ";
        }
        for group in &row.groups {
            let name = group
                .label
                .as_ref()
                .or(row.label.as_ref())
                .map_or_else(|| "all".to_string(), ToString::to_string);
            let s = &group.summary;
            writeln!(
                out,
                "{}{}: max {} / median {} / min {} {}",
                indent,
                name,
                fmt(s.max),
                fmt(s.median),
                fmt(s.min),
                unit
            )?;
        }
    }
    Ok(())
}

/// Two more decimals than the chart's axis ticks would show.
fn value_precision(max: f64) -> usize {
    LinearScale::new(0.0, max)
        .tick_step(5)
        .map_or(2, |step| tick_precision(step) + 2)
}

fn section_title(leaf: &Leaf<'_>, separator: &str) -> String {
    leaf.path
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join(separator)
}

fn sorted_details(details: &[(String, String)]) -> Vec<&(String, String)> {
    let mut sorted: Vec<_> = details.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::data::ResultSet;
    use crate::variables::extract_variables;

    fn view(config: ViewConfig) -> ChartView {
        let results = ResultSet::from_json(
            r#"{
                "name": "Sort",
                "details": { "vm": "java 21", "host": "ci-3" },
                "measurements": [
                    { "variables": { "impl": "A", "size": 10 }, "units": { "ms": 1 }, "values": [10, 20] },
                    { "variables": { "impl": "B", "size": 10 }, "units": { "ms": 1 }, "values": [5] },
                    { "variables": { "impl": "A", "size": 100 }, "units": { "ms": 1 }, "values": [1250.5] }
                ]
            }"#,
        )
        .unwrap();
        let variables = extract_variables(&results.measurements);
        crate::build_view(&results, &variables, config).unwrap()
    }

    fn by_impl() -> ViewConfig {
        ViewConfig {
            groups: Some("impl".to_string()),
            ..ViewConfig::default()
        }
    }

    fn csv_lines(view: &ChartView) -> Vec<String> {
        let mut out = Vec::new();
        write_csv(view, &mut out).unwrap();
        String::from_utf8(out).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_csv_records() {
        // groups take impl, so rows default to size
        assert_eq!(
            csv_lines(&view(by_impl())),
            vec![
                "section,row,group,max,median,min,unit",
                ",10,A,20,15,10,ms",
                ",10,B,5,5,5,ms",
                ",100,A,1250.5,1250.5,1250.5,ms",
            ]
        );
    }

    #[test]
    fn test_csv_sections() {
        // rows default to impl, size remains a section
        assert_eq!(
            csv_lines(&view(ViewConfig::default())),
            vec![
                "section,row,group,max,median,min,unit",
                "size: 10,A,,20,15,10,ms",
                "size: 10,B,,5,5,5,ms",
                "size: 100,A,,1250.5,1250.5,1250.5,ms",
            ]
        );
    }

    #[test]
    fn test_text_report() {
        let text = to_text(&view(by_impl())).unwrap();
        assert!(text.starts_with("Sort\n====\nunit: ms\n"), "{}", text);
        assert!(
            text.contains(
                "10\n  A: max 20.00 / median 15.00 / min 10.00 ms\n  B: max 5.00 / median 5.00 / min 5.00 ms\n100\n  A: max 1,250.50"
            ),
            "{}",
            text
        );
        assert!(text.ends_with("Details\n  host: ci-3\n  vm: java 21\n"), "{}", text);
    }

    #[test]
    fn test_text_sections() {
        let text = to_text(&view(ViewConfig::default())).unwrap();
        assert!(
            text.contains("[size: 10]\nA: max 20.00 / median 15.00 / min 10.00 ms\nB: max 5.00"),
            "{}",
            text
        );
        assert!(text.contains("[size: 100]\nA: max 1,250.50 / median 1,250.50 / min 1,250.50 ms\n"));
    }

    /// Accepts `room` bytes, then refuses every write.
    struct Cramped {
        room: usize,
    }

    impl fmt::Write for Cramped {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.room = self.room.checked_sub(s.len()).ok_or(fmt::Error)?;
            Ok(())
        }
    }

    #[test]
    fn test_text_write_failure_is_reported() {
        let view = view(by_impl());
        let full = to_text(&view).unwrap();
        assert!(write_report(&mut Cramped { room: full.len() }, &view).is_ok());
        // fails inside the chart lines and again inside the details
        for room in [20, full.len() - 5] {
            assert!(write_report(&mut Cramped { room }, &view).is_err(), "room {}", room);
        }
    }

    #[test]
    fn test_value_precision() {
        assert_eq!(value_precision(20.0), 2);
        assert_eq!(value_precision(0.00042), 6);
        assert_eq!(value_precision(0.0), 2);
    }
}
