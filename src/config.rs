use crate::error::{ChartError, Result};
use crate::variables::VariableIndex;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 150.0,
            bottom: 30.0,
            left: 150.0,
        }
    }
}

/// Chart height: derived from the number of rows and groups, or given.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Height {
    #[default]
    Auto,
    Fixed(f64),
}

/// A possibly incomplete description of how to lay out the charts.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub rows: Option<String>,
    pub groups: Option<String>,
    pub unit: Option<String>,
    pub width: u32,
    pub height: Height,
    pub margins: Margins,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            rows: None,
            groups: None,
            unit: None,
            width: 800,
            height: Height::Auto,
            margins: Margins::default(),
        }
    }
}

/// A view configuration with every default filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub rows: Option<String>,
    pub groups: Option<String>,
    pub unit: Option<String>,
    pub width: u32,
    pub height: f64,
    pub margins: Margins,
    /// Multi-valued variables not used as rows or groups, outermost first.
    pub sections: Vec<String>,
}

pub fn resolve_config(variables: &VariableIndex, partial: ViewConfig) -> Result<ResolvedConfig> {
    for name in partial.rows.iter().chain(partial.groups.iter()) {
        if !variables.contains(name) {
            return Err(ChartError::UnknownVariable(name.clone()));
        }
    }
    if partial.rows.is_some() && partial.rows == partial.groups {
        return Err(ChartError::InvalidConfig(format!(
            "'{}' cannot be used for both rows and groups",
            partial.rows.as_deref().unwrap_or_default()
        )));
    }
    if partial.width == 0 {
        return Err(ChartError::InvalidConfig("width must be positive".to_string()));
    }

    let multi_valued: Vec<&str> = variables.multi_valued().collect();

    let groups = partial.groups;
    let rows = match partial.rows {
        Some(rows) => Some(rows),
        None if multi_valued.len() >= 2 => {
            // first multi-valued variable not already used for groups
            let first = multi_valued
                .iter()
                .find(|name| groups.as_deref() != Some(**name))
                .map(|name| name.to_string());
            debug!(rows = ?first, "defaulting rows");
            first
        }
        None => None,
    };

    let sections: Vec<String> = multi_valued
        .iter()
        .filter(|name| rows.as_deref() != Some(**name) && groups.as_deref() != Some(**name))
        .map(|name| name.to_string())
        .collect();
    debug!(?sections, "section variables");

    let height = match partial.height {
        Height::Fixed(h) if h > 0.0 && h.is_finite() => h,
        Height::Fixed(h) => {
            return Err(ChartError::InvalidConfig(format!(
                "height must be positive, got {}",
                h
            )))
        }
        Height::Auto => {
            let row_count = count_or_one(variables, rows.as_deref());
            let group_count = count_or_one(variables, groups.as_deref());
            auto_height(row_count, group_count, &partial.margins)
        }
    };

    Ok(ResolvedConfig {
        rows,
        groups,
        unit: partial.unit,
        width: partial.width,
        height,
        margins: partial.margins,
        sections,
    })
}

/// Room for `rows` bands of `groups` bars each, with 10% padding between
/// bands and around them.
pub fn auto_height(rows: usize, groups: usize, margins: &Margins) -> f64 {
    let group_height = (groups as f64 * 10.0).max(20.0);
    let bars_height = rows as f64 * group_height;
    let padding = (rows as f64 + 1.0) * group_height * 0.1;
    bars_height + padding + margins.top + margins.bottom
}

fn count_or_one(variables: &VariableIndex, name: Option<&str>) -> usize {
    name.map_or(1, |n| variables.value_count(n).max(1))
}
