use crate::config::{ResolvedConfig, ViewConfig};
use crate::data::VariableValue;
use crate::error::{ChartError, Result};
use crate::variables::VariableIndex;
use serde::Serialize;

/// Role a variable plays in the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    Rows,
    Groups,
    /// Splits the view into one section per value.
    Section,
    /// Has a single value, so it cannot be bound.
    Fixed,
}

/// One row of the interactive variable chooser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableControl {
    pub name: String,
    pub values: Vec<VariableValue>,
    pub binding: Binding,
}

impl VariableControl {
    pub fn selectable(&self) -> bool {
        self.binding != Binding::Fixed
    }
}

pub fn controls(variables: &VariableIndex, config: &ResolvedConfig) -> Vec<VariableControl> {
    variables
        .names
        .iter()
        .zip(&variables.values)
        .map(|(name, values)| {
            let binding = if config.rows.as_ref() == Some(name) {
                Binding::Rows
            } else if config.groups.as_ref() == Some(name) {
                Binding::Groups
            } else if values.len() > 1 {
                Binding::Section
            } else {
                Binding::Fixed
            };
            VariableControl {
                name: name.clone(),
                values: values.clone(),
                binding,
            }
        })
        .collect()
}

/// The configuration after the user binds `name` to `binding`.
///
/// A variable holds at most one role: binding it to rows releases it from
/// groups and the other way round. Releasing the rows variable lets the
/// resolver pick a default again.
pub fn select(mut config: ViewConfig, name: &str, binding: Binding) -> Result<ViewConfig> {
    let is = |slot: &Option<String>| slot.as_deref() == Some(name);
    match binding {
        Binding::Rows => {
            if is(&config.groups) {
                config.groups = None;
            }
            config.rows = Some(name.to_string());
        }
        Binding::Groups => {
            if is(&config.rows) {
                config.rows = None;
            }
            config.groups = Some(name.to_string());
        }
        Binding::Section => {
            if is(&config.rows) {
                config.rows = None;
            }
            if is(&config.groups) {
                config.groups = None;
            }
        }
        Binding::Fixed => {
            return Err(ChartError::InvalidConfig(format!(
                "'{}' cannot be bound as fixed",
                name
            )))
        }
    }
    Ok(config)
}
