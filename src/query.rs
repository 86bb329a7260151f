// URL-style view options: `?input=results.json&rows=parser&groups=input`

use crate::config::{Height, ViewConfig};
use crate::error::{ChartError, Result};
use nom::{
    bytes::complete::{take_till, take_till1},
    character::complete::char,
    combinator::{all_consuming, map, opt},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, preceded},
    IResult,
};
use tracing::debug;

/// Options taken from a query string or the command line. `None` leaves the
/// corresponding setting to its default.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewOptions {
    pub input: Option<String>,
    pub rows: Option<String>,
    pub groups: Option<String>,
    pub unit: Option<String>,
    pub width: Option<u32>,
    pub height: Option<Height>,
    pub margin_top: Option<f64>,
    pub margin_right: Option<f64>,
    pub margin_bottom: Option<f64>,
    pub margin_left: Option<f64>,
    /// Keys this crate does not interpret, in query order.
    pub extra: Vec<(String, String)>,
}

impl ViewOptions {
    /// Overlay the options that are set onto `config`.
    pub fn apply(&self, mut config: ViewConfig) -> ViewConfig {
        if self.rows.is_some() {
            config.rows = self.rows.clone();
        }
        if self.groups.is_some() {
            config.groups = self.groups.clone();
        }
        if self.unit.is_some() {
            config.unit = self.unit.clone();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        let margins = &mut config.margins;
        margins.top = self.margin_top.unwrap_or(margins.top);
        margins.right = self.margin_right.unwrap_or(margins.right);
        margins.bottom = self.margin_bottom.unwrap_or(margins.bottom);
        margins.left = self.margin_left.unwrap_or(margins.left);
        config
    }

    /// Options from `overrides` win over those in `self`.
    pub fn merge(self, overrides: ViewOptions) -> ViewOptions {
        let mut extra = self.extra;
        extra.extend(overrides.extra);
        ViewOptions {
            input: overrides.input.or(self.input),
            rows: overrides.rows.or(self.rows),
            groups: overrides.groups.or(self.groups),
            unit: overrides.unit.or(self.unit),
            width: overrides.width.or(self.width),
            height: overrides.height.or(self.height),
            margin_top: overrides.margin_top.or(self.margin_top),
            margin_right: overrides.margin_right.or(self.margin_right),
            margin_bottom: overrides.margin_bottom.or(self.margin_bottom),
            margin_left: overrides.margin_left.or(self.margin_left),
            extra,
        }
    }
}

fn key(input: &str) -> IResult<&str, &str> {
    take_till1(|c| c == '=' || c == '&')(input)
}

fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
    pair(
        key,
        map(opt(preceded(char('='), take_till(|c| c == '&'))), |v| {
            v.unwrap_or("")
        }),
    )(input)
}

/// Split a query string into raw `(key, value)` pairs.
fn parse_pairs(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    all_consuming(delimited(
        pair(opt(char('?')), many0(char('&'))),
        separated_list0(many1(char('&')), key_value),
        many0(char('&')),
    ))(input)
}

pub fn parse_query(input: &str) -> Result<ViewOptions> {
    let (_, pairs) = parse_pairs(input.trim())
        .map_err(|e| ChartError::Query(format!("cannot parse '{}': {}", input, e)))?;

    let mut options = ViewOptions::default();
    for (raw_key, raw_value) in pairs {
        let key = decode(raw_key)?;
        let value = decode(raw_value)?;
        let set = if value.is_empty() { None } else { Some(value.clone()) };
        match key.as_str() {
            "input" => options.input = set,
            "rows" => options.rows = set,
            "groups" => options.groups = set,
            "unit" => options.unit = set,
            "width" => options.width = set.map(|v| parse_number(&key, &v)).transpose()?,
            "height" => options.height = set.map(|v| parse_height(&v)).transpose()?,
            "margin.top" => options.margin_top = set.map(|v| parse_number(&key, &v)).transpose()?,
            "margin.right" => {
                options.margin_right = set.map(|v| parse_number(&key, &v)).transpose()?
            }
            "margin.bottom" => {
                options.margin_bottom = set.map(|v| parse_number(&key, &v)).transpose()?
            }
            "margin.left" => options.margin_left = set.map(|v| parse_number(&key, &v)).transpose()?,
            other => {
                debug!(key = other, %value, "passing through unrecognized option");
                options.extra.push((other.to_string(), value));
            }
        }
    }
    Ok(options)
}

pub fn parse_height(value: &str) -> Result<Height> {
    // -1 is the historical "compute it" marker
    match value {
        "auto" | "-1" => Ok(Height::Auto),
        other => parse_number("height", other).map(Height::Fixed),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ChartError::Query(format!("'{}' expects a number, got '{}'", key, value)))
}

/// Percent-decoding with `+` as space.
fn decode(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hex = raw
                    .get(i + 1..i + 3)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| ChartError::Query(format!("bad escape in '{}'", raw)))?;
                out.push(hex);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8(out).map_err(|_| ChartError::Query(format!("'{}' is not valid UTF-8", raw)))
}
