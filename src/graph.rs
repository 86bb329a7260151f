//! Drawing of a [`ChartView`] with plotters: one horizontal grouped bar chart
//! per section, stacked top to bottom under the result set's name.

use crate::error::{ChartError, Result};
use crate::plan::Leaf;
use crate::scale::{format_grouped, tick_precision, LinearScale};
use crate::ChartView;
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{Palette, Palette99};
use tracing::debug;

const TITLE_HEIGHT: u32 = 40;
/// Extra room above each chart for its section caption.
const CAPTION_HEIGHT: u32 = 30;
const TICK_COUNT: usize = 5;
/// Padding at each edge of a row band, as a fraction of the band.
const BAND_PADDING: f64 = 0.05;
/// Opacity of the max, median and min bars. Later bars are drawn on top.
const LAYER_OPACITY: [f64; 3] = [0.2, 0.6, 1.0];

/// Largest bitmap `render_png` will allocate, in pixels.
const MAX_PNG_PIXELS: u64 = 1 << 28;

/// Pixel size of the whole drawing.
pub fn canvas_size(view: &ChartView) -> Result<(u32, u32)> {
    let panels = u32::try_from(view.plan.leaves().len().max(1)).map_err(|_| too_large(view))?;
    let height = panel_height(view)
        .and_then(|panel| panels.checked_mul(panel))
        .and_then(|body| body.checked_add(TITLE_HEIGHT))
        .ok_or_else(|| too_large(view))?;
    Ok((view.config.width, height))
}

fn panel_height(view: &ChartView) -> Option<u32> {
    let caption = if view.config.sections.is_empty() {
        0
    } else {
        CAPTION_HEIGHT
    };
    let chart = view.config.height.round().max(1.0);
    if chart > f64::from(u32::MAX) {
        return None;
    }
    (chart as u32).checked_add(caption)
}

fn too_large(view: &ChartView) -> ChartError {
    ChartError::Render(format!(
        "a chart height of {} does not fit in a drawing",
        view.config.height
    ))
}

pub fn render_svg(view: &ChartView) -> Result<String> {
    let (width, height) = canvas_size(view)?;
    debug!(width, height, "rendering svg");
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        draw_view(&root, view)?;
        root.present().map_err(render_error)?;
    }
    Ok(svg)
}

/// Draw into an RGB buffer and encode it as PNG.
pub fn render_png(view: &ChartView) -> Result<Vec<u8>> {
    let (width, height) = canvas_size(view)?;
    debug!(width, height, "rendering png");
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_PNG_PIXELS {
        return Err(ChartError::Render(format!(
            "{}x{} is too large for a png, use svg instead",
            width, height
        )));
    }
    let mut buffer = vec![0u8; pixels as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_view(&root, view)?;
        root.present().map_err(render_error)?;
    }

    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(&buffer, width, height, image::ColorType::Rgb8)
        .map_err(render_error)?;
    Ok(png_bytes)
}

fn draw_view<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, view: &ChartView) -> Result<()> {
    root.fill(&WHITE).map_err(render_error)?;

    let (title_area, body) = root.split_vertically(TITLE_HEIGHT);
    let title = if view.name.is_empty() {
        "Benchmark"
    } else {
        view.name.as_str()
    };
    title_area
        .draw(&Text::new(title, (10, 10), ("sans-serif", 22).into_font()))
        .map_err(render_error)?;

    let leaves = view.plan.leaves();
    let panels = body.split_evenly((leaves.len().max(1), 1));
    for (leaf, panel) in leaves.iter().zip(&panels) {
        draw_leaf(panel, leaf, view)?;
    }
    Ok(())
}

fn draw_leaf<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    leaf: &Leaf<'_>,
    view: &ChartView,
) -> Result<()> {
    let node = leaf.chart;
    let margins = &view.config.margins;
    let row_count = node.rows.len().max(1);
    let x_max = match node.max_value() {
        max if max > 0.0 => max,
        _ => 1.0,
    };
    let precision = LinearScale::new(0.0, x_max)
        .tick_step(TICK_COUNT)
        .map_or(0, tick_precision);

    let mut builder = ChartBuilder::on(area);
    builder
        .margin_top(margins.top)
        .margin_right(margins.right)
        .margin_left(5)
        .x_label_area_size(margins.bottom)
        .y_label_area_size(margins.left);
    if !leaf.path.is_empty() {
        let caption: Vec<String> = leaf
            .path
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect();
        builder.caption(caption.join(" / "), ("sans-serif", 16));
    }
    let mut chart = builder
        .build_cartesian_2d(0f64..x_max, 0f64..row_count as f64)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_labels(TICK_COUNT)
        .x_label_formatter(&|v| format_grouped(*v, precision))
        .x_desc(view.unit.as_str())
        .draw()
        .map_err(render_error)?;

    let label_style =
        TextStyle::from(("sans-serif", 13).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
    chart
        .draw_series(node.rows.iter().enumerate().filter_map(|(i, row)| {
            let label = row.label.as_ref()?;
            let center = row_count as f64 - i as f64 - 0.5;
            Some(
                EmptyElement::at((0.0, center))
                    + Text::new(label.to_string(), (-8, 0), label_style.clone()),
            )
        }))
        .map_err(render_error)?;

    let groups = node.group_labels();
    let group_count = groups.len().max(1);
    for (j, group_label) in groups.iter().enumerate() {
        let color = Palette99::pick(j).to_rgba();
        for (layer, opacity) in LAYER_OPACITY.iter().enumerate() {
            let bars = node.rows.iter().enumerate().filter_map(|(i, row)| {
                let group = row.groups.iter().find(|g| g.label.as_ref() == *group_label)?;
                let s = &group.summary;
                let value = [s.max, s.median, s.min][layer];
                let (y0, y1) = bar_span(row_count, group_count, i, j);
                Some(Rectangle::new([(0.0, y0), (value, y1)], color.mix(*opacity).filled()))
            });
            let series = chart.draw_series(bars).map_err(render_error)?;
            // one legend entry per group, keyed on the solid min bar
            if let (Some(label), true) = (group_label, layer == LAYER_OPACITY.len() - 1) {
                series.label(label.to_string()).legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                });
            }
        }
    }

    if groups.iter().any(Option::is_some) {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK.mix(0.3))
            .label_font(("sans-serif", 12))
            .draw()
            .map_err(render_error)?;
    }
    Ok(())
}

/// Vertical extent of group `group` in row `row`. Row 0 is at the top.
fn bar_span(rows: usize, groups: usize, row: usize, group: usize) -> (f64, f64) {
    let top = (rows - row) as f64 - BAND_PADDING;
    let height = (1.0 - 2.0 * BAND_PADDING) / groups as f64;
    let upper = top - group as f64 * height;
    (upper - height, upper)
}

fn render_error(e: impl std::fmt::Display) -> ChartError {
    ChartError::Render(e.to_string())
}
