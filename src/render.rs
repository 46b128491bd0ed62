use std::path::Path;

use anyhow::Result;
#[cfg(feature = "plots")]
use anyhow::Context;

use crate::{charts::Chart, results::FieldValue};

/// Display name for a categorical axis slot.
pub fn category_label(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(name) => match name.as_str() {
            "direct" => "Direct (1-way)".to_string(),
            "fully" => "Fully Assoc.".to_string(),
            other => match other.strip_suffix("way") {
                Some(ways) => format!("{ways}-way"),
                None => other.to_string(),
            },
        },
        FieldValue::Int(v) => v.to_string(),
    }
}

/// Hit-rate axis range in percent: the data padded by two percentage points
/// on each side, clamped to 0..100. Falls back to the full range without data.
pub fn percent_range(values: &[f64]) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 100.0);
    }
    ((lo - 2.0).floor().max(0.0), (hi + 2.0).ceil().min(100.0))
}

/// X range for a numeric sweep, padded by 5% of the span.
pub fn padded_range(values: &[f64]) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.5 };
    (lo - pad, hi + pad)
}

/// Draw the charts into a 2x2 grid. The backend follows the file extension:
/// `.svg` writes SVG, anything else a bitmap.
#[cfg(feature = "plots")]
pub fn render_dashboard(path: &Path, charts: &[Chart]) -> Result<()> {
    use plotters::prelude::*;

    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    let outcome = if is_svg {
        let root = SVGBackend::new(path, plots::FIGURE_SIZE).into_drawing_area();
        plots::draw_dashboard(&root, charts)
    } else {
        let root = BitMapBackend::new(path, plots::FIGURE_SIZE).into_drawing_area();
        plots::draw_dashboard(&root, charts)
    };
    outcome.with_context(|| format!("Failed to render {}", path.display()))?;
    log::info!("Rendered {} charts to {}", charts.len(), path.display());
    Ok(())
}

#[cfg(not(feature = "plots"))]
pub fn render_dashboard(_path: &Path, _charts: &[Chart]) -> Result<()> {
    anyhow::bail!("plots feature is not enabled")
}

#[cfg(feature = "plots")]
mod plots {
    use anyhow::Result;
    use plotters::{coord::Shift, prelude::*};

    use super::{category_label, padded_range, percent_range};
    use crate::{
        charts::{Chart, ChartKind},
        results::FieldValue,
    };

    pub const FIGURE_SIZE: (u32, u32) = (1600, 1000);

    const PALETTE: [RGBColor; 4] = [
        RGBColor(0x2E, 0x86, 0xAB),
        RGBColor(0xA2, 0x3B, 0x72),
        RGBColor(0xF1, 0x8F, 0x01),
        RGBColor(0x06, 0xA7, 0x7D),
    ];

    pub fn draw_dashboard<DB>(
        root: &DrawingArea<DB, Shift>,
        charts: &[Chart],
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;
        let panels = root.split_evenly((2, 2));
        for (slot, (panel, chart)) in panels.iter().zip(charts).enumerate() {
            match chart.kind {
                ChartKind::Line => draw_line_panel(panel, chart, slot)?,
                ChartKind::Bar => draw_bar_panel(panel, chart, slot)?,
            }
        }
        root.present()?;
        Ok(())
    }

    fn draw_line_panel<DB>(
        area: &DrawingArea<DB, Shift>,
        chart: &Chart,
        slot: usize,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let series: Vec<(&str, Vec<(f64, f64)>)> = chart
            .series
            .iter()
            .map(|s| {
                let points = s
                    .points
                    .iter()
                    .filter_map(|p| match p.value {
                        FieldValue::Int(x) if !p.filled => Some((x as f64, p.hit_rate * 100.0)),
                        _ => None,
                    })
                    .collect();
                (s.label.as_str(), points)
            })
            .collect();
        let xs: Vec<f64> = series
            .iter()
            .flat_map(|(_, pts)| pts.iter().map(|p| p.0))
            .collect();
        let ys: Vec<f64> = series
            .iter()
            .flat_map(|(_, pts)| pts.iter().map(|p| p.1))
            .collect();
        let (x_lo, x_hi) = padded_range(&xs);
        let (y_lo, y_hi) = percent_range(&ys);

        let mut ctx = ChartBuilder::on(area)
            .caption(chart.caption(), ("sans-serif", 20))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(55)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
        ctx.configure_mesh()
            .x_desc(chart.varying.axis_label())
            .y_desc("Hit Rate (%)")
            .x_label_formatter(&|x| format!("{x:.0}"))
            .draw()?;

        for (idx, (label, points)) in series.iter().enumerate() {
            let color = PALETTE[(slot + idx) % PALETTE.len()];
            ctx.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
                .label(*label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            ctx.draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
            )?;
            ctx.draw_series(points.iter().map(|&(x, y)| {
                Text::new(format!("{y:.2}%"), (x, y), ("sans-serif", 12))
            }))?;
        }
        if series.len() > 1 {
            ctx.configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }

    fn draw_bar_panel<DB>(
        area: &DrawingArea<DB, Shift>,
        chart: &Chart,
        slot: usize,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let points = chart
            .series
            .first()
            .map(|s| s.points.as_slice())
            .unwrap_or(&[]);
        let labels: Vec<String> = points.iter().map(|p| category_label(&p.value)).collect();
        let heights: Vec<f64> = points.iter().map(|p| p.hit_rate * 100.0).collect();
        let (y_lo, y_hi) = percent_range(&heights);
        let slots = points.len().max(1) as u32;

        let mut ctx = ChartBuilder::on(area)
            .caption(chart.caption(), ("sans-serif", 20))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(55)
            .build_cartesian_2d((0u32..slots).into_segmented(), y_lo..y_hi)?;
        ctx.configure_mesh()
            .disable_x_mesh()
            .x_desc(chart.varying.axis_label())
            .y_desc("Hit Rate (%)")
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .draw()?;

        let color = PALETTE[slot % PALETTE.len()];
        ctx.draw_series(
            Histogram::vertical(&ctx)
                .style(color.mix(0.7).filled())
                .margin(20)
                .baseline(y_lo)
                .data(heights.iter().enumerate().map(|(i, &h)| (i as u32, h))),
        )?;
        ctx.draw_series(points.iter().zip(&heights).enumerate().map(|(i, (p, &h))| {
            let text = if p.filled {
                "no data".to_string()
            } else {
                format!("{h:.2}%")
            };
            Text::new(text, (SegmentValue::CenterOf(i as u32), h), ("sans-serif", 13))
        }))?;
        Ok(())
    }
}
