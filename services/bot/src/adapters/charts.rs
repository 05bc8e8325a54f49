//! services/bot/src/adapters/charts.rs
//!
//! This module contains the chart rendering adapter. It implements the
//! `ChartRenderer` port from the `core` crate using `plotters`, drawing
//! into an in-memory RGB buffer and encoding the result as PNG.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use image::ImageEncoder;
use plotters::prelude::*;
use wellness_core::ports::{ChartRenderer, PortError, PortResult};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ChartRenderer` port using `plotters`.
pub struct PlottersChartAdapter;

impl PlottersChartAdapter {
    pub fn new() -> Self {
        Self
    }

    fn encode_png(buffer: &[u8]) -> PortResult<Vec<u8>> {
        let mut png = Vec::new();
        image::codecs::png::PngEncoder::new(&mut png)
            .write_image(buffer, WIDTH, HEIGHT, image::ExtendedColorType::Rgb8)
            .map_err(|e| PortError::Unexpected(format!("PNG encoding failed: {e}")))?;
        Ok(png)
    }
}

impl Default for PlottersChartAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn draw_error(e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("chart rendering failed: {e}"))
}

//=========================================================================================
// `ChartRenderer` Trait Implementation
//=========================================================================================

impl ChartRenderer for PlottersChartAdapter {
    fn render_bar(
        &self,
        series: &[(NaiveDate, f64)],
        x_range: (NaiveDate, NaiveDate),
        title: &str,
        y_label: &str,
    ) -> PortResult<Vec<u8>> {
        let mut buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT))
                .into_drawing_area();
            root.fill(&WHITE).map_err(draw_error)?;

            let y_max = series
                .iter()
                .map(|(_, v)| *v)
                .fold(0.0_f64, f64::max)
                .max(1.0)
                * 1.1;
            // One extra day so the rightmost bar stays inside the plot.
            let (x_start, x_end) = (x_range.0, x_range.1 + Duration::days(1));

            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 24))
                .margin(10)
                .x_label_area_size(35)
                .y_label_area_size(45)
                .build_cartesian_2d(x_start..x_end, 0.0..y_max)
                .map_err(draw_error)?;

            chart
                .configure_mesh()
                .y_desc(y_label)
                .x_labels(10)
                .x_label_formatter(&|d: &NaiveDate| d.format("%d/%m").to_string())
                .draw()
                .map_err(draw_error)?;

            chart
                .draw_series(series.iter().map(|(day, value)| {
                    Rectangle::new(
                        [(*day, 0.0), (*day + Duration::days(1), *value)],
                        BLUE.mix(0.5).filled(),
                    )
                }))
                .map_err(draw_error)?;

            root.present().map_err(draw_error)?;
        }
        Self::encode_png(&buffer)
    }

    fn render_line(
        &self,
        points: &[(DateTime<Utc>, f64)],
        x_range: (NaiveDate, NaiveDate),
        title: &str,
        y_label: &str,
        y_range: (f64, f64),
    ) -> PortResult<Vec<u8>> {
        let mut buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT))
                .into_drawing_area();
            root.fill(&WHITE).map_err(draw_error)?;

            let x_start = x_range
                .0
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc();
            let x_end = (x_range.1 + Duration::days(1))
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc();

            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 24))
                .margin(10)
                .x_label_area_size(35)
                .y_label_area_size(45)
                .build_cartesian_2d(x_start..x_end, y_range.0..y_range.1)
                .map_err(draw_error)?;

            chart
                .configure_mesh()
                .y_desc(y_label)
                .x_labels(10)
                .x_label_formatter(&|t: &DateTime<Utc>| t.format("%d/%m").to_string())
                .draw()
                .map_err(draw_error)?;

            chart
                .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
                .map_err(draw_error)?;

            root.present().map_err(draw_error)?;
        }
        Self::encode_png(&buffer)
    }
}
