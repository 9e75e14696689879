//! Static Chart Renderer
//! Draws the tower map and the tower/bell histograms with plotters.
//!
//! Output files (`<plots>/<prefix>_<Name>.<ext>`):
//! 1. TowerLocations: Mercator scatter of towers, coloured by bell count
//! 2. TowerNBells: bells per tower
//! 3. TowerWeight: tenor weight in cwt
//! 4. BellsFreq: nominal frequency on a log axis
//! 5. BellsWeight: bell weight in cwt
//! 6. BellsDiameter: bell diameter in cm
//! 7. BellsDated: year each bell was cast

use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use super::histogram::{arange, linspace, logspace, upper_limit, Histogram};
use super::regions::Region;
use crate::config::{ImageFormat, Settings, CRS_IN, CRS_OUT};
use crate::data::{DataProcessor, ProcessorError};
use crate::model::World;

pub const MIN_BELLS: usize = 1;
pub const MAX_BELLS: usize = 16;

// Figure sizes in inches (A4 portrait for the map)
const MAP_SIZE_IN: (f64, f64) = (8.27, 11.69);
const HISTOGRAM_SIZE_IN: (f64, f64) = (6.4, 4.8);

// Colour ramp for the location map (hue fraction)
const HUE_START: f64 = 0.12;
const HUE_END: f64 = 1.0;

const BAR: RGBColor = RGBColor(31, 119, 180);
const FONT: &str = "sans-serif";

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Could not create plot directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Rendering failed: {0}")]
    Render(String),
    #[error("Unknown plot '{0}'")]
    UnknownPlot(String),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

fn render_err<E: fmt::Display>(err: E) -> ChartError {
    ChartError::Render(err.to_string())
}

/// The individual charts `make_all_plots` can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Locations,
    NBells,
    TenorWeight,
    Frequency,
    Weight,
    Diameter,
    Dated,
}

impl PlotKind {
    pub const ALL: [PlotKind; 7] = [
        PlotKind::Locations,
        PlotKind::NBells,
        PlotKind::TenorWeight,
        PlotKind::Frequency,
        PlotKind::Weight,
        PlotKind::Diameter,
        PlotKind::Dated,
    ];

    /// File name stem, also accepted by `FromStr`.
    pub fn file_stem(self) -> &'static str {
        match self {
            PlotKind::Locations => "TowerLocations",
            PlotKind::NBells => "TowerNBells",
            PlotKind::TenorWeight => "TowerWeight",
            PlotKind::Frequency => "BellsFreq",
            PlotKind::Weight => "BellsWeight",
            PlotKind::Diameter => "BellsDiameter",
            PlotKind::Dated => "BellsDated",
        }
    }

    fn short_name(self) -> &'static str {
        match self {
            PlotKind::Locations => "locations",
            PlotKind::NBells => "nbells",
            PlotKind::TenorWeight => "tenor",
            PlotKind::Frequency => "freq",
            PlotKind::Weight => "weight",
            PlotKind::Diameter => "diameter",
            PlotKind::Dated => "dated",
        }
    }
}

impl FromStr for PlotKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PlotKind::ALL
            .into_iter()
            .find(|k| k.short_name() == wanted || k.file_stem().to_lowercase() == wanted)
            .ok_or_else(|| ChartError::UnknownPlot(s.to_string()))
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// Which charts to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotSelection {
    pub locations: bool,
    pub n_bells: bool,
    pub tenor_weight: bool,
    pub frequency: bool,
    pub weight: bool,
    pub diameter: bool,
    pub dated: bool,
}

impl Default for PlotSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl PlotSelection {
    pub fn all() -> Self {
        Self {
            locations: true,
            n_bells: true,
            tenor_weight: true,
            frequency: true,
            weight: true,
            diameter: true,
            dated: true,
        }
    }

    pub fn none() -> Self {
        Self {
            locations: false,
            n_bells: false,
            tenor_weight: false,
            frequency: false,
            weight: false,
            diameter: false,
            dated: false,
        }
    }

    /// Only the named charts, e.g. `["locations", "BellsFreq"]`.
    pub fn only<S: AsRef<str>>(names: &[S]) -> Result<Self, ChartError> {
        let mut selection = Self::none();
        for name in names {
            selection.set(name.as_ref().parse()?, true);
        }
        Ok(selection)
    }

    pub fn set(&mut self, kind: PlotKind, on: bool) {
        let flag = match kind {
            PlotKind::Locations => &mut self.locations,
            PlotKind::NBells => &mut self.n_bells,
            PlotKind::TenorWeight => &mut self.tenor_weight,
            PlotKind::Frequency => &mut self.frequency,
            PlotKind::Weight => &mut self.weight,
            PlotKind::Diameter => &mut self.diameter,
            PlotKind::Dated => &mut self.dated,
        };
        *flag = on;
    }

    pub fn contains(&self, kind: PlotKind) -> bool {
        match kind {
            PlotKind::Locations => self.locations,
            PlotKind::NBells => self.n_bells,
            PlotKind::TenorWeight => self.tenor_weight,
            PlotKind::Frequency => self.frequency,
            PlotKind::Weight => self.weight,
            PlotKind::Diameter => self.diameter,
            PlotKind::Dated => self.dated,
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = PlotKind> + '_ {
        PlotKind::ALL.into_iter().filter(|k| self.contains(*k))
    }
}

/// Colour for a tower with `n_bells` bells on the hue ramp.
pub fn bell_colour(n_bells: usize) -> RGBColor {
    let n = n_bells.clamp(MIN_BELLS, MAX_BELLS);
    let t = (n - MIN_BELLS) as f64 / (MAX_BELLS - MIN_BELLS) as f64;
    hsv_to_rgb(HUE_START + t * (HUE_END - HUE_START))
}

/// Fully saturated, full value HSV colour for a hue in `[0, 1]`.
fn hsv_to_rgb(hue: f64) -> RGBColor {
    let h = (hue.rem_euclid(1.0)) * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let to_u8 = |c: f64| (c * 255.0).round() as u8;
    RGBColor(to_u8(r), to_u8(g), to_u8(b))
}

/// A histogram ready to draw.
struct HistogramPlot {
    hist: Histogram,
    x_range: (f64, f64),
    x_label: &'static str,
    y_label: &'static str,
    /// Edges are stored as log10 values and labelled as powers of ten.
    log_x: bool,
}

/// A tower marker in projected coordinates.
struct MapPoint {
    x: f64,
    y: f64,
    n_bells: usize,
}

enum Figure {
    Map(Vec<MapPoint>),
    Histogram(HistogramPlot),
}

impl Figure {
    fn size_in(&self) -> (f64, f64) {
        match self {
            Figure::Map(_) => MAP_SIZE_IN,
            Figure::Histogram(_) => HISTOGRAM_SIZE_IN,
        }
    }
}

/// Renders the Bellpedia charts to PNG or SVG files.
pub struct ChartRenderer<'a> {
    settings: &'a Settings,
    region: Region,
    prefix: String,
    format: ImageFormat,
}

impl<'a> ChartRenderer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            region: Region::default(),
            prefix: String::new(),
            format: settings.image_format,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Output path for `kind`, e.g. `plots/mine_TowerNBells.png`.
    pub fn file_path(&self, kind: PlotKind) -> PathBuf {
        let name = if self.prefix.is_empty() {
            format!("{}.{}", kind.file_stem(), self.format.extension())
        } else {
            format!("{}_{}.{}", self.prefix, kind.file_stem(), self.format.extension())
        };
        self.settings.plots_dir().join(name)
    }

    /// Draw every selected chart; returns the files written.
    ///
    /// Charts without any data to show are skipped with a warning.
    pub fn make_all_plots(&self, world: &World, selection: PlotSelection) -> Result<Vec<PathBuf>, ChartError> {
        let dir = self.settings.plots_dir();
        std::fs::create_dir_all(&dir).map_err(|source| ChartError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut written = Vec::new();
        for kind in selection.kinds() {
            if let Some(path) = self.plot(world, kind)? {
                written.push(path);
            }
        }
        log::info!("Wrote {} plots to {}", written.len(), dir.display());
        Ok(written)
    }

    /// Draw a single chart. The plot directory must already exist.
    pub fn plot(&self, world: &World, kind: PlotKind) -> Result<Option<PathBuf>, ChartError> {
        let Some(figure) = self.figure(world, kind)? else {
            log::warn!("No data for {kind}, skipping");
            return Ok(None);
        };
        let path = self.file_path(kind);
        self.render(&path, &figure)?;
        log::info!("Saved {}", path.display());
        Ok(Some(path))
    }

    fn figure(&self, world: &World, kind: PlotKind) -> Result<Option<Figure>, ChartError> {
        if kind == PlotKind::Locations {
            let points = self.map_points(world);
            if points.is_empty() {
                log::warn!("No towers with coordinates inside {}", self.region);
            }
            return Ok(Some(Figure::Map(points)));
        }
        Ok(self.histogram_plot(world, kind)?.map(Figure::Histogram))
    }

    fn histogram_plot(&self, world: &World, kind: PlotKind) -> Result<Option<HistogramPlot>, ChartError> {
        let towers = DataProcessor::tower_frame(world)?;
        let bells = || DataProcessor::bell_frame(world);

        let plot = match kind {
            PlotKind::Locations => None,
            PlotKind::NBells => {
                let values = DataProcessor::numeric_values(&towers, "Bells")?;
                let edges = arange(MIN_BELLS as f64, MAX_BELLS as f64 + 1.5, 1.0)
                    .into_iter()
                    .map(|e| e - 0.5)
                    .collect();
                Histogram::new(&values, edges).map(|hist| HistogramPlot {
                    hist,
                    x_range: (-0.5, MAX_BELLS as f64 + 0.5),
                    x_label: "Number of bells",
                    y_label: "Number of towers",
                    log_x: false,
                })
            }
            PlotKind::TenorWeight => {
                let values = DataProcessor::numeric_values(&towers, "Hundredweight")?;
                linear_plot(&values, 1.0, "Tenor weight (cwt)", "Number of towers")
            }
            PlotKind::Frequency => {
                let values: Vec<f64> = DataProcessor::numeric_values(&bells()?, "nominal")?
                    .into_iter()
                    .filter(|v| *v > 0.0)
                    .map(f64::log10)
                    .collect();
                let edges = logspace(2.0, 4.0, 100).into_iter().map(f64::log10).collect();
                Histogram::new(&values, edges).map(|hist| HistogramPlot {
                    hist,
                    x_range: (2.0, 4.0),
                    x_label: "Frequency of bell (Hz)",
                    y_label: "Number of bells",
                    log_x: true,
                })
            }
            PlotKind::Weight => {
                let values = DataProcessor::numeric_values(&bells()?, "cwt")?;
                linear_plot(&values, 0.25, "Bell weight (cwt)", "Number of bells")
            }
            PlotKind::Diameter => {
                let values = DataProcessor::numeric_values(&bells()?, "diameter")?;
                upper_limit(&values).and_then(|max| {
                    Histogram::new(&values, linspace(0.0, max, 100)).map(|hist| HistogramPlot {
                        hist,
                        x_range: (0.0, max),
                        x_label: "Diameter of bell (cm)",
                        y_label: "Number of bells",
                        log_x: false,
                    })
                })
            }
            PlotKind::Dated => {
                let values = DataProcessor::numeric_values(&bells()?, "dated")?;
                Histogram::new(&values, arange(1500.0, 2105.0, 10.0)).map(|hist| HistogramPlot {
                    hist,
                    x_range: (1500.0, 2100.0),
                    x_label: "Year of bell founding",
                    y_label: "Number of bells",
                    log_x: false,
                })
            }
        };

        Ok(plot.filter(|p| p.hist.total() > 0))
    }

    fn map_points(&self, world: &World) -> Vec<MapPoint> {
        let bounds = self.region.bounds();
        world
            .towers()
            .iter()
            .filter_map(|t| {
                let c = t.coordinates.as_ref().filter(|c| c.is_valid() && bounds.contains(c))?;
                Some(MapPoint {
                    x: c.x,
                    y: c.y,
                    n_bells: t.n_bells().clamp(MIN_BELLS, MAX_BELLS),
                })
            })
            .collect()
    }

    fn pixels(&self, size_in: (f64, f64)) -> (u32, u32) {
        let dpi = f64::from(self.settings.dpi.max(1));
        ((size_in.0 * dpi).round() as u32, (size_in.1 * dpi).round() as u32)
    }

    /// Size in pixels for a length in points.
    fn pt(&self, points: f64) -> f64 {
        points * f64::from(self.settings.dpi.max(1)) / 72.0
    }

    fn render(&self, path: &Path, figure: &Figure) -> Result<(), ChartError> {
        let size = self.pixels(figure.size_in());
        match self.format {
            ImageFormat::Png => {
                let root = BitMapBackend::new(path, size).into_drawing_area();
                self.draw(&root, figure)?;
                root.present().map_err(render_err)
            }
            ImageFormat::Svg => {
                let root = SVGBackend::new(path, size).into_drawing_area();
                self.draw(&root, figure)?;
                root.present().map_err(render_err)
            }
        }
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, figure: &Figure) -> Result<(), ChartError> {
        root.fill(&WHITE).map_err(render_err)?;
        match figure {
            Figure::Map(points) => self.draw_locations(root, points),
            Figure::Histogram(plot) => self.draw_histogram(root, plot),
        }
    }

    /// Towers as crosses on the region's Mercator extent, one legend entry per bell count.
    fn draw_locations<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        points: &[MapPoint],
    ) -> Result<(), ChartError> {
        let ((x1, x2), (y1, y2)) = self.region.bounds().projected();
        log::debug!("Map of {} towers, {} -> {}", points.len(), CRS_IN, CRS_OUT);
        let mut chart = ChartBuilder::on(root)
            .margin(self.pt(10.0) as u32)
            .caption(format!("Bell towers: {}", self.region), (FONT, self.pt(14.0)))
            .build_cartesian_2d(x1..x2, y1..y2)
            .map_err(render_err)?;

        let marker = self.pt(4.0).max(2.0) as i32;
        let stroke = self.pt(1.0).max(1.0) as u32;
        for n in MIN_BELLS..=MAX_BELLS {
            let colour = bell_colour(n);
            chart
                .draw_series(
                    points
                        .iter()
                        .filter(|p| p.n_bells == n)
                        .map(|p| Cross::new((p.x, p.y), marker, colour.mix(0.4).stroke_width(stroke))),
                )
                .map_err(render_err)?
                .label(format!("{n} bells"))
                .legend(move |(x, y)| Cross::new((x, y), marker, colour.stroke_width(stroke)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font((FONT, self.pt(8.0)))
            .draw()
            .map_err(render_err)?;
        Ok(())
    }

    fn draw_histogram<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        plot: &HistogramPlot,
    ) -> Result<(), ChartError> {
        let y_max = plot.hist.max_count().max(1) as f64 * 1.05;
        let mut chart = ChartBuilder::on(root)
            .margin(self.pt(8.0) as u32)
            .x_label_area_size(self.pt(28.0) as u32)
            .y_label_area_size(self.pt(36.0) as u32)
            .build_cartesian_2d(plot.x_range.0..plot.x_range.1, 0f64..y_max)
            .map_err(render_err)?;

        let power_of_ten = |v: &f64| format!("{:.0}", 10f64.powf(*v));
        {
            let mut mesh = chart.configure_mesh();
            mesh.disable_x_mesh()
                .x_desc(plot.x_label)
                .y_desc(plot.y_label)
                .label_style((FONT, self.pt(9.0)))
                .axis_desc_style((FONT, self.pt(10.0)));
            if plot.log_x {
                mesh.x_label_formatter(&power_of_ten);
            }
            mesh.draw().map_err(render_err)?;
        }

        chart
            .draw_series(
                plot.hist
                    .bars()
                    .filter(|&(_, _, count)| count > 0)
                    .map(|(left, right, count)| Rectangle::new([(left, 0.0), (right, count as f64)], BAR.filled())),
            )
            .map_err(render_err)?;
        Ok(())
    }
}

/// Histogram from 0 to `floor(max) + 1` in steps of `step`.
fn linear_plot(values: &[f64], step: f64, x_label: &'static str, y_label: &'static str) -> Option<HistogramPlot> {
    let max = upper_limit(values)?;
    let edges = arange(0.0, max + step / 2.0, step);
    Histogram::new(values, edges).map(|hist| HistogramPlot {
        hist,
        x_range: (0.0, max),
        x_label,
        y_label,
        log_x: false,
    })
}
