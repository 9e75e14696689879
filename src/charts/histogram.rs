//! Histogram binning with the same edge rules as `numpy.histogram`.

/// Counts per bin; `edges.len() == counts.len() + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `edges`.
    ///
    /// Bins are half-open `[e[i], e[i+1])` except the last, which also holds
    /// its right edge. NaN and out-of-range values are ignored. Returns `None`
    /// when fewer than two edges are given.
    pub fn new(values: &[f64], edges: Vec<f64>) -> Option<Self> {
        if edges.len() < 2 {
            return None;
        }
        let n_bins = edges.len() - 1;
        let first = edges[0];
        let last = edges[n_bins];
        let mut counts = vec![0usize; n_bins];

        for &v in values {
            if v.is_nan() || v < first || v > last {
                continue;
            }
            let bin = if v == last {
                n_bins - 1
            } else {
                edges.partition_point(|&e| e <= v) - 1
            };
            counts[bin] += 1;
        }

        Some(Self { edges, counts })
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `(left, right, count)` per bin.
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(w, &c)| (w[0], w[1], c))
    }

    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }
}

/// Evenly spaced values in `[start, stop)`.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step == 0.0 || !((stop - start) / step).is_finite() {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// `num` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut out: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
            out[num - 1] = stop;
            out
        }
    }
}

/// `num` values spaced evenly on a log10 scale from `10^start` to `10^stop`.
pub fn logspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    linspace(start, stop, num)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect()
}

/// `floor(max) + 1` over the finite values, the upper limit of the data-driven axes.
pub fn upper_limit(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::max)
        .map(|max| max.floor() + 1.0)
}
