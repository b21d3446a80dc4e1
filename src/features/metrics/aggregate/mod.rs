mod stats;

use crate::metrics::Metric;
use crate::probe::Sample;

/// Computes the statistics of one window. Pure and total: an empty window
/// produces [`Metric::empty`] with `availability == None`.
pub fn aggregate(window: &[Sample]) -> Metric {
    let (average, max) = stats::mean_and_max(window);
    Metric {
        samples: window.len(),
        availability: stats::availability(window),
        average,
        max,
        response_percentiles: stats::response_percentiles(window),
        status_code_counts: stats::count_codes(window),
        error_counts: stats::count_errors(window),
    }
}

#[cfg(test)]
mod tests;
