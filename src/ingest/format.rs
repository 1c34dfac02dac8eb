//! Median output formatting

/// Render a median with two decimals; an empty window renders as `NaN`
pub fn format_median(median: f64) -> String {
    format!("{median:.2}")
}
