//! CSV export of a signal series for downstream backtesting.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use pitsent_core::SentimentSignal;

use crate::error::SentimentError;

const HEADER: [&str; 8] = [
    "asof_date",
    "ticker",
    "signal_name",
    "value",
    "confidence",
    "posts_analyzed",
    "calculation_method",
    "search_terms",
];

/// Write `signals` as CSV to `writer`. A withheld value is an empty cell.
///
/// Returns the number of data rows written.
///
/// # Errors
///
/// Returns [`SentimentError::Export`] if serialization or the write fails.
pub fn write_signals_csv<W: Write>(
    writer: W,
    signals: &[SentimentSignal],
) -> Result<usize, SentimentError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;

    for s in signals {
        wtr.write_record([
            s.as_of_date.format("%Y-%m-%d").to_string().as_str(),
            s.ticker.as_str(),
            s.signal_name.as_str(),
            s.value.map(|v| format!("{v:.6}")).unwrap_or_default().as_str(),
            format!("{:.6}", s.confidence).as_str(),
            s.posts_analyzed.to_string().as_str(),
            s.calculation_method.as_str(),
            s.search_terms.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(signals.len())
}

/// Create (or truncate) `path` and write the series to it.
///
/// # Errors
///
/// Returns [`SentimentError::Export`] if the file cannot be created or written.
pub fn export_signals_csv(
    path: &Path,
    signals: &[SentimentSignal],
) -> Result<usize, SentimentError> {
    let file = File::create(path)
        .map_err(|e| SentimentError::Export(format!("{}: {e}", path.display())))?;
    write_signals_csv(file, signals)
}
