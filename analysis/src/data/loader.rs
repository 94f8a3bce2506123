//! CSV loading for dated price observations

use crate::data::PriceSeries;
use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Date layouts found in the public Brent price file and its re-exports.
const DATE_FORMATS: [&str; 5] = ["%d-%b-%y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y"];

/// Parse a date in any of the supported layouts
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim().trim_matches('"');
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parse a price cell; blanks and NaN markers are missing.
pub fn parse_price(raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "." || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.replace(',', "")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| AnalysisError::Parse(format!("invalid price {:?}", raw)))
}

/// Load a `Date,Price` CSV file into a clean series
pub fn load_prices<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
    let path = path.as_ref();
    info!("Loading and preprocessing data from {}", path.display());
    let file = File::open(path)?;
    let series = read_prices(file)?;
    info!(
        "Data loaded and missing values interpolated: {} observations from {} to {}",
        series.len(),
        series.first().date,
        series.last().date
    );
    Ok(series)
}

/// Read `Date,Price` CSV content from any reader
pub fn read_prices<R: Read>(reader: R) -> Result<PriceSeries> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| AnalysisError::Parse(format!("missing {:?} column", name)))
    };
    let date_col = column("date")?;
    let price_col = column("price")?;

    let mut raw = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = row + 2;
        let date_cell = record.get(date_col).unwrap_or("");
        let date = parse_date(date_cell).ok_or_else(|| {
            AnalysisError::Parse(format!("line {}: unrecognised date {:?}", line, date_cell))
        })?;
        let price = parse_price(record.get(price_col).unwrap_or(""))
            .map_err(|e| AnalysisError::Parse(format!("line {}: {}", line, e)))?;
        raw.push((date, price));
    }

    PriceSeries::from_observations(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1987, 5, 20).unwrap();
        assert_eq!(parse_date("20-May-87"), Some(expected));
        assert_eq!(parse_date("May 20, 1987"), Some(expected));
        assert_eq!(parse_date("1987-05-20"), Some(expected));
        assert_eq!(parse_date("05/20/1987"), Some(expected));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("18.63").unwrap(), Some(18.63));
        assert_eq!(parse_price("").unwrap(), None);
        assert_eq!(parse_price("NaN").unwrap(), None);
        assert!(parse_price("abc").is_err());
    }

    #[test]
    fn test_read_prices_mixed_formats() {
        let csv = "Date,Price\n\
                   Apr 22, 2020,9.12\n\
                   20-May-87,18.63\n\
                   21-May-87,\n\
                   22-May-87,18.45\n";
        // the comma inside "Apr 22, 2020" splits the cell unless quoted
        let csv = csv.replace("Apr 22, 2020", "\"Apr 22, 2020\"");
        let series = read_prices(csv.as_bytes()).unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.first().date, NaiveDate::from_ymd_opt(1987, 5, 20).unwrap());
        assert!((series.prices()[1] - 18.54).abs() < 1e-9);
        assert_eq!(series.last().price, 9.12);
    }

    #[test]
    fn test_read_prices_reports_bad_line() {
        let csv = "Date,Price\n20-May-87,18.63\nnot-a-date,1.0\n";
        let err = read_prices(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_read_prices_requires_columns() {
        let csv = "Day,Close\n20-May-87,18.63\n";
        assert!(read_prices(csv.as_bytes()).is_err());
    }
}
