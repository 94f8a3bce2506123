//! Date-indexed price series

use crate::error::{AnalysisError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// Single dated price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Observation date
    pub date: NaiveDate,
    /// Price in USD per barrel
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Resampling period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month,
    Year,
}

impl Period {
    fn bucket(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Month => date.with_day(1).unwrap_or(date),
            Period::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }
}

/// Chronologically ordered price series with no missing values.
///
/// Dates are strictly increasing and every price is finite; the series is
/// never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build from points that already satisfy the series invariants.
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(AnalysisError::insufficient("price series is empty"));
        }
        if let Some(p) = points.iter().find(|p| !p.price.is_finite()) {
            return Err(AnalysisError::invalid(format!(
                "non-finite price {} on {}",
                p.price, p.date
            )));
        }
        if let Some(w) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(AnalysisError::invalid(format!(
                "dates are not strictly increasing: {} then {}",
                w[0].date, w[1].date
            )));
        }
        Ok(Self { points })
    }

    /// Build from raw observations in any order, with gaps.
    ///
    /// Sorts by date (last row wins on duplicates), linearly interpolates
    /// interior gaps, carries the last observation forward over trailing
    /// gaps and drops leading rows that have no earlier observation.
    pub fn from_observations(mut raw: Vec<(NaiveDate, Option<f64>)>) -> Result<Self> {
        raw.sort_by_key(|(date, _)| *date);

        let mut deduped: Vec<(NaiveDate, Option<f64>)> = Vec::with_capacity(raw.len());
        for (date, price) in raw {
            match deduped.last_mut() {
                Some(last) if last.0 == date => last.1 = price,
                _ => deduped.push((date, price)),
            }
        }

        let values: Vec<Option<f64>> = deduped
            .iter()
            .map(|(_, p)| p.filter(|v| v.is_finite()))
            .collect();
        let filled = interpolate_linear(&values);

        let leading = filled.iter().take_while(|v| v.is_none()).count();
        if leading == filled.len() {
            return Err(AnalysisError::insufficient("no observed prices"));
        }
        if leading > 0 {
            tracing::warn!(
                "Dropping {} leading rows without a price (nothing to interpolate from)",
                leading
            );
        }

        let points = deduped
            .iter()
            .zip(filled)
            .skip(leading)
            .filter_map(|((date, _), price)| price.map(|p| PricePoint::new(*date, p)))
            .collect();

        Self::new(points)
    }

    /// Build from parallel date and price vectors.
    pub fn from_parts(dates: Vec<NaiveDate>, prices: Vec<f64>) -> Result<Self> {
        if dates.len() != prices.len() {
            return Err(AnalysisError::invalid(format!(
                "{} dates but {} prices",
                dates.len(),
                prices.len()
            )));
        }
        Self::new(
            dates
                .into_iter()
                .zip(prices)
                .map(|(d, p)| PricePoint::new(d, p))
                .collect(),
        )
    }

    /// Get number of observations
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&PricePoint> {
        self.points.get(index)
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }

    /// Get prices as vector
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Get dates as vector
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Sub-series over an index range.
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start >= range.end || range.end > self.len() {
            return Err(AnalysisError::invalid(format!(
                "range {:?} out of bounds for series of length {}",
                range,
                self.len()
            )));
        }
        Ok(Self {
            points: self.points[range].to_vec(),
        })
    }

    /// Log returns `ln(p_t / p_{t-1})`, one shorter than the series.
    pub fn log_returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| (w[1].price / w[0].price).ln())
            .collect()
    }

    /// Mean price per period, dated at the start of the period.
    pub fn resample(&self, period: Period) -> Self {
        let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for p in &self.points {
            let entry = buckets.entry(period.bucket(p.date)).or_insert((0.0, 0));
            entry.0 += p.price;
            entry.1 += 1;
        }
        Self {
            points: buckets
                .into_iter()
                .map(|(date, (sum, count))| PricePoint::new(date, sum / count as f64))
                .collect(),
        }
    }

    /// `(year, mean price)` pairs for joining with annual indicator tables.
    pub fn annual(&self) -> Vec<(i32, f64)> {
        self.resample(Period::Year)
            .points
            .iter()
            .map(|p| (p.date.year(), p.price))
            .collect()
    }
}

/// Linear interpolation over positions.
///
/// Interior gaps are filled on the straight line between their neighbours,
/// trailing gaps take the last observed value and leading gaps stay empty.
pub fn interpolate_linear(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    let mut last_seen: Option<usize> = None;

    for i in 0..values.len() {
        if let Some(current) = values[i] {
            if let Some(prev) = last_seen {
                let gap = i - prev;
                if gap > 1 {
                    let start = values[prev].unwrap_or(current);
                    let step = (current - start) / gap as f64;
                    for (k, slot) in out.iter_mut().enumerate().take(i).skip(prev + 1) {
                        *slot = Some(start + step * (k - prev) as f64);
                    }
                }
            }
            last_seen = Some(i);
        }
    }

    if let Some(prev) = last_seen {
        let fill = values[prev];
        for slot in out.iter_mut().skip(prev + 1) {
            *slot = fill;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_interpolate_linear() {
        let filled = interpolate_linear(&[None, Some(1.0), None, None, Some(4.0), None]);
        assert_eq!(
            filled,
            vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(4.0)]
        );
    }

    #[test]
    fn test_from_observations_sorts_and_fills() {
        let raw = vec![
            (day(2020, 1, 3), Some(30.0)),
            (day(2020, 1, 1), None),
            (day(2020, 1, 2), Some(10.0)),
            (day(2020, 1, 5), Some(50.0)),
            (day(2020, 1, 4), None),
            (day(2020, 1, 3), Some(20.0)),
        ];
        let series = PriceSeries::from_observations(raw).unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.first().date, day(2020, 1, 2));
        assert_eq!(series.prices(), vec![10.0, 20.0, 35.0, 50.0]);
    }

    #[test]
    fn test_rejects_unordered_points() {
        let points = vec![
            PricePoint::new(day(2020, 1, 2), 1.0),
            PricePoint::new(day(2020, 1, 2), 2.0),
        ];
        assert!(PriceSeries::new(points).is_err());
        assert!(PriceSeries::new(vec![]).is_err());
    }

    #[test]
    fn test_resample_and_annual() {
        let series = PriceSeries::from_parts(
            vec![day(2019, 12, 30), day(2020, 1, 2), day(2020, 1, 3), day(2020, 2, 1)],
            vec![10.0, 20.0, 40.0, 60.0],
        )
        .unwrap();

        let monthly = series.resample(Period::Month);
        assert_eq!(monthly.dates(), vec![day(2019, 12, 1), day(2020, 1, 1), day(2020, 2, 1)]);
        assert_eq!(monthly.prices(), vec![10.0, 30.0, 60.0]);

        assert_eq!(series.annual(), vec![(2019, 10.0), (2020, 40.0)]);
    }

    #[test]
    fn test_log_returns() {
        let series = PriceSeries::from_parts(
            vec![day(2020, 1, 1), day(2020, 1, 2)],
            vec![10.0, 20.0],
        )
        .unwrap();
        let r = series.log_returns();
        assert_eq!(r.len(), 1);
        assert!((r[0] - 2f64.ln()).abs() < 1e-12);
    }
}
