use std::collections::BTreeMap;

use jiff::civil::Date;
use log::debug;
use thiserror::Error;

use crate::interval::{freq::Freq, interval::DateRange};

use super::association::{AssociationRecord, ExtendedRow, ExtendedSeries};

#[derive(Error, Debug, PartialEq)]
pub enum ExtendError {
    #[error("invalid date range, start date {start} is after end date {end}")]
    InvalidRange { start: Date, end: Date },
}

/// Fail if both bounds are given and the start is after the end.
pub fn check_range(start: Option<Date>, end: Option<Date>) -> Result<(), ExtendError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(ExtendError::InvalidRange { start, end }),
        _ => Ok(()),
    }
}

/// Turn a sparse table of annual associations into a continuous series.
///
/// For every key, each date of the output index gets the attributes of the
/// most recent record of that key reported on or before that date.  Dates
/// before the first record of a key get no row.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnualSeriesExtender {
    pub freq: Freq,
}

impl AnnualSeriesExtender {
    pub fn new(freq: Freq) -> Self {
        AnnualSeriesExtender { freq }
    }

    /// Extend the `records` over `[start, end]`.
    ///
    /// Records outside the bounds are ignored, so a source that could not
    /// push the date filter down gives the same result as one that did.
    /// Missing bounds default to the earliest and latest report dates.  When
    /// the same key is reported twice on the same date, the record that comes
    /// last in `records` wins.
    pub fn extend<K, A, I>(
        &self,
        records: I,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<ExtendedSeries<K, A>, ExtendError>
    where
        K: Ord + Clone,
        A: Clone,
        I: IntoIterator<Item = AssociationRecord<K, A>>,
    {
        let (lower, upper) = (start.unwrap_or(Date::MIN), end.unwrap_or(Date::MAX));
        let bounds = DateRange::new(lower, upper).ok_or(ExtendError::InvalidRange {
            start: lower,
            end: upper,
        })?;

        let mut groups: BTreeMap<K, BTreeMap<Date, A>> = BTreeMap::new();
        let mut first: Option<Date> = None;
        let mut last: Option<Date> = None;
        for record in records {
            let day = record.report_date;
            if !bounds.contains(day) {
                continue;
            }
            first = Some(first.map_or(day, |d| d.min(day)));
            last = Some(last.map_or(day, |d| d.max(day)));
            groups.entry(record.key).or_default().insert(day, record.attrs);
        }

        let mut out = ExtendedSeries::new();
        let (lo, hi) = match (start.or(first), end.or(last)) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Ok(out),
        };
        let index = self.freq.dates(lo, hi);
        debug!(
            "extending {} keys over {} {} dates from {} to {}",
            groups.len(),
            index.len(),
            self.freq,
            lo,
            hi
        );

        for (key, observations) in groups {
            for &day in &index {
                if let Some((_, attrs)) = observations.range(..=day).next_back() {
                    out.push(ExtendedRow {
                        key: key.clone(),
                        date: day,
                        attrs: attrs.clone(),
                    });
                }
            }
        }
        Ok(out)
    }
}
