use std::error::Error;

use jiff::civil::Date;
use log::info;

use crate::timeseries::{
    association::{AssociationRecord, ExtendedSeries},
    extend::{check_range, AnnualSeriesExtender},
};

/// A read-only table of association records.
pub trait SourceQuery {
    type Key;
    type Attrs;

    /// Get the records reported between `start` and `end` (inclusive).
    /// Implementations should push the bounds down to storage when they can,
    /// but are allowed to return rows outside of them.
    fn fetch(
        &self,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Vec<AssociationRecord<Self::Key, Self::Attrs>>, Box<dyn Error>>;
}

/// Records kept in memory.  Ignores the bounds on fetch.
#[derive(Debug, Clone, Default)]
pub struct VecSource<K, A>(pub Vec<AssociationRecord<K, A>>);

impl<K: Clone, A: Clone> SourceQuery for VecSource<K, A> {
    type Key = K;
    type Attrs = A;

    fn fetch(
        &self,
        _start: Option<Date>,
        _end: Option<Date>,
    ) -> Result<Vec<AssociationRecord<K, A>>, Box<dyn Error>> {
        Ok(self.0.clone())
    }
}

/// Fetch the records from the source and extend them over `[start, end]`.
/// An invalid range fails before the source is queried.
pub fn extend_source<S>(
    source: &S,
    extender: &AnnualSeriesExtender,
    start: Option<Date>,
    end: Option<Date>,
) -> Result<ExtendedSeries<S::Key, S::Attrs>, Box<dyn Error>>
where
    S: SourceQuery,
    S::Key: Ord + Clone,
    S::Attrs: Clone,
{
    check_range(start, end)?;
    let records = source.fetch(start, end)?;
    info!("fetched {} association records", records.len());
    let out = extender.extend(records, start, end)?;
    info!("extended to {} rows", out.len());
    Ok(out)
}
