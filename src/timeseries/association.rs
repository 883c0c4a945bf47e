use std::slice::Iter;
use std::vec::IntoIter;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// One row of an association table: a key that links two entities, the date
/// of the report it was taken from, and the attributes reported for it.
///
/// The same key can appear on several report dates, possibly with different
/// attributes.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AssociationRecord<K, A> {
    pub key: K,
    pub report_date: Date,
    pub attrs: A,
}

impl<K, A> AssociationRecord<K, A> {
    pub fn new(key: K, report_date: Date, attrs: A) -> AssociationRecord<K, A> {
        AssociationRecord {
            key,
            report_date,
            attrs,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExtendedRow<K, A> {
    pub key: K,
    pub date: Date,
    pub attrs: A,
}

/// Output of the extension, sorted by key and then by date.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtendedSeries<K, A>(Vec<ExtendedRow<K, A>>);

impl<K: Ord, A> ExtendedSeries<K, A> {
    pub fn new() -> ExtendedSeries<K, A> {
        ExtendedSeries(Vec::new())
    }

    /// Only push at the end, keeping the (key, date) order.
    pub(crate) fn push(&mut self, row: ExtendedRow<K, A>) {
        if let Some(last) = self.0.last() {
            if (&row.key, row.date) <= (&last.key, last.date) {
                panic!("You can only push at the end of an extended series!");
            }
        }
        self.0.push(row);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, ExtendedRow<K, A>> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&ExtendedRow<K, A>> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&ExtendedRow<K, A>> {
        self.0.last()
    }

    /// Distinct keys, in order.
    pub fn keys(&self) -> Vec<&K> {
        let mut out: Vec<&K> = Vec::new();
        for row in &self.0 {
            if out.last() != Some(&&row.key) {
                out.push(&row.key);
            }
        }
        out
    }

    /// All the rows for one key, in date order.
    pub fn rows_for(&self, key: &K) -> &[ExtendedRow<K, A>] {
        let lo = self.0.partition_point(|r| &r.key < key);
        let hi = self.0.partition_point(|r| &r.key <= key);
        &self.0[lo..hi]
    }

    /// The attributes of a key on a given date of the index, if there is a row.
    pub fn get(&self, key: &K, date: Date) -> Option<&A> {
        let rows = self.rows_for(key);
        rows.binary_search_by(|r| r.date.cmp(&date))
            .ok()
            .map(|i| &rows[i].attrs)
    }
}

impl<K: Ord, A> Default for ExtendedSeries<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, A> IntoIterator for ExtendedSeries<K, A> {
    type Item = ExtendedRow<K, A>;
    type IntoIter = IntoIter<ExtendedRow<K, A>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
