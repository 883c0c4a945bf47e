use jiff::{civil::Date, ToSpan};

pub trait DateExt: Sized {
    /// All the days between self and end, inclusive of end.
    fn up_to(&self, end: Self) -> Vec<Self>;
}

impl DateExt for Date {
    fn up_to(&self, end: Self) -> Vec<Self> {
        let mut dates = Vec::new();
        let mut current = *self;
        while current <= end {
            dates.push(current);
            current = match current.checked_add(1.days()) {
                Ok(next) => next,
                Err(_) => break,
            };
        }
        dates
    }
}

/// A closed range of calendar dates, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    /// Return `None` if the end is before the start.
    pub fn new(start: Date, end: Date) -> Option<Self> {
        if end < start {
            return None;
        }
        Some(DateRange { start, end })
    }

    /// The calendar years `[first, last]`, from Jan 1 to Dec 31.
    pub fn with_years(first: i16, last: i16) -> Option<Self> {
        let start = Date::new(first, 1, 1).ok()?;
        let end = Date::new(last, 12, 31).ok()?;
        DateRange::new(start, end)
    }

    pub fn contains(&self, day: Date) -> bool {
        day >= self.start && day <= self.end
    }
}
