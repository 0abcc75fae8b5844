//! In-memory filter pipeline over catalog candidates.
//!
//! Every criterion is an independent predicate and the pipeline keeps events
//! satisfying all of them. Empty criteria values impose no constraint, and a
//! criterion matching nothing yields an empty list rather than an error.

use chrono::{DateTime, Datelike, Days, Months, NaiveTime, TimeDelta, Utc};
use evdisc_core::{DateBucket, Event, FilterCriteria, FormatSelector};

/// Applies `criteria` to `candidates`, preserving input order.
#[must_use]
pub fn filter(candidates: Vec<Event>, criteria: &FilterCriteria, now: DateTime<Utc>) -> Vec<Event> {
    let predicate = Predicate::new(criteria, now);
    candidates
        .into_iter()
        .filter(|event| predicate.matches(event))
        .collect()
}

/// Inclusive `[start, end]` window for a date bucket, computed in UTC with
/// weeks starting on Sunday.
///
/// Returns `None` for [`DateBucket::All`], which imposes no constraint.
#[must_use]
pub fn date_range(bucket: DateBucket, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let today = now.date_naive();
    let (first, next) = match bucket {
        DateBucket::All => return None,
        DateBucket::Today => (today, today.checked_add_days(Days::new(1))?),
        DateBucket::Week => {
            let since_sunday = u64::from(today.weekday().num_days_from_sunday());
            let first = today.checked_sub_days(Days::new(since_sunday))?;
            (first, first.checked_add_days(Days::new(7))?)
        }
        DateBucket::Month => {
            let first = today.checked_sub_days(Days::new(u64::from(today.day0())))?;
            (first, first.checked_add_months(Months::new(1))?)
        }
    };

    let start = first.and_time(NaiveTime::MIN).and_utc();
    let end = next.and_time(NaiveTime::MIN).and_utc() - TimeDelta::nanoseconds(1);
    Some((start, end))
}

/// Lower-cased, pre-computed criteria so each event check is allocation-light.
struct Predicate {
    format: Option<String>,
    location: Option<String>,
    city: Option<String>,
    country: Option<String>,
    search: Option<String>,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Predicate {
    fn new(criteria: &FilterCriteria, now: DateTime<Utc>) -> Self {
        let location = needle(&criteria.location).filter(|l| l != "all");
        Self {
            format: match &criteria.format {
                FormatSelector::All => None,
                FormatSelector::Matching(f) => needle(f),
            },
            location,
            city: needle(&criteria.city),
            country: needle(&criteria.country),
            search: needle(&criteria.search),
            window: date_range(criteria.date, now),
        }
    }

    fn matches(&self, event: &Event) -> bool {
        if let Some(format) = &self.format {
            if !event.format.as_str().contains(format.as_str()) {
                return false;
            }
        }

        if !contains(Some(&event.location), self.location.as_deref())
            || !contains(event.city.as_ref(), self.city.as_deref())
            || !contains(event.country.as_ref(), self.country.as_deref())
        {
            return false;
        }

        if let Some(term) = self.search.as_deref() {
            let hit = [&event.title, &event.description, &event.location]
                .into_iter()
                .any(|field| field.to_lowercase().contains(term));
            if !hit {
                return false;
            }
        }

        match self.window {
            Some((start, end)) => start <= event.starts_at && event.starts_at <= end,
            None => true,
        }
    }
}

fn needle(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Case-insensitive substring check; no needle means no constraint, and a
/// missing field never satisfies a present needle.
fn contains(field: Option<&String>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => field.is_some_and(|value| value.to_lowercase().contains(needle)),
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
