//! The scoring window: a run of calendar weeks starting on a Sunday.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

pub const SECONDS_IN_WEEK: i64 = 60 * 60 * 24 * 7;
pub const DEFAULT_LABEL_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Start of week 0 (inclusive).
    pub since: DateTime<Utc>,
    pub num_weeks: usize,
    label_format: String,
}

impl Window {
    pub fn new(since: DateTime<Utc>, num_weeks: usize) -> Self {
        Self {
            since,
            num_weeks,
            label_format: DEFAULT_LABEL_FORMAT.to_string(),
        }
    }

    /// Returns the window covering the last `num_weeks` weeks before `now`, with its
    /// start moved forward to the next Sunday. The time of day is preserved.
    ///
    /// A week count too large to subtract from `now` starts the window at the earliest
    /// representable time.
    pub fn ending_at(now: DateTime<Utc>, num_weeks: usize) -> Self {
        let mut since = i64::try_from(num_weeks)
            .ok()
            .and_then(Duration::try_weeks)
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        while since.weekday() != Weekday::Sun {
            since += Duration::days(1);
        }
        Self::new(since, num_weeks)
    }

    pub fn with_label_format(mut self, format: impl Into<String>) -> Self {
        self.label_format = format.into();
        self
    }

    /// Floored week offset of `timestamp` from the window start. Negative for
    /// timestamps before `since`.
    pub fn week_of(&self, timestamp: DateTime<Utc>) -> i64 {
        (timestamp - self.since)
            .num_seconds()
            .div_euclid(SECONDS_IN_WEEK)
    }

    /// Bucket index of `timestamp`, or `None` when it lands outside the window.
    pub fn bucket_of(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        self.bucket_index(self.week_of(timestamp))
    }

    pub fn bucket_index(&self, week: i64) -> Option<usize> {
        usize::try_from(week).ok().filter(|&w| w < self.num_weeks)
    }

    /// One label per bucket, formatted from the start of each week.
    pub fn labels(&self) -> Vec<String> {
        (0..self.num_weeks)
            .map(|week| {
                let start = self.since + Duration::weeks(week as i64);
                format_label(start, &self.label_format)
            })
            .collect()
    }
}

fn format_label(date: DateTime<Utc>, label_format: &str) -> String {
    use std::fmt::Write;

    let mut label = String::new();
    if write!(label, "{}", date.format(label_format)).is_err() {
        tracing::warn!(label_format, "Invalid week label format, using {}", DEFAULT_LABEL_FORMAT);
        return date.format(DEFAULT_LABEL_FORMAT).to_string();
    }
    label
}

/// Parses the `weeks` query parameter, falling back to `default` when it is
/// missing, unparseable, zero or above `max`.
pub fn parse_weeks(raw: Option<&str>, default: usize, max: usize) -> usize {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<usize>() {
        Ok(weeks) if weeks > 0 && weeks <= max => weeks,
        Ok(weeks) => {
            tracing::warn!(
                weeks,
                "weeks parameter must be between 1 and {}, using default of {}",
                max,
                default
            );
            default
        }
        Err(e) => {
            tracing::warn!(raw, "failed to parse weeks parameter, using default of {}: {}", default, e);
            default
        }
    }
}
