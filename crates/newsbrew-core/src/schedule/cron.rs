//! Five-field cron expression evaluation.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// A validated five-field cron expression (minute hour day month weekday).
///
/// Expressions use standard Unix semantics, including weekday numbering
/// (0 or 7 = Sunday, 1 = Monday). The underlying evaluator wants a
/// seconds field and numbers weekdays differently, so the expression is
/// normalized once at construction: a `0` seconds field is prepended and
/// numeric weekdays are rewritten to day names. After that, `next_after`
/// is infallible to evaluate.
#[derive(Debug, Clone)]
pub struct CronExpression {
    raw: String,
    schedule: cron::Schedule,
}

impl CronExpression {
    /// Parse and validate a five-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCron`] if the expression does not have
    /// exactly five fields or any field is malformed.
    pub fn parse(expression: &str) -> Result<Self> {
        let raw = expression.trim().to_string();
        let fields: Vec<&str> = raw.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = fields.as_slice() else {
            return Err(Error::InvalidCron(format!(
                "expected 5 fields (minute hour day month weekday), got {raw:?}"
            )));
        };

        let weekday = normalize_weekday_field(weekday)
            .ok_or_else(|| Error::InvalidCron(format!("{raw:?}: bad weekday field")))?;
        let normalized = format!("0 {minute} {hour} {day} {month} {weekday}");
        let schedule = cron::Schedule::from_str(&normalized)
            .map_err(|e| Error::InvalidCron(format!("{raw:?}: {e}")))?;

        Ok(Self { raw, schedule })
    }

    /// The next occurrence strictly after the given time.
    ///
    /// Deterministic: equal inputs always produce equal outputs. Returns
    /// `None` only for expressions with no future occurrence.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// The original five-field expression text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for CronExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for CronExpression {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CronExpression {}

impl FromStr for CronExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Rewrite Unix weekday numbers (0-7, both 0 and 7 = Sunday) to day
/// names, which the evaluator reads unambiguously. Lists, ranges, and
/// step suffixes keep their structure; non-numeric tokens pass through.
fn normalize_weekday_field(field: &str) -> Option<String> {
    let parts: Vec<String> = field
        .split(',')
        .map(normalize_weekday_part)
        .collect::<Option<_>>()?;
    Some(parts.join(","))
}

fn normalize_weekday_part(part: &str) -> Option<String> {
    let (range, step) = match part.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (part, None),
    };

    let normalized_range = match range.split_once('-') {
        Some((start, end)) => format!(
            "{}-{}",
            normalize_weekday_token(start)?,
            normalize_weekday_token(end)?
        ),
        None => normalize_weekday_token(range)?,
    };

    Some(step.map_or_else(
        || normalized_range.clone(),
        |s| format!("{normalized_range}/{s}"),
    ))
}

fn normalize_weekday_token(token: &str) -> Option<String> {
    if let Ok(n) = token.parse::<u8>() {
        let index = usize::from(n % 7);
        return (n <= 7).then(|| DAY_NAMES[index].to_string());
    }
    Some(token.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_accepts_five_fields() {
        let cron = CronExpression::parse("0 8 * * 1-5").unwrap();
        assert_eq!(cron.as_str(), "0 8 * * 1-5");
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert!(CronExpression::parse("0 8 * *").is_err());
        assert!(CronExpression::parse("0 0 8 * * 1").is_err());
        assert!(CronExpression::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_fields() {
        assert!(CronExpression::parse("61 8 * * *").is_err());
        assert!(CronExpression::parse("0 8 * * 9").is_err());
        assert!(CronExpression::parse("not a cron at all *").is_err());
    }

    #[test]
    fn test_next_after_is_strictly_later() {
        let cron = CronExpression::parse("0 8 * * *").unwrap();
        let at_eight = Utc.with_ymd_and_hms(2026, 8, 3, 8, 0, 0).unwrap();

        let next = cron.next_after(at_eight).unwrap();
        assert!(next > at_eight);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 4, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_next_after_is_deterministic() {
        let cron = CronExpression::parse("30 6 * * 1").unwrap();
        let t = Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap();

        assert_eq!(cron.next_after(t), cron.next_after(t));
        // 2026-08-05 is a Wednesday; weekday 1 is Monday, so the next
        // firing is Monday the 10th.
        assert_eq!(
            cron.next_after(t).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 10, 6, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_sunday_is_zero_and_seven() {
        let zero = CronExpression::parse("0 10 * * 0").unwrap();
        let seven = CronExpression::parse("0 10 * * 7").unwrap();
        let t = Utc.with_ymd_and_hms(2026, 8, 5, 0, 0, 0).unwrap();

        let next = zero.next_after(t).unwrap();
        assert_eq!(next, seven.next_after(t).unwrap());
        // Next Sunday after Wednesday 2026-08-05 is the 9th.
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 9, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_weekday_lists_and_ranges() {
        let cron = CronExpression::parse("0 8 * * 1,3").unwrap();
        let tuesday = Utc.with_ymd_and_hms(2026, 8, 4, 9, 0, 0).unwrap();
        // After a Tuesday morning, the next of Monday/Wednesday is
        // Wednesday 08:00.
        assert_eq!(
            cron.next_after(tuesday).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 5, 8, 0, 0).unwrap()
        );

        let weekdays = CronExpression::parse("0 8 * * 1-5").unwrap();
        let friday = Utc.with_ymd_and_hms(2026, 8, 7, 9, 0, 0).unwrap();
        // After Friday morning the next weekday firing is Monday.
        assert_eq!(
            weekdays.next_after(friday).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 10, 8, 0, 0).unwrap()
        );
    }
}
