use crate::error::JobError;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Timelike, Utc};
use std::collections::BTreeSet;

/// A parsed 5-field `minute hour day month weekday` expression (scheduler), evaluated
/// entirely in UTC — the platform runs on UTC by policy, so there is no DST ambiguity to resolve.
#[derive(Debug, Clone)]
pub struct CronSchedule {
 minutes: BTreeSet<u32>,
 hours: BTreeSet<u32>,
 days_of_month: BTreeSet<u32>,
 months: BTreeSet<u32>,
 weekdays: BTreeSet<u32>,
}

/// Brute-force search ceiling: a schedule with no match inside a year is almost certainly
/// malformed (e.g. `31` for a day-of-month combined with `2` for month), not merely rare.
const SEARCH_WINDOW_MINUTES: i64 = 366 * 24 * 60;

impl CronSchedule {
 pub fn parse(expr: &str) -> Result<Self, JobError> {
 let fields: Vec<&str> = expr.split_whitespace().collect();
 if fields.len() != 5 {
 return Err(JobError::InvalidCronExpression {
 expr: expr.to_string(),
 detail: format!("expected 5 fields, got {}", fields.len()),
 });
 }

 Ok(Self {
 minutes: parse_field(expr, fields[0], 0, 59)?,
 hours: parse_field(expr, fields[1], 0, 23)?,
 days_of_month: parse_field(expr, fields[2], 1, 31)?,
 months: parse_field(expr, fields[3], 1, 12)?,
 weekdays: parse_field(expr, fields[4], 0, 6)?,
 })
 }

 /// Smallest matching instant strictly after `after`, searched minute-by-minute over the
 /// next year. `None` means the expression has no occurrence in that window.
 pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
 let start = after
 .with_second(0)
 .and_then(|t| t.with_nanosecond(0))
 .unwrap_or(after)
 + ChronoDuration::minutes(1);

 (0..SEARCH_WINDOW_MINUTES)
 .map(|offset| start + ChronoDuration::minutes(offset))
 .find(|candidate| self.matches(candidate))
 }

 fn matches(&self, instant: &DateTime<Utc>) -> bool {
 self.minutes.contains(&instant.minute())
 && self.hours.contains(&instant.hour())
 && self.days_of_month.contains(&instant.day())
 && self.months.contains(&instant.month())
 && self.weekdays.contains(&instant.weekday().num_days_from_sunday())
 }
}

fn parse_field(expr: &str, field: &str, min: u32, max: u32) -> Result<BTreeSet<u32>, JobError> {
 let invalid = |detail: String| JobError::InvalidCronExpression { expr: expr.to_string(), detail };

 let mut values = BTreeSet::new();
 for part in field.split(',') {
 if part == "*" {
 values.extend(min..=max);
 continue;
 }

 if let Some(step_spec) = part.strip_prefix("*/") {
 let step: u32 = step_spec.parse().map_err(|_| invalid(format!("bad step {part:?}")))?;
 if step == 0 {
 return Err(invalid(format!("step cannot be zero in {part:?}")));
 }
 values.extend((min..=max).step_by(step as usize));
 continue;
 }

 if let Some((low, high)) = part.split_once('-') {
 let low: u32 = low.parse().map_err(|_| invalid(format!("bad range {part:?}")))?;
 let high: u32 = high.parse().map_err(|_| invalid(format!("bad range {part:?}")))?;
 if low > high || low < min || high > max {
 return Err(invalid(format!("range {part:?} out of bounds [{min},{max}]")));
 }
 values.extend(low..=high);
 continue;
 }

 let value: u32 = part.parse().map_err(|_| invalid(format!("bad value {part:?}")))?;
 if value < min || value > max {
 return Err(invalid(format!("value {value} out of bounds [{min},{max}]")));
 }
 values.insert(value);
 }

 if values.is_empty() {
 return Err(invalid("field matched no values".to_string()));
 }

 Ok(values)
}

#[cfg(test)]
mod tests {
 use super::*;
 use chrono::TimeZone;

 #[test]
 fn every_minute_matches_the_very_next_minute() {
 let schedule = CronSchedule::parse("* * * * *").unwrap();
 let after = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 30).unwrap();
 let next = schedule.next_after(after).unwrap();
 assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 12, 1, 0).unwrap());
 }

 #[test]
 fn daily_at_midnight_crosses_a_month_boundary() {
 let schedule = CronSchedule::parse("0 0 1 * *").unwrap();
 let after = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
 let next = schedule.next_after(after).unwrap();
 assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
 }

 #[test]
 fn step_expression_every_fifteen_minutes() {
 let schedule = CronSchedule::parse("*/15 * * * *").unwrap();
 let after = Utc.with_ymd_and_hms(2026, 3, 1, 10, 16, 0).unwrap();
 let next = schedule.next_after(after).unwrap();
 assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 10, 30, 0).unwrap());
 }

 #[test]
 fn weekday_list_selects_only_named_days() {
 // Monday=1, Wednesday=3, Friday=5 at 09:00.
 let schedule = CronSchedule::parse("0 9 * * 1,3,5").unwrap();
 let sunday = Utc.with_ymd_and_hms(2026, 8, 2, 9, 0, 0).unwrap();
 let next = schedule.next_after(sunday).unwrap();
 assert_eq!(next.weekday().num_days_from_sunday(), 1);
 }

 #[test]
 fn a_malformed_expression_is_rejected() {
 assert!(CronSchedule::parse("60 * * * *").is_err());
 assert!(CronSchedule::parse("* * * *").is_err());
 }

 #[test]
 fn a_schedule_that_crosses_a_year_boundary_still_resolves() {
 let schedule = CronSchedule::parse("0 0 1 1 *").unwrap();
 let after = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
 let next = schedule.next_after(after).unwrap();
 assert_eq!(next, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
 }
}
