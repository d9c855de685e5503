//! Cron-driven triggering
//!
//! Expressions have 5 fields (minute first) or 6 fields (second first).
//! A 5-field expression fires at second 0 of each matching minute. Anything
//! else is rejected when the schedule is created, never at the first trigger.
//!
//! Day-of-week uses crontab numbering: 0 and 7 are Sunday, 1 is Monday.
//! Day names (`Mon`, `Mon-Fri`) are passed through unchanged.
//!
//! Matching instants are computed in local time.

use crate::error::{Error, Result};
use crate::task::BackgroundTask;
use chrono::Local;
use cron::Schedule;
use std::collections::BTreeSet;
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Parse a 5- or 6-field cron expression
pub fn parse(expression: &str) -> Result<Schedule> {
    let mut fields: Vec<String> = expression.split_whitespace().map(str::to_string).collect();

    match fields.len() {
        5 => fields.insert(0, "0".to_string()),
        6 => {}
        n => {
            return Err(Error::invalid_schedule(
                expression,
                format!("expected 5 or 6 fields, found {n}"),
            ));
        }
    }

    if let Some(day_of_week) = fields.last_mut() {
        *day_of_week = day_of_week_field(expression, day_of_week)?;
    }

    Schedule::from_str(&fields.join(" "))
        .map_err(|e| Error::invalid_schedule(expression, e.to_string()))
}

/// Rewrite a crontab day-of-week field (0/7 = Sunday) into the parser's
/// numbering (1 = Sunday)
///
/// Numeric ranges and steps are expanded into an explicit list so that
/// `5-7` (Friday to Sunday) does not turn into a wrapping range.
fn day_of_week_field(expression: &str, field: &str) -> Result<String> {
    let invalid = |reason: String| Error::invalid_schedule(expression, reason);

    let mut verbatim = Vec::new();
    let mut days = BTreeSet::new();

    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .ok()
                    .filter(|step| *step > 0)
                    .ok_or_else(|| invalid(format!("invalid day-of-week step in '{item}'")))?;
                (range, Some(step))
            }
            None => (item, None),
        };

        if range.chars().any(|c| c.is_ascii_alphabetic()) {
            verbatim.push(item.to_string());
            continue;
        }

        let (first, last) = match (range, range.split_once('-')) {
            ("*" | "?", _) if step.is_none() => {
                verbatim.push(item.to_string());
                continue;
            }
            ("*" | "?", _) => (Some(0), Some(6)),
            (_, Some((first, last))) => (day_number(first), day_number(last)),
            (_, None) => {
                let day = day_number(range);
                let last = if step.is_some() { day.map(|day| day.max(6)) } else { day };
                (day, last)
            }
        };

        let (Some(first), Some(last)) = (first, last) else {
            return Err(invalid(format!("invalid day of week '{item}' (expected 0-7)")));
        };

        if first > last {
            return Err(invalid(format!("day-of-week range '{item}' is reversed")));
        }

        let step = step.unwrap_or(1) as usize;
        days.extend((first..=last).step_by(step).map(|day| day % 7 + 1));
    }

    verbatim.extend(days.into_iter().map(|day| day.to_string()));
    Ok(verbatim.join(","))
}

/// A crontab day number, 0 through 7
fn day_number(text: &str) -> Option<u32> {
    text.parse().ok().filter(|day| *day <= 7)
}

/// Whether `expression` would be accepted by [`spawn`]
pub fn is_valid(expression: &str) -> bool {
    parse(expression).is_ok()
}

/// Handle to a running schedule
///
/// Dropping the handle stops the schedule as well.
#[derive(Debug)]
pub struct ScheduleHandle {
    expression: String,
    task: BackgroundTask,
}

impl ScheduleHandle {
    /// The expression this schedule was created from
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether the schedule is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel all future triggers
    ///
    /// A job that is already running is allowed to finish.
    pub async fn stop(self) {
        self.task.stop().await;
        info!("Stopped schedule '{}'", self.expression);
    }
}

/// Run `job` at every instant matching `expression`
///
/// Fails synchronously with [`Error::InvalidSchedule`] for a malformed
/// expression. Runs never overlap: a trigger that falls while the previous
/// job is still running is skipped.
///
/// # Panics
///
/// Panics when called outside a Tokio runtime.
pub fn spawn<F, Fut>(expression: &str, job: F) -> Result<ScheduleHandle>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let schedule = parse(expression)?;
    let label = expression.to_string();

    let task = BackgroundTask::spawn("cron schedule", move |mut shutdown| async move {
        let mut after = Local::now();
        loop {
            let Some(next) = schedule.after(&after).next() else {
                warn!("Schedule '{}' has no upcoming instant", label);
                break;
            };
            let delay = (next - Local::now()).to_std().unwrap_or_default();
            debug!("Next run of '{}' at {}", label, next);

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }

            job().await;

            // Instants that passed while the job ran are skipped
            after = next.max(Local::now());
        }
    });

    info!("Scheduled sync with '{}'", expression);
    Ok(ScheduleHandle {
        expression: expression.to_string(),
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Utc, Weekday};

    #[test]
    fn test_accepts_five_and_six_fields() {
        assert!(is_valid("*/5 * * * *"));
        assert!(is_valid("0 0 * * *"));
        assert!(is_valid("*/10 * * * * *"));
    }

    #[test]
    fn test_rejects_malformed_expressions() {
        assert!(!is_valid(""));
        assert!(!is_valid("every minute"));
        assert!(!is_valid("* * * *"));
        assert!(!is_valid("0 0 0 * * * 2030"));
    }

    fn weekdays(expression: &str, count: usize) -> Vec<Weekday> {
        // Saturday
        let start = Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap();
        parse(expression)
            .unwrap()
            .after(&start)
            .take(count)
            .map(|instant| instant.weekday())
            .collect()
    }

    #[test]
    fn test_crontab_day_of_week_numbering() {
        assert!(is_valid("0 0 * * 0"));
        assert!(is_valid("0 0 * * 7"));
        assert_eq!(weekdays("0 0 * * 0", 1), vec![Weekday::Sun]);
        assert_eq!(weekdays("0 0 * * 7", 1), vec![Weekday::Sun]);
        assert_eq!(
            weekdays("0 9 * * 1-5", 5),
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
        );
    }

    #[test]
    fn test_day_of_week_ranges_lists_and_steps() {
        assert_eq!(
            weekdays("0 0 * * 5-7", 3),
            vec![Weekday::Sun, Weekday::Fri, Weekday::Sat]
        );
        assert_eq!(weekdays("0 0 * * 1,3", 2), vec![Weekday::Mon, Weekday::Wed]);
        assert_eq!(
            weekdays("0 0 * * */2", 4),
            vec![Weekday::Sun, Weekday::Tue, Weekday::Thu, Weekday::Sat]
        );
        assert_eq!(weekdays("0 0 12 * * 1", 1), vec![Weekday::Mon]);
        assert_eq!(weekdays("0 0 * * Mon", 1), vec![Weekday::Mon]);
    }

    #[test]
    fn test_rejects_bad_day_of_week() {
        assert!(!is_valid("0 0 * * 8"));
        assert!(!is_valid("0 0 * * 5-2"));
        assert!(!is_valid("0 0 * * */0"));
        assert!(!is_valid("0 0 * * 1,,2"));
    }

    #[test]
    fn test_error_carries_expression() {
        match parse("not a cron") {
            Err(Error::InvalidSchedule { expression, .. }) => assert_eq!(expression, "not a cron"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_rejects_synchronously() {
        let result = spawn("bogus", || async {});
        assert!(matches!(result, Err(Error::InvalidSchedule { .. })));
    }
}
