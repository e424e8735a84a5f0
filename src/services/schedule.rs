//! Viewing schedule calculation.
//!
//! Pure arithmetic over the movie runtime and the configured finish
//! time; "today" is an argument so the result is reproducible.

use time::{Date, Duration, PrimitiveDateTime, Time};

/// Fixed-interval break insertion rule: one break of
/// `duration_minutes` per full `interval_minutes` of runtime.
#[derive(Debug, Clone, Copy)]
pub struct BreakRule {
    /// Runtime minutes that earn one break.
    pub interval_minutes: u32,
    /// Length of each break in minutes.
    pub duration_minutes: u32,
}

impl Default for BreakRule {
    fn default() -> Self {
        Self {
            interval_minutes: 40,
            duration_minutes: 15,
        }
    }
}

impl BreakRule {
    /// Breaks earned by a runtime.
    pub fn break_count(&self, runtime_minutes: u32) -> u32 {
        if self.interval_minutes == 0 {
            0
        } else {
            runtime_minutes / self.interval_minutes
        }
    }
}

/// Resolved viewing schedule for one movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// When playback has to start.
    pub start_at: PrimitiveDateTime,
    /// When the night wraps up.
    pub finish_at: PrimitiveDateTime,
    /// Number of breaks interleaved into the runtime.
    pub break_count: u32,
    /// Total break time in minutes.
    pub break_total_minutes: u32,
}

/// Derive the watch schedule for a movie that must be over by
/// `finish_by`.
///
/// A finish time before noon is taken to mean "past midnight", so it
/// resolves on the day after `today`; afternoon and evening times
/// resolve on `today` itself. The start time walks back from the
/// finish by the runtime plus every earned break.
pub fn calculate_schedule(
    runtime_minutes: u32,
    finish_by: Time,
    today: Date,
    rule: BreakRule,
) -> Schedule {
    let break_count = rule.break_count(runtime_minutes);
    let break_total_minutes = break_count * rule.duration_minutes;

    let finish_date = if finish_by.hour() < 12 {
        today.next_day().unwrap_or(today)
    } else {
        today
    };
    let finish_at = PrimitiveDateTime::new(finish_date, finish_by);
    let start_at = finish_at - Duration::minutes(i64::from(runtime_minutes + break_total_minutes));

    Schedule {
        start_at,
        finish_at,
        break_count,
        break_total_minutes,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, time};

    use super::*;

    #[test]
    fn early_morning_finish_rolls_to_the_next_day() {
        let schedule = calculate_schedule(
            130,
            time!(03:30),
            date!(2026 - 08 - 04),
            BreakRule::default(),
        );

        assert_eq!(schedule.break_count, 3);
        assert_eq!(schedule.break_total_minutes, 45);
        assert_eq!(schedule.finish_at, datetime!(2026-08-05 03:30));
        // 130 + 45 = 175 minutes before the finish.
        assert_eq!(schedule.start_at, datetime!(2026-08-05 00:35));
    }

    #[test]
    fn evening_finish_stays_on_the_same_day() {
        let schedule = calculate_schedule(
            100,
            time!(21:30),
            date!(2026 - 08 - 04),
            BreakRule::default(),
        );

        assert_eq!(schedule.break_count, 2);
        assert_eq!(schedule.break_total_minutes, 30);
        assert_eq!(schedule.finish_at, datetime!(2026-08-04 21:30));
        assert_eq!(schedule.start_at, datetime!(2026-08-04 19:20));
    }

    #[test]
    fn breaks_require_a_full_interval() {
        let rule = BreakRule::default();
        assert_eq!(rule.break_count(39), 0);
        assert_eq!(rule.break_count(40), 1);
        assert_eq!(rule.break_count(79), 1);
        assert_eq!(rule.break_count(80), 2);
    }

    #[test]
    fn short_movie_gets_no_breaks() {
        let schedule = calculate_schedule(
            35,
            time!(20:00),
            date!(2026 - 08 - 04),
            BreakRule::default(),
        );

        assert_eq!(schedule.break_count, 0);
        assert_eq!(schedule.break_total_minutes, 0);
        assert_eq!(schedule.start_at, datetime!(2026-08-04 19:25));
    }

    #[test]
    fn zero_interval_disables_breaks() {
        let rule = BreakRule {
            interval_minutes: 0,
            duration_minutes: 15,
        };
        assert_eq!(rule.break_count(200), 0);
    }
}
