//! Calendar windows and clock injection for temporal predicates.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};

/// Source of "now" for relative temporal predicates (`today`, `within`, ...).
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl Clock {
    /// Wall clock.
    #[must_use]
    pub fn system() -> Self {
        Self(Arc::new(Utc::now))
    }

    /// A clock frozen at `at`.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self(Arc::new(move || at))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Clock").field(&self.now()).finish()
    }
}

/// Named calendar windows relative to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarWindow {
    Today,
    Yesterday,
    /// ISO week, Monday through Sunday.
    ThisWeek,
    ThisMonth,
    ThisYear,
}

/// Half-open `[start, end)` UTC range.
pub type Window = (DateTime<Utc>, DateTime<Utc>);

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Resolve `window` relative to `now`. `None` only at the edges of the
/// representable calendar.
#[must_use]
pub fn calendar_window(window: CalendarWindow, now: DateTime<Utc>) -> Option<Window> {
    let today = now.date_naive();
    let (start, end) = match window {
        CalendarWindow::Today => (today, today.checked_add_days(Days::new(1))?),
        CalendarWindow::Yesterday => (today.checked_sub_days(Days::new(1))?, today),
        CalendarWindow::ThisWeek => {
            let back = u64::from(today.weekday().num_days_from_monday());
            let monday = today.checked_sub_days(Days::new(back))?;
            (monday, monday.checked_add_days(Days::new(7))?)
        }
        CalendarWindow::ThisMonth => {
            let first = today.with_day(1)?;
            (first, first.checked_add_months(Months::new(1))?)
        }
        CalendarWindow::ThisYear => return year_window(today.year()),
    };
    Some((midnight(start), midnight(end)))
}

/// `[Jan 1 of year, Jan 1 of year + 1)`.
#[must_use]
pub fn year_window(year: i32) -> Option<Window> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?;
    Some((midnight(start), midnight(end)))
}
