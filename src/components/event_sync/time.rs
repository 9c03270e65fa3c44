use crate::error::{parse_error, BotResult};
use chrono::{DateTime, Datelike, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse a time of day as shown on Steam into (hour, minute).
///
/// Accepts `20h30`, `8:30 PM`, `8 pm`, `20:30` and a bare hour such as `20`.
pub fn parse_time_parts(time_str: &str) -> BotResult<(u32, u32)> {
    let time_str = time_str.trim().to_lowercase();

    let (hour, minute) = if let Some((hour, minute)) = time_str.split_once('h') {
        (parse_number(hour)?, parse_number(minute)?)
    } else if time_str.contains("am") || time_str.contains("pm") {
        let is_pm = time_str.contains("pm");
        let clean = time_str.replace("am", "").replace("pm", "");
        let (hour, minute) = match clean.split_once(':') {
            Some((hour, minute)) => (parse_number(hour)?, parse_number(minute)?),
            None => (parse_number(&clean)?, 0),
        };
        match (is_pm, hour) {
            (true, 12) => (12, minute),
            (true, hour) => (hour + 12, minute),
            (false, 12) => (0, minute),
            (false, hour) => (hour, minute),
        }
    } else if let Some((hour, minute)) = time_str.split_once(':') {
        (parse_number(hour)?, parse_number(minute)?)
    } else {
        (parse_number(&time_str)?, 0)
    };

    if hour > 23 || minute > 59 {
        return Err(parse_error(&format!("Time out of range: {}", time_str)));
    }
    Ok((hour, minute))
}

fn parse_number(part: &str) -> BotResult<u32> {
    part.trim()
        .parse::<u32>()
        .map_err(|_| parse_error(&format!("Invalid time component: '{}'", part.trim())))
}

/// Turns the calendar fields of a listing into absolute instants
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    tz: Tz,
    month_rollover: bool,
}

impl DateNormalizer {
    pub fn new(tz: Tz, month_rollover: bool) -> Self {
        Self { tz, month_rollover }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Combine a listing date and a parsed time into a UTC instant.
    ///
    /// With rollover enabled, a day earlier than today in the current month
    /// belongs to the next month (the header already shows the upcoming one).
    pub fn normalize(
        &self,
        year: i32,
        month: u32,
        day: u32,
        (hour, minute): (u32, u32),
        now: DateTime<Utc>,
    ) -> BotResult<DateTime<Utc>> {
        let today = now.with_timezone(&self.tz);
        let (year, month) = if self.month_rollover && month == today.month() && day < today.day() {
            next_month(year, month)
        } else {
            (year, month)
        };

        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .ok_or_else(|| {
                parse_error(&format!(
                    "Invalid date {}-{:02}-{:02} {:02}:{:02}",
                    year, month, day, hour, minute
                ))
            })?;

        let local = match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            // Repeated hour at the end of summer time: keep the first occurrence
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                return Err(parse_error(&format!(
                    "Local time {} does not exist in {}",
                    naive, self.tz
                )));
            }
        };

        Ok(local.with_timezone(&Utc))
    }
}

/// Following month, wrapping December into January of the next year
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
