//! Reading transaction dates from user input and writing them back out for
//! display.
//!
//! Every stored date is UTC. Input either carries its own offset, or is read
//! in a timezone chosen by the caller: UTC for the JSON API and the server's
//! local timezone for the HTML forms. The offset of that timezone is the one
//! in force on the date being read, so daylight saving is respected.

use time::{
    Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::{
        BorrowedFormatItem,
        well_known::{Iso8601, Rfc3339},
    },
    macros::format_description,
};
use time_tz::{Offset, PrimitiveDateTimeExt, TimeZone, Tz};

use crate::Error;

/// Naive date-time layouts that [Iso8601] parsing rejects: the extended
/// format with only an hour, and a space in place of the "T".
const EXTRA_NAIVE_FORMATS: [&[BorrowedFormatItem<'static>]; 4] = [
    format_description!("[year]-[month]-[day]T[hour]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
];

const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

const DATETIME_LOCAL_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");

/// Parse `raw` as a UTC timestamp.
///
/// Timestamps with an offset (RFC 3339 or ISO 8601) are converted to UTC.
/// A naive ISO 8601 date-time in basic or extended format, possibly with
/// reduced precision such as "2024-01-01T12", is read in `timezone`. So is a
/// bare date, which is taken as midnight.
///
/// # Errors
///
/// Returns [Error::InvalidDate] if `raw` matches none of the accepted layouts.
pub fn parse_timestamp(raw: &str, timezone: &Tz) -> Result<OffsetDateTime, Error> {
    let trimmed = raw.trim();
    let invalid_date = || Error::InvalidDate(raw.to_owned());

    let with_offset = OffsetDateTime::parse(trimmed, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(trimmed, &Iso8601::DEFAULT))
        .ok();

    let timestamp = match with_offset {
        Some(timestamp) => timestamp,
        None => assume_timezone(parse_naive(trimmed).ok_or_else(invalid_date)?, timezone),
    };

    timestamp
        .checked_to_offset(UtcOffset::UTC)
        .ok_or_else(invalid_date)
}

fn parse_naive(raw: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
        .ok()
        .or_else(|| {
            EXTRA_NAIVE_FORMATS
                .iter()
                .find_map(|format| PrimitiveDateTime::parse(raw, format).ok())
        })
        .or_else(|| {
            Date::parse(raw, &Iso8601::DEFAULT)
                .ok()
                .map(|date| date.with_time(Time::MIDNIGHT))
        })
}

/// Attach the offset `timezone` uses at the wall clock time `naive`.
///
/// A time that happens twice when clocks go back takes the first offset. A
/// time skipped when clocks go forward takes the offset in force just before
/// the change, so 02:30 on the morning clocks jump from 02:00 to 03:00 reads
/// as 03:30.
fn assume_timezone(naive: PrimitiveDateTime, timezone: &Tz) -> OffsetDateTime {
    naive.assume_timezone(timezone).take_first().unwrap_or_else(|| {
        // No timezone changes its offset twice in one day.
        let day_before = naive.assume_utc() - Duration::DAY;
        naive.assume_offset(timezone.get_offset_utc(&day_before).to_utc())
    })
}

fn in_timezone(timestamp: OffsetDateTime, timezone: &Tz) -> OffsetDateTime {
    let offset = timezone.get_offset_utc(&timestamp).to_utc();

    timestamp.checked_to_offset(offset).unwrap_or(timestamp)
}

/// Format `timestamp` in `timezone` for the transactions table, e.g.
/// "2026-03-01 13:30".
pub fn format_local(timestamp: OffsetDateTime, timezone: &Tz) -> String {
    in_timezone(timestamp, timezone)
        .format(DISPLAY_FORMAT)
        .unwrap_or_else(|error| {
            tracing::error!("could not format {timestamp}: {error}");
            timestamp.to_string()
        })
}

/// Format `timestamp` in `timezone` as the value of an
/// `<input type="datetime-local">`.
pub fn format_datetime_local(timestamp: OffsetDateTime, timezone: &Tz) -> String {
    in_timezone(timestamp, timezone)
        .format(DATETIME_LOCAL_FORMAT)
        .unwrap_or_default()
}
