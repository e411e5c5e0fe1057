//! Looking up the server's local timezone from a canonical timezone name.

use time_tz::Tz;

/// Get the timezone for `canonical_timezone`, e.g. "Pacific/Auckland".
///
/// The offset of a timezone depends on the date, so callers resolve it per
/// timestamp rather than once.
///
/// Returns `None` if the name is not a known timezone.
pub fn get_local_timezone(canonical_timezone: &str) -> Option<&'static Tz> {
    time_tz::timezones::get_by_name(canonical_timezone)
}
