use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;

/// Exchange timezone all session boundaries are evaluated in.
pub const LOCAL_TZ: Tz = New_York;

/// Regular Trading Hours session open (09:30 New York).
pub fn rth_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).expect("09:30:00 is a valid time")
}

/// Regular Trading Hours session close (16:00 New York).
pub fn rth_close() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).expect("16:00:00 is a valid time")
}

/// Convert a UTC bar timestamp to exchange-local time.
///
/// Bars are stamped at their closing boundary. The one second shift rolls a bar stamped just
/// inside the boundary (eg/ 15:59:59) onto the session close itself.
pub fn local_ts(timestamp: DateTime<Utc>) -> DateTime<Tz> {
    timestamp.with_timezone(&LOCAL_TZ) + TimeDelta::seconds(1)
}

/// True once a bar timestamp has reached the session close (local time >= 16:00).
pub fn end_of_day(timestamp: DateTime<Utc>) -> bool {
    local_ts(timestamp).time() >= rth_close()
}

/// True on the final session close of the trading week.
pub fn end_of_week(timestamp: DateTime<Utc>) -> bool {
    end_of_day(timestamp) && local_ts(timestamp).weekday().num_days_from_monday() >= 4
}
