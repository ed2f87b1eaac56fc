//! Civil time in the service's home timezone.
//!
//! Wake times are compared and rendered in one fixed zone (KST, UTC+9);
//! the zone is a deployment constant, never negotiated per request. All
//! wire timestamps use the `YYYY-MM-DD HH:MM[:SS]` shape.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

/// Offset of the home timezone from UTC, in hours.
const ZONE_OFFSET_HOURS: i32 = 9;

/// The fixed timezone all room schedules live in.
pub fn room_zone() -> FixedOffset {
    FixedOffset::east_opt(ZONE_OFFSET_HOURS * 3600).expect("static zone offset")
}

/// Current time in the room zone.
pub fn now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&room_zone())
}

/// Minute-precision civil timestamp: `YYYY-MM-DD HH:MM`.
pub fn stamp(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// Second-precision civil timestamp: `YYYY-MM-DD HH:MM:SS`.
pub fn stamp_seconds(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current second-precision timestamp, as stamped onto relayed chat
/// messages and system events.
pub fn now_stamp() -> String {
    stamp_seconds(&now())
}

/// Today's date in the room zone.
pub fn today() -> NaiveDate {
    now().date_naive()
}

/// Render a room's target wake time as `HH:MM`.
pub fn fmt_wake_time(at: NaiveTime) -> String {
    at.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn zone_is_utc_plus_nine() {
        assert_eq!(room_zone().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn stamp_shapes() {
        let at = room_zone()
            .with_ymd_and_hms(2025, 6, 30, 7, 5, 9)
            .single()
            .unwrap();
        assert_eq!(stamp(&at), "2025-06-30 07:05");
        assert_eq!(stamp_seconds(&at), "2025-06-30 07:05:09");
    }

    #[test]
    fn now_stamp_is_second_precision() {
        let s = now_stamp();
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(s.len(), 19);
        assert_eq!(&s[10..11], " ");
        assert_eq!(&s[13..14], ":");
        assert_eq!(&s[16..17], ":");
    }

    #[test]
    fn wake_time_is_hours_minutes() {
        let t = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
        assert_eq!(fmt_wake_time(t), "06:30");
    }
}
