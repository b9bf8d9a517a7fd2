//! Generated names for stored video binaries.
//!
//! Format: `{bookingId}_{timestampMillis}.{ext}`. Booking ids are validated
//! before they reach this module, so the result is always a single path
//! component.

use chrono::{DateTime, Utc};

pub fn generate_video_file_name(booking_id: &str, extension: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        booking_id,
        now.timestamp_millis(),
        extension.to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_embeds_booking_and_millis() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            generate_video_file_name("b1", "MP4", now),
            "b1_1700000000123.mp4"
        );
    }
}
