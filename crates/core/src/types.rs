/// Opaque identifier assigned by the advertising platform.
pub type ResourceId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Compact local timestamp used in generated names and file paths,
/// e.g. `20251104_153012`.
pub fn name_stamp(at: Timestamp) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn name_stamp_format() {
        let at = chrono::Utc.with_ymd_and_hms(2025, 11, 4, 15, 30, 12).unwrap();
        assert_eq!(name_stamp(at), "20251104_153012");
    }
}
