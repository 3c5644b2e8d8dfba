use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

mod comment;
pub use comment::{Comment, NewComment, SubmitResponse};

mod error;
pub use error::Error;

mod ident;
pub use ident::{CommentId, PostId, UserId, TEMPORARY_ID_PREFIX};

mod store;
pub use store::{CommentStore, Viewer, ViewerIdentity};

pub use uuid::Uuid;

pub type Time = DateTime<Utc>;

// The backend emits naive timestamps (no offset), always in UTC
const NAIVE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn parse_time(s: &str) -> Option<Time> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NAIVE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// serde adapter for `Time` fields that accepts both RFC 3339 and naive UTC timestamps
pub mod time_format {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::Time;

    pub fn serialize<S: Serializer>(t: &Time, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Time, D::Error> {
        let s = String::deserialize(d)?;
        crate::parse_time(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp {s:?}")))
    }
}

// Postgres-backed deployments reject strings with null bytes, so refuse them early
pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}

pub fn validate_comment_text(s: &str) -> Result<(), Error> {
    validate_string(s)?;
    match s.trim().is_empty() {
        true => Err(Error::EmptyComment),
        false => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_naive_times() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_time("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_time("2024-03-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_time("2024-03-01T12:30:00"), Some(expected));
        assert_eq!(parse_time("2024-03-01 12:30:00.000"), Some(expected));
        assert_eq!(parse_time("yesterday"), None);
    }

    #[test]
    fn comment_text_validation() {
        assert_eq!(validate_comment_text("hello"), Ok(()));
        assert_eq!(validate_comment_text("  \n\t"), Err(Error::EmptyComment));
        assert_eq!(
            validate_comment_text("a\0b"),
            Err(Error::NullByteInString(String::from("a\0b")))
        );
    }
}
