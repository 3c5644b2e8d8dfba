use std::{cmp::Ordering, fmt};

use serde::{de, Deserializer, Serializer};
use uuid::Uuid;

pub const TEMPORARY_ID_PREFIX: &str = "temp-";

/// Numeric ids compare numerically and sort before any other id. The string
/// comparison breaks numeric ties (eg. "07" vs "7") so that this stays
/// consistent with `Eq`.
fn compare(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(na), Ok(nb)) => na.cmp(&nb).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn serialize<S: Serializer>(id: &str, s: S) -> Result<S::Ok, S::Error> {
    match id.bytes().all(|b| b.is_ascii_digit()) {
        true => match id.parse::<u64>() {
            Ok(n) => s.serialize_u64(n),
            Err(_) => s.serialize_str(id),
        },
        false => s.serialize_str(id),
    }
}

struct IdVisitor;

impl<'de> de::Visitor<'de> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(String::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    d.deserialize_any(IdVisitor)
}

macro_rules! id_type {
    ( $(#[$meta:meta])* $name:ident ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, Hash, PartialEq)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                compare(&self.0, &other.0)
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> $name {
                $name(String::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> $name {
                $name(s)
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> $name {
                $name(n.to_string())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                serialize(&self.0, s)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<$name, D::Error> {
                deserialize(d).map($name)
            }
        }
    };
}

id_type!(
    /// Comment identifier, either assigned by the server or temporary (see
    /// [`CommentId::temporary`])
    CommentId
);
id_type!(PostId);
id_type!(UserId);

impl CommentId {
    /// A fresh id for a comment that the server has not confirmed yet.
    /// Server ids never carry the temporary prefix.
    pub fn temporary() -> CommentId {
        CommentId(format!("{TEMPORARY_ID_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }
}
