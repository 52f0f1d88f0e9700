use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use mongodb::bson::Bson;
use serde::{de::Error, Deserialize, Serialize};

pub trait UrnMarker {
    fn kind() -> &'static str;
}

/// A validated `urn:` identifier for a specific kind of record.
pub struct Urn<T: UrnMarker>(String, PhantomData<T>);

impl<T: UrnMarker> Urn<T> {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a comma-separated list, trimming entries and skipping empty
    /// ones. Duplicates are collapsed, keeping the first occurrence.
    pub fn parse_list(list: &str) -> Result<Vec<Urn<T>>, UrnParseError> {
        let mut urns: Vec<Urn<T>> = vec![];
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let urn = entry.parse()?;
            if !urns.contains(&urn) {
                urns.push(urn);
            }
        }

        Ok(urns)
    }
}

impl<T: UrnMarker> Clone for Urn<T> {
    fn clone(&self) -> Urn<T> {
        Urn(self.0.clone(), PhantomData)
    }
}

impl<T: UrnMarker> PartialEq for Urn<T> {
    fn eq(&self, other: &Urn<T>) -> bool {
        self.0 == other.0
    }
}

impl<T: UrnMarker> Eq for Urn<T> {}

impl<T: UrnMarker> PartialOrd for Urn<T> {
    fn partial_cmp(&self, other: &Urn<T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: UrnMarker> Ord for Urn<T> {
    fn cmp(&self, other: &Urn<T>) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T: UrnMarker> Hash for Urn<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<T: UrnMarker> Display for Urn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_str(&self.0)
    }
}

impl<T: UrnMarker> Debug for Urn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}({})", T::kind(), self.0)
    }
}

impl<T: UrnMarker> FromStr for Urn<T> {
    type Err = UrnParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let prefix = s.get(..4).ok_or(UrnParseError::MissingPrefix)?;
        if !prefix.eq_ignore_ascii_case("urn:") {
            return Err(UrnParseError::MissingPrefix);
        }

        if s.len() == 4 {
            return Err(UrnParseError::Empty);
        }

        if let Some(c) = s.chars().find(|c| !is_urn_char(*c)) {
            return Err(UrnParseError::InvalidCharacter(c));
        }

        Ok(Urn(s.to_owned(), PhantomData))
    }
}

fn is_urn_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | ';')
}

impl<T: UrnMarker> Serialize for Urn<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: UrnMarker> Deserialize<'de> for Urn<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Urn::from_str(&s).map_err(|e| D::Error::custom(format!("invalid {} urn: {}", T::kind(), e)))
    }
}

impl<T: UrnMarker> From<Urn<T>> for Bson {
    fn from(urn: Urn<T>) -> Bson {
        Bson::String(urn.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UrnParseError {
    MissingPrefix,
    Empty,
    InvalidCharacter(char),
}

impl Display for UrnParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}
