use std::fmt::{Debug, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::Bson;
use serde::{de, Deserialize, Serialize};

use crate::error::Error;

pub mod db;
pub mod endpoints;
pub mod manager;
pub mod requester;
pub use endpoints::*;

/// A user's login id.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid_length = (4..=25).contains(&s.len());
        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

        if !valid_length || !valid_chars {
            return Err(Error::InvalidUserId {
                value: s.to_owned(),
            });
        }

        Ok(UserId(s.to_owned()))
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_str(&self.0)
    }
}

impl Debug for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "user({})", self.0)
    }
}

impl Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| <D::Error as de::Error>::custom(format!("invalid user id: {}", s)))
    }
}

impl From<UserId> for Bson {
    fn from(id: UserId) -> Bson {
        Bson::String(id.0)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub enabled: bool,
    pub admin: bool,
    pub new_account: bool,
    pub campaign_creation_privilege: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
