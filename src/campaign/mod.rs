use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

use crate::class::ClassUrn;
use crate::error::Error;
use crate::urn::{Urn, UrnMarker};
use crate::user::UserId;

pub mod db;
pub mod endpoints;
pub mod manager;
pub mod search;
pub use endpoints::*;

pub type CampaignUrn = Urn<Campaign>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub urn: CampaignUrn,
    pub name: String,
    pub description: Option<String>,
    pub xml: String,
    pub running_state: RunningState,
    pub privacy_state: PrivacyState,
    pub authored_by: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub modified_at: DateTime<Utc>,
}

impl UrnMarker for Campaign {
    fn kind() -> &'static str {
        "campaign"
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunningState {
    Running,
    Stopped,
}

impl FromStr for RunningState {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunningState::Running),
            "stopped" => Ok(RunningState::Stopped),
            _ => Err(Error::InvalidRunningState {
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyState {
    Private,
    Shared,
}

impl FromStr for PrivacyState {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(PrivacyState::Private),
            "shared" => Ok(PrivacyState::Shared),
            _ => Err(Error::InvalidPrivacyState {
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignRole {
    Supervisor,
    Author,
    Analyst,
    Participant,
}

impl CampaignRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignRole::Supervisor => "supervisor",
            CampaignRole::Author => "author",
            CampaignRole::Analyst => "analyst",
            CampaignRole::Participant => "participant",
        }
    }

    /// Whether this role allows changing anything about a campaign.
    pub fn can_modify_campaign(&self) -> bool {
        matches!(self, CampaignRole::Supervisor | CampaignRole::Author)
    }
}

impl Display for CampaignRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_str(self.as_str())
    }
}

impl From<CampaignRole> for Bson {
    fn from(role: CampaignRole) -> Bson {
        Bson::String(role.as_str().to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CampaignClass {
    pub campaign_urn: CampaignUrn,
    pub class_urn: ClassUrn,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct UserRoleCampaign {
    pub user_id: UserId,
    pub campaign_urn: CampaignUrn,
    pub role: CampaignRole,
}

/// A sparse set of changes to a campaign. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CampaignUpdate {
    pub running_state: Option<RunningState>,
    pub privacy_state: Option<PrivacyState>,
    pub description: Option<String>,
    pub xml: Option<String>,
    pub class_urns: Option<Vec<ClassUrn>>,
}

impl CampaignUpdate {
    pub fn is_empty(&self) -> bool {
        self.running_state.is_none()
            && self.privacy_state.is_none()
            && self.description.is_none()
            && self.xml.is_none()
            && self.class_urns.is_none()
    }
}

/// The classes to detach from and attach to a campaign so that its roster
/// matches a requested list.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassListChange {
    pub removed: Vec<ClassUrn>,
    pub added: Vec<ClassUrn>,
}

impl ClassListChange {
    pub fn between(current: &[ClassUrn], requested: &[ClassUrn]) -> ClassListChange {
        let removed = current
            .iter()
            .filter(|urn| !requested.contains(urn))
            .cloned()
            .collect();
        let added = requested
            .iter()
            .filter(|urn| !current.contains(urn))
            .cloned()
            .collect();

        ClassListChange { removed, added }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}
