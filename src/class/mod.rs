use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::campaign::CampaignRole;
use crate::error::Error;
use crate::urn::{Urn, UrnMarker};
use crate::user::UserId;

pub mod db;

pub type ClassUrn = Urn<Class>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Class {
    #[serde(rename = "_id")]
    pub urn: ClassUrn,
    pub name: String,
    pub description: Option<String>,
}

impl UrnMarker for Class {
    fn kind() -> &'static str {
        "class"
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassRole {
    Privileged,
    Restricted,
}

impl ClassRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassRole::Privileged => "privileged",
            ClassRole::Restricted => "restricted",
        }
    }

    /// The roles a member of a class is granted in every campaign the class
    /// is associated with.
    pub fn campaign_roles(&self) -> [CampaignRole; 2] {
        match self {
            ClassRole::Privileged => [CampaignRole::Participant, CampaignRole::Supervisor],
            ClassRole::Restricted => [CampaignRole::Participant, CampaignRole::Analyst],
        }
    }
}

impl FromStr for ClassRole {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "privileged" => Ok(ClassRole::Privileged),
            "restricted" => Ok(ClassRole::Restricted),
            _ => Err(()),
        }
    }
}

impl Display for ClassRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_str(self.as_str())
    }
}

/// A row of a class roster. The role is kept as stored so that a roster
/// holding an unexpected value can still be read and reported.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ClassMember {
    pub class_urn: ClassUrn,
    pub user_id: UserId,
    pub class_role: String,
}

impl ClassMember {
    pub fn new(class_urn: ClassUrn, user_id: UserId, class_role: ClassRole) -> ClassMember {
        ClassMember {
            class_urn,
            user_id,
            class_role: class_role.as_str().to_owned(),
        }
    }
}

pub fn decode_class_member(member: ClassMember) -> Result<(UserId, ClassRole), Error> {
    match member.class_role.parse() {
        Ok(class_role) => Ok((member.user_id, class_role)),
        Err(()) => Err(Error::UnknownClassRole {
            class_urn: member.class_urn,
            user_id: member.user_id,
            class_role: member.class_role,
        }),
    }
}
