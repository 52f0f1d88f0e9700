use std::collections::{BTreeMap, BTreeSet};

use crate::campaign::CampaignUrn;
use crate::class::{decode_class_member, ClassUrn};
use crate::database::Database;
use crate::error::Error;

use super::{User, UserId};

/// What a user may see about themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct UserSummary {
    pub user_id: UserId,
    pub admin: bool,
    pub campaign_creation_privilege: bool,
    pub campaigns: BTreeMap<CampaignUrn, String>,
    pub classes: BTreeMap<ClassUrn, String>,
    pub roles: BTreeSet<String>,
}

/// Resolves the user a request is made on behalf of. Only enabled users who
/// have completed their account setup may act.
#[tracing::instrument(skip(db))]
pub async fn authenticate(db: &dyn Database, user_id: &UserId) -> Result<User, Error> {
    let user = db
        .users()
        .fetch_user_by_id(user_id)
        .await?
        .ok_or_else(|| Error::RequesterNotFound {
            user_id: user_id.clone(),
        })?;

    if !user.enabled {
        return Err(Error::RequesterDisabled {
            user_id: user.id,
        });
    }

    if user.new_account {
        return Err(Error::RequesterIsNewAccount {
            user_id: user.id,
        });
    }

    Ok(user)
}

#[tracing::instrument(skip(db, user), fields(user = %user.id))]
pub async fn get_user_summary(db: &dyn Database, user: &User) -> Result<UserSummary, Error> {
    let mut roles = BTreeSet::new();

    let associations = db
        .users()
        .fetch_user_role_campaigns_by_user(&user.id)
        .await?;
    let mut campaign_urns = Vec::with_capacity(associations.len());
    for association in associations {
        roles.insert(association.role.as_str().to_owned());
        campaign_urns.push(association.campaign_urn);
    }
    campaign_urns.sort();
    campaign_urns.dedup();

    let campaigns = db
        .campaigns()
        .fetch_campaigns_by_urns(&campaign_urns)
        .await?
        .into_iter()
        .map(|campaign| (campaign.urn, campaign.name))
        .collect();

    let memberships = db.classes().fetch_class_members_by_user(&user.id).await?;
    let mut class_urns = Vec::with_capacity(memberships.len());
    for member in memberships {
        class_urns.push(member.class_urn.clone());
        let (_, class_role) = decode_class_member(member)?;
        roles.insert(class_role.as_str().to_owned());
    }

    let classes = db
        .classes()
        .fetch_classes_by_urns(&class_urns)
        .await?
        .into_iter()
        .map(|class| (class.urn, class.name))
        .collect();

    Ok(UserSummary {
        user_id: user.id.clone(),
        admin: user.admin,
        campaign_creation_privilege: user.campaign_creation_privilege,
        campaigns,
        classes,
        roles,
    })
}
