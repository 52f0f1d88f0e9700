use tracing::{debug, error, info, warn};

use crate::class::{decode_class_member, ClassUrn};
use crate::database::{Database, Transaction};
use crate::error::Error;
use crate::user::{User, UserId};

use super::search::CampaignSearch;
use super::{
    Campaign, CampaignClass, CampaignRole, CampaignUpdate, CampaignUrn, ClassListChange,
    UserRoleCampaign,
};

/// A campaign as seen by one of its members.
#[derive(Clone, Debug, PartialEq)]
pub struct CampaignDetails {
    pub campaign: Campaign,
    pub class_urns: Vec<ClassUrn>,
    pub requester_roles: Vec<CampaignRole>,
}

#[tracing::instrument(skip(db, requester), fields(requester = %requester.id))]
pub async fn get_campaign_by_urn(
    db: &dyn Database,
    requester: &User,
    campaign_urn: &CampaignUrn,
) -> Result<CampaignDetails, Error> {
    let campaign = db
        .campaigns()
        .fetch_campaign_by_urn(campaign_urn)
        .await?
        .ok_or_else(|| Error::CampaignNotFound {
            campaign_urn: campaign_urn.clone(),
        })?;

    let mut requester_roles = db
        .campaigns()
        .fetch_user_roles_in_campaign(campaign_urn, &requester.id)
        .await?;
    if requester_roles.is_empty() && !requester.admin {
        return Err(Error::InsufficientCampaignPermissions {
            campaign_urn: campaign_urn.clone(),
            user_id: requester.id.clone(),
        });
    }
    requester_roles.sort();
    requester_roles.dedup();

    let class_urns = db
        .campaigns()
        .fetch_class_urns_by_campaign(campaign_urn)
        .await?;

    Ok(CampaignDetails {
        campaign,
        class_urns,
        requester_roles,
    })
}

#[tracing::instrument(skip(db, requester), fields(requester = %requester.id))]
pub async fn get_campaigns_for_user(
    db: &dyn Database,
    requester: &User,
) -> Result<Vec<Campaign>, Error> {
    let mut campaign_urns: Vec<CampaignUrn> = db
        .users()
        .fetch_user_role_campaigns_by_user(&requester.id)
        .await?
        .into_iter()
        .map(|association| association.campaign_urn)
        .collect();
    campaign_urns.sort();
    campaign_urns.dedup();

    let campaigns = db
        .campaigns()
        .fetch_campaigns_by_urns(&campaign_urns)
        .await?;

    Ok(campaigns)
}

#[tracing::instrument(skip(db, requester), fields(requester = %requester.id))]
pub async fn search_campaigns(
    db: &dyn Database,
    requester: &User,
    search: &CampaignSearch,
) -> Result<Vec<Campaign>, Error> {
    if !requester.admin {
        return Err(Error::RequesterNotAdmin {
            user_id: requester.id.clone(),
        });
    }

    let campaigns = db.campaigns().fetch_campaigns().await?;

    Ok(campaigns
        .into_iter()
        .filter(|campaign| search.matches(campaign))
        .collect())
}

/// Applies every change in `update` to the campaign, or none of them.
///
/// The requester must be a supervisor or author of the campaign. Any
/// non-empty update additionally requires being a supervisor, or an author
/// of a campaign that has not received any survey responses yet. Replacing
/// the class list attaches the new classes, granting each member the roles
/// implied by their class role, then detaches the classes that are no longer
/// listed, revoking all campaign roles of their members.
#[tracing::instrument(skip(db, requester, update), fields(requester = %requester.id))]
pub async fn update_campaign(
    db: &dyn Database,
    requester: &User,
    campaign_urn: &CampaignUrn,
    update: CampaignUpdate,
) -> Result<(), Error> {
    db.campaigns()
        .fetch_campaign_by_urn(campaign_urn)
        .await?
        .ok_or_else(|| Error::CampaignNotFound {
            campaign_urn: campaign_urn.clone(),
        })?;

    let roles = db
        .campaigns()
        .fetch_user_roles_in_campaign(campaign_urn, &requester.id)
        .await?;
    if !roles.iter().any(CampaignRole::can_modify_campaign) {
        return Err(Error::InsufficientCampaignPermissions {
            campaign_urn: campaign_urn.clone(),
            user_id: requester.id.clone(),
        });
    }

    if update.is_empty() {
        debug!("no changes requested");
        return Ok(());
    }

    let mut transaction = db.begin_transaction().await?;
    match apply_campaign_update(&mut *transaction, &requester.id, campaign_urn, &update).await {
        Ok(()) => {
            transaction.commit().await?;
            info!("campaign updated");
            Ok(())
        }
        Err(err) => {
            error!("rolling back campaign update: {}", err);
            if let Err(abort_err) = transaction.abort().await {
                warn!("failed to abort transaction: {}", abort_err);
            }
            Err(err)
        }
    }
}

async fn apply_campaign_update(
    transaction: &mut dyn Transaction,
    user_id: &UserId,
    campaign_urn: &CampaignUrn,
    update: &CampaignUpdate,
) -> Result<(), Error> {
    if let Some(running_state) = update.running_state {
        transaction
            .update_campaign_running_state(campaign_urn, running_state)
            .await?;
    }

    if let Some(privacy_state) = update.privacy_state {
        transaction
            .update_campaign_privacy_state(campaign_urn, privacy_state)
            .await?;
    }

    if let Some(description) = &update.description {
        transaction
            .update_campaign_description(campaign_urn, description)
            .await?;
    }

    // checked on every update, not only those carrying xml
    if !can_modify_xml(transaction, user_id, campaign_urn).await? {
        return Err(Error::XmlModificationNotAllowed {
            campaign_urn: campaign_urn.clone(),
            user_id: user_id.clone(),
        });
    }

    if let Some(xml) = &update.xml {
        transaction.update_campaign_xml(campaign_urn, xml).await?;
    }

    if let Some(class_urns) = &update.class_urns {
        replace_classes(transaction, campaign_urn, class_urns).await?;
    }

    Ok(())
}

async fn can_modify_xml(
    transaction: &mut dyn Transaction,
    user_id: &UserId,
    campaign_urn: &CampaignUrn,
) -> Result<bool, Error> {
    let roles = transaction
        .fetch_user_roles_in_campaign(campaign_urn, user_id)
        .await?;

    if roles.contains(&CampaignRole::Supervisor) {
        return Ok(true);
    }

    if roles.contains(&CampaignRole::Author) {
        let responses = transaction
            .count_survey_responses_by_campaign(campaign_urn)
            .await?;
        return Ok(responses == 0);
    }

    Ok(false)
}

async fn replace_classes(
    transaction: &mut dyn Transaction,
    campaign_urn: &CampaignUrn,
    requested: &[ClassUrn],
) -> Result<(), Error> {
    let current = transaction.fetch_class_urns_by_campaign(campaign_urn).await?;
    let change = ClassListChange::between(&current, requested);
    debug!(
        removed = change.removed.len(),
        added = change.added.len(),
        "replacing campaign classes"
    );

    if change.is_empty() {
        return Ok(());
    }

    for class_urn in change.added {
        transaction
            .fetch_class_by_urn(&class_urn)
            .await?
            .ok_or_else(|| Error::ClassNotFound {
                class_urn: class_urn.clone(),
            })?;

        let campaign_class = CampaignClass {
            campaign_urn: campaign_urn.clone(),
            class_urn,
        };
        transaction.insert_campaign_class(&campaign_class).await?;

        let members = transaction
            .fetch_class_members_by_class(&campaign_class.class_urn)
            .await?;
        for member in members {
            let (user_id, class_role) = decode_class_member(member)?;
            for role in &class_role.campaign_roles() {
                let association = UserRoleCampaign {
                    user_id: user_id.clone(),
                    campaign_urn: campaign_urn.clone(),
                    role: *role,
                };
                transaction.insert_user_role_campaign(&association).await?;
            }
        }
    }

    // runs after the additions: members of a detached class keep no roles,
    // even those just granted by a newly attached class
    for class_urn in change.removed {
        let campaign_class = CampaignClass {
            campaign_urn: campaign_urn.clone(),
            class_urn,
        };
        transaction.delete_campaign_class(&campaign_class).await?;

        let members = transaction
            .fetch_class_members_by_class(&campaign_class.class_urn)
            .await?;
        for member in members {
            transaction
                .delete_user_role_campaigns(campaign_urn, &member.user_id)
                .await?;
        }
    }

    Ok(())
}
