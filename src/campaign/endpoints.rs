use std::collections::BTreeMap;
use std::convert::TryFrom;

use actix_web::web::{Data, Form, Json, Path, Query};
use actix_web::{get, post};
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::class::ClassUrn;
use crate::database::Database;
use crate::error::Error;
use crate::user::requester::Requester;
use crate::user::User;
use crate::utils::SuccessBody;

use super::manager::{self, CampaignDetails};
use super::search::{CampaignSearch, CampaignSearchQuery};
use super::{
    Campaign, CampaignRole, CampaignUpdate, CampaignUrn, PrivacyState, RunningState,
};

/// The fields of an update request. Fields that are left out are not
/// changed.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UpdateCampaignForm {
    pub running_state: Option<String>,
    pub privacy_state: Option<String>,
    pub description: Option<String>,
    pub xml: Option<String>,
    pub class_urn_list: Option<String>,
}

impl TryFrom<UpdateCampaignForm> for CampaignUpdate {
    type Error = Error;

    fn try_from(form: UpdateCampaignForm) -> Result<CampaignUpdate, Error> {
        Ok(CampaignUpdate {
            running_state: form.running_state.map(|s| s.parse()).transpose()?,
            privacy_state: form.privacy_state.map(|s| s.parse()).transpose()?,
            description: form.description,
            xml: form.xml,
            class_urns: form
                .class_urn_list
                .map(|list| parse_class_list(&list))
                .transpose()?,
        })
    }
}

fn parse_class_list(list: &str) -> Result<Vec<ClassUrn>, Error> {
    let class_urns = ClassUrn::parse_list(list).map_err(|_| Error::InvalidUrn {
        value: list.to_owned(),
    })?;

    if class_urns.is_empty() {
        return Err(Error::InvalidClassList {
            value: list.to_owned(),
        });
    }

    Ok(class_urns)
}

fn parse_campaign_urn(value: String) -> Result<CampaignUrn, Error> {
    value.parse().map_err(|_| Error::InvalidUrn { value })
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CampaignBody {
    pub urn: CampaignUrn,
    pub name: String,
    pub description: Option<String>,
    pub xml: String,
    pub running_state: RunningState,
    pub privacy_state: PrivacyState,
    pub authored_by: Option<String>,
    pub classes: Vec<ClassUrn>,
    pub user_roles: Vec<CampaignRole>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl CampaignBody {
    pub async fn render(
        db: &dyn Database,
        requester: &User,
        campaign: Campaign,
    ) -> Result<CampaignBody, Error> {
        let class_urns = db
            .campaigns()
            .fetch_class_urns_by_campaign(&campaign.urn)
            .await?;
        let mut requester_roles = db
            .campaigns()
            .fetch_user_roles_in_campaign(&campaign.urn, &requester.id)
            .await?;
        requester_roles.sort();
        requester_roles.dedup();

        Ok(CampaignBody::from(CampaignDetails {
            campaign,
            class_urns,
            requester_roles,
        }))
    }
}

impl From<CampaignDetails> for CampaignBody {
    fn from(details: CampaignDetails) -> CampaignBody {
        let campaign = details.campaign;
        CampaignBody {
            urn: campaign.urn,
            name: campaign.name,
            description: campaign.description,
            xml: campaign.xml,
            running_state: campaign.running_state,
            privacy_state: campaign.privacy_state,
            authored_by: campaign.authored_by,
            classes: details.class_urns,
            user_roles: details.requester_roles,
            created_at: campaign.created_at,
            modified_at: campaign.modified_at,
        }
    }
}

#[post("/campaigns/{campaign_urn}/update")]
#[tracing::instrument(skip(db, requester, form))]
pub async fn update_campaign(
    db: Data<Box<dyn Database>>,
    requester: Requester,
    params: Path<String>,
    form: Form<UpdateCampaignForm>,
) -> Result<Json<SuccessBody>, Error> {
    let campaign_urn = parse_campaign_urn(params.into_inner())?;
    let update = CampaignUpdate::try_from(form.into_inner())?;

    manager::update_campaign(&***db, &requester.into_inner(), &campaign_urn, update).await?;

    Ok(Json(SuccessBody::new()))
}

#[get("/campaigns")]
#[tracing::instrument(skip(db, requester))]
pub async fn get_campaigns(
    db: Data<Box<dyn Database>>,
    requester: Requester,
) -> Result<Json<Vec<CampaignBody>>, Error> {
    let requester = requester.into_inner();

    let campaigns = manager::get_campaigns_for_user(&***db, &requester).await?;

    let body = stream::iter(campaigns)
        .then(|campaign| CampaignBody::render(&***db, &requester, campaign))
        .try_collect()
        .await?;

    Ok(Json(body))
}

#[get("/campaigns/search")]
#[tracing::instrument(skip(db, requester))]
pub async fn search_campaigns(
    db: Data<Box<dyn Database>>,
    requester: Requester,
    query: Query<CampaignSearchQuery>,
) -> Result<Json<BTreeMap<CampaignUrn, CampaignBody>>, Error> {
    let requester = requester.into_inner();
    let search = CampaignSearch::try_from(query.into_inner())?;

    let campaigns = manager::search_campaigns(&***db, &requester, &search).await?;

    let body: Vec<CampaignBody> = stream::iter(campaigns)
        .then(|campaign| CampaignBody::render(&***db, &requester, campaign))
        .try_collect()
        .await?;

    Ok(Json(
        body.into_iter()
            .map(|campaign| (campaign.urn.clone(), campaign))
            .collect(),
    ))
}

#[get("/campaigns/{campaign_urn}")]
#[tracing::instrument(skip(db, requester))]
pub async fn get_campaign_by_urn(
    db: Data<Box<dyn Database>>,
    requester: Requester,
    params: Path<String>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_urn = parse_campaign_urn(params.into_inner())?;

    let details =
        manager::get_campaign_by_urn(&***db, &requester.into_inner(), &campaign_urn).await?;

    Ok(Json(CampaignBody::from(details)))
}
