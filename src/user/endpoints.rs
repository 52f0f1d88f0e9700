use std::collections::BTreeMap;

use actix_web::get;
use actix_web::web::{Data, Json};
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignUrn;
use crate::class::ClassUrn;
use crate::database::Database;
use crate::error::Error;

use super::manager::{self, UserSummary};
use super::requester::Requester;
use super::UserId;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserInfoBody {
    pub admin: bool,
    pub campaign_creation_privilege: bool,
    pub campaigns: BTreeMap<CampaignUrn, String>,
    pub classes: BTreeMap<ClassUrn, String>,
    pub permissions: Vec<String>,
}

impl UserInfoBody {
    pub fn render(summary: UserSummary) -> (UserId, UserInfoBody) {
        let body = UserInfoBody {
            admin: summary.admin,
            campaign_creation_privilege: summary.campaign_creation_privilege,
            campaigns: summary.campaigns,
            classes: summary.classes,
            permissions: summary.roles.into_iter().collect(),
        };

        (summary.user_id, body)
    }
}

#[get("/user/info")]
#[tracing::instrument(skip(db, requester))]
pub async fn get_user_info(
    db: Data<Box<dyn Database>>,
    requester: Requester,
) -> Result<Json<BTreeMap<UserId, UserInfoBody>>, Error> {
    let requester = requester.into_inner();

    let summary = manager::get_user_summary(&***db, &requester).await?;
    let (user_id, body) = UserInfoBody::render(summary);

    let mut info = BTreeMap::new();
    info.insert(user_id, body);

    Ok(Json(info))
}
