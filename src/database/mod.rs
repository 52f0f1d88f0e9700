use async_trait::async_trait;

use crate::campaign::db::CampaignStore;
use crate::campaign::{CampaignClass, CampaignRole, CampaignUrn, PrivacyState, RunningState, UserRoleCampaign};
use crate::class::db::ClassStore;
use crate::class::{Class, ClassMember, ClassUrn};
use crate::error::Error;
use crate::survey::db::SurveyResponseStore;
use crate::user::db::UserStore;
use crate::user::UserId;

#[cfg(test)]
pub mod memory;
mod mongo;

pub use mongo::{
    MongoCampaignStore, MongoClassStore, MongoDatabase, MongoSurveyResponseStore,
    MongoUserStore,
};

pub const CAMPAIGNS: &str = "campaign";
pub const CAMPAIGN_CLASSES: &str = "campaign_class";
pub const CLASSES: &str = "class";
pub const CLASS_MEMBERS: &str = "user_class";
pub const SURVEY_RESPONSES: &str = "survey_response";
pub const USERS: &str = "user";
pub const USER_ROLE_CAMPAIGNS: &str = "user_role_campaign";

#[async_trait]
pub trait Database: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignStore;

    fn classes(&self) -> &dyn ClassStore;

    fn users(&self) -> &dyn UserStore;

    fn survey_responses(&self) -> &dyn SurveyResponseStore;

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, Error>;

    async fn drop(&self) -> Result<(), Error>;
}

/// The reads and writes a campaign update performs. Nothing done through a
/// transaction is visible to other readers until `commit` succeeds, and
/// `abort` discards all of it.
#[async_trait]
pub trait Transaction: Send {
    async fn fetch_user_roles_in_campaign(
        &mut self,
        campaign_urn: &CampaignUrn,
        user_id: &UserId,
    ) -> Result<Vec<CampaignRole>, Error>;

    async fn count_survey_responses_by_campaign(
        &mut self,
        campaign_urn: &CampaignUrn,
    ) -> Result<u64, Error>;

    async fn update_campaign_running_state(
        &mut self,
        campaign_urn: &CampaignUrn,
        running_state: RunningState,
    ) -> Result<(), Error>;

    async fn update_campaign_privacy_state(
        &mut self,
        campaign_urn: &CampaignUrn,
        privacy_state: PrivacyState,
    ) -> Result<(), Error>;

    async fn update_campaign_description(
        &mut self,
        campaign_urn: &CampaignUrn,
        description: &str,
    ) -> Result<(), Error>;

    async fn update_campaign_xml(&mut self, campaign_urn: &CampaignUrn, xml: &str)
        -> Result<(), Error>;

    async fn fetch_class_urns_by_campaign(
        &mut self,
        campaign_urn: &CampaignUrn,
    ) -> Result<Vec<ClassUrn>, Error>;

    async fn fetch_class_by_urn(&mut self, class_urn: &ClassUrn) -> Result<Option<Class>, Error>;

    async fn fetch_class_members_by_class(
        &mut self,
        class_urn: &ClassUrn,
    ) -> Result<Vec<ClassMember>, Error>;

    async fn insert_campaign_class(&mut self, campaign_class: &CampaignClass) -> Result<(), Error>;

    async fn delete_campaign_class(&mut self, campaign_class: &CampaignClass) -> Result<(), Error>;

    /// Grants a role; granting a role the user already holds is a no-op.
    async fn insert_user_role_campaign(
        &mut self,
        user_role_campaign: &UserRoleCampaign,
    ) -> Result<(), Error>;

    /// Revokes every role the user holds in the campaign.
    async fn delete_user_role_campaigns(
        &mut self,
        campaign_urn: &CampaignUrn,
        user_id: &UserId,
    ) -> Result<u64, Error>;

    async fn commit(&mut self) -> Result<(), Error>;

    async fn abort(&mut self) -> Result<(), Error>;
}
