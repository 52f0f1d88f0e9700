use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson;
use mongodb::options::FindOptions;

use crate::class::ClassUrn;
use crate::database::MongoCampaignStore;
use crate::error::Error;
use crate::user::UserId;

use super::{Campaign, CampaignClass, CampaignRole, CampaignUrn, UserRoleCampaign};

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error>;

    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error>;

    async fn fetch_campaigns_by_urns(
        &self,
        campaign_urns: &[CampaignUrn],
    ) -> Result<Vec<Campaign>, Error>;

    async fn fetch_campaign_by_urn(
        &self,
        campaign_urn: &CampaignUrn,
    ) -> Result<Option<Campaign>, Error>;

    async fn insert_campaign_class(&self, campaign_class: &CampaignClass) -> Result<(), Error>;

    async fn fetch_class_urns_by_campaign(
        &self,
        campaign_urn: &CampaignUrn,
    ) -> Result<Vec<ClassUrn>, Error>;

    async fn insert_user_role_campaign(
        &self,
        user_role_campaign: &UserRoleCampaign,
    ) -> Result<(), Error>;

    async fn fetch_user_roles_in_campaign(
        &self,
        campaign_urn: &CampaignUrn,
        user_id: &UserId,
    ) -> Result<Vec<CampaignRole>, Error>;
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    #[tracing::instrument(skip(self))]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        self.campaigns.insert_one(campaign, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let options = FindOptions::builder().sort(bson::doc! { "_id": 1 }).build();

        let campaigns: Vec<Campaign> = self
            .campaigns
            .find(bson::doc! {}, options)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns_by_urns(
        &self,
        campaign_urns: &[CampaignUrn],
    ) -> Result<Vec<Campaign>, Error> {
        let options = FindOptions::builder().sort(bson::doc! { "_id": 1 }).build();
        let campaign_urns: Vec<bson::Bson> = campaign_urns.iter().map(Into::into).collect();

        let campaigns: Vec<Campaign> = self
            .campaigns
            .find(bson::doc! { "_id": { "$in": campaign_urns } }, options)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_by_urn(
        &self,
        campaign_urn: &CampaignUrn,
    ) -> Result<Option<Campaign>, Error> {
        let campaign = self
            .campaigns
            .find_one(bson::doc! { "_id": campaign_urn }, None)
            .await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn insert_campaign_class(&self, campaign_class: &CampaignClass) -> Result<(), Error> {
        self.campaign_classes.insert_one(campaign_class, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_class_urns_by_campaign(
        &self,
        campaign_urn: &CampaignUrn,
    ) -> Result<Vec<ClassUrn>, Error> {
        let campaign_classes: Vec<CampaignClass> = self
            .campaign_classes
            .find(bson::doc! { "campaign_urn": campaign_urn }, None)
            .await?
            .try_collect()
            .await?;

        Ok(campaign_classes.into_iter().map(|cc| cc.class_urn).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn insert_user_role_campaign(
        &self,
        user_role_campaign: &UserRoleCampaign,
    ) -> Result<(), Error> {
        self.user_role_campaigns
            .insert_one(user_role_campaign, None)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_user_roles_in_campaign(
        &self,
        campaign_urn: &CampaignUrn,
        user_id: &UserId,
    ) -> Result<Vec<CampaignRole>, Error> {
        let associations: Vec<UserRoleCampaign> = self
            .user_role_campaigns
            .find(
                bson::doc! { "campaign_urn": campaign_urn, "user_id": user_id },
                None,
            )
            .await?
            .try_collect()
            .await?;

        Ok(associations.into_iter().map(|urc| urc.role).collect())
    }
}
