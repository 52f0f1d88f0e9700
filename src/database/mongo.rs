use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{self, Bson};
use mongodb::options::{ReadConcern, TransactionOptions, UpdateOptions};
use mongodb::{Client, ClientSession, Collection};

use crate::campaign::db::CampaignStore;
use crate::campaign::{
    Campaign, CampaignClass, CampaignRole, CampaignUrn, PrivacyState, RunningState,
    UserRoleCampaign,
};
use crate::class::db::ClassStore;
use crate::class::{Class, ClassMember, ClassUrn};
use crate::error::Error;
use crate::survey::db::SurveyResponseStore;
use crate::survey::SurveyResponse;
use crate::user::db::UserStore;
use crate::user::{User, UserId};

use super::{
    Database, Transaction, CAMPAIGNS, CAMPAIGN_CLASSES, CLASSES, CLASS_MEMBERS, SURVEY_RESPONSES,
    USERS, USER_ROLE_CAMPAIGNS,
};

#[derive(Debug, Clone)]
pub struct MongoCampaignStore {
    pub(crate) campaigns: Collection<Campaign>,
    pub(crate) campaign_classes: Collection<CampaignClass>,
    pub(crate) user_role_campaigns: Collection<UserRoleCampaign>,
}

#[derive(Debug, Clone)]
pub struct MongoClassStore {
    pub(crate) classes: Collection<Class>,
    pub(crate) class_members: Collection<ClassMember>,
}

#[derive(Debug, Clone)]
pub struct MongoUserStore {
    pub(crate) users: Collection<User>,
    pub(crate) user_role_campaigns: Collection<UserRoleCampaign>,
}

pub type MongoSurveyResponseStore = Collection<SurveyResponse>;

#[derive(Debug, Clone)]
pub struct MongoDatabase {
    campaigns: MongoCampaignStore,
    classes: MongoClassStore,
    users: MongoUserStore,
    survey_responses: MongoSurveyResponseStore,
    client: Client,
    db: mongodb::Database,
}

impl MongoDatabase {
    pub fn new(client: Client, database_name: &str) -> MongoDatabase {
        let db = client.database(database_name);
        MongoDatabase {
            campaigns: MongoCampaignStore {
                campaigns: db.collection(CAMPAIGNS),
                campaign_classes: db.collection(CAMPAIGN_CLASSES),
                user_role_campaigns: db.collection(USER_ROLE_CAMPAIGNS),
            },
            classes: MongoClassStore {
                classes: db.collection(CLASSES),
                class_members: db.collection(CLASS_MEMBERS),
            },
            users: MongoUserStore {
                users: db.collection(USERS),
                user_role_campaigns: db.collection(USER_ROLE_CAMPAIGNS),
            },
            survey_responses: db.collection(SURVEY_RESPONSES),
            client,
            db,
        }
    }

    /// Creates the indexes backing the uniqueness of associations, and with
    /// them any missing collection. Collections cannot be created inside a
    /// transaction, so this runs before serving.
    pub async fn create_indexes(&self) -> Result<(), Error> {
        self.create_index(
            CAMPAIGN_CLASSES,
            bson::doc! { "campaign_urn": 1, "class_urn": 1 },
            "by_campaign_and_class",
        )
        .await?;
        self.create_index(
            USER_ROLE_CAMPAIGNS,
            bson::doc! { "campaign_urn": 1, "user_id": 1, "role": 1 },
            "by_campaign_and_user_and_role",
        )
        .await?;
        self.create_index(
            CLASS_MEMBERS,
            bson::doc! { "class_urn": 1, "user_id": 1 },
            "by_class_and_user",
        )
        .await?;

        self.db
            .run_command(
                bson::doc! {
                    "createIndexes": SURVEY_RESPONSES,
                    "indexes": [
                        { "key": { "campaign_urn": 1, "submitted_at": 1 }, "name": "by_campaign_urn" },
                    ]
                },
                None,
            )
            .await?;

        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        key: bson::Document,
        name: &str,
    ) -> Result<(), Error> {
        self.db
            .run_command(
                bson::doc! {
                    "createIndexes": collection,
                    "indexes": [
                        { "key": key, "name": name, "unique": true },
                    ]
                },
                None,
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl Database for MongoDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        &self.campaigns
    }

    fn classes(&self) -> &dyn ClassStore {
        &self.classes
    }

    fn users(&self) -> &dyn UserStore {
        &self.users
    }

    fn survey_responses(&self) -> &dyn SurveyResponseStore {
        &self.survey_responses
    }

    #[tracing::instrument(skip(self))]
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, Error> {
        let mut session = self.client.start_session(None).await?;
        let options = TransactionOptions::builder()
            .read_concern(ReadConcern::snapshot())
            .build();
        session.start_transaction(options).await?;

        Ok(Box::new(MongoTransaction {
            session,
            campaigns: self.campaigns.campaigns.clone(),
            campaign_classes: self.campaigns.campaign_classes.clone(),
            user_role_campaigns: self.campaigns.user_role_campaigns.clone(),
            classes: self.classes.classes.clone(),
            class_members: self.classes.class_members.clone(),
            survey_responses: self.survey_responses.clone(),
        }))
    }

    async fn drop(&self) -> Result<(), Error> {
        self.db.drop(None).await?;
        Ok(())
    }
}

/// A multi-document transaction bound to one client session. Requires the
/// deployment to be a replica set or sharded cluster.
pub struct MongoTransaction {
    session: ClientSession,
    campaigns: Collection<Campaign>,
    campaign_classes: Collection<CampaignClass>,
    user_role_campaigns: Collection<UserRoleCampaign>,
    classes: Collection<Class>,
    class_members: Collection<ClassMember>,
    survey_responses: Collection<SurveyResponse>,
}

impl MongoTransaction {
    async fn set_campaign_field(
        &mut self,
        campaign_urn: &CampaignUrn,
        field: &str,
        value: Bson,
    ) -> Result<(), Error> {
        let mut changes = bson::Document::new();
        changes.insert(field, value);
        changes.insert("modified_at", bson::DateTime::from_chrono(Utc::now()));

        let result = self
            .campaigns
            .update_one_with_session(
                bson::doc! { "_id": campaign_urn },
                bson::doc! { "$set": changes },
                None,
                &mut self.session,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::CampaignNotFound {
                campaign_urn: campaign_urn.clone(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Transaction for MongoTransaction {
    #[tracing::instrument(skip(self))]
    async fn fetch_user_roles_in_campaign(
        &mut self,
        campaign_urn: &CampaignUrn,
        user_id: &UserId,
    ) -> Result<Vec<CampaignRole>, Error> {
        let mut cursor = self
            .user_role_campaigns
            .find_with_session(
                bson::doc! { "campaign_urn": campaign_urn, "user_id": user_id },
                None,
                &mut self.session,
            )
            .await?;
        let associations: Vec<UserRoleCampaign> =
            cursor.stream(&mut self.session).try_collect().await?;

        Ok(associations.into_iter().map(|urc| urc.role).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn count_survey_responses_by_campaign(
        &mut self,
        campaign_urn: &CampaignUrn,
    ) -> Result<u64, Error> {
        let count = self
            .survey_responses
            .count_documents_with_session(
                bson::doc! { "campaign_urn": campaign_urn },
                None,
                &mut self.session,
            )
            .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_running_state(
        &mut self,
        campaign_urn: &CampaignUrn,
        running_state: RunningState,
    ) -> Result<(), Error> {
        let value = bson::to_bson(&running_state)?;
        self.set_campaign_field(campaign_urn, "running_state", value)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_privacy_state(
        &mut self,
        campaign_urn: &CampaignUrn,
        privacy_state: PrivacyState,
    ) -> Result<(), Error> {
        let value = bson::to_bson(&privacy_state)?;
        self.set_campaign_field(campaign_urn, "privacy_state", value)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_description(
        &mut self,
        campaign_urn: &CampaignUrn,
        description: &str,
    ) -> Result<(), Error> {
        self.set_campaign_field(campaign_urn, "description", description.into())
            .await
    }

    #[tracing::instrument(skip(self, xml))]
    async fn update_campaign_xml(
        &mut self,
        campaign_urn: &CampaignUrn,
        xml: &str,
    ) -> Result<(), Error> {
        self.set_campaign_field(campaign_urn, "xml", xml.into())
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_class_urns_by_campaign(
        &mut self,
        campaign_urn: &CampaignUrn,
    ) -> Result<Vec<ClassUrn>, Error> {
        let mut cursor = self
            .campaign_classes
            .find_with_session(
                bson::doc! { "campaign_urn": campaign_urn },
                None,
                &mut self.session,
            )
            .await?;
        let campaign_classes: Vec<CampaignClass> =
            cursor.stream(&mut self.session).try_collect().await?;

        Ok(campaign_classes.into_iter().map(|cc| cc.class_urn).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_class_by_urn(&mut self, class_urn: &ClassUrn) -> Result<Option<Class>, Error> {
        let class = self
            .classes
            .find_one_with_session(bson::doc! { "_id": class_urn }, None, &mut self.session)
            .await?;

        Ok(class)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_class_members_by_class(
        &mut self,
        class_urn: &ClassUrn,
    ) -> Result<Vec<ClassMember>, Error> {
        let mut cursor = self
            .class_members
            .find_with_session(
                bson::doc! { "class_urn": class_urn },
                None,
                &mut self.session,
            )
            .await?;
        let members: Vec<ClassMember> = cursor.stream(&mut self.session).try_collect().await?;

        Ok(members)
    }

    #[tracing::instrument(skip(self))]
    async fn insert_campaign_class(&mut self, campaign_class: &CampaignClass) -> Result<(), Error> {
        self.campaign_classes
            .insert_one_with_session(campaign_class, None, &mut self.session)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_campaign_class(&mut self, campaign_class: &CampaignClass) -> Result<(), Error> {
        self.campaign_classes
            .delete_one_with_session(
                bson::doc! {
                    "campaign_urn": &campaign_class.campaign_urn,
                    "class_urn": &campaign_class.class_urn,
                },
                None,
                &mut self.session,
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn insert_user_role_campaign(
        &mut self,
        user_role_campaign: &UserRoleCampaign,
    ) -> Result<(), Error> {
        let options = UpdateOptions::builder().upsert(true).build();

        self.user_role_campaigns
            .update_one_with_session(
                bson::doc! {
                    "user_id": &user_role_campaign.user_id,
                    "campaign_urn": &user_role_campaign.campaign_urn,
                    "role": user_role_campaign.role,
                },
                bson::doc! { "$set": { "role": user_role_campaign.role } },
                options,
                &mut self.session,
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user_role_campaigns(
        &mut self,
        campaign_urn: &CampaignUrn,
        user_id: &UserId,
    ) -> Result<u64, Error> {
        let result = self
            .user_role_campaigns
            .delete_many_with_session(
                bson::doc! { "campaign_urn": campaign_urn, "user_id": user_id },
                None,
                &mut self.session,
            )
            .await?;

        Ok(result.deleted_count)
    }

    #[tracing::instrument(skip(self))]
    async fn commit(&mut self) -> Result<(), Error> {
        self.session.commit_transaction().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn abort(&mut self) -> Result<(), Error> {
        self.session.abort_transaction().await?;
        Ok(())
    }
}
