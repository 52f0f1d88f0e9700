use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson;

use crate::campaign::UserRoleCampaign;
use crate::database::MongoUserStore;
use crate::error::Error;

use super::{User, UserId};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), Error>;

    async fn fetch_user_by_id(&self, user_id: &UserId) -> Result<Option<User>, Error>;

    async fn fetch_user_role_campaigns_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<UserRoleCampaign>, Error>;
}

#[async_trait]
impl UserStore for MongoUserStore {
    #[tracing::instrument(skip(self))]
    async fn insert_user(&self, user: &User) -> Result<(), Error> {
        self.users.insert_one(user, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_user_by_id(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        let user = self
            .users
            .find_one(bson::doc! { "_id": user_id }, None)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_user_role_campaigns_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<UserRoleCampaign>, Error> {
        let associations: Vec<UserRoleCampaign> = self
            .user_role_campaigns
            .find(bson::doc! { "user_id": user_id }, None)
            .await?
            .try_collect()
            .await?;

        Ok(associations)
    }
}
