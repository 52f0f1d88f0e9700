use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson;

use crate::database::MongoClassStore;
use crate::error::Error;
use crate::user::UserId;

use super::{Class, ClassMember, ClassUrn};

#[async_trait]
pub trait ClassStore: Send + Sync {
    async fn insert_class(&self, class: &Class) -> Result<(), Error>;

    async fn fetch_class_by_urn(&self, class_urn: &ClassUrn) -> Result<Option<Class>, Error>;

    async fn fetch_classes_by_urns(&self, class_urns: &[ClassUrn]) -> Result<Vec<Class>, Error>;

    async fn insert_class_member(&self, member: &ClassMember) -> Result<(), Error>;

    async fn fetch_class_members_by_class(
        &self,
        class_urn: &ClassUrn,
    ) -> Result<Vec<ClassMember>, Error>;

    async fn fetch_class_members_by_user(&self, user_id: &UserId)
        -> Result<Vec<ClassMember>, Error>;
}

#[async_trait]
impl ClassStore for MongoClassStore {
    #[tracing::instrument(skip(self))]
    async fn insert_class(&self, class: &Class) -> Result<(), Error> {
        self.classes.insert_one(class, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_class_by_urn(&self, class_urn: &ClassUrn) -> Result<Option<Class>, Error> {
        let class = self
            .classes
            .find_one(bson::doc! { "_id": class_urn }, None)
            .await?;

        Ok(class)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_classes_by_urns(&self, class_urns: &[ClassUrn]) -> Result<Vec<Class>, Error> {
        let class_urns: Vec<bson::Bson> = class_urns.iter().map(Into::into).collect();

        let classes: Vec<Class> = self
            .classes
            .find(bson::doc! { "_id": { "$in": class_urns } }, None)
            .await?
            .try_collect()
            .await?;

        Ok(classes)
    }

    #[tracing::instrument(skip(self))]
    async fn insert_class_member(&self, member: &ClassMember) -> Result<(), Error> {
        self.class_members.insert_one(member, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_class_members_by_class(
        &self,
        class_urn: &ClassUrn,
    ) -> Result<Vec<ClassMember>, Error> {
        let members: Vec<ClassMember> = self
            .class_members
            .find(bson::doc! { "class_urn": class_urn }, None)
            .await?
            .try_collect()
            .await?;

        Ok(members)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_class_members_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ClassMember>, Error> {
        let members: Vec<ClassMember> = self
            .class_members
            .find(bson::doc! { "user_id": user_id }, None)
            .await?
            .try_collect()
            .await?;

        Ok(members)
    }
}
