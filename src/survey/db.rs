use async_trait::async_trait;

use crate::database::MongoSurveyResponseStore;
use crate::error::Error;

use super::SurveyResponse;

#[async_trait]
pub trait SurveyResponseStore: Send + Sync {
    async fn insert_survey_response(&self, response: &SurveyResponse) -> Result<(), Error>;
}

#[async_trait]
impl SurveyResponseStore for MongoSurveyResponseStore {
    #[tracing::instrument(skip(self, response), fields(response_id = %response.id))]
    async fn insert_survey_response(&self, response: &SurveyResponse) -> Result<(), Error> {
        self.insert_one(response, None).await?;

        Ok(())
    }
}
