use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignUrn;
use crate::error::Error;
use crate::typedid::{TypedId, TypedIdMarker};
use crate::user::UserId;

pub mod db;

pub type SurveyResponseId = TypedId<SurveyResponse>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SurveyResponse {
    #[serde(rename = "_id")]
    pub id: SurveyResponseId,
    pub campaign_urn: CampaignUrn,
    pub user_id: UserId,
    pub survey_id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,
    pub responses: Vec<PromptResponse>,
}

impl TypedIdMarker for SurveyResponse {
    fn tag() -> &'static str {
        "SRV"
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoResponse {
    Skipped,
    NotDisplayed,
}

impl NoResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoResponse::Skipped => "SKIPPED",
            NoResponse::NotDisplayed => "NOT_DISPLAYED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING-KEBAB-CASE")]
pub enum PromptValue {
    NoResponse { reason: NoResponse },
    MultiChoiceCustom { choices: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PromptResponse {
    pub prompt_id: String,
    pub repeatable_set_iteration: Option<u32>,
    pub value: PromptValue,
}

impl PromptResponse {
    pub fn no_response(
        prompt_id: String,
        repeatable_set_iteration: Option<u32>,
        reason: NoResponse,
    ) -> PromptResponse {
        PromptResponse {
            prompt_id,
            repeatable_set_iteration,
            value: PromptValue::NoResponse { reason },
        }
    }

    /// A response to a multiple-choice prompt whose choices were entered by
    /// the user. At least one choice is required and none may be blank.
    pub fn multi_choice_custom(
        prompt_id: String,
        repeatable_set_iteration: Option<u32>,
        choices: Vec<String>,
    ) -> Result<PromptResponse, Error> {
        if choices.is_empty() || choices.iter().any(|choice| choice.trim().is_empty()) {
            return Err(Error::InvalidPromptResponse { prompt_id });
        }

        Ok(PromptResponse {
            prompt_id,
            repeatable_set_iteration,
            value: PromptValue::MultiChoiceCustom { choices },
        })
    }

    pub fn response_value(&self) -> String {
        match &self.value {
            PromptValue::NoResponse { reason } => reason.as_str().to_owned(),
            PromptValue::MultiChoiceCustom { choices } => format!("[{}]", choices.join(", ")),
        }
    }
}
