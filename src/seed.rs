use chrono::{Duration, Utc};
use tracing::info;

use crate::campaign::{
    Campaign, CampaignClass, CampaignRole, PrivacyState, RunningState, UserRoleCampaign,
};
use crate::class::{decode_class_member, Class, ClassMember, ClassRole};
use crate::database::Database;
use crate::error::Error;
use crate::survey::{NoResponse, PromptResponse, SurveyResponse, SurveyResponseId};
use crate::urn::{Urn, UrnMarker};
use crate::user::{User, UserId};

const CAMPAIGN_XML: &str = r#"<campaign>
  <campaignUrn>urn:campaign:ca:ucla:Mobilize:Snack</campaignUrn>
  <surveys>
    <survey>
      <id>snack</id>
      <contentList>
        <prompt>
          <id>snacks</id>
          <promptType>multi_choice_custom</promptType>
        </prompt>
        <prompt>
          <id>hunger</id>
          <promptType>number</promptType>
          <skippable>true</skippable>
        </prompt>
      </contentList>
    </survey>
  </surveys>
</campaign>"#;

fn urn<T: UrnMarker>(value: &str) -> Result<Urn<T>, Error> {
    value.parse().map_err(|_| Error::InvalidUrn {
        value: value.to_owned(),
    })
}

fn user(id: &str, admin: bool) -> Result<User, Error> {
    Ok(User {
        id: id.parse()?,
        enabled: true,
        admin,
        new_account: false,
        campaign_creation_privilege: admin,
        created_at: Utc::now(),
    })
}

/// Replaces the contents of the database with a small demonstration data set:
/// one class of each role, a running campaign attached to them and a couple of
/// survey responses.
pub async fn seed(db: &dyn Database) -> Result<(), Error> {
    db.drop().await?;

    let now = Utc::now();
    let campaign_urn = urn("urn:campaign:ca:ucla:Mobilize:Snack")?;
    let teachers_urn = urn("urn:class:ca:ucla:Mobilize:Teachers")?;
    let students_urn = urn("urn:class:ca:ucla:Mobilize:Students")?;
    let author: UserId = "mobilize.author".parse()?;
    let teacher: UserId = "ms.teacher".parse()?;
    let student: UserId = "student.one".parse()?;

    let users = vec![
        user("ohmage.admin", true)?,
        user(author.as_str(), false)?,
        user(teacher.as_str(), false)?,
        user(student.as_str(), false)?,
    ];
    for user in &users {
        db.users().insert_user(user).await?;
    }

    let classes = vec![
        Class {
            urn: teachers_urn.clone(),
            name: "Mobilize Teachers".to_string(),
            description: Some("Teachers taking part in the pilot".to_string()),
        },
        Class {
            urn: students_urn.clone(),
            name: "Mobilize Students".to_string(),
            description: None,
        },
    ];
    for class in &classes {
        db.classes().insert_class(class).await?;
    }

    let members = vec![
        ClassMember::new(teachers_urn.clone(), teacher.clone(), ClassRole::Privileged),
        ClassMember::new(students_urn.clone(), teacher.clone(), ClassRole::Privileged),
        ClassMember::new(students_urn.clone(), student.clone(), ClassRole::Restricted),
    ];
    for member in &members {
        db.classes().insert_class_member(member).await?;
    }

    let campaign = Campaign {
        urn: campaign_urn.clone(),
        name: "Snack Study".to_string(),
        description: Some("What do students eat between meals?".to_string()),
        xml: CAMPAIGN_XML.to_string(),
        running_state: RunningState::Running,
        privacy_state: PrivacyState::Private,
        authored_by: Some("Mobilize".to_string()),
        created_at: now,
        modified_at: now,
    };
    db.campaigns().insert_campaign(&campaign).await?;

    for class_urn in &[teachers_urn, students_urn] {
        let campaign_class = CampaignClass {
            campaign_urn: campaign_urn.clone(),
            class_urn: class_urn.clone(),
        };
        db.campaigns().insert_campaign_class(&campaign_class).await?;
    }

    let mut roles = vec![(author.clone(), CampaignRole::Author)];
    for member in members.iter().cloned() {
        let (user_id, class_role) = decode_class_member(member)?;
        for role in &class_role.campaign_roles() {
            roles.push((user_id.clone(), *role));
        }
    }
    roles.sort();
    roles.dedup();
    for (user_id, role) in roles {
        let association = UserRoleCampaign {
            user_id,
            campaign_urn: campaign_urn.clone(),
            role,
        };
        db.campaigns().insert_user_role_campaign(&association).await?;
    }

    let responses = vec![
        SurveyResponse {
            id: SurveyResponseId::new(),
            campaign_urn: campaign_urn.clone(),
            user_id: student.clone(),
            survey_id: "snack".to_string(),
            submitted_at: now - Duration::hours(2),
            responses: vec![
                PromptResponse::multi_choice_custom(
                    "snacks".to_string(),
                    None,
                    vec!["chips".to_string(), "apple slices".to_string()],
                )?,
                PromptResponse::no_response("hunger".to_string(), None, NoResponse::Skipped),
            ],
        },
        SurveyResponse {
            id: SurveyResponseId::new(),
            campaign_urn: campaign_urn.clone(),
            user_id: student,
            survey_id: "snack".to_string(),
            submitted_at: now - Duration::minutes(20),
            responses: vec![PromptResponse::multi_choice_custom(
                "snacks".to_string(),
                None,
                vec!["granola bar".to_string()],
            )?],
        },
    ];
    for response in &responses {
        db.survey_responses().insert_survey_response(response).await?;
    }

    info!(
        users = users.len(),
        classes = classes.len(),
        responses = responses.len(),
        "seeded database"
    );

    Ok(())
}
