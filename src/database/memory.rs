use std::io;
use std::sync::{Arc, Mutex};

use actix_web::web::Data;
use async_trait::async_trait;
use chrono::Utc;

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

use super::{Database, Transaction};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryState {
    pub campaigns: Vec<Campaign>,
    pub campaign_classes: Vec<CampaignClass>,
    pub user_role_campaigns: Vec<UserRoleCampaign>,
    pub classes: Vec<Class>,
    pub class_members: Vec<ClassMember>,
    pub users: Vec<User>,
    pub survey_responses: Vec<SurveyResponse>,
}

/// Transaction steps that can be made to fail on demand.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FailPoint {
    UpdateRunningState,
    UpdatePrivacyState,
    UpdateDescription,
    UpdateXml,
    InsertCampaignClass,
    DeleteCampaignClass,
    InsertUserRoleCampaign,
    DeleteUserRoleCampaigns,
    Commit,
}

/// An in-process database for tests. Transactions work on a private copy of
/// the state that replaces the shared state on commit.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
    fail_point: Arc<Mutex<Option<FailPoint>>>,
}

impl MemoryDatabase {
    pub fn new() -> MemoryDatabase {
        MemoryDatabase::default()
    }

    pub fn with_state(state: MemoryState) -> MemoryDatabase {
        MemoryDatabase {
            state: Arc::new(Mutex::new(state)),
            fail_point: Arc::new(Mutex::new(None)),
        }
    }

    /// Registers a handle to this database the way the server registers its
    /// own; the returned data shares state with `self`.
    pub fn into_app_data(self) -> Data<Box<dyn Database>> {
        Data::new(Box::new(self) as Box<dyn Database>)
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().unwrap().clone()
    }

    pub fn fail_on(&self, fail_point: FailPoint) {
        *self.fail_point.lock().unwrap() = Some(fail_point);
    }

    pub fn roles_of(&self, campaign_urn: &CampaignUrn, user_id: &UserId) -> Vec<CampaignRole> {
        let mut roles = roles_in(&self.state.lock().unwrap(), campaign_urn, user_id);
        roles.sort();
        roles
    }
}

fn roles_in(state: &MemoryState, campaign_urn: &CampaignUrn, user_id: &UserId) -> Vec<CampaignRole> {
    state
        .user_role_campaigns
        .iter()
        .filter(|urc| &urc.campaign_urn == campaign_urn && &urc.user_id == user_id)
        .map(|urc| urc.role)
        .collect()
}

fn class_urns_of(state: &MemoryState, campaign_urn: &CampaignUrn) -> Vec<ClassUrn> {
    state
        .campaign_classes
        .iter()
        .filter(|cc| &cc.campaign_urn == campaign_urn)
        .map(|cc| cc.class_urn.clone())
        .collect()
}

fn members_of(state: &MemoryState, class_urn: &ClassUrn) -> Vec<ClassMember> {
    state
        .class_members
        .iter()
        .filter(|m| &m.class_urn == class_urn)
        .cloned()
        .collect()
}

#[async_trait]
impl Database for MemoryDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        self
    }

    fn classes(&self) -> &dyn ClassStore {
        self
    }

    fn users(&self) -> &dyn UserStore {
        self
    }

    fn survey_responses(&self) -> &dyn SurveyResponseStore {
        self
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, Error> {
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.state),
            working: self.snapshot(),
            fail_point: *self.fail_point.lock().unwrap(),
        }))
    }

    async fn drop(&self) -> Result<(), Error> {
        *self.state.lock().unwrap() = MemoryState::default();
        Ok(())
    }
}

#[async_trait]
impl CampaignStore for MemoryDatabase {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        self.state.lock().unwrap().campaigns.push(campaign.clone());
        Ok(())
    }

    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let mut campaigns = self.state.lock().unwrap().campaigns.clone();
        campaigns.sort_by(|a, b| a.urn.cmp(&b.urn));
        Ok(campaigns)
    }

    async fn fetch_campaigns_by_urns(
        &self,
        campaign_urns: &[CampaignUrn],
    ) -> Result<Vec<Campaign>, Error> {
        let campaigns = self.fetch_campaigns().await?;
        Ok(campaigns
            .into_iter()
            .filter(|c| campaign_urns.contains(&c.urn))
            .collect())
    }

    async fn fetch_campaign_by_urn(
        &self,
        campaign_urn: &CampaignUrn,
    ) -> Result<Option<Campaign>, Error> {
        let state = self.state.lock().unwrap();
        Ok(state.campaigns.iter().find(|c| &c.urn == campaign_urn).cloned())
    }

    async fn insert_campaign_class(&self, campaign_class: &CampaignClass) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.campaign_classes.push(campaign_class.clone());
        Ok(())
    }

    async fn fetch_class_urns_by_campaign(
        &self,
        campaign_urn: &CampaignUrn,
    ) -> Result<Vec<ClassUrn>, Error> {
        Ok(class_urns_of(&self.state.lock().unwrap(), campaign_urn))
    }

    async fn insert_user_role_campaign(
        &self,
        user_role_campaign: &UserRoleCampaign,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.user_role_campaigns.push(user_role_campaign.clone());
        Ok(())
    }

    async fn fetch_user_roles_in_campaign(
        &self,
        campaign_urn: &CampaignUrn,
        user_id: &UserId,
    ) -> Result<Vec<CampaignRole>, Error> {
        Ok(roles_in(&self.state.lock().unwrap(), campaign_urn, user_id))
    }
}

#[async_trait]
impl ClassStore for MemoryDatabase {
    async fn insert_class(&self, class: &Class) -> Result<(), Error> {
        self.state.lock().unwrap().classes.push(class.clone());
        Ok(())
    }

    async fn fetch_class_by_urn(&self, class_urn: &ClassUrn) -> Result<Option<Class>, Error> {
        let state = self.state.lock().unwrap();
        Ok(state.classes.iter().find(|c| &c.urn == class_urn).cloned())
    }

    async fn fetch_classes_by_urns(&self, class_urns: &[ClassUrn]) -> Result<Vec<Class>, Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .classes
            .iter()
            .filter(|c| class_urns.contains(&c.urn))
            .cloned()
            .collect())
    }

    async fn insert_class_member(&self, member: &ClassMember) -> Result<(), Error> {
        self.state.lock().unwrap().class_members.push(member.clone());
        Ok(())
    }

    async fn fetch_class_members_by_class(
        &self,
        class_urn: &ClassUrn,
    ) -> Result<Vec<ClassMember>, Error> {
        Ok(members_of(&self.state.lock().unwrap(), class_urn))
    }

    async fn fetch_class_members_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ClassMember>, Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .class_members
            .iter()
            .filter(|m| &m.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryDatabase {
    async fn insert_user(&self, user: &User) -> Result<(), Error> {
        self.state.lock().unwrap().users.push(user.clone());
        Ok(())
    }

    async fn fetch_user_by_id(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| &u.id == user_id).cloned())
    }

    async fn fetch_user_role_campaigns_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<UserRoleCampaign>, Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .user_role_campaigns
            .iter()
            .filter(|urc| &urc.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SurveyResponseStore for MemoryDatabase {
    async fn insert_survey_response(&self, response: &SurveyResponse) -> Result<(), Error> {
        self.state
            .lock()
            .unwrap()
            .survey_responses
            .push(response.clone());
        Ok(())
    }
}

pub struct MemoryTransaction {
    shared: Arc<Mutex<MemoryState>>,
    working: MemoryState,
    fail_point: Option<FailPoint>,
}

impl MemoryTransaction {
    fn check(&self, step: FailPoint) -> Result<(), Error> {
        if self.fail_point == Some(step) {
            let message = format!("injected failure at {:?}", step);
            return Err(Error::IoError(io::Error::new(io::ErrorKind::Other, message)));
        }

        Ok(())
    }

    fn campaign_mut(&mut self, campaign_urn: &CampaignUrn) -> Result<&mut Campaign, Error> {
        let campaign = self
            .working
            .campaigns
            .iter_mut()
            .find(|c| &c.urn == campaign_urn)
            .ok_or_else(|| Error::CampaignNotFound {
                campaign_urn: campaign_urn.clone(),
            })?;
        campaign.modified_at = Utc::now();

        Ok(campaign)
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn fetch_user_roles_in_campaign(
        &mut self,
        campaign_urn: &CampaignUrn,
        user_id: &UserId,
    ) -> Result<Vec<CampaignRole>, Error> {
        Ok(roles_in(&self.working, campaign_urn, user_id))
    }

    async fn count_survey_responses_by_campaign(
        &mut self,
        campaign_urn: &CampaignUrn,
    ) -> Result<u64, Error> {
        Ok(self
            .working
            .survey_responses
            .iter()
            .filter(|r| &r.campaign_urn == campaign_urn)
            .count() as u64)
    }

    async fn update_campaign_running_state(
        &mut self,
        campaign_urn: &CampaignUrn,
        running_state: RunningState,
    ) -> Result<(), Error> {
        self.check(FailPoint::UpdateRunningState)?;
        self.campaign_mut(campaign_urn)?.running_state = running_state;
        Ok(())
    }

    async fn update_campaign_privacy_state(
        &mut self,
        campaign_urn: &CampaignUrn,
        privacy_state: PrivacyState,
    ) -> Result<(), Error> {
        self.check(FailPoint::UpdatePrivacyState)?;
        self.campaign_mut(campaign_urn)?.privacy_state = privacy_state;
        Ok(())
    }

    async fn update_campaign_description(
        &mut self,
        campaign_urn: &CampaignUrn,
        description: &str,
    ) -> Result<(), Error> {
        self.check(FailPoint::UpdateDescription)?;
        self.campaign_mut(campaign_urn)?.description = Some(description.to_owned());
        Ok(())
    }

    async fn update_campaign_xml(
        &mut self,
        campaign_urn: &CampaignUrn,
        xml: &str,
    ) -> Result<(), Error> {
        self.check(FailPoint::UpdateXml)?;
        self.campaign_mut(campaign_urn)?.xml = xml.to_owned();
        Ok(())
    }

    async fn fetch_class_urns_by_campaign(
        &mut self,
        campaign_urn: &CampaignUrn,
    ) -> Result<Vec<ClassUrn>, Error> {
        Ok(class_urns_of(&self.working, campaign_urn))
    }

    async fn fetch_class_by_urn(&mut self, class_urn: &ClassUrn) -> Result<Option<Class>, Error> {
        Ok(self
            .working
            .classes
            .iter()
            .find(|c| &c.urn == class_urn)
            .cloned())
    }

    async fn fetch_class_members_by_class(
        &mut self,
        class_urn: &ClassUrn,
    ) -> Result<Vec<ClassMember>, Error> {
        Ok(members_of(&self.working, class_urn))
    }

    async fn insert_campaign_class(&mut self, campaign_class: &CampaignClass) -> Result<(), Error> {
        self.check(FailPoint::InsertCampaignClass)?;
        if !self.working.campaign_classes.contains(campaign_class) {
            self.working.campaign_classes.push(campaign_class.clone());
        }
        Ok(())
    }

    async fn delete_campaign_class(&mut self, campaign_class: &CampaignClass) -> Result<(), Error> {
        self.check(FailPoint::DeleteCampaignClass)?;
        self.working
            .campaign_classes
            .retain(|cc| cc != campaign_class);
        Ok(())
    }

    async fn insert_user_role_campaign(
        &mut self,
        user_role_campaign: &UserRoleCampaign,
    ) -> Result<(), Error> {
        self.check(FailPoint::InsertUserRoleCampaign)?;
        if !self.working.user_role_campaigns.contains(user_role_campaign) {
            self.working
                .user_role_campaigns
                .push(user_role_campaign.clone());
        }
        Ok(())
    }

    async fn delete_user_role_campaigns(
        &mut self,
        campaign_urn: &CampaignUrn,
        user_id: &UserId,
    ) -> Result<u64, Error> {
        self.check(FailPoint::DeleteUserRoleCampaigns)?;
        let before = self.working.user_role_campaigns.len();
        self.working
            .user_role_campaigns
            .retain(|urc| !(&urc.campaign_urn == campaign_urn && &urc.user_id == user_id));
        Ok((before - self.working.user_role_campaigns.len()) as u64)
    }

    async fn commit(&mut self) -> Result<(), Error> {
        self.check(FailPoint::Commit)?;
        // last commit wins; tests do not run transactions concurrently
        *self.shared.lock().unwrap() = self.working.clone();
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

pub mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::campaign::{
        Campaign, CampaignClass, CampaignRole, PrivacyState, RunningState, UserRoleCampaign,
    };
    use crate::class::{Class, ClassMember, ClassRole};
    use crate::survey::{PromptResponse, SurveyResponse, SurveyResponseId};
    use crate::urn::{Urn, UrnMarker};
    use crate::user::{User, UserId};

    use super::MemoryState;

    pub const CAMPAIGN: &str = "urn:campaign:ucla:test";
    pub const OTHER_CAMPAIGN: &str = "urn:campaign:ucla:other";
    pub const CLASS_A: &str = "urn:class:ucla:a";
    pub const CLASS_B: &str = "urn:class:ucla:b";
    pub const CLASS_C: &str = "urn:class:ucla:c";

    pub const ADMIN: &str = "admin.user";
    pub const SUPERVISOR: &str = "sam.supervisor";
    pub const AUTHOR: &str = "abe.author";
    pub const ANALYST: &str = "ann.analyst";
    pub const OUTSIDER: &str = "out.sider";

    pub fn urn<T: UrnMarker>(urn: &str) -> Urn<T> {
        urn.parse().unwrap()
    }

    pub fn user_id(user_id: &str) -> UserId {
        user_id.parse().unwrap()
    }

    pub fn user(id: &str) -> User {
        User {
            id: user_id(id),
            enabled: true,
            admin: false,
            new_account: false,
            campaign_creation_privilege: false,
            created_at: Utc.ymd(2011, 9, 1).and_hms(12, 0, 0),
        }
    }

    pub fn campaign(campaign_urn: &str, name: &str) -> Campaign {
        let created_at = Utc.ymd(2011, 9, 15).and_hms(8, 30, 0);
        Campaign {
            urn: urn(campaign_urn),
            name: name.to_owned(),
            description: Some("original description".into()),
            xml: "<campaign/>".into(),
            running_state: RunningState::Running,
            privacy_state: PrivacyState::Private,
            authored_by: Some("CENS".into()),
            created_at,
            modified_at: created_at,
        }
    }

    pub fn role(user: &str, campaign_urn: &str, role: CampaignRole) -> UserRoleCampaign {
        UserRoleCampaign {
            user_id: user_id(user),
            campaign_urn: urn(campaign_urn),
            role,
        }
    }

    pub fn response(campaign_urn: &str, user: &str) -> SurveyResponse {
        SurveyResponse {
            id: SurveyResponseId::new(),
            campaign_urn: urn(campaign_urn),
            user_id: user_id(user),
            survey_id: "snack".into(),
            submitted_at: Utc.ymd(2011, 10, 1).and_hms(18, 0, 0),
            responses: vec![PromptResponse::multi_choice_custom(
                "snacks".into(),
                None,
                vec!["chips".into()],
            )
            .unwrap()],
        }
    }

    /// A campaign associated with classes A and B (class C exists but is not
    /// associated), each class holding one privileged and one restricted
    /// member, plus users holding supervisor, author and analyst roles
    /// directly.
    pub fn scenario() -> MemoryState {
        let mut state = MemoryState::default();

        let mut admin = user(ADMIN);
        admin.admin = true;
        state.users.push(admin);
        for name in &[SUPERVISOR, AUTHOR, ANALYST, OUTSIDER] {
            state.users.push(user(name));
        }

        state.campaigns.push(campaign(CAMPAIGN, "Snack Study"));
        state.campaigns.push(campaign(OTHER_CAMPAIGN, "Sleep Study"));

        for (class_urn, prefix) in &[(CLASS_A, "a"), (CLASS_B, "b"), (CLASS_C, "c")] {
            state.classes.push(Class {
                urn: urn(class_urn),
                name: format!("Class {}", prefix.to_uppercase()),
                description: None,
            });

            let privileged = format!("{}.privileged", prefix);
            let restricted = format!("{}.restricted", prefix);
            state.users.push(user(&privileged));
            state.users.push(user(&restricted));
            state.class_members.push(ClassMember::new(
                urn(class_urn),
                user_id(&privileged),
                ClassRole::Privileged,
            ));
            state.class_members.push(ClassMember::new(
                urn(class_urn),
                user_id(&restricted),
                ClassRole::Restricted,
            ));

            if *class_urn != CLASS_C {
                state.campaign_classes.push(CampaignClass {
                    campaign_urn: urn(CAMPAIGN),
                    class_urn: urn(class_urn),
                });
                for r in &ClassRole::Privileged.campaign_roles() {
                    state.user_role_campaigns.push(role(&privileged, CAMPAIGN, *r));
                }
                for r in &ClassRole::Restricted.campaign_roles() {
                    state.user_role_campaigns.push(role(&restricted, CAMPAIGN, *r));
                }
            }
        }

        state
            .user_role_campaigns
            .push(role(SUPERVISOR, CAMPAIGN, CampaignRole::Supervisor));
        state
            .user_role_campaigns
            .push(role(AUTHOR, CAMPAIGN, CampaignRole::Author));
        state
            .user_role_campaigns
            .push(role(ANALYST, CAMPAIGN, CampaignRole::Analyst));
        state
            .user_role_campaigns
            .push(role(SUPERVISOR, OTHER_CAMPAIGN, CampaignRole::Participant));

        state
    }
}
