use std::convert::TryFrom;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

use super::{Campaign, PrivacyState, RunningState};

/// Search filters as they arrive in a query string. Missing and empty
/// values are both treated as "no filter".
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CampaignSearchQuery {
    pub campaign_urn: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub xml: Option<String>,
    pub authored_by: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub privacy_state: Option<String>,
    pub running_state: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CampaignSearch {
    pub urn: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub xml: Option<String>,
    pub authored_by: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub privacy_state: Option<PrivacyState>,
    pub running_state: Option<RunningState>,
}

impl TryFrom<CampaignSearchQuery> for CampaignSearch {
    type Error = Error;

    fn try_from(query: CampaignSearchQuery) -> Result<CampaignSearch, Error> {
        Ok(CampaignSearch {
            urn: substring(query.campaign_urn),
            name: substring(query.name),
            description: substring(query.description),
            xml: substring(query.xml),
            authored_by: substring(query.authored_by),
            start_date: present(query.start_date)
                .map(|date| parse_date(&date, false))
                .transpose()?,
            end_date: present(query.end_date)
                .map(|date| parse_date(&date, true))
                .transpose()?,
            privacy_state: present(query.privacy_state)
                .map(|state| state.parse())
                .transpose()?,
            running_state: present(query.running_state)
                .map(|state| state.parse())
                .transpose()?,
        })
    }
}

impl CampaignSearch {
    pub fn matches(&self, campaign: &Campaign) -> bool {
        contains(Some(campaign.urn.as_str()), &self.urn)
            && contains(Some(campaign.name.as_str()), &self.name)
            && contains(campaign.description.as_deref(), &self.description)
            && contains(Some(campaign.xml.as_str()), &self.xml)
            && contains(campaign.authored_by.as_deref(), &self.authored_by)
            && self.start_date.map_or(true, |start| campaign.created_at >= start)
            && self.end_date.map_or(true, |end| campaign.created_at <= end)
            && self
                .privacy_state
                .map_or(true, |state| campaign.privacy_state == state)
            && self
                .running_state
                .map_or(true, |state| campaign.running_state == state)
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn substring(value: Option<String>) -> Option<String> {
    present(value).map(|value| value.to_lowercase())
}

fn contains(haystack: Option<&str>, needle: &Option<String>) -> bool {
    match needle {
        None => true,
        Some(needle) => haystack.map_or(false, |haystack| {
            haystack.to_lowercase().contains(needle.as_str())
        }),
    }
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date. A bare date
/// used as an upper bound extends to the last millisecond of that day.
fn parse_date(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, Error> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let invalid = || Error::InvalidDate {
        value: value.to_owned(),
    };
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };

    Ok(Utc.from_utc_datetime(&time.ok_or_else(invalid)?))
}
