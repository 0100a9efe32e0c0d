use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::candidate::{CandidateRecord, DisplayStatus, ScoreCategory};
use crate::services::candidate_service::{CandidateFilter, SortField, SortOrder};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateListQuery {
    pub status: Option<String>,
    pub score: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

fn selected(raw: &Option<String>) -> Option<&str> {
    raw.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl TryFrom<CandidateListQuery> for CandidateFilter {
    type Error = Error;

    fn try_from(q: CandidateListQuery) -> Result<Self> {
        let status = selected(&q.status)
            .map(|s| {
                DisplayStatus::parse(s)
                    .ok_or_else(|| Error::BadRequest(format!("Unknown status filter '{}'", s)))
            })
            .transpose()?;
        let score = selected(&q.score)
            .map(|s| {
                ScoreCategory::parse(s)
                    .ok_or_else(|| Error::BadRequest(format!("Unknown score filter '{}'", s)))
            })
            .transpose()?;
        let sort = match selected(&q.sort) {
            Some(s) => SortField::parse(s)
                .ok_or_else(|| Error::BadRequest(format!("Unknown sort field '{}'", s)))?,
            None => SortField::default(),
        };
        let order = match selected(&q.order) {
            Some(o) => SortOrder::parse(o)
                .ok_or_else(|| Error::BadRequest(format!("Unknown sort order '{}'", o)))?,
            None => SortOrder::default(),
        };
        Ok(CandidateFilter {
            status,
            score,
            search: q.search,
            sort,
            order,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCandidateRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[serde(default, alias = "sendInvite")]
    pub send_invite: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCandidateRequest {
    #[validate(length(min = 1, max = 40))]
    pub status: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
}

/// A record as the dashboard sees it.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateView {
    #[serde(flatten)]
    pub record: CandidateRecord,
    pub display_status: DisplayStatus,
    pub score_category: ScoreCategory,
}

impl From<CandidateRecord> for CandidateView {
    fn from(record: CandidateRecord) -> Self {
        let display_status = record.display_status();
        let score_category = record.result.score_category();
        Self {
            record,
            display_status,
            score_category,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateListResponse {
    pub candidates: Vec<CandidateView>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCandidateResponse {
    pub candidate: CandidateView,
    pub scheduling_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulingLinkResponse {
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_maps_to_filter() {
        let filter = CandidateFilter::try_from(CandidateListQuery {
            status: Some("accepted".into()),
            score: Some("all".into()),
            search: Some("ada".into()),
            sort: Some("name".into()),
            order: Some("asc".into()),
        })
        .unwrap();
        assert_eq!(filter.status, Some(DisplayStatus::Accepted));
        assert_eq!(filter.score, None);
        assert_eq!(filter.sort, SortField::Name);
        assert_eq!(filter.order, SortOrder::Asc);

        let bad = CandidateFilter::try_from(CandidateListQuery {
            sort: Some("shoe_size".into()),
            ..Default::default()
        });
        assert!(matches!(bad, Err(Error::BadRequest(_))));
    }
}
