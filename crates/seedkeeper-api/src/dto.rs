//! JSON request/response types, kept separate from domain types.

use chrono::{DateTime, Utc};
use seedkeeper_core::{AutomationActivity, Rule};
use seedkeeper_rules::{PreviewMode, PreviewResult};
use seedkeeper_scheduler::CycleReport;
use seedkeeper_store::ActivityRunPage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `POST /instances/:instance/apply-now` response.
#[derive(Debug, Serialize)]
pub(crate) struct ApplyNowResponse {
    pub(crate) activity_id: Uuid,
    pub(crate) torrents_scanned: usize,
    pub(crate) torrents_matched: usize,
    pub(crate) actions_applied: usize,
}

impl From<CycleReport> for ApplyNowResponse {
    fn from(report: CycleReport) -> Self {
        let actions_applied = report
            .activities
            .iter()
            .filter(|activity| activity.outcome == seedkeeper_core::ActivityOutcome::Success)
            .count();
        Self {
            activity_id: report.activity_id,
            torrents_scanned: report.torrents_scanned,
            torrents_matched: report.torrents_matched,
            actions_applied,
        }
    }
}

/// Which preview semantics a `rules/preview` request wants.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PreviewModeDto {
    /// Every torrent the condition matches, independent of match order.
    #[default]
    Eligible,
    /// The ordered prefix of matches needed to satisfy the rule's `FREE_SPACE` target.
    Needed,
}

impl From<PreviewModeDto> for PreviewMode {
    fn from(mode: PreviewModeDto) -> Self {
        match mode {
            PreviewModeDto::Eligible => Self::Eligible,
            PreviewModeDto::Needed => Self::Needed,
        }
    }
}

fn default_example_limit() -> usize {
    20
}

/// `POST /instances/:instance/rules/preview` request body.
#[derive(Debug, Deserialize)]
pub(crate) struct PreviewRequest {
    pub(crate) rule: Rule,
    #[serde(default)]
    pub(crate) mode: PreviewModeDto,
    #[serde(default = "default_example_limit")]
    pub(crate) example_limit: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct PreviewExampleDto {
    pub(crate) hash: String,
    pub(crate) name: String,
    pub(crate) tracker: String,
}

/// `POST /instances/:instance/rules/preview` response.
#[derive(Debug, Serialize)]
pub(crate) struct PreviewResponse {
    pub(crate) total_matches: usize,
    pub(crate) examples: Vec<PreviewExampleDto>,
}

impl From<PreviewResult> for PreviewResponse {
    fn from(result: PreviewResult) -> Self {
        Self {
            total_matches: result.total_matches,
            examples: result
                .examples
                .into_iter()
                .map(|example| PreviewExampleDto {
                    hash: example.hash,
                    name: example.name,
                    tracker: example.tracker,
                })
                .collect(),
        }
    }
}

/// `GET /instances/:instance/activity/:activity_id` query parameters.
#[derive(Debug, Deserialize)]
pub(crate) struct ActivityRunQuery {
    #[serde(default)]
    pub(crate) offset: usize,
    #[serde(default = "default_activity_limit")]
    pub(crate) limit: usize,
}

fn default_activity_limit() -> usize {
    100
}

/// `GET /instances/:instance/activity/:activity_id` response.
#[derive(Debug, Serialize)]
pub(crate) struct ActivityRunPageDto {
    pub(crate) instance_id: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) total: usize,
    pub(crate) items: Vec<AutomationActivity>,
}

impl From<ActivityRunPage> for ActivityRunPageDto {
    fn from(page: ActivityRunPage) -> Self {
        Self {
            instance_id: page.instance_id,
            created_at: page.created_at,
            total: page.total,
            items: page.items,
        }
    }
}
