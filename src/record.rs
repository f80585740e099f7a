//! Remote call records
//!
//! Snapshot of one call as listed by the status source, plus the selection
//! rules used to pick the call a report belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const ENDED_STATUS: &str = "ended";

/// One call record as returned by the status source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_reason: Option<String>,
}

impl RemoteRecord {
    /// A call is terminal once its status is "ended" or it carries an end time
    pub fn is_terminal(&self) -> bool {
        self.status == ENDED_STATUS || self.ended_at.is_some()
    }

    /// Most meaningful timestamp for recency ordering
    pub fn best_timestamp(&self) -> DateTime<Utc> {
        self.updated_at.or(self.ended_at).unwrap_or(self.created_at)
    }
}

/// Some listings send `"status": null` for calls that only carry `endedAt`
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Pick the candidate record for this poll cycle.
///
/// With a pinned target the record with that id is returned whatever its
/// state. Without one, the most recently concluded terminal record wins;
/// equal timestamps fall back to the smaller id.
pub fn select_candidate<'a>(records: &'a [RemoteRecord], target_id: Option<&str>) -> Option<&'a RemoteRecord> {
    match target_id {
        Some(target) => records.iter().find(|r| r.id == target),
        None => records
            .iter()
            .filter(|r| r.is_terminal())
            .min_by(|a, b| {
                b.best_timestamp()
                    .cmp(&a.best_timestamp())
                    .then_with(|| a.id.cmp(&b.id))
            }),
    }
}
