use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::catalog::InvestigationType;
use crate::models::case::AvailableInvestigation;

/// An investigation ordered in a session, with the result disclosed to the
/// learner. At most one order per type per session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvestigationOrder {
    pub session_id: Uuid,
    #[serde(rename = "type")]
    pub kind: InvestigationType,
    pub name: String,
    pub result: BTreeMap<String, serde_json::Value>,
    pub ordered_at: jiff::Timestamp,
}

impl InvestigationOrder {
    pub fn disclose(session_id: Uuid, offered: &AvailableInvestigation) -> Self {
        Self {
            session_id,
            kind: offered.kind,
            name: offered.name.clone(),
            result: offered.result.clone(),
            ordered_at: jiff::Timestamp::now(),
        }
    }
}
