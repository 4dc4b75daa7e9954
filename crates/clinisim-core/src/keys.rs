//! Object key conventions.
//!
//! Pure string functions with no AWS SDK dependency. These define the canonical
//! layout of objects in the clinisim bucket.

use uuid::Uuid;

use crate::catalog::InvestigationType;

pub const CASES_PREFIX: &str = "cases/";

pub fn case(id: Uuid) -> String {
    format!("cases/{id}.json")
}

pub fn session_prefix(id: Uuid) -> String {
    format!("sessions/{id}/")
}

pub fn session(id: Uuid) -> String {
    format!("sessions/{id}/session.json")
}

pub fn transcript(id: Uuid) -> String {
    format!("sessions/{id}/transcript.json")
}

pub fn investigations_prefix(id: Uuid) -> String {
    format!("sessions/{id}/investigations/")
}

pub fn investigation(id: Uuid, kind: InvestigationType) -> String {
    format!("sessions/{id}/investigations/{}.json", kind.code())
}

/// Owner identifiers are opaque; slashes would break prefix listing.
fn owner_segment(owner: &str) -> String {
    owner.replace('/', "%2F")
}

pub fn owner_prefix(owner: &str) -> String {
    format!("owners/{}/", owner_segment(owner))
}

pub fn owner_session_marker(owner: &str, id: Uuid) -> String {
    format!("owners/{}/{id}", owner_segment(owner))
}
