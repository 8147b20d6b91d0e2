//! Area-based routing: which records a caller may see, and which
//! unassigned complaints an officer's dashboard claims for them.
//!
//! Area values are free text entered by citizens and officers alike, so
//! matching is deliberately lenient — with one carve-out that keeps
//! adjacent zones ("bopal" vs "south bopal") from bleeding into each
//! other.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::auth::Role;
use crate::models::{Complaint, ComplaintStatus, RecyclableItem, User};
use crate::repo::{ComplaintRepo, RepoError, RepoResult};

/// Demo-environment fallback mapping, overridable via
/// `SAFAI_AREA_FALLBACKS` ("subject=area" pairs, comma separated).
static DEFAULT_FALLBACKS: Lazy<HashMap<String, String>> =
    Lazy::new(|| parse_fallbacks("officer1=bopal,officer2=south bopal"));

const DEFAULT_CLAIM_CAP: usize = 5;

/// Area an officer resolves to when neither their user row nor the
/// fallback table names one. Matches nothing.
pub const UNASSIGNED_AREA: &str = "unassigned";

#[derive(Clone, Debug)]
pub struct AssignmentConfig {
    /// Max complaints a single dashboard load may claim.
    pub claim_cap: usize,
    pub fallback_areas: HashMap<String, String>,
}

impl AssignmentConfig {
    pub fn from_env() -> Self {
        let claim_cap = std::env::var("SAFAI_CLAIM_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CLAIM_CAP);
        let fallback_areas = match std::env::var("SAFAI_AREA_FALLBACKS") {
            Ok(raw) => parse_fallbacks(&raw),
            Err(_) => DEFAULT_FALLBACKS.clone(),
        };
        Self {
            claim_cap,
            fallback_areas,
        }
    }
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            claim_cap: DEFAULT_CLAIM_CAP,
            fallback_areas: DEFAULT_FALLBACKS.clone(),
        }
    }
}

fn parse_fallbacks(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (subject, area) = pair.split_once('=')?;
            let (subject, area) = (subject.trim(), area.trim());
            if subject.is_empty() || area.is_empty() {
                return None;
            }
            Some((subject.to_string(), area.to_string()))
        })
        .collect()
}

/// Resolve the zone an officer covers: their stored `area` if non-blank,
/// else the configured per-subject fallback, else [`UNASSIGNED_AREA`].
pub fn resolve_officer_area(user: Option<&User>, cfg: &AssignmentConfig) -> String {
    if let Some(user) = user {
        if let Some(area) = &user.area {
            if !area.trim().is_empty() {
                return area.clone();
            }
        }
        if let Some(area) = cfg.fallback_areas.get(&user.subject_id) {
            return area.clone();
        }
    }
    UNASSIGNED_AREA.to_string()
}

/// Two-level area match: exact case-insensitive equality, else substring
/// containment in either direction. Containment does not cross the
/// "south" boundary — "south bopal" contains "bopal" but they are
/// distinct zones.
pub fn area_matches(record_area: &str, officer_area: &str) -> bool {
    let record = record_area.trim().to_lowercase();
    let officer = officer_area.trim().to_lowercase();
    if record.is_empty() || officer.is_empty() {
        return false;
    }
    if record == officer {
        return true;
    }
    if record.contains(&officer) || officer.contains(&record) {
        return record.contains("south") == officer.contains("south");
    }
    false
}

/// A record that can be routed by area. Lets the visibility rule apply
/// uniformly to complaints and recyclable items.
pub trait AreaRecord {
    fn record_area(&self) -> &str;
    fn assignee(&self) -> Option<&str>;
    fn submitter(&self) -> &str;
}

impl AreaRecord for Complaint {
    fn record_area(&self) -> &str {
        &self.area
    }
    fn assignee(&self) -> Option<&str> {
        self.assigned_to.as_deref()
    }
    fn submitter(&self) -> &str {
        &self.user_id
    }
}

impl AreaRecord for RecyclableItem {
    fn record_area(&self) -> &str {
        &self.area
    }
    fn assignee(&self) -> Option<&str> {
        self.collected_by.as_deref()
    }
    fn submitter(&self) -> &str {
        &self.user_id
    }
}

/// Single-record visibility rule:
/// - admins see everything;
/// - officers see their own assignments, anything in their area, and any
///   unclaimed record;
/// - users see only what they submitted.
pub fn can_view<T: AreaRecord>(record: &T, role: Role, subject: &str, officer_area: &str) -> bool {
    match role {
        Role::Admin => true,
        Role::Officer => {
            record.assignee() == Some(subject)
                || area_matches(record.record_area(), officer_area)
                || record.assignee().is_none()
        }
        Role::User => record.submitter() == subject,
    }
}

/// Role-scoped filtering of a full record list.
pub fn visible_for<T: AreaRecord>(
    records: Vec<T>,
    role: Role,
    subject: &str,
    officer_area: &str,
) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| can_view(r, role, subject, officer_area))
        .collect()
}

/// Dashboard-load auto-claim. Only fires when the officer has no open
/// assignment; prefers area-matching complaints and falls back to any
/// unassigned one, claiming at most `claim_cap`. Each claim is a
/// conditional update — a lost race is logged and skipped, never rolled
/// back.
pub async fn auto_claim<R: ComplaintRepo + ?Sized>(
    repo: &R,
    officer: &str,
    officer_area: &str,
    cfg: &AssignmentConfig,
) -> RepoResult<Vec<Complaint>> {
    let all = repo.list_complaints().await?;

    let open_assigned = all
        .iter()
        .filter(|c| {
            c.assigned_to.as_deref() == Some(officer) && c.status != ComplaintStatus::Resolved
        })
        .count();
    if open_assigned > 0 {
        return Ok(Vec::new());
    }

    let unassigned_open =
        |c: &&Complaint| c.assigned_to.is_none() && c.status != ComplaintStatus::Resolved;

    let mut candidates: Vec<&Complaint> = all
        .iter()
        .filter(unassigned_open)
        .filter(|c| area_matches(&c.area, officer_area))
        .collect();
    if candidates.is_empty() {
        candidates = all.iter().filter(unassigned_open).collect();
    }

    let mut claimed = Vec::new();
    for candidate in candidates.into_iter().take(cfg.claim_cap) {
        match repo.claim_complaint(candidate.id, officer, officer_area).await {
            Ok(complaint) => {
                info!(complaint_id = %complaint.id, officer, "claimed complaint");
                metrics::increment_counter!("safai_claims_total");
                claimed.push(complaint);
            }
            Err(RepoError::Conflict) => {
                // Another officer session got there first.
                warn!(complaint_id = %candidate.id, officer, "claim lost to concurrent session");
                metrics::increment_counter!("safai_claims_lost_total");
            }
            Err(e) => {
                warn!(complaint_id = %candidate.id, officer, error = %e, "claim failed");
            }
        }
    }
    Ok(claimed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn complaint(area: &str, user: &str, assigned: Option<&str>) -> Complaint {
        let now = Utc::now();
        Complaint {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: "d".into(),
            location: "l".into(),
            coordinates: None,
            area: area.into(),
            priority: crate::models::Priority::Low,
            status: ComplaintStatus::Pending,
            user_id: user.into(),
            assigned_to: assigned.map(str::to_string),
            assigned_at: None,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn exact_match_ignores_case() {
        assert!(area_matches("South Bopal", "south bopal"));
        assert!(area_matches("BOPAL", "bopal"));
    }

    #[test]
    fn containment_matches_both_directions() {
        assert!(area_matches("bopal east", "bopal"));
        assert!(area_matches("bopal", "bopal east"));
    }

    #[test]
    fn south_carveout_separates_zones() {
        assert!(!area_matches("South Bopal", "bopal"));
        assert!(!area_matches("bopal", "south bopal"));
        assert!(area_matches("south bopal sector 2", "south bopal"));
    }

    #[test]
    fn blank_areas_never_match() {
        assert!(!area_matches("", "bopal"));
        assert!(!area_matches("bopal", "  "));
    }

    #[test]
    fn unrelated_areas_do_not_match() {
        assert!(!area_matches("maninagar", "bopal"));
    }

    #[test]
    fn user_sees_only_own_records() {
        let records = vec![
            complaint("bopal", "alice", None),
            complaint("bopal", "bob", None),
        ];
        let visible = visible_for(records, Role::User, "alice", "");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].user_id, "alice");
    }

    #[test]
    fn officer_sees_assigned_area_and_unclaimed() {
        let records = vec![
            complaint("south bopal", "a", Some("officer2")), // assigned to them
            complaint("south bopal", "b", Some("officer9")), // area match
            complaint("maninagar", "c", None),               // unclaimed
            complaint("maninagar", "d", Some("officer9")),   // none of the above
        ];
        let visible = visible_for(records, Role::Officer, "officer2", "south bopal");
        assert_eq!(visible.len(), 3);
    }

    #[test]
    fn admin_sees_everything() {
        let records = vec![
            complaint("bopal", "a", None),
            complaint("maninagar", "b", Some("officer9")),
        ];
        assert_eq!(visible_for(records, Role::Admin, "root", "").len(), 2);
    }

    #[test]
    fn fallback_area_used_when_row_blank() {
        let cfg = AssignmentConfig::default();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            subject_id: "officer2".into(),
            email: None,
            first_name: None,
            last_name: None,
            avatar_url: None,
            role: Role::Officer,
            area: Some("  ".into()),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(resolve_officer_area(Some(&user), &cfg), "south bopal");
        assert_eq!(resolve_officer_area(None, &cfg), UNASSIGNED_AREA);
    }

    #[test]
    fn fallback_parser_skips_malformed_pairs() {
        let parsed = parse_fallbacks("a=x, b = y ,broken,=z");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("b").map(String::as_str), Some("y"));
    }
}
