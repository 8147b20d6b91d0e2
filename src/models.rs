use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub type Id = Uuid;

/// External identity-provider subject id. Opaque string, never parsed.
pub type SubjectId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "complaint_status", rename_all = "kebab-case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "complaint_priority", rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Working-days window before a complaint of this priority is due.
    pub fn due_days(self) -> i64 {
        match self {
            Priority::Low => 7,
            Priority::Medium => 5,
            Priority::High => 3,
            Priority::Critical => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "item_status", rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Scheduled,
    Collected,
    Cancelled,
}

/// Map pin selected in the submission wizard. `(0, 0)` is the unset
/// sentinel the client sends before a pin is dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn is_unset(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub subject_id: SubjectId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: crate::auth::Role,
    /// Free-text zone the officer covers. Inconsistently populated; see
    /// `assignment::resolve_officer_area` for the fallback chain.
    pub area: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile payload synced from the identity provider on login. The role is
/// deliberately absent: roles are assigned server-side, never taken from
/// provider metadata.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewUser {
    pub subject_id: SubjectId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateUser {
    pub role: Option<crate::auth::Role>,
    pub area: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Complaint {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    /// Free-text routing key matched against officer areas.
    pub area: String,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub user_id: SubjectId,
    pub assigned_to: Option<SubjectId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<SubjectId>,
    pub resolution_notes: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    /// Due date derived from creation time and priority.
    pub fn due_by(&self) -> DateTime<Utc> {
        self.created_at + chrono::Duration::days(self.priority.due_days())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComplaint {
    pub title: String,
    pub description: String,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub area: String,
    pub priority: Priority,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateComplaintStatus {
    pub status: ComplaintStatus,
    /// Stored as resolution notes when the target status is `resolved`.
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct RecyclableItem {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub location: String,
    pub area: String,
    pub status: ItemStatus,
    pub user_id: SubjectId,
    pub image_url: Option<String>,
    pub collection_notes: Option<String>,
    pub schedule_date: Option<DateTime<Utc>>,
    pub collected_at: Option<DateTime<Utc>>,
    pub collected_by: Option<SubjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewRecyclableItem {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub location: String,
    pub area: String,
    /// Mandatory at the HTTP layer: pickup crews need a photo of the items.
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateItemStatus {
    pub status: ItemStatus,
    pub notes: Option<String>,
}
