use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("internal: {0}")]
    Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Upsert by subject id. Profile fields are overwritten on every login;
    /// role and area are preserved for existing rows (first login defaults
    /// to `Role::User`).
    async fn upsert_user(&self, new: NewUser) -> RepoResult<User>;
    async fn get_user(&self, subject: &str) -> RepoResult<User>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn update_user(&self, subject: &str, upd: UpdateUser) -> RepoResult<User>;
}

#[async_trait]
pub trait ComplaintRepo: Send + Sync {
    async fn list_complaints(&self) -> RepoResult<Vec<Complaint>>;
    async fn get_complaint(&self, id: Id) -> RepoResult<Complaint>;
    async fn create_complaint(&self, submitter: &str, new: NewComplaint) -> RepoResult<Complaint>;
    async fn update_complaint_status(
        &self,
        id: Id,
        actor: &str,
        upd: UpdateComplaintStatus,
    ) -> RepoResult<Complaint>;
    /// Claim iff `assigned_to` is still null. A lost race is a `Conflict`,
    /// never a silent overwrite.
    async fn claim_complaint(&self, id: Id, officer: &str, area: &str) -> RepoResult<Complaint>;
}

#[async_trait]
pub trait RecyclableItemRepo: Send + Sync {
    async fn list_items(&self) -> RepoResult<Vec<RecyclableItem>>;
    async fn get_item(&self, id: Id) -> RepoResult<RecyclableItem>;
    async fn create_item(&self, submitter: &str, new: NewRecyclableItem)
        -> RepoResult<RecyclableItem>;
    async fn update_item_status(
        &self,
        id: Id,
        actor: &str,
        upd: UpdateItemStatus,
    ) -> RepoResult<RecyclableItem>;
}

pub trait Repo: UserRepo + ComplaintRepo + RecyclableItemRepo {}

impl<T> Repo for T where T: UserRepo + ComplaintRepo + RecyclableItemRepo {}

/// Status transition for complaints. Stamps only fire on an actual
/// transition, so re-applying the current status is idempotent.
fn apply_complaint_status(
    c: &mut Complaint,
    actor: &str,
    upd: &UpdateComplaintStatus,
    now: DateTime<Utc>,
) {
    if upd.status == ComplaintStatus::Resolved && c.status != ComplaintStatus::Resolved {
        c.resolved_at = Some(now);
        c.resolved_by = Some(actor.to_string());
    }
    if upd.status == ComplaintStatus::Resolved {
        if let Some(notes) = &upd.notes {
            c.resolution_notes = Some(notes.clone());
        }
    }
    c.status = upd.status;
    c.updated_at = now;
}

/// Status transition for recyclable items, same idempotence contract.
fn apply_item_status(
    item: &mut RecyclableItem,
    actor: &str,
    upd: &UpdateItemStatus,
    now: DateTime<Utc>,
) {
    match upd.status {
        ItemStatus::Scheduled if item.status != ItemStatus::Scheduled => {
            item.schedule_date = Some(now);
        }
        ItemStatus::Collected if item.status != ItemStatus::Collected => {
            item.collected_at = Some(now);
            item.collected_by = Some(actor.to_string());
        }
        _ => {}
    }
    if matches!(upd.status, ItemStatus::Scheduled | ItemStatus::Collected) {
        if let Some(notes) = &upd.notes {
            item.collection_notes = Some(notes.clone());
        }
    }
    item.status = upd.status;
    item.updated_at = now;
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};

    const SNAPSHOT_PATH: &str = "data/state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: HashMap<String, User>,
        complaints: HashMap<Id, Complaint>,
        items: HashMap<Id, RecyclableItem>,
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Arc<PathBuf>,
    }

    impl InMemRepo {
        fn data_dir() -> PathBuf {
            std::env::var("SAFAI_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data"))
        }

        fn snapshot_path() -> PathBuf {
            if std::env::var("SAFAI_DATA_DIR").is_ok() {
                let mut p = Self::data_dir();
                p.push("state.json");
                p
            } else {
                PathBuf::from(SNAPSHOT_PATH)
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        log::info!("loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        log::warn!(
                            "failed to parse snapshot '{}': {e}; starting empty",
                            path.display()
                        );
                        State::default()
                    }
                },
                Err(e) => {
                    log::info!("no snapshot at '{}': {e}; starting empty", path.display());
                    State::default()
                }
            }
        }

        fn persist(&self) {
            let path = self.snapshot_path.clone();
            if let Ok(s) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(&*path, s) {
                    log::error!("failed to write snapshot '{}': {e}", path.display());
                }
            }
        }

        pub fn new() -> Self {
            let snapshot_path = Self::snapshot_path();
            let state = Self::load_state_from(&snapshot_path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Arc::new(snapshot_path),
            }
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn upsert_user(&self, new: NewUser) -> RepoResult<User> {
            let mut s = self.state.write().unwrap();
            let now = Utc::now();
            let user = match s.users.get_mut(&new.subject_id) {
                Some(existing) => {
                    existing.email = new.email;
                    existing.first_name = new.first_name;
                    existing.last_name = new.last_name;
                    existing.avatar_url = new.avatar_url;
                    existing.updated_at = now;
                    existing.clone()
                }
                None => {
                    let user = User {
                        id: Id::new_v4(),
                        subject_id: new.subject_id.clone(),
                        email: new.email,
                        first_name: new.first_name,
                        last_name: new.last_name,
                        avatar_url: new.avatar_url,
                        role: crate::auth::Role::User,
                        area: None,
                        created_at: now,
                        updated_at: now,
                    };
                    s.users.insert(new.subject_id, user.clone());
                    user
                }
            };
            drop(s);
            self.persist();
            Ok(user)
        }

        async fn get_user(&self, subject: &str) -> RepoResult<User> {
            let s = self.state.read().unwrap();
            s.users.get(subject).cloned().ok_or(RepoError::NotFound)
        }

        async fn list_users(&self) -> RepoResult<Vec<User>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.users.values().cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(v)
        }

        async fn update_user(&self, subject: &str, upd: UpdateUser) -> RepoResult<User> {
            let mut s = self.state.write().unwrap();
            let user = s.users.get_mut(subject).ok_or(RepoError::NotFound)?;
            if let Some(role) = upd.role {
                user.role = role;
            }
            if let Some(area) = upd.area {
                user.area = Some(area);
            }
            user.updated_at = Utc::now();
            let updated = user.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
    }

    #[async_trait]
    impl ComplaintRepo for InMemRepo {
        async fn list_complaints(&self) -> RepoResult<Vec<Complaint>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.complaints.values().cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at)); // latest first
            Ok(v)
        }

        async fn get_complaint(&self, id: Id) -> RepoResult<Complaint> {
            let s = self.state.read().unwrap();
            s.complaints.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_complaint(
            &self,
            submitter: &str,
            new: NewComplaint,
        ) -> RepoResult<Complaint> {
            let mut s = self.state.write().unwrap();
            let now = Utc::now();
            let complaint = Complaint {
                id: Id::new_v4(),
                title: new.title,
                description: new.description,
                location: new.location,
                coordinates: new.coordinates,
                area: new.area,
                priority: new.priority,
                status: ComplaintStatus::Pending,
                user_id: submitter.to_string(),
                assigned_to: None,
                assigned_at: None,
                resolved_at: None,
                resolved_by: None,
                resolution_notes: None,
                image_url: new.image_url,
                created_at: now,
                updated_at: now,
            };
            s.complaints.insert(complaint.id, complaint.clone());
            drop(s);
            self.persist();
            Ok(complaint)
        }

        async fn update_complaint_status(
            &self,
            id: Id,
            actor: &str,
            upd: UpdateComplaintStatus,
        ) -> RepoResult<Complaint> {
            let mut s = self.state.write().unwrap();
            let complaint = s.complaints.get_mut(&id).ok_or(RepoError::NotFound)?;
            apply_complaint_status(complaint, actor, &upd, Utc::now());
            let updated = complaint.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }

        async fn claim_complaint(
            &self,
            id: Id,
            officer: &str,
            area: &str,
        ) -> RepoResult<Complaint> {
            let mut s = self.state.write().unwrap();
            let complaint = s.complaints.get_mut(&id).ok_or(RepoError::NotFound)?;
            // Checked and written under the same write lock.
            if complaint.assigned_to.is_some() {
                return Err(RepoError::Conflict);
            }
            let now = Utc::now();
            complaint.assigned_to = Some(officer.to_string());
            complaint.assigned_at = Some(now);
            complaint.status = ComplaintStatus::InProgress;
            complaint.area = area.to_string();
            complaint.updated_at = now;
            let claimed = complaint.clone();
            drop(s);
            self.persist();
            Ok(claimed)
        }
    }

    #[async_trait]
    impl RecyclableItemRepo for InMemRepo {
        async fn list_items(&self) -> RepoResult<Vec<RecyclableItem>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.items.values().cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(v)
        }

        async fn get_item(&self, id: Id) -> RepoResult<RecyclableItem> {
            let s = self.state.read().unwrap();
            s.items.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_item(
            &self,
            submitter: &str,
            new: NewRecyclableItem,
        ) -> RepoResult<RecyclableItem> {
            let mut s = self.state.write().unwrap();
            let now = Utc::now();
            let item = RecyclableItem {
                id: Id::new_v4(),
                name: new.name,
                description: new.description,
                quantity: new.quantity,
                location: new.location,
                area: new.area,
                status: ItemStatus::Pending,
                user_id: submitter.to_string(),
                image_url: new.image_url,
                collection_notes: None,
                schedule_date: None,
                collected_at: None,
                collected_by: None,
                created_at: now,
                updated_at: now,
            };
            s.items.insert(item.id, item.clone());
            drop(s);
            self.persist();
            Ok(item)
        }

        async fn update_item_status(
            &self,
            id: Id,
            actor: &str,
            upd: UpdateItemStatus,
        ) -> RepoResult<RecyclableItem> {
            let mut s = self.state.write().unwrap();
            let item = s.items.get_mut(&id).ok_or(RepoError::NotFound)?;
            apply_item_status(item, actor, &upd, Utc::now());
            let updated = item.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use crate::auth::Role;
    use sqlx::postgres::PgRow;
    use sqlx::{FromRow, Pool, Postgres, Row};

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }
    }

    fn db_err(e: sqlx::Error) -> RepoError {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(ref d) if d.is_unique_violation() => RepoError::Conflict,
            other => RepoError::Internal(other.to_string()),
        }
    }

    // Coordinates live in two nullable columns; both present or neither.
    impl FromRow<'_, PgRow> for Complaint {
        fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
            let lat: Option<f64> = row.try_get("lat")?;
            let lng: Option<f64> = row.try_get("lng")?;
            Ok(Complaint {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                location: row.try_get("location")?,
                coordinates: match (lat, lng) {
                    (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
                    _ => None,
                },
                area: row.try_get("area")?,
                priority: row.try_get("priority")?,
                status: row.try_get("status")?,
                user_id: row.try_get("user_id")?,
                assigned_to: row.try_get("assigned_to")?,
                assigned_at: row.try_get("assigned_at")?,
                resolved_at: row.try_get("resolved_at")?,
                resolved_by: row.try_get("resolved_by")?,
                resolution_notes: row.try_get("resolution_notes")?,
                image_url: row.try_get("image_url")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        }
    }

    const COMPLAINT_COLS: &str = "id, title, description, location, lat, lng, area, priority, \
         status, user_id, assigned_to, assigned_at, resolved_at, resolved_by, resolution_notes, \
         image_url, created_at, updated_at";

    const ITEM_COLS: &str = "id, name, description, quantity, location, area, status, user_id, \
         image_url, collection_notes, schedule_date, collected_at, collected_by, created_at, \
         updated_at";

    const USER_COLS: &str =
        "id, subject_id, email, first_name, last_name, avatar_url, role, area, created_at, \
         updated_at";

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn upsert_user(&self, new: NewUser) -> RepoResult<User> {
            let sql = format!(
                "INSERT INTO users (id, subject_id, email, first_name, last_name, avatar_url, role) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (subject_id) DO UPDATE SET \
                   email = EXCLUDED.email, first_name = EXCLUDED.first_name, \
                   last_name = EXCLUDED.last_name, avatar_url = EXCLUDED.avatar_url, \
                   updated_at = now() \
                 RETURNING {USER_COLS}"
            );
            sqlx::query_as::<_, User>(&sql)
                .bind(Id::new_v4())
                .bind(&new.subject_id)
                .bind(&new.email)
                .bind(&new.first_name)
                .bind(&new.last_name)
                .bind(&new.avatar_url)
                .bind(Role::User)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn get_user(&self, subject: &str) -> RepoResult<User> {
            let sql = format!("SELECT {USER_COLS} FROM users WHERE subject_id = $1");
            sqlx::query_as::<_, User>(&sql)
                .bind(subject)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn list_users(&self) -> RepoResult<Vec<User>> {
            let sql = format!("SELECT {USER_COLS} FROM users ORDER BY created_at DESC");
            sqlx::query_as::<_, User>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn update_user(&self, subject: &str, upd: UpdateUser) -> RepoResult<User> {
            let sql = format!(
                "UPDATE users SET role = COALESCE($2, role), area = COALESCE($3, area), \
                 updated_at = now() WHERE subject_id = $1 RETURNING {USER_COLS}"
            );
            sqlx::query_as::<_, User>(&sql)
                .bind(subject)
                .bind(upd.role)
                .bind(upd.area)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }
    }

    #[async_trait]
    impl ComplaintRepo for PgRepo {
        async fn list_complaints(&self) -> RepoResult<Vec<Complaint>> {
            let sql =
                format!("SELECT {COMPLAINT_COLS} FROM complaints ORDER BY created_at DESC");
            sqlx::query_as::<_, Complaint>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn get_complaint(&self, id: Id) -> RepoResult<Complaint> {
            let sql = format!("SELECT {COMPLAINT_COLS} FROM complaints WHERE id = $1");
            sqlx::query_as::<_, Complaint>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn create_complaint(
            &self,
            submitter: &str,
            new: NewComplaint,
        ) -> RepoResult<Complaint> {
            let sql = format!(
                "INSERT INTO complaints \
                 (id, title, description, location, lat, lng, area, priority, status, user_id, image_url) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, $10) \
                 RETURNING {COMPLAINT_COLS}"
            );
            sqlx::query_as::<_, Complaint>(&sql)
                .bind(Id::new_v4())
                .bind(&new.title)
                .bind(&new.description)
                .bind(&new.location)
                .bind(new.coordinates.map(|c| c.lat))
                .bind(new.coordinates.map(|c| c.lng))
                .bind(&new.area)
                .bind(new.priority)
                .bind(submitter)
                .bind(&new.image_url)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn update_complaint_status(
            &self,
            id: Id,
            actor: &str,
            upd: UpdateComplaintStatus,
        ) -> RepoResult<Complaint> {
            // Stamps fire only on an actual transition, keeping the
            // operation idempotent.
            let sql = format!(
                "UPDATE complaints SET \
                   resolved_at = CASE WHEN $2 = 'resolved'::complaint_status \
                     AND status <> 'resolved'::complaint_status THEN now() ELSE resolved_at END, \
                   resolved_by = CASE WHEN $2 = 'resolved'::complaint_status \
                     AND status <> 'resolved'::complaint_status THEN $3 ELSE resolved_by END, \
                   resolution_notes = CASE WHEN $2 = 'resolved'::complaint_status \
                     THEN COALESCE($4, resolution_notes) ELSE resolution_notes END, \
                   status = $2, updated_at = now() \
                 WHERE id = $1 RETURNING {COMPLAINT_COLS}"
            );
            sqlx::query_as::<_, Complaint>(&sql)
                .bind(id)
                .bind(upd.status)
                .bind(actor)
                .bind(&upd.notes)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn claim_complaint(
            &self,
            id: Id,
            officer: &str,
            area: &str,
        ) -> RepoResult<Complaint> {
            let sql = format!(
                "UPDATE complaints SET assigned_to = $2, assigned_at = now(), \
                   status = 'in-progress', area = $3, updated_at = now() \
                 WHERE id = $1 AND assigned_to IS NULL RETURNING {COMPLAINT_COLS}"
            );
            let claimed = sqlx::query_as::<_, Complaint>(&sql)
                .bind(id)
                .bind(officer)
                .bind(area)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
            match claimed {
                Some(c) => Ok(c),
                // Distinguish a lost race from a missing row.
                None => match self.get_complaint(id).await {
                    Ok(_) => Err(RepoError::Conflict),
                    Err(e) => Err(e),
                },
            }
        }
    }

    #[async_trait]
    impl RecyclableItemRepo for PgRepo {
        async fn list_items(&self) -> RepoResult<Vec<RecyclableItem>> {
            let sql =
                format!("SELECT {ITEM_COLS} FROM recyclable_items ORDER BY created_at DESC");
            sqlx::query_as::<_, RecyclableItem>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn get_item(&self, id: Id) -> RepoResult<RecyclableItem> {
            let sql = format!("SELECT {ITEM_COLS} FROM recyclable_items WHERE id = $1");
            sqlx::query_as::<_, RecyclableItem>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn create_item(
            &self,
            submitter: &str,
            new: NewRecyclableItem,
        ) -> RepoResult<RecyclableItem> {
            let sql = format!(
                "INSERT INTO recyclable_items \
                 (id, name, description, quantity, location, area, status, user_id, image_url) \
                 VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8) \
                 RETURNING {ITEM_COLS}"
            );
            sqlx::query_as::<_, RecyclableItem>(&sql)
                .bind(Id::new_v4())
                .bind(&new.name)
                .bind(&new.description)
                .bind(new.quantity)
                .bind(&new.location)
                .bind(&new.area)
                .bind(submitter)
                .bind(&new.image_url)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }

        async fn update_item_status(
            &self,
            id: Id,
            actor: &str,
            upd: UpdateItemStatus,
        ) -> RepoResult<RecyclableItem> {
            let sql = format!(
                "UPDATE recyclable_items SET \
                   schedule_date = CASE WHEN $2 = 'scheduled'::item_status \
                     AND status <> 'scheduled'::item_status THEN now() ELSE schedule_date END, \
                   collected_at = CASE WHEN $2 = 'collected'::item_status \
                     AND status <> 'collected'::item_status THEN now() ELSE collected_at END, \
                   collected_by = CASE WHEN $2 = 'collected'::item_status \
                     AND status <> 'collected'::item_status THEN $3 ELSE collected_by END, \
                   collection_notes = CASE WHEN $2 IN ('scheduled'::item_status, 'collected'::item_status) \
                     THEN COALESCE($4, collection_notes) ELSE collection_notes END, \
                   status = $2, updated_at = now() \
                 WHERE id = $1 RETURNING {ITEM_COLS}"
            );
            sqlx::query_as::<_, RecyclableItem>(&sql)
                .bind(id)
                .bind(upd.status)
                .bind(actor)
                .bind(&upd.notes)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complaint(status: ComplaintStatus) -> Complaint {
        let now = Utc::now();
        Complaint {
            id: Id::new_v4(),
            title: "t".into(),
            description: "d".into(),
            location: "l".into(),
            coordinates: None,
            area: "bopal".into(),
            priority: Priority::Medium,
            status,
            user_id: "u1".into(),
            assigned_to: None,
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
    fn resolve_stamps_once() {
        let mut c = complaint(ComplaintStatus::InProgress);
        let upd = UpdateComplaintStatus {
            status: ComplaintStatus::Resolved,
            notes: Some("fixed".into()),
        };
        let t1 = Utc::now();
        apply_complaint_status(&mut c, "officer1", &upd, t1);
        assert_eq!(c.status, ComplaintStatus::Resolved);
        assert_eq!(c.resolved_at, Some(t1));
        assert_eq!(c.resolved_by.as_deref(), Some("officer1"));
        assert_eq!(c.resolution_notes.as_deref(), Some("fixed"));

        // Re-applying the same status must not restamp.
        let t2 = t1 + chrono::Duration::seconds(30);
        apply_complaint_status(&mut c, "officer2", &upd, t2);
        assert_eq!(c.resolved_at, Some(t1));
        assert_eq!(c.resolved_by.as_deref(), Some("officer1"));
    }

    #[test]
    fn collected_stamps_actor() {
        let now = Utc::now();
        let mut item = RecyclableItem {
            id: Id::new_v4(),
            name: "cardboard".into(),
            description: None,
            quantity: 3,
            location: "park street".into(),
            area: "bopal".into(),
            status: ItemStatus::Scheduled,
            user_id: "u1".into(),
            image_url: None,
            collection_notes: None,
            schedule_date: Some(now),
            collected_at: None,
            collected_by: None,
            created_at: now,
            updated_at: now,
        };
        let upd = UpdateItemStatus {
            status: ItemStatus::Collected,
            notes: Some("picked up".into()),
        };
        apply_item_status(&mut item, "officer1", &upd, now);
        assert_eq!(item.status, ItemStatus::Collected);
        assert_eq!(item.collected_by.as_deref(), Some("officer1"));
        assert_eq!(item.collection_notes.as_deref(), Some("picked up"));
    }
}
