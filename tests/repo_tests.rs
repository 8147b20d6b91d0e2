#![cfg(feature = "inmem-store")]

use safai::{
    auth::Role,
    models::*,
    repo::{inmem::InMemRepo, RepoError},
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use safai::repo::{ComplaintRepo, RecyclableItemRepo, UserRepo};
use serial_test::serial;

/// Helper that returns a fresh, empty repository for every test run.
fn repo() -> InMemRepo {
    // isolate state: do **not** persist to the default file path
    std::env::set_var("SAFAI_DATA_DIR", tempfile::tempdir().unwrap().path());
    InMemRepo::new()
}

fn new_complaint(area: &str) -> NewComplaint {
    NewComplaint {
        title: "Overflowing bin".into(),
        description: "Bin has been overflowing for 3 days near the park entrance".into(),
        location: "Park Street".into(),
        coordinates: Some(Coordinates {
            lat: 23.01,
            lng: 72.51,
        }),
        area: area.into(),
        priority: Priority::High,
        image_url: None,
    }
}

#[tokio::test]
#[serial]
async fn upsert_preserves_role_and_area() {
    let r = repo();

    let first = r
        .upsert_user(NewUser {
            subject_id: "officer1".into(),
            email: Some("o1@city.gov".into()),
            first_name: Some("Asha".into()),
            last_name: None,
            avatar_url: None,
        })
        .await
        .unwrap();
    assert_eq!(first.role, Role::User); // first login defaults to user

    // promote and give an area
    r.update_user(
        "officer1",
        UpdateUser {
            role: Some(Role::Officer),
            area: Some("bopal".into()),
        },
    )
    .await
    .unwrap();

    // a later login must not reset role or area
    let again = r
        .upsert_user(NewUser {
            subject_id: "officer1".into(),
            email: Some("o1@city.gov".into()),
            first_name: Some("Asha".into()),
            last_name: Some("Patel".into()),
            avatar_url: None,
        })
        .await
        .unwrap();
    assert_eq!(again.role, Role::Officer);
    assert_eq!(again.area.as_deref(), Some("bopal"));
    assert_eq!(again.last_name.as_deref(), Some("Patel"));

    // unknown subject is a plain NotFound
    assert!(matches!(
        r.get_user("ghost").await.unwrap_err(),
        RepoError::NotFound
    ));
}

#[tokio::test]
#[serial]
async fn complaint_lifecycle_and_idempotent_resolve() {
    let r = repo();

    let c = r
        .create_complaint("citizen1", new_complaint("bopal"))
        .await
        .unwrap();
    assert_eq!(c.status, ComplaintStatus::Pending);
    assert_eq!(c.user_id, "citizen1");
    assert!(c.assigned_to.is_none());

    let resolved = r
        .update_complaint_status(
            c.id,
            "officer1",
            UpdateComplaintStatus {
                status: ComplaintStatus::Resolved,
                notes: Some("bin emptied".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(resolved.status, ComplaintStatus::Resolved);
    assert_eq!(resolved.resolved_by.as_deref(), Some("officer1"));
    let first_stamp = resolved.resolved_at;

    // same status again: no new stamp, no extra records
    let resolved_again = r
        .update_complaint_status(
            c.id,
            "officer2",
            UpdateComplaintStatus {
                status: ComplaintStatus::Resolved,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(resolved_again.resolved_at, first_stamp);
    assert_eq!(resolved_again.resolved_by.as_deref(), Some("officer1"));
    assert_eq!(r.list_complaints().await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn claim_is_conditional_on_unassigned() {
    let r = repo();

    let c = r
        .create_complaint("citizen1", new_complaint("South Bopal"))
        .await
        .unwrap();

    let claimed = r.claim_complaint(c.id, "officer2", "south bopal").await.unwrap();
    assert_eq!(claimed.assigned_to.as_deref(), Some("officer2"));
    assert_eq!(claimed.status, ComplaintStatus::InProgress);
    assert_eq!(claimed.area, "south bopal"); // normalized to the claimer's area
    assert!(claimed.assigned_at.is_some());

    // second claim loses: conflict, first assignment untouched
    let err = r
        .claim_complaint(c.id, "officer1", "bopal")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict));
    let after = r.get_complaint(c.id).await.unwrap();
    assert_eq!(after.assigned_to.as_deref(), Some("officer2"));

    // claiming a missing complaint is NotFound, not Conflict
    let err = r
        .claim_complaint(uuid::Uuid::new_v4(), "officer1", "bopal")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

#[tokio::test]
#[serial]
async fn item_schedule_then_collect() {
    let r = repo();

    let item = r
        .create_item(
            "citizen1",
            NewRecyclableItem {
                name: "Cardboard boxes".into(),
                description: Some("flattened".into()),
                quantity: 4,
                location: "Block C".into(),
                area: "bopal".into(),
                image_url: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(item.status, ItemStatus::Pending);

    let scheduled = r
        .update_item_status(
            item.id,
            "officer1",
            UpdateItemStatus {
                status: ItemStatus::Scheduled,
                notes: Some("pickup friday".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(scheduled.status, ItemStatus::Scheduled);
    assert!(scheduled.schedule_date.is_some());
    assert_eq!(scheduled.collection_notes.as_deref(), Some("pickup friday"));

    let collected = r
        .update_item_status(
            item.id,
            "officer1",
            UpdateItemStatus {
                status: ItemStatus::Collected,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(collected.status, ItemStatus::Collected);
    assert!(collected.collected_at.is_some());
    assert_eq!(collected.collected_by.as_deref(), Some("officer1"));
}

#[tokio::test]
#[serial]
async fn snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("SAFAI_DATA_DIR", dir.path());

    let r = InMemRepo::new();
    r.create_complaint("citizen1", new_complaint("bopal"))
        .await
        .unwrap();
    drop(r);

    // a new repo over the same data dir loads the snapshot
    let r2 = InMemRepo::new();
    assert_eq!(r2.list_complaints().await.unwrap().len(), 1);
}
