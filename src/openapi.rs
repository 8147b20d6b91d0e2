use crate::auth::Role;
use crate::models::{
    Complaint, ComplaintStatus, Coordinates, ItemStatus, NewComplaint, NewRecyclableItem, NewUser,
    Priority, RecyclableItem, UpdateComplaintStatus, UpdateItemStatus, UpdateUser, User,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_complaints,
        crate::routes::create_complaint,
        crate::routes::get_complaint,
        crate::routes::update_complaint_status,
        crate::routes::list_items,
        crate::routes::create_item,
        crate::routes::update_item_status,
        crate::routes::officer_dashboard,
        crate::routes::admin_overview,
        crate::routes::admin_set_role,
        crate::routes::auth_me,
        crate::routes::upload_image,
    ),
    components(schemas(
        Complaint, NewComplaint, UpdateComplaintStatus,
        RecyclableItem, NewRecyclableItem, UpdateItemStatus,
        User, NewUser, UpdateUser,
        Coordinates, ComplaintStatus, Priority, ItemStatus, Role,
        crate::routes::OfficerStats, crate::routes::AssignedComplaint,
        crate::routes::OfficerDashboard, crate::routes::ActivityEntry,
        crate::routes::AdminOverview, crate::routes::MeResponse,
        crate::routes::ImageUploadResponse
    )),
    tags(
        (name = "complaints", description = "Complaint filing and triage"),
        (name = "recyclables", description = "Recyclable pickup requests"),
        (name = "officer", description = "Officer dashboard and claiming"),
        (name = "admin", description = "Administration"),
    )
)]
pub struct ApiDoc;
