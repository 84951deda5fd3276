// Maintenance ticket store. Status is admin-driven; tenant feedback is
// only accepted once a ticket is Completed.

use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};

use crate::{
    errors::{ApiError, Result},
    models::{Maintenance, MaintenanceStatus, Tenant},
};

use super::AppState;

pub async fn create_maintenance_request(
    state: &AppState,
    tenant: &Tenant,
    category: &str,
    description: &str,
    available_date: DateTime,
) -> Result<Maintenance> {
    let mut missing = Vec::new();
    if category.trim().is_empty() {
        missing.push("category".to_string());
    }
    if description.trim().is_empty() {
        missing.push("description".to_string());
    }
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    let request = Maintenance {
        id: None,
        tid: tenant.tid,
        pg_name: tenant.pg_name.clone().unwrap_or_default(),
        room_no: tenant.room_no.clone().unwrap_or_default(),
        mobile_number: tenant.mobile_number.clone().unwrap_or_default(),
        category: category.trim().to_string(),
        description: description.trim().to_string(),
        status: MaintenanceStatus::Pending,
        available_date,
        remarks: None,
        rating: None,
        created_at: DateTime::now(),
    };

    let res = state.maintenance.insert_one(&request).await?;
    let mut created = request;
    created.id = res.inserted_id.as_object_id();
    Ok(created)
}

pub async fn list_maintenance_for_tenant(
    state: &AppState,
    tid: i64,
) -> Result<Vec<Maintenance>> {
    let mut cursor = state.maintenance.find(doc! { "tid": tid }).await?;
    let mut items = Vec::new();
    while let Some(request) = cursor.try_next().await? {
        items.push(request);
    }
    Ok(items)
}

pub async fn list_maintenance(state: &AppState) -> Result<Vec<Maintenance>> {
    let mut cursor = state.maintenance.find(doc! {}).await?;
    let mut items = Vec::new();
    while let Some(request) = cursor.try_next().await? {
        items.push(request);
    }
    Ok(items)
}

pub async fn get_maintenance_by_id(
    state: &AppState,
    id: &ObjectId,
) -> Result<Option<Maintenance>> {
    state
        .maintenance
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn update_maintenance_status(
    state: &AppState,
    id: &ObjectId,
    status: MaintenanceStatus,
) -> Result<Maintenance> {
    let res = state
        .maintenance
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "status": bson::to_bson(&status)? } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(ApiError::NotFound("maintenance request".into()));
    }
    get_maintenance_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("maintenance request".into()))
}

pub async fn update_maintenance_feedback(
    state: &AppState,
    id: &ObjectId,
    tid: i64,
    remarks: &str,
    rating: i32,
) -> Result<Maintenance> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::InvalidInput("rating must be between 1 and 5".into()));
    }

    let request = get_maintenance_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("maintenance request".into()))?;
    if request.tid != tid {
        return Err(ApiError::Forbidden("not your maintenance request".into()));
    }
    if request.status != MaintenanceStatus::Completed {
        return Err(ApiError::InvalidInput(
            "feedback is only accepted on completed requests".into(),
        ));
    }

    state
        .maintenance
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "remarks": remarks, "rating": rating } },
        )
        .await?;
    get_maintenance_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("maintenance request".into()))
}
