// Admin account store and credential checks for both login paths.

use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};

use crate::{
    auth::{hash_password, verify_password},
    errors::{ApiError, Result, is_duplicate_key},
    models::{Admin, Role, Tenant},
};

use super::{AppState, find_tenant_by_identifier};

pub async fn create_admin(
    state: &AppState,
    email: &str,
    name: &str,
    password: &str,
) -> Result<Admin> {
    let mut missing = Vec::new();
    for (value, field) in [(email, "email"), (name, "name"), (password, "password")] {
        if value.trim().is_empty() {
            missing.push(field.to_string());
        }
    }
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    let admin = Admin {
        id: None,
        email: email.trim().to_string(),
        name: name.trim().to_string(),
        password: hash_password(password)?,
        role: Role::Admin,
        created_at: DateTime::now(),
    };

    let res = state.admins.insert_one(&admin).await.map_err(|err| {
        if is_duplicate_key(&err) {
            ApiError::InvalidInput("admin already exists".into())
        } else {
            err.into()
        }
    })?;
    let mut created = admin;
    created.id = res.inserted_id.as_object_id();
    Ok(created)
}

pub async fn list_admins(state: &AppState) -> Result<Vec<Admin>> {
    let mut cursor = state.admins.find(doc! {}).await?;
    let mut items = Vec::new();
    while let Some(admin) = cursor.try_next().await? {
        items.push(admin);
    }
    Ok(items)
}

pub async fn get_admin_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Admin>> {
    state
        .admins
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

/// Superadmins cannot be removed.
pub async fn delete_admin(state: &AppState, id: &ObjectId) -> Result<()> {
    let admin = get_admin_by_id(state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("admin".into()))?;
    if admin.role == Role::Superadmin {
        return Err(ApiError::Forbidden("cannot delete a superadmin".into()));
    }
    state.admins.delete_one(doc! { "_id": id }).await?;
    Ok(())
}

pub async fn authenticate_admin(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Admin> {
    let admin = state
        .admins
        .find_one(doc! { "email": email })
        .await?
        .ok_or_else(|| ApiError::NotFound("admin".into()))?;
    if !verify_password(password, &admin.password) {
        return Err(ApiError::InvalidInput("invalid credentials".into()));
    }
    Ok(admin)
}

/// Tenant login accepts either email or mobile number.
pub async fn authenticate_tenant(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<Tenant> {
    let tenant = find_tenant_by_identifier(state, identifier)
        .await?
        .ok_or_else(|| ApiError::NotFound("tenant".into()))?;
    if !verify_password(password, &tenant.password) {
        return Err(ApiError::InvalidInput("invalid credentials".into()));
    }
    Ok(tenant)
}
