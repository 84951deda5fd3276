// PG (housing unit) store. Plain CRUD keyed by the human-facing pgId.

use futures::stream::TryStreamExt;
use mongodb::bson::doc;

use crate::{
    errors::{ApiError, Result, is_duplicate_key},
    models::Pg,
};

use super::AppState;

pub async fn create_pg(state: &AppState, pg: Pg) -> Result<Pg> {
    let res = state.pgs.insert_one(&pg).await.map_err(|err| {
        if is_duplicate_key(&err) {
            ApiError::InvalidInput(format!("pgId {} already exists", pg.pg_id))
        } else {
            err.into()
        }
    })?;
    let mut created = pg;
    created.id = res.inserted_id.as_object_id();
    Ok(created)
}

pub async fn list_pgs(state: &AppState) -> Result<Vec<Pg>> {
    let mut cursor = state.pgs.find(doc! {}).await?;
    let mut items = Vec::new();
    while let Some(pg) = cursor.try_next().await? {
        items.push(pg);
    }
    Ok(items)
}

pub async fn get_pg(state: &AppState, pg_id: &str) -> Result<Option<Pg>> {
    state
        .pgs
        .find_one(doc! { "pgId": pg_id })
        .await
        .map_err(Into::into)
}

pub async fn update_pg(state: &AppState, pg_id: &str, pg: Pg) -> Result<Pg> {
    let existing = get_pg(state, pg_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("pg {pg_id}")))?;

    let mut replacement = pg;
    replacement.id = existing.id;
    replacement.pg_id = pg_id.to_string();
    state
        .pgs
        .replace_one(doc! { "pgId": pg_id }, &replacement)
        .await?;
    Ok(replacement)
}

pub async fn delete_pg(state: &AppState, pg_id: &str) -> Result<()> {
    let res = state.pgs.delete_one(doc! { "pgId": pg_id }).await?;
    if res.deleted_count == 0 {
        return Err(ApiError::NotFound(format!("pg {pg_id}")));
    }
    Ok(())
}
