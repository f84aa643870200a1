use shared::{
    domain::{NewUser, UserId, UserPatch, UserRecord},
    error::{ApiError, ErrorCode},
    protocol::ListQuery,
    query::{self, QueryPage},
};
use storage::Storage;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub collection_key: String,
}

pub fn users_route() -> &'static str {
    "/api/v1/users"
}

pub fn user_route() -> &'static str {
    "/api/v1/users/:id"
}

pub async fn list_users(ctx: &ApiContext, list: &ListQuery) -> Result<QueryPage, ApiError> {
    let users = ctx
        .storage
        .load_users(&ctx.collection_key)
        .await
        .map_err(internal)?;
    Ok(query::run(
        &users,
        list.page_number(),
        list.page_size(),
        &list.filter(),
        list.sort(),
    ))
}

pub async fn get_user(ctx: &ApiContext, id: &UserId) -> Result<UserRecord, ApiError> {
    ctx.storage
        .find_user(&ctx.collection_key, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(id))
}

pub async fn create_user(ctx: &ApiContext, new_user: NewUser) -> Result<UserRecord, ApiError> {
    if new_user.name.trim().is_empty() || new_user.email.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "name and email are required",
        ));
    }
    if let Some(id) = &new_user.id {
        if ctx
            .storage
            .find_user(&ctx.collection_key, id)
            .await
            .map_err(internal)?
            .is_some()
        {
            return Err(ApiError::new(
                ErrorCode::Validation,
                format!("user {id} already exists"),
            ));
        }
    }
    ctx.storage
        .insert_user(&ctx.collection_key, new_user)
        .await
        .map_err(internal)
}

pub async fn update_user(
    ctx: &ApiContext,
    id: &UserId,
    patch: &UserPatch,
) -> Result<UserRecord, ApiError> {
    ctx.storage
        .update_user(&ctx.collection_key, id, patch)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(id))
}

pub async fn delete_user(ctx: &ApiContext, id: &UserId) -> Result<(), ApiError> {
    let removed = ctx
        .storage
        .delete_user(&ctx.collection_key, id)
        .await
        .map_err(internal)?;
    if removed {
        Ok(())
    } else {
        Err(not_found(id))
    }
}

fn not_found(id: &UserId) -> ApiError {
    ApiError::not_found(format!("user {id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
