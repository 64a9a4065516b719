use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use futures::TryStreamExt;

use crate::auth::SecurityContext;
use crate::database::{Book, BookPayload, NewBook};
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

/// GET /books - Books created by the caller
pub async fn list(State(state): State<AppState>, ctx: SecurityContext) -> ApiResult<Vec<Book>> {
    let books: Vec<Book> = state
        .books
        .find_owned_by_current_principal(&ctx)
        .await?
        .try_collect()
        .await?;

    Ok(ApiResponse::success(books))
}

/// GET /books/test - Explicit-owner query called with no owner.
///
/// Demonstration only: it returns books that have no owner, never every
/// user's books.
pub async fn list_test(State(state): State<AppState>, _ctx: SecurityContext) -> ApiResult<Vec<Book>> {
    let books: Vec<Book> = state.books.find_owned_by(None).await?.try_collect().await?;

    Ok(ApiResponse::success(books))
}

/// POST /books - Create a book owned by the caller.
///
/// Only `name` is read from the body; `id` and `owner` are assigned server-side.
pub async fn create(
    State(state): State<AppState>,
    ctx: SecurityContext,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> ApiResult<Book> {
    let Json(payload) = payload?;

    let book = state.books.save(NewBook::from(payload), &ctx).await?;

    Ok(ApiResponse::success(book))
}
