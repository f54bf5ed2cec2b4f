use axum::{
    extract::{Path, Query},
    routing::{get, post, put},
    Json,
};
use neonpub_collab::NewSongRequestInput;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{ReorderSchema, SearchParams, SongRequestSchema, ValidatedJson},
    serialized::{SongRequest, ToSerialized, Video},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/songs",
    tag = "songs",
    request_body = SongRequestSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = SongRequest)
    )
)]
async fn request_song(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<SongRequestSchema>,
) -> ServerResult<Json<SongRequest>> {
    let request = context
        .collab
        .queue
        .request(
            &session.member,
            NewSongRequestInput {
                title: body.title,
                artist: body.artist,
                video_url: body.video_url,
            },
        )
        .await?;

    Ok(Json(request.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/songs/queue",
    tag = "songs",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<SongRequest>, description = "Pending and queued requests, by position")
    )
)]
async fn queue(session: Session, context: ServerContext) -> ServerResult<Json<Vec<SongRequest>>> {
    let requests = context.collab.queue.list(&session.member).await?;

    Ok(Json(requests.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/songs/queue",
    tag = "songs",
    request_body = ReorderSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<SongRequest>, description = "The queue in its new order")
    )
)]
async fn reorder(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<ReorderSchema>,
) -> ServerResult<Json<Vec<SongRequest>>> {
    let requests = context
        .collab
        .queue
        .reorder(&session.member, &body.order)
        .await?;

    Ok(Json(requests.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/songs/mine",
    tag = "songs",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<SongRequest>, description = "Own requests, newest first")
    )
)]
async fn mine(session: Session, context: ServerContext) -> ServerResult<Json<Vec<SongRequest>>> {
    let requests = context.collab.queue.mine(&session.member).await?;

    Ok(Json(requests.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/songs/{id}/approve",
    tag = "songs",
    params(
        ("id" = i32, Path, description = "Id of the request")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = SongRequest)
    )
)]
async fn approve(
    session: Session,
    context: ServerContext,
    Path(request_id): Path<i32>,
) -> ServerResult<Json<SongRequest>> {
    let request = context
        .collab
        .queue
        .approve(&session.member, request_id)
        .await?;

    Ok(Json(request.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/songs/{id}/reject",
    tag = "songs",
    params(
        ("id" = i32, Path, description = "Id of the request")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = SongRequest)
    )
)]
async fn reject(
    session: Session,
    context: ServerContext,
    Path(request_id): Path<i32>,
) -> ServerResult<Json<SongRequest>> {
    let request = context
        .collab
        .queue
        .reject(&session.member, request_id)
        .await?;

    Ok(Json(request.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/songs/search",
    tag = "songs",
    params(SearchParams),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Video>),
        (status = 503, description = "Video search is unavailable")
    )
)]
async fn search(
    session: Session,
    context: ServerContext,
    Query(params): Query<SearchParams>,
) -> ServerResult<Json<Vec<Video>>> {
    let videos = context
        .collab
        .search
        .videos(&session.member, &params.title, &params.artist)
        .await?;

    Ok(Json(videos.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(request_song))
        .route("/queue", get(queue))
        .route("/queue", put(reorder))
        .route("/mine", get(mine))
        .route("/search", get(search))
        .route("/:id/approve", post(approve))
        .route("/:id/reject", post(reject))
}
