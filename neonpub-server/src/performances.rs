use axum::{
    extract::Path,
    routing::{get, post},
    Json,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{StartPerformanceSchema, ValidatedJson, VoteSchema},
    serialized::{NextResult, Performance, Tally, ToSerialized},
    Router,
};

/// Which transition a lifecycle route applies
#[derive(Debug, Clone, Copy)]
enum Transition {
    Pause,
    Resume,
    Restart,
    OpenVoting,
    End,
    Finish,
    CloseVoting,
}

async fn transition(
    session: &Session,
    context: &ServerContext,
    performance_id: i32,
    transition: Transition,
) -> ServerResult<Json<Performance>> {
    let performances = &context.collab.performances;
    let member = &session.member;

    let performance = match transition {
        Transition::Pause => performances.pause(member, performance_id).await,
        Transition::Resume => performances.resume(member, performance_id).await,
        Transition::Restart => performances.restart(member, performance_id).await,
        Transition::OpenVoting => performances.open_voting(member, performance_id).await,
        Transition::End => performances.end(member, performance_id).await,
        Transition::Finish => performances.finish(member, performance_id).await,
        Transition::CloseVoting => performances.close_voting(member, performance_id).await,
    }?;

    Ok(Json(performance.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/performances",
    tag = "performances",
    request_body = StartPerformanceSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Performance),
        (status = 409, description = "Another performance is in progress, or the request is not queued")
    )
)]
async fn start(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<StartPerformanceSchema>,
) -> ServerResult<Json<Performance>> {
    let performance = context
        .collab
        .performances
        .start(&session.member, body.request_id, body.video_url)
        .await?;

    Ok(Json(performance.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/performances/current",
    tag = "performances",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Option<Performance>)
    )
)]
async fn current(
    session: Session,
    context: ServerContext,
) -> ServerResult<Json<Option<Performance>>> {
    let performance = context
        .collab
        .performances
        .current(&session.member)
        .await?;

    Ok(Json(performance.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/performances/history",
    tag = "performances",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Performance>, description = "Most recent first")
    )
)]
async fn history(
    session: Session,
    context: ServerContext,
) -> ServerResult<Json<Vec<Performance>>> {
    let performances = context
        .collab
        .performances
        .history(&session.member)
        .await?;

    Ok(Json(performances.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/performances/next",
    tag = "performances",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = NextResult)
    )
)]
async fn next(session: Session, context: ServerContext) -> ServerResult<Json<NextResult>> {
    let outcome = context.collab.performances.next(&session.member).await?;

    Ok(Json(outcome.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/performances/{id}/pause",
    tag = "performances",
    params(("id" = i32, Path, description = "Id of the performance")),
    security(("BearerAuth" = [])),
    responses((status = 200, body = Performance))
)]
async fn pause(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<Performance>> {
    transition(&session, &context, id, Transition::Pause).await
}

#[utoipa::path(
    post,
    path = "/v1/performances/{id}/resume",
    tag = "performances",
    params(("id" = i32, Path, description = "Id of the performance")),
    security(("BearerAuth" = [])),
    responses((status = 200, body = Performance))
)]
async fn resume(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<Performance>> {
    transition(&session, &context, id, Transition::Resume).await
}

#[utoipa::path(
    post,
    path = "/v1/performances/{id}/restart",
    tag = "performances",
    params(("id" = i32, Path, description = "Id of the performance")),
    security(("BearerAuth" = [])),
    responses((status = 200, body = Performance))
)]
async fn restart(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<Performance>> {
    transition(&session, &context, id, Transition::Restart).await
}

#[utoipa::path(
    post,
    path = "/v1/performances/{id}/open-voting",
    tag = "performances",
    params(("id" = i32, Path, description = "Id of the performance")),
    security(("BearerAuth" = [])),
    responses((status = 200, body = Performance))
)]
async fn open_voting(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<Performance>> {
    transition(&session, &context, id, Transition::OpenVoting).await
}

#[utoipa::path(
    post,
    path = "/v1/performances/{id}/end",
    tag = "performances",
    params(("id" = i32, Path, description = "Id of the performance")),
    security(("BearerAuth" = [])),
    responses((status = 200, body = Performance, description = "The performance, now waiting for votes"))
)]
async fn end(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<Performance>> {
    transition(&session, &context, id, Transition::End).await
}

#[utoipa::path(
    post,
    path = "/v1/performances/{id}/finish",
    tag = "performances",
    params(("id" = i32, Path, description = "Id of the performance")),
    security(("BearerAuth" = [])),
    responses((status = 200, body = Performance, description = "The performance, completed without scoring"))
)]
async fn finish(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<Performance>> {
    transition(&session, &context, id, Transition::Finish).await
}

#[utoipa::path(
    post,
    path = "/v1/performances/{id}/close-voting",
    tag = "performances",
    params(("id" = i32, Path, description = "Id of the performance")),
    security(("BearerAuth" = [])),
    responses((status = 200, body = Performance))
)]
async fn close_voting(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<Performance>> {
    transition(&session, &context, id, Transition::CloseVoting).await
}

#[utoipa::path(
    post,
    path = "/v1/performances/{id}/votes",
    tag = "performances",
    request_body = VoteSchema,
    params(("id" = i32, Path, description = "Id of the performance")),
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Tally),
        (status = 403, description = "Performers cannot vote for themselves"),
        (status = 409, description = "Voting is closed, or the vote was already cast")
    )
)]
async fn vote(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<VoteSchema>,
) -> ServerResult<Json<Tally>> {
    let tally = context
        .collab
        .performances
        .vote(&session.member, id, body.score)
        .await?;

    Ok(Json(tally.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(start))
        .route("/current", get(current))
        .route("/history", get(history))
        .route("/next", post(next))
        .route("/:id/pause", post(pause))
        .route("/:id/resume", post(resume))
        .route("/:id/restart", post(restart))
        .route("/:id/open-voting", post(open_voting))
        .route("/:id/end", post(end))
        .route("/:id/finish", post(finish))
        .route("/:id/close-voting", post(close_voting))
        .route("/:id/votes", post(vote))
}
