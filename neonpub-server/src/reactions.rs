use axum::{
    extract::Path,
    routing::{get, post},
    Json,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{EffectSchema, MessageSchema, ReactionSchema, ValidatedJson},
    serialized::{Message, Quota, ReactionResult, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/reactions",
    tag = "reactions",
    request_body = ReactionSchema,
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = ReactionResult),
        (status = 409, description = "No reactions left for this performance")
    )
)]
async fn react(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<ReactionSchema>,
) -> ServerResult<Json<ReactionResult>> {
    let sent = context
        .collab
        .reactions
        .react(&session.member, &body.emoji, body.message.as_deref())
        .await?;

    Ok(Json(sent.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/reactions/remaining",
    tag = "reactions",
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Quota)
    )
)]
async fn remaining(session: Session, context: ServerContext) -> ServerResult<Json<Quota>> {
    let quota = context.collab.reactions.remaining(&session.member).await?;

    Ok(Json(quota.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/messages",
    tag = "reactions",
    request_body = MessageSchema,
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Message, description = "The message, pending moderation")
    )
)]
async fn send_message(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<MessageSchema>,
) -> ServerResult<Json<Message>> {
    let message = context
        .collab
        .reactions
        .send_message(&session.member, &body.text)
        .await?;

    Ok(Json(message.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/messages/pending",
    tag = "reactions",
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Vec<Message>, description = "Oldest first")
    )
)]
async fn pending_messages(
    session: Session,
    context: ServerContext,
) -> ServerResult<Json<Vec<Message>>> {
    let messages = context
        .collab
        .reactions
        .pending_messages(&session.member)
        .await?;

    Ok(Json(messages.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/messages/{id}/approve",
    tag = "reactions",
    params(("id" = i32, Path, description = "Id of the message")),
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Message)
    )
)]
async fn approve_message(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<Message>> {
    let message = context
        .collab
        .reactions
        .approve_message(&session.member, id)
        .await?;

    Ok(Json(message.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/messages/{id}/reject",
    tag = "reactions",
    params(("id" = i32, Path, description = "Id of the message")),
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Message)
    )
)]
async fn reject_message(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<Message>> {
    let message = context
        .collab
        .reactions
        .reject_message(&session.member, id)
        .await?;

    Ok(Json(message.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/effects",
    tag = "reactions",
    request_body = EffectSchema,
    security(("BearerAuth" = [])),
    responses(
        (status = 200, description = "The effect was sent to the screens")
    )
)]
async fn effect(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<EffectSchema>,
) -> ServerResult<()> {
    context
        .collab
        .reactions
        .effect(&session.member, body.effect_type, body.data)?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/reactions", post(react))
        .route("/reactions/remaining", get(remaining))
        .route("/messages", post(send_message))
        .route("/messages/pending", get(pending_messages))
        .route("/messages/:id/approve", post(approve_message))
        .route("/messages/:id/reject", post(reject_message))
        .route("/effects", post(effect))
}
