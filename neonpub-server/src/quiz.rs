use axum::{
    extract::Path,
    routing::{get, post},
    Json,
};
use neonpub_collab::CustomQuestion;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{
        AnswerSchema, CustomQuizSchema, PresetQuizSchema, QuizSessionSchema, ValidatedJson,
    },
    serialized::{
        AnswerResult, Category, LeaderboardItem, NextQuestionResult, Quiz, QuizResult,
        ToSerialized,
    },
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/quiz/categories",
    tag = "quiz",
    responses(
        (status = 200, body = Vec<Category>)
    )
)]
async fn categories(context: ServerContext) -> Json<Vec<Category>> {
    Json(context.collab.quizzes.categories().to_serialized())
}

#[utoipa::path(
    post,
    path = "/v1/quiz",
    tag = "quiz",
    request_body = CustomQuizSchema,
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Quiz, description = "The question, without its answer")
    )
)]
async fn start(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<CustomQuizSchema>,
) -> ServerResult<Json<Quiz>> {
    let quiz = context
        .collab
        .quizzes
        .start(
            &session.member,
            CustomQuestion {
                question: body.question,
                options: body.options,
                correct_index: body.correct_index,
                points: body.points,
            },
        )
        .await?;

    Ok(Json(quiz.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/quiz/preset",
    tag = "quiz",
    request_body = PresetQuizSchema,
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Quiz),
        (status = 400, description = "Unknown category")
    )
)]
async fn start_preset(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<PresetQuizSchema>,
) -> ServerResult<Json<Quiz>> {
    let quiz = context
        .collab
        .quizzes
        .start_preset(&session.member, &body.category)
        .await?;

    Ok(Json(quiz.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/quiz/sessions",
    tag = "quiz",
    request_body = QuizSessionSchema,
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Quiz, description = "The first question of the session"),
        (status = 400, description = "Unknown category, or more questions than it has")
    )
)]
async fn start_session(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<QuizSessionSchema>,
) -> ServerResult<Json<Quiz>> {
    let quiz = context
        .collab
        .quizzes
        .start_session(&session.member, &body.category, body.num_questions)
        .await?;

    Ok(Json(quiz.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/quiz/sessions/{id}/next",
    tag = "quiz",
    params(("id" = i32, Path, description = "Id of the quiz session")),
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = NextQuestionResult),
        (status = 409, description = "The session has already ended")
    )
)]
async fn next_question(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<NextQuestionResult>> {
    let next = context
        .collab
        .quizzes
        .next_question(&session.member, id)
        .await?;

    Ok(Json(next.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/quiz/active",
    tag = "quiz",
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Option<Quiz>)
    )
)]
async fn active(session: Session, context: ServerContext) -> ServerResult<Json<Option<Quiz>>> {
    let quiz = context.collab.quizzes.active(&session.member).await?;

    Ok(Json(quiz.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/quiz/{id}/answers",
    tag = "quiz",
    request_body = AnswerSchema,
    params(("id" = i32, Path, description = "Id of the quiz")),
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = AnswerResult),
        (status = 409, description = "Already answered, or the quiz has ended")
    )
)]
async fn answer(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<AnswerSchema>,
) -> ServerResult<Json<AnswerResult>> {
    let outcome = context
        .collab
        .quizzes
        .answer(&session.member, id, body.answer_index)
        .await?;

    Ok(Json(outcome.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/quiz/{id}/end",
    tag = "quiz",
    params(("id" = i32, Path, description = "Id of the quiz")),
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = QuizResult)
    )
)]
async fn end(
    session: Session,
    context: ServerContext,
    Path(id): Path<i32>,
) -> ServerResult<Json<QuizResult>> {
    let results = context.collab.quizzes.end(&session.member, id).await?;

    Ok(Json(results.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/quiz/leaderboard",
    tag = "quiz",
    security(("BearerAuth" = [])),
    responses(
        (status = 200, body = Vec<LeaderboardItem>, description = "Participants by score")
    )
)]
async fn leaderboard(
    session: Session,
    context: ServerContext,
) -> ServerResult<Json<Vec<LeaderboardItem>>> {
    let entries = context.collab.quizzes.leaderboard(&session.member).await?;

    Ok(Json(entries.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(start))
        .route("/categories", get(categories))
        .route("/preset", post(start_preset))
        .route("/sessions", post(start_session))
        .route("/sessions/:id/next", post(next_question))
        .route("/active", get(active))
        .route("/leaderboard", get(leaderboard))
        .route("/:id/answers", post(answer))
        .route("/:id/end", post(end))
}
