use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, live, performances, quiz, reactions, schemas, serialized, songs, venues};

#[derive(OpenApi)]
#[openapi(
    paths(
        venues::create_venue,
        venues::venue,
        venues::join,
        venues::admin_login,
        auth::me,
        auth::logout,
        songs::request_song,
        songs::queue,
        songs::reorder,
        songs::mine,
        songs::approve,
        songs::reject,
        songs::search,
        performances::start,
        performances::current,
        performances::history,
        performances::next,
        performances::pause,
        performances::resume,
        performances::restart,
        performances::open_voting,
        performances::end,
        performances::finish,
        performances::close_voting,
        performances::vote,
        reactions::react,
        reactions::remaining,
        reactions::send_message,
        reactions::pending_messages,
        reactions::approve_message,
        reactions::reject_message,
        reactions::effect,
        quiz::categories,
        quiz::start,
        quiz::start_preset,
        quiz::start_session,
        quiz::next_question,
        quiz::active,
        quiz::answer,
        quiz::end,
        quiz::leaderboard,
        live::live,
        live::display,
    ),
    components(schemas(
        schemas::NewVenueSchema,
        schemas::JoinSchema,
        schemas::AdminLoginSchema,
        schemas::SongRequestSchema,
        schemas::ReorderSchema,
        schemas::StartPerformanceSchema,
        schemas::VoteSchema,
        schemas::ReactionSchema,
        schemas::MessageSchema,
        schemas::EffectSchema,
        schemas::CustomQuizSchema,
        schemas::PresetQuizSchema,
        schemas::QuizSessionSchema,
        schemas::AnswerSchema,
        serialized::Venue,
        serialized::User,
        serialized::LoginResult,
        serialized::SongRequest,
        serialized::Performance,
        serialized::NextResult,
        serialized::Tally,
        serialized::Reaction,
        serialized::ReactionResult,
        serialized::Quota,
        serialized::Message,
        serialized::Category,
        serialized::Quiz,
        serialized::QuizResult,
        serialized::AnswerResult,
        serialized::LeaderboardItem,
        serialized::NextQuestionResult,
        serialized::Video,
        serialized::Display,
    )),
    modifiers(&Security),
    info(
        description = "neonpub-server exposes endpoints to run a karaoke night at a venue"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod test {
    use utoipa::OpenApi;

    use super::ApiDoc;

    #[test]
    fn document_lists_every_route() {
        let api = ApiDoc::openapi();

        for path in [
            "/v1/venues/{code}/join",
            "/v1/performances/{id}/votes",
            "/v1/quiz/sessions/{id}/next",
            "/v1/live/{code}",
        ] {
            assert!(api.paths.paths.contains_key(path), "missing {}", path);
        }

        let components = api.components.unwrap();
        assert!(components.security_schemes.contains_key("BearerAuth"));
    }
}
