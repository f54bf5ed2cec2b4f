use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    routing::{get, post},
    Json,
};
use neonpub_collab::Member;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    serialized::{ToSerialized, User},
    Router,
};

/// The member behind the bearer token of a request
pub struct Session {
    pub token: String,
    pub member: Member,
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization"))?;

        let token = bearer_token(token)
            .ok_or((StatusCode::BAD_REQUEST, "Authorization must be Bearer"))?;

        let member = context
            .collab
            .auth
            .session(token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Session does not exist"))?;

        Ok(Self {
            token: token.to_string(),
            member,
        })
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let parts: Vec<_> = header.split_ascii_whitespace().collect();

    match parts.as_slice() {
        ["Bearer", token] => Some(*token),
        _ => None,
    }
}

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User),
        (status = 401, description = "Missing or expired session")
    )
)]
async fn me(session: Session) -> Json<User> {
    Json(session.member.to_serialized())
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The session was deleted")
    )
)]
async fn logout(session: Session, context: ServerContext) -> ServerResult<()> {
    context.collab.auth.logout(&session.token).await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
}

#[cfg(test)]
mod test {
    use super::bearer_token;

    #[test]
    fn only_bearer_tokens_are_accepted() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("  Bearer   abc123 "), Some("abc123"));
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer a b"), None);
    }
}
