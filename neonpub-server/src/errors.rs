use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use neonpub_collab::{AuthError, CollabError, DatabaseError};
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Collab(#[from] CollabError),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Venue not found")]
    UnknownVenue,
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Collab(e) => match e {
                CollabError::NotFound(_) => StatusCode::NOT_FOUND,
                CollabError::Forbidden(_) => StatusCode::FORBIDDEN,
                CollabError::Conflict(_) => StatusCode::CONFLICT,
                CollabError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                CollabError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UnknownVenue => StatusCode::NOT_FOUND,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, self.to_string()).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::UnknownVenue => Self::UnknownVenue,
            AuthError::Db(e) => Self::Collab(e.into()),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        Self::Collab(value.into())
    }
}

#[cfg(test)]
mod test {
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
    use neonpub_collab::{AuthError, CollabError};

    use super::ServerError;

    async fn render(error: ServerError) -> (StatusCode, String) {
        let response = error.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn collab_errors_map_to_status_codes() {
        let cases = [
            (CollabError::NotFound("performance"), StatusCode::NOT_FOUND),
            (CollabError::forbidden("You cannot vote for yourself"), StatusCode::FORBIDDEN),
            (CollabError::conflict("You already voted"), StatusCode::CONFLICT),
            (CollabError::invalid("Score must be between 1 and 5"), StatusCode::BAD_REQUEST),
            (
                CollabError::Unavailable("Video search is not configured".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, expected) in cases {
            let message = error.to_string();
            let (status, body) = render(error.into()).await;

            assert_eq!(status, expected);
            assert_eq!(body, message);
        }
    }

    #[tokio::test]
    async fn auth_errors_map_to_status_codes() {
        let (status, body) = render(AuthError::InvalidCredentials.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Invalid credentials");

        let (status, _) = render(AuthError::UnknownVenue.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = render(AuthError::HashError("bad salt".to_string()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn not_found_names_the_resource() {
        let (_, body) = render(CollabError::NotFound("quiz").into()).await;
        assert_eq!(body, "quiz not found");
    }
}
