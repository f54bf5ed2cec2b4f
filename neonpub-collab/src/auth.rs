use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use log::info;
use rand::rngs::OsRng;
use serde::Serialize;
use thiserror::Error;

use crate::{
    util::{join_code, random_string},
    CollabContext, CollabError, CollabResult, DatabaseError, NewParticipant, NewSession,
    NewVenue, PrimaryKey, SessionData, VenueData,
};

/// How often a clashing join code is regenerated before giving up
const JOIN_CODE_ATTEMPTS: usize = 5;
const SESSION_TOKEN_LENGTH: usize = 32;
const ADMIN_NICKNAME: &str = "Admin";

pub struct Auth {
    context: CollabContext,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Code, password or token is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Venue not found")]
    UnknownVenue,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Audience,
    Admin,
}

/// Who is acting, and in which venue
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub venue_id: PrimaryKey,
    /// Absent for the admin, who is not a participant
    pub participant_id: Option<PrimaryKey>,
    pub nickname: String,
    pub role: Role,
}

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct Login {
    pub token: String,
    pub member: Member,
    pub venue: VenueData,
}

impl Member {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Refuses anyone but the admin of the venue
    pub fn ensure_admin(&self) -> CollabResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CollabError::forbidden("Admin access required"))
        }
    }

    /// The participant acting, refusing the admin
    pub fn participant(&self) -> CollabResult<PrimaryKey> {
        self.participant_id
            .ok_or_else(|| CollabError::forbidden("Only participants can do this"))
    }
}

impl From<SessionData> for Member {
    fn from(session: SessionData) -> Self {
        Self {
            venue_id: session.venue_id,
            participant_id: session.participant_id,
            nickname: session.nickname,
            role: if session.admin {
                Role::Admin
            } else {
                Role::Audience
            },
        }
    }
}

impl Auth {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Creates a venue with a fresh join code
    pub async fn create_venue(&self, name: String, password: &str) -> Result<VenueData, AuthError> {
        let admin_password = self.hash(password)?;
        let length = self.context.config.join_code_length;

        let mut attempts = 0;

        loop {
            attempts += 1;

            let result = self
                .context
                .database
                .create_venue(NewVenue {
                    name: name.clone(),
                    code: join_code(length),
                    admin_password: admin_password.clone(),
                })
                .await;

            match result {
                Ok(venue) => {
                    info!("Created venue {} with code {}", venue.name, venue.code);
                    return Ok(venue);
                }
                Err(DatabaseError::Conflict { .. }) if attempts < JOIN_CODE_ATTEMPTS => continue,
                Err(e) => return Err(AuthError::Db(e)),
            }
        }
    }

    /// Finds a venue by its join code, in any case
    pub async fn venue_by_code(&self, code: &str) -> CollabResult<VenueData> {
        self.context
            .database
            .venue_by_code(&code.to_ascii_uppercase())
            .await?
            .ok_or(CollabError::NotFound("venue"))
    }

    /// Joins a venue as a new participant
    pub async fn join(&self, code: &str, nickname: String) -> Result<Login, AuthError> {
        let venue = self.find_venue(code).await?;

        let participant = self
            .context
            .database
            .create_participant(NewParticipant {
                venue_id: venue.id,
                nickname,
            })
            .await
            .map_err(AuthError::Db)?;

        info!("{} joined venue {}", participant.nickname, venue.code);

        self.issue(venue, Some(participant.id), participant.nickname, false)
            .await
    }

    /// Logs in as the admin of a venue
    pub async fn admin_login(&self, code: &str, password: &str) -> Result<Login, AuthError> {
        let venue = self.find_venue(code).await?;

        let stored_password = PasswordHash::parse(&venue.admin_password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        info!("Admin logged into venue {}", venue.code);

        self.issue(venue, None, ADMIN_NICKNAME.to_string(), true)
            .await
    }

    /// Resolves a session token into the member it was issued to
    pub async fn session(&self, token: &str) -> Result<Member, AuthError> {
        let session = self
            .context
            .database
            .session_by_token(token)
            .await
            .map_err(AuthError::Db)?
            .ok_or(AuthError::InvalidCredentials)?;

        if session.expires_at <= Utc::now() {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(session.into())
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.context
            .database
            .delete_session_by_token(token)
            .await
            .map(|_| ())
    }

    async fn find_venue(&self, code: &str) -> Result<VenueData, AuthError> {
        self.context
            .database
            .venue_by_code(&code.to_ascii_uppercase())
            .await
            .map_err(AuthError::Db)?
            .ok_or(AuthError::UnknownVenue)
    }

    async fn issue(
        &self,
        venue: VenueData,
        participant_id: Option<PrimaryKey>,
        nickname: String,
        admin: bool,
    ) -> Result<Login, AuthError> {
        self.clear_expired().await?;

        let days = self.context.config.session_duration_in_days;

        let session = self
            .context
            .database
            .create_session(NewSession {
                token: random_string(SESSION_TOKEN_LENGTH),
                venue_id: venue.id,
                participant_id,
                nickname,
                admin,
                expires_at: Utc::now() + Duration::days(days),
            })
            .await
            .map_err(AuthError::Db)?;

        Ok(Login {
            token: session.token.clone(),
            member: session.into(),
            venue,
        })
    }

    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::HashError(e.to_string()))
    }

    async fn clear_expired(&self) -> Result<(), AuthError> {
        self.context
            .database
            .clear_expired_sessions(Utc::now())
            .await
            .map(|_| ())
            .map_err(AuthError::Db)
    }
}

#[cfg(test)]
mod test {
    use super::{AuthError, Role};
    use crate::testing::Harness;

    #[tokio::test]
    async fn venues_get_an_upper_case_join_code() {
        let harness = Harness::new().await;
        let auth = &harness.collab.auth;

        let venue = auth
            .create_venue("Neon Pub".to_string(), "hunter2")
            .await
            .unwrap();

        assert_eq!(venue.code.len(), 8);
        assert_eq!(venue.code, venue.code.to_ascii_uppercase());
        assert_ne!(venue.admin_password, "hunter2");

        let found = auth
            .venue_by_code(&venue.code.to_ascii_lowercase())
            .await
            .unwrap();
        assert_eq!(found.id, venue.id);
    }

    #[tokio::test]
    async fn joining_issues_an_audience_session() {
        let harness = Harness::new().await;
        let auth = &harness.collab.auth;

        let login = auth.join("neon0001", "Alice".to_string()).await.unwrap();
        assert_eq!(login.member.role, Role::Audience);
        assert!(login.member.participant_id.is_some());
        assert_eq!(login.venue.id, harness.venue.id);

        let member = auth.session(&login.token).await.unwrap();
        assert_eq!(member.nickname, "Alice");
        assert!(!member.is_admin());

        auth.logout(&login.token).await.unwrap();
        let result = auth.session(&login.token).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let result = auth.join("NOPE0000", "Bob".to_string()).await;
        assert!(matches!(result, Err(AuthError::UnknownVenue)));
    }

    #[tokio::test]
    async fn admins_log_in_with_the_venue_password() {
        let harness = Harness::new().await;
        let auth = &harness.collab.auth;

        let venue = auth
            .create_venue("Neon Pub".to_string(), "hunter2")
            .await
            .unwrap();

        let result = auth.admin_login(&venue.code, "hunter3").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let login = auth.admin_login(&venue.code, "hunter2").await.unwrap();
        assert!(login.member.is_admin());
        assert_eq!(login.member.participant_id, None);

        let member = auth.session(&login.token).await.unwrap();
        assert_eq!(member.venue_id, venue.id);
        assert!(member.ensure_admin().is_ok());
        assert!(member.participant().is_err());
    }
}
