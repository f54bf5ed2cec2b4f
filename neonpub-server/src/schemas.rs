use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewVenueSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 6, max = 64))]
    pub admin_password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinSchema {
    #[validate(length(min = 1, max = 32))]
    pub nickname: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminLoginSchema {
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SongRequestSchema {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub artist: String,
    #[validate(url)]
    pub video_url: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderSchema {
    /// Every queued request, in the new order
    #[validate(length(max = 1000))]
    pub order: Vec<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    pub title: String,
    #[serde(default)]
    pub artist: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartPerformanceSchema {
    pub request_id: i32,
    #[validate(url)]
    pub video_url: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteSchema {
    #[validate(range(min = 1, max = 5))]
    pub score: i32,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactionSchema {
    #[validate(length(min = 1, max = 32))]
    pub emoji: String,
    #[validate(length(max = 500))]
    pub message: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageSchema {
    /// Truncated to the configured length
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectSchema {
    #[validate(length(min = 1, max = 64))]
    pub effect_type: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomQuizSchema {
    #[validate(length(min = 1, max = 500))]
    pub question: String,
    #[validate(length(min = 2, max = 8))]
    pub options: Vec<String>,
    pub correct_index: usize,
    #[validate(range(min = 1, max = 1000))]
    pub points: Option<i32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetQuizSchema {
    #[validate(length(min = 1, max = 64))]
    pub category: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuizSessionSchema {
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    #[validate(range(min = 1, max = 100))]
    pub num_questions: usize,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerSchema {
    pub answer_index: usize,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}

#[cfg(test)]
mod test {
    use validator::Validate;

    use super::{CustomQuizSchema, SongRequestSchema, VoteSchema};

    #[test]
    fn votes_must_be_in_range() {
        assert!(VoteSchema { score: 0 }.validate().is_err());
        assert!(VoteSchema { score: 6 }.validate().is_err());
        assert!(VoteSchema { score: 5 }.validate().is_ok());
    }

    #[test]
    fn video_urls_must_be_urls() {
        let request = |video_url: Option<&str>| SongRequestSchema {
            title: "Imagine".to_string(),
            artist: "John Lennon".to_string(),
            video_url: video_url.map(str::to_string),
        };

        assert!(request(None).validate().is_ok());
        assert!(request(Some("https://www.youtube.com/watch?v=abc123"))
            .validate()
            .is_ok());
        assert!(request(Some("not a url")).validate().is_err());
    }

    #[test]
    fn custom_quizzes_need_options() {
        let quiz = CustomQuizSchema {
            question: "2 + 2?".to_string(),
            options: vec!["4".to_string()],
            correct_index: 0,
            points: None,
        };

        assert!(quiz.validate().is_err());
    }
}
