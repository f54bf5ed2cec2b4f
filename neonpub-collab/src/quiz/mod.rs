mod bank;

pub use bank::*;

use chrono::Utc;
use log::info;
use rand::{seq::SliceRandom, thread_rng};
use serde::Serialize;

use crate::{
    CollabContext, CollabError, CollabEvent, CollabResult, Member, NewParticipant, NewQuiz,
    NewQuizAnswer, NewQuizSession, OptionalRecord, ParticipantData, PrimaryKey, Question,
    QuizData, QuizSessionData, QuizSessionUpdate, QuizStatus,
};

/// A live question as participants see it, without its answer
#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
    pub id: PrimaryKey,
    pub session_id: Option<PrimaryKey>,
    pub category: Option<String>,
    pub category_name: Option<String>,
    pub question: String,
    pub options: Vec<String>,
    pub points: i32,
    pub question_number: i32,
    pub total_questions: i32,
}

/// What an ended question reveals
#[derive(Debug, Clone, Serialize)]
pub struct QuizResults {
    pub quiz_id: PrimaryKey,
    pub correct_answer: usize,
    pub correct_option: String,
    /// Nicknames of everyone who answered correctly, in answering order
    pub winners: Vec<String>,
    pub total_answers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub id: PrimaryKey,
    pub nickname: String,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub points_earned: i32,
}

/// A question written by the admin on the spot
#[derive(Debug, Clone)]
pub struct CustomQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    /// Defaults to the configured quiz points
    pub points: Option<i32>,
}

/// Where advancing a session led
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextQuestion {
    Started(QuizView),
    SessionEnded {
        session_id: PrimaryKey,
        leaderboard: Vec<LeaderboardEntry>,
    },
}

/// The quiz mini-game: single questions, and sessions of several questions from one category.
///
/// A venue has at most one active question. Opening a question ends every other active
/// one first, announcing their results.
pub struct Quizzes {
    context: CollabContext,
}

impl Quizzes {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub fn categories(&self) -> Vec<CategorySummary> {
        self.context.bank.summaries()
    }

    /// Asks a custom question
    pub async fn start(&self, member: &Member, custom: CustomQuestion) -> CollabResult<QuizView> {
        member.ensure_admin()?;

        let points = custom.points.unwrap_or(self.context.config.quiz_points);

        if custom.question.trim().is_empty() {
            return Err(CollabError::invalid("Question cannot be empty"));
        }

        if custom.options.len() < 2 {
            return Err(CollabError::invalid("A question needs at least two options"));
        }

        if custom.correct_index >= custom.options.len() {
            return Err(CollabError::invalid("Correct answer is not one of the options"));
        }

        if points <= 0 {
            return Err(CollabError::invalid("Points must be positive"));
        }

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        self.replace_active(member.venue_id).await?;

        self.open(NewQuiz {
            session_id: None,
            venue_id: member.venue_id,
            category: None,
            category_name: None,
            question: Question {
                question: custom.question,
                options: custom.options,
                correct_index: custom.correct_index,
                points,
            },
            question_number: 1,
            total_questions: 1,
        })
        .await
    }

    /// Asks one random question from a category of the bank
    pub async fn start_preset(&self, member: &Member, category_id: &str) -> CollabResult<QuizView> {
        member.ensure_admin()?;

        let category = self.category(category_id)?;
        let question = category
            .questions
            .choose(&mut thread_rng())
            .map(|q| q.to_question(self.context.config.quiz_points))
            .ok_or_else(|| CollabError::invalid("Category has no questions"))?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        self.replace_active(member.venue_id).await?;

        self.open(NewQuiz {
            session_id: None,
            venue_id: member.venue_id,
            category: Some(category.id.clone()),
            category_name: Some(category.name.clone()),
            question,
            question_number: 1,
            total_questions: 1,
        })
        .await
    }

    /// Starts a session of `count` distinct questions from a category, and asks the first
    pub async fn start_session(
        &self,
        member: &Member,
        category_id: &str,
        count: usize,
    ) -> CollabResult<QuizView> {
        member.ensure_admin()?;

        let category = self.category(category_id)?;

        if count == 0 {
            return Err(CollabError::invalid("A session needs at least one question"));
        }

        if count > category.questions.len() {
            return Err(CollabError::invalid(format!(
                "{} only has {} questions",
                category.name,
                category.questions.len()
            )));
        }

        let points = self.context.config.quiz_points;
        let questions: Vec<_> = category
            .questions
            .choose_multiple(&mut thread_rng(), count)
            .map(|q| q.to_question(points))
            .collect();

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        self.replace_active(member.venue_id).await?;

        let session = self
            .context
            .database
            .create_quiz_session(NewQuizSession {
                venue_id: member.venue_id,
                category: category.id.clone(),
                category_name: category.name.clone(),
                questions,
            })
            .await?;

        info!(
            "Quiz session {} started with {} question(s) from {}",
            session.id, session.total_questions, session.category
        );

        self.open_session_question(&session, 0).await
    }

    /// Ends the current question of a session and asks the next, or ends the session
    pub async fn next_question(
        &self,
        member: &Member,
        session_id: PrimaryKey,
    ) -> CollabResult<NextQuestion> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let session = self
            .context
            .database
            .quiz_session_by_id(member.venue_id, session_id)
            .await
            .or_not_found("quiz session", "id")?;

        if session.status == QuizStatus::Ended {
            return Err(CollabError::conflict("Quiz session has already ended"));
        }

        self.end_active(member.venue_id).await?;

        let next_index = session.current_index + 1;

        if next_index >= session.total_questions {
            self.context
                .database
                .update_quiz_session(QuizSessionUpdate {
                    id: session.id,
                    venue_id: session.venue_id,
                    current_index: Some(next_index),
                    status: Some(QuizStatus::Ended),
                    ended_at: Some(Utc::now()),
                })
                .await?;

            let leaderboard = self
                .leaderboard_of(member.venue_id, self.context.config.session_leaderboard_size)
                .await?;

            info!("Quiz session {} ended", session.id);

            self.context.emit(
                member.venue_id,
                CollabEvent::QuizSessionEnded {
                    session_id: session.id,
                    leaderboard: leaderboard.clone(),
                },
            );

            return Ok(NextQuestion::SessionEnded {
                session_id: session.id,
                leaderboard,
            });
        }

        self.context
            .database
            .update_quiz_session(QuizSessionUpdate {
                id: session.id,
                venue_id: session.venue_id,
                current_index: Some(next_index),
                ..Default::default()
            })
            .await?;

        self.open_session_question(&session, next_index)
            .await
            .map(NextQuestion::Started)
    }

    /// Answers the question on behalf of a participant
    pub async fn answer(
        &self,
        member: &Member,
        quiz_id: PrimaryKey,
        answer_index: usize,
    ) -> CollabResult<AnswerOutcome> {
        let participant_id = member.participant()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let db = &self.context.database;
        let quiz = self.quiz(member.venue_id, quiz_id).await?;

        if quiz.status == QuizStatus::Ended {
            return Err(CollabError::conflict("Quiz has ended"));
        }

        if answer_index >= quiz.question.options.len() {
            return Err(CollabError::invalid("No such option"));
        }

        if db
            .answer_by_participant(quiz_id, participant_id)
            .await?
            .is_some()
        {
            return Err(CollabError::conflict("You already answered"));
        }

        let is_correct = answer_index == quiz.question.correct_index;
        let points_earned = if is_correct { quiz.question.points } else { 0 };

        db.create_answer(NewQuizAnswer {
            quiz_id,
            venue_id: member.venue_id,
            participant_id,
            nickname: member.nickname.clone(),
            answer_index: answer_index as i32,
            is_correct,
            points_earned,
        })
        .await?;

        if is_correct {
            db.increment_score(
                participant_id,
                points_earned,
                NewParticipant {
                    venue_id: member.venue_id,
                    nickname: member.nickname.clone(),
                },
            )
            .await?;
        }

        Ok(AnswerOutcome {
            is_correct,
            points_earned,
        })
    }

    /// Ends a question and reveals its answer
    pub async fn end(&self, member: &Member, quiz_id: PrimaryKey) -> CollabResult<QuizResults> {
        member.ensure_admin()?;

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_transitions().await;

        let quiz = self.quiz(member.venue_id, quiz_id).await?;

        if quiz.status == QuizStatus::Ended {
            return Err(CollabError::conflict("Quiz has already ended"));
        }

        self.close(&quiz).await
    }

    /// The question being asked in the venue, if any
    pub async fn active(&self, member: &Member) -> CollabResult<Option<QuizView>> {
        let quizzes = self
            .context
            .database
            .active_quizzes(member.venue_id)
            .await?;

        Ok(quizzes.into_iter().last().map(QuizView::from))
    }

    /// Participants of the venue by quiz score
    pub async fn leaderboard(&self, member: &Member) -> CollabResult<Vec<LeaderboardEntry>> {
        self.leaderboard_of(member.venue_id, self.context.config.leaderboard_size)
            .await
    }

    pub(crate) async fn leaderboard_of(
        &self,
        venue_id: PrimaryKey,
        limit: usize,
    ) -> CollabResult<Vec<LeaderboardEntry>> {
        let participants = self.context.database.leaderboard(venue_id, limit).await?;

        Ok(participants.into_iter().map(Into::into).collect())
    }

    fn category(&self, id: &str) -> CollabResult<&QuizCategory> {
        self.context
            .bank
            .category(id)
            .ok_or_else(|| CollabError::invalid(format!("Unknown quiz category {}", id)))
    }

    async fn quiz(&self, venue_id: PrimaryKey, quiz_id: PrimaryKey) -> CollabResult<QuizData> {
        Ok(self
            .context
            .database
            .quiz_by_id(venue_id, quiz_id)
            .await
            .or_not_found("quiz", "id")?)
    }

    /// Clears the way for a new quiz: ends every active question and session of the venue.
    /// The transition lock must be held.
    async fn replace_active(&self, venue_id: PrimaryKey) -> CollabResult<()> {
        self.end_active(venue_id).await?;

        for session in self.context.database.active_quiz_sessions(venue_id).await? {
            self.context
                .database
                .update_quiz_session(QuizSessionUpdate {
                    id: session.id,
                    venue_id,
                    status: Some(QuizStatus::Ended),
                    ended_at: Some(Utc::now()),
                    ..Default::default()
                })
                .await?;

            info!("Quiz session {} was replaced", session.id);
        }

        Ok(())
    }

    /// Ends every active question of the venue. The transition lock must be held.
    async fn end_active(&self, venue_id: PrimaryKey) -> CollabResult<()> {
        for quiz in self.context.database.active_quizzes(venue_id).await? {
            self.close(&quiz).await?;
        }

        Ok(())
    }

    async fn close(&self, quiz: &QuizData) -> CollabResult<QuizResults> {
        let db = &self.context.database;

        db.end_quiz(quiz.venue_id, quiz.id).await?;
        let answers = db.answers_for_quiz(quiz.id).await?;

        let results = QuizResults {
            quiz_id: quiz.id,
            correct_answer: quiz.question.correct_index,
            correct_option: quiz
                .question
                .correct_option()
                .unwrap_or_default()
                .to_string(),
            winners: answers
                .iter()
                .filter(|a| a.is_correct)
                .map(|a| a.nickname.clone())
                .collect(),
            total_answers: answers.len(),
        };

        info!(
            "Quiz {} ended, {} of {} answered correctly",
            quiz.id,
            results.winners.len(),
            results.total_answers
        );

        self.context
            .emit(quiz.venue_id, CollabEvent::QuizEnded(results.clone()));

        Ok(results)
    }

    async fn open_session_question(
        &self,
        session: &QuizSessionData,
        index: i32,
    ) -> CollabResult<QuizView> {
        let question = session
            .questions
            .get(index as usize)
            .cloned()
            .ok_or_else(|| CollabError::conflict("Quiz session has no such question"))?;

        self.open(NewQuiz {
            session_id: Some(session.id),
            venue_id: session.venue_id,
            category: Some(session.category.clone()),
            category_name: Some(session.category_name.clone()),
            question,
            question_number: index + 1,
            total_questions: session.total_questions,
        })
        .await
    }

    async fn open(&self, new_quiz: NewQuiz) -> CollabResult<QuizView> {
        let venue_id = new_quiz.venue_id;
        let quiz = self.context.database.create_quiz(new_quiz).await?;
        let view = QuizView::from(quiz);

        info!("Quiz {} started in venue {}: {}", view.id, venue_id, view.question);

        self.context
            .emit(venue_id, CollabEvent::QuizStarted(view.clone()));

        Ok(view)
    }
}

impl From<QuizData> for QuizView {
    fn from(quiz: QuizData) -> Self {
        Self {
            id: quiz.id,
            session_id: quiz.session_id,
            category: quiz.category,
            category_name: quiz.category_name,
            question: quiz.question.question,
            options: quiz.question.options,
            points: quiz.question.points,
            question_number: quiz.question_number,
            total_questions: quiz.total_questions,
        }
    }
}

impl From<ParticipantData> for LeaderboardEntry {
    fn from(participant: ParticipantData) -> Self {
        Self {
            id: participant.id,
            nickname: participant.nickname,
            score: participant.score,
        }
    }
}

#[cfg(test)]
mod test {
    use neonpub_core::Config;

    use super::{CustomQuestion, NextQuestion};
    use crate::{testing::Harness, CollabError};

    fn custom(correct_index: usize) -> CustomQuestion {
        CustomQuestion {
            question: "Who sang 'Imagine'?".to_string(),
            options: vec!["John Lennon".to_string(), "Paul McCartney".to_string()],
            correct_index,
            points: None,
        }
    }

    #[tokio::test]
    async fn a_session_of_three_questions() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let bob = harness.join("Bob").await;
        let quizzes = &harness.collab.quizzes;
        let admin = &harness.admin;

        let first = quizzes.start_session(admin, "anni80", 3).await.unwrap();
        assert_eq!(first.question_number, 1);
        assert_eq!(first.total_questions, 3);
        assert_eq!(first.category.as_deref(), Some("anni80"));

        let session_id = first.session_id.unwrap();
        let mut ids = vec![first.id];

        for number in [2, 3] {
            let NextQuestion::Started(quiz) = quizzes.next_question(admin, session_id).await.unwrap()
            else {
                panic!("expected question {}", number);
            };

            assert_eq!(quiz.question_number, number);
            assert_eq!(quiz.session_id, Some(session_id));
            ids.push(quiz.id);
        }

        // Fresh identity for every question, so answers don't carry over
        ids.dedup();
        assert_eq!(ids.len(), 3);

        let active = quizzes.active(&alice).await.unwrap().unwrap();
        assert_eq!(active.id, ids[2]);

        let bank_question = harness
            .collab
            .bank()
            .category("anni80")
            .unwrap()
            .questions
            .iter()
            .find(|q| q.question == active.question)
            .unwrap()
            .clone();

        let outcome = quizzes
            .answer(&bob, active.id, bank_question.correct_index)
            .await
            .unwrap();
        assert!(outcome.is_correct);

        let NextQuestion::SessionEnded { leaderboard, .. } =
            quizzes.next_question(admin, session_id).await.unwrap()
        else {
            panic!("expected the session to end");
        };

        assert_eq!(leaderboard[0].nickname, "Bob");
        assert_eq!(leaderboard[0].score, 10);
        assert!(quizzes.active(&alice).await.unwrap().is_none());

        let result = quizzes.next_question(admin, session_id).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let types = harness.event_types();
        assert_eq!(types.iter().filter(|t| *t == "quiz_started").count(), 3);
        assert_eq!(types.iter().filter(|t| *t == "quiz_ended").count(), 3);
        assert_eq!(types.last().unwrap(), "quiz_session_ended");
    }

    #[tokio::test]
    async fn sessions_are_bounded_by_the_category() {
        let harness = Harness::new().await;
        let quizzes = &harness.collab.quizzes;
        let admin = &harness.admin;

        for (category, count) in [("anni80", 6), ("anni80", 0), ("anni70", 1)] {
            let result = quizzes.start_session(admin, category, count).await;
            assert!(matches!(result, Err(CollabError::InvalidArgument(_))));
        }

        let quiz = quizzes.start_session(admin, "rock", 5).await.unwrap();
        assert_eq!(quiz.total_questions, 5);
    }

    #[tokio::test]
    async fn answers_are_scored_once() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let bob = harness.join("Bob").await;
        let quizzes = &harness.collab.quizzes;

        let quiz = quizzes.start(&harness.admin, custom(0)).await.unwrap();
        assert_eq!(quiz.points, 10);

        let outcome = quizzes.answer(&alice, quiz.id, 0).await.unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.points_earned, 10);

        let result = quizzes.answer(&alice, quiz.id, 1).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let result = quizzes.answer(&bob, quiz.id, 2).await;
        assert!(matches!(result, Err(CollabError::InvalidArgument(_))));

        let outcome = quizzes.answer(&bob, quiz.id, 1).await.unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.points_earned, 0);

        let result = quizzes.answer(&harness.admin, quiz.id, 0).await;
        assert!(matches!(result, Err(CollabError::Forbidden(_))));

        let leaderboard = quizzes.leaderboard(&bob).await.unwrap();
        let scores: Vec<_> = leaderboard
            .iter()
            .map(|e| (e.nickname.as_str(), e.score))
            .collect();
        assert_eq!(scores, vec![("Alice", 10), ("Bob", 0)]);
    }

    #[tokio::test]
    async fn ending_reveals_the_answer_and_winners() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let bob = harness.join("Bob").await;
        let carol = harness.join("Carol").await;
        let quizzes = &harness.collab.quizzes;

        let quiz = quizzes.start(&harness.admin, custom(0)).await.unwrap();
        quizzes.answer(&alice, quiz.id, 0).await.unwrap();
        quizzes.answer(&bob, quiz.id, 1).await.unwrap();
        quizzes.answer(&carol, quiz.id, 0).await.unwrap();

        let results = quizzes.end(&harness.admin, quiz.id).await.unwrap();
        assert_eq!(results.correct_answer, 0);
        assert_eq!(results.correct_option, "John Lennon");
        assert_eq!(results.winners, vec!["Alice", "Carol"]);
        assert_eq!(results.total_answers, 3);

        let result = quizzes.answer(&bob, quiz.id, 0).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let result = quizzes.end(&harness.admin, quiz.id).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let events = harness.events();
        let started = &events[0];
        assert_eq!(started["type"], "quiz_started");
        assert!(started["data"].get("correct_index").is_none());

        let ended = events.last().unwrap();
        assert_eq!(ended["type"], "quiz_ended");
        assert_eq!(ended["data"]["correct_option"], "John Lennon");
    }

    #[tokio::test]
    async fn starting_ends_the_previous_question() {
        let mut harness = Harness::new().await;
        let quizzes = &harness.collab.quizzes;

        let first = quizzes.start(&harness.admin, custom(0)).await.unwrap();
        let second = quizzes.start_preset(&harness.admin, "pop_moderno").await.unwrap();

        let active = quizzes.active(&harness.admin).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(active.category_name, second.category_name);

        let result = quizzes.end(&harness.admin, first.id).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        assert_eq!(
            harness.event_types(),
            vec!["quiz_started", "quiz_ended", "quiz_started"]
        );
    }

    #[tokio::test]
    async fn a_new_session_retires_the_previous_one() {
        let harness = Harness::new().await;
        let quizzes = &harness.collab.quizzes;
        let admin = &harness.admin;

        let old = quizzes.start_session(admin, "anni80", 3).await.unwrap();
        let new = quizzes.start_session(admin, "rock", 3).await.unwrap();

        let result = quizzes.next_question(admin, old.session_id.unwrap()).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let active = quizzes.active(admin).await.unwrap().unwrap();
        assert_eq!(active.id, new.id);
        assert_eq!(active.session_id, new.session_id);

        quizzes.start(admin, custom(0)).await.unwrap();
        let result = quizzes.next_question(admin, new.session_id.unwrap()).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));
    }

    #[tokio::test]
    async fn custom_questions_are_validated() {
        let harness = Harness::with_config(Config {
            quiz_points: 25,
            ..Default::default()
        })
        .await;
        let quizzes = &harness.collab.quizzes;

        let result = quizzes.start(&harness.admin, custom(2)).await;
        assert!(matches!(result, Err(CollabError::InvalidArgument(_))));

        let mut question = custom(0);
        question.options.truncate(1);
        let result = quizzes.start(&harness.admin, question).await;
        assert!(matches!(result, Err(CollabError::InvalidArgument(_))));

        let alice = harness.join("Alice").await;
        let result = quizzes.start(&alice, custom(0)).await;
        assert!(matches!(result, Err(CollabError::Forbidden(_))));

        let quiz = quizzes.start_preset(&harness.admin, "italiane").await.unwrap();
        assert_eq!(quiz.points, 25);
    }

    #[tokio::test]
    async fn quizzes_of_other_venues_are_not_found() {
        let harness = Harness::new().await;
        let quizzes = &harness.collab.quizzes;

        let quiz = quizzes.start(&harness.admin, custom(0)).await.unwrap();
        let (_, other_admin) = Harness::create_venue(&harness.collab, "OTHER001").await;

        let result = quizzes.end(&other_admin, quiz.id).await;
        assert!(matches!(result, Err(CollabError::NotFound("quiz"))));
        assert!(quizzes.active(&other_admin).await.unwrap().is_none());
    }
}
