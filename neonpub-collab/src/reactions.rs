use log::{debug, info};
use serde::Serialize;

use crate::{
    util::truncate_chars, CollabContext, CollabError, CollabEvent, CollabResult, Member,
    MessageData, MessageStatus, NewMessage, NewReaction, OptionalRecord, PrimaryKey,
    ReactionData,
};

/// An accepted reaction, and how many more the sender may send
#[derive(Debug, Clone, Serialize)]
pub struct SentReaction {
    pub reaction: ReactionData,
    pub remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReactionQuota {
    pub remaining: u32,
    pub limit: u32,
}

/// Audience reactions, moderated messages and screen effects.
///
/// Reactions are limited per participant and performance. Without an active
/// performance they are not limited at all.
pub struct Reactions {
    context: CollabContext,
}

impl Reactions {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Throws an emoji, and maybe a short message, at the screens
    pub async fn react(
        &self,
        member: &Member,
        emoji: &str,
        message: Option<&str>,
    ) -> CollabResult<SentReaction> {
        let participant_id = member.participant()?;
        let emoji = emoji.trim();

        if emoji.is_empty() {
            return Err(CollabError::invalid("Emoji cannot be empty"));
        }

        let max_length = self.context.config.message_max_length;
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(|m| truncate_chars(m, max_length));

        let room = self.context.room(member.venue_id);
        let _guard = room.lock_reactions().await;

        let limit = self.context.config.reaction_limit;
        let venue = self.context.venue(member.venue_id).await?;

        let count = match venue.active_performance_id {
            Some(performance_id) => Some(
                self.context
                    .database
                    .count_reactions(venue.id, performance_id, participant_id)
                    .await?,
            ),
            None => None,
        };

        if let Some(count) = count {
            if count >= limit as u64 {
                debug!(
                    "{} is out of reactions for performance {:?}",
                    member.nickname, venue.active_performance_id
                );
                return Err(CollabError::conflict("Reaction limit reached"));
            }
        }

        let reaction = self
            .context
            .database
            .create_reaction(NewReaction {
                venue_id: venue.id,
                performance_id: venue.active_performance_id,
                participant_id,
                nickname: member.nickname.clone(),
                emoji: emoji.to_string(),
                message,
            })
            .await?;

        self.context
            .emit(venue.id, CollabEvent::Reaction(reaction.clone()));

        let remaining = count.map_or(limit, |count| remaining(limit, count + 1));

        Ok(SentReaction {
            reaction,
            remaining,
        })
    }

    /// How many reactions the participant may still send during the active performance
    pub async fn remaining(&self, member: &Member) -> CollabResult<ReactionQuota> {
        let participant_id = member.participant()?;
        let limit = self.context.config.reaction_limit;
        let venue = self.context.venue(member.venue_id).await?;

        let remaining = match venue.active_performance_id {
            Some(performance_id) => {
                let count = self
                    .context
                    .database
                    .count_reactions(venue.id, performance_id, participant_id)
                    .await?;

                remaining(limit, count)
            }
            None => limit,
        };

        Ok(ReactionQuota { remaining, limit })
    }

    /// Sends a message, which waits for the admin before reaching the screens
    pub async fn send_message(&self, member: &Member, text: &str) -> CollabResult<MessageData> {
        let participant_id = member.participant()?;
        let text = text.trim();

        if text.is_empty() {
            return Err(CollabError::invalid("Message cannot be empty"));
        }

        let message = self
            .context
            .database
            .create_message(NewMessage {
                venue_id: member.venue_id,
                participant_id,
                nickname: member.nickname.clone(),
                text: truncate_chars(text, self.context.config.message_max_length),
            })
            .await?;

        self.context
            .emit(member.venue_id, CollabEvent::NewMessage(message.clone()));

        Ok(message)
    }

    pub async fn pending_messages(&self, member: &Member) -> CollabResult<Vec<MessageData>> {
        member.ensure_admin()?;

        Ok(self
            .context
            .database
            .messages_by_status(
                member.venue_id,
                MessageStatus::Pending,
                self.context.config.listing_limit,
            )
            .await?)
    }

    /// Shows a message on the screens
    pub async fn approve_message(
        &self,
        member: &Member,
        message_id: PrimaryKey,
    ) -> CollabResult<MessageData> {
        let message = self
            .moderate(member, message_id, MessageStatus::Approved)
            .await?;

        self.context
            .emit(member.venue_id, CollabEvent::MessageApproved(message.clone()));

        Ok(message)
    }

    pub async fn reject_message(
        &self,
        member: &Member,
        message_id: PrimaryKey,
    ) -> CollabResult<MessageData> {
        self.moderate(member, message_id, MessageStatus::Rejected)
            .await
    }

    /// Plays a visual effect on the screens of the venue
    pub fn effect(
        &self,
        member: &Member,
        effect_type: String,
        data: serde_json::Value,
    ) -> CollabResult<()> {
        member.ensure_admin()?;

        if effect_type.trim().is_empty() {
            return Err(CollabError::invalid("Effect type cannot be empty"));
        }

        info!("Effect {} sent to venue {}", effect_type, member.venue_id);

        self.context
            .emit(member.venue_id, CollabEvent::Effect { effect_type, data });

        Ok(())
    }

    async fn moderate(
        &self,
        member: &Member,
        message_id: PrimaryKey,
        status: MessageStatus,
    ) -> CollabResult<MessageData> {
        member.ensure_admin()?;

        let db = &self.context.database;

        let mut message = db
            .message_by_id(member.venue_id, message_id)
            .await
            .or_not_found("message", "id")?;

        if message.status != MessageStatus::Pending {
            return Err(CollabError::conflict(format!(
                "Message was already {}",
                message.status
            )));
        }

        db.set_message_status(member.venue_id, message_id, status)
            .await?;
        message.status = status;

        Ok(message)
    }
}

fn remaining(limit: u32, count: u64) -> u32 {
    (limit as u64).saturating_sub(count) as u32
}

#[cfg(test)]
mod test {
    use neonpub_core::Config;
    use serde_json::json;

    use super::ReactionQuota;
    use crate::{testing::Harness, CollabError, MessageStatus};

    async fn live(harness: &Harness) -> crate::Member {
        let singer = harness.join("Singer").await;
        let request = harness.queued(&singer, "Imagine").await;

        harness
            .collab
            .performances
            .start(&harness.admin, request.id, None)
            .await
            .unwrap();

        singer
    }

    #[tokio::test]
    async fn reactions_are_limited_per_performance() {
        let harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        live(&harness).await;

        let reactions = &harness.collab.reactions;

        for expected in [2, 1, 0] {
            let sent = reactions.react(&alice, "🔥", None).await.unwrap();
            assert_eq!(sent.remaining, expected);
        }

        let quota = reactions.remaining(&alice).await.unwrap();
        assert_eq!(quota, ReactionQuota { remaining: 0, limit: 3 });

        let result = reactions.react(&alice, "🔥", None).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let quota = reactions.remaining(&alice).await.unwrap();
        assert_eq!(quota.remaining, 0);

        // Someone else has a quota of their own
        let bob = harness.join("Bob").await;
        assert_eq!(reactions.remaining(&bob).await.unwrap().remaining, 3);
    }

    #[tokio::test]
    async fn reactions_without_a_performance_are_unlimited() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let reactions = &harness.collab.reactions;

        for _ in 0..5 {
            let sent = reactions.react(&alice, "👏", Some("bravo")).await.unwrap();
            assert_eq!(sent.remaining, 3);
            assert_eq!(sent.reaction.performance_id, None);
        }

        let quota = reactions.remaining(&alice).await.unwrap();
        assert_eq!(quota.remaining, 3);

        let events = harness.events();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0]["type"], "reaction");
        assert_eq!(events[0]["data"]["message"], "bravo");
    }

    #[tokio::test]
    async fn the_limit_is_configurable() {
        let harness = Harness::with_config(Config {
            reaction_limit: 1,
            ..Default::default()
        })
        .await;
        let alice = harness.join("Alice").await;
        live(&harness).await;

        let reactions = &harness.collab.reactions;

        assert_eq!(reactions.react(&alice, "🎤", None).await.unwrap().remaining, 0);
        assert!(reactions.react(&alice, "🎤", None).await.is_err());
    }

    #[tokio::test]
    async fn messages_are_truncated_and_moderated() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let reactions = &harness.collab.reactions;

        let long = "a".repeat(150);
        let message = reactions.send_message(&alice, &long).await.unwrap();
        assert_eq!(message.text.chars().count(), 100);
        assert_eq!(message.status, MessageStatus::Pending);

        let other = reactions.send_message(&alice, "ciao").await.unwrap();

        let result = reactions.send_message(&alice, "   ").await;
        assert!(matches!(result, Err(CollabError::InvalidArgument(_))));

        let result = reactions.pending_messages(&alice).await;
        assert!(matches!(result, Err(CollabError::Forbidden(_))));

        let pending = reactions.pending_messages(&harness.admin).await.unwrap();
        assert_eq!(pending.len(), 2);

        let approved = reactions
            .approve_message(&harness.admin, message.id)
            .await
            .unwrap();
        assert_eq!(approved.status, MessageStatus::Approved);

        let rejected = reactions
            .reject_message(&harness.admin, other.id)
            .await
            .unwrap();
        assert_eq!(rejected.status, MessageStatus::Rejected);

        let result = reactions.approve_message(&harness.admin, other.id).await;
        assert!(matches!(result, Err(CollabError::Conflict(_))));

        let result = reactions.approve_message(&harness.admin, 999).await;
        assert!(matches!(result, Err(CollabError::NotFound("message"))));

        assert!(reactions
            .pending_messages(&harness.admin)
            .await
            .unwrap()
            .is_empty());

        assert_eq!(
            harness.event_types(),
            vec!["new_message", "new_message", "message_approved"]
        );
    }

    #[tokio::test]
    async fn effects_reach_the_screens() {
        let mut harness = Harness::new().await;
        let alice = harness.join("Alice").await;
        let reactions = &harness.collab.reactions;

        let result = reactions.effect(&alice, "confetti".to_string(), json!({}));
        assert!(matches!(result, Err(CollabError::Forbidden(_))));

        reactions
            .effect(
                &harness.admin,
                "confetti".to_string(),
                json!({ "duration": 3 }),
            )
            .unwrap();

        assert_eq!(
            harness.events(),
            vec![json!({
                "type": "effect",
                "data": { "effect_type": "confetti", "data": { "duration": 3 } }
            })]
        );
    }
}
