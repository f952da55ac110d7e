use crate::config::RecognitionConfig;
use crate::error::HubError;
use crate::face::{MemberId, StabilityBuffer};

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use tracing::{debug, info};

/// A buffer per camera feed of one household.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub user_id: String,
    pub source: String,
}

impl FeedKey {
    pub fn new(user_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug)]
pub enum RecognitionMessage {
    /// Push one match decision and reply with the reported member.
    Observe(FeedKey, Option<MemberId>, RpcReplyPort<Option<MemberId>>),
    /// Currently reported member, without recording anything.
    Current(FeedKey, RpcReplyPort<Option<MemberId>>),
    /// The camera stopped; forget the feed's history.
    Reset(FeedKey),
}

/// Handle for the actor owning every stability buffer.
#[derive(Clone)]
pub struct RecognitionHandle {
    actor: ActorRef<RecognitionMessage>,
}

impl RecognitionHandle {
    pub async fn observe(
        &self,
        key: FeedKey,
        reading: Option<MemberId>,
    ) -> Result<Option<MemberId>, HubError> {
        ractor::call!(self.actor, RecognitionMessage::Observe, key, reading)
            .map_err(|e| HubError::RactorError(format!("Observe RPC failed: {e}")))
    }

    pub async fn current(&self, key: FeedKey) -> Result<Option<MemberId>, HubError> {
        ractor::call!(self.actor, RecognitionMessage::Current, key)
            .map_err(|e| HubError::RactorError(format!("Current RPC failed: {e}")))
    }

    pub fn reset(&self, key: FeedKey) -> Result<(), HubError> {
        ractor::cast!(self.actor, RecognitionMessage::Reset(key))
            .map_err(|e| HubError::RactorError(format!("Reset cast failed: {e}")))
    }
}

struct RecognitionState {
    window: usize,
    min_votes: usize,
    buffers: HashMap<FeedKey, StabilityBuffer>,
}

impl RecognitionState {
    fn buffer(&mut self, key: FeedKey) -> &mut StabilityBuffer {
        let (window, min_votes) = (self.window, self.min_votes);
        self.buffers
            .entry(key)
            .or_insert_with(|| StabilityBuffer::new(window, min_votes))
    }
}

struct RecognitionActor;

#[ractor::async_trait]
impl Actor for RecognitionActor {
    type Msg = RecognitionMessage;
    type State = RecognitionState;
    type Arguments = RecognitionConfig;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        cfg: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(
            window = cfg.window,
            min_votes = cfg.min_votes,
            "recognition actor started"
        );
        Ok(RecognitionState {
            window: cfg.window,
            min_votes: cfg.min_votes,
            buffers: HashMap::new(),
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RecognitionMessage::Observe(key, reading, rp) => {
                let reported = state.buffer(key).observe(reading);
                let _ = rp.send(reported);
            }
            RecognitionMessage::Current(key, rp) => {
                let reported = state.buffers.get(&key).and_then(StabilityBuffer::reported);
                let _ = rp.send(reported);
            }
            RecognitionMessage::Reset(key) => {
                if state.buffers.remove(&key).is_some() {
                    debug!(user_id = %key.user_id, source = %key.source, "recognition buffer cleared");
                }
            }
        }
        Ok(())
    }
}

/// Spawn the recognition actor and return a handle.
pub async fn spawn(cfg: RecognitionConfig) -> Result<RecognitionHandle, HubError> {
    let (actor, _jh) = Actor::spawn(None, RecognitionActor, cfg)
        .await
        .map_err(|e| HubError::RactorError(format!("spawn RecognitionActor failed: {e}")))?;
    Ok(RecognitionHandle { actor })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffers_are_independent_per_feed() {
        let handle = spawn(RecognitionConfig::default()).await.unwrap();
        let door = FeedKey::new("alice", "door");
        let garden = FeedKey::new("alice", "garden");

        assert_eq!(handle.observe(door.clone(), Some(7)).await.unwrap(), None);
        assert_eq!(handle.observe(door.clone(), Some(7)).await.unwrap(), Some(7));
        assert_eq!(handle.observe(garden.clone(), Some(7)).await.unwrap(), None);

        // one stray reading does not flip the reported member
        assert_eq!(handle.observe(door.clone(), Some(9)).await.unwrap(), Some(7));
        assert_eq!(handle.current(door.clone()).await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn reset_forgets_history() {
        let handle = spawn(RecognitionConfig::default()).await.unwrap();
        let key = FeedKey::new("alice", "door");
        handle.observe(key.clone(), Some(1)).await.unwrap();
        handle.observe(key.clone(), Some(1)).await.unwrap();
        handle.reset(key.clone()).unwrap();
        assert_eq!(handle.current(key.clone()).await.unwrap(), None);
        assert_eq!(handle.observe(key, Some(1)).await.unwrap(), None);
    }
}
