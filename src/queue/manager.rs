// ABOUTME: Registry of per-guild queues that issues player commands
// ABOUTME: Auto-advances queues on TrackEnd, TrackStuck and TrackException events

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::Error;
use crate::events::{BoxError, EventDispatcher, TrackEnd, TrackException, TrackStuck};
use crate::model::filters::Filters;
use crate::model::player::UpdatePlayer;
use crate::model::track::Track;
use crate::protocol::messages::{Event, EventVariant};
use crate::queue::{PlaybackCommand, PlayerController, Queue, RepeatMode, ShuffleMode, Step};
use crate::session::Session;
use crate::Result;

/// Shared handle to one guild's queue
pub type QueueHandle = Arc<Mutex<Queue>>;

/// Owns the play queues of every guild
///
/// Each queue sits behind its own async mutex, held while the resulting
/// command is sent, so a manual skip and an automatic advance for the same
/// guild never interleave.
pub struct PlayerManager {
    controller: Arc<dyn PlayerController>,
    queues: RwLock<HashMap<u64, QueueHandle>>,
}

impl std::fmt::Debug for PlayerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerManager")
            .field("queues", &self.queues.read().len())
            .finish()
    }
}

impl PlayerManager {
    /// Create a manager that sends commands through `controller`
    ///
    /// Call [`PlayerManager::register`] to enable auto-advance.
    pub fn new(controller: Arc<dyn PlayerController>) -> Arc<Self> {
        Arc::new(Self {
            controller,
            queues: RwLock::new(HashMap::new()),
        })
    }

    /// Create a manager for a session and subscribe it to the session's events
    pub fn for_session(session: &Session) -> Arc<Self> {
        let manager = Self::new(Arc::new(session.rest().clone()));
        manager.register(session.dispatcher());
        manager
    }

    /// Listen for track lifecycle events on `dispatcher`
    ///
    /// Listeners hold a weak reference, so they become no-ops once the
    /// manager is dropped.
    pub fn register(self: &Arc<Self>, dispatcher: &EventDispatcher) {
        self.register_variant::<TrackEnd>(dispatcher);
        self.register_variant::<TrackStuck>(dispatcher);
        self.register_variant::<TrackException>(dispatcher);
    }

    fn register_variant<E>(self: &Arc<Self>, dispatcher: &EventDispatcher)
    where
        E: EventVariant + Into<Event>,
    {
        let weak: Weak<Self> = Arc::downgrade(self);
        dispatcher.listen(move |payload: E| {
            let weak = weak.clone();
            async move {
                if let Some(manager) = weak.upgrade() {
                    manager.handle_event(&payload.into()).await?;
                }
                Ok::<(), BoxError>(())
            }
        });
    }

    /// Apply a track lifecycle event to the matching guild's queue
    ///
    /// Events for guilds without a queue are ignored.
    pub async fn handle_event(&self, event: &Event) -> Result<()> {
        let Some(queue) = event.guild_id().and_then(|guild_id| self.get_queue(guild_id)) else {
            return Ok(());
        };

        let mut queue = queue.lock().await;
        let step = queue.on_playback_event(event);
        if let Some(command) = &step.command {
            log::debug!("Guild {}: {:?} after {:?}", queue.guild_id(), command, event.kind());
        }
        self.execute(queue.guild_id(), step).await?;
        Ok(())
    }

    /// The guild's queue, if one exists
    pub fn get_queue(&self, guild_id: u64) -> Option<QueueHandle> {
        self.queues.read().get(&guild_id).cloned()
    }

    /// Create a queue for a guild
    pub fn create_queue(&self, guild_id: u64) -> Result<QueueHandle> {
        let mut queues = self.queues.write();
        if queues.contains_key(&guild_id) {
            return Err(Error::QueueAlreadyExists(guild_id));
        }
        let queue = Arc::new(Mutex::new(Queue::new(guild_id)));
        queues.insert(guild_id, queue.clone());
        log::debug!("Created queue for guild {}", guild_id);
        Ok(queue)
    }

    /// The guild's queue, created if missing
    pub fn get_or_create_queue(&self, guild_id: u64) -> QueueHandle {
        self.queues
            .write()
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(Queue::new(guild_id))))
            .clone()
    }

    /// Forget a guild's queue
    pub fn delete_queue(&self, guild_id: u64) -> Result<()> {
        self.queues
            .write()
            .remove(&guild_id)
            .map(|_| ())
            .ok_or(Error::QueueNotFound(guild_id))
    }

    fn require_queue(&self, guild_id: u64) -> Result<QueueHandle> {
        self.get_queue(guild_id).ok_or(Error::QueueNotFound(guild_id))
    }

    async fn execute(&self, guild_id: u64, step: Step) -> Result<Option<Track>> {
        match step.command {
            Some(PlaybackCommand::Play(encoded)) => self.play(guild_id, encoded).await?,
            Some(PlaybackCommand::Stop) => self.stop(guild_id).await?,
            None => {}
        }
        Ok(step.now_playing)
    }

    /// Append a track to the guild's queue, creating the queue if needed
    ///
    /// Starts playing it when nothing else is queued to play.
    pub async fn add(&self, guild_id: u64, track: Track) -> Result<()> {
        let queue = self.get_or_create_queue(guild_id);
        let mut queue = queue.lock().await;
        if let Some(PlaybackCommand::Play(encoded)) = queue.add(track) {
            self.play(guild_id, encoded).await?;
        }
        Ok(())
    }

    /// Play an encoded track right away, bypassing the queue
    pub async fn play(&self, guild_id: u64, encoded_track: impl Into<String>) -> Result<()> {
        self.controller
            .update_player(guild_id, UpdatePlayer::new().encoded_track(encoded_track))
            .await
    }

    /// Pause the player and suspend auto-advance
    pub async fn pause(&self, guild_id: u64) -> Result<()> {
        self.set_paused(guild_id, true).await
    }

    /// Resume the player and auto-advance
    pub async fn resume(&self, guild_id: u64) -> Result<()> {
        self.set_paused(guild_id, false).await
    }

    async fn set_paused(&self, guild_id: u64, paused: bool) -> Result<()> {
        self.controller
            .update_player(guild_id, UpdatePlayer::new().paused(paused))
            .await?;
        if let Some(queue) = self.get_queue(guild_id) {
            queue.lock().await.set_paused(paused);
        }
        Ok(())
    }

    /// Advance to the next track; stops at the end of the queue
    pub async fn next(&self, guild_id: u64) -> Result<Option<Track>> {
        let queue = self.require_queue(guild_id)?;
        let mut queue = queue.lock().await;
        let step = queue.next();
        self.execute(guild_id, step).await
    }

    /// Go back to the previous track; no-op at the first track
    pub async fn previous(&self, guild_id: u64) -> Result<Option<Track>> {
        let queue = self.require_queue(guild_id)?;
        let mut queue = queue.lock().await;
        let step = queue.previous();
        self.execute(guild_id, step).await
    }

    /// Jump to a position in the queue
    ///
    /// `index` may equal the queue length, which stops the player.
    pub async fn skip_to(&self, guild_id: u64, index: usize) -> Result<Option<Track>> {
        let queue = self.require_queue(guild_id)?;
        let mut queue = queue.lock().await;
        let step = queue.skip_to(index)?;
        self.execute(guild_id, step).await
    }

    /// Seek within the current track
    pub async fn seek_to(&self, guild_id: u64, position: Duration) -> Result<()> {
        self.controller
            .update_player(guild_id, UpdatePlayer::new().position(position))
            .await
    }

    /// Stop the current track; it cannot be resumed
    pub async fn stop(&self, guild_id: u64) -> Result<()> {
        self.controller
            .update_player(guild_id, UpdatePlayer::new().stop())
            .await
    }

    /// Destroy the guild's player and drop its queue
    pub async fn destroy(&self, guild_id: u64) -> Result<()> {
        self.controller.destroy_player(guild_id).await?;
        if self.delete_queue(guild_id).is_err() {
            log::debug!("Destroyed player for guild {} without a queue", guild_id);
        }
        Ok(())
    }

    /// Set the player volume, 0 to 1000
    pub async fn set_volume(&self, guild_id: u64, volume: u16) -> Result<()> {
        self.controller
            .update_player(guild_id, UpdatePlayer::new().volume(volume))
            .await
    }

    /// Replace the player's filter chain
    pub async fn set_filters(&self, guild_id: u64, filters: Filters) -> Result<()> {
        self.controller
            .update_player(guild_id, UpdatePlayer::new().filters(filters))
            .await
    }

    /// Set the queue's repeat mode
    pub async fn set_repeat_mode(&self, guild_id: u64, mode: RepeatMode) -> Result<()> {
        let queue = self.require_queue(guild_id)?;
        queue.lock().await.set_repeat_mode(mode);
        Ok(())
    }

    /// Shuffle the queue around the current track
    pub async fn shuffle(&self, guild_id: u64, mode: ShuffleMode) -> Result<()> {
        let queue = self.require_queue(guild_id)?;
        queue.lock().await.shuffle(mode);
        Ok(())
    }

    /// Remove tracks by value
    pub async fn remove_tracks(&self, guild_id: u64, tracks: &[Track]) -> Result<()> {
        let queue = self.require_queue(guild_id)?;
        let mut queue = queue.lock().await;
        let step = queue.remove_tracks(tracks)?;
        self.execute(guild_id, step).await?;
        Ok(())
    }

    /// Remove tracks by position
    pub async fn remove_indices(&self, guild_id: u64, indices: &[usize]) -> Result<()> {
        let queue = self.require_queue(guild_id)?;
        let mut queue = queue.lock().await;
        let step = queue.remove_indices(indices)?;
        self.execute(guild_id, step).await?;
        Ok(())
    }

    /// Empty the queue
    pub async fn clear(&self, guild_id: u64) -> Result<()> {
        let queue = self.require_queue(guild_id)?;
        queue.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::track::{sample_track, TrackEndReason};
    use async_trait::async_trait;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Play(u64, String),
        Stop(u64),
        Paused(u64, bool),
        Other(u64),
        Destroy(u64),
    }

    #[derive(Default)]
    struct Recorder {
        calls: parking_lot::Mutex<Vec<Call>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock())
        }
    }

    #[async_trait]
    impl PlayerController for Recorder {
        async fn update_player(&self, guild_id: u64, update: UpdatePlayer) -> Result<()> {
            let call = match (&update.encoded_track, update.paused) {
                (Some(Some(encoded)), _) => Call::Play(guild_id, encoded.clone()),
                (Some(None), _) => Call::Stop(guild_id),
                (None, Some(paused)) => Call::Paused(guild_id, paused),
                _ => Call::Other(guild_id),
            };
            self.calls.lock().push(call);
            Ok(())
        }

        async fn destroy_player(&self, guild_id: u64) -> Result<()> {
            self.calls.lock().push(Call::Destroy(guild_id));
            Ok(())
        }
    }

    /// Records like [`Recorder`], but each player update waits for a permit
    struct Gated {
        recorder: Recorder,
        gate: tokio::sync::Semaphore,
    }

    #[async_trait]
    impl PlayerController for Gated {
        async fn update_player(&self, guild_id: u64, update: UpdatePlayer) -> Result<()> {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            self.recorder.update_player(guild_id, update).await
        }

        async fn destroy_player(&self, guild_id: u64) -> Result<()> {
            self.recorder.destroy_player(guild_id).await
        }
    }

    fn manager() -> (Arc<PlayerManager>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (PlayerManager::new(recorder.clone()), recorder)
    }

    fn play(guild_id: u64, encoded: &str) -> Call {
        Call::Play(guild_id, encoded.to_string())
    }

    async fn filled(manager: &PlayerManager, guild_id: u64, names: &[&str]) {
        for name in names {
            manager.add(guild_id, sample_track(name)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_queue_registry() {
        let (manager, _) = manager();
        manager.create_queue(1).unwrap();
        assert!(matches!(
            manager.create_queue(1),
            Err(Error::QueueAlreadyExists(1))
        ));
        assert!(Arc::ptr_eq(
            &manager.get_or_create_queue(1),
            &manager.get_queue(1).unwrap()
        ));

        manager.delete_queue(1).unwrap();
        assert!(manager.get_queue(1).is_none());
        assert!(matches!(manager.delete_queue(1), Err(Error::QueueNotFound(1))));
    }

    #[tokio::test]
    async fn test_unknown_guild_operations_fail() {
        let (manager, recorder) = manager();
        assert!(matches!(manager.next(9).await, Err(Error::QueueNotFound(9))));
        assert!(matches!(manager.skip_to(9, 0).await, Err(Error::QueueNotFound(9))));
        assert!(matches!(
            manager.set_repeat_mode(9, RepeatMode::All).await,
            Err(Error::QueueNotFound(9))
        ));
        assert!(matches!(manager.clear(9).await, Err(Error::QueueNotFound(9))));
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_add_next_previous() {
        let (manager, recorder) = manager();
        filled(&manager, 1, &["A", "B"]).await;
        assert_eq!(recorder.take(), vec![play(1, "A")]);

        assert_eq!(manager.next(1).await.unwrap().unwrap().encoded, "B");
        assert_eq!(manager.next(1).await.unwrap(), None);
        assert_eq!(manager.next(1).await.unwrap(), None);
        assert_eq!(recorder.take(), vec![play(1, "B"), Call::Stop(1)]);

        assert_eq!(manager.previous(1).await.unwrap().unwrap().encoded, "B");
        assert_eq!(recorder.take(), vec![play(1, "B")]);
    }

    #[tokio::test]
    async fn test_skip_to_out_of_range() {
        let (manager, recorder) = manager();
        filled(&manager, 1, &["A"]).await;
        recorder.take();

        assert!(matches!(
            manager.skip_to(1, 2).await,
            Err(Error::IndexOutOfRange { index: 2, len: 1 })
        ));
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_track_end_advances_registered_manager() {
        let (manager, recorder) = manager();
        let dispatcher = EventDispatcher::new();
        manager.register(&dispatcher);
        filled(&manager, 1, &["A", "B", "C"]).await;
        recorder.take();

        let event = Event::TrackEnd(TrackEnd {
            guild_id: 1,
            encoded_track: "A".to_string(),
            reason: TrackEndReason::Finished,
        });
        for handle in dispatcher.dispatch(&event) {
            handle.await.unwrap();
        }

        assert_eq!(recorder.take(), vec![play(1, "B")]);
        let queue = manager.get_queue(1).unwrap();
        assert_eq!(queue.lock().await.now_playing_pos(), 1);
    }

    #[tokio::test]
    async fn test_skip_waits_for_auto_advance_of_same_guild() {
        let gated = Arc::new(Gated {
            recorder: Recorder::default(),
            gate: tokio::sync::Semaphore::new(1),
        });
        let manager = PlayerManager::new(gated.clone());
        filled(&manager, 1, &["A", "B", "C"]).await;
        assert_eq!(gated.recorder.take(), vec![play(1, "A")]);

        let advancing = manager.clone();
        let advance = tokio::spawn(async move {
            let event = Event::TrackEnd(TrackEnd {
                guild_id: 1,
                encoded_track: "A".to_string(),
                reason: TrackEndReason::Finished,
            });
            advancing.handle_event(&event).await
        });

        // Wait until the advance holds the queue while its command is stuck
        let queue = manager.get_queue(1).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while queue.try_lock().is_ok() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let skipping = manager.clone();
        let skip = tokio::spawn(async move { skipping.skip_to(1, 0).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!skip.is_finished());
        assert!(gated.recorder.take().is_empty());

        gated.gate.add_permits(2);
        advance.await.unwrap().unwrap();
        assert_eq!(skip.await.unwrap().unwrap().unwrap().encoded, "A");

        assert_eq!(gated.recorder.take(), vec![play(1, "B"), play(1, "A")]);
        assert_eq!(queue.lock().await.now_playing_pos(), 0);
    }

    #[tokio::test]
    async fn test_add_creates_missing_queue() {
        let (manager, recorder) = manager();
        assert!(manager.get_queue(4).is_none());

        manager.add(4, sample_track("A")).await.unwrap();
        assert_eq!(recorder.take(), vec![play(4, "A")]);
        assert_eq!(manager.get_queue(4).unwrap().lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_events_for_other_guilds_ignored() {
        let (manager, recorder) = manager();
        filled(&manager, 1, &["A", "B"]).await;
        recorder.take();

        let event = Event::TrackEnd(TrackEnd {
            guild_id: 2,
            encoded_track: "A".to_string(),
            reason: TrackEndReason::Finished,
        });
        manager.handle_event(&event).await.unwrap();
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_pause_suppresses_auto_advance() {
        let (manager, recorder) = manager();
        filled(&manager, 1, &["A", "B"]).await;
        manager.pause(1).await.unwrap();
        recorder.take();

        let event = Event::TrackEnd(TrackEnd {
            guild_id: 1,
            encoded_track: "A".to_string(),
            reason: TrackEndReason::Finished,
        });
        manager.handle_event(&event).await.unwrap();
        assert!(recorder.take().is_empty());

        manager.resume(1).await.unwrap();
        manager.handle_event(&event).await.unwrap();
        assert_eq!(recorder.take(), vec![Call::Paused(1, false), play(1, "B")]);
    }

    #[tokio::test]
    async fn test_remove_current_plays_next() {
        let (manager, recorder) = manager();
        filled(&manager, 1, &["A", "B", "C"]).await;
        recorder.take();

        manager.remove_indices(1, &[0]).await.unwrap();
        assert_eq!(recorder.take(), vec![play(1, "B")]);

        manager
            .remove_tracks(1, &[sample_track("C")])
            .await
            .unwrap();
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_drops_queue() {
        let (manager, recorder) = manager();
        filled(&manager, 1, &["A"]).await;
        recorder.take();

        manager.destroy(1).await.unwrap();
        assert_eq!(recorder.take(), vec![Call::Destroy(1)]);
        assert!(manager.get_queue(1).is_none());

        // Destroying a player without a queue still reaches the node
        manager.destroy(2).await.unwrap();
        assert_eq!(recorder.take(), vec![Call::Destroy(2)]);
    }

    #[tokio::test]
    async fn test_dropped_manager_listeners_are_inert() {
        let (manager, recorder) = manager();
        let dispatcher = EventDispatcher::new();
        manager.register(&dispatcher);
        filled(&manager, 1, &["A", "B"]).await;
        recorder.take();
        drop(manager);

        let event = Event::TrackEnd(TrackEnd {
            guild_id: 1,
            encoded_track: "A".to_string(),
            reason: TrackEndReason::Finished,
        });
        for handle in dispatcher.dispatch(&event) {
            handle.await.unwrap();
        }
        assert!(recorder.take().is_empty());
    }
}
