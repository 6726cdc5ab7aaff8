// ABOUTME: Per-guild play queue with a now-playing cursor
// ABOUTME: Operations return the playback command to issue instead of calling the node

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::Error;
use crate::model::track::Track;
use crate::protocol::messages::Event;
use crate::queue::{PlaybackCommand, RepeatMode, ShuffleMode, Step};
use crate::Result;

/// Ordered tracks for one guild
///
/// `now_playing_pos` always satisfies `0 <= now_playing_pos <= len`; it
/// equals `len` when the queue is exhausted and nothing is playing.
#[derive(Debug, Clone)]
pub struct Queue {
    guild_id: u64,
    tracks: Vec<Track>,
    now_playing_pos: usize,
    paused: bool,
    repeat_mode: RepeatMode,
}

impl Queue {
    /// Empty queue for a guild
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            tracks: Vec::new(),
            now_playing_pos: 0,
            paused: false,
            repeat_mode: RepeatMode::None,
        }
    }

    /// Guild this queue belongs to
    pub fn guild_id(&self) -> u64 {
        self.guild_id
    }

    /// All tracks, played and upcoming
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the queue holds no tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Cursor position
    pub fn now_playing_pos(&self) -> usize {
        self.now_playing_pos
    }

    /// Track under the cursor
    pub fn now_playing(&self) -> Option<&Track> {
        self.tracks.get(self.now_playing_pos)
    }

    /// Whether auto-advance and play commands are suppressed
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current repeat mode
    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    /// Set the repeat mode
    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    /// Set the paused flag
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Append a track
    ///
    /// Returns a play command when the new track becomes the current one,
    /// i.e. the queue was empty or already exhausted.
    pub fn add(&mut self, track: Track) -> Option<PlaybackCommand> {
        self.tracks.push(track);

        if !self.paused && self.now_playing_pos == self.tracks.len() - 1 {
            self.now_playing().map(|t| PlaybackCommand::Play(t.encoded.clone()))
        } else {
            None
        }
    }

    /// Move the cursor forward; no-op once the queue is exhausted
    pub fn next(&mut self) -> Step {
        if self.now_playing_pos >= self.tracks.len() {
            return Step::default();
        }
        self.move_to(self.now_playing_pos + 1)
    }

    /// Move the cursor back; no-op at the first track
    pub fn previous(&mut self) -> Step {
        if self.now_playing_pos == 0 {
            return Step::default();
        }
        self.move_to(self.now_playing_pos - 1)
    }

    /// Move the cursor to `index`, which may equal the length to stop
    pub fn skip_to(&mut self, index: usize) -> Result<Step> {
        if index > self.tracks.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            });
        }
        Ok(self.move_to(index))
    }

    fn move_to(&mut self, index: usize) -> Step {
        self.now_playing_pos = index;
        let now_playing = self.now_playing().cloned();
        let command = self.command_for_current();
        Step {
            now_playing,
            command,
        }
    }

    fn command_for_current(&self) -> Option<PlaybackCommand> {
        if self.paused {
            return None;
        }
        Some(match self.now_playing() {
            Some(track) => PlaybackCommand::Play(track.encoded.clone()),
            None => PlaybackCommand::Stop,
        })
    }

    /// Shuffle around the current track using the thread-local RNG
    pub fn shuffle(&mut self, mode: ShuffleMode) {
        self.shuffle_with(mode, &mut rand::rng());
    }

    /// Shuffle around the current track
    ///
    /// The track under the cursor never moves. [`ShuffleMode::Split`] shuffles
    /// history and upcoming tracks separately; [`ShuffleMode::Whole`] pools
    /// them and deals the result back into the same two slices.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, mode: ShuffleMode, rng: &mut R) {
        let pos = self.now_playing_pos;
        let upcoming_start = (pos + 1).min(self.tracks.len());

        match mode {
            ShuffleMode::Split => {
                self.tracks[..pos].shuffle(rng);
                self.tracks[upcoming_start..].shuffle(rng);
            }
            ShuffleMode::Whole => {
                let mut pool: Vec<Track> = self.tracks[..pos]
                    .iter()
                    .chain(&self.tracks[upcoming_start..])
                    .cloned()
                    .collect();
                pool.shuffle(rng);

                let upcoming = pool.split_off(pos);
                self.tracks[..pos].clone_from_slice(&pool);
                self.tracks[upcoming_start..].clone_from_slice(&upcoming);
            }
        }
    }

    /// Remove tracks by position
    ///
    /// Every index must be below the length; duplicates are ignored. Entries
    /// before the cursor shift it down. When the current track is removed the
    /// cursor stays put, so the following track becomes current and a command
    /// for it is returned.
    pub fn remove_indices(&mut self, indices: &[usize]) -> Result<Step> {
        let len = self.tracks.len();
        if let Some(&index) = indices.iter().find(|&&index| index >= len) {
            return Err(Error::IndexOutOfRange { index, len });
        }

        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        let mut current_removed = false;
        for index in sorted {
            self.tracks.remove(index);
            if index < self.now_playing_pos {
                self.now_playing_pos -= 1;
            } else if index == self.now_playing_pos {
                current_removed = true;
            }
        }
        self.now_playing_pos = self.now_playing_pos.min(self.tracks.len());

        let now_playing = self.now_playing().cloned();
        let command = if current_removed {
            self.command_for_current()
        } else {
            None
        };
        Ok(Step {
            now_playing,
            command,
        })
    }

    /// Remove tracks by value, one occurrence per given track
    ///
    /// Fails without changing anything if a track is not queued.
    pub fn remove_tracks(&mut self, tracks: &[Track]) -> Result<Step> {
        let mut indices: Vec<usize> = Vec::with_capacity(tracks.len());
        for track in tracks {
            let index = self
                .tracks
                .iter()
                .enumerate()
                .position(|(i, queued)| queued == track && !indices.contains(&i))
                .ok_or(Error::TrackNotQueued)?;
            indices.push(index);
        }
        self.remove_indices(&indices)
    }

    /// Remove every track and reset the cursor
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.now_playing_pos = 0;
    }

    /// React to a track lifecycle event from the node
    ///
    /// Only `TrackEnd` with reason `FINISHED`, `TrackStuck` and
    /// `TrackException` for this guild advance the queue, and only while not
    /// paused.
    pub fn on_playback_event(&mut self, event: &Event) -> Step {
        let encoded_track = match event {
            Event::TrackEnd(e) if e.reason.may_start_next() => &e.encoded_track,
            Event::TrackStuck(e) => &e.encoded_track,
            Event::TrackException(e) => &e.encoded_track,
            _ => return Step::default(),
        };

        if event.guild_id() != Some(self.guild_id) || self.paused {
            return Step::default();
        }

        match self.repeat_mode {
            RepeatMode::One => Step {
                now_playing: self.now_playing().cloned(),
                command: Some(PlaybackCommand::Play(encoded_track.clone())),
            },
            RepeatMode::All if self.now_playing_pos + 1 >= self.tracks.len() => self.move_to(0),
            _ => self.next(),
        }
    }
}
