//! Fixed-size pools of engine instances and the voice stealing policies.
//!
//! A [`VoicePool`] is created for one [`PoolKey`] and owns `N` engine
//! instances for its whole life. Pools never grow or shrink: a play request
//! always picks one of the existing slots, stealing it if it is busy.

use crate::backend::{AudioBackend, EventId, InstanceHandle};
use crate::config::{EventConfig, Polyphony, StealingPolicy};
use crate::error::{Result, VoxPoolError};
use crate::math::{Pose, Vec3};
use crate::playback::StopMode;
use crate::voice::VoiceSlot;
use std::fmt;
use uuid::Uuid;

/// Registry lookup key for a pool.
///
/// Exclusive keys are minted per binding and never match another binding.
/// Shared keys are the event id itself, so every shared binding of the same
/// event lands on the same pool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PoolKey {
    Exclusive(Uuid),
    Shared(EventId),
}

impl PoolKey {
    pub fn exclusive() -> Self {
        Self::Exclusive(Uuid::new_v4())
    }

    pub fn shared(event_id: impl Into<EventId>) -> Self {
        Self::Shared(event_id.into())
    }

    /// The key a binding with this configuration attaches under.
    pub fn for_config(config: &EventConfig) -> Self {
        if config.is_shared() {
            Self::Shared(config.event_id.clone())
        } else {
            Self::exclusive()
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive(id) => write!(f, "exclusive:{}", id),
            Self::Shared(event_id) => write!(f, "shared:{}", event_id),
        }
    }
}

/// The part of an [`EventConfig`] that shapes a pool.
///
/// For shared pools these come from whichever binding attached first.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    pub event_id: EventId,
    pub polyphony: Polyphony,
    pub voice_count: usize,
    pub stealing: StealingPolicy,
    pub preload_sample_data: bool,
}

impl PoolSettings {
    pub fn from_config(config: &EventConfig) -> Self {
        Self {
            event_id: config.event_id.clone(),
            polyphony: config.polyphony,
            voice_count: config.effective_voice_count(),
            stealing: config.stealing,
            preload_sample_data: config.preload_sample_data,
        }
    }
}

/// Fixed set of engine instances for one pool key.
#[derive(Debug)]
pub struct VoicePool {
    key: PoolKey,
    settings: PoolSettings,
    slots: Box<[VoiceSlot]>,
    cursor: usize,
    ref_count: u32,
    next_sequence: u64,
    destroyed: bool,
}

impl VoicePool {
    /// Create every instance the pool needs, or none at all.
    ///
    /// If the backend refuses any instance, the ones already created in this
    /// call are released again before the error is returned.
    pub fn materialize<B: AudioBackend + ?Sized>(
        key: PoolKey,
        settings: PoolSettings,
        backend: &mut B,
    ) -> Result<Self> {
        if settings.voice_count == 0 {
            return Err(VoxPoolError::InvalidConfiguration(format!(
                "pool {} needs at least one voice",
                key
            )));
        }

        if settings.preload_sample_data {
            backend.load_sample_data(&settings.event_id);
        }

        let mut handles: Vec<InstanceHandle> = Vec::with_capacity(settings.voice_count);
        for index in 0..settings.voice_count {
            match backend.create_instance(&settings.event_id) {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    log::error!(
                        "Pool {}: instance {}/{} failed ({}), rolling back {} instance(s)",
                        key,
                        index + 1,
                        settings.voice_count,
                        source,
                        handles.len()
                    );
                    for handle in handles.drain(..) {
                        backend.release(handle);
                    }
                    if settings.preload_sample_data {
                        backend.unload_sample_data(&settings.event_id);
                    }
                    return Err(VoxPoolError::BackendAllocation {
                        event_id: settings.event_id.clone(),
                        index,
                        source,
                    });
                }
            }
        }

        log::debug!(
            "Pool {} materialized with {} voice(s)",
            key,
            settings.voice_count
        );

        Ok(Self {
            key,
            settings,
            slots: handles.into_iter().map(VoiceSlot::new).collect(),
            cursor: 0,
            ref_count: 0,
            next_sequence: 1,
            destroyed: false,
        })
    }

    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[VoiceSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&VoiceSlot> {
        self.slots.get(index)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of bindings currently attached.
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_monophonic(&self) -> bool {
        self.settings.polyphony == Polyphony::Monophonic
    }

    pub(crate) fn increment_ref(&mut self) -> u32 {
        self.ref_count += 1;
        self.ref_count
    }

    pub(crate) fn decrement_ref(&mut self) -> u32 {
        self.ref_count = self.ref_count.saturating_sub(1);
        self.ref_count
    }

    /// Pick a slot with the pool's own stealing policy.
    pub fn next_voice<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &B,
        listener: Option<&Pose>,
    ) -> usize {
        self.select_voice(self.settings.stealing, backend, listener)
    }

    /// Pick the slot the next play request should use.
    ///
    /// Monophonic pools always answer slot 0. `Ignored` falls back to
    /// round-robin, and so does `Furthest` until there is a listener and every
    /// slot has a recorded position.
    pub fn select_voice<B: AudioBackend + ?Sized>(
        &mut self,
        policy: StealingPolicy,
        backend: &B,
        listener: Option<&Pose>,
    ) -> usize {
        let index = if self.is_monophonic() {
            0
        } else {
            match policy {
                StealingPolicy::Oldest | StealingPolicy::Ignored => self.select_oldest(),
                StealingPolicy::Quietest => self.select_quietest(backend),
                StealingPolicy::Furthest => match listener.and_then(|l| self.select_furthest(l)) {
                    Some(index) => index,
                    None => self.select_oldest(),
                },
            }
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.slots[index].mark_allocated(sequence);
        index
    }

    fn select_oldest(&mut self) -> usize {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.slots.len();
        index
    }

    fn select_quietest<B: AudioBackend + ?Sized>(&mut self, backend: &B) -> usize {
        let mut quietest = 0;
        let mut lowest = f32::INFINITY;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let volume = match backend.volume(slot.handle()) {
                Ok(volume) => {
                    slot.set_last_known_volume(volume);
                    volume
                }
                Err(e) => {
                    log::debug!(
                        "Pool {}: volume query for slot {} failed ({}), using last known",
                        self.key,
                        index,
                        e
                    );
                    slot.last_known_volume()
                }
            };

            if volume < lowest {
                lowest = volume;
                quietest = index;
            }
        }

        quietest
    }

    fn select_furthest(&self, listener: &Pose) -> Option<usize> {
        let mut furthest = None;
        let mut max_distance = f32::NEG_INFINITY;

        for (index, slot) in self.slots.iter().enumerate() {
            // unplaced slot (never played, or last played in 2D): no basis for comparison
            let position = slot.last_position()?;
            let distance = listener.distance_squared_to(position);
            if distance > max_distance {
                max_distance = distance;
                furthest = Some(index);
            }
        }

        furthest
    }

    pub(crate) fn record_position(&mut self, index: usize, position: Option<Vec3>) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.set_last_position(position);
        }
    }

    /// Ask the backend to stop every slot.
    ///
    /// All slots are attempted even if one fails; the first failure is returned.
    pub fn stop_all<B: AudioBackend + ?Sized>(
        &self,
        mode: StopMode,
        backend: &mut B,
    ) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }

        let mut first_error = None;
        for slot in self.slots.iter() {
            if let Err(e) = backend.stop(slot.handle(), mode) {
                log::error!("Pool {}: failed to stop {}: {}", self.key, slot.handle(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Returns true while any slot is audible.
    pub fn is_any_playing<B: AudioBackend + ?Sized>(&self, backend: &B) -> bool {
        !self.destroyed
            && self
                .slots
                .iter()
                .any(|slot| backend.playback_state(slot.handle()).is_audible())
    }

    /// Detach and release every instance. Does not stop anything first.
    ///
    /// Calling this again is a no-op.
    pub fn destroy<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.destroyed {
            return;
        }

        for slot in self.slots.iter_mut() {
            backend.detach(slot.handle());
            backend.release(slot.handle());
            slot.invalidate();
        }

        if self.settings.preload_sample_data {
            backend.unload_sample_data(&self.settings.event_id);
        }

        self.destroyed = true;
        log::debug!("Pool {} destroyed ({} voice(s))", self.key, self.slots.len());
    }
}
