use crate::backend::EventId;
use crate::error::{Result, VoxPoolError};

/// Whether a binding may have more than one voice sounding at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polyphony {
    #[default]
    Monophonic,
    Polyphonic,
}

/// Whether a pool belongs to one binding or to every binding of the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharingScope {
    #[default]
    Exclusive,
    /// All shared bindings of one event collapse onto one pool.
    /// The first binding to attach decides the pool's voice count and stealing policy.
    Shared,
}

/// When the engine instances are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitMode {
    /// As soon as the binding is created
    #[default]
    Eager,
    /// Right before the first play
    Lazy,
}

/// What happens to the binding's share of the pool after a play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseMode {
    /// Only an explicit release
    #[default]
    Manual,
    /// Released by the periodic sweep once no voice is audible
    OnFinish,
    /// Released right after the start request returns
    Immediate,
}

/// Which voice to reuse when a new play request arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StealingPolicy {
    /// Round-robin over the slots
    #[default]
    Oldest,
    /// Lowest volume at selection time
    Quietest,
    /// Furthest from the listener; behaves as `Oldest` without positional data
    Furthest,
    /// No preference; behaves as `Oldest`
    Ignored,
}

/// Rules for creating, playing and releasing one event on one owner.
///
/// A configuration is snapshotted when it is bound. Changing it afterwards
/// means unbinding and binding again.
#[derive(Debug, Clone, PartialEq)]
pub struct EventConfig {
    pub event_id: EventId,
    pub polyphony: Polyphony,
    /// Voices in the pool; only meaningful for polyphonic bindings
    pub voice_count: u32,
    pub sharing: SharingScope,
    pub init_mode: InitMode,
    pub release_mode: ReleaseMode,
    pub stealing: StealingPolicy,
    /// Let voices fade out when stopped
    pub fade_out_on_stop: bool,
    /// Ignored by `AudioManager::stop_all_events`
    pub steady: bool,
    /// Load sample data when the pool is created instead of on first play
    pub preload_sample_data: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            event_id: EventId::default(),
            polyphony: Polyphony::Monophonic,
            voice_count: 2,
            sharing: SharingScope::Exclusive,
            init_mode: InitMode::Eager,
            release_mode: ReleaseMode::Manual,
            stealing: StealingPolicy::Oldest,
            fade_out_on_stop: true,
            steady: false,
            preload_sample_data: false,
        }
    }
}

impl EventConfig {
    pub fn new(event_id: impl Into<EventId>) -> Self {
        Self {
            event_id: event_id.into(),
            ..Default::default()
        }
    }

    /// Polyphonic configuration with `voice_count` voices.
    pub fn polyphonic(mut self, voice_count: u32) -> Self {
        self.polyphony = Polyphony::Polyphonic;
        self.voice_count = voice_count;
        self
    }

    pub fn monophonic(mut self) -> Self {
        self.polyphony = Polyphony::Monophonic;
        self
    }

    pub fn shared(mut self) -> Self {
        self.sharing = SharingScope::Shared;
        self
    }

    pub fn init_mode(mut self, mode: InitMode) -> Self {
        self.init_mode = mode;
        self
    }

    pub fn release_mode(mut self, mode: ReleaseMode) -> Self {
        self.release_mode = mode;
        self
    }

    pub fn stealing(mut self, policy: StealingPolicy) -> Self {
        self.stealing = policy;
        self
    }

    pub fn fade_out_on_stop(mut self, fade_out: bool) -> Self {
        self.fade_out_on_stop = fade_out;
        self
    }

    pub fn steady(mut self, steady: bool) -> Self {
        self.steady = steady;
        self
    }

    pub fn preload_sample_data(mut self, preload: bool) -> Self {
        self.preload_sample_data = preload;
        self
    }

    pub fn is_polyphonic(&self) -> bool {
        self.polyphony == Polyphony::Polyphonic
    }

    pub fn is_shared(&self) -> bool {
        self.sharing == SharingScope::Shared
    }

    /// Number of voices the pool actually gets. Monophonic bindings always get one.
    pub fn effective_voice_count(&self) -> usize {
        if self.is_polyphonic() {
            self.voice_count as usize
        } else {
            1
        }
    }

    /// Returns true when there is no event to play.
    pub fn is_empty(&self) -> bool {
        self.event_id.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_polyphonic() && self.voice_count < 1 {
            return Err(VoxPoolError::InvalidConfiguration(format!(
                "polyphonic event {} needs at least one voice",
                self.event_id
            )));
        }
        Ok(())
    }
}
