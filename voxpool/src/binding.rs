//! Per-owner event configuration and its runtime state.

use crate::backend::{AudioBackend, InstanceHandle};
use crate::config::{EventConfig, InitMode, ReleaseMode};
use crate::error::{Result, VoxPoolError};
use crate::math::{Pose, Vec3};
use crate::playback::StopMode;
use crate::pool::PoolKey;
use crate::registry::{Attachment, Detachment, PoolRegistry};
use crate::sweep::ReleaseSweep;
use std::fmt;

/// Lightweight, type-safe handle for a binding.
///
/// Returned by [`AudioManager::bind`](crate::AudioManager::bind) and used for
/// every later play, stop and release call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binding({})", self.0)
    }
}

/// Lifecycle of an [`EventBinding`]. `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Bound,
    Playing,
    Released,
}

/// What a successful [`EventBinding::play`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartedVoice {
    pub handle: InstanceHandle,
    pub slot: usize,
    /// Set when this play performed the deferred attach of a lazy binding.
    pub attachment: Option<Attachment>,
}

/// One owner's view of one event: a configuration snapshot plus a
/// non-owning key into the [`PoolRegistry`].
///
/// A binding holds a share of its pool's reference count while attached, never
/// the pool itself. An inert binding (no event assigned, or audio disabled for
/// the session) accepts every call and never touches the backend.
#[derive(Debug)]
pub struct EventBinding {
    id: BindingId,
    config: EventConfig,
    key: PoolKey,
    is_3d: bool,
    state: BindingState,
    attached: bool,
    inert: bool,
}

impl EventBinding {
    /// Snapshot `config` and pick the pool key.
    ///
    /// An empty event id yields an inert binding. A polyphonic configuration
    /// without voices is rejected.
    pub fn new<B: AudioBackend + ?Sized>(
        id: BindingId,
        config: EventConfig,
        backend: &B,
    ) -> Result<Self> {
        if config.is_empty() {
            log::debug!("{} has no event assigned, binding is inert", id);
            return Ok(Self::inert(id, config));
        }

        config.validate()?;

        let is_3d = backend.is_event_3d(&config.event_id);
        let key = PoolKey::for_config(&config);
        Ok(Self {
            id,
            config,
            key,
            is_3d,
            state: BindingState::Unbound,
            attached: false,
            inert: false,
        })
    }

    /// A binding that accepts every call and does nothing.
    pub fn inert(id: BindingId, config: EventConfig) -> Self {
        let key = PoolKey::for_config(&config);
        Self {
            id,
            config,
            key,
            is_3d: false,
            state: BindingState::Unbound,
            attached: false,
            inert: true,
        }
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    pub fn is_3d(&self) -> bool {
        self.is_3d
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    /// True while this binding holds a share of a pool.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }

    pub fn is_released(&self) -> bool {
        self.state == BindingState::Released
    }

    /// `Unbound -> Bound`. Eager bindings attach to their pool here.
    pub fn initialize<B: AudioBackend + ?Sized>(
        &mut self,
        registry: &mut PoolRegistry,
        backend: &mut B,
    ) -> Result<Option<Attachment>> {
        if self.state != BindingState::Unbound {
            return Ok(None);
        }

        let attachment = if !self.inert && self.config.init_mode == InitMode::Eager {
            self.ensure_attached(registry, backend)?
        } else {
            None
        };

        self.state = BindingState::Bound;
        Ok(attachment)
    }

    fn ensure_attached<B: AudioBackend + ?Sized>(
        &mut self,
        registry: &mut PoolRegistry,
        backend: &mut B,
    ) -> Result<Option<Attachment>> {
        if self.attached && registry.contains(&self.key) {
            return Ok(None);
        }

        let attachment = registry.attach(&self.key, &self.config, backend)?;
        self.attached = true;
        Ok(Some(attachment))
    }

    /// Select a voice per the pool's stealing policy and start it.
    ///
    /// With a `position` the voice is placed in the world before it starts.
    /// Returns `None` for inert bindings.
    pub fn play<B: AudioBackend + ?Sized>(
        &mut self,
        registry: &mut PoolRegistry,
        backend: &mut B,
        listener: Option<&Pose>,
        position: Option<Vec3>,
    ) -> Result<Option<StartedVoice>> {
        if self.is_released() {
            return Err(VoxPoolError::UseAfterRelease(self.id));
        }
        if self.inert {
            return Ok(None);
        }
        if self.state == BindingState::Unbound {
            self.state = BindingState::Bound;
        }

        let attachment = self.ensure_attached(registry, backend)?;

        match (self.is_3d, position) {
            (true, None) => log::warn!(
                "{} plays 3D event {} without a position",
                self.id,
                self.config.event_id
            ),
            (false, Some(_)) => log::warn!(
                "{} plays 2D event {} at a position",
                self.id,
                self.config.event_id
            ),
            _ => {}
        }

        let Some(pool) = registry.get_mut(&self.key) else {
            return Err(VoxPoolError::InvalidConfiguration(format!(
                "pool {} vanished while {} was attached",
                self.key, self.id
            )));
        };

        let slot = pool.next_voice(&*backend, listener);
        pool.record_position(slot, position);
        let handle = pool.slots()[slot].handle();

        if let Some(position) = position {
            backend.set_3d_position(handle, position)?;
        }
        backend.start(handle)?;

        self.state = BindingState::Playing;
        log::debug!("{} started {} on slot {}", self.id, handle, slot);

        Ok(Some(StartedVoice {
            handle,
            slot,
            attachment,
        }))
    }

    /// Stop every voice of the bound pool, not just the last one started.
    ///
    /// On a shared pool this silences the event for every owner.
    pub fn stop<B: AudioBackend + ?Sized>(
        &mut self,
        registry: &PoolRegistry,
        backend: &mut B,
    ) -> Result<()> {
        if self.is_released() {
            return Err(VoxPoolError::UseAfterRelease(self.id));
        }
        if self.inert || !self.attached {
            return Ok(());
        }

        if let Some(pool) = registry.get(&self.key) {
            pool.stop_all(StopMode::from_fade_out(self.config.fade_out_on_stop), backend)?;
        }
        if self.state == BindingState::Playing {
            self.state = BindingState::Bound;
        }
        Ok(())
    }

    /// Give up this binding's share of its pool. Terminal; a second call is a no-op.
    pub fn release<B: AudioBackend + ?Sized>(
        &mut self,
        registry: &mut PoolRegistry,
        backend: &mut B,
    ) -> Option<Detachment> {
        if self.is_released() {
            return None;
        }
        self.state = BindingState::Released;

        if !self.attached {
            return None;
        }
        self.attached = false;
        Some(registry.detach(&self.key, backend))
    }

    /// Run the configured release policy after a successful play.
    pub fn apply_release_policy<B: AudioBackend + ?Sized>(
        &mut self,
        registry: &mut PoolRegistry,
        backend: &mut B,
        sweep: &mut ReleaseSweep,
    ) -> Option<Detachment> {
        match self.config.release_mode {
            ReleaseMode::Manual => None,
            ReleaseMode::Immediate => self.release(registry, backend),
            ReleaseMode::OnFinish => {
                sweep.subscribe(self.id);
                None
            }
        }
    }

    /// True while any voice of the bound pool is audible.
    pub fn is_playing<B: AudioBackend + ?Sized>(&self, registry: &PoolRegistry, backend: &B) -> bool {
        if self.inert || !self.attached {
            return false;
        }
        registry
            .get(&self.key)
            .is_some_and(|pool| pool.is_any_playing(backend))
    }
}

impl Drop for EventBinding {
    fn drop(&mut self) {
        if self.attached {
            log::warn!(
                "{} dropped while still attached to {}; its pool share was never released",
                self.id,
                self.key
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, SimulatedBackend};
    use crate::config::StealingPolicy;
    use std::time::Duration;

    fn bind(
        config: EventConfig,
        registry: &mut PoolRegistry,
        backend: &mut SimulatedBackend,
    ) -> EventBinding {
        let mut binding = EventBinding::new(BindingId::from_raw(1), config, &*backend).unwrap();
        binding.initialize(registry, backend).unwrap();
        binding
    }

    #[test]
    fn test_eager_attaches_on_initialize() {
        let mut backend = SimulatedBackend::new();
        let mut registry = PoolRegistry::new();
        let mut binding = bind(
            EventConfig::new("event:/sfx/door").polyphonic(2),
            &mut registry,
            &mut backend,
        );

        assert_eq!(binding.state(), BindingState::Bound);
        assert!(binding.is_attached());
        assert_eq!(backend.live_instances(), 2);
        binding.release(&mut registry, &mut backend);
    }

    #[test]
    fn test_lazy_attaches_on_first_play() {
        let mut backend = SimulatedBackend::new();
        let mut registry = PoolRegistry::new();
        let mut binding = bind(
            EventConfig::new("event:/sfx/door").init_mode(InitMode::Lazy),
            &mut registry,
            &mut backend,
        );

        assert!(!binding.is_attached());
        assert_eq!(backend.live_instances(), 0);

        let started = binding
            .play(&mut registry, &mut backend, None, None)
            .unwrap()
            .unwrap();
        assert!(matches!(
            started.attachment,
            Some(Attachment::Created { voices: 1 })
        ));
        assert_eq!(binding.state(), BindingState::Playing);
        assert_eq!(backend.started(), vec![started.handle]);
        binding.release(&mut registry, &mut backend);
    }

    #[test]
    fn test_oldest_play_sequence() {
        let mut backend = SimulatedBackend::new();
        let mut registry = PoolRegistry::new();
        let mut binding = bind(
            EventConfig::new("event:/sfx/footstep")
                .polyphonic(3)
                .stealing(StealingPolicy::Oldest),
            &mut registry,
            &mut backend,
        );

        let slots: Vec<usize> = (0..5)
            .map(|_| {
                binding
                    .play(&mut registry, &mut backend, None, None)
                    .unwrap()
                    .unwrap()
                    .slot
            })
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1]);
        binding.release(&mut registry, &mut backend);
    }

    #[test]
    fn test_stop_hits_every_slot() {
        let mut backend = SimulatedBackend::new();
        let mut registry = PoolRegistry::new();
        let mut binding = bind(
            EventConfig::new("event:/sfx/footstep")
                .polyphonic(3)
                .fade_out_on_stop(false),
            &mut registry,
            &mut backend,
        );
        binding.play(&mut registry, &mut backend, None, None).unwrap();
        backend.clear_journal();

        binding.stop(&registry, &mut backend).unwrap();

        let stops: Vec<_> = backend
            .journal()
            .iter()
            .filter(|call| matches!(call, BackendCall::Stop(_, StopMode::Immediate)))
            .collect();
        assert_eq!(stops.len(), 3);
        assert_eq!(binding.state(), BindingState::Bound);
        binding.release(&mut registry, &mut backend);
    }

    #[test]
    fn test_use_after_release() {
        let mut backend = SimulatedBackend::new();
        let mut registry = PoolRegistry::new();
        let mut binding = bind(EventConfig::new("event:/sfx/door"), &mut registry, &mut backend);

        assert_eq!(
            binding.release(&mut registry, &mut backend),
            Some(Detachment::Destroyed)
        );
        assert!(matches!(
            binding.play(&mut registry, &mut backend, None, None),
            Err(VoxPoolError::UseAfterRelease(_))
        ));
        assert!(matches!(
            binding.stop(&registry, &mut backend),
            Err(VoxPoolError::UseAfterRelease(_))
        ));
    }

    #[test]
    fn test_double_release_does_not_double_detach() {
        let mut backend = SimulatedBackend::new();
        let mut registry = PoolRegistry::new();
        let config = EventConfig::new("event:/amb/river").shared();
        let mut first = bind(config.clone(), &mut registry, &mut backend);
        let mut second = bind(config, &mut registry, &mut backend);
        let key = first.key().clone();
        assert_eq!(registry.ref_count(&key), 2);

        assert_eq!(
            first.release(&mut registry, &mut backend),
            Some(Detachment::Released { ref_count: 1 })
        );
        assert_eq!(first.release(&mut registry, &mut backend), None);
        assert_eq!(registry.ref_count(&key), 1);

        second.release(&mut registry, &mut backend);
        assert!(!registry.contains(&key));
    }

    #[test]
    fn test_empty_event_never_touches_backend() {
        let mut backend = SimulatedBackend::new();
        let mut registry = PoolRegistry::new();
        let mut binding = bind(EventConfig::default(), &mut registry, &mut backend);

        assert!(binding.is_inert());
        assert_eq!(binding.play(&mut registry, &mut backend, None, None).unwrap(), None);
        binding.stop(&registry, &mut backend).unwrap();
        assert_eq!(binding.release(&mut registry, &mut backend), None);

        assert!(backend.journal().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_voice_count_rejected() {
        let backend = SimulatedBackend::new();
        let result = EventBinding::new(
            BindingId::from_raw(1),
            EventConfig::new("event:/sfx/door").polyphonic(0),
            &backend,
        );
        assert!(matches!(result, Err(VoxPoolError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_play_at_position_places_voice() {
        let mut backend = SimulatedBackend::new().with_3d_event("event:/sfx/explosion");
        let mut registry = PoolRegistry::new();
        let mut binding = bind(
            EventConfig::new("event:/sfx/explosion"),
            &mut registry,
            &mut backend,
        );
        assert!(binding.is_3d());

        let position = Vec3::new(4.0, 0.0, -2.0);
        let started = binding
            .play(&mut registry, &mut backend, None, Some(position))
            .unwrap()
            .unwrap();

        assert_eq!(backend.position(started.handle), Some(position));
        let pool = registry.get(binding.key()).unwrap();
        assert_eq!(pool.slot(started.slot).unwrap().last_position(), Some(position));
        binding.release(&mut registry, &mut backend);
    }

    #[test]
    fn test_release_policies() {
        let mut backend = SimulatedBackend::new();
        let mut registry = PoolRegistry::new();
        let mut sweep = ReleaseSweep::new(Duration::from_secs(1));

        let mut immediate = bind(
            EventConfig::new("event:/ui/click").release_mode(ReleaseMode::Immediate),
            &mut registry,
            &mut backend,
        );
        immediate.play(&mut registry, &mut backend, None, None).unwrap();
        assert_eq!(
            immediate.apply_release_policy(&mut registry, &mut backend, &mut sweep),
            Some(Detachment::Destroyed)
        );
        assert!(immediate.is_released());

        let mut on_finish = bind(
            EventConfig::new("event:/ui/hover").release_mode(ReleaseMode::OnFinish),
            &mut registry,
            &mut backend,
        );
        on_finish.play(&mut registry, &mut backend, None, None).unwrap();
        assert_eq!(
            on_finish.apply_release_policy(&mut registry, &mut backend, &mut sweep),
            None
        );
        assert!(sweep.contains(on_finish.id()));
        assert!(on_finish.is_playing(&registry, &backend));
        on_finish.release(&mut registry, &mut backend);
    }

    #[test]
    fn test_play_failure_is_reported() {
        let mut backend = SimulatedBackend::new();
        backend.reject_event("event:/missing");
        let mut registry = PoolRegistry::new();
        let mut binding = bind(
            EventConfig::new("event:/missing").init_mode(InitMode::Lazy),
            &mut registry,
            &mut backend,
        );

        let result = binding.play(&mut registry, &mut backend, None, None);
        assert!(matches!(result, Err(VoxPoolError::BackendAllocation { .. })));
        assert!(!binding.is_attached());
        assert_eq!(backend.live_instances(), 0);
    }
}
