use crate::backend::{AudioBackend, InstanceHandle};
use crate::binding::{BindingId, EventBinding};
use crate::config::{EventConfig, ManagerDesc};
use crate::error::{Result, VoxPoolError};
use crate::events::VoxPoolEvent;
use crate::math::{Pose, Vec3};
use crate::playback::{PlaybackCommand, StopMode};
use crate::pool::PoolKey;
use crate::registry::{Attachment, Detachment, PoolRegistry};
use crate::sweep::ReleaseSweep;
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::time::Duration;

/// Owner-facing entry point: binds event configurations and drives their voices.
///
/// `AudioManager` owns the [`PoolRegistry`], the audio backend and every
/// binding of one session. It is meant to live on the game's update thread and
/// be ticked once per frame.
///
/// # Threading
///
/// - **Update thread**: owns the manager, calls `bind`/`play`/`stop`/`release` and `tick`
/// - **Other threads**: post [`PlaybackCommand`]s through [`command_sender`](Self::command_sender);
///   they are executed at the start of the next `tick`
pub struct AudioManager<B: AudioBackend> {
    desc: ManagerDesc,
    backend: B,
    registry: PoolRegistry,
    bindings: HashMap<BindingId, EventBinding>,
    sweep: ReleaseSweep,
    listener: Option<Pose>,
    next_binding_id: u64,
    events: Vec<VoxPoolEvent>,
    command_sender: Sender<PlaybackCommand>,
    command_receiver: Receiver<PlaybackCommand>,
}

impl<B: AudioBackend> AudioManager<B> {
    pub fn new(desc: ManagerDesc, backend: B) -> Self {
        let (command_sender, command_receiver) = match desc.command_capacity {
            Some(capacity) => crossbeam_channel::bounded(capacity),
            None => crossbeam_channel::unbounded(),
        };

        if desc.disable_all_audio {
            log::info!("Audio is disabled for this session, all bindings will be inert");
        }

        Self {
            sweep: ReleaseSweep::new(desc.sweep_interval),
            desc,
            backend,
            registry: PoolRegistry::new(),
            bindings: HashMap::new(),
            listener: None,
            next_binding_id: 0,
            events: Vec::new(),
            command_sender,
            command_receiver,
        }
    }

    pub fn desc(&self) -> &ManagerDesc {
        &self.desc
    }

    /// Creates a binding for `config` and returns its handle.
    ///
    /// Eager bindings create (or join) their pool right away; lazy ones wait
    /// for the first play. A configuration with an empty event id, or any
    /// configuration while audio is disabled, produces an inert binding.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a polyphonic configuration without
    /// voices, and `BackendAllocation` if an eager pool cannot be built. In both
    /// cases nothing is registered.
    pub fn bind(&mut self, config: EventConfig) -> Result<BindingId> {
        self.next_binding_id += 1;
        let id = BindingId::from_raw(self.next_binding_id);

        let mut binding = if self.desc.disable_all_audio {
            EventBinding::inert(id, config)
        } else {
            EventBinding::new(id, config, &self.backend)?
        };

        let attachment = binding.initialize(&mut self.registry, &mut self.backend)?;
        if let Some(attachment) = attachment {
            record_attachment(&mut self.events, id, binding.key(), attachment);
        }

        log::debug!(
            "{} bound to {} ({})",
            id,
            binding.config().event_id,
            binding.key()
        );
        self.bindings.insert(id, binding);
        Ok(id)
    }

    /// Plays a binding as a 2D event.
    ///
    /// Returns the engine instance that was started, or `None` for an inert binding.
    ///
    /// # Errors
    ///
    /// `UseAfterRelease` if the binding was released or unbound,
    /// `UnknownBinding` if this manager never issued `id`, and any backend failure.
    pub fn play(&mut self, id: BindingId) -> Result<Option<InstanceHandle>> {
        self.start_voice(id, None)
    }

    /// Plays a binding at a world position.
    ///
    /// # Errors
    ///
    /// Same as [`play`](Self::play).
    pub fn play_at(&mut self, id: BindingId, position: Vec3) -> Result<Option<InstanceHandle>> {
        self.start_voice(id, Some(position))
    }

    fn start_voice(
        &mut self,
        id: BindingId,
        position: Option<Vec3>,
    ) -> Result<Option<InstanceHandle>> {
        let issued = self.next_binding_id;
        let binding = self
            .bindings
            .get_mut(&id)
            .ok_or_else(|| missing_binding(id, issued))?;

        let started = binding.play(
            &mut self.registry,
            &mut self.backend,
            self.listener.as_ref(),
            position,
        )?;
        let Some(started) = started else {
            return Ok(None);
        };

        if let Some(attachment) = started.attachment {
            record_attachment(&mut self.events, id, binding.key(), attachment);
        }
        self.events.push(VoxPoolEvent::VoiceStarted {
            binding: id,
            handle: started.handle,
            slot: started.slot,
        });

        let key = binding.key().clone();
        if let Some(detachment) =
            binding.apply_release_policy(&mut self.registry, &mut self.backend, &mut self.sweep)
        {
            record_detachment(&mut self.events, id, &key, detachment);
        }
        if binding.is_released() {
            self.events.push(VoxPoolEvent::BindingReleased { binding: id });
            self.bindings.remove(&id);
        }

        Ok(Some(started.handle))
    }

    /// Stops every voice the binding uses.
    ///
    /// # Errors
    ///
    /// `UnknownBinding`, `UseAfterRelease`, or the first backend stop failure.
    pub fn stop(&mut self, id: BindingId) -> Result<()> {
        let issued = self.next_binding_id;
        let binding = self
            .bindings
            .get_mut(&id)
            .ok_or_else(|| missing_binding(id, issued))?;
        binding.stop(&self.registry, &mut self.backend)
    }

    /// Releases the binding's share of its pool and forgets the binding.
    ///
    /// Releasing twice, or releasing an id that is no longer bound, does nothing.
    pub fn release(&mut self, id: BindingId) {
        let Some(mut binding) = self.bindings.remove(&id) else {
            log::debug!("Release of unknown {} ignored", id);
            return;
        };
        release_binding(
            &mut binding,
            &mut self.registry,
            &mut self.backend,
            &mut self.sweep,
            &mut self.events,
        );
    }

    /// Stops and releases a binding, then forgets it. This is the owner's
    /// teardown path.
    ///
    /// # Errors
    ///
    /// Returns the stop failure, if any; the binding is released and removed regardless.
    pub fn unbind(&mut self, id: BindingId) -> Result<()> {
        let Some(mut binding) = self.bindings.remove(&id) else {
            return Ok(());
        };

        let stopped = binding.stop(&self.registry, &mut self.backend);
        release_binding(
            &mut binding,
            &mut self.registry,
            &mut self.backend,
            &mut self.sweep,
            &mut self.events,
        );
        stopped
    }

    /// Returns true while any voice of the binding's pool is audible.
    pub fn is_playing(&self, id: BindingId) -> bool {
        self.bindings
            .get(&id)
            .is_some_and(|binding| binding.is_playing(&self.registry, &self.backend))
    }

    /// Live bindings only; a binding is forgotten as soon as it is released.
    pub fn binding(&self, id: BindingId) -> Option<&EventBinding> {
        self.bindings.get(&id)
    }

    pub fn binding_ids(&self) -> Vec<BindingId> {
        self.bindings.keys().copied().collect()
    }

    /// Stops every live binding except the ones configured as steady.
    ///
    /// # Errors
    ///
    /// All bindings are attempted; the first failure is returned.
    pub fn stop_all_events(&mut self) -> Result<()> {
        let mut first_error = None;
        for binding in self.bindings.values_mut() {
            if binding.config().steady {
                continue;
            }
            if let Err(e) = binding.stop(&self.registry, &mut self.backend) {
                log::error!("Failed to stop {}: {}", binding.id(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stops every voice of every pool, steady or not.
    ///
    /// # Errors
    ///
    /// All pools are attempted; the first failure is returned.
    pub fn stop_everything(&mut self, mode: StopMode) -> Result<()> {
        let mut first_error = None;
        for (_, pool) in self.registry.iter() {
            if let Err(e) = pool.stop_all(mode, &mut self.backend) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Sets the listener pose used by the `Furthest` stealing policy.
    pub fn set_listener_pose(&mut self, pose: Pose) {
        self.listener = Some(pose);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn listener(&self) -> Option<Pose> {
        self.listener
    }

    /// Advances the session by `dt`.
    ///
    /// Executes queued [`PlaybackCommand`]s, then runs the release sweep when
    /// its interval has elapsed: bindings waiting for their audio to finish are
    /// released once no voice of their pool is audible, the others stay queued.
    pub fn tick(&mut self, dt: Duration) {
        self.process_commands();

        if !self.sweep.advance(dt) || self.sweep.is_empty() {
            return;
        }

        let mut still_playing = Vec::new();
        for id in self.sweep.take_pending() {
            let Some(binding) = self.bindings.get(&id) else {
                continue;
            };
            if binding.is_playing(&self.registry, &self.backend) {
                still_playing.push(id);
                continue;
            }

            let Some(mut binding) = self.bindings.remove(&id) else {
                continue;
            };
            log::debug!("Sweep releasing finished {}", id);
            release_binding(
                &mut binding,
                &mut self.registry,
                &mut self.backend,
                &mut self.sweep,
                &mut self.events,
            );
        }
        self.sweep.requeue(still_playing);
    }

    fn process_commands(&mut self) {
        while let Ok(command) = self.command_receiver.try_recv() {
            log::debug!("Executing queued command {:?}", command);
            if let Err(e) = self.execute(&command) {
                log::error!("Queued command {:?} failed: {}", command, e);
                self.events.push(VoxPoolEvent::CommandFailed {
                    command,
                    error: e.to_string(),
                });
            }
        }
    }

    fn execute(&mut self, command: &PlaybackCommand) -> Result<()> {
        match command {
            PlaybackCommand::Play(id) => self.play(*id).map(|_| ()),
            PlaybackCommand::PlayAt(id, position) => self.play_at(*id, *position).map(|_| ()),
            PlaybackCommand::Stop(id) => self.stop(*id),
            PlaybackCommand::Release(id) => {
                self.release(*id);
                Ok(())
            }
            PlaybackCommand::StopAll => self.stop_all_events(),
        }
    }

    /// Returns a sender other threads can use to queue commands for the next `tick`.
    pub fn command_sender(&self) -> Sender<PlaybackCommand> {
        self.command_sender.clone()
    }

    /// Drains the events collected since the last call.
    pub fn poll_events(&mut self) -> Vec<VoxPoolEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    pub fn sweep(&self) -> &ReleaseSweep {
        &self.sweep
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: AudioBackend> Drop for AudioManager<B> {
    fn drop(&mut self) {
        for (id, mut binding) in self.bindings.drain() {
            if let Err(e) = binding.stop(&self.registry, &mut self.backend) {
                log::error!("Failed to stop {} at shutdown: {}", id, e);
            }
            binding.release(&mut self.registry, &mut self.backend);
        }
        self.registry.clear(&mut self.backend);
    }
}

/// Error for an id missing from the binding map. Ids are issued in increasing
/// order, so a missing id at or below the last one issued was released.
fn missing_binding(id: BindingId, last_issued: u64) -> VoxPoolError {
    if id.raw() >= 1 && id.raw() <= last_issued {
        VoxPoolError::UseAfterRelease(id)
    } else {
        VoxPoolError::UnknownBinding(id)
    }
}

fn release_binding<B: AudioBackend>(
    binding: &mut EventBinding,
    registry: &mut PoolRegistry,
    backend: &mut B,
    sweep: &mut ReleaseSweep,
    events: &mut Vec<VoxPoolEvent>,
) {
    if binding.is_released() {
        return;
    }

    let id = binding.id();
    sweep.unsubscribe(id);
    if let Some(detachment) = binding.release(registry, backend) {
        record_detachment(events, id, binding.key(), detachment);
    }
    events.push(VoxPoolEvent::BindingReleased { binding: id });
}

fn record_attachment(
    events: &mut Vec<VoxPoolEvent>,
    binding: BindingId,
    key: &PoolKey,
    attachment: Attachment,
) {
    match attachment {
        Attachment::Created { voices } => events.push(VoxPoolEvent::PoolCreated {
            key: key.clone(),
            voices,
        }),
        Attachment::Joined {
            ref_count,
            mismatch,
        } => {
            events.push(VoxPoolEvent::PoolJoined {
                key: key.clone(),
                binding,
                ref_count,
            });
            if mismatch {
                events.push(VoxPoolEvent::SharedConfigurationMismatch {
                    key: key.clone(),
                    binding,
                });
            }
        }
    }
}

fn record_detachment(
    events: &mut Vec<VoxPoolEvent>,
    binding: BindingId,
    key: &PoolKey,
    detachment: Detachment,
) {
    match detachment {
        Detachment::Released { ref_count } => events.push(VoxPoolEvent::PoolDetached {
            key: key.clone(),
            binding,
            ref_count,
        }),
        Detachment::Destroyed => events.push(VoxPoolEvent::PoolDestroyed { key: key.clone() }),
        Detachment::NotAttached => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, EventId, SimulatedBackend};
    use crate::config::{InitMode, ReleaseMode, StealingPolicy};

    fn manager() -> AudioManager<SimulatedBackend> {
        let _ = env_logger::builder().is_test(true).try_init();
        AudioManager::new(ManagerDesc::default(), SimulatedBackend::new())
    }

    #[test]
    fn test_two_shared_owners_one_pool() {
        let mut manager = manager();
        let config = EventConfig::new("event:/amb/crowd").polyphonic(2).shared();

        let a = manager.bind(config.clone()).unwrap();
        let b = manager.bind(config).unwrap();

        let key = PoolKey::shared("event:/amb/crowd");
        assert_eq!(manager.registry().len(), 1);
        assert_eq!(manager.registry().ref_count(&key), 2);
        assert_eq!(manager.registry().get(&key).unwrap().len(), 2);

        manager.release(a);
        assert_eq!(manager.registry().ref_count(&key), 1);
        manager.release(b);
        assert!(!manager.registry().contains(&key));
        assert_eq!(manager.backend().live_instances(), 0);
    }

    #[test]
    fn test_five_plays_over_three_voices() {
        let mut manager = manager();
        let id = manager
            .bind(
                EventConfig::new("event:/sfx/footstep")
                    .polyphonic(3)
                    .stealing(StealingPolicy::Oldest),
            )
            .unwrap();

        let handles: Vec<_> = (0..5)
            .map(|_| manager.play(id).unwrap().unwrap())
            .collect();
        let key = manager.binding(id).unwrap().key().clone();
        let pool = manager.registry().get(&key).unwrap();
        let slots: Vec<usize> = handles
            .iter()
            .map(|h| pool.slots().iter().position(|s| s.handle() == *h).unwrap())
            .collect();

        assert_eq!(slots, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_empty_event_is_noop() {
        let mut manager = manager();
        let id = manager.bind(EventConfig::default()).unwrap();

        assert_eq!(manager.play(id).unwrap(), None);
        manager.stop(id).unwrap();
        manager.release(id);

        assert!(manager.backend().journal().is_empty());
        assert!(manager.registry().is_empty());
    }

    #[test]
    fn test_failed_materialize_rolls_back_and_reports() {
        let mut manager = manager();
        manager.backend_mut().fail_create_on(2);

        let result = manager.bind(EventConfig::new("event:/sfx/rain").polyphonic(3));

        assert!(matches!(
            result,
            Err(VoxPoolError::BackendAllocation { index: 1, .. })
        ));
        assert_eq!(manager.backend().live_instances(), 0);
        assert!(manager.registry().is_empty());
        assert!(manager.binding_ids().is_empty());
    }

    #[test]
    fn test_invalid_configuration_reported_once() {
        let mut manager = manager();
        let result = manager.bind(EventConfig::new("event:/sfx/rain").polyphonic(0));
        assert!(matches!(result, Err(VoxPoolError::InvalidConfiguration(_))));
        assert!(manager.backend().journal().is_empty());
    }

    #[test]
    fn test_release_twice_is_idempotent() {
        let mut manager = manager();
        let config = EventConfig::new("event:/amb/crowd").shared();
        let a = manager.bind(config.clone()).unwrap();
        let _b = manager.bind(config).unwrap();
        let key = PoolKey::shared("event:/amb/crowd");

        manager.release(a);
        manager.release(a);
        assert_eq!(manager.registry().ref_count(&key), 1);
    }

    #[test]
    fn test_play_after_release_is_an_error() {
        let mut manager = manager();
        let id = manager.bind(EventConfig::new("event:/sfx/door")).unwrap();
        manager.release(id);

        assert!(matches!(
            manager.play(id),
            Err(VoxPoolError::UseAfterRelease(_))
        ));
        assert!(matches!(
            manager.stop(id),
            Err(VoxPoolError::UseAfterRelease(_))
        ));
    }

    #[test]
    fn test_unknown_binding() {
        let mut manager = manager();
        let id = manager.bind(EventConfig::new("event:/sfx/door")).unwrap();
        manager.unbind(id).unwrap();

        assert!(matches!(
            manager.play(id),
            Err(VoxPoolError::UseAfterRelease(_))
        ));
        manager.release(id);
        manager.unbind(id).unwrap();

        let never_issued = BindingId::from_raw(id.raw() + 1);
        assert!(matches!(
            manager.play(never_issued),
            Err(VoxPoolError::UnknownBinding(_))
        ));
        assert!(matches!(
            manager.stop(BindingId::from_raw(0)),
            Err(VoxPoolError::UnknownBinding(_))
        ));
    }

    #[test]
    fn test_lazy_binding_creates_pool_on_play() {
        let mut manager = manager();
        let id = manager
            .bind(EventConfig::new("event:/vo/line").init_mode(InitMode::Lazy))
            .unwrap();
        assert!(manager.registry().is_empty());
        assert!(manager.poll_events().is_empty());

        manager.play(id).unwrap();
        let events = manager.poll_events();
        assert!(matches!(events[0], VoxPoolEvent::PoolCreated { voices: 1, .. }));
        assert!(matches!(events[1], VoxPoolEvent::VoiceStarted { slot: 0, .. }));
    }

    #[test]
    fn test_immediate_release_after_play() {
        let mut manager = manager();
        let id = manager
            .bind(EventConfig::new("event:/ui/click").release_mode(ReleaseMode::Immediate))
            .unwrap();

        let handle = manager.play(id).unwrap().unwrap();
        assert!(manager.binding(id).is_none());
        assert!(manager.registry().is_empty());
        assert!(manager.backend().started().contains(&handle));
        assert!(matches!(
            manager.play(id),
            Err(VoxPoolError::UseAfterRelease(_))
        ));
    }

    #[test]
    fn test_released_one_shots_are_forgotten() {
        let mut manager = manager();
        let config = EventConfig::new("event:/ui/click").release_mode(ReleaseMode::Immediate);

        let mut last = None;
        for _ in 0..100 {
            let id = manager.bind(config.clone()).unwrap();
            manager.play(id).unwrap();
            last = Some(id);
        }

        assert!(manager.binding_ids().is_empty());
        assert!(manager.registry().is_empty());
        assert_eq!(manager.backend().live_instances(), 0);
        let last = last.unwrap();
        assert!(matches!(
            manager.stop(last),
            Err(VoxPoolError::UseAfterRelease(_))
        ));

        let events = manager.poll_events();
        let released = events
            .iter()
            .filter(|e| matches!(e, VoxPoolEvent::BindingReleased { .. }))
            .count();
        assert_eq!(released, 100);
    }

    #[test]
    fn test_on_finish_released_by_sweep() {
        let _ = env_logger::builder().is_test(true).try_init();
        let desc = ManagerDesc::default().sweep_interval(Duration::from_secs(1));
        let mut manager = AudioManager::new(desc, SimulatedBackend::new());
        let id = manager
            .bind(EventConfig::new("event:/sfx/bell").release_mode(ReleaseMode::OnFinish))
            .unwrap();

        let handle = manager.play(id).unwrap().unwrap();
        assert!(manager.sweep().contains(id));

        // still ringing when the sweep runs: stays queued
        manager.tick(Duration::from_millis(1500));
        assert!(manager.sweep().contains(id));
        assert!(manager.binding(id).is_some());

        manager.backend_mut().finish(handle);
        manager.tick(Duration::from_millis(500));
        assert!(manager.binding(id).is_some());

        manager.tick(Duration::from_millis(500));
        assert!(manager.binding(id).is_none());
        assert!(manager.sweep().is_empty());
        assert!(manager.registry().is_empty());
    }

    #[test]
    fn test_stop_all_events_skips_steady() {
        let mut manager = manager();
        let music = manager
            .bind(EventConfig::new("event:/music/theme").steady(true))
            .unwrap();
        let sfx = manager
            .bind(EventConfig::new("event:/sfx/engine").fade_out_on_stop(false))
            .unwrap();
        let music_handle = manager.play(music).unwrap().unwrap();
        let sfx_handle = manager.play(sfx).unwrap().unwrap();
        manager.backend_mut().clear_journal();

        manager.stop_all_events().unwrap();

        assert!(manager.is_playing(music));
        assert!(!manager.is_playing(sfx));
        let journal = manager.backend().journal();
        assert!(journal.contains(&BackendCall::Stop(sfx_handle, StopMode::Immediate)));
        assert!(
            !journal
                .iter()
                .any(|call| matches!(call, BackendCall::Stop(h, _) if *h == music_handle))
        );
    }

    #[test]
    fn test_stop_everything_includes_steady() {
        let mut manager = manager();
        let music = manager
            .bind(EventConfig::new("event:/music/theme").steady(true))
            .unwrap();
        manager.play(music).unwrap();
        assert!(manager.is_playing(music));

        manager.stop_everything(StopMode::Immediate).unwrap();
        assert!(!manager.is_playing(music));
    }

    #[test]
    fn test_shared_mismatch_emits_warning_event() {
        let mut manager = manager();
        manager
            .bind(EventConfig::new("event:/amb/birds").polyphonic(2).shared())
            .unwrap();
        let late = manager
            .bind(EventConfig::new("event:/amb/birds").polyphonic(6).shared())
            .unwrap();

        let events = manager.poll_events();
        assert!(events.iter().any(|e| matches!(
            e,
            VoxPoolEvent::SharedConfigurationMismatch { binding, .. } if *binding == late
        )));
        let key = PoolKey::shared("event:/amb/birds");
        assert_eq!(manager.registry().get(&key).unwrap().len(), 2);
    }

    #[test]
    fn test_disabled_audio_makes_bindings_inert() {
        let desc = ManagerDesc::default().disable_all_audio(true);
        let mut manager = AudioManager::new(desc, SimulatedBackend::new());
        let id = manager.bind(EventConfig::new("event:/sfx/door")).unwrap();

        assert!(manager.binding(id).unwrap().is_inert());
        assert_eq!(manager.play(id).unwrap(), None);
        assert!(manager.backend().journal().is_empty());
    }

    #[test]
    fn test_furthest_uses_listener_pose() {
        let mut manager = manager();
        let id = manager
            .bind(
                EventConfig::new("event:/sfx/impact")
                    .polyphonic(2)
                    .stealing(StealingPolicy::Furthest),
            )
            .unwrap();

        // no listener yet: round-robin
        let near = manager.play_at(id, Vec3::new(1.0, 0.0, 0.0)).unwrap().unwrap();
        let far = manager.play_at(id, Vec3::new(50.0, 0.0, 0.0)).unwrap().unwrap();
        assert_ne!(near, far);

        manager.set_listener_pose(Pose::identity());
        assert_eq!(manager.play_at(id, Vec3::ZERO).unwrap(), Some(far));
        // slot of `far` now sits at the listener, so `near` is furthest

        assert_eq!(manager.play_at(id, Vec3::ZERO).unwrap(), Some(near));
    }

    #[test]
    fn test_furthest_with_listener_from_the_start_uses_every_voice() {
        let mut manager = manager();
        manager.set_listener_pose(Pose::identity());
        let id = manager
            .bind(
                EventConfig::new("event:/sfx/impact")
                    .polyphonic(3)
                    .stealing(StealingPolicy::Furthest),
            )
            .unwrap();

        let handles: Vec<_> = (1..=4)
            .map(|x| {
                manager
                    .play_at(id, Vec3::new(x as f32, 0.0, 0.0))
                    .unwrap()
                    .unwrap()
            })
            .collect();

        assert_ne!(handles[0], handles[1]);
        assert_ne!(handles[1], handles[2]);
        assert_ne!(handles[0], handles[2]);
        // all three placed: the voice at x=3 is the furthest
        assert_eq!(handles[3], handles[2]);
    }

    #[test]
    fn test_commands_from_another_thread() {
        let mut manager = manager();
        let id = manager.bind(EventConfig::new("event:/sfx/door")).unwrap();
        let sender = manager.command_sender();

        std::thread::spawn(move || {
            sender.send(PlaybackCommand::Play(id)).unwrap();
            sender
                .send(PlaybackCommand::Play(BindingId::from_raw(999)))
                .unwrap();
        })
        .join()
        .unwrap();

        assert!(!manager.is_playing(id));
        manager.tick(Duration::from_millis(16));
        assert!(manager.is_playing(id));

        let events = manager.poll_events();
        assert!(events.iter().any(|e| matches!(
            e,
            VoxPoolEvent::CommandFailed { command: PlaybackCommand::Play(bad), .. } if bad.raw() == 999
        )));
    }

    #[test]
    fn test_drop_releases_everything() {
        let mut backend = SimulatedBackend::new();
        {
            let mut manager = AudioManager::new(ManagerDesc::default(), &mut backend);
            let config = EventConfig::new("event:/amb/crowd").polyphonic(3).shared();
            manager.bind(config.clone()).unwrap();
            manager.bind(config).unwrap();
            let exclusive = manager.bind(EventConfig::new("event:/sfx/door")).unwrap();
            manager.play(exclusive).unwrap();
            assert_eq!(manager.backend().live_instances(), 4);
        }

        assert_eq!(backend.live_instances(), 0);
    }

    #[test]
    fn test_unbind_stops_then_releases() {
        let mut manager = manager();
        let id = manager
            .bind(EventConfig::new("event:/sfx/alarm").fade_out_on_stop(true))
            .unwrap();
        let handle = manager.play(id).unwrap().unwrap();
        manager.backend_mut().clear_journal();

        manager.unbind(id).unwrap();

        let journal = manager.backend().journal();
        assert_eq!(
            journal.first(),
            Some(&BackendCall::Stop(handle, StopMode::AllowFadeOut))
        );
        assert!(journal.contains(&BackendCall::Release(handle)));
        assert!(manager.binding(id).is_none());
        assert_eq!(
            manager.backend().live_instances_of(&EventId::new("event:/sfx/alarm")),
            0
        );
    }
}
