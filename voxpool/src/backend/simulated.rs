//! In-memory audio backend used by the tests and the demo.

use super::{AudioBackend, EventId, InstanceHandle};
use crate::error::BackendError;
use crate::math::Vec3;
use crate::playback::{PlaybackState, StopMode};
use std::collections::{HashMap, HashSet};

/// One recorded call into the [`SimulatedBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Create(EventId),
    Start(InstanceHandle),
    Stop(InstanceHandle, StopMode),
    Release(InstanceHandle),
    Detach(InstanceHandle),
    SetPosition(InstanceHandle, Vec3),
    LoadSampleData(EventId),
    UnloadSampleData(EventId),
}

#[derive(Debug)]
struct SimulatedInstance {
    event_id: EventId,
    state: PlaybackState,
    volume: f32,
    position: Option<Vec3>,
}

/// Backend that keeps every instance in a map and journals each call.
///
/// Every event id is accepted unless it was rejected with
/// [`reject_event`](Self::reject_event). Instances start at full volume. A
/// fade-out stop leaves an instance in [`PlaybackState::Stopping`] until
/// [`finish`](Self::finish) or [`finish_all`](Self::finish_all) runs.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    instances: HashMap<u64, SimulatedInstance>,
    events_3d: HashSet<EventId>,
    rejected: HashSet<EventId>,
    loaded_sample_data: HashMap<EventId, u32>,
    next_handle: u64,
    creates_until_failure: Option<usize>,
    journal: Vec<BackendCall>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an event as 3D.
    pub fn with_3d_event(mut self, event_id: impl Into<EventId>) -> Self {
        self.events_3d.insert(event_id.into());
        self
    }

    /// Make every future `create_instance` for this event fail.
    pub fn reject_event(&mut self, event_id: impl Into<EventId>) {
        self.rejected.insert(event_id.into());
    }

    /// Make the `nth` next `create_instance` call fail (1-based).
    pub fn fail_create_on(&mut self, nth: usize) {
        self.creates_until_failure = Some(nth.max(1));
    }

    pub fn set_volume(&mut self, handle: InstanceHandle, volume: f32) {
        if let Some(instance) = self.instances.get_mut(&handle.raw()) {
            instance.volume = volume;
        }
    }

    /// Let one instance run to its end.
    pub fn finish(&mut self, handle: InstanceHandle) {
        if let Some(instance) = self.instances.get_mut(&handle.raw()) {
            instance.state = PlaybackState::Stopped;
        }
    }

    pub fn finish_all(&mut self) {
        for instance in self.instances.values_mut() {
            instance.state = PlaybackState::Stopped;
        }
    }

    /// Number of instances that have been created and not yet released.
    pub fn live_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn live_instances_of(&self, event_id: &EventId) -> usize {
        self.instances
            .values()
            .filter(|instance| &instance.event_id == event_id)
            .count()
    }

    pub fn is_live(&self, handle: InstanceHandle) -> bool {
        self.instances.contains_key(&handle.raw())
    }

    pub fn position(&self, handle: InstanceHandle) -> Option<Vec3> {
        self.instances
            .get(&handle.raw())
            .and_then(|instance| instance.position)
    }

    pub fn is_sample_data_loaded(&self, event_id: &EventId) -> bool {
        self.loaded_sample_data
            .get(event_id)
            .is_some_and(|count| *count > 0)
    }

    pub fn journal(&self) -> &[BackendCall] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Handles passed to `start`, in call order.
    pub fn started(&self) -> Vec<InstanceHandle> {
        self.journal
            .iter()
            .filter_map(|call| match call {
                BackendCall::Start(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    fn instance_mut(
        &mut self,
        handle: InstanceHandle,
    ) -> Result<&mut SimulatedInstance, BackendError> {
        self.instances
            .get_mut(&handle.raw())
            .ok_or(BackendError::InvalidHandle(handle.raw()))
    }
}

impl AudioBackend for SimulatedBackend {
    fn create_instance(&mut self, event_id: &EventId) -> Result<InstanceHandle, BackendError> {
        self.journal.push(BackendCall::Create(event_id.clone()));

        if let Some(remaining) = self.creates_until_failure.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                self.creates_until_failure = None;
                return Err(BackendError::InstanceLimit(event_id.clone()));
            }
        }

        if self.rejected.contains(event_id) {
            return Err(BackendError::UnknownEvent(event_id.clone()));
        }

        self.next_handle += 1;
        let handle = InstanceHandle::from_raw(self.next_handle);
        self.instances.insert(
            handle.raw(),
            SimulatedInstance {
                event_id: event_id.clone(),
                state: PlaybackState::Stopped,
                volume: 1.0,
                position: None,
            },
        );
        Ok(handle)
    }

    fn release(&mut self, handle: InstanceHandle) {
        self.journal.push(BackendCall::Release(handle));
        self.instances.remove(&handle.raw());
    }

    fn start(&mut self, handle: InstanceHandle) -> Result<(), BackendError> {
        self.journal.push(BackendCall::Start(handle));
        self.instance_mut(handle)?.state = PlaybackState::Playing;
        Ok(())
    }

    fn stop(&mut self, handle: InstanceHandle, mode: StopMode) -> Result<(), BackendError> {
        self.journal.push(BackendCall::Stop(handle, mode));
        let instance = self.instance_mut(handle)?;
        instance.state = match (instance.state, mode) {
            (PlaybackState::Stopped, _) | (_, StopMode::Immediate) => PlaybackState::Stopped,
            (_, StopMode::AllowFadeOut) => PlaybackState::Stopping,
        };
        Ok(())
    }

    fn volume(&self, handle: InstanceHandle) -> Result<f32, BackendError> {
        self.instances
            .get(&handle.raw())
            .map(|instance| instance.volume)
            .ok_or(BackendError::InvalidHandle(handle.raw()))
    }

    fn playback_state(&self, handle: InstanceHandle) -> PlaybackState {
        self.instances
            .get(&handle.raw())
            .map(|instance| instance.state)
            .unwrap_or_default()
    }

    fn is_event_3d(&self, event_id: &EventId) -> bool {
        self.events_3d.contains(event_id)
    }

    fn set_3d_position(
        &mut self,
        handle: InstanceHandle,
        position: Vec3,
    ) -> Result<(), BackendError> {
        self.journal.push(BackendCall::SetPosition(handle, position));
        self.instance_mut(handle)?.position = Some(position);
        Ok(())
    }

    fn detach(&mut self, handle: InstanceHandle) {
        self.journal.push(BackendCall::Detach(handle));
    }

    fn load_sample_data(&mut self, event_id: &EventId) {
        self.journal.push(BackendCall::LoadSampleData(event_id.clone()));
        *self.loaded_sample_data.entry(event_id.clone()).or_insert(0) += 1;
    }

    fn unload_sample_data(&mut self, event_id: &EventId) {
        self.journal
            .push(BackendCall::UnloadSampleData(event_id.clone()));
        if let Some(count) = self.loaded_sample_data.get_mut(event_id) {
            *count = count.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_release() {
        let mut backend = SimulatedBackend::new();
        let event = EventId::new("event:/sfx/step");

        let a = backend.create_instance(&event).unwrap();
        let b = backend.create_instance(&event).unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.live_instances(), 2);

        backend.release(a);
        assert!(!backend.is_live(a));
        assert_eq!(backend.live_instances_of(&event), 1);
    }

    #[test]
    fn test_fail_create_on_nth_call() {
        let mut backend = SimulatedBackend::new();
        let event = EventId::new("event:/sfx/step");
        backend.fail_create_on(2);

        assert!(backend.create_instance(&event).is_ok());
        assert!(matches!(
            backend.create_instance(&event),
            Err(BackendError::InstanceLimit(_))
        ));
        assert!(backend.create_instance(&event).is_ok());
    }

    #[test]
    fn test_fade_out_keeps_instance_audible() {
        let mut backend = SimulatedBackend::new();
        let handle = backend.create_instance(&EventId::new("e")).unwrap();
        backend.start(handle).unwrap();

        backend.stop(handle, StopMode::AllowFadeOut).unwrap();
        assert_eq!(backend.playback_state(handle), PlaybackState::Stopping);

        backend.finish(handle);
        assert_eq!(backend.playback_state(handle), PlaybackState::Stopped);
    }

    #[test]
    fn test_released_handle_is_invalid() {
        let mut backend = SimulatedBackend::new();
        let handle = backend.create_instance(&EventId::new("e")).unwrap();
        backend.release(handle);

        assert_eq!(
            backend.start(handle),
            Err(BackendError::InvalidHandle(handle.raw()))
        );
        assert!(backend.volume(handle).is_err());
        assert_eq!(backend.playback_state(handle), PlaybackState::Stopped);
    }
}
