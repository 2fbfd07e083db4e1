//! The seam between the pool manager and the commercial audio engine.
//!
//! VoxPool never mixes or decodes audio itself. Everything audible goes through
//! an [`AudioBackend`], which wraps whatever engine the game ships with. The
//! [`SimulatedBackend`] keeps all state in memory and is what the tests and the
//! demo run against.

mod simulated;

pub use simulated::{BackendCall, SimulatedBackend};

use crate::error::BackendError;
use crate::math::Vec3;
use crate::playback::{PlaybackState, StopMode};
use std::fmt;

/// Identity of an authored event: a content path such as `event:/sfx/door`
/// or a GUID string.
///
/// An empty id is a valid authoring state (an unassigned sound slot).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque handle to one playable engine instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceHandle(u64);

impl InstanceHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.0)
    }
}

/// Operations VoxPool needs from the underlying audio engine.
///
/// All methods are called from the manager's update thread.
pub trait AudioBackend {
    /// Create a new playable instance of `event_id`.
    fn create_instance(&mut self, event_id: &EventId) -> Result<InstanceHandle, BackendError>;

    /// Free an instance. The engine may let a playing instance finish first.
    fn release(&mut self, handle: InstanceHandle);

    fn start(&mut self, handle: InstanceHandle) -> Result<(), BackendError>;

    fn stop(&mut self, handle: InstanceHandle, mode: StopMode) -> Result<(), BackendError>;

    fn volume(&self, handle: InstanceHandle) -> Result<f32, BackendError>;

    fn playback_state(&self, handle: InstanceHandle) -> PlaybackState;

    fn is_event_3d(&self, event_id: &EventId) -> bool;

    fn set_3d_position(
        &mut self,
        handle: InstanceHandle,
        position: Vec3,
    ) -> Result<(), BackendError>;

    /// Detach an instance from whatever scene object the engine tracks it with.
    fn detach(&mut self, _handle: InstanceHandle) {}

    fn load_sample_data(&mut self, _event_id: &EventId) {}

    fn unload_sample_data(&mut self, _event_id: &EventId) {}
}

/// Lets a manager borrow a backend the caller keeps ownership of.
impl<B: AudioBackend + ?Sized> AudioBackend for &mut B {
    fn create_instance(&mut self, event_id: &EventId) -> Result<InstanceHandle, BackendError> {
        (**self).create_instance(event_id)
    }

    fn release(&mut self, handle: InstanceHandle) {
        (**self).release(handle)
    }

    fn start(&mut self, handle: InstanceHandle) -> Result<(), BackendError> {
        (**self).start(handle)
    }

    fn stop(&mut self, handle: InstanceHandle, mode: StopMode) -> Result<(), BackendError> {
        (**self).stop(handle, mode)
    }

    fn volume(&self, handle: InstanceHandle) -> Result<f32, BackendError> {
        (**self).volume(handle)
    }

    fn playback_state(&self, handle: InstanceHandle) -> PlaybackState {
        (**self).playback_state(handle)
    }

    fn is_event_3d(&self, event_id: &EventId) -> bool {
        (**self).is_event_3d(event_id)
    }

    fn set_3d_position(
        &mut self,
        handle: InstanceHandle,
        position: Vec3,
    ) -> Result<(), BackendError> {
        (**self).set_3d_position(handle, position)
    }

    fn detach(&mut self, handle: InstanceHandle) {
        (**self).detach(handle)
    }

    fn load_sample_data(&mut self, event_id: &EventId) {
        (**self).load_sample_data(event_id)
    }

    fn unload_sample_data(&mut self, event_id: &EventId) {
        (**self).unload_sample_data(event_id)
    }
}
