use crate::backend::InstanceHandle;
use crate::math::Vec3;

/// One engine instance owned by a [`VoicePool`](crate::VoicePool), plus the
/// bookkeeping the stealing policies read.
#[derive(Debug, Clone)]
pub struct VoiceSlot {
    handle: InstanceHandle,
    allocated_at: u64,
    last_known_volume: f32,
    last_position: Option<Vec3>,
    valid: bool,
}

impl VoiceSlot {
    pub(crate) fn new(handle: InstanceHandle) -> Self {
        Self {
            handle,
            allocated_at: 0,
            last_known_volume: 1.0,
            last_position: None,
            valid: true,
        }
    }

    pub fn handle(&self) -> InstanceHandle {
        self.handle
    }

    /// Pool sequence number of the last time this slot was selected (0 = never).
    pub fn allocated_at(&self) -> u64 {
        self.allocated_at
    }

    pub fn last_known_volume(&self) -> f32 {
        self.last_known_volume
    }

    /// World position of the last 3D play on this slot.
    pub fn last_position(&self) -> Option<Vec3> {
        self.last_position
    }

    /// False once the owning pool has been destroyed.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn mark_allocated(&mut self, sequence: u64) {
        self.allocated_at = sequence;
    }

    pub(crate) fn set_last_known_volume(&mut self, volume: f32) {
        self.last_known_volume = volume;
    }

    pub(crate) fn set_last_position(&mut self, position: Option<Vec3>) {
        self.last_position = position;
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }
}
