//! Event types for VoxPool

use crate::backend::InstanceHandle;
use crate::binding::BindingId;
use crate::playback::PlaybackCommand;
use crate::pool::PoolKey;

/// Notifications collected by the [`AudioManager`](crate::AudioManager) and
/// drained with [`poll_events`](crate::AudioManager::poll_events).
#[derive(Debug, Clone, PartialEq)]
pub enum VoxPoolEvent {
    PoolCreated {
        key: PoolKey,
        voices: usize,
    },
    PoolJoined {
        key: PoolKey,
        binding: BindingId,
        ref_count: u32,
    },
    PoolDetached {
        key: PoolKey,
        binding: BindingId,
        ref_count: u32,
    },
    PoolDestroyed {
        key: PoolKey,
    },
    /// A binding joined a shared pool built from a different configuration.
    /// The pool keeps the configuration of its first binding.
    SharedConfigurationMismatch {
        key: PoolKey,
        binding: BindingId,
    },
    VoiceStarted {
        binding: BindingId,
        handle: InstanceHandle,
        slot: usize,
    },
    BindingReleased {
        binding: BindingId,
    },
    CommandFailed {
        command: PlaybackCommand,
        error: String,
    },
}

impl VoxPoolEvent {
    pub fn binding_id(&self) -> Option<BindingId> {
        match self {
            Self::PoolJoined { binding, .. }
            | Self::PoolDetached { binding, .. }
            | Self::SharedConfigurationMismatch { binding, .. }
            | Self::VoiceStarted { binding, .. }
            | Self::BindingReleased { binding } => Some(*binding),
            Self::CommandFailed { command, .. } => command.binding_id(),
            Self::PoolCreated { .. } | Self::PoolDestroyed { .. } => None,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::SharedConfigurationMismatch { .. } | Self::CommandFailed { .. }
        )
    }

    pub fn is_pool_event(&self) -> bool {
        matches!(
            self,
            Self::PoolCreated { .. }
                | Self::PoolJoined { .. }
                | Self::PoolDetached { .. }
                | Self::PoolDestroyed { .. }
        )
    }
}
