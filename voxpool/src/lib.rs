//! # VoxPool
//!
//! Voice pooling and lifecycle management for event-based game audio.
//!
//! Games play short sounds (footsteps, impacts, UI clicks) very often. Creating
//! an engine instance for every play is expensive, so VoxPool keeps a fixed set
//! of pre-created instances per event, picks one per play request with a
//! stealing policy, and lets several owners share one pool with reference
//! counting. The actual mixing is left to an [`AudioBackend`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use voxpool::*;
//! use std::time::Duration;
//!
//! let mut manager = AudioManager::new(ManagerDesc::default(), SimulatedBackend::new());
//!
//! // Three footstep voices, recycled round-robin
//! let footsteps = manager.bind(
//!     EventConfig::new("event:/sfx/footstep")
//!         .polyphonic(3)
//!         .stealing(StealingPolicy::Oldest),
//! )?;
//!
//! // Every crowd emitter in the level shares one pool
//! let crowd = manager.bind(EventConfig::new("event:/amb/crowd").polyphonic(2).shared())?;
//!
//! manager.play(footsteps)?;
//! manager.play_at(crowd, Vec3::new(10.0, 0.0, 3.0))?;
//!
//! // Once per frame
//! manager.tick(Duration::from_millis(16));
//! for event in manager.poll_events() {
//!     if event.is_warning() {
//!         println!("{:?}", event);
//!     }
//! }
//!
//! manager.unbind(footsteps)?;
//! manager.unbind(crowd)?;
//! # Ok::<(), VoxPoolError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`AudioManager`]**: owner-facing API; binds configurations and drives playback
//! - **[`EventConfig`]**: what an owner wants from one event (polyphony, sharing, policies)
//! - **[`PoolRegistry`]**: session-wide table of pools with reference counts
//! - **[`VoicePool`]**: the pre-created instances of one event and the stealing logic
//! - **[`EventBinding`]**: one owner's configuration snapshot and lifecycle state
//! - **[`AudioBackend`]**: trait wrapping the underlying audio engine
//!
//! ## Threading
//!
//! The manager is single-threaded and lives on the game's update thread. Other
//! threads queue [`PlaybackCommand`]s through a channel from
//! [`AudioManager::command_sender`]; they run on the next [`AudioManager::tick`].

pub mod backend;
pub mod binding;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod math;
pub mod playback;
pub mod pool;
pub mod registry;
pub mod sweep;
pub mod voice;

pub use backend::{AudioBackend, BackendCall, EventId, InstanceHandle, SimulatedBackend};
pub use binding::{BindingId, BindingState, EventBinding, StartedVoice};
pub use config::{
    EventConfig, InitMode, ManagerDesc, Polyphony, ReleaseMode, SharingScope, StealingPolicy,
};
pub use error::{BackendError, VoxPoolError};
pub use events::VoxPoolEvent;
pub use manager::AudioManager;
pub use math::{Pose, Quat, Vec3};
pub use playback::{PlaybackCommand, PlaybackState, StopMode};
pub use pool::{PoolKey, PoolSettings, VoicePool};
pub use registry::{Attachment, Detachment, PoolRegistry};
pub use sweep::ReleaseSweep;
pub use voice::VoiceSlot;
