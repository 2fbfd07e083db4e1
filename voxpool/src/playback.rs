//! Playback state and control types.
//!
//! This module provides the small vocabulary shared between the pool manager and
//! the audio backend:
//! - [`PlaybackState`]: What the engine reports for a single instance
//! - [`StopMode`]: Whether a stop request may fade out
//! - [`PlaybackCommand`]: Requests posted from other threads, drained on `tick`
//!
//! Most users drive playback through [`AudioManager`](crate::AudioManager)
//! methods like `play()`, `stop()` and `release()`, rather than using the
//! command queue directly.

use crate::binding::BindingId;
use crate::math::Vec3;

/// Playback state of one engine instance, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Start was requested and the engine is preparing the instance
    Starting,
    /// Audio is currently playing
    Playing,
    /// A fade-out stop is in progress; still audible
    Stopping,
    /// Silent, either never started or finished
    #[default]
    Stopped,
}

impl PlaybackState {
    /// Returns true while the instance can still be heard.
    pub fn is_audible(&self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

/// How a stop request should be applied by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Let the event run its authored fade-out
    AllowFadeOut,
    /// Cut the instance off at once
    Immediate,
}

impl StopMode {
    pub fn from_fade_out(fade_out: bool) -> Self {
        if fade_out {
            Self::AllowFadeOut
        } else {
            Self::Immediate
        }
    }
}

/// Commands that other threads can post to an [`AudioManager`](crate::AudioManager).
///
/// The manager owns all registry and pool state on its update thread. Engine
/// callbacks or gameplay workers that want to trigger playback send one of
/// these through [`AudioManager::command_sender`](crate::AudioManager::command_sender);
/// the queue is drained at the start of every `tick`, so every mutation still
/// happens on a single writer.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    /// Play a binding as a 2D event
    Play(BindingId),
    /// Play a binding at a world position
    PlayAt(BindingId, Vec3),
    /// Stop every voice a binding uses
    Stop(BindingId),
    /// Release a binding's share of its pool
    Release(BindingId),
    /// Stop all non-steady bindings
    StopAll,
}

impl PlaybackCommand {
    pub fn binding_id(&self) -> Option<BindingId> {
        match self {
            Self::Play(id) | Self::PlayAt(id, _) | Self::Stop(id) | Self::Release(id) => Some(*id),
            Self::StopAll => None,
        }
    }
}
