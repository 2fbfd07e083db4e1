//! Session-wide table of voice pools.

use crate::backend::AudioBackend;
use crate::config::EventConfig;
use crate::error::Result;
use crate::pool::{PoolKey, PoolSettings, VoicePool};
use std::collections::HashMap;

/// Result of [`PoolRegistry::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// No pool existed for the key; one was materialized.
    Created { voices: usize },
    /// An existing pool was reused. `mismatch` is set when the caller's
    /// configuration differs from the one the pool was built with.
    Joined { ref_count: u32, mismatch: bool },
}

/// Result of [`PoolRegistry::detach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detachment {
    /// Other bindings still use the pool.
    Released { ref_count: u32 },
    /// The last binding left; the pool was destroyed and removed.
    Destroyed,
    /// Nothing was attached under the key.
    NotAttached,
}

/// Owns every [`VoicePool`] of a session and counts the bindings attached to each.
///
/// A pool exists in the registry exactly as long as at least one binding is
/// attached to it. The registry is a plain value: it lives inside an
/// [`AudioManager`](crate::AudioManager) (or wherever the caller keeps it) and
/// all mutation goes through `&mut self`.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: HashMap<PoolKey, VoicePool>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach one binding to the pool for `key`, creating the pool if needed.
    ///
    /// When the pool already exists the caller's voice count and stealing
    /// policy are ignored: the first attacher's configuration wins.
    pub fn attach<B: AudioBackend + ?Sized>(
        &mut self,
        key: &PoolKey,
        config: &EventConfig,
        backend: &mut B,
    ) -> Result<Attachment> {
        let requested = PoolSettings::from_config(config);

        if let Some(pool) = self.pools.get_mut(key) {
            let ref_count = pool.increment_ref();
            let actual = pool.settings();
            let mismatch = actual.polyphony != requested.polyphony
                || actual.voice_count != requested.voice_count
                || actual.stealing != requested.stealing;

            if mismatch {
                log::warn!(
                    "Shared pool {} was built with {} voice(s) ({:?}, {:?}) but a binding asked for {} ({:?}, {:?}); keeping the existing pool",
                    key,
                    actual.voice_count,
                    actual.polyphony,
                    actual.stealing,
                    requested.voice_count,
                    requested.polyphony,
                    requested.stealing
                );
            }

            log::debug!("Pool {} joined, ref count {}", key, ref_count);
            return Ok(Attachment::Joined {
                ref_count,
                mismatch,
            });
        }

        let mut pool = VoicePool::materialize(key.clone(), requested, backend)?;
        pool.increment_ref();
        let voices = pool.len();
        self.pools.insert(key.clone(), pool);

        log::info!("Pool {} created with {} voice(s)", key, voices);
        Ok(Attachment::Created { voices })
    }

    /// Drop one binding's share of the pool for `key`.
    ///
    /// The pool is destroyed and removed when the last share goes. Detaching a
    /// key that is not attached is a no-op.
    pub fn detach<B: AudioBackend + ?Sized>(&mut self, key: &PoolKey, backend: &mut B) -> Detachment {
        let Some(pool) = self.pools.get_mut(key) else {
            log::debug!("Detach of {} ignored, nothing attached", key);
            return Detachment::NotAttached;
        };

        let ref_count = pool.decrement_ref();
        if ref_count > 0 {
            log::debug!("Pool {} released, ref count {}", key, ref_count);
            return Detachment::Released { ref_count };
        }

        if let Some(mut pool) = self.pools.remove(key) {
            pool.destroy(backend);
        }
        log::info!("Pool {} destroyed", key);
        Detachment::Destroyed
    }

    pub fn get(&self, key: &PoolKey) -> Option<&VoicePool> {
        self.pools.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &PoolKey) -> Option<&mut VoicePool> {
        self.pools.get_mut(key)
    }

    pub fn contains(&self, key: &PoolKey) -> bool {
        self.pools.contains_key(key)
    }

    /// Bindings attached to `key`; 0 when no pool exists.
    pub fn ref_count(&self, key: &PoolKey) -> u32 {
        self.pools.get(key).map_or(0, VoicePool::ref_count)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PoolKey> {
        self.pools.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PoolKey, &VoicePool)> {
        self.pools.iter()
    }

    /// Destroy every pool regardless of reference counts. Used at session teardown.
    pub fn clear<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        for (key, mut pool) in self.pools.drain() {
            log::debug!("Pool {} destroyed at teardown ({} ref(s) left)", key, pool.ref_count());
            pool.destroy(backend);
        }
    }
}
