use std::time::Duration;

/// Configuration descriptor for an [`AudioManager`](crate::AudioManager) session
#[derive(Debug, Clone)]
pub struct ManagerDesc {
    /// How often bindings waiting for their audio to finish are checked and released
    pub sweep_interval: Duration,
    /// When set, every new binding is inert and never touches the backend
    pub disable_all_audio: bool,
    /// Capacity of the cross-thread command queue (None = unbounded)
    pub command_capacity: Option<usize>,
}

impl Default for ManagerDesc {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(10),
            disable_all_audio: false,
            command_capacity: None,
        }
    }
}

impl ManagerDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn disable_all_audio(mut self, disable: bool) -> Self {
        self.disable_all_audio = disable;
        self
    }

    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = Some(capacity);
        self
    }
}
