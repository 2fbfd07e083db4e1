mod event_config;
mod manager_desc;

pub use event_config::{
    EventConfig, InitMode, Polyphony, ReleaseMode, SharingScope, StealingPolicy,
};
pub use manager_desc::ManagerDesc;
