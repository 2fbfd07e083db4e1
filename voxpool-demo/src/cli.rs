use anyhow::{Context, Result, bail};
use std::time::Duration;
use voxpool::{
    AudioManager, EventConfig, ManagerDesc, PlaybackCommand, Pose, ReleaseMode, SimulatedBackend,
    StealingPolicy, StopMode, Vec3, VoxPoolEvent,
};

pub struct Scenario {
    pub name: &'static str,
    pub about: &'static str,
    run: fn() -> Result<()>,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "footsteps",
        about: "round-robin stealing over three voices",
        run: footsteps,
    },
    Scenario {
        name: "crowd",
        about: "two emitters sharing one pool",
        run: crowd,
    },
    Scenario {
        name: "impacts",
        about: "quietest and furthest stealing",
        run: impacts,
    },
    Scenario {
        name: "one-shots",
        about: "immediate and on-finish release",
        run: one_shots,
    },
    Scenario {
        name: "commands",
        about: "playback queued from a worker thread",
        run: commands,
    },
];

/// Run the named scenarios, or all of them when `names` is empty.
pub fn run_scenarios(names: &[&str]) -> Result<()> {
    for name in names {
        if !SCENARIOS.iter().any(|scenario| scenario.name == *name) {
            bail!("unknown scenario '{}', try --list", name);
        }
    }

    for scenario in SCENARIOS {
        if !names.is_empty() && !names.contains(&scenario.name) {
            continue;
        }
        log::info!("=== {} ===", scenario.name);
        (scenario.run)().with_context(|| format!("scenario '{}' failed", scenario.name))?;
    }
    Ok(())
}

fn new_manager(backend: SimulatedBackend) -> AudioManager<SimulatedBackend> {
    let desc = ManagerDesc::default().sweep_interval(Duration::from_millis(500));
    AudioManager::new(desc, backend)
}

fn report(manager: &mut AudioManager<SimulatedBackend>) {
    for event in manager.poll_events() {
        if event.is_warning() {
            log::warn!("{:?}", event);
        } else {
            log::info!("{:?}", event);
        }
    }
}

fn footsteps() -> Result<()> {
    let mut manager = new_manager(SimulatedBackend::new());
    let id = manager.bind(
        EventConfig::new("event:/sfx/footstep")
            .polyphonic(3)
            .stealing(StealingPolicy::Oldest),
    )?;

    for step in 0..5 {
        let handle = manager.play(id)?;
        log::info!("step {} -> {:?}", step, handle);
    }
    report(&mut manager);

    manager.unbind(id)?;
    report(&mut manager);
    Ok(())
}

fn crowd() -> Result<()> {
    let mut manager = new_manager(SimulatedBackend::new().with_3d_event("event:/amb/crowd"));
    let config = EventConfig::new("event:/amb/crowd").polyphonic(2).shared();

    let left = manager.bind(config.clone())?;
    let right = manager.bind(config)?;
    // asks for more voices than the pool was built with
    let late = manager.bind(
        EventConfig::new("event:/amb/crowd")
            .polyphonic(6)
            .shared(),
    )?;
    log::info!("{} pool(s) live", manager.registry().len());

    manager.play_at(left, Vec3::new(-8.0, 0.0, 0.0))?;
    manager.play_at(right, Vec3::new(8.0, 0.0, 0.0))?;
    report(&mut manager);

    for id in [left, right, late] {
        manager.release(id);
        log::info!("released {}, {} pool(s) live", id, manager.registry().len());
    }
    report(&mut manager);
    Ok(())
}

fn impacts() -> Result<()> {
    let mut manager = new_manager(SimulatedBackend::new().with_3d_event("event:/sfx/impact"));
    let quiet = manager.bind(
        EventConfig::new("event:/sfx/impact")
            .polyphonic(3)
            .stealing(StealingPolicy::Quietest),
    )?;

    let handles: Vec<_> = (0..3)
        .map(|_| manager.play_at(quiet, Vec3::ZERO))
        .collect::<voxpool::error::Result<_>>()?;
    for (handle, volume) in handles.iter().flatten().zip([0.9, 0.2, 0.6]) {
        manager.backend_mut().set_volume(*handle, volume);
    }
    let stolen = manager.play_at(quiet, Vec3::ZERO)?;
    log::info!("quietest stole {:?}", stolen);

    let far = manager.bind(
        EventConfig::new("event:/sfx/impact")
            .polyphonic(2)
            .stealing(StealingPolicy::Furthest),
    )?;
    manager.play_at(far, Vec3::new(2.0, 0.0, 0.0))?;
    manager.play_at(far, Vec3::new(40.0, 0.0, 0.0))?;
    manager.set_listener_pose(Pose::from_position(Vec3::new(1.0, 0.0, 0.0)));
    let stolen = manager.play_at(far, Vec3::new(1.5, 0.0, 0.0))?;
    log::info!("furthest stole {:?}", stolen);

    manager.stop_everything(StopMode::Immediate)?;
    report(&mut manager);
    Ok(())
}

fn one_shots() -> Result<()> {
    let mut manager = new_manager(SimulatedBackend::new());
    let click = manager.bind(
        EventConfig::new("event:/ui/click").release_mode(ReleaseMode::Immediate),
    )?;
    let bell = manager.bind(
        EventConfig::new("event:/sfx/bell").release_mode(ReleaseMode::OnFinish),
    )?;

    manager.play(click)?;
    let ringing = manager
        .play(bell)?
        .context("bell binding unexpectedly inert")?;
    report(&mut manager);

    for frame in 0..40 {
        if frame == 20 {
            log::info!("bell finished ringing");
            manager.backend_mut().finish(ringing);
        }
        manager.tick(Duration::from_millis(16));
    }
    report(&mut manager);

    if !manager.registry().is_empty() {
        bail!("{} pool(s) still live", manager.registry().len());
    }
    Ok(())
}

fn commands() -> Result<()> {
    let mut manager = new_manager(SimulatedBackend::new());
    let id = manager.bind(EventConfig::new("event:/sfx/alarm").polyphonic(2))?;
    let sender = manager.command_sender();

    let worker = std::thread::spawn(move || -> Result<()> {
        sender.send(PlaybackCommand::Play(id))?;
        sender.send(PlaybackCommand::PlayAt(id, Vec3::new(0.0, 2.0, 0.0)))?;
        sender.send(PlaybackCommand::StopAll)?;
        Ok(())
    });
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("command worker panicked"))??;

    manager.tick(Duration::from_millis(16));
    let started = manager
        .poll_events()
        .into_iter()
        .filter(|event| matches!(event, VoxPoolEvent::VoiceStarted { .. }))
        .count();
    log::info!("{} voice(s) started from queued commands", started);

    manager.unbind(id)?;
    Ok(())
}
