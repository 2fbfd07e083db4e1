mod cli;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let level = if args.iter().any(|arg| arg == "--verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let requested: Vec<&str> = args
        .iter()
        .skip(1)
        .filter(|arg| !arg.starts_with("--"))
        .map(String::as_str)
        .collect();

    if args.iter().any(|arg| arg == "--list") {
        for scenario in cli::SCENARIOS {
            println!("{:<12} {}", scenario.name, scenario.about);
        }
        return Ok(());
    }

    cli::run_scenarios(&requested)
}
