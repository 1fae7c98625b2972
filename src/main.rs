use clap::Parser;
use navstack::core::config;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

#[derive(Parser)]
#[command(name = "navstack", about = "Backstack navigation engine demo")]
struct Args {
    /// Start from an empty backstack instead of the saved snapshot
    #[arg(long)]
    fresh: bool,

    /// Slide transition length in milliseconds (0 disables animation)
    #[arg(long)]
    animation_ms: Option<u64>,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let loaded = config::load_config();
    let resolved = match &loaded {
        Ok(file_config) => config::resolve(file_config, args.animation_ms, args.fresh),
        Err(_) => config::resolve(
            &config::NavstackConfig::default(),
            args.animation_ms,
            args.fresh,
        ),
    };

    // Initialize file logger - writes to navstack.log unless configured otherwise
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create(&resolved.log_file) {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    if let Err(e) = &loaded {
        log::warn!("Ignoring config file: {}", e);
    }
    log::info!(
        "navstack starting (restore: {}, animation: {}ms, back policy: {:?})",
        resolved.restore_on_start,
        resolved.animation_ms,
        resolved.navigator.child_back_policy
    );

    navstack::tui::run(resolved)
}
