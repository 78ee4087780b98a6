use pogo_bot::args::{Args, Mode};
use pogo_bot::bot::{ControlCommand, LoopController, control_channels};
use pogo_bot::config::BotConfig;
use pogo_bot::device::AdbShell;
use pogo_bot::error::BotResult;
use pogo_bot::vision::ReferenceLibrary;
use std::time::Duration;

fn main() {
    let Some(args) = Args::parse() else {
        return;
    };

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let code = rt.block_on(async {
        match args.mode {
            Mode::Screenshot => screenshot(&args).await,
            Mode::Run => run(&args).await,
        }
    });
    std::process::exit(code);
}

fn build_config(args: &Args) -> BotConfig {
    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("🎲 jitter seed: {seed}");
    BotConfig {
        asset_dir: args.asset_dir.clone(),
        device_serial: args.serial.clone(),
        package: args.package.clone(),
        rng_seed: seed,
        ..BotConfig::default()
    }
}

async fn connect(config: &BotConfig) -> BotResult<AdbShell> {
    AdbShell::connect(
        config.device_serial.clone(),
        config.capture_timeout,
        config.input_timeout,
    )
    .await
}

async fn screenshot(args: &Args) -> i32 {
    let config = build_config(args);
    let shell = match connect(&config).await {
        Ok(shell) => shell,
        Err(e) => {
            log::error!("❌ {e}");
            return e.exit_code();
        }
    };
    match shell.capture_png().await {
        Ok(png) => {
            if let Err(e) = tokio::fs::write("screenshot.png", &png).await {
                log::error!("❌ write failed: {e}");
                return 1;
            }
            log::info!("📸 saved {} bytes to screenshot.png", png.len());
            0
        }
        Err(e) => {
            log::error!("❌ {e}");
            e.exit_code()
        }
    }
}

async fn run(args: &Args) -> i32 {
    let config = build_config(args);

    // Asset load failures are fatal before the loop ever starts.
    let library = match ReferenceLibrary::load(&config.asset_dir) {
        Ok(library) => library,
        Err(e) => {
            log::error!("❌ {e}");
            return e.exit_code();
        }
    };

    let device = match connect(&config).await {
        Ok(device) => device,
        Err(e) => {
            log::error!("❌ {e}");
            return e.exit_code();
        }
    };

    if let Some(package) = &config.package {
        match device.is_foreground(package).await {
            Ok(true) => log::info!("✅ {package} already in the foreground"),
            Ok(false) => {
                log::info!("🚀 launching {package}");
                if let Err(e) = device.launch_app(package).await {
                    log::error!("❌ {e}");
                    return e.exit_code();
                }
                tokio::time::sleep(Duration::from_secs(8)).await;
            }
            Err(e) => {
                log::warn!("⚠️ foreground check failed, continuing: {e}");
            }
        }
        if let Err(e) = device.stay_awake(true).await {
            log::warn!("⚠️ could not enable stay-awake: {e}");
        }
    }

    let (cmd_tx, cmd_rx, event_tx, mut event_rx) = control_channels();

    // Drain events so the channel never fills; a real operator layer would
    // subscribe here.
    tokio::spawn(async move { while event_rx.recv().await.is_some() {} });

    // Ctrl-C requests a cooperative stop; the in-flight iteration finishes.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("🛑 stop requested, finishing current iteration");
            let _ = cmd_tx.send(ControlCommand::Stop).await;
        }
    });

    let mut controller = LoopController::new(config, library, device, cmd_rx, event_tx);
    match controller.run().await {
        Ok(()) => 0,
        Err(e) => e.exit_code(),
    }
}
