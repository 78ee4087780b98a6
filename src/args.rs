use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Run,
    Screenshot,
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub asset_dir: PathBuf,
    pub serial: Option<String>,
    pub package: Option<String>,
    pub seed: Option<u64>,
    pub debug: bool,
}

impl Args {
    /// Parse command-line flags; `None` means the caller should exit
    /// immediately (help or version was printed, or the input was invalid).
    pub fn parse() -> Option<Self> {
        let args: Vec<String> = env::args().collect();

        let mut mode = Mode::Run;
        let mut asset_dir = PathBuf::from("assets");
        let mut serial: Option<String> = None;
        let mut package: Option<String> = None;
        let mut seed: Option<u64> = None;
        let mut debug = false;

        for arg in args.iter().skip(1) {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!("pogo-bot v{}", env!("CARGO_PKG_VERSION"));
                return None;
            } else if arg == "--screenshot" || arg == "-s" {
                mode = Mode::Screenshot;
            } else if arg == "--debug" {
                debug = true;
            } else if let Some(val) = arg.strip_prefix("--assets=") {
                asset_dir = PathBuf::from(val);
            } else if let Some(val) = arg.strip_prefix("--serial=") {
                serial = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--package=") {
                package = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--seed=") {
                match val.parse::<u64>() {
                    Ok(n) => seed = Some(n),
                    Err(_) => {
                        eprintln!("❌ Invalid seed value: {}", val);
                        return None;
                    }
                }
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        Some(Args {
            mode,
            asset_dir,
            serial,
            package,
            seed,
            debug,
        })
    }
}

fn print_help() {
    println!("🤖 Pokémon GO ADB Automation Bot");
    println!();
    println!("USAGE:");
    println!("    pogo-bot [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)          Run the automation loop");
    println!("    --assets=DIR        Template image directory (default: assets)");
    println!("    --serial=SERIAL     ADB device serial (default: first device)");
    println!("    --package=PKG       Game package to bring to the foreground first");
    println!("    --seed=N            Jitter RNG seed (default: random, logged)");
    println!("    --screenshot, -s    Capture one frame to screenshot.png and exit");
    println!("    --debug             Enable debug logging");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    pogo-bot --assets=./assets --package=com.nianticlabs.pokemongo");
    println!("    pogo-bot --screenshot --serial=emulator-5554");
    println!("    pogo-bot --seed=42 --debug");
}
