//! Entrypoint for CLI
use std::{env, fs, process};

use log::{error, info};
use schip8::{prelude::*, IMPL_VERSION};

use self::{conf::CONF_ENV, error::AppError, terminal::Terminal};

mod conf;
mod error;
mod terminal;

static USAGE: &str = r#"
usage: schip8 ROM

Run the target ROM file in the terminal.

environment:
    SCHIP8_CONF     Path to a YAML file with VM configuration
    RUST_LOG        Log level filter

examples:
    schip8 maze.ch8
    SCHIP8_CONF=quirks.yaml schip8 breakout.ch8
"#;

/// Exit code for bad command line usage.
const EXIT_USAGE: i32 = 64;
/// Exit code for a failed run.
const EXIT_FAILURE: i32 = 1;

fn run_rom(filepath: &str) -> Result<Flow, AppError> {
    let conf = conf::load_conf()?;
    info!("configuration: {CONF_ENV}={:?}", env::var_os(CONF_ENV));

    let bytecode = fs::read(filepath)?;

    let mut vm = Chip8Vm::new(conf);
    vm.load_bytecode(&bytecode)?;

    let mut clock = vm.clock();
    let flow = vm.run(&mut Terminal::stdout(), &mut clock)?;
    info!("stopped after {} cycles", vm.cycle_count());

    Ok(flow)
}

fn main() {
    if let Err(err) = simple_logger::SimpleLogger::new().env().init() {
        eprintln!("failed to initialise logger: {err}");
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let [filepath] = args.as_slice() else {
        println!("schip8 v{IMPL_VERSION}");
        println!("{USAGE}");
        process::exit(EXIT_USAGE);
    };

    match run_rom(filepath) {
        Ok(flow) => info!("finished: {flow:?}"),
        Err(err) => {
            error!("{err}");
            process::exit(EXIT_FAILURE);
        }
    }
}
