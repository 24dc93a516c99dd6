use clap::Parser;

use kioskcut::cli::Cli;
use kioskcut::commands::{RunContext, handle_command};
use kioskcut::config::Settings;
use kioskcut::ui::{self, Level, emit};

fn main() {
    let cli = Cli::parse();

    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);
    if cli.debug {
        emit(Level::Debug, "debug.enabled", "Debug mode is on", None);
    }

    let result = Settings::load().and_then(|settings| {
        let mut ctx = RunContext::from_cli(&cli, settings);
        handle_command(cli.command.clone(), &mut ctx)
    });

    if let Err(e) = result {
        emit(Level::Error, "error", &format!("Error: {:#}", e), None);
        std::process::exit(1);
    }
}
