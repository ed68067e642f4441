use colored::Colorize;

use hub_stubgen::cli;

fn main() {
    let command_line_interface = cli::CommandLineInterface::load();
    let default_filter = if command_line_interface.verbose() { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
    if let Err(error) = command_line_interface.run() {
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
