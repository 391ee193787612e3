/// Flowtalk CLI
///
/// Runs, checks and dumps flow scripts from the terminal.
use flowtalk_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
