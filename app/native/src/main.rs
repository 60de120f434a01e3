//! Winserve binary.
//!
//! `winserve serve` runs the server on a headless screen; the remaining
//! subcommands run a scripted demo or manage the configuration file.

fn main() {
    if let Err(err) = winserve_lib::cli::run() {
        eprintln!("winserve: {err}");
        std::process::exit(1);
    }
}
