use std::process::ExitCode;

use clap::Parser;

use ldifsplit::args::Cli;

fn main() -> ExitCode {
    // Diagnostics go to standard error; standard output carries only the
    // progress and summary lines.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match ldifsplit::run(cli) {
        Ok(summary) if summary.success => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
