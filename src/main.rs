use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;

use ntag::{Args, OutputFormat, run_with_log_level};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();

    let log_level = args.log_level();
    let output_format = args.output_format().unwrap_or(if stdout.is_terminal() {
        OutputFormat::Pretty
    } else {
        OutputFormat::Json
    });
    let (command, session) = args.into_command_and_session();

    match run_with_log_level(command, &mut stdout, session, output_format, log_level).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
