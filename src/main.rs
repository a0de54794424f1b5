use lenderbot::{cli_parse, init_logging, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli_parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
