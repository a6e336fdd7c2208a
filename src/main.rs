use std::process::ExitCode;

use atomwrite::output as out;

mod app;
mod logging;

fn main() -> ExitCode {
    let args = atomwrite::cli::parse();
    match app::run(args) {
        Ok(code) => code,
        Err(e) => {
            out::print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
