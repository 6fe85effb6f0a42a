use std::process::ExitCode;

fn main() -> ExitCode {
    game_shelf::run()
}
