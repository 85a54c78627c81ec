use std::process::ExitCode;

fn main() -> ExitCode {
    list_directory::run(std::env::args_os())
}
