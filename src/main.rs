use clap::Parser;
use ghq::{cli::Cli, commands, init_tracing};

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let code = match commands::run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    };
    if code != 0 {
        std::process::exit(code);
    }
}
