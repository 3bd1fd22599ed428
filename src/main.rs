use clap::Parser;
use twin_circuit::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = twin_circuit::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
