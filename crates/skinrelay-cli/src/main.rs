use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
pub mod exit_codes;

use cli::args::Cli;
use cli::commands::dispatch;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => match exit_codes::classify(&e) {
            Some((kind, message)) => {
                tracing::debug!(kind, error = %e, "command failed");
                eprintln!("error: {}", message);
                exit_codes::for_kind(kind)
            }
            None => {
                eprintln!("fatal: {e:?}");
                exit_codes::CONFIG_ERROR
            }
        },
    };
    std::process::exit(code);
}
