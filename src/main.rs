use std::sync::Arc;

mod bot;
mod cfg;
mod handler;
mod notify;
mod panel;
mod status;
mod tickets;

#[tokio::main]
/// Entrypoint for the guichet ticket bot.
/// It posts a ticket panel in a configured channel, turns button clicks
/// into private support threads, and mirrors a FiveM server's player
/// count in the bot presence.
async fn main() -> Result<(), anyhow::Error> {
    // configuration comes first: the log filter depends on the DEBUG
    // flag, and a broken environment must exit with status 1
    let config = match cfg::Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    };

    if config.debug && std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "debug");
    }
    pretty_env_logger::init();

    bot::Bot::new(config).start().await
}
