use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};
use poise::serenity_prelude as serenity;
use tokio::sync::{broadcast, RwLock};

use crate::cfg::Config;
use crate::tickets::{self, CooldownGate};
use crate::{panel, status};

// User data, which is stored and accessible in all event invocations
pub struct Data {
    pub config: Arc<Config>,
    /// Per-user gate against repeated open-ticket clicks.
    pub cooldowns: RwLock<CooldownGate>,
    /// Fan-out for the stop sequence; the presence loop and pending
    /// ticket closes subscribe to it.
    pub shutdown: broadcast::Sender<()>,
    ready_once: AtomicBool,
}

impl Data {
    pub fn new(config: Arc<Config>, shutdown: broadcast::Sender<()>) -> Self {
        Self {
            config,
            cooldowns: RwLock::new(CooldownGate::default()),
            shutdown,
            ready_once: AtomicBool::new(false),
        }
    }
}

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Arc<Data>, anyhow::Error>,
    data: &Arc<Data>,
) -> Result<(), anyhow::Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("{} is connected", data_about_bot.user.name);

            // a gateway reconnect delivers Ready again; the panel and the
            // presence loop must only start once per process
            if data.ready_once.swap(true, Ordering::SeqCst) {
                return Ok(());
            }

            tokio::spawn(status::updater_task(ctx.clone(), data.clone()));

            if let Err(err) = panel::deploy(ctx, &data.config).await {
                error!("failed to deploy the ticket panel: {:#}", err);
            }
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => {
            tickets::handle_component(ctx, data, component).await;
        }
        _ => {}
    }

    Ok(())
}
