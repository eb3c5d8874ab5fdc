use std::sync::Arc;

use anyhow::Context;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::error;
use poise::serenity_prelude::{ClientBuilder, GatewayIntents};
use tokio::signal;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::cfg::Config;
use crate::handler::{self, Data};

pub struct Bot {
    pub data: Arc<Data>,
    pub shutdown: Receiver<()>,
    shutdown_send: Sender<()>,
}

/// Sends a message through `shutdown_send` when a stop signal is detected.
/// Used to start the bot stop sequence.
async fn wait_for_stop_signal(bot: Arc<Bot>) -> Result<(), anyhow::Error> {
    let mut shutdown = bot.shutdown.resubscribe();
    tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => {
                    bot.shutdown_send
                        .send(())
                        .context("failed to send a shutdown signal")?;
                    Ok(())
                }
                Err(err) => Err(anyhow::anyhow!(err)),
            }
        },
        _ = shutdown.recv() => { Ok(()) }
    }
}

async fn on_error(error: poise::FrameworkError<'_, Arc<Data>, anyhow::Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {:?}", error),
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

impl Bot {
    pub fn new(config: Arc<Config>) -> Arc<Self> {
        // This signal is used to stop the gateway client, the presence
        // loop and any pending ticket closes at the same time.
        let (shutdown_send, shutdown) = tokio::sync::broadcast::channel(1);

        let data = Arc::new(Data::new(config, shutdown_send.clone()));

        Arc::new(Self {
            data,
            shutdown,
            shutdown_send,
        })
    }

    pub async fn start(self: Arc<Self>) -> Result<(), anyhow::Error> {
        let mut shutdown = self.shutdown.resubscribe();
        let mut tasks = FuturesUnordered::new();

        let options = poise::FrameworkOptions {
            // the bot exposes no commands; everything happens through
            // the component buttons handled in the event hook
            commands: vec![],
            event_handler: |ctx, event, framework, data| {
                Box::pin(handler::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        };
        let data = self.data.clone();
        let framework = poise::Framework::builder()
            .options(options)
            .setup(move |_ctx, _ready, _framework| Box::pin(async move { Ok(data) }))
            .build();
        let client = ClientBuilder::new(
            self.data.config.discord.token.clone(),
            GatewayIntents::non_privileged(),
        )
        .framework(framework);

        let mut client = client.await.context("failed to create the discord client")?;

        tasks.push(tokio::spawn(async move {
            // wait until the bot terminates or a shutdown signal is received.
            tokio::select! {
                result = client.start_autosharded() => {
                    if let Err(err) = result {
                        error!("Client error: {}", err);
                    }
                },
                _ = shutdown.recv() => {
                    // shutdown the bot properly
                    client.shard_manager.shutdown_all().await;
                }
            };
        }));
        let self_clone = self.clone();
        tasks.push(tokio::spawn(async {
            let _ = wait_for_stop_signal(self_clone).await;
        }));

        // wait for a task to finish.
        let task = tasks
            .next()
            .await
            .context("no tasks started, illegal state")?
            .context("failed to join task");

        // when a task is finished, we must terminate all the others,
        // hence we send a signal telling all tasks to stop processing
        // and return.
        self.shutdown_send.send(())?;

        while let Some(operation) = tasks.next().await {
            operation.context("failed to join task")?;
        }

        task?;
        Ok(())
    }
}
