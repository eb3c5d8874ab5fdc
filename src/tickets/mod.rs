use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use log::{error, info};
use poise::serenity_prelude::{
    self as serenity, AutoArchiveDuration, ChannelType, Colour, CreateActionRow,
    CreateAllowedMentions, CreateButton, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, CreateThread, EditInteractionResponse,
    EditThread, Mentionable,
};

use crate::handler::Data;
use crate::notify;

pub mod registry;

pub use registry::{CooldownGate, TicketKind, CLOSE_BUTTON_ID};

/// Embed colour of the welcome message posted in a fresh ticket thread.
const TICKET_COLOUR: Colour = Colour::new(0x5865F2);
/// Ticket log colours for opened and closed events.
const OPENED_COLOUR: Colour = Colour::new(0x57F287);
const CLOSED_COLOUR: Colour = Colour::new(0xED4245);

/// Grace period between the close acknowledgement and the lock/archive
/// edit, so people can read the goodbye message.
const CLOSE_DELAY: Duration = Duration::from_secs(5);

/// Entry point for every component interaction the gateway delivers.
/// Anything that is not one of our buttons is ignored silently.
pub async fn handle_component(
    ctx: &serenity::Context,
    data: &Arc<Data>,
    component: &serenity::ComponentInteraction,
) {
    if !matches!(
        component.data.kind,
        serenity::ComponentInteractionDataKind::Button
    ) {
        return;
    }

    if let Some(kind) = TicketKind::from_custom_id(&component.data.custom_id) {
        if component.guild_id.is_none() {
            return;
        }
        if let Err(err) = open_ticket(ctx, data, component, kind).await {
            error!("failed to answer a ticket button: {:#}", err);
        }
    } else if component.data.custom_id == CLOSE_BUTTON_ID {
        if let Err(err) = close_ticket(ctx, data, component).await {
            error!("failed to answer a close button: {:#}", err);
        }
    }
}

/// Close button attached to every welcome message.
pub fn close_button() -> CreateButton {
    CreateButton::new(CLOSE_BUTTON_ID)
        .label("Close Ticket")
        .style(serenity::ButtonStyle::Secondary)
        .emoji('🔒')
}

async fn open_ticket(
    ctx: &serenity::Context,
    data: &Arc<Data>,
    component: &serenity::ComponentInteraction,
    kind: TicketKind,
) -> Result<(), anyhow::Error> {
    component.defer_ephemeral(&ctx.http).await?;

    // check and record under a single lock acquisition; there is no
    // suspension point between the read and the write
    let allowed = data
        .cooldowns
        .write()
        .await
        .try_acquire(component.user.id, Instant::now());
    if !allowed {
        component
            .edit_response(
                &ctx.http,
                EditInteractionResponse::new().content("⏳ Please wait a moment."),
            )
            .await?;
        return Ok(());
    }

    match create_ticket(ctx, data, component, kind).await {
        Ok(thread) => {
            info!(
                "{} opened a {} ticket: {}",
                component.user.name,
                kind.display_name(),
                thread.name,
            );
            component
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new()
                        .content(format!("✅ Ticket created: {}", thread.id.mention())),
                )
                .await?;

            let log = CreateEmbed::new()
                .title("Ticket Opened")
                .description(format!(
                    "User: {}\nType: {}\nThread: {}",
                    component.user.tag(),
                    kind.display_name(),
                    thread.id.mention(),
                ))
                .colour(OPENED_COLOUR);
            notify::send_log(ctx, data.config.discord.log_channel, log).await;
        }
        Err(err) => {
            // the user gets one generic message; a half-created thread
            // is left behind for staff to clean up
            error!("failed to create a ticket thread: {:#}", err);
            component
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new()
                        .content("❌ Error creating ticket. Check bot permissions."),
                )
                .await?;
        }
    }

    Ok(())
}

/// Creates the private thread, adds the user and posts the welcome
/// message. No cleanup is attempted when a later step fails.
async fn create_ticket(
    ctx: &serenity::Context,
    data: &Arc<Data>,
    component: &serenity::ComponentInteraction,
    kind: TicketKind,
) -> Result<serenity::GuildChannel, anyhow::Error> {
    let discord = &data.config.discord;
    let reason = format!("Ticket by {}", component.user.tag());

    let thread = discord
        .panel_channel
        .create_thread(
            &ctx.http,
            CreateThread::new(kind.thread_name(&component.user.name))
                .kind(ChannelType::PrivateThread)
                .auto_archive_duration(AutoArchiveDuration::OneDay)
                .audit_log_reason(&reason),
        )
        .await
        .context("failed to create the ticket thread")?;

    thread
        .id
        .add_thread_member(&ctx.http, component.user.id)
        .await
        .context("failed to add the user to the ticket thread")?;

    let welcome = CreateEmbed::new()
        .title(format!("🎫 {} Ticket", kind.display_name()))
        .description(format!(
            "Hello {}!\nA staff member will be with you shortly.\n\n\
             Please provide:\n- Description of issue\n- Evidence (if reporting)\n- Relevant IDs",
            component.user.mention(),
        ))
        .colour(TICKET_COLOUR)
        .timestamp(serenity::Timestamp::now());

    thread
        .id
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .content(format!(
                    "{} | Ticket by {}",
                    discord.staff_role.mention(),
                    component.user.mention(),
                ))
                // only the staff role may actually ping
                .allowed_mentions(CreateAllowedMentions::new().roles(vec![discord.staff_role]))
                .embed(welcome)
                .components(vec![CreateActionRow::Buttons(vec![close_button()])]),
        )
        .await
        .context("failed to post the ticket welcome message")?;

    Ok(thread)
}

async fn close_ticket(
    ctx: &serenity::Context,
    data: &Arc<Data>,
    component: &serenity::ComponentInteraction,
) -> Result<(), anyhow::Error> {
    let channel = component
        .channel_id
        .to_channel(ctx)
        .await
        .context("failed to resolve the interaction channel")?;
    // the close button only means something inside a ticket thread
    let Some(thread) = channel.guild().filter(|ch| ch.thread_metadata.is_some()) else {
        return Ok(());
    };

    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("🔒 Closing ticket in 5 seconds..."),
            ),
        )
        .await?;

    let log = CreateEmbed::new()
        .title("Ticket Closed")
        .description(format!(
            "Closed by: {}\nThread: {}",
            component.user.tag(),
            thread.name,
        ))
        .colour(CLOSED_COLOUR);
    notify::send_log(ctx, data.config.discord.log_channel, log).await;

    // deferred lock/archive; a shutdown cancels the timer instead of
    // leaving it running against a closing gateway client
    let http = ctx.http.clone();
    let mut shutdown = data.shutdown.subscribe();
    let thread_id = thread.id;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(CLOSE_DELAY) => {
                let edit = EditThread::new().locked(true).archived(true);
                if let Err(err) = thread_id.edit_thread(&http, edit).await {
                    error!("failed to archive ticket thread {}: {}", thread_id, err);
                }
            },
            _ = shutdown.recv() => {}
        }
    });

    Ok(())
}
