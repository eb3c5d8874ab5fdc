use anyhow::Context as _;
use log::info;
use poise::serenity_prelude::{
    self as serenity, Colour, CreateActionRow, CreateEmbed, CreateMessage, GetMessages, MessageId,
};

use crate::cfg::Config;
use crate::tickets::TicketKind;

/// Embed colour of the panel message.
const PANEL_COLOUR: Colour = Colour::new(0x2B2D31);
/// How many recent messages are scanned for stale panels.
const PANEL_LOOKBACK: u8 = 20;

/// Removes previously deployed panels and posts a fresh one. Runs once
/// after login; a failure is reported to the caller and must not bring
/// the process down.
pub async fn deploy(ctx: &serenity::Context, config: &Config) -> Result<(), anyhow::Error> {
    let channel = config.discord.panel_channel;

    // a restart leaves the previous panel behind; drop every message
    // the bot itself authored in the recent history
    let recent = channel
        .messages(&ctx.http, GetMessages::new().limit(PANEL_LOOKBACK))
        .await
        .context("failed to fetch the panel channel history")?;
    let bot_id = ctx.cache.current_user().id;
    let stale: Vec<MessageId> = recent
        .iter()
        .filter(|message| message.author.id == bot_id)
        .map(|message| message.id)
        .collect();
    if !stale.is_empty() {
        channel
            .delete_messages(&ctx.http, stale)
            .await
            .context("failed to delete stale panel messages")?;
    }

    let embed = CreateEmbed::new()
        .title("🎫 Server Support Tickets")
        .description(
            "Select a category below to open a private ticket.\n\n\
             🧰 **Support** – General help & questions\n\
             🚨 **Player Report** – Report rule breakers\n\
             🐞 **Bug Report** – Server issues & glitches",
        )
        .colour(PANEL_COLOUR);

    let buttons =
        CreateActionRow::Buttons(TicketKind::ALL.iter().map(|kind| kind.button()).collect());

    channel
        .send_message(
            &ctx.http,
            CreateMessage::new().embed(embed).components(vec![buttons]),
        )
        .await
        .context("failed to send the panel message")?;

    match &config.discord.panel_channel_name {
        Some(name) => info!("ticket panel deployed to #{}", name),
        None => info!("ticket panel deployed to {}", channel),
    }

    Ok(())
}
