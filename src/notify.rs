use log::error;
use poise::serenity_prelude::{
    self as serenity, ChannelId, ChannelType, CreateEmbed, CreateMessage,
};

/// Channel kinds the ticket log can be delivered to.
fn is_text_capable(kind: ChannelType) -> bool {
    matches!(
        kind,
        ChannelType::Text
            | ChannelType::News
            | ChannelType::PublicThread
            | ChannelType::PrivateThread
    )
}

/// Best-effort delivery of a ticket event to the log channel. The
/// channel is resolved through the cache first, with a live fetch as
/// fallback; every failure ends up on the console and nowhere else.
pub async fn send_log(ctx: &serenity::Context, channel: ChannelId, embed: CreateEmbed) {
    let resolved = match channel.to_channel(ctx).await {
        Ok(resolved) => resolved,
        Err(err) => {
            error!("ticket log channel {} is unavailable: {}", channel, err);
            return;
        }
    };

    let target = match resolved.guild().filter(|ch| is_text_capable(ch.kind)) {
        Some(target) => target,
        None => {
            error!("ticket log channel {} is not a text channel", channel);
            return;
        }
    };

    if let Err(err) = target
        .id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await
    {
        error!("failed to send a ticket log message: {}", err);
    }
}
