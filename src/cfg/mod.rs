use anyhow::{bail, Context};
use poise::serenity_prelude::{ChannelId, RoleId};

/// Environment variables that must be present for the bot to start.
/// Startup reports the full missing set at once instead of failing on
/// the first absent name.
pub const REQUIRED_VARS: [&str; 5] = [
    "DISCORD_TOKEN",
    "FIVEM_SERVER_IP",
    "STAFF_ROLE_ID",
    "LOG_CHANNEL_ID",
    "PANEL_CHANNEL_ID",
];

#[derive(Debug, Clone)]
/// Discord-side configuration: the token plus the role and channels the
/// ticket workflow talks to.
pub struct DiscordConfig {
    pub token: String,
    /// Role pinged in every ticket welcome message.
    pub staff_role: RoleId,
    /// Channel receiving the ticket opened/closed notifications.
    pub log_channel: ChannelId,
    /// Channel carrying the panel message; tickets are threads under it.
    pub panel_channel: ChannelId,
    /// Optional display name for the panel channel, only used in logs.
    pub panel_channel_name: Option<String>,
}

#[derive(Debug, Clone)]
/// Location of the FiveM server whose status drives the presence.
pub struct FivemConfig {
    /// `host:port` of the server's HTTP status endpoint.
    pub server: String,
}

#[derive(Debug, Clone)]
/// Main configuration structure; one block per external system.
pub struct Config {
    pub discord: DiscordConfig,
    pub fivem: FivemConfig,
    /// Defaults the log filter to `debug` when `RUST_LOG` is unset.
    pub debug: bool,
}

/// Returns the required variables the given source cannot provide, in
/// declaration order. An empty value counts as missing.
pub fn missing_vars(lookup: &impl Fn(&str) -> Option<String>) -> Vec<&'static str> {
    REQUIRED_VARS
        .iter()
        .copied()
        .filter(|name| lookup(name).is_none_or(|value| value.is_empty()))
        .collect()
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. All
    /// required names are checked before any value is parsed so the
    /// error carries the complete missing set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let missing = missing_vars(&lookup);
        if !missing.is_empty() {
            bail!(
                "missing required environment variables: {}",
                missing.join(", ")
            );
        }

        let var = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .with_context(|| format!("{name} is not set"))
        };
        // snowflakes are non-zero by definition, and the id types reject 0
        let id = |name: &str| -> Result<u64, anyhow::Error> {
            let raw: u64 = var(name)?
                .parse()
                .with_context(|| format!("{name} is not a valid id"))?;
            if raw == 0 {
                bail!("{name} is not a valid id");
            }
            Ok(raw)
        };

        Ok(Self {
            discord: DiscordConfig {
                token: var("DISCORD_TOKEN")?,
                staff_role: RoleId::new(id("STAFF_ROLE_ID")?),
                log_channel: ChannelId::new(id("LOG_CHANNEL_ID")?),
                panel_channel: ChannelId::new(id("PANEL_CHANNEL_ID")?),
                panel_channel_name: lookup("PANEL_CHANNEL_NAME").filter(|name| !name.is_empty()),
            },
            fivem: FivemConfig {
                server: var("FIVEM_SERVER_IP")?,
            },
            debug: lookup("DEBUG").map(|value| is_truthy(&value)).unwrap_or(false),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            ("DISCORD_TOKEN", "token"),
            ("FIVEM_SERVER_IP", "127.0.0.1:30120"),
            ("STAFF_ROLE_ID", "200"),
            ("LOG_CHANNEL_ID", "300"),
            ("PANEL_CHANNEL_ID", "400"),
        ])
    }

    fn lookup(map: &HashMap<String, String>) -> impl Fn(&str) -> Option<String> + '_ {
        |name| map.get(name).cloned()
    }

    #[test]
    fn accepts_a_complete_environment() {
        let map = full_env();
        let config = Config::from_lookup(lookup(&map)).unwrap();

        assert_eq!(config.discord.token, "token");
        assert_eq!(config.discord.staff_role, RoleId::new(200));
        assert_eq!(config.discord.log_channel, ChannelId::new(300));
        assert_eq!(config.discord.panel_channel, ChannelId::new(400));
        assert_eq!(config.discord.panel_channel_name, None);
        assert_eq!(config.fivem.server, "127.0.0.1:30120");
        assert!(!config.debug);
    }

    #[test]
    fn reports_every_missing_variable() {
        let map = env(&[]);
        assert_eq!(missing_vars(&lookup(&map)), REQUIRED_VARS.to_vec());
    }

    #[test]
    fn reports_a_partial_missing_set_in_order() {
        let mut map = full_env();
        map.remove("STAFF_ROLE_ID");
        map.remove("PANEL_CHANNEL_ID");

        assert_eq!(
            missing_vars(&lookup(&map)),
            vec!["STAFF_ROLE_ID", "PANEL_CHANNEL_ID"]
        );
    }

    #[test]
    fn treats_an_empty_value_as_missing() {
        let mut map = full_env();
        map.insert("LOG_CHANNEL_ID".to_string(), String::new());

        assert_eq!(missing_vars(&lookup(&map)), vec!["LOG_CHANNEL_ID"]);
    }

    #[test]
    fn missing_variables_are_fatal_and_listed() {
        let mut map = full_env();
        map.remove("DISCORD_TOKEN");
        map.remove("FIVEM_SERVER_IP");

        let err = Config::from_lookup(lookup(&map)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("DISCORD_TOKEN, FIVEM_SERVER_IP"), "{message}");
    }

    #[test]
    fn rejects_a_non_numeric_id() {
        let mut map = full_env();
        map.insert("STAFF_ROLE_ID".to_string(), "staff".to_string());

        assert!(Config::from_lookup(lookup(&map)).is_err());
    }

    #[test]
    fn rejects_a_zero_id() {
        let mut map = full_env();
        map.insert("PANEL_CHANNEL_ID".to_string(), "0".to_string());

        assert!(Config::from_lookup(lookup(&map)).is_err());
    }

    #[test]
    fn parses_the_optional_flags() {
        let mut map = full_env();
        map.insert("PANEL_CHANNEL_NAME".to_string(), "support".to_string());
        map.insert("DEBUG".to_string(), "true".to_string());

        let config = Config::from_lookup(lookup(&map)).unwrap();
        assert_eq!(config.discord.panel_channel_name.as_deref(), Some("support"));
        assert!(config.debug);
    }

    #[test]
    fn ignores_an_unknown_debug_value() {
        let mut map = full_env();
        map.insert("DEBUG".to_string(), "maybe".to_string());

        assert!(!Config::from_lookup(lookup(&map)).unwrap().debug);
    }
}
