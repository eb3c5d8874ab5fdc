use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use log::{debug, warn};
use poise::serenity_prelude::{self as serenity, ActivityData, OnlineStatus};
use serde::Deserialize;
use serde_json::Value;

use crate::handler::Data;

/// Time between two status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Both status requests must complete within this long, otherwise the
/// whole cycle counts as failed.
const HTTP_TIMEOUT: Duration = Duration::from_secs(4);
/// Capacity reported when the server does not expose a usable
/// `sv_maxClients` value.
const DEFAULT_CLIENT_CAP: u32 = 64;
/// Presence label shown while the server is unreachable.
const OFFLINE_LABEL: &str = "Server Offline";

/// Player count and capacity extracted from one poll cycle.
#[derive(Debug, PartialEq, Eq)]
pub struct ServerStatus {
    pub players: usize,
    pub max_clients: u32,
}

impl ServerStatus {
    pub fn label(&self) -> String {
        format!("Players: {}/{}", self.players, self.max_clients)
    }
}

/// `info.json`, reduced to the single variable the presence cares about.
/// The document carries dozens of other fields; everything unknown is
/// ignored.
#[derive(Debug, Default, Deserialize)]
struct InfoDoc {
    #[serde(default)]
    vars: InfoVars,
}

#[derive(Debug, Default, Deserialize)]
struct InfoVars {
    #[serde(rename = "sv_maxClients")]
    sv_max_clients: Option<Value>,
}

/// FiveM exposes `sv_maxClients` either as a number or as a numeric
/// string depending on the server version. Zero and garbage both fall
/// back to the default cap.
fn parse_client_cap(raw: Option<&Value>) -> u32 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };

    match parsed {
        None | Some(0) => DEFAULT_CLIENT_CAP,
        Some(cap) => cap,
    }
}

/// Counts players in `players.json`; a document that is valid JSON but
/// not an array counts as an empty server.
fn count_players(doc: &Value) -> usize {
    doc.as_array().map_or(0, |players| players.len())
}

pub struct StatusPoller {
    http: reqwest::Client,
    players_url: String,
    info_url: String,
}

impl StatusPoller {
    pub fn new(server: &str) -> Result<Self, anyhow::Error> {
        // one pooled client for the whole process lifetime
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build the status http client")?;

        Ok(Self {
            http,
            players_url: format!("http://{server}/players.json"),
            info_url: format!("http://{server}/info.json"),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, anyhow::Error> {
        let value = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(value)
    }

    /// One poll cycle. Both documents are fetched concurrently and a
    /// failure of either fails the cycle.
    pub async fn fetch(&self) -> Result<ServerStatus, anyhow::Error> {
        let (players, info): (Value, InfoDoc) = futures::try_join!(
            self.get_json(&self.players_url),
            self.get_json(&self.info_url),
        )?;

        Ok(ServerStatus {
            players: count_players(&players),
            max_clients: parse_client_cap(info.vars.sv_max_clients.as_ref()),
        })
    }
}

/// Presence loop; runs until the shutdown broadcast fires. The first
/// tick happens right after login, then every poll interval. A failed
/// cycle is never retried before the next tick.
pub async fn updater_task(ctx: serenity::Context, data: Arc<Data>) {
    let poller = match StatusPoller::new(&data.config.fivem.server) {
        Ok(poller) => poller,
        Err(err) => {
            warn!("status polling disabled: {:#}", err);
            return;
        }
    };

    let mut shutdown = data.shutdown.subscribe();
    let mut ticks = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                match poller.fetch().await {
                    Ok(status) => {
                        debug!("server status: {}", status.label());
                        ctx.set_presence(
                            Some(ActivityData::watching(status.label())),
                            OnlineStatus::Online,
                        );
                    }
                    Err(err) => {
                        debug!("status poll failed: {:#}", err);
                        ctx.set_presence(
                            Some(ActivityData::watching(OFFLINE_LABEL)),
                            OnlineStatus::DoNotDisturb,
                        );
                    }
                }
            },
            _ = shutdown.recv() => {
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_count_and_capacity() {
        let status = ServerStatus {
            players: 12,
            max_clients: 48,
        };

        assert_eq!(status.label(), "Players: 12/48");
    }

    #[test]
    fn counts_players_from_an_array() {
        let doc: Value =
            serde_json::from_str(r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#).unwrap();

        assert_eq!(count_players(&doc), 3);
    }

    #[test]
    fn a_non_array_document_counts_as_empty() {
        let doc: Value = serde_json::from_str(r#"{"players": 5}"#).unwrap();

        assert_eq!(count_players(&doc), 0);
    }

    #[test]
    fn reads_the_capacity_from_a_numeric_string() {
        let info: InfoDoc =
            serde_json::from_str(r#"{"vars": {"sv_maxClients": "48"}, "version": 12}"#).unwrap();

        assert_eq!(parse_client_cap(info.vars.sv_max_clients.as_ref()), 48);
    }

    #[test]
    fn reads_the_capacity_from_a_number() {
        let info: InfoDoc =
            serde_json::from_str(r#"{"vars": {"sv_maxClients": 32}}"#).unwrap();

        assert_eq!(parse_client_cap(info.vars.sv_max_clients.as_ref()), 32);
    }

    #[test]
    fn defaults_when_the_field_is_absent() {
        let info: InfoDoc = serde_json::from_str(r#"{"resources": []}"#).unwrap();

        assert_eq!(
            parse_client_cap(info.vars.sv_max_clients.as_ref()),
            DEFAULT_CLIENT_CAP
        );
    }

    #[test]
    fn defaults_on_garbage_and_zero() {
        assert_eq!(
            parse_client_cap(Some(&Value::String("lots".to_string()))),
            DEFAULT_CLIENT_CAP
        );
        assert_eq!(
            parse_client_cap(Some(&serde_json::json!(0))),
            DEFAULT_CLIENT_CAP
        );
        assert_eq!(parse_client_cap(None), DEFAULT_CLIENT_CAP);
    }
}
