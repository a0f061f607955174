use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use kabar_core::{display_offset, Jid, DEFAULT_OFFSET_HOURS};
use time::UtcOffset;

/// Identità dell'account locale usata come sender dei messaggi inviati da qui.
pub const DEFAULT_OWN_JID: &str = "6285123945816@s.whatsapp.net";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8050";
pub const DEFAULT_DATABASE: &str = "kabar.db";
pub const DEFAULT_WS_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_WS_WRITE_TIMEOUT: Duration = Duration::from_millis(5000);

// Configurazione del bridge letta dalle variabili d'ambiente.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Valore grezzo di DATABASE_URL, risolto da `build_sqlite_url`.
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub own_jid: Jid,
    /// Endpoint del gateway di messaggistica; None = client disconnesso.
    pub gateway_url: Option<String>,
    /// Offset dei timestamp canonici. Entra nella chiave di deduplica: è fisso
    /// per tutta la vita di un database (vedi `bind_display_offset`).
    pub tz_offset: UtcOffset,
    pub ws_queue_capacity: usize,
    pub ws_write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8050)),
            own_jid: Jid::new("6285123945816", "s.whatsapp.net"),
            gateway_url: None,
            tz_offset: display_offset(DEFAULT_OFFSET_HOURS).unwrap_or(UtcOffset::UTC),
            ws_queue_capacity: DEFAULT_WS_QUEUE_CAPACITY,
            ws_write_timeout: DEFAULT_WS_WRITE_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Come `from_env` ma con una sorgente arbitraria (usata nei test).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let bind_addr: SocketAddr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("parse BIND_ADDR")?;
        let own_jid = Jid::parse(
            &lookup("KABAR_OWN_JID").unwrap_or_else(|| DEFAULT_OWN_JID.to_string()),
        )
        .context("parse KABAR_OWN_JID")?;
        let gateway_url = lookup("KABAR_GATEWAY_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        let tz_hours: i8 = match lookup("KABAR_TZ_OFFSET_HOURS") {
            Some(raw) => raw.parse().context("parse KABAR_TZ_OFFSET_HOURS")?,
            None => DEFAULT_OFFSET_HOURS,
        };
        let tz_offset = display_offset(tz_hours).context("KABAR_TZ_OFFSET_HOURS out of range")?;

        let ws_queue_capacity: usize = match lookup("KABAR_WS_QUEUE_CAPACITY") {
            Some(raw) => raw.parse().context("parse KABAR_WS_QUEUE_CAPACITY")?,
            None => DEFAULT_WS_QUEUE_CAPACITY,
        };
        if ws_queue_capacity == 0 {
            return Err(anyhow!("KABAR_WS_QUEUE_CAPACITY must be at least 1"));
        }

        let ws_write_timeout = match lookup("KABAR_WS_WRITE_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(raw.parse().context("parse KABAR_WS_WRITE_TIMEOUT_MS")?),
            None => DEFAULT_WS_WRITE_TIMEOUT,
        };

        Ok(Self {
            database_url,
            bind_addr,
            own_jid,
            gateway_url,
            tz_offset,
            ws_queue_capacity,
            ws_write_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.database_url, "kabar.db");
        assert_eq!(cfg.bind_addr.port(), 8050);
        assert_eq!(cfg.own_jid.to_string(), DEFAULT_OWN_JID);
        assert!(cfg.gateway_url.is_none());
        assert_eq!(cfg.tz_offset.whole_hours(), 7);
        assert_eq!(cfg.ws_queue_capacity, 64);
        assert_eq!(cfg.ws_write_timeout, Duration::from_secs(5));
    }

    #[test]
    fn default_impl_matches_env_defaults() {
        let from_env = ServerConfig::from_lookup(|_| None).unwrap();
        let default = ServerConfig::default();
        assert_eq!(default.bind_addr, from_env.bind_addr);
        assert_eq!(default.own_jid, from_env.own_jid);
        assert_eq!(default.tz_offset, from_env.tz_offset);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("KABAR_OWN_JID", "62800@s.whatsapp.net"),
            ("KABAR_GATEWAY_URL", "http://localhost:7000/"),
            ("KABAR_TZ_OFFSET_HOURS", "0"),
            ("KABAR_WS_QUEUE_CAPACITY", "8"),
            ("KABAR_WS_WRITE_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.own_jid.user, "62800");
        assert_eq!(cfg.gateway_url.as_deref(), Some("http://localhost:7000"));
        assert_eq!(cfg.tz_offset, UtcOffset::UTC);
        assert_eq!(cfg.ws_queue_capacity, 8);
        assert_eq!(cfg.ws_write_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ServerConfig::from_lookup(lookup_from(&[("BIND_ADDR", "nope")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("KABAR_OWN_JID", "62800")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("KABAR_TZ_OFFSET_HOURS", "99")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("KABAR_WS_QUEUE_CAPACITY", "0")])).is_err());
    }
}
