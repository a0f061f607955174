use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server usato per gli account utente quando il destinatario è un numero nudo.
pub const DEFAULT_USER_SERVER: &str = "s.whatsapp.net";

/// Identificatore di un partecipante sulla rete di messaggistica (`user@server`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jid {
    pub user: String,
    pub server: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JidError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier contains whitespace")]
    Whitespace,
    #[error("expected exactly one '@' in {0:?}")]
    Separator(String),
    #[error("missing user part in {0:?}")]
    MissingUser(String),
    #[error("missing server part in {0:?}")]
    MissingServer(String),
    #[error("recipient must be a phone number, got {0:?}")]
    NotANumber(String),
}

impl Jid {
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
        }
    }

    /// Parsing di un JID completo `user@server`.
    pub fn parse(raw: &str) -> Result<Self, JidError> {
        if raw.is_empty() {
            return Err(JidError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(JidError::Whitespace);
        }
        let (user, server) = raw
            .split_once('@')
            .ok_or_else(|| JidError::Separator(raw.to_string()))?;
        if server.contains('@') {
            return Err(JidError::Separator(raw.to_string()));
        }
        if user.is_empty() {
            return Err(JidError::MissingUser(raw.to_string()));
        }
        if server.is_empty() {
            return Err(JidError::MissingServer(raw.to_string()));
        }
        Ok(Self::new(user, server))
    }

    /// Destinatario dell'endpoint di invio: un numero di telefono nudo a cui
    /// viene aggiunto il server utente di default. Un '+' iniziale è ammesso e rimosso.
    pub fn for_recipient(raw: &str) -> Result<Self, JidError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(JidError::Empty);
        }
        let number = raw.strip_prefix('+').unwrap_or(raw);
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(JidError::NotANumber(raw.to_string()));
        }
        Ok(Self::new(number, DEFAULT_USER_SERVER))
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.server)
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Jid {
    type Error = JidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.to_string()
    }
}
