use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::client::{Endpoints, TradingClient};

/// A simulated client identity that has not authenticated yet.
#[derive(Debug)]
pub struct Bot {
    pub id: usize,
    pub username: String,
    pub client: TradingClient,
}

impl Bot {
    pub fn username_for(id: usize) -> String {
        format!("bot_{}", id)
    }

    /// Attaches the credential returned by signup. Consuming `self` makes the
    /// credential write-once: an `AuthenticatedBot` has no way to change it.
    pub fn authenticate(self, credential: String) -> AuthenticatedBot {
        AuthenticatedBot {
            bot: self,
            credential,
        }
    }
}

/// A bot holding a signup credential. Only these ever enter the stress phase.
#[derive(Debug)]
pub struct AuthenticatedBot {
    bot: Bot,
    credential: String,
}

impl AuthenticatedBot {
    pub fn id(&self) -> usize {
        self.bot.id
    }

    pub fn username(&self) -> &str {
        &self.bot.username
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn client(&self) -> &TradingClient {
        &self.bot.client
    }
}

/// Creates `count` identities with dense ids `0..count`, each with its own transport.
pub fn create_bots(count: usize, endpoints: Arc<Endpoints>, timeout: Duration) -> Result<Vec<Bot>> {
    (0..count)
        .map(|id| {
            Ok(Bot {
                id,
                username: Bot::username_for(id),
                client: TradingClient::new(Arc::clone(&endpoints), timeout)?,
            })
        })
        .collect()
}
