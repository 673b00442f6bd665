use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::bot::{AuthenticatedBot, Bot};
use crate::error::SignupError;
use crate::stats::Counters;

/// Result of the signup barrier.
#[derive(Debug)]
pub struct SignupOutcome {
    /// Bots holding a credential, ordered by id.
    pub authenticated: Vec<AuthenticatedBot>,
    pub failed: usize,
}

/// Registers one bot. The returned message is used verbatim as its bearer credential.
pub async fn signup_bot(
    bot: Bot,
    password: &str,
    counters: &Counters,
) -> Result<AuthenticatedBot, (usize, SignupError)> {
    let response = match bot.client.signup(&bot.username, password).await {
        Ok(response) => response,
        Err(e) => return Err((bot.id, e.into())),
    };

    if !response.well_formed {
        counters.record_decode_failure();
    }
    if response.body.message.is_empty() {
        return Err((bot.id, SignupError::NoCredential));
    }

    counters.record_login();
    Ok(bot.authenticate(response.body.message))
}

/// Signs every bot up concurrently and returns only once all attempts have
/// resolved. Failed bots are dropped for the rest of the run.
pub async fn signup_all(
    bots: Vec<Bot>,
    password: Arc<str>,
    counters: Arc<Counters>,
) -> SignupOutcome {
    let total = bots.len();
    info!("Signing up {} bots", total);

    let tasks: Vec<_> = bots
        .into_iter()
        .map(|bot| {
            let password = Arc::clone(&password);
            let counters = Arc::clone(&counters);
            tokio::spawn(async move { signup_bot(bot, &password, &counters).await })
        })
        .collect();

    let mut authenticated = Vec::with_capacity(total);
    let mut failed = 0;
    for result in join_all(tasks).await {
        match result {
            Ok(Ok(bot)) => {
                debug!("Bot {} signed up, credential: {}", bot.id(), bot.credential());
                authenticated.push(bot);
            }
            Ok(Err((id, e))) => {
                warn!("Bot {} signup failed: {}", id, e);
                failed += 1;
            }
            Err(e) => {
                error!("Signup task failed: {}", e);
                failed += 1;
            }
        }
    }
    authenticated.sort_by_key(|bot| bot.id());

    info!(
        "Signup complete: {}/{} bots authenticated",
        authenticated.len(),
        total
    );

    SignupOutcome {
        authenticated,
        failed,
    }
}
