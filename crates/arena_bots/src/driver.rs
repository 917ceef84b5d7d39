//! Bot driver: N independent sessions sharing one runtime and one transport.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arena_client::tick::FixedInterval;
use arena_client::{ClientConfig, ClientError, Registration, SessionReport, SessionRunner};
use arena_net::{CharacterClass, Transport};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::policy::BotPolicy;

/// Load-test parameters.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Number of concurrent sessions.
    pub count: usize,
    /// How long the sessions tick before shutdown.
    pub duration: Duration,
    /// Base seed for the policies; bot `i` uses `seed + i`.
    pub seed: u64,
    pub client: ClientConfig,
}

/// What happened to one bot.
#[derive(Debug)]
pub struct BotOutcome {
    pub index: usize,
    pub username: String,
    pub result: Result<SessionReport, ClientError>,
}

impl BotOutcome {
    /// A bot succeeded if it registered and shut down cleanly.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(report) if report.registered)
    }
}

/// Aggregate result of a driver run, ordered by bot index.
#[derive(Debug, Default)]
pub struct DriverReport {
    pub outcomes: Vec<BotOutcome>,
}

impl DriverReport {
    #[must_use]
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }

    /// Inputs handed to the transport across every bot.
    #[must_use]
    pub fn transmissions(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|report| report.transmissions)
            .sum()
    }
}

/// Spawns and supervises the bot sessions.
pub struct BotDriver<T: Transport> {
    config: DriverConfig,
    transport: Arc<T>,
}

impl<T: Transport> BotDriver<T> {
    pub fn new(config: DriverConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    /// Run every bot until the duration elapses or `interrupt` resolves,
    /// then shut them all down and collect their outcomes.
    ///
    /// One bot failing never stops the others.
    pub async fn run(self, interrupt: impl Future<Output = ()>) -> DriverReport {
        let DriverConfig {
            count,
            duration,
            seed,
            client,
        } = self.config;
        info!(count, ?duration, "starting bots");

        let (shutdown_tx, shutdown) = watch::channel(false);
        let mut sessions = JoinSet::new();
        for index in 0..count {
            let username = format!("Bot_{}", index + 1);
            let runner = SessionRunner::new(client.clone(), Arc::clone(&self.transport));
            let policy = BotPolicy::new(seed.wrapping_add(index as u64));
            let ticks = FixedInterval::new(client.tick_interval);
            let registration = Registration::new(username.clone(), CharacterClass::Wizard);
            let shutdown = shutdown.clone();
            sessions.spawn(async move {
                let result = runner.run(registration, policy, ticks, shutdown).await;
                BotOutcome {
                    index,
                    username,
                    result,
                }
            });
        }

        tokio::select! {
            () = tokio::time::sleep(duration) => info!("run duration elapsed"),
            () = interrupt => info!("interrupted, stopping bots"),
        }
        shutdown_tx.send_replace(true);

        let mut outcomes = Vec::with_capacity(count);
        while let Some(joined) = sessions.join_next().await {
            match joined {
                Ok(outcome) => {
                    match &outcome.result {
                        Ok(report) => info!(
                            bot = %outcome.username,
                            ticks = report.ticks_attempted,
                            sent = report.transmissions,
                            last_sequence = report.last_sequence,
                            "bot finished"
                        ),
                        Err(err) => warn!(bot = %outcome.username, error = %err, "bot failed"),
                    }
                    outcomes.push(outcome);
                }
                Err(err) => error!(error = %err, "bot task aborted"),
            }
        }
        outcomes.sort_by_key(|o| o.index);

        let report = DriverReport { outcomes };
        info!(
            succeeded = report.successes(),
            failed = report.failures(),
            transmissions = report.transmissions(),
            "all bots stopped"
        );
        report
    }
}
