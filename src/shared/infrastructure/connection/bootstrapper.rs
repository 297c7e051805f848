// Connects to the document store, retrying transient failures with exponential backoff.
//
// Responsibilities
// - Drive one connection cycle: Idle -> Attempting -> Backoff -> Attempting ... -> Connected | Failed.
// - Log every failed attempt with the target address.
// - Surface the last connector error unchanged once the attempts run out, or wrapped
//   with the attempt count for callers that report it.
//
// Testing guidance
// - Inject a Sleeper that records the requested delays instead of waiting.

use crate::shared::infrastructure::connection::retry_policy::RetryPolicy;
use crate::shared::infrastructure::connection::{
    ConnectionExhausted, ConnectionParameters, Connector,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Attempting { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Connected { attempts: u32 },
    Failed { attempts: u32 },
}

impl ConnectionState {
    pub fn begin(self) -> Self {
        match self {
            ConnectionState::Idle => ConnectionState::Attempting { attempt: 1 },
            other => other,
        }
    }

    pub fn succeed(self) -> Self {
        match self {
            ConnectionState::Attempting { attempt } => ConnectionState::Connected { attempts: attempt },
            other => other,
        }
    }

    pub fn fail(self, policy: &RetryPolicy) -> Self {
        match self {
            ConnectionState::Attempting { attempt } => match policy.delay_after(attempt) {
                Some(delay) => ConnectionState::Backoff { attempt, delay },
                None => ConnectionState::Failed { attempts: attempt },
            },
            other => other,
        }
    }

    pub fn resume(self) -> Self {
        match self {
            ConnectionState::Backoff { attempt, .. } => ConnectionState::Attempting {
                attempt: attempt + 1,
            },
            other => other,
        }
    }

    pub fn attempt(&self) -> u32 {
        match *self {
            ConnectionState::Idle => 0,
            ConnectionState::Attempting { attempt } | ConnectionState::Backoff { attempt, .. } => {
                attempt
            }
            ConnectionState::Connected { attempts } | ConnectionState::Failed { attempts } => {
                attempts
            }
        }
    }
}

pub struct ConnectionBootstrapper<C, S = TokioSleeper> {
    connector: C,
    sleeper: S,
}

impl<C: Connector> ConnectionBootstrapper<C> {
    pub fn new(connector: C) -> Self {
        Self::with_sleeper(connector, TokioSleeper)
    }
}

impl<C: Connector, S: Sleeper> ConnectionBootstrapper<C, S> {
    pub fn with_sleeper(connector: C, sleeper: S) -> Self {
        Self { connector, sleeper }
    }

    /// Keeps no state between calls, so concurrent connects do not interfere.
    pub async fn connect(
        &self,
        params: &ConnectionParameters,
        policy: &RetryPolicy,
    ) -> Result<C::Connection, C::Error> {
        let (_, outcome) = self.drive(params, policy).await;
        outcome
    }

    /// Like `connect`, but once the attempts run out the last error is wrapped
    /// with the address and the number of attempts actually made.
    pub async fn try_connect(
        &self,
        params: &ConnectionParameters,
        policy: &RetryPolicy,
    ) -> Result<C::Connection, ConnectionExhausted> {
        let (state, outcome) = self.drive(params, policy).await;
        outcome.map_err(|error| ConnectionExhausted {
            address: params.address(),
            attempts: state.attempt(),
            source: Box::new(error),
        })
    }

    async fn drive(
        &self,
        params: &ConnectionParameters,
        policy: &RetryPolicy,
    ) -> (ConnectionState, Result<C::Connection, C::Error>) {
        let address = params.address();
        let mut state = ConnectionState::Idle.begin();
        loop {
            let attempt = state.attempt();
            let error = match self.connector.connect(params).await {
                Ok(connection) => {
                    state = state.succeed();
                    info!(%address, attempts = state.attempt(), "connected to document store");
                    return (state, Ok(connection));
                }
                Err(error) => error,
            };

            state = state.fail(policy);
            match state {
                ConnectionState::Backoff { delay, .. } => {
                    warn!(
                        %address,
                        attempt,
                        max_attempts = policy.max_attempts,
                        retry_in = ?delay,
                        %error,
                        "could not connect to document store"
                    );
                    self.sleeper.sleep(delay).await;
                    state = state.resume();
                    debug!(%address, attempt = state.attempt(), "retrying connection");
                }
                _ => {
                    error!(%address, attempts = attempt, %error, "giving up connecting to document store");
                    return (state, Err(error));
                }
            }
        }
    }
}

#[cfg(test)]
mod connection_bootstrapper_tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq, Eq)]
    #[error("attempt {attempt} refused")]
    struct Refused {
        attempt: u32,
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Handle {
        attempt: u32,
    }

    /// Refuses the first `failures` attempts, then connects.
    struct ScriptedConnector {
        failures: u32,
        attempts: AtomicU32,
    }

    impl ScriptedConnector {
        fn failing(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        type Connection = Handle;
        type Error = Refused;

        async fn connect(&self, _params: &ConnectionParameters) -> Result<Handle, Refused> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                Err(Refused { attempt })
            } else {
                Ok(Handle { attempt })
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        waits: Arc<Mutex<Vec<Duration>>>,
    }

    impl RecordingSleeper {
        fn waits_ms(&self) -> Vec<u128> {
            self.waits
                .lock()
                .unwrap()
                .iter()
                .map(Duration::as_millis)
                .collect()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    #[fixture]
    fn params() -> ConnectionParameters {
        ConnectionParameters {
            host: "localhost".into(),
            port: 27017,
            username: "travel".into(),
            password: "secret".into(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_back_off_exponentially_until_connected(params: ConnectionParameters) {
        let sleeper = RecordingSleeper::default();
        let bootstrapper =
            ConnectionBootstrapper::with_sleeper(ScriptedConnector::failing(4), sleeper.clone());
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            multiplier: 2,
        };

        let handle = bootstrapper
            .connect(&params, &policy)
            .await
            .expect("expected to connect on the fifth attempt");
        assert_eq!(handle, Handle { attempt: 5 });
        assert_eq!(sleeper.waits_ms(), vec![1000, 2000, 4000, 8000]);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_surface_the_last_error_once_attempts_run_out(params: ConnectionParameters) {
        let sleeper = RecordingSleeper::default();
        let connector = ScriptedConnector::failing(u32::MAX);
        let bootstrapper = ConnectionBootstrapper::with_sleeper(connector, sleeper.clone());
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            multiplier: 2,
        };

        let error = bootstrapper
            .connect(&params, &policy)
            .await
            .expect_err("expected the attempts to run out");
        assert_eq!(error, Refused { attempt: 3 });
        assert_eq!(bootstrapper.connector.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.waits_ms(), vec![250, 500]);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_connect_without_waiting_when_the_first_attempt_succeeds(
        params: ConnectionParameters,
    ) {
        let sleeper = RecordingSleeper::default();
        let bootstrapper =
            ConnectionBootstrapper::with_sleeper(ScriptedConnector::failing(0), sleeper.clone());

        let handle = bootstrapper
            .connect(&params, &RetryPolicy::default())
            .await
            .expect("expected to connect");
        assert_eq!(handle.attempt, 1);
        assert!(sleeper.waits_ms().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_tolerate_concurrent_connects(params: ConnectionParameters) {
        let bootstrapper = ConnectionBootstrapper::with_sleeper(
            ScriptedConnector::failing(0),
            RecordingSleeper::default(),
        );
        let policy = RetryPolicy::default();

        let (first, second) = tokio::join!(
            bootstrapper.connect(&params, &policy),
            bootstrapper.connect(&params, &policy)
        );
        let mut attempts = vec![first.unwrap().attempt, second.unwrap().attempt];
        attempts.sort();
        assert_eq!(attempts, vec![1, 2]);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_report_the_attempts_actually_made(params: ConnectionParameters) {
        let sleeper = RecordingSleeper::default();
        let bootstrapper = ConnectionBootstrapper::with_sleeper(
            ScriptedConnector::failing(u32::MAX),
            sleeper.clone(),
        );
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            multiplier: 2,
        };

        let exhausted = bootstrapper
            .try_connect(&params, &policy)
            .await
            .expect_err("expected the attempts to run out");
        assert_eq!(exhausted.address, "localhost:27017");
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(
            exhausted.source.downcast_ref::<Refused>(),
            Some(&Refused { attempt: 3 })
        );
        assert_eq!(
            exhausted.to_string(),
            "could not connect to localhost:27017 after 3 attempts"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_count_the_single_attempt_of_a_zero_cap_policy(
        params: ConnectionParameters,
    ) {
        let sleeper = RecordingSleeper::default();
        let bootstrapper = ConnectionBootstrapper::with_sleeper(
            ScriptedConnector::failing(u32::MAX),
            sleeper.clone(),
        );
        let policy = RetryPolicy {
            max_attempts: 0,
            initial_delay: Duration::from_millis(10),
            multiplier: 2,
        };

        let exhausted = bootstrapper
            .try_connect(&params, &policy)
            .await
            .expect_err("expected the only attempt to fail");
        assert_eq!(exhausted.attempts, 1);
        assert_eq!(bootstrapper.connector.attempts.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits_ms().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_log_delays_too_large_for_milliseconds(params: ConnectionParameters) {
        let sleeper = RecordingSleeper::default();
        let bootstrapper =
            ConnectionBootstrapper::with_sleeper(ScriptedConnector::failing(1), sleeper.clone());
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::MAX,
            multiplier: 2,
        };

        bootstrapper
            .connect(&params, &policy)
            .await
            .expect("expected to connect on the second attempt");
        assert_eq!(*sleeper.waits.lock().unwrap(), vec![Duration::MAX]);
    }

    #[rstest]
    fn it_should_walk_the_connection_states() {
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(10),
            multiplier: 2,
        };
        let state = ConnectionState::Idle.begin();
        assert_eq!(state, ConnectionState::Attempting { attempt: 1 });

        let state = state.fail(&policy);
        assert_eq!(
            state,
            ConnectionState::Backoff {
                attempt: 1,
                delay: Duration::from_millis(10)
            }
        );

        let state = state.resume();
        assert_eq!(state, ConnectionState::Attempting { attempt: 2 });
        assert_eq!(state.succeed(), ConnectionState::Connected { attempts: 2 });
        assert_eq!(state.fail(&policy), ConnectionState::Failed { attempts: 2 });
    }
}
