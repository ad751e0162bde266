//! Connection lifecycle state machine and reconnect backoff policy.
//!
//! `Lifecycle` is pure: it consumes [`Transition`]s and answers with the
//! [`Action`] the transport must perform. The transport owns the socket and the
//! timer; the machine owns the state and the attempt counter.
//!
//! ```text
//! Disconnected ─Start─▶ Connecting ─Opened─▶ Open
//!                          ▲  │                │
//!              BackoffElapsed Lost            Lost
//!                          │  ▼                │
//!                        Backoff ◀─────────────┘
//! ```
//!
//! `Teardown` and `CredentialRevoked` lead to `Disconnected` from any state,
//! as does a loss once the attempt budget is spent.

use std::time::Duration;

/// Connection state, owned by the realtime manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Backoff,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// External start, with whether a credential is available.
    Start { credential: bool },
    /// Handshake completed.
    Opened,
    /// Connection failed to open, errored, or closed.
    Lost,
    /// The backoff delay ran out; `credential` is re-read at this point.
    BackoffElapsed { credential: bool },
    /// The session credential was cleared (logout or server rejection).
    CredentialRevoked,
    /// External teardown.
    Teardown,
}

/// Why the machine reached `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoCredential,
    AttemptsExhausted,
    TornDown,
}

/// What the transport must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open a connection now.
    Connect,
    /// Wait `delay`, then report `BackoffElapsed`.
    Schedule { attempt: u32, delay: Duration },
    /// Cancel any timer, close any connection, and stop.
    Stop(StopReason),
    /// Nothing to do.
    Ignore,
}

/// Reconnect backoff: `min(initial * 2^(attempt-1), max)`, at most
/// `max_attempts` consecutive reconnects since the last successful open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
        }
    }
}

impl BackoffPolicy {
    /// Delay before reconnect `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32 << exp)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// The lifecycle state machine.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ConnectionState,
    attempts: u32,
    policy: BackoffPolicy,
}

impl Lifecycle {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive losses since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn handle_event(&mut self, transition: Transition) -> Action {
        use ConnectionState::*;

        match (self.state, transition) {
            (_, Transition::Teardown) => {
                self.state = Disconnected;
                Action::Stop(StopReason::TornDown)
            }
            (_, Transition::CredentialRevoked) => {
                self.state = Disconnected;
                Action::Stop(StopReason::NoCredential)
            }

            (Disconnected, Transition::Start { credential: false }) => {
                Action::Stop(StopReason::NoCredential)
            }
            (Disconnected, Transition::Start { credential: true }) => {
                self.attempts = 0;
                self.state = Connecting;
                Action::Connect
            }
            // Already live or on the way there.
            (_, Transition::Start { .. }) => Action::Ignore,

            (Connecting, Transition::Opened) => {
                self.attempts = 0;
                self.state = Open;
                Action::Ignore
            }

            (Connecting | Open, Transition::Lost) => {
                if self.attempts >= self.policy.max_attempts {
                    self.state = Disconnected;
                    return Action::Stop(StopReason::AttemptsExhausted);
                }
                self.attempts += 1;
                self.state = Backoff;
                Action::Schedule {
                    attempt: self.attempts,
                    delay: self.policy.delay_for_attempt(self.attempts),
                }
            }

            (Backoff, Transition::BackoffElapsed { credential: true }) => {
                self.state = Connecting;
                Action::Connect
            }
            (Backoff, Transition::BackoffElapsed { credential: false }) => {
                self.state = Disconnected;
                Action::Stop(StopReason::NoCredential)
            }

            // Stale inputs (e.g. a loss reported after teardown) change nothing.
            _ => Action::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn started() -> Lifecycle {
        let mut machine = Lifecycle::new(BackoffPolicy::default());
        assert_eq!(
            machine.handle_event(Transition::Start { credential: true }),
            Action::Connect
        );
        machine
    }

    #[test]
    fn test_delay_sequence() {
        let policy = BackoffPolicy::default();
        let delays: Vec<_> = (1..=6).map(|a| policy.delay_for_attempt(a)).collect();
        assert_eq!(
            delays,
            vec![secs(3), secs(6), secs(12), secs(24), secs(48), secs(60)]
        );
    }

    #[test]
    fn test_delay_never_overflows() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for_attempt(u32::MAX), secs(60));
    }

    #[test]
    fn test_start_without_credential_stays_disconnected() {
        let mut machine = Lifecycle::new(BackoffPolicy::default());
        assert_eq!(
            machine.handle_event(Transition::Start { credential: false }),
            Action::Stop(StopReason::NoCredential)
        );
        assert_eq!(machine.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_five_failures_then_give_up() {
        let mut machine = started();
        let mut delays = Vec::new();

        for _ in 0..5 {
            match machine.handle_event(Transition::Lost) {
                Action::Schedule { delay, .. } => delays.push(delay),
                other => panic!("expected schedule, got {:?}", other),
            }
            assert_eq!(machine.state(), ConnectionState::Backoff);
            assert_eq!(
                machine.handle_event(Transition::BackoffElapsed { credential: true }),
                Action::Connect
            );
        }

        assert_eq!(delays, vec![secs(3), secs(6), secs(12), secs(24), secs(48)]);
        assert_eq!(
            machine.handle_event(Transition::Lost),
            Action::Stop(StopReason::AttemptsExhausted)
        );
        assert_eq!(machine.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_open_resets_attempts() {
        let mut machine = started();
        machine.handle_event(Transition::Lost);
        machine.handle_event(Transition::BackoffElapsed { credential: true });
        machine.handle_event(Transition::Lost);
        machine.handle_event(Transition::BackoffElapsed { credential: true });
        assert_eq!(machine.attempts(), 2);

        machine.handle_event(Transition::Opened);
        assert_eq!(machine.state(), ConnectionState::Open);
        assert_eq!(machine.attempts(), 0);

        // Network drops after a healthy period: the sequence restarts at 3s.
        assert_eq!(
            machine.handle_event(Transition::Lost),
            Action::Schedule {
                attempt: 1,
                delay: secs(3)
            }
        );
    }

    #[test]
    fn test_start_while_open_is_noop() {
        let mut machine = started();
        machine.handle_event(Transition::Opened);
        assert_eq!(
            machine.handle_event(Transition::Start { credential: true }),
            Action::Ignore
        );
        assert_eq!(machine.state(), ConnectionState::Open);
    }

    #[test]
    fn test_restart_after_exhaustion() {
        let policy = BackoffPolicy {
            max_attempts: 1,
            ..BackoffPolicy::default()
        };
        let mut machine = Lifecycle::new(policy);
        machine.handle_event(Transition::Start { credential: true });
        machine.handle_event(Transition::Lost);
        machine.handle_event(Transition::BackoffElapsed { credential: true });
        assert_eq!(
            machine.handle_event(Transition::Lost),
            Action::Stop(StopReason::AttemptsExhausted)
        );

        assert_eq!(
            machine.handle_event(Transition::Start { credential: true }),
            Action::Connect
        );
        assert_eq!(machine.attempts(), 0);
    }

    #[test]
    fn test_credential_gone_after_backoff() {
        let mut machine = started();
        machine.handle_event(Transition::Lost);
        assert_eq!(
            machine.handle_event(Transition::BackoffElapsed { credential: false }),
            Action::Stop(StopReason::NoCredential)
        );
        assert_eq!(machine.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_teardown_from_every_state() {
        let mut disconnected = Lifecycle::new(BackoffPolicy::default());
        let mut connecting = started();
        let mut open = started();
        open.handle_event(Transition::Opened);
        let mut backoff = started();
        backoff.handle_event(Transition::Lost);

        for machine in [&mut disconnected, &mut connecting, &mut open, &mut backoff] {
            assert_eq!(
                machine.handle_event(Transition::Teardown),
                Action::Stop(StopReason::TornDown)
            );
            assert_eq!(machine.state(), ConnectionState::Disconnected);
            // Twice is harmless.
            assert_eq!(
                machine.handle_event(Transition::Teardown),
                Action::Stop(StopReason::TornDown)
            );
        }
    }

    #[test]
    fn test_stale_inputs_ignored() {
        let mut machine = Lifecycle::new(BackoffPolicy::default());
        assert_eq!(machine.handle_event(Transition::Lost), Action::Ignore);
        assert_eq!(machine.handle_event(Transition::Opened), Action::Ignore);
        assert_eq!(
            machine.handle_event(Transition::BackoffElapsed { credential: true }),
            Action::Ignore
        );
        assert_eq!(machine.state(), ConnectionState::Disconnected);
    }
}
