//! crates/notification_core/src/reconnect.rs
//!
//! The push connection lifecycle as a pure state machine. The transport feeds
//! it events and performs the effects it returns, so the backoff arithmetic
//! can be exercised without a socket.

use std::time::Duration;

/// WebSocket close code for a deliberate shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code reported when the connection dropped or never opened.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Reconnects scheduled before the client stays offline.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

const BASE_DELAY_MS: u64 = 1_000;
const MAX_DELAY_MS: u64 = 30_000;

/// `min(1000 * 2^attempt, 30000)` milliseconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_DELAY_MS.saturating_mul(factor).min(MAX_DELAY_MS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected and not trying to be.
    #[default]
    Idle,
    /// Opening a socket. `attempt` is the reconnect counter carried through.
    Connecting { attempt: u32 },
    Open,
    /// Waiting out a reconnect delay.
    Backoff { attempt: u32 },
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Mount, or a manual retry after giving up.
    Connect,
    Opened,
    Closed { code: u16 },
    TimerFired,
    /// Unmount.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    OpenSocket,
    RequestBacklog,
    ScheduleReconnect { delay: Duration },
    CancelReconnect,
    CloseSocket { code: u16 },
    /// The ceiling was reached; stay offline until the next `Connect`.
    GiveUp,
}

pub fn transition(state: ConnectionState, event: ConnectionEvent) -> (ConnectionState, Vec<Effect>) {
    use ConnectionEvent as Ev;
    use ConnectionState as St;

    match (state, event) {
        (St::Idle, Ev::Connect) => (St::Connecting { attempt: 0 }, vec![Effect::OpenSocket]),

        (St::Connecting { .. }, Ev::Opened) => (St::Open, vec![Effect::RequestBacklog]),

        (St::Open, Ev::Closed { code }) => closed(0, code),
        (St::Connecting { attempt }, Ev::Closed { code }) => closed(attempt, code),

        (St::Backoff { attempt }, Ev::TimerFired) => {
            (St::Connecting { attempt }, vec![Effect::OpenSocket])
        }

        (St::Open | St::Connecting { .. }, Ev::Shutdown) => (
            St::Idle,
            vec![Effect::CloseSocket {
                code: NORMAL_CLOSURE,
            }],
        ),
        (St::Backoff { .. }, Ev::Shutdown) => (St::Idle, vec![Effect::CancelReconnect]),

        (state, _) => (state, Vec::new()),
    }
}

fn closed(attempt: u32, code: u16) -> (ConnectionState, Vec<Effect>) {
    if code == NORMAL_CLOSURE {
        return (ConnectionState::Idle, Vec::new());
    }
    if attempt >= MAX_RECONNECT_ATTEMPTS {
        return (ConnectionState::Idle, vec![Effect::GiveUp]);
    }
    (
        ConnectionState::Backoff {
            attempt: attempt + 1,
        },
        vec![Effect::ScheduleReconnect {
            delay: backoff_delay(attempt),
        }],
    )
}
