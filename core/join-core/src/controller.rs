//! Join controller: the lifecycle of one attempt to enter a live class.
//!
//! ```text
//! Idle --request_join--> Requesting
//! Requesting --ready--> Ready
//! Requesting --not ready--> Polling (timer started)
//! Requesting --error--> Failed
//! Polling --tick: ready--> Ready (timer cleared)
//! Polling --tick: not ready / error--> Polling (message updated)
//! any --cancel--> Cancelled (timer cleared)
//! Ready|Failed|Cancelled --request_join--> Requesting
//! ```
//!
//! Every asynchronous boundary is split into a *begin* half that hands out a
//! [`JoinTicket`] and a *complete* half that applies the service result. A
//! ticket is only honoured while its generation is still current; `cancel`,
//! `dispose` and any new `request_join` bump the generation, so answers for a
//! superseded attempt are discarded instead of resurrecting old state.
//!
//! The controller does no I/O and never reads the wall clock directly. Drive
//! it inline with [`crate::JoinSession`] or from a worker thread with
//! [`crate::BackgroundJoin`].

use bambinos_join_protocol::{validate_session_id, JoinOutcome, JoinPayload, JoinResponse};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::{PollSettings, MAX_POLL_INTERVAL_SECS};
use crate::error::{JoinError, Result, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinState {
    Idle,
    Requesting,
    Ready,
    Polling,
    Cancelled,
    Failed,
}

impl JoinState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinState::Idle => "idle",
            JoinState::Requesting => "requesting",
            JoinState::Ready => "ready",
            JoinState::Polling => "polling",
            JoinState::Cancelled => "cancelled",
            JoinState::Failed => "failed",
        }
    }
}

/// Read-only view of the current attempt, handed to whatever renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinSnapshot {
    pub session_id: Option<String>,
    pub state: JoinState,
    pub join_payload: Option<JoinPayload>,
    pub status_message: Option<String>,
    pub last_error: Option<String>,
    pub generation: u64,
    pub ticks: u32,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl JoinSnapshot {
    fn idle(generation: u64) -> Self {
        Self {
            session_id: None,
            state: JoinState::Idle,
            join_payload: None,
            status_message: None,
            last_error: None,
            generation,
            ticks: 0,
            last_checked_at: None,
        }
    }

    pub fn join_url(&self) -> Option<&str> {
        self.join_payload
            .as_ref()
            .map(|payload| payload.join_url.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TicketKind {
    Initial,
    Tick,
}

/// Proof that a service call was issued for a specific attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTicket {
    session_id: String,
    generation: u64,
    kind: TicketKind,
}

impl JoinTicket {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_tick(&self) -> bool {
        self.kind == TicketKind::Tick
    }
}

/// Whether a completed service call changed controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct PollTimer {
    next_due: DateTime<Utc>,
    in_flight: bool,
}

pub struct JoinController<C: Clock> {
    clock: C,
    interval: Duration,
    retry_notice: String,
    generation: u64,
    attempt: JoinSnapshot,
    timer: Option<PollTimer>,
}

impl<C: Clock> JoinController<C> {
    pub fn new(clock: C, settings: PollSettings) -> Self {
        Self {
            clock,
            interval: settings
                .interval
                .clamp(Duration::seconds(1), Duration::seconds(MAX_POLL_INTERVAL_SECS as i64)),
            retry_notice: settings.retry_notice,
            generation: 0,
            attempt: JoinSnapshot::idle(0),
            timer: None,
        }
    }

    pub fn snapshot(&self) -> JoinSnapshot {
        self.attempt.clone()
    }

    pub fn state(&self) -> JoinState {
        self.attempt.state
    }

    pub fn has_active_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// When the next poll tick becomes due, if polling.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.timer
            .filter(|timer| !timer.in_flight)
            .map(|timer| timer.next_due)
    }

    pub fn poll_interval(&self) -> Duration {
        self.interval
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Initial request
    // ─────────────────────────────────────────────────────────────────────

    /// Starts a fresh attempt for `session_id`, superseding any previous one.
    pub fn begin_join(&mut self, session_id: &str) -> Result<JoinTicket> {
        validate_session_id(session_id)
            .map_err(|err| JoinError::InvalidSessionId(err.message))?;

        self.stop_timer();
        self.generation += 1;
        self.attempt = JoinSnapshot {
            session_id: Some(session_id.to_string()),
            state: JoinState::Requesting,
            ..JoinSnapshot::idle(self.generation)
        };
        tracing::info!(session_id, generation = self.generation, "Join requested");

        Ok(self.ticket(TicketKind::Initial))
    }

    pub fn complete_join(
        &mut self,
        ticket: JoinTicket,
        result: std::result::Result<JoinResponse, ServiceError>,
    ) -> Applied {
        if ticket.kind != TicketKind::Initial
            || !self.is_current(&ticket)
            || self.attempt.state != JoinState::Requesting
        {
            return self.discard(&ticket);
        }

        let now = self.clock.now();
        self.attempt.last_checked_at = Some(now);

        match into_outcome(result) {
            Ok(JoinOutcome::Ready(payload)) => self.enter_ready(payload),
            Ok(JoinOutcome::NotReady { message }) => {
                self.attempt.state = JoinState::Polling;
                self.attempt.status_message = message;
                self.start_timer(now);
                tracing::info!(
                    session_id = %ticket.session_id,
                    generation = ticket.generation,
                    message = ?self.attempt.status_message,
                    "Class not joinable yet; polling"
                );
            }
            Err(err) => {
                self.attempt.state = JoinState::Failed;
                self.attempt.status_message = None;
                self.attempt.last_error = Some(err.to_string());
                tracing::warn!(
                    session_id = %ticket.session_id,
                    generation = ticket.generation,
                    error = %err,
                    "Join request failed"
                );
            }
        }

        Applied::Applied
    }

    // ─────────────────────────────────────────────────────────────────────
    // Poll ticks
    // ─────────────────────────────────────────────────────────────────────

    /// Hands out a tick ticket when the timer has elapsed and no tick is
    /// already in flight.
    pub fn due_tick(&mut self) -> Option<JoinTicket> {
        if self.attempt.state != JoinState::Polling {
            return None;
        }
        let now = self.clock.now();
        let timer = self.timer.as_mut()?;
        if timer.in_flight || now < timer.next_due {
            return None;
        }
        timer.in_flight = true;
        Some(self.ticket(TicketKind::Tick))
    }

    pub fn complete_tick(
        &mut self,
        ticket: JoinTicket,
        result: std::result::Result<JoinResponse, ServiceError>,
    ) -> Applied {
        if ticket.kind != TicketKind::Tick
            || !self.is_current(&ticket)
            || self.attempt.state != JoinState::Polling
            || self.timer.is_none()
        {
            return self.discard(&ticket);
        }

        let now = self.clock.now();
        self.attempt.last_checked_at = Some(now);
        self.attempt.ticks = self.attempt.ticks.saturating_add(1);

        match into_outcome(result) {
            Ok(JoinOutcome::Ready(payload)) => {
                self.stop_timer();
                self.enter_ready(payload);
            }
            Ok(JoinOutcome::NotReady { message }) => {
                if message.is_some() {
                    self.attempt.status_message = message;
                }
                self.start_timer(now);
                tracing::debug!(
                    session_id = %ticket.session_id,
                    ticks = self.attempt.ticks,
                    "Still not joinable"
                );
            }
            Err(err) => {
                self.attempt.status_message = Some(self.retry_notice.clone());
                self.start_timer(now);
                tracing::warn!(
                    session_id = %ticket.session_id,
                    ticks = self.attempt.ticks,
                    error = %err,
                    "Join poll failed; will retry"
                );
            }
        }

        Applied::Applied
    }

    // ─────────────────────────────────────────────────────────────────────
    // User actions
    // ─────────────────────────────────────────────────────────────────────

    pub fn cancel(&mut self) {
        self.stop_timer();
        self.generation += 1;
        self.attempt.generation = self.generation;
        self.attempt.state = JoinState::Cancelled;
        self.attempt.join_payload = None;
        self.attempt.status_message = None;
        self.attempt.last_error = None;
        tracing::info!(
            session_id = ?self.attempt.session_id,
            generation = self.generation,
            "Join cancelled"
        );
    }

    pub fn clear_result(&mut self) {
        self.attempt.join_payload = None;
    }

    pub fn clear_error(&mut self) {
        self.attempt.last_error = None;
    }

    /// Tears the attempt down: timer cleared, state discarded.
    pub fn dispose(&mut self) {
        self.stop_timer();
        self.generation += 1;
        self.attempt = JoinSnapshot::idle(self.generation);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn ticket(&self, kind: TicketKind) -> JoinTicket {
        JoinTicket {
            session_id: self.attempt.session_id.clone().unwrap_or_default(),
            generation: self.generation,
            kind,
        }
    }

    fn is_current(&self, ticket: &JoinTicket) -> bool {
        ticket.generation == self.generation
            && self.attempt.session_id.as_deref() == Some(ticket.session_id.as_str())
    }

    fn discard(&self, ticket: &JoinTicket) -> Applied {
        tracing::debug!(
            session_id = %ticket.session_id,
            ticket_generation = ticket.generation,
            current_generation = self.generation,
            state = self.attempt.state.as_str(),
            "Discarding stale join response"
        );
        Applied::Stale
    }

    fn enter_ready(&mut self, payload: JoinPayload) {
        tracing::info!(
            session_id = ?self.attempt.session_id,
            generation = self.generation,
            join_url = %payload.join_url,
            "Class is joinable"
        );
        self.attempt.state = JoinState::Ready;
        self.attempt.status_message = None;
        self.attempt.last_error = None;
        self.attempt.join_payload = Some(payload);
    }

    /// (Re)arms the single poll timer one interval after `from`.
    fn start_timer(&mut self, from: DateTime<Utc>) {
        let Some(next_due) = from.checked_add_signed(self.interval) else {
            tracing::warn!(
                generation = self.generation,
                from = %from,
                "Poll tick falls outside the representable time range; not scheduling"
            );
            self.timer = None;
            return;
        };
        self.timer = Some(PollTimer {
            next_due,
            in_flight: false,
        });
    }

    fn stop_timer(&mut self) {
        if self.timer.take().is_some() {
            tracing::debug!(generation = self.generation, "Poll timer cleared");
        }
    }
}

impl<C: Clock> Drop for JoinController<C> {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

impl<C: Clock> std::fmt::Debug for JoinController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinController")
            .field("generation", &self.generation)
            .field("attempt", &self.attempt)
            .field("timer", &self.timer)
            .finish()
    }
}

fn into_outcome(
    result: std::result::Result<JoinResponse, ServiceError>,
) -> std::result::Result<JoinOutcome, ServiceError> {
    result.and_then(|response| response.into_outcome().map_err(ServiceError::from))
}
