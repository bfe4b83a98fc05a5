//! Inline driver: a controller paired with the service it polls.
//!
//! Service calls block the caller. Useful for tests and for single-shot
//! tools; interactive consumers want [`crate::BackgroundJoin`] instead.

use crate::clock::Clock;
use crate::config::PollSettings;
use crate::controller::{JoinController, JoinSnapshot, JoinState};
use crate::error::Result;
use crate::service::JoinService;

pub struct JoinSession<S: JoinService, C: Clock> {
    controller: JoinController<C>,
    service: S,
}

impl<S: JoinService, C: Clock> JoinSession<S, C> {
    pub fn new(service: S, clock: C, settings: PollSettings) -> Self {
        Self {
            controller: JoinController::new(clock, settings),
            service,
        }
    }

    pub fn request_join(&mut self, session_id: &str) -> Result<JoinSnapshot> {
        let ticket = self.controller.begin_join(session_id)?;
        let result = self.service.join_class(ticket.session_id());
        self.controller.complete_join(ticket, result);
        Ok(self.controller.snapshot())
    }

    /// Runs the poll tick if one is due. Returns whether the service was called.
    pub fn tick(&mut self) -> bool {
        let Some(ticket) = self.controller.due_tick() else {
            return false;
        };
        let result = self.service.join_class(ticket.session_id());
        self.controller.complete_tick(ticket, result);
        true
    }

    pub fn cancel(&mut self) {
        self.controller.cancel();
    }

    pub fn clear_result(&mut self) {
        self.controller.clear_result();
    }

    pub fn clear_error(&mut self) {
        self.controller.clear_error();
    }

    pub fn dispose(&mut self) {
        self.controller.dispose();
    }

    pub fn snapshot(&self) -> JoinSnapshot {
        self.controller.snapshot()
    }

    pub fn state(&self) -> JoinState {
        self.controller.state()
    }

    pub fn controller(&self) -> &JoinController<C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut JoinController<C> {
        &mut self.controller
    }
}
