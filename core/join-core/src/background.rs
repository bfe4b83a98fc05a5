//! Worker-thread driver for the join controller.
//!
//! The controller lives behind a mutex shared between the caller and one
//! worker thread. The worker takes a ticket under the lock, releases it for
//! the (blocking) service call, and re-locks to complete. A `cancel()` from
//! the caller while a request is in flight therefore flips state at once,
//! and the late answer is discarded as stale when it lands.
//!
//! The worker sleeps on its command channel, bounded by the next due tick, so
//! cancel and shutdown take effect without waiting out the poll interval.
//! Dropping the handle disposes the controller and joins the worker.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;

use crate::clock::Clock;
use crate::config::PollSettings;
use crate::controller::{Applied, JoinController, JoinSnapshot, JoinTicket};
use crate::error::{JoinError, Result, ServiceError};
use crate::service::JoinService;

/// Upper bound on one worker sleep; the clock is re-read after each wake so an
/// injected clock that jumps forward is noticed promptly.
const MAX_IDLE_WAIT: StdDuration = StdDuration::from_millis(250);
const WORKER_THREAD_NAME: &str = "join-poller";

enum Command {
    Run(JoinTicket),
    Wake,
    Shutdown,
}

struct Shared<C: Clock> {
    controller: JoinController<C>,
    subscribers: Vec<Sender<JoinSnapshot>>,
}

impl<C: Clock> Shared<C> {
    fn publish(&mut self) {
        let snapshot = self.controller.snapshot();
        self.subscribers
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
    }
}

pub struct BackgroundJoin<C: Clock + 'static> {
    shared: Arc<Mutex<Shared<C>>>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl<C: Clock + 'static> BackgroundJoin<C> {
    pub fn spawn<S>(service: S, clock: C, settings: PollSettings) -> Result<Self>
    where
        S: JoinService + 'static,
    {
        let shared = Arc::new(Mutex::new(Shared {
            controller: JoinController::new(clock, settings),
            subscribers: Vec::new(),
        }));
        let (commands, inbox) = mpsc::channel();

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(service, worker_shared, inbox))
            .map_err(|err| JoinError::Io {
                context: "spawning join worker".to_string(),
                source: err,
            })?;

        Ok(Self {
            shared,
            commands,
            worker: Some(worker),
        })
    }

    /// Receives every state change from now on, starting with the current one.
    pub fn subscribe(&self) -> Receiver<JoinSnapshot> {
        let (sender, receiver) = mpsc::channel();
        let mut shared = lock(&self.shared);
        let _ = sender.send(shared.controller.snapshot());
        shared.subscribers.push(sender);
        receiver
    }

    /// Flips to `Requesting` immediately; the service call runs on the worker.
    pub fn request_join(&self, session_id: &str) -> Result<JoinSnapshot> {
        let ticket = {
            let mut shared = lock(&self.shared);
            let ticket = shared.controller.begin_join(session_id)?;
            shared.publish();
            ticket
        };

        if let Err(mpsc::SendError(Command::Run(ticket))) = self.commands.send(Command::Run(ticket))
        {
            let mut shared = lock(&self.shared);
            shared.controller.complete_join(
                ticket,
                Err(ServiceError::Transport("join worker has stopped".to_string())),
            );
            shared.publish();
            return Err(JoinError::WorkerStopped);
        }

        Ok(self.snapshot())
    }

    pub fn cancel(&self) {
        {
            let mut shared = lock(&self.shared);
            shared.controller.cancel();
            shared.publish();
        }
        self.wake();
    }

    pub fn clear_result(&self) {
        let mut shared = lock(&self.shared);
        shared.controller.clear_result();
        shared.publish();
    }

    pub fn clear_error(&self) {
        let mut shared = lock(&self.shared);
        shared.controller.clear_error();
        shared.publish();
    }

    /// Nudges the worker to re-check whether a tick is due.
    pub fn wake(&self) {
        let _ = self.commands.send(Command::Wake);
    }

    pub fn snapshot(&self) -> JoinSnapshot {
        lock(&self.shared).controller.snapshot()
    }

    pub fn has_active_timer(&self) -> bool {
        lock(&self.shared).controller.has_active_timer()
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl<C: Clock + 'static> Drop for BackgroundJoin<C> {
    fn drop(&mut self) {
        {
            let mut shared = lock(&self.shared);
            shared.controller.dispose();
            shared.subscribers.clear();
        }
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Join worker panicked during shutdown");
            }
        }
    }
}

fn lock<C: Clock>(shared: &Mutex<Shared<C>>) -> MutexGuard<'_, Shared<C>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_worker<S, C>(service: S, shared: Arc<Mutex<Shared<C>>>, inbox: Receiver<Command>)
where
    S: JoinService,
    C: Clock,
{
    tracing::debug!("Join worker started");
    loop {
        let wait = next_wait(&lock(&shared).controller);

        match inbox.recv_timeout(wait) {
            Ok(Command::Run(ticket)) => {
                let result = service.join_class(ticket.session_id());
                let mut guard = lock(&shared);
                if guard.controller.complete_join(ticket, result) == Applied::Applied {
                    guard.publish();
                }
            }
            Ok(Command::Wake) | Err(RecvTimeoutError::Timeout) => {}
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        }

        run_due_tick(&service, &shared);
    }
    tracing::debug!("Join worker stopped");
}

fn run_due_tick<S, C>(service: &S, shared: &Mutex<Shared<C>>)
where
    S: JoinService,
    C: Clock,
{
    let Some(ticket) = lock(shared).controller.due_tick() else {
        return;
    };

    let result = service.join_class(ticket.session_id());

    let mut guard = lock(shared);
    if guard.controller.complete_tick(ticket, result) == Applied::Applied {
        guard.publish();
    }
}

fn next_wait<C: Clock>(controller: &JoinController<C>) -> StdDuration {
    match controller.next_due() {
        Some(due) => (due - controller.now())
            .to_std()
            .unwrap_or(StdDuration::ZERO)
            .min(MAX_IDLE_WAIT),
        None => MAX_IDLE_WAIT,
    }
}
