//! `join`: wait for a class to open, then print its join URL.

use chrono::{DateTime, Duration, Utc};
use join_core::{
    BackgroundJoin, HttpJoinService, JoinConfig, JoinError, JoinSnapshot, JoinState, JoinWindow,
    ScheduledClass, SystemClock,
};
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration as StdDuration, Instant};

use crate::output;
use crate::Outcome;

const UPDATE_WAIT: StdDuration = StdDuration::from_secs(1);

pub struct JoinArgs {
    pub session_id: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub duration_mins: u64,
    pub give_up_after_mins: Option<u64>,
    pub json: bool,
}

pub fn run(config: &JoinConfig, args: JoinArgs) -> Result<Outcome, JoinError> {
    if let Some(starts_at) = args.starts_at {
        let class = ScheduledClass::new(
            args.session_id.clone(),
            starts_at,
            Duration::minutes(args.duration_mins as i64),
        );
        let now = Utc::now();
        match class.window(now, config.starting_soon_window()) {
            JoinWindow::Ended => {
                println!("Class {} has already ended.", args.session_id);
                return Ok(Outcome::Failed);
            }
            JoinWindow::Upcoming => println!(
                "Class {} starts in {} minutes; waiting for it to open.",
                args.session_id,
                class.minutes_until_start(now)
            ),
            JoinWindow::StartingSoon => println!("Class {} is starting soon.", args.session_id),
            JoinWindow::InProgress => {}
        }
    }

    let service = HttpJoinService::from_config(config)?;
    let join = BackgroundJoin::spawn(service, SystemClock, config.poll_settings())?;
    let updates = join.subscribe();
    join.request_join(&args.session_id)?;

    let deadline = args
        .give_up_after_mins
        .and_then(|minutes| Instant::now().checked_add(StdDuration::from_secs(minutes * 60)));
    let mut gave_up = false;
    let mut last_shown: Option<JoinSnapshot> = None;

    loop {
        let polling = last_shown
            .as_ref()
            .is_some_and(|snapshot| snapshot.state == JoinState::Polling);
        if polling && !gave_up && deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            tracing::info!(session_id = %args.session_id, "Giving up on join");
            gave_up = true;
            join.cancel();
        }

        let wait = deadline
            .filter(|_| polling && !gave_up)
            .map_or(UPDATE_WAIT, |deadline| {
                deadline.saturating_duration_since(Instant::now()).min(UPDATE_WAIT)
            });
        match updates.recv_timeout(wait) {
            Ok(snapshot) => {
                if snapshot.state == JoinState::Idle {
                    continue;
                }
                if output::visibly_changed(last_shown.as_ref(), &snapshot) {
                    println!("{}", output::render(&snapshot, args.json));
                }
                let state = snapshot.state;
                last_shown = Some(snapshot);

                match state {
                    JoinState::Ready => return Ok(Outcome::Joined),
                    JoinState::Failed => return Ok(Outcome::Failed),
                    JoinState::Cancelled if gave_up => return Ok(Outcome::GaveUp),
                    JoinState::Cancelled => return Ok(Outcome::Failed),
                    JoinState::Idle | JoinState::Requesting | JoinState::Polling => {}
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Err(JoinError::WorkerStopped),
        }
    }
}
