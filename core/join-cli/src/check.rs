//! `check`: ask once whether a class is open, without polling.

use join_core::{HttpJoinService, JoinConfig, JoinError, JoinSession, JoinState, SystemClock};

use crate::output;
use crate::Outcome;

pub fn run(config: &JoinConfig, session_id: &str, json: bool) -> Result<Outcome, JoinError> {
    let service = HttpJoinService::from_config(config)?;
    let mut session = JoinSession::new(service, SystemClock, config.poll_settings());
    let snapshot = session.request_join(session_id)?;
    session.dispose();

    println!("{}", output::render(&snapshot, json));
    Ok(match snapshot.state {
        JoinState::Ready => Outcome::Joined,
        JoinState::Polling => Outcome::NotReady,
        _ => Outcome::Failed,
    })
}
