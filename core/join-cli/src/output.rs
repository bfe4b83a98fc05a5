//! Human and JSON renderings of a join snapshot.

use join_core::{JoinSnapshot, JoinState};

pub fn render(snapshot: &JoinSnapshot, json: bool) -> String {
    if json {
        return serde_json::to_string(snapshot)
            .unwrap_or_else(|err| format!("{{\"error\":\"{}\"}}", err));
    }
    describe(snapshot)
}

pub fn describe(snapshot: &JoinSnapshot) -> String {
    let session = snapshot.session_id.as_deref().unwrap_or("-");
    match snapshot.state {
        JoinState::Idle => "Idle".to_string(),
        JoinState::Requesting => format!("Checking whether class {} is open...", session),
        JoinState::Polling => format!(
            "Waiting: {} (checked {} time{})",
            snapshot
                .status_message
                .as_deref()
                .unwrap_or("class is not open yet"),
            snapshot.ticks + 1,
            if snapshot.ticks == 0 { "" } else { "s" }
        ),
        JoinState::Ready => match snapshot.join_url() {
            Some(url) => format!("Class {} is open. Join at: {}", session, url),
            None => format!("Class {} is open.", session),
        },
        JoinState::Cancelled => format!("Stopped waiting for class {}.", session),
        JoinState::Failed => format!(
            "Could not join class {}: {}",
            session,
            snapshot.last_error.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Whether two snapshots differ in anything a user would notice.
pub fn visibly_changed(previous: Option<&JoinSnapshot>, current: &JoinSnapshot) -> bool {
    match previous {
        None => true,
        Some(previous) => {
            previous.state != current.state
                || previous.status_message != current.status_message
                || previous.last_error != current.last_error
                || previous.join_payload != current.join_payload
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use join_core::{JoinController, JoinPayload, JoinResponse, ManualClock, PollSettings};

    fn polling_snapshot() -> JoinSnapshot {
        let mut controller = JoinController::new(ManualClock::default(), PollSettings::default());
        let ticket = controller.begin_join("b-42").expect("begin");
        controller.complete_join(ticket, Ok(JoinResponse::not_ready("teacher not joined")));
        controller.snapshot()
    }

    #[test]
    fn describes_polling_with_message() {
        assert_eq!(
            describe(&polling_snapshot()),
            "Waiting: teacher not joined (checked 1 time)"
        );
    }

    #[test]
    fn describes_ready_with_url() {
        let mut controller = JoinController::new(ManualClock::default(), PollSettings::default());
        let ticket = controller.begin_join("b-42").expect("begin");
        controller.complete_join(ticket, Ok(JoinResponse::ready(JoinPayload::new("https://x"))));
        assert_eq!(
            describe(&controller.snapshot()),
            "Class b-42 is open. Join at: https://x"
        );
    }

    #[test]
    fn json_rendering_includes_state() {
        let rendered = render(&polling_snapshot(), true);
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("json");
        assert_eq!(value["state"], "polling");
        assert_eq!(value["session_id"], "b-42");
    }

    #[test]
    fn tick_count_alone_is_not_a_visible_change() {
        let previous = polling_snapshot();
        let mut current = previous.clone();
        current.ticks += 1;
        assert!(!visibly_changed(Some(&previous), &current));

        current.status_message = Some("still waiting".to_string());
        assert!(visibly_changed(Some(&previous), &current));
        assert!(visibly_changed(None, &current));
    }
}
