//! # join-core
//!
//! Join-class controller for the Bambinos learning dashboard: asks the
//! booking backend whether a participant may enter a scheduled class, polls
//! while the answer is "not yet", and hands back the join URL once it is.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Service calls block; run
//!   them on [`BackgroundJoin`]'s worker thread when the caller must not wait.
//! - **Owned state**: one [`JoinController`] holds one attempt and at most one
//!   poll timer. Only `start_timer`/`stop_timer` touch the timer.
//! - **Injectable time**: every timing decision goes through [`Clock`], so
//!   polling is testable with [`ManualClock`] instead of sleeps.
//! - **Errors become state**: service failures never escape as `Err`; they
//!   land in the snapshot as `Failed` (initial request) or a retry notice
//!   (poll tick).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use join_core::{load_config, HttpJoinService, JoinSession, SystemClock};
//!
//! let config = load_config(None)?;
//! let service = HttpJoinService::from_config(&config)?;
//! let mut session = JoinSession::new(service, SystemClock, config.poll_settings());
//! let snapshot = session.request_join("booking-42")?;
//! ```

pub mod background;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod schedule;
pub mod service;
pub mod session;

pub use background::BackgroundJoin;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{default_config_path, load_config, load_config_file, JoinConfig, PollSettings};
pub use controller::{Applied, JoinController, JoinSnapshot, JoinState, JoinTicket};
pub use error::{JoinError, Result, ServiceError};
pub use schedule::{JoinWindow, ScheduledClass};
pub use service::{HttpJoinService, JoinService};
pub use session::JoinSession;

pub use bambinos_join_protocol::{JoinPayload, JoinResponse};
