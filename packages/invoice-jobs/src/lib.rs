//! Lifecycle client for long-running invoice extraction jobs.
//!
//! A remote portal extracts invoices asynchronously: the caller submits an
//! access key, gets back a job id, and the job moves through
//! `created → running → completed | failed`, possibly pausing in
//! `awaiting_verification` when the portal throws up a captcha that only a
//! human can answer. This crate is the client side of that lifecycle: it
//! creates the job, polls its status on a fixed interval, exposes the
//! pending challenge through a narrow resolution channel, and stops polling
//! exactly when a terminal phase is reached.
//!
//! # Guarantees
//!
//! - At most one status fetch is in flight per tracked job, so snapshots are
//!   applied in issue order and a slow response can never be overtaken.
//! - `cancel` aborts any in-flight fetch; once it returns, no further state
//!   updates occur.
//! - A failed fetch is transient: the last good snapshot is kept and the
//!   diagnostic is surfaced alongside it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use invoice_jobs::{JobClient, JobInput};
//!
//! let client = JobClient::new(portal.clone(), portal.clone(), portal);
//! client.create(JobInput::new(access_key)).await?;
//!
//! let mut updates = client.subscribe();
//! let state = updates.wait_for(|s| !s.is_processing()).await?;
//! if state.is_awaiting_verification() {
//!     client.resolve_captcha(&read_solution()?).await?;
//! }
//! ```
//!
//! # Modules
//!
//! - [`types`] - Job model (id, phase, snapshot, observable state)
//! - [`capabilities`] - Traits for the three remote operations
//! - [`poller`] - Timer-driven polling scheduler
//! - [`client`] - The orchestrating [`JobClient`]
//! - [`testing`] - Scriptable mock portal for tests

pub mod capabilities;
pub mod client;
pub mod error;
pub mod poller;
pub mod testing;
pub mod types;

pub use capabilities::{CaptchaSubmitter, JobCreator, StatusFetcher};
pub use client::JobClient;
pub use error::{CapabilityError, CapabilityResult, CaptchaError, CreateError};
pub use poller::PollConfig;
pub use types::{CaptchaChallenge, JobId, JobInput, JobPhase, JobSnapshot, JobState};
