//! Scan-event orchestration
//!
//! A capture is handled start to finish (decode, resolve, persist) before the
//! next one is accepted. [`CheckInDesk`] owns the roster; [`SharedDesk`]
//! serialises access for more than one operator.

use crate::decoder::Decoder;
use crate::error::RosterError;
use crate::frame::Frame;
use crate::resolver::{Outcome, Tone, resolve};
use crate::roster::{Roster, RosterStore};
use crate::session::Session;
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// What to do when the roster repeats a roll identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Warn and resolve to the first row in roster order
    #[default]
    FirstMatch,
    /// Refuse to load the roster
    Reject,
}

/// Outcome of one scan event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Nothing readable in the frame; the resolver did not run
    NoCodeDetected,
    /// A payload was decoded and resolved
    Resolved(Outcome),
}

impl ScanOutcome {
    /// Display treatment for this outcome
    pub fn tone(&self) -> Tone {
        match self {
            ScanOutcome::NoCodeDetected => Tone::Informational,
            ScanOutcome::Resolved(outcome) => outcome.tone(),
        }
    }

    /// True when the scan event failed and must be surfaced loudly
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanOutcome::Resolved(outcome) if outcome.is_fatal())
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::NoCodeDetected => {
                f.write_str("No QR code detected. Try again or adjust camera angle!")
            }
            ScanOutcome::Resolved(outcome) => outcome.fmt(f),
        }
    }
}

/// Owns the roster, its store and the decoder for one check-in session
pub struct CheckInDesk<S: RosterStore> {
    roster: Roster,
    store: S,
    decoder: Arc<dyn Decoder>,
}

impl<S: RosterStore> CheckInDesk<S> {
    /// Load the roster and get ready to scan.
    ///
    /// A roster that cannot be loaded stops the session before any scan.
    pub fn open<D: Decoder + 'static>(
        store: S,
        decoder: D,
        policy: DuplicatePolicy,
    ) -> Result<Self, RosterError> {
        let roster = store.load()?;

        let duplicates = roster.duplicate_rolls();
        if !duplicates.is_empty() {
            match policy {
                DuplicatePolicy::Reject => return Err(RosterError::DuplicateRoll(duplicates)),
                DuplicatePolicy::FirstMatch => warn!(
                    duplicates = %duplicates.join(", "),
                    "roster repeats roll numbers, first row wins"
                ),
            }
        }

        info!(
            attendees = roster.len(),
            served = roster.served_count(),
            "roster loaded"
        );

        Ok(Self {
            roster,
            store,
            decoder: Arc::new(decoder),
        })
    }

    /// Handle one captured frame
    pub fn handle_capture(&mut self, session: &Session, frame: &Frame) -> ScanOutcome {
        let payload = self.decoder.decode(frame);
        match payload {
            Some(payload) => ScanOutcome::Resolved(self.handle_payload(session, &payload)),
            None => {
                debug!(operator = session.operator(), "no code in frame");
                ScanOutcome::NoCodeDetected
            }
        }
    }

    /// Resolve text that was already decoded elsewhere
    pub fn handle_payload(&mut self, session: &Session, payload: &str) -> Outcome {
        debug!(operator = session.operator(), payload, "resolving payload");
        resolve(payload, &mut self.roster, &self.store)
    }

    /// Decoder in use
    pub fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }

    /// Current in-memory roster
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Wrap the desk for use by several operators at once
    pub fn into_shared(self) -> SharedDesk<S> {
        SharedDesk {
            inner: Arc::new(Mutex::new(self)),
        }
    }
}

/// Cloneable handle to a desk shared between operators.
///
/// Decoding happens outside the lock. Resolve and persist happen under it, so
/// two operators scanning the same code cannot both be granted.
pub struct SharedDesk<S: RosterStore> {
    inner: Arc<Mutex<CheckInDesk<S>>>,
}

impl<S: RosterStore> Clone for SharedDesk<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RosterStore> SharedDesk<S> {
    /// Handle one captured frame
    pub fn handle_capture(&self, session: &Session, frame: &Frame) -> ScanOutcome {
        let decoder = Arc::clone(&self.lock().decoder);

        match decoder.decode(frame) {
            Some(payload) => ScanOutcome::Resolved(self.handle_payload(session, &payload)),
            None => {
                debug!(operator = session.operator(), "no code in frame");
                ScanOutcome::NoCodeDetected
            }
        }
    }

    /// Resolve text that was already decoded elsewhere
    pub fn handle_payload(&self, session: &Session, payload: &str) -> Outcome {
        self.lock().handle_payload(session, payload)
    }

    /// Run `f` with exclusive access to the desk
    pub fn with_desk<R>(&self, f: impl FnOnce(&mut CheckInDesk<S>) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, CheckInDesk<S>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
