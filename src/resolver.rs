//! Check-in resolver
//!
//! One scan payload goes through four steps: parse, lookup, check state,
//! grant. A grant is only reported after the roster store has confirmed the
//! write; if the write fails the flag is rolled back so memory never claims
//! more than storage holds.

use crate::payload::parse_roll;
use crate::roster::{Attendee, Roster, RosterStore};
use std::fmt;
use tracing::{error, info, warn};

/// Result of resolving one payload against the roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Attendee was not yet served; now marked served and persisted
    Granted(Attendee),
    /// Attendee was already served; roster unchanged
    AlreadyServed(Attendee),
    /// Roll identifier is not in the roster
    UnknownAttendee {
        /// Identifier read from the payload
        roll: String,
    },
    /// Payload is not a JSON object with a usable `roll_no`
    MalformedPayload {
        /// Decoded text as read
        raw: String,
    },
    /// The grant could not be persisted and was rolled back
    PersistenceError {
        /// Identifier that was being granted
        roll: String,
        /// Storage failure description
        reason: String,
    },
}

/// How an outcome should be presented to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Service granted
    Positive,
    /// Rejected scan the operator should look at
    Warning,
    /// Nothing to act on, try again
    Informational,
    /// Service must not be assumed; storage is failing
    Alert,
}

impl Outcome {
    /// Display treatment for this outcome
    pub fn tone(&self) -> Tone {
        match self {
            Outcome::Granted(_) => Tone::Positive,
            Outcome::AlreadyServed(_)
            | Outcome::UnknownAttendee { .. }
            | Outcome::MalformedPayload { .. } => Tone::Warning,
            Outcome::PersistenceError { .. } => Tone::Alert,
        }
    }

    /// True only for a persisted grant
    pub fn is_granted(&self) -> bool {
        matches!(self, Outcome::Granted(_))
    }

    /// True when the scan event failed and must be surfaced loudly
    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::PersistenceError { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Granted(a) => write!(
                f,
                "GIVE THE FOOD | Roll Number: {} | Name: {} | Department: {}",
                a.roll, a.name, a.dept
            ),
            Outcome::AlreadyServed(a) => write!(f, "Already Taken: {} ({})", a.roll, a.name),
            Outcome::UnknownAttendee { roll } => {
                write!(f, "Invalid QR Code: {roll} not found in roster")
            }
            Outcome::MalformedPayload { raw } => write!(f, "Invalid QR format: {raw}"),
            Outcome::PersistenceError { roll, reason } => write!(
                f,
                "NOT GRANTED: check-in for {roll} could not be saved ({reason})"
            ),
        }
    }
}

/// Resolve one decoded payload against the roster.
///
/// Only a grant touches the store. Repeating a payload after a grant yields
/// [`Outcome::AlreadyServed`] without another write.
pub fn resolve<S: RosterStore + ?Sized>(payload: &str, roster: &mut Roster, store: &S) -> Outcome {
    let Some(roll) = parse_roll(payload) else {
        warn!(payload, "malformed scan payload");
        return Outcome::MalformedPayload {
            raw: payload.to_string(),
        };
    };

    let Some(index) = roster.find(&roll) else {
        warn!(roll = %roll, "roll number not in roster");
        return Outcome::UnknownAttendee { roll };
    };

    if roster.is_served(index) {
        let attendee = attendee_at(roster, index);
        warn!(roll = %attendee.roll, name = %attendee.name, "attendee already served");
        return Outcome::AlreadyServed(attendee);
    }

    roster.set_served(index, true);
    if let Err(err) = store.save(roster) {
        roster.set_served(index, false);
        error!(roll = %roll, error = %err, "failed to persist check-in, grant rolled back");
        return Outcome::PersistenceError {
            roll,
            reason: err.to_string(),
        };
    }

    let attendee = attendee_at(roster, index);
    info!(roll = %attendee.roll, name = %attendee.name, dept = %attendee.dept, "check-in granted");
    Outcome::Granted(attendee)
}

fn attendee_at(roster: &Roster, index: usize) -> Attendee {
    roster
        .attendee(index)
        .unwrap_or_else(|| unreachable!("index {index} came from Roster::find"))
}
