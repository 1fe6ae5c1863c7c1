//! qr_checkin - single-session event check-in
//!
//! An operator logs in, scans attendee QR codes, and each attendee is marked
//! served in a CSV roster at most once.
//!
//! Per scan event:
//! 1. [`Decoder`] turns a captured [`Frame`] into optional payload text
//!    (no code in view gives [`ScanOutcome::NoCodeDetected`])
//! 2. [`resolve`] parses the payload, looks up the attendee, and grants
//!    service only if they were not served before
//! 3. a grant is written through the [`RosterStore`] before it is reported
//!
//! ```no_run
//! use qr_checkin::{CheckInDesk, CsvStore, DuplicatePolicy, Frame, Operators, QrDecoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let operators = Operators::new([("DATTU", "FAREWELL")]);
//! let session = operators.authenticate("DATTU", "FAREWELL")?;
//!
//! let store = CsvStore::new("students.csv");
//! let mut desk = CheckInDesk::open(store, QrDecoder::new(), DuplicatePolicy::FirstMatch)?;
//!
//! let frame = Frame::open("capture.jpg", Some(1200))?;
//! println!("{}", desk.handle_capture(&session, &frame));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Tool configuration (JSON file + environment overrides)
pub mod config;
/// Decoder adapter (frame -> optional payload text)
pub mod decoder;
/// Scan-event orchestration and shared access
pub mod desk;
/// Error types
pub mod error;
/// Captured frames and capture directories
pub mod frame;
/// Scan payload parsing
pub mod payload;
/// Check-in resolver and outcomes
pub mod resolver;
/// Attendee roster and roster storage
pub mod roster;
/// Operator login
pub mod session;

pub use config::Config;
pub use decoder::{Decoder, QrDecoder};
pub use desk::{CheckInDesk, DuplicatePolicy, ScanOutcome, SharedDesk};
pub use error::{AuthError, ConfigError, FrameError, RosterError};
pub use frame::{Frame, captures_in};
pub use payload::parse_roll;
pub use resolver::{Outcome, Tone, resolve};
pub use roster::{Attendee, CsvStore, MemoryStore, Roster, RosterStore};
pub use session::{Operators, Session};
