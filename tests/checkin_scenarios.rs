//! End-to-end check-in scenarios against real roster files
//!
//! Each test gets its own temporary directory holding `students.csv`, so the
//! persisted state can be inspected after every scan event.

mod common;

use common::{STUDENTS, blank_frame, payload, render_qr, write_roster};
use qr_checkin::{
    AuthError, CheckInDesk, CsvStore, DuplicatePolicy, MemoryStore, Operators, Outcome,
    QrDecoder, RosterError, RosterStore, ScanOutcome, Session, Tone,
};
use rayon::prelude::*;
use std::fs;

fn operator() -> Session {
    Operators::new([("DATTU", "FAREWELL")])
        .authenticate("DATTU", "FAREWELL")
        .expect("valid operator")
}

fn csv_desk(dir: &tempfile::TempDir) -> CheckInDesk<CsvStore> {
    let path = write_roster(dir.path(), STUDENTS);
    CheckInDesk::open(CsvStore::new(path), QrDecoder::new(), DuplicatePolicy::FirstMatch)
        .expect("roster loads")
}

#[test]
fn scenario_grant_then_already_served() {
    let dir = tempfile::tempdir().unwrap();
    let mut desk = csv_desk(&dir);
    let session = operator();

    // Scenario 1
    let outcome = desk.handle_payload(&session, r#"{"roll_no": "101"}"#);
    match &outcome {
        Outcome::Granted(a) => {
            assert_eq!((a.roll.as_str(), a.name.as_str(), a.dept.as_str()), ("101", "Asha", "CS"));
            assert!(a.served);
        }
        other => panic!("expected Granted, got {other:?}"),
    }
    let persisted = desk.store().load().unwrap();
    assert!(persisted.attendee(0).unwrap().served);

    // Scenario 2
    let before = desk.roster().clone();
    let outcome = desk.handle_payload(&session, r#"{"roll_no": "101"}"#);
    assert!(matches!(outcome, Outcome::AlreadyServed(ref a) if a.roll == "101"));
    assert_eq!(outcome.tone(), Tone::Warning);
    assert_eq!(desk.roster(), &before);
}

#[test]
fn scenario_unknown_attendee() {
    let dir = tempfile::tempdir().unwrap();
    let mut desk = csv_desk(&dir);
    let before = desk.roster().clone();

    let outcome = desk.handle_payload(&operator(), r#"{"roll_no": "999"}"#);
    assert_eq!(outcome, Outcome::UnknownAttendee { roll: "999".into() });
    assert_eq!(desk.roster(), &before);
}

#[test]
fn scenario_malformed_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_roster(dir.path(), STUDENTS);
    let mut desk = CheckInDesk::open(
        CsvStore::new(&path),
        QrDecoder::new(),
        DuplicatePolicy::FirstMatch,
    )
    .unwrap();
    let session = operator();

    for raw in [
        "not json",
        r#"{"name": "Asha"}"#,
        r#"["101"]"#,
        r#"{"roll_no": 101}"#,
    ] {
        let outcome = desk.handle_payload(&session, raw);
        assert_eq!(outcome, Outcome::MalformedPayload { raw: raw.into() });
    }
    // Nothing was written, not even the added Scanned column
    assert_eq!(fs::read_to_string(&path).unwrap(), STUDENTS);
}

#[test]
fn scenario_no_code_skips_resolver() {
    let store = MemoryStore::new(STUDENTS);
    let decoder = |_: &qr_checkin::Frame| -> Option<String> { None };
    let mut desk = CheckInDesk::open(store, decoder, DuplicatePolicy::FirstMatch).unwrap();

    let outcome = desk.handle_capture(&operator(), &blank_frame(32));
    assert_eq!(outcome, ScanOutcome::NoCodeDetected);
    assert_eq!(outcome.tone(), Tone::Informational);
    assert_eq!(desk.store().saves(), 0);
    assert_eq!(desk.roster().served_count(), 0);
}

#[test]
fn every_attendee_granted_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut desk = csv_desk(&dir);
    let session = operator();
    let rolls: Vec<String> = desk.roster().iter().map(|a| a.roll).collect();

    for roll in &rolls {
        assert!(desk.handle_payload(&session, &payload(roll)).is_granted());
        for _ in 0..3 {
            assert!(matches!(
                desk.handle_payload(&session, &payload(roll)),
                Outcome::AlreadyServed(_)
            ));
        }
    }

    let persisted = desk.store().load().unwrap();
    assert_eq!(persisted.served_count(), rolls.len());
    assert_eq!(&persisted, desk.roster());
}

#[test]
fn repeated_grants_write_once() {
    let store = MemoryStore::new(STUDENTS);
    let mut desk =
        CheckInDesk::open(store, QrDecoder::new(), DuplicatePolicy::FirstMatch).unwrap();
    let session = operator();

    for _ in 0..5 {
        desk.handle_payload(&session, &payload("103"));
    }
    assert_eq!(desk.store().saves(), 1);
    assert_eq!(desk.roster().served_count(), 1);
}

#[test]
fn persistence_error_is_not_a_grant() {
    let store = MemoryStore::new(STUDENTS);
    let mut desk =
        CheckInDesk::open(store, QrDecoder::new(), DuplicatePolicy::FirstMatch).unwrap();
    let session = operator();

    desk.store().fail_saves(true);
    let outcome = desk.handle_payload(&session, &payload("102"));
    assert!(matches!(outcome, Outcome::PersistenceError { ref roll, .. } if roll == "102"));
    assert!(ScanOutcome::Resolved(outcome).is_fatal());

    // Memory agrees with storage: neither has 102 served
    assert!(!desk.roster().attendee(1).unwrap().served);
    assert!(!desk.store().load().unwrap().attendee(1).unwrap().served);

    desk.store().fail_saves(false);
    assert!(desk.handle_payload(&session, &payload("102")).is_granted());
}

#[test]
fn failed_roster_write_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let event = dir.path().join("event");
    fs::create_dir(&event).unwrap();
    let path = write_roster(&event, STUDENTS);
    let mut desk = CheckInDesk::open(
        CsvStore::new(&path),
        QrDecoder::new(),
        DuplicatePolicy::FirstMatch,
    )
    .unwrap();
    let session = operator();

    fs::remove_dir_all(&event).unwrap();
    let outcome = desk.handle_payload(&session, &payload("101"));
    match &outcome {
        Outcome::PersistenceError { roll, reason } => {
            assert_eq!(roll, "101");
            assert!(!reason.is_empty());
        }
        other => panic!("expected PersistenceError, got {other:?}"),
    }
    assert!(outcome.to_string().starts_with("NOT GRANTED"));
    assert!(!desk.roster().attendee(0).unwrap().served);
    assert_eq!(desk.roster().served_count(), 0);

    // Once the directory is back the same code is granted and written
    fs::create_dir(&event).unwrap();
    assert!(desk.handle_payload(&session, &payload("101")).is_granted());
    assert!(desk.store().load().unwrap().attendee(0).unwrap().served);
}

#[cfg(unix)]
#[test]
fn read_only_roster_dir_keeps_old_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let event = dir.path().join("event");
    fs::create_dir(&event).unwrap();
    let path = write_roster(&event, STUDENTS);
    let mut desk = CheckInDesk::open(
        CsvStore::new(&path),
        QrDecoder::new(),
        DuplicatePolicy::FirstMatch,
    )
    .unwrap();

    fs::set_permissions(&event, fs::Permissions::from_mode(0o555)).unwrap();
    // Privileged users write through read-only directories
    let writable = fs::write(event.join("write_check"), b"").is_ok();
    let outcome = desk.handle_payload(&operator(), &payload("103"));
    fs::set_permissions(&event, fs::Permissions::from_mode(0o755)).unwrap();
    if writable {
        return;
    }

    assert!(matches!(outcome, Outcome::PersistenceError { ref roll, .. } if roll == "103"));
    assert!(!desk.roster().attendee(2).unwrap().served);
    assert_eq!(fs::read_to_string(&path).unwrap(), STUDENTS);
}

#[test]
fn roster_round_trip_preserves_flags() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "Roll Number,Student Name,Department,Scanned,Phone\n\
               1,A,CS,True,555-0100\n\
               2,B,CS,False,555-0101\n\
               3,\"C, Jr\",EEE,False,\n";
    let path = write_roster(dir.path(), csv);
    let store = CsvStore::new(&path);

    let original = store.load().unwrap();
    store.save(&original).unwrap();
    let reloaded = store.load().unwrap();

    let flags = |r: &qr_checkin::Roster| r.iter().map(|a| a.served).collect::<Vec<_>>();
    assert_eq!(flags(&reloaded), vec![true, false, false]);
    assert_eq!(reloaded, original);
    assert_eq!(reloaded.attendee(2).unwrap().name, "C, Jr");
    assert!(fs::read_to_string(&path).unwrap().contains("555-0101"));
}

#[test]
fn missing_roster_refuses_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path().join("students.csv"));
    let result = CheckInDesk::open(store, QrDecoder::new(), DuplicatePolicy::FirstMatch);
    assert!(matches!(result, Err(RosterError::Io { .. })));
}

#[test]
fn duplicate_policy() {
    let csv = "Roll,Name,Dept\n7,First,CS\n7,Second,EEE\n";

    let result = CheckInDesk::open(
        MemoryStore::new(csv),
        QrDecoder::new(),
        DuplicatePolicy::Reject,
    );
    match result {
        Err(RosterError::DuplicateRoll(rolls)) => assert_eq!(rolls, vec!["7".to_string()]),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("duplicate roster was accepted"),
    }

    let mut desk = CheckInDesk::open(
        MemoryStore::new(csv),
        QrDecoder::new(),
        DuplicatePolicy::FirstMatch,
    )
    .unwrap();
    match desk.handle_payload(&operator(), &payload("7")) {
        Outcome::Granted(a) => assert_eq!(a.name, "First"),
        other => panic!("expected Granted, got {other:?}"),
    }
}

#[test]
fn bad_credentials_yield_no_session() {
    let operators = Operators::new([("DATTU", "FAREWELL")]);
    assert_eq!(
        operators.authenticate("DATTU", "wrong"),
        Err(AuthError::InvalidCredentials)
    );
}

#[test]
fn shared_desk_grants_at_most_once() {
    let store = MemoryStore::new(STUDENTS);
    let desk = CheckInDesk::open(store, QrDecoder::new(), DuplicatePolicy::FirstMatch)
        .unwrap()
        .into_shared();
    let session = operator();

    let outcomes: Vec<Outcome> = (0..64)
        .into_par_iter()
        .map(|i| {
            let roll = if i % 2 == 0 { "101" } else { "104" };
            desk.handle_payload(&session, &payload(roll))
        })
        .collect();

    let granted = outcomes.iter().filter(|o| o.is_granted()).count();
    let already = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::AlreadyServed(_)))
        .count();
    assert_eq!(granted, 2);
    assert_eq!(already, 62);
    desk.with_desk(|d| {
        assert_eq!(d.store().saves(), 2);
        assert_eq!(d.roster().served_count(), 2);
    });
}

#[test]
fn shared_desk_decodes_frames() {
    let store = MemoryStore::new(STUDENTS);
    let desk = CheckInDesk::open(store, QrDecoder::new(), DuplicatePolicy::FirstMatch)
        .unwrap()
        .into_shared();
    let session = operator();

    let frame = render_qr(&payload("102"));
    let first = desk.handle_capture(&session, &frame);
    assert!(matches!(first, ScanOutcome::Resolved(Outcome::Granted(ref a)) if a.name == "Ravi"));

    let second = desk.handle_capture(&session, &frame);
    assert!(matches!(second, ScanOutcome::Resolved(Outcome::AlreadyServed(_))));

    assert_eq!(desk.handle_capture(&session, &blank_frame(64)), ScanOutcome::NoCodeDetected);
}
