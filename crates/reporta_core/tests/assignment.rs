use std::rc::Rc;

use pretty_assertions::assert_eq;
use reporta_core::catalog::IncidentCatalog;
use reporta_core::domain::{OfficerStatus, ReportStatus, Role};
use reporta_core::registry::DirectoryEntry;
use reporta_core::store::NewReport;
use reporta_core::workflow::{ManualClock, SessionContext, WorkflowCoordinator};
use time::macros::datetime;

fn engine() -> (WorkflowCoordinator, Rc<ManualClock>) {
    let clock = ManualClock::starting_at(datetime!(2026-03-10 09:00:00 UTC));
    let coordinator = WorkflowCoordinator::with_clock(
        IncidentCatalog::campus_default(),
        Box::new(clock.clone()),
    );
    (coordinator, clock)
}

fn officer_entry(user_id: &str, zones: &[&str]) -> DirectoryEntry {
    DirectoryEntry {
        user_id: user_id.to_string(),
        name: format!("Officer {user_id}"),
        email: format!("{user_id}@campus.example"),
        assigned_zones: zones.iter().map(|z| z.to_string()).collect(),
        active: true,
    }
}

fn user() -> SessionContext {
    SessionContext::new("session-user", None, Role::User)
}

fn admin() -> SessionContext {
    SessionContext::new("session-admin", Some("admin-garcia"), Role::Admin)
}

fn report_in(zone: &str) -> NewReport {
    NewReport {
        incident_type: "robo".to_string(),
        zone: zone.to_string(),
        description: "incidente".to_string(),
        is_anonymous: true,
        reporter: None,
    }
}

fn filed_in_progress(engine: &mut WorkflowCoordinator, zone: &str) -> String {
    let report = engine.file_report(&user(), report_in(zone)).expect("file");
    engine.classify(&admin(), &report.id, None).expect("classify");
    report.id
}

#[test]
fn zone_officer_is_preferred_over_registry_order() {
    let (mut engine, _clock) = engine();
    engine.sync_officer_directory(&[
        officer_entry("first", &["Cafetería Norte"]),
        officer_entry("second", &["Biblioteca Central"]),
    ]);

    let id = filed_in_progress(&mut engine, "Biblioteca Central");
    let report = engine.assign_to_security(&admin(), &id).expect("assign");
    assert_eq!(report.assigned_officer_id.as_deref(), Some("sec_second"));
}

#[test]
fn falls_back_to_any_available_officer() {
    let (mut engine, _clock) = engine();
    engine.sync_officer_directory(&[
        officer_entry("first", &["Cafetería Norte"]),
        officer_entry("second", &["Zona Deportiva"]),
    ]);

    let id = filed_in_progress(&mut engine, "Biblioteca Central");
    let report = engine.assign_to_security(&admin(), &id).expect("assign");
    // No zone match: first available in registry order.
    assert_eq!(report.assigned_officer_id.as_deref(), Some("sec_first"));
}

#[test]
fn no_candidate_surfaces_a_retryable_failure_without_mutation() {
    let (mut engine, _clock) = engine();
    // Single officer, already saturated by the first case.
    engine.sync_officer_directory(&[officer_entry("solo", &["Biblioteca Central"])]);

    let first = filed_in_progress(&mut engine, "Biblioteca Central");
    engine.assign_to_security(&admin(), &first).expect("first assign");

    let second = filed_in_progress(&mut engine, "Biblioteca Central");
    let err = engine.assign_to_security(&admin(), &second).unwrap_err();
    assert_eq!(err.code, "NO_CANDIDATE_OFFICER");
    assert!(err.retryable);

    // The report stays assignable, nothing was half-applied.
    let report = engine.report(Role::Admin, &second).expect("get");
    assert_eq!(report.status, ReportStatus::InProgress);
    assert_eq!(report.assigned_officer_id, None);

    // Freeing the officer makes the retry succeed.
    let carlos = SessionContext::new("session-solo", Some("solo"), Role::Security);
    engine
        .submit_for_approval(&carlos, &first, "done")
        .expect("submit");
    engine
        .decide_approval(&admin(), &first, true, None)
        .expect("approve");
    let report = engine.assign_to_security(&admin(), &second).expect("retry");
    assert_eq!(report.assigned_officer_id.as_deref(), Some("sec_solo"));
}

#[test]
fn busy_and_offline_officers_are_never_candidates() {
    let (mut engine, _clock) = engine();
    engine.sync_officer_directory(&[
        officer_entry("first", &["Biblioteca Central"]),
        officer_entry("second", &["Biblioteca Central"]),
    ]);

    // Saturate the first officer.
    let a = filed_in_progress(&mut engine, "Biblioteca Central");
    let assigned = engine.assign_to_security(&admin(), &a).expect("assign");
    assert_eq!(assigned.assigned_officer_id.as_deref(), Some("sec_first"));

    // Second case lands on the second officer.
    let b = filed_in_progress(&mut engine, "Biblioteca Central");
    let assigned = engine.assign_to_security(&admin(), &b).expect("assign");
    assert_eq!(assigned.assigned_officer_id.as_deref(), Some("sec_second"));

    // Off-duty officers are skipped too.
    engine
        .set_officer_status("sec_first", OfficerStatus::Offline, None)
        .expect("set status");
    let other = SessionContext::new("session-other", None, Role::User);
    let c = engine
        .file_report(&other, report_in("Biblioteca Central"))
        .expect("file");
    engine.classify(&admin(), &c.id, None).expect("classify");
    let err = engine.assign_to_security(&admin(), &c.id).unwrap_err();
    assert_eq!(err.code, "NO_CANDIDATE_OFFICER");
}

#[test]
fn directory_resync_is_additive_and_preserves_load() {
    let (mut engine, _clock) = engine();
    engine.sync_officer_directory(&[officer_entry("first", &["Biblioteca Central"])]);

    let id = filed_in_progress(&mut engine, "Biblioteca Central");
    engine.assign_to_security(&admin(), &id).expect("assign");

    // Re-sync with a renamed entry plus a new hire.
    let mut renamed = officer_entry("first", &["Biblioteca Central", "Zona Deportiva"]);
    renamed.name = "Carlos López".to_string();
    engine.sync_officer_directory(&[renamed, officer_entry("new", &["Cafetería Norte"])]);

    let officers = engine.officers();
    assert_eq!(officers.len(), 2);
    assert_eq!(officers[0].name, "Carlos López");
    assert_eq!(officers[0].status, OfficerStatus::Busy);
    assert_eq!(officers[0].active_report_ids, vec![id]);
    assert_eq!(officers[1].id, "sec_new");
    assert_eq!(officers[1].status, OfficerStatus::Available);
}
