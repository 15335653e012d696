use std::rc::Rc;

use pretty_assertions::assert_eq;
use reporta_core::catalog::IncidentCatalog;
use reporta_core::domain::{Priority, ReportStatus, Role};
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

fn one_officer() -> Vec<DirectoryEntry> {
    vec![DirectoryEntry {
        user_id: "carlos".to_string(),
        name: "Carlos López".to_string(),
        email: "carlos@campus.example".to_string(),
        assigned_zones: vec!["Biblioteca Central".to_string()],
        active: true,
    }]
}

fn user() -> SessionContext {
    SessionContext::new("session-user", Some("U1234567"), Role::User)
}

fn admin() -> SessionContext {
    SessionContext::new("session-admin", Some("admin-garcia"), Role::Admin)
}

fn officer() -> SessionContext {
    SessionContext::new("session-carlos", Some("carlos"), Role::Security)
}

fn sample_report() -> NewReport {
    NewReport {
        incident_type: "vandalismo".to_string(),
        zone: "Biblioteca Central".to_string(),
        description: "grafitis".to_string(),
        is_anonymous: false,
        reporter: None,
    }
}

#[test]
fn workflow_skips_are_impossible() {
    let (mut engine, _clock) = engine();
    engine.sync_officer_directory(&one_officer());
    let report = engine.file_report(&user(), sample_report()).expect("file");

    // new -> pending_approval: nothing is assigned yet, so the officer guard
    // fires first and the status is untouched.
    let err = engine
        .submit_for_approval(&officer(), &report.id, "skip ahead")
        .unwrap_err();
    assert_eq!(err.code, "INVALID_TRANSITION");

    // new -> resolved.
    let err = engine
        .decide_approval(&admin(), &report.id, true, None)
        .unwrap_err();
    assert_eq!(err.code, "INVALID_TRANSITION");

    // Double-click on classify: the second attempt finds the report no longer
    // new and fails without partial effects.
    engine.classify(&admin(), &report.id, None).expect("classify");
    let err = engine.classify(&admin(), &report.id, None).unwrap_err();
    assert_eq!(err.code, "INVALID_TRANSITION");

    let current = engine.report(Role::Admin, &report.id).expect("get");
    assert_eq!(current.status, ReportStatus::InProgress);
    assert_eq!(current.resolved_at, None);
}

#[test]
fn cancellation_only_from_new_or_in_progress() {
    let (mut engine, _clock) = engine();
    engine.sync_officer_directory(&one_officer());

    // From new: fine.
    let a = engine.file_report(&user(), sample_report()).expect("file");
    let a = engine.cancel(&user(), &a.id).expect("cancel new");
    assert_eq!(a.status, ReportStatus::Cancelled);

    // Cancelled is terminal, a second cancel fails.
    let err = engine.cancel(&user(), &a.id).unwrap_err();
    assert_eq!(err.code, "INVALID_TRANSITION");

    // From in_progress with an officer: officer is released.
    let b = engine.file_report(&user(), sample_report()).expect("file");
    engine.classify(&admin(), &b.id, None).expect("classify");
    engine.assign_to_security(&admin(), &b.id).expect("assign");
    let b = engine.cancel(&admin(), &b.id).expect("cancel in progress");
    assert_eq!(b.status, ReportStatus::Cancelled);
    assert!(engine.officers()[0].active_report_ids.is_empty());

    // From pending_approval: rejected.
    let c = engine.file_report(&user(), sample_report()).expect("file");
    engine.classify(&admin(), &c.id, None).expect("classify");
    engine.assign_to_security(&admin(), &c.id).expect("assign");
    engine
        .submit_for_approval(&officer(), &c.id, "done")
        .expect("submit");
    let err = engine.cancel(&admin(), &c.id).unwrap_err();
    assert_eq!(err.code, "INVALID_TRANSITION");
}

#[test]
fn users_cannot_cancel_other_sessions_reports() {
    let (mut engine, _clock) = engine();
    let report = engine.file_report(&user(), sample_report()).expect("file");

    let stranger = SessionContext::new("session-other", Some("U0000001"), Role::User);
    let err = engine.cancel(&stranger, &report.id).unwrap_err();
    assert_eq!(err.code, "UNAUTHORIZED");

    // Admin can cancel anyone's report.
    let report = engine.cancel(&admin(), &report.id).expect("admin cancel");
    assert_eq!(report.status, ReportStatus::Cancelled);
}

#[test]
fn non_admin_roles_cannot_run_admin_commands() {
    let (mut engine, _clock) = engine();
    let report = engine.file_report(&user(), sample_report()).expect("file");

    let err = engine.classify(&user(), &report.id, None).unwrap_err();
    assert_eq!(err.code, "UNAUTHORIZED");
    let err = engine.assign_to_security(&officer(), &report.id).unwrap_err();
    assert_eq!(err.code, "UNAUTHORIZED");
    let err = engine
        .update_priority(&user(), &report.id, Priority::High)
        .unwrap_err();
    assert_eq!(err.code, "UNAUTHORIZED");
}

#[test]
fn only_the_assigned_officer_can_submit_for_approval() {
    let (mut engine, _clock) = engine();
    engine.sync_officer_directory(&[
        DirectoryEntry {
            user_id: "carlos".to_string(),
            name: "Carlos López".to_string(),
            email: "carlos@campus.example".to_string(),
            assigned_zones: vec!["Biblioteca Central".to_string()],
            active: true,
        },
        DirectoryEntry {
            user_id: "ana".to_string(),
            name: "Ana Rodríguez".to_string(),
            email: "ana@campus.example".to_string(),
            assigned_zones: vec!["Cafetería Norte".to_string()],
            active: true,
        },
    ]);

    let report = engine.file_report(&user(), sample_report()).expect("file");
    engine.classify(&admin(), &report.id, None).expect("classify");
    engine.assign_to_security(&admin(), &report.id).expect("assign");

    // Ana is not the assigned officer: a guard failure on the transition.
    let ana = SessionContext::new("session-ana", Some("ana"), Role::Security);
    let err = engine
        .submit_for_approval(&ana, &report.id, "not my case")
        .unwrap_err();
    assert_eq!(err.code, "INVALID_TRANSITION");

    // Empty narrative is rejected even for the right officer.
    let err = engine
        .submit_for_approval(&officer(), &report.id, "   ")
        .unwrap_err();
    assert_eq!(err.code, "INVALID_TRANSITION");

    let current = engine.report(Role::Admin, &report.id).expect("get");
    assert_eq!(current.status, ReportStatus::InProgress);
    assert_eq!(current.security_narrative, None);
}

#[test]
fn priority_is_frozen_on_terminal_reports() {
    let (mut engine, _clock) = engine();
    engine.sync_officer_directory(&one_officer());

    let report = engine.file_report(&user(), sample_report()).expect("file");
    engine
        .update_priority(&admin(), &report.id, Priority::High)
        .expect("re-classify while new");

    engine.classify(&admin(), &report.id, None).expect("classify");
    engine.assign_to_security(&admin(), &report.id).expect("assign");
    engine
        .submit_for_approval(&officer(), &report.id, "done")
        .expect("submit");
    engine
        .decide_approval(&admin(), &report.id, true, None)
        .expect("approve");

    let err = engine
        .update_priority(&admin(), &report.id, Priority::Low)
        .unwrap_err();
    assert_eq!(err.code, "INVALID_TRANSITION");
}
