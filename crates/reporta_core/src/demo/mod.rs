use serde::{Deserialize, Serialize};

use crate::domain::{ReporterIdentity, Role};
use crate::error::AppError;
use crate::registry::DirectoryEntry;
use crate::store::NewReport;
use crate::workflow::{SessionContext, WorkflowCoordinator};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DemoSeedSummary {
    pub officers: usize,
    pub reports: usize,
}

fn directory() -> Vec<DirectoryEntry> {
    vec![
        DirectoryEntry {
            user_id: "carlos".to_string(),
            name: "Carlos López".to_string(),
            email: "carlos@campus.example".to_string(),
            assigned_zones: vec![
                "Biblioteca Central".to_string(),
                "Zona Deportiva".to_string(),
            ],
            active: true,
        },
        DirectoryEntry {
            user_id: "ana".to_string(),
            name: "Ana Rodríguez".to_string(),
            email: "ana@campus.example".to_string(),
            assigned_zones: vec![
                "Cafetería Norte".to_string(),
                "Estacionamiento Este".to_string(),
            ],
            active: true,
        },
    ]
}

/// Seed a deterministic sample dataset large enough to exercise every
/// dashboard: one case walked through assignment and approval, one anonymous
/// report still new, one case parked at pending approval.
pub fn seed_demo_dataset(coordinator: &mut WorkflowCoordinator) -> Result<DemoSeedSummary, AppError> {
    coordinator.sync_officer_directory(&directory());

    let juan = SessionContext::new("demo_session_user", Some("U1234567"), Role::User);
    let maria = SessionContext::new("demo_session_other", Some("U9876543"), Role::User);
    let anonymous = SessionContext::new("demo_session_anonymous", None, Role::User);
    let admin = SessionContext::new("demo_session_admin", Some("admin-garcia"), Role::Admin);
    let carlos = SessionContext::new("demo_session_carlos", Some("carlos"), Role::Security);
    let ana = SessionContext::new("demo_session_ana", Some("ana"), Role::Security);

    // Case 1: laptop theft, assigned to Carlos and still in the field.
    let theft = coordinator.file_report(
        &juan,
        NewReport {
            incident_type: "robo".to_string(),
            zone: "Biblioteca Central".to_string(),
            description: "Robo de laptop en el segundo piso de la biblioteca".to_string(),
            is_anonymous: false,
            reporter: Some(ReporterIdentity {
                user_id: "U1234567".to_string(),
                name: "Juan Pérez".to_string(),
                email: "U1234567@utp.edu.pe".to_string(),
                role: Role::User,
            }),
        },
    )?;
    coordinator.classify(&admin, &theft.id, None)?;
    coordinator.assign_to_security(&admin, &theft.id)?;
    coordinator.report_progress(&carlos, &theft.id, "Revisando cámaras del segundo piso")?;

    // Case 2: anonymous loitering report, waiting for admin review.
    coordinator.file_report(
        &anonymous,
        NewReport {
            incident_type: "sospechoso".to_string(),
            zone: "Estacionamiento Este".to_string(),
            description: "Persona merodeando en el estacionamiento de estudiantes".to_string(),
            is_anonymous: true,
            reporter: None,
        },
    )?;

    // Case 3: vandalism walked up to pending approval by Ana.
    let vandalism = coordinator.file_report(
        &maria,
        NewReport {
            incident_type: "vandalismo".to_string(),
            zone: "Cafetería Norte".to_string(),
            description: "Grafitis en las paredes del baño de la cafetería".to_string(),
            is_anonymous: false,
            reporter: Some(ReporterIdentity {
                user_id: "U9876543".to_string(),
                name: "María García".to_string(),
                email: "U9876543@utp.edu.pe".to_string(),
                role: Role::User,
            }),
        },
    )?;
    coordinator.classify(&admin, &vandalism.id, None)?;
    coordinator.assign_to_security(&admin, &vandalism.id)?;
    coordinator.submit_for_approval(
        &ana,
        &vandalism.id,
        "Revisé la zona y confirmé el vandalismo. Evidencia fotográfica tomada; \
         personal de limpieza contactado.",
    )?;

    Ok(DemoSeedSummary {
        officers: coordinator.officers().len(),
        reports: coordinator.reports(Role::Admin, None, None).len(),
    })
}
