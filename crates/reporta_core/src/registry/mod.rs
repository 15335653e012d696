use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{OfficerStatus, SecurityOfficer};
use crate::error::AppError;

/// One security account as supplied by the external officer directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub assigned_zones: Vec<String>,
    pub active: bool,
}

/// Pool of security officers and their operational state.
///
/// Identity data (names, zones) mirrors the directory; only status, current
/// zone and case load are owned here. Registry order is stable and drives the
/// candidate search, so officers are kept in the order the directory first
/// introduced them.
#[derive(Debug, Default)]
pub struct OfficerRegistry {
    officers: Vec<SecurityOfficer>,
}

impl OfficerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additive re-sync against the directory.
    ///
    /// New entries become `available` officers; entries flagged inactive go
    /// `offline` (their active cases are kept so an eventual release still
    /// balances). Existing officers keep their operational state, only the
    /// mirrored identity fields are refreshed.
    pub fn sync_directory(&mut self, entries: &[DirectoryEntry], now: OffsetDateTime) {
        for entry in entries {
            match self.officers.iter_mut().find(|o| o.user_id == entry.user_id) {
                Some(officer) => {
                    officer.name = entry.name.clone();
                    officer.assigned_zones = entry.assigned_zones.clone();
                    officer.contact_info = entry.email.clone();
                    if !entry.active {
                        officer.status = OfficerStatus::Offline;
                    } else if officer.status == OfficerStatus::Offline {
                        officer.status = if officer.active_report_ids.is_empty() {
                            OfficerStatus::Available
                        } else {
                            OfficerStatus::Busy
                        };
                    }
                    officer.last_update = now;
                }
                None => {
                    let badge = format!("SEC-{:03}", self.officers.len() + 1);
                    self.officers.push(SecurityOfficer {
                        id: format!("sec_{}", entry.user_id),
                        user_id: entry.user_id.clone(),
                        name: entry.name.clone(),
                        badge,
                        status: if entry.active {
                            OfficerStatus::Available
                        } else {
                            OfficerStatus::Offline
                        },
                        current_zone: None,
                        assigned_zones: entry.assigned_zones.clone(),
                        active_report_ids: Vec::new(),
                        contact_info: entry.email.clone(),
                        last_update: now,
                    });
                }
            }
        }
    }

    /// Candidate search: first available officer covering the zone, then any
    /// available officer, both in registry order. Busy and offline officers
    /// are never candidates.
    pub fn find_candidate(&self, zone: &str) -> Option<&SecurityOfficer> {
        self.officers
            .iter()
            .find(|o| {
                o.status == OfficerStatus::Available
                    && o.assigned_zones.iter().any(|z| z == zone)
            })
            .or_else(|| {
                self.officers
                    .iter()
                    .find(|o| o.status == OfficerStatus::Available)
            })
    }

    /// Bind a report to an officer. Callers hand over only officers returned
    /// by `find_candidate` within the same command step, so the officer is
    /// known to be available.
    pub fn assign(
        &mut self,
        officer_id: &str,
        report_id: &str,
        zone: &str,
        now: OffsetDateTime,
    ) -> Result<&SecurityOfficer, AppError> {
        let officer = self.get_mut(officer_id)?;
        officer.active_report_ids.push(report_id.to_string());
        officer.status = OfficerStatus::Busy;
        officer.current_zone = Some(zone.to_string());
        officer.last_update = now;
        Ok(officer)
    }

    /// Drop a report from an officer's load; back to `available` when the last
    /// case is gone. Unknown report ids are ignored (release is idempotent).
    pub fn release(
        &mut self,
        officer_id: &str,
        report_id: &str,
        now: OffsetDateTime,
    ) -> Result<(), AppError> {
        let officer = self.get_mut(officer_id)?;
        officer.active_report_ids.retain(|id| id != report_id);
        if officer.active_report_ids.is_empty() && officer.status == OfficerStatus::Busy {
            officer.status = OfficerStatus::Available;
            officer.current_zone = None;
        }
        officer.last_update = now;
        Ok(())
    }

    /// Manual operational override (e.g. going off-duty). Does not touch the
    /// active case list.
    pub fn set_status(
        &mut self,
        officer_id: &str,
        status: OfficerStatus,
        zone: Option<String>,
        now: OffsetDateTime,
    ) -> Result<(), AppError> {
        let officer = self.get_mut(officer_id)?;
        officer.status = status;
        officer.current_zone = match status {
            OfficerStatus::Busy => zone.or_else(|| officer.current_zone.clone()),
            _ => None,
        };
        officer.last_update = now;
        Ok(())
    }

    pub fn get(&self, officer_id: &str) -> Result<&SecurityOfficer, AppError> {
        self.officers
            .iter()
            .find(|o| o.id == officer_id)
            .ok_or_else(|| AppError::officer_not_found(officer_id))
    }

    fn get_mut(&mut self, officer_id: &str) -> Result<&mut SecurityOfficer, AppError> {
        self.officers
            .iter_mut()
            .find(|o| o.id == officer_id)
            .ok_or_else(|| AppError::officer_not_found(officer_id))
    }

    pub fn officers(&self) -> &[SecurityOfficer] {
        &self.officers
    }

    pub fn available_officers(&self) -> Vec<&SecurityOfficer> {
        self.officers
            .iter()
            .filter(|o| o.status == OfficerStatus::Available)
            .collect()
    }

    pub fn officers_for_zone(&self, zone: &str) -> Vec<&SecurityOfficer> {
        self.officers
            .iter()
            .filter(|o| {
                o.status != OfficerStatus::Offline
                    && o.assigned_zones.iter().any(|z| z == zone)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn entry(user_id: &str, zones: &[&str]) -> DirectoryEntry {
        DirectoryEntry {
            user_id: user_id.to_string(),
            name: format!("Officer {user_id}"),
            email: format!("{user_id}@campus.example"),
            assigned_zones: zones.iter().map(|z| z.to_string()).collect(),
            active: true,
        }
    }

    #[test]
    fn candidate_prefers_zone_match_then_any_available() {
        let now = datetime!(2026-03-10 08:00:00 UTC);
        let mut registry = OfficerRegistry::new();
        registry.sync_directory(
            &[entry("u1", &["Biblioteca Central"]), entry("u2", &["Cafetería Norte"])],
            now,
        );

        let candidate = registry.find_candidate("Cafetería Norte").unwrap();
        assert_eq!(candidate.id, "sec_u2");

        // No zone coverage: first available in registry order.
        let candidate = registry.find_candidate("Zona Deportiva").unwrap();
        assert_eq!(candidate.id, "sec_u1");
    }

    #[test]
    fn release_restores_availability_only_when_load_empty() {
        let now = datetime!(2026-03-10 08:00:00 UTC);
        let mut registry = OfficerRegistry::new();
        registry.sync_directory(&[entry("u1", &["Biblioteca Central"])], now);

        registry.assign("sec_u1", "r1", "Biblioteca Central", now).unwrap();
        assert_eq!(registry.get("sec_u1").unwrap().status, OfficerStatus::Busy);
        assert!(registry.find_candidate("Biblioteca Central").is_none());

        registry.release("sec_u1", "r1", now).unwrap();
        let officer = registry.get("sec_u1").unwrap();
        assert_eq!(officer.status, OfficerStatus::Available);
        assert_eq!(officer.current_zone, None);
        assert!(officer.active_report_ids.is_empty());
    }

    #[test]
    fn deactivated_directory_entry_goes_offline() {
        let now = datetime!(2026-03-10 08:00:00 UTC);
        let mut registry = OfficerRegistry::new();
        registry.sync_directory(&[entry("u1", &["Biblioteca Central"])], now);

        let mut inactive = entry("u1", &["Biblioteca Central"]);
        inactive.active = false;
        registry.sync_directory(&[inactive], now);

        assert_eq!(registry.get("sec_u1").unwrap().status, OfficerStatus::Offline);
        assert!(registry.find_candidate("Biblioteca Central").is_none());
    }
}
