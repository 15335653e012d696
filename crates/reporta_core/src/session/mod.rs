use time::OffsetDateTime;

use crate::domain::{Report, Role};

/// Maximum reports one session may file per UTC calendar day.
pub const DAILY_REPORT_LIMIT: usize = 3;

/// Count of reports the session created on the calendar day of `now` (UTC).
///
/// Pure predicate over the store's current snapshot; anonymous and identified
/// reports count alike.
pub fn reports_today(reports: &[Report], session_id: &str, now: OffsetDateTime) -> usize {
    let today = now.date();
    reports
        .iter()
        .filter(|r| r.session_id == session_id && r.created_at.date() == today)
        .count()
}

pub fn can_create_report(reports: &[Report], session_id: &str, now: OffsetDateTime) -> bool {
    reports_today(reports, session_id, now) < DAILY_REPORT_LIMIT
}

/// Ownership check for user-initiated actions on a report.
///
/// Users may only act on reports filed from their own session; admin and
/// superuser may act on any report. Security has no ownership claim here (its
/// guards key off the assigned officer, not the creating session).
pub fn assert_ownership(report: &Report, session_id: &str, role: Role) -> bool {
    match role {
        Role::Admin | Role::Superuser => true,
        Role::User => report.session_id == session_id,
        Role::Security => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, ReportStatus};
    use time::macros::datetime;

    fn report(session_id: &str, created_at: OffsetDateTime) -> Report {
        Report {
            id: "r1".to_string(),
            status: ReportStatus::New,
            priority: Priority::Medium,
            incident_type: "sospechoso".to_string(),
            zone: "Patio Central".to_string(),
            description: "test".to_string(),
            is_anonymous: true,
            reporter: None,
            session_id: session_id.to_string(),
            assigned_officer_id: None,
            assigned_officer_name: None,
            security_narrative: None,
            approval_comments: None,
            approved_by: None,
            approval_timestamp: None,
            created_at,
            updated_at: created_at,
            resolved_at: None,
            field_work_ended_at: None,
        }
    }

    #[test]
    fn counts_only_same_session_same_day() {
        let now = datetime!(2026-03-10 15:00:00 UTC);
        let reports = vec![
            report("s1", datetime!(2026-03-10 08:00:00 UTC)),
            report("s1", datetime!(2026-03-09 23:59:00 UTC)),
            report("s2", datetime!(2026-03-10 09:00:00 UTC)),
        ];
        assert_eq!(reports_today(&reports, "s1", now), 1);
        assert!(can_create_report(&reports, "s1", now));
    }

    #[test]
    fn ownership_is_role_gated() {
        let now = datetime!(2026-03-10 15:00:00 UTC);
        let r = report("s1", now);
        assert!(assert_ownership(&r, "s1", Role::User));
        assert!(!assert_ownership(&r, "s2", Role::User));
        assert!(assert_ownership(&r, "s2", Role::Admin));
        assert!(assert_ownership(&r, "s2", Role::Superuser));
        assert!(!assert_ownership(&r, "s1", Role::Security));
    }
}
