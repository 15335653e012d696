use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::IncidentCatalog;
use crate::domain::{Priority, Report, ReportStatus, ReporterIdentity, Role};
use crate::error::{code, AppError};
use crate::session;

/// Creation payload for `ReportStore::create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewReport {
    pub incident_type: String,
    pub zone: String,
    pub description: String,
    pub is_anonymous: bool,
    pub reporter: Option<ReporterIdentity>,
}

/// The lifecycle transition table. Everything outside this table is rejected
/// with `INVALID_TRANSITION`; the `in_progress -> in_progress` row is the
/// officer-assignment step.
pub fn can_transition(from: ReportStatus, to: ReportStatus) -> bool {
    use ReportStatus::*;
    matches!(
        (from, to),
        (New, InProgress)
            | (New, Cancelled)
            | (InProgress, InProgress)
            | (InProgress, Cancelled)
            | (InProgress, PendingApproval)
            | (PendingApproval, Resolved)
            | (PendingApproval, InProgress)
            | (Resolved, Closed)
    )
}

/// Authoritative in-memory collection of reports.
///
/// All mutation goes through the operations below; each operation checks its
/// guards and applies its effect in one synchronous step, so callers never
/// observe a half-applied transition.
#[derive(Debug, Default)]
pub struct ReportStore {
    reports: Vec<Report>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a new report. Consults the session guard first: the fourth report
    /// of a session on one calendar day is rejected, never silently dropped.
    pub fn create(
        &mut self,
        data: NewReport,
        session_id: &str,
        catalog: &IncidentCatalog,
        now: OffsetDateTime,
    ) -> Result<Report, AppError> {
        if !session::can_create_report(&self.reports, session_id, now) {
            return Err(AppError::new(
                code::DAILY_LIMIT_EXCEEDED,
                "Daily report limit reached for this session",
            )
            .with_details(format!(
                "session={session_id}; limit={}",
                session::DAILY_REPORT_LIMIT
            )));
        }

        let report = Report {
            id: Uuid::new_v4().to_string(),
            status: ReportStatus::New,
            priority: catalog.priority_for(&data.incident_type),
            incident_type: data.incident_type,
            zone: data.zone,
            description: data.description,
            is_anonymous: data.is_anonymous,
            reporter: data.reporter,
            session_id: session_id.to_string(),
            assigned_officer_id: None,
            assigned_officer_name: None,
            security_narrative: None,
            approval_comments: None,
            approved_by: None,
            approval_timestamp: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            field_work_ended_at: None,
        };
        self.reports.push(report.clone());
        Ok(report)
    }

    /// Low-level guarded status change. Stamps `resolved_at` exactly when the
    /// report enters `resolved`.
    fn transition(
        &mut self,
        id: &str,
        to: ReportStatus,
        now: OffsetDateTime,
    ) -> Result<&mut Report, AppError> {
        let report = Self::find_mut(&mut self.reports, id)?;
        if !can_transition(report.status, to) {
            return Err(AppError::invalid_transition(format!(
                "Cannot move report from {} to {}",
                report.status.label(),
                to.label()
            ))
            .with_details(format!("id={id}")));
        }
        report.status = to;
        if to == ReportStatus::Resolved {
            report.resolved_at = Some(now);
        }
        report.updated_at = now;
        Ok(report)
    }

    /// Admin review: `new -> in_progress`. The officer is not yet bound; the
    /// assignment step follows as its own transition.
    pub fn begin_investigation(
        &mut self,
        id: &str,
        now: OffsetDateTime,
    ) -> Result<Report, AppError> {
        let current = self.get(id)?.status;
        if current != ReportStatus::New {
            return Err(AppError::invalid_transition(format!(
                "Only new reports can enter review (report is {})",
                current.label()
            ))
            .with_details(format!("id={id}")));
        }
        Ok(self.transition(id, ReportStatus::InProgress, now)?.clone())
    }

    /// Bind an officer to an `in_progress` report (the assignment row of the
    /// table). The caller has already reserved the officer via the registry.
    pub fn bind_officer(
        &mut self,
        id: &str,
        officer_id: &str,
        officer_name: &str,
        now: OffsetDateTime,
    ) -> Result<Report, AppError> {
        let current = self.get(id)?.status;
        if current != ReportStatus::InProgress {
            return Err(AppError::invalid_transition(format!(
                "Only in-progress reports can be assigned (report is {})",
                current.label()
            ))
            .with_details(format!("id={id}")));
        }
        let report = self.transition(id, ReportStatus::InProgress, now)?;
        report.assigned_officer_id = Some(officer_id.to_string());
        report.assigned_officer_name = Some(officer_name.to_string());
        Ok(report.clone())
    }

    /// Officer hands the case over: `in_progress -> pending_approval`.
    ///
    /// Guards: the caller must be the assigned officer and the narrative must
    /// be non-empty. No partial mutation on failure.
    pub fn submit_narrative(
        &mut self,
        id: &str,
        officer_id: &str,
        narrative: &str,
        now: OffsetDateTime,
    ) -> Result<Report, AppError> {
        let report = self.get(id)?;
        if report.assigned_officer_id.as_deref() != Some(officer_id) {
            return Err(AppError::invalid_transition(
                "Only the assigned officer can submit this report for approval",
            )
            .with_details(format!("id={id}; officer={officer_id}")));
        }
        if narrative.trim().is_empty() {
            return Err(AppError::invalid_transition(
                "A non-empty security narrative is required for approval",
            )
            .with_details(format!("id={id}")));
        }
        let report = self.transition(id, ReportStatus::PendingApproval, now)?;
        report.security_narrative = Some(narrative.to_string());
        report.field_work_ended_at = Some(now);
        Ok(report.clone())
    }

    /// Admin approval decision on a `pending_approval` report.
    ///
    /// Approved: `-> resolved`, `resolved_at` stamped. Rejected: back to
    /// `in_progress`, comments stored, the officer keeps the case.
    pub fn decide_approval(
        &mut self,
        id: &str,
        approved: bool,
        comments: Option<String>,
        approved_by: &str,
        now: OffsetDateTime,
    ) -> Result<Report, AppError> {
        let current = self.get(id)?.status;
        if current != ReportStatus::PendingApproval {
            return Err(AppError::invalid_transition(format!(
                "Only pending-approval reports can be decided (report is {})",
                current.label()
            ))
            .with_details(format!("id={id}")));
        }
        let to = if approved {
            ReportStatus::Resolved
        } else {
            ReportStatus::InProgress
        };
        let report = self.transition(id, to, now)?;
        report.approval_comments = comments;
        report.approved_by = Some(approved_by.to_string());
        report.approval_timestamp = Some(now);
        Ok(report.clone())
    }

    /// Cosmetic archive step: `resolved -> closed`.
    pub fn close(&mut self, id: &str, now: OffsetDateTime) -> Result<Report, AppError> {
        Ok(self.transition(id, ReportStatus::Closed, now)?.clone())
    }

    /// Cancellation: ownership-gated, only from `new` or `in_progress`.
    pub fn cancel(
        &mut self,
        id: &str,
        role: Role,
        session_id: &str,
        now: OffsetDateTime,
    ) -> Result<Report, AppError> {
        let report = self.get(id)?;
        if !session::assert_ownership(report, session_id, role) {
            return Err(AppError::unauthorized(
                "Only the reporting session or an administrator can cancel a report",
            )
            .with_details(format!("id={id}; session={session_id}")));
        }
        if !report.status.is_cancellable() {
            return Err(AppError::invalid_transition(format!(
                "Reports can only be cancelled while new or in progress (report is {})",
                report.status.label()
            ))
            .with_details(format!("id={id}")));
        }
        Ok(self.transition(id, ReportStatus::Cancelled, now)?.clone())
    }

    /// Admin re-classification; allowed at any non-terminal status.
    pub fn update_priority(
        &mut self,
        id: &str,
        priority: Priority,
        role: Role,
        now: OffsetDateTime,
    ) -> Result<Report, AppError> {
        if !role.is_admin() {
            return Err(AppError::unauthorized(
                "Only administrators can re-classify report priority",
            ));
        }
        let report = Self::find_mut(&mut self.reports, id)?;
        if report.status.is_terminal() {
            return Err(AppError::invalid_transition(format!(
                "Priority is frozen once a report is {}",
                report.status.label()
            ))
            .with_details(format!("id={id}")));
        }
        report.priority = priority;
        report.updated_at = now;
        Ok(report.clone())
    }

    pub fn get(&self, id: &str) -> Result<&Report, AppError> {
        self.reports
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::report_not_found(id))
    }

    fn find_mut<'a>(reports: &'a mut [Report], id: &str) -> Result<&'a mut Report, AppError> {
        reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::report_not_found(id))
    }

    /// Viewer-facing copy: the reporter identity of an anonymous report is
    /// withheld from everyone but the sensitive-reports collaborator.
    pub fn redacted_for(report: &Report, viewer: Role) -> Report {
        let mut out = report.clone();
        if out.is_anonymous && viewer != Role::Superuser {
            out.reporter = None;
        }
        out
    }

    /// List reports for a viewer, optionally filtered by status and priority.
    pub fn list(
        &self,
        viewer: Role,
        status: Option<ReportStatus>,
        priority: Option<Priority>,
    ) -> Vec<Report> {
        self.reports
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .filter(|r| priority.map_or(true, |p| r.priority == p))
            .map(|r| Self::redacted_for(r, viewer))
            .collect()
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
