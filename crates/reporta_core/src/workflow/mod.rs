use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::catalog::IncidentCatalog;
use crate::dispatch::NotificationDispatcher;
use crate::domain::{
    Notification, Priority, Report, ReportStatus, Role, SecurityOfficer, WorkflowPhase,
    WorkflowStep,
};
use crate::error::{code, AppError};
use crate::registry::{DirectoryEntry, OfficerRegistry};
use crate::session;
use crate::store::{NewReport, ReportStore};

/// Time source for the single-threaded engine. Commands read the clock once at
/// entry so a command's guard check and effect share one timestamp.
pub trait Clock {
    fn now_utc(&self) -> OffsetDateTime;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_utc(&self) -> OffsetDateTime {
        (**self).now_utc()
    }
}

/// Hand-driven clock for tests and demo drivers.
#[derive(Debug)]
pub struct ManualClock {
    now: RefCell<OffsetDateTime>,
}

impl ManualClock {
    pub fn starting_at(now: OffsetDateTime) -> Rc<Self> {
        Rc::new(Self {
            now: RefCell::new(now),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.borrow_mut() += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        *self.now.borrow_mut() = to;
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> OffsetDateTime {
        *self.now.borrow()
    }
}

/// Caller context supplied by the external identity/session provider.
/// Trusted completely; no authentication logic lives here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub user_id: Option<String>,
    pub role: Role,
}

impl SessionContext {
    pub fn new(session_id: &str, user_id: Option<&str>, role: Role) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_id: user_id.map(|u| u.to_string()),
            role,
        }
    }

    fn actor_label(&self) -> String {
        self.user_id
            .clone()
            .unwrap_or_else(|| self.session_id.clone())
    }
}

/// Orchestration layer sequencing guard -> store -> registry -> audit trail ->
/// notifications for every external command.
///
/// Each command runs to completion before the next is accepted (cooperative
/// single-threaded model), so guard and effect are atomic from the caller's
/// point of view. Notifications always fire after the state mutation they
/// describe has committed, never before.
pub struct WorkflowCoordinator {
    store: ReportStore,
    registry: OfficerRegistry,
    dispatcher: NotificationDispatcher,
    catalog: IncidentCatalog,
    steps: Vec<WorkflowStep>,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for WorkflowCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowCoordinator")
            .field("reports", &self.store.len())
            .field("officers", &self.registry.officers().len())
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl WorkflowCoordinator {
    pub fn new(catalog: IncidentCatalog) -> Self {
        Self::with_clock(catalog, Box::new(SystemClock))
    }

    pub fn with_clock(catalog: IncidentCatalog, clock: Box<dyn Clock>) -> Self {
        Self {
            store: ReportStore::new(),
            registry: OfficerRegistry::new(),
            dispatcher: NotificationDispatcher::new(),
            catalog,
            steps: Vec::new(),
            clock,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Mirror the external officer directory into the registry.
    pub fn sync_officer_directory(&mut self, entries: &[DirectoryEntry]) {
        let now = self.clock.now_utc();
        self.registry.sync_directory(entries, now);
    }

    /// Swap the incident-type catalog when the configuration collaborator
    /// changes it.
    pub fn set_catalog(&mut self, catalog: IncidentCatalog) {
        self.catalog = catalog;
    }

    fn append_step(
        &mut self,
        report_id: &str,
        phase: WorkflowPhase,
        actor_role: Role,
        action: &str,
        details: Option<String>,
        priority: Option<Priority>,
        now: OffsetDateTime,
    ) {
        self.steps.push(WorkflowStep {
            id: Uuid::new_v4().to_string(),
            report_id: report_id.to_string(),
            phase,
            timestamp: now,
            actor_role,
            action: action.to_string(),
            details,
            priority,
        });
    }

    fn require_admin(ctx: &SessionContext, action: &str) -> Result<(), AppError> {
        if !ctx.role.is_admin() {
            return Err(AppError::unauthorized(format!(
                "Only administrators can {action}"
            )));
        }
        Ok(())
    }

    /// Resolve the officer acting for a security-role caller and check it is
    /// the one assigned to the report.
    fn require_assigned_officer(
        &self,
        ctx: &SessionContext,
        report: &Report,
    ) -> Result<String, AppError> {
        if ctx.role != Role::Security {
            return Err(AppError::unauthorized(
                "Only security personnel can act on assigned cases",
            ));
        }
        let officer_id = report.assigned_officer_id.clone().ok_or_else(|| {
            AppError::invalid_transition("Report has no assigned officer")
                .with_details(format!("id={}", report.id))
        })?;
        let officer = self.registry.get(&officer_id)?;
        let caller = ctx.user_id.as_deref().unwrap_or_default();
        if officer.user_id != caller {
            // Acting on someone else's case is a guard failure on the
            // transition, not a role problem.
            return Err(AppError::invalid_transition(
                "Report is assigned to a different officer",
            )
            .with_details(format!("id={}; officer={officer_id}", report.id)));
        }
        Ok(officer_id)
    }

    /// Command: file a new incident report.
    pub fn file_report(
        &mut self,
        ctx: &SessionContext,
        data: NewReport,
    ) -> Result<Report, AppError> {
        let now = self.clock.now_utc();
        let report = self.store.create(data, &ctx.session_id, &self.catalog, now)?;
        self.append_step(
            &report.id,
            WorkflowPhase::Reported,
            ctx.role,
            "Report created",
            Some(format!("Initial priority: {}", report.priority.label())),
            Some(report.priority),
            now,
        );
        self.dispatcher.report_created(&report, now);
        self.dispatcher.check_danger_zones(self.store.reports(), now);
        Ok(ReportStore::redacted_for(&report, ctx.role))
    }

    /// Command: admin review moving `new -> in_progress`, optionally
    /// re-classifying priority in the same step. The officer is not yet bound.
    pub fn classify(
        &mut self,
        ctx: &SessionContext,
        report_id: &str,
        priority: Option<Priority>,
    ) -> Result<Report, AppError> {
        Self::require_admin(ctx, "review and classify reports")?;
        let now = self.clock.now_utc();

        // Reject early: nothing is re-prioritized unless the transition holds.
        let current = self.store.get(report_id)?.status;
        if current != ReportStatus::New {
            return Err(AppError::invalid_transition(format!(
                "Only new reports can enter review (report is {})",
                current.label()
            ))
            .with_details(format!("id={report_id}")));
        }

        if let Some(priority) = priority {
            self.store.update_priority(report_id, priority, ctx.role, now)?;
        }
        let report = self.store.begin_investigation(report_id, now)?;

        self.append_step(
            &report.id,
            WorkflowPhase::AdminReview,
            ctx.role,
            "Report reviewed by administrator",
            Some(format!("Classified as: {}", report.priority.label())),
            Some(report.priority),
            now,
        );
        self.append_step(
            &report.id,
            WorkflowPhase::PriorityAssigned,
            ctx.role,
            "Investigation started",
            None,
            None,
            now,
        );
        self.dispatcher.report_classified(&report, now);
        Ok(ReportStore::redacted_for(&report, ctx.role))
    }

    /// Command: bind an officer candidate to an in-progress report.
    ///
    /// Candidate lookup and assignment happen inside this one uninterrupted
    /// step, so two callers can never both succeed against the same officer.
    pub fn assign_to_security(
        &mut self,
        ctx: &SessionContext,
        report_id: &str,
    ) -> Result<Report, AppError> {
        Self::require_admin(ctx, "assign reports to security")?;
        let now = self.clock.now_utc();

        let (zone, status) = {
            let report = self.store.get(report_id)?;
            (report.zone.clone(), report.status)
        };
        if status != ReportStatus::InProgress {
            return Err(AppError::invalid_transition(format!(
                "Only in-progress reports can be assigned (report is {})",
                status.label()
            ))
            .with_details(format!("id={report_id}")));
        }

        // The report stays untouched when no candidate exists; the caller may
        // retry once an officer frees up.
        let (officer_id, officer_name) = match self.registry.find_candidate(&zone) {
            Some(officer) => (officer.id.clone(), officer.name.clone()),
            None => {
                return Err(AppError::new(
                    code::NO_CANDIDATE_OFFICER,
                    "No available security officer for this report",
                )
                .with_details(format!("id={report_id}; zone={zone}"))
                .with_retryable(true));
            }
        };

        let report = self
            .store
            .bind_officer(report_id, &officer_id, &officer_name, now)?;
        self.registry.assign(&officer_id, report_id, &zone, now)?;

        self.append_step(
            &report.id,
            WorkflowPhase::SecurityNotified,
            ctx.role,
            "Assigned to security personnel",
            Some(format!("Assigned to: {officer_name}")),
            None,
            now,
        );
        let label = self.catalog.label_for(&report.incident_type);
        self.dispatcher.report_assigned(&report, &label, now);
        Ok(ReportStore::redacted_for(&report, ctx.role))
    }

    /// Command: the assigned officer logs field progress on an in-progress
    /// case. The status does not change; the step is audit + fan-out.
    pub fn report_progress(
        &mut self,
        ctx: &SessionContext,
        report_id: &str,
        details: &str,
    ) -> Result<Report, AppError> {
        let now = self.clock.now_utc();
        let report = self.store.get(report_id)?.clone();
        if report.status != ReportStatus::InProgress {
            return Err(AppError::invalid_transition(format!(
                "Progress can only be reported while in progress (report is {})",
                report.status.label()
            ))
            .with_details(format!("id={report_id}")));
        }
        self.require_assigned_officer(ctx, &report)?;

        self.append_step(
            &report.id,
            WorkflowPhase::SecurityWorking,
            ctx.role,
            "Security personnel reported progress",
            Some(details.to_string()),
            None,
            now,
        );
        self.dispatcher.progress_reported(&report, details, now);
        Ok(ReportStore::redacted_for(&report, ctx.role))
    }

    /// Command: the assigned officer hands the case over for approval with a
    /// non-empty narrative.
    pub fn submit_for_approval(
        &mut self,
        ctx: &SessionContext,
        report_id: &str,
        narrative: &str,
    ) -> Result<Report, AppError> {
        let now = self.clock.now_utc();
        let snapshot = self.store.get(report_id)?.clone();
        let officer_id = self.require_assigned_officer(ctx, &snapshot)?;

        let report = self
            .store
            .submit_narrative(report_id, &officer_id, narrative, now)?;

        self.append_step(
            &report.id,
            WorkflowPhase::PendingApproval,
            ctx.role,
            "Submitted for administrative approval",
            Some(format!("Narrative: {narrative}")),
            None,
            now,
        );
        self.dispatcher.approval_needed(&report, narrative, now);
        Ok(ReportStore::redacted_for(&report, ctx.role))
    }

    /// Command: admin approves or rejects a pending resolution.
    ///
    /// Approval resolves the report and releases the officer; rejection sends
    /// it back to `in_progress` with the officer still on the case.
    pub fn decide_approval(
        &mut self,
        ctx: &SessionContext,
        report_id: &str,
        approved: bool,
        comments: Option<String>,
    ) -> Result<Report, AppError> {
        Self::require_admin(ctx, "approve or reject resolutions")?;
        let now = self.clock.now_utc();

        let report = self.store.decide_approval(
            report_id,
            approved,
            comments,
            &ctx.actor_label(),
            now,
        )?;

        if approved {
            if let Some(officer_id) = report.assigned_officer_id.as_deref() {
                self.registry.release(officer_id, report_id, now)?;
            }
        }

        let (phase, action) = if approved {
            (WorkflowPhase::Completed, "Resolution approved")
        } else {
            (WorkflowPhase::AdminApproval, "Resolution rejected, more work requested")
        };
        self.append_step(
            &report.id,
            phase,
            ctx.role,
            action,
            report.approval_comments.clone(),
            None,
            now,
        );
        self.dispatcher.approval_decided(&report, approved, now);
        Ok(ReportStore::redacted_for(&report, ctx.role))
    }

    /// Command: cancel a report. Users may cancel only their own session's
    /// reports; admins may cancel any. An assigned officer is released.
    pub fn cancel(&mut self, ctx: &SessionContext, report_id: &str) -> Result<Report, AppError> {
        let now = self.clock.now_utc();
        let report = self
            .store
            .cancel(report_id, ctx.role, &ctx.session_id, now)?;

        if let Some(officer_id) = report.assigned_officer_id.as_deref() {
            self.registry.release(officer_id, report_id, now)?;
        }

        self.append_step(
            &report.id,
            WorkflowPhase::Cancelled,
            ctx.role,
            "Report cancelled",
            None,
            None,
            now,
        );
        Ok(ReportStore::redacted_for(&report, ctx.role))
    }

    /// Admin helper: re-classify priority outside the review step.
    pub fn update_priority(
        &mut self,
        ctx: &SessionContext,
        report_id: &str,
        priority: Priority,
    ) -> Result<Report, AppError> {
        let now = self.clock.now_utc();
        let report = self
            .store
            .update_priority(report_id, priority, ctx.role, now)?;
        self.append_step(
            &report.id,
            WorkflowPhase::AdminReview,
            ctx.role,
            "Priority re-classified",
            Some(format!("New priority: {}", report.priority.label())),
            Some(report.priority),
            now,
        );
        Ok(ReportStore::redacted_for(&report, ctx.role))
    }

    /// Admin helper: archive a resolved report (`resolved -> closed`).
    pub fn close_report(
        &mut self,
        ctx: &SessionContext,
        report_id: &str,
    ) -> Result<Report, AppError> {
        Self::require_admin(ctx, "close resolved reports")?;
        let now = self.clock.now_utc();
        let report = self.store.close(report_id, now)?;
        self.append_step(
            &report.id,
            WorkflowPhase::Completed,
            ctx.role,
            "Report archived",
            None,
            None,
            now,
        );
        Ok(ReportStore::redacted_for(&report, ctx.role))
    }

    /// Drive the deferred-alert queue. Called by the external scheduler (or
    /// the demo driver); runs on the same cooperative queue as commands.
    pub fn run_deferred(&mut self) -> usize {
        let now = self.clock.now_utc();
        self.dispatcher.drain_due(self.store.reports(), now)
    }

    /// Drop any scheduled feedback request for a report before it fires.
    pub fn cancel_feedback_request(&mut self, report_id: &str) {
        self.dispatcher.cancel_deferred_for_report(report_id);
    }

    // Query surface.

    pub fn reports(
        &self,
        viewer: Role,
        status: Option<ReportStatus>,
        priority: Option<Priority>,
    ) -> Vec<Report> {
        self.store.list(viewer, status, priority)
    }

    pub fn report(&self, viewer: Role, report_id: &str) -> Result<Report, AppError> {
        Ok(ReportStore::redacted_for(self.store.get(report_id)?, viewer))
    }

    pub fn officers(&self) -> &[SecurityOfficer] {
        self.registry.officers()
    }

    pub fn workflow_history(&self, report_id: &str) -> Vec<&WorkflowStep> {
        self.steps
            .iter()
            .filter(|s| s.report_id == report_id)
            .collect()
    }

    /// Whether a report was ever classified high priority, derived from the
    /// priorities recorded in the audit trail rather than the mutable current
    /// priority. Free-text step details carry no weight here.
    pub fn was_ever_high_priority(&self, report_id: &str) -> bool {
        self.steps
            .iter()
            .any(|s| s.report_id == report_id && s.priority == Some(Priority::High))
    }

    pub fn notifications_for(&self, role: Role) -> Vec<&Notification> {
        self.dispatcher.notifications_for(role)
    }

    pub fn unread_count(&self, role: Role) -> usize {
        self.dispatcher.unread_count(role)
    }

    pub fn mark_notification_read(&mut self, notification_id: &str) {
        self.dispatcher.mark_as_read(notification_id);
    }

    pub fn mark_all_notifications_read(&mut self, role: Role) {
        self.dispatcher.mark_all_read(role);
    }

    pub fn reports_today(&self, session_id: &str) -> usize {
        session::reports_today(self.store.reports(), session_id, self.clock.now_utc())
    }

    pub fn can_create_report(&self, session_id: &str) -> bool {
        session::can_create_report(self.store.reports(), session_id, self.clock.now_utc())
    }

    pub fn set_officer_status(
        &mut self,
        officer_id: &str,
        status: crate::domain::OfficerStatus,
        zone: Option<String>,
    ) -> Result<(), AppError> {
        let now = self.clock.now_utc();
        self.registry.set_status(officer_id, status, zone, now)
    }

    pub fn pending_deferred_alerts(&self) -> usize {
        self.dispatcher.pending_deferred()
    }
}
