use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::{AlertType, Notification, Priority, Report, ReportStatus, Role};
use crate::error::AppError;

/// Most-recent alerts kept per target role; older ones are dropped silently.
pub const FEED_CAP: usize = 50;

/// Reports in one zone within the trailing window that mark the zone dangerous.
pub const DANGER_ZONE_THRESHOLD: usize = 3;

/// Trailing window for the danger-zone count.
pub const DANGER_ZONE_WINDOW: Duration = Duration::hours(24);

/// Delay before the post-resolution feedback request fires.
pub const FEEDBACK_REQUEST_DELAY: Duration = Duration::seconds(3);

/// Outbound delivery boundary. The presentation layer (sound, vibration, push)
/// subscribes here; delivery faults never reach the command caller.
pub trait AlertSink {
    fn deliver(&mut self, alert: &Notification) -> Result<(), AppError>;
}

/// Deferred feedback-request alert scheduled when a report is approved.
///
/// Fires at most once; cancellation removes the entry from the queue. When it
/// fires the target report must still be resolved (or archived), otherwise
/// the callback is a logged no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeferredAlert {
    pub handle: u64,
    pub report_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub due_at: OffsetDateTime,
}

/// Translates lifecycle transitions into role-targeted alert events.
///
/// Dispatch is fire-and-forget: nothing here blocks or fails the transition
/// that triggered it.
pub struct NotificationDispatcher {
    notifications: Vec<Notification>,
    /// Last danger count observed per zone; a zone re-alerts only when its
    /// count changes.
    zone_counts: HashMap<String, usize>,
    deferred: Vec<DeferredAlert>,
    next_handle: u64,
    sink: Option<Box<dyn AlertSink>>,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("notifications", &self.notifications.len())
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            notifications: Vec::new(),
            zone_counts: HashMap::new(),
            deferred: Vec::new(),
            next_handle: 1,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn short_id(report_id: &str) -> &str {
        let n = report_id.len();
        &report_id[n.saturating_sub(6)..]
    }

    fn push(
        &mut self,
        kind: AlertType,
        title: String,
        description: String,
        report_id: Option<&str>,
        target_role: Role,
        priority: Priority,
        now: OffsetDateTime,
    ) {
        let alert = Notification {
            id: Uuid::new_v4().to_string(),
            kind,
            title,
            description: Some(description),
            timestamp: now,
            read: false,
            target_role,
            report_id: report_id.map(|id| id.to_string()),
            priority,
            intensity: kind.intensity(),
        };

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.deliver(&alert) {
                log::warn!("alert delivery failed (swallowed): {e}");
            }
        }

        // Newest first; the oldest beyond the per-role cap fall off silently.
        self.notifications.insert(0, alert);
        let mut seen = 0usize;
        self.notifications.retain(|n| {
            if n.target_role != target_role {
                return true;
            }
            seen += 1;
            seen <= FEED_CAP
        });
    }

    /// Report filed: confirmation to the user, review prompt to admin,
    /// oversight note to superuser.
    pub fn report_created(&mut self, report: &Report, now: OffsetDateTime) {
        let short = Self::short_id(&report.id);
        self.push(
            AlertType::StatusUpdate,
            "Report submitted".to_string(),
            format!("Your report #{short} was received and is being processed."),
            Some(&report.id),
            Role::User,
            Priority::High,
            now,
        );
        self.push(
            AlertType::Normal,
            "New report received".to_string(),
            format!("Report #{short} needs review and priority classification."),
            Some(&report.id),
            Role::Admin,
            Priority::High,
            now,
        );
        self.push(
            AlertType::Normal,
            "Report registered".to_string(),
            format!("Report #{short} added to the system for oversight."),
            Some(&report.id),
            Role::Superuser,
            Priority::Medium,
            now,
        );
    }

    /// Admin review finished. A high classification escalates loudly to the
    /// reporting user; otherwise a plain status update.
    pub fn report_classified(&mut self, report: &Report, now: OffsetDateTime) {
        let short = Self::short_id(&report.id);
        if report.priority == Priority::High {
            self.push(
                AlertType::HighPriority,
                "High-priority alert".to_string(),
                format!(
                    "Your report #{short} was classified high priority and is being \
                     handled immediately."
                ),
                Some(&report.id),
                Role::User,
                Priority::High,
                now,
            );
        } else {
            self.push(
                AlertType::StatusUpdate,
                "Report under review".to_string(),
                format!("Your report #{short} is being processed by our team."),
                Some(&report.id),
                Role::User,
                Priority::Medium,
                now,
            );
        }
    }

    /// Officer bound to the case: field assignment to security, progress note
    /// to the user, confirmation to admin.
    pub fn report_assigned(
        &mut self,
        report: &Report,
        incident_label: &str,
        now: OffsetDateTime,
    ) {
        let short = Self::short_id(&report.id);
        self.push(
            AlertType::Assignment,
            format!("New field assignment ({})", report.priority.label()),
            format!(
                "Case #{short}: {incident_label} at {}. Proceed to the indicated area.",
                report.zone
            ),
            Some(&report.id),
            Role::Security,
            Priority::High,
            now,
        );
        self.push(
            AlertType::StatusUpdate,
            "Security officer assigned".to_string(),
            format!("An officer was assigned to your report #{short} and is en route."),
            Some(&report.id),
            Role::User,
            Priority::High,
            now,
        );
        self.push(
            AlertType::Normal,
            "Assignment confirmed".to_string(),
            format!("Report #{short} was assigned; the officer has been notified."),
            Some(&report.id),
            Role::Admin,
            Priority::Medium,
            now,
        );
    }

    /// Officer reports field progress on an in-progress case.
    pub fn progress_reported(&mut self, report: &Report, details: &str, now: OffsetDateTime) {
        let short = Self::short_id(&report.id);
        self.push(
            AlertType::StatusUpdate,
            "Active investigation".to_string(),
            format!("Our officer is working on your report #{short} right now."),
            Some(&report.id),
            Role::User,
            Priority::High,
            now,
        );
        self.push(
            AlertType::Normal,
            "Officer reports field progress".to_string(),
            format!("Case #{short}: {details}"),
            Some(&report.id),
            Role::Admin,
            Priority::Medium,
            now,
        );
        self.push(
            AlertType::Normal,
            "Progress logged".to_string(),
            format!("Your progress update for case #{short} was recorded."),
            Some(&report.id),
            Role::Security,
            Priority::Low,
            now,
        );
    }

    /// Case handed over for admin approval. Admin only.
    pub fn approval_needed(&mut self, report: &Report, narrative: &str, now: OffsetDateTime) {
        let short = Self::short_id(&report.id);
        let mut excerpt = narrative.chars().take(100).collect::<String>();
        if narrative.chars().count() > 100 {
            excerpt.push('…');
        }
        self.push(
            AlertType::ApprovalNeeded,
            "Approval required".to_string(),
            format!("Report #{short} needs your approval to be resolved. Narrative: {excerpt}"),
            Some(&report.id),
            Role::Admin,
            Priority::High,
            now,
        );
    }

    /// Approval decision fan-out. Approval alerts all three roles and schedules
    /// the deferred feedback request; rejection alerts security only.
    ///
    /// Returns the deferred-alert handle when one was scheduled.
    pub fn approval_decided(
        &mut self,
        report: &Report,
        approved: bool,
        now: OffsetDateTime,
    ) -> Option<u64> {
        let short = Self::short_id(&report.id);
        if approved {
            self.push(
                AlertType::ReportResolved,
                "Your report has been resolved".to_string(),
                format!(
                    "Report #{short} was fully resolved by our security team. Thank you \
                     for helping keep the campus safe."
                ),
                Some(&report.id),
                Role::User,
                Priority::High,
                now,
            );
            self.push(
                AlertType::Normal,
                "Case closed".to_string(),
                format!("Report #{short} was marked resolved after administrative approval."),
                Some(&report.id),
                Role::Admin,
                Priority::Medium,
                now,
            );
            self.push(
                AlertType::Approved,
                "Work approved".to_string(),
                format!("Your resolution of report #{short} was approved."),
                Some(&report.id),
                Role::Security,
                Priority::High,
                now,
            );
            Some(self.schedule_feedback_request(&report.id, now))
        } else {
            self.push(
                AlertType::Normal,
                "Resolution needs revision".to_string(),
                format!(
                    "Report #{short} requires additional work. Check the administrator's \
                     comments."
                ),
                Some(&report.id),
                Role::Security,
                Priority::High,
                now,
            );
            None
        }
    }

    /// Count reports per zone within the trailing window and alert users once
    /// per (zone, count) pair. The count snapshot replaces the previous one, so
    /// a zone re-alerts only when its count changes.
    pub fn check_danger_zones(&mut self, reports: &[Report], now: OffsetDateTime) {
        let cutoff = now - DANGER_ZONE_WINDOW;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for report in reports {
            if report.created_at > cutoff {
                *counts.entry(report.zone.clone()).or_insert(0) += 1;
            }
        }

        let mut dangerous: Vec<(&String, usize)> = counts
            .iter()
            .map(|(zone, count)| (zone, *count))
            .filter(|(_, count)| *count >= DANGER_ZONE_THRESHOLD)
            .collect();
        dangerous.sort();

        for (zone, count) in dangerous {
            if self.zone_counts.get(zone.as_str()) == Some(&count) {
                continue;
            }
            self.push(
                AlertType::DangerZone,
                "Dangerous zone detected".to_string(),
                format!(
                    "Zone \"{zone}\" had {count} reports in the last 24 hours. \
                     Caution is advised."
                ),
                None,
                Role::User,
                Priority::High,
                now,
            );
        }

        self.zone_counts = counts;
    }

    fn schedule_feedback_request(&mut self, report_id: &str, now: OffsetDateTime) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.deferred.push(DeferredAlert {
            handle,
            report_id: report_id.to_string(),
            due_at: now + FEEDBACK_REQUEST_DELAY,
        });
        handle
    }

    /// Cancel a scheduled deferred alert. Unknown handles are ignored.
    pub fn cancel_deferred(&mut self, handle: u64) {
        self.deferred.retain(|a| a.handle != handle);
    }

    /// Cancel every pending deferred alert for a report.
    pub fn cancel_deferred_for_report(&mut self, report_id: &str) {
        self.deferred.retain(|a| a.report_id != report_id);
    }

    /// Fire due deferred alerts against the current report snapshot.
    ///
    /// Runs on the same cooperative queue as commands, so the report may have
    /// moved on since scheduling: a report that is no longer resolved (or
    /// archived) makes the callback a logged no-op. Each entry fires at most
    /// once. Returns the number of alerts actually emitted.
    pub fn drain_due(&mut self, reports: &[Report], now: OffsetDateTime) -> usize {
        let due: Vec<DeferredAlert> = self
            .deferred
            .iter()
            .filter(|a| a.due_at <= now)
            .cloned()
            .collect();
        self.deferred.retain(|a| a.due_at > now);

        let mut fired = 0;
        for alert in due {
            let report = reports.iter().find(|r| r.id == alert.report_id);
            let still_resolved = report.map_or(false, |r| {
                matches!(r.status, ReportStatus::Resolved | ReportStatus::Closed)
            });
            if !still_resolved {
                log::debug!(
                    "skipping feedback request for report {}: precondition no longer holds",
                    alert.report_id
                );
                continue;
            }
            let short = Self::short_id(&alert.report_id);
            self.push(
                AlertType::FeedbackRequest,
                "Help us improve".to_string(),
                format!(
                    "Your report #{short} was resolved. Your feedback matters to us."
                ),
                Some(&alert.report_id),
                Role::User,
                Priority::Medium,
                now,
            );
            fired += 1;
        }
        fired
    }

    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn notifications_for(&self, role: Role) -> Vec<&Notification> {
        self.notifications
            .iter()
            .filter(|n| n.target_role == role)
            .collect()
    }

    pub fn unread_count(&self, role: Role) -> usize {
        self.notifications
            .iter()
            .filter(|n| n.target_role == role && !n.read)
            .count()
    }

    pub fn mark_as_read(&mut self, notification_id: &str) {
        if let Some(n) = self.notifications.iter_mut().find(|n| n.id == notification_id) {
            n.read = true;
        }
    }

    pub fn mark_all_read(&mut self, role: Role) {
        for n in self.notifications.iter_mut().filter(|n| n.target_role == role) {
            n.read = true;
        }
    }
}
