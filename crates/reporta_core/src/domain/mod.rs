use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Lifecycle state of a filed report.
///
/// The transition table in `store::can_transition` is the single source of truth;
/// consumers must not re-derive "can cancel"-style predicates from ad-hoc string
/// comparisons.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    New,
    InProgress,
    PendingApproval,
    Resolved,
    Closed,
    Cancelled,
}

impl ReportStatus {
    /// Terminal states accept no further lifecycle transitions, except the
    /// cosmetic `resolved -> closed` archive step.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed | Self::Cancelled)
    }

    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::New | Self::InProgress)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In progress",
            Self::PendingApproval => "Pending approval",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Caller role supplied by the external identity provider. Trusted as-is; no
/// authentication logic lives in this crate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    Superuser,
    Security,
}

impl Role {
    /// Roles allowed to perform administrative transitions and see any report.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::Superuser)
    }
}

/// Disclosed reporter identity. Withheld from every role except the
/// sensitive-reports collaborator (superuser) when the report is anonymous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReporterIdentity {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// One filed incident, tracked through the lifecycle state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub id: String,
    pub status: ReportStatus,
    pub priority: Priority,
    /// Incident-type catalog key (e.g. `robo`), fixed at creation.
    pub incident_type: String,
    /// Free-text location, immutable after creation.
    pub zone: String,
    pub description: String,
    pub is_anonymous: bool,
    pub reporter: Option<ReporterIdentity>,
    /// Creating session; used for ownership checks and the daily-limit count.
    /// Distinct from the optional disclosed reporter identity.
    pub session_id: String,
    pub assigned_officer_id: Option<String>,
    pub assigned_officer_name: Option<String>,
    /// Narrative submitted by the assigned officer when requesting approval.
    pub security_narrative: Option<String>,
    pub approval_comments: Option<String>,
    pub approved_by: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approval_timestamp: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Set iff the report reached `resolved`; kept when later closed.
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
    /// Stamped when the officer hands the case over for approval.
    #[serde(with = "time::serde::rfc3339::option")]
    pub field_work_ended_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OfficerStatus {
    Available,
    Busy,
    Offline,
}

impl OfficerStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Busy => "Busy",
            Self::Offline => "Off duty",
        }
    }
}

/// Operational state for one security-role account. Identity fields mirror the
/// external officer directory; this crate owns only status, zone and load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityOfficer {
    pub id: String,
    /// Directory account backing this officer.
    pub user_id: String,
    pub name: String,
    pub badge: String,
    pub status: OfficerStatus,
    pub current_zone: Option<String>,
    pub assigned_zones: Vec<String>,
    pub active_report_ids: Vec<String>,
    pub contact_info: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_update: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Reported,
    AdminReview,
    PriorityAssigned,
    SecurityNotified,
    SecurityWorking,
    PendingApproval,
    AdminApproval,
    Completed,
    Cancelled,
}

/// Append-only audit entry recording one lifecycle action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowStep {
    pub id: String,
    pub report_id: String,
    pub phase: WorkflowPhase,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub actor_role: Role,
    pub action: String,
    pub details: Option<String>,
    /// Priority recorded by this step, when the step set or confirmed one.
    /// Structured so history queries never parse the free-text `details`.
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    HighPriority,
    Normal,
    StatusUpdate,
    Assignment,
    DangerZone,
    ReportResolved,
    ApprovalNeeded,
    Approved,
    FeedbackRequest,
}

/// Presentation-layer emphasis hint carried by every alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttentionIntensity {
    None,
    Moderate,
    Urgent,
}

impl AlertType {
    /// Total, deterministic mapping from alert type to attention intensity.
    pub fn intensity(self) -> AttentionIntensity {
        match self {
            Self::HighPriority | Self::DangerZone | Self::ApprovalNeeded => {
                AttentionIntensity::Urgent
            }
            Self::StatusUpdate
            | Self::Assignment
            | Self::ReportResolved
            | Self::Approved
            | Self::FeedbackRequest => AttentionIntensity::Moderate,
            Self::Normal => AttentionIntensity::None,
        }
    }
}

/// Role-targeted alert event emitted as a side effect of a transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub read: bool,
    pub target_role: Role,
    pub report_id: Option<String>,
    pub priority: Priority,
    pub intensity: AttentionIntensity,
}
