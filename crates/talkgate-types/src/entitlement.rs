//! Subscription entitlement types.
//!
//! One [`Entitlement`] record exists per user. It carries the subscription
//! plan, its validity window, the remaining session quota, and the user's
//! current interaction process tag.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Subscription plan.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (plan IN ('none', 'trial', 'basic', 'standard', 'premium'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    None,
    Trial,
    Basic,
    Standard,
    Premium,
}

impl Plan {
    /// Plans a user can buy.
    pub const PURCHASABLE: [Plan; 3] = [Plan::Basic, Plan::Standard, Plan::Premium];

    /// Fixed terms for a purchasable plan, `None` for `none` and `trial`.
    pub fn terms(self) -> Option<PlanTerms> {
        match self {
            Plan::Basic => Some(PlanTerms {
                duration_days: 30,
                session_grant: 30,
                unlimited: false,
            }),
            Plan::Standard => Some(PlanTerms {
                duration_days: 60,
                session_grant: 60,
                unlimited: false,
            }),
            Plan::Premium => Some(PlanTerms {
                duration_days: 90,
                session_grant: 0,
                unlimited: true,
            }),
            Plan::None | Plan::Trial => None,
        }
    }

    /// Human-readable plan label for offers and confirmations.
    pub fn label(self) -> &'static str {
        match self {
            Plan::None => "None",
            Plan::Trial => "Trial",
            Plan::Basic => "Basic",
            Plan::Standard => "Standard",
            Plan::Premium => "Premium",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::None => write!(f, "none"),
            Plan::Trial => write!(f, "trial"),
            Plan::Basic => write!(f, "basic"),
            Plan::Standard => write!(f, "standard"),
            Plan::Premium => write!(f, "premium"),
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Plan::None),
            "trial" => Ok(Plan::Trial),
            "basic" => Ok(Plan::Basic),
            "standard" => Ok(Plan::Standard),
            "premium" => Ok(Plan::Premium),
            other => Err(format!("invalid plan: '{other}'")),
        }
    }
}

/// Duration, session grant, and unlimited flag of a purchasable plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTerms {
    pub duration_days: i64,
    pub session_grant: i64,
    pub unlimited: bool,
}

impl PlanTerms {
    pub fn duration(&self) -> Duration {
        Duration::days(self.duration_days)
    }
}

/// The user's current interaction process.
///
/// Exactly one value at a time. The tag routes the next free-text message:
/// `Support` and `Feedback` capture it into a side log, `InSession` forwards
/// it to the conversation.
///
/// User-level state names: `None` = Idle, `Support` = InSupportFlow,
/// `Feedback` = InFeedbackFlow, `InSession` = InConversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessTag {
    #[default]
    None,
    Support,
    Feedback,
    InSession,
}

impl ProcessTag {
    /// Whether the user state machine allows moving from `self` to `to`.
    ///
    /// | from \ to  | none | support | feedback | in_session |
    /// |------------|------|---------|----------|------------|
    /// | none       | yes  | yes     | yes      | yes        |
    /// | support    | yes  | yes     | yes      | no         |
    /// | feedback   | yes  | yes     | yes      | no         |
    /// | in_session | yes  | yes     | yes      | yes        |
    ///
    /// A side flow has to complete (or be reset) before a conversation starts.
    pub fn can_transition_to(self, to: ProcessTag) -> bool {
        !matches!(
            (self, to),
            (ProcessTag::Support | ProcessTag::Feedback, ProcessTag::InSession)
        )
    }

    /// Whether free text is captured into a side log instead of the conversation.
    pub fn is_side_flow(self) -> bool {
        matches!(self, ProcessTag::Support | ProcessTag::Feedback)
    }
}

impl fmt::Display for ProcessTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessTag::None => write!(f, "none"),
            ProcessTag::Support => write!(f, "support"),
            ProcessTag::Feedback => write!(f, "feedback"),
            ProcessTag::InSession => write!(f, "in_session"),
        }
    }
}

impl FromStr for ProcessTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ProcessTag::None),
            "support" => Ok(ProcessTag::Support),
            "feedback" => Ok(ProcessTag::Feedback),
            "in_session" => Ok(ProcessTag::InSession),
            other => Err(format!("invalid process tag: '{other}'")),
        }
    }
}

/// A user's subscription entitlement and interaction state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    pub user_id: i64,
    pub plan: Plan,
    pub subscription_start: DateTime<Utc>,
    pub subscription_end: DateTime<Utc>,
    /// Remaining session quota. Meaningless while `unlimited` is set.
    pub sessions_left: i64,
    pub unlimited: bool,
    pub process: ProcessTag,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entitlement {
    /// Build the default trial record created on a user's first entitlement check.
    pub fn trial(user_id: i64, sessions: i64, window: Duration, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            plan: Plan::Trial,
            subscription_start: now,
            subscription_end: now + window,
            sessions_left: sessions,
            unlimited: false,
            process: ProcessTag::None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.subscription_end
    }

    /// Quota as shown to users: always 0 for unlimited plans.
    pub fn reported_sessions_left(&self) -> i64 {
        if self.unlimited { 0 } else { self.sessions_left }
    }
}

/// How a purchase changes the stored session quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionGrant {
    /// Overwrite `sessions_left`.
    Set(i64),
    /// Add to `sessions_left`, preserving unused quota.
    Increment(i64),
}

/// The field-group update applied to an entitlement by a plan purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseUpdate {
    pub plan: Plan,
    pub subscription_start: DateTime<Utc>,
    pub subscription_end: DateTime<Utc>,
    pub unlimited: bool,
    pub sessions: SessionGrant,
}

/// Result of an entitlement check before starting a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub allowed: bool,
    pub reason: AdmissionReason,
}

/// Why a session start was allowed or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionReason {
    TrialActivated,
    Unlimited,
    QuotaAvailable,
    Expired,
    QuotaExhausted,
}

impl Admission {
    pub fn allow(reason: AdmissionReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    pub fn deny(reason: AdmissionReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_roundtrip() {
        for plan in [
            Plan::None,
            Plan::Trial,
            Plan::Basic,
            Plan::Standard,
            Plan::Premium,
        ] {
            let parsed: Plan = plan.to_string().parse().unwrap();
            assert_eq!(plan, parsed);
        }
    }

    #[test]
    fn test_plan_terms_table() {
        let basic = Plan::Basic.terms().unwrap();
        assert_eq!((basic.duration_days, basic.session_grant, basic.unlimited), (30, 30, false));

        let standard = Plan::Standard.terms().unwrap();
        assert_eq!(
            (standard.duration_days, standard.session_grant, standard.unlimited),
            (60, 60, false)
        );

        let premium = Plan::Premium.terms().unwrap();
        assert_eq!(premium.duration_days, 90);
        assert!(premium.unlimited);

        assert!(Plan::Trial.terms().is_none());
        assert!(Plan::None.terms().is_none());
    }

    #[test]
    fn test_process_tag_roundtrip() {
        for tag in [
            ProcessTag::None,
            ProcessTag::Support,
            ProcessTag::Feedback,
            ProcessTag::InSession,
        ] {
            let parsed: ProcessTag = tag.to_string().parse().unwrap();
            assert_eq!(tag, parsed);
        }
        assert_eq!(
            serde_json::to_string(&ProcessTag::InSession).unwrap(),
            "\"in_session\""
        );
    }

    #[test]
    fn test_process_transitions() {
        assert!(ProcessTag::None.can_transition_to(ProcessTag::InSession));
        assert!(ProcessTag::InSession.can_transition_to(ProcessTag::Support));
        assert!(ProcessTag::Support.can_transition_to(ProcessTag::None));
        assert!(ProcessTag::Feedback.can_transition_to(ProcessTag::Support));
        assert!(!ProcessTag::Support.can_transition_to(ProcessTag::InSession));
        assert!(!ProcessTag::Feedback.can_transition_to(ProcessTag::InSession));
    }

    #[test]
    fn test_trial_defaults_and_expiry() {
        let now = Utc::now();
        let ent = Entitlement::trial(42, 2, Duration::hours(24), now);
        assert_eq!(ent.plan, Plan::Trial);
        assert_eq!(ent.sessions_left, 2);
        assert!(!ent.unlimited);
        assert_eq!(ent.process, ProcessTag::None);
        assert!(!ent.is_expired(now + Duration::hours(23)));
        assert!(ent.is_expired(now + Duration::hours(25)));
    }

    #[test]
    fn test_unlimited_reports_zero() {
        let mut ent = Entitlement::trial(1, 5, Duration::hours(1), Utc::now());
        ent.unlimited = true;
        assert_eq!(ent.reported_sessions_left(), 0);
    }
}
