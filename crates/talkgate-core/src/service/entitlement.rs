//! Entitlement gate.
//!
//! Decides whether a user may start a session, applies plan purchases, and
//! owns the user-level process state machine. The default trial record is
//! created here and nowhere else.

use chrono::{DateTime, Utc};

use talkgate_types::config::SessionPolicy;
use talkgate_types::entitlement::{
    Admission, AdmissionReason, Entitlement, Plan, ProcessTag, PurchaseUpdate, SessionGrant,
};
use talkgate_types::error::OrchestratorError;

use crate::repository::entitlement::EntitlementRepository;

/// What `/buy` shows for a user's current entitlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOffer {
    /// Premium is active; nothing to buy until it ends.
    PremiumActive { until: DateTime<Utc> },
    /// The trial is still usable.
    TrialActive { until: DateTime<Utc> },
    /// A capped paid plan with higher tiers available.
    Upgrade { current: Plan, plans: Vec<Plan> },
    /// Trial expired or exhausted.
    TrialEnded { plans: Vec<Plan> },
    /// No usable subscription at all.
    NoSubscription { plans: Vec<Plan> },
}

impl PlanOffer {
    /// Plans that get a purchase button.
    pub fn plans(&self) -> &[Plan] {
        match self {
            PlanOffer::PremiumActive { .. } | PlanOffer::TrialActive { .. } => &[],
            PlanOffer::Upgrade { plans, .. }
            | PlanOffer::TrialEnded { plans }
            | PlanOffer::NoSubscription { plans } => plans,
        }
    }
}

/// Build the upgrade menu for an entitlement.
pub fn offers_for(entitlement: Option<&Entitlement>, now: DateTime<Utc>) -> PlanOffer {
    let all = Plan::PURCHASABLE.to_vec();
    let Some(ent) = entitlement else {
        return PlanOffer::NoSubscription { plans: all };
    };
    let expired = ent.is_expired(now);

    match ent.plan {
        Plan::Premium if !expired => PlanOffer::PremiumActive {
            until: ent.subscription_end,
        },
        Plan::Standard if !expired => PlanOffer::Upgrade {
            current: Plan::Standard,
            plans: vec![Plan::Premium],
        },
        Plan::Basic if !expired => PlanOffer::Upgrade {
            current: Plan::Basic,
            plans: vec![Plan::Standard, Plan::Premium],
        },
        Plan::Trial if expired || ent.sessions_left <= 0 => PlanOffer::TrialEnded { plans: all },
        Plan::Trial => PlanOffer::TrialActive {
            until: ent.subscription_end,
        },
        _ => PlanOffer::NoSubscription { plans: all },
    }
}

/// Compute the field-group update a purchase applies.
///
/// Quota policy: moving to an unlimited plan sets the quota to 0; moving
/// from unlimited to a capped plan sets it to the grant; otherwise the grant
/// is added to the unused quota.
pub fn purchase_update(
    current: &Entitlement,
    plan: Plan,
    now: DateTime<Utc>,
) -> Result<PurchaseUpdate, OrchestratorError> {
    let terms = plan
        .terms()
        .ok_or_else(|| OrchestratorError::Validation(format!("plan '{plan}' cannot be purchased")))?;

    let sessions = if terms.unlimited {
        SessionGrant::Set(0)
    } else if current.unlimited {
        SessionGrant::Set(terms.session_grant)
    } else {
        SessionGrant::Increment(terms.session_grant)
    };

    Ok(PurchaseUpdate {
        plan,
        subscription_start: now,
        subscription_end: now + terms.duration(),
        unlimited: terms.unlimited,
        sessions,
    })
}

/// Service gating session starts on a user's entitlement.
pub struct EntitlementGate<E: EntitlementRepository> {
    repo: E,
    policy: SessionPolicy,
}

impl<E: EntitlementRepository> EntitlementGate<E> {
    pub fn new(repo: E, policy: SessionPolicy) -> Self {
        Self { repo, policy }
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<Entitlement>, OrchestratorError> {
        Ok(self.repo.get(user_id).await?)
    }

    /// Check whether the user may start a new session.
    pub async fn can_start_session(&self, user_id: i64) -> Result<Admission, OrchestratorError> {
        self.can_start_session_at(user_id, Utc::now()).await
    }

    /// [`Self::can_start_session`] against an explicit clock.
    ///
    /// Rules in order: missing record creates the trial and allows; an
    /// expired window denies; unlimited allows; an empty quota denies.
    pub async fn can_start_session_at(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Admission, OrchestratorError> {
        let Some(ent) = self.repo.get(user_id).await? else {
            let trial = Entitlement::trial(
                user_id,
                self.policy.trial_sessions,
                self.policy.trial_window(),
                now,
            );
            let created = self.repo.insert_if_absent(&trial).await?;
            if created {
                tracing::info!(user_id, sessions = trial.sessions_left, "trial entitlement created");
                return Ok(Admission::allow(AdmissionReason::TrialActivated));
            }
            // Lost the creation race; judge the record the winner wrote.
            let ent = self
                .repo
                .get(user_id)
                .await?
                .ok_or_else(|| OrchestratorError::NotFound(format!("entitlement for user {user_id}")))?;
            return Ok(Self::judge(&ent, now));
        };

        Ok(Self::judge(&ent, now))
    }

    fn judge(ent: &Entitlement, now: DateTime<Utc>) -> Admission {
        if ent.is_expired(now) {
            Admission::deny(AdmissionReason::Expired)
        } else if ent.unlimited {
            Admission::allow(AdmissionReason::Unlimited)
        } else if ent.sessions_left <= 0 {
            Admission::deny(AdmissionReason::QuotaExhausted)
        } else {
            Admission::allow(AdmissionReason::QuotaAvailable)
        }
    }

    /// Apply a plan purchase.
    pub async fn purchase_plan(
        &self,
        user_id: i64,
        plan: Plan,
    ) -> Result<Entitlement, OrchestratorError> {
        self.purchase_plan_at(user_id, plan, Utc::now()).await
    }

    pub async fn purchase_plan_at(
        &self,
        user_id: i64,
        plan: Plan,
        now: DateTime<Utc>,
    ) -> Result<Entitlement, OrchestratorError> {
        if !Plan::PURCHASABLE.contains(&plan) {
            return Err(OrchestratorError::Validation(format!(
                "plan '{plan}' cannot be purchased"
            )));
        }
        let current = self
            .repo
            .get(user_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("entitlement for user {user_id}")))?;

        let update = purchase_update(&current, plan, now)?;
        let updated = self
            .repo
            .apply_purchase(user_id, &update)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("entitlement for user {user_id}")))?;

        tracing::info!(
            user_id,
            plan = %plan,
            sessions_left = updated.sessions_left,
            unlimited = updated.unlimited,
            "plan purchased"
        );
        Ok(updated)
    }

    /// The upgrade menu for a user.
    pub async fn offers(&self, user_id: i64) -> Result<PlanOffer, OrchestratorError> {
        let ent = self.repo.get(user_id).await?;
        Ok(offers_for(ent.as_ref(), Utc::now()))
    }

    /// Move the user's process tag, enforcing the user state machine.
    ///
    /// A user without a record is treated as `none`, and a move to `none`
    /// for such a user is a no-op.
    pub async fn set_process(
        &self,
        user_id: i64,
        to: ProcessTag,
    ) -> Result<(), OrchestratorError> {
        let current = self.repo.get(user_id).await?;
        let from = current.as_ref().map(|e| e.process).unwrap_or_default();
        if !from.can_transition_to(to) {
            return Err(OrchestratorError::Validation(format!(
                "process transition {from} -> {to} is not allowed"
            )));
        }
        if current.is_none() {
            if to == ProcessTag::None {
                return Ok(());
            }
            return Err(OrchestratorError::NotFound(format!(
                "entitlement for user {user_id}"
            )));
        }
        if from != to {
            self.repo.set_process(user_id, to).await?;
            tracing::debug!(user_id, from = %from, to = %to, "process changed");
        }
        Ok(())
    }
}
