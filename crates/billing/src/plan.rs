//! Subscription plan catalog.
//!
//! The configured tier set; amounts are integer cents, every tier carries the
//! standard 30-day trial window.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Trial length applied to every tier.
pub const TRIAL_DAYS: u64 = 30;

/// One subscription tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Stable tier code used in signup requests, e.g. `standard`.
    pub code: String,
    pub display_name: String,
    pub monthly_amount_cents: i64,
}

/// The configured tier set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    /// Look up a tier by code (case-insensitive).
    pub fn find(&self, code: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.code.eq_ignore_ascii_case(code))
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.plans.iter().map(|p| p.code.as_str())
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }
}

impl Default for PlanCatalog {
    /// The shipped tier set: starter $19, standard $49, premium $99 per month.
    fn default() -> Self {
        Self::new(vec![
            Plan {
                code: "starter".to_string(),
                display_name: "Starter".to_string(),
                monthly_amount_cents: 1_900,
            },
            Plan {
                code: "standard".to_string(),
                display_name: "Standard".to_string(),
                monthly_amount_cents: 4_900,
            },
            Plan {
                code: "premium".to_string(),
                display_name: "Premium".to_string(),
                monthly_amount_cents: 9_900,
            },
        ])
    }
}

/// Trial window arithmetic shared by both tenant-creation paths:
/// trial ends `TRIAL_DAYS` after signup, first bill lands the day after.
pub fn trial_window(signup_date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let trial_ends_on = signup_date + Days::new(TRIAL_DAYS);
    let next_billing_date = trial_ends_on + Days::new(1);
    (trial_ends_on, next_billing_date)
}
