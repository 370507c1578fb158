//! Override 决议：not-applicable > default-skip > user-skip > catalog skip-type > 观测值

use std::collections::{BTreeMap, BTreeSet};

use crate::utils::ObservedState;

/// Catalog check type that marks a check as not applicable by definition.
pub const CHECK_TYPE_SKIP: &str = "skip";

/// How a check's state is decided before any host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Disposition {
    /// State comes from what hosts report.
    #[default]
    Observed,
    /// Forced skip. `remediation` replaces the catalog text when present.
    Skip { remediation: Option<String> },
    /// Forced not-applicable. `remediation` replaces the catalog text when present.
    NotApplicable { remediation: Option<String> },
}

impl Disposition {
    /// State an observation is forced to, `None` when the observed state stands.
    pub fn forced_state(&self) -> Option<ObservedState> {
        match self {
            Disposition::Observed => None,
            Disposition::Skip { .. } => Some(ObservedState::Skip),
            Disposition::NotApplicable { .. } => Some(ObservedState::NotApplicable),
        }
    }

    pub fn remediation(&self) -> Option<&str> {
        match self {
            Disposition::Observed => None,
            Disposition::Skip { remediation } | Disposition::NotApplicable { remediation } => {
                remediation.as_deref()
            }
        }
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Disposition::NotApplicable { .. })
    }
}

/// Operator and catalog overrides, fixed for the whole run.
#[derive(Debug, Clone, Default)]
pub struct OverrideResolver {
    not_applicable: BTreeMap<String, String>,
    default_skip: BTreeMap<String, String>,
    user_skip: BTreeSet<String>,
}

impl OverrideResolver {
    pub fn new(
        not_applicable: BTreeMap<String, String>,
        default_skip: BTreeMap<String, String>,
        user_skip: BTreeSet<String>,
    ) -> Self {
        Self { not_applicable, default_skip, user_skip }
    }

    pub fn resolve(&self, check_id: &str, check_type: &str) -> Disposition {
        if let Some(msg) = self.not_applicable.get(check_id) {
            return Disposition::NotApplicable { remediation: Some(msg.clone()) };
        }
        if let Some(msg) = self.default_skip.get(check_id) {
            return Disposition::Skip { remediation: Some(msg.clone()) };
        }
        if self.user_skip.contains(check_id) {
            return Disposition::Skip { remediation: None };
        }
        if check_type == CHECK_TYPE_SKIP {
            return Disposition::NotApplicable { remediation: None };
        }
        Disposition::Observed
    }

    /// Applies the resolved disposition to a reported state.
    pub fn apply(&self, check_id: &str, check_type: &str, observed: ObservedState) -> ObservedState {
        self.resolve(check_id, check_type).forced_state().unwrap_or(observed)
    }
}
