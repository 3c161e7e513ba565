//! Pipeline definitions.
//!
//! A [`PipelineSpec`] is the stateless, `const` description of one
//! (domain, tier) crew: an ordered list of critic steps plus a consolidation
//! step that may or may not run. [`PipelineSpec::plan`] turns it into the
//! concrete step sequence for a single run.
//!
//! Dependency direction is checked by [`PipelineSpec::is_well_formed`], a
//! `const fn` that every catalog row asserts at compile time:
//!
//! ```ignore
//! const _: () = assert!(MY_PIPELINE.is_well_formed());
//! ```

use serde::Serialize;

use super::registry::{Domain, Tier};
use super::step::StepSpec;

/// Stateless definition of one (domain, tier) crew.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PipelineSpec {
    pub domain: Domain,
    pub tier: Tier,
    /// Display name of the crew.
    pub name: &'static str,
    /// Critic steps in execution order.
    pub critics: &'static [StepSpec],
    /// Final step that merges critic outputs into one report.
    pub consolidator: StepSpec,
    /// Whether runs include the consolidator unless told otherwise.
    pub consolidate_by_default: bool,
}

impl PipelineSpec {
    /// Checks the structural invariants of the definition.
    ///
    /// - at least one critic
    /// - every critic dependency points to an earlier critic
    /// - no dependency list repeats an index
    /// - the consolidator depends on at least two critics, all of which exist
    /// - persona roles are unique across critics and consolidator
    pub const fn is_well_formed(&self) -> bool {
        let critics = self.critics;
        if critics.is_empty() {
            return false;
        }

        let mut i = 0;
        while i < critics.len() {
            let deps = critics[i].depends_on;
            if !deps_are_valid(deps, i) {
                return false;
            }
            i += 1;
        }

        let deps = self.consolidator.depends_on;
        if deps.len() < 2 || !deps_are_valid(deps, critics.len()) {
            return false;
        }

        let mut a = 0;
        while a < critics.len() {
            if str_eq(critics[a].persona.role, self.consolidator.persona.role) {
                return false;
            }
            let mut b = a + 1;
            while b < critics.len() {
                if str_eq(critics[a].persona.role, critics[b].persona.role) {
                    return false;
                }
                b += 1;
            }
            a += 1;
        }

        true
    }

    /// Builds the step sequence for one run.
    ///
    /// `consolidate` overrides the row default when set.
    pub fn plan(&'static self, consolidate: Option<bool>) -> ReviewPlan {
        let consolidated = consolidate.unwrap_or(self.consolidate_by_default);
        let mut steps: Vec<&'static StepSpec> = self.critics.iter().collect();
        if consolidated {
            steps.push(&self.consolidator);
        }
        ReviewPlan {
            spec: self,
            steps,
            consolidated,
        }
    }

    /// Roles of every persona in the row, consolidator last.
    pub fn roles(&self) -> Vec<&'static str> {
        self.critics
            .iter()
            .map(|s| s.persona.role)
            .chain(std::iter::once(self.consolidator.persona.role))
            .collect()
    }
}

/// Concrete, ordered step list for one pipeline run.
#[derive(Debug, Clone)]
pub struct ReviewPlan {
    pub spec: &'static PipelineSpec,
    pub steps: Vec<&'static StepSpec>,
    /// True when the last step is the consolidator.
    pub consolidated: bool,
}

impl ReviewPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

const fn deps_are_valid(deps: &[usize], position: usize) -> bool {
    let mut j = 0;
    while j < deps.len() {
        if deps[j] >= position {
            return false;
        }
        let mut k = j + 1;
        while k < deps.len() {
            if deps[j] == deps[k] {
                return false;
            }
            k += 1;
        }
        j += 1;
    }
    true
}

const fn str_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::persona::Persona;

    const fn step(role: &'static str, depends_on: &'static [usize]) -> StepSpec {
        StepSpec {
            persona: Persona::new(role, "goal", "backstory"),
            instruction: "{primary}",
            expected_output: "notes",
            depends_on,
        }
    }

    const CRITICS: &[StepSpec] = &[step("A", &[]), step("B", &[0]), step("C", &[])];

    static GOOD: PipelineSpec = PipelineSpec {
        domain: Domain::History,
        tier: Tier::Macro,
        name: "test",
        critics: CRITICS,
        consolidator: step("Lead", &[0, 1, 2]),
        consolidate_by_default: false,
    };

    const fn with(critics: &'static [StepSpec], consolidator: StepSpec) -> PipelineSpec {
        PipelineSpec {
            domain: Domain::History,
            tier: Tier::Macro,
            name: "test",
            critics,
            consolidator,
            consolidate_by_default: true,
        }
    }

    #[test]
    fn test_well_formed_pipeline() {
        assert!(GOOD.is_well_formed());
    }

    #[test]
    fn test_forward_dependency_rejected() {
        const FORWARD: &[StepSpec] = &[step("A", &[1]), step("B", &[])];
        assert!(!with(FORWARD, step("Lead", &[0, 1])).is_well_formed());

        const SELF_DEP: &[StepSpec] = &[step("A", &[]), step("B", &[1])];
        assert!(!with(SELF_DEP, step("Lead", &[0, 1])).is_well_formed());
    }

    #[test]
    fn test_duplicate_dependency_rejected() {
        const DUP: &[StepSpec] = &[step("A", &[]), step("B", &[0, 0])];
        assert!(!with(DUP, step("Lead", &[0, 1])).is_well_formed());
    }

    #[test]
    fn test_consolidator_needs_two_existing_critics() {
        assert!(!with(CRITICS, step("Lead", &[0])).is_well_formed());
        assert!(!with(CRITICS, step("Lead", &[0, 3])).is_well_formed());
    }

    #[test]
    fn test_duplicate_roles_rejected() {
        const TWINS: &[StepSpec] = &[step("A", &[]), step("A", &[])];
        assert!(!with(TWINS, step("Lead", &[0, 1])).is_well_formed());
        assert!(!with(CRITICS, step("B", &[0, 1])).is_well_formed());
    }

    #[test]
    fn test_plan_respects_default_and_override() {
        let plan = GOOD.plan(None);
        assert!(!plan.consolidated);
        assert_eq!(plan.len(), 3);

        let plan = GOOD.plan(Some(true));
        assert!(plan.consolidated);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.steps[3].persona.role, "Lead");
    }

    #[test]
    fn test_roles_lists_consolidator_last() {
        assert_eq!(GOOD.roles(), vec!["A", "B", "C", "Lead"]);
    }
}
