//! Critic personas.
//!
//! A persona is a named role with a goal and a backstory. It carries no
//! behavior of its own: its only job is to become the system preamble that
//! frames one critique step.

use serde::Serialize;

/// A named critic role.
///
/// Personas are `const` data shared by every run of a pipeline; each run
/// builds its own step state around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Persona {
    /// Short human-readable title, unique within a pipeline.
    pub role: &'static str,
    /// One-sentence objective guiding the critique angle.
    pub goal: &'static str,
    /// Characterization that sets tone and strictness.
    pub backstory: &'static str,
}

impl Persona {
    /// Creates a persona.
    pub const fn new(role: &'static str, goal: &'static str, backstory: &'static str) -> Self {
        Self {
            role,
            goal,
            backstory,
        }
    }

    /// Renders the system preamble sent ahead of every task instruction.
    ///
    /// The first line is always `You are the <role>.`.
    pub fn preamble(&self) -> String {
        format!(
            "You are the {}.\nGoal: {}\nBackstory: {}\n\nStay in character. Write plain prose or markdown, not JSON.",
            self.role, self.goal, self.backstory
        )
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.role)
    }
}
