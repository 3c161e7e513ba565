//! Critique step definitions and instruction rendering.

use serde::Serialize;

use super::persona::Persona;

/// Title used when the caller supplies none.
pub const UNTITLED: &str = "Untitled project";

/// Context text used when the caller supplies none.
pub const NO_CONTEXT: &str = "(no macro context provided)";

/// One bounded unit of critique work.
///
/// `depends_on` holds indices of earlier steps in the same pipeline; their
/// outputs are fed into this step's instruction in the declared order.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepSpec {
    /// Persona that performs the step.
    pub persona: Persona,
    /// Instruction template. Placeholders: `{title}`, `{primary}`, `{context}`, `{prior}`.
    pub instruction: &'static str,
    /// Short description of what the step must produce.
    pub expected_output: &'static str,
    /// Indices of earlier steps whose outputs this step consumes.
    pub depends_on: &'static [usize],
}

impl StepSpec {
    /// Renders the task instruction for one run.
    ///
    /// `prior` must hold the outputs of `depends_on`, in the same order.
    pub fn render_instruction(&self, inputs: &RunInputs, prior: &[PriorOutput<'_>]) -> String {
        let prior_block = render_prior(prior);
        let title = inputs.title_or_default();
        let context = inputs.context_or_default();

        let mut rendered = fill_template(
            self.instruction,
            &[
                ("title", title),
                ("primary", inputs.primary_text.as_str()),
                ("context", context),
                ("prior", prior_block.as_str()),
            ],
        );

        if !prior.is_empty() && !self.instruction.contains("{prior}") {
            rendered.push_str("\n\nPRIOR REVIEWS:\n");
            rendered.push_str(&prior_block);
        }

        rendered.push_str("\n\nExpected output: ");
        rendered.push_str(self.expected_output);
        rendered
    }
}

/// Run-time inputs shared by every step of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInputs {
    /// The document under review (macro text or micro text).
    pub primary_text: String,
    /// Macro context for micro-tier reviews.
    pub context_text: Option<String>,
    /// Project title.
    pub title: Option<String>,
}

impl RunInputs {
    /// Creates inputs with only the primary text.
    pub fn new(primary_text: impl Into<String>) -> Self {
        Self {
            primary_text: primary_text.into(),
            context_text: None,
            title: None,
        }
    }

    /// Sets the context text. Blank text counts as absent.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context_text = (!context.trim().is_empty()).then_some(context);
        self
    }

    /// Sets the project title. Blank titles count as absent.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.title = (!title.trim().is_empty()).then_some(title);
        self
    }

    /// Whether the primary text has any non-whitespace content.
    pub fn has_primary_text(&self) -> bool {
        !self.primary_text.trim().is_empty()
    }

    fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED)
    }

    fn context_or_default(&self) -> &str {
        self.context_text.as_deref().unwrap_or(NO_CONTEXT)
    }
}

/// Output of an earlier step, labelled by the persona that wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorOutput<'a> {
    pub role: &'a str,
    pub text: &'a str,
}

/// Renders prior outputs as `### <role>` blocks separated by blank lines.
pub fn render_prior(prior: &[PriorOutput<'_>]) -> String {
    prior
        .iter()
        .map(|p| format!("### {}\n{}", p.role, p.text.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Substitutes `{name}` placeholders in one pass over the template.
///
/// Values are inserted verbatim and never rescanned, so braces inside user
/// text survive untouched. Unknown placeholders are left as written.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
