//! Prompt template loading and rendering via `minijinja`.
//!
//! Every template ships with the binary. A templates directory can override
//! any of them by file name (`mood.j2`, `system.j2`, ...), and host settings
//! can override an extractor's template by name. Settings win over the
//! directory, which wins over the built-in copy.

use std::path::Path;

use minijinja::{Environment, UndefinedBehavior};

use crate::error::RunnerError;
use crate::extractor::ExtractorKind;
use crate::settings::Settings;

/// Template rendered as the system message for every call.
pub const SYSTEM_TEMPLATE: &str = "system";

/// Template rendered when a chat is first initialized.
pub const INITIAL_TEMPLATE: &str = "initial";

/// Built-in templates, keyed by name.
const BUILTIN: &[(&str, &str)] = &[
    ("system", include_str!("../templates/system.j2")),
    ("messages", include_str!("../templates/messages.j2")),
    ("scene", include_str!("../templates/scene.j2")),
    ("initial", include_str!("../templates/initial.j2")),
    ("time", include_str!("../templates/time.j2")),
    ("location", include_str!("../templates/location.j2")),
    ("climate", include_str!("../templates/climate.j2")),
    ("topic_tone", include_str!("../templates/topic_tone.j2")),
    ("tension", include_str!("../templates/tension.j2")),
    ("presence", include_str!("../templates/presence.j2")),
    ("position", include_str!("../templates/position.j2")),
    ("activity", include_str!("../templates/activity.j2")),
    ("mood", include_str!("../templates/mood.j2")),
    ("physical", include_str!("../templates/physical.j2")),
    ("outfit", include_str!("../templates/outfit.j2")),
    ("profile", include_str!("../templates/profile.j2")),
    ("props", include_str!("../templates/props.j2")),
    (
        "relationship_subjects",
        include_str!("../templates/relationship_subjects.j2"),
    ),
    ("feelings", include_str!("../templates/feelings.j2")),
    ("secrets", include_str!("../templates/secrets.j2")),
    ("wants", include_str!("../templates/wants.j2")),
    ("status", include_str!("../templates/status.j2")),
    ("narrative", include_str!("../templates/narrative.j2")),
    ("chapter", include_str!("../templates/chapter.j2")),
    (
        "mood_consolidation",
        include_str!("../templates/mood_consolidation.j2"),
    ),
    (
        "physical_consolidation",
        include_str!("../templates/physical_consolidation.j2"),
    ),
    (
        "feelings_consolidation",
        include_str!("../templates/feelings_consolidation.j2"),
    ),
    (
        "wants_consolidation",
        include_str!("../templates/wants_consolidation.j2"),
    ),
];

/// Manages prompt template loading and rendering.
///
/// Wraps a `minijinja` [`Environment`] with every template pre-loaded.
/// Missing context values render as empty rather than failing, so a
/// template may reference state that is not known yet.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl core::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PromptEngine")
            .field("templates", &self.env.templates().count())
            .finish()
    }
}

/// The complete rendered prompt ready to send to a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message framing the task.
    pub system: String,
    /// User message with state, transcript window, and response format.
    pub user: String,
}

impl PromptEngine {
    /// Build the engine from built-ins, an optional override directory, and
    /// settings overrides.
    pub fn new(templates_dir: Option<&Path>, settings: &Settings) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_trim_blocks(true);

        for (name, builtin) in BUILTIN {
            let source = match settings.prompt_override(name) {
                Some(text) => text.to_owned(),
                None => match templates_dir {
                    Some(dir) => load_template(dir, name)?.unwrap_or_else(|| (*builtin).to_owned()),
                    None => (*builtin).to_owned(),
                },
            };
            env.add_template_owned((*name).to_owned(), source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }

        Ok(Self { env })
    }

    /// Built-in templates only.
    pub fn builtin() -> Result<Self, RunnerError> {
        Self::new(None, &Settings::default())
    }

    /// Render the system message and the named user template.
    pub fn render(
        &self,
        name: &str,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        let system = self.render_one(SYSTEM_TEMPLATE, context)?;
        let user = self.render_one(name, context)?;
        Ok(RenderedPrompt { system, user })
    }

    /// Render the user prompt for an extractor.
    pub fn render_extractor(
        &self,
        kind: ExtractorKind,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        self.render(kind.as_str(), context)
    }

    fn render_one(&self, name: &str, context: &serde_json::Value) -> Result<String, RunnerError> {
        let rendered = self
            .env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))?;
        Ok(rendered.trim().to_owned())
    }
}

/// Read `{name}.j2` from `dir` if it exists.
fn load_template(dir: &Path, name: &str) -> Result<Option<String>, RunnerError> {
    let path = dir.join(format!("{name}.j2"));
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|e| RunnerError::Template(format!("failed to read {}: {e}", path.display())))
}
