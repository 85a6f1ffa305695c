//! Fixed persona instructions and the per-query prompt template.

use std::fmt;
use std::str::FromStr;

use manas_index::RetrievedPassage;

pub const CONTEXT_PLACEHOLDER: &str = "{context_str}";
pub const QUERY_PLACEHOLDER: &str = "{query_str}";

const SAGE_SYSTEM_PROMPT: &str = include_str!("../prompts/sage.txt");
const DEVOTEE_SYSTEM_PROMPT: &str = include_str!("../prompts/devotee.txt");

const SAGE_QUERY_TEMPLATE: &str = "Context information from the sacred shastras is below.\n\
---------------------\n\
{context_str}\n\
---------------------\n\
You are Manas, a wise digital sage. Your internal knowledge is vast. You have been given the context above to supplement your understanding.\n\
Synthesize a complete answer that combines your own wisdom with the key information from the context, if it is relevant, to guide the seeker.\n\
Now, answer the question: {query_str}\n";

const DEVOTEE_QUERY_TEMPLATE: &str = "Context information from the sacred shastras is below.\n\
---------------------\n\
{context_str}\n\
---------------------\n\
You are Manas, a humble digital servant. Your internal knowledge has been shaped by the divine words of the Acharyas. You have been given the context above to supplement this understanding.\n\
Synthesize a complete answer that combines your devotional wisdom with the key information from the context, if it is relevant, to guide the seeker.\n\
Now, answer the question: {query_str}\n";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PersonaError {
    #[error("unknown persona '{0}' (expected 'sage' or 'devotee')")]
    Unknown(String),
    #[error("query template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersonaKind {
    /// Contemplative sage; quotes only what the context actually contains.
    #[default]
    Sage,
    /// Devotional servant; always quotes scripture and adds a purport.
    Devotee,
}

impl PersonaKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sage => "sage",
            Self::Devotee => "devotee",
        }
    }
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonaKind {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sage" => Ok(Self::Sage),
            "devotee" => Ok(Self::Devotee),
            _ => Err(PersonaError::Unknown(s.to_owned())),
        }
    }
}

/// System instruction plus query template, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct Persona {
    kind: PersonaKind,
    query_template: String,
}

impl Persona {
    #[must_use]
    pub fn new(kind: PersonaKind) -> Self {
        let query_template = match kind {
            PersonaKind::Sage => SAGE_QUERY_TEMPLATE,
            PersonaKind::Devotee => DEVOTEE_QUERY_TEMPLATE,
        };
        Self {
            kind,
            query_template: query_template.to_owned(),
        }
    }

    /// Replace the query template.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError::MissingPlaceholder`] unless the template contains
    /// both `{context_str}` and `{query_str}`.
    pub fn with_query_template(mut self, template: impl Into<String>) -> Result<Self, PersonaError> {
        let template = template.into();
        validate_template(&template)?;
        self.query_template = template;
        Ok(self)
    }

    #[must_use]
    pub fn kind(&self) -> PersonaKind {
        self.kind
    }

    #[must_use]
    pub fn query_template(&self) -> &str {
        &self.query_template
    }

    #[must_use]
    pub fn build_system_prompt(&self) -> &'static str {
        match self.kind {
            PersonaKind::Sage => SAGE_SYSTEM_PROMPT.trim(),
            PersonaKind::Devotee => DEVOTEE_SYSTEM_PROMPT.trim(),
        }
    }

    #[must_use]
    pub fn build_query_prompt(&self, context_str: &str, query_str: &str) -> String {
        render(&self.query_template, context_str, query_str)
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::new(PersonaKind::default())
    }
}

/// # Errors
///
/// Returns the first placeholder the template lacks.
pub fn validate_template(template: &str) -> Result<(), PersonaError> {
    for placeholder in [CONTEXT_PLACEHOLDER, QUERY_PLACEHOLDER] {
        if !template.contains(placeholder) {
            return Err(PersonaError::MissingPlaceholder(placeholder));
        }
    }
    Ok(())
}

/// Render retrieved passages as the `{context_str}` block.
#[must_use]
pub fn format_context(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| format!("file_path: {}\n\n{}", p.file_path, p.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Substitute placeholders in one left-to-right pass; substituted text is
/// never rescanned.
fn render(template: &str, context_str: &str, query_str: &str) -> String {
    let mut out = String::with_capacity(template.len() + context_str.len() + query_str.len());
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
            out.push_str(context_str);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(QUERY_PLACEHOLDER) {
            out.push_str(query_str);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
