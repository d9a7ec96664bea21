use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// The kinds of tagged instruction a model turn can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DirectiveKind {
    SearchQuery,
    GraphQuery,
    Report,
}

/// A single instruction pulled out of one model turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    SearchQuery(String),
    GraphQuery(String),
    Report(String),
    None,
}

impl Directive {
    pub fn new<S: Into<String>>(kind: DirectiveKind, text: S) -> Self {
        match kind {
            DirectiveKind::SearchQuery => Directive::SearchQuery(text.into()),
            DirectiveKind::GraphQuery => Directive::GraphQuery(text.into()),
            DirectiveKind::Report => Directive::Report(text.into()),
        }
    }

    pub fn kind(&self) -> Option<DirectiveKind> {
        match self {
            Directive::SearchQuery(_) => Some(DirectiveKind::SearchQuery),
            Directive::GraphQuery(_) => Some(DirectiveKind::GraphQuery),
            Directive::Report(_) => Some(DirectiveKind::Report),
            Directive::None => None,
        }
    }

    /// Get the payload text, if any directive was found
    pub fn text(&self) -> Option<&str> {
        match self {
            Directive::SearchQuery(text) | Directive::GraphQuery(text) | Directive::Report(text) => {
                Some(text)
            }
            Directive::None => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Directive::None)
    }
}
