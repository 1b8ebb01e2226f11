//! Topic path construction.
//!
//! Every board subscription targets `/topic/{teamId}/{category}` with one
//! fixed suffix per category. Callers never assemble these strings.

use std::fmt;

/// The message categories a board subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Retro thoughts (happy / confused / sad columns).
    Thoughts,
    /// Action items.
    ActionItems,
    /// The end-of-retro signal.
    EndRetro,
}

impl Category {
    /// Fixed topic path suffix for the category.
    pub fn suffix(self) -> &'static str {
        match self {
            Category::Thoughts => "thoughts",
            Category::ActionItems => "action-items",
            Category::EndRetro => "end-retro",
        }
    }
}

/// A fully-formed broker topic for one team and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    team_id: String,
    category: Category,
}

impl Topic {
    /// Build the topic for a team and category.
    pub fn new(team_id: impl Into<String>, category: Category) -> Self {
        Self {
            team_id: team_id.into(),
            category,
        }
    }

    /// The team the topic is scoped to.
    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    /// The message category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// The wire destination path.
    pub fn path(&self) -> String {
        format!("/topic/{}/{}", self.team_id, self.category.suffix())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
