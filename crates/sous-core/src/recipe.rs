//! Recipe domain types and operation records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a persisted recipe
pub type RecipeId = u64;

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A recipe produced by the AI but not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub content: String,
}

impl RecipeDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A recipe owned by a user in the Recipe Store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecipe {
    pub id: RecipeId,
    pub owner: UserId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersistedRecipe {
    /// The title and content as a draft
    pub fn to_draft(&self) -> RecipeDraft {
        RecipeDraft::new(self.title.clone(), self.content.clone())
    }
}

/// Dietary preferences folded into every prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DietaryPreferences {
    pub restrictions: Vec<String>,
    pub allergies: Vec<String>,
    pub dislikes: Vec<String>,
    pub notes: Option<String>,
}

impl DietaryPreferences {
    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
            && self.allergies.is_empty()
            && self.dislikes.is_empty()
            && self.notes.as_deref().map_or(true, |n| n.trim().is_empty())
    }
}

/// The three logical call types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Generate,
    Modify,
    Save,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Generate,
        OperationKind::Modify,
        OperationKind::Save,
    ];

    /// Progressive form, used in status text
    pub fn activity(&self) -> &'static str {
        match self {
            OperationKind::Generate => "generating",
            OperationKind::Modify => "modifying",
            OperationKind::Save => "saving",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Generate => write!(f, "generate"),
            OperationKind::Modify => write!(f, "modify"),
            OperationKind::Save => write!(f, "save"),
        }
    }
}

/// Parameters of a generate call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateParams {
    /// Free-text wishes ("vegan", "under 30 minutes")
    pub additional_params: Option<String>,
    /// Existing recipe to take inspiration from
    pub base_recipe: Option<RecipeDraft>,
}

impl GenerateParams {
    pub fn with_additional(text: impl Into<String>) -> Self {
        Self {
            additional_params: Some(text.into()),
            base_recipe: None,
        }
    }
}

/// Parameters of a modify call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyParams {
    /// Requested changes to the recipe
    pub instructions: String,
}

impl ModifyParams {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }
}

/// Parameters of a save call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveParams {
    pub draft: RecipeDraft,
    pub is_new: bool,
    pub replace_target: Option<RecipeId>,
}

/// Result of a modify call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOutcome {
    pub original: PersistedRecipe,
    pub modified: RecipeDraft,
}

/// Parameters retained for retry-last
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationParams {
    Generate(GenerateParams),
    Modify(ModifyParams),
    Save(SaveParams),
}

/// The most recent operation, kept so it can be retried without the caller
/// re-supplying its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub kind: OperationKind,
    pub params: OperationParams,
    pub target_id: Option<RecipeId>,
}

impl OperationRecord {
    pub fn generate(params: GenerateParams) -> Self {
        Self {
            kind: OperationKind::Generate,
            params: OperationParams::Generate(params),
            target_id: None,
        }
    }

    pub fn modify(target_id: RecipeId, params: ModifyParams) -> Self {
        Self {
            kind: OperationKind::Modify,
            params: OperationParams::Modify(params),
            target_id: Some(target_id),
        }
    }

    pub fn save(params: SaveParams) -> Self {
        let target_id = params.replace_target;
        Self {
            kind: OperationKind::Save,
            params: OperationParams::Save(params),
            target_id,
        }
    }
}
