use crate::config::ActionsConfig;
use crate::content::ContentRef;
use crate::plan::Action;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ContentBinding
// ---------------------------------------------------------------------------

/// What an action's resource fields point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBinding {
    /// A content item to resolve through the content stores.
    Library { content_ref: ContentRef },
    /// A bare URL with no library item behind it.
    Link { url: String },
    Unbound,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub required: bool,
    pub hidden: bool,
    /// Whether the action contributes to the day's required-items total.
    pub counted: bool,
    pub binding: ContentBinding,
}

/// Reduce an authored action to a single requiredness decision.
///
/// Precedence:
/// 1. `hidden == true` excludes the action from the day's lists entirely.
/// 2. `required == Some(true)` is required.
/// 3. `required == Some(false)` is not required.
/// 4. Absent `required` means required unless `optional == Some(true)`.
/// 5. Types listed in `actions.uncounted_types` never count toward the total,
///    whatever steps 1-4 decided.
pub fn evaluate(action: &Action, config: &ActionsConfig) -> Evaluation {
    let binding = bind_content(action);
    if action.hidden {
        return Evaluation {
            required: false,
            hidden: true,
            counted: false,
            binding,
        };
    }
    let required = match action.required {
        Some(explicit) => explicit,
        None => action.optional != Some(true),
    };
    let counted = required && !config.is_uncounted(&action.action_type);
    Evaluation {
        required,
        hidden: false,
        counted,
        binding,
    }
}

/// `content_ref` wins; else `resource_id` typed by `resource_type` (falling
/// back to the action type); else a bare `url`.
pub fn bind_content(action: &Action) -> ContentBinding {
    if let Some(r) = &action.content_ref {
        return ContentBinding::Library {
            content_ref: r.clone(),
        };
    }
    if let Some(id) = action.resource_id.as_deref().filter(|s| !s.trim().is_empty()) {
        let content_type = action
            .resource_type
            .clone()
            .unwrap_or_else(|| action.action_type.clone());
        return ContentBinding::Library {
            content_ref: ContentRef::new(content_type, id),
        };
    }
    match action.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => ContentBinding::Link {
            url: url.to_string(),
        },
        _ => ContentBinding::Unbound,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
