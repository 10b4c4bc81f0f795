use crate::cohort::User;
use crate::config::Config;
use crate::content::{ContentItem, ContentRef, ContentResolver};
use crate::error::{DaybookError, Result};
use crate::evaluator::{evaluate, ContentBinding};
use crate::plan::{Action, WeeklyResource};
use crate::progress::{Aggregate, ProgressAggregator, ProgressConflict};
use crate::schedule::{DayResolver, ResolvedDay};
use crate::store::{ContentStore, DirectoryStore, PlanStore, ProgressStore};
use crate::types::{ProgramState, ProgressSource, ProgressStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// The four collaborators a view is composed from. They may be the same
/// object or four different backends.
#[derive(Clone, Copy)]
pub struct Stores<'a> {
    pub directory: &'a dyn DirectoryStore,
    pub plan: &'a dyn PlanStore,
    pub content: &'a dyn ContentStore,
    pub progress: &'a dyn ProgressStore,
}

impl<'a> Stores<'a> {
    pub fn uniform<S>(store: &'a S) -> Self
    where
        S: DirectoryStore + PlanStore + ContentStore + ProgressStore,
    {
        Self {
            directory: store,
            plan: store,
            content: store,
            progress: store,
        }
    }
}

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// Outcome of resolving one action's resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContentState {
    Resolved { item: ContentItem },
    Link { url: String },
    /// The reference points at nothing. Only this action is affected.
    Unavailable { content_ref: ContentRef, reason: String },
    Unbound,
}

impl ContentState {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ContentState::Unavailable { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionView {
    pub action_id: String,
    pub label: String,
    pub action_type: String,
    pub required: bool,
    pub counted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    pub content: ContentState,
    pub status: ProgressStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_source: Option<ProgressSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyResourceView {
    pub id: String,
    pub label: String,
    pub kind: String,
    pub content: ContentState,
    pub status: ProgressStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayView {
    pub user_id: String,
    pub state: ProgramState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_day: Option<i64>,
    pub day_number: i64,
    pub day_id: String,
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    pub actions: Vec<ActionView>,
    /// Suppressed from the day's lists but still completable directly.
    pub hidden_actions: Vec<ActionView>,
    pub weekly_resources: Vec<WeeklyResourceView>,
    pub required_count: usize,
    pub completed_required_count: usize,
    pub conflicts: Vec<ProgressConflict>,
}

impl DayView {
    pub fn is_complete(&self) -> bool {
        self.completed_required_count >= self.required_count
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

pub struct Composer<'a> {
    pub(crate) stores: Stores<'a>,
    pub(crate) config: &'a Config,
}

impl<'a> Composer<'a> {
    pub fn new(stores: Stores<'a>, config: &'a Config) -> Self {
        Self { stores, config }
    }

    pub fn resolver(&self) -> DayResolver<'a> {
        DayResolver::new(
            self.stores.directory,
            self.stores.plan,
            &self.config.schedule,
        )
    }

    pub fn aggregator(&self) -> ProgressAggregator<'a> {
        ProgressAggregator::new(self.stores.progress, &self.config.progress)
    }

    pub fn content_resolver(&self) -> ContentResolver<'a> {
        ContentResolver::new(self.stores.content, &self.config.content)
    }

    /// What `user_key` (id or email) must do on the day containing `as_of`,
    /// and what they have already completed.
    ///
    /// Day-level failures (unknown user, ambiguous or unscheduled day, store
    /// errors) abort the call. A broken content reference degrades only its
    /// own action to [`ContentState::Unavailable`].
    pub fn compose_day_view(&self, user_key: &str, as_of: DateTime<Utc>) -> Result<DayView> {
        let resolver = self.resolver();
        let user = resolver.find_user(user_key)?;
        let day = resolver.resolve_day(&user, as_of)?;
        self.compose(&user, day)
    }

    fn compose(&self, user: &User, day: ResolvedDay) -> Result<DayView> {
        let identified: Vec<(String, &Action)> = day.entry.identified_actions().collect();
        let mut ids: Vec<String> = identified.iter().map(|(id, _)| id.clone()).collect();
        ids.extend(day.weekly_resources.iter().map(|r| r.id.clone()));
        let progress = self.aggregator().aggregate(&user.id, &ids)?;

        let mut actions = Vec::new();
        let mut hidden_actions = Vec::new();
        for (id, action) in identified {
            let view = self.action_view(id, action, &progress)?;
            if action.hidden {
                hidden_actions.push(view);
            } else {
                actions.push(view);
            }
        }

        let weekly_resources = day
            .weekly_resources
            .iter()
            .map(|r| self.weekly_view(r, &progress))
            .collect::<Result<Vec<_>>>()?;

        let counted: Vec<&ActionView> = actions.iter().filter(|a| a.counted).collect();
        let required_count = counted.len();
        let completed_required_count = counted
            .iter()
            .filter(|a| a.status.is_completed())
            .count();

        tracing::debug!(
            user_id = %user.id,
            day_number = day.position.day_number,
            required_count,
            completed_required_count,
            conflicts = progress.conflicts.len(),
            "day view composed"
        );

        Ok(DayView {
            user_id: user.id.clone(),
            state: day.position.state,
            calendar_day: day.position.calendar_day,
            day_number: day.position.day_number,
            day_id: day.entry.id.clone(),
            phase: day.phase,
            title: day.entry.title.clone(),
            week: day.week,
            actions,
            hidden_actions,
            weekly_resources,
            required_count,
            completed_required_count,
            conflicts: progress.conflicts,
        })
    }

    fn action_view(&self, id: String, action: &Action, progress: &Aggregate) -> Result<ActionView> {
        let eval = evaluate(action, &self.config.actions);
        let resolved = progress.statuses.get(&id);
        Ok(ActionView {
            label: action.label.clone(),
            action_type: action.action_type.clone(),
            required: eval.required,
            counted: eval.counted,
            estimated_minutes: action.estimated_minutes,
            content: self.content_state(eval.binding)?,
            status: resolved.map(|r| r.status).unwrap_or(ProgressStatus::NotStarted),
            status_source: resolved.and_then(|r| r.source),
            action_id: id,
        })
    }

    fn weekly_view(&self, res: &WeeklyResource, progress: &Aggregate) -> Result<WeeklyResourceView> {
        let binding = match (&res.content_ref, res.url.as_deref().map(str::trim)) {
            (Some(r), _) => ContentBinding::Library {
                content_ref: r.clone(),
            },
            (None, Some(url)) if !url.is_empty() => ContentBinding::Link {
                url: url.to_string(),
            },
            _ => ContentBinding::Unbound,
        };
        Ok(WeeklyResourceView {
            id: res.id.clone(),
            label: res.label.clone(),
            kind: res.kind.clone(),
            content: self.content_state(binding)?,
            status: progress.status_of(&res.id),
        })
    }

    fn content_state(&self, binding: ContentBinding) -> Result<ContentState> {
        match binding {
            ContentBinding::Library { content_ref } => {
                match self.content_resolver().resolve(&content_ref) {
                    Ok(item) => Ok(ContentState::Resolved { item }),
                    Err(e @ DaybookError::ContentNotFound { .. }) => Ok(ContentState::Unavailable {
                        content_ref,
                        reason: e.to_string(),
                    }),
                    Err(e) => Err(e),
                }
            }
            ContentBinding::Link { url } => Ok(ContentState::Link { url }),
            ContentBinding::Unbound => Ok(ContentState::Unbound),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
