//! Feed records, drafts, and user profiles.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{RecordId, TaskKind, UserId};

/// One GPS sample along a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Instantaneous speed in km/h.
    pub speed_kmh: f64,
}

/// One item on a daily plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Item identifier, unique within its plan.
    pub id: String,
    /// Item text.
    pub text: String,
    /// Completion flag.
    pub is_completed: bool,
    /// Task kind that completes this item automatically, if mandatory.
    pub mandatory_for: Option<TaskKind>,
}

/// Comment left on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment identifier.
    pub id: String,
    /// Author user id.
    pub author_id: UserId,
    /// Trimmed comment text.
    pub text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Kind-specific record content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordBody {
    /// A logged run.
    Running {
        /// Optional title.
        title: Option<String>,
        /// When the run happened, if different from submission time.
        event_at: Option<DateTime<Utc>>,
        /// Distance in kilometres.
        distance_km: f64,
        /// Duration in seconds.
        duration_secs: u64,
        /// Recorded route.
        path: Vec<PathPoint>,
        /// Free-form notes.
        description: Option<String>,
    },
    /// Wake-up confirmation.
    WakeUp {
        /// Free-form notes.
        description: Option<String>,
    },
    /// Daily to-do plan.
    DailyPlan {
        /// Calendar day the plan covers.
        plan_date: NaiveDate,
        /// Plan items.
        todos: Vec<TodoItem>,
    },
    /// Book reading session.
    BookReading {
        /// Book title.
        book_title: String,
        /// Pages read in this session.
        pages_read: u32,
        /// Optional review.
        review: Option<String>,
    },
}

impl RecordBody {
    /// Task kind of this body.
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Running { .. } => TaskKind::Running,
            Self::WakeUp { .. } => TaskKind::WakeUp,
            Self::DailyPlan { .. } => TaskKind::DailyPlan,
            Self::BookReading { .. } => TaskKind::BookReading,
        }
    }

    /// Calendar day this body counts towards, given its submission time.
    pub fn activity_day(&self, created_at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
        match self {
            Self::DailyPlan { plan_date, .. } => *plan_date,
            Self::Running {
                event_at: Some(at), ..
            } => at.with_timezone(&offset).date_naive(),
            _ => created_at.with_timezone(&offset).date_naive(),
        }
    }
}

/// Where a record stands relative to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Confirmed by the remote service.
    Synced,
    /// Known only locally; waiting in the mutation queue.
    Pending,
    /// Retry budget spent; needs a manual retry or discard.
    Failed,
}

/// Fully materialized feed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Temporary or canonical identifier.
    pub id: RecordId,
    /// Owning user.
    pub owner_id: UserId,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Kind-specific content.
    pub body: RecordBody,
    /// Users who liked this record.
    #[serde(default)]
    pub liked_by: Vec<UserId>,
    /// Comments in posting order.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// True while only locally known.
    #[serde(default)]
    pub offline: bool,
    /// True after the retry budget was exhausted.
    #[serde(default)]
    pub sync_failed: bool,
}

impl Record {
    /// Builds a fresh record with empty social state.
    pub fn new(
        id: RecordId,
        owner_id: UserId,
        created_at: DateTime<Utc>,
        body: RecordBody,
        offline: bool,
    ) -> Self {
        Self {
            id,
            owner_id,
            created_at,
            body,
            liked_by: Vec::new(),
            comments: Vec::new(),
            offline,
            sync_failed: false,
        }
    }

    /// Task kind of this record.
    pub fn kind(&self) -> TaskKind {
        self.body.kind()
    }

    /// Calendar day this record counts towards.
    pub fn activity_day(&self, offset: FixedOffset) -> NaiveDate {
        self.body.activity_day(self.created_at, offset)
    }

    /// Sync status derived from the flags.
    pub fn status(&self) -> RecordStatus {
        if self.sync_failed {
            RecordStatus::Failed
        } else if self.offline {
            RecordStatus::Pending
        } else {
            RecordStatus::Synced
        }
    }

    /// Short name used in user-facing messages.
    pub fn label(&self) -> String {
        match &self.body {
            RecordBody::BookReading { book_title, .. } => format!("\"{book_title}\""),
            RecordBody::Running {
                title: Some(title), ..
            } => format!("\"{title}\""),
            body => format!("{} {}", body.kind(), self.id),
        }
    }

    /// Adds or removes `user_id` from the likes.
    pub fn toggle_like(&mut self, user_id: &str) {
        if let Some(pos) = self.liked_by.iter().position(|u| u == user_id) {
            self.liked_by.remove(pos);
        } else {
            self.liked_by.push(user_id.to_string());
        }
    }

    /// Flips a non-mandatory plan item. Returns false when nothing changed.
    pub fn toggle_todo(&mut self, todo_id: &str) -> bool {
        let RecordBody::DailyPlan { todos, .. } = &mut self.body else {
            return false;
        };
        match todos
            .iter_mut()
            .find(|t| t.id == todo_id && t.mandatory_for.is_none())
        {
            Some(todo) => {
                todo.is_completed = !todo.is_completed;
                true
            }
            None => false,
        }
    }

    /// Marks open mandatory items for `kind` complete. Returns true if any changed.
    pub fn complete_mandatory(&mut self, kind: TaskKind) -> bool {
        let RecordBody::DailyPlan { todos, .. } = &mut self.body else {
            return false;
        };
        let mut changed = false;
        for todo in todos
            .iter_mut()
            .filter(|t| t.mandatory_for == Some(kind) && !t.is_completed)
        {
            todo.is_completed = true;
            changed = true;
        }
        changed
    }
}

/// Input for creating a record. The repository fills in id, owner and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    /// Kind-specific content.
    pub body: RecordBody,
    /// Submission time; defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

impl RecordDraft {
    /// Draft submitted now.
    pub fn new(body: RecordBody) -> Self {
        Self {
            body,
            created_at: None,
        }
    }

    /// Draft with an explicit submission time.
    pub fn at(body: RecordBody, created_at: DateTime<Utc>) -> Self {
        Self {
            body,
            created_at: Some(created_at),
        }
    }
}

/// Identity of a user, as held in the session and user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User identifier.
    pub id: UserId,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Optional avatar URL.
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// "Name Surname".
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

/// Profile edit. `avatar_url: None` keeps the current avatar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfilePatch {
    /// New given name.
    pub name: String,
    /// New family name.
    pub surname: String,
    /// Replacement avatar URL.
    pub avatar_url: Option<String>,
}

impl ProfilePatch {
    /// Applies this patch in place.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        profile.name = self.name.clone();
        profile.surname = self.surname.clone();
        if let Some(url) = &self.avatar_url {
            profile.avatar_url = Some(url.clone());
        }
    }
}
