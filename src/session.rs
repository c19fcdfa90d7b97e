// Active identity: injected into the aggregator's callers and every
// engagement controller instead of being read from ambient global state.

use anyhow::Result;
use tracing::debug;

use crate::api::traits::FeedBackend;
use crate::feed::models::{Author, UserProfile};

/// Nickname the backend falls back to for users without one.
pub const ANONYMOUS_HANDLE: &str = "anon";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Stable identity-provider id carried by every mutation call.
    pub user_id: String,
    pub display_name: String,
    pub handle: String,
    pub avatar: Option<String>,
}

impl Session {
    /// A session that knows only the user id.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: String::new(),
            handle: ANONYMOUS_HANDLE.to_string(),
            avatar: None,
        }
    }

    /// No active identity. Mutations are no-ops under this session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_signed_in(&self) -> bool {
        !self.user_id.trim().is_empty()
    }

    /// The session as an author record, for denormalized reposts.
    pub fn as_author(&self) -> Author {
        Author {
            id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            handle: self.handle.clone(),
            avatar: self.avatar.clone(),
        }
    }

    /// Name shown next to comments: display name, then handle.
    pub fn user_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.handle
        } else {
            &self.display_name
        }
    }

    /// Build a session for `user_id`, enriched with the backend's profile.
    ///
    /// A user the backend doesn't know yet is not an error; the session
    /// just keeps the bare id and the anonymous handle.
    pub async fn resolve(backend: &dyn FeedBackend, user_id: &str) -> Result<Self> {
        let mut session = Session::new(user_id);
        match backend.fetch_user(user_id).await? {
            Some(profile) => session.apply_profile(profile),
            None => debug!(user_id = user_id, "No backend profile yet"),
        }
        Ok(session)
    }

    fn apply_profile(&mut self, profile: UserProfile) {
        self.display_name = profile.first_name;
        if let Some(nick) = profile.nick_name.filter(|n| !n.is_empty()) {
            self.handle = nick;
        }
        self.avatar = profile.image;
    }
}
