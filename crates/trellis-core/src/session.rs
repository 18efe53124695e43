//! Root contexts by session token, with idle expiry.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::collections::map::HashMap;
use crate::config::SessionConfig;
use crate::context::SessionContext;
use crate::sync::{read, write};

#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionContext>>>,
    idle_timeout_secs: i64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::default()),
            idle_timeout_secs: i64::try_from(config.idle_timeout_secs).unwrap_or(i64::MAX),
        }
    }

    /// The live context for `token`, created on first use. Touches it.
    pub fn get_or_create(&self, token: &str) -> Arc<SessionContext> {
        if let Some(context) = self.get(token) {
            return context;
        }
        let mut sessions = write(&self.sessions);
        let context = sessions
            .entry(token.to_string())
            .or_insert_with(|| SessionContext::new(token));
        // A context disposed by a racing expiry is replaced, not revived.
        if context.is_disposed() {
            *context = SessionContext::new(token);
        }
        context.touch();
        Arc::clone(context)
    }

    /// The live context for `token`, if any. Touches it.
    pub fn get(&self, token: &str) -> Option<Arc<SessionContext>> {
        let context = read(&self.sessions).get(token).cloned()?;
        if context.is_disposed() {
            return None;
        }
        context.touch();
        Some(context)
    }

    /// Removes and disposes the session. Returns whether one was present.
    pub fn remove(&self, token: &str) -> bool {
        let removed = write(&self.sessions).remove(token);
        match removed {
            Some(context) => {
                context.dispose();
                true
            }
            None => false,
        }
    }

    /// Disposes every session idle for longer than the configured timeout
    /// as of `now`. Returns how many were expired.
    pub fn expire_idle(&self, now: DateTime<Utc>) -> usize {
        let timeout = self.idle_timeout_secs;
        let expired: Vec<Arc<SessionContext>> = {
            let mut sessions = write(&self.sessions);
            let tokens: Vec<String> = sessions
                .iter()
                .filter(|(_, context)| {
                    context.is_disposed()
                        || now.signed_duration_since(context.last_access()).num_seconds() > timeout
                })
                .map(|(token, _)| token.clone())
                .collect();
            tokens
                .iter()
                .filter_map(|token| sessions.remove(token))
                .collect()
        };
        for context in &expired {
            if context.dispose() {
                debug!(context = context.id(), token = context.token(), "session expired");
            }
        }
        if !expired.is_empty() {
            info!(expired = expired.len(), remaining = self.len(), "idle sessions expired");
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        read(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
