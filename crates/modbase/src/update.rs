//! Update checks and the notification shown for them
//!
//! The checker itself never talks to the network. The host drives it, either
//! by calling [`UpdateChecker::poll`] on a timer with an [`UpdateSource`], or
//! by splitting a check into [`UpdateChecker::begin_check`] and
//! [`UpdateChecker::finish_check`] around its own asynchronous fetch.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mod_def::Mod;
use crate::version::{InvalidVersion, ModVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum UpdateState {
    #[default]
    Unknown,
    Checking,
    UpToDate,
    UpdateAvailable,
}

/// What a fetch reports about the latest published release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRelease {
    pub version: String,
    pub changelog: Option<String>,
}

impl RemoteRelease {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            changelog: None,
        }
    }

    pub fn with_changelog(mut self, changelog: impl Into<String>) -> Self {
        self.changelog = Some(changelog.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateCheckError {
    #[error("failed to fetch the latest release: {0}")]
    Fetch(String),

    #[error(transparent)]
    InvalidVersion(#[from] InvalidVersion),
}

/// Where the latest release comes from
pub trait UpdateSource {
    fn fetch(&self) -> Result<RemoteRelease, UpdateCheckError>;
}

impl<F> UpdateSource for F
where
    F: Fn() -> Result<RemoteRelease, UpdateCheckError>,
{
    fn fetch(&self) -> Result<RemoteRelease, UpdateCheckError> {
        self()
    }
}

#[derive(Debug, Clone)]
pub struct UpdateChecker {
    state: UpdateState,
    local: String,
    remote: Option<ModVersion>,
    changelog: Option<String>,
    /// The remote version the user dismissed the notification for
    dismissed: Option<ModVersion>,
    interval: Duration,
    last_check: Option<Instant>,
}

impl UpdateChecker {
    pub fn new(local_version: impl Into<String>, interval: Duration) -> Self {
        Self {
            state: UpdateState::Unknown,
            local: local_version.into(),
            remote: None,
            changelog: None,
            dismissed: None,
            interval,
            last_check: None,
        }
    }

    pub fn for_mod(m: &Mod, interval: Duration) -> Self {
        Self::new(m.info().version.clone(), interval)
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn local_version(&self) -> &str {
        &self.local
    }

    pub fn remote_version(&self) -> Option<String> {
        self.remote.as_ref().map(ToString::to_string)
    }

    pub fn changelog(&self) -> Option<&str> {
        self.changelog.as_deref()
    }

    /// Whether a scheduled check should run at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        if self.state == UpdateState::Checking {
            return false;
        }
        match self.last_check {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Mark a check as started. Returns false if one is already running.
    pub fn begin_check(&mut self, now: Instant) -> bool {
        if self.state == UpdateState::Checking {
            return false;
        }
        self.state = UpdateState::Checking;
        self.last_check = Some(now);
        true
    }

    /// Apply the result of a fetch started with [`Self::begin_check`]
    pub fn finish_check(&mut self, result: Result<RemoteRelease, UpdateCheckError>) -> UpdateState {
        let outcome = result.and_then(|release| {
            let remote = release.version.parse::<ModVersion>()?;
            Ok((remote, release.changelog))
        });

        match outcome {
            Ok((remote, changelog)) => {
                self.state = match self.local.parse::<ModVersion>() {
                    Ok(local) if remote > local => UpdateState::UpdateAvailable,
                    Ok(_) => UpdateState::UpToDate,
                    Err(e) => {
                        warn!(target: "update", local = %self.local, error = %e, "Local version is unparsable, cannot compare");
                        UpdateState::Unknown
                    }
                };
                debug!(target: "update", local = %self.local, remote = %remote, state = %self.state, "Update check finished");
                if self.state == UpdateState::UpdateAvailable {
                    info!(target: "update", local = %self.local, remote = %remote, "Update available");
                }
                self.remote = Some(remote);
                self.changelog = changelog;
            }
            Err(e) => {
                warn!(target: "update", error = %e, "Update check failed, will retry later");
                self.state = UpdateState::Unknown;
            }
        }
        self.state
    }

    /// Run a whole check synchronously
    pub fn check(&mut self, source: &dyn UpdateSource, now: Instant) -> UpdateState {
        if !self.begin_check(now) {
            return self.state;
        }
        let result = source.fetch();
        self.finish_check(result)
    }

    /// Run a check if one is due, otherwise just report the current state
    pub fn poll(&mut self, now: Instant, source: &dyn UpdateSource) -> UpdateState {
        if self.is_due(now) {
            self.check(source, now)
        } else {
            self.state
        }
    }

    /// Tell the checker the local version changed, e.g. after an in-place update
    ///
    /// If that catches up with the last fetched version the notification clears
    /// straight away, without another fetch.
    pub fn observe_local_version(&mut self, version: impl Into<String>) {
        self.local = version.into();
        if self.state != UpdateState::UpdateAvailable {
            return;
        }
        if let (Ok(local), Some(remote)) = (self.local.parse::<ModVersion>(), &self.remote) {
            if local >= *remote {
                debug!(target: "update", local = %self.local, "Local version caught up with remote");
                self.state = UpdateState::UpToDate;
            }
        }
    }

    /// Hide the notification until a newer remote version shows up
    pub fn dismiss(&mut self) {
        self.dismissed = self.remote.clone();
    }

    pub fn has_notification(&self) -> bool {
        self.state == UpdateState::UpdateAvailable
            && match (&self.remote, &self.dismissed) {
                (Some(remote), Some(dismissed)) => remote > dismissed,
                _ => true,
            }
    }

    /// Notification text for the menu, if there is one to show
    pub fn notification(&self) -> Option<String> {
        if !self.has_notification() {
            return None;
        }
        let remote = self.remote.as_ref()?;
        Some(format!("Update available: {} -> {}", self.local, remote))
    }
}
