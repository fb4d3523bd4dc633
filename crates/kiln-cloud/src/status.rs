use kiln_core::StatusLabels;

/// A remote status label, classified against the configured label table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentStatus {
    Success(String),
    Failed(String),
    Destroyed(String),
    InProgress(String),
}

impl DeploymentStatus {
    pub fn classify(labels: &StatusLabels, raw: &str) -> Self {
        let matches = |set: &[String]| set.iter().any(|label| label == raw);

        if matches(&labels.success) {
            Self::Success(raw.to_owned())
        } else if matches(&labels.failure) {
            Self::Failed(raw.to_owned())
        } else if matches(&labels.destroyed) {
            Self::Destroyed(raw.to_owned())
        } else {
            Self::InProgress(raw.to_owned())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Success(l) | Self::Failed(l) | Self::Destroyed(l) | Self::InProgress(l) => l,
        }
    }

    /// Success only counts once the remote status has moved during this
    /// attempt; before that it may be the previous deployment's state.
    pub fn is_terminal_success(&self, build_started: bool) -> bool {
        matches!(self, Self::Success(_)) && build_started
    }
}

/// What the poll loop should do after one status read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Continue,
    Succeeded,
    Failed(String),
    Destroyed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The status differs from the previous read
    pub changed: bool,
    pub outcome: PollOutcome,
}

/// Per-attempt bookkeeping for the status poll.
#[derive(Debug, Default)]
pub struct PollState {
    last_observed: Option<String>,
    build_started: bool,
}

impl PollState {
    pub fn build_started(&self) -> bool {
        self.build_started
    }

    pub fn last_observed(&self) -> Option<&str> {
        self.last_observed.as_deref()
    }

    pub fn observe(&mut self, status: &DeploymentStatus) -> Observation {
        let changed = self.last_observed.as_deref() != Some(status.label());
        if changed {
            self.last_observed = Some(status.label().to_owned());
        }
        if !matches!(status, DeploymentStatus::Success(_)) {
            self.build_started = true;
        }

        let outcome = match status {
            DeploymentStatus::Failed(label) => PollOutcome::Failed(label.clone()),
            DeploymentStatus::Destroyed(label) => PollOutcome::Destroyed(label.clone()),
            s if s.is_terminal_success(self.build_started) => PollOutcome::Succeeded,
            _ => PollOutcome::Continue,
        };

        Observation { changed, outcome }
    }
}
