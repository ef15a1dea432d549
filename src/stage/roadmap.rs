use serde::{Deserialize, Serialize};

/// Which roadmap entry is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    /// Nothing started yet.
    #[default]
    None,
    /// One-based index of the active step; earlier steps are completed.
    Active(usize),
    /// Every step is completed.
    AllCompleted,
}

/// A step target as written in a scenario: a number or `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepTarget {
    Number(i64),
    Keyword(AllSteps),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllSteps {
    All,
}

impl Default for StepTarget {
    fn default() -> Self {
        Self::Number(1)
    }
}

/// Visual state of one roadmap entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Completed,
}

/// The tutorial roadmap: labelled steps and the current progress through them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roadmap {
    labels: Vec<String>,
    progress: Progress,
    /// The active step finished its highlight transition.
    transitioned: bool,
    /// The whole roadmap is marked completed.
    completed: bool,
}

impl Roadmap {
    pub const fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            progress: Progress::None,
            transitioned: false,
            completed: false,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub const fn progress(&self) -> Progress {
        self.progress
    }

    pub const fn is_transitioned(&self) -> bool {
        self.transitioned
    }

    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Map a scenario step target onto this roadmap.
    ///
    /// `-1`, `"all"` and anything past the last step complete everything;
    /// `0` and other negatives clear the progress.
    pub fn resolve(&self, target: StepTarget) -> Progress {
        match target {
            StepTarget::Keyword(AllSteps::All) | StepTarget::Number(-1) => Progress::AllCompleted,
            StepTarget::Number(n) if n <= 0 => Progress::None,
            StepTarget::Number(n) => match usize::try_from(n) {
                Ok(n) if n <= self.labels.len() => Progress::Active(n),
                _ => Progress::AllCompleted,
            },
        }
    }

    /// Jump straight to `progress`, including the final highlight state.
    pub const fn set(&mut self, progress: Progress) {
        self.progress = progress;
        self.transitioned = matches!(progress, Progress::Active(_));
        self.completed = matches!(progress, Progress::AllCompleted);
    }

    /// Begin moving to `progress`; the highlight is finished by [`Self::settle`].
    pub const fn begin(&mut self, progress: Progress) {
        self.progress = progress;
        self.transitioned = false;
        self.completed = false;
    }

    /// Finish the highlight started by [`Self::begin`].
    pub const fn settle(&mut self) {
        match self.progress {
            Progress::Active(_) => self.transitioned = true,
            Progress::AllCompleted => self.completed = true,
            Progress::None => {}
        }
    }

    /// Status of the one-based step `n`.
    pub const fn status(&self, n: usize) -> StepStatus {
        match self.progress {
            Progress::None => StepStatus::Pending,
            Progress::AllCompleted => StepStatus::Completed,
            Progress::Active(active) if n < active => StepStatus::Completed,
            Progress::Active(active) if n == active => StepStatus::Active,
            Progress::Active(_) => StepStatus::Pending,
        }
    }

    pub fn reset(&mut self) {
        self.set(Progress::None);
    }
}
