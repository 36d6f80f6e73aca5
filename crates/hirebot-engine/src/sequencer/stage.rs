use serde::{Deserialize, Serialize};
use std::fmt;

/// Page states of one application run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutomationStage {
    AwaitingLogin,
    AwaitingConsent,
    AwaitingJobDetail,
    AwaitingSchedule,
    AwaitingSubmit,
    /// The "Create Application" button on the application page.
    AwaitingConfirmation,
    Done,
}

impl AutomationStage {
    pub fn next(self) -> Self {
        match self {
            AutomationStage::AwaitingLogin => AutomationStage::AwaitingConsent,
            AutomationStage::AwaitingConsent => AutomationStage::AwaitingJobDetail,
            AutomationStage::AwaitingJobDetail => AutomationStage::AwaitingSchedule,
            AutomationStage::AwaitingSchedule => AutomationStage::AwaitingSubmit,
            AutomationStage::AwaitingSubmit => AutomationStage::AwaitingConfirmation,
            AutomationStage::AwaitingConfirmation | AutomationStage::Done => AutomationStage::Done,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AutomationStage::AwaitingLogin => "login",
            AutomationStage::AwaitingConsent => "consent",
            AutomationStage::AwaitingJobDetail => "job-detail",
            AutomationStage::AwaitingSchedule => "schedule",
            AutomationStage::AwaitingSubmit => "submit",
            AutomationStage::AwaitingConfirmation => "confirmation",
            AutomationStage::Done => "done",
        }
    }
}

impl fmt::Display for AutomationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
