use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Lifecycle of a campaign. Every status names its allowed successors, an
/// empty set marks a terminal status.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CampaignStatus {
    Pending,
    Scheduled,
    Running,
    Paused,
    Completed,
    Errored,
}

impl CampaignStatus {
    pub const ALL: [CampaignStatus; 6] = [
        CampaignStatus::Pending,
        CampaignStatus::Scheduled,
        CampaignStatus::Running,
        CampaignStatus::Paused,
        CampaignStatus::Completed,
        CampaignStatus::Errored,
    ];

    pub fn allowed_transitions(self) -> &'static [CampaignStatus] {
        use CampaignStatus::*;
        match self {
            Pending => &[Scheduled, Errored],
            Scheduled => &[Running, Errored],
            Running => &[Paused, Completed, Errored],
            Paused => &[Running, Errored],
            Completed => &[],
            Errored => &[],
        }
    }

    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Pending => "Pending",
            CampaignStatus::Scheduled => "Scheduled",
            CampaignStatus::Running => "Running",
            CampaignStatus::Paused => "Paused",
            CampaignStatus::Completed => "Completed",
            CampaignStatus::Errored => "Errored",
        }
    }
}

impl Display for CampaignStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
