use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(pub String);

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub String);

impl SlotId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An interview window shared by every reviewer registered to a challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub ordinal: u32,
    pub name: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSetup {
    pub id: ChallengeId,
    pub name: String,
    pub github_owner: String,
    pub github_org: Option<String>,
    pub template_repo: String,
    pub repo_name_format: String,
    pub created_by_team_id: String,
    pub slots: BTreeMap<SlotId, Slot>,
}

const WEEKDAYS: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

impl ChallengeSetup {
    /// Slots sorted by ordinal, ties broken by ID so iteration is stable.
    pub fn slots_in_order(&self) -> Vec<&Slot> {
        let mut slots = self.slots.values().collect::<Vec<_>>();
        slots.sort_by(|left, right| {
            left.ordinal.cmp(&right.ordinal).then_with(|| left.id.cmp(&right.id))
        });
        slots
    }

    pub fn slot(&self, id: &SlotId) -> Option<&Slot> {
        self.slots.get(id)
    }

    pub fn org_or_owner(&self) -> &str {
        match self.github_org.as_deref() {
            Some(org) if !org.trim().is_empty() => org,
            _ => &self.github_owner,
        }
    }

    pub fn template_repository_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.org_or_owner(), self.template_repo)
    }

    pub fn tracking_issues_url(&self) -> String {
        format!("https://github.com/{}/{}/issues", self.org_or_owner(), self.template_repo)
    }

    /// Fills an empty catalog with the weekday defaults; a populated catalog is left alone.
    pub fn ensure_slot_catalog(&mut self) {
        if self.slots.is_empty() {
            self.slots = Self::default_slots();
        }
    }

    pub fn default_slots() -> BTreeMap<SlotId, Slot> {
        let mut slots = BTreeMap::new();
        let mut ordinal = 0u32;
        for day in WEEKDAYS {
            for (part, start_time, end_time) in
                [("Morning", "9:00", "11:00"), ("Afternoon", "16:30", "18:30")]
            {
                let id = SlotId(format!("{day}{part}"));
                slots.insert(
                    id.clone(),
                    Slot {
                        id,
                        ordinal,
                        name: format!("{day} {part}"),
                        day: day.to_owned(),
                        start_time: start_time.to_owned(),
                        end_time: end_time.to_owned(),
                    },
                );
                ordinal += 1;
            }
        }
        slots
    }
}
