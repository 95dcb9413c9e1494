use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every skill tracked by the upstream, `overall` first
pub const SKILLS: [&str; 24] = [
    "overall",
    "attack",
    "defence",
    "strength",
    "hitpoints",
    "ranged",
    "prayer",
    "magic",
    "cooking",
    "woodcutting",
    "fletching",
    "fishing",
    "firemaking",
    "crafting",
    "smithing",
    "mining",
    "herblore",
    "agility",
    "thieving",
    "slayer",
    "farming",
    "runecrafting",
    "hunter",
    "construction",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillStat {
    pub level: i64,
    pub experience: i64,
}

/// Immutable stats snapshot of one ranked subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Lowercased username, stable across display-name casing changes
    pub id: String,
    pub display_name: String,
    pub skills: BTreeMap<String, SkillStat>,
    pub counters: BTreeMap<String, i64>,
}

impl Entity {
    pub fn new(display_name: &str) -> Self {
        Self {
            id: display_name.trim().to_lowercase(),
            display_name: display_name.trim().to_string(),
            skills: BTreeMap::new(),
            counters: BTreeMap::new(),
        }
    }

    pub fn with_skill(mut self, name: &str, level: i64, experience: i64) -> Self {
        self.skills
            .insert(name.to_lowercase(), SkillStat { level, experience });
        self
    }

    pub fn with_counter(mut self, name: &str, count: i64) -> Self {
        self.counters.insert(name.to_lowercase(), count);
        self
    }

    pub fn skill(&self, name: &str) -> Option<SkillStat> {
        self.skills.get(name).copied()
    }

    pub fn counter(&self, name: &str) -> Option<i64> {
        self.counters.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Ranked by level, then experience
    Skill,
    /// Ranked by a single count (boss kills, activity score)
    Counter,
}

/// A ranking axis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub kind: CategoryKind,
}

impl Category {
    pub fn skill(name: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            kind: CategoryKind::Skill,
        }
    }

    pub fn counter(name: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            kind: CategoryKind::Counter,
        }
    }

    /// Level for skills, count for counters; 0 when absent
    pub fn primary(&self, entity: &Entity) -> i64 {
        match self.kind {
            CategoryKind::Skill => entity.skill(&self.name).map_or(0, |s| s.level),
            CategoryKind::Counter => entity.counter(&self.name).unwrap_or(0),
        }
    }

    /// Experience for skills; counters have no secondary metric
    pub fn secondary(&self, entity: &Entity) -> i64 {
        match self.kind {
            CategoryKind::Skill => entity.skill(&self.name).map_or(0, |s| s.experience),
            CategoryKind::Counter => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub name: String,
    pub primary: i64,
    pub secondary: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityVerdict {
    pub entity_id: String,
    pub eligible: bool,
    pub checked_at: DateTime<Utc>,
}

/// Counts gathered while resolving one category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    pub examined: usize,
    pub eligible: usize,
    pub rejected: usize,
    pub indeterminate: usize,
    pub batches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardOutcome {
    Ranked(Vec<LeaderboardRow>),
    /// Resolved, but nobody qualified with data
    Empty,
    /// The category itself could not be resolved
    Unavailable(String),
}

/// What the presentation layer receives for one category
#[derive(Debug, Clone)]
pub struct CategoryBoard {
    pub category: Category,
    pub outcome: BoardOutcome,
    pub stats: ResolveStats,
    pub generated_at: DateTime<Utc>,
}

impl CategoryBoard {
    pub fn rows(&self) -> &[LeaderboardRow] {
        match &self.outcome {
            BoardOutcome::Ranked(rows) => rows,
            _ => &[],
        }
    }
}
