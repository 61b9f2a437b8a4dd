use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::engagement::types::EngagementStatus;
use crate::questions::types::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsView {
    Difficulty,
    Status,
    Combined,
    Time,
}

impl FromStr for StatisticsView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "difficulty" => Ok(Self::Difficulty),
            "status" => Ok(Self::Status),
            "combined" => Ok(Self::Combined),
            "time" => Ok(Self::Time),
            other => Err(format!(
                "Unknown statistics view '{other}', expected difficulty, status, combined or time"
            )),
        }
    }
}

/// Per-status counts for one (topic, difficulty) cell of the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub total: u64,
    pub unattempted: u64,
    pub incorrect: u64,
    pub omitted: u64,
    pub correct: u64,
    pub flagged: u64,
}

impl StatusTally {
    pub fn record(&mut self, status: EngagementStatus, flagged: bool) {
        self.total += 1;
        match status {
            EngagementStatus::Unattempted => self.unattempted += 1,
            EngagementStatus::Incorrect => self.incorrect += 1,
            EngagementStatus::Omitted => self.omitted += 1,
            EngagementStatus::Correct => self.correct += 1,
        }
        if flagged {
            self.flagged += 1;
        }
    }

    pub fn count(&self, status: EngagementStatus) -> u64 {
        match status {
            EngagementStatus::Unattempted => self.unattempted,
            EngagementStatus::Incorrect => self.incorrect,
            EngagementStatus::Omitted => self.omitted,
            EngagementStatus::Correct => self.correct,
        }
    }

    pub fn merge(&mut self, other: &StatusTally) {
        self.total += other.total;
        self.unattempted += other.unattempted;
        self.incorrect += other.incorrect;
        self.omitted += other.omitted;
        self.correct += other.correct;
        self.flagged += other.flagged;
    }
}

/// Topic × difficulty × status. Every view is a projection of this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsGrid {
    pub topics: BTreeMap<String, BTreeMap<Difficulty, StatusTally>>,
}

impl StatisticsGrid {
    pub fn record(
        &mut self,
        topic: &str,
        difficulty: Difficulty,
        status: EngagementStatus,
        flagged: bool,
    ) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .entry(difficulty)
            .or_default()
            .record(status, flagged);
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifficultyStat {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easy: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extreme: Option<u64>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusStat {
    pub topic: String,
    pub unattempted: u64,
    pub incorrect: u64,
    pub omitted: u64,
    pub correct: u64,
    pub flagged: u64,
    pub total: u64,
}

/// Display shape: topic → difficulty → status counts, plus a `total` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedStat {
    pub topic: String,
    pub difficulties: BTreeMap<Difficulty, StatusTally>,
    pub total: StatusTally,
}

/// Counts by difficulty where absent combinations stay absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DifficultyCounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easy: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extreme: Option<u64>,
}

impl DifficultyCounts {
    pub fn set(&mut self, difficulty: Difficulty, count: u64) {
        let slot = match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
            Difficulty::Extreme => &mut self.extreme,
        };
        *slot = Some(count);
    }

    pub fn get(&self, difficulty: Difficulty) -> Option<u64> {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
            Difficulty::Extreme => self.extreme,
        }
    }
}

/// Cube shape: topic → status → difficulty counts. Only statuses that
/// occur for the topic are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCube {
    pub topic: String,
    pub statuses: BTreeMap<EngagementStatus, DifficultyCounts>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedView {
    pub by_difficulty: Vec<CombinedStat>,
    pub by_status: Vec<TopicCube>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeResults {
    pub total: u64,
    pub incorrect: u64,
    pub omitted: u64,
    pub correct: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifficultyResult {
    pub difficulty: Difficulty,
    pub results: TimeResults,
}

/// One calendar day (UTC) of first attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeStat {
    pub date: String,
    pub topics: BTreeMap<String, Vec<DifficultyResult>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatisticsResult {
    Difficulty(Vec<DifficultyStat>),
    Status(Vec<StatusStat>),
    Combined(CombinedView),
    Time(Vec<TimeStat>),
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct StatisticsQuery {
    pub data: Option<String>,
}
