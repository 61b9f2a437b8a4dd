use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::join::JoinedQuestion;
use super::types::{
    CombinedStat, CombinedView, DifficultyCounts, DifficultyResult, DifficultyStat,
    StatisticsGrid, StatusStat, StatusTally, TimeResults, TimeStat, TopicCube,
};
use crate::engagement::types::EngagementStatus;
use crate::questions::types::Difficulty;

pub fn build_grid(rows: &[JoinedQuestion]) -> StatisticsGrid {
    let mut grid = StatisticsGrid::default();
    for row in rows {
        grid.record(
            &row.question.topic,
            row.question.difficulty,
            row.status,
            row.flagged,
        );
    }
    grid
}

pub fn difficulty_view(grid: &StatisticsGrid) -> Vec<DifficultyStat> {
    grid.topics
        .iter()
        .map(|(topic, cells)| {
            let count = |d: Difficulty| cells.get(&d).map(|t| t.total);
            DifficultyStat {
                topic: topic.clone(),
                easy: count(Difficulty::Easy),
                medium: count(Difficulty::Medium),
                hard: count(Difficulty::Hard),
                extreme: count(Difficulty::Extreme),
                total: cells.values().map(|t| t.total).sum(),
            }
        })
        .collect()
}

fn topic_total(cells: &BTreeMap<Difficulty, StatusTally>) -> StatusTally {
    cells.values().fold(StatusTally::default(), |mut acc, t| {
        acc.merge(t);
        acc
    })
}

pub fn status_view(grid: &StatisticsGrid) -> Vec<StatusStat> {
    grid.topics
        .iter()
        .map(|(topic, cells)| {
            let total = topic_total(cells);
            StatusStat {
                topic: topic.clone(),
                unattempted: total.unattempted,
                incorrect: total.incorrect,
                omitted: total.omitted,
                correct: total.correct,
                flagged: total.flagged,
                total: total.total,
            }
        })
        .collect()
}

pub fn cube_view(grid: &StatisticsGrid) -> Vec<TopicCube> {
    grid.topics
        .iter()
        .map(|(topic, cells)| {
            let mut statuses: BTreeMap<EngagementStatus, DifficultyCounts> = BTreeMap::new();
            for (difficulty, tally) in cells {
                for status in EngagementStatus::ALL {
                    let count = tally.count(status);
                    if count > 0 {
                        statuses.entry(status).or_default().set(*difficulty, count);
                    }
                }
            }
            TopicCube {
                topic: topic.clone(),
                statuses,
            }
        })
        .collect()
}

pub fn combined_view(grid: &StatisticsGrid) -> CombinedView {
    let by_difficulty = grid
        .topics
        .iter()
        .map(|(topic, cells)| CombinedStat {
            topic: topic.clone(),
            difficulties: cells.clone(),
            total: topic_total(cells),
        })
        .collect();

    CombinedView {
        by_difficulty,
        by_status: cube_view(grid),
    }
}

fn day_of(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}

/// Only engagements with a first-attempt time contribute, bucketed by the
/// UTC day of that first attempt.
pub fn time_view(rows: &[JoinedQuestion]) -> Vec<TimeStat> {
    let mut days: BTreeMap<String, BTreeMap<String, BTreeMap<Difficulty, TimeResults>>> =
        BTreeMap::new();

    for row in rows {
        let Some(first) = row.engagement.as_ref().and_then(|e| e.first_attempt_time) else {
            continue;
        };
        let results = days
            .entry(day_of(first))
            .or_default()
            .entry(row.question.topic.clone())
            .or_default()
            .entry(row.question.difficulty)
            .or_default();

        results.total += 1;
        match row.status {
            EngagementStatus::Correct => results.correct += 1,
            EngagementStatus::Incorrect => results.incorrect += 1,
            EngagementStatus::Omitted => results.omitted += 1,
            EngagementStatus::Unattempted => {}
        }
    }

    days.into_iter()
        .map(|(date, topics)| TimeStat {
            date,
            topics: topics
                .into_iter()
                .map(|(topic, by_difficulty)| {
                    let results = by_difficulty
                        .into_iter()
                        .map(|(difficulty, results)| DifficultyResult {
                            difficulty,
                            results,
                        })
                        .collect();
                    (topic, results)
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::types::{Engagement, EngagementFields};
    use crate::questions::types::Question;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn row(
        topic: &str,
        difficulty: Difficulty,
        status: EngagementStatus,
        first_attempt: Option<DateTime<Utc>>,
    ) -> JoinedQuestion {
        let now = Utc::now();
        let question = Question {
            id: Uuid::new_v4(),
            prompt: None,
            text: None,
            answer_type: None,
            answer_choices: vec![],
            correct_answer_multiple: None,
            correct_answer_free: None,
            explanation: None,
            subject: "Math".into(),
            topic: topic.into(),
            difficulty,
            access_option: None,
            images: vec![],
            created_at: now,
            last_edited_at: now,
        };
        let engagement = first_attempt.map(|t| {
            let mut e = Engagement::new(Uuid::new_v4(), question.id);
            e.apply(EngagementFields {
                status: Some(status),
                attempt_time: Some(t),
                ..Default::default()
            });
            e
        });
        JoinedQuestion {
            question,
            engagement,
            status,
            flagged: false,
        }
    }

    fn algebra_rows() -> Vec<JoinedQuestion> {
        let day = Utc.with_ymd_and_hms(2024, 4, 2, 15, 30, 0).unwrap();
        vec![
            row("Algebra", Difficulty::Easy, EngagementStatus::Correct, Some(day)),
            row("Algebra", Difficulty::Easy, EngagementStatus::Unattempted, None),
            row("Algebra", Difficulty::Hard, EngagementStatus::Incorrect, Some(day)),
        ]
    }

    #[test]
    fn test_status_view_scenario() {
        let grid = build_grid(&algebra_rows());
        let stats = status_view(&grid);
        assert_eq!(
            stats,
            vec![StatusStat {
                topic: "Algebra".into(),
                unattempted: 1,
                incorrect: 1,
                omitted: 0,
                correct: 1,
                flagged: 0,
                total: 3,
            }]
        );
    }

    #[test]
    fn test_difficulty_view_leaves_absent_difficulties_out() {
        let grid = build_grid(&algebra_rows());
        let stats = difficulty_view(&grid);
        assert_eq!(stats[0].easy, Some(2));
        assert_eq!(stats[0].hard, Some(1));
        assert_eq!(stats[0].medium, None);
        assert_eq!(stats[0].total, 3);
    }

    #[test]
    fn test_cube_view_only_has_present_combinations() {
        let grid = build_grid(&algebra_rows());
        let cube = cube_view(&grid);
        let statuses = &cube[0].statuses;
        assert_eq!(statuses.len(), 3);
        assert!(!statuses.contains_key(&EngagementStatus::Omitted));
        let correct = statuses[&EngagementStatus::Correct];
        assert_eq!(correct.easy, Some(1));
        assert_eq!(correct.hard, None);
    }

    #[test]
    fn test_combined_view_total_row() {
        let grid = build_grid(&algebra_rows());
        let combined = combined_view(&grid);
        let algebra = &combined.by_difficulty[0];
        assert_eq!(algebra.total.total, 3);
        assert_eq!(algebra.difficulties[&Difficulty::Easy].correct, 1);
        assert_eq!(combined.by_status.len(), 1);
    }

    #[test]
    fn test_time_view_groups_by_day() {
        let stats = time_view(&algebra_rows());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].date, "2024-04-02");
        let algebra = &stats[0].topics["Algebra"];
        assert_eq!(algebra.len(), 2);
        assert_eq!(algebra[0].difficulty, Difficulty::Easy);
        assert_eq!(
            algebra[0].results,
            TimeResults {
                total: 1,
                incorrect: 0,
                omitted: 0,
                correct: 1
            }
        );
        assert_eq!(algebra[1].results.incorrect, 1);
    }

    #[test]
    fn test_empty_bank_yields_empty_views() {
        let grid = build_grid(&[]);
        assert!(grid.is_empty());
        assert!(difficulty_view(&grid).is_empty());
        assert!(status_view(&grid).is_empty());
        assert!(time_view(&[]).is_empty());
    }
}
