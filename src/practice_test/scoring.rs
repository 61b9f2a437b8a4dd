use std::collections::HashMap;

use super::types::{ScaledScores, StrandStats};
use crate::engagement::types::EngagementStatus;
use crate::quiz::types::QuizResult;
use crate::taxonomy::standard::TOTAL;
use crate::taxonomy::Taxonomy;

/// Turns raw strand counts into reported scores.
pub trait ScoreScaler: Send + Sync {
    fn scale(&self, stats: &[StrandStats]) -> ScaledScores;
}

/// Fixed mid-range scores until a real conversion table exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderScaler;

impl PlaceholderScaler {
    pub const SUBJECT_SCORE: f64 = 380.0;
}

impl ScoreScaler for PlaceholderScaler {
    fn scale(&self, _stats: &[StrandStats]) -> ScaledScores {
        ScaledScores {
            math: Self::SUBJECT_SCORE,
            reading: Self::SUBJECT_SCORE,
            total: Self::SUBJECT_SCORE * 2.0,
        }
    }
}

/// Re-aggregates quiz questions by strand.
///
/// Output order is every strand in taxonomy order, then one row per subject,
/// then `Total`. A question counts toward a strand when its topic is one of
/// the strand's leaves or the strand itself; other topics are ignored.
pub fn strand_stats(taxonomy: &Taxonomy, results: &[QuizResult]) -> Vec<StrandStats> {
    let strands: Vec<_> = taxonomy.strands().collect();
    let mut stats: Vec<StrandStats> = strands
        .iter()
        .map(|p| StrandStats::empty(p.topic.name.clone()))
        .collect();

    let index: HashMap<&str, usize> = strands
        .iter()
        .enumerate()
        .flat_map(|(i, p)| {
            p.topic
                .subtopics
                .iter()
                .map(move |leaf| (leaf.as_str(), i))
                .chain(std::iter::once((p.topic.name.as_str(), i)))
        })
        .collect();

    for pair in results.iter().flat_map(|r| &r.questions) {
        let Some(question) = &pair.question else {
            continue;
        };
        if let Some(&i) = index.get(question.topic.as_str()) {
            stats[i].total += 1;
            if pair.status() == EngagementStatus::Correct {
                stats[i].correct += 1;
            }
        }
    }

    let mut subjects: Vec<StrandStats> = taxonomy
        .subjects()
        .iter()
        .map(|s| StrandStats::empty(s.name.clone()))
        .collect();
    for (strand, placement) in stats.iter().zip(&strands) {
        if let Some(row) = subjects.iter_mut().find(|s| s.name == placement.subject.name) {
            row.absorb(strand);
        }
    }

    let mut total = StrandStats::empty(TOTAL);
    for subject in &subjects {
        total.absorb(subject);
    }

    stats.extend(subjects);
    stats.push(total);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::types::Engagement;
    use crate::questions::types::{Difficulty, Question};
    use crate::quiz::service::score;
    use crate::quiz::types::{QuestionEngagement, Quiz};
    use crate::taxonomy::standard::{MATH, READING};
    use chrono::Utc;
    use uuid::Uuid;

    fn question(topic: &str) -> Question {
        let now = Utc::now();
        Question {
            id: Uuid::new_v4(),
            prompt: None,
            text: None,
            answer_type: None,
            answer_choices: vec![],
            correct_answer_multiple: None,
            correct_answer_free: None,
            explanation: None,
            subject: String::new(),
            topic: topic.into(),
            difficulty: Difficulty::Easy,
            access_option: None,
            images: vec![],
            created_at: now,
            last_edited_at: now,
        }
    }

    fn answered(topic: &str, status: EngagementStatus) -> QuestionEngagement {
        let q = question(topic);
        let mut e = Engagement::new(Uuid::new_v4(), q.id);
        e.status = status;
        QuestionEngagement {
            question: Some(q),
            engagement: Some(e),
        }
    }

    fn find_stat<'a>(stats: &'a [StrandStats], name: &str) -> Option<&'a StrandStats> {
        stats.iter().find(|s| s.name == name)
    }

    fn quiz_result(pairs: Vec<QuestionEngagement>) -> QuizResult {
        let quiz = Quiz {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Module".into(),
            quiz_type: "test".into(),
            attempt_time: Utc::now(),
            entries: vec![],
        };
        score(quiz, pairs)
    }

    #[test]
    fn test_fixed_order_and_rollup() {
        let taxonomy = Taxonomy::standard();
        let results = vec![
            quiz_result(vec![
                answered("Linear functions", EngagementStatus::Correct),
                answered("Linear functions", EngagementStatus::Incorrect),
                answered("Circles", EngagementStatus::Correct),
            ]),
            quiz_result(vec![
                answered("Words in context", EngagementStatus::Correct),
                answered("Not a topic", EngagementStatus::Correct),
                QuestionEngagement {
                    question: None,
                    engagement: None,
                },
            ]),
        ];

        let stats = strand_stats(&taxonomy, &results);
        let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();
        let strand_count = taxonomy.strands().count();
        assert_eq!(names.len(), strand_count + 3);
        assert_eq!(names[0], "Algebra");
        assert_eq!(&names[strand_count..], &["Math", "Reading", "Total"]);

        let algebra = find_stat(&stats, "Algebra").unwrap();
        assert_eq!((algebra.total, algebra.correct), (2, 1));
        let math = find_stat(&stats, MATH).unwrap();
        assert_eq!((math.total, math.correct), (3, 2));
        let reading = find_stat(&stats, READING).unwrap();
        assert_eq!((reading.total, reading.correct), (1, 1));
        let total = find_stat(&stats, TOTAL).unwrap();
        assert_eq!((total.total, total.correct), (4, 3));
    }

    #[test]
    fn test_strand_name_as_topic_counts() {
        let stats = strand_stats(
            &Taxonomy::standard(),
            &[quiz_result(vec![answered("Algebra", EngagementStatus::Correct)])],
        );
        assert_eq!(find_stat(&stats, "Algebra").unwrap().correct, 1);
    }

    #[test]
    fn test_placeholder_scaler() {
        let scores = PlaceholderScaler.scale(&[]);
        assert_eq!(scores.math, 380.0);
        assert_eq!(scores.reading, 380.0);
        assert_eq!(scores.total, 760.0);
    }
}
