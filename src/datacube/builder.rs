use std::collections::BTreeMap;
use uuid::Uuid;

use super::types::{CubeCell, CubeRow, DataCube};
use crate::engagement::types::EngagementStatus;
use crate::statistics::types::{DifficultyCounts, TopicCube};
use crate::taxonomy::standard::TOTAL;
use crate::taxonomy::Taxonomy;

fn cell_from(counts: &DifficultyCounts) -> CubeCell {
    CubeCell::from_counts(
        counts.easy.unwrap_or(0),
        counts.medium.unwrap_or(0),
        counts.hard.unwrap_or(0),
        counts.extreme.unwrap_or(0),
    )
}

fn overlay(row: &mut CubeRow, topic: &TopicCube) {
    for (status, counts) in &topic.statuses {
        let cell = cell_from(counts);
        match status {
            EngagementStatus::Unattempted => row.unattempted = cell,
            EngagementStatus::Correct => row.correct = cell,
            EngagementStatus::Incorrect => row.incorrect = cell,
            EngagementStatus::Omitted => row.omitted = cell,
        }
    }
}

fn sum_rows<'r>(rows: impl IntoIterator<Item = &'r CubeRow>) -> CubeRow {
    rows.into_iter().fold(CubeRow::default(), |mut acc, row| {
        acc += row;
        acc
    })
}

/// Zero-fills every taxonomy leaf, overlays the engine's counts, rolls
/// leaves up into topics, subjects and `Total`, then derives ratios.
///
/// Counts tagged with a mid-level topic name are folded into that topic's
/// subtotal. Topics the taxonomy does not know are kept as their own rows
/// but take no part in the rollup.
pub fn build_cube(user_id: Uuid, taxonomy: &Taxonomy, topics: &[TopicCube]) -> DataCube {
    let mut rows: BTreeMap<String, CubeRow> = taxonomy
        .leaves()
        .map(|leaf| (leaf.to_string(), CubeRow::default()))
        .collect();

    for topic in topics {
        overlay(rows.entry(topic.topic.clone()).or_default(), topic);
    }
    for row in rows.values_mut() {
        row.derive_sums();
    }

    let mut subject_rows = Vec::with_capacity(taxonomy.subjects().len());
    for subject in taxonomy.subjects() {
        let topic_rows: Vec<(String, CubeRow)> = subject
            .topics
            .iter()
            .map(|topic| {
                // Questions may be tagged with the topic itself rather than
                // a leaf; a self-named leaf is already in the sum.
                let own = if topic.subtopics.contains(&topic.name) {
                    None
                } else {
                    rows.get(&topic.name)
                };
                let leaves = topic.subtopics.iter().filter_map(|leaf| rows.get(leaf));
                (topic.name.clone(), sum_rows(leaves.chain(own)))
            })
            .collect();

        let subject_row = sum_rows(topic_rows.iter().map(|(_, row)| row));
        rows.extend(topic_rows);
        subject_rows.push((subject.name.clone(), subject_row));
    }

    let total = sum_rows(subject_rows.iter().map(|(_, row)| row));
    rows.extend(subject_rows);
    rows.insert(TOTAL.to_string(), total);

    for row in rows.values_mut() {
        row.derive_ratios();
    }

    DataCube { user_id, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::types::Difficulty;
    use crate::taxonomy::{SubjectNode, TopicNode};

    fn counts(pairs: &[(Difficulty, u64)]) -> DifficultyCounts {
        let mut c = DifficultyCounts::default();
        for (d, n) in pairs {
            c.set(*d, *n);
        }
        c
    }

    fn topic(name: &str, statuses: &[(EngagementStatus, DifficultyCounts)]) -> TopicCube {
        TopicCube {
            topic: name.into(),
            statuses: statuses.iter().copied().collect(),
        }
    }

    fn small_taxonomy() -> Taxonomy {
        Taxonomy::new(vec![
            SubjectNode::new(
                "Math",
                vec![
                    TopicNode::new("Algebra", &["Linear functions", "Linear inequalities"]),
                    TopicNode::new("Geometry", &["Circles"]),
                ],
            ),
            SubjectNode::new(
                "Reading",
                vec![TopicNode::new("Craft and structure", &["Craft and structure"])],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_engine_output_is_all_zero() {
        let cube = build_cube(Uuid::nil(), &small_taxonomy(), &[]);
        for name in ["Linear functions", "Algebra", "Math", "Reading", "Total"] {
            assert_eq!(cube.rows[name], CubeRow::default(), "row {name}");
        }
    }

    #[test]
    fn test_leaf_scenario() {
        let engine = vec![topic(
            "Linear functions",
            &[
                (EngagementStatus::Correct, counts(&[(Difficulty::Easy, 1)])),
                (EngagementStatus::Unattempted, counts(&[(Difficulty::Easy, 1)])),
                (EngagementStatus::Incorrect, counts(&[(Difficulty::Hard, 1)])),
            ],
        )];
        let cube = build_cube(Uuid::new_v4(), &small_taxonomy(), &engine);
        let row = &cube.rows["Linear functions"];

        assert_eq!(row.total.easy, 2.0);
        assert_eq!(row.total.hard, 1.0);
        assert_eq!(row.total.total, 3.0);
        assert_eq!(row.attempted.easy, 1.0);
        assert_eq!(row.attempted.hard, 1.0);
        assert_eq!(row.attempted.total, 2.0);
        assert_eq!(row.accuracy.total, 0.5);
        assert!((row.usage.total - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(row.omitted, CubeCell::default());
    }

    #[test]
    fn test_rollup_reaches_total() {
        let engine = vec![
            topic(
                "Linear functions",
                &[(EngagementStatus::Correct, counts(&[(Difficulty::Easy, 2)]))],
            ),
            topic(
                "Circles",
                &[(EngagementStatus::Incorrect, counts(&[(Difficulty::Extreme, 1)]))],
            ),
            topic(
                "Craft and structure",
                &[(EngagementStatus::Omitted, counts(&[(Difficulty::Medium, 3)]))],
            ),
        ];
        let cube = build_cube(Uuid::new_v4(), &small_taxonomy(), &engine);

        assert_eq!(cube.rows["Algebra"].correct.easy, 2.0);
        assert_eq!(cube.rows["Math"].total.total, 3.0);
        assert_eq!(cube.rows["Math"].incorrect.hardextreme, 1.0);
        assert_eq!(cube.rows["Reading"].omitted.medium, 3.0);
        assert_eq!(cube.rows["Craft and structure"].omitted.medium, 3.0);
        assert_eq!(cube.rows["Total"].total.total, 6.0);
        assert_eq!(cube.rows["Total"].attempted.total, 6.0);
        assert_eq!(cube.rows["Total"].usage.total, 1.0);
        assert!((cube.rows["Total"].accuracy.total - 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_mid_level_topic_counts_join_the_rollup() {
        let engine = vec![
            topic(
                "Algebra",
                &[
                    (EngagementStatus::Correct, counts(&[(Difficulty::Easy, 1)])),
                    (EngagementStatus::Unattempted, counts(&[(Difficulty::Easy, 1)])),
                    (EngagementStatus::Incorrect, counts(&[(Difficulty::Hard, 1)])),
                ],
            ),
            topic(
                "Linear functions",
                &[(EngagementStatus::Correct, counts(&[(Difficulty::Medium, 1)]))],
            ),
        ];
        let cube = build_cube(Uuid::new_v4(), &small_taxonomy(), &engine);

        let algebra = &cube.rows["Algebra"];
        assert_eq!(algebra.total.easy, 2.0);
        assert_eq!(algebra.total.medium, 1.0);
        assert_eq!(algebra.total.hard, 1.0);
        assert_eq!(algebra.total.total, 4.0);
        assert_eq!(algebra.attempted.total, 3.0);
        assert_eq!(cube.rows["Math"].total.total, 4.0);
        assert_eq!(cube.rows["Total"].total.total, 4.0);
    }

    #[test]
    fn test_self_named_strand_is_counted_once() {
        let engine = vec![topic(
            "Craft and structure",
            &[(EngagementStatus::Correct, counts(&[(Difficulty::Easy, 2)]))],
        )];
        let cube = build_cube(Uuid::new_v4(), &small_taxonomy(), &engine);
        assert_eq!(cube.rows["Craft and structure"].total.total, 2.0);
        assert_eq!(cube.rows["Reading"].total.total, 2.0);
        assert_eq!(cube.rows["Total"].total.total, 2.0);
    }

    #[test]
    fn test_unknown_topic_passes_through_without_rollup() {
        let engine = vec![topic(
            "Vectors",
            &[(EngagementStatus::Correct, counts(&[(Difficulty::Hard, 4)]))],
        )];
        let cube = build_cube(Uuid::new_v4(), &small_taxonomy(), &engine);
        assert_eq!(cube.rows["Vectors"].correct.hard, 4.0);
        assert_eq!(cube.rows["Vectors"].accuracy.hard, 1.0);
        assert_eq!(cube.rows["Total"].total.total, 0.0);
    }

    #[test]
    fn test_every_row_satisfies_total_invariant() {
        let engine = vec![topic(
            "Linear inequalities",
            &[
                (EngagementStatus::Correct, counts(&[(Difficulty::Easy, 1), (Difficulty::Hard, 2)])),
                (EngagementStatus::Unattempted, counts(&[(Difficulty::Medium, 5)])),
                (EngagementStatus::Omitted, counts(&[(Difficulty::Extreme, 1)])),
            ],
        )];
        let cube = build_cube(Uuid::new_v4(), &Taxonomy::standard(), &engine);
        let cube_small = build_cube(Uuid::new_v4(), &small_taxonomy(), &engine);

        for row in cube.rows.values().chain(cube_small.rows.values()) {
            let summed = row.unattempted + row.correct + row.incorrect + row.omitted;
            assert_eq!(row.total, summed);
        }
    }
}
