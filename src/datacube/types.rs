use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};
use uuid::Uuid;

use crate::questions::types::Difficulty;

/// Counts or ratios for one cube column, split by difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CubeCell {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
    pub extreme: f64,
    pub hardextreme: f64,
    pub total: f64,
}

impl CubeCell {
    pub fn from_counts(easy: u64, medium: u64, hard: u64, extreme: u64) -> Self {
        let mut cell = Self {
            easy: easy as f64,
            medium: medium as f64,
            hard: hard as f64,
            extreme: extreme as f64,
            ..Self::default()
        };
        cell.derive();
        cell
    }

    pub fn get(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
            Difficulty::Extreme => self.extreme,
        }
    }

    fn derive(&mut self) {
        self.hardextreme = self.hard + self.extreme;
        self.total = self.easy + self.medium + self.hard + self.extreme;
    }

    /// Elementwise `self / other`; a zero denominator yields zero.
    pub fn ratio(&self, denominator: &CubeCell) -> Self {
        fn div(n: f64, d: f64) -> f64 {
            if d == 0.0 {
                0.0
            } else {
                n / d
            }
        }
        Self {
            easy: div(self.easy, denominator.easy),
            medium: div(self.medium, denominator.medium),
            hard: div(self.hard, denominator.hard),
            extreme: div(self.extreme, denominator.extreme),
            hardextreme: div(self.hardextreme, denominator.hardextreme),
            total: div(self.total, denominator.total),
        }
    }

    pub fn values(&self) -> [f64; 6] {
        [
            self.easy,
            self.medium,
            self.hard,
            self.extreme,
            self.hardextreme,
            self.total,
        ]
    }
}

impl Add for CubeCell {
    type Output = CubeCell;

    fn add(self, rhs: CubeCell) -> CubeCell {
        CubeCell {
            easy: self.easy + rhs.easy,
            medium: self.medium + rhs.medium,
            hard: self.hard + rhs.hard,
            extreme: self.extreme + rhs.extreme,
            hardextreme: self.hardextreme + rhs.hardextreme,
            total: self.total + rhs.total,
        }
    }
}

impl AddAssign for CubeCell {
    fn add_assign(&mut self, rhs: CubeCell) {
        *self = *self + rhs;
    }
}

/// One taxonomy node's columns. Status buckets come from the engine,
/// `total`/`attempted` are summed, `usage`/`accuracy` are ratios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CubeRow {
    pub unattempted: CubeCell,
    pub correct: CubeCell,
    pub incorrect: CubeCell,
    pub omitted: CubeCell,
    pub total: CubeCell,
    pub attempted: CubeCell,
    pub usage: CubeCell,
    pub accuracy: CubeCell,
}

impl CubeRow {
    pub fn derive_sums(&mut self) {
        self.attempted = self.correct + self.incorrect + self.omitted;
        self.total = self.unattempted + self.attempted;
    }

    pub fn derive_ratios(&mut self) {
        self.usage = self.attempted.ratio(&self.total);
        self.accuracy = self.correct.ratio(&self.attempted);
    }
}

/// Counted columns add; ratio columns are recomputed after rollup.
impl AddAssign<&CubeRow> for CubeRow {
    fn add_assign(&mut self, rhs: &CubeRow) {
        self.unattempted += rhs.unattempted;
        self.correct += rhs.correct;
        self.incorrect += rhs.incorrect;
        self.omitted += rhs.omitted;
        self.total += rhs.total;
        self.attempted += rhs.attempted;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCube {
    pub user_id: Uuid,
    pub rows: BTreeMap<String, CubeRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataCubeQuery {
    #[serde(default)]
    pub compute: Option<String>,
}

impl DataCubeQuery {
    pub fn force_compute(&self) -> bool {
        self.compute
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counts_derives_totals() {
        let cell = CubeCell::from_counts(2, 1, 3, 4);
        assert_eq!(cell.hardextreme, 7.0);
        assert_eq!(cell.total, 10.0);
    }

    #[test]
    fn test_ratio_zero_denominator() {
        let numerator = CubeCell::from_counts(1, 0, 2, 0);
        let denominator = CubeCell::from_counts(2, 0, 0, 0);
        let ratio = numerator.ratio(&denominator);
        assert_eq!(ratio.easy, 0.5);
        assert_eq!(ratio.medium, 0.0);
        assert_eq!(ratio.hard, 0.0);
        assert_eq!(ratio.total, 1.5);
    }

    #[test]
    fn test_row_sums() {
        let mut row = CubeRow {
            unattempted: CubeCell::from_counts(1, 0, 0, 0),
            correct: CubeCell::from_counts(1, 0, 0, 0),
            incorrect: CubeCell::from_counts(0, 0, 1, 0),
            ..Default::default()
        };
        row.derive_sums();
        row.derive_ratios();
        assert_eq!(row.total, CubeCell::from_counts(2, 0, 1, 0));
        assert_eq!(row.attempted, CubeCell::from_counts(1, 0, 1, 0));
        assert_eq!(row.accuracy.total, 0.5);
        assert!((row.usage.total - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_force_compute_flag() {
        let query = DataCubeQuery {
            compute: Some("TRUE".into()),
        };
        assert!(query.force_compute());
        assert!(!DataCubeQuery::default().force_compute());
    }
}
