//! Per-cell running aggregates and the cell table that owns them.
//!
//! A [`CellTable`] lives for exactly one cloud: points are fed in input order
//! with [`CellTable::insert`], then [`CellTable::finalize`] consumes the table
//! and produces one averaged point (and feature vector / label) per cell.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::grid::{cell_key, CellKey};

/// Running majority vote over the labels of one cell.
///
/// The best label is updated whenever the label just counted reaches a tally
/// greater than or equal to the current best, so ties go to the most recently
/// seen point.
#[derive(Debug, Clone)]
pub struct LabelVote {
    tally: HashMap<i32, u32>,
    best_label: i32,
    best_count: u32,
}

impl LabelVote {
    /// Start a vote with a single ballot for `label`.
    pub fn new(label: i32) -> Self {
        let mut tally = HashMap::new();
        tally.insert(label, 1);
        Self {
            tally,
            best_label: label,
            best_count: 1,
        }
    }

    /// Count one more ballot for `label`.
    #[inline]
    pub fn add(&mut self, label: i32) {
        let count = self.tally.entry(label).or_insert(0);
        *count += 1;
        if *count >= self.best_count {
            self.best_label = label;
            self.best_count = *count;
        }
    }

    /// Current winning label.
    #[inline]
    pub fn best_label(&self) -> i32 {
        self.best_label
    }

    /// Tally of the current winning label.
    #[inline]
    pub fn best_count(&self) -> u32 {
        self.best_count
    }

    /// Tally of an arbitrary label.
    #[cfg(test)]
    pub(crate) fn count_of(&self, label: i32) -> u32 {
        self.tally.get(&label).copied().unwrap_or(0)
    }
}

/// Aggregate of every point that fell into one cell.
#[derive(Debug, Clone)]
pub struct CellRecord {
    /// Number of points merged, always >= 1.
    pub count: u32,
    /// Component-wise sum of the merged coordinates.
    pub position_sum: [f32; 3],
    /// Component-wise sum of the merged feature vectors (empty when untracked).
    pub feature_sum: Vec<f32>,
    /// Label vote (absent when labels are untracked).
    pub vote: Option<LabelVote>,
}

impl CellRecord {
    /// Record seeded with a single point.
    pub fn new(point: &[f32], feature: Option<&[f32]>, label: Option<i32>) -> Self {
        Self {
            count: 1,
            position_sum: [point[0], point[1], point[2]],
            feature_sum: feature.map(<[f32]>::to_vec).unwrap_or_default(),
            vote: label.map(LabelVote::new),
        }
    }

    /// Merge one more point into the record.
    #[inline]
    pub fn add(&mut self, point: &[f32], feature: Option<&[f32]>, label: Option<i32>) {
        self.count += 1;
        for (sum, &v) in self.position_sum.iter_mut().zip(point) {
            *sum += v;
        }
        if let Some(feature) = feature {
            for (sum, &v) in self.feature_sum.iter_mut().zip(feature) {
                *sum += v;
            }
        }
        if let (Some(vote), Some(label)) = (self.vote.as_mut(), label) {
            vote.add(label);
        }
    }

    /// Mean position of the merged points.
    #[inline]
    pub fn mean_position(&self) -> [f32; 3] {
        let n = self.count as f32;
        [
            self.position_sum[0] / n,
            self.position_sum[1] / n,
            self.position_sum[2] / n,
        ]
    }

    /// Append the mean feature vector to `out`.
    #[inline]
    pub fn push_mean_feature(&self, out: &mut Vec<f32>) {
        let n = self.count as f32;
        out.extend(self.feature_sum.iter().map(|&s| s / n));
    }
}

/// Finalized rows of one cell table, ordered by ascending cell key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalizedCells {
    /// Flat `[cells, 3]` mean positions.
    pub points: Vec<f32>,
    /// Flat `[cells, F]` mean features, if tracked.
    pub features: Option<Vec<f32>>,
    /// Majority labels, if tracked.
    pub labels: Option<Vec<i32>>,
}

impl FinalizedCells {
    /// Number of cells emitted.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Hash table from cell key to running aggregate for one cloud.
#[derive(Debug)]
pub struct CellTable {
    cell_size: f32,
    feature_dim: Option<usize>,
    track_labels: bool,
    cells: HashMap<CellKey, CellRecord>,
}

impl CellTable {
    /// Create an empty table.
    ///
    /// `feature_dim` is `Some(F)` when feature vectors of width `F` are
    /// tracked; `track_labels` enables the per-cell vote.
    pub fn new(cell_size: f32, feature_dim: Option<usize>, track_labels: bool) -> Self {
        Self {
            cell_size,
            feature_dim,
            track_labels,
            cells: HashMap::new(),
        }
    }

    /// Create an empty table sized for roughly `capacity` cells.
    pub fn with_capacity(
        cell_size: f32,
        feature_dim: Option<usize>,
        track_labels: bool,
        capacity: usize,
    ) -> Self {
        Self {
            cell_size,
            feature_dim,
            track_labels,
            cells: HashMap::with_capacity(capacity),
        }
    }

    /// Number of distinct cells seen so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Record of the cell holding `point`, if any point landed there.
    #[cfg(test)]
    pub(crate) fn get(&self, point: &[f32]) -> Option<&CellRecord> {
        self.cells.get(&cell_key(point, self.cell_size))
    }

    /// Merge one point into its cell.
    ///
    /// `feature` is ignored unless features are tracked, `label` unless labels
    /// are tracked.
    #[inline]
    pub fn insert(&mut self, point: &[f32], feature: Option<&[f32]>, label: Option<i32>) {
        let feature = self.feature_dim.and(feature);
        let label = if self.track_labels { label } else { None };
        match self.cells.entry(cell_key(point, self.cell_size)) {
            Entry::Occupied(mut e) => e.get_mut().add(point, feature, label),
            Entry::Vacant(e) => {
                e.insert(CellRecord::new(point, feature, label));
            }
        }
    }

    /// Consume the table and emit one row per cell in ascending key order.
    pub fn finalize(self) -> FinalizedCells {
        let mut cells: Vec<(CellKey, CellRecord)> = self.cells.into_iter().collect();
        cells.sort_unstable_by_key(|(key, _)| *key);

        let mut points = Vec::with_capacity(cells.len() * 3);
        let mut features = self
            .feature_dim
            .map(|dim| Vec::with_capacity(cells.len() * dim));
        let mut labels = self
            .track_labels
            .then(|| Vec::with_capacity(cells.len()));

        for (_, record) in &cells {
            points.extend_from_slice(&record.mean_position());
            if let Some(out) = features.as_mut() {
                record.push_mean_feature(out);
            }
            if let (Some(out), Some(vote)) = (labels.as_mut(), record.vote.as_ref()) {
                out.push(vote.best_label());
            }
        }

        FinalizedCells {
            points,
            features,
            labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_vote_majority() {
        let mut vote = LabelVote::new(3);
        vote.add(5);
        vote.add(5);
        vote.add(3);
        vote.add(5);
        assert_eq!(vote.best_label(), 5);
        assert_eq!(vote.best_count(), 3);
        assert_eq!(vote.count_of(3), 2);
        assert_eq!(vote.count_of(9), 0);
    }

    #[test]
    fn test_label_vote_ties_favor_most_recent() {
        let mut vote = LabelVote::new(0);
        vote.add(1);
        vote.add(2);
        assert_eq!(vote.best_label(), 2);

        // 2 leads with 2 ballots; 0 catching up to 2 takes over
        vote.add(2);
        vote.add(0);
        assert_eq!(vote.best_label(), 0);
        assert_eq!(vote.best_count(), 2);

        vote.add(1);
        assert_eq!(vote.best_label(), 1);

        // A lower tally never displaces the leader
        vote.add(7);
        assert_eq!(vote.best_label(), 1);
    }

    #[test]
    fn test_cell_record_means() {
        let mut record = CellRecord::new(&[0.0, 0.0, 0.0], Some(&[0.0, 1.0]), Some(1));
        record.add(&[1.0, 2.0, 3.0], Some(&[2.0, 3.0]), Some(1));
        assert_eq!(record.count, 2);
        assert_eq!(record.mean_position(), [0.5, 1.0, 1.5]);

        let mut out = Vec::new();
        record.push_mean_feature(&mut out);
        assert_eq!(out, vec![1.0, 2.0]);
        assert_eq!(record.vote.as_ref().unwrap().best_label(), 1);
    }

    #[test]
    fn test_table_merges_points_in_same_cell() {
        let mut table = CellTable::new(1.0, None, false);
        table.insert(&[0.25, 0.25, 0.25], None, None);
        table.insert(&[0.75, 0.75, 0.75], None, None);
        table.insert(&[1.5, 0.1, 0.1], None, None);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&[0.5, 0.5, 0.5]).unwrap().count, 2);
        assert!(table.get(&[3.0, 3.0, 3.0]).is_none());

        let out = table.finalize();
        assert_eq!(out.len(), 2);
        assert_eq!(out.points, vec![0.5, 0.5, 0.5, 1.5, 0.1, 0.1]);
        assert!(out.features.is_none());
        assert!(out.labels.is_none());
    }

    #[test]
    fn test_finalize_orders_by_key() {
        let mut table = CellTable::new(1.0, None, true);
        table.insert(&[5.0, 0.0, 0.0], None, Some(1));
        table.insert(&[-3.0, 0.0, 0.0], None, Some(2));
        table.insert(&[0.0, 2.0, 0.0], None, Some(3));
        table.insert(&[0.0, 0.0, 7.0], None, Some(4));

        let out = table.finalize();
        assert_eq!(
            out.points,
            vec![-3.0, 0.0, 0.0, 0.0, 0.0, 7.0, 0.0, 2.0, 0.0, 5.0, 0.0, 0.0]
        );
        assert_eq!(out.labels, Some(vec![2, 4, 3, 1]));
    }

    #[test]
    fn test_untracked_inputs_are_ignored() {
        let mut table = CellTable::new(1.0, None, false);
        table.insert(&[0.0, 0.0, 0.0], Some(&[1.0]), Some(3));
        let record = table.get(&[0.0, 0.0, 0.0]).unwrap();
        assert!(record.feature_sum.is_empty());
        assert!(record.vote.is_none());
    }

    #[test]
    fn test_empty_table() {
        let table = CellTable::with_capacity(0.5, Some(4), true, 16);
        assert!(table.is_empty());
        let out = table.finalize();
        assert!(out.is_empty());
        assert_eq!(out.features, Some(Vec::new()));
        assert_eq!(out.labels, Some(Vec::new()));
    }
}
