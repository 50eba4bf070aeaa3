//! Flattened training data and train/test splitting

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use super::session::GestureSamples;
use crate::domain::gesture::GestureVocabulary;

/// Feature matrix and label vector, flattened in vocabulary order
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    features: Vec<Vec<f32>>,
    labels: Vec<usize>,
    n_classes: usize,
}

/// Row indices of each partition
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub stratified: bool,
    /// Test partition came out empty and reuses the training rows
    pub test_is_train: bool,
}

impl LabeledDataset {
    /// Flatten buckets gesture by gesture in vocabulary order.
    ///
    /// `buckets[i]` must hold the samples of `vocabulary[i]`.
    pub fn from_buckets(vocabulary: &GestureVocabulary, buckets: &[GestureSamples]) -> Self {
        let mut features = Vec::new();
        let mut labels = Vec::new();

        for (index, gesture) in vocabulary.iter().enumerate() {
            let Some(bucket) = buckets.get(index).filter(|b| !b.is_empty()) else {
                warn!(gesture, "No samples collected for gesture");
                continue;
            };

            for (vector, &label) in bucket.features().iter().zip(bucket.labels()) {
                features.push(vector.as_slice().to_vec());
                labels.push(label);
            }
        }

        Self {
            features,
            labels,
            n_classes: vocabulary.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.features[index]
    }

    /// Per-class sample counts
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &label in &self.labels {
            if let Some(count) = counts.get_mut(label) {
                *count += 1;
            }
        }
        counts
    }

    /// Number of classes with at least one sample
    pub fn classes_present(&self) -> usize {
        self.class_counts().iter().filter(|&&c| c > 0).count()
    }

    /// Rows and labels for a set of indices
    pub fn select(&self, indices: &[usize]) -> (Vec<&[f32]>, Vec<usize>) {
        indices
            .iter()
            .map(|&i| (self.features[i].as_slice(), self.labels[i]))
            .unzip()
    }

    /// Seeded split with `test_ratio` of rows held out.
    ///
    /// Stratified when every present class has at least two samples and both
    /// partitions can hold one sample per class; otherwise a plain shuffled
    /// split. An empty test partition falls back to the training rows.
    pub fn split<R: Rng>(&self, test_ratio: f32, rng: &mut R) -> DatasetSplit {
        let total = self.len();
        let test_size = if total < 2 {
            0
        } else {
            ((total as f32 * test_ratio.clamp(0.0, 1.0)).ceil() as usize).min(total - 1)
        };

        let counts = self.class_counts();
        let present = counts.iter().filter(|&&c| c > 0).count();
        let stratifiable = counts.iter().all(|&c| c == 0 || c >= 2)
            && test_size >= present
            && total - test_size >= present;

        let (train, test, stratified) = if stratifiable {
            let (train, test) = self.stratified_split(test_ratio, rng);
            (train, test, true)
        } else {
            warn!(
                samples = total,
                classes = present,
                "Stratified split not possible, using unstratified split"
            );
            let mut order: Vec<usize> = (0..total).collect();
            order.shuffle(rng);
            let train = order.split_off(test_size);
            (train, order, false)
        };

        if test.is_empty() {
            warn!("Test partition is empty, evaluating on training data");
            return DatasetSplit {
                test: train.clone(),
                train,
                stratified,
                test_is_train: true,
            };
        }

        DatasetSplit {
            train,
            test,
            stratified,
            test_is_train: false,
        }
    }

    fn stratified_split<R: Rng>(&self, test_ratio: f32, rng: &mut R) -> (Vec<usize>, Vec<usize>) {
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); self.n_classes];
        for (row, &label) in self.labels.iter().enumerate() {
            by_class[label].push(row);
        }

        let mut train = Vec::new();
        let mut test = Vec::new();

        for mut rows in by_class.into_iter().filter(|r| !r.is_empty()) {
            rows.shuffle(rng);
            let held = ((rows.len() as f32 * test_ratio).round() as usize).clamp(1, rows.len() - 1);
            test.extend(rows.drain(..held));
            train.extend(rows);
        }

        train.shuffle(rng);
        test.shuffle(rng);
        (train, test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extractor::FeatureVector;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dataset(per_class: &[usize]) -> LabeledDataset {
        let names: Vec<String> = (0..per_class.len()).map(|i| format!("G{}", i)).collect();
        let vocabulary = GestureVocabulary::new(names).unwrap();
        let buckets: Vec<GestureSamples> = per_class
            .iter()
            .enumerate()
            .map(|(label, &count)| {
                let mut bucket = GestureSamples::default();
                for i in 0..count {
                    bucket.push(FeatureVector::new(vec![label as f32, i as f32]), label);
                }
                bucket
            })
            .collect();

        LabeledDataset::from_buckets(&vocabulary, &buckets)
    }

    #[test]
    fn test_flatten_follows_vocabulary_order() {
        let data = dataset(&[2, 0, 3]);
        assert_eq!(data.labels(), &[0, 0, 2, 2, 2]);
        assert_eq!(data.row(2), &[2.0, 0.0]);
        assert_eq!(data.classes_present(), 2);
        assert_eq!(data.n_classes(), 3);
    }

    #[test]
    fn test_balanced_split_is_stratified() {
        let data = dataset(&[10, 10, 10, 10]);
        let mut rng = StdRng::seed_from_u64(42);

        let split = data.split(0.2, &mut rng);

        assert!(split.stratified);
        assert_eq!(split.test.len(), 8);
        assert_eq!(split.train.len(), 32);
        let (_, test_labels) = data.select(&split.test);
        for class in 0..4 {
            assert_eq!(test_labels.iter().filter(|&&l| l == class).count(), 2);
        }
    }

    #[test]
    fn test_singleton_class_falls_back_to_unstratified() {
        let data = dataset(&[1, 6]);
        let mut rng = StdRng::seed_from_u64(42);

        let split = data.split(0.2, &mut rng);

        assert!(!split.stratified);
        assert_eq!(split.train.len() + split.test.len(), 7);
    }

    #[test]
    fn test_single_sample_evaluates_on_training_rows() {
        let data = dataset(&[1]);
        let mut rng = StdRng::seed_from_u64(42);

        let split = data.split(0.2, &mut rng);

        assert!(split.test_is_train);
        assert_eq!(split.train, split.test);
    }

    #[test]
    fn test_split_is_deterministic_for_seed() {
        let data = dataset(&[5, 5, 5]);
        let a = data.split(0.2, &mut StdRng::seed_from_u64(7));
        let b = data.split(0.2, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_partitions_are_disjoint() {
        let data = dataset(&[4, 4]);
        let split = data.split(0.25, &mut StdRng::seed_from_u64(3));
        assert!(split.test.iter().all(|row| !split.train.contains(row)));
    }
}
