// src/simulation/results.rs
use std::collections::BTreeMap;
use std::fmt;

/// Histogram of measured bitstrings.
///
/// Maps each observed bitstring to the number of repetitions that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counts {
    counts: BTreeMap<String, u64>,
}

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` to the tally for `bitstring`.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.counts.entry(bitstring.into()).or_default() += count;
    }

    /// Count for a bitstring, zero if never observed.
    pub fn get(&self, bitstring: &str) -> u64 {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Iterates `(bitstring, count)` pairs in bitstring order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.counts.iter()
    }

    /// Sum of all counts.
    pub fn total_shots(&self) -> u64 {
        self.counts.values().sum()
    }

    /// The bitstring seen most often. Ties go to the smallest bitstring.
    pub fn most_frequent(&self) -> Option<(&String, &u64)> {
        self.counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
    }

    /// Relative frequency of each bitstring.
    pub fn probabilities(&self) -> BTreeMap<String, f64> {
        let total = self.total_shots() as f64;
        if total == 0.0 {
            return BTreeMap::new();
        }
        self.counts
            .iter()
            .map(|(k, &v)| (k.clone(), v as f64 / total))
            .collect()
    }

    /// Pairs sorted by count, descending.
    pub fn sorted(&self) -> Vec<(&String, &u64)> {
        let mut items: Vec<_> = self.counts.iter().collect();
        items.sort_by(|a, b| b.1.cmp(a.1));
        items
    }

    /// Number of distinct bitstrings.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(String, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (key, value) in iter {
            counts.insert(key, value);
        }
        counts
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (bits, count)) in self.counts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\": {}", bits, count)?;
        }
        write!(f, "}}")
    }
}

/// Every repetition's outcome, grouped by measurement key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationResult {
    repetitions: usize,
    /// key -> one bitstring per repetition, in repetition order
    records: BTreeMap<String, Vec<String>>,
}

impl SimulationResult {
    /// Creates an empty result for `repetitions` runs. (Internal visibility)
    pub(crate) fn new(repetitions: usize) -> Self {
        Self {
            repetitions,
            records: BTreeMap::new(),
        }
    }

    /// Appends one repetition's bitstring under `key`. (Internal visibility)
    pub(crate) fn record(&mut self, key: &str, bits: String) {
        self.records.entry(key.to_string()).or_default().push(bits);
    }

    /// Number of repetitions that were simulated.
    pub fn repetitions(&self) -> usize {
        self.repetitions
    }

    /// Measurement keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Per-repetition bitstrings recorded under `key`, if it was measured.
    pub fn measurements(&self, key: &str) -> Option<&[String]> {
        self.records.get(key).map(Vec::as_slice)
    }

    /// Folds the records of `key` into a histogram. Unknown keys give empty counts.
    pub fn histogram(&self, key: &str) -> Counts {
        let mut counts = Counts::new();
        if let Some(records) = self.records.get(key) {
            for bits in records {
                counts.insert(bits.as_str(), 1);
            }
        }
        counts
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation Results ({} repetitions):", self.repetitions)?;
        if self.records.is_empty() {
            writeln!(f, "  No qubits were measured.")?;
        }
        for key in self.records.keys() {
            writeln!(f, "  {}: {}", key, self.histogram(key))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_and_display_sorted() {
        let mut counts = Counts::new();
        counts.insert("1", 3);
        counts.insert("0", 2);
        counts.insert("1", 5);

        assert_eq!(counts.get("1"), 8);
        assert_eq!(counts.get("11"), 0);
        assert_eq!(counts.total_shots(), 10);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.to_string(), r#"{"0": 2, "1": 8}"#);
        assert_eq!(counts.most_frequent(), Some((&"1".to_string(), &8)));
    }

    #[test]
    fn probabilities_sum_to_one() {
        let counts: Counts = vec![("0".to_string(), 1), ("1".to_string(), 3)].into_iter().collect();
        let probs = counts.probabilities();
        assert!((probs["0"] - 0.25).abs() < 1e-12);
        assert!((probs["1"] - 0.75).abs() < 1e-12);
        assert!(Counts::new().probabilities().is_empty());
    }

    #[test]
    fn histogram_folds_records() {
        let mut result = SimulationResult::new(3);
        result.record("m", "1".to_string());
        result.record("m", "1".to_string());
        result.record("m", "0".to_string());

        let hist = result.histogram("m");
        assert_eq!(hist.get("1"), 2);
        assert_eq!(hist.get("0"), 1);
        assert_eq!(hist.total_shots(), result.repetitions() as u64);
        assert!(result.histogram("missing").is_empty());
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["m"]);
    }
}
