use std::collections::BTreeMap;

/// Running per-region sums of the statistics value column.
///
/// Sums accumulate at full precision; [`RegionTotals::rounded`] rounds only for emission.
/// Iteration is sorted by region code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionTotals {
    totals: BTreeMap<String, f64>,
}

impl RegionTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `raw` to the total of `region`. Returns `false`, leaving the totals
    /// untouched, when `raw` is not a number.
    pub fn add(&mut self, region: &str, raw: &str) -> bool {
        match parse_value(raw) {
            Some(value) => {
                *self.totals.entry(region.to_string()).or_insert(0.0) += value;
                true
            }
            None => false,
        }
    }

    /// Folds a partial result in, summing regions present in both.
    pub fn merge(&mut self, other: RegionTotals) {
        for (region, value) in other.totals {
            *self.totals.entry(region).or_insert(0.0) += value;
        }
    }

    pub fn get(&self, region: &str) -> Option<f64> {
        self.totals.get(region).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// `(region, total)` pairs in region order, totals rounded to 3 decimals.
    pub fn rounded(&self) -> Vec<(String, f64)> {
        self.totals
            .iter()
            .map(|(region, total)| (region.clone(), round3(*total)))
            .collect()
    }
}

/// Parses a published value, ignoring thousands separators. Non-finite results are rejected.
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_strips_thousands_separators() {
        assert_eq!(parse_value("1,234"), Some(1234.0));
        assert_eq!(parse_value(" 12,345.5 "), Some(12345.5));
        assert_eq!(parse_value("(D)"), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("inf"), None);
    }

    #[test]
    fn test_totals_skip_malformed_values() {
        let mut totals = RegionTotals::new();
        assert!(totals.add("NE", "1,000"));
        assert!(totals.add("KS", "2.5"));
        assert!(!totals.add("KS", "(Z)"));
        assert!(totals.add("KS", "0.25"));
        assert!(!totals.add("IA", "n/a"));

        assert_eq!(totals.get("KS"), Some(2.75));
        assert_eq!(totals.get("NE"), Some(1000.0));
        assert_eq!(totals.get("IA"), None);
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn test_rounded_is_sorted_by_region() {
        let mut totals = RegionTotals::new();
        totals.add("NE", "0.1");
        totals.add("NE", "0.2");
        totals.add("KS", "1.23456");
        let rounded = totals.rounded();
        assert_eq!(
            rounded,
            vec![("KS".to_string(), 1.235), ("NE".to_string(), 0.3)]
        );
    }

    #[test]
    fn test_merge_matches_sequential_accumulation() {
        let values = [("KS", "10"), ("NE", "5"), ("KS", "1,000"), ("CO", "7.5"), ("NE", "x")];

        let mut sequential = RegionTotals::new();
        for (region, value) in values {
            sequential.add(region, value);
        }

        let (left, right) = values.split_at(2);
        let mut merged = RegionTotals::new();
        for part in [left, right] {
            let mut partial = RegionTotals::new();
            for (region, value) in part {
                partial.add(region, value);
            }
            merged.merge(partial);
        }
        assert_eq!(merged, sequential);
    }
}
