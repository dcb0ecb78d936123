//! Conjunctive record filter for the statistics dump.

use crate::config::QuickStatsConfig;
use crate::quickstats::reader::FieldLookup;
use crate::types::region::RegionFilter;
use bon::bon;

pub const STATE_ALPHA: &str = "STATE_ALPHA";
pub const AGG_LEVEL_DESC: &str = "AGG_LEVEL_DESC";
pub const UNIT_DESC: &str = "UNIT_DESC";
pub const SHORT_DESC: &str = "SHORT_DESC";
pub const VALUE: &str = "VALUE";

/// Value tokens the provider publishes instead of a number: withheld to avoid
/// disclosing individual operations, and less than half the reported unit.
pub const WITHHELD: &str = "(D)";
pub const SUPPRESSED: &str = "(Z)";

/// Predicates over one statistics record. Every predicate set is optional; an empty
/// set places no constraint on its field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    regions: RegionFilter,
    agg_levels: Vec<String>,
    unit_contains: Vec<String>,
    short_desc_contains: Vec<String>,
}

#[bon]
impl FilterCriteria {
    /// Builds criteria. Text predicates are compared case-insensitively.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use region_extract::quickstats::filter::FilterCriteria;
    /// let criteria = FilterCriteria::builder()
    ///     .agg_levels(vec!["county".to_string()])
    ///     .short_desc_contains(vec!["irrigated".to_string()])
    ///     .build();
    /// assert!(!criteria.is_unconstrained());
    /// ```
    #[builder]
    pub fn new(
        #[builder(default)] regions: RegionFilter,
        #[builder(default)] agg_levels: Vec<String>,
        #[builder(default)] unit_contains: Vec<String>,
        #[builder(default)] short_desc_contains: Vec<String>,
    ) -> Self {
        Self {
            regions,
            agg_levels: normalize(agg_levels),
            unit_contains: normalize(unit_contains),
            short_desc_contains: normalize(short_desc_contains),
        }
    }

    pub fn from_config(config: &QuickStatsConfig, states: &[String]) -> Self {
        Self::builder()
            .regions(RegionFilter::new(states))
            .agg_levels(config.agg_level_desc.clone())
            .unit_contains(config.unit_desc_contains.clone())
            .short_desc_contains(config.short_desc_contains.clone())
            .build()
    }

    /// `true` when only the value-presence check applies.
    pub fn is_unconstrained(&self) -> bool {
        self.regions.is_empty()
            && self.agg_levels.is_empty()
            && self.unit_contains.is_empty()
            && self.short_desc_contains.is_empty()
    }

    /// Evaluates the predicates in order, stopping at the first that fails.
    pub fn matches(&self, record: &impl FieldLookup) -> bool {
        self.regions.allows(record.field(STATE_ALPHA))
            && is_member(&self.agg_levels, record.field(AGG_LEVEL_DESC))
            && contains_any(&self.unit_contains, record.field(UNIT_DESC))
            && contains_any(&self.short_desc_contains, record.field(SHORT_DESC))
            && has_value(record.field(VALUE))
    }
}

fn normalize(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_uppercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn is_member(allowed: &[String], value: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a.eq_ignore_ascii_case(value.trim()))
}

fn contains_any(needles: &[String], haystack: &str) -> bool {
    if needles.is_empty() {
        return true;
    }
    let haystack = haystack.to_uppercase();
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

/// A value is present when it is non-blank and not a placeholder token.
pub fn has_value(raw: &str) -> bool {
    let value = raw.trim();
    !(value.is_empty() || value == WITHHELD || value == SUPPRESSED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quickstats::reader::TabularRecord;

    fn record(state: &str, agg: &str, unit: &str, short: &str, value: &str) -> TabularRecord {
        TabularRecord::from_pairs([
            (STATE_ALPHA, state),
            (AGG_LEVEL_DESC, agg),
            (UNIT_DESC, unit),
            (SHORT_DESC, short),
            (VALUE, value),
        ])
    }

    fn irrigated_county_acres() -> FilterCriteria {
        FilterCriteria::builder()
            .regions(RegionFilter::new(["KS", "NE"]))
            .agg_levels(vec!["County".to_string()])
            .unit_contains(vec!["acres".to_string()])
            .short_desc_contains(vec!["IRRIGATED".to_string(), "HARVESTED".to_string()])
            .build()
    }

    #[test]
    fn test_withheld_value_does_not_match() {
        let criteria = FilterCriteria::builder()
            .agg_levels(vec!["COUNTY".to_string()])
            .build();
        let withheld = TabularRecord::from_pairs([(AGG_LEVEL_DESC, "COUNTY"), (VALUE, "(D)")]);
        assert!(!criteria.matches(&withheld));

        let reported = TabularRecord::from_pairs([(AGG_LEVEL_DESC, "COUNTY"), (VALUE, "1,200")]);
        assert!(criteria.matches(&reported));
    }

    #[test]
    fn test_placeholders_and_blanks_have_no_value() {
        assert!(!has_value(""));
        assert!(!has_value("   "));
        assert!(!has_value(" (D) "));
        assert!(!has_value("(Z)"));
        assert!(has_value("0"));
        assert!(has_value("n/a"));
    }

    #[test]
    fn test_each_predicate_can_reject() {
        let criteria = irrigated_county_acres();
        let good = record("ks", "COUNTY", "ACRES", "CORN, IRRIGATED - ACRES HARVESTED", "1,234");
        assert!(criteria.matches(&good));

        assert!(!criteria.matches(&record("IA", "COUNTY", "ACRES", "CORN, IRRIGATED", "1")));
        assert!(!criteria.matches(&record("KS", "STATE", "ACRES", "CORN, IRRIGATED", "1")));
        assert!(!criteria.matches(&record("KS", "COUNTY", "BU", "CORN, IRRIGATED", "1")));
        assert!(!criteria.matches(&record("KS", "COUNTY", "ACRES", "CORN, GRAIN", "1")));
        assert!(!criteria.matches(&record("KS", "COUNTY", "ACRES", "CORN, IRRIGATED", "(Z)")));
    }

    #[test]
    fn test_empty_criteria_only_checks_value() {
        let criteria = FilterCriteria::default();
        assert!(criteria.is_unconstrained());
        assert!(criteria.matches(&record("", "", "", "", "7")));
        assert!(!criteria.matches(&record("KS", "COUNTY", "ACRES", "ANY", "")));
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let criteria = irrigated_county_acres();
        let rows = vec![
            record("KS", "COUNTY", "ACRES", "WHEAT, IRRIGATED", "10"),
            record("NE", "county", "acres", "soybeans, irrigated", "(D)"),
            record("NE", "COUNTY", "ACRES", "HAY - ACRES HARVESTED", "3,000"),
            record("TX", "COUNTY", "ACRES", "COTTON, IRRIGATED", "4"),
        ];
        let once: Vec<_> = rows.iter().filter(|r| criteria.matches(*r)).collect();
        let twice: Vec<_> = once.iter().copied().filter(|r| criteria.matches(*r)).collect();
        assert_eq!(once.len(), 2);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.field(VALUE), b.field(VALUE));
        }
    }

    #[test]
    fn test_from_config() {
        let config = QuickStatsConfig {
            agg_level_desc: vec!["county".into()],
            ..Default::default()
        };
        let criteria = FilterCriteria::from_config(&config, &["ks".to_string()]);
        assert!(criteria.matches(&record("KS", "COUNTY", "", "", "5")));
        assert!(!criteria.matches(&record("NE", "COUNTY", "", "", "5")));
    }
}
