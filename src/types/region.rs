/// An ordered, upper-cased set of region codes. An empty filter admits every region.
///
/// Order is kept because the one-station-per-region fallback walks regions in the
/// order they were configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionFilter {
    codes: Vec<String>,
}

impl RegionFilter {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = RegionFilter::default();
        for code in codes {
            let code = code.as_ref().trim().to_uppercase();
            if !code.is_empty() && !filter.codes.contains(&code) {
                filter.codes.push(code);
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Case-insensitive membership; vacuously true when no codes are configured.
    pub fn allows(&self, code: &str) -> bool {
        self.codes.is_empty() || self.codes.iter().any(|c| c.eq_ignore_ascii_case(code.trim()))
    }
}
