use elvaco_client::domain::Series;

/// Filter entry that selects every well-formed house code.
pub const WILDCARD: &str = "all";

/// Set of house codes (or code prefixes) a run is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseFilter {
    entries: Vec<String>,
}

impl HouseFilter {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma separated list such as `"101,102,203"` or `"all"`.
    /// Blank entries are dropped, they would prefix-match every position.
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty()),
        )
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn allows(&self, position: &str) -> bool {
        self.entries.iter().any(|entry| {
            (entry == WILDCARD && looks_like_house_code(position))
                || entry == position
                || position.starts_with(entry.as_str())
        })
    }
}

/// Positions are expected to start with a three digit house code (`103`, `205,1`, ...).
pub fn looks_like_house_code(position: &str) -> bool {
    let bytes = position.as_bytes();
    bytes.len() >= 3 && bytes[..3].iter().all(u8::is_ascii_digit)
}

/// A series is processed only if it has a unit, comes from a trusted identifier
/// and sits in one of the requested houses.
pub fn is_eligible(series: &Series, filter: &HouseFilter) -> bool {
    series.has_unit() && series.has_valid_identifier() && filter.allows(&series.source_position)
}
