use crate::models::ALL;

/// Equality filters for a remote list/delete query.
///
/// Values equal to the `"all"` sentinel (or empty) are dropped, so callers can
/// pass UI filter values straight through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pairs: Vec<(String, String)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.is_empty() && !value.eq_ignore_ascii_case(ALL) {
            self.pairs.push((field.to_string(), value));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Query parameters in `field=eq.value` form.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .map(|(field, value)| (field.clone(), format!("eq.{value}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_sentinel_is_skipped() {
        let filters = Filters::new().eq("status", "all").eq("profile_id", "ALL");
        assert!(filters.is_empty());
        assert!(filters.query_pairs().is_empty());
    }

    #[test]
    fn test_equality_pairs() {
        let filters = Filters::new().eq("status", "win").eq("profile_id", 3);
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("status".to_string(), "eq.win".to_string()),
                ("profile_id".to_string(), "eq.3".to_string()),
            ]
        );
    }
}
