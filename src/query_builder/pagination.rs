use crate::error::{MonitorError, Result};

/// Skip/take window, from `$skip`/`$top` or a backend page request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Pagination {
    /// Parse `$skip` and `$top`. Absent values mean "no limit"; anything that
    /// is not a non-negative integer is rejected.
    pub fn from_query(skip: Option<&str>, top: Option<&str>) -> Result<Self> {
        Ok(Self {
            offset: parse_count("$skip", skip)?,
            limit: parse_count("$top", top)?,
        })
    }

    pub fn limit_offset(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    pub fn skip(&self) -> usize {
        self.offset.unwrap_or(0) as usize
    }

    /// `usize::MAX` when unbounded
    pub fn take(&self) -> usize {
        self.limit.map_or(usize::MAX, |limit| limit as usize)
    }

    /// Apply the window to an iterator
    pub fn window<I: Iterator>(&self, items: I) -> std::iter::Take<std::iter::Skip<I>> {
        items.skip(self.skip()).take(self.take())
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }
}

fn parse_count(parameter: &str, raw: Option<&str>) -> Result<Option<u32>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse::<u32>().map(Some).map_err(|_| {
            MonitorError::BadRequest(format!("{parameter} must be a non-negative integer, got '{value}'"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query() {
        let pagination = Pagination::from_query(Some("20"), Some("10")).unwrap();
        assert_eq!(pagination.offset, Some(20));
        assert_eq!(pagination.limit, Some(10));
        assert_eq!(pagination.to_sql(), " LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_absent_values_are_unbounded() {
        let pagination = Pagination::from_query(None, Some("  ")).unwrap();
        assert_eq!(pagination.skip(), 0);
        assert_eq!(pagination.take(), usize::MAX);
        assert_eq!(pagination.to_sql(), "");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Pagination::from_query(Some("-1"), None),
            Err(MonitorError::BadRequest(_))
        ));
        assert!(matches!(
            Pagination::from_query(None, Some("ten")),
            Err(MonitorError::BadRequest(_))
        ));
    }

    #[test]
    fn test_window() {
        let window: Vec<_> = Pagination::limit_offset(2, 1).window(1..=5).collect();
        assert_eq!(window, vec![2, 3]);

        let tail: Vec<_> = Pagination::from_query(Some("3"), None)
            .unwrap()
            .window(1..=5)
            .collect();
        assert_eq!(tail, vec![4, 5]);
    }
}
