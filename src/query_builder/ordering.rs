//! `$orderby` parsing and in-memory sorting by field name.

use super::fields::FieldAccess;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field_name: String,
    pub descending: bool,
}

impl OrderBy {
    /// Parse `field [asc|desc]`. Returns `None` for a blank expression.
    pub fn parse(expression: &str) -> Option<Self> {
        let mut parts = expression.split_whitespace();
        let field_name = parts.next()?.to_string();
        let descending = parts
            .next()
            .is_some_and(|direction| direction.eq_ignore_ascii_case("desc"));

        Some(Self {
            field_name,
            descending,
        })
    }

    /// Stable sort by the named field.
    ///
    /// Returns `false` and leaves `items` untouched when the record type has
    /// no such field.
    pub fn apply<T: FieldAccess>(&self, items: &mut [T]) -> bool {
        let Some(accessor) = T::field_registry().accessor(&self.field_name) else {
            return false;
        };

        items.sort_by(|a, b| {
            let ordering = accessor(a).sort_cmp(&accessor(b));
            if self.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        true
    }
}
