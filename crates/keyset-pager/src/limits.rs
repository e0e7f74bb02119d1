//! Caller-tunable safety ceilings, layered on top of the `[1, 100]` page
//! size invariant that `PageOptions::new` always enforces.

/// Safety limits applied ahead of parsing/lowering, independent of any
/// single request's page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_filter_length: usize,
    pub max_order_fields: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_filter_length: 2000,
            max_order_fields: 5,
        }
    }
}

impl Limits {
    #[must_use]
    pub fn with_max_filter_length(mut self, n: usize) -> Self {
        self.max_filter_length = n;
        self
    }

    #[must_use]
    pub fn with_max_order_fields(mut self, n: usize) -> Self {
        self.max_order_fields = n;
        self
    }

    /// # Errors
    /// Returns [`crate::error::Error::Parse`] when `filter` exceeds
    /// `max_filter_length`.
    pub fn validate_filter_length(&self, filter: &str) -> crate::error::Result<()> {
        if filter.len() > self.max_filter_length {
            return Err(crate::error::Error::Parse(format!(
                "filter expression exceeds the maximum length of {} bytes",
                self.max_filter_length
            )));
        }
        Ok(())
    }

    /// # Errors
    /// Returns [`crate::error::Error::Ordering`] when `count` exceeds
    /// `max_order_fields`.
    pub fn validate_order_field_count(&self, count: usize) -> crate::error::Result<()> {
        if count > self.max_order_fields {
            return Err(crate::error::Error::Ordering(format!(
                "ordering references {count} fields, exceeding the maximum of {}",
                self.max_order_fields
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_conservative() {
        let limits = Limits::default();
        assert_eq!(limits.max_filter_length, 2000);
        assert_eq!(limits.max_order_fields, 5);
    }

    #[test]
    fn rejects_over_length_filter() {
        let limits = Limits::default().with_max_filter_length(4);
        assert!(limits.validate_filter_length("12345").is_err());
        assert!(limits.validate_filter_length("1234").is_ok());
    }

    #[test]
    fn rejects_too_many_order_fields() {
        let limits = Limits::default().with_max_order_fields(2);
        assert!(limits.validate_order_field_count(3).is_err());
        assert!(limits.validate_order_field_count(2).is_ok());
    }
}
