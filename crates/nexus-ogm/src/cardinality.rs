//! Row-count expectations for single-object requests

use crate::error::{OgmError, Result};
use tracing::debug;

/// How many items a single-object request tolerates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// Exactly one item; none is an error
    ExactlyOne,
    /// Zero or one item
    #[default]
    AtMostOne,
    /// Any number; the first item wins
    Many,
}

impl Cardinality {
    /// Reduce a fallible stream to at most one item. The stream is drained
    /// so a violation reports the full count; the first error aborts.
    pub fn single<T, I>(self, items: I) -> Result<Option<T>>
    where
        I: IntoIterator<Item = Result<T>>,
    {
        let mut first = None;
        let mut count = 0usize;
        for item in items {
            let item = item?;
            count += 1;
            if first.is_none() {
                first = Some(item);
            }
        }

        match (self, count) {
            (Cardinality::ExactlyOne, 0) => Err(OgmError::cardinality(0)),
            (Cardinality::ExactlyOne | Cardinality::AtMostOne, n) if n > 1 => {
                Err(OgmError::cardinality(n))
            }
            (Cardinality::Many, n) if n > 1 => {
                debug!("Single-object request matched {} items; using the first", n);
                Ok(first)
            }
            _ => Ok(first),
        }
    }
}
