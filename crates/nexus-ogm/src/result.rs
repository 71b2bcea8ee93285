//! Hydrated query results
//!
//! Both result kinds are lazy: a row is pulled from the executor, decoded and
//! hydrated only when the caller asks for the next item. Identity state is
//! released as soon as the underlying stream is exhausted. A row that fails to
//! decode or convert yields an error and iteration continues with the next
//! row.

use crate::codec::decode_row;
use crate::coerce::{FromMapped, MappedValue, Target};
use crate::error::{OgmError, Result};
use crate::executor::{QueryStatistics, RawResult, RowStream};
use crate::graph::EntityRef;
use crate::hydrate::Hydrator;
use crate::metadata::MetaData;
use crate::value::{ResultRow, Value};
use std::collections::{HashSet, VecDeque};
use std::marker::PhantomData;
use std::sync::Arc;

/// One hydrated row: column alias to mapped value, in projection order
#[derive(Debug, Clone, PartialEq)]
pub struct RowMap {
    entries: Vec<(String, MappedValue)>,
}

impl RowMap {
    pub(crate) fn new(entries: Vec<(String, MappedValue)>) -> Self {
        Self { entries }
    }

    /// Value for an alias. Null and absent columns both read as `None`.
    pub fn get(&self, alias: &str) -> Option<&MappedValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == alias)
            .map(|(_, v)| v)
            .filter(|v| !v.is_null())
    }

    /// Value for an alias converted into a requested type
    pub fn get_as<T: FromMapped>(&self, alias: &str) -> Result<T> {
        T::from_mapped(self.get(alias).cloned().unwrap_or(MappedValue::Null))
    }

    /// Whether the row has a column with this alias, null or not
    pub fn contains_column(&self, alias: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == alias)
    }

    /// Column aliases in projection order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate `(alias, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MappedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared plumbing: pull one raw row and decode it
struct RowSource {
    columns: Arc<[String]>,
    rows: RowStream,
    hydrator: Option<Hydrator>,
}

impl RowSource {
    fn new(raw: RawResult, metadata: Arc<MetaData>) -> (Self, Option<QueryStatistics>) {
        let source = Self {
            columns: raw.columns.into(),
            rows: raw.rows,
            hydrator: Some(Hydrator::new(metadata)),
        };
        (source, raw.statistics)
    }

    /// Next decoded row; `None` once exhausted, at which point identity state
    /// is dropped
    fn next_row(&mut self) -> Option<Result<(ResultRow, &mut Hydrator)>> {
        self.hydrator.as_ref()?;
        match self.rows.next() {
            None => {
                self.hydrator = None;
                None
            }
            Some(Err(e)) => Some(Err(e)),
            Some(Ok(values)) => {
                let row = decode_row(&values)
                    .and_then(|values| ResultRow::new(Arc::clone(&self.columns), values));
                let hydrator = self.hydrator.as_mut()?;
                Some(row.map(|row| (row, hydrator)))
            }
        }
    }

    fn is_released(&self) -> bool {
        self.hydrator.is_none()
    }
}

/// Rows of a general query, hydrated into [`RowMap`]s
pub struct QueryResult {
    source: RowSource,
    statistics: Option<QueryStatistics>,
}

impl QueryResult {
    pub(crate) fn new(raw: RawResult, metadata: Arc<MetaData>, with_statistics: bool) -> Self {
        let (source, statistics) = RowSource::new(raw, metadata);
        Self {
            source,
            statistics: if with_statistics {
                Some(statistics.unwrap_or_default())
            } else {
                None
            },
        }
    }

    /// Update statistics; `None` for read-only runs
    pub fn query_statistics(&self) -> Option<&QueryStatistics> {
        self.statistics.as_ref()
    }

    /// Column aliases in projection order
    pub fn columns(&self) -> &[String] {
        &self.source.columns
    }

    /// Collect every remaining row, stopping at the first failing one
    pub fn query_results(self) -> Result<Vec<RowMap>> {
        self.collect()
    }

    /// Whether the row stream is exhausted and identity state released
    pub fn is_exhausted(&self) -> bool {
        self.source.is_released()
    }
}

impl Iterator for QueryResult {
    type Item = Result<RowMap>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(
            self.source
                .next_row()?
                .map(|(row, hydrator)| RowMap::new(hydrator.hydrate_row(&row))),
        )
    }
}

impl std::fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResult")
            .field("columns", &self.source.columns)
            .field("statistics", &self.statistics)
            .finish_non_exhaustive()
    }
}

/// Results of a single-type query
///
/// For a registered domain class this yields each distinct top-level instance
/// of the class once, in first-appearance order; everything else in the row
/// only contributes relationship wiring. For any other type each row must have
/// exactly one column, which is converted on its own.
pub struct Mapped<T> {
    source: RowSource,
    statistics: Option<QueryStatistics>,
    pending: VecDeque<EntityRef>,
    emitted: HashSet<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromMapped> Mapped<T> {
    pub(crate) fn new(raw: RawResult, metadata: Arc<MetaData>, with_statistics: bool) -> Self {
        let (source, statistics) = RowSource::new(raw, metadata);
        Self {
            source,
            statistics: if with_statistics {
                Some(statistics.unwrap_or_default())
            } else {
                None
            },
            pending: VecDeque::new(),
            emitted: HashSet::new(),
            _marker: PhantomData,
        }
    }

    /// Update statistics; `None` for read-only runs
    pub fn query_statistics(&self) -> Option<&QueryStatistics> {
        self.statistics.as_ref()
    }

    /// Column aliases in projection order
    pub fn columns(&self) -> &[String] {
        &self.source.columns
    }

    /// Whether the row stream is exhausted and identity state released
    pub fn is_exhausted(&self) -> bool {
        self.source.is_released() && self.pending.is_empty()
    }

    fn scalar_row(row: &ResultRow, hydrator: &mut Hydrator) -> Result<T> {
        if row.len() != 1 {
            return Err(OgmError::row_shape(format!(
                "mapping to {} needs exactly one column per row, found {} ({})",
                T::type_name(),
                row.len(),
                row.columns().join(", ")
            )));
        }
        hydrator.register_row(row);
        let value = hydrator
            .project(&row.values()[0])
            .unwrap_or(MappedValue::Null);
        T::from_mapped(value)
    }

    /// Queue new top-level instances of `class`; fails when a single-column
    /// row holds something that cannot be an instance
    fn entity_row(&mut self, row: &ResultRow, class: &str) -> Result<()> {
        let Some(hydrator) = self.source.hydrator.as_mut() else {
            return Ok(());
        };
        hydrator.register_row(row);
        let found = hydrator.root_entities(row, class);
        if found.is_empty() && row.len() == 1 {
            let only = &row.values()[0];
            if !matches!(only, Value::Null | Value::List(_)) {
                let mapped = hydrator.project(only).unwrap_or(MappedValue::Null);
                if !mapped.is_null() {
                    return Err(OgmError::type_mismatch(mapped.type_name(), class));
                }
            }
        }
        for entity in found {
            if self.emitted.insert(entity.index()) {
                self.pending.push_back(entity);
            }
        }
        Ok(())
    }
}

impl<T: FromMapped> Iterator for Mapped<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entity) = self.pending.pop_front() {
                return Some(T::from_mapped(MappedValue::Entity(entity)));
            }
            let row = match self.source.next_row()? {
                Ok((row, hydrator)) => match T::target() {
                    Target::Scalar => return Some(Self::scalar_row(&row, hydrator)),
                    Target::Entity(_) => row,
                },
                Err(e) => return Some(Err(e)),
            };
            if let Target::Entity(class) = T::target() {
                if let Err(e) = self.entity_row(&row, class) {
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<T> std::fmt::Debug for Mapped<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapped")
            .field("columns", &self.source.columns)
            .field("statistics", &self.statistics)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
