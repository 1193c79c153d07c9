//! Sort specifications and find queries.
//!
//! A [`Query`] gathers the filters, sort order, projection and paging of a
//! find operation and encodes them into the documents a database client
//! takes.

use bson::Document;
use bsonkit_codec::{CodecRegistry, CodecResult, DocumentWriter, EncoderContext};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::filters::Filter;
use crate::stages::Projection;

const NATURAL: &str = "$natural";

/// Sort direction of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Written as `1`.
    Ascending,
    /// Written as `-1`.
    Descending,
    /// Written as `{ "$meta": "textScore" }`.
    TextScore,
}

impl Direction {
    fn encode(self, writer: &mut DocumentWriter, field: &str) -> CodecResult<()> {
        match self {
            Self::Ascending => writer.write_int32_named(field, 1),
            Self::Descending => writer.write_int32_named(field, -1),
            Self::TextScore => writer.write_document_named(field, |w| {
                w.write_string_named("$meta", "textScore")
            }),
        }
    }
}

/// Ordering by one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    field: String,
    direction: Direction,
}

impl Sort {
    /// Create a sort on `field`.
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Ascending order of `field`.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Ascending)
    }

    /// Descending order of `field`.
    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Descending)
    }

    /// Order by text search relevance, stored in `field`.
    pub fn text_score(field: impl Into<String>) -> Self {
        Self::new(field, Direction::TextScore)
    }

    /// Natural (storage) order.
    pub fn natural_ascending() -> Self {
        Self::ascending(NATURAL)
    }

    /// Reverse natural order.
    pub fn natural_descending() -> Self {
        Self::descending(NATURAL)
    }

    /// The sorted field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Write `sorts` as one sort document at the writer's position.
pub(crate) fn write_sort_document(writer: &mut DocumentWriter, sorts: &[Sort]) -> CodecResult<()> {
    writer.write_document(|w| {
        for sort in sorts {
            sort.direction.encode(w, &sort.field)?;
        }
        Ok(())
    })
}

/// The encoded parts of a [`Query`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDocuments {
    /// The filter document; empty matches everything.
    pub filter: Document,
    /// The sort document, if a sort was set.
    pub sort: Option<Document>,
    /// The projection document, if a projection was set.
    pub projection: Option<Document>,
    /// Documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents.
    pub limit: Option<i64>,
}

/// A find query.
///
/// ```rust
/// use bsonkit_aggregation::{Query, Sort, aggregation_registry, filters};
/// use bson::doc;
///
/// let query = Query::new()
///     .filter(filters::eq("status", "active"))
///     .sort(Sort::ascending("name"))
///     .sort(Sort::descending("age"))
///     .limit(10);
///
/// let documents = query.encode(&aggregation_registry()).unwrap();
/// assert_eq!(documents.filter, doc! { "status": { "$eq": "active" } });
/// assert_eq!(documents.sort, Some(doc! { "name": 1, "age": -1 }));
/// assert_eq!(documents.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<Filter>,
    sorts: Vec<Sort>,
    projection: Option<Projection>,
    skip: Option<u64>,
    limit: Option<i64>,
}

impl Query {
    /// Create a query matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition.
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Add a sort key after the existing ones.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Set the projection.
    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Skip the first `skip` documents.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Return at most `limit` documents.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The filters.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// The sort keys, in order.
    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    /// Encode the filter document.
    pub fn filter_document(&self, registry: &CodecRegistry) -> CodecResult<Document> {
        Filter::to_document(&self.filters, registry)
    }

    /// Encode the sort document, or `None` without sort keys.
    pub fn sort_document(&self) -> CodecResult<Option<Document>> {
        if self.sorts.is_empty() {
            return Ok(None);
        }
        let mut writer = DocumentWriter::new();
        write_sort_document(&mut writer, &self.sorts)?;
        writer.finish().map(Some)
    }

    /// Encode the projection document, or `None` without a projection.
    pub fn projection_document(&self, registry: &CodecRegistry) -> CodecResult<Option<Document>> {
        let Some(ref projection) = self.projection else {
            return Ok(None);
        };
        let mut writer = DocumentWriter::new();
        projection.write_document(&mut writer, &EncoderContext::new(registry))?;
        writer.finish().map(Some)
    }

    /// Encode every part of the query.
    pub fn encode(&self, registry: &CodecRegistry) -> CodecResult<QueryDocuments> {
        let documents = QueryDocuments {
            filter: self.filter_document(registry)?,
            sort: self.sort_document()?,
            projection: self.projection_document(registry)?,
            skip: self.skip,
            limit: self.limit,
        };
        debug!(
            filters = self.filters.len(),
            sorts = self.sorts.len(),
            "Encoded query"
        );
        Ok(documents)
    }
}
