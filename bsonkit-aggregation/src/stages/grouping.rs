//! Grouping, ordering and multi-pipeline stages.

use bsonkit_codec::{CodecResult, DocumentWriter, EncoderContext};
use indexmap::IndexMap;

use super::{Stage, write_stages};
use crate::expression::{Expression, document, field};
use crate::pipeline::AggregationPipeline;
use crate::query::{self, write_sort_document};

/// `$group`: one output document per distinct `_id`.
#[derive(Debug, Clone)]
pub struct Group {
    id: Option<Expression>,
    fields: IndexMap<String, Expression>,
}

impl Group {
    /// Group every input document together (`_id: null`).
    pub fn all() -> Self {
        Self {
            id: None,
            fields: IndexMap::new(),
        }
    }

    /// Group by the value of `expression`.
    pub fn by(expression: Expression) -> Self {
        Self {
            id: Some(expression),
            fields: IndexMap::new(),
        }
    }

    /// Group by the value of a field path.
    pub fn by_field(path: impl Into<String>) -> Self {
        Self::by(field(path))
    }

    /// Group by a compound key of named expressions.
    pub fn by_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Expression)>,
        K: Into<String>,
    {
        Self::by(document(fields))
    }

    /// Add an output field computed by an accumulator.
    pub fn field(mut self, name: impl Into<String>, accumulator: Expression) -> Self {
        self.fields.insert(name.into(), accumulator);
        self
    }
}

impl Stage for Group {
    fn stage_name(&self) -> &'static str {
        "$group"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_document(|w| {
            match self.id {
                Some(ref id) => {
                    w.write_name("_id")?;
                    ctx.encode_child(w, id)?;
                }
                None => w.write_null_named("_id")?,
            }
            for (name, accumulator) in &self.fields {
                w.write_name(name)?;
                ctx.encode_child(w, accumulator)?;
            }
            Ok(())
        })
    }
}

/// `$sort`.
#[derive(Debug, Clone, Default)]
pub struct Sort {
    sorts: Vec<query::Sort>,
}

impl Sort {
    /// Create an empty sort.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by `field` ascending, after the existing keys.
    pub fn ascending(self, field: impl Into<String>) -> Self {
        self.by(query::Sort::ascending(field))
    }

    /// Sort by `field` descending, after the existing keys.
    pub fn descending(self, field: impl Into<String>) -> Self {
        self.by(query::Sort::descending(field))
    }

    /// Sort by text search relevance stored in `field`.
    pub fn text_score(self, field: impl Into<String>) -> Self {
        self.by(query::Sort::text_score(field))
    }

    /// Append a sort key.
    pub fn by(mut self, sort: query::Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    /// The sort keys, in order.
    pub fn sorts(&self) -> &[query::Sort] {
        &self.sorts
    }
}

impl From<Vec<query::Sort>> for Sort {
    fn from(sorts: Vec<query::Sort>) -> Self {
        Self { sorts }
    }
}

impl Stage for Sort {
    fn stage_name(&self) -> &'static str {
        "$sort"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        write_sort_document(writer, &self.sorts)
    }
}

/// `$facet`: run several sub-pipelines over the same input.
#[derive(Debug, Clone, Default)]
pub struct Facet {
    facets: IndexMap<String, AggregationPipeline>,
}

impl Facet {
    /// Create a stage with no facets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the output field `name` produced by `pipeline`.
    pub fn field(mut self, name: impl Into<String>, pipeline: AggregationPipeline) -> Self {
        self.facets.insert(name.into(), pipeline);
        self
    }
}

impl Stage for Facet {
    fn stage_name(&self) -> &'static str {
        "$facet"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_document(|w| {
            for (name, pipeline) in &self.facets {
                w.write_name(name)?;
                write_stages(w, pipeline.stages(), ctx)?;
            }
            Ok(())
        })
    }
}
