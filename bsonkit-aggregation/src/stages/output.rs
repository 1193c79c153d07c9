//! Stages that write the pipeline output to a collection.

use bsonkit_codec::{CodecResult, DocumentWriter, EncoderContext};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Stage, write_stages};
use crate::expression::Expression;
use crate::pipeline::AggregationPipeline;

/// Action when an output document matches an existing one during `$merge`.
#[derive(Debug, Clone)]
pub enum WhenMatched {
    /// Replace the existing document.
    Replace,
    /// Keep the existing document. Written as the server's camel-cased
    /// `keepExisting`, not the snake-cased `keep_existing`.
    KeepExisting,
    /// Merge fields into the existing document.
    Merge,
    /// Stop the aggregation.
    Fail,
    /// Update the existing document with a pipeline.
    Pipeline(AggregationPipeline),
}

impl WhenMatched {
    /// The symbolic name, or `None` for a pipeline.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::Replace => Some("replace"),
            Self::KeepExisting => Some("keepExisting"),
            Self::Merge => Some("merge"),
            Self::Fail => Some("fail"),
            Self::Pipeline(_) => None,
        }
    }
}

/// Action when an output document matches nothing during `$merge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WhenNotMatched {
    /// Insert the document.
    Insert,
    /// Discard the document.
    Discard,
    /// Stop the aggregation.
    Fail,
}

impl WhenNotMatched {
    /// The symbolic name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Discard => "discard",
            Self::Fail => "fail",
        }
    }
}

/// `$merge`: write results into a collection, merging with its content.
#[derive(Debug, Clone)]
pub struct Merge {
    database: Option<String>,
    collection: String,
    on: Vec<String>,
    variables: IndexMap<String, Expression>,
    when_matched: Option<WhenMatched>,
    when_not_matched: Option<WhenNotMatched>,
}

impl Merge {
    /// Merge into `collection` of the current database.
    pub fn into_collection(collection: impl Into<String>) -> Self {
        Self {
            database: None,
            collection: collection.into(),
            on: Vec::new(),
            variables: IndexMap::new(),
            when_matched: None,
            when_not_matched: None,
        }
    }

    /// Merge into `collection` of `database`.
    pub fn into_database(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..Self::into_collection(collection)
        }
    }

    /// Add a field that identifies matching documents.
    pub fn on(mut self, field: impl Into<String>) -> Self {
        self.on.push(field.into());
        self
    }

    /// Define a variable usable in the `whenMatched` pipeline.
    pub fn let_var(mut self, name: impl Into<String>, expression: Expression) -> Self {
        self.variables.insert(name.into(), expression);
        self
    }

    /// Set the action for matching documents.
    pub fn when_matched(mut self, action: WhenMatched) -> Self {
        self.when_matched = Some(action);
        self
    }

    /// Set the action for unmatched documents.
    pub fn when_not_matched(mut self, action: WhenNotMatched) -> Self {
        self.when_not_matched = Some(action);
        self
    }
}

impl Stage for Merge {
    fn stage_name(&self) -> &'static str {
        "$merge"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_document(|w| {
            match self.database {
                Some(ref database) => w.write_document_named("into", |w| {
                    w.write_string_named("db", database)?;
                    w.write_string_named("coll", &self.collection)
                })?,
                None => w.write_string_named("into", &self.collection)?,
            }

            match self.on.as_slice() {
                [] => {}
                [single] => w.write_string_named("on", single)?,
                fields => w.write_array_named("on", |w| {
                    for field in fields {
                        w.write_string(field)?;
                    }
                    Ok(())
                })?,
            }

            if !self.variables.is_empty() {
                w.write_document_named("let", |w| {
                    for (name, expression) in &self.variables {
                        w.write_name(name)?;
                        ctx.encode_child(w, expression)?;
                    }
                    Ok(())
                })?;
            }

            match self.when_matched {
                Some(WhenMatched::Pipeline(ref pipeline)) => {
                    w.write_name("whenMatched")?;
                    write_stages(w, pipeline.stages(), ctx)?;
                }
                Some(ref action) => {
                    if let Some(name) = action.as_str() {
                        w.write_string_named("whenMatched", name)?;
                    }
                }
                None => {}
            }

            if let Some(action) = self.when_not_matched {
                w.write_string_named("whenNotMatched", action.as_str())?;
            }
            Ok(())
        })
    }
}

/// `$out`: replace a collection with the pipeline output.
#[derive(Debug, Clone)]
pub struct Out {
    database: Option<String>,
    collection: String,
}

impl Out {
    /// Write to `collection` of the current database.
    pub fn to_collection(collection: impl Into<String>) -> Self {
        Self {
            database: None,
            collection: collection.into(),
        }
    }

    /// Write to `collection` of `database`.
    pub fn to_database(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            collection: collection.into(),
        }
    }
}

impl Stage for Out {
    fn stage_name(&self) -> &'static str {
        "$out"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        match self.database {
            Some(ref database) => writer.write_document(|w| {
                w.write_string_named("db", database)?;
                w.write_string_named("coll", &self.collection)
            }),
            None => writer.write_string(&self.collection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation_registry;
    use crate::expression::field;
    use crate::operators::arithmetic::add;
    use crate::stages::Set;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn encode<S: Stage>(stage: &S) -> bson::Document {
        aggregation_registry().encode_to_document(stage).unwrap()
    }

    #[test]
    fn test_minimal_merge_omits_absent_options() {
        assert_eq!(
            encode(&Merge::into_collection("monthly")),
            doc! { "$merge": { "into": "monthly" } }
        );
    }

    #[test]
    fn test_merge_with_enums() {
        let stage = Merge::into_database("reporting", "budgets")
            .on("dept")
            .on("fiscal_year")
            .when_matched(WhenMatched::KeepExisting)
            .when_not_matched(WhenNotMatched::Discard);
        assert_eq!(
            encode(&stage),
            doc! { "$merge": {
                "into": { "db": "reporting", "coll": "budgets" },
                "on": ["dept", "fiscal_year"],
                "whenMatched": "keepExisting",
                "whenNotMatched": "discard",
            } }
        );
    }

    #[test]
    fn test_merge_with_pipeline() {
        let stage = Merge::into_collection("totals")
            .on("_id")
            .let_var("new_qty", field("qty"))
            .when_matched(WhenMatched::Pipeline(
                AggregationPipeline::new()
                    .stage(Set::new().field("qty", add(vec![field("qty"), field("$$new_qty")]))),
            ))
            .when_not_matched(WhenNotMatched::Insert);
        assert_eq!(
            encode(&stage),
            doc! { "$merge": {
                "into": "totals",
                "on": "_id",
                "let": { "new_qty": "$qty" },
                "whenMatched": [
                    { "$set": { "qty": { "$add": ["$qty", "$$new_qty"] } } },
                ],
                "whenNotMatched": "insert",
            } }
        );
    }

    #[test]
    fn test_out() {
        assert_eq!(encode(&Out::to_collection("archive")), doc! { "$out": "archive" });
        assert_eq!(
            encode(&Out::to_database("backup", "archive")),
            doc! { "$out": { "db": "backup", "coll": "archive" } }
        );
    }

    #[test]
    fn test_enum_names() {
        assert_eq!(WhenMatched::Replace.as_str(), Some("replace"));
        assert_eq!(WhenMatched::Fail.as_str(), Some("fail"));
        assert_eq!(WhenMatched::KeepExisting.as_str(), Some("keepExisting"));
        assert_eq!(WhenNotMatched::Fail.as_str(), "fail");
        assert_eq!(
            bson::to_bson(&WhenNotMatched::Discard).unwrap(),
            bson::Bson::String("discard".into())
        );
    }
}
