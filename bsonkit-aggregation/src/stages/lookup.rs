//! The `$lookup` join stage.

use bsonkit_codec::{CodecResult, DocumentWriter, EncoderContext};
use indexmap::IndexMap;

use super::{Stage, write_stages};
use crate::expression::Expression;
use crate::pipeline::AggregationPipeline;

/// `$lookup`: a left outer join with another collection.
///
/// Supports the equality form (`localField`/`foreignField`), the pipeline
/// form (`let`/`pipeline`) and both combined.
#[derive(Debug, Clone)]
pub struct Lookup {
    from: String,
    local_field: Option<String>,
    foreign_field: Option<String>,
    variables: IndexMap<String, Expression>,
    pipeline: Option<AggregationPipeline>,
    as_field: Option<String>,
}

impl Lookup {
    /// Join with the collection `from`.
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            local_field: None,
            foreign_field: None,
            variables: IndexMap::new(),
            pipeline: None,
            as_field: None,
        }
    }

    /// The field of the input documents to match.
    pub fn local_field(mut self, field: impl Into<String>) -> Self {
        self.local_field = Some(field.into());
        self
    }

    /// The field of the joined documents to match.
    pub fn foreign_field(mut self, field: impl Into<String>) -> Self {
        self.foreign_field = Some(field.into());
        self
    }

    /// Define a variable usable in the sub-pipeline as `$$name`.
    pub fn let_var(mut self, name: impl Into<String>, expression: Expression) -> Self {
        self.variables.insert(name.into(), expression);
        self
    }

    /// Run `pipeline` on the joined collection.
    pub fn pipeline(mut self, pipeline: AggregationPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// The output array field.
    pub fn as_field(mut self, field: impl Into<String>) -> Self {
        self.as_field = Some(field.into());
        self
    }
}

impl Stage for Lookup {
    fn stage_name(&self) -> &'static str {
        "$lookup"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_document(|w| {
            w.write_string_named("from", &self.from)?;
            if let Some(ref local) = self.local_field {
                w.write_string_named("localField", local)?;
            }
            if let Some(ref foreign) = self.foreign_field {
                w.write_string_named("foreignField", foreign)?;
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
            if let Some(ref pipeline) = self.pipeline {
                w.write_name("pipeline")?;
                write_stages(w, pipeline.stages(), ctx)?;
            }
            if let Some(ref as_field) = self.as_field {
                w.write_string_named("as", as_field)?;
            }
            Ok(())
        })
    }
}
