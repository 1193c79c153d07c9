//! Stages that reshape documents.

use bsonkit_codec::{CodecResult, DocumentWriter, EncoderContext};
use indexmap::IndexMap;

use super::Stage;
use crate::error::{AggregationError, AggregationResult};
use crate::expression::{Expression, field_path, value};

const ID_FIELD: &str = "_id";

fn write_fields(
    writer: &mut DocumentWriter,
    fields: &IndexMap<String, Expression>,
    ctx: &EncoderContext<'_>,
) -> CodecResult<()> {
    writer.write_document(|w| {
        for (name, expression) in fields {
            w.write_name(name)?;
            ctx.encode_child(w, expression)?;
        }
        Ok(())
    })
}

/// `$project`, also used as the projection of a find query.
///
/// Inclusions and exclusions cannot be mixed, except that `_id` may be
/// excluded from an inclusion projection.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    includes: IndexMap<String, Expression>,
    excludes: IndexMap<String, Expression>,
    suppress_id: bool,
}

impl Projection {
    /// Create an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include `name`.
    pub fn include(self, name: impl Into<String>) -> AggregationResult<Self> {
        self.include_expression(name, value(true))
    }

    /// Set `name` to the result of `expression`.
    ///
    /// Including `_id` undoes an earlier exclusion of `_id`.
    pub fn include_expression(
        mut self,
        name: impl Into<String>,
        expression: Expression,
    ) -> AggregationResult<Self> {
        let name = name.into();
        if let Some(excluded) = self.excludes.keys().next() {
            return Err(AggregationError::MixedProjection {
                field: excluded.clone(),
            });
        }
        if name == ID_FIELD {
            self.suppress_id = false;
        }
        self.includes.insert(name, expression);
        Ok(self)
    }

    /// Exclude `name`.
    ///
    /// Excluding `_id` undoes an earlier inclusion of `_id`.
    pub fn exclude(mut self, name: impl Into<String>) -> AggregationResult<Self> {
        let name = name.into();
        if name == ID_FIELD {
            return Ok(self.suppress_id());
        }
        if !self.includes.is_empty() {
            return Err(AggregationError::MixedProjection { field: name });
        }
        self.excludes.insert(name, value(false));
        Ok(self)
    }

    /// Exclude `_id`, which is always legal. The last call touching `_id` wins.
    pub fn suppress_id(mut self) -> Self {
        self.includes.shift_remove(ID_FIELD);
        self.suppress_id = true;
        self
    }

    /// Whether nothing is projected.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty() && !self.suppress_id
    }

    /// Write the projection document.
    pub(crate) fn write_document(
        &self,
        writer: &mut DocumentWriter,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        writer.write_document(|w| {
            for (name, expression) in self.includes.iter().chain(&self.excludes) {
                w.write_name(name)?;
                ctx.encode_child(w, expression)?;
            }
            if self.suppress_id {
                w.write_name(ID_FIELD)?;
                ctx.encode_child(w, &value(false))?;
            }
            Ok(())
        })
    }
}

impl Stage for Projection {
    fn stage_name(&self) -> &'static str {
        "$project"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        self.write_document(writer, ctx)
    }
}

macro_rules! field_stage {
    ($(#[$doc:meta])* $stage:ident, $operator:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $stage {
            fields: IndexMap<String, Expression>,
        }

        impl $stage {
            /// Create an empty stage.
            pub fn new() -> Self {
                Self::default()
            }

            /// Set `name` to the result of `expression`.
            pub fn field(mut self, name: impl Into<String>, expression: Expression) -> Self {
                self.fields.insert(name.into(), expression);
                self
            }
        }

        impl Stage for $stage {
            fn stage_name(&self) -> &'static str {
                $operator
            }

            fn encode_body(
                &self,
                writer: &mut DocumentWriter,
                ctx: &EncoderContext<'_>,
            ) -> CodecResult<()> {
                write_fields(writer, &self.fields, ctx)
            }
        }
    };
}

field_stage!(
    /// `$addFields`.
    AddFields,
    "$addFields"
);

field_stage!(
    /// `$set`, an alias of `$addFields`.
    Set,
    "$set"
);

/// `$unset`: remove fields.
#[derive(Debug, Clone)]
pub struct Unset {
    fields: Vec<String>,
}

impl Unset {
    /// Remove `field`.
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
        }
    }

    /// Remove every one of `fields`.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Also remove `field`.
    pub fn and(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }
}

impl Stage for Unset {
    fn stage_name(&self) -> &'static str {
        "$unset"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        match self.fields.as_slice() {
            [single] => writer.write_string(single),
            fields => writer.write_array(|w| {
                for field in fields {
                    w.write_string(field)?;
                }
                Ok(())
            }),
        }
    }
}

/// The new root of a replacement stage: one expression, or fields added one
/// by one. The two modes are exclusive.
#[derive(Debug, Clone, Default)]
enum Replacement {
    #[default]
    Unset,
    Expression(Expression),
    Fields(IndexMap<String, Expression>),
}

impl Replacement {
    fn set_expression(&mut self, stage: &'static str, expression: Expression) -> AggregationResult<()> {
        if let Self::Fields(_) = self {
            return Err(AggregationError::MixedModes { stage });
        }
        *self = Self::Expression(expression);
        Ok(())
    }

    fn add_field(
        &mut self,
        stage: &'static str,
        name: String,
        expression: Expression,
    ) -> AggregationResult<()> {
        match self {
            Self::Expression(_) => Err(AggregationError::MixedModes { stage }),
            Self::Fields(fields) => {
                fields.insert(name, expression);
                Ok(())
            }
            Self::Unset => {
                let mut fields = IndexMap::new();
                fields.insert(name, expression);
                *self = Self::Fields(fields);
                Ok(())
            }
        }
    }

    fn encode(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        match self {
            Self::Unset => writer.write_document(|_| Ok(())),
            Self::Expression(expression) => ctx.encode_child(writer, expression),
            Self::Fields(fields) => write_fields(writer, fields, ctx),
        }
    }
}

/// `$replaceRoot`: promote a document to the top level.
#[derive(Debug, Clone, Default)]
pub struct ReplaceRoot {
    new_root: Replacement,
}

impl ReplaceRoot {
    /// Create a stage with no replacement yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the root with the document `expression` evaluates to.
    pub fn with(expression: Expression) -> Self {
        Self {
            new_root: Replacement::Expression(expression),
        }
    }

    /// Replace the root with a field path, e.g. `"name"` for `"$name"`.
    pub fn with_path(path: &str) -> Self {
        Self::with(Expression::Field(field_path(path)))
    }

    /// Set the replacement expression. Fails if fields were added.
    pub fn expression(mut self, expression: Expression) -> AggregationResult<Self> {
        self.new_root.set_expression("$replaceRoot", expression)?;
        Ok(self)
    }

    /// Add a field to the new root. Fails if an expression was set.
    pub fn field(mut self, name: impl Into<String>, expression: Expression) -> AggregationResult<Self> {
        self.new_root.add_field("$replaceRoot", name.into(), expression)?;
        Ok(self)
    }
}

impl Stage for ReplaceRoot {
    fn stage_name(&self) -> &'static str {
        "$replaceRoot"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_document(|w| {
            w.write_name("newRoot")?;
            self.new_root.encode(w, ctx)
        })
    }
}

/// `$replaceWith`, the short form of `$replaceRoot`.
#[derive(Debug, Clone, Default)]
pub struct ReplaceWith {
    replacement: Replacement,
}

impl ReplaceWith {
    /// Create a stage with no replacement yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the root with the document `expression` evaluates to.
    pub fn with(expression: Expression) -> Self {
        Self {
            replacement: Replacement::Expression(expression),
        }
    }

    /// Set the replacement expression. Fails if fields were added.
    pub fn expression(mut self, expression: Expression) -> AggregationResult<Self> {
        self.replacement.set_expression("$replaceWith", expression)?;
        Ok(self)
    }

    /// Add a field to the new root. Fails if an expression was set.
    pub fn field(mut self, name: impl Into<String>, expression: Expression) -> AggregationResult<Self> {
        self.replacement.add_field("$replaceWith", name.into(), expression)?;
        Ok(self)
    }
}

impl Stage for ReplaceWith {
    fn stage_name(&self) -> &'static str {
        "$replaceWith"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        self.replacement.encode(writer, ctx)
    }
}

/// `$unwind`: one output document per array element.
#[derive(Debug, Clone)]
pub struct Unwind {
    path: String,
    include_array_index: Option<String>,
    preserve_null_and_empty_arrays: Option<bool>,
}

impl Unwind {
    /// Unwind the array at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            include_array_index: None,
            preserve_null_and_empty_arrays: None,
        }
    }

    /// Store the element index in `field`.
    pub fn include_array_index(mut self, field: impl Into<String>) -> Self {
        self.include_array_index = Some(field.into());
        self
    }

    /// Keep documents whose array is missing, null or empty.
    pub fn preserve_null_and_empty_arrays(mut self, preserve: bool) -> Self {
        self.preserve_null_and_empty_arrays = Some(preserve);
        self
    }
}

impl Stage for Unwind {
    fn stage_name(&self) -> &'static str {
        "$unwind"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        let path = field_path(&self.path);
        if self.include_array_index.is_none() && self.preserve_null_and_empty_arrays.is_none() {
            return writer.write_string(&path);
        }
        writer.write_document(|w| {
            w.write_string_named("path", &path)?;
            if let Some(ref index) = self.include_array_index {
                w.write_string_named("includeArrayIndex", index)?;
            }
            if let Some(preserve) = self.preserve_null_and_empty_arrays {
                w.write_boolean_named("preserveNullAndEmptyArrays", preserve)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation_registry;
    use crate::expression::field;
    use crate::operators::string::{concat, to_upper};
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn encode<S: Stage>(stage: &S) -> bson::Document {
        aggregation_registry().encode_to_document(stage).unwrap()
    }

    #[test]
    fn test_projection_include_then_exclude_fails() {
        let err = Projection::new()
            .include("a")
            .unwrap()
            .exclude("b")
            .unwrap_err();
        assert_eq!(
            err,
            AggregationError::MixedProjection {
                field: "b".to_string()
            }
        );
    }

    #[test]
    fn test_projection_exclude_then_include_fails() {
        let err = Projection::new()
            .exclude("b")
            .unwrap()
            .include("a")
            .unwrap_err();
        assert!(err.is_mixed_projection());
    }

    #[test]
    fn test_projection_id_exclusion_is_allowed() {
        let projection = Projection::new()
            .include("a")
            .unwrap()
            .exclude("_id")
            .unwrap()
            .include("b")
            .unwrap();
        assert_eq!(
            encode(&projection),
            doc! { "$project": { "a": true, "b": true, "_id": false } }
        );
    }

    #[test]
    fn test_projection_expressions_and_suppress_id() {
        let projection = Projection::new()
            .include_expression("upper", to_upper(field("name")))
            .unwrap()
            .suppress_id();
        assert_eq!(
            encode(&projection),
            doc! { "$project": { "upper": { "$toUpper": "$name" }, "_id": false } }
        );

        let exclusion = Projection::new()
            .exclude("secret")
            .unwrap()
            .exclude("_id")
            .unwrap()
            .suppress_id();
        assert_eq!(
            encode(&exclusion),
            doc! { "$project": { "secret": false, "_id": false } }
        );
        assert!(Projection::new().is_empty());
    }

    #[test]
    fn test_projection_last_id_call_wins() {
        let projection = Projection::new()
            .include("_id")
            .unwrap()
            .include("a")
            .unwrap()
            .suppress_id();
        assert_eq!(
            encode(&projection),
            doc! { "$project": { "a": true, "_id": false } }
        );

        let projection = Projection::new()
            .suppress_id()
            .include("_id")
            .unwrap()
            .include("a")
            .unwrap();
        assert_eq!(
            encode(&projection),
            doc! { "$project": { "_id": true, "a": true } }
        );

        let projection = Projection::new().include("_id").unwrap().exclude("_id").unwrap();
        assert_eq!(encode(&projection), doc! { "$project": { "_id": false } });
    }

    #[test]
    fn test_add_fields_and_set() {
        let stage = AddFields::new().field("full", concat(vec![field("first"), field("last")]));
        assert_eq!(
            encode(&stage),
            doc! { "$addFields": { "full": { "$concat": ["$first", "$last"] } } }
        );
        let stage = Set::new().field("flag", value(true));
        assert_eq!(encode(&stage), doc! { "$set": { "flag": true } });
    }

    #[test]
    fn test_unset() {
        assert_eq!(encode(&Unset::field("a")), doc! { "$unset": "a" });
        assert_eq!(
            encode(&Unset::fields(["a", "b"]).and("c")),
            doc! { "$unset": ["a", "b", "c"] }
        );
    }

    #[test]
    fn test_replace_root_modes() {
        assert_eq!(
            encode(&ReplaceRoot::with_path("address")),
            doc! { "$replaceRoot": { "newRoot": "$address" } }
        );

        let stage = ReplaceRoot::new()
            .field("name", field("name"))
            .unwrap()
            .field("city", field("address.city"))
            .unwrap();
        assert_eq!(
            encode(&stage),
            doc! { "$replaceRoot": { "newRoot": { "name": "$name", "city": "$address.city" } } }
        );

        let err = ReplaceRoot::with(field("doc"))
            .field("x", value(1))
            .unwrap_err();
        assert_eq!(err, AggregationError::MixedModes { stage: "$replaceRoot" });

        let err = ReplaceRoot::new()
            .field("x", value(1))
            .unwrap()
            .expression(field("doc"))
            .unwrap_err();
        assert!(err.is_mixed_modes());
    }

    #[test]
    fn test_replace_with() {
        assert_eq!(
            encode(&ReplaceWith::with(field("inner"))),
            doc! { "$replaceWith": "$inner" }
        );
        assert_eq!(
            encode(&ReplaceWith::new().field("a", value(1)).unwrap()),
            doc! { "$replaceWith": { "a": 1 } }
        );
        let err = ReplaceWith::new()
            .field("a", value(1))
            .unwrap()
            .expression(field("x"))
            .unwrap_err();
        assert_eq!(err, AggregationError::MixedModes { stage: "$replaceWith" });
    }

    #[test]
    fn test_unwind() {
        assert_eq!(encode(&Unwind::new("sizes")), doc! { "$unwind": "$sizes" });
        assert_eq!(
            encode(&Unwind::new("$sizes").include_array_index("idx").preserve_null_and_empty_arrays(true)),
            doc! { "$unwind": {
                "path": "$sizes",
                "includeArrayIndex": "idx",
                "preserveNullAndEmptyArrays": true,
            } }
        );
    }
}
