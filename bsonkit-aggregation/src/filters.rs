//! Query filters.
//!
//! A [`Filter`] is one condition of a query or `$match` stage. Filters
//! encode themselves as fields of the enclosing filter document:
//! `{ field: { [$not: {] $op: value [}] } }`. Conditions on the same field
//! share one field document. Comparison values are typed and encoded by the
//! codec registered for their runtime type.
//!
//! # Example
//!
//! ```rust
//! use bsonkit_aggregation::filters::{self, Filter};
//! use bsonkit_aggregation::aggregation_registry;
//! use bson::doc;
//!
//! let registry = aggregation_registry();
//! let document = Filter::to_document(
//!     &[
//!         filters::eq("status", "active"),
//!         filters::gte("age", 18),
//!         filters::lt("age", 65),
//!         filters::regex("email", r"@example\.com$").not(),
//!     ],
//!     &registry,
//! )
//! .unwrap();
//!
//! assert_eq!(
//!     document,
//!     doc! {
//!         "status": { "$eq": "active" },
//!         "age": { "$gte": 18, "$lt": 65 },
//!         "email": { "$not": { "$regex": "@example\\.com$" } },
//!     }
//! );
//! ```

use std::collections::HashSet;

use bson::Document;
use bsonkit_codec::{
    BsonType, CodecError, CodecRegistry, CodecResult, DocumentWriter, DynValue, Encoder,
    EncoderContext,
};

use crate::expression::Expression;

/// A GeoJSON point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

impl Point {
    /// Create a point.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Codec writing [`Point`] as `{ type: "Point", coordinates: [lng, lat] }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCodec;

impl Encoder<Point> for PointCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &Point,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        writer.write_document(|w| {
            w.write_string_named("type", "Point")?;
            w.write_array_named("coordinates", |w| {
                w.write_double(value.longitude)?;
                w.write_double(value.latitude)
            })
        })
    }
}

#[derive(Debug, Clone)]
enum Operand {
    Value(Box<dyn DynValue>),
    Values(Vec<Box<dyn DynValue>>),
    Filters(Vec<Filter>),
}

impl Operand {
    fn encode(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        match self {
            Self::Value(value) => ctx.encode_dyn(writer, &**value),
            Self::Values(values) => writer.write_array(|w| {
                for value in values {
                    ctx.encode_dyn(w, &**value)?;
                }
                Ok(())
            }),
            Self::Filters(filters) => write_filter_document(writer, filters, ctx),
        }
    }
}

/// A `$near` or `$nearSphere` condition.
#[derive(Debug, Clone)]
pub struct NearFilter {
    operator: &'static str,
    field: String,
    point: Point,
    max_distance: Option<f64>,
    min_distance: Option<f64>,
}

impl NearFilter {
    /// Only match within `meters` of the point.
    pub fn max_distance(mut self, meters: f64) -> Self {
        self.max_distance = Some(meters);
        self
    }

    /// Only match at least `meters` from the point.
    pub fn min_distance(mut self, meters: f64) -> Self {
        self.min_distance = Some(meters);
        self
    }

    /// Negate the condition.
    pub fn not(self) -> Filter {
        Filter::from(self).not()
    }

    fn encode(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_document_named(self.operator, |w| {
            w.write_name("$geometry")?;
            ctx.encode_child(w, &self.point)?;
            if let Some(max) = self.max_distance {
                w.write_double_named("$maxDistance", max)?;
            }
            if let Some(min) = self.min_distance {
                w.write_double_named("$minDistance", min)?;
            }
            Ok(())
        })
    }
}

/// A `$text` search.
#[derive(Debug, Clone)]
pub struct TextFilter {
    search: String,
    language: Option<String>,
    case_sensitive: Option<bool>,
    diacritic_sensitive: Option<bool>,
}

impl TextFilter {
    /// Set the language that determines stop words and stemming.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Enable or disable case sensitive matching.
    pub fn case_sensitive(mut self, enabled: bool) -> Self {
        self.case_sensitive = Some(enabled);
        self
    }

    /// Enable or disable diacritic sensitive matching.
    pub fn diacritic_sensitive(mut self, enabled: bool) -> Self {
        self.diacritic_sensitive = Some(enabled);
        self
    }

    fn encode(&self, writer: &mut DocumentWriter) -> CodecResult<()> {
        writer.write_document_named("$text", |w| {
            w.write_string_named("$search", &self.search)?;
            if let Some(ref language) = self.language {
                w.write_string_named("$language", language)?;
            }
            if let Some(enabled) = self.case_sensitive {
                w.write_boolean_named("$caseSensitive", enabled)?;
            }
            if let Some(enabled) = self.diacritic_sensitive {
                w.write_boolean_named("$diacriticSensitive", enabled)?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
enum FilterKind {
    Field {
        field: String,
        operator: &'static str,
        operand: Operand,
    },
    Regex {
        field: String,
        pattern: String,
        options: Option<String>,
    },
    Near(NearFilter),
    Text(TextFilter),
    Expr(Expression),
    Logical {
        operator: &'static str,
        filters: Vec<Filter>,
    },
}

/// A query condition.
#[derive(Debug, Clone)]
pub struct Filter {
    kind: FilterKind,
    negated: bool,
}

impl Filter {
    fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            negated: false,
        }
    }

    fn field(field: impl Into<String>, operator: &'static str, operand: Operand) -> Self {
        Self::new(FilterKind::Field {
            field: field.into(),
            operator,
            operand,
        })
    }

    /// Negate this condition.
    ///
    /// Field conditions are wrapped in `$not`. Logical filters are rewritten
    /// to their complement: `$or` becomes `$nor`, `$nor` becomes `$or`, and
    /// `$and` becomes a `$nor` of the combined conditions. `$expr` becomes
    /// `{ $expr: { $not: [expr] } }`. The server cannot negate `$text`, so
    /// encoding a negated text filter fails with a configuration error.
    /// Negating twice restores the original condition.
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Whether the condition is negated.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// The field this condition applies to, if any.
    pub fn field_name(&self) -> Option<&str> {
        match &self.kind {
            FilterKind::Field { field, .. } | FilterKind::Regex { field, .. } => Some(field),
            FilterKind::Near(near) => Some(&near.field),
            FilterKind::Text(_) | FilterKind::Expr(_) | FilterKind::Logical { .. } => None,
        }
    }

    /// The key this condition occupies inside its field's document.
    fn operator_key(&self) -> &'static str {
        if self.negated {
            return "$not";
        }
        match &self.kind {
            FilterKind::Field { operator, .. } => *operator,
            FilterKind::Regex { .. } => "$regex",
            FilterKind::Near(near) => near.operator,
            FilterKind::Text(_) => "$text",
            FilterKind::Expr(_) => "$expr",
            FilterKind::Logical { operator, .. } => *operator,
        }
    }

    /// The key this condition occupies in the filter document.
    fn top_level_key(&self) -> &'static str {
        match (&self.kind, self.negated) {
            (FilterKind::Logical { operator: "$or", .. }, true) => "$nor",
            (FilterKind::Logical { operator: "$nor", .. }, true) => "$or",
            (FilterKind::Logical { .. }, true) => "$nor",
            (FilterKind::Logical { operator, .. }, false) => *operator,
            (FilterKind::Text(_), _) => "$text",
            _ => "$expr",
        }
    }

    /// Write the operators of a field condition into the open field document.
    fn write_operators(
        &self,
        writer: &mut DocumentWriter,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match &self.kind {
            FilterKind::Field {
                operator, operand, ..
            } => self.negatable(writer, |w| {
                w.write_name(operator)?;
                operand.encode(w, ctx)
            }),
            FilterKind::Regex {
                pattern, options, ..
            } => self.negatable(writer, |w| {
                w.write_string_named("$regex", pattern)?;
                if let Some(options) = options {
                    w.write_string_named("$options", options)?;
                }
                Ok(())
            }),
            FilterKind::Near(near) => self.negatable(writer, |w| near.encode(w, ctx)),
            FilterKind::Text(_) | FilterKind::Expr(_) | FilterKind::Logical { .. } => Err(
                CodecError::internal("only field conditions have operators"),
            ),
        }
    }

    /// Write a condition that has no field as one entry of the open document.
    fn write_top_level(
        &self,
        writer: &mut DocumentWriter,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        let key = self.top_level_key();
        match &self.kind {
            FilterKind::Text(_) if self.negated => {
                Err(CodecError::config("$text filters cannot be negated"))
            }
            FilterKind::Text(text) => text.encode(writer),
            FilterKind::Expr(expression) if self.negated => {
                writer.write_document_named(key, |w| {
                    w.write_array_named("$not", |w| ctx.encode_child(w, expression))
                })
            }
            FilterKind::Expr(expression) => {
                writer.write_name(key)?;
                ctx.encode_child(writer, expression)
            }
            FilterKind::Logical {
                operator: "$and",
                filters,
            } if self.negated => writer.write_array_named(key, |w| {
                write_filter_document(w, filters, ctx)
            }),
            FilterKind::Logical { filters, .. } => writer.write_array_named(key, |w| {
                for filter in filters {
                    write_filter_document(w, std::slice::from_ref(filter), ctx)?;
                }
                Ok(())
            }),
            FilterKind::Field { .. } | FilterKind::Regex { .. } | FilterKind::Near(_) => Err(
                CodecError::internal("field conditions are written under their field"),
            ),
        }
    }

    /// Encode `filters` as a single filter document.
    pub fn to_document(filters: &[Filter], registry: &CodecRegistry) -> CodecResult<Document> {
        let mut writer = DocumentWriter::new();
        let ctx = EncoderContext::new(registry);
        write_filter_document(&mut writer, filters, &ctx)?;
        writer.finish()
    }
}

impl From<NearFilter> for Filter {
    fn from(near: NearFilter) -> Self {
        Filter::new(FilterKind::Near(near))
    }
}

impl From<TextFilter> for Filter {
    fn from(text: TextFilter) -> Self {
        Filter::new(FilterKind::Text(text))
    }
}

/// Write `filters` as one document at the writer's position.
///
/// Conditions on the same field are merged into one field document in the
/// order the field first appears. A field that repeats an operator, or two
/// conditions that need the same top-level key, is a configuration error.
pub(crate) fn write_filter_document(
    writer: &mut DocumentWriter,
    filters: &[Filter],
    ctx: &EncoderContext<'_>,
) -> CodecResult<()> {
    writer.write_document(|w| {
        let mut keys = HashSet::new();
        for (index, filter) in filters.iter().enumerate() {
            let Some(field) = filter.field_name() else {
                let key = filter.top_level_key();
                if !keys.insert(key) {
                    return Err(CodecError::config(format!(
                        "filter document repeats the {key} condition"
                    )));
                }
                filter.write_top_level(w, ctx)?;
                continue;
            };
            if !keys.insert(field) {
                continue;
            }
            let mut operators = HashSet::new();
            w.write_document_named(field, |w| {
                for filter in filters[index..]
                    .iter()
                    .filter(|f| f.field_name() == Some(field))
                {
                    let operator = filter.operator_key();
                    if !operators.insert(operator) {
                        return Err(CodecError::config(format!(
                            "filter on '{field}' repeats the {operator} operator"
                        )));
                    }
                    filter.write_operators(w, ctx)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}

/// Codec writing a single [`Filter`] as its own document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCodec;

impl Encoder<Filter> for FilterCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &Filter,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        write_filter_document(writer, std::slice::from_ref(value), ctx)
    }
}

fn boxed<T: DynValue>(value: T) -> Box<dyn DynValue> {
    Box::new(value)
}

fn boxed_all<T, I>(values: I) -> Vec<Box<dyn DynValue>>
where
    T: DynValue,
    I: IntoIterator<Item = T>,
{
    values.into_iter().map(boxed).collect()
}

macro_rules! comparison_filters {
    ($($(#[$doc:meta])* $func:ident => $operator:literal;)+) => {
        $(
            $(#[$doc])*
            pub fn $func<T: DynValue>(field: impl Into<String>, value: T) -> Filter {
                Filter::field(field, $operator, Operand::Value(boxed(value)))
            }
        )+
    };
}

comparison_filters! {
    /// `$eq`.
    eq => "$eq";
    /// `$ne`.
    ne => "$ne";
    /// `$gt`.
    gt => "$gt";
    /// `$gte`.
    gte => "$gte";
    /// `$lt`.
    lt => "$lt";
    /// `$lte`.
    lte => "$lte";
}

/// `$in`: the field equals one of `values`.
pub fn in_values<T, I>(field: impl Into<String>, values: I) -> Filter
where
    T: DynValue,
    I: IntoIterator<Item = T>,
{
    Filter::field(field, "$in", Operand::Values(boxed_all(values)))
}

/// `$nin`: the field equals none of `values`.
pub fn nin<T, I>(field: impl Into<String>, values: I) -> Filter
where
    T: DynValue,
    I: IntoIterator<Item = T>,
{
    Filter::field(field, "$nin", Operand::Values(boxed_all(values)))
}

/// `$exists`.
pub fn exists(field: impl Into<String>, exists: bool) -> Filter {
    Filter::field(field, "$exists", Operand::Value(boxed(exists)))
}

/// `$type`, using the type's alias.
pub fn type_is(field: impl Into<String>, bson_type: BsonType) -> Filter {
    Filter::field(field, "$type", Operand::Value(boxed(bson_type.as_str())))
}

/// `$regex`.
pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Filter {
    Filter::new(FilterKind::Regex {
        field: field.into(),
        pattern: pattern.into(),
        options: None,
    })
}

/// `$regex` with `$options`.
pub fn regex_with_options(
    field: impl Into<String>,
    pattern: impl Into<String>,
    options: impl Into<String>,
) -> Filter {
    Filter::new(FilterKind::Regex {
        field: field.into(),
        pattern: pattern.into(),
        options: Some(options.into()),
    })
}

/// `$text` search.
pub fn text(search: impl Into<String>) -> TextFilter {
    TextFilter {
        search: search.into(),
        language: None,
        case_sensitive: None,
        diacritic_sensitive: None,
    }
}

/// `$expr`: an aggregation expression evaluated per document.
pub fn expr(expression: Expression) -> Filter {
    Filter::new(FilterKind::Expr(expression))
}

/// `$mod`: `field % divisor == remainder`.
pub fn mod_filter(field: impl Into<String>, divisor: i64, remainder: i64) -> Filter {
    Filter::field(
        field,
        "$mod",
        Operand::Values(vec![boxed(divisor), boxed(remainder)]),
    )
}

/// `$all`: the array field contains every one of `values`.
pub fn all<T, I>(field: impl Into<String>, values: I) -> Filter
where
    T: DynValue,
    I: IntoIterator<Item = T>,
{
    Filter::field(field, "$all", Operand::Values(boxed_all(values)))
}

/// `$size`.
pub fn size(field: impl Into<String>, size: i32) -> Filter {
    Filter::field(field, "$size", Operand::Value(boxed(size)))
}

/// `$elemMatch`: some array element matches every one of `filters`.
pub fn elem_match(field: impl Into<String>, filters: Vec<Filter>) -> Filter {
    Filter::field(field, "$elemMatch", Operand::Filters(filters))
}

/// `$near`, planar distance.
pub fn near(field: impl Into<String>, point: Point) -> NearFilter {
    NearFilter {
        operator: "$near",
        field: field.into(),
        point,
        max_distance: None,
        min_distance: None,
    }
}

/// `$nearSphere`, spherical distance.
pub fn near_sphere(field: impl Into<String>, point: Point) -> NearFilter {
    NearFilter {
        operator: "$nearSphere",
        ..near(field, point)
    }
}

/// `$and`.
pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::new(FilterKind::Logical {
        operator: "$and",
        filters,
    })
}

/// `$or`.
pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::new(FilterKind::Logical {
        operator: "$or",
        filters,
    })
}

/// `$nor`.
pub fn nor(filters: Vec<Filter>) -> Filter {
    Filter::new(FilterKind::Logical {
        operator: "$nor",
        filters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation_registry;
    use crate::expression::{field, value};
    use crate::operators::comparison;
    use bson::oid::ObjectId;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn encode(filters: &[Filter]) -> Document {
        Filter::to_document(filters, &aggregation_registry()).unwrap()
    }

    #[test]
    fn test_comparison_filters() {
        let oid = ObjectId::new();
        assert_eq!(
            encode(&[eq("_id", oid), ne("name", "Alice".to_string()), lt("age", 65i64)]),
            doc! {
                "_id": { "$eq": oid },
                "name": { "$ne": "Alice" },
                "age": { "$lt": 65i64 },
            }
        );
    }

    #[test]
    fn test_set_filters() {
        assert_eq!(
            encode(&[
                in_values("status", ["active", "pending"]),
                nin("tier", vec![1, 2]),
                all("tags", ["a", "b"]),
            ]),
            doc! {
                "status": { "$in": ["active", "pending"] },
                "tier": { "$nin": [1, 2] },
                "tags": { "$all": ["a", "b"] },
            }
        );
    }

    #[test]
    fn test_element_and_evaluation_filters() {
        assert_eq!(
            encode(&[
                exists("deleted_at", false),
                type_is("price", BsonType::Decimal128),
                mod_filter("qty", 4, 0),
                regex_with_options("name", "^al", "i"),
            ]),
            doc! {
                "deleted_at": { "$exists": false },
                "price": { "$type": "decimal" },
                "qty": { "$mod": [4i64, 0i64] },
                "name": { "$regex": "^al", "$options": "i" },
            }
        );
    }

    #[test]
    fn test_negation() {
        assert_eq!(
            encode(&[gt("score", 5).not(), size("items", 0).not().not()]),
            doc! {
                "score": { "$not": { "$gt": 5 } },
                "items": { "$size": 0 },
            }
        );
        assert!(gt("score", 5).not().is_negated());
    }

    #[test]
    fn test_conditions_on_one_field_merge() {
        assert_eq!(
            encode(&[
                gte("age", 18),
                eq("status", "A"),
                lte("age", 65),
                regex("name", "^a"),
                in_values("age", [30, 40]).not(),
            ]),
            doc! {
                "age": { "$gte": 18, "$lte": 65, "$not": { "$in": [30, 40] } },
                "status": { "$eq": "A" },
                "name": { "$regex": "^a" },
            }
        );
    }

    #[test]
    fn test_repeated_keys_are_rejected() {
        let registry = aggregation_registry();
        let err = Filter::to_document(&[gt("a", 1), gt("a", 2)], &registry).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("repeats the $gt operator"));

        let err =
            Filter::to_document(&[gt("a", 1).not(), lt("a", 5).not()], &registry).unwrap_err();
        assert!(err.is_configuration_error());

        let err = Filter::to_document(&[expr(value(true)), expr(value(false))], &registry)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_negated_logical_filters() {
        assert_eq!(
            encode(&[or(vec![eq("a", 1), eq("b", 2)]).not()]),
            doc! { "$nor": [{ "a": { "$eq": 1 } }, { "b": { "$eq": 2 } }] }
        );
        assert_eq!(
            encode(&[nor(vec![eq("a", 1)]).not()]),
            doc! { "$or": [{ "a": { "$eq": 1 } }] }
        );
        assert_eq!(
            encode(&[and(vec![gt("qty", 1), lt("qty", 5)]).not()]),
            doc! { "$nor": [{ "qty": { "$gt": 1, "$lt": 5 } }] }
        );
        assert_eq!(
            encode(&[or(vec![eq("a", 1)]).not().not()]),
            doc! { "$or": [{ "a": { "$eq": 1 } }] }
        );
    }

    #[test]
    fn test_negated_expr_and_text() {
        assert_eq!(
            encode(&[expr(comparison::gt(field("spent"), field("budget"))).not()]),
            doc! { "$expr": { "$not": [{ "$gt": ["$spent", "$budget"] }] } }
        );

        let negated_text = Filter::from(text("coffee")).not();
        let err = Filter::to_document(&[negated_text], &aggregation_registry()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_elem_match() {
        assert_eq!(
            encode(&[elem_match(
                "results",
                vec![eq("product", "xyz"), gte("score", 8)]
            )]),
            doc! {
                "results": { "$elemMatch": {
                    "product": { "$eq": "xyz" },
                    "score": { "$gte": 8 },
                } }
            }
        );
    }

    #[test]
    fn test_logical_filters() {
        assert_eq!(
            encode(&[or(vec![eq("status", "A"), and(vec![lt("qty", 30), exists("sale", true)])])]),
            doc! {
                "$or": [
                    { "status": { "$eq": "A" } },
                    { "$and": [
                        { "qty": { "$lt": 30 } },
                        { "sale": { "$exists": true } },
                    ] },
                ]
            }
        );
    }

    #[test]
    fn test_text_and_expr() {
        assert_eq!(
            encode(&[
                text("coffee shop").language("en").case_sensitive(false).into(),
                expr(comparison::gt(field("spent"), field("budget"))),
            ]),
            doc! {
                "$text": { "$search": "coffee shop", "$language": "en", "$caseSensitive": false },
                "$expr": { "$gt": ["$spent", "$budget"] },
            }
        );
        assert_eq!(expr(value(true)).field_name(), None);
    }

    #[test]
    fn test_geo_filters() {
        let point = Point::new(-73.9667, 40.78);
        assert_eq!(
            encode(&[
                near("location", point).max_distance(1000.0).min_distance(10.0).into(),
                near_sphere("origin", point).not(),
            ]),
            doc! {
                "location": { "$near": {
                    "$geometry": { "type": "Point", "coordinates": [-73.9667, 40.78] },
                    "$maxDistance": 1000.0,
                    "$minDistance": 10.0,
                } },
                "origin": { "$not": { "$nearSphere": {
                    "$geometry": { "type": "Point", "coordinates": [-73.9667, 40.78] },
                } } },
            }
        );
    }

    #[test]
    fn test_filter_codec_standalone() {
        let registry = aggregation_registry();
        assert_eq!(
            registry.encode_to_document(&eq("a", 1)).unwrap(),
            doc! { "a": { "$eq": 1 } }
        );
        assert_eq!(eq("a", 1).field_name(), Some("a"));
    }
}
