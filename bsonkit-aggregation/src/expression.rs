//! Aggregation expressions.
//!
//! An [`Expression`] is a tree of operators over field paths and typed
//! values. Typed values are kept as [`DynValue`]s and encoded by the codec
//! registered for their runtime type, so any type the registry knows can
//! appear inside an expression.
//!
//! ```rust
//! use bsonkit_aggregation::aggregation_registry;
//! use bsonkit_aggregation::expression::{field, value};
//! use bsonkit_aggregation::operators::arithmetic::add;
//! use bson::doc;
//!
//! let registry = aggregation_registry();
//! let total = add(vec![field("price"), field("tax"), value(2)]);
//! assert_eq!(
//!     registry.encode_to_document(&total).unwrap(),
//!     doc! { "$add": ["$price", "$tax", 2] }
//! );
//! ```

use bsonkit_codec::{CodecResult, DocumentWriter, DynValue, Encoder, EncoderContext};
use indexmap::IndexMap;

/// Operands of an operator expression.
#[derive(Debug, Clone)]
pub enum Operands {
    /// No arguments; encoded as an empty document.
    None,
    /// A single argument, encoded directly.
    Single(Box<Expression>),
    /// Ordered arguments, encoded as an array.
    List(Vec<Expression>),
    /// Named arguments, encoded as a document. Absent optionals are not
    /// inserted.
    Named(IndexMap<String, Expression>),
}

/// An aggregation expression.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A typed value encoded by its runtime type. `None` is written as null.
    Value(Option<Box<dyn DynValue>>),
    /// A field path, written as `"$path"`.
    Field(String),
    /// `{ "$literal": <expression> }`.
    Literal(Box<Expression>),
    /// A document of named sub-expressions.
    Document(IndexMap<String, Expression>),
    /// An array of sub-expressions.
    Array(Vec<Expression>),
    /// `{ name: <operands> }`.
    Operator {
        /// The operator, including its `$`.
        name: String,
        /// The arguments.
        operands: Operands,
    },
    /// `{ "$meta": keyword }`.
    Meta(String),
}

impl Expression {
    /// Build an operator expression.
    pub fn operator(name: impl Into<String>, operands: Operands) -> Self {
        Self::Operator {
            name: name.into(),
            operands,
        }
    }

    /// An operator with a single argument.
    pub fn single(name: impl Into<String>, operand: Expression) -> Self {
        Self::operator(name, Operands::Single(Box::new(operand)))
    }

    /// An operator with ordered arguments.
    pub fn list(name: impl Into<String>, operands: Vec<Expression>) -> Self {
        Self::operator(name, Operands::List(operands))
    }

    /// An operator with named arguments. `None` arguments are left out.
    pub fn named<I, K>(name: impl Into<String>, operands: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<Expression>)>,
        K: Into<String>,
    {
        let operands = operands
            .into_iter()
            .filter_map(|(key, operand)| operand.map(|operand| (key.into(), operand)))
            .collect();
        Self::operator(name, Operands::Named(operands))
    }

    /// The operator name, if this is an operator expression.
    pub fn operator_name(&self) -> Option<&str> {
        match self {
            Self::Operator { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A typed value.
pub fn value<T: DynValue>(value: T) -> Expression {
    Expression::Value(Some(Box::new(value)))
}

/// The null value.
pub fn null() -> Expression {
    Expression::Value(None)
}

/// A field path. A leading `$` is added if missing.
pub fn field(path: impl Into<String>) -> Expression {
    Expression::Field(path.into())
}

/// A value taken literally, without evaluating it as an expression.
pub fn literal(expression: Expression) -> Expression {
    Expression::Literal(Box::new(expression))
}

/// A document of named sub-expressions.
pub fn document<I, K>(fields: I) -> Expression
where
    I: IntoIterator<Item = (K, Expression)>,
    K: Into<String>,
{
    Expression::Document(
        fields
            .into_iter()
            .map(|(name, expression)| (name.into(), expression))
            .collect(),
    )
}

/// An array of sub-expressions.
pub fn array(items: Vec<Expression>) -> Expression {
    Expression::Array(items)
}

/// The text search relevance score, `{ "$meta": "textScore" }`.
pub fn meta_text_score() -> Expression {
    Expression::Meta("textScore".to_string())
}

/// Render a field path with its `$` prefix.
pub fn field_path(path: &str) -> String {
    if path.starts_with('$') {
        path.to_string()
    } else {
        format!("${}", path)
    }
}

/// Codec writing [`Expression`] trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionCodec;

impl ExpressionCodec {
    fn write_operands(
        &self,
        writer: &mut DocumentWriter,
        operands: &Operands,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match operands {
            Operands::None => writer.write_document(|_| Ok(())),
            Operands::Single(operand) => self.encode(writer, operand, ctx),
            Operands::List(items) => writer.write_array(|w| {
                for item in items {
                    self.encode(w, item, ctx)?;
                }
                Ok(())
            }),
            Operands::Named(fields) => self.write_fields(writer, fields, ctx),
        }
    }

    fn write_fields(
        &self,
        writer: &mut DocumentWriter,
        fields: &IndexMap<String, Expression>,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        writer.write_document(|w| {
            for (name, expression) in fields {
                w.write_name(name)?;
                self.encode(w, expression, ctx)?;
            }
            Ok(())
        })
    }
}

impl Encoder<Expression> for ExpressionCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &Expression,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match value {
            Expression::Value(None) => writer.write_null(),
            Expression::Value(Some(inner)) => ctx.encode_dyn(writer, &**inner),
            Expression::Field(path) => writer.write_string(&field_path(path)),
            Expression::Literal(inner) => writer.write_document(|w| {
                w.write_name("$literal")?;
                self.encode(w, inner, ctx)
            }),
            Expression::Document(fields) => self.write_fields(writer, fields, ctx),
            Expression::Array(items) => writer.write_array(|w| {
                for item in items {
                    self.encode(w, item, ctx)?;
                }
                Ok(())
            }),
            Expression::Operator { name, operands } => writer.write_document(|w| {
                w.write_name(name)?;
                self.write_operands(w, operands, ctx)
            }),
            Expression::Meta(keyword) => {
                writer.write_document(|w| w.write_string_named("$meta", keyword))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation_registry;
    use bson::{Bson, doc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_leaves() {
        let registry = aggregation_registry();
        assert_eq!(registry.encode_to_bson(&field("a.b")).unwrap(), Bson::String("$a.b".into()));
        assert_eq!(registry.encode_to_bson(&field("$x")).unwrap(), Bson::String("$x".into()));
        assert_eq!(registry.encode_to_bson(&null()).unwrap(), Bson::Null);
        assert_eq!(registry.encode_to_bson(&value(5i64)).unwrap(), Bson::Int64(5));
        assert_eq!(
            registry.encode_to_bson(&literal(value("$notAField"))).unwrap(),
            Bson::Document(doc! { "$literal": "$notAField" })
        );
    }

    #[test]
    fn test_operand_shapes() {
        let registry = aggregation_registry();

        let none = Expression::operator("$rand", Operands::None);
        assert_eq!(registry.encode_to_document(&none).unwrap(), doc! { "$rand": {} });

        let single = Expression::single("$toUpper", field("name"));
        assert_eq!(
            registry.encode_to_document(&single).unwrap(),
            doc! { "$toUpper": "$name" }
        );

        let named = Expression::named(
            "$trim",
            [("input", Some(field("name"))), ("chars", None)],
        );
        assert_eq!(
            registry.encode_to_document(&named).unwrap(),
            doc! { "$trim": { "input": "$name" } }
        );
    }

    #[test]
    fn test_nested_documents_and_values() {
        let registry = aggregation_registry();
        let expression = document([
            ("total", Expression::list("$add", vec![field("a"), value(1)])),
            ("tags", array(vec![value("x".to_string()), null()])),
            ("score", meta_text_score()),
        ]);

        assert_eq!(
            registry.encode_to_document(&expression).unwrap(),
            doc! {
                "total": { "$add": ["$a", 1] },
                "tags": ["x", null],
                "score": { "$meta": "textScore" },
            }
        );
    }

    #[test]
    fn test_expression_as_value() {
        let registry = aggregation_registry();
        let inner = Expression::single("$abs", field("delta"));
        let wrapped = value(inner);
        assert_eq!(
            registry.encode_to_document(&wrapped).unwrap(),
            doc! { "$abs": "$delta" }
        );
    }

    #[test]
    fn test_unknown_leaf_type_is_lookup_error() {
        #[derive(Debug, Clone)]
        struct Opaque;

        let registry = aggregation_registry();
        let err = registry
            .encode_to_document(&Expression::single("$size", value(Opaque)))
            .unwrap_err();
        assert!(err.is_lookup_error());
    }

    #[test]
    fn test_operator_name() {
        assert_eq!(Expression::single("$abs", field("x")).operator_name(), Some("$abs"));
        assert_eq!(field("x").operator_name(), None);
    }
}
