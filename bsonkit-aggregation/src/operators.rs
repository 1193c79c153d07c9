//! Operator constructors, grouped by family.

use crate::expression::Expression;

/// Comparison operators.
pub mod comparison {
    use super::Expression;

    /// `$cmp`: -1, 0 or 1.
    pub fn cmp(first: Expression, second: Expression) -> Expression {
        Expression::list("$cmp", vec![first, second])
    }

    /// `$eq`.
    pub fn eq(first: Expression, second: Expression) -> Expression {
        Expression::list("$eq", vec![first, second])
    }

    /// `$gt`.
    pub fn gt(first: Expression, second: Expression) -> Expression {
        Expression::list("$gt", vec![first, second])
    }

    /// `$gte`.
    pub fn gte(first: Expression, second: Expression) -> Expression {
        Expression::list("$gte", vec![first, second])
    }

    /// `$lt`.
    pub fn lt(first: Expression, second: Expression) -> Expression {
        Expression::list("$lt", vec![first, second])
    }

    /// `$lte`.
    pub fn lte(first: Expression, second: Expression) -> Expression {
        Expression::list("$lte", vec![first, second])
    }

    /// `$ne`.
    pub fn ne(first: Expression, second: Expression) -> Expression {
        Expression::list("$ne", vec![first, second])
    }
}

/// Boolean operators.
pub mod boolean {
    use super::Expression;

    /// `$and`.
    pub fn and(expressions: Vec<Expression>) -> Expression {
        Expression::list("$and", expressions)
    }

    /// `$or`.
    pub fn or(expressions: Vec<Expression>) -> Expression {
        Expression::list("$or", expressions)
    }

    /// `$not`. The server expects its argument wrapped in an array.
    pub fn not(expression: Expression) -> Expression {
        Expression::list("$not", vec![expression])
    }
}

/// String operators.
pub mod string {
    use super::Expression;
    use crate::expression::value;

    /// `$concat`.
    pub fn concat(parts: Vec<Expression>) -> Expression {
        Expression::list("$concat", parts)
    }

    /// `$toLower`.
    pub fn to_lower(input: Expression) -> Expression {
        Expression::single("$toLower", input)
    }

    /// `$toUpper`.
    pub fn to_upper(input: Expression) -> Expression {
        Expression::single("$toUpper", input)
    }

    /// `$substrCP`: `length` code points starting at code point `start`.
    pub fn substr(input: Expression, start: i32, length: i32) -> Expression {
        Expression::list("$substrCP", vec![input, value(start), value(length)])
    }

    /// `$split`.
    pub fn split(input: Expression, delimiter: Expression) -> Expression {
        Expression::list("$split", vec![input, delimiter])
    }

    /// `$strcasecmp`.
    pub fn strcasecmp(first: Expression, second: Expression) -> Expression {
        Expression::list("$strcasecmp", vec![first, second])
    }

    /// `$trim`, removing whitespace or the characters in `chars`.
    pub fn trim(input: Expression, chars: Option<Expression>) -> Expression {
        trim_operator("$trim", input, chars)
    }

    /// `$ltrim`.
    pub fn ltrim(input: Expression, chars: Option<Expression>) -> Expression {
        trim_operator("$ltrim", input, chars)
    }

    /// `$rtrim`.
    pub fn rtrim(input: Expression, chars: Option<Expression>) -> Expression {
        trim_operator("$rtrim", input, chars)
    }

    fn trim_operator(name: &str, input: Expression, chars: Option<Expression>) -> Expression {
        Expression::named(name, [("input", Some(input)), ("chars", chars)])
    }

    /// `$strLenCP`.
    pub fn str_len_cp(input: Expression) -> Expression {
        Expression::single("$strLenCP", input)
    }

    /// `$toString`.
    pub fn to_string(input: Expression) -> Expression {
        Expression::single("$toString", input)
    }

    /// `$replaceOne`.
    pub fn replace_one(input: Expression, find: Expression, replacement: Expression) -> Expression {
        replace_operator("$replaceOne", input, find, replacement)
    }

    /// `$replaceAll`.
    pub fn replace_all(input: Expression, find: Expression, replacement: Expression) -> Expression {
        replace_operator("$replaceAll", input, find, replacement)
    }

    fn replace_operator(
        name: &str,
        input: Expression,
        find: Expression,
        replacement: Expression,
    ) -> Expression {
        Expression::named(
            name,
            [
                ("input", Some(input)),
                ("find", Some(find)),
                ("replacement", Some(replacement)),
            ],
        )
    }

    /// `$regexMatch`.
    pub fn regex_match(input: Expression, regex: &str, options: Option<&str>) -> Expression {
        Expression::named(
            "$regexMatch",
            [
                ("input", Some(input)),
                ("regex", Some(value(regex.to_string()))),
                ("options", options.map(|o| value(o.to_string()))),
            ],
        )
    }
}

/// Arithmetic operators.
pub mod arithmetic {
    use super::Expression;

    /// `$add`.
    pub fn add(operands: Vec<Expression>) -> Expression {
        Expression::list("$add", operands)
    }

    /// `$subtract`.
    pub fn subtract(minuend: Expression, subtrahend: Expression) -> Expression {
        Expression::list("$subtract", vec![minuend, subtrahend])
    }

    /// `$multiply`.
    pub fn multiply(operands: Vec<Expression>) -> Expression {
        Expression::list("$multiply", operands)
    }

    /// `$divide`.
    pub fn divide(dividend: Expression, divisor: Expression) -> Expression {
        Expression::list("$divide", vec![dividend, divisor])
    }

    /// `$abs`.
    pub fn abs(operand: Expression) -> Expression {
        Expression::single("$abs", operand)
    }

    /// `$mod`.
    pub fn modulo(dividend: Expression, divisor: Expression) -> Expression {
        Expression::list("$mod", vec![dividend, divisor])
    }
}

/// Accumulators for `$group`.
pub mod accumulators {
    use super::Expression;

    macro_rules! accumulators {
        ($($(#[$doc:meta])* $func:ident => $operator:literal;)+) => {
            $(
                $(#[$doc])*
                pub fn $func(expression: Expression) -> Expression {
                    Expression::single($operator, expression)
                }
            )+
        };
    }

    accumulators! {
        /// `$sum`.
        sum => "$sum";
        /// `$avg`.
        avg => "$avg";
        /// `$min`.
        min => "$min";
        /// `$max`.
        max => "$max";
        /// `$first`.
        first => "$first";
        /// `$last`.
        last => "$last";
        /// `$push`.
        push => "$push";
        /// `$addToSet`.
        add_to_set => "$addToSet";
        /// `$stdDevPop`.
        std_dev_pop => "$stdDevPop";
        /// `$stdDevSamp`.
        std_dev_samp => "$stdDevSamp";
    }
}

/// Conditional operators.
pub mod conditional {
    use super::Expression;

    /// `$cond` with named branches.
    pub fn cond(condition: Expression, then: Expression, otherwise: Expression) -> Expression {
        Expression::named(
            "$cond",
            [
                ("if", Some(condition)),
                ("then", Some(then)),
                ("else", Some(otherwise)),
            ],
        )
    }

    /// `$ifNull`.
    pub fn if_null(expression: Expression, replacement: Expression) -> Expression {
        Expression::list("$ifNull", vec![expression, replacement])
    }
}

/// Array operators.
pub mod array {
    use super::Expression;

    /// `$size`.
    pub fn size(array: Expression) -> Expression {
        Expression::single("$size", array)
    }

    /// `$arrayElemAt`.
    pub fn array_elem_at(array: Expression, index: Expression) -> Expression {
        Expression::list("$arrayElemAt", vec![array, index])
    }

    /// `$in`: whether `value` is an element of `array`.
    pub fn in_array(value: Expression, array: Expression) -> Expression {
        Expression::list("$in", vec![value, array])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation_registry;
    use crate::expression::{field, value};
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn encode(expression: Expression) -> bson::Document {
        aggregation_registry().encode_to_document(&expression).unwrap()
    }

    #[test]
    fn test_comparison_and_boolean() {
        let expression = boolean::and(vec![
            comparison::gte(field("qty"), value(10)),
            boolean::not(comparison::eq(field("status"), value("D"))),
        ]);
        assert_eq!(
            encode(expression),
            doc! { "$and": [
                { "$gte": ["$qty", 10] },
                { "$not": [{ "$eq": ["$status", "D"] }] },
            ] }
        );
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(
            encode(string::substr(field("code"), 0, 3)),
            doc! { "$substrCP": ["$code", 0, 3] }
        );
        assert_eq!(
            encode(string::trim(field("name"), Some(value(" _")))),
            doc! { "$trim": { "input": "$name", "chars": " _" } }
        );
        assert_eq!(
            encode(string::regex_match(field("email"), "@example", None)),
            doc! { "$regexMatch": { "input": "$email", "regex": "@example" } }
        );
        assert_eq!(
            encode(string::replace_all(field("s"), value("a"), value("b"))),
            doc! { "$replaceAll": { "input": "$s", "find": "a", "replacement": "b" } }
        );
    }

    #[test]
    fn test_arithmetic_and_accumulators() {
        assert_eq!(
            encode(accumulators::sum(arithmetic::multiply(vec![field("price"), field("qty")]))),
            doc! { "$sum": { "$multiply": ["$price", "$qty"] } }
        );
        assert_eq!(
            encode(arithmetic::modulo(field("n"), value(2))),
            doc! { "$mod": ["$n", 2] }
        );
        assert_eq!(encode(accumulators::add_to_set(field("tag"))), doc! { "$addToSet": "$tag" });
    }

    #[test]
    fn test_conditional_and_array() {
        assert_eq!(
            encode(conditional::cond(
                comparison::gt(array::size(field("items")), value(0)),
                value("some"),
                value("none"),
            )),
            doc! { "$cond": {
                "if": { "$gt": [{ "$size": "$items" }, 0] },
                "then": "some",
                "else": "none",
            } }
        );
        assert_eq!(
            encode(array::in_array(value("x"), field("tags"))),
            doc! { "$in": ["x", "$tags"] }
        );
    }
}
