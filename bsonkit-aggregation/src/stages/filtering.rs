//! Stages that select or count documents.

use bsonkit_codec::{CodecResult, DocumentWriter, EncoderContext};

use super::Stage;
use crate::error::{AggregationError, AggregationResult};
use crate::expression::Expression;
use crate::filters::{Filter, write_filter_document};

/// `$match`: keep documents matching every filter.
#[derive(Debug, Clone, Default)]
pub struct Match {
    filters: Vec<Filter>,
}

impl Match {
    /// Create a stage matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stage from `filters`.
    pub fn filters(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Add a condition.
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filters.push(filter.into());
        self
    }
}

impl Stage for Match {
    fn stage_name(&self) -> &'static str {
        "$match"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        write_filter_document(writer, &self.filters, ctx)
    }
}

/// `$limit`.
#[derive(Debug, Clone, Copy)]
pub struct Limit {
    limit: i64,
}

impl Limit {
    /// Pass at most `limit` documents. `limit` must be positive.
    pub fn new(limit: i64) -> AggregationResult<Self> {
        if limit <= 0 {
            return Err(AggregationError::invalid_stage(
                "$limit",
                format!("limit must be positive, got {}", limit),
            ));
        }
        Ok(Self { limit })
    }

    /// The limit.
    pub fn value(&self) -> i64 {
        self.limit
    }
}

impl Stage for Limit {
    fn stage_name(&self) -> &'static str {
        "$limit"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_int64(self.limit)
    }
}

/// `$skip`.
#[derive(Debug, Clone, Copy)]
pub struct Skip {
    skip: i64,
}

impl Skip {
    /// Skip the first `skip` documents. `skip` must fit in an `i64`.
    pub fn new(skip: u64) -> AggregationResult<Self> {
        let skip = i64::try_from(skip).map_err(|_| {
            AggregationError::invalid_stage("$skip", format!("{skip} exceeds the int64 range"))
        })?;
        Ok(Self { skip })
    }

    /// The number of skipped documents.
    pub fn value(&self) -> u64 {
        self.skip.unsigned_abs()
    }
}

impl Stage for Skip {
    fn stage_name(&self) -> &'static str {
        "$skip"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_int64(self.skip)
    }
}

/// `$sample`: pick `size` random documents.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    size: i64,
}

impl Sample {
    /// `size` must be positive.
    pub fn new(size: i64) -> AggregationResult<Self> {
        if size <= 0 {
            return Err(AggregationError::invalid_stage(
                "$sample",
                format!("size must be positive, got {}", size),
            ));
        }
        Ok(Self { size })
    }
}

impl Stage for Sample {
    fn stage_name(&self) -> &'static str {
        "$sample"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_document(|w| w.write_int64_named("size", self.size))
    }
}

/// `$count`: replace the input with `{ <field>: <count> }`.
#[derive(Debug, Clone)]
pub struct Count {
    field: String,
}

impl Count {
    /// Count into `field`, which must be non-empty, must not start with `$`
    /// and must not contain `.`.
    pub fn new(field: impl Into<String>) -> AggregationResult<Self> {
        let field = field.into();
        if field.is_empty() || field.starts_with('$') || field.contains('.') {
            return Err(AggregationError::invalid_stage(
                "$count",
                format!("'{}' is not a valid output field", field),
            ));
        }
        Ok(Self { field })
    }
}

impl Stage for Count {
    fn stage_name(&self) -> &'static str {
        "$count"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_string(&self.field)
    }
}

/// `$redact`: prune content by evaluating an expression per level.
///
/// The expression should resolve to `$$DESCEND`, `$$PRUNE` or `$$KEEP`.
#[derive(Debug, Clone)]
pub struct Redact {
    expression: Expression,
}

impl Redact {
    /// Create the stage.
    pub fn new(expression: Expression) -> Self {
        Self { expression }
    }
}

impl Stage for Redact {
    fn stage_name(&self) -> &'static str {
        "$redact"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>) -> CodecResult<()> {
        ctx.encode_child(writer, &self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation_registry;
    use crate::expression::{field, value};
    use crate::filters;
    use crate::operators::conditional::cond;
    use crate::operators::comparison::eq;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn encode<S: Stage>(stage: &S) -> bson::Document {
        aggregation_registry().encode_to_document(stage).unwrap()
    }

    #[test]
    fn test_match() {
        let stage = Match::new()
            .filter(filters::eq("status", "active"))
            .filter(filters::text("coffee"));
        assert_eq!(
            encode(&stage),
            doc! { "$match": {
                "status": { "$eq": "active" },
                "$text": { "$search": "coffee" },
            } }
        );
        assert_eq!(encode(&Match::new()), doc! { "$match": {} });
    }

    #[test]
    fn test_limit_skip_sample() {
        assert_eq!(encode(&Limit::new(10).unwrap()), doc! { "$limit": 10i64 });
        assert_eq!(encode(&Skip::new(20).unwrap()), doc! { "$skip": 20i64 });
        assert_eq!(
            encode(&Sample::new(3).unwrap()),
            doc! { "$sample": { "size": 3i64 } }
        );
        assert!(Limit::new(0).is_err());
        assert!(Sample::new(-1).is_err());
    }

    #[test]
    fn test_skip_out_of_range() {
        let err = Skip::new(u64::MAX).unwrap_err();
        assert!(matches!(err, AggregationError::InvalidStage { stage: "$skip", .. }));
        assert!(Skip::new(i64::MAX as u64 + 1).is_err());
        assert_eq!(Skip::new(i64::MAX as u64).unwrap().value(), i64::MAX as u64);
    }

    #[test]
    fn test_count() {
        assert_eq!(encode(&Count::new("passing").unwrap()), doc! { "$count": "passing" });
        for invalid in ["", "$total", "a.b"] {
            let err = Count::new(invalid).unwrap_err();
            assert!(matches!(err, AggregationError::InvalidStage { stage: "$count", .. }));
        }
    }

    #[test]
    fn test_redact() {
        let stage = Redact::new(cond(
            eq(field("level"), value(5)),
            value("$$PRUNE"),
            value("$$DESCEND"),
        ));
        assert_eq!(
            encode(&stage),
            doc! { "$redact": { "$cond": {
                "if": { "$eq": ["$level", 5] },
                "then": "$$PRUNE",
                "else": "$$DESCEND",
            } } }
        );
    }
}
