//! Integration tests for queries and aggregation pipelines.
//!
//! These tests verify:
//! - Sort documents keep field order
//! - Projection include/exclude exclusivity
//! - Full pipelines encode stage by stage
//! - Representation overrides reach literal values inside the DSL

use bsonkit::aggregation::expression::{field, literal, meta_text_score, value};
use bsonkit::aggregation::operators::{accumulators, arithmetic, comparison, conditional, string};
use bsonkit::aggregation::stages::{
    Facet, Group, Lookup, Merge, Projection, ReplaceRoot, Sort as SortStage, Unset, WhenMatched,
    WhenNotMatched,
};
use bsonkit::aggregation::{AggregationPipeline, Query, Sort, aggregation_registry_with_config, filters};
use bsonkit::codec::{Bson, BsonType, CodecError, MappingConfig, doc};
use bsonkit::{AggregationError, aggregation_registry};
use pretty_assertions::assert_eq;

#[test]
fn test_sort_example() {
    let registry = aggregation_registry();

    let query = Query::new()
        .sort(Sort::ascending("name"))
        .sort(Sort::descending("age"));
    let sort = query.encode(&registry).unwrap().sort.unwrap();
    assert_eq!(sort, doc! { "name": 1, "age": -1 });
    assert_eq!(sort.keys().collect::<Vec<_>>(), vec!["name", "age"]);

    let stage = SortStage::new().ascending("name").descending("age");
    assert_eq!(
        registry.encode_to_document(&stage).unwrap(),
        doc! { "$sort": { "name": 1, "age": -1 } }
    );
}

#[test]
fn test_projection_exclusivity() {
    let err = Projection::new()
        .include("name")
        .unwrap()
        .exclude("email")
        .unwrap_err();
    assert!(err.is_mixed_projection());

    let err = Projection::new()
        .exclude("email")
        .unwrap()
        .include("name")
        .unwrap_err();
    assert!(err.is_mixed_projection());

    // Excluding `_id` is always allowed.
    let projection = Projection::new()
        .include("name")
        .unwrap()
        .exclude("_id")
        .unwrap();
    assert_eq!(
        aggregation_registry().encode_to_document(&projection).unwrap(),
        doc! { "$project": { "name": true, "_id": false } }
    );

    let codec_error: CodecError = err.into();
    assert!(codec_error.is_configuration_error());
}

#[test]
fn test_match_merges_conditions_per_field() {
    let pipeline = AggregationPipeline::new().match_filters(vec![
        filters::gte("total", 10),
        filters::eq("status", "shipped"),
        filters::lt("total", 500),
        filters::or(vec![filters::eq("region", "eu"), filters::eq("region", "us")]).not(),
    ]);
    assert_eq!(
        pipeline.to_documents(&aggregation_registry()).unwrap(),
        vec![doc! { "$match": {
            "total": { "$gte": 10, "$lt": 500 },
            "status": { "$eq": "shipped" },
            "$nor": [{ "region": { "$eq": "eu" } }, { "region": { "$eq": "us" } }],
        } }]
    );

    let conflicting = AggregationPipeline::new()
        .match_filters(vec![filters::eq("status", "a"), filters::eq("status", "b")]);
    let err = conflicting.to_documents(&aggregation_registry()).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_replace_root_rejects_second_mode() {
    let err = ReplaceRoot::with(field("profile"))
        .field("extra", value(1))
        .unwrap_err();
    assert!(matches!(err, AggregationError::MixedModes { .. }));
}

#[test]
fn test_reporting_pipeline() {
    let pipeline = AggregationPipeline::new()
        .match_filters(vec![
            filters::eq("status", "shipped"),
            filters::in_values("region", vec!["eu", "us"]),
            filters::gte("total", 10).not(),
        ])
        .lookup(
            Lookup::new("customers")
                .local_field("customer_id")
                .foreign_field("_id")
                .as_field("customer"),
        )
        .unwind("customer")
        .group(
            Group::by_fields([("region", field("region")), ("tier", field("customer.tier"))])
                .field("orders", accumulators::sum(value(1)))
                .field("revenue", accumulators::sum(field("total")))
                .field(
                    "big",
                    accumulators::sum(conditional::cond(
                        comparison::gt(field("total"), value(100)),
                        value(1),
                        value(0),
                    )),
                ),
        )
        .add_fields(
            bsonkit::aggregation::stages::AddFields::new()
                .field("avg", arithmetic::divide(field("revenue"), field("orders")))
                .field("label", string::to_upper(field("_id.region"))),
        )
        .stage(Unset::field("big"))
        .sort(SortStage::new().descending("revenue"))
        .limit(10)
        .unwrap()
        .stage(
            Merge::into_database("reports", "regional")
                .on("_id")
                .when_matched(WhenMatched::Replace)
                .when_not_matched(WhenNotMatched::Insert),
        );

    let documents = pipeline.to_documents(&aggregation_registry()).unwrap();
    assert_eq!(
        documents,
        vec![
            doc! { "$match": {
                "status": { "$eq": "shipped" },
                "region": { "$in": ["eu", "us"] },
                "total": { "$not": { "$gte": 10 } },
            } },
            doc! { "$lookup": {
                "from": "customers",
                "localField": "customer_id",
                "foreignField": "_id",
                "as": "customer",
            } },
            doc! { "$unwind": "$customer" },
            doc! { "$group": {
                "_id": { "region": "$region", "tier": "$customer.tier" },
                "orders": { "$sum": 1 },
                "revenue": { "$sum": "$total" },
                "big": { "$sum": { "$cond": {
                    "if": { "$gt": ["$total", 100] },
                    "then": 1,
                    "else": 0,
                } } },
            } },
            doc! { "$addFields": {
                "avg": { "$divide": ["$revenue", "$orders"] },
                "label": { "$toUpper": "$_id.region" },
            } },
            doc! { "$unset": "big" },
            doc! { "$sort": { "revenue": -1 } },
            doc! { "$limit": 10i64 },
            doc! { "$merge": {
                "into": { "db": "reports", "coll": "regional" },
                "on": "_id",
                "whenMatched": "replace",
                "whenNotMatched": "insert",
            } },
        ]
    );
}

#[test]
fn test_text_search_query() {
    let registry = aggregation_registry();
    let query = Query::new()
        .filter(filters::text("coffee shop").language("en"))
        .sort(Sort::text_score("score"))
        .project(
            Projection::new()
                .include_expression("score", meta_text_score())
                .unwrap(),
        );

    let documents = query.encode(&registry).unwrap();
    assert_eq!(
        documents.filter,
        doc! { "$text": { "$search": "coffee shop", "$language": "en" } }
    );
    assert_eq!(documents.sort, Some(doc! { "score": { "$meta": "textScore" } }));
    assert_eq!(
        documents.projection,
        Some(doc! { "score": { "$meta": "textScore" } })
    );
}

#[test]
fn test_facet_with_literal() {
    let facet = Facet::new().field(
        "flagged",
        AggregationPipeline::new().project(
            Projection::new()
                .include_expression("marker", literal(value("$raw")))
                .unwrap(),
        ),
    );
    assert_eq!(
        aggregation_registry().encode_to_document(&facet).unwrap(),
        doc! { "$facet": { "flagged": [
            { "$project": { "marker": { "$literal": "$raw" } } },
        ] } }
    );
}

#[test]
fn test_configured_representation_reaches_literals() {
    let config = MappingConfig::builder()
        .long_representation(BsonType::String)
        .build();
    let registry = aggregation_registry_with_config(&config).unwrap();

    assert_eq!(
        registry
            .encode_to_document(&filters::eq("account", 9_007_199_254_740_993i64))
            .unwrap(),
        doc! { "account": { "$eq": "9007199254740993" } }
    );
    assert_eq!(
        registry.encode_to_bson(&value(7i64)).unwrap(),
        Bson::String("7".into())
    );
}
