//! Shared test support utilities for integration tests

#![allow(dead_code)]

use datever_core::{
    Change, ChangeSet, Context, Field, Payload, Request, RequestMetadata, Schema,
    VersionIdentifier, VersionedModel,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// The planet schema, with no history of its own
pub fn homeworld_schema() -> Arc<Schema> {
    Schema::builder("HomeworldSerializer")
        .field("name", Field::char())
        .build()
}

/// The person change history
pub fn person_changes() -> ChangeSet {
    ChangeSet::builder()
        .change("2018-08-02", Change::remove_field("hairStyle", Field::char()))
        .change("2018-07-29", Change::rename_field("iColor", "eyeColor"))
        .change(
            "2018-07-27",
            Change::add_field("gender", Field::char()).with_default("male"),
        )
        .build()
        .expect("person change set is well formed")
}

/// The person schema in its latest shape
pub fn person_schema() -> Arc<Schema> {
    Schema::builder("PersonSerializer")
        .field("name", Field::char())
        .field("birthYear", Field::char())
        .field("eyeColor", Field::char())
        .field("gender", Field::char())
        .field("hairColor", Field::char())
        .field("height", Field::integer())
        .field("mass", Field::integer())
        .field("homeworld", Field::nested(homeworld_schema()))
        .changes(person_changes())
        .build()
}

/// The canonical person instance
pub fn chewby() -> Value {
    json!({
        "name": "Chewbacca",
        "birthYear": "200BBY",
        "eyeColor": "blue",
        "gender": "male",
        "hairColor": "brown",
        "height": 228,
        "mass": 112,
        "homeworld": {
            "name": "Kashyyyk"
        }
    })
}

/// Object payload from a JSON literal
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

pub fn version(s: &str) -> VersionIdentifier {
    VersionIdentifier::parse(s).expect("valid version literal")
}

/// A context whose request negotiated `s`
pub fn context_at(s: &str) -> Context {
    let request = Request::new(RequestMetadata::new()).with_version(version(s));
    Context::from_request(request)
}

/// A person model bound to input data and already validated
pub fn validated_person(data: Value, at: &str) -> VersionedModel {
    let mut model = VersionedModel::new(person_schema())
        .with_context(context_at(at))
        .with_data(data);
    model.validate().expect("input data is valid");
    model
}
