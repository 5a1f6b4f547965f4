//! Test support for richdoc: the basic-schema fixture, tag-aware document
//! builders, transform assertions, and a naive mapping oracle for
//! differential testing.

mod builder;
pub mod oracle;

pub use builder::{
    Built, DATA_IMAGE, Tagged, attrs, block, br, build_doc, hr, img, img2, mark,
};
pub use serde_json::json;

use richdoc::{Assoc, Mappable, Schema, SchemaSpec, Step, Transform};
use std::sync::OnceLock;

/// The basic schema shared by every builder.
pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| Schema::new(SchemaSpec::basic()).expect("basic schema compiles"))
}

/// Check a finished transform against the expected document:
///
/// - the current document equals `expect` and is valid for its schema
/// - undoing every step with its inverse restores the starting document
/// - every step survives a JSON round trip
/// - every tag in `expect` is where the same tag in `input` maps to
pub fn assert_transform(tr: &Transform, input: &Tagged, expect: &Tagged) {
    assert_eq!(tr.doc(), &expect.node, "transformed document");
    if let Err(err) = tr.doc().check() {
        panic!("transformed document {} is invalid: {err}", tr.doc());
    }
    assert_eq!(tr.before(), &input.node, "starting document");

    let mut doc = tr.doc().clone();
    for (step, before) in tr.steps().iter().zip(tr.docs()).rev() {
        let inverted = step
            .invert(before)
            .unwrap_or_else(|err| panic!("inverting {step:?}: {err}"));
        doc = inverted
            .apply(&doc)
            .unwrap_or_else(|err| panic!("applying inverse of {step:?}: {err}"));
    }
    assert_eq!(&doc, tr.before(), "inverted document");

    for step in tr.steps() {
        let value = step
            .to_json()
            .unwrap_or_else(|err| panic!("serializing {step:?}: {err}"));
        let parsed = Step::from_json(schema(), &value)
            .unwrap_or_else(|err| panic!("parsing {value}: {err}"));
        assert_eq!(&parsed, step, "JSON round trip of {value}");
    }

    for (name, &expected) in &expect.tags {
        let original = input.tag(name);
        assert_eq!(
            tr.mapping().map(original, Assoc::After),
            expected,
            "mapped position of <{name}>"
        );
    }
}
