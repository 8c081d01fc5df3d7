mod common;

use std::{any::Any, sync::Arc};

use common::{Fixture, object};
use dashboard::{
    BoxedField, DashboardError, DynamicResource, EditableField, Field, FieldExt, Panel, ReadOnlyField, RequestKind,
    Resource, ResourceExt,
    fields::{BootContext, FieldCore},
};
use serde_json::{Value, json};

#[test]
fn attributes_derive_from_labels() {
    let cases = [
        ("ID", "id"),
        ("TEST Id", "test_id"),
        (" test   Id ", "test_id"),
        ("1 Test 1", "1_test_1"),
        (" 2 Hello  worlD 2 ", "2_hello_world_2"),
        ("HelloWorld", "helloworld"),
    ];
    for (label, attribute) in cases {
        assert_eq!(EditableField::new(label).core().attribute, attribute, "label {label:?}");
    }
    assert_eq!(EditableField::new("Hello World").attribute("greeting").core().attribute, "greeting");
}

#[test]
fn only_and_except_tolerate_whitespace() {
    let fixture = Fixture::new();
    let users = fixture.registry.resolve("users").unwrap();

    let request = fixture
        .request(RequestKind::Detail, "users")
        .with_query([("only", " name , email ")]);
    assert_eq!(users.resolve_fields(&request).unwrap().attributes(), vec!["name", "email"]);

    let request = fixture
        .request(RequestKind::Detail, "users")
        .with_query([("except", "password,  address ")]);
    assert_eq!(users.resolve_fields(&request).unwrap().attributes(), vec!["id", "name", "email"]);
}

#[test]
fn fields_for_selects_a_named_set() {
    let fixture = Fixture::new();
    let users = fixture.registry.resolve("users").unwrap();

    let request = fixture
        .request(RequestKind::Detail, "users")
        .with_query([("fieldsFor", "compact")]);
    assert_eq!(users.resolve_fields(&request).unwrap().attributes(), vec!["id", "name"]);

    let request = fixture
        .request(RequestKind::Detail, "users")
        .with_query([("fieldsFor", "missing")]);
    assert_eq!(users.resolve_fields(&request).unwrap().fields.len(), 5);
}

#[test]
fn visibility_follows_the_screen() {
    let fixture = Fixture::new();
    let users = fixture.registry.resolve("users").unwrap();

    let index = fixture.request(RequestKind::Index, "users");
    assert!(!users.resolve_fields(&index).unwrap().attributes().contains(&"password"));

    let create = fixture.request(RequestKind::Store, "users");
    assert!(users.resolve_fields(&create).unwrap().attributes().contains(&"password"));
}

#[test]
fn belongs_to_requests_its_eager_load() {
    let fixture = Fixture::new();
    let posts = fixture.registry.resolve("posts").unwrap();
    let request = fixture.request(RequestKind::Detail, "posts");
    assert_eq!(posts.resolve_fields(&request).unwrap().eager_loads, vec!["user".to_string()]);
}

#[test]
fn defaults_resolve_when_the_key_is_absent() {
    let fixture = Fixture::new();
    let request = fixture
        .request(RequestKind::Store, "users")
        .with_payload(object(json!({"name": null})));

    let mut literal = EditableField::new("Country").default("NL");
    literal.resolve_value_from_request(&request).unwrap();
    assert_eq!(literal.core().value, "NL");

    let mut lazy = EditableField::new("Token").default_with(|| json!("generated"));
    lazy.resolve_value_from_request(&request).unwrap();
    assert_eq!(lazy.core().value, "generated");

    let mut present = EditableField::new("Name").default("unused");
    present.resolve_value_from_request(&request).unwrap();
    assert_eq!(present.core().value, Value::Null);
}

struct BootProbe {
    core: FieldCore,
}

impl BootProbe {
    fn new(label: &str) -> Self {
        Self {
            core: FieldCore::new(label, "probe-field"),
        }
    }
}

impl Field for BootProbe {
    fn core(&self) -> &FieldCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FieldCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn boot(&mut self, ctx: &mut BootContext<'_>) -> Result<(), DashboardError> {
        self.core.additional_information = json!({"booted": ctx.model().name.clone()});
        Ok(())
    }
}

#[test]
fn boot_runs_on_every_resolved_field() {
    let fixture = Fixture::with_resources(|users, _| {
        vec![Arc::new(
            DynamicResource::new("Probe", Arc::clone(users))
                .add_default_fields(|_| {
                    vec![
                        BootProbe::new("One").boxed(),
                        Panel::new("Group", vec![BootProbe::new("Two").boxed()]).boxed(),
                    ]
                }),
        ) as Arc<dyn Resource>]
    });
    let probes = fixture.registry.resolve("probes").unwrap();
    let request = fixture.request(RequestKind::Detail, "probes");
    let mut fields: Vec<BoxedField> = probes.resolve_fields(&request).unwrap().fields;

    assert_eq!(fields[0].core().additional_information["booted"], "User");
    let inner = fields[1].take_inner_fields().unwrap();
    assert_eq!(inner[0].core().additional_information["booted"], "User");
}

#[test]
fn readonly_fields_are_dropped_before_persistence() {
    let fixture = Fixture::new();
    let users = fixture.registry.resolve("users").unwrap();
    let fields = vec![ReadOnlyField::new("ID").boxed(), EditableField::new("Name").readonly().boxed()];
    assert!(users.filter_non_updatable_fields(fields).is_empty());
}
