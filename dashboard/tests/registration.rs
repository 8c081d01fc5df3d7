use std::sync::Arc;

use dashboard::{
    DynamicResource, EditableField, FieldExt, ModelDefinition, Resource, ResourceRegistration, ResourceRegistry,
    connection::MemoryConnection, registry::registered_resources,
};

fn widgets() -> Arc<dyn Resource> {
    let model = Arc::new(ModelDefinition::new("Widget", "widgets", Arc::new(MemoryConnection::new())));
    Arc::new(DynamicResource::new("Widget", model).add_default_fields(|_| vec![EditableField::new("Name").boxed()]))
}

dashboard::inventory::submit! {
    ResourceRegistration { factory: widgets }
}

#[test]
fn submitted_resources_are_registered() {
    assert_eq!(registered_resources().count(), 1);

    let registry = ResourceRegistry::with_registered().unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.resolve("widgets").unwrap().label(), "Widget");
}
