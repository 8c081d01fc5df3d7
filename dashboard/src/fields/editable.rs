use super::{Field, FieldCore, field_core};

/// Plain text input bound to one attribute.
#[derive(Debug, Clone)]
pub struct EditableField {
    core: FieldCore,
}

impl EditableField {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            core: FieldCore::new(label, "editable-field"),
        }
    }
}

impl Field for EditableField {
    field_core!();
}
