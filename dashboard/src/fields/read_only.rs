use super::{Field, FieldCore, field_core};

/// Display-only attribute. Never written by store or update.
#[derive(Debug, Clone)]
pub struct ReadOnlyField {
    core: FieldCore,
}

impl ReadOnlyField {
    pub fn new(label: impl Into<String>) -> Self {
        let mut core = FieldCore::new(label, "read-only-field");
        core.readonly = true;
        Self { core }
    }
}

impl Field for ReadOnlyField {
    field_core!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_always_readonly() {
        let field = ReadOnlyField::new("ID");
        assert!(field.core().readonly);
        assert_eq!(field.core().attribute, "id");
        assert_eq!(field.core().component, "read-only-field");
    }
}
