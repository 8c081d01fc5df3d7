use std::{path::Path, sync::Arc};

use anyhow::Result;
use dashboard::{
    BelongsToField, DashboardError, Field, Request, RequestKind, Resource, ResourceExt, ResourceRegistry,
    fields::flatten_fields, validation::Rule,
};

use crate::context::DashboardContext;
use crate::output::Console;

pub const EXAMPLES: &str = "\
Examples:
  dashboard check                           Check the nearest dashboard.toml
  dashboard check --config admin.toml -v    Check another file and show which one";

const SCREENS: [RequestKind; 4] = [
    RequestKind::Index,
    RequestKind::Detail,
    RequestKind::Store,
    RequestKind::Update,
];

pub fn handle_check(config: Option<&Path>, console: &Console) -> Result<()> {
    console.title("Configuration check");

    let ctx = DashboardContext::load(config)?;
    console.detail(&format!("Using {}", ctx.config_path.display()));

    console.pending("Building resources");
    let registry = Arc::new(ctx.registry()?);
    console.settle();
    console.done(&format!("Built {} resources", registry.len()));

    let mut failures = 0;
    for resource in registry.iter() {
        let uri_key = resource.uri_key();
        match check_resource(resource.as_ref(), &registry) {
            Ok(warnings) => {
                console.item(&uri_key);
                for warning in warnings {
                    console.caution(&format!("{uri_key}: {warning}"));
                }
            }
            Err(err) => {
                failures += 1;
                console.failed(&format!("{uri_key}: {err}"));
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} resources failed the check", registry.len());
    }
    console.done("Configuration is valid");
    Ok(())
}

/// Boots every field set of `resource` on every screen, parses every rule and resolves every
/// relation. Returns warnings for suspicious but working settings.
fn check_resource(resource: &dyn Resource, registry: &Arc<ResourceRegistry>) -> Result<Vec<String>, DashboardError> {
    let model = resource.model();
    let mut warnings = Vec::new();
    let contexts: Vec<Option<String>> = std::iter::once(None)
        .chain(resource.contexts().into_iter().map(Some))
        .collect();

    for kind in SCREENS {
        let request = Request::new(kind, Arc::clone(registry), resource.uri_key());
        for context in &contexts {
            let fields = flatten_fields(resource.resolve_fields_for(&request, context.as_deref())?.fields);
            for field in &fields {
                let core = field.core();
                for raw in core.rules_for(request.action()) {
                    Rule::parse(&core.attribute, &raw)?;
                }

                let Some(relation) = field.as_any().downcast_ref::<BelongsToField>() else {
                    continue;
                };
                if model.relation(relation.relation_name()).is_none() {
                    return Err(DashboardError::RelationNotConfigured {
                        relation: relation.relation_name().to_string(),
                        model: model.name.clone(),
                    });
                }
                if let Some(related) = relation.resolve_related_resource(&request)?
                    && let Some(wanted) = relation.related_fields_for()
                    && !related.contexts().iter().any(|name| name == wanted)
                {
                    let warning = format!(
                        "`{}` asks for the `{wanted}` field set of `{}`, which falls back to its default fields",
                        core.attribute,
                        related.uri_key()
                    );
                    if !warnings.contains(&warning) {
                        warnings.push(warning);
                    }
                }
            }
        }
    }
    Ok(warnings)
}
