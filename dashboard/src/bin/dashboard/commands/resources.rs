use std::{path::Path, sync::Arc};

use anyhow::Result;
use comfy_table::{Cell, Table};
use dashboard::{Request, RequestKind, Resource, ResourceExt, filters::Filter};
use serde::Serialize;

use crate::context::DashboardContext;
use crate::output::{Console, Tabular};

pub const EXAMPLES: &str = "\
Examples:
  dashboard resources                       Table of uri keys, models, fields and filters
  dashboard resources --output json         The same listing as a JSON array";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRow {
    pub uri_key: String,
    pub label: String,
    pub model: String,
    pub collection: String,
    pub fields: Vec<String>,
    pub filters: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ResourceListing(pub Vec<ResourceRow>);

impl Tabular for ResourceListing {
    fn table(&self, console: &Console) -> Table {
        let mut table = console.table(&["Uri Key", "Label", "Model", "Collection", "Fields", "Filters"]);
        for row in &self.0 {
            table.add_row(vec![
                Cell::new(&row.uri_key),
                Cell::new(&row.label),
                Cell::new(&row.model),
                Cell::new(&row.collection),
                Cell::new(row.fields.join(", ")),
                Cell::new(row.filters.join(", ")),
            ]);
        }
        table
    }
}

pub fn handle_resources(config: Option<&Path>, console: &Console) -> Result<()> {
    let ctx = DashboardContext::load(config)?;
    let registry = Arc::new(ctx.registry()?);

    let mut rows = Vec::with_capacity(registry.len());
    for resource in registry.iter() {
        let request = Request::new(RequestKind::Detail, Arc::clone(&registry), resource.uri_key());
        let model = resource.model();
        rows.push(ResourceRow {
            uri_key: resource.uri_key(),
            label: resource.descriptor().label,
            model: model.name.clone(),
            collection: model.collection.clone(),
            fields: resource
                .resolve_fields(&request)?
                .attributes()
                .into_iter()
                .map(str::to_string)
                .collect(),
            filters: resource.filters().iter().map(|filter| filter.uri_key()).collect(),
        });
    }

    if rows.is_empty() && !console.is_json() {
        console.caution("No resources configured");
        return Ok(());
    }
    console.title("Resources");
    console.emit(&ResourceListing(rows))
}
