use serde_json::{Map, Value, json};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::CfnError;
use crate::resource::{LogicalId, Resource, ResourceRef};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// An append-only resource graph, synthesized once and handed in full to the
/// deployment engine. Resources are kept in insertion order; the JSON output
/// is keyed by logical id and therefore deterministic for identical input.
pub struct Template {
    description: String,
    resources: Vec<(LogicalId, Resource)>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            resources: Vec::new(),
        }
    }

    /// Insert a resource under the logical id derived from `path`.
    pub fn add(
        &mut self,
        path: &[&str],
        resource_type: &str,
        properties: Value,
    ) -> crate::Result<ResourceRef> {
        self.add_dependent(path, resource_type, properties, &[])
    }

    /// Insert a resource with explicit dependency edges on top of the
    /// implicit ones carried by `Ref`/`Fn::GetAtt` values.
    pub fn add_dependent(
        &mut self,
        path: &[&str],
        resource_type: &str,
        properties: Value,
        depends_on: &[&ResourceRef],
    ) -> crate::Result<ResourceRef> {
        let id = LogicalId::derive(path)?;
        if self.get(&id).is_some() {
            return Err(CfnError::DuplicateLogicalId(id.as_str().to_string()));
        }
        log::debug!("Adding {} `{}`", resource_type, id);
        self.resources.push((
            id.clone(),
            Resource {
                resource_type: resource_type.to_string(),
                properties,
                depends_on: depends_on.iter().map(|r| r.logical_id().clone()).collect(),
            },
        ));
        Ok(ResourceRef::new(id))
    }

    pub fn get(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, resource)| resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&LogicalId, &Resource)> {
        self.resources.iter().map(|(id, resource)| (id, resource))
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> + 'a {
        self.resources()
            .filter(move |(_, resource)| resource.resource_type == resource_type)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut resources = Map::new();
        for (id, resource) in &self.resources {
            let mut entry = Map::new();
            entry.insert("Type".to_string(), json!(resource.resource_type));
            entry.insert("Properties".to_string(), resource.properties.clone());
            if !resource.depends_on.is_empty() {
                entry.insert("DependsOn".to_string(), json!(resource.depends_on));
            }
            resources.insert(id.as_str().to_string(), Value::Object(entry));
        }
        json!({
            "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
            "Description": self.description,
            "Resources": resources,
        })
    }

    pub fn write(&self, path: &Path) -> crate::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.to_json())?;
        Ok(())
    }
}
