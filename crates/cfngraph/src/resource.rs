use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

use crate::CfnError;

/// Identifier of a resource within a synthesized template.
///
/// Derived from a construct path: each path segment is split on
/// non-alphanumeric characters and the chunks are capitalized and joined, so
/// `nf_head_env` and `nf-head-env` collapse to the same id. The derivation is
/// a pure function of the path, which keeps re-synthesis idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn derive(path: &[&str]) -> crate::Result<LogicalId> {
        let mut id = String::new();
        for segment in path {
            for chunk in segment.split(|c: char| !c.is_ascii_alphanumeric()) {
                let mut chars = chunk.chars();
                if let Some(first) = chars.next() {
                    id.push(first.to_ascii_uppercase());
                    id.extend(chars);
                }
            }
        }
        if id.is_empty() {
            return Err(CfnError::InvalidLogicalId(path.join("/")));
        }
        Ok(LogicalId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single declared resource: its provider type, properties and explicit
/// dependency edges. Properties may contain late-bound values produced by
/// [`ResourceRef::reference`] and [`ResourceRef::att`]; the deployment engine
/// resolves those, not this code.
#[derive(Debug, Clone)]
pub struct Resource {
    pub resource_type: String,
    pub properties: Value,
    pub depends_on: Vec<LogicalId>,
}

/// Handle to a resource already inserted into a template.
///
/// Handles are cheap to clone and are the only way downstream builders refer
/// to upstream resources; the resource itself stays owned by the template.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    id: LogicalId,
}

impl ResourceRef {
    pub(crate) fn new(id: LogicalId) -> Self {
        Self { id }
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    /// `{"Ref": ...}` — the resource's default return value (name, id or ARN
    /// depending on the resource type).
    pub fn reference(&self) -> Value {
        json!({ "Ref": self.id.as_str() })
    }

    /// `{"Fn::GetAtt": [...]}` — a named attribute of the resource.
    pub fn att(&self, attribute: &str) -> Value {
        json!({ "Fn::GetAtt": [self.id.as_str(), attribute] })
    }
}

/// Availability zone of the target region selected by index, left for the
/// deployment engine to resolve.
pub fn select_az(index: usize) -> Value {
    json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
}
