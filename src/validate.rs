//! Name checks run between model building and emission.
//!
//! The transport addresses calls by method name only, so a name has to be
//! unique within a role, and the generated class puts events and methods in
//! one member namespace.
use indexmap::IndexMap;

use crate::codegen::handler_name;
use crate::error::ValidationError;
use crate::model::{Role, StubModel};

pub fn check(model: &StubModel) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for role in [Role::Incoming, Role::Outgoing] {
        let mut by_name: IndexMap<&str, Vec<String>> = IndexMap::new();
        for (iface, method) in model.methods(role) {
            by_name.entry(method.name.as_str()).or_default().push(iface.qualified_name.clone());
        }
        for (name, interfaces) in by_name {
            if interfaces.len() > 1 {
                errors.push(ValidationError::DuplicateMethod { role, name: name.to_string(), interfaces });
            }
        }
    }

    let mut by_handler: IndexMap<String, Vec<String>> = IndexMap::new();
    for (_, method) in model.methods(Role::Incoming) {
        let methods = by_handler.entry(handler_name(&method.name)).or_default();
        if !methods.contains(&method.name) {
            methods.push(method.name.clone());
        }
    }
    for (handler, methods) in by_handler {
        if methods.len() > 1 {
            errors.push(ValidationError::HandlerCollision { handler, methods });
        }
    }

    let mut reported = Vec::new();
    for (_, incoming) in model.methods(Role::Incoming) {
        let name = incoming.name.as_str();
        if reported.contains(&name) {
            continue;
        }
        if model.methods(Role::Outgoing).any(|(_, m)| m.name == name) {
            reported.push(name);
            errors.push(ValidationError::CrossRoleCollision { name: name.to_string() });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
