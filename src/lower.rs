use serde_json::Value;

use crate::extract::extract_contracts;
use crate::host::{Accessibility, AttributeData, SymbolTable, TypeSymbol};
use crate::model::{Role, StubModel, Visibility};

/// A class carrying the stub-generation marker, as found by discovery.
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    pub symbol: &'a TypeSymbol,
    pub marker: &'a AttributeData,
}

impl Declaration<'_> {
    /// Interface names listed for `role`, in attribute order.
    ///
    /// A missing or `null` argument is an empty list; entries that are not
    /// type names are dropped.
    pub fn role_roots(&self, role: Role) -> Vec<&str> {
        match self.marker.named_arguments.get(role.argument_name()) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(single)) => vec![single.as_str()],
            _ => Vec::new(),
        }
    }
}

pub fn lower_to_model(decl: &Declaration<'_>, symbols: &SymbolTable<'_>) -> StubModel {
    StubModel {
        class_name: decl.symbol.name.clone(),
        namespace: decl.symbol.namespace.clone(),
        visibility: visibility_of(decl.symbol.accessibility),
        outgoing_interfaces: extract_contracts(decl.role_roots(Role::Outgoing), symbols),
        incoming_interfaces: extract_contracts(decl.role_roots(Role::Incoming), symbols),
    }
}

pub fn visibility_of(accessibility: Accessibility) -> Visibility {
    match accessibility {
        Accessibility::Public => Visibility::Public,
        Accessibility::Internal => Visibility::Internal,
        Accessibility::Protected => Visibility::Protected,
        Accessibility::ProtectedOrInternal => Visibility::ProtectedInternal,
        Accessibility::ProtectedAndInternal => Visibility::PrivateProtected,
        Accessibility::Private => Visibility::Private,
        Accessibility::NotApplicable => Visibility::Unspecified,
    }
}
