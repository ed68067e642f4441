//! Signature extraction: interface references → flat, ordered contracts.
//!
//! Each root is walked depth-first, the interface itself before its declared
//! bases, bases in declaration order. Only directly declared methods are read
//! per interface; inheritance comes from the walk. An interface reached twice
//! (diamonds, repeated roots, cyclic metadata) contributes once, at its first
//! visit.
use std::collections::HashSet;

use log::debug;
use serde_json::Value;

use crate::host::{MethodSymbol, ParameterSymbol, SymbolTable, TypeKind, TypeSymbol};
use crate::model::{InterfaceContract, MethodSignature, ParameterSignature, ReturnType, TypeRef};
use crate::syntax::string_literal;

/// Flatten the interfaces named by `roots` (qualified names) into contracts.
///
/// Names that resolve to nothing, or to something other than an interface,
/// are skipped.
pub fn extract_contracts<'r, I>(roots: I, symbols: &SymbolTable<'_>) -> Vec<InterfaceContract>
where
    I: IntoIterator<Item = &'r str>,
{
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    for root in roots {
        match resolve_interface(root, symbols) {
            Some(symbol) => visit(symbol, symbols, &mut visited, &mut out),
            None => debug!("skipping `{root}`: not a known interface"),
        }
    }
    out
}

fn resolve_interface<'a>(name: &str, symbols: &SymbolTable<'a>) -> Option<&'a TypeSymbol> {
    symbols.get(name).filter(|s| s.kind == TypeKind::Interface)
}

fn visit<'a>(
    symbol: &'a TypeSymbol,
    symbols: &SymbolTable<'a>,
    visited: &mut HashSet<String>,
    out: &mut Vec<InterfaceContract>,
) {
    let qualified_name = symbol.qualified_name();
    if !visited.insert(qualified_name.clone()) {
        return;
    }
    out.push(InterfaceContract {
        qualified_name,
        methods: symbol.methods.iter().map(method_signature).collect(),
    });
    for base in &symbol.bases {
        match resolve_interface(base, symbols) {
            Some(parent) => visit(parent, symbols, visited, out),
            None => debug!("skipping base `{base}` of `{}`: not a known interface", symbol.name),
        }
    }
}

pub fn method_signature(method: &MethodSymbol) -> MethodSignature {
    let return_type = match (&method.return_type, method.returns_void) {
        (Some(ty), false) => ReturnType::Type(TypeRef::new(ty.as_str())),
        _ => ReturnType::Void,
    };
    MethodSignature {
        name: method.name.clone(),
        return_type,
        parameters: method.parameters.iter().map(parameter_signature).collect(),
    }
}

fn parameter_signature(param: &ParameterSymbol) -> ParameterSignature {
    ParameterSignature {
        ty: TypeRef::new(param.ty.as_str()),
        name: param.name.clone(),
        nullable: param.nullable,
        default_value: default_literal(param),
        is_variadic: param.is_params,
    }
}

/// Source text of a parameter's default, or `None` when it has none.
fn default_literal(param: &ParameterSymbol) -> Option<String> {
    match &param.default {
        None | Some(Value::Null) if !param.has_default => None,
        None | Some(Value::Null) => Some("default".to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => Some(string_literal(s)),
        // arrays/objects have no constant form
        Some(Value::Array(_) | Value::Object(_)) => Some("default".to_string()),
    }
}
