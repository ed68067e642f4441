//! Host-supplied type metadata.
//!
//! This is the shape a host build step exports for the generator: every type
//! the compilation knows about, with the bits of symbol information the
//! generator reads (kind, accessibility, declared base interfaces, directly
//! declared methods, attributes).
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compilation {
    #[serde(default)]
    pub types: Vec<TypeSymbol>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    Delegate,
    #[serde(other)]
    Other,
}

/// Declared accessibility as the host reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    Public,
    Internal,
    Protected,
    ProtectedOrInternal,
    ProtectedAndInternal,
    Private,
    #[default]
    #[serde(other)]
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSymbol {
    pub kind: TypeKind,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub accessibility: Accessibility,
    /// Directly declared base interfaces, qualified, in declaration order.
    #[serde(default)]
    pub bases: Vec<String>,
    /// Directly declared methods only, in declaration order.
    #[serde(default)]
    pub methods: Vec<MethodSymbol>,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSymbol {
    pub name: String,
    #[serde(default)]
    pub returns_void: bool,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSymbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSymbol {
    #[serde(rename = "type")]
    pub ty: String,
    pub name: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub has_default: bool,
    /// Explicit default value as a JSON literal. `null` with `has_default`
    /// means the language-level `default`.
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub is_params: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeData {
    /// Fully qualified metadata name of the attribute class.
    pub name: String,
    #[serde(default)]
    pub named_arguments: IndexMap<String, Value>,
}

impl TypeSymbol {
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    pub fn attribute(&self, metadata_name: &str) -> Option<&AttributeData> {
        self.attributes.iter().find(|a| a.name == metadata_name)
    }
}

impl Compilation {
    /// Concatenate several compilations, keeping input order.
    pub fn merge<I: IntoIterator<Item = Compilation>>(parts: I) -> Self {
        let mut out = Compilation::default();
        for part in parts {
            out.types.extend(part.types);
        }
        out
    }

    /// Qualified name → symbol. First declaration wins on duplicates.
    pub fn symbols(&self) -> SymbolTable<'_> {
        let mut map = IndexMap::with_capacity(self.types.len());
        for ty in &self.types {
            map.entry(ty.qualified_name()).or_insert(ty);
        }
        SymbolTable { map }
    }
}

/// Lookup view over a [`Compilation`], keyed by qualified name.
#[derive(Debug, Clone)]
pub struct SymbolTable<'a> {
    map: IndexMap<String, &'a TypeSymbol>,
}

impl<'a> SymbolTable<'a> {
    pub fn get(&self, qualified_name: &str) -> Option<&'a TypeSymbol> {
        self.map.get(qualified_name).copied()
    }
}

pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}
