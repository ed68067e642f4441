// Value model between extraction and emission. No host types in here.
//
// Everything derives Eq/Hash: structural equality of `StubModel` is what the
// driver's cache keys on, so list order is significant everywhere.

use std::fmt;

use serde::Serialize;

/// Opaque type name, echoed verbatim into generated code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    /// No return value; never confused with a type that happens to be named "void".
    Void,
    Type(TypeRef),
}

impl ReturnType {
    pub fn is_void(&self) -> bool {
        matches!(self, ReturnType::Void)
    }

    /// Text used in a signature.
    pub fn display(&self) -> &str {
        match self {
            ReturnType::Void => "void",
            ReturnType::Type(t) => t.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParameterSignature {
    pub ty: TypeRef,
    pub name: String,
    pub nullable: bool,
    /// Literal text of the default value, if the parameter is optional.
    pub default_value: Option<String>,
    pub is_variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub return_type: ReturnType,
    pub parameters: Vec<ParameterSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InterfaceContract {
    pub qualified_name: String,
    pub methods: Vec<MethodSignature>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Internal,
    Protected,
    ProtectedInternal,
    PrivateProtected,
    Private,
    #[default]
    Unspecified,
}

impl Visibility {
    pub fn modifier(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Internal => "internal",
            Visibility::Protected => "protected",
            Visibility::ProtectedInternal => "protected internal",
            Visibility::PrivateProtected => "private protected",
            Visibility::Private => "private",
            Visibility::Unspecified => "",
        }
    }
}

/// Which way calls flow for a contract list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The remote invokes a handler on this side.
    Incoming,
    /// This side invokes the remote.
    Outgoing,
}

impl Role {
    /// Named attribute argument that carries this role's interface list.
    pub fn argument_name(self) -> &'static str {
        match self {
            Role::Incoming => "Incoming",
            Role::Outgoing => "Outgoing",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Incoming => "incoming",
            Role::Outgoing => "outgoing",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StubModel {
    pub class_name: String,
    pub namespace: String,
    pub visibility: Visibility,
    pub outgoing_interfaces: Vec<InterfaceContract>,
    pub incoming_interfaces: Vec<InterfaceContract>,
}

impl StubModel {
    pub fn contract_name(&self) -> String {
        format!("I{}", self.class_name)
    }

    pub fn interfaces(&self, role: Role) -> &[InterfaceContract] {
        match role {
            Role::Incoming => &self.incoming_interfaces,
            Role::Outgoing => &self.outgoing_interfaces,
        }
    }

    /// Methods of one role, flattened across interfaces, with their source interface.
    pub fn methods(&self, role: Role) -> impl Iterator<Item = (&InterfaceContract, &MethodSignature)> {
        self.interfaces(role)
            .iter()
            .flat_map(|i| i.methods.iter().map(move |m| (i, m)))
    }

    /// Name of the generated source unit for this declaration.
    pub fn hint_name(&self) -> String {
        if self.namespace.is_empty() {
            format!("{}.g.cs", self.class_name)
        } else {
            format!("{}.{}.g.cs", self.namespace, self.class_name)
        }
    }
}
