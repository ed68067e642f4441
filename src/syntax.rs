//! Small C# syntax tree produced by `codegen` and printed by `render`.
//!
//! Only the constructs the stubs need are modelled. Names and type names are
//! stored already escaped/validated; string literals are escaped at render
//! time.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    /// `//` comment lines at the top of the file.
    pub header: Vec<String>,
    pub nullable_enable: bool,
    /// File-scoped namespace; `None` for the global namespace.
    pub namespace: Option<String>,
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub args: Vec<AttributeArg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeArg {
    /// `Name = value` when set, positional otherwise.
    pub name: Option<String>,
    pub value: Expr,
}

/// One bracketed attribute list, e.g. `[A, B(1)]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeList(pub Vec<Attribute>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKeyword {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub docs: Vec<String>,
    pub attributes: Vec<AttributeList>,
    pub modifiers: Vec<String>,
    pub keyword: TypeKeyword,
    pub name: String,
    /// Render an empty primary constructor `()` after the name.
    pub primary_constructor: bool,
    pub bases: Vec<String>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Property(Property),
    Method(Method),
    Constructor(Constructor),
    Event(Event),
    Delegate(Delegate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub is_params: bool,
    pub ty: String,
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    Get,
    Init,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub attributes: Vec<AttributeList>,
    pub modifiers: Vec<String>,
    pub ty: String,
    pub name: String,
    pub accessors: Vec<Accessor>,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub attributes: Vec<AttributeList>,
    pub modifiers: Vec<String>,
    pub return_type: String,
    pub name: String,
    pub params: Vec<Param>,
    /// Expression body; `None` declares the method without a body.
    pub body: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub attributes: Vec<AttributeList>,
    pub modifiers: Vec<String>,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub attributes: Vec<AttributeList>,
    pub modifiers: Vec<String>,
    pub ty: String,
    pub name: String,
}

/// A delegate type. Rendered directly above the member that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegate {
    pub modifiers: Vec<String>,
    pub return_type: String,
    pub name: String,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assign { target: Expr, value: Expr },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A name or dotted path, printed as is.
    Ident(String),
    /// A literal token already in source form (`3`, `true`, `default`, `[]`).
    Literal(String),
    /// A string literal; escaped when printed.
    Str(String),
    This,
    /// `default!`
    DefaultValue,
    Member { target: Box<Expr>, name: String },
    Call { callee: Box<Expr>, type_args: Vec<String>, args: Vec<Expr> },
    /// `target?.Invoke(args)`
    ConditionalInvoke { target: Box<Expr>, args: Vec<Expr> },
    Await(Box<Expr>),
    Coalesce(Box<Expr>, Box<Expr>),
    /// `_ = expr`
    Discard(Box<Expr>),
    Lambda { is_async: bool, params: Vec<Param>, body: Box<Expr> },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call { callee: Box::new(Expr::Ident(callee.into())), type_args: Vec::new(), args }
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member { target: Box::new(self), name: name.into() }
    }

    /// `self.name()`
    pub fn method_call(self, name: impl Into<String>) -> Self {
        Expr::Call { callee: Box::new(self.member(name)), type_args: Vec::new(), args: Vec::new() }
    }
}

/// C# regular string literal for `s`.
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl TypeDecl {
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.members.iter().filter_map(|m| match m {
            Member::Event(event) => Some(event),
            _ => None,
        })
    }

    pub fn delegates(&self) -> impl Iterator<Item = &Delegate> {
        self.members.iter().filter_map(|m| match m {
            Member::Delegate(delegate) => Some(delegate),
            _ => None,
        })
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.members.iter().find_map(|m| match m {
            Member::Constructor(ctor) => Some(ctor),
            _ => None,
        })
    }
}
