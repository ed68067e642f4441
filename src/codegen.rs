//! Code emitter: `StubModel` → syntax tree → C# text.
//!
//! Two declarations come out of every model: the partial class and the
//! contract interface `I<Class>` it implements. Both are built from the same
//! walk over the model so they cannot drift apart.
//!
//! Outgoing method `m(p)` becomes
//! - `m(p, CancellationToken)` on the interface,
//! - `m(p)` on the class, forwarding with a token that never cancels,
//! - `m(p, CancellationToken)` on the class, invoking the transport under key `"m"`.
//!
//! Incoming method `n(x)` becomes a `NHandler(I<Class> sender, x)` delegate,
//! an `n` event, and a subscription under key `"n"` in the constructor.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::EmitError;
use crate::model::{MethodSignature, ParameterSignature, ReturnType, Role, StubModel};
use crate::render::render;
use crate::syntax::{
    Accessor, Attribute, AttributeArg, AttributeList, CompilationUnit, Constructor, Delegate,
    Event, Expr, Member, Method, Param, Property, Stmt, TypeDecl, TypeKeyword,
};

const TASK: &str = "System.Threading.Tasks.Task";
const VALUE_TASK: &str = "System.Threading.Tasks.ValueTask";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@?[\p{L}_][\p{L}\p{N}_]*$").expect("identifier pattern")
});
static TYPE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}_@(\[][\p{L}\p{N}_@.:<>\[\],?() ]*$").expect("type name pattern")
});

const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Generator identity stamped into `GeneratedCode` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub generator_name: String,
    pub generator_version: String,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            generator_name: env!("CARGO_PKG_NAME").to_string(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Names of the untyped transport the stubs are written against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub connection_type: String,
    /// Static invoke-by-name primitive: `(connection, name, args.., token)`.
    pub invoke: String,
    /// Static subscribe-by-name primitive: `(connection, name, closure)`.
    pub subscribe: String,
    pub cancellation_type: String,
    /// Value of `cancellation_type` that never cancels.
    pub never_cancel: String,
    /// Name of the generated property holding the connection.
    pub connection_property: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connection_type: "Microsoft.AspNetCore.SignalR.Client.HubConnection".into(),
            invoke: "Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.InvokeAsync".into(),
            subscribe: "Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.On".into(),
            cancellation_type: "System.Threading.CancellationToken".into(),
            never_cancel: "System.Threading.CancellationToken.None".into(),
            connection_property: "HubConnection".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodegenConfig {
    pub build: BuildInfo,
    pub transport: TransportConfig,
}

/// How a return type completes, which decides the invoke/subscribe shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion<'a> {
    Void,
    /// `Task` / `ValueTask`.
    Awaitable(&'a str),
    /// `Task<T>` / `ValueTask<T>`.
    AwaitableOf { awaitable: &'a str, result: &'a str },
    /// A plain value.
    Value(&'a str),
}

impl<'a> Completion<'a> {
    pub fn of(return_type: &'a ReturnType) -> Self {
        let ty = match return_type {
            ReturnType::Void => return Completion::Void,
            ReturnType::Type(t) => t.as_str(),
        };
        let bare = ty.strip_prefix("global::").unwrap_or(ty);
        for awaitable in [TASK, VALUE_TASK] {
            let Some(rest) = bare.strip_prefix(awaitable) else { continue };
            if rest.is_empty() {
                return Completion::Awaitable(awaitable);
            }
            if let Some(result) = rest.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
                return Completion::AwaitableOf { awaitable, result };
            }
        }
        Completion::Value(ty)
    }

    /// Return type of the cancellable overload.
    fn cancellable_return(self, declared: &ReturnType) -> String {
        match self {
            Completion::Void => TASK.to_string(),
            Completion::Value(t) => format!("{TASK}<{t}>"),
            Completion::Awaitable(_) | Completion::AwaitableOf { .. } => declared.display().to_string(),
        }
    }

    fn result_type(self) -> Option<&'a str> {
        match self {
            Completion::AwaitableOf { result, .. } => Some(result),
            Completion::Value(t) => Some(t),
            Completion::Void | Completion::Awaitable(_) => None,
        }
    }
}

/// Method name with its first letter uppercased, then `Handler`.
/// The rest of the name is kept as written (`getURL` → `GetURLHandler`).
pub fn handler_name(method_name: &str) -> String {
    let mut chars = method_name.chars();
    let mut out = String::with_capacity(method_name.len() + 7);
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
    out.push_str("Handler");
    out
}

/// Contextual keywords that are still rejected as names inside `async` bodies.
const ASYNC_KEYWORDS: &[&str] = &["await"];

/// Escape C# keywords used as names.
pub fn ident(name: &str) -> String {
    if KEYWORDS.contains(&name) || ASYNC_KEYWORDS.contains(&name) {
        format!("@{name}")
    } else {
        name.to_string()
    }
}

/// `base`, or `base` followed by underscores until it differs from every parameter name.
fn fresh_name(base: &str, params: &[ParameterSignature]) -> String {
    let mut name = base.to_string();
    while params.iter().any(|p| p.name == name) {
        name.push('_');
    }
    name
}

pub struct Codegen {
    config: CodegenConfig,
}

impl Codegen {
    pub fn new(config: CodegenConfig) -> Self {
        Self { config }
    }

    /// Render the stub source for `model`.
    pub fn emit(&self, model: &StubModel) -> Result<String, EmitError> {
        Ok(render(&self.lower(model)?))
    }

    /// Build the syntax tree for `model` without printing it.
    pub fn lower(&self, model: &StubModel) -> Result<CompilationUnit, EmitError> {
        check_model(model)?;
        let transport = &self.config.transport;
        let contract = model.contract_name();

        let mut class_members = vec![Member::Property(Property {
            attributes: self.member_attributes(true),
            modifiers: vec!["public".into()],
            ty: transport.connection_type.clone(),
            name: transport.connection_property.clone(),
            accessors: vec![Accessor::Get],
            initializer: None,
        })];
        let mut interface_members = Vec::new();

        for (_, method) in model.methods(Role::Outgoing) {
            let outgoing = self.outgoing(method);
            class_members.push(Member::Method(outgoing.fire_and_forget));
            class_members.push(Member::Method(outgoing.cancellable));
            interface_members.push(Member::Method(outgoing.declaration));
        }

        let mut subscriptions = vec![Stmt::Assign {
            target: Expr::ident(transport.connection_property.as_str()),
            value: Expr::ident("hubConnection"),
        }];
        for (_, method) in model.methods(Role::Incoming) {
            let incoming = self.incoming(method, &contract);
            interface_members.push(Member::Delegate(incoming.delegate));
            interface_members.push(Member::Event(incoming.declaration));
            class_members.push(Member::Event(incoming.event));
            subscriptions.push(Stmt::Expr(incoming.subscription));
        }

        class_members.push(Member::Constructor(Constructor {
            attributes: self.member_attributes(true),
            modifiers: vec!["public".into()],
            name: model.class_name.clone(),
            params: vec![Param {
                is_params: false,
                ty: transport.connection_type.clone(),
                name: "hubConnection".into(),
                default: None,
            }],
            body: subscriptions,
        }));

        let mut class_modifiers = Vec::new();
        if !model.visibility.modifier().is_empty() {
            class_modifiers.push(model.visibility.modifier().to_string());
        }
        class_modifiers.push("partial".into());

        let class = TypeDecl {
            docs: Vec::new(),
            attributes: Vec::new(),
            modifiers: class_modifiers,
            keyword: TypeKeyword::Class,
            name: model.class_name.clone(),
            primary_constructor: false,
            bases: vec![contract.clone()],
            members: class_members,
        };
        let interface = TypeDecl {
            docs: Vec::new(),
            attributes: vec![AttributeList(vec![self.generated_code()])],
            modifiers: vec!["public".into()],
            keyword: TypeKeyword::Interface,
            name: contract,
            primary_constructor: false,
            bases: model.outgoing_interfaces.iter().map(|i| i.qualified_name.clone()).collect(),
            members: interface_members,
        };

        Ok(CompilationUnit {
            header: vec!["<auto-generated/>".into()],
            nullable_enable: true,
            namespace: (!model.namespace.is_empty()).then(|| model.namespace.clone()),
            types: vec![class, interface],
        })
    }

    /// Source of the marker attribute the host looks for.
    ///
    /// `metadata_name` is the attribute's qualified name, e.g.
    /// `HubStubs.GenerateHubClientAttribute`.
    pub fn marker_attribute(&self, metadata_name: &str) -> Result<String, EmitError> {
        let (namespace, name) = match metadata_name.rsplit_once('.') {
            Some((ns, name)) => (Some(ns.to_string()), name),
            None => (None, metadata_name),
        };
        check_identifier("attribute", name)?;
        if let Some(ns) = &namespace {
            check_namespace(ns)?;
        }
        let usage_name = name.strip_suffix("Attribute").unwrap_or(name);
        let type_array = "System.Type[]".to_string();

        let decl = TypeDecl {
            docs: vec![
                "<summary>".into(),
                "<para>Add this attribute to a partial class to generate a strongly-typed hub client for it. Pass the interfaces describing the calls the client receives and sends.</para>".into(),
                "<para>Example:</para>".into(),
                format!("<para><code>[{usage_name}(Incoming = [typeof(EventsToClient)], Outgoing = [typeof(EventsToServer)])]"),
                "public partial class SampleClient;</code></para>".into(),
                "</summary>".into(),
            ],
            attributes: vec![
                AttributeList(vec![Attribute {
                    name: "System.AttributeUsage".into(),
                    args: vec![
                        AttributeArg { name: None, value: Expr::ident("System.AttributeTargets.Class") },
                        AttributeArg { name: Some("Inherited".into()), value: Expr::Literal("false".into()) },
                        AttributeArg { name: Some("AllowMultiple".into()), value: Expr::Literal("false".into()) },
                    ],
                }]),
                AttributeList(self.member_attribute_set(true)),
            ],
            modifiers: vec!["internal".into(), "sealed".into()],
            keyword: TypeKeyword::Class,
            name: name.to_string(),
            primary_constructor: true,
            bases: vec!["System.Attribute".into()],
            members: vec![
                Member::Property(Property {
                    attributes: Vec::new(),
                    modifiers: vec!["public".into(), "required".into()],
                    ty: type_array.clone(),
                    name: Role::Incoming.argument_name().into(),
                    accessors: vec![Accessor::Get, Accessor::Init],
                    initializer: None,
                }),
                Member::Property(Property {
                    attributes: Vec::new(),
                    modifiers: vec!["public".into()],
                    ty: type_array,
                    name: Role::Outgoing.argument_name().into(),
                    accessors: vec![Accessor::Get, Accessor::Init],
                    initializer: Some(Expr::Literal("[]".into())),
                }),
            ],
        };
        Ok(render(&CompilationUnit {
            header: vec!["<auto-generated/>".into()],
            nullable_enable: true,
            namespace,
            types: vec![decl],
        }))
    }

    fn outgoing(&self, method: &MethodSignature) -> OutgoingMembers {
        let transport = &self.config.transport;
        let completion = Completion::of(&method.return_type);
        let name = ident(&method.name);
        let token = fresh_name("cancellationToken", &method.parameters);
        let forwarded: Vec<Expr> = method.parameters.iter().map(|p| Expr::ident(ident(&p.name))).collect();

        let mut forward_args = forwarded.clone();
        forward_args.push(Expr::ident(transport.never_cancel.as_str()));
        let forward = Expr::call(name.as_str(), forward_args);
        let forward = match completion {
            Completion::Void => Expr::Discard(Box::new(forward)),
            Completion::Value(_) => forward.method_call("GetAwaiter").method_call("GetResult"),
            Completion::Awaitable(_) | Completion::AwaitableOf { .. } => forward,
        };

        let fire_and_forget = Method {
            attributes: self.member_attributes(true),
            modifiers: vec!["public".into()],
            return_type: method.return_type.display().to_string(),
            name: name.clone(),
            params: method.parameters.iter().map(|p| declared_param(p, true, true)).collect(),
            body: Some(forward),
        };

        // the token comes last, so a variadic tail loses `params`; once
        // anything before it is optional, everything after must be too
        let token_default = method.parameters.iter().any(|p| p.default_value.is_some());
        let mut params: Vec<Param> = method
            .parameters
            .iter()
            .map(|p| {
                let mut param = declared_param(p, false, true);
                if token_default && param.default.is_none() && p.is_variadic {
                    param.default = Some(Expr::Literal("default".into()));
                }
                param
            })
            .collect();
        params.push(Param {
            is_params: false,
            ty: transport.cancellation_type.clone(),
            name: token.clone(),
            default: token_default.then(|| Expr::Literal("default".into())),
        });

        let mut invoke_args = vec![Expr::ident(transport.connection_property.as_str()), Expr::Str(method.name.clone())];
        invoke_args.extend(forwarded);
        invoke_args.push(Expr::ident(token));
        let invoke = Expr::Call {
            callee: Box::new(Expr::ident(transport.invoke.as_str())),
            type_args: completion.result_type().map(str::to_string).into_iter().collect(),
            args: invoke_args,
        };

        let return_type = completion.cancellable_return(&method.return_type);
        let cancellable = Method {
            attributes: self.member_attributes(true),
            modifiers: vec!["public".into(), "async".into()],
            return_type: return_type.clone(),
            name: name.clone(),
            params: params.clone(),
            body: Some(Expr::Await(Box::new(invoke))),
        };
        let declaration = Method {
            attributes: Vec::new(),
            modifiers: Vec::new(),
            return_type,
            name,
            params,
            body: None,
        };
        OutgoingMembers { fire_and_forget, cancellable, declaration }
    }

    fn incoming(&self, method: &MethodSignature, contract: &str) -> IncomingMembers {
        let transport = &self.config.transport;
        let completion = Completion::of(&method.return_type);
        let handler = handler_name(&method.name);
        let event_name = ident(&method.name);
        let sender = fresh_name("sender", &method.parameters);

        let mut delegate_params = vec![Param { is_params: false, ty: contract.to_string(), name: sender, default: None }];
        delegate_params.extend(method.parameters.iter().map(|p| declared_param(p, true, false)));
        let delegate = Delegate {
            modifiers: Vec::new(),
            return_type: method.return_type.display().to_string(),
            name: handler.clone(),
            params: delegate_params,
        };

        let declaration = Event { attributes: Vec::new(), modifiers: Vec::new(), ty: format!("{handler}?"), name: event_name.clone() };
        let event = Event {
            attributes: vec![AttributeList(self.member_attribute_set(false))],
            modifiers: vec!["public".into()],
            ty: format!("{contract}.{handler}?"),
            name: event_name.clone(),
        };

        let mut raise_args = vec![Expr::This];
        raise_args.extend(method.parameters.iter().map(|p| Expr::ident(ident(&p.name))));
        let raise = Expr::ConditionalInvoke { target: Box::new(Expr::ident(event_name)), args: raise_args };
        let (is_async, body) = match completion {
            Completion::Void => (false, raise),
            Completion::Awaitable(awaitable) => (
                true,
                Expr::Await(Box::new(Expr::Coalesce(
                    Box::new(raise),
                    Box::new(Expr::ident(format!("{awaitable}.CompletedTask"))),
                ))),
            ),
            Completion::AwaitableOf { awaitable, result } => (
                true,
                Expr::Await(Box::new(Expr::Coalesce(
                    Box::new(raise),
                    Box::new(Expr::Call {
                        callee: Box::new(Expr::ident(format!("{awaitable}.FromResult"))),
                        type_args: vec![result.to_string()],
                        args: vec![Expr::DefaultValue],
                    }),
                ))),
            ),
            Completion::Value(_) => (false, Expr::Coalesce(Box::new(raise), Box::new(Expr::DefaultValue))),
        };
        let closure = Expr::Lambda {
            is_async,
            params: method.parameters.iter().map(|p| declared_param(p, false, false)).collect(),
            body: Box::new(body),
        };

        let mut type_args: Vec<String> = method.parameters.iter().map(param_type).collect();
        type_args.extend(completion.result_type().map(str::to_string));
        let subscription = Expr::Call {
            callee: Box::new(Expr::ident(transport.subscribe.as_str())),
            type_args,
            args: vec![
                Expr::ident(transport.connection_property.as_str()),
                Expr::Str(method.name.clone()),
                closure,
            ],
        };

        IncomingMembers { delegate, declaration, event, subscription }
    }

    fn generated_code(&self) -> Attribute {
        let build = &self.config.build;
        Attribute {
            name: "System.CodeDom.Compiler.GeneratedCode".into(),
            args: vec![
                AttributeArg { name: None, value: Expr::Str(build.generator_name.clone()) },
                AttributeArg { name: None, value: Expr::Str(build.generator_version.clone()) },
            ],
        }
    }

    /// `DebuggerNonUserCode` is not valid on events.
    fn member_attribute_set(&self, debugger_non_user_code: bool) -> Vec<Attribute> {
        let mut out = Vec::with_capacity(3);
        if debugger_non_user_code {
            out.push(Attribute { name: "System.Diagnostics.DebuggerNonUserCode".into(), args: Vec::new() });
        }
        out.push(Attribute { name: "System.Diagnostics.CodeAnalysis.ExcludeFromCodeCoverage".into(), args: Vec::new() });
        out.push(self.generated_code());
        out
    }

    fn member_attributes(&self, debugger_non_user_code: bool) -> Vec<AttributeList> {
        vec![AttributeList(self.member_attribute_set(debugger_non_user_code))]
    }
}

struct OutgoingMembers {
    fire_and_forget: Method,
    cancellable: Method,
    declaration: Method,
}

struct IncomingMembers {
    delegate: Delegate,
    declaration: Event,
    event: Event,
    subscription: Expr,
}

fn param_type(p: &ParameterSignature) -> String {
    let ty = p.ty.as_str();
    if p.nullable && !ty.ends_with('?') { format!("{ty}?") } else { ty.to_string() }
}

fn declared_param(p: &ParameterSignature, keep_params: bool, keep_default: bool) -> Param {
    Param {
        is_params: keep_params && p.is_variadic,
        ty: param_type(p),
        name: ident(&p.name),
        default: if keep_default { p.default_value.clone().map(Expr::Literal) } else { None },
    }
}

fn check_identifier(what: &'static str, name: &str) -> Result<(), EmitError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(EmitError::InvalidIdentifier { what, name: name.to_string() })
    }
}

fn check_type_name(name: &str) -> Result<(), EmitError> {
    if TYPE_NAME.is_match(name) && !name.ends_with(' ') {
        Ok(())
    } else {
        Err(EmitError::UnsupportedTypeName(name.to_string()))
    }
}

fn check_namespace(ns: &str) -> Result<(), EmitError> {
    for part in ns.split('.') {
        check_identifier("namespace segment", part)?;
    }
    Ok(())
}

fn check_model(model: &StubModel) -> Result<(), EmitError> {
    check_identifier("class", &model.class_name)?;
    if !model.namespace.is_empty() {
        check_namespace(&model.namespace)?;
    }
    for role in [Role::Outgoing, Role::Incoming] {
        for iface in model.interfaces(role) {
            check_type_name(&iface.qualified_name)?;
        }
        for (_, method) in model.methods(role) {
            check_identifier("method", &method.name)?;
            if let ReturnType::Type(t) = &method.return_type {
                check_type_name(t.as_str())?;
            }
            for p in &method.parameters {
                check_identifier("parameter", &p.name)?;
                check_type_name(p.ty.as_str())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InterfaceContract, TypeRef, Visibility};
    use crate::render::expr;

    fn param(ty: &str, name: &str) -> ParameterSignature {
        ParameterSignature { ty: TypeRef::new(ty), name: name.into(), nullable: false, default_value: None, is_variadic: false }
    }

    fn method(name: &str, ret: Option<&str>, parameters: Vec<ParameterSignature>) -> MethodSignature {
        MethodSignature {
            name: name.into(),
            return_type: ret.map_or(ReturnType::Void, |t| ReturnType::Type(TypeRef::new(t))),
            parameters,
        }
    }

    fn model(incoming: Vec<MethodSignature>, outgoing: Vec<MethodSignature>) -> StubModel {
        StubModel {
            class_name: "Client".into(),
            namespace: "App".into(),
            visibility: Visibility::Internal,
            outgoing_interfaces: if outgoing.is_empty() {
                vec![]
            } else {
                vec![InterfaceContract { qualified_name: "App.ToServer".into(), methods: outgoing }]
            },
            incoming_interfaces: vec![InterfaceContract { qualified_name: "App.ToClient".into(), methods: incoming }],
        }
    }

    fn codegen() -> Codegen {
        Codegen::new(CodegenConfig {
            build: BuildInfo { generator_name: "gen".into(), generator_version: "1.2.3".into() },
            transport: TransportConfig::default(),
        })
    }

    fn class_of(unit: &CompilationUnit) -> &TypeDecl {
        &unit.types[0]
    }

    fn interface_of(unit: &CompilationUnit) -> &TypeDecl {
        &unit.types[1]
    }

    #[test]
    fn completion_classification() {
        let of = |t: Option<&str>| {
            let rt = t.map_or(ReturnType::Void, |t| ReturnType::Type(TypeRef::new(t)));
            format!("{:?}", Completion::of(&rt))
        };
        assert_eq!(of(None), "Void");
        assert_eq!(of(Some("System.Threading.Tasks.Task")), "Awaitable(\"System.Threading.Tasks.Task\")");
        assert_eq!(of(Some("global::System.Threading.Tasks.ValueTask")), "Awaitable(\"System.Threading.Tasks.ValueTask\")");
        assert_eq!(
            of(Some("System.Threading.Tasks.Task<int?>")),
            "AwaitableOf { awaitable: \"System.Threading.Tasks.Task\", result: \"int?\" }"
        );
        assert_eq!(of(Some("System.Threading.Tasks.TaskScheduler")), "Value(\"System.Threading.Tasks.TaskScheduler\")");
        assert_eq!(of(Some("string")), "Value(\"string\")");
    }

    #[test]
    fn incoming_hello_scenario() {
        let unit = codegen().lower(&model(vec![method("hello", None, vec![])], vec![])).unwrap();
        let interface = interface_of(&unit);
        let delegate = interface.delegates().next().unwrap();
        assert_eq!(delegate.name, "HelloHandler");
        assert_eq!(delegate.params.len(), 1);
        assert_eq!(delegate.params[0].ty, "IClient");
        assert_eq!(delegate.params[0].name, "sender");
        let event = interface.events().next().unwrap();
        assert_eq!((event.ty.as_str(), event.name.as_str()), ("HelloHandler?", "hello"));

        let class = class_of(&unit);
        let event = class.events().next().unwrap();
        assert_eq!(event.ty, "IClient.HelloHandler?");
        let ctor = class.constructor().unwrap();
        assert_eq!(ctor.body.len(), 2);
        let Stmt::Expr(Expr::Call { type_args, args, .. }) = &ctor.body[1] else { panic!("subscription") };
        assert!(type_args.is_empty());
        assert_eq!(args[1], Expr::Str("hello".into()));
        assert_eq!(expr(&args[2]), "() => hello?.Invoke(this)");
    }

    #[test]
    fn outgoing_greet_scenario() {
        let unit = codegen().lower(&model(vec![], vec![method("greet", None, vec![param("string", "name")])])).unwrap();
        let class = class_of(&unit);
        let methods: Vec<_> = class.methods().collect();
        assert_eq!(methods.len(), 2);

        let plain = methods[0];
        assert_eq!(plain.return_type, "void");
        assert_eq!(plain.params.len(), 1);
        assert_eq!(
            expr(plain.body.as_ref().unwrap()),
            "_ = greet(name, System.Threading.CancellationToken.None)"
        );

        let cancellable = methods[1];
        assert_eq!(cancellable.return_type, "System.Threading.Tasks.Task");
        assert_eq!(cancellable.params.len(), 2);
        assert_eq!(cancellable.params[1].ty, "System.Threading.CancellationToken");
        assert_eq!(
            expr(cancellable.body.as_ref().unwrap()),
            "await Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.InvokeAsync(HubConnection, \"greet\", name, cancellationToken)"
        );

        let interface = interface_of(&unit);
        assert_eq!(interface.bases, ["App.ToServer"]);
        let declared: Vec<_> = interface.methods().collect();
        assert_eq!(declared.len(), 1);
        assert_eq!(declared[0].params, cancellable.params);
        assert!(declared[0].body.is_none());
    }

    #[test]
    fn zero_parameter_outgoing_call_sites() {
        let unit = codegen()
            .lower(&model(vec![], vec![method("ping", Some("System.Threading.Tasks.Task"), vec![])]))
            .unwrap();
        let methods: Vec<_> = class_of(&unit).methods().collect();
        assert_eq!(expr(methods[0].body.as_ref().unwrap()), "ping(System.Threading.CancellationToken.None)");
        assert_eq!(
            expr(methods[1].body.as_ref().unwrap()),
            "await Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.InvokeAsync(HubConnection, \"ping\", cancellationToken)"
        );
    }

    #[test]
    fn value_results_use_generic_invoke() {
        let unit = codegen()
            .lower(&model(vec![], vec![
                method("count", Some("System.Threading.Tasks.Task<int>"), vec![]),
                method("now", Some("long"), vec![]),
            ]))
            .unwrap();
        let methods: Vec<_> = class_of(&unit).methods().collect();
        assert_eq!(methods[1].return_type, "System.Threading.Tasks.Task<int>");
        assert!(expr(methods[1].body.as_ref().unwrap()).contains("InvokeAsync<int>(HubConnection, \"count\""));
        assert_eq!(methods[2].return_type, "long");
        assert_eq!(
            expr(methods[2].body.as_ref().unwrap()),
            "now(System.Threading.CancellationToken.None).GetAwaiter().GetResult()"
        );
        assert_eq!(methods[3].return_type, "System.Threading.Tasks.Task<long>");
        assert!(expr(methods[3].body.as_ref().unwrap()).contains("InvokeAsync<long>("));
    }

    #[test]
    fn defaults_and_variadics_stay_legal() {
        let mut retries = param("int", "retries");
        retries.default_value = Some("3".into());
        let mut rest = param("string[]", "rest");
        rest.is_variadic = true;
        let unit = codegen()
            .lower(&model(vec![], vec![method("send", None, vec![retries, rest])]))
            .unwrap();
        let methods: Vec<_> = class_of(&unit).methods().collect();

        let plain = &methods[0].params;
        assert_eq!(plain[0].default, Some(Expr::Literal("3".into())));
        assert!(plain[1].is_params);

        let cancellable = &methods[1].params;
        assert_eq!(cancellable[0].default, Some(Expr::Literal("3".into())));
        assert!(!cancellable[1].is_params);
        assert_eq!(cancellable[1].default, Some(Expr::Literal("default".into())));
        assert_eq!(cancellable[2].default, Some(Expr::Literal("default".into())));
        // defaults never reach the wire call
        assert_eq!(
            expr(methods[1].body.as_ref().unwrap()),
            "await Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.InvokeAsync(HubConnection, \"send\", retries, rest, cancellationToken)"
        );
    }

    #[test]
    fn incoming_closures_follow_completion() {
        let mut maybe = param("string", "who");
        maybe.nullable = true;
        let unit = codegen()
            .lower(&model(
                vec![
                    method("greeted", Some("System.Threading.Tasks.Task"), vec![maybe, param("int", "times")]),
                    method("ask", Some("System.Threading.Tasks.Task<bool>"), vec![param("string", "question")]),
                    method("peek", Some("int"), vec![]),
                    method("tick", Some("System.Threading.Tasks.ValueTask"), vec![]),
                ],
                vec![],
            ))
            .unwrap();
        let ctor = class_of(&unit).constructor().unwrap();
        let rendered: Vec<String> = ctor.body[1..]
            .iter()
            .map(|s| match s {
                Stmt::Expr(e) => expr(e),
                Stmt::Assign { .. } => panic!("unexpected assignment"),
            })
            .collect();
        let on = "Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.On";
        assert_eq!(rendered, [
            format!("{on}<string?, int>(HubConnection, \"greeted\", async (string? who, int times) => await (greeted?.Invoke(this, who, times) ?? System.Threading.Tasks.Task.CompletedTask))"),
            format!("{on}<string, bool>(HubConnection, \"ask\", async (string question) => await (ask?.Invoke(this, question) ?? System.Threading.Tasks.Task.FromResult<bool>(default!)))"),
            format!("{on}<int>(HubConnection, \"peek\", () => peek?.Invoke(this) ?? default!)"),
            format!("{on}(HubConnection, \"tick\", async () => await (tick?.Invoke(this) ?? System.Threading.Tasks.ValueTask.CompletedTask))"),
        ]);
        let delegate = interface_of(&unit).delegates().next().unwrap();
        assert_eq!(delegate.return_type, "System.Threading.Tasks.Task");
        assert_eq!(delegate.params[1].ty, "string?");
    }

    #[test]
    fn colliding_synthetic_names_are_renamed() {
        let unit = codegen()
            .lower(&model(
                vec![method("moved", None, vec![param("object", "sender")])],
                vec![method("stop", None, vec![param("bool", "cancellationToken")])],
            ))
            .unwrap();
        let delegate = interface_of(&unit).delegates().next().unwrap();
        assert_eq!(delegate.params[0].name, "sender_");
        assert_eq!(delegate.params[1].name, "sender");
        let cancellable = class_of(&unit).methods().nth(1).unwrap();
        assert_eq!(cancellable.params[1].name, "cancellationToken_");
    }

    #[test]
    fn keywords_are_escaped_but_wire_keys_are_not() {
        let unit = codegen()
            .lower(&model(vec![method("event", None, vec![param("string", "object")])], vec![]))
            .unwrap();
        let ctor = class_of(&unit).constructor().unwrap();
        let Stmt::Expr(sub) = &ctor.body[1] else { panic!() };
        assert_eq!(
            expr(sub),
            "Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.On<string>(HubConnection, \"event\", (string @object) => @event?.Invoke(this, @object))"
        );
        assert_eq!(interface_of(&unit).delegates().next().unwrap().name, "EventHandler");
    }

    #[test]
    fn handler_names_only_capitalize_the_first_letter() {
        assert_eq!(handler_name("getURL"), "GetURLHandler");
        assert_eq!(handler_name("sendHTTPRequest"), "SendHTTPRequestHandler");
        assert_eq!(handler_name("hello"), "HelloHandler");
        assert_eq!(handler_name("_internal"), "_internalHandler");
        assert_eq!(handler_name("\u{e9}v\u{e9}nement"), "\u{c9}v\u{e9}nementHandler");
    }

    #[test]
    fn await_is_escaped_in_async_signatures_and_closures() {
        let unit = codegen()
            .lower(&model(
                vec![method("tick", Some("System.Threading.Tasks.Task"), vec![param("int", "await")])],
                vec![method("wait", None, vec![param("int", "await")])],
            ))
            .unwrap();
        let cancellable = class_of(&unit).methods().nth(1).unwrap();
        assert_eq!(cancellable.params[0].name, "@await");
        assert_eq!(
            expr(cancellable.body.as_ref().unwrap()),
            "await Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.InvokeAsync(HubConnection, \"wait\", @await, cancellationToken)"
        );
        let ctor = class_of(&unit).constructor().unwrap();
        let Stmt::Expr(sub) = &ctor.body[1] else { panic!() };
        assert!(expr(sub).ends_with(
            "(HubConnection, \"tick\", async (int @await) => await (tick?.Invoke(this, @await) ?? System.Threading.Tasks.Task.CompletedTask))"
        ));
    }

    #[test]
    fn annotated_nullable_types_are_not_marked_twice() {
        let mut who = param("string?", "who");
        who.nullable = true;
        let unit = codegen()
            .lower(&model(
                vec![method("greeted", None, vec![who.clone()])],
                vec![method("greet", None, vec![who])],
            ))
            .unwrap();

        let class = class_of(&unit);
        for m in class.methods() {
            assert_eq!(m.params[0].ty, "string?");
        }
        assert_eq!(interface_of(&unit).methods().next().unwrap().params[0].ty, "string?");
        assert_eq!(interface_of(&unit).delegates().next().unwrap().params[1].ty, "string?");

        let ctor = class.constructor().unwrap();
        let Stmt::Expr(Expr::Call { type_args, args, .. }) = &ctor.body[1] else { panic!("subscription") };
        assert_eq!(type_args, &["string?"]);
        let Expr::Lambda { params, .. } = &args[2] else { panic!("closure") };
        assert_eq!(params[0].ty, "string?");

        assert!(!render(&unit).contains("string??"));
    }

    #[test]
    fn unspecified_visibility_and_global_namespace() {
        let mut m = model(vec![method("hello", None, vec![])], vec![]);
        m.visibility = Visibility::Unspecified;
        m.namespace.clear();
        let unit = codegen().lower(&m).unwrap();
        assert_eq!(unit.namespace, None);
        assert_eq!(class_of(&unit).modifiers, ["partial"]);
    }

    #[test]
    fn malformed_names_are_hard_errors() {
        let bad_method = model(vec![method("not valid", None, vec![])], vec![]);
        assert_eq!(
            codegen().emit(&bad_method),
            Err(EmitError::InvalidIdentifier { what: "method", name: "not valid".into() })
        );
        let bad_type = model(vec![method("ok", None, vec![param("int; DropTables()", "x")])], vec![]);
        assert!(matches!(codegen().emit(&bad_type), Err(EmitError::UnsupportedTypeName(_))));
        let generic = model(vec![method("ok", None, vec![param("System.Collections.Generic.Dictionary<string, int[]>?", "x")])], vec![]);
        assert!(codegen().emit(&generic).is_ok());
    }

    #[test]
    fn emitted_text_layout() {
        let text = codegen()
            .emit(&model(vec![method("hello", Some("System.Threading.Tasks.Task"), vec![])], vec![method("greet", None, vec![param("string", "name")])]))
            .unwrap();
        let attrs = "[System.Diagnostics.DebuggerNonUserCode, System.Diagnostics.CodeAnalysis.ExcludeFromCodeCoverage, System.CodeDom.Compiler.GeneratedCode(\"gen\", \"1.2.3\")]";
        let event_attrs = "[System.Diagnostics.CodeAnalysis.ExcludeFromCodeCoverage, System.CodeDom.Compiler.GeneratedCode(\"gen\", \"1.2.3\")]";
        let expected = format!("\
// <auto-generated/>
#nullable enable

namespace App;

internal partial class Client: IClient {{

    {attrs}
    public Microsoft.AspNetCore.SignalR.Client.HubConnection HubConnection {{ get; }}

    {attrs}
    public void greet(string name) => _ = greet(name, System.Threading.CancellationToken.None);

    {attrs}
    public async System.Threading.Tasks.Task greet(string name, System.Threading.CancellationToken cancellationToken) =>
        await Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.InvokeAsync(HubConnection, \"greet\", name, cancellationToken);

    {event_attrs}
    public event IClient.HelloHandler? hello;

    {attrs}
    public Client(Microsoft.AspNetCore.SignalR.Client.HubConnection hubConnection) {{
        HubConnection = hubConnection;
        Microsoft.AspNetCore.SignalR.Client.HubConnectionExtensions.On(HubConnection, \"hello\", async () => await (hello?.Invoke(this) ?? System.Threading.Tasks.Task.CompletedTask));
    }}

}}

[System.CodeDom.Compiler.GeneratedCode(\"gen\", \"1.2.3\")]
public interface IClient: App.ToServer {{

    System.Threading.Tasks.Task greet(string name, System.Threading.CancellationToken cancellationToken);

    delegate System.Threading.Tasks.Task HelloHandler(IClient sender);
    event HelloHandler? hello;

}}
");
        assert_eq!(text, expected);
    }

    #[test]
    fn marker_attribute_source() {
        let text = codegen().marker_attribute("HubStubs.GenerateHubClientAttribute").unwrap();
        assert!(text.starts_with("// <auto-generated/>\n#nullable enable\n\nnamespace HubStubs;\n"));
        assert!(text.contains("[System.AttributeUsage(System.AttributeTargets.Class, Inherited = false, AllowMultiple = false)]"));
        assert!(text.contains("internal sealed class GenerateHubClientAttribute(): System.Attribute {"));
        assert!(text.contains("    public required System.Type[] Incoming { get; init; }\n"));
        assert!(text.contains("    public System.Type[] Outgoing { get; init; } = [];\n"));
        assert!(text.contains("[GenerateHubClient(Incoming = [typeof(EventsToClient)]"));
        assert!(codegen().marker_attribute("Bad Name").is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn name() -> impl Strategy<Value = String> {
            "[a-z][A-Za-z0-9]{0,8}"
        }

        fn ty() -> impl Strategy<Value = String> {
            prop_oneof![
                Just("int".to_string()),
                Just("string".to_string()),
                Just("System.Collections.Generic.List<string>".to_string()),
            ]
        }

        fn signature() -> impl Strategy<Value = MethodSignature> {
            (
                name(),
                prop::option::of(prop_oneof![
                    Just("System.Threading.Tasks.Task".to_string()),
                    Just("System.Threading.Tasks.Task<int>".to_string()),
                    Just("bool".to_string()),
                ]),
                prop::collection::vec((ty(), name(), any::<bool>()), 0..4),
            )
                .prop_map(|(n, ret, ps)| MethodSignature {
                    name: n,
                    return_type: ret.map_or(ReturnType::Void, |t| ReturnType::Type(TypeRef::new(t))),
                    parameters: ps
                        .into_iter()
                        .enumerate()
                        .map(|(i, (t, n, nullable))| ParameterSignature {
                            ty: TypeRef::new(t),
                            name: format!("{n}{i}"),
                            nullable,
                            default_value: None,
                            is_variadic: false,
                        })
                        .collect(),
                })
        }

        proptest! {
            #[test]
            fn emission_is_deterministic(incoming in prop::collection::vec(signature(), 0..4),
                                         outgoing in prop::collection::vec(signature(), 0..4)) {
                let m = model(incoming, outgoing);
                let first = codegen().emit(&m).unwrap();
                let second = codegen().emit(&m.clone()).unwrap();
                prop_assert_eq!(first, second);
            }

            #[test]
            fn every_outgoing_method_gets_both_overloads(outgoing in prop::collection::vec(signature(), 1..4)) {
                let m = model(vec![], outgoing.clone());
                let unit = codegen().lower(&m).unwrap();
                let class_methods: Vec<_> = class_of(&unit).methods().collect();
                let declared: Vec<_> = interface_of(&unit).methods().collect();
                prop_assert_eq!(class_methods.len(), outgoing.len() * 2);
                prop_assert_eq!(declared.len(), outgoing.len());
                for (i, sig) in outgoing.iter().enumerate() {
                    prop_assert_eq!(class_methods[2 * i].params.len(), sig.parameters.len());
                    prop_assert_eq!(class_methods[2 * i + 1].params.len(), sig.parameters.len() + 1);
                    prop_assert_eq!(&declared[i].params, &class_methods[2 * i + 1].params);
                }
            }
        }
    }
}
