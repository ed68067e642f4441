//! Prints a [`CompilationUnit`] as C# source.
//!
//! This is the only place text is assembled. Output is `\n`-terminated,
//! indented with four spaces, and depends on nothing but the tree.
use crate::syntax::{
    Accessor, Attribute, AttributeList, CompilationUnit, Expr, Member, Param, Stmt, TypeDecl,
    TypeKeyword, string_literal,
};

/// Expression bodies longer than this move to their own line.
const MAX_INLINE_WIDTH: usize = 120;

/// Line-oriented writer that tracks the current indentation.
pub struct CodeWriter {
    out: String,
    level: usize,
    indent: &'static str,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self { out: String::new(), level: 0, indent: "    " }
    }

    /// Write one line at the current indentation. Empty text writes a bare newline.
    pub fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.level {
                self.out.push_str(self.indent);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.level += 1;
        f(self);
        self.level -= 1;
    }

    /// `header {`, indented body, `}`.
    pub fn block(&mut self, header: &str, f: impl FnOnce(&mut Self)) {
        self.line(&format!("{header} {{"));
        self.indented(f);
        self.line("}");
    }

    pub fn width(&self) -> usize {
        self.level * self.indent.len()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render(unit: &CompilationUnit) -> String {
    let mut w = CodeWriter::new();
    for line in &unit.header {
        w.line(&format!("// {line}"));
    }
    if unit.nullable_enable {
        w.line("#nullable enable");
    }
    if !unit.header.is_empty() || unit.nullable_enable {
        w.blank();
    }
    if let Some(ns) = &unit.namespace {
        w.line(&format!("namespace {ns};"));
        w.blank();
    }
    for (i, decl) in unit.types.iter().enumerate() {
        if i > 0 {
            w.blank();
        }
        type_decl(&mut w, decl);
    }
    w.finish()
}

fn type_decl(w: &mut CodeWriter, decl: &TypeDecl) {
    for doc in &decl.docs {
        w.line(&format!("/// {doc}"));
    }
    attribute_lists(w, &decl.attributes);

    let keyword = match decl.keyword {
        TypeKeyword::Class => "class",
        TypeKeyword::Interface => "interface",
    };
    let mut header = words(&decl.modifiers, &[keyword, &decl.name]);
    if decl.primary_constructor {
        header.push_str("()");
    }
    if !decl.bases.is_empty() {
        header.push_str(": ");
        header.push_str(&decl.bases.join(", "));
    }

    w.line(&format!("{header} {{"));
    if !decl.members.is_empty() {
        w.blank();
        w.indented(|w| {
            for m in &decl.members {
                member(w, m);
                // a delegate sits right above the event that uses it
                if !matches!(m, Member::Delegate(_)) {
                    w.blank();
                }
            }
        });
    }
    w.line("}");
}

fn member(w: &mut CodeWriter, m: &Member) {
    match m {
        Member::Property(p) => {
            attribute_lists(w, &p.attributes);
            let accessors = p
                .accessors
                .iter()
                .map(|a| match a {
                    Accessor::Get => "get;",
                    Accessor::Init => "init;",
                })
                .collect::<Vec<_>>()
                .join(" ");
            let mut text = format!("{} {{ {accessors} }}", words(&p.modifiers, &[&p.ty, &p.name]));
            if let Some(init) = &p.initializer {
                text.push_str(&format!(" = {};", expr(init)));
            }
            w.line(&text);
        }
        Member::Method(method) => {
            attribute_lists(w, &method.attributes);
            let signature = format!(
                "{}({})",
                words(&method.modifiers, &[&method.return_type, &method.name]),
                params(&method.params)
            );
            match &method.body {
                None => w.line(&format!("{signature};")),
                Some(body) => {
                    let body = expr(body);
                    if w.width() + signature.len() + body.len() + 5 <= MAX_INLINE_WIDTH {
                        w.line(&format!("{signature} => {body};"));
                    } else {
                        w.line(&format!("{signature} =>"));
                        w.indented(|w| w.line(&format!("{body};")));
                    }
                }
            }
        }
        Member::Constructor(ctor) => {
            attribute_lists(w, &ctor.attributes);
            let header = format!("{}({})", words(&ctor.modifiers, &[&ctor.name]), params(&ctor.params));
            w.block(&header, |w| {
                for s in &ctor.body {
                    w.line(&format!("{};", stmt(s)));
                }
            });
        }
        Member::Event(event) => {
            attribute_lists(w, &event.attributes);
            w.line(&format!("{};", words(&event.modifiers, &["event", &event.ty, &event.name])));
        }
        Member::Delegate(d) => {
            w.line(&format!(
                "{}({});",
                words(&d.modifiers, &["delegate", &d.return_type, &d.name]),
                params(&d.params)
            ));
        }
    }
}

fn attribute_lists(w: &mut CodeWriter, lists: &[AttributeList]) {
    for list in lists {
        if !list.0.is_empty() {
            w.line(&format!("[{}]", list.0.iter().map(attribute).collect::<Vec<_>>().join(", ")));
        }
    }
}

fn attribute(a: &Attribute) -> String {
    if a.args.is_empty() {
        return a.name.clone();
    }
    let args = a
        .args
        .iter()
        .map(|arg| match &arg.name {
            Some(name) => format!("{name} = {}", expr(&arg.value)),
            None => expr(&arg.value),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({args})", a.name)
}

/// Modifiers followed by the given words, single-space separated, empties skipped.
fn words(modifiers: &[String], rest: &[&str]) -> String {
    modifiers
        .iter()
        .map(String::as_str)
        .chain(rest.iter().copied())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn params(ps: &[Param]) -> String {
    ps.iter().map(param).collect::<Vec<_>>().join(", ")
}

fn param(p: &Param) -> String {
    let mut out = String::new();
    if p.is_params {
        out.push_str("params ");
    }
    out.push_str(&p.ty);
    out.push(' ');
    out.push_str(&p.name);
    if let Some(default) = &p.default {
        out.push_str(" = ");
        out.push_str(&expr(default));
    }
    out
}

fn stmt(s: &Stmt) -> String {
    match s {
        Stmt::Assign { target, value } => format!("{} = {}", expr(target), expr(value)),
        Stmt::Expr(e) => expr(e),
    }
}

pub fn expr(e: &Expr) -> String {
    match e {
        Expr::Ident(s) | Expr::Literal(s) => s.clone(),
        Expr::Str(s) => string_literal(s),
        Expr::This => "this".to_string(),
        Expr::DefaultValue => "default!".to_string(),
        Expr::Member { target, name } => format!("{}.{name}", operand(target)),
        Expr::Call { callee, type_args, args } => {
            let generics = if type_args.is_empty() {
                String::new()
            } else {
                format!("<{}>", type_args.join(", "))
            };
            format!("{}{generics}({})", operand(callee), exprs(args))
        }
        Expr::ConditionalInvoke { target, args } => {
            format!("{}?.Invoke({})", operand(target), exprs(args))
        }
        Expr::Await(inner) => format!("await {}", operand(inner)),
        Expr::Coalesce(lhs, rhs) => {
            let rhs = match rhs.as_ref() {
                Expr::Discard(_) | Expr::Lambda { .. } => format!("({})", expr(rhs)),
                _ => expr(rhs),
            };
            format!("{} ?? {rhs}", operand(lhs))
        }
        Expr::Discard(inner) => format!("_ = {}", expr(inner)),
        Expr::Lambda { is_async, params: ps, body } => {
            let prefix = if *is_async { "async " } else { "" };
            format!("{prefix}({}) => {}", params(ps), expr(body))
        }
    }
}

fn exprs(es: &[Expr]) -> String {
    es.iter().map(expr).collect::<Vec<_>>().join(", ")
}

/// Parenthesize anything that binds looser than member access.
fn operand(e: &Expr) -> String {
    match e {
        Expr::Await(_) | Expr::Coalesce(..) | Expr::Discard(_) | Expr::Lambda { .. } => {
            format!("({})", expr(e))
        }
        _ => expr(e),
    }
}
