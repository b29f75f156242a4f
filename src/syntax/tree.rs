//! Immutable declaration tree.
//!
//! Declarations are parsed structurally down to member signatures; method
//! bodies, initializers and other expressions stay as token runs. Every node
//! can be rendered back to source text without loss.
//!
//! Nodes are plain values. Operations that "change" a tree return a new
//! tree; member lists use [`im::Vector`] so the unchanged parts are shared.

use super::modifiers::Visibility;
use super::token::{compact, Token, TokenKind};
use im::Vector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub items: Vector<Item>,
    pub eof: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Using(UsingDirective),
    Namespace(NamespaceDecl),
    Type(TypeDecl),
    /// Anything else at namespace level: assembly attributes, extern aliases.
    Raw(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingDirective {
    pub tokens: Vec<Token>,
}

impl UsingDirective {
    /// The directive without `using`, `global` and `;`, e.g. `System.Linq`
    /// or `static System.Math`.
    pub fn target(&self) -> String {
        let inner: Vec<Token> = self
            .tokens
            .iter()
            .skip_while(|t| t.is("global") || t.is("using"))
            .take_while(|t| !t.is(";"))
            .cloned()
            .collect();
        compact(&inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// `namespace` keyword and the dotted name.
    pub header: Vec<Token>,
    pub name: String,
    /// `{` for block namespaces, `;` for file-scoped ones.
    pub open: Token,
    pub items: Vector<Item>,
    pub close: Option<Token>,
    pub trailing: Option<Token>,
}

impl NamespaceDecl {
    pub fn is_file_scoped(&self) -> bool {
        self.open.is(";")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Record,
    Enum,
}

impl TypeKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "class" => Some(TypeKind::Class),
            "struct" => Some(TypeKind::Struct),
            "interface" => Some(TypeKind::Interface),
            "record" => Some(TypeKind::Record),
            "enum" => Some(TypeKind::Enum),
            _ => None,
        }
    }

    /// Whether methods with bodies can be added to the type.
    pub fn accepts_methods(self) -> bool {
        matches!(self, TypeKind::Class | TypeKind::Struct | TypeKind::Record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub attributes: Vec<Token>,
    pub modifiers: Vec<Token>,
    /// `class`, `struct`, `record class`, ...
    pub keywords: Vec<Token>,
    pub kind: TypeKind,
    pub name: Token,
    /// Type parameters, primary constructor, base list and constraints.
    pub header: Vec<Token>,
    pub body: TypeBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBody {
    Members {
        open: Token,
        members: Vector<Member>,
        close: Token,
        trailing: Option<Token>,
    },
    /// Enum bodies and positional records without a body.
    Raw(Vec<Token>),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        self.name.ident_name()
    }

    pub fn members(&self) -> Vector<Member> {
        match &self.body {
            TypeBody::Members { members, .. } => members.clone(),
            TypeBody::Raw(_) => Vector::new(),
        }
    }

    pub fn is_generic(&self) -> bool {
        self.header.first().is_some_and(|t| t.is("<"))
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.iter().any(|m| m.is("static"))
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_modifiers(&self.modifiers)
    }

    /// Base class and interface names with namespaces, generic arguments and
    /// primary constructor arguments stripped.
    pub fn base_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut depth = 0i32;
        let mut in_bases = false;
        let mut current: Option<String> = None;
        let mut angle = 0i32;
        for token in &self.header {
            if token.kind.is_open() {
                depth += 1;
                continue;
            }
            if token.kind.is_close() {
                depth -= 1;
                continue;
            }
            if depth > 0 {
                continue;
            }
            if token.is("<") {
                angle += 1;
                continue;
            }
            if token.is(">") {
                angle -= 1;
                continue;
            }
            if angle > 0 {
                continue;
            }
            if token.is("where") {
                break;
            }
            if token.is(":") && !in_bases {
                in_bases = true;
                continue;
            }
            if !in_bases {
                continue;
            }
            if token.is(",") {
                names.extend(current.take());
            } else if token.is_ident() {
                current = Some(token.ident_name().to_string());
            }
        }
        names.extend(current);
        names
    }

    /// Returns a copy with `members` as the new member list.
    pub fn with_members(&self, members: Vector<Member>) -> TypeDecl {
        let mut updated = self.clone();
        if let TypeBody::Members {
            members: ref mut slot,
            ..
        } = updated.body
        {
            *slot = members;
        }
        updated
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodDecl> {
        self.members().into_iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn methods_named<'a>(&self, name: &'a str) -> impl Iterator<Item = MethodDecl> + 'a {
        self.methods().filter(move |m| m.name() == name)
    }

    pub fn constructors(&self) -> impl Iterator<Item = ConstructorDecl> {
        self.members().into_iter().filter_map(|m| match m {
            Member::Constructor(ctor) => Some(ctor),
            _ => None,
        })
    }

    /// Names declared directly in this type.
    pub fn member_names(&self) -> Vec<String> {
        self.members()
            .iter()
            .flat_map(|m| m.declared_names())
            .collect()
    }

    pub fn nested_types(&self) -> impl Iterator<Item = TypeDecl> {
        self.members().into_iter().filter_map(|m| match m {
            Member::Type(ty) => Some(ty),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Method(MethodDecl),
    Constructor(ConstructorDecl),
    Field(FieldDecl),
    Property(PropertyDecl),
    Type(TypeDecl),
    Delegate(DelegateDecl),
    /// Indexers, operators, finalizers, explicit interface implementations.
    Other(Vec<Token>),
}

impl Member {
    pub fn declared_names(&self) -> Vec<String> {
        match self {
            Member::Method(m) => vec![m.name().to_string()],
            Member::Constructor(_) | Member::Other(_) => Vec::new(),
            Member::Field(f) => f.names.clone(),
            Member::Property(p) => vec![p.name.ident_name().to_string()],
            Member::Type(t) => vec![t.name().to_string()],
            Member::Delegate(d) => vec![d.name.clone()],
        }
    }

    pub fn modifiers(&self) -> &[Token] {
        match self {
            Member::Method(m) => &m.modifiers,
            Member::Constructor(c) => &c.modifiers,
            Member::Field(f) => &f.modifiers,
            Member::Property(p) => &p.modifiers,
            Member::Type(t) => &t.modifiers,
            Member::Delegate(d) => &d.modifiers,
            Member::Other(_) => &[],
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers().iter().any(|m| m.is("static") || m.is("const"))
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_modifiers(self.modifiers())
    }

    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        match self {
            Member::Method(m) => m.collect_tokens(&mut out),
            Member::Constructor(c) => c.collect_tokens(&mut out),
            Member::Field(f) => {
                out.extend(&f.attributes);
                out.extend(&f.modifiers);
                out.extend(&f.ty);
                out.extend(&f.declarators);
            }
            Member::Property(p) => {
                out.extend(&p.attributes);
                out.extend(&p.modifiers);
                out.extend(&p.ty);
                out.push(&p.name);
                out.extend(&p.rest);
            }
            Member::Type(t) => t.collect_tokens(&mut out),
            Member::Delegate(d) => out.extend(&d.tokens),
            Member::Other(tokens) => out.extend(tokens),
        }
        out
    }

    pub fn tokens_mut(&mut self) -> Vec<&mut Token> {
        let mut out = Vec::new();
        match self {
            Member::Method(m) => m.collect_tokens_mut(&mut out),
            Member::Constructor(c) => c.collect_tokens_mut(&mut out),
            Member::Field(f) => {
                out.extend(f.attributes.iter_mut());
                out.extend(f.modifiers.iter_mut());
                out.extend(f.ty.iter_mut());
                out.extend(f.declarators.iter_mut());
            }
            Member::Property(p) => {
                out.extend(p.attributes.iter_mut());
                out.extend(p.modifiers.iter_mut());
                out.extend(p.ty.iter_mut());
                out.push(&mut p.name);
                out.extend(p.rest.iter_mut());
            }
            Member::Type(t) => t.collect_tokens_mut(&mut out),
            Member::Delegate(d) => out.extend(d.tokens.iter_mut()),
            Member::Other(tokens) => out.extend(tokens.iter_mut()),
        }
        out
    }

    pub fn first_token_mut(&mut self) -> Option<&mut Token> {
        self.tokens_mut().into_iter().next()
    }

    pub fn leading_trivia(&self) -> String {
        self.tokens()
            .first()
            .map(|t| t.leading.clone())
            .unwrap_or_default()
    }

    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for token in self.tokens() {
            token.write_to(&mut out);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Attributes and `this`/`ref`/`out`/`in`/`params`/`scoped`.
    pub prefix: Vec<Token>,
    pub ty: Vec<Token>,
    pub name: Token,
    /// `= value`, empty when the parameter is required.
    pub default: Vec<Token>,
}

impl Param {
    pub fn new(ty: &str, name: &str) -> Self {
        Param {
            prefix: Vec::new(),
            ty: vec![Token::ident(ty).with_leading("")],
            name: Token::ident(name).with_leading(" "),
            default: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.ident_name()
    }

    pub fn is_optional(&self) -> bool {
        !self.default.is_empty() || self.has_modifier("params")
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.prefix.iter().any(|t| t.is(modifier))
    }

    /// The argument-passing keyword this parameter requires at call sites.
    pub fn passing_modifier(&self) -> Option<&'static str> {
        ["ref", "out", "in"]
            .into_iter()
            .find(|m| self.has_modifier(m))
    }

    pub fn type_text(&self) -> String {
        compact(&self.ty)
    }

    fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.prefix
            .iter()
            .chain(&self.ty)
            .chain(std::iter::once(&self.name))
            .chain(&self.default)
    }

    fn tokens_mut(&mut self) -> impl Iterator<Item = &mut Token> {
        self.prefix
            .iter_mut()
            .chain(self.ty.iter_mut())
            .chain(std::iter::once(&mut self.name))
            .chain(self.default.iter_mut())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamList {
    pub open: Token,
    pub params: Vec<Param>,
    pub separators: Vec<Token>,
    pub close: Token,
}

impl ParamList {
    /// Inserts `param` at `index`, fixing up separators and spacing.
    pub fn insert(&mut self, index: usize, mut param: Param) {
        let index = index.min(self.params.len());
        if self.params.is_empty() {
            set_first_leading(&mut param, "");
            self.params.push(param);
            return;
        }
        if index == 0 {
            let old_leading = self.params[0].first_leading();
            set_first_leading(&mut param, &old_leading);
            set_first_leading(&mut self.params[0], " ");
            self.params.insert(0, param);
            self.separators.insert(0, Token::punct(","));
        } else {
            set_first_leading(&mut param, " ");
            self.params.insert(index, param);
            self.separators.insert(index - 1, Token::punct(","));
        }
    }

    pub fn remove(&mut self, index: usize) -> Param {
        let removed = self.params.remove(index);
        if !self.separators.is_empty() {
            let sep = if index == 0 { 0 } else { index - 1 };
            self.separators.remove(sep);
        }
        if index == 0 {
            if let Some(first) = self.params.first_mut() {
                set_first_leading(first, &removed.first_leading());
            }
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name().to_string()).collect()
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Token>) {
        out.push(&self.open);
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push(&self.separators[i - 1]);
            }
            out.extend(param.tokens());
        }
        out.push(&self.close);
    }

    fn collect_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Token>) {
        out.push(&mut self.open);
        let mut separators = self.separators.iter_mut();
        for (i, param) in self.params.iter_mut().enumerate() {
            if i > 0 {
                if let Some(sep) = separators.next() {
                    out.push(sep);
                }
            }
            out.extend(param.tokens_mut());
        }
        out.push(&mut self.close);
    }
}

impl Param {
    fn first_leading(&self) -> String {
        self.tokens()
            .next()
            .map(|t| t.leading.clone())
            .unwrap_or_default()
    }
}

fn set_first_leading(param: &mut Param, leading: &str) {
    if let Some(first) = param.tokens_mut().next() {
        first.leading = leading.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodBody {
    /// `{ ... }`, braces included.
    Block(Vec<Token>),
    Arrow {
        arrow: Token,
        expr: Vec<Token>,
        semi: Token,
    },
    /// Abstract, extern, partial and interface declarations.
    Semicolon(Token),
}

impl MethodBody {
    pub fn tokens(&self) -> Vec<&Token> {
        match self {
            MethodBody::Block(tokens) => tokens.iter().collect(),
            MethodBody::Arrow { arrow, expr, semi } => {
                let mut out = vec![arrow];
                out.extend(expr);
                out.push(semi);
                out
            }
            MethodBody::Semicolon(semi) => vec![semi],
        }
    }

    fn tokens_mut(&mut self) -> Vec<&mut Token> {
        match self {
            MethodBody::Block(tokens) => tokens.iter_mut().collect(),
            MethodBody::Arrow { arrow, expr, semi } => {
                let mut out = vec![arrow];
                out.extend(expr.iter_mut());
                out.push(semi);
                out
            }
            MethodBody::Semicolon(semi) => vec![semi],
        }
    }

    /// The tokens that make up executable code: the block contents or the
    /// arrow expression.
    pub fn code(&self) -> &[Token] {
        match self {
            MethodBody::Block(tokens) => tokens,
            MethodBody::Arrow { expr, .. } => expr,
            MethodBody::Semicolon(_) => &[],
        }
    }

    pub fn with_code(&self, code: Vec<Token>) -> MethodBody {
        match self {
            MethodBody::Block(_) => MethodBody::Block(code),
            MethodBody::Arrow { arrow, semi, .. } => MethodBody::Arrow {
                arrow: arrow.clone(),
                expr: code,
                semi: semi.clone(),
            },
            MethodBody::Semicolon(semi) => MethodBody::Semicolon(semi.clone()),
        }
    }

    pub fn has_code(&self) -> bool {
        !matches!(self, MethodBody::Semicolon(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub attributes: Vec<Token>,
    pub modifiers: Vec<Token>,
    pub return_type: Vec<Token>,
    pub name: Token,
    pub type_params: Vec<Token>,
    pub params: ParamList,
    pub constraints: Vec<Token>,
    pub body: MethodBody,
}

impl MethodDecl {
    pub fn name(&self) -> &str {
        self.name.ident_name()
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m.is(modifier))
    }

    pub fn is_static(&self) -> bool {
        self.has_modifier("static")
    }

    pub fn is_async(&self) -> bool {
        self.has_modifier("async")
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_modifiers(&self.modifiers)
    }

    pub fn return_type_text(&self) -> String {
        compact(&self.return_type)
    }

    /// `void`, or a non-generic `Task`/`ValueTask` on an async method.
    pub fn returns_void(&self) -> bool {
        let ret = self.return_type_text();
        ret == "void"
            || (self.is_async()
                && matches!(
                    ret.as_str(),
                    "Task" | "ValueTask" | "System.Threading.Tasks.Task"
                ))
    }

    /// Type parameter names, e.g. `["T", "U"]` for `<T, U>`.
    pub fn type_param_names(&self) -> Vec<String> {
        self.type_params
            .iter()
            .filter(|t| t.is_ident() && !t.is("in") && !t.is("out"))
            .map(|t| t.text.clone())
            .collect()
    }

    pub fn signature_key(&self) -> (String, usize) {
        (self.name().to_string(), self.params.params.len())
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        out.extend(&self.attributes);
        out.extend(&self.modifiers);
        out.extend(&self.return_type);
        out.push(&self.name);
        out.extend(&self.type_params);
        self.params.collect(out);
        out.extend(&self.constraints);
        out.extend(self.body.tokens());
    }

    fn collect_tokens_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Token>) {
        out.extend(self.attributes.iter_mut());
        out.extend(self.modifiers.iter_mut());
        out.extend(self.return_type.iter_mut());
        out.push(&mut self.name);
        out.extend(self.type_params.iter_mut());
        self.params.collect_mut(out);
        out.extend(self.constraints.iter_mut());
        out.extend(self.body.tokens_mut());
    }

    pub fn to_source(&self) -> String {
        Member::Method(self.clone()).to_source()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDecl {
    pub attributes: Vec<Token>,
    pub modifiers: Vec<Token>,
    pub name: Token,
    pub params: ParamList,
    /// `: base(...)` or `: this(...)`.
    pub initializer: Vec<Token>,
    pub body: MethodBody,
}

impl ConstructorDecl {
    pub fn is_static(&self) -> bool {
        self.modifiers.iter().any(|m| m.is("static"))
    }

    /// Chains to another constructor of the same type via `: this(...)`.
    pub fn chains_to_this(&self) -> bool {
        self.initializer.get(1).is_some_and(|t| t.is("this"))
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        out.extend(&self.attributes);
        out.extend(&self.modifiers);
        out.push(&self.name);
        self.params.collect(out);
        out.extend(&self.initializer);
        out.extend(self.body.tokens());
    }

    fn collect_tokens_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Token>) {
        out.extend(self.attributes.iter_mut());
        out.extend(self.modifiers.iter_mut());
        out.push(&mut self.name);
        self.params.collect_mut(out);
        out.extend(self.initializer.iter_mut());
        out.extend(self.body.tokens_mut());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub attributes: Vec<Token>,
    pub modifiers: Vec<Token>,
    pub ty: Vec<Token>,
    /// Declarators, initializers and the terminating `;`.
    pub declarators: Vec<Token>,
    pub names: Vec<String>,
}

impl FieldDecl {
    pub fn type_text(&self) -> String {
        compact(&self.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDecl {
    pub attributes: Vec<Token>,
    pub modifiers: Vec<Token>,
    pub ty: Vec<Token>,
    pub name: Token,
    /// Accessor block or arrow body, plus an optional initializer.
    pub rest: Vec<Token>,
}

impl PropertyDecl {
    pub fn type_text(&self) -> String {
        compact(&self.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateDecl {
    pub modifiers: Vec<Token>,
    pub tokens: Vec<Token>,
    pub name: String,
}

impl TypeDecl {
    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        out.extend(&self.attributes);
        out.extend(&self.modifiers);
        out.extend(&self.keywords);
        out.push(&self.name);
        out.extend(&self.header);
        match &self.body {
            TypeBody::Members {
                open,
                members,
                close,
                trailing,
            } => {
                out.push(open);
                for member in members {
                    out.extend(member.tokens());
                }
                out.push(close);
                out.extend(trailing);
            }
            TypeBody::Raw(tokens) => out.extend(tokens),
        }
    }

    fn collect_tokens_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Token>) {
        out.extend(self.attributes.iter_mut());
        out.extend(self.modifiers.iter_mut());
        out.extend(self.keywords.iter_mut());
        out.push(&mut self.name);
        out.extend(self.header.iter_mut());
        match &mut self.body {
            TypeBody::Members {
                open,
                members,
                close,
                trailing,
            } => {
                out.push(open);
                for member in members.iter_mut() {
                    out.extend(member.tokens_mut());
                }
                out.push(close);
                out.extend(trailing.iter_mut());
            }
            TypeBody::Raw(tokens) => out.extend(tokens.iter_mut()),
        }
    }

    pub fn to_source(&self) -> String {
        Member::Type(self.clone()).to_source()
    }

    pub fn tokens_mut(&mut self) -> Vec<&mut Token> {
        let mut out = Vec::new();
        self.collect_tokens_mut(&mut out);
        out
    }

    /// The declaration's own tokens up to and including the opening brace.
    pub fn head_tokens_mut(&mut self) -> Vec<&mut Token> {
        let mut out: Vec<&mut Token> = Vec::new();
        out.extend(self.attributes.iter_mut());
        out.extend(self.modifiers.iter_mut());
        out.extend(self.keywords.iter_mut());
        out.push(&mut self.name);
        out.extend(self.header.iter_mut());
        if let TypeBody::Members { open, .. } = &mut self.body {
            out.push(open);
        }
        out
    }

    pub fn leading_trivia(&self) -> String {
        self.attributes
            .first()
            .or(self.modifiers.first())
            .or(self.keywords.first())
            .map(|t| t.leading.clone())
            .unwrap_or_default()
    }
}

impl Item {
    pub fn write_to(&self, out: &mut String) {
        match self {
            Item::Using(using) => using.tokens.iter().for_each(|t| t.write_to(out)),
            Item::Namespace(ns) => {
                ns.header.iter().for_each(|t| t.write_to(out));
                ns.open.write_to(out);
                ns.items.iter().for_each(|i| i.write_to(out));
                if let Some(close) = &ns.close {
                    close.write_to(out);
                }
                if let Some(trailing) = &ns.trailing {
                    trailing.write_to(out);
                }
            }
            Item::Type(ty) => out.push_str(&ty.to_source()),
            Item::Raw(tokens) => tokens.iter().for_each(|t| t.write_to(out)),
        }
    }

    pub fn first_token_mut(&mut self) -> Option<&mut Token> {
        match self {
            Item::Using(using) => using.tokens.first_mut(),
            Item::Namespace(ns) => ns.header.first_mut(),
            Item::Type(ty) => {
                let mut tokens = Vec::new();
                ty.collect_tokens_mut(&mut tokens);
                tokens.into_iter().next()
            }
            Item::Raw(tokens) => tokens.first_mut(),
        }
    }
}

impl CompilationUnit {
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            item.write_to(&mut out);
        }
        out.push_str(&self.eof);
        out
    }

    pub fn usings(&self) -> Vec<UsingDirective> {
        fn collect(items: &Vector<Item>, out: &mut Vec<UsingDirective>) {
            for item in items {
                match item {
                    Item::Using(using) => out.push(using.clone()),
                    Item::Namespace(ns) => collect(&ns.items, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.items, &mut out);
        out
    }

    /// All type declarations, depth first, with their namespace.
    pub fn types(&self) -> Vec<(Option<String>, TypeDecl)> {
        fn visit_type(ns: &Option<String>, ty: &TypeDecl, out: &mut Vec<(Option<String>, TypeDecl)>) {
            out.push((ns.clone(), ty.clone()));
            for nested in ty.nested_types() {
                visit_type(ns, &nested, out);
            }
        }
        fn visit(items: &Vector<Item>, ns: Option<String>, out: &mut Vec<(Option<String>, TypeDecl)>) {
            for item in items {
                match item {
                    Item::Type(ty) => visit_type(&ns, ty, out),
                    Item::Namespace(decl) => {
                        let name = match &ns {
                            Some(outer) => format!("{outer}.{}", decl.name),
                            None => decl.name.clone(),
                        };
                        visit(&decl.items, Some(name), out);
                    }
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        visit(&self.items, None, &mut out);
        out
    }

    pub fn find_type(&self, name: &str) -> Option<TypeDecl> {
        self.types()
            .into_iter()
            .map(|(_, ty)| ty)
            .find(|ty| ty.name() == name)
    }

    /// The declaration of `type_name` that contains a method named `method`,
    /// falling back to the first declaration for partial types.
    pub fn find_type_declaring(&self, type_name: &str, method: &str) -> Option<TypeDecl> {
        let candidates: Vec<TypeDecl> = self
            .types()
            .into_iter()
            .map(|(_, ty)| ty)
            .filter(|ty| ty.name() == type_name)
            .collect();
        candidates
            .iter()
            .find(|ty| ty.methods_named(method).next().is_some())
            .or_else(|| candidates.first())
            .cloned()
    }

    pub fn namespace_of(&self, type_name: &str) -> Option<String> {
        self.types()
            .into_iter()
            .find(|(_, ty)| ty.name() == type_name)
            .and_then(|(ns, _)| ns)
    }

    /// The type's name qualified by its containing types, e.g. `Outer.Inner`.
    pub fn type_path(&self, name: &str) -> Option<String> {
        fn search(ty: &TypeDecl, prefix: Option<&str>, name: &str) -> Option<String> {
            let path = match prefix {
                Some(outer) => format!("{outer}.{}", ty.name()),
                None => ty.name().to_string(),
            };
            if ty.name() == name {
                return Some(path);
            }
            ty.nested_types().find_map(|nested| search(&nested, Some(&path), name))
        }
        fn visit(items: &Vector<Item>, name: &str) -> Option<String> {
            items.iter().find_map(|item| match item {
                Item::Type(ty) => search(ty, None, name),
                Item::Namespace(ns) => visit(&ns.items, name),
                _ => None,
            })
        }
        visit(&self.items, name)
    }

    /// The first namespace declaration, if any.
    pub fn first_namespace(&self) -> Option<NamespaceDecl> {
        self.items.iter().find_map(|item| match item {
            Item::Namespace(ns) => Some(ns.clone()),
            _ => None,
        })
    }

    /// Returns a new unit where the first declaration equal to `original` is
    /// replaced with `replacement`. `None` when no declaration matched.
    pub fn replace_type(&self, original: &TypeDecl, replacement: TypeDecl) -> Option<CompilationUnit> {
        let items = replace_in_items(&self.items, original, &replacement)?;
        Some(CompilationUnit {
            items,
            eof: self.eof.clone(),
        })
    }
}

fn replace_in_items(items: &Vector<Item>, original: &TypeDecl, replacement: &TypeDecl) -> Option<Vector<Item>> {
    for (index, item) in items.iter().enumerate() {
        let updated = match item {
            Item::Type(ty) if ty == original => Some(Item::Type(replacement.clone())),
            Item::Type(ty) => replace_in_type(ty, original, replacement).map(Item::Type),
            Item::Namespace(ns) => replace_in_items(&ns.items, original, replacement).map(|inner| {
                Item::Namespace(NamespaceDecl {
                    items: inner,
                    ..ns.clone()
                })
            }),
            _ => None,
        };
        if let Some(updated) = updated {
            return Some(items.update(index, updated));
        }
    }
    None
}

fn replace_in_type(ty: &TypeDecl, original: &TypeDecl, replacement: &TypeDecl) -> Option<TypeDecl> {
    let members = ty.members();
    for (index, member) in members.iter().enumerate() {
        if let Member::Type(nested) = member {
            let updated = if nested == original {
                Some(replacement.clone())
            } else {
                replace_in_type(nested, original, replacement)
            };
            if let Some(updated) = updated {
                return Some(ty.with_members(members.update(index, Member::Type(updated))));
            }
        }
    }
    None
}

/// Whether the token run mentions an identifier.
pub fn mentions(tokens: &[Token], name: &str) -> bool {
    tokens
        .iter()
        .any(|t| t.kind == TokenKind::Ident && t.ident_name() == name)
}
