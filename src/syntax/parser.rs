//! Declaration-level recursive descent parser.
//!
//! The parser recognizes namespaces, using directives, type declarations and
//! member signatures. Bodies, initializers and attribute contents are kept
//! as balanced token runs.

use super::lexer::tokenize;
use super::modifiers::MODIFIER_KEYWORDS;
use super::token::{generic_open, Token, TokenKind};
use super::tree::{
    CompilationUnit, ConstructorDecl, DelegateDecl, FieldDecl, Item, Member, MethodBody,
    MethodDecl, NamespaceDecl, Param, ParamList, PropertyDecl, TypeBody, TypeDecl, TypeKind,
    UsingDirective,
};
use super::ParseError;
use im::Vector;

/// Parses a whole source file.
pub fn parse_compilation_unit(source: &str) -> Result<CompilationUnit, ParseError> {
    let (tokens, eof) = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let items = parser.items(false)?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected `}` at namespace level"));
    }
    Ok(CompilationUnit { items, eof })
}

/// Parses a single member declaration. `type_name` identifies constructors.
pub fn parse_member(source: &str, type_name: &str) -> Result<Member, ParseError> {
    let (tokens, _) = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let member = parser.member(type_name)?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("trailing tokens after member"));
    }
    Ok(member)
}

/// Parses a single type declaration.
pub fn parse_type(source: &str) -> Result<TypeDecl, ParseError> {
    match parse_member(source, "")? {
        Member::Type(ty) => Ok(ty),
        _ => Err(ParseError {
            line: 1,
            column: 1,
            message: "expected a type declaration".to_string(),
        }),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.error("unexpected end of file"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, text: &str) -> Result<Token, ParseError> {
        if self.at(text) {
            self.bump()
        } else {
            Err(self.error(format!("expected `{text}`")))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let mut consumed = String::new();
        for token in &self.tokens[..self.pos.min(self.tokens.len())] {
            token.write_to(&mut consumed);
        }
        if let Some(token) = self.peek() {
            consumed.push_str(&token.leading);
        }
        let line = consumed.matches('\n').count() + 1;
        let column = consumed.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        let found = self
            .peek()
            .map(|t| format!(", found `{}`", t.text))
            .unwrap_or_default();
        ParseError {
            line,
            column,
            message: format!("{}{found}", message.into()),
        }
    }

    /// Consumes a balanced group starting at the current open delimiter.
    fn group(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut out = Vec::new();
        let mut depth = 0usize;
        loop {
            let token = self.bump()?;
            if token.kind.is_open() {
                depth += 1;
            } else if token.kind.is_close() {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| self.error("unbalanced delimiter"))?;
            }
            out.push(token);
            if depth == 0 {
                return Ok(out);
            }
        }
    }

    /// Consumes tokens until one of `stops` appears outside any group. The
    /// stop token is not consumed.
    fn until_top_level(&mut self, stops: &[&str]) -> Result<Vec<Token>, ParseError> {
        let mut out = Vec::new();
        while let Some(token) = self.peek() {
            if stops.iter().any(|s| token.is(s)) {
                return Ok(out);
            }
            if token.kind.is_close() {
                return Ok(out);
            }
            if token.kind.is_open() {
                out.extend(self.group()?);
            } else {
                out.push(self.bump()?);
            }
        }
        Ok(out)
    }

    fn items(&mut self, nested: bool) -> Result<Vector<Item>, ParseError> {
        let mut items = Vector::new();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::CloseBrace {
                if nested {
                    break;
                }
                return Err(self.error("unbalanced `}`"));
            }
            let item = if self.at("using")
                || (self.at("global") && self.peek_at(1).is_some_and(|t| t.is("using")))
            {
                let mut tokens = self.until_top_level(&[";"])?;
                tokens.push(self.expect(";")?);
                Item::Using(UsingDirective { tokens })
            } else if self.at("namespace") {
                Item::Namespace(self.namespace()?)
            } else if self.at("extern") && self.peek_at(1).is_some_and(|t| t.is("alias")) {
                let mut tokens = self.until_top_level(&[";"])?;
                tokens.push(self.expect(";")?);
                Item::Raw(tokens)
            } else if self.at("[")
                && self.peek_at(2).is_some_and(|t| t.is(":"))
                && self
                    .peek_at(1)
                    .is_some_and(|t| t.is("assembly") || t.is("module"))
            {
                Item::Raw(self.group()?)
            } else {
                let start = self.pos;
                match self.member("")? {
                    Member::Type(ty) => Item::Type(ty),
                    _ => Item::Raw(self.tokens[start..self.pos].to_vec()),
                }
            };
            items.push_back(item);
        }
        Ok(items)
    }

    fn namespace(&mut self) -> Result<NamespaceDecl, ParseError> {
        let mut header = vec![self.expect("namespace")?];
        header.extend(self.until_top_level(&["{", ";"])?);
        let name: String = header[1..].iter().map(|t| t.text.as_str()).collect();
        if self.at(";") {
            let open = self.bump()?;
            let items = self.items(false)?;
            return Ok(NamespaceDecl {
                header,
                name,
                open,
                items,
                close: None,
                trailing: None,
            });
        }
        let open = self.expect("{")?;
        let items = self.items(true)?;
        let close = self.expect("}")?;
        let trailing = if self.at(";") { Some(self.bump()?) } else { None };
        Ok(NamespaceDecl {
            header,
            name,
            open,
            items,
            close: Some(close),
            trailing,
        })
    }

    /// Attributes and modifier keywords in front of a declaration.
    fn prefix(&mut self) -> Result<(Vec<Token>, Vec<Token>), ParseError> {
        let mut attributes = Vec::new();
        let mut modifiers = Vec::new();
        loop {
            if self.at("[") && modifiers.is_empty() {
                attributes.extend(self.group()?);
            } else if self
                .peek()
                .is_some_and(|t| t.is_ident() && MODIFIER_KEYWORDS.contains(&t.text.as_str()))
            {
                modifiers.push(self.bump()?);
            } else {
                return Ok((attributes, modifiers));
            }
        }
    }

    fn type_kind_here(&self) -> Option<TypeKind> {
        let token = self.peek()?;
        let kind = TypeKind::from_keyword(&token.text)?;
        if kind == TypeKind::Record {
            // `record` is contextual; require a name or class/struct after it.
            let next = self.peek_at(1)?;
            if !next.is_ident() {
                return None;
            }
        }
        Some(kind)
    }

    fn member(&mut self, type_name: &str) -> Result<Member, ParseError> {
        let start = self.pos;
        let (attributes, modifiers) = self.prefix()?;
        if let Some(kind) = self.type_kind_here() {
            return Ok(Member::Type(self.type_decl(attributes, modifiers, kind)?));
        }
        if self.at("delegate") {
            let mut rest = self.until_top_level(&[";"])?;
            rest.push(self.expect(";")?);
            let name = rest
                .iter()
                .enumerate()
                .find(|(i, t)| {
                    t.is_ident()
                        && rest
                            .get(i + 1)
                            .is_some_and(|n| n.is("(") || n.is("<"))
                })
                .map(|(_, t)| t.ident_name().to_string())
                .unwrap_or_default();
            let mut tokens = attributes;
            tokens.extend(modifiers.iter().cloned());
            tokens.extend(rest);
            return Ok(Member::Delegate(DelegateDecl {
                modifiers,
                tokens,
                name,
            }));
        }

        let head = self.member_head()?;
        let stop = self
            .peek()
            .cloned()
            .ok_or_else(|| self.error("unexpected end of declaration"))?;

        if stop.is("(") && !head.is_empty() {
            if head.len() == 1 && head[0].ident_name() == type_name && !type_name.is_empty() {
                return self.constructor(attributes, modifiers, head[0].clone());
            }
            let last = head.len() - 1;
            let (name_index, type_params) = if head[last].is(">") {
                match generic_open(&head, last) {
                    Some(open) if open > 0 => (open - 1, head[open..].to_vec()),
                    _ => return self.other(start),
                }
            } else {
                (last, Vec::new())
            };
            let explicit_interface = name_index > 0 && head[name_index - 1].is(".");
            let is_operator = head.iter().any(|t| t.is("operator")) || head[0].is("~");
            if name_index == 0 || explicit_interface || is_operator || !head[name_index].is_ident()
            {
                return self.other(start);
            }
            let params = self.param_list()?;
            let constraints = self.until_top_level(&["{", "=>", ";"])?;
            let body = self.method_body()?;
            return Ok(Member::Method(MethodDecl {
                attributes,
                modifiers,
                return_type: head[..name_index].to_vec(),
                name: head[name_index].clone(),
                type_params,
                params,
                constraints,
                body,
            }));
        }

        if (stop.is("{") || stop.is("=>")) && head.len() >= 2 && head[head.len() - 1].is_ident() {
            let name = head[head.len() - 1].clone();
            let rest = self.tail()?;
            return Ok(Member::Property(PropertyDecl {
                attributes,
                modifiers,
                ty: head[..head.len() - 1].to_vec(),
                name,
                rest,
            }));
        }

        if (stop.is("=") || stop.is(";") || stop.is(",")) && head.len() >= 2 && head[head.len() - 1].is_ident() {
            let name = head[head.len() - 1].clone();
            let mut declarators = vec![name.clone()];
            declarators.extend(self.until_top_level(&[";"])?);
            declarators.push(self.expect(";")?);
            let names = declarator_names(&declarators);
            return Ok(Member::Field(FieldDecl {
                attributes,
                modifiers,
                ty: head[..head.len() - 1].to_vec(),
                declarators,
                names,
            }));
        }

        self.other(start)
    }

    /// Collects the tokens of a member declaration up to its parameter
    /// list, body, initializer or terminator.
    fn member_head(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut head: Vec<Token> = Vec::new();
        let mut angle = 0usize;
        loop {
            let token = self
                .peek()
                .cloned()
                .ok_or_else(|| self.error("unexpected end of declaration"))?;
            if token.is("<") {
                angle += 1;
            } else if token.is(">") {
                angle = angle.saturating_sub(1);
            }
            if token.kind.is_close() {
                return Err(self.error("unexpected closing delimiter in declaration"));
            }
            if token.kind.is_open() {
                let tuple_type = token.is("(") && (angle > 0 || head.is_empty());
                let array_rank = token.is("[")
                    && head
                        .last()
                        .is_some_and(|prev| !prev.is("this") && (prev.is_ident() || prev.is(">") || prev.is("?") || prev.is("]")))
                    && self.is_rank_specifier();
                if tuple_type || array_rank || (angle > 0 && token.is("[")) {
                    head.extend(self.group()?);
                    continue;
                }
                return Ok(head);
            }
            if angle == 0 && (token.is("=") || token.is(";") || token.is("=>") || token.is(",")) {
                return Ok(head);
            }
            head.push(self.bump()?);
        }
    }

    /// `[]` or `[,]` at the current position.
    fn is_rank_specifier(&self) -> bool {
        let mut offset = 1;
        while let Some(token) = self.peek_at(offset) {
            if token.is("]") {
                return true;
            }
            if !token.is(",") {
                return false;
            }
            offset += 1;
        }
        false
    }

    /// Consumes the rest of a member whose shape isn't modelled: through a
    /// body block or a terminating `;`.
    fn tail(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut out = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                return Ok(out);
            };
            if token.kind.is_close() {
                return Err(self.error("unexpected closing delimiter"));
            }
            if token.is("{") {
                out.extend(self.group()?);
                if !(self.at("=") || self.at(";")) {
                    return Ok(out);
                }
            } else if token.is(";") {
                out.push(self.bump()?);
                return Ok(out);
            } else if token.kind.is_open() {
                out.extend(self.group()?);
            } else {
                out.push(self.bump()?);
            }
        }
    }

    fn other(&mut self, start: usize) -> Result<Member, ParseError> {
        self.tail()?;
        if self.pos == start {
            self.bump()?;
        }
        Ok(Member::Other(self.tokens[start..self.pos].to_vec()))
    }

    fn type_decl(
        &mut self,
        attributes: Vec<Token>,
        modifiers: Vec<Token>,
        kind: TypeKind,
    ) -> Result<TypeDecl, ParseError> {
        let mut keywords = vec![self.bump()?];
        if kind == TypeKind::Record && (self.at("class") || self.at("struct")) {
            keywords.push(self.bump()?);
        }
        let name = self.bump()?;
        if !name.is_ident() {
            return Err(self.error("expected a type name"));
        }
        let header = self.until_top_level(&["{", ";"])?;
        let body = if self.at(";") {
            TypeBody::Raw(vec![self.bump()?])
        } else if kind == TypeKind::Enum {
            let mut raw = self.group()?;
            if self.at(";") {
                raw.push(self.bump()?);
            }
            TypeBody::Raw(raw)
        } else {
            let open = self.expect("{")?;
            let mut members = Vector::new();
            while self.peek().is_some_and(|t| t.kind != TokenKind::CloseBrace) {
                members.push_back(self.member(name.ident_name())?);
            }
            let close = self.expect("}")?;
            let trailing = if self.at(";") { Some(self.bump()?) } else { None };
            TypeBody::Members {
                open,
                members,
                close,
                trailing,
            }
        };
        Ok(TypeDecl {
            attributes,
            modifiers,
            keywords,
            kind,
            name,
            header,
            body,
        })
    }

    fn constructor(
        &mut self,
        attributes: Vec<Token>,
        modifiers: Vec<Token>,
        name: Token,
    ) -> Result<Member, ParseError> {
        let params = self.param_list()?;
        let initializer = if self.at(":") {
            self.until_top_level(&["{", "=>", ";"])?
        } else {
            Vec::new()
        };
        let body = self.method_body()?;
        Ok(Member::Constructor(ConstructorDecl {
            attributes,
            modifiers,
            name,
            params,
            initializer,
            body,
        }))
    }

    fn method_body(&mut self) -> Result<MethodBody, ParseError> {
        if self.at("{") {
            return Ok(MethodBody::Block(self.group()?));
        }
        if self.at("=>") {
            let arrow = self.bump()?;
            let expr = self.until_top_level(&[";"])?;
            let semi = self.expect(";")?;
            return Ok(MethodBody::Arrow { arrow, expr, semi });
        }
        Ok(MethodBody::Semicolon(self.expect(";")?))
    }

    fn param_list(&mut self) -> Result<ParamList, ParseError> {
        let open = self.expect("(")?;
        let mut params = Vec::new();
        let mut separators = Vec::new();
        while !self.at(")") {
            let mut tokens = Vec::new();
            let mut angle = 0usize;
            while let Some(token) = self.peek() {
                if angle == 0 && (token.is(",") || token.is(")")) {
                    break;
                }
                if token.is("<") {
                    angle += 1;
                } else if token.is(">") {
                    angle = angle.saturating_sub(1);
                } else if token.is("=") {
                    angle = 0;
                }
                if token.kind.is_close() {
                    return Err(self.error("unbalanced parameter list"));
                }
                if token.kind.is_open() {
                    tokens.extend(self.group()?);
                } else {
                    tokens.push(self.bump()?);
                }
            }
            params.push(self.param(tokens)?);
            if self.at(",") {
                separators.push(self.bump()?);
            }
        }
        let close = self.expect(")")?;
        Ok(ParamList {
            open,
            params,
            separators,
            close,
        })
    }

    fn param(&self, tokens: Vec<Token>) -> Result<Param, ParseError> {
        const PARAM_MODIFIERS: &[&str] = &["this", "ref", "out", "in", "params", "scoped", "readonly"];
        let mut index = 0;
        while index < tokens.len() {
            if tokens[index].is("[") {
                index = super::token::matching_close(&tokens, index)
                    .ok_or_else(|| self.error("unbalanced parameter attribute"))?
                    + 1;
            } else if PARAM_MODIFIERS.contains(&tokens[index].text.as_str()) {
                index += 1;
            } else {
                break;
            }
        }
        let prefix = tokens[..index].to_vec();
        let eq = tokens[index..]
            .iter()
            .position(|t| t.is("="))
            .map(|p| p + index)
            .unwrap_or(tokens.len());
        if eq < index + 2 {
            return Err(self.error("parameter without a type"));
        }
        Ok(Param {
            prefix,
            ty: tokens[index..eq - 1].to_vec(),
            name: tokens[eq - 1].clone(),
            default: tokens[eq..].to_vec(),
        })
    }
}

/// Names introduced by a field declarator list such as `a = 1, b, c = f(x);`.
fn declarator_names(declarators: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut expect_name = true;
    for token in declarators {
        if token.kind.is_open() {
            depth += 1;
        } else if token.kind.is_close() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is(",") {
            expect_name = true;
            continue;
        }
        if expect_name && depth == 0 && token.is_ident() {
            names.push(token.ident_name().to_string());
        }
        expect_name = false;
    }
    names
}
