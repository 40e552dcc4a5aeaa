//! Recursive-descent parser for the IDL.
//!
//! ```text
//! service <Name>
//! <method>(<type> <name>, ...) -> (<type> <name>);
//! ```
//!
//! Each non-blank line is tokenized and parsed on its own; the service
//! declaration must come first and every method signature fits on one line.

use std::collections::HashSet;

use tracing::debug;

use super::error::{ParseError, ParseErrorKind};
use super::lexer::{Token, TokenKind, tokenize};
use super::model::{Field, Method, PrimitiveType, Service, export_name, rust_ident};

const SERVICE_KEYWORD: &str = "service";

/// Parse IDL source into a validated [`Service`].
///
/// Parsing is all-or-nothing: the first error aborts the run.
pub fn parse(source: &str) -> Result<Service, ParseError> {
    let mut service: Option<String> = None;
    let mut methods: Vec<Method> = Vec::new();
    let mut line_count = 0;

    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        line_count = line;
        let fail = |column: usize, kind: ParseErrorKind| ParseError::new(line, column, text, kind);

        let tokens = tokenize(text)
            .map_err(|e| fail(e.column, ParseErrorKind::UnexpectedCharacter(e.found)))?;
        if tokens.is_empty() {
            continue;
        }

        let mut parser = LineParser::new(&tokens, text.len() + 1);
        let declaration = parser
            .declaration()
            .map_err(|e| fail(e.column, e.kind))?;

        match declaration {
            Declaration::Service { name, column } => {
                if let Some(existing) = &service {
                    return Err(fail(column, ParseErrorKind::DuplicateService(existing.clone())));
                }
                debug!(line, service = %name, "service declaration");
                service = Some(name);
            }
            Declaration::Method { method, column } => {
                if service.is_none() {
                    return Err(fail(column, ParseErrorKind::MethodBeforeService));
                }
                let fn_name = method.fn_name();
                if methods.iter().any(|existing| existing.fn_name() == fn_name) {
                    return Err(fail(column, ParseErrorKind::DuplicateMethod(method.name)));
                }
                debug!(line, method = %method.name, "method declaration");
                methods.push(method);
            }
        }
    }

    match service {
        Some(name) => Ok(Service { name, methods }),
        None => Err(ParseError::new(
            line_count + 1,
            1,
            "",
            ParseErrorKind::MissingService,
        )),
    }
}

enum Declaration {
    Service { name: String, column: usize },
    Method { method: Method, column: usize },
}

/// Error within a line; the caller attaches the line number and text.
struct Located {
    column: usize,
    kind: ParseErrorKind,
}

impl Located {
    fn new(column: usize, kind: ParseErrorKind) -> Self {
        Self { column, kind }
    }
}

struct LineParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end_column: usize,
}

impl<'a> LineParser<'a> {
    fn new(tokens: &'a [Token], end_column: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end_column,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, offset: usize) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + offset).map(|token| &token.kind)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind(0) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Column and description of the next token, or of the end of line.
    fn found(&self) -> (usize, String) {
        match self.peek() {
            Some(token) => (token.column, token.kind.to_string()),
            None => (self.end_column, "end of line".to_owned()),
        }
    }

    fn malformed(&self, expected: &'static str) -> Located {
        let (column, found) = self.found();
        Located::new(column, ParseErrorKind::MalformedSignature { expected, found })
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), Located> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.malformed(expected))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<(String, usize), Located> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                column,
            }) => {
                self.pos += 1;
                Ok((name.clone(), *column))
            }
            _ => Err(self.malformed(expected)),
        }
    }

    fn declaration(&mut self) -> Result<Declaration, Located> {
        let starts_with_keyword =
            matches!(self.peek_kind(0), Some(TokenKind::Ident(word)) if word == SERVICE_KEYWORD);
        let is_service = starts_with_keyword && self.peek_kind(1) != Some(&TokenKind::LParen);

        if is_service {
            self.service()
        } else {
            self.method()
        }
    }

    fn service(&mut self) -> Result<Declaration, Located> {
        self.bump();
        let (name, column) = match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                column,
            }) => (name.clone(), *column),
            _ => {
                let (column, found) = self.found();
                return Err(Located::new(
                    column,
                    ParseErrorKind::MalformedService {
                        expected: "a service name",
                        found,
                    },
                ));
            }
        };
        self.pos += 1;

        if self.peek().is_some() {
            let (column, found) = self.found();
            return Err(Located::new(
                column,
                ParseErrorKind::MalformedService {
                    expected: "end of line",
                    found,
                },
            ));
        }

        Ok(Declaration::Service { name, column })
    }

    fn method(&mut self) -> Result<Declaration, Located> {
        let (name, column) = match self.peek() {
            Some(Token {
                kind: TokenKind::LParen,
                column,
            }) => return Err(Located::new(*column, ParseErrorKind::EmptyMethodName)),
            _ => self.expect_ident("a method name")?,
        };

        self.expect(TokenKind::LParen, "`(`")?;
        let params = self.fields()?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::Arrow, "`->`")?;

        let returns_column = self.found().0;
        self.expect(TokenKind::LParen, "`(`")?;
        let returns = self.fields()?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        if self.peek().is_some() {
            return Err(self.malformed("end of line"));
        }

        if returns.len() != 1 {
            return Err(Located::new(
                returns_column,
                ParseErrorKind::ReturnArity(returns.len()),
            ));
        }

        let mut seen = HashSet::new();
        for (field, field_column) in params.iter().chain(returns.iter()) {
            if !seen.insert(rust_ident(&field.name)) {
                return Err(Located::new(
                    *field_column,
                    ParseErrorKind::DuplicateField(field.name.clone()),
                ));
            }
        }

        let method = Method {
            name: export_name(&name),
            params: params.into_iter().map(|(field, _)| field).collect(),
            returns: returns.into_iter().map(|(field, _)| field).collect(),
        };
        Ok(Declaration::Method { method, column })
    }

    /// `(type name ("," type name)*)?`, stopping before the closing paren.
    fn fields(&mut self) -> Result<Vec<(Field, usize)>, Located> {
        let mut fields = Vec::new();
        if self.peek_kind(0) == Some(&TokenKind::RParen) {
            return Ok(fields);
        }

        loop {
            let (type_token, type_column) = self.expect_ident("a type")?;
            let ty = PrimitiveType::from_token(&type_token).ok_or_else(|| {
                Located::new(type_column, ParseErrorKind::UnsupportedType(type_token.clone()))
            })?;
            let (name, name_column) = self.expect_ident("a field name")?;
            fields.push((Field { name, ty }, name_column));

            if !self.eat(&TokenKind::Comma) {
                return Ok(fields);
            }
        }
    }
}
