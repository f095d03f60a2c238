use crate::{
    ast::{Node, NodeKind, SourceSetRef},
    diagnostics::{Error, SourceSpan},
    lexer::{Lexer, Token, TokenKind},
};

/// Parses `source` into a `Root` node, registering the text in the shared
/// source set under `name` (empty name = the default snippet name) so the
/// resulting spans stay resolvable for the lifetime of the set.
pub fn parse(sources: &SourceSetRef, name: &str, source: &str) -> Result<Node, Error> {
    let base = sources.borrow_mut().add(name, source);
    let tokens = match Lexer::new(source, base).tokenize() {
        Ok(tokens) => tokens,
        Err(err) => {
            return Err(Error::at(
                err.message,
                sources.borrow().position(err.offset),
            ));
        }
    };
    Parser {
        sources,
        tokens,
        current: 0,
    }
    .parse_root(base, base + source.len())
}

struct Parser<'a> {
    sources: &'a SourceSetRef,
    tokens: Vec<Token>,
    current: usize,
}

impl Parser<'_> {
    fn parse_root(mut self, start: usize, end: usize) -> Result<Node, Error> {
        let mut nodes = Vec::new();
        while !self.check(TokenKind::Eof) {
            nodes.push(self.parse_form()?);
        }
        Ok(Node::new(NodeKind::Root(nodes), SourceSpan::new(start, end)))
    }

    fn parse_form(&mut self) -> Result<Node, Error> {
        let token = self.advance();
        match token.kind {
            TokenKind::LParen => self.parse_sequence(&token, TokenKind::RParen),
            TokenKind::LBracket => self.parse_sequence(&token, TokenKind::RBracket),
            TokenKind::LBrace => self.parse_sequence(&token, TokenKind::RBrace),
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => Err(self.error_at(
                token.span.start,
                format!("unexpected {}", token.lexeme),
            )),
            TokenKind::Number => self.number_node(&token),
            TokenKind::Str => Ok(Node::new(NodeKind::Str(token.lexeme), token.span)),
            TokenKind::Symbol => Ok(Node::new(NodeKind::Symbol(token.lexeme), token.span)),
            TokenKind::Eof => Err(self.error_at(token.span.start, "unexpected end of input")),
        }
    }

    fn parse_sequence(&mut self, opener: &Token, closer: TokenKind) -> Result<Node, Error> {
        let mut nodes = Vec::new();
        loop {
            if self.check(TokenKind::Eof) {
                // The REPL keys its continuation prompt off this suffix.
                let missing = match closer {
                    TokenKind::RBracket => "missing ]",
                    TokenKind::RBrace => "missing }",
                    _ => "missing )",
                };
                return Err(self.error_at(self.peek().span.start, missing));
            }
            if self.check(closer.clone()) {
                let end = self.advance().span.end;
                let span = SourceSpan::new(opener.span.start, end);
                let kind = match closer {
                    TokenKind::RBracket => NodeKind::ListList(nodes),
                    TokenKind::RBrace => NodeKind::DictList(nodes),
                    _ => NodeKind::List(nodes),
                };
                return Ok(Node::new(kind, span));
            }
            nodes.push(self.parse_form()?);
        }
    }

    fn number_node(&self, token: &Token) -> Result<Node, Error> {
        let lexeme = token.lexeme.as_str();
        let unsigned = lexeme
            .strip_prefix('-')
            .or_else(|| lexeme.strip_prefix('+'))
            .unwrap_or(lexeme);
        let negative = lexeme.starts_with('-');

        let kind = if let Some(hex) = unsigned
            .strip_prefix("0x")
            .or_else(|| unsigned.strip_prefix("0X"))
        {
            i64::from_str_radix(hex, 16)
                .ok()
                .map(|n| NodeKind::Int(if negative { -n } else { n }))
        } else if unsigned.contains(['.', 'e', 'E']) {
            lexeme.parse::<f64>().ok().map(NodeKind::Float)
        } else if unsigned.len() > 1 && unsigned.starts_with('0') {
            i64::from_str_radix(unsigned, 8)
                .ok()
                .map(|n| NodeKind::Int(if negative { -n } else { n }))
        } else {
            lexeme.parse::<i64>().ok().map(NodeKind::Int)
        };

        match kind {
            Some(kind) => Ok(Node::new(kind, token.span)),
            None => Err(self.error_at(
                token.span.start,
                format!("invalid number literal: {lexeme}"),
            )),
        }
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> Error {
        Error::at(message, self.sources.borrow().position(offset))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current.min(self.tokens.len() - 1)].clone();
        self.current = (self.current + 1).min(self.tokens.len());
        token
    }
}
