use crate::diagnostics::SourceSpan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    /// Numeric literal; the parser decides int vs. float from the lexeme.
    Number,
    /// String literal (escapes already processed) or `:keyword` sugar.
    Str,
    Symbol,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

/// A scan failure with the global offset it occurred at; the parser turns
/// it into a positioned error.
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

fn is_delimiter(ch: char) -> bool {
    matches!(ch, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';') || ch.is_whitespace()
}

pub struct Lexer<'a> {
    source: &'a str,
    base: usize,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    /// `base` is the global offset of the snippet's first byte, so every
    /// token span resolves through the shared source set.
    pub fn new(source: &'a str, base: usize) -> Self {
        Self {
            source,
            base,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = if let Some((idx, ch)) = self.peeked.take() {
            Some((idx, ch))
        } else {
            self.chars.next()
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            Some((idx, ch))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let mut progressed = false;
            while let Some((_, ch)) = self.peek() {
                if ch.is_whitespace() {
                    self.bump();
                    progressed = true;
                } else {
                    break;
                }
            }
            if let Some((_, ';')) = self.peek() {
                while let Some((_, ch)) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.bump();
                }
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    fn span(&self, start: usize) -> SourceSpan {
        SourceSpan::new(self.base + start, self.base + self.current)
    }

    fn simple_token(&mut self, start: usize, kind: TokenKind) -> Token {
        Token {
            kind,
            lexeme: self.source[start..self.current].to_string(),
            span: self.span(start),
        }
    }

    /// Collects an atom (symbol, number, or keyword); the boundary is any
    /// delimiter, whitespace, or end of input.
    fn atom(&mut self, start: usize) -> Token {
        while let Some((_, ch)) = self.peek() {
            if is_delimiter(ch) {
                break;
            }
            self.bump();
        }
        let lexeme = &self.source[start..self.current];
        let first = lexeme.chars().next().unwrap_or(' ');
        let second = lexeme.chars().nth(1);
        let kind = if let Some(name) = lexeme.strip_prefix(':') {
            if !name.is_empty() {
                return Token {
                    kind: TokenKind::Str,
                    lexeme: name.to_string(),
                    span: self.span(start),
                };
            }
            TokenKind::Symbol
        } else if first.is_ascii_digit()
            || ((first == '-' || first == '+') && second.is_some_and(|ch| ch.is_ascii_digit()))
        {
            TokenKind::Number
        } else {
            TokenKind::Symbol
        };
        Token {
            kind,
            lexeme: lexeme.to_string(),
            span: self.span(start),
        }
    }

    fn string_literal(&mut self, start: usize) -> Result<Token, LexError> {
        let mut value = String::new();
        while let Some((_, ch)) = self.bump() {
            match ch {
                '"' => {
                    return Ok(Token {
                        kind: TokenKind::Str,
                        lexeme: value,
                        span: self.span(start),
                    });
                }
                '\\' => {
                    if let Some((_, esc)) = self.bump() {
                        match esc {
                            'n' => value.push('\n'),
                            'r' => value.push('\r'),
                            't' => value.push('\t'),
                            '"' => value.push('"'),
                            '\\' => value.push('\\'),
                            other => value.push(other),
                        }
                    } else {
                        break;
                    }
                }
                _ => value.push(ch),
            }
        }
        Err(LexError {
            message: "unterminated string literal".to_string(),
            offset: self.base + start,
        })
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let (start, ch) = match self.bump() {
                Some(pair) => pair,
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        lexeme: String::new(),
                        span: self.span(self.current),
                    });
                    break;
                }
            };
            let token = match ch {
                '(' => self.simple_token(start, TokenKind::LParen),
                ')' => self.simple_token(start, TokenKind::RParen),
                '[' => self.simple_token(start, TokenKind::LBracket),
                ']' => self.simple_token(start, TokenKind::RBracket),
                '{' => self.simple_token(start, TokenKind::LBrace),
                '}' => self.simple_token(start, TokenKind::RBrace),
                '"' => self.string_literal(start)?,
                _ => self.atom(start),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}
