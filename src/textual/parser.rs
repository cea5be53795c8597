use std::iter::Peekable;

use logos::{Logos, Span, SpannedIter};
use thiserror::Error;

use crate::database::{Command, CommandKind, Database};
use crate::intern::Interner;
use crate::term::{Literal, Term};

use super::lexer::Token;

struct TokenStream<'a> {
    source: &'a str,
    lexer: Peekable<SpannedIter<'a, Token>>,
}

impl<'a> TokenStream<'a> {
    fn new(source: &'a str) -> Self {
        let lexer = Token::lexer(source).spanned().peekable();
        Self { source, lexer }
    }

    fn peek(&mut self) -> Option<(Result<Token, ()>, Span)> {
        self.lexer.peek().cloned()
    }

    fn peek_token(&mut self) -> Result<Option<Token>, ParseError> {
        match self.lexer.peek() {
            None => Ok(None),
            Some((Ok(token), _)) => Ok(Some(token.clone())),
            Some((Err(()), span)) => Err(ParseError::new(span.clone(), ParseErrorKind::InvalidToken)),
        }
    }

    fn next(&mut self) -> Result<Option<(Token, Span)>, ParseError> {
        match self.lexer.next() {
            None => Ok(None),
            Some((Ok(token), span)) => Ok(Some((token, span))),
            Some((Err(()), span)) => Err(ParseError::new(span, ParseErrorKind::InvalidToken)),
        }
    }

    fn advance(&mut self) {
        self.lexer.next();
    }

    fn expect(&mut self, expected: Token) -> Result<Span, ParseError> {
        match self.next()? {
            Some((token, span)) if token == expected => Ok(span),
            Some((_, span)) => Err(ParseError::new(span, ParseErrorKind::UnexpectedToken)),
            None => Err(ParseError::new(self.eof(), ParseErrorKind::UnexpectedEof)),
        }
    }

    fn slice(&self, span: &Span) -> &str {
        &self.source[span.clone()]
    }

    fn eof(&self) -> Span {
        self.source.len()..self.source.len()
    }
}

/// A syntax error, with the byte range it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {}..{}", span.start, span.end)]
pub struct ParseError {
    span: Span,
    kind: ParseErrorKind,
}

impl ParseError {
    fn new(span: Span, kind: ParseErrorKind) -> Self {
        Self { span, kind }
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("unrecognized character")]
    InvalidToken,
    #[error("expected end of input")]
    ExpectedEof,
    #[error("set members must be constants")]
    VariableInSet,
}

/// Parses the surface syntax into [`Command`]s, interning identifiers into
/// the database on sight.
pub struct Parser<'d> {
    db: &'d Database,
}

impl<'d> Parser<'d> {
    pub fn new(db: &'d Database) -> Self {
        Self { db }
    }

    // //////////////////////////////// PUBLIC PARSER ////////////////////////////////

    pub fn parse_program(&self, source: &str) -> Result<Vec<Command>, ParseError> {
        let mut tokens = TokenStream::new(source);
        let mut commands = Vec::new();
        while tokens.peek_token()?.is_some() {
            commands.push(self.parse_command(&mut tokens)?);
        }
        Ok(commands)
    }

    pub fn parse_command_str(&self, source: &str) -> Result<Command, ParseError> {
        let mut tokens = TokenStream::new(source);
        let command = self.parse_command(&mut tokens)?;
        if let Some((_, span)) = tokens.next()? {
            return Err(ParseError::new(span, ParseErrorKind::ExpectedEof));
        }
        Ok(command)
    }

    // //////////////////////////////// PARSER INTERNALS ////////////////////////////////

    fn parse_command(&self, tokens: &mut TokenStream) -> Result<Command, ParseError> {
        let head = self.parse_literal(tokens)?;
        match tokens.next()? {
            Some((Token::Period, _)) => Ok(Command {
                head,
                body: vec![],
                kind: CommandKind::Assert,
            }),
            Some((Token::Question, _)) => Ok(Command {
                head,
                body: vec![],
                kind: CommandKind::Query,
            }),
            Some((Token::Tilde, _)) => Ok(Command {
                head,
                body: vec![],
                kind: CommandKind::Retract,
            }),
            Some((Token::ImpliedBy, _)) => {
                let mut body = vec![self.parse_literal(tokens)?];
                loop {
                    match tokens.next()? {
                        Some((Token::Comma, _)) => body.push(self.parse_literal(tokens)?),
                        Some((Token::Period, _)) => break,
                        Some((_, span)) => {
                            return Err(ParseError::new(span, ParseErrorKind::UnexpectedToken))
                        }
                        None => {
                            return Err(ParseError::new(
                                tokens.eof(),
                                ParseErrorKind::UnexpectedEof,
                            ))
                        }
                    }
                }
                Ok(Command {
                    head,
                    body,
                    kind: CommandKind::Assert,
                })
            }
            Some((_, span)) => Err(ParseError::new(span, ParseErrorKind::UnexpectedToken)),
            None => Err(ParseError::new(tokens.eof(), ParseErrorKind::UnexpectedEof)),
        }
    }

    /// An identifier or a quoted atom; returns the text and whether it was
    /// quoted.
    fn parse_name(&self, tokens: &mut TokenStream) -> Result<(String, bool), ParseError> {
        match tokens.next()? {
            Some((Token::Ident, span)) => Ok((tokens.slice(&span).to_owned(), false)),
            Some((Token::Atom, span)) => {
                let text = tokens.slice(&span);
                Ok((text[1..text.len() - 1].to_owned(), true))
            }
            Some((_, span)) => Err(ParseError::new(span, ParseErrorKind::UnexpectedToken)),
            None => Err(ParseError::new(tokens.eof(), ParseErrorKind::UnexpectedEof)),
        }
    }

    fn make_term(&self, name: &str, is_atom: bool) -> Term {
        let id = Interner::intern(self.db, name);
        let leading_upper = name
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_uppercase());
        if leading_upper && !is_atom {
            Term::Variable(id)
        } else {
            Term::Constant(id)
        }
    }

    fn parse_term(&self, tokens: &mut TokenStream) -> Result<Term, ParseError> {
        let (name, is_atom) = self.parse_name(tokens)?;
        Ok(self.make_term(&name, is_atom))
    }

    fn parse_literal(&self, tokens: &mut TokenStream) -> Result<Literal, ParseError> {
        let negated = matches!(tokens.peek_token()?, Some(Token::Bang));
        if negated {
            tokens.advance();
        }

        let (name, is_atom) = self.parse_name(tokens)?;

        match tokens.peek_token()? {
            Some(Token::LParen) => {
                tokens.advance();
                let mut terms = Vec::new();
                if let Some(Token::RParen) = tokens.peek_token()? {
                    tokens.advance();
                } else {
                    loop {
                        terms.push(self.parse_term(tokens)?);
                        match tokens.next()? {
                            Some((Token::Comma, _)) => {}
                            Some((Token::RParen, _)) => break,
                            Some((_, span)) => {
                                return Err(ParseError::new(
                                    span,
                                    ParseErrorKind::UnexpectedToken,
                                ))
                            }
                            None => {
                                return Err(ParseError::new(
                                    tokens.eof(),
                                    ParseErrorKind::UnexpectedEof,
                                ))
                            }
                        }
                    }
                }
                Ok(Literal {
                    predicate: name,
                    negated,
                    terms,
                })
            }
            // `X in [a, b, c]`: the leading name was the element, not a
            // predicate.
            Some(Token::Ident) => {
                let span = tokens.peek().map(|(_, s)| s).expect("token was peeked");
                if tokens.slice(&span) == "in" {
                    tokens.advance();
                    self.parse_in_set(tokens, negated, &name, is_atom)
                } else {
                    Ok(Literal {
                        predicate: name,
                        negated,
                        terms: vec![],
                    })
                }
            }
            _ => Ok(Literal {
                predicate: name,
                negated,
                terms: vec![],
            }),
        }
    }

    fn parse_in_set(
        &self,
        tokens: &mut TokenStream,
        negated: bool,
        item_name: &str,
        item_is_atom: bool,
    ) -> Result<Literal, ParseError> {
        tokens.expect(Token::LBracket)?;
        let mut members = Vec::new();
        loop {
            match tokens.peek_token()? {
                Some(Token::RBracket) => {
                    tokens.advance();
                    break;
                }
                Some(_) => {
                    let span = tokens.peek().map(|(_, s)| s).expect("token was peeked");
                    match self.parse_term(tokens)? {
                        Term::Constant(id) => members.push(id),
                        Term::Variable(_) => {
                            return Err(ParseError::new(span, ParseErrorKind::VariableInSet))
                        }
                    }
                    // Commas between members are optional.
                    if let Some(Token::Comma) = tokens.peek_token()? {
                        tokens.advance();
                    }
                }
                None => {
                    return Err(ParseError::new(tokens.eof(), ParseErrorKind::UnexpectedEof))
                }
            }
        }

        let handle = Interner::store_set(self.db, members);
        Ok(Literal {
            predicate: "in".to_owned(),
            negated,
            terms: vec![
                self.make_term(item_name, item_is_atom),
                Term::Constant(handle),
            ],
        })
    }
}

impl Database {
    /// Parse a program into commands, interning identifiers as they appear.
    pub fn parse(&self, input: &str) -> Result<Vec<Command>, ParseError> {
        Parser::new(self).parse_program(input)
    }

    /// Parse exactly one command.
    pub fn parse_command(&self, input: &str) -> Result<Command, ParseError> {
        Parser::new(self).parse_command_str(input)
    }
}
