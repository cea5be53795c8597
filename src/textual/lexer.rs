use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    #[token(".")]
    Period,

    #[token("?")]
    Question,

    #[token("~")]
    Tilde,

    #[token(",")]
    Comma,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(":-")]
    ImpliedBy,

    #[token("!")]
    Bang,

    // Identifiers start with a letter or digit and continue with letters,
    // digits, underscores and dashes. Case decides variable vs constant.
    #[regex("[a-zA-Z0-9][a-zA-Z0-9_-]*")]
    Ident,

    // A quoted identifier is a constant regardless of case.
    #[regex(r"'[a-zA-Z0-9_-]*'")]
    Atom,

    // Whitespace and % line comments are skipped.
    #[regex(r"[ \t\n\r\f]+", logos::skip)]
    #[regex(r"%[^\n]*", logos::skip)]
    Whitespace,
}
