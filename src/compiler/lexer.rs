//! Line tokenizer for the IDL.
//!
//! The grammar is line-oriented, so the lexer works on a single line at a
//! time and reports 1-based columns for every token.

use std::fmt;

/// Token categories recognised by the IDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    LParen,
    RParen,
    Comma,
    Arrow,
    Semicolon,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier `{name}`"),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
            Self::Comma => f.write_str("`,`"),
            Self::Arrow => f.write_str("`->`"),
            Self::Semicolon => f.write_str("`;`"),
        }
    }
}

/// A token and the column it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub column: usize,
}

/// A character the lexer could not place in any token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexError {
    pub column: usize,
    pub found: char,
}

/// Tokenize one line. Everything after `//` is a comment.
pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let column = offset + 1;
        let kind = match c {
            c if c.is_ascii_whitespace() => continue,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '-' if chars.next_if(|&(_, next)| next == '>').is_some() => TokenKind::Arrow,
            '/' if chars.next_if(|&(_, next)| next == '/').is_some() => break,
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some((_, next)) =
                    chars.next_if(|&(_, next)| next.is_ascii_alphanumeric() || next == '_')
                {
                    ident.push(next);
                }
                TokenKind::Ident(ident)
            }
            found => return Err(LexError { column, found }),
        };
        tokens.push(Token { kind, column });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<TokenKind> {
        tokenize(line)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn method_line_tokens() {
        assert_eq!(
            kinds("add(int a) -> (int r);"),
            vec![
                TokenKind::Ident("add".into()),
                TokenKind::LParen,
                TokenKind::Ident("int".into()),
                TokenKind::Ident("a".into()),
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::LParen,
                TokenKind::Ident("int".into()),
                TokenKind::Ident("r".into()),
                TokenKind::RParen,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn columns_are_one_based() {
        let tokens = tokenize("  service Calc").unwrap();
        assert_eq!(tokens[0].column, 3);
        assert_eq!(tokens[1].column, 11);
    }

    #[test]
    fn comment_ends_the_line() {
        assert_eq!(
            kinds("service Calc // trailing note"),
            vec![
                TokenKind::Ident("service".into()),
                TokenKind::Ident("Calc".into())
            ]
        );
        assert!(kinds("// only a comment").is_empty());
    }

    #[test]
    fn lone_dash_is_rejected() {
        let err = tokenize("add(int a) - (int r);").unwrap_err();
        assert_eq!(err, LexError { column: 12, found: '-' });
    }

    #[test]
    fn digit_cannot_start_identifier() {
        let err = tokenize("add(int 1a)").unwrap_err();
        assert_eq!(err.found, '1');
        assert_eq!(err.column, 9);
    }
}
