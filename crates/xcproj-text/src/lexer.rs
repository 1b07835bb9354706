//! Tokenizer for the nested-dictionary text format.

use crate::error::{Result, TextError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LParen,
    RParen,
    Equals,
    Semicolon,
    Comma,
    /// A bare or quoted string; `quoted` records which.
    Word { text: String, quoted: bool },
    /// Body of a `/* */` or `//` comment, trimmed.
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// The character after the next one.
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn starts_comment(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next() == Some('/') && matches!(ahead.next(), Some('*') | Some('/'))
    }

    fn block_comment(&mut self, line: usize, column: usize) -> Result<String> {
        self.bump();
        self.bump();
        let mut body = String::new();
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(body.trim().to_string());
                }
                Some(c) => body.push(c),
                None => return Err(TextError::malformed(line, column, "unterminated comment")),
            }
        }
    }

    fn line_comment(&mut self) -> String {
        self.bump();
        self.bump();
        let mut body = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            body.push(c);
            self.bump();
        }
        body.trim().to_string()
    }

    fn quoted(&mut self, line: usize, column: usize) -> Result<String> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(c) => text.push(c),
                    None => break,
                },
                Some(c) => text.push(c),
                None => break,
            }
        }
        Err(TextError::malformed(line, column, "unterminated string"))
    }

    fn bare(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || "{}()=;,\"".contains(c) || self.starts_comment() {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }
}

/// Split `src` into tokens, keeping comments.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut lx = Lexer::new(src);
    let mut tokens = Vec::new();

    while let Some(c) = lx.peek() {
        let (line, column) = (lx.line, lx.column);
        let kind = match c {
            c if c.is_whitespace() => {
                lx.bump();
                continue;
            }
            '/' if lx.peek_second() == Some('*') => TokenKind::Comment(lx.block_comment(line, column)?),
            '/' if lx.peek_second() == Some('/') => TokenKind::Comment(lx.line_comment()),
            '{' | '}' | '(' | ')' | '=' | ';' | ',' => {
                lx.bump();
                match c {
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '=' => TokenKind::Equals,
                    ';' => TokenKind::Semicolon,
                    _ => TokenKind::Comma,
                }
            }
            '"' => TokenKind::Word {
                text: lx.quoted(line, column)?,
                quoted: true,
            },
            _ => TokenKind::Word {
                text: lx.bare(),
                quoted: false,
            },
        };
        tokens.push(Token { kind, line, column });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn word(text: &str, quoted: bool) -> TokenKind {
        TokenKind::Word {
            text: text.into(),
            quoted,
        }
    }

    #[test]
    fn punctuation_and_words() {
        assert_eq!(
            kinds("{ a = (b, \"c d\"); }"),
            vec![
                TokenKind::LBrace,
                word("a", false),
                TokenKind::Equals,
                TokenKind::LParen,
                word("b", false),
                TokenKind::Comma,
                word("c d", true),
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn comments_are_tokens() {
        assert_eq!(
            kinds("// !$*UTF8*$!\nX /* main.m in Sources */ ;"),
            vec![
                TokenKind::Comment("!$*UTF8*$!".into()),
                word("X", false),
                TokenKind::Comment("main.m in Sources".into()),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn paths_with_slashes_are_single_words() {
        assert_eq!(
            kinds("System/Library/Frameworks/UIKit.framework;"),
            vec![
                word("System/Library/Frameworks/UIKit.framework", false),
                TokenKind::Semicolon
            ]
        );
    }

    #[test]
    fn escapes_are_decoded() {
        assert_eq!(
            kinds(r#""a\"b\\c\nd""#),
            vec![word("a\"b\\c\nd", true)]
        );
    }

    #[test]
    fn tracks_positions() {
        let tokens = tokenize("{\n\tkey = value;\n}").unwrap();
        let key = &tokens[1];
        assert_eq!((key.line, key.column), (2, 2));
    }

    #[test]
    fn unterminated_string_is_malformed() {
        let err = tokenize("{ a = \"open; }").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn unterminated_comment_is_malformed() {
        assert!(tokenize("{ /* never closed").unwrap_err().is_malformed());
    }
}
