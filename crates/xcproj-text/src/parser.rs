//! Parser: text to [`Graph`].
//!
//! Parsing runs in two stages. The first builds a syntax tree of
//! dictionaries, arrays and words, attaching any `/* */` comment that
//! directly follows a word. The second types every object against its
//! kind's schema, checks that every reference resolves, and assembles the
//! graph. Any failure yields an error and no graph.

use std::collections::HashSet;

use tracing::debug;
use xcproj_core::{
    field_type, project_name_from_comment, Archive, Dict, FieldType, Graph, IdGenerator,
    Identifier, Kind, Node, RandomIds, Value,
};
use xcproj_core::{Fields, GraphError};

use crate::error::{Result, TextError};
use crate::lexer::{tokenize, Token, TokenKind};

/// A word token with its position and trailing comment.
#[derive(Debug, Clone)]
struct Word {
    text: String,
    quoted: bool,
    comment: Option<String>,
    line: usize,
    column: usize,
}

#[derive(Debug, Clone)]
enum Raw {
    Word(Word),
    Dict(Vec<(Word, Raw)>),
    Array(Vec<Raw>),
}

impl Raw {
    fn position(&self) -> (usize, usize) {
        match self {
            Raw::Word(w) => (w.line, w.column),
            Raw::Dict(entries) => entries.first().map_or((0, 0), |(k, _)| (k.line, k.column)),
            Raw::Array(items) => items.first().map_or((0, 0), Raw::position),
        }
    }
}

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    end: (usize, usize),
}

impl Cursor {
    fn skip_comments(&mut self) {
        while matches!(
            self.tokens.get(self.pos).map(|t| &t.kind),
            Some(TokenKind::Comment(_))
        ) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<&Token> {
        self.skip_comments();
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        self.skip_comments();
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// A comment immediately after the last consumed token.
    fn trailing_comment(&mut self) -> Option<String> {
        match self.tokens.get(self.pos).map(|t| &t.kind) {
            Some(TokenKind::Comment(text)) => {
                let text = text.clone();
                self.pos += 1;
                Some(text)
            }
            _ => None,
        }
    }

    fn eof(&self, what: &str) -> TextError {
        TextError::malformed(self.end.0, self.end.1, format!("unexpected end of input: {what}"))
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<()> {
        match self.next() {
            Some(tok) if &tok.kind == kind => Ok(()),
            Some(tok) => Err(unexpected(&tok, what)),
            None => Err(self.eof(what)),
        }
    }

    fn word(&mut self, what: &str) -> Result<Word> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Word { text, quoted },
                line,
                column,
            }) => {
                let comment = self.trailing_comment();
                Ok(Word {
                    text,
                    quoted,
                    comment,
                    line,
                    column,
                })
            }
            Some(tok) => Err(unexpected(&tok, what)),
            None => Err(self.eof(what)),
        }
    }

    fn value(&mut self) -> Result<Raw> {
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::LBrace) => {
                self.next();
                self.dict_body()
            }
            Some(TokenKind::LParen) => {
                self.next();
                self.array_body()
            }
            Some(_) => Ok(Raw::Word(self.word("a value")?)),
            None => Err(self.eof("expected a value")),
        }
    }

    /// Entries up to and including the closing brace.
    fn dict_body(&mut self) -> Result<Raw> {
        let mut entries = Vec::new();
        loop {
            match self.peek().map(|t| t.kind.clone()) {
                Some(TokenKind::RBrace) => {
                    self.next();
                    return Ok(Raw::Dict(entries));
                }
                Some(_) => {
                    let key = self.word("a dictionary key")?;
                    self.expect(&TokenKind::Equals, "'=' after key")?;
                    let value = self.value()?;
                    self.expect(&TokenKind::Semicolon, "';' after value")?;
                    entries.push((key, value));
                }
                None => return Err(self.eof("unterminated dictionary")),
            }
        }
    }

    /// Elements up to and including the closing parenthesis.
    fn array_body(&mut self) -> Result<Raw> {
        let mut items = Vec::new();
        loop {
            match self.peek().map(|t| t.kind.clone()) {
                Some(TokenKind::RParen) => {
                    self.next();
                    return Ok(Raw::Array(items));
                }
                Some(_) => {
                    items.push(self.value()?);
                    match self.next() {
                        Some(Token {
                            kind: TokenKind::Comma,
                            ..
                        }) => {}
                        Some(Token {
                            kind: TokenKind::RParen,
                            ..
                        }) => return Ok(Raw::Array(items)),
                        Some(tok) => return Err(unexpected(&tok, "',' or ')' in list")),
                        None => return Err(self.eof("unterminated list")),
                    }
                }
                None => return Err(self.eof("unterminated list")),
            }
        }
    }
}

fn unexpected(tok: &Token, what: &str) -> TextError {
    let found = match &tok.kind {
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Equals => "'='".to_string(),
        TokenKind::Semicolon => "';'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Word { text, .. } => format!("{text:?}"),
        TokenKind::Comment(_) => "comment".to_string(),
    };
    TextError::malformed(tok.line, tok.column, format!("expected {what}, found {found}"))
}

/// Parse a project document using random identifiers for new objects.
pub fn parse(text: &str) -> Result<Graph> {
    parse_with(text, Box::new(RandomIds))
}

/// Parse a project document, injecting the identifier source the graph
/// will use for objects created later.
pub fn parse_with(text: &str, generator: Box<dyn IdGenerator>) -> Result<Graph> {
    let tokens = tokenize(text)?;
    let end = tokens
        .last()
        .map_or((1, 1), |t| (t.line, t.column));
    let header = match tokens.first().map(|t| &t.kind) {
        Some(TokenKind::Comment(_)) if text.starts_with("//") => {
            text.lines().next().unwrap_or_default().trim_end().to_string()
        }
        _ => Archive::DEFAULT_HEADER.to_string(),
    };

    let mut cursor = Cursor {
        tokens,
        pos: 0,
        end,
    };
    cursor.expect(&TokenKind::LBrace, "'{' at start of document")?;
    let Raw::Dict(top) = cursor.dict_body()? else {
        return Err(TextError::malformed(1, 1, "document is not a dictionary"));
    };
    if let Some(tok) = cursor.next() {
        return Err(unexpected(&tok, "end of document"));
    }

    let graph = assemble(header, top, generator)?;
    debug!(nodes = graph.node_count(), "parsed project document");
    Ok(graph)
}

fn assemble(header: String, top: Vec<(Word, Raw)>, generator: Box<dyn IdGenerator>) -> Result<Graph> {
    let mut objects = None;
    let mut root = None;
    let mut archive = Archive {
        header,
        entries: Dict::new(),
    };
    let mut seen = HashSet::new();
    for (key, value) in top {
        if !seen.insert(key.text.clone()) {
            return Err(TextError::malformed(
                key.line,
                key.column,
                format!("duplicate key {:?}", key.text),
            ));
        }
        match key.text.as_str() {
            "objects" => match value {
                Raw::Dict(entries) => objects = Some(entries),
                other => {
                    let (line, column) = other.position();
                    return Err(TextError::malformed(line, column, "objects must be a dictionary"));
                }
            },
            "rootObject" => match value {
                Raw::Word(w) => root = Some(w),
                other => {
                    let (line, column) = other.position();
                    return Err(TextError::malformed(line, column, "rootObject must be an identifier"));
                }
            },
            _ => {
                let value = untyped(&value, &HashSet::new());
                archive.entries.insert(key.text, value);
            }
        }
    }

    let objects = objects.ok_or_else(|| TextError::malformed(1, 1, "missing objects dictionary"))?;
    let root = root.ok_or_else(|| TextError::malformed(1, 1, "missing rootObject"))?;

    let mut ids = HashSet::new();
    for (key, _) in &objects {
        let id = Identifier::parse(&key.text).map_err(|_| {
            TextError::malformed(key.line, key.column, format!("invalid object identifier {:?}", key.text))
        })?;
        if !ids.insert(id) {
            return Err(TextError::malformed(
                key.line,
                key.column,
                format!("duplicate object {}", key.text),
            ));
        }
    }

    let mut nodes = Vec::with_capacity(objects.len());
    for (key, value) in objects {
        nodes.push(object(key, value, &ids)?);
    }

    let root_id = Identifier::parse(&root.text)
        .map_err(|_| TextError::malformed(root.line, root.column, "invalid rootObject"))?;
    let project_name = nodes
        .iter()
        .find(|n| n.id == root_id)
        .and_then(|p| p.ref_field("buildConfigurationList"))
        .and_then(|list| nodes.iter().find(|n| &n.id == list))
        .and_then(|list| list.comment.as_deref())
        .and_then(project_name_from_comment)
        .map(str::to_string);

    let mut graph = Graph::from_parts(archive, nodes, root_id, generator)?;
    if let Some(name) = project_name {
        graph.set_project_name(name);
    }
    Ok(graph)
}

fn object(key: Word, value: Raw, ids: &HashSet<Identifier>) -> Result<Node> {
    let Raw::Dict(entries) = value else {
        return Err(TextError::malformed(
            key.line,
            key.column,
            format!("object {} is not a dictionary", key.text),
        ));
    };
    let id = Identifier::parse(&key.text)?;

    let isa = entries
        .iter()
        .find(|(k, _)| k.text == "isa")
        .and_then(|(_, v)| match v {
            Raw::Word(w) => Some(w.text.clone()),
            _ => None,
        })
        .ok_or_else(|| TextError::malformed(key.line, key.column, format!("object {id} has no isa")))?;
    let kind = Kind::from_isa(&isa).ok_or_else(|| TextError::UnknownKind {
        id: id.to_string(),
        isa: isa.clone(),
    })?;

    let mut fields = Fields::new();
    for (name, raw) in entries {
        if name.text == "isa" {
            continue;
        }
        let value = typed(kind, &name.text, &raw, ids)?;
        if fields.insert(name.text.clone(), value).is_some() {
            return Err(TextError::malformed(
                name.line,
                name.column,
                format!("duplicate field {:?} in {id}", name.text),
            ));
        }
    }

    let mut node = Node::new(id, kind, fields);
    node.comment = key.comment;
    Ok(node)
}

/// Convert a raw value according to the declared type of `field`.
fn typed(kind: Kind, field: &str, raw: &Raw, ids: &HashSet<Identifier>) -> Result<Value> {
    let mismatch = |expected: &str| {
        let (line, column) = raw.position();
        TextError::malformed(line, column, format!("{kind}.{field} expects {expected}"))
    };
    match field_type(kind, field) {
        FieldType::Ref(_) => match raw {
            Raw::Word(w) => reference(kind, field, w, ids),
            _ => Err(mismatch("a reference")),
        },
        FieldType::RefList(_) => match raw {
            Raw::Array(items) => items
                .iter()
                .map(|item| match item {
                    Raw::Word(w) => reference(kind, field, w, ids),
                    _ => Err(mismatch("a list of references")),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            _ => Err(mismatch("a list of references")),
        },
        FieldType::Integer => match raw {
            Raw::Word(w) if !w.quoted && is_canonical_integer(&w.text) => w
                .text
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| mismatch("an integer")),
            _ => Err(mismatch("an integer")),
        },
        FieldType::String => match raw {
            Raw::Word(w) => Ok(Value::String(w.text.clone())),
            _ => Err(mismatch("a string")),
        },
        FieldType::StringList => match raw {
            Raw::Array(items) => items
                .iter()
                .map(|item| match item {
                    Raw::Word(w) => Ok(Value::String(w.text.clone())),
                    _ => Err(mismatch("a list of strings")),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            _ => Err(mismatch("a list of strings")),
        },
        FieldType::Dict => match raw {
            Raw::Dict(_) => Ok(untyped(raw, ids)),
            _ => Err(mismatch("a dictionary")),
        },
        FieldType::Any => Ok(untyped(raw, ids)),
    }
}

fn reference(kind: Kind, field: &str, w: &Word, ids: &HashSet<Identifier>) -> Result<Value> {
    let id = Identifier::parse(&w.text).map_err(|_| {
        TextError::malformed(w.line, w.column, format!("{kind}.{field}: {:?} is not an identifier", w.text))
    })?;
    if !ids.contains(&id) {
        return Err(GraphError::DanglingReference {
            kind,
            field: field.to_string(),
            target: id,
        }
        .into());
    }
    Ok(Value::Ref(id))
}

/// Convert a value of a field without a declared type.
///
/// A commented word naming a known object is a reference; every other
/// word is a string.
fn untyped(raw: &Raw, ids: &HashSet<Identifier>) -> Value {
    match raw {
        Raw::Word(w) => match Identifier::parse(&w.text) {
            Ok(id) if w.comment.is_some() && ids.contains(&id) => Value::Ref(id),
            _ => Value::String(w.text.clone()),
        },
        Raw::Array(items) => Value::Array(items.iter().map(|i| untyped(i, ids)).collect()),
        Raw::Dict(entries) => Value::Dict(
            entries
                .iter()
                .map(|(k, v)| (k.text.clone(), untyped(v, ids)))
                .collect(),
        ),
    }
}

fn is_canonical_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}
