// This module converts source text into the token stream consumed by the
// parser. Identifiers are interned through a naming side-table that hands out
// small dense ids, with the three I/O intrinsics InputNum, OutputNum and
// OutputNewLine pre-seeded at ids 0..2 so the symbol table and call lowering
// can recognize them by id alone. Line comments start with // and run to end
// of line. Characters that fit no token are collected into Unknown tokens and
// left for the parser to report, keeping tokenization infallible.

//! Tokenizer for the smpl language.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// Kind of one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // keywords
    Main,
    Call,
    Return,
    Let,
    Var,
    If,
    Then,
    Else,
    Fi,
    While,
    Do,
    Od,
    Void,
    Function,

    // delimiters
    Period,
    Comma,
    Semi,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Assign,

    // relational operators
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,

    // arithmetic operators
    Plus,
    Minus,
    Mul,
    Div,

    Ident,
    Number,
    Unknown,
}

/// One token. `val` carries the literal for numbers and the interned id for
/// identifiers; `text` carries the identifier spelling (or the offending
/// characters for Unknown).
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub val: Option<u64>,
    pub text: String,
}

impl Token {
    fn bare(kind: TokenKind) -> Self {
        Self {
            kind,
            val: None,
            text: String::new(),
        }
    }
}

fn keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "main" => TokenKind::Main,
        "call" => TokenKind::Call,
        "return" => TokenKind::Return,
        "let" => TokenKind::Let,
        "var" => TokenKind::Var,
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "else" => TokenKind::Else,
        "fi" => TokenKind::Fi,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "od" => TokenKind::Od,
        "void" => TokenKind::Void,
        "function" => TokenKind::Function,
        _ => return None,
    })
}

/// The finite, already-tokenized stream: O(1) peek of the next kind plus
/// advance.
#[derive(Debug)]
pub struct TokenList {
    toks: Vec<Token>,
    index: usize,
}

impl TokenList {
    /// Tokenize a whole source string. Never fails; malformed input becomes
    /// Unknown tokens the parser reports.
    pub fn tokenize(src: &str) -> Self {
        let mut names: HashMap<String, u64> = HashMap::new();
        names.insert("InputNum".to_string(), 0);
        names.insert("OutputNum".to_string(), 1);
        names.insert("OutputNewLine".to_string(), 2);
        let mut next_id: u64 = 3;

        let mut toks = Vec::new();
        let mut chars = src.chars().peekable();
        while let Some(c) = chars.next() {
            if c.is_whitespace() {
                continue;
            }
            match c {
                '+' => toks.push(Token::bare(TokenKind::Plus)),
                '-' => toks.push(Token::bare(TokenKind::Minus)),
                '*' => toks.push(Token::bare(TokenKind::Mul)),
                '/' => {
                    if chars.peek() == Some(&'/') {
                        for c in chars.by_ref() {
                            if c == '\n' {
                                break;
                            }
                        }
                    } else {
                        toks.push(Token::bare(TokenKind::Div));
                    }
                }
                '.' => toks.push(Token::bare(TokenKind::Period)),
                ',' => toks.push(Token::bare(TokenKind::Comma)),
                ';' => toks.push(Token::bare(TokenKind::Semi)),
                '(' => toks.push(Token::bare(TokenKind::LParen)),
                ')' => toks.push(Token::bare(TokenKind::RParen)),
                '{' => toks.push(Token::bare(TokenKind::LBrace)),
                '}' => toks.push(Token::bare(TokenKind::RBrace)),
                '=' => {
                    if chars.peek() == Some(&'=') {
                        chars.next();
                        toks.push(Token::bare(TokenKind::Eq));
                    } else {
                        toks.push(Token {
                            kind: TokenKind::Unknown,
                            val: None,
                            text: "=".to_string(),
                        });
                    }
                }
                '!' => {
                    if chars.peek() == Some(&'=') {
                        chars.next();
                        toks.push(Token::bare(TokenKind::NotEq));
                    } else {
                        toks.push(Token {
                            kind: TokenKind::Unknown,
                            val: None,
                            text: "!".to_string(),
                        });
                    }
                }
                '>' => {
                    if chars.peek() == Some(&'=') {
                        chars.next();
                        toks.push(Token::bare(TokenKind::GreaterEq));
                    } else {
                        toks.push(Token::bare(TokenKind::Greater));
                    }
                }
                '<' => match chars.peek() {
                    Some(&'-') => {
                        chars.next();
                        toks.push(Token::bare(TokenKind::Assign));
                    }
                    Some(&'=') => {
                        chars.next();
                        toks.push(Token::bare(TokenKind::LessEq));
                    }
                    _ => toks.push(Token::bare(TokenKind::Less)),
                },
                d if d.is_ascii_digit() => {
                    let mut num = (d as u64) - ('0' as u64);
                    while let Some(&p) = chars.peek() {
                        if !p.is_ascii_digit() {
                            break;
                        }
                        chars.next();
                        num = num * 10 + ((p as u64) - ('0' as u64));
                    }
                    toks.push(Token {
                        kind: TokenKind::Number,
                        val: Some(num),
                        text: String::new(),
                    });
                }
                a if a.is_ascii_alphabetic() => {
                    let mut word = String::from(a);
                    while let Some(&p) = chars.peek() {
                        if !p.is_ascii_alphanumeric() {
                            break;
                        }
                        chars.next();
                        word.push(p);
                    }
                    if let Some(kind) = keyword(&word) {
                        toks.push(Token::bare(kind));
                    } else {
                        let id = *names.entry(word.clone()).or_insert_with(|| {
                            let id = next_id;
                            next_id += 1;
                            id
                        });
                        toks.push(Token {
                            kind: TokenKind::Ident,
                            val: Some(id),
                            text: word,
                        });
                    }
                }
                other => {
                    let mut text = String::from(other);
                    while let Some(&p) = chars.peek() {
                        if p.is_whitespace() {
                            break;
                        }
                        chars.next();
                        text.push(p);
                    }
                    log::debug!("unrecognized characters '{text}'");
                    toks.push(Token {
                        kind: TokenKind::Unknown,
                        val: None,
                        text,
                    });
                }
            }
        }
        Self { toks, index: 0 }
    }

    /// Kind of the next token; Unknown once the stream is exhausted.
    pub fn kind(&self) -> TokenKind {
        self.toks
            .get(self.index)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Unknown)
    }

    pub fn current(&self) -> Option<&Token> {
        self.toks.get(self.index)
    }

    pub fn eat(&mut self) {
        self.index += 1;
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.toks.len().saturating_sub(self.index)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.toks
    }
}
