use tracing::debug;

use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Ключевые слова
    While,  // GRRR
    Do,     // BOW
    If,     // RUF?
    Then,   // VUH
    Else,   // ROWH
    End,    // ARRUF, BORF
    // Операторы
    Assign,  // AWOO
    Less,    // YIP
    Greater, // YAP
    Minus,   // BARK
    Plus,    // WOOF
    Times,   // ARF
    // Идентификаторы и числа
    Word(String),
}

impl Token {
    /// Maps one whitespace-delimited word through the keyword table.
    pub fn from_word(word: &str) -> Self {
        match word {
            "AWOO" => Token::Assign,
            "GRRR" => Token::While,
            "YIP" => Token::Less,
            "BOW" => Token::Do,
            "RUF?" => Token::If,
            "YAP" => Token::Greater,
            "VUH" => Token::Then,
            "BARK" => Token::Minus,
            "ROWH" => Token::Else,
            "WOOF" => Token::Plus,
            "ARF" => Token::Times,
            "ARRUF" | "BORF" => Token::End,
            _ => Token::Word(word.to_string()),
        }
    }

    /// True for a raw word made only of ASCII digits.
    pub fn is_numeric(&self) -> bool {
        match self {
            Token::Word(word) => !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit()),
            _ => false,
        }
    }
}

/// A token together with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
}

/// Splits the source on runs of whitespace. Never fails: anything that is not
/// a keyword passes through as a `Token::Word`.
pub fn tokenize(source: &str) -> Vec<Lexeme> {
    let mut lexemes = Vec::new();
    let mut line = 1;
    let mut column = 1;
    // (byte offset, line, column) of the word being read
    let mut word_start: Option<(usize, usize, usize)> = None;

    for (offset, ch) in source.char_indices() {
        if ch.is_whitespace() {
            if let Some((start, start_line, start_column)) = word_start.take() {
                lexemes.push(Lexeme {
                    token: Token::from_word(&source[start..offset]),
                    span: Span::new(start_line, start_column, start, offset),
                });
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
            continue;
        }

        if word_start.is_none() {
            word_start = Some((offset, line, column));
        }
        column += 1;
    }

    if let Some((start, start_line, start_column)) = word_start {
        lexemes.push(Lexeme {
            token: Token::from_word(&source[start..]),
            span: Span::new(start_line, start_column, start, source.len()),
        });
    }

    debug!(count = lexemes.len(), "tokenized source");
    lexemes
}
