//! Indentation-to-token translation.
//!
//! Orrery has no braces around block bodies; nesting is expressed purely by
//! indentation. [`BlockLexer`] wraps the column-agnostic [`crate::Lexer`] and
//! inserts [`Token::BlockStart`], [`Token::BlockEnd`], and
//! [`Token::LineFoldEnd`] by comparing each line's leading column against a
//! stack of currently-open indentation levels, so the parser can treat
//! indentation exactly like a brace/semicolon language.

use crate::{Lexer, Token};
use orryc_util::Handler;
use std::collections::VecDeque;

pub struct BlockLexer<'a> {
    lexer: Lexer<'a>,
    indents: Vec<u32>,
    pending: VecDeque<Token>,
    last_line: u32,
    done: bool,
}

impl<'a> BlockLexer<'a> {
    pub fn new(source: &'a str, handler: &'a mut Handler) -> Self {
        Self {
            lexer: Lexer::new(source, handler),
            indents: vec![0],
            pending: VecDeque::new(),
            last_line: 0,
            done: false,
        }
    }

    /// Returns the next token, including any synthesized block/fold tokens.
    pub fn next_token(&mut self) -> Token {
        if let Some(tok) = self.pending.pop_front() {
            return tok;
        }
        if self.done {
            return Token::Eof;
        }

        let raw = self.lexer.next_token();
        if raw == Token::Eof {
            self.done = true;
            while self.indents.len() > 1 {
                self.indents.pop();
                self.pending.push_back(Token::BlockEnd);
            }
            self.pending.push_back(Token::Eof);
            return self.pending.pop_front().unwrap();
        }

        let line = self.lexer.token_start_line();
        let column = self.lexer.token_start_column();

        if line != self.last_line {
            self.last_line = line;
            let top = *self.indents.last().unwrap();
            if column > top {
                self.indents.push(column);
                self.pending.push_back(raw);
                return Token::BlockStart;
            } else if column == top {
                self.pending.push_back(raw);
                return Token::LineFoldEnd;
            } else {
                while self.indents.len() > 1 && column < *self.indents.last().unwrap() {
                    self.indents.pop();
                    self.pending.push_back(Token::BlockEnd);
                }
                self.pending.push_back(raw);
                return self.pending.pop_front().unwrap();
            }
        }

        raw
    }
}

impl<'a> Iterator for BlockLexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token == Token::Eof && self.pending.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut handler = Handler::new();
        let mut lexer = BlockLexer::new(source, &mut handler);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let is_eof = tok == Token::Eof;
            out.push(tok);
            if is_eof {
                break;
            }
        }
        out
    }

    #[test]
    fn flat_line_has_no_block_tokens() {
        let toks = tokens("let x = 1");
        assert!(!toks.contains(&Token::BlockStart));
        assert!(!toks.contains(&Token::BlockEnd));
    }

    #[test]
    fn indented_body_opens_and_closes_a_block() {
        let toks = tokens("if true then\n    let x = 1\nelse\n    let y = 2");
        let starts = toks.iter().filter(|t| **t == Token::BlockStart).count();
        let ends = toks.iter().filter(|t| **t == Token::BlockEnd).count();
        assert_eq!(starts, ends);
        assert!(starts >= 2);
    }

    #[test]
    fn same_column_statements_are_fold_separated() {
        let toks = tokens("let x = 1\nlet y = 2");
        assert!(toks.contains(&Token::LineFoldEnd));
    }
}
