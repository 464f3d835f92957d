//! Edge case tests for orryc-lex
