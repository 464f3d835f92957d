//! orryc-util - Core utilities and foundation types
//!
//! Shared infrastructure used by every other `orryc-*` crate: interned
//! identifiers ([`symbol`]), source locations ([`span`]), diagnostics
//! ([`diagnostic`]), typed vector indices ([`index_vec`]), and definition
//! identifiers ([`def_id`]).
//!
//! None of these types encode anything specific to Orrery's grammar or type
//! system; they exist so the lexer, parser, and checker crates share one
//! vocabulary for "a name", "a place in the source", and "something went
//! wrong".

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, DefIdGenerator};
pub use error::{
    DiagnosticError, DiagnosticResult, IndexVecError, IndexVecResult, SourceMapError,
    SourceMapResult, SymbolError, SymbolResult,
};
pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Handler, Level};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceFile, SourceMap, Span};
pub use symbol::Symbol;

pub use rustc_hash::{FxHashMap, FxHashSet};
