//! orryc-sem - Semantic Analyzer & Type Checker
//!
//! ============================================================================
//! PIPELINE
//! ============================================================================
//!
//! [`analysis::SemanticAnalyzer`] turns a parsed program into typed HIR in
//! three passes, detailed on [`analysis::SemanticAnalyzer::analyze_items`]:
//! name/type collection, per-SCC Hindley-Milner inference, and a final
//! solving pass. Scopes ([`scope`]) are kind-masked ribs, not a flat map,
//! because a struct binds its own name under both `Type` and `Var`. Types
//! ([`types`]) are a closed five-case universe; there is no subtyping,
//! coercion, trait, or borrow-checking layer, because Orrery has none of
//! those.
//!
//! ============================================================================
//! ERROR REPORTING
//! ============================================================================
//!
//! Diagnostics are built with [`orryc_util::DiagnosticBuilder`] and carry one
//! of the `E_SEMANTIC_*` codes from [`orryc_util::DiagnosticCode`]. An
//! unresolved binding or a failed unification is reported once and recovered
//! with [`types::Type::Any`] rather than aborting the pass, so one mistake
//! does not suppress every other diagnostic in the same file.

pub mod analysis;
pub mod hir;
pub mod infer;
pub mod refgraph;
pub mod scope;
pub mod types;

#[cfg(test)]
mod edge_cases;

pub use analysis::SemanticAnalyzer;
pub use hir::*;
pub use infer::{solve, Constraint as InferConstraint, InferEngine, Scheme};
pub use refgraph::RefGraph;
pub use scope::{kind_mask, BindingKind, Rib, RibId, RibKind, ScopeTree};
pub use types::*;
