//! orryc-syntax - Parser (Syntactic Analyzer)
//!
//! ============================================================================
//! PARSING THEORY
//! ============================================================================
//!
//! Parsing is the process of analyzing a string of tokens to determine
//! its grammatical structure according to a formal grammar. The output
//! is an Abstract Syntax Tree (AST).
//!
//! FORMAL DEFINITION:
//! ------------------
//! Given:
//! - G = (N, T, P, S) where
//!   N = non-terminal symbols
//!   T = terminal symbols (tokens)
//!   P = production rules
//!   S = start symbol
//!
//! Parsing is finding a derivation S ⇒* w where w is the input token sequence.
//!
//! GRAMMAR TYPES (Chomsky Hierarchy):
//! ----------------------------------
//!
//! Type 0: Unrestricted (Turing-complete)
//! Type 1: Context-sensitive
//! Type 2: Context-free (most programming languages)
//! Type 3: Regular (tokens/lexer)
//!
//! Most programming languages use context-free grammars (CFG) with some
//! context-sensitive elements (e.g., type checking) handled later.
//!
//! GRAMMAR NOTATION:
//! -----------------
//! We use Extended Backus-Naur Form (EBNF):
//!
//! ```ebnf
//! function = "fn" identifier "(" parameters ")" [ "->" type ] block ;
//!
//! parameters = [ parameter { "," parameter } ] ;
//!
//! parameter = identifier ":" type ;
//!
//! block = "{" { statement } "}" ;
//! ```
//!
//! Symbols:
//! - "literal" = exact token match
//! - [ optional ] = zero or one
//! - { repetition } = zero or more
//! - ( grouping ) = precedence
//! - | = alternation (choice)
//!
//! ============================================================================
//! PARSING ALGORITHMS
//! ============================================================================
//!
//! ALGORITHM 1: RECURSIVE DESCENT
//! ------------------------------
//!
//! A top-down parser where each non-terminal has a corresponding function.
//!
//! Structure:
//! ```
//! parse_function() {
//!     expect(Fn);
//!     name = parse_identifier();
//!     expect(LParen);
//!     params = parse_parameters();
//!     expect(RParen);
//!     ret = optional(parse_return_type);
//!     body = parse_block();
//!     return Function { name, params, ret, body };
//! }
//! ```
//!
//! REQUIREMENTS:
//! - Grammar must not be left-recursive
//! - Predictive (no backtracking) requires LL(1) grammar
//!
//! LEFT RECURSION ELIMINATION:
//! ---------------------------
//!
//! Problem:
//! ```
//! expr := expr + term | term
//! ```
//!
//! This causes infinite recursion in recursive descent!
//!
//! Solution - Transform to right recursion:
//! ```
//! expr := term { + term }
//! ```
//!
//! Or use iteration:
//! ```
//! parse_expr() {
//!     left = parse_term();
//!     while current == Plus {
//!         consume(Plus);
//!         right = parse_term();
//!         left = Binary(left, Plus, right);
//!     }
//!     return left;
//! }
//! ```
//!
//! ALGORITHM 2: PRATT PARSING (TOP-DOWN OPERATOR PRECEDENCE)
//! ---------------------------------------------------------
//!
//! Efficient expression parsing handling precedence and associativity.
//!
//! KEY IDEA:
//! Each token has two binding powers:
//! - Left binding power (lbp): How strongly it binds to the left
//! - Right binding power (rbp): How strongly it binds to the right
//!
//! Higher binding power = tighter grouping
//!
//! PRECEDENCE TABLE (higher number = tighter binding):
//! ```
//! Token       lbp     rbp     Associativity
//! -----------------------------------------
//! =           1       2       Right
//! ||          3       4       Left
//! &&          5       6       Left
//! ==, !=      7       8       Left
//! <, >, etc.  9       10      Left
//! +, -        11      12      Left
//! *, /, %     13      14      Left
//! !, - (unary)15      -       Prefix
//!
//! Literals    0       -       Atom
//! ```
//!
//! ALGORITHM:
//! ```
//! parse_expression(min_bp) {
//!     // Parse prefix (atom or prefix operator)
//!     lhs = parse_prefix();
//!     
//!     while lbp(current) >= min_bp {
//!         op = current;
//!         advance();
//!         rhs = parse_expression(rbp(op));
//!         lhs = Binary(lhs, op, rhs);
//!     }
//!     
//!     return lhs;
//! }
//! ```
//!
//! EXAMPLE:
//! ```
//! Input: a + b * c
//!
//! parse_expression(0):
//!   lhs = parse_prefix() → "a"
//!   
//!   lbp(+) = 11 >= 0, so:
//!     op = +
//!     advance()
//!     rhs = parse_expression(12)  // rbp(+) = 12
//!       parse_prefix() → "b"
//!       lbp(*) = 13 >= 12, so:
//!         op = *
//!         advance()
//!         rhs = parse_expression(14) → "c"
//!         lhs = Binary("b", *, "c")
//!       lbp(end) = 0 < 12, stop
//!       return Binary("b", *, "c")
//!     lhs = Binary("a", +, Binary("b", *, "c"))
//!   
//!   lbp(end) = 0 < 0, stop
//!   return Binary("a", +, Binary("b", *, "c"))
//! ```
//!
//! RESULT: Correct precedence: a + (b * c)
//!
//! ALGORITHM 3: LR PARSING (BOTTOM-UP)
//! -----------------------------------
//!
//! Not used in this implementation but important to understand.
//!
//! Uses a stack and state machine (DFA) to shift tokens and reduce
//! by production rules.
//!
//! Actions:
//! - Shift: Push token onto stack
//! - Reduce: Replace top N stack items with non-terminal
//!
//! Advantages:
//! - Handles left recursion naturally
//! - More powerful than LL (can parse more grammars)
//!
//! Disadvantages:
//! - Harder to write by hand
//! - Error messages less clear
//!
//! ============================================================================
//! ABSTRACT SYNTAX TREE (AST)
//! ============================================================================
//!
//! The AST represents the syntactic structure of code as a tree.
//! It abstracts away concrete syntax (parentheses, semicolons) and
//! focuses on semantic structure.
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! 1. COMPLETENESS: Capture all semantic information
//! 2. ABSTRACTION: Remove syntactic sugar
//! 3. UNAMBIGUITY: One AST node per construct
//! 4. EXTENSIBILITY: Easy to add new node types
//!
//! AST vs CST (Concrete Syntax Tree):
//! ----------------------------------
//! CST includes all tokens (parentheses, braces, etc.).
//! AST is abstracted - only essential information.
//!
//! Example:
//! ```
//! Source: (a + b) * c
//!
//! CST:
//!   BinaryExpr
//!   ├── LParen "("
//!   ├── BinaryExpr
//!   │   ├── Ident "a"
//!   │   ├── Plus "+"
//!   │   └── Ident "b"
//!   ├── RParen ")"
//!   ├── Star "*"
//!   └── Ident "c"
//!
//! AST:
//!   BinaryExpr(*)
//!   ├── BinaryExpr(+)
//!   │   ├── Ident("a")
//!   │   └── Ident("b")
//!   └── Ident("c")
//! ```
//!
//! NODE TYPES:
//! -----------
//!
//! 1. ITEMS - Top-level declarations
//!    - Functions
//!    - Structs
//!    - Enums
//!    - Traits
//!    - Impl blocks
//!
//! 2. STATEMENTS - Executable code units
//!    - Let bindings
//!    - Expression statements
//!    - Control flow (if, while, for)
//!    - Return
//!
//! 3. EXPRESSIONS - Values and operations
//!    - Literals
//!    - Identifiers
//!    - Binary operations
//!    - Unary operations
//!    - Function calls
//!    - Field access
//!    - Block expressions
//!    - If/match expressions
//!    - Async block expressions
//!    - Await expressions
//!
//! 4. TYPES - Type expressions
//!    - Named types
//!    - Generic types
//!    - Reference types
//!    - Function types
//!    - Tuple types
//!
//! ============================================================================
//! ERROR RECOVERY
//! ============================================================================
//!
//! When parser encounters syntax error, it should:
//! 1. Report clear error message
//! 2. Recover to continue parsing
//! 3. Avoid cascading errors
//!
//! STRATEGY 1: PANIC MODE
//! ----------------------
//! Skip tokens until reaching synchronization point.
//!
//! Sync points:
//! - Statement separators (;)
//! - Block boundaries ({, })
//! - Top-level declarations
//!
//! ```
//! if x { y } else { z  // Missing }
//!
//! fn foo() { }         // Sync at 'fn'
//! ```
//!
//! STRATEGY 2: STATEMENT SKIPPING
//! ------------------------------
//! If error in statement, skip to next statement.
//!
//! STRATEGY 3: EXPECTED TOKEN INSERTION
//! ------------------------------------
//! Assume missing token exists and continue.
//!
//! ```
//! let x =           // Missing expression
//! let y = 10;
//!
//! Recovery: Insert dummy expression after '='
//! ```
//!
//! STRATEGY 4: DELIMITER MATCHING
//! ------------------------------
//! Match opening/closing delimiters intelligently.
//!
//! ```
//! { a + b           // Missing }
//!
//! Recovery: Insert } before next top-level item
//! ```
//!
//! ERROR MESSAGE QUALITY:
//! ----------------------
//! Good error messages should:
//! 1. Clearly state what was expected
//! 2. Show what was found instead
//! 3. Provide location (line, column)
//! 4. Suggest fix if obvious
//!
//! Example:
//! ```
//! error: expected `;`, found `let`
//!   --> main.fax:3:5
//!    |
//!  2 |     x = 5
//!    |          - help: consider adding `;` here
//!  3 |     let y = 10;
//!    |     ^^^ unexpected token
//! ```

// ============================================================================
// MACRO SYSTEM
// ============================================================================
//!
//! Fax supports three types of macros, similar to Rust:
//! 1. Declarative Macros (`macro_rules!`)
//! 2. Derive Macros (`#[derive(...)]`)
//! 3. Function-like Macros (`println!`, `vec![]`)
//!
//! ============================================================================
//! MACRO OVERVIEW
//! ============================================================================
//!
//! Macros provide compile-time code generation. They allow writing code
//! that writes other code, reducing boilerplate and enabling DSLs.
//!
//! KEY DIFFERENCE FROM FUNCTIONS:
//! - Functions: operate on values
//! - Macros: operate on code (tokens), expanded before compilation
//!
//! ============================================================================
//! DECLARATIVE MACROS (macro_rules!)
//! ============================================================================
//!
//! Declarative macros use pattern matching to generate code.
//!
//! SYNTAX:
//! -------
//! ```fax
//! macro_rules! macro_name {
//!     (pattern1) => { generated_code1 };
//!     (pattern2) => { generated_code2 };
//!     // ... more patterns
//! }
//! ```
//!
//! MACRO PATTERNS:
//! --------------
//! 1. LITERAL PATTERNS - Match exact tokens
//!    ```
//!    () => { ... }           // Match empty
//!    + => { ... }            // Match + operator
//!    fn => { ... }           // Match fn keyword
//!    ```
//!
//! 2. CAPTURE PATTERNS - Match and bind tokens
//!    ```
//!    $name:expr              // Match any expression, bind as "name"
//!    $name:ident             // Match any identifier
//!    $name:ty                // Match any type
//!    $name:pat              // Match any pattern
//!    $name:stmt             // Match any statement
//!    $name:block            // Match any block
//!    $name:meta             // Match any attribute/meta
//!    $name:item            // Match any item (fn, struct, etc.)
//!    $name:lifetime         // Match any lifetime
//!
//!    $name:tt               // Match any token tree
//!    $name:vis              // Match any visibility modifier
//!    ```
//!
//! 3. REPETITION PATTERNS - Match multiple tokens
//!    ```
//!    $($item:expr),*        // Zero or more, separated by comma
//!    $($item:expr)+         // One or more, separated by comma
//!    $($item:expr)?        // Optional (zero or one)
//!    $($item:expr),* $(,)? // Optional trailing comma
//!    ```
//!
//! EXAMPLE - vec![]:
//! -----------------
//! ```fax
//! macro_rules! vec {
//!     // vec![1, 2, 3]
//!     ($($item:expr),* $(,)?) => {
//!         {
//!             let mut temp_vec = ::std::Vec::new();
//!             $(
//!                 temp_vec.push($item);
//!             )*
//!             temp_vec
//!         }
//!     };
//! }
//! ```
//!
//! EXPANSION:
//! ----------
//! Given: `vec![1, 2, 3]`
//!
//! The macro expands to:
//! ```fax
//! {
//!     let mut temp_vec = ::std::Vec::new();
//!     temp_vec.push(1);
//!     temp_vec.push(2);
//!     temp_vec.push(3);
//!     temp_vec
//! }
//! ```
//!
//! EXAMPLE - map![]:
//! -----------------
//! ```fax
//! macro_rules! map {
//!     ($($key:expr => $value:expr),* $(,)?) => {{
//!         ::std::collections::HashMap::from([
//!             $(($key, $value)),*
//!         ])
//!     }};
//! }
//! ```
//!
//! Usage: `map!["a" => 1, "b" => 2]`
//!
//! EXAMPLE - html! DSL:
//! --------------------
//! ```fax
//! macro_rules! html {
//!     ($tag:ident $($attr:ident = $value:expr)*) => {{
//!         format!("<{}>", stringify!($tag))
//!     }};
//! }
//! ```
//!
//! ============================================================================
//! DERIVE MACROS
//! ============================================================================
//!
//! Derive macros generate trait implementations automatically.
//!
//! SYNTAX:
//! -------
//! ```fax
//! #[derive(Trait1, Trait2)]
//! struct MyStruct { ... }
//! ```
//!
//! BUILT-IN DERIVE TRAITS:
//! -----------------------
//!
//! 1. Clone - Generates `clone()` method
//!    ```fax
//!    #[derive(Clone)]
//!    struct Point { x: i32, y: i32 }
//!    ```
//!    Generates:
//!    ```fax
//!    impl Clone for Point {
//!        fn clone(&self) -> Point {
//!            Point { x: self.x, y: self.y }
//!        }
//!    }
//!    ```
//!
//! 2. Debug - Generates `fmt()` for debug formatting
//!    ```fax
//!    #[derive(Debug)]
//!    struct Point { x: i32, y: i32 }
//!    ```
//!    Generates:
//!    ```fax
//!    impl Debug for Point {
//!        fn fmt(&self, f: &mut Formatter) -> Result {
//!            write!(f, "Point {{ x: {}, y: {} }}", self.x, self.y)
//!        }
//!    }
//!    ```
//!
//! 3. PartialEq - Generates `==` and `!=` operators
//!    ```fax
//!    #[derive(PartialEq)]
//!    struct Point { x: i32, y: i32 }
//!    ```
//!
//! 4. Eq - Generates equality (requires PartialEq)
//!
//! 5. Default - Generates default constructor
//!    ```fax
//!    #[derive(Default)]
//!    struct Config { port: i32 = 8080 }
//!    ```
//!
//! 6. Copy - Generates bitwise copy (no heap allocation)
//!
//! ============================================================================
//! FUNCTION-LIKE MACROS
//! ============================================================================
//!
//! Macros that look like function calls but operate on tokens.
//!
//! BUILT-IN FUNCTION MACROS:
//! -------------------------
//!
//! 1. println! - Print with newline
//!    ```fax
//!    println!("Hello {}", name)
//!    println!("Number: {}", 42)
//!    println!("Multiple: {} and {}", a, b)
//!    ```
//!
//! 2. print! - Print without newline
//!    ```fax
//!    print!("Loading")
//!    print!("\rProgress: {}%", percent)
//!    ```
//!
//! 3. eprintln! - Print to stderr
//!    ```fax
//!    eprintln!("Error: {}", err)
//!    ```
//!
//! 4. format! - Create formatted string
//!    ```fax
//!    let s = format!("{} + {} = {}", a, b, a + b)
//!    ```
//!
//! 5. vec! - Create vector
//!    ```fax
//!    let v = vec![1, 2, 3]
//!    let empty: Vec<i32> = vec![]
//!    ```
//!
//! 6. assert! - Assert condition
//!    ```fax
//!    assert!(x > 0)
//!    assert!(result.is_ok(), "Error: {:?}", result)
//!    ```
//!
//! 7. assert_eq! - Assert equality
//!    ```fax
//!    assert_eq!(a, b)
//!    assert_eq!(result, expected, "custom message")
//!    ```
//!
//! 8. panic! - Panic with message
//!    ```fax
//!    panic!("Something went wrong")
//!    panic!("Expected {} but got {}", expected, got)
//!    ```
//!
//! ============================================================================
//! MACRO HYGIENE
//! ============================================================================
//!
//! Hygiene ensures macros don't accidentally capture or conflict with
//! variables from the calling context.
//!
//! THE PROBLEM:
//! ------------
//! Without hygiene, this macro would fail:
//! ```fax
//! macro_rules! double {
//!     ($x:expr) => { $x * 2 }
//! }
//!
//! fn main() {
//!     let x = 5;
//!     let result = double!(x);  // Should use the x above
//! }
//! ```
//!
//! HYGIENE SOLUTION:
//! -----------------
//! Each identifier created by a macro gets a unique "expansion context".
//! The macro's `x` is different from the caller's `x`.
//!
//! However, you can deliberately "break" hygiene using `$crate::variable`
//! or by passing identifiers that should refer to the caller's scope.
//!
//! ============================================================================
//! MACRO EXPANSION PIPELINE
//! ============================================================================
//!
//! ```
//! Source Code
//!      |
//!      v
//! +------------+
//! |   Lexer    |  Tokenize source
//! +------------+
//!      |
//!      v
//! +------------+
//! |   Parser   |  Parse tokens, recognize macro definitions
//! +------------+
//!      |
//!      v
//! +------------------+
//! | Macro Expansion |  Expand macros to generate code
//! +------------------+
//!      |  (recursive expansion until no macros left)
//!      v
//! +------------------+
//! |  Semantic (HIR) |  Continue normal compilation
//! +------------------+
//!      |
//!      v
//!     ...
//! ```
//!
//! ============================================================================
//! IMPLEMENTATION NOTES
//! ============================================================================
//!
//! 1. TOKEN TREE REPRESENTATION:
//!    - Macros work on token trees, not raw strings
//!    - TokenTree = Token | DelimitedGroup(TokenTree*)
//!    - Need to preserve parentheses, brackets, braces for grouping
//!
//! 2. MATCHING ALGORITHM:
//!    - Use recursive pattern matching
//!    - Handle repetitions with loop/recursion
//!    - Capture binding: store matched tokens per $name
//!
//! 3. EXPANSION:
//!    - Replace $name with captured tokens
//!    - Handle nested repetitions carefully
//!    - Output must be valid AST after expansion
//!
//! 4. ERROR HANDLING:
//!    - Report "no matching rule" clearly
//!    - Show which patterns were tried
//!    - Suggest corrections for common mistakes
//!
//! 5. RECURSIVE EXPANSION:
//!    - Macros can call other macros
//!    - Use worklist: keep expanding until no macros remain
//!    - Watch for infinite recursion (max expansion depth)


pub mod ast;
mod expr;
mod items;
mod pattern;
mod stmt;
mod types;

#[cfg(test)]
mod edge_cases;

use ast::{Ast, BinOp, Expr};
use expr::bp;
use orryc_lex::Token;
use orryc_util::{Handler, Span};

pub use ast::*;

/// Recursive-descent parser over a flat token stream.
///
/// Item, statement, pattern, and type grammar rules live in their own
/// modules (`items`, `stmt`, `pattern`, `types`); this impl block holds the
/// token-stream plumbing they all share and the Pratt expression parser
/// (`parse_expr`/`parse_expr_with_min_bp`), which has no separate leaf rules
/// to split out.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    prev_position: usize,
    handler: &'a mut Handler,
}

impl<'a> Parser<'a> {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>, handler: &'a mut Handler) -> Self {
        Self {
            tokens,
            position: 0,
            prev_position: 0,
            handler,
        }
    }

    /// Create a parser from tokens already carrying spans. The spans
    /// themselves aren't tracked per-node yet; this exists so callers that
    /// lex with [`ast::TokenWithSpan`] don't need to strip spans by hand.
    pub fn from_tokens(tokens: Vec<ast::TokenWithSpan>, handler: &'a mut Handler, _source: &str) -> Self {
        Self::new(tokens.into_iter().map(|t| t.token).collect(), handler)
    }

    /// Parse a complete source file
    pub fn parse(&mut self) -> Ast {
        let mut items = Vec::new();

        while !self.is_at_end() {
            match self.parse_item() {
                Some(item) => items.push(item),
                None => {
                    if self.is_at_end() {
                        break;
                    }
                    self.recover_to_sync_point();
                }
            }
        }

        items
    }

    /// Parse expression using the Pratt parser
    pub fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_expr_with_min_bp(0)
    }

    /// Parse expression with minimum binding power (Pratt parser)
    fn parse_expr_with_min_bp(&mut self, min_bp: u8) -> Option<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            if self.current_token() == Token::As && bp::CAST >= min_bp {
                self.advance();
                let ty = self.parse_type()?;
                lhs = Expr::Cast(Box::new(lhs), ty);
                continue;
            }

            let (_lbp, rbp) = match self.infix_binding_power() {
                Some(bp) if bp.0 >= min_bp => bp,
                _ => break,
            };

            let op = self.current_token();
            self.advance();

            let rhs = self.parse_expr_with_min_bp(rbp)?;
            lhs = Expr::Binary(ast::BinaryExpr {
                left: Box::new(lhs),
                op: self.token_to_binop(op)?,
                right: Box::new(rhs),
                span: Span::DUMMY,
            });
        }

        Some(lhs)
    }

    /// Parse prefix expression (atom or prefix operator)
    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.current_token() {
            Token::Minus => self.parse_unary(ast::UnOp::Neg),
            Token::Not | Token::Bang => self.parse_unary(ast::UnOp::Not),
            Token::Tilde => self.parse_unary(ast::UnOp::BitNot),
            Token::Star => self.parse_unary(ast::UnOp::Deref),
            Token::Ampersand => self.parse_reference(),

            Token::Number(n) => {
                self.advance();
                Some(Expr::Literal(ast::Literal::Int(n as i64)))
            }
            Token::Float(f) => {
                self.advance();
                Some(Expr::Literal(ast::Literal::Float(f)))
            }
            Token::String(s) => {
                self.advance();
                Some(Expr::Literal(ast::Literal::String(s)))
            }
            Token::Char(c) => {
                self.advance();
                Some(Expr::Literal(ast::Literal::Char(c)))
            }
            Token::True => {
                self.advance();
                Some(Expr::Literal(ast::Literal::Bool(true)))
            }
            Token::False => {
                self.advance();
                Some(Expr::Literal(ast::Literal::Bool(false)))
            }
            Token::Ident(_) => self.parse_path_or_call(),
            Token::LParen => self.parse_paren_or_tuple(),
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_block_expr(),
            Token::If => self.parse_if_expr(),
            Token::Match => self.parse_match_expr(),
            Token::Pipe => self.parse_closure_pipe(),
            Token::OrOr => self.parse_closure_empty(),
            Token::Fn => self.parse_fn_closure(),
            Token::Return => {
                self.advance();
                let value = if self.at_expr_terminator() {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                Some(Expr::Return(value))
            }
            Token::Break => {
                self.advance();
                let value = if self.at_expr_terminator() {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                Some(Expr::Break(value, None))
            }
            Token::Continue => {
                self.advance();
                Some(Expr::Continue(None))
            }
            Token::While => self.parse_while_expr(),
            Token::For => self.parse_for_expr(),
            Token::Loop => self.parse_loop_expr(),
            Token::Async => self.parse_async_expr(),

            _ => {
                self.error(format!("expected expression, found {:?}", self.current_token()));
                None
            }
        }
    }

    /// Parse a unary prefix expression (`-x`, `!x`, `~x`, `*x`)
    fn parse_unary(&mut self, op: ast::UnOp) -> Option<Expr> {
        let start = self.position;
        self.advance();
        let expr = self.parse_expr_with_min_bp(bp::MAX)?;
        Some(Expr::Unary(ast::UnaryExpr {
            op,
            expr: Box::new(expr),
            span: self.span_from(start),
        }))
    }

    /// Parse `&expr` or `&mut expr`
    fn parse_reference(&mut self) -> Option<Expr> {
        self.advance();
        let mutable = self.match_token(Token::Mut);
        let expr = self.parse_expr_with_min_bp(bp::MAX)?;
        Some(Expr::Unary(ast::UnaryExpr {
            op: ast::UnOp::Ref(mutable),
            expr: Box::new(expr),
            span: Span::DUMMY,
        }))
    }

    /// Parse a bare path, a function call, an enum variant construction, or
    /// any of the postfix forms chained onto them (`.field`, `.method(...)`,
    /// `[index]`, `(args)`). A multi-segment path (`Option::Some`) is an enum
    /// variant reference; a single segment is an ordinary path, possibly
    /// followed by a struct literal or turbofish generics.
    fn parse_path_or_call(&mut self) -> Option<Expr> {
        let path = self.parse_path();

        let mut expr = if path.segments.len() >= 2 {
            self.parse_enum_variant(path)?
        } else {
            let generics = path.segments[0].args.clone();
            if self.current_token() == Token::LBrace && self.looks_like_struct_literal() {
                self.parse_struct_literal(path, generics)?
            } else {
                Expr::Path(path)
            }
        };

        loop {
            expr = match self.current_token() {
                Token::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    self.expect(Token::RParen)?;
                    Expr::Call(ast::CallExpr {
                        func: Box::new(expr),
                        args,
                        span: Span::DUMMY,
                        generics: None,
                    })
                }
                Token::Dot => {
                    self.advance();
                    if let Token::Number(n) = self.current_token() {
                        self.advance();
                        expr = Expr::Field(ast::FieldExpr {
                            object: Box::new(expr),
                            field: orryc_util::Symbol::intern(&n.to_string()),
                            span: Span::DUMMY,
                        });
                        continue;
                    }
                    let field = self.parse_ident()?;
                    let turbofish = self.parse_generic_args();
                    if self.match_token(Token::LParen) {
                        let call_args = self.parse_call_args()?;
                        self.expect(Token::RParen)?;
                        Expr::MethodCall(ast::MethodCallExpr {
                            receiver: Box::new(expr),
                            method: field,
                            args: turbofish,
                            call_args,
                        })
                    } else {
                        Expr::Field(ast::FieldExpr {
                            object: Box::new(expr),
                            field,
                            span: Span::DUMMY,
                        })
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket)?;
                    Expr::Index(ast::IndexExpr {
                        object: Box::new(expr),
                        index: Box::new(index),
                    })
                }
                _ => break,
            };
        }

        Some(expr)
    }

    /// Parses `::<T, U>` turbofish generics, if present.
    fn parse_generic_args(&mut self) -> Option<Vec<ast::Type>> {
        if self.current_token() != Token::ColonColon || self.peek_token() != Token::Lt {
            return None;
        }
        self.advance();
        self.advance();
        let mut args = Vec::new();
        while self.current_token() != Token::Gt {
            args.push(self.parse_type()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::Gt)?;
        Some(args)
    }

    /// A path with 2+ segments is a qualified enum variant reference
    /// (`Option::Some`, `Outer::Inner::Variant`): all but the last segment
    /// name the enum, the last segment names the variant.
    fn parse_enum_variant(&mut self, mut path: ast::Path) -> Option<Expr> {
        let last = path.segments.pop().unwrap();
        let variant = last.ident;
        let generics = last.args;

        let data = if self.current_token() == Token::LParen {
            self.advance();
            let args = self.parse_call_args()?;
            self.expect(Token::RParen)?;
            ast::EnumVariantData::Tuple(args)
        } else if self.current_token() == Token::LBrace {
            self.advance();
            let mut fields = Vec::new();
            while self.current_token() != Token::RBrace {
                let name = self.parse_ident()?;
                let field_expr = if self.match_token(Token::Colon) {
                    self.parse_expr()?
                } else {
                    Expr::Path(ast::Path {
                        segments: vec![ast::PathSegment { ident: name, args: None }],
                    })
                };
                fields.push(ast::StructField {
                    name,
                    expr: field_expr,
                    is_shorthand: false,
                });
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RBrace)?;
            ast::EnumVariantData::Struct(fields)
        } else {
            ast::EnumVariantData::Unit
        };

        Some(Expr::EnumVariant(Box::new(ast::EnumVariantExpr {
            path,
            variant,
            generics,
            data,
        })))
    }

    fn looks_like_struct_literal(&self) -> bool {
        matches!(self.peek_token(), Token::Ident(_) | Token::RBrace)
    }

    fn parse_call_args(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        while self.current_token() != Token::RParen {
            args.push(self.parse_expr()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        Some(args)
    }

    fn parse_struct_literal(&mut self, path: ast::Path, generics: Option<Vec<ast::Type>>) -> Option<Expr> {
        self.expect(Token::LBrace)?;
        let mut fields = Vec::new();
        let mut base = None;
        while self.current_token() != Token::RBrace {
            if self.match_token(Token::DotDot) {
                base = Some(self.parse_expr()?);
                break;
            }
            let name = self.parse_ident()?;
            let (expr, is_shorthand) = if self.match_token(Token::Colon) {
                (self.parse_expr()?, false)
            } else {
                (Expr::Path(ast::Path {
                    segments: vec![ast::PathSegment { ident: name, args: None }],
                }), true)
            };
            fields.push(ast::StructField { name, expr, is_shorthand });
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        Some(Expr::StructLiteral(Box::new(ast::StructLiteralExpr {
            path,
            generics,
            fields,
            base,
        })))
    }

    /// Parse `[e1, e2, ...]`
    fn parse_array_literal(&mut self) -> Option<Expr> {
        self.expect(Token::LBracket)?;
        let mut elems = Vec::new();
        while self.current_token() != Token::RBracket {
            elems.push(self.parse_expr()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBracket)?;
        Some(Expr::Array(elems))
    }

    /// Parse `|x: T, y| body` or `|| body`
    fn parse_closure_pipe(&mut self) -> Option<Expr> {
        self.expect(Token::Pipe)?;
        let mut params = Vec::new();
        while self.current_token() != Token::Pipe {
            let name = self.parse_ident()?;
            let ty = if self.match_token(Token::Colon) {
                self.parse_type()?
            } else {
                ast::Type::Inferred
            };
            params.push(ast::Param { name, ty, mutable: false });
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::Pipe)?;
        let ret_type = if self.match_token(Token::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_expr()?;
        Some(Expr::Closure(ast::ClosureExpr {
            params,
            ret_type,
            body: Box::new(body),
            move_kw: false,
        }))
    }

    /// Parse `|| body`, the zero-parameter closure form (lexed as one `||` token).
    fn parse_closure_empty(&mut self) -> Option<Expr> {
        self.expect(Token::OrOr)?;
        let body = self.parse_expr()?;
        Some(Expr::Closure(ast::ClosureExpr {
            params: Vec::new(),
            ret_type: None,
            body: Box::new(body),
            move_kw: false,
        }))
    }

    /// Parse `fn(x: T) -> U { body }`, the `fn`-keyword closure form.
    fn parse_fn_closure(&mut self) -> Option<Expr> {
        self.expect(Token::Fn)?;
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        while self.current_token() != Token::RParen {
            let name = self.parse_ident()?;
            self.expect(Token::Colon)?;
            let ty = self.parse_type()?;
            params.push(ast::Param { name, ty, mutable: false });
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        let ret_type = if self.match_token(Token::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_block_expr()?;
        Some(Expr::Closure(ast::ClosureExpr {
            params,
            ret_type,
            body: Box::new(body),
            move_kw: false,
        }))
    }

    /// Whether the current token ends an expression without a value following
    /// (used by bare `return`/`break`).
    fn at_expr_terminator(&self) -> bool {
        matches!(
            self.current_token(),
            Token::Semicolon | Token::RBrace | Token::RParen | Token::RBracket | Token::Comma | Token::Eof
        )
    }

    /// Parse `(expr)` or `(e1, e2, ...)` as a tuple, or `()` as unit.
    fn parse_paren_or_tuple(&mut self) -> Option<Expr> {
        self.expect(Token::LParen)?;
        if self.match_token(Token::RParen) {
            return Some(Expr::Literal(ast::Literal::Unit));
        }

        let mut elems = vec![self.parse_expr()?];
        let mut trailing_comma = false;
        while self.match_token(Token::Comma) {
            if self.current_token() == Token::RParen {
                trailing_comma = true;
                break;
            }
            elems.push(self.parse_expr()?);
        }
        self.expect(Token::RParen)?;

        if elems.len() == 1 && !trailing_comma {
            Some(elems.into_iter().next().unwrap())
        } else {
            Some(Expr::Tuple(elems))
        }
    }

    /// Parse a `{ ... }` block as an expression.
    fn parse_block_expr(&mut self) -> Option<Expr> {
        let block = self.parse_block()?;
        Some(Expr::Block(block))
    }

    /// Get current token
    fn current_token(&self) -> Token {
        self.tokens.get(self.position).cloned().unwrap_or(Token::Eof)
    }

    /// Peek at the token after the current one
    fn peek_token(&self) -> Token {
        self.tokens.get(self.position + 1).cloned().unwrap_or(Token::Eof)
    }

    /// Check if at end of tokens
    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    /// Advance to next token
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.prev_position = self.position;
            self.position += 1;
        }
    }

    /// Expect a specific token, advancing past it
    fn expect(&mut self, expected: Token) -> Option<()> {
        if self.current_token() == expected {
            self.advance();
            Some(())
        } else {
            self.error(format!(
                "expected {:?}, found {:?}",
                expected,
                self.current_token()
            ));
            None
        }
    }

    /// Consume the current token if it matches, reporting nothing either way
    fn match_token(&mut self, expected: Token) -> bool {
        if self.current_token() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn span_from(&self, start_position: usize) -> Span {
        let _ = start_position;
        Span::DUMMY
    }

    /// Binding power (left, right) of the current token as an infix operator.
    /// Higher numbers bind tighter; see [`expr::bp`] for the full table.
    fn infix_binding_power(&self) -> Option<(u8, u8)> {
        match self.current_token() {
            Token::OrOr => Some((bp::LOGICAL_OR, bp::LOGICAL_OR + 1)),
            Token::AndAnd => Some((bp::LOGICAL_AND, bp::LOGICAL_AND + 1)),
            Token::EqEq | Token::NotEq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => {
                Some((bp::COMPARISON, bp::COMPARISON + 1))
            }
            Token::Pipe => Some((bp::BITWISE_OR, bp::BITWISE_OR + 1)),
            Token::Caret => Some((bp::BITWISE_XOR, bp::BITWISE_XOR + 1)),
            Token::Ampersand => Some((bp::BITWISE_AND, bp::BITWISE_AND + 1)),
            Token::Shl | Token::Shr => Some((bp::SHIFT, bp::SHIFT + 1)),
            Token::Plus | Token::Minus => Some((bp::ADDITIVE, bp::ADDITIVE + 1)),
            Token::Star | Token::Slash | Token::Percent => {
                Some((bp::MULTIPLICATIVE, bp::MULTIPLICATIVE + 1))
            }
            _ => None,
        }
    }

    /// Convert a binary-operator token into its AST representation
    fn token_to_binop(&self, token: Token) -> Option<BinOp> {
        Some(match token {
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Sub,
            Token::Star => BinOp::Mul,
            Token::Slash => BinOp::Div,
            Token::Percent => BinOp::Mod,
            Token::EqEq => BinOp::Eq,
            Token::NotEq => BinOp::Ne,
            Token::Lt => BinOp::Lt,
            Token::Gt => BinOp::Gt,
            Token::LtEq => BinOp::Le,
            Token::GtEq => BinOp::Ge,
            Token::AndAnd => BinOp::And,
            Token::OrOr => BinOp::Or,
            Token::Ampersand => BinOp::BitAnd,
            Token::Pipe => BinOp::BitOr,
            Token::Caret => BinOp::BitXor,
            Token::Shl => BinOp::Shl,
            Token::Shr => BinOp::Shr,
            _ => return None,
        })
    }

    /// Report a parse error at the current token position
    fn error(&mut self, message: impl Into<String>) {
        self.handler.error(message.into(), Span::DUMMY);
    }

    /// Skip tokens until a likely statement/item boundary, so one bad
    /// construct doesn't cascade into spurious follow-on errors.
    fn recover_to_sync_point(&mut self) {
        self.advance();
        while !self.is_at_end() {
            match self.current_token() {
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                Token::Fn
                | Token::Struct
                | Token::Enum
                | Token::Trait
                | Token::Impl
                | Token::Let
                | Token::RBrace => return,
                _ => self.advance(),
            }
        }
    }
}

/// Make Parser-produced tokens iterable for tooling (e.g. `orryc check --emit=tokens`).
pub fn lex_all(source: &str, handler: &mut Handler) -> Vec<Token> {
    let mut lexer = orryc_lex::Lexer::new(source, handler);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let is_eof = tok == Token::Eof;
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    tokens
}
