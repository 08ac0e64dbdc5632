//! Recursive-descent parser producing the predicate [`Expr`] tree.
//!
//! Precedence, loosest first: `or`, `and`, `not`, chained comparisons, `+ -`,
//! `* / // %`, unary `- +`, atoms.

use super::eval::Scalar;
use super::lexer::{tokenize, Keyword, Symbol, Token, TokenKind};
use super::ExprError;

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CmpOp {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Arithmetic operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Rem,
}

impl ArithOp {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::FloorDiv => "//",
            ArithOp::Rem => "%",
        }
    }
}

/// Parsed predicate expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Literal constant.
    Literal(Scalar),
    /// Attribute reference, optionally followed by a field (`d.year`).
    Attribute {
        /// Attribute name.
        name: String,
        /// Field accessed on the attribute value.
        field: Option<String>,
    },
    /// Boolean negation.
    Not(Box<Expr>),
    /// Arithmetic negation.
    Neg(Box<Expr>),
    /// Unary plus; numeric operands only.
    Pos(Box<Expr>),
    /// Short-circuit conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit disjunction.
    Or(Box<Expr>, Box<Expr>),
    /// `a op1 b op2 c ...`, meaning `a op1 b and b op2 c ...`.
    Compare {
        /// Leftmost operand.
        first: Box<Expr>,
        /// Following operators and operands.
        rest: Vec<(CmpOp, Expr)>,
    },
    /// Binary arithmetic.
    Arith {
        /// Operator.
        op: ArithOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
}

impl Expr {
    /// Visits every attribute name referenced by the expression.
    pub fn for_each_attribute(&self, visit: &mut impl FnMut(&str)) {
        match self {
            Expr::Literal(_) => {}
            Expr::Attribute { name, .. } => visit(name),
            Expr::Not(inner) | Expr::Neg(inner) | Expr::Pos(inner) => {
                inner.for_each_attribute(visit)
            }
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.for_each_attribute(visit);
                r.for_each_attribute(visit);
            }
            Expr::Arith { left, right, .. } => {
                left.for_each_attribute(visit);
                right.for_each_attribute(visit);
            }
            Expr::Compare { first, rest } => {
                first.for_each_attribute(visit);
                for (_, operand) in rest {
                    operand.for_each_attribute(visit);
                }
            }
        }
    }
}

/// Parses predicate text into an expression tree.
pub fn parse_expr(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExprError::Unexpected {
            found: token.describe(),
            offset: token.span.start,
            expected: "end of predicate",
        }),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_symbol(&mut self, symbol: Symbol) -> bool {
        if self.peek().is_some_and(|t| t.is_symbol(symbol)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_not()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.eat_keyword(Keyword::Not) {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let first = self.parse_additive()?;
        let mut rest = Vec::new();
        while let Some(op) = self.peek().and_then(comparison_op) {
            self.pos += 1;
            rest.push((op, self.parse_additive()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_symbol(Symbol::Plus) {
                ArithOp::Add
            } else if self.eat_symbol(Symbol::Minus) {
                ArithOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.parse_multiplicative()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_symbol(Symbol::Star) {
                ArithOp::Mul
            } else if self.eat_symbol(Symbol::SlashSlash) {
                ArithOp::FloorDiv
            } else if self.eat_symbol(Symbol::Slash) {
                ArithOp::Div
            } else if self.eat_symbol(Symbol::Percent) {
                ArithOp::Rem
            } else {
                return Ok(left);
            };
            let right = self.parse_unary()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat_symbol(Symbol::Minus) {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        if self.eat_symbol(Symbol::Plus) {
            return Ok(Expr::Pos(Box::new(self.parse_unary()?)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, ExprError> {
        const EXPECTED: &str = "a value, attribute or '('";
        let token = self.advance().ok_or(ExprError::UnexpectedEnd(EXPECTED))?;
        match token.kind {
            TokenKind::Int(v) => Ok(Expr::Literal(Scalar::Int(v))),
            TokenKind::Float(v) => Ok(Expr::Literal(Scalar::Float(v))),
            TokenKind::Str(s) => Ok(Expr::Literal(Scalar::Str(s))),
            TokenKind::Keyword(Keyword::True) => Ok(Expr::Literal(Scalar::Bool(true))),
            TokenKind::Keyword(Keyword::False) => Ok(Expr::Literal(Scalar::Bool(false))),
            TokenKind::Ident(name) => {
                let field = if self.eat_symbol(Symbol::Dot) {
                    match self.advance() {
                        Some(Token {
                            kind: TokenKind::Ident(field),
                            ..
                        }) => Some(field),
                        Some(other) => {
                            return Err(ExprError::Unexpected {
                                found: other.describe(),
                                offset: other.span.start,
                                expected: "a field name",
                            })
                        }
                        None => return Err(ExprError::UnexpectedEnd("a field name")),
                    }
                } else {
                    None
                };
                Ok(Expr::Attribute { name, field })
            }
            TokenKind::Symbol(Symbol::LParen) => {
                let inner = self.parse_or()?;
                if self.eat_symbol(Symbol::RParen) {
                    Ok(inner)
                } else {
                    match self.peek() {
                        Some(t) => Err(ExprError::Unexpected {
                            found: t.describe(),
                            offset: t.span.start,
                            expected: "')'",
                        }),
                        None => Err(ExprError::UnexpectedEnd("')'")),
                    }
                }
            }
            _ => Err(ExprError::Unexpected {
                found: token.describe(),
                offset: token.span.start,
                expected: EXPECTED,
            }),
        }
    }
}

fn comparison_op(token: &Token) -> Option<CmpOp> {
    match token.kind {
        TokenKind::Symbol(Symbol::Eq) => Some(CmpOp::Eq),
        TokenKind::Symbol(Symbol::Ne) => Some(CmpOp::Ne),
        TokenKind::Symbol(Symbol::Lt) => Some(CmpOp::Lt),
        TokenKind::Symbol(Symbol::Le) => Some(CmpOp::Le),
        TokenKind::Symbol(Symbol::Gt) => Some(CmpOp::Gt),
        TokenKind::Symbol(Symbol::Ge) => Some(CmpOp::Ge),
        _ => None,
    }
}
