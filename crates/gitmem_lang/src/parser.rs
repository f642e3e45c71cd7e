use {
    crate::{
        lexer::{Lexer, Token, TokenKind},
        ParseError,
    },
    gitmem_core::{Block, Expr, ExprKind, LVal, Stmt},
    std::collections::BTreeSet,
};

/// Parse a complete program.
///
/// Beyond syntax this checks that every register use is preceded by an
/// assignment to that register in an enclosing block, and lowers
/// `if`/`else` to [`Stmt::Cond`]/[`Stmt::Jump`] forward jumps, so the
/// returned block is ready for the interpreter as-is.
pub fn parse(source: &str) -> Result<Block, ParseError> {
    let tokens = Lexer::tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        scopes: vec![BTreeSet::new()],
    };
    let stmts = parser.statements()?;
    parser.expect(&TokenKind::Eof, "end of input")?;
    Ok(Block::new(stmts))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Registers assigned so far, one set per enclosing block. Spawn
    /// bodies and `if` branches open a new scope; lookups walk outward.
    scopes: Vec<BTreeSet<String>>,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::Unexpected {
            line: token.line,
            col: token.col,
            found: token.kind.describe(),
            expected: expected.into(),
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// A `;`-terminated statement sequence, ending at `}` or end of input.
    /// Sequences must be non-empty.
    fn statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
            self.statement(&mut stmts)?;
            self.expect(&TokenKind::Semi, "';'")?;
        }
        if stmts.is_empty() {
            return Err(self.unexpected("statement"));
        }
        Ok(stmts)
    }

    /// One surface statement; `if`/`else` contributes several lowered
    /// statements, everything else exactly one.
    fn statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        match self.peek().kind.clone() {
            TokenKind::Nop => {
                self.advance();
                out.push(Stmt::Nop);
            }
            TokenKind::Join => {
                self.advance();
                let at = self.position();
                let expr = self.expression()?;
                if is_comparison(&expr) {
                    return Err(ParseError::InvalidJoinTarget {
                        line: at.0,
                        col: at.1,
                    });
                }
                out.push(Stmt::Join(expr));
            }
            TokenKind::Lock => {
                self.advance();
                out.push(Stmt::Lock(self.lock_name()?));
            }
            TokenKind::Unlock => {
                self.advance();
                out.push(Stmt::Unlock(self.lock_name()?));
            }
            TokenKind::Assert => {
                self.advance();
                let at = self.position();
                let expr = self.expression()?;
                if !is_comparison(&expr) {
                    return Err(ParseError::InvalidCondition {
                        line: at.0,
                        col: at.1,
                    });
                }
                out.push(Stmt::Assert(expr));
            }
            TokenKind::If => self.if_statement(out)?,
            TokenKind::Reg(name) => {
                self.advance();
                self.expect(&TokenKind::Assign, "'='")?;
                let rhs = self.assign_rhs()?;
                // Recorded only after the right-hand side so that the
                // first assignment to a register cannot read it.
                self.scopes
                    .last_mut()
                    .expect("scope stack is never empty")
                    .insert(name.clone());
                out.push(Stmt::Assign(LVal::Reg(name), rhs));
            }
            TokenKind::Var(name) => {
                self.advance();
                self.expect(&TokenKind::Assign, "'='")?;
                let rhs = self.assign_rhs()?;
                out.push(Stmt::Assign(LVal::Var(name), rhs));
            }
            _ => return Err(self.unexpected("statement")),
        }
        Ok(())
    }

    /// `if (cond) { then } [else { else }]`, lowered to
    /// `Cond(cond, |then| + 2), then…, Jump(|else| + 1), else…`. A missing
    /// else branch becomes `{ nop; }` so the jump always has a target.
    fn if_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        let at = self.position();
        let cond = self.expression()?;
        if !is_comparison(&cond) {
            return Err(ParseError::InvalidCondition {
                line: at.0,
                col: at.1,
            });
        }
        self.expect(&TokenKind::RParen, "')'")?;
        let then_stmts = self.braced_statements()?;
        let else_stmts = if self.peek().kind == TokenKind::Else {
            self.advance();
            self.braced_statements()?
        } else {
            vec![Stmt::Nop]
        };
        out.push(Stmt::Cond(cond, then_stmts.len() + 2));
        out.extend(then_stmts);
        out.push(Stmt::Jump(else_stmts.len() + 1));
        out.extend(else_stmts);
        Ok(())
    }

    /// `{ statements }`, opening a register scope for the duration.
    fn braced_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        self.scopes.push(BTreeSet::new());
        let stmts = self.statements()?;
        self.scopes.pop();
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn lock_name(&mut self) -> Result<String, ParseError> {
        match self.peek().kind.clone() {
            TokenKind::Var(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("lock name")),
        }
    }

    fn assign_rhs(&mut self) -> Result<Expr, ParseError> {
        let at = self.position();
        let expr = self.expression()?;
        if is_comparison(&expr) {
            return Err(ParseError::InvalidAssignRhs {
                line: at.0,
                col: at.1,
            });
        }
        Ok(expr)
    }

    /// Precedence, low to high: `==`/`!=` over `+` over atoms. Comparisons
    /// do not chain.
    fn expression(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.sum()?;
        match self.peek().kind {
            TokenKind::EqEq => {
                self.advance();
                let rhs = self.sum()?;
                Ok(Expr::new(ExprKind::Eq(lhs, rhs)))
            }
            TokenKind::NotEq => {
                self.advance();
                let rhs = self.sum()?;
                Ok(Expr::new(ExprKind::Neq(lhs, rhs)))
            }
            _ => Ok(lhs),
        }
    }

    fn sum(&mut self) -> Result<Expr, ParseError> {
        let first = self.atom()?;
        if self.peek().kind != TokenKind::Plus {
            return Ok(first);
        }
        let mut terms = vec![first];
        while self.peek().kind == TokenKind::Plus {
            self.advance();
            terms.push(self.atom()?);
        }
        Ok(Expr::new(ExprKind::Add(terms)))
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        match self.peek().kind.clone() {
            TokenKind::Const(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Const(n)))
            }
            TokenKind::Reg(name) => {
                let token = self.advance();
                if !self.scopes.iter().any(|scope| scope.contains(&name)) {
                    return Err(ParseError::UnassignedRegister {
                        line: token.line,
                        col: token.col,
                        name,
                    });
                }
                Ok(Expr::new(ExprKind::Reg(name)))
            }
            TokenKind::Var(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Var(name)))
            }
            TokenKind::Spawn => {
                self.advance();
                let block = self.braced_statements()?;
                Ok(Expr::new(ExprKind::Spawn(Block::new(block))))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn position(&self) -> (u32, u32) {
        let token = self.peek();
        (token.line, token.col)
    }
}

fn is_comparison(expr: &Expr) -> bool {
    matches!(expr.kind(), ExprKind::Eq(..) | ExprKind::Neq(..))
}
