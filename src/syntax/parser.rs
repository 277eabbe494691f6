use std::sync::Arc;

use super::ParseError;
use super::ast::*;
use super::lexer::{Lexeme, Token, lex};

/// Parse a whole source file.
pub fn parse_source(source: &str) -> Result<CompilationUnit, ParseError> {
    let tokens = lex(source)?;
    Parser::new(source, tokens).parse_unit()
}

/// Parse a bare statement list such as a method body.
pub fn parse_statements(source: &str) -> Result<Vec<Arc<Stmt>>, ParseError> {
    let tokens = lex(source)?;
    let mut parser = Parser::new(source, tokens);
    let body = parser.parse_block()?;
    parser.skip_separators();
    match parser.peek() {
        None => Ok(body),
        found => Err(parser.error_at(found, "statement")),
    }
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Lexeme>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<Lexeme>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------------

    fn peek(&self) -> Option<Lexeme> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|l| l.token)
    }

    fn peek_nth_token(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).map(|l| l.token)
    }

    fn at(&self, token: Token) -> bool {
        self.peek_token() == Some(token)
    }

    fn bump(&mut self) -> Option<Lexeme> {
        let lexeme = self.peek();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn eat(&mut self, token: Token) -> Option<Lexeme> {
        if self.at(token) { self.bump() } else { None }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<Lexeme, ParseError> {
        match self.peek() {
            Some(lexeme) if lexeme.token == token => {
                self.pos += 1;
                Ok(lexeme)
            }
            found => Err(self.error_at(found, expected)),
        }
    }

    /// `End <keyword>` closing a block that started at `start`.
    fn expect_end(
        &mut self,
        keyword: Token,
        construct: &'static str,
        start: usize,
    ) -> Result<(), ParseError> {
        if self.peek().is_none() {
            return Err(ParseError::Unterminated {
                construct,
                offset: start,
            });
        }
        self.expect(Token::End, &format!("`End {construct}`"))?;
        self.expect(keyword, &format!("`End {construct}`"))?;
        Ok(())
    }

    fn text(&self, range: TextRange) -> &'src str {
        &self.source[range.start..range.end]
    }

    fn start_offset(&self) -> usize {
        self.peek().map_or(self.source.len(), |l| l.range.start)
    }

    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |l| l.range.end)
    }

    fn error_at(&self, found: Option<Lexeme>, expected: &str) -> ParseError {
        match found {
            Some(lexeme) => ParseError::Expected {
                expected: expected.to_string(),
                found: match lexeme.token {
                    Token::Newline => "end of line".to_string(),
                    _ => format!("`{}`", self.text(lexeme.range)),
                },
                offset: lexeme.range.start,
            },
            None => ParseError::Expected {
                expected: expected.to_string(),
                found: "end of input".to_string(),
                offset: self.source.len(),
            },
        }
    }

    fn skip_separators(&mut self) {
        while self.peek_token().is_some_and(|t| t.is_separator()) {
            self.pos += 1;
        }
    }

    /// Implicit line continuation inside parentheses and after operators.
    fn skip_newlines(&mut self) {
        while self.at(Token::Newline) {
            self.pos += 1;
        }
    }

    fn at_statement_end(&self) -> bool {
        self.peek_token().is_none_or(|t| t.is_separator())
    }

    fn require_statement_end(&self) -> Result<(), ParseError> {
        if self.at_statement_end() {
            Ok(())
        } else {
            Err(self.error_at(self.peek(), "end of statement"))
        }
    }

    fn parse_ident(&mut self, expected: &str) -> Result<Ident, ParseError> {
        let lexeme = self.expect(Token::Ident, expected)?;
        Ok(Ident::new(self.text(lexeme.range), lexeme.range))
    }

    /// Identifier or keyword, as allowed after `.` and in declarations.
    fn parse_word(&mut self, expected: &str) -> Result<Ident, ParseError> {
        match self.peek() {
            Some(lexeme) if lexeme.token.is_word() => {
                self.pos += 1;
                Ok(Ident::new(self.text(lexeme.range), lexeme.range))
            }
            found => Err(self.error_at(found, expected)),
        }
    }

    fn parse_type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let first = self.parse_word("type name")?;
        let start = first.range.start;
        let mut segments = vec![first];
        while self.at(Token::Dot) && self.peek_nth_token(1).is_some_and(|t| t.is_word()) {
            self.bump();
            segments.push(self.parse_word("type name")?);
        }
        Ok(TypeRef {
            segments,
            range: TextRange::new(start, self.prev_end()),
        })
    }

    // ------------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------------

    fn parse_unit(&mut self) -> Result<CompilationUnit, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_separators();
            if self.peek().is_none() {
                break;
            }
            items.push(self.parse_item(false)?);
            self.require_statement_end()?;
        }
        Ok(CompilationUnit {
            items,
            range: TextRange::new(0, self.source.len()),
        })
    }

    fn parse_item(&mut self, in_type: bool) -> Result<Item, ParseError> {
        let start = self.start_offset();

        if self.eat(Token::Imports).is_some() {
            let path = self.parse_type_ref()?;
            return Ok(Item::Imports(ImportsDecl {
                path,
                range: TextRange::new(start, self.prev_end()),
            }));
        }

        let modifiers = self.parse_modifiers();
        match self.peek_token() {
            Some(Token::Module | Token::Class | Token::Structure) => {
                self.parse_type_decl(start, modifiers)
            }
            Some(Token::Sub | Token::Function) => self.parse_method(start, modifiers),
            Some(Token::Dim) if in_type || !modifiers.is_empty() => {
                self.bump();
                self.parse_field(start, modifiers)
            }
            Some(Token::Ident) if !modifiers.is_empty() => self.parse_field(start, modifiers),
            _ if modifiers.is_empty() && !in_type => Ok(Item::Statement(self.parse_statement()?)),
            _ => Err(self.error_at(self.peek(), "declaration")),
        }
    }

    fn parse_modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            let modifier = match self.peek_token() {
                Some(Token::Public) => Modifier::Public,
                Some(Token::Private) => Modifier::Private,
                Some(Token::Friend) => Modifier::Friend,
                Some(Token::Protected) => Modifier::Protected,
                Some(Token::Shared) => Modifier::Shared,
                Some(Token::Overrides) => Modifier::Overrides,
                Some(Token::Overridable) => Modifier::Overridable,
                _ => return modifiers,
            };
            self.bump();
            modifiers.push(modifier);
        }
    }

    fn parse_type_decl(
        &mut self,
        start: usize,
        modifiers: Vec<Modifier>,
    ) -> Result<Item, ParseError> {
        let (keyword, kind) = match self.bump().map(|l| l.token) {
            Some(Token::Module) => (Token::Module, TypeKind::Module),
            Some(Token::Class) => (Token::Class, TypeKind::Class),
            _ => (Token::Structure, TypeKind::Structure),
        };
        let name = self.parse_ident("type name")?;
        self.require_statement_end()?;

        let mut members = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_token() {
                None | Some(Token::End) => break,
                _ => {
                    members.push(self.parse_item(true)?);
                    self.require_statement_end()?;
                }
            }
        }
        self.expect_end(keyword, kind.keyword(), start)?;

        Ok(Item::Type(TypeDecl {
            kind,
            modifiers,
            name,
            members,
            range: TextRange::new(start, self.prev_end()),
        }))
    }

    fn parse_method(&mut self, start: usize, modifiers: Vec<Modifier>) -> Result<Item, ParseError> {
        let (keyword, kind) = match self.bump().map(|l| l.token) {
            Some(Token::Function) => (Token::Function, MethodKind::Function),
            _ => (Token::Sub, MethodKind::Sub),
        };
        let name = self.parse_word("method name")?;
        let params = if self.at(Token::LParen) {
            self.parse_params()?
        } else {
            Vec::new()
        };
        let return_type = if kind == MethodKind::Function && self.eat(Token::As).is_some() {
            Some(self.parse_type_ref()?)
        } else {
            None
        };
        self.require_statement_end()?;

        let body = self.parse_block()?;
        self.expect_end(keyword, kind.keyword(), start)?;

        Ok(Item::Method(MethodDecl {
            kind,
            modifiers,
            name,
            params,
            return_type,
            body,
            range: TextRange::new(start, self.prev_end()),
        }))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(Token::LParen, "`(`")?;
        self.skip_newlines();
        let mut params = Vec::new();
        if self.eat(Token::RParen).is_some() {
            return Ok(params);
        }
        loop {
            self.skip_newlines();
            let start = self.start_offset();
            let passing = if self.eat(Token::ByVal).is_some() {
                Some(PassingMode::ByVal)
            } else if self.eat(Token::ByRef).is_some() {
                Some(PassingMode::ByRef)
            } else {
                None
            };
            let name = self.parse_ident("parameter name")?;
            let type_ref = if self.eat(Token::As).is_some() {
                Some(self.parse_type_ref()?)
            } else {
                None
            };
            params.push(Param {
                passing,
                name,
                type_ref,
                range: TextRange::new(start, self.prev_end()),
            });
            self.skip_newlines();
            if self.eat(Token::Comma).is_some() {
                continue;
            }
            self.expect(Token::RParen, "`)`")?;
            return Ok(params);
        }
    }

    fn parse_field(&mut self, start: usize, modifiers: Vec<Modifier>) -> Result<Item, ParseError> {
        let decl_start = self.start_offset();
        let decl = self.parse_declarator(decl_start)?;
        Ok(Item::Field(FieldDecl {
            modifiers,
            decl,
            range: TextRange::new(start, self.prev_end()),
        }))
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// Statements up to (not including) `End`, `Else`, `ElseIf`, `Next` or
    /// end of input.
    fn parse_block(&mut self) -> Result<Vec<Arc<Stmt>>, ParseError> {
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_token() {
                None | Some(Token::End | Token::Else | Token::ElseIf | Token::Next) => break,
                _ => {
                    body.push(self.parse_statement()?);
                    self.require_statement_end()?;
                }
            }
        }
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Arc<Stmt>, ParseError> {
        let start = self.start_offset();
        let stmt = match self.peek_token() {
            Some(Token::Dim) => {
                self.bump();
                Stmt::Local(self.parse_declarator(start)?)
            }
            Some(Token::With) => self.parse_with(start)?,
            Some(Token::If) => self.parse_if(start)?,
            Some(Token::For) => self.parse_for(start)?,
            Some(Token::While) => self.parse_while(start)?,
            Some(Token::Return) => {
                self.bump();
                let value = if self.at_statement_end() || self.at(Token::Else) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Stmt::Return(ReturnStmt {
                    value,
                    range: TextRange::new(start, self.prev_end()),
                })
            }
            Some(Token::Call) => {
                self.bump();
                let expr = self.parse_postfix()?;
                Stmt::Expr(ExprStmt {
                    call_keyword: true,
                    expr,
                    range: TextRange::new(start, self.prev_end()),
                })
            }
            _ => self.parse_simple_statement(start)?,
        };
        Ok(Arc::new(stmt))
    }

    fn parse_declarator(&mut self, start: usize) -> Result<LocalDecl, ParseError> {
        let name = self.parse_ident("variable name")?;
        let mut type_ref = None;
        let mut init = None;
        let mut as_new = false;

        if self.eat(Token::As).is_some() {
            if self.at(Token::New) {
                init = Some(self.parse_new()?);
                as_new = true;
            } else {
                type_ref = Some(self.parse_type_ref()?);
            }
        }
        if !as_new && self.eat(Token::Eq).is_some() {
            self.skip_newlines();
            init = Some(self.parse_expr()?);
        }

        Ok(LocalDecl {
            name,
            type_ref,
            init,
            as_new,
            range: TextRange::new(start, self.prev_end()),
        })
    }

    fn parse_with(&mut self, start: usize) -> Result<Stmt, ParseError> {
        self.bump();
        // A bare `With` is kept as a block without a governing expression so
        // it can still be reported.
        let expr = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.require_statement_end()?;
        let body = self.parse_block()?;
        self.expect_end(Token::With, "With", start)?;

        Ok(Stmt::With(WithBlock {
            expr,
            body,
            range: TextRange::new(start, self.prev_end()),
        }))
    }

    fn parse_if(&mut self, start: usize) -> Result<Stmt, ParseError> {
        self.bump();
        let condition = self.parse_expr()?;
        self.expect(Token::Then, "`Then`")?;

        if !self.at_statement_end() {
            // Single-line form: `If c Then stmt [Else stmt]`.
            let then_stmt = self.parse_statement()?;
            let else_body = if self.eat(Token::Else).is_some() {
                Some(vec![self.parse_statement()?])
            } else {
                None
            };
            return Ok(Stmt::If(IfBlock {
                condition,
                then_body: vec![then_stmt],
                else_ifs: Vec::new(),
                else_body,
                range: TextRange::new(start, self.prev_end()),
            }));
        }

        let then_body = self.parse_block()?;
        let mut else_ifs = Vec::new();
        let mut else_body = None;
        loop {
            match self.peek_token() {
                Some(Token::ElseIf) => {
                    let clause_start = self.start_offset();
                    self.bump();
                    let condition = self.parse_expr()?;
                    self.expect(Token::Then, "`Then`")?;
                    self.require_statement_end()?;
                    let body = self.parse_block()?;
                    else_ifs.push(ElseIfClause {
                        condition,
                        body,
                        range: TextRange::new(clause_start, self.prev_end()),
                    });
                }
                Some(Token::Else) => {
                    self.bump();
                    self.require_statement_end()?;
                    else_body = Some(self.parse_block()?);
                    break;
                }
                _ => break,
            }
        }
        self.expect_end(Token::If, "If", start)?;

        Ok(Stmt::If(IfBlock {
            condition,
            then_body,
            else_ifs,
            else_body,
            range: TextRange::new(start, self.prev_end()),
        }))
    }

    fn parse_for(&mut self, start: usize) -> Result<Stmt, ParseError> {
        self.bump();

        if self.eat(Token::Each).is_some() {
            let var = self.parse_ident("loop variable")?;
            self.expect(Token::In, "`In`")?;
            let iterable = self.parse_expr()?;
            self.require_statement_end()?;
            let body = self.parse_block()?;
            self.parse_next(start)?;
            return Ok(Stmt::ForEach(ForEachBlock {
                var,
                iterable,
                body,
                range: TextRange::new(start, self.prev_end()),
            }));
        }

        let var = self.parse_ident("loop variable")?;
        self.expect(Token::Eq, "`=`")?;
        let from = self.parse_expr()?;
        self.expect(Token::To, "`To`")?;
        let to = self.parse_expr()?;
        let step = if self.eat(Token::Step).is_some() {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.require_statement_end()?;
        let body = self.parse_block()?;
        self.parse_next(start)?;

        Ok(Stmt::For(ForBlock {
            var,
            start: from,
            end: to,
            step,
            body,
            range: TextRange::new(start, self.prev_end()),
        }))
    }

    fn parse_next(&mut self, start: usize) -> Result<(), ParseError> {
        if self.peek().is_none() {
            return Err(ParseError::Unterminated {
                construct: "For",
                offset: start,
            });
        }
        self.expect(Token::Next, "`Next`")?;
        self.eat(Token::Ident);
        Ok(())
    }

    fn parse_while(&mut self, start: usize) -> Result<Stmt, ParseError> {
        self.bump();
        let condition = self.parse_expr()?;
        self.require_statement_end()?;
        let body = self.parse_block()?;
        self.expect_end(Token::While, "While", start)?;

        Ok(Stmt::While(WhileBlock {
            condition,
            body,
            range: TextRange::new(start, self.prev_end()),
        }))
    }

    /// Assignment or call statement.
    fn parse_simple_statement(&mut self, start: usize) -> Result<Stmt, ParseError> {
        let first = self.peek();
        let target = self.parse_postfix()?;

        let op = match self.peek_token() {
            Some(Token::Eq) => Some(AssignOp::Assign),
            Some(Token::PlusEq) => Some(AssignOp::AddAssign),
            Some(Token::MinusEq) => Some(AssignOp::SubAssign),
            Some(Token::AmpEq) => Some(AssignOp::ConcatAssign),
            _ => None,
        };

        if let Some(op) = op {
            self.bump();
            self.skip_newlines();
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign(Assignment {
                target,
                op,
                value,
                range: TextRange::new(start, self.prev_end()),
            }));
        }

        match &*target {
            Expr::Invocation(_) | Expr::MemberAccess(_) | Expr::Name(_) => {
                Ok(Stmt::Expr(ExprStmt {
                    call_keyword: false,
                    expr: target,
                    range: TextRange::new(start, self.prev_end()),
                }))
            }
            _ => Err(self.error_at(first, "statement")),
        }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Arc<Expr>, ParseError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Arc<Expr>, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek_token().and_then(binary_op) {
            if op.precedence() < min_prec {
                break;
            }
            self.bump();
            self.skip_newlines();
            let rhs = self.parse_binary(op.precedence() + 1)?;
            let range = lhs.range().cover(rhs.range());
            lhs = Arc::new(Expr::Binary(BinaryExpr {
                op,
                lhs,
                rhs,
                range,
            }));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Arc<Expr>, ParseError> {
        let op = match self.peek_token() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let start = self.start_offset();
        self.bump();
        let operand = match op {
            // `Not` binds looser than comparisons: `Not a = b` is `Not (a = b)`.
            UnaryOp::Not => self.parse_binary(BinaryOp::Eq.precedence())?,
            UnaryOp::Neg => self.parse_unary()?,
        };
        let range = TextRange::new(start, operand.range().end);
        Ok(Arc::new(Expr::Unary(UnaryExpr { op, operand, range })))
    }

    fn parse_postfix(&mut self) -> Result<Arc<Expr>, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_token() {
                Some(Token::Dot | Token::Bang)
                    if self.peek_nth_token(1).is_some_and(|t| t.is_word()) =>
                {
                    let operator = self.access_operator();
                    let name = self.parse_word("member name")?;
                    let range = expr.range().cover(name.range);
                    expr = Arc::new(Expr::MemberAccess(MemberAccess {
                        receiver: Some(expr),
                        operator,
                        name,
                        range,
                    }));
                }
                Some(Token::LParen) => {
                    let args = self.parse_args()?;
                    let range = TextRange::new(expr.range().start, self.prev_end());
                    expr = Arc::new(Expr::Invocation(Invocation {
                        target: expr,
                        args,
                        range,
                    }));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Consume `.` or `!`.
    fn access_operator(&mut self) -> AccessOperator {
        match self.bump().map(|l| l.token) {
            Some(Token::Bang) => AccessOperator::Bang,
            _ => AccessOperator::Dot,
        }
    }

    fn parse_primary(&mut self) -> Result<Arc<Expr>, ParseError> {
        let Some(lexeme) = self.peek() else {
            return Err(self.error_at(None, "expression"));
        };
        let range = lexeme.range;

        let literal = |kind: LiteralKind| -> Result<Arc<Expr>, ParseError> {
            Ok(Arc::new(Expr::Literal(Literal { kind, range })))
        };

        match lexeme.token {
            Token::Integer => {
                self.bump();
                let text = self.text(range);
                let value = text.parse::<i64>().map_err(|_| ParseError::InvalidNumber {
                    text: text.to_string(),
                    offset: range.start,
                })?;
                literal(LiteralKind::Integer(value))
            }
            Token::Float => {
                self.bump();
                literal(LiteralKind::Float(self.text(range).to_string()))
            }
            Token::String => {
                self.bump();
                let text = self.text(range);
                let inner = &text[1..text.len() - 1];
                literal(LiteralKind::String(inner.replace("\"\"", "\"")))
            }
            Token::True => {
                self.bump();
                literal(LiteralKind::Boolean(true))
            }
            Token::False => {
                self.bump();
                literal(LiteralKind::Boolean(false))
            }
            Token::Nothing => {
                self.bump();
                literal(LiteralKind::Nothing)
            }
            Token::Ident => {
                self.bump();
                Ok(Arc::new(Expr::Name(Ident::new(self.text(range), range))))
            }
            Token::Dot | Token::Bang => {
                let operator = self.access_operator();
                let name = self.parse_word("member name")?;
                let range = range.cover(name.range);
                Ok(Arc::new(Expr::MemberAccess(MemberAccess {
                    receiver: None,
                    operator,
                    name,
                    range,
                })))
            }
            Token::LParen => {
                self.bump();
                self.skip_newlines();
                let inner = self.parse_expr()?;
                self.skip_newlines();
                let close = self.expect(Token::RParen, "`)`")?;
                Ok(Arc::new(Expr::Paren(ParenExpr {
                    inner,
                    range: range.cover(close.range),
                })))
            }
            Token::New => self.parse_new(),
            _ => Err(self.error_at(Some(lexeme), "expression")),
        }
    }

    fn parse_new(&mut self) -> Result<Arc<Expr>, ParseError> {
        let start = self.start_offset();
        self.expect(Token::New, "`New`")?;
        let type_ref = self.parse_type_ref()?;
        let args = if self.at(Token::LParen) {
            Some(self.parse_args()?)
        } else {
            None
        };
        Ok(Arc::new(Expr::New(ObjectCreation {
            type_ref,
            args,
            range: TextRange::new(start, self.prev_end()),
        })))
    }

    fn parse_args(&mut self) -> Result<Vec<Arc<Expr>>, ParseError> {
        self.expect(Token::LParen, "`(`")?;
        self.skip_newlines();
        let mut args = Vec::new();
        if self.eat(Token::RParen).is_some() {
            return Ok(args);
        }
        loop {
            self.skip_newlines();
            args.push(self.parse_expr()?);
            self.skip_newlines();
            if self.eat(Token::Comma).is_some() {
                continue;
            }
            self.expect(Token::RParen, "`)`")?;
            return Ok(args);
        }
    }
}

fn binary_op(token: Token) -> Option<BinaryOp> {
    Some(match token {
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Backslash => BinaryOp::IntDiv,
        Token::Mod => BinaryOp::Mod,
        Token::Amp => BinaryOp::Concat,
        Token::Eq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::NotEq,
        Token::Lt => BinaryOp::Lt,
        Token::LtEq => BinaryOp::LtEq,
        Token::Gt => BinaryOp::Gt,
        Token::GtEq => BinaryOp::GtEq,
        Token::And => BinaryOp::And,
        Token::Or => BinaryOp::Or,
        Token::AndAlso => BinaryOp::AndAlso,
        Token::OrElse => BinaryOp::OrElse,
        Token::Xor => BinaryOp::Xor,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_stmt(src: &str) -> Arc<Stmt> {
        let mut stmts = parse_statements(src).expect("parse should succeed");
        assert_eq!(stmts.len(), 1, "expected exactly one statement");
        stmts.remove(0)
    }

    #[test]
    fn parses_with_block_with_implicit_assignment() {
        let src = "With Person()\n    .Name = \"Ada\"\nEnd With";
        let stmt = single_stmt(src);
        let Stmt::With(block) = &*stmt else {
            panic!("expected With block, got {stmt:?}");
        };
        assert_eq!(block.range, TextRange::new(0, src.len()));
        assert!(matches!(
            block.expr.as_deref(),
            Some(Expr::Invocation(_))
        ));
        assert_eq!(block.body.len(), 1);

        let Stmt::Assign(assign) = &*block.body[0] else {
            panic!("expected assignment");
        };
        let Expr::MemberAccess(access) = &*assign.target else {
            panic!("expected member access target");
        };
        assert!(access.is_implicit());
        assert_eq!(access.name.name, "Name");
        assert_eq!(access.operator, AccessOperator::Dot);
    }

    #[test]
    fn bare_with_has_no_governing_expression() {
        let stmt = single_stmt("With\n    .X = 1\nEnd With");
        let Stmt::With(block) = &*stmt else {
            panic!("expected With block");
        };
        assert!(block.expr.is_none());
    }

    #[test]
    fn explicit_member_chain_nests_receivers() {
        let stmt = single_stmt("a.b!c = 1");
        let Stmt::Assign(assign) = &*stmt else {
            panic!("expected assignment");
        };
        let Expr::MemberAccess(outer) = &*assign.target else {
            panic!("expected member access");
        };
        assert_eq!(outer.operator, AccessOperator::Bang);
        assert_eq!(outer.name.name, "c");
        let Some(Expr::MemberAccess(inner)) = outer.receiver.as_deref() else {
            panic!("expected nested member access");
        };
        assert_eq!(inner.name.name, "b");
        assert!(matches!(inner.receiver.as_deref(), Some(Expr::Name(n)) if n.name == "a"));
    }

    #[test]
    fn implicit_access_then_call_chain() {
        let stmt = single_stmt(".Items.Add(.Count + 1)");
        let Stmt::Expr(expr_stmt) = &*stmt else {
            panic!("expected expression statement");
        };
        let Expr::Invocation(call) = &*expr_stmt.expr else {
            panic!("expected invocation");
        };
        assert_eq!(call.args.len(), 1);
        let Expr::MemberAccess(add) = &*call.target else {
            panic!("expected member access callee");
        };
        assert!(matches!(
            add.receiver.as_deref(),
            Some(Expr::MemberAccess(items)) if items.is_implicit()
        ));
    }

    #[test]
    fn keywords_are_valid_member_names() {
        let stmt = single_stmt("x = .End + obj.Step");
        assert!(matches!(&*stmt, Stmt::Assign(_)));
    }

    #[test]
    fn leading_dot_float_and_underscore_names() {
        let stmt = single_stmt("x = .5 + _y");
        let Stmt::Assign(assign) = &*stmt else {
            panic!("expected assignment");
        };
        let Expr::Binary(add) = &*assign.value else {
            panic!("expected addition");
        };
        assert!(matches!(
            &*add.lhs,
            Expr::Literal(lit) if lit.kind == LiteralKind::Float(".5".to_string())
        ));
        assert!(matches!(&*add.rhs, Expr::Name(n) if n.name == "_y"));

        let stmt = single_stmt("Dim __with1 = p");
        assert!(matches!(&*stmt, Stmt::Local(decl) if decl.name.name == "__with1"));
    }

    #[test]
    fn comparison_in_assignment_value() {
        let stmt = single_stmt("a = b = c");
        let Stmt::Assign(assign) = &*stmt else {
            panic!("expected assignment");
        };
        assert!(matches!(
            &*assign.value,
            Expr::Binary(b) if b.op == BinaryOp::Eq
        ));
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        let stmt = single_stmt("x = Not a = b And c");
        let Stmt::Assign(assign) = &*stmt else {
            panic!("expected assignment");
        };
        let Expr::Binary(and) = &*assign.value else {
            panic!("expected And at the top");
        };
        assert_eq!(and.op, BinaryOp::And);
        assert!(matches!(&*and.lhs, Expr::Unary(u) if u.op == UnaryOp::Not));
    }

    #[test]
    fn parses_if_elseif_else() {
        let src = "If a Then\n  x = 1\nElseIf b Then\n  x = 2\nElse\n  x = 3\nEnd If";
        let stmt = single_stmt(src);
        let Stmt::If(block) = &*stmt else {
            panic!("expected If");
        };
        assert_eq!(block.then_body.len(), 1);
        assert_eq!(block.else_ifs.len(), 1);
        assert_eq!(block.else_body.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn parses_single_line_if() {
        let stmt = single_stmt("If .Ready Then .Start() Else Return");
        let Stmt::If(block) = &*stmt else {
            panic!("expected If");
        };
        assert_eq!(block.then_body.len(), 1);
        assert!(matches!(
            block.else_body.as_deref(),
            Some([ret]) if matches!(&**ret, Stmt::Return(r) if r.value.is_none())
        ));
    }

    #[test]
    fn parses_loops() {
        let src = "For i = 1 To 10 Step 2\n  Total += i\nNext i\nFor Each item In .Items\n  Print(item)\nNext\nWhile .More\n  .Advance()\nEnd While";
        let stmts = parse_statements(src).unwrap();
        assert_eq!(stmts.len(), 3);
        assert!(matches!(&*stmts[0], Stmt::For(f) if f.step.is_some()));
        assert!(matches!(&*stmts[1], Stmt::ForEach(_)));
        assert!(matches!(&*stmts[2], Stmt::While(_)));
    }

    #[test]
    fn parses_declarations() {
        let stmts = parse_statements("Dim a As Integer = 1\nDim b As New Widget(3)\nDim c = Make()").unwrap();
        let Stmt::Local(b) = &*stmts[1] else {
            panic!("expected local");
        };
        assert!(b.as_new);
        assert!(b.type_ref.is_none());
        assert!(matches!(b.init.as_deref(), Some(Expr::New(n)) if n.type_ref.path() == "Widget"));
    }

    #[test]
    fn parses_module_with_methods() {
        let src = r#"Imports System.Text

Public Module Program
    Private counter As Integer = 0

    Public Sub Main(ByVal args As String, count As Integer)
        With New StringBuilder()
            .Append("x")
        End With
    End Sub

    Function Twice(n As Integer) As Integer
        Return n * 2
    End Function
End Module
"#;
        let unit = parse_source(src).expect("parse should succeed");
        assert_eq!(unit.items.len(), 2);
        let Item::Type(module) = &unit.items[1] else {
            panic!("expected module");
        };
        assert_eq!(module.kind, TypeKind::Module);
        assert_eq!(module.modifiers, vec![Modifier::Public]);
        assert_eq!(module.members.len(), 3);
        let Item::Method(main) = &module.members[1] else {
            panic!("expected Main");
        };
        assert_eq!(main.params.len(), 2);
        assert_eq!(main.params[0].passing, Some(PassingMode::ByVal));
        assert!(matches!(&*main.body[0], Stmt::With(_)));
    }

    #[test]
    fn unterminated_with_is_reported() {
        let err = parse_statements("With x\n  .A = 1\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::Unterminated {
                construct: "With",
                offset: 0
            }
        );
    }

    #[test]
    fn mismatched_end_is_reported() {
        let err = parse_statements("With x\n  .A = 1\nEnd If").unwrap_err();
        assert!(matches!(err, ParseError::Expected { offset: 20, .. }));
    }

    #[test]
    fn literal_statement_is_rejected() {
        let err = parse_statements("42").unwrap_err();
        assert!(matches!(err, ParseError::Expected { offset: 0, .. }));
    }
}
