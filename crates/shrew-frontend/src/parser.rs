use crate::ast::*;
use crate::errors::ParseError;
use crate::intern::Interner;
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenType};

/// Lex and parse a complete compilation unit.
pub fn parse_source(src: &str, interner: &mut Interner) -> Result<Program, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens, interner).parse_program()
}

/// Recursive-descent parser over the token stream.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    interner: &'a mut Interner,
    next_node_id: u32,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, interner: &'a mut Interner) -> Self {
        Self {
            tokens,
            pos: 0,
            interner,
            next_node_id: 0,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut decls = Vec::new();
        while !self.check(TokenType::Eof) {
            decls.push(self.parse_decl()?);
        }
        Ok(Program {
            decls,
            next_node_id: self.next_node_id,
        })
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self, ahead: usize) -> TokenType {
        self.tokens
            .get(self.pos + ahead)
            .map(|t| t.kind)
            .unwrap_or(TokenType::Eof)
    }

    fn check(&self, kind: TokenType) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenType) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenType, expected: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let tok = self.current();
        let found = if tok.kind == TokenType::Eof {
            "end of input".to_string()
        } else {
            tok.text.clone()
        };
        ParseError::ExpectedToken {
            expected: expected.to_string(),
            found,
            span: tok.span.into(),
        }
    }

    fn parse_ident(&mut self, what: &str) -> Result<Ident, ParseError> {
        let tok = self.expect(TokenType::Identifier, what)?;
        let sym = self.interner.intern(&tok.text);
        Ok(Ident {
            id: self.node_id(),
            sym,
            span: tok.span,
        })
    }

    // ---- declarations -------------------------------------------------

    fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        match self.current().kind {
            TokenType::KwClass => self.parse_class().map(Decl::Class),
            TokenType::KwInterface => self.parse_interface().map(Decl::Interface),
            _ => self.parse_var_or_fn(),
        }
    }

    /// Parse `Type ident ;` or `Type ident ( formals ) block`, where the
    /// return type may also be `void`.
    fn parse_var_or_fn(&mut self) -> Result<Decl, ParseError> {
        if self.check(TokenType::KwVoid) {
            let ty = self.parse_return_type()?;
            let name = self.parse_ident("a function name")?;
            return self.parse_fn_rest(name, ty, true).map(Decl::Fn);
        }
        if !self.starts_type() {
            return Err(ParseError::ExpectedDeclaration {
                found: self.current().text.clone(),
                span: self.current().span.into(),
            });
        }
        let ty = self.parse_type()?;
        let name = self.parse_ident("a name")?;
        if self.check(TokenType::LParen) {
            self.parse_fn_rest(name, ty, true).map(Decl::Fn)
        } else {
            self.parse_var_rest(name, ty, false).map(Decl::Var)
        }
    }

    fn parse_var_rest(
        &mut self,
        name: Ident,
        ty: TypeExpr,
        allow_init: bool,
    ) -> Result<VarDecl, ParseError> {
        let mut init = None;
        if self.check(TokenType::Eq) {
            if !allow_init {
                return Err(ParseError::InitializerNotAllowed {
                    span: self.current().span.into(),
                });
            }
            self.advance();
            init = Some(self.parse_expr()?);
        }
        let semi = self.expect(TokenType::Semicolon, "';'")?;
        let span = ty.span().merge(semi.span);
        Ok(VarDecl {
            name,
            ty,
            init,
            span,
        })
    }

    fn parse_fn_rest(
        &mut self,
        name: Ident,
        return_ty: TypeExpr,
        with_body: bool,
    ) -> Result<FnDecl, ParseError> {
        self.expect(TokenType::LParen, "'('")?;
        let mut formals = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                let ty = self.parse_type()?;
                let formal_name = self.parse_ident("a parameter name")?;
                let span = ty.span().merge(formal_name.span);
                formals.push(VarDecl {
                    name: formal_name,
                    ty,
                    init: None,
                    span,
                });
                if !self.eat(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RParen, "')'")?;

        let (body, end_span) = if with_body {
            let block = self.parse_block()?;
            let span = block.span;
            (Some(block), span)
        } else {
            let semi = self.expect(TokenType::Semicolon, "';'")?;
            (None, semi.span)
        };
        let span = return_ty.span().merge(end_span);
        Ok(FnDecl {
            name,
            return_ty,
            formals,
            body,
            span,
        })
    }

    fn parse_class(&mut self) -> Result<ClassDecl, ParseError> {
        let kw = self.expect(TokenType::KwClass, "'class'")?;
        let name = self.parse_ident("a class name")?;
        let extends = if self.eat(TokenType::KwExtends) {
            Some(self.parse_ident("a base class name")?)
        } else {
            None
        };
        let mut implements = Vec::new();
        if self.eat(TokenType::KwImplements) {
            loop {
                implements.push(self.parse_ident("an interface name")?);
                if !self.eat(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::LBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            members.push(self.parse_var_or_fn()?);
        }
        let rbrace = self.expect(TokenType::RBrace, "'}'")?;
        Ok(ClassDecl {
            name,
            extends,
            implements,
            members,
            span: kw.span.merge(rbrace.span),
        })
    }

    fn parse_interface(&mut self) -> Result<InterfaceDecl, ParseError> {
        let kw = self.expect(TokenType::KwInterface, "'interface'")?;
        let name = self.parse_ident("an interface name")?;
        self.expect(TokenType::LBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            let return_ty = self.parse_return_type()?;
            let proto_name = self.parse_ident("a method name")?;
            members.push(self.parse_fn_rest(proto_name, return_ty, false)?);
        }
        let rbrace = self.expect(TokenType::RBrace, "'}'")?;
        Ok(InterfaceDecl {
            name,
            members,
            span: kw.span.merge(rbrace.span),
        })
    }

    // ---- types --------------------------------------------------------

    fn starts_type(&self) -> bool {
        match self.current().kind {
            TokenType::KwInt
            | TokenType::KwDouble
            | TokenType::KwBool
            | TokenType::KwString => true,
            // `Name x` or `Name[] x` is a declaration; anything else that
            // begins with an identifier is an expression.
            TokenType::Identifier => {
                self.peek_kind(1) == TokenType::Identifier
                    || (self.peek_kind(1) == TokenType::LBracket
                        && self.peek_kind(2) == TokenType::RBracket)
            }
            _ => false,
        }
    }

    fn parse_return_type(&mut self) -> Result<TypeExpr, ParseError> {
        if self.check(TokenType::KwVoid) {
            let tok = self.advance();
            return Ok(TypeExpr::Prim(PrimType::Void, tok.span));
        }
        self.parse_type()
    }

    fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let mut ty = match self.current().kind {
            TokenType::KwInt => TypeExpr::Prim(PrimType::Int, self.advance().span),
            TokenType::KwDouble => TypeExpr::Prim(PrimType::Double, self.advance().span),
            TokenType::KwBool => TypeExpr::Prim(PrimType::Bool, self.advance().span),
            TokenType::KwString => TypeExpr::Prim(PrimType::String, self.advance().span),
            TokenType::KwVoid => {
                return Err(ParseError::VoidNotAllowed {
                    span: self.current().span.into(),
                });
            }
            TokenType::Identifier => TypeExpr::Named(self.parse_ident("a type name")?),
            _ => {
                return Err(ParseError::ExpectedType {
                    found: self.current().text.clone(),
                    span: self.current().span.into(),
                });
            }
        };
        while self.check(TokenType::LBracket) && self.peek_kind(1) == TokenType::RBracket {
            self.advance();
            let rbracket = self.advance();
            let span = ty.span().merge(rbracket.span);
            ty = TypeExpr::Array(Box::new(ty), span);
        }
        Ok(ty)
    }

    // ---- statements ---------------------------------------------------

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let lbrace = self.expect(TokenType::LBrace, "'{'")?;
        let mut decls = Vec::new();
        while self.starts_type() {
            let ty = self.parse_type()?;
            let name = self.parse_ident("a variable name")?;
            decls.push(self.parse_var_rest(name, ty, true)?);
        }
        let mut stmts = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        let rbrace = self.expect(TokenType::RBrace, "'}'")?;
        Ok(Block {
            decls,
            stmts,
            span: lbrace.span.merge(rbrace.span),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.current().kind {
            TokenType::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenType::KwIf => self.parse_if(),
            TokenType::KwWhile => self.parse_while(),
            TokenType::KwFor => self.parse_for(),
            TokenType::KwReturn => self.parse_return(),
            TokenType::KwBreak => {
                let kw = self.advance();
                let semi = self.expect(TokenType::Semicolon, "';'")?;
                Ok(Stmt::Break(kw.span.merge(semi.span)))
            }
            TokenType::KwPrint => self.parse_print(),
            TokenType::Semicolon => {
                let semi = self.advance();
                Ok(Stmt::Empty(semi.span))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenType::Semicolon, "';'")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenType::KwIf, "'if'")?;
        self.expect(TokenType::LParen, "'('")?;
        let test = self.parse_expr()?;
        self.expect(TokenType::RParen, "')'")?;
        let then_body = Box::new(self.parse_stmt()?);
        let mut span = kw.span.merge(then_body.span());
        let else_body = if self.eat(TokenType::KwElse) {
            let body = Box::new(self.parse_stmt()?);
            span = span.merge(body.span());
            Some(body)
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            test,
            then_body,
            else_body,
            span,
        }))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenType::KwWhile, "'while'")?;
        self.expect(TokenType::LParen, "'('")?;
        let test = self.parse_expr()?;
        self.expect(TokenType::RParen, "')'")?;
        let body = Box::new(self.parse_stmt()?);
        let span = kw.span.merge(body.span());
        Ok(Stmt::While(WhileStmt { test, body, span }))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenType::KwFor, "'for'")?;
        self.expect(TokenType::LParen, "'('")?;
        let init = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenType::Semicolon, "';'")?;
        let test = self.parse_expr()?;
        self.expect(TokenType::Semicolon, "';'")?;
        let step = if self.check(TokenType::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenType::RParen, "')'")?;
        let body = Box::new(self.parse_stmt()?);
        let span = kw.span.merge(body.span());
        Ok(Stmt::For(ForStmt {
            init,
            test,
            step,
            body,
            span,
        }))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenType::KwReturn, "'return'")?;
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let semi = self.expect(TokenType::Semicolon, "';'")?;
        Ok(Stmt::Return(ReturnStmt {
            value,
            span: kw.span.merge(semi.span),
        }))
    }

    fn parse_print(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenType::KwPrint, "'Print'")?;
        self.expect(TokenType::LParen, "'('")?;
        let mut args = vec![self.parse_expr()?];
        while self.eat(TokenType::Comma) {
            args.push(self.parse_expr()?);
        }
        self.expect(TokenType::RParen, "')'")?;
        let semi = self.expect(TokenType::Semicolon, "';'")?;
        Ok(Stmt::Print(PrintStmt {
            args,
            span: kw.span.merge(semi.span),
        }))
    }

    // ---- expressions --------------------------------------------------

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    /// Pratt loop. Left/right binding powers; assignment is right-assoc.
    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;

        loop {
            let (lbp, rbp, op) = match self.current().kind {
                TokenType::Eq => (2, 2, None),
                TokenType::PipePipe => (4, 5, Some(BinOp::Or)),
                TokenType::AmpAmp => (6, 7, Some(BinOp::And)),
                TokenType::EqEq => (8, 9, Some(BinOp::Eq)),
                TokenType::BangEq => (8, 9, Some(BinOp::Ne)),
                TokenType::Less => (10, 11, Some(BinOp::Less)),
                TokenType::LessEq => (10, 11, Some(BinOp::LessEq)),
                TokenType::Greater => (10, 11, Some(BinOp::Greater)),
                TokenType::GreaterEq => (10, 11, Some(BinOp::GreaterEq)),
                TokenType::Plus => (12, 13, Some(BinOp::Add)),
                TokenType::Minus => (12, 13, Some(BinOp::Sub)),
                TokenType::Star => (14, 15, Some(BinOp::Mul)),
                TokenType::Slash => (14, 15, Some(BinOp::Div)),
                TokenType::Percent => (14, 15, Some(BinOp::Mod)),
                _ => break,
            };
            if lbp < min_bp {
                break;
            }
            let op_tok = self.advance();
            let rhs = self.parse_expr_bp(rbp)?;
            let span = lhs.span.merge(rhs.span);
            let kind = match op {
                Some(op) => ExprKind::Binary(Box::new(BinaryExpr {
                    op,
                    op_span: op_tok.span,
                    left: lhs,
                    right: rhs,
                })),
                None => {
                    if !matches!(lhs.kind, ExprKind::Field(_) | ExprKind::Index(_)) {
                        return Err(ParseError::InvalidAssignTarget {
                            span: lhs.span.into(),
                        });
                    }
                    ExprKind::Assign(Box::new(AssignExpr {
                        target: lhs,
                        op_span: op_tok.span,
                        value: rhs,
                    }))
                }
            };
            lhs = Expr {
                id: self.node_id(),
                kind,
                span,
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current().kind {
            TokenType::Minus => Some(UnOp::Neg),
            TokenType::Bang => Some(UnOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let op_tok = self.advance();
            let operand = self.parse_unary()?;
            let span = op_tok.span.merge(operand.span);
            return Ok(Expr {
                id: self.node_id(),
                kind: ExprKind::Unary(Box::new(UnaryExpr {
                    op,
                    op_span: op_tok.span,
                    operand,
                })),
                span,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenType::Dot => {
                    self.advance();
                    let field = self.parse_ident("a field name")?;
                    let span = expr.span.merge(field.span);
                    let kind = if self.check(TokenType::LParen) {
                        let actuals = self.parse_actuals()?;
                        ExprKind::Call(Box::new(CallExpr {
                            base: Some(expr),
                            method: field,
                            actuals,
                        }))
                    } else {
                        ExprKind::Field(Box::new(FieldAccess {
                            base: Some(expr),
                            field,
                        }))
                    };
                    expr = Expr {
                        id: self.node_id(),
                        kind,
                        span,
                    };
                }
                TokenType::LBracket => {
                    self.advance();
                    let subscript = self.parse_expr()?;
                    let rbracket = self.expect(TokenType::RBracket, "']'")?;
                    let span = expr.span.merge(rbracket.span);
                    expr = Expr {
                        id: self.node_id(),
                        kind: ExprKind::Index(Box::new(ArrayAccess {
                            base: expr,
                            subscript,
                        })),
                        span,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_actuals(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenType::LParen, "'('")?;
        let mut actuals = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                actuals.push(self.parse_expr()?);
                if !self.eat(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RParen, "')'")?;
        Ok(actuals)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.current().clone();
        match tok.kind {
            TokenType::IntLiteral => {
                self.advance();
                let value = parse_int(&tok)?;
                Ok(self.literal(ExprKind::IntLiteral(value), tok.span))
            }
            TokenType::DoubleLiteral => {
                self.advance();
                let value =
                    tok.text
                        .parse::<f64>()
                        .map_err(|_| crate::errors::LexError::InvalidNumber {
                            text: tok.text.clone(),
                            span: tok.span.into(),
                        })?;
                Ok(self.literal(ExprKind::DoubleLiteral(value), tok.span))
            }
            TokenType::StringLiteral => {
                self.advance();
                let inner = tok.text[1..tok.text.len() - 1].to_string();
                Ok(self.literal(ExprKind::StringLiteral(inner), tok.span))
            }
            TokenType::KwTrue | TokenType::KwFalse => {
                self.advance();
                let value = tok.kind == TokenType::KwTrue;
                Ok(self.literal(ExprKind::BoolLiteral(value), tok.span))
            }
            TokenType::KwNull => {
                self.advance();
                Ok(self.literal(ExprKind::Null, tok.span))
            }
            TokenType::KwThis => {
                self.advance();
                Ok(self.literal(ExprKind::This, tok.span))
            }
            TokenType::KwReadInteger => {
                self.advance();
                self.expect(TokenType::LParen, "'('")?;
                let rparen = self.expect(TokenType::RParen, "')'")?;
                Ok(self.literal(ExprKind::ReadInteger, tok.span.merge(rparen.span)))
            }
            TokenType::KwReadLine => {
                self.advance();
                self.expect(TokenType::LParen, "'('")?;
                let rparen = self.expect(TokenType::RParen, "')'")?;
                Ok(self.literal(ExprKind::ReadLine, tok.span.merge(rparen.span)))
            }
            TokenType::KwNew => {
                self.advance();
                self.expect(TokenType::LParen, "'('")?;
                let class = self.parse_ident("a class name")?;
                let rparen = self.expect(TokenType::RParen, "')'")?;
                Ok(self.literal(ExprKind::New(NewExpr { class }), tok.span.merge(rparen.span)))
            }
            TokenType::KwNewArray => {
                self.advance();
                self.expect(TokenType::LParen, "'('")?;
                let size = self.parse_expr()?;
                self.expect(TokenType::Comma, "','")?;
                let elem_ty = self.parse_type()?;
                let rparen = self.expect(TokenType::RParen, "')'")?;
                Ok(self.literal(
                    ExprKind::NewArray(Box::new(NewArrayExpr { size, elem_ty })),
                    tok.span.merge(rparen.span),
                ))
            }
            TokenType::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenType::RParen, "')'")?;
                Ok(expr)
            }
            TokenType::Identifier => {
                let name = self.parse_ident("an identifier")?;
                if self.check(TokenType::LParen) {
                    let actuals = self.parse_actuals()?;
                    Ok(self.literal(
                        ExprKind::Call(Box::new(CallExpr {
                            base: None,
                            method: name,
                            actuals,
                        })),
                        name.span,
                    ))
                } else {
                    Ok(self.literal(
                        ExprKind::Field(Box::new(FieldAccess {
                            base: None,
                            field: name,
                        })),
                        name.span,
                    ))
                }
            }
            _ => Err(ParseError::ExpectedExpression {
                found: if tok.kind == TokenType::Eof {
                    "end of input".to_string()
                } else {
                    tok.text.clone()
                },
                span: tok.span.into(),
            }),
        }
    }

    fn literal(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.node_id(),
            kind,
            span,
        }
    }
}

fn parse_int(tok: &Token) -> Result<i32, ParseError> {
    let text = &tok.text;
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        text.parse::<i64>()
    };
    match parsed {
        Ok(v) if v <= i32::MAX as i64 => Ok(v as i32),
        _ => Err(crate::errors::LexError::InvalidNumber {
            text: text.clone(),
            span: tok.span.into(),
        }
        .into()),
    }
}
