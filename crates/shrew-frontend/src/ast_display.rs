//! Plain-text AST dump, one node per line, two-space indentation.

use crate::ast::*;
use crate::intern::Interner;

pub struct AstPrinter<'a> {
    interner: &'a Interner,
    out: String,
}

impl<'a> AstPrinter<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            out: String::new(),
        }
    }

    pub fn print(mut self, program: &Program) -> String {
        self.line(0, "Program");
        for decl in &program.decls {
            self.decl(1, decl);
        }
        self.out
    }

    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn name(&self, ident: &Ident) -> &str {
        self.interner.resolve(ident.sym)
    }

    fn decl(&mut self, depth: usize, decl: &Decl) {
        match decl {
            Decl::Var(v) => self.var_decl(depth, v, ""),
            Decl::Fn(f) => self.fn_decl(depth, f, ""),
            Decl::Class(c) => {
                self.line(depth, format!("ClassDecl: {}", self.name(&c.name)));
                if let Some(extends) = &c.extends {
                    self.line(depth + 1, format!("(extends) {}", self.name(extends)));
                }
                for iface in &c.implements {
                    self.line(depth + 1, format!("(implements) {}", self.name(iface)));
                }
                for member in &c.members {
                    self.decl(depth + 1, member);
                }
            }
            Decl::Interface(i) => {
                self.line(depth, format!("InterfaceDecl: {}", self.name(&i.name)));
                for member in &i.members {
                    self.fn_decl(depth + 1, member, "");
                }
            }
        }
    }

    fn var_decl(&mut self, depth: usize, decl: &VarDecl, prefix: &str) {
        self.line(
            depth,
            format!(
                "{}VarDecl: {} {}",
                prefix,
                self.type_text(&decl.ty),
                self.name(&decl.name)
            ),
        );
        if let Some(init) = &decl.init {
            self.expr(depth + 1, init, "(init) ");
        }
    }

    fn fn_decl(&mut self, depth: usize, decl: &FnDecl, prefix: &str) {
        self.line(
            depth,
            format!(
                "{}FnDecl: {} {}",
                prefix,
                self.type_text(&decl.return_ty),
                self.name(&decl.name)
            ),
        );
        for formal in &decl.formals {
            self.var_decl(depth + 1, formal, "(formal) ");
        }
        if let Some(body) = &decl.body {
            self.block(depth + 1, body, "(body) ");
        }
    }

    fn type_text(&self, ty: &TypeExpr) -> String {
        match ty {
            TypeExpr::Prim(prim, _) => match prim {
                PrimType::Int => "int".into(),
                PrimType::Double => "double".into(),
                PrimType::Bool => "bool".into(),
                PrimType::String => "string".into(),
                PrimType::Void => "void".into(),
            },
            TypeExpr::Named(id) => self.name(id).to_string(),
            TypeExpr::Array(elem, _) => format!("{}[]", self.type_text(elem)),
        }
    }

    fn block(&mut self, depth: usize, block: &Block, prefix: &str) {
        self.line(depth, format!("{prefix}StmtBlock"));
        for decl in &block.decls {
            self.var_decl(depth + 1, decl, "");
        }
        for stmt in &block.stmts {
            self.stmt(depth + 1, stmt);
        }
    }

    fn stmt(&mut self, depth: usize, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => self.expr(depth, e, ""),
            Stmt::If(s) => {
                self.line(depth, "IfStmt");
                self.expr(depth + 1, &s.test, "(test) ");
                self.stmt(depth + 1, &s.then_body);
                if let Some(else_body) = &s.else_body {
                    self.line(depth + 1, "(else)");
                    self.stmt(depth + 2, else_body);
                }
            }
            Stmt::While(s) => {
                self.line(depth, "WhileStmt");
                self.expr(depth + 1, &s.test, "(test) ");
                self.stmt(depth + 1, &s.body);
            }
            Stmt::For(s) => {
                self.line(depth, "ForStmt");
                if let Some(init) = &s.init {
                    self.expr(depth + 1, init, "(init) ");
                }
                self.expr(depth + 1, &s.test, "(test) ");
                if let Some(step) = &s.step {
                    self.expr(depth + 1, step, "(step) ");
                }
                self.stmt(depth + 1, &s.body);
            }
            Stmt::Return(s) => {
                self.line(depth, "ReturnStmt");
                if let Some(value) = &s.value {
                    self.expr(depth + 1, value, "");
                }
            }
            Stmt::Break(_) => self.line(depth, "BreakStmt"),
            Stmt::Print(s) => {
                self.line(depth, "PrintStmt");
                for arg in &s.args {
                    self.expr(depth + 1, arg, "(arg) ");
                }
            }
            Stmt::Block(b) => self.block(depth, b, ""),
            Stmt::Empty(_) => self.line(depth, "EmptyStmt"),
        }
    }

    fn expr(&mut self, depth: usize, expr: &Expr, prefix: &str) {
        match &expr.kind {
            ExprKind::IntLiteral(v) => self.line(depth, format!("{prefix}IntConstant: {v}")),
            ExprKind::DoubleLiteral(v) => {
                self.line(depth, format!("{prefix}DoubleConstant: {v}"));
            }
            ExprKind::BoolLiteral(v) => self.line(depth, format!("{prefix}BoolConstant: {v}")),
            ExprKind::StringLiteral(v) => {
                self.line(depth, format!("{prefix}StringConstant: \"{v}\""));
            }
            ExprKind::Null => self.line(depth, format!("{prefix}NullConstant")),
            ExprKind::This => self.line(depth, format!("{prefix}This")),
            ExprKind::Binary(b) => {
                self.line(depth, format!("{prefix}BinaryExpr: {}", b.op.symbol()));
                self.expr(depth + 1, &b.left, "");
                self.expr(depth + 1, &b.right, "");
            }
            ExprKind::Unary(u) => {
                self.line(depth, format!("{prefix}UnaryExpr: {}", u.op.symbol()));
                self.expr(depth + 1, &u.operand, "");
            }
            ExprKind::Assign(a) => {
                self.line(depth, format!("{prefix}AssignExpr"));
                self.expr(depth + 1, &a.target, "(target) ");
                self.expr(depth + 1, &a.value, "(value) ");
            }
            ExprKind::Field(f) => {
                self.line(
                    depth,
                    format!("{prefix}FieldAccess: {}", self.name(&f.field)),
                );
                if let Some(base) = &f.base {
                    self.expr(depth + 1, base, "(base) ");
                }
            }
            ExprKind::Index(i) => {
                self.line(depth, format!("{prefix}ArrayAccess"));
                self.expr(depth + 1, &i.base, "(base) ");
                self.expr(depth + 1, &i.subscript, "(subscript) ");
            }
            ExprKind::Call(c) => {
                self.line(depth, format!("{prefix}Call: {}", self.name(&c.method)));
                if let Some(base) = &c.base {
                    self.expr(depth + 1, base, "(base) ");
                }
                for actual in &c.actuals {
                    self.expr(depth + 1, actual, "(actual) ");
                }
            }
            ExprKind::New(n) => {
                self.line(depth, format!("{prefix}NewExpr: {}", self.name(&n.class)));
            }
            ExprKind::NewArray(n) => {
                self.line(
                    depth,
                    format!("{prefix}NewArrayExpr: {}[]", self.type_text(&n.elem_ty)),
                );
                self.expr(depth + 1, &n.size, "(size) ");
            }
            ExprKind::ReadInteger => self.line(depth, format!("{prefix}ReadIntegerExpr")),
            ExprKind::ReadLine => self.line(depth, format!("{prefix}ReadLineExpr")),
        }
    }
}
