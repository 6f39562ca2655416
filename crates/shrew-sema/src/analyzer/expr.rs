//! Pass 4 (expressions): assign a type to every expression.
//!
//! A sub-expression that fails to type adopts `Type::Error`, which is
//! compatible with everything, so one mistake produces one diagnostic.

use super::Analyzer;
use crate::errors::{LookingFor, SemanticError};
use crate::types::Type;
use shrew_frontend::{
    ArrayAccess, AssignExpr, BinaryExpr, CallExpr, Expr, ExprKind, FieldAccess, NewArrayExpr,
    NewExpr, UnOp, UnaryExpr,
};

impl Analyzer<'_> {
    pub(crate) fn check_expr(&mut self, expr: &Expr) -> Type {
        let ty = match &expr.kind {
            ExprKind::IntLiteral(_) => Type::Int,
            ExprKind::DoubleLiteral(_) => Type::Double,
            ExprKind::BoolLiteral(_) => Type::Bool,
            ExprKind::StringLiteral(_) => Type::String,
            ExprKind::Null => Type::Null,
            ExprKind::ReadInteger => Type::Int,
            ExprKind::ReadLine => Type::String,
            ExprKind::This => self.check_this(expr),
            ExprKind::Unary(u) => self.check_unary(u),
            ExprKind::Binary(b) => self.check_binary(b),
            ExprKind::Assign(a) => self.check_assign(a),
            ExprKind::Field(f) => self.check_field(f),
            ExprKind::Index(i) => self.check_index(i),
            ExprKind::Call(c) => self.check_call(c),
            ExprKind::New(n) => self.check_new(n),
            ExprKind::NewArray(n) => self.check_new_array(n),
        };
        self.expr_types.insert(expr.id, ty.clone());
        ty
    }

    fn check_this(&mut self, expr: &Expr) -> Type {
        match self.table.find_this() {
            Some(decl) if self.decls.is_class(decl) => Type::Named(self.decls.name(decl)),
            _ => {
                self.error(
                    SemanticError::ThisOutsideClassScope {
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                Type::Error
            }
        }
    }

    fn check_unary(&mut self, unary: &UnaryExpr) -> Type {
        let operand = self.check_expr(&unary.operand);
        match unary.op {
            UnOp::Neg => match operand {
                Type::Int => Type::Int,
                Type::Double => Type::Double,
                Type::Error => Type::Error,
                other => {
                    self.error(
                        SemanticError::IncompatibleOperand {
                            op: "-",
                            operand_type: self.type_name(&other),
                            span: unary.op_span.into(),
                        },
                        unary.op_span,
                    );
                    Type::Error
                }
            },
            UnOp::Not => {
                if operand != Type::Bool && !operand.is_error() {
                    self.error(
                        SemanticError::IncompatibleOperand {
                            op: "!",
                            operand_type: self.type_name(&operand),
                            span: unary.op_span.into(),
                        },
                        unary.op_span,
                    );
                }
                Type::Bool
            }
        }
    }

    fn check_binary(&mut self, binary: &BinaryExpr) -> Type {
        let lhs = self.check_expr(&binary.left);
        let rhs = self.check_expr(&binary.right);
        let op = binary.op;

        let incompatible = |this: &mut Self| {
            this.error(
                SemanticError::IncompatibleOperands {
                    op: op.symbol(),
                    lhs_type: this.type_name(&lhs),
                    rhs_type: this.type_name(&rhs),
                    span: binary.op_span.into(),
                },
                binary.op_span,
            );
        };

        if op.is_arithmetic() {
            if lhs.is_error() || rhs.is_error() {
                return Type::Error;
            }
            return match (&lhs, &rhs) {
                (Type::Int, Type::Int) => Type::Int,
                // '%' stays integral.
                (Type::Double, Type::Double) if op != shrew_frontend::BinOp::Mod => Type::Double,
                _ => {
                    incompatible(self);
                    Type::Error
                }
            };
        }

        if op.is_relational() {
            let well_typed = matches!(
                (&lhs, &rhs),
                (Type::Int, Type::Int) | (Type::Double, Type::Double)
            );
            if !well_typed && !lhs.is_error() && !rhs.is_error() {
                incompatible(self);
            }
            return Type::Bool;
        }

        if op.is_equality() {
            let comparable = lhs.is_compatible_with(&rhs, &self.decls)
                || rhs.is_compatible_with(&lhs, &self.decls);
            if !comparable {
                incompatible(self);
            }
            return Type::Bool;
        }

        // Logical && / ||
        if (lhs != Type::Bool || rhs != Type::Bool) && !lhs.is_error() && !rhs.is_error() {
            incompatible(self);
        }
        Type::Bool
    }

    fn check_assign(&mut self, assign: &AssignExpr) -> Type {
        let target = self.check_expr(&assign.target);
        let value = self.check_expr(&assign.value);
        if !target.is_compatible_with(&value, &self.decls) {
            self.error(
                SemanticError::IncompatibleOperands {
                    op: "=",
                    lhs_type: self.type_name(&target),
                    rhs_type: self.type_name(&value),
                    span: assign.op_span.into(),
                },
                assign.op_span,
            );
        }
        // An assignment used as an expression evaluates to its target.
        target
    }

    fn check_field(&mut self, access: &FieldAccess) -> Type {
        let Some(base) = &access.base else {
            // Bare identifier; the decl-check pass resolved it (or already
            // reported that it could not).
            return match self.resolutions.get(&access.field.id).copied() {
                Some(decl) if self.decls.is_var(decl) => self
                    .decls
                    .var(decl)
                    .and_then(|v| v.ty.clone())
                    .unwrap_or(Type::Error),
                Some(_) => {
                    self.error(
                        SemanticError::IdentifierNotDeclared {
                            name: self.name(access.field.sym).to_string(),
                            reason: LookingFor::Variable,
                            span: access.field.span.into(),
                        },
                        access.field.span,
                    );
                    Type::Error
                }
                None => Type::Error,
            };
        };

        let base_ty = self.check_expr(base);
        if base_ty.is_error() {
            return Type::Error;
        }
        let Some(base_name) = base_ty.as_named() else {
            self.field_not_found(access, &base_ty);
            return Type::Error;
        };

        let field = self.table.look_for_field(base_name, access.field.sym);
        let Some(field) = field.filter(|d| self.decls.is_var(*d)) else {
            self.field_not_found(access, &base_ty);
            return Type::Error;
        };

        // Fields are protected: only reachable from inside a class whose
        // type is related to the base's type.
        let enclosing = self.table.find_this();
        let Some(enclosing) = enclosing.filter(|d| self.decls.is_class(*d)) else {
            self.inaccessible_field(access, &base_ty);
            return Type::Error;
        };
        let enclosing_ty = Type::Named(self.decls.name(enclosing));

        if enclosing_ty.is_compatible_with(&base_ty, &self.decls)
            || base_ty.is_compatible_with(&enclosing_ty, &self.decls)
        {
            self.resolutions.insert(access.field.id, field);
            self.decls
                .var(field)
                .and_then(|v| v.ty.clone())
                .unwrap_or(Type::Error)
        } else {
            self.inaccessible_field(access, &base_ty);
            Type::Error
        }
    }

    fn field_not_found(&mut self, access: &FieldAccess, base_ty: &Type) {
        self.error(
            SemanticError::FieldNotFoundInBase {
                field: self.name(access.field.sym).to_string(),
                base: self.type_name(base_ty),
                span: access.field.span.into(),
            },
            access.field.span,
        );
    }

    fn inaccessible_field(&mut self, access: &FieldAccess, base_ty: &Type) {
        self.error(
            SemanticError::InaccessibleField {
                field: self.name(access.field.sym).to_string(),
                base: self.type_name(base_ty),
                span: access.field.span.into(),
            },
            access.field.span,
        );
    }

    fn check_index(&mut self, access: &ArrayAccess) -> Type {
        let subscript = self.check_expr(&access.subscript);
        if subscript != Type::Int && !subscript.is_error() {
            self.error(
                SemanticError::SubscriptNotInteger {
                    span: access.subscript.span.into(),
                },
                access.subscript.span,
            );
        }

        let base = self.check_expr(&access.base);
        if base.is_error() {
            return Type::Error;
        }
        match base.as_array() {
            // A bad subscript does not spoil the element type.
            Some(elem) => elem.clone(),
            None => {
                self.error(
                    SemanticError::BracketsOnNonArray {
                        span: access.base.span.into(),
                    },
                    access.base.span,
                );
                Type::Error
            }
        }
    }

    fn check_call(&mut self, call: &CallExpr) -> Type {
        let result = match &call.base {
            None => match self.resolutions.get(&call.method.id).copied() {
                Some(decl) => self
                    .decls
                    .function(decl)
                    .and_then(|f| f.return_ty.clone())
                    .unwrap_or(Type::Error),
                None => Type::Error,
            },
            Some(base) => {
                let base_ty = self.check_expr(base);
                if base_ty.is_error() {
                    Type::Error
                } else if base_ty.as_array().is_some()
                    && self.name(call.method.sym) == "length"
                {
                    if !call.actuals.is_empty() {
                        self.error(
                            SemanticError::NumArgsMismatch {
                                name: "length".to_string(),
                                expected: 0,
                                given: call.actuals.len(),
                                span: call.method.span.into(),
                            },
                            call.method.span,
                        );
                    }
                    Type::Int
                } else if let Some(base_name) = base_ty.as_named() {
                    match self.table.look_for_field(base_name, call.method.sym) {
                        Some(decl) if self.decls.is_fn(decl) => {
                            self.resolutions.insert(call.method.id, decl);
                            self.decls
                                .function(decl)
                                .and_then(|f| f.return_ty.clone())
                                .unwrap_or(Type::Error)
                        }
                        _ => {
                            self.method_not_found(call, &base_ty);
                            Type::Error
                        }
                    }
                } else {
                    self.method_not_found(call, &base_ty);
                    Type::Error
                }
            }
        };

        for actual in &call.actuals {
            self.check_expr(actual);
        }
        self.check_actuals(call);
        result
    }

    fn method_not_found(&mut self, call: &CallExpr, base_ty: &Type) {
        self.error(
            SemanticError::FieldNotFoundInBase {
                field: self.name(call.method.sym).to_string(),
                base: self.type_name(base_ty),
                span: call.method.span.into(),
            },
            call.method.span,
        );
    }

    /// Arity and per-argument compatibility against the resolved callee.
    /// Unresolved callees were already reported; nothing to do here.
    fn check_actuals(&mut self, call: &CallExpr) {
        let Some(&decl) = self.resolutions.get(&call.method.id) else {
            return;
        };
        let Some(func) = self.decls.function(decl) else {
            return;
        };
        let formals = func.formals.clone();

        if call.actuals.len() != formals.len() {
            self.error(
                SemanticError::NumArgsMismatch {
                    name: self.name(call.method.sym).to_string(),
                    expected: formals.len(),
                    given: call.actuals.len(),
                    span: call.method.span.into(),
                },
                call.method.span,
            );
            return;
        }

        for (position, (actual, formal)) in call.actuals.iter().zip(formals).enumerate() {
            let given = self.expr_type_of(actual);
            let Some(expected) = self.decls.var(formal).and_then(|v| v.ty.clone()) else {
                continue;
            };
            if !expected.is_compatible_with(&given, &self.decls) {
                self.error(
                    SemanticError::ArgMismatch {
                        position: position + 1,
                        given: self.type_name(&given),
                        expected: self.type_name(&expected),
                        span: actual.span.into(),
                    },
                    actual.span,
                );
            }
        }
    }

    fn expr_type_of(&self, expr: &Expr) -> Type {
        self.expr_types.get(&expr.id).cloned().unwrap_or(Type::Error)
    }

    fn check_new(&mut self, new: &NewExpr) -> Type {
        if self.resolutions.contains_key(&new.class.id) {
            Type::Named(new.class.sym)
        } else {
            Type::Error
        }
    }

    fn check_new_array(&mut self, new: &NewArrayExpr) -> Type {
        let size = self.check_expr(&new.size);
        if size != Type::Int && !size.is_error() {
            self.error(
                SemanticError::NewArraySizeNotInteger {
                    span: new.size.span.into(),
                },
                new.size.span,
            );
        }
        match self.resolved_type_expr(&new.elem_ty) {
            Some(elem) => Type::Array(Box::new(elem)),
            None => Type::Error,
        }
    }
}
