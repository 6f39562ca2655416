//! Expression lowering.
//!
//! `emit_expr` returns a `Place`: either a plain value slot, or a deferred
//! indirection (a field of some object, or an array element address) that
//! is materialized with a `Load` only where the value is actually read.
//! Assignment stores through the un-materialized place.

use super::{Builtin, ERR_ARRAY_BAD_SIZE, ERR_ARRAY_OUT_OF_BOUNDS, Emitter};
use crate::errors::CodegenError;
use crate::tac::{LocId, TacOp};
use shrew_frontend::{
    ArrayAccess, AssignExpr, BinOp, BinaryExpr, CallExpr, Expr, ExprKind, FieldAccess,
    NewArrayExpr, NewExpr, UnOp, UnaryExpr,
};
use shrew_sema::{Type, WORD_SIZE};
use smallvec::SmallVec;

/// Where an expression's value lives.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Place {
    /// A call with no return value; never read (type checking forbids it).
    Void,
    Val(LocId),
    /// A field of the object at `base`: read as `Load(base, offset)`,
    /// written as `Store(base, _, offset)`.
    FieldRef { base: LocId, offset: i32 },
    /// An array element whose address has been computed (bounds already
    /// checked): read as `Load(addr, 0)`, written as `Store(addr, _, 0)`.
    ElemRef { addr: LocId },
}

impl Emitter<'_> {
    /// Emit the expression and force its value into a plain slot.
    pub(crate) fn emit_rvalue(&mut self, expr: &Expr) -> Result<LocId, CodegenError> {
        let place = self.emit_expr(expr)?;
        Ok(self.materialize(place))
    }

    pub(crate) fn materialize(&mut self, place: Place) -> LocId {
        match place {
            Place::Val(loc) => loc,
            Place::FieldRef { base, offset } => self.gen_load(base, offset),
            Place::ElemRef { addr } => self.gen_load(addr, 0),
            Place::Void => unreachable!("void value read survived type checking"),
        }
    }

    pub(crate) fn emit_expr(&mut self, expr: &Expr) -> Result<Place, CodegenError> {
        match &expr.kind {
            ExprKind::IntLiteral(value) => Ok(Place::Val(self.gen_load_int(*value))),
            ExprKind::BoolLiteral(value) => {
                Ok(Place::Val(self.gen_load_int(if *value { 1 } else { 0 })))
            }
            ExprKind::StringLiteral(value) => {
                let value = value.clone();
                Ok(Place::Val(self.gen_load_str(&value)))
            }
            ExprKind::Null => Ok(Place::Val(self.gen_load_int(0))),
            ExprKind::DoubleLiteral(_) => Err(CodegenError::DoubleNotSupported {
                span: expr.span.into(),
            }),
            ExprKind::This => Ok(Place::Val(
                self.this_loc.expect("'this' outside a method survived type checking"),
            )),
            ExprKind::ReadInteger => {
                let dst = self.gen_builtin_call(Builtin::ReadInteger, &[]);
                Ok(Place::Val(dst.expect("_ReadInteger returns a value")))
            }
            ExprKind::ReadLine => {
                let dst = self.gen_builtin_call(Builtin::ReadLine, &[]);
                Ok(Place::Val(dst.expect("_ReadLine returns a value")))
            }
            ExprKind::Unary(unary) => self.emit_unary(unary),
            ExprKind::Binary(binary) => self.emit_binary(binary),
            ExprKind::Assign(assign) => self.emit_assign(assign),
            ExprKind::Field(access) => self.emit_field(access),
            ExprKind::Index(access) => self.emit_index(access),
            ExprKind::Call(call) => self.emit_call(call),
            ExprKind::New(new) => self.emit_new(new),
            ExprKind::NewArray(new) => self.emit_new_array(new),
        }
    }

    fn emit_unary(&mut self, unary: &UnaryExpr) -> Result<Place, CodegenError> {
        let operand = self.emit_rvalue(&unary.operand)?;
        let zero = self.gen_load_int(0);
        let dst = match unary.op {
            // -x lowers as 0 - x, !b as 0 == b.
            UnOp::Neg => self.gen_binary(TacOp::Sub, zero, operand),
            UnOp::Not => self.gen_binary(TacOp::Eq, zero, operand),
        };
        Ok(Place::Val(dst))
    }

    fn emit_binary(&mut self, binary: &BinaryExpr) -> Result<Place, CodegenError> {
        let left = self.emit_rvalue(&binary.left)?;
        let right = self.emit_rvalue(&binary.right)?;

        // String equality goes through the runtime.
        if binary.op.is_equality()
            && self.analysis.expr_type(binary.left.id) == Type::String
            && self.analysis.expr_type(binary.right.id) == Type::String
        {
            let equal = self
                .gen_builtin_call(Builtin::StringEqual, &[left, right])
                .expect("_StringEqual returns a value");
            let dst = if binary.op == BinOp::Ne {
                let zero = self.gen_load_int(0);
                self.gen_binary(TacOp::Eq, zero, equal)
            } else {
                equal
            };
            return Ok(Place::Val(dst));
        }

        let op = match binary.op {
            BinOp::Add => TacOp::Add,
            BinOp::Sub => TacOp::Sub,
            BinOp::Mul => TacOp::Mul,
            BinOp::Div => TacOp::Div,
            BinOp::Mod => TacOp::Mod,
            BinOp::Less => TacOp::Less,
            BinOp::LessEq => TacOp::LessEq,
            BinOp::Greater => TacOp::Greater,
            BinOp::GreaterEq => TacOp::GreaterEq,
            BinOp::Eq => TacOp::Eq,
            BinOp::Ne => TacOp::Ne,
            BinOp::And => TacOp::And,
            BinOp::Or => TacOp::Or,
        };
        Ok(Place::Val(self.gen_binary(op, left, right)))
    }

    fn emit_assign(&mut self, assign: &AssignExpr) -> Result<Place, CodegenError> {
        let value = self.emit_rvalue(&assign.value)?;
        let target = self.emit_expr(&assign.target)?;
        match target {
            Place::FieldRef { base, offset } => self.gen_store(base, value, offset),
            Place::ElemRef { addr } => self.gen_store(addr, value, 0),
            Place::Val(dst) => self.gen_assign(dst, value),
            Place::Void => unreachable!("void assignment target survived type checking"),
        }
        // The assignment's own value re-reads the target.
        Ok(Place::Val(self.materialize(target)))
    }

    fn emit_field(&mut self, access: &FieldAccess) -> Result<Place, CodegenError> {
        let decl = self.resolved(access.field.id);
        match &access.base {
            None => {
                if let Some(&loc) = self.var_locs.get(&decl) {
                    return Ok(Place::Val(loc));
                }
                // An implicit-this field of the enclosing class.
                let offset = self
                    .analysis
                    .decls
                    .var(decl)
                    .and_then(|v| v.field_offset)
                    .expect("field offset assigned by layout");
                let base = self
                    .this_loc
                    .expect("implicit field access outside a method survived type checking");
                Ok(Place::FieldRef { base, offset })
            }
            Some(base_expr) => {
                let base = self.emit_rvalue(base_expr)?;
                let offset = self
                    .analysis
                    .decls
                    .var(decl)
                    .and_then(|v| v.field_offset)
                    .expect("field offset assigned by layout");
                Ok(Place::FieldRef { base, offset })
            }
        }
    }

    /// The deterministic bounds-check sequence: subscript below zero or not
    /// below the length (stored at offset -4) prints the runtime message
    /// and halts; otherwise the element address is `base + subscript*size`.
    fn emit_index(&mut self, access: &ArrayAccess) -> Result<Place, CodegenError> {
        let base_place = self.emit_expr(&access.base)?;
        let subscript_place = self.emit_expr(&access.subscript)?;

        let subscript = self.materialize(subscript_place);
        let zero = self.gen_load_int(0);
        let negative = self.gen_binary(TacOp::Less, subscript, zero);
        let base = self.materialize(base_place);
        let length = self.gen_load(base, -WORD_SIZE);
        let in_range = self.gen_binary(TacOp::Less, subscript, length);
        let not_in_range = self.gen_binary(TacOp::Eq, in_range, zero);
        let out_of_bounds = self.gen_binary(TacOp::Or, negative, not_in_range);

        let ok_label = self.new_label();
        self.gen_ifz(out_of_bounds, ok_label.clone());
        let message = self.gen_load_str(ERR_ARRAY_OUT_OF_BOUNDS);
        self.gen_builtin_call(Builtin::PrintString, &[message]);
        self.gen_builtin_call(Builtin::Halt, &[]);
        self.gen_label(ok_label);

        let elem_bytes = self
            .analysis
            .expr_type(access.base.id)
            .as_array()
            .map(|elem| elem.size())
            .unwrap_or(WORD_SIZE);
        let elem_size = self.gen_load_int(elem_bytes);
        let scaled = self.gen_binary(TacOp::Mul, elem_size, subscript);
        let addr = self.gen_binary(TacOp::Add, base, scaled);
        Ok(Place::ElemRef { addr })
    }

    fn emit_call(&mut self, call: &CallExpr) -> Result<Place, CodegenError> {
        // arr.length() reads the length word in front of the elements.
        if let Some(base_expr) = &call.base
            && self.analysis.expr_type(base_expr.id).as_array().is_some()
            && self.interner.resolve(call.method.sym) == "length"
        {
            let base = self.emit_rvalue(base_expr)?;
            return Ok(Place::Val(self.gen_load(base, -WORD_SIZE)));
        }

        let callee = self.resolved(call.method.id);
        let info = self
            .analysis
            .decls
            .function(callee)
            .expect("call target is a function");
        let has_return = info.return_ty.as_ref().is_some_and(|t| *t != Type::Void);
        let is_method = info.owner.is_some() && !info.owner_is_interface;
        let vtable_offset = info.vtable_slot.map(|slot| slot as i32 * WORD_SIZE);
        let label = info.label.clone();

        let base_place = match &call.base {
            Some(base_expr) => Some(self.emit_expr(base_expr)?),
            None => None,
        };
        let mut actual_places: SmallVec<[Place; 4]> = SmallVec::new();
        for actual in &call.actuals {
            actual_places.push(self.emit_expr(actual)?);
        }

        let virtual_call = base_place.is_some() || is_method;
        let dst = if virtual_call {
            let receiver = match base_place {
                Some(place) => self.materialize(place),
                None => self
                    .this_loc
                    .expect("implicit method call outside a method survived type checking"),
            };
            let vtable = self.gen_load(receiver, 0);
            let target = self.gen_load(
                vtable,
                vtable_offset.expect("vtable slot assigned by layout"),
            );
            for place in actual_places.into_iter().rev() {
                let loc = self.materialize(place);
                self.gen_push_param(loc);
            }
            self.gen_push_param(receiver);
            let dst = self.gen_acall(target, has_return);
            self.gen_pop_params(WORD_SIZE * (call.actuals.len() as i32 + 1));
            dst
        } else {
            for place in actual_places.into_iter().rev() {
                let loc = self.materialize(place);
                self.gen_push_param(loc);
            }
            let label = label.expect("function label assigned by layout");
            let dst = self.gen_lcall(label, has_return);
            self.gen_pop_params(WORD_SIZE * call.actuals.len() as i32);
            dst
        };

        Ok(match dst {
            Some(loc) => Place::Val(loc),
            None => Place::Void,
        })
    }

    fn emit_new(&mut self, new: &NewExpr) -> Result<Place, CodegenError> {
        let class_id = self.resolved(new.class.id);
        let inst_size = self
            .analysis
            .decls
            .class(class_id)
            .map(|c| c.inst_size)
            .expect("instance size assigned by layout");
        let size = self.gen_load_int(inst_size);
        let addr = self
            .gen_builtin_call(Builtin::Alloc, &[size])
            .expect("_Alloc returns a value");
        // Dispatch table pointer at offset 0; the table's label is the
        // class name.
        let class_name = self.interner.resolve(new.class.sym).to_string();
        let vtable = self.gen_load_label(class_name);
        self.gen_store(addr, vtable, 0);
        Ok(Place::Val(addr))
    }

    /// Array layout: one word of length in front of the elements; the value
    /// held by an array variable points at element 0, so the length sits at
    /// offset -4.
    fn emit_new_array(&mut self, new: &NewArrayExpr) -> Result<Place, CodegenError> {
        let size = self.emit_rvalue(&new.size)?;
        let zero = self.gen_load_int(0);
        let too_small = self.gen_binary(TacOp::LessEq, size, zero);
        let ok_label = self.new_label();
        self.gen_ifz(too_small, ok_label.clone());
        let message = self.gen_load_str(ERR_ARRAY_BAD_SIZE);
        self.gen_builtin_call(Builtin::PrintString, &[message]);
        self.gen_builtin_call(Builtin::Halt, &[]);
        self.gen_label(ok_label);

        let one = self.gen_load_int(1);
        let count = self.gen_binary(TacOp::Add, one, size);
        let elem_size = self.gen_load_int(WORD_SIZE);
        let bytes = self.gen_binary(TacOp::Mul, count, elem_size);
        let block = self
            .gen_builtin_call(Builtin::Alloc, &[bytes])
            .expect("_Alloc returns a value");
        self.gen_store(block, size, 0);
        let base = self.gen_binary(TacOp::Add, block, elem_size);
        Ok(Place::Val(base))
    }
}
