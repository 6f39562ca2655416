//! The three-address-code intermediate representation.
//!
//! Instructions reference operands by `LocId` into a location arena owned by
//! the `TacProgram`; locations are never freed. A location is a named slot
//! relative to either the global pointer or the current frame pointer.

use std::fmt;

/// Index into a `TacProgram`'s location arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocId(u32);

impl LocId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Offset from the global pointer; globals sit at non-negative offsets.
    Global,
    /// Offset from the frame pointer; parameters at positive offsets,
    /// locals and temporaries at negative offsets.
    Frame,
}

#[derive(Debug, Clone)]
pub struct Location {
    pub name: String,
    pub segment: Segment,
    pub offset: i32,
}

/// Binary operators the TAC level knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    Ne,
    And,
    Or,
}

impl TacOp {
    pub fn symbol(self) -> &'static str {
        match self {
            TacOp::Add => "+",
            TacOp::Sub => "-",
            TacOp::Mul => "*",
            TacOp::Div => "/",
            TacOp::Mod => "%",
            TacOp::Less => "<",
            TacOp::LessEq => "<=",
            TacOp::Greater => ">",
            TacOp::GreaterEq => ">=",
            TacOp::Eq => "==",
            TacOp::Ne => "!=",
            TacOp::And => "&&",
            TacOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Instr {
    LoadIntConst {
        dst: LocId,
        value: i32,
    },
    LoadStrConst {
        dst: LocId,
        value: String,
    },
    LoadLabel {
        dst: LocId,
        label: String,
    },
    Assign {
        dst: LocId,
        src: LocId,
    },
    /// dst = *(base + offset)
    Load {
        dst: LocId,
        base: LocId,
        offset: i32,
    },
    /// *(base + offset) = src
    Store {
        base: LocId,
        src: LocId,
        offset: i32,
    },
    Binary {
        op: TacOp,
        dst: LocId,
        left: LocId,
        right: LocId,
    },
    Label {
        name: String,
    },
    Goto {
        label: String,
    },
    IfZ {
        cond: LocId,
        label: String,
    },
    /// Frame size is patched in once the function body has been emitted.
    BeginFunc {
        frame_size: i32,
    },
    EndFunc,
    PushParam {
        src: LocId,
    },
    PopParams {
        bytes: i32,
    },
    LCall {
        label: String,
        dst: Option<LocId>,
    },
    ACall {
        addr: LocId,
        dst: Option<LocId>,
    },
    Return {
        src: Option<LocId>,
    },
    /// Dispatch table for a class, one method label per slot.
    VTable {
        class: String,
        methods: Vec<String>,
    },
}

#[derive(Debug, Default)]
pub struct TacProgram {
    pub instrs: Vec<Instr>,
    locations: Vec<Location>,
}

impl TacProgram {
    pub fn alloc_location(&mut self, location: Location) -> LocId {
        let id = LocId::new(self.locations.len() as u32);
        self.locations.push(location);
        id
    }

    pub fn location(&self, id: LocId) -> &Location {
        &self.locations[id.index() as usize]
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn push(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    fn loc_name(&self, id: LocId) -> &str {
        &self.location(id).name
    }
}

impl fmt::Display for TacProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instrs {
            match instr {
                Instr::Label { name } => writeln!(f, "{name}:")?,
                Instr::LoadIntConst { dst, value } => {
                    writeln!(f, "\t{} = {}", self.loc_name(*dst), value)?;
                }
                Instr::LoadStrConst { dst, value } => {
                    writeln!(f, "\t{} = {:?}", self.loc_name(*dst), value)?;
                }
                Instr::LoadLabel { dst, label } => {
                    writeln!(f, "\t{} = {}", self.loc_name(*dst), label)?;
                }
                Instr::Assign { dst, src } => {
                    writeln!(f, "\t{} = {}", self.loc_name(*dst), self.loc_name(*src))?;
                }
                Instr::Load { dst, base, offset } => writeln!(
                    f,
                    "\t{} = *({} + {})",
                    self.loc_name(*dst),
                    self.loc_name(*base),
                    offset
                )?,
                Instr::Store { base, src, offset } => writeln!(
                    f,
                    "\t*({} + {}) = {}",
                    self.loc_name(*base),
                    offset,
                    self.loc_name(*src)
                )?,
                Instr::Binary {
                    op,
                    dst,
                    left,
                    right,
                } => writeln!(
                    f,
                    "\t{} = {} {} {}",
                    self.loc_name(*dst),
                    self.loc_name(*left),
                    op.symbol(),
                    self.loc_name(*right)
                )?,
                Instr::Goto { label } => writeln!(f, "\tGoto {label}")?,
                Instr::IfZ { cond, label } => {
                    writeln!(f, "\tIfZ {} Goto {}", self.loc_name(*cond), label)?;
                }
                Instr::BeginFunc { frame_size } => writeln!(f, "\tBeginFunc {frame_size}")?,
                Instr::EndFunc => writeln!(f, "\tEndFunc")?,
                Instr::PushParam { src } => {
                    writeln!(f, "\tPushParam {}", self.loc_name(*src))?;
                }
                Instr::PopParams { bytes } => writeln!(f, "\tPopParams {bytes}")?,
                Instr::LCall { label, dst } => match dst {
                    Some(dst) => writeln!(f, "\t{} = LCall {}", self.loc_name(*dst), label)?,
                    None => writeln!(f, "\tLCall {label}")?,
                },
                Instr::ACall { addr, dst } => match dst {
                    Some(dst) => writeln!(
                        f,
                        "\t{} = ACall {}",
                        self.loc_name(*dst),
                        self.loc_name(*addr)
                    )?,
                    None => writeln!(f, "\tACall {}", self.loc_name(*addr))?,
                },
                Instr::Return { src } => match src {
                    Some(src) => writeln!(f, "\tReturn {}", self.loc_name(*src))?,
                    None => writeln!(f, "\tReturn")?,
                },
                Instr::VTable { class, methods } => {
                    writeln!(f, "VTable {class} =")?;
                    for method in methods {
                        writeln!(f, "\t{method}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_classic_forms() {
        let mut tac = TacProgram::default();
        let t0 = tac.alloc_location(Location {
            name: "_tmp0".into(),
            segment: Segment::Frame,
            offset: -8,
        });
        let t1 = tac.alloc_location(Location {
            name: "_tmp1".into(),
            segment: Segment::Frame,
            offset: -12,
        });
        tac.push(Instr::Label {
            name: "main".into(),
        });
        tac.push(Instr::BeginFunc { frame_size: 8 });
        tac.push(Instr::LoadIntConst { dst: t0, value: 3 });
        tac.push(Instr::Load {
            dst: t1,
            base: t0,
            offset: -4,
        });
        tac.push(Instr::IfZ {
            cond: t1,
            label: "_L0".into(),
        });
        tac.push(Instr::EndFunc);

        let text = tac.to_string();
        assert!(text.contains("main:"));
        assert!(text.contains("\tBeginFunc 8"));
        assert!(text.contains("\t_tmp0 = 3"));
        assert!(text.contains("\t_tmp1 = *(_tmp0 + -4)"));
        assert!(text.contains("\tIfZ _tmp1 Goto _L0"));
    }
}
