//! The assembly fragment algebra (§3, §4.4, design notes): a composable
//! value with four pure-fold observables (`length`, `resolve`, `encode`,
//! `line_nos`) plus `plumb` for stack-depth tracking. Concatenation is
//! associative with `Assembly::Empty` as identity.

use ahash::AHashMap;

use super::opcode::{is_absolute_jump, is_relative_jump, stack_effect, Opcode};

pub type LabelId = u32;

#[derive(Debug, Clone)]
pub enum Assembly {
    Empty,
    Label(LabelId),
    SetLineNo(u32),
    Instruction(Opcode, Option<i64>),
    Chain(Box<Assembly>, Box<Assembly>),
}

impl Default for Assembly {
    fn default() -> Self {
        Self::Empty
    }
}

impl Assembly {
    #[must_use]
    pub fn no_op() -> Self {
        Self::Empty
    }

    #[must_use]
    pub fn instr(op: Opcode) -> Self {
        Self::Instruction(op, None)
    }

    #[must_use]
    pub fn instr_arg(op: Opcode, arg: i64) -> Self {
        Self::Instruction(op, Some(arg))
    }

    #[must_use]
    pub fn label(id: LabelId) -> Self {
        Self::Label(id)
    }

    #[must_use]
    pub fn line(no: u32) -> Self {
        Self::SetLineNo(no)
    }

    #[must_use]
    pub fn then(self, next: Self) -> Self {
        match (&self, &next) {
            (Self::Empty, _) => next,
            (_, Self::Empty) => self,
            _ => Self::Chain(Box::new(self), Box::new(next)),
        }
    }

    #[must_use]
    pub fn concat(fragments: impl IntoIterator<Item = Self>) -> Self {
        fragments.into_iter().fold(Self::Empty, Self::then)
    }

    /// Packed byte length, known without label resolution.
    #[must_use]
    pub fn length(&self) -> usize {
        match self {
            Self::Empty | Self::Label(_) | Self::SetLineNo(_) => 0,
            Self::Instruction(op, arg) => {
                if arg.is_some() || op.has_argument() {
                    3
                } else {
                    1
                }
            }
            Self::Chain(a, b) => a.length() + b.length(),
        }
    }

    /// Produces `label -> absolute offset` pairs, offsetting the right
    /// child by the left child's length.
    pub fn resolve(&self, start: usize, out: &mut AHashMap<LabelId, usize>) {
        match self {
            Self::Empty | Self::SetLineNo(_) | Self::Instruction(..) => {}
            Self::Label(id) => {
                out.insert(*id, start);
            }
            Self::Chain(a, b) => {
                a.resolve(start, out);
                b.resolve(start + a.length(), out);
            }
        }
    }

    /// Produces exactly `length()` bytes. Jump instructions take their
    /// argument from `addresses`: absolute jumps take the label's offset
    /// directly, relative jumps take `offset - (here + 3)`.
    pub fn encode(&self, start: usize, addresses: &AHashMap<LabelId, usize>, out: &mut Vec<u8>) {
        match self {
            Self::Empty | Self::Label(_) | Self::SetLineNo(_) => {}
            Self::Instruction(op, arg) => {
                let resolved = Self::resolve_arg(*op, *arg, start, addresses);
                out.push(*op as u8);
                if op.has_argument() || arg.is_some() {
                    let value = resolved.unwrap_or(0);
                    let bytes = u16::try_from(value).expect("operand exceeds u16 range");
                    out.extend_from_slice(&bytes.to_le_bytes());
                }
            }
            Self::Chain(a, b) => {
                a.encode(start, addresses, out);
                b.encode(start + a.length(), addresses, out);
            }
        }
    }

    fn resolve_arg(
        op: Opcode,
        arg: Option<i64>,
        here: usize,
        addresses: &AHashMap<LabelId, usize>,
    ) -> Option<i64> {
        if is_absolute_jump(op) || is_relative_jump(op) {
            if let Some(label_id) = arg {
                let target = *addresses
                    .get(&(u32::try_from(label_id).expect("label id")))
                    .expect("unresolved jump label");
                return Some(if is_absolute_jump(op) {
                    i64::try_from(target).unwrap()
                } else {
                    i64::try_from(target).unwrap() - i64::try_from(here + 3).unwrap()
                });
            }
        }
        arg
    }

    /// Produces `(byte_offset, source_line)` annotations in emission order.
    pub fn line_nos(&self, start: usize, out: &mut Vec<(usize, u32)>) {
        match self {
            Self::Empty | Self::Label(_) | Self::Instruction(..) => {}
            Self::SetLineNo(line) => out.push((start, *line)),
            Self::Chain(a, b) => {
                a.line_nos(start, out);
                b.line_nos(start + a.length(), out);
            }
        }
    }

    /// Appends a stack-depth reading after each instruction: the running
    /// sum `depth_prev + stack_effect(op, arg)`. Labels count as arg 0.
    pub fn plumb(&self, depth: &mut i32, out: &mut Vec<i32>) {
        match self {
            Self::Empty | Self::Label(_) | Self::SetLineNo(_) => {}
            Self::Instruction(op, arg) => {
                *depth += stack_effect(*op, arg.unwrap_or(0));
                out.push(*depth);
            }
            Self::Chain(a, b) => {
                a.plumb(depth, out);
                b.plumb(depth, out);
            }
        }
    }
}

impl std::ops::Add for Assembly {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.then(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_length_zero_and_identity() {
        let frag = Assembly::instr(Opcode::ReturnValue);
        assert_eq!(Assembly::no_op().then(frag.clone()).length(), frag.length());
    }

    #[test]
    fn no_arg_instruction_is_one_byte() {
        let frag = Assembly::instr(Opcode::ReturnValue);
        assert_eq!(frag.length(), 1);
        let mut bytes = vec![];
        frag.encode(0, &AHashMap::default(), &mut bytes);
        assert_eq!(bytes, vec![Opcode::ReturnValue as u8]);
    }

    #[test]
    fn argument_instruction_is_three_bytes_little_endian() {
        let frag = Assembly::instr_arg(Opcode::LoadConst, 300);
        assert_eq!(frag.length(), 3);
        let mut bytes = vec![];
        frag.encode(0, &AHashMap::default(), &mut bytes);
        assert_eq!(bytes, vec![Opcode::LoadConst as u8, 44, 1]);
    }

    #[test]
    fn forward_jump_resolves_to_absolute_or_relative_offset() {
        let label = 0;
        let frag = Assembly::instr_arg(Opcode::JumpForward, label.into())
            .then(Assembly::instr(Opcode::PopTop))
            .then(Assembly::label(label));
        let mut addrs = AHashMap::default();
        frag.resolve(0, &mut addrs);
        assert_eq!(addrs[&label], 4);
        let mut bytes = vec![];
        frag.encode(0, &addrs, &mut bytes);
        // JUMP_FORWARD at offset 0, here+3=3, target=4 -> relative arg 1.
        assert_eq!(bytes[0], Opcode::JumpForward as u8);
        assert_eq!(u16::from_le_bytes([bytes[1], bytes[2]]), 1);
    }

    #[test]
    fn byte_length_law_holds_for_composite_fragment() {
        let frag = Assembly::concat([
            Assembly::line(1),
            Assembly::instr_arg(Opcode::LoadConst, 0),
            Assembly::instr(Opcode::ReturnValue),
        ]);
        let mut bytes = vec![];
        frag.encode(0, &AHashMap::default(), &mut bytes);
        assert_eq!(bytes.len(), frag.length());
    }

    #[test]
    fn plumb_tracks_running_stack_depth() {
        let frag = Assembly::concat([
            Assembly::instr_arg(Opcode::LoadConst, 0),
            Assembly::instr_arg(Opcode::LoadConst, 1),
            Assembly::instr(Opcode::BinaryAdd),
        ]);
        let mut depth = 0;
        let mut readings = vec![];
        frag.plumb(&mut depth, &mut readings);
        assert_eq!(readings, vec![1, 2, 1]);
    }
}
