//! Opcode table (§4.3, §4.5, §6.1): 1-byte instructions below
//! `HAVE_ARGUMENT`, 3-byte (opcode + little-endian u16 argument) at or above
//! it. Names mirror the host VM's opcodes; variants are PascalCase per Rust
//! convention.

use strum::Display;

pub const HAVE_ARGUMENT: u8 = 90;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // --- no argument, < HAVE_ARGUMENT ---
    PopTop = 1,
    DupTop = 2,
    RotTwo = 3,
    BinaryAdd = 10,
    BinarySubtract = 11,
    BinaryMultiply = 12,
    BinaryTrueDivide = 13,
    BinaryFloorDivide = 14,
    BinaryModulo = 15,
    BinaryPower = 16,
    BinaryLshift = 17,
    BinaryRshift = 18,
    BinaryOr = 19,
    BinaryXor = 20,
    BinaryAnd = 21,
    BinarySubscr = 22,
    StoreSubscr = 23,
    UnaryNot = 24,
    UnaryNegative = 25,
    UnaryPositive = 26,
    UnaryInvert = 27,
    GetIter = 28,
    StoreMap = 29,
    ReturnValue = 30,
    PopBlock = 31,
    LoadBuildClass = 32,
    LoadLocals = 33,
    BreakLoop = 34,

    // --- takes an argument, >= HAVE_ARGUMENT ---
    StoreName = 90,
    StoreFast = 91,
    StoreDeref = 92,
    StoreAttr = 93,
    LoadConst = 95,
    LoadName = 96,
    LoadFast = 97,
    LoadDeref = 98,
    LoadAttr = 100,
    CompareOp = 101,
    ImportName = 102,
    ImportFrom = 103,
    JumpForward = 104,
    JumpIfFalseOrPop = 105,
    JumpIfTrueOrPop = 106,
    JumpAbsolute = 107,
    PopJumpIfFalse = 108,
    PopJumpIfTrue = 109,
    ForIter = 110,
    SetupLoop = 111,
    LoadClosure = 112,
    MakeFunction = 113,
    MakeClosure = 114,
    BuildTuple = 115,
    BuildList = 116,
    BuildMap = 117,
    UnpackSequence = 118,
    CallFunction = 119,
    CallFunctionVar = 120,
    CallFunctionKw = 121,
    CallFunctionVarKw = 122,
    RaiseVarargs = 123,
}

impl Opcode {
    #[must_use]
    pub fn has_argument(self) -> bool {
        (self as u8) >= HAVE_ARGUMENT
    }

    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Self> {
        OPCODE_TABLE.iter().copied().find(|op| *op as u8 == byte)
    }
}

const OPCODE_TABLE: &[Opcode] = &[
    Opcode::PopTop,
    Opcode::DupTop,
    Opcode::RotTwo,
    Opcode::BinaryAdd,
    Opcode::BinarySubtract,
    Opcode::BinaryMultiply,
    Opcode::BinaryTrueDivide,
    Opcode::BinaryFloorDivide,
    Opcode::BinaryModulo,
    Opcode::BinaryPower,
    Opcode::BinaryLshift,
    Opcode::BinaryRshift,
    Opcode::BinaryOr,
    Opcode::BinaryXor,
    Opcode::BinaryAnd,
    Opcode::BinarySubscr,
    Opcode::StoreSubscr,
    Opcode::UnaryNot,
    Opcode::UnaryNegative,
    Opcode::UnaryPositive,
    Opcode::UnaryInvert,
    Opcode::GetIter,
    Opcode::StoreMap,
    Opcode::ReturnValue,
    Opcode::PopBlock,
    Opcode::LoadBuildClass,
    Opcode::LoadLocals,
    Opcode::BreakLoop,
    Opcode::StoreName,
    Opcode::StoreFast,
    Opcode::StoreDeref,
    Opcode::StoreAttr,
    Opcode::LoadConst,
    Opcode::LoadName,
    Opcode::LoadFast,
    Opcode::LoadDeref,
    Opcode::LoadAttr,
    Opcode::CompareOp,
    Opcode::ImportName,
    Opcode::ImportFrom,
    Opcode::JumpForward,
    Opcode::JumpIfFalseOrPop,
    Opcode::JumpIfTrueOrPop,
    Opcode::JumpAbsolute,
    Opcode::PopJumpIfFalse,
    Opcode::PopJumpIfTrue,
    Opcode::ForIter,
    Opcode::SetupLoop,
    Opcode::LoadClosure,
    Opcode::MakeFunction,
    Opcode::MakeClosure,
    Opcode::BuildTuple,
    Opcode::BuildList,
    Opcode::BuildMap,
    Opcode::UnpackSequence,
    Opcode::CallFunction,
    Opcode::CallFunctionVar,
    Opcode::CallFunctionKw,
    Opcode::CallFunctionVarKw,
    Opcode::RaiseVarargs,
];

/// Opcodes that jump to an absolute byte offset (vs. relative to the
/// post-decode instruction pointer).
#[must_use]
pub fn is_absolute_jump(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::JumpAbsolute
            | Opcode::JumpIfFalseOrPop
            | Opcode::JumpIfTrueOrPop
            | Opcode::PopJumpIfFalse
            | Opcode::PopJumpIfTrue
    )
}

#[must_use]
pub fn is_relative_jump(op: Opcode) -> bool {
    matches!(op, Opcode::JumpForward | Opcode::SetupLoop | Opcode::ForIter)
}

/// Stack effect of an instruction (§4.4): the conditional-pop jumps
/// (`JUMP_IF_FALSE_OR_POP`/`JUMP_IF_TRUE_OR_POP`) report `-1` uniformly,
/// matching the worst case rather than branch-specific effect.
#[must_use]
pub fn stack_effect(op: Opcode, arg: i64) -> i32 {
    match op {
        Opcode::PopTop | Opcode::StoreName | Opcode::StoreFast | Opcode::StoreDeref
        | Opcode::PopJumpIfFalse | Opcode::PopJumpIfTrue
        | Opcode::ReturnValue | Opcode::BreakLoop => -1,
        Opcode::DupTop | Opcode::LoadConst | Opcode::LoadName | Opcode::LoadFast
        | Opcode::LoadDeref | Opcode::LoadClosure | Opcode::ImportFrom => 1,
        Opcode::RotTwo | Opcode::JumpForward | Opcode::JumpAbsolute | Opcode::SetupLoop
        | Opcode::PopBlock | Opcode::LoadLocals | Opcode::UnaryNot | Opcode::UnaryNegative
        | Opcode::UnaryPositive | Opcode::UnaryInvert | Opcode::LoadAttr | Opcode::GetIter => 0,
        Opcode::ImportName => -1,
        Opcode::BinaryAdd
        | Opcode::BinarySubtract
        | Opcode::BinaryMultiply
        | Opcode::BinaryTrueDivide
        | Opcode::BinaryFloorDivide
        | Opcode::BinaryModulo
        | Opcode::BinaryPower
        | Opcode::BinaryLshift
        | Opcode::BinaryRshift
        | Opcode::BinaryOr
        | Opcode::BinaryXor
        | Opcode::BinaryAnd
        | Opcode::BinarySubscr
        | Opcode::CompareOp => -1,
        Opcode::StoreSubscr | Opcode::StoreMap | Opcode::StoreAttr => -2,
        Opcode::LoadBuildClass => 1,
        Opcode::JumpIfFalseOrPop | Opcode::JumpIfTrueOrPop => -1,
        Opcode::ForIter => 1,
        Opcode::MakeFunction => -1,
        Opcode::MakeClosure => -2,
        Opcode::BuildTuple | Opcode::BuildList => 1 - i32::try_from(arg).unwrap_or(0),
        Opcode::BuildMap => 1,
        Opcode::UnpackSequence => i32::try_from(arg).unwrap_or(0) - 1,
        Opcode::CallFunction => {
            let nkw = (arg >> 8) as i32;
            let npos = (arg & 0xFF) as i32;
            -(npos + 2 * nkw)
        }
        Opcode::CallFunctionVar | Opcode::CallFunctionKw => {
            let nkw = (arg >> 8) as i32;
            let npos = (arg & 0xFF) as i32;
            -(npos + 2 * nkw + 1)
        }
        Opcode::CallFunctionVarKw => {
            let nkw = (arg >> 8) as i32;
            let npos = (arg & 0xFF) as i32;
            -(npos + 2 * nkw + 2)
        }
        Opcode::RaiseVarargs => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_byte_value() {
        for op in OPCODE_TABLE.iter().copied() {
            assert_eq!(Opcode::from_u8(op as u8), Some(op));
        }
    }

    #[test]
    fn have_argument_threshold_matches_encoding() {
        assert!(!Opcode::ReturnValue.has_argument());
        assert!(Opcode::LoadConst.has_argument());
    }

    #[test]
    fn call_function_effect_accounts_for_kwargs() {
        // 2 positional, 1 keyword -> pops fn+2+2*1, pushes 1 result.
        let arg = (1i64 << 8) | 2;
        assert_eq!(stack_effect(Opcode::CallFunction, arg), -4);
    }
}
