//! The code object (§3, §6.1): an immutable bundle of emitted bytecode plus
//! every table and flag needed to execute it, mirroring the host runtime's
//! code-object shape.

pub const CO_LOCALS: u16 = 0x02;
pub const CO_VARARGS: u16 = 0x04;
pub const CO_VARKEYWORDS: u16 = 0x08;
pub const CO_HAS_FREEVARS: u16 = 0x10;
pub const CO_SELF_CONTAINED: u16 = 0x40;

/// Packed `(Δbyte, Δline)` line-number table (§4.4).
pub type LnoTab = Vec<u8>;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CodeObject {
    pub argcount: u16,
    pub kwonlyargcount: u16,
    pub nlocals: u16,
    pub stacksize: u16,
    pub flags: u16,
    pub bytecode: Vec<u8>,
    pub consts: Vec<crate::runtime::value::Const>,
    pub names: Vec<String>,
    pub varnames: Vec<String>,
    pub filename: String,
    pub name: String,
    pub firstlineno: u32,
    pub lnotab: LnoTab,
    pub freevars: Vec<String>,
    pub cellvars: Vec<String>,
}

impl CodeObject {
    #[must_use]
    pub fn derefvars_len(&self) -> usize {
        self.cellvars.len() + self.freevars.len()
    }

    /// Decodes `lnotab` back to `(byte, line)` pairs (§8 lnotab law).
    #[must_use]
    pub fn decode_lnotab(&self) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        let mut byte = 0u32;
        let mut line = self.firstlineno;
        out.push((byte, line));
        let mut iter = self.lnotab.iter().copied();
        while let (Some(db), Some(dl)) = (iter.next(), iter.next()) {
            byte += u32::from(db);
            line += u32::from(dl);
            if db != 0 || dl != 0 {
                out.push((byte, line));
            }
        }
        out
    }
}

/// Packs `(byte_offset, source_line)` annotations into the lnotab format:
/// skip non-increasing lines, and for deltas exceeding 255 emit filler
/// pairs `(255,0)`/`(Δbyte,255)` so every emitted byte is in `[0,255]`.
#[must_use]
pub fn pack_lnotab(annotations: &[(usize, u32)]) -> (u32, LnoTab) {
    let Some(&(_, first_line)) = annotations.first() else {
        return (1, Vec::new());
    };
    let mut table = Vec::new();
    let mut last_byte = annotations[0].0;
    let mut last_line = first_line;
    for &(byte, line) in &annotations[1..] {
        if line <= last_line {
            continue;
        }
        let mut delta_byte = byte - last_byte;
        let mut delta_line = line - last_line;
        while delta_byte > 255 {
            table.push(255u8);
            table.push(0u8);
            delta_byte -= 255;
        }
        while delta_line > 255 {
            table.push(u8::try_from(delta_byte).unwrap_or(255));
            table.push(255u8);
            delta_byte = 0;
            delta_line -= 255;
        }
        table.push(u8::try_from(delta_byte).unwrap_or(255));
        table.push(u8::try_from(delta_line).unwrap_or(255));
        last_byte = byte;
        last_line = line;
    }
    (first_line, table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lnotab_round_trips_monotone_annotations() {
        let annotations = vec![(0, 1), (3, 2), (6, 2), (9, 4)];
        let (first, table) = pack_lnotab(&annotations);
        let code = CodeObject {
            argcount: 0,
            kwonlyargcount: 0,
            nlocals: 0,
            stacksize: 0,
            flags: 0,
            bytecode: vec![],
            consts: vec![],
            names: vec![],
            varnames: vec![],
            filename: "<test>".into(),
            name: "<module>".into(),
            firstlineno: first,
            lnotab: table,
            freevars: vec![],
            cellvars: vec![],
        };
        assert_eq!(code.decode_lnotab(), vec![(0, 1), (3, 2), (9, 4)]);
    }

    #[test]
    fn lnotab_chunks_deltas_over_255() {
        let annotations = vec![(0, 1), (300, 2)];
        let (first, table) = pack_lnotab(&annotations);
        assert_eq!(first, 1);
        assert_eq!(table, vec![255, 0, 45, 2]);
    }
}
