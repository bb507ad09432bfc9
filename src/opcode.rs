//! VM opcode numbering and context-type tags.
//!
//! Discriminants are fixed by the reference bytecode compiler's opcode
//! table (sequential assignment starting at `Nop = 0`); they are not
//! renumbered or grouped for readability because the numbering itself
//! is the wire format.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize)]
#[repr(u16)]
pub enum Opcode {
    Nop = 0,
    Const = 1,
    Cp = 2,
    Cl = 3,
    Ccl = 4,
    Tt = 5,
    Tf = 6,
    Ceq = 7,
    Cdeq = 8,
    Clt = 9,
    Cgt = 10,
    Setf = 11,
    Setnf = 12,
    Lnot = 13,
    Nf = 14,
    Jf = 15,
    Jnf = 16,
    Jmp = 17,

    Inc = 18,
    IncPd = 19,
    IncPi = 20,
    IncP = 21,
    Dec = 22,
    DecPd = 23,
    DecPi = 24,
    DecP = 25,

    Lor = 26,
    LorPd = 27,
    LorPi = 28,
    LorP = 29,
    Land = 30,
    LandPd = 31,
    LandPi = 32,
    LandP = 33,
    Bor = 34,
    BorPd = 35,
    BorPi = 36,
    BorP = 37,
    Bxor = 38,
    BxorPd = 39,
    BxorPi = 40,
    BxorP = 41,
    Band = 42,
    BandPd = 43,
    BandPi = 44,
    BandP = 45,
    Sar = 46,
    SarPd = 47,
    SarPi = 48,
    SarP = 49,
    Sal = 50,
    SalPd = 51,
    SalPi = 52,
    SalP = 53,
    Sr = 54,
    SrPd = 55,
    SrPi = 56,
    SrP = 57,
    Add = 58,
    AddPd = 59,
    AddPi = 60,
    AddP = 61,
    Sub = 62,
    SubPd = 63,
    SubPi = 64,
    SubP = 65,
    Mod = 66,
    ModPd = 67,
    ModPi = 68,
    ModP = 69,
    Div = 70,
    DivPd = 71,
    DivPi = 72,
    DivP = 73,
    Idiv = 74,
    IdivPd = 75,
    IdivPi = 76,
    IdivP = 77,
    Mul = 78,
    MulPd = 79,
    MulPi = 80,
    MulP = 81,

    Bnot = 82,
    Typeof = 83,
    TypeofD = 84,
    TypeofI = 85,
    Eval = 86,
    Eexp = 87,
    Chkins = 88,
    Asc = 89,
    Chr = 90,
    Num = 91,
    Chs = 92,
    Inv = 93,
    Chkinv = 94,
    Int = 95,
    Real = 96,
    Str = 97,
    Octet = 98,
    Call = 99,
    Calld = 100,
    Calli = 101,
    New = 102,
    Gpd = 103,
    Spd = 104,
    Spde = 105,
    Spdeh = 106,
    Gpi = 107,
    Spi = 108,
    Spie = 109,
    Gpds = 110,
    Spds = 111,
    Gpis = 112,
    Spis = 113,
    Setp = 114,
    Getp = 115,
    Deld = 116,
    Deli = 117,
    Srv = 118,
    Ret = 119,
    Entry = 120,
    Extry = 121,
    Throw = 122,
    Chgthis = 123,
    Global = 124,
    Addci = 125,
    Regmember = 126,
    Debugger = 127,
}

impl Opcode {
    /// Lowercase assembly mnemonic, matching the reference disassembler's
    /// textual output (`vm_nop` -> `nop`, `vm_addpd` -> `addpd`, etc).
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "nop",
            Const => "const",
            Cp => "cp",
            Cl => "cl",
            Ccl => "ccl",
            Tt => "tt",
            Tf => "tf",
            Ceq => "ceq",
            Cdeq => "cdeq",
            Clt => "clt",
            Cgt => "cgt",
            Setf => "setf",
            Setnf => "setnf",
            Lnot => "lnot",
            Nf => "nf",
            Jf => "jf",
            Jnf => "jnf",
            Jmp => "jmp",
            Inc => "inc",
            IncPd => "incpd",
            IncPi => "incpi",
            IncP => "incp",
            Dec => "dec",
            DecPd => "decpd",
            DecPi => "decpi",
            DecP => "decp",
            Lor => "lor",
            LorPd => "lorpd",
            LorPi => "lorpi",
            LorP => "lorp",
            Land => "land",
            LandPd => "landpd",
            LandPi => "landpi",
            LandP => "landp",
            Bor => "bor",
            BorPd => "borpd",
            BorPi => "borpi",
            BorP => "borp",
            Bxor => "bxor",
            BxorPd => "bxorpd",
            BxorPi => "bxorpi",
            BxorP => "bxorp",
            Band => "band",
            BandPd => "bandpd",
            BandPi => "bandpi",
            BandP => "bandp",
            Sar => "sar",
            SarPd => "sarpd",
            SarPi => "sarpi",
            SarP => "sarp",
            Sal => "sal",
            SalPd => "salpd",
            SalPi => "salpi",
            SalP => "salp",
            Sr => "sr",
            SrPd => "srpd",
            SrPi => "srpi",
            SrP => "srp",
            Add => "add",
            AddPd => "addpd",
            AddPi => "addpi",
            AddP => "addp",
            Sub => "sub",
            SubPd => "subpd",
            SubPi => "subpi",
            SubP => "subp",
            Mod => "mod",
            ModPd => "modpd",
            ModPi => "modpi",
            ModP => "modp",
            Div => "div",
            DivPd => "divpd",
            DivPi => "divpi",
            DivP => "divp",
            Idiv => "idiv",
            IdivPd => "idivpd",
            IdivPi => "idivpi",
            IdivP => "idivp",
            Mul => "mul",
            MulPd => "mulpd",
            MulPi => "mulpi",
            MulP => "mulp",
            Bnot => "bnot",
            Typeof => "typeof",
            TypeofD => "typeofd",
            TypeofI => "typeofi",
            Eval => "eval",
            Eexp => "eexp",
            Chkins => "chkins",
            Asc => "asc",
            Chr => "chr",
            Num => "num",
            Chs => "chs",
            Inv => "inv",
            Chkinv => "chkinv",
            Int => "int",
            Real => "real",
            Str => "str",
            Octet => "octet",
            Call => "call",
            Calld => "calld",
            Calli => "calli",
            New => "new",
            Gpd => "gpd",
            Spd => "spd",
            Spde => "spde",
            Spdeh => "spdeh",
            Gpi => "gpi",
            Spi => "spi",
            Spie => "spie",
            Gpds => "gpds",
            Spds => "spds",
            Gpis => "gpis",
            Spis => "spis",
            Setp => "setp",
            Getp => "getp",
            Deld => "deld",
            Deli => "deli",
            Srv => "srv",
            Ret => "ret",
            Entry => "entry",
            Extry => "extry",
            Throw => "throw",
            Chgthis => "chgthis",
            Global => "global",
            Addci => "addci",
            Regmember => "regmember",
            Debugger => "debugger",
        }
    }
}

/// Code context kind, tagging what role a top-level or nested code
/// block plays (plain function, property accessor, class body, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Serialize)]
#[repr(i32)]
pub enum ContextType {
    TopLevel = 0,
    Function = 1,
    ExprFunction = 2,
    Property = 3,
    PropertySetter = 4,
    PropertyGetter = 5,
    Class = 6,
    SuperClassGetter = 7,
}

/// How a call-site argument is passed: a single value, an expanded
/// array splice, or an expanded splice with no name attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Serialize)]
#[repr(u8)]
pub enum FuncArgType {
    Normal = 0,
    Expand = 1,
    UnnamedExpand = 2,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Opcode::Nop)]
    #[case(17, Opcode::Jmp)]
    #[case(58, Opcode::Add)]
    #[case(61, Opcode::AddP)]
    #[case(120, Opcode::Entry)]
    #[case(127, Opcode::Debugger)]
    fn known_opcode_numbers(#[case] raw: u16, #[case] expected: Opcode) {
        assert_eq!(Opcode::try_from(raw).unwrap(), expected);
    }

    #[test]
    fn opcode_128_is_unknown() {
        assert!(Opcode::try_from(128u16).is_err());
    }

    #[test]
    fn mnemonics_are_lowercase_of_variant() {
        assert_eq!(Opcode::AddPd.mnemonic(), "addpd");
        assert_eq!(Opcode::Entry.mnemonic(), "entry");
    }
}
