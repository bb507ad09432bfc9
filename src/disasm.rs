//! Instruction decoder: linear scan over a code context's word array,
//! producing one `Instruction` record per opcode. One small rendering
//! function per mnemonic family rather than one large parser.

use crate::object::Constant;
use crate::opcode::{FuncArgType, Opcode};
use anyhow::{anyhow, Result};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Instruction {
    pub address: usize,
    pub mnemonic: String,
    pub operands: String,
    pub comment: String,
    pub size: usize,
}

impl Instruction {
    fn new(address: usize, mnemonic: impl Into<String>, operands: impl Into<String>, size: usize) -> Self {
        Instruction {
            address,
            mnemonic: mnemonic.into(),
            operands: operands.into(),
            comment: String::new(),
            size,
        }
    }

    fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

fn word(code: &[u16], i: usize) -> Result<u16> {
    code.get(i)
        .copied()
        .ok_or_else(|| anyhow!("Truncated: instruction at {} reads past end of code array", i))
}

fn const_display(c: &Constant) -> String {
    match c {
        Constant::Void | Constant::Unknown | Constant::Object(None) => "null".to_string(),
        Constant::Object(Some(idx)) => format!("obj_{}", idx),
        Constant::String(s) => s.clone(),
        Constant::Octet(b) => format!("hex:{}", crate::pool::hex_encode(b)),
        Constant::Real(f) => format!("{}", f),
        Constant::Byte(b) => format!("{}", b),
        Constant::Short(s) => format!("{}", s),
        Constant::Integer(i) => format!("{}", i),
        Constant::Long(l) => format!("{}", l),
    }
}

/// Non-fatal: an out-of-range data-slot index renders as a marker
/// comment rather than aborting disassembly.
fn value_comment(data: &[Constant], idx: u16) -> String {
    match data.get(idx as usize) {
        Some(c) => const_display(c),
        None => "<out of range>".to_string(),
    }
}

enum Variant {
    Base,
    Pd,
    Pi,
    P,
}

/// Shared renderer for the 14 binary arithmetic/logical mnemonic
/// families, each with a plain register form plus three addressing-mode
/// variants (property-by-name, property-by-index, in-place).
fn op2(mnemonic: &str, variant: Variant, i: usize, code: &[u16], data: &[Constant]) -> Result<Instruction> {
    match variant {
        Variant::Base => {
            let r1 = word(code, i + 1)?;
            let r2 = word(code, i + 2)?;
            Ok(Instruction::new(i, mnemonic, format!("%{}, %{}", r1, r2), 3))
        }
        Variant::Pd => {
            let r1 = word(code, i + 1)?;
            let r2 = word(code, i + 2)?;
            let r3 = word(code, i + 3)?;
            let r4 = word(code, i + 4)?;
            let comment = format!("*{} = {}", r3, value_comment(data, r3));
            Ok(Instruction::new(
                i,
                format!("{}pd", mnemonic),
                format!("%{}, %{}.*{}, %{}", r1, r2, r3, r4),
                5,
            )
            .with_comment(comment))
        }
        Variant::Pi => {
            let r1 = word(code, i + 1)?;
            let r2 = word(code, i + 2)?;
            let r3 = word(code, i + 3)?;
            let r4 = word(code, i + 4)?;
            Ok(Instruction::new(
                i,
                format!("{}pi", mnemonic),
                format!("%{}, %{}.%{}, %{}", r1, r2, r3, r4),
                5,
            ))
        }
        Variant::P => {
            let r1 = word(code, i + 1)?;
            let r2 = word(code, i + 2)?;
            let r3 = word(code, i + 3)?;
            Ok(Instruction::new(i, format!("{}p", mnemonic), format!("%{}, %{}, %{}", r1, r2, r3), 4))
        }
    }
}

fn inc_dec(mnemonic: &str, variant: Variant, i: usize, code: &[u16], data: &[Constant]) -> Result<Instruction> {
    match variant {
        Variant::Base => {
            let r1 = word(code, i + 1)?;
            Ok(Instruction::new(i, mnemonic, format!("%{}", r1), 2))
        }
        Variant::Pd => {
            let r1 = word(code, i + 1)?;
            let r2 = word(code, i + 2)?;
            let r3 = word(code, i + 3)?;
            let comment = format!("*{} = {}", r3, value_comment(data, r3));
            Ok(Instruction::new(i, format!("{}pd", mnemonic), format!("%{}, %{}.*{}", r1, r2, r3), 4)
                .with_comment(comment))
        }
        Variant::Pi => {
            let r1 = word(code, i + 1)?;
            let r2 = word(code, i + 2)?;
            let r3 = word(code, i + 3)?;
            Ok(Instruction::new(i, format!("{}pi", mnemonic), format!("%{}, %{}.%{}", r1, r2, r3), 4))
        }
        Variant::P => {
            let r1 = word(code, i + 1)?;
            let r2 = word(code, i + 2)?;
            Ok(Instruction::new(i, format!("{}p", mnemonic), format!("%{}, %{}", r1, r2), 3))
        }
    }
}

fn two_reg(mnemonic: &str, i: usize, code: &[u16]) -> Result<Instruction> {
    let r1 = word(code, i + 1)?;
    let r2 = word(code, i + 2)?;
    Ok(Instruction::new(i, mnemonic, format!("%{}, %{}", r1, r2), 3))
}

fn one_reg(mnemonic: &str, i: usize, code: &[u16]) -> Result<Instruction> {
    let r1 = word(code, i + 1)?;
    Ok(Instruction::new(i, mnemonic, format!("%{}", r1), 2))
}

fn no_operand(mnemonic: &str, i: usize) -> Instruction {
    Instruction::new(i, mnemonic, "", 1)
}

fn ccl(i: usize, code: &[u16]) -> Result<Instruction> {
    let r1 = word(code, i + 1)?;
    let count = word(code, i + 2)?;
    let end = r1 as i64 + count as i64 - 1;
    Ok(Instruction::new(i, "ccl", format!("%{}-%{}", r1, end), 3))
}

fn jump(mnemonic: &str, i: usize, code: &[u16]) -> Result<Instruction> {
    let target = word(code, i + 1)? as usize + i;
    Ok(Instruction::new(i, mnemonic, format!("0x{:09X}", target), 2))
}

fn const_op(i: usize, code: &[u16], data: &[Constant]) -> Result<Instruction> {
    let r1 = word(code, i + 1)?;
    let r2 = word(code, i + 2)?;
    let comment = format!("*{} = {}", r2, value_comment(data, r2));
    Ok(Instruction::new(i, "const", format!("%{}, *{}", r1, r2), 3).with_comment(comment))
}

/// `gpd`/`gpds`/`deld`/`typeofd`: dotted-property access by constant
/// name, all sharing the same operand and size shape.
fn prop_by_name(mnemonic: &str, i: usize, code: &[u16], data: &[Constant]) -> Result<Instruction> {
    let r1 = word(code, i + 1)?;
    let r2 = word(code, i + 2)?;
    let r3 = word(code, i + 3)?;
    let comment = format!("*{} = {}", r3, value_comment(data, r3));
    Ok(Instruction::new(i, mnemonic, format!("%{}, %{}.*{}", r1, r2, r3), 4).with_comment(comment))
}

/// `gpi`/`gpis`/`deli`/`typeofi`: dotted-property access by register
/// index, no constant annotation.
fn prop_by_index(mnemonic: &str, i: usize, code: &[u16]) -> Result<Instruction> {
    let r1 = word(code, i + 1)?;
    let r2 = word(code, i + 2)?;
    let r3 = word(code, i + 3)?;
    Ok(Instruction::new(i, mnemonic, format!("%{}, %{}.%{}", r1, r2, r3), 4))
}

fn spd_like(mnemonic: &str, i: usize, code: &[u16], data: &[Constant]) -> Result<Instruction> {
    let r1 = word(code, i + 1)?;
    let r2 = word(code, i + 2)?;
    let r3 = word(code, i + 3)?;
    let comment = format!("*{} = {}", r2, value_comment(data, r2));
    Ok(Instruction::new(i, mnemonic, format!("%{}.*{}, %{}", r1, r2, r3), 4).with_comment(comment))
}

fn spi_like(mnemonic: &str, i: usize, code: &[u16]) -> Result<Instruction> {
    let r1 = word(code, i + 1)?;
    let r2 = word(code, i + 2)?;
    let r3 = word(code, i + 3)?;
    Ok(Instruction::new(i, mnemonic, format!("%{}.%{}, %{}", r1, r2, r3), 4))
}

fn entry(i: usize, code: &[u16]) -> Result<Instruction> {
    let addr = word(code, i + 1)? as usize + i;
    let r1 = word(code, i + 2)?;
    // Decimal, unlike jf/jnf/jmp's hex rendering -- matches the reference
    // disassembler's asymmetric formatting for this one opcode.
    Ok(Instruction::new(i, "entry", format!("{:09}, %{}", addr, r1), 3))
}

fn call(opcode: Opcode, i: usize, code: &[u16], data: &[Constant]) -> Result<Instruction> {
    let r1 = word(code, i + 1)?;
    let r2 = word(code, i + 2)?;

    let (mnemonic, mut operands, mut st) = match opcode {
        Opcode::Call => ("call", format!("%{}, %{}(", r1, r2), 4usize),
        Opcode::Calld => {
            let r3 = word(code, i + 3)?;
            ("calld", format!("%{}, %{}.*{}(", r1, r2, r3), 5)
        }
        Opcode::Calli => {
            let r3 = word(code, i + 3)?;
            ("calli", format!("%{}, %{}.%{}(", r1, r2, r3), 5)
        }
        Opcode::New => ("new", format!("%{}, %{}(", r1, r2), 4),
        _ => unreachable!("call() invoked with non-call opcode"),
    };

    let num = word(code, i + st - 1)? as i16;
    let size;
    if num == -1 {
        size = st;
        operands.push_str("...");
    } else if num == -2 {
        st += 1;
        let num = word(code, i + st - 1)? as usize;
        size = st + num * 2;
        for j in 0..num {
            if j > 0 {
                operands.push_str(", ");
            }
            let arg_type = word(code, i + st + j * 2)?;
            let arg_reg = word(code, i + st + j * 2 + 1)?;
            match FuncArgType::try_from(arg_type as u8) {
                Ok(FuncArgType::Normal) => operands.push_str(&format!("%{}", arg_reg)),
                Ok(FuncArgType::Expand) => operands.push_str(&format!("%{}*", arg_reg)),
                Ok(FuncArgType::UnnamedExpand) | Err(_) => operands.push('*'),
            }
        }
    } else {
        let num = num as usize;
        size = st + num;
        for c in 0..num {
            if c > 0 {
                operands.push_str(", ");
            }
            let arg_reg = word(code, i + c + st)?;
            operands.push_str(&format!("%{}", arg_reg));
        }
    }
    operands.push(')');

    let mut inst = Instruction::new(i, mnemonic, operands, size);
    if matches!(opcode, Opcode::Calld) {
        let r3 = word(code, i + 3)?;
        inst = inst.with_comment(format!("*{} = {}", r3, value_comment(data, r3)));
    }
    Ok(inst)
}

/// Disassemble the word range `[start, end)` of a single code context.
pub fn disassemble_range(code: &[u16], data: &[Constant], start: usize, end: usize) -> Result<Vec<Instruction>> {
    let end = end.min(code.len());
    let mut out = Vec::new();
    let mut i = start;
    while i < end {
        let raw = code[i];
        let inst = match Opcode::try_from(raw) {
            Err(_) => Instruction::new(i, format!("unknown ({})", raw), "", 1),
            Ok(opcode) => dispatch(opcode, i, code, data)?,
        };
        let size = inst.size.max(1);
        out.push(inst);
        i += size;
    }
    Ok(out)
}

fn dispatch(opcode: Opcode, i: usize, code: &[u16], data: &[Constant]) -> Result<Instruction> {
    use Opcode::*;
    Ok(match opcode {
        Nop => no_operand("nop", i),
        Nf => no_operand("nf", i).with_comment("!"),
        Ret => no_operand("ret", i),
        Extry => no_operand("extry", i),
        Regmember => no_operand("regmember", i),
        Debugger => no_operand("debugger", i),

        Const => const_op(i, code, data)?,
        Cp => two_reg("cp", i, code)?,
        Ceq => two_reg("ceq", i, code)?,
        Cdeq => two_reg("cdeq", i, code)?,
        Clt => two_reg("clt", i, code)?,
        Cgt => two_reg("cgt", i, code)?,
        Chkins => two_reg("chkins", i, code)?,
        Setp => two_reg("setp", i, code)?,
        Getp => two_reg("getp", i, code)?,
        Chgthis => two_reg("chgthis", i, code)?,
        Addci => two_reg("addci", i, code)?,

        Tt => one_reg("tt", i, code)?,
        Tf => one_reg("tf", i, code)?,
        Setf => one_reg("setf", i, code)?,
        Setnf => one_reg("setnf", i, code)?,
        Lnot => one_reg("lnot", i, code)?,
        Bnot => one_reg("bnot", i, code)?,
        Asc => one_reg("asc", i, code)?,
        Chr => one_reg("chr", i, code)?,
        Num => one_reg("num", i, code)?,
        Chs => one_reg("chs", i, code)?,
        Cl => one_reg("cl", i, code)?,
        Inv => one_reg("inv", i, code)?,
        Chkinv => one_reg("chkinv", i, code)?,
        Typeof => one_reg("typeof", i, code)?,
        Eval => one_reg("eval", i, code)?,
        Eexp => one_reg("eexp", i, code)?,
        Int => one_reg("int", i, code)?,
        Real => one_reg("real", i, code)?,
        Str => one_reg("str", i, code)?,
        Octet => one_reg("octet", i, code)?,
        Srv => one_reg("srv", i, code)?,
        Throw => one_reg("throw", i, code)?,
        Global => one_reg("global", i, code)?,

        Ccl => ccl(i, code)?,

        Jf => jump("jf", i, code)?,
        Jnf => jump("jnf", i, code)?,
        Jmp => jump("jmp", i, code)?,
        Entry => entry(i, code)?,

        Inc => inc_dec("inc", Variant::Base, i, code, data)?,
        IncPd => inc_dec("inc", Variant::Pd, i, code, data)?,
        IncPi => inc_dec("inc", Variant::Pi, i, code, data)?,
        IncP => inc_dec("inc", Variant::P, i, code, data)?,
        Dec => inc_dec("dec", Variant::Base, i, code, data)?,
        DecPd => inc_dec("dec", Variant::Pd, i, code, data)?,
        DecPi => inc_dec("dec", Variant::Pi, i, code, data)?,
        DecP => inc_dec("dec", Variant::P, i, code, data)?,

        Lor => op2("lor", Variant::Base, i, code, data)?,
        LorPd => op2("lor", Variant::Pd, i, code, data)?,
        LorPi => op2("lor", Variant::Pi, i, code, data)?,
        LorP => op2("lor", Variant::P, i, code, data)?,
        Land => op2("land", Variant::Base, i, code, data)?,
        LandPd => op2("land", Variant::Pd, i, code, data)?,
        LandPi => op2("land", Variant::Pi, i, code, data)?,
        LandP => op2("land", Variant::P, i, code, data)?,
        Bor => op2("bor", Variant::Base, i, code, data)?,
        BorPd => op2("bor", Variant::Pd, i, code, data)?,
        BorPi => op2("bor", Variant::Pi, i, code, data)?,
        BorP => op2("bor", Variant::P, i, code, data)?,
        Bxor => op2("bxor", Variant::Base, i, code, data)?,
        BxorPd => op2("bxor", Variant::Pd, i, code, data)?,
        BxorPi => op2("bxor", Variant::Pi, i, code, data)?,
        BxorP => op2("bxor", Variant::P, i, code, data)?,
        Band => op2("band", Variant::Base, i, code, data)?,
        BandPd => op2("band", Variant::Pd, i, code, data)?,
        BandPi => op2("band", Variant::Pi, i, code, data)?,
        BandP => op2("band", Variant::P, i, code, data)?,
        Sar => op2("sar", Variant::Base, i, code, data)?,
        SarPd => op2("sar", Variant::Pd, i, code, data)?,
        SarPi => op2("sar", Variant::Pi, i, code, data)?,
        SarP => op2("sar", Variant::P, i, code, data)?,
        Sal => op2("sal", Variant::Base, i, code, data)?,
        SalPd => op2("sal", Variant::Pd, i, code, data)?,
        SalPi => op2("sal", Variant::Pi, i, code, data)?,
        SalP => op2("sal", Variant::P, i, code, data)?,
        Sr => op2("sr", Variant::Base, i, code, data)?,
        SrPd => op2("sr", Variant::Pd, i, code, data)?,
        SrPi => op2("sr", Variant::Pi, i, code, data)?,
        SrP => op2("sr", Variant::P, i, code, data)?,
        Add => op2("add", Variant::Base, i, code, data)?,
        AddPd => op2("add", Variant::Pd, i, code, data)?,
        AddPi => op2("add", Variant::Pi, i, code, data)?,
        AddP => op2("add", Variant::P, i, code, data)?,
        Sub => op2("sub", Variant::Base, i, code, data)?,
        SubPd => op2("sub", Variant::Pd, i, code, data)?,
        SubPi => op2("sub", Variant::Pi, i, code, data)?,
        SubP => op2("sub", Variant::P, i, code, data)?,
        Mod => op2("mod", Variant::Base, i, code, data)?,
        ModPd => op2("mod", Variant::Pd, i, code, data)?,
        ModPi => op2("mod", Variant::Pi, i, code, data)?,
        ModP => op2("mod", Variant::P, i, code, data)?,
        Div => op2("div", Variant::Base, i, code, data)?,
        DivPd => op2("div", Variant::Pd, i, code, data)?,
        DivPi => op2("div", Variant::Pi, i, code, data)?,
        DivP => op2("div", Variant::P, i, code, data)?,
        Idiv => op2("idiv", Variant::Base, i, code, data)?,
        IdivPd => op2("idiv", Variant::Pd, i, code, data)?,
        IdivPi => op2("idiv", Variant::Pi, i, code, data)?,
        IdivP => op2("idiv", Variant::P, i, code, data)?,
        Mul => op2("mul", Variant::Base, i, code, data)?,
        MulPd => op2("mul", Variant::Pd, i, code, data)?,
        MulPi => op2("mul", Variant::Pi, i, code, data)?,
        MulP => op2("mul", Variant::P, i, code, data)?,

        Call | Calld | Calli | New => call(opcode, i, code, data)?,

        Gpd => prop_by_name("gpd", i, code, data)?,
        Gpds => prop_by_name("gpds", i, code, data)?,
        Deld => prop_by_name("deld", i, code, data)?,
        TypeofD => prop_by_name("typeofd", i, code, data)?,

        Gpi => prop_by_index("gpi", i, code)?,
        Gpis => prop_by_index("gpis", i, code)?,
        Deli => prop_by_index("deli", i, code)?,
        TypeofI => prop_by_index("typeofi", i, code)?,

        Spd => spd_like("spd", i, code, data)?,
        Spde => spd_like("spde", i, code, data)?,
        Spdeh => spd_like("spdeh", i, code, data)?,
        Spds => spd_like("spds", i, code, data)?,

        Spi => spi_like("spi", i, code)?,
        Spie => spi_like("spie", i, code)?,
        Spis => spi_like("spis", i, code)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn nop_is_size_one() {
        let code = [0u16];
        let out = disassemble_range(&code, &[], 0, 1).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].mnemonic, "nop");
        assert_eq!(out[0].size, 1);
    }

    #[test]
    fn unknown_opcode_is_non_fatal() {
        let code = [9999u16, 0 /* nop */];
        let out = disassemble_range(&code, &[], 0, 2).unwrap();
        assert_eq!(out[0].mnemonic, "unknown (9999)");
        assert_eq!(out[0].size, 1);
        assert_eq!(out[1].mnemonic, "nop");
    }

    #[test]
    fn const_reports_pool_value_in_comment() {
        // const %1, *0 ; data[0] = Integer(7)
        let code = [Opcode::Const as u16, 1, 0];
        let data = vec![Constant::Integer(7)];
        let out = disassemble_range(&code, &data, 0, 3).unwrap();
        assert_eq!(out[0].mnemonic, "const");
        assert_eq!(out[0].operands, "%1, *0");
        assert_eq!(out[0].comment, "*0 = 7");
    }

    #[test]
    fn const_out_of_range_is_non_fatal() {
        let code = [Opcode::Const as u16, 1, 5];
        let out = disassemble_range(&code, &[], 0, 3).unwrap();
        assert_eq!(out[0].comment, "*5 = <out of range>");
    }

    #[test]
    fn jmp_renders_hex_target() {
        let code = [Opcode::Jmp as u16, 4];
        let out = disassemble_range(&code, &[], 0, 2).unwrap();
        assert_eq!(out[0].operands, "0x000000004");
    }

    #[test]
    fn entry_renders_decimal_target_asymmetrically() {
        let code = [Opcode::Entry as u16, 4, 2];
        let out = disassemble_range(&code, &[], 0, 3).unwrap();
        assert_eq!(out[0].operands, "000000004, %2");
    }

    #[rstest]
    #[case(Opcode::Add, "add")]
    #[case(Opcode::AddP, "addp")]
    fn op2_base_and_p_variants(#[case] opcode: Opcode, #[case] mnemonic: &str) {
        let code = match opcode {
            Opcode::Add => vec![opcode as u16, 1, 2],
            Opcode::AddP => vec![opcode as u16, 1, 2, 3],
            _ => unreachable!(),
        };
        let out = disassemble_range(&code, &[], 0, code.len()).unwrap();
        assert_eq!(out[0].mnemonic, mnemonic);
    }

    #[test]
    fn call_with_omitted_args() {
        let code = [Opcode::Call as u16, 1, 2, u16::MAX /* -1 as u16, omit */];
        let out = disassemble_range(&code, &[], 0, 4).unwrap();
        assert_eq!(out[0].mnemonic, "call");
        assert_eq!(out[0].operands, "%1, %2(...)");
        assert_eq!(out[0].size, 4);
    }

    #[test]
    fn call_with_normal_args() {
        // call %1, %2(%3, %4)
        let code = [Opcode::Call as u16, 1, 2, 2, 3, 4];
        let out = disassemble_range(&code, &[], 0, 6).unwrap();
        assert_eq!(out[0].operands, "%1, %2(%3, %4)");
        assert_eq!(out[0].size, 6);
    }

    #[test]
    fn ccl_renders_register_range() {
        // ccl %3-%(3+4-1) = %3-%6
        let code = [Opcode::Ccl as u16, 3, 4];
        let out = disassemble_range(&code, &[], 0, 3).unwrap();
        assert_eq!(out[0].mnemonic, "ccl");
        assert_eq!(out[0].operands, "%3-%6");
        assert_eq!(out[0].size, 3);
    }

    #[test]
    fn ccl_with_zero_count_does_not_overflow() {
        // count == 0, r1 == 0 would underflow a bare u16 subtraction
        let code = [Opcode::Ccl as u16, 0, 0];
        let out = disassemble_range(&code, &[], 0, 3).unwrap();
        assert_eq!(out[0].operands, "%0-%-1");
    }

    #[test]
    fn ccl_near_u16_max_does_not_overflow() {
        let code = [Opcode::Ccl as u16, u16::MAX, u16::MAX];
        let out = disassemble_range(&code, &[], 0, 3).unwrap();
        assert_eq!(out[0].operands, format!("%{}-%{}", u16::MAX, u16::MAX as i64 * 2 - 1));
    }
}
