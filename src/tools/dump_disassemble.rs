use super::{Args, DisassembleArgs, OutputFormat};

use anyhow::Result;
use tjs2_disasm::Disassembler;

pub fn dump_disassemble(disasm: &Disassembler, args: &Args, disasm_args: &DisassembleArgs) -> Result<()> {
    let object_index = disasm_args
        .object
        .or(disasm.top_level())
        .unwrap_or(0);

    let instructions = disasm.disassemble(object_index, disasm_args.start, disasm_args.end)?;

    match args.format() {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&instructions)?);
        }
        OutputFormat::Text => {
            let name = disasm
                .object(object_index)
                .map(|o| o.name.as_str())
                .unwrap_or("?");
            println!("; object {} ({})", object_index, name);
            for inst in instructions {
                if inst.comment.is_empty() {
                    println!("{:08} {:<10} {}", inst.address, inst.mnemonic, inst.operands);
                } else {
                    println!(
                        "{:08} {:<10} {:<24} ; {}",
                        inst.address, inst.mnemonic, inst.operands, inst.comment
                    );
                }
            }
        }
    }
    Ok(())
}
