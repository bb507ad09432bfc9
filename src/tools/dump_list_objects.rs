use super::{Args, OutputFormat};

use anyhow::Result;
use tjs2_disasm::Disassembler;

pub fn dump_list_objects(disasm: &Disassembler, args: &Args) -> Result<()> {
    let summaries = disasm.summaries();

    match args.format() {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        OutputFormat::Text => {
            for s in &summaries {
                println!(
                    "{:4}  {:?}  code={:<6} data={:<6} vars={}/{}  {}",
                    s.index,
                    s.context_type,
                    s.code_length,
                    s.data_length,
                    s.variable_reserve_count,
                    s.max_variable_count,
                    s.name,
                );
            }
        }
    }
    Ok(())
}
