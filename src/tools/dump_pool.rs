use super::{Args, OutputFormat};

use anyhow::Result;
use tjs2_disasm::Disassembler;

pub fn dump_pool(disasm: &Disassembler, args: &Args) -> Result<()> {
    let pool = disasm.pool();

    match args.format() {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(pool)?);
        }
        OutputFormat::Text => {
            println!("bytes[{}]: {:?}", pool.bytes.len(), pool.bytes);
            println!("shorts[{}]: {:?}", pool.shorts.len(), pool.shorts);
            println!("ints[{}]: {:?}", pool.ints.len(), pool.ints);
            println!("longs[{}]: {:?}", pool.longs.len(), pool.longs);
            println!("doubles[{}]: {:?}", pool.doubles.len(), pool.doubles);
            println!("strings[{}]:", pool.strings.len());
            for (i, s) in pool.strings.iter().enumerate() {
                println!("  {:4}: {:?}", i, s);
            }
            println!("octets[{}]:", pool.octets.len());
            for (i, o) in pool.octets.iter().enumerate() {
                println!("  {:4}: {} bytes", i, o.len());
            }
        }
    }
    Ok(())
}
