#![forbid(unsafe_code)]
pub mod container;
pub mod disasm;
pub mod object;
pub mod opcode;
pub mod pool;
pub(crate) mod reader;


use anyhow::Result;
use serde::Serialize;

pub use container::BytecodeFile;
pub use disasm::Instruction;
pub use object::{CodeContext, Constant};
pub use opcode::{ContextType, Opcode};

/// Summary metadata for one code context, as surfaced by the
/// `list-objects` presentation operation.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSummary {
    pub index: usize,
    pub name: String,
    pub context_type: ContextType,
    pub code_length: usize,
    pub data_length: usize,
    pub max_variable_count: i32,
    pub variable_reserve_count: i32,
}

/// Top-level entry point: a parsed bytecode file plus the operations
/// the presentation layer (CLI, or any other consumer) needs.
pub struct Disassembler {
    file: BytecodeFile,
}

impl Disassembler {
    pub fn load(data: &[u8]) -> Result<Self> {
        Ok(Disassembler {
            file: BytecodeFile::parse(data)?,
        })
    }

    pub fn top_level(&self) -> Option<usize> {
        self.file.top_level
    }

    pub fn object_count(&self) -> usize {
        self.file.objects.len()
    }

    pub fn object(&self, index: usize) -> Option<&CodeContext> {
        self.file.objects.get(index)
    }

    pub fn pool(&self) -> &pool::ConstantPool {
        &self.file.pool
    }

    pub fn objects(&self) -> impl Iterator<Item = (usize, &CodeContext)> {
        self.file.objects.iter().enumerate()
    }

    pub fn summaries(&self) -> Vec<ObjectSummary> {
        self.objects()
            .map(|(index, obj)| ObjectSummary {
                index,
                name: obj.name.clone(),
                context_type: obj.context_type,
                code_length: obj.code.len(),
                data_length: obj.data.len(),
                max_variable_count: obj.max_variable_count,
                variable_reserve_count: obj.variable_reserve_count,
            })
            .collect()
    }

    /// Disassemble `[start, end)` of the given object's code array.
    /// `end = None` disassembles to the end of the code array.
    pub fn disassemble(&self, object_index: usize, start: usize, end: Option<usize>) -> Result<Vec<Instruction>> {
        let obj = self
            .file
            .objects
            .get(object_index)
            .ok_or_else(|| anyhow::anyhow!("object index {} out of range", object_index))?;
        let end = end.unwrap_or(obj.code.len());
        disasm::disassemble_range(&obj.code, &obj.data, start, end)
    }
}
