//! `OBJS` section: code contexts (one per function/property/class body)
//! and the cross-reference fixup pass that links them together.
//!
//! Records are read flat first, then cross-references are resolved in
//! a second pass once every object's index is known.

use crate::container::FILE_TAG;
use crate::opcode::ContextType;
use crate::pool::ConstantPool;
use crate::reader::{Reader, TjsRead};
use anyhow::{ensure, Result};
use serde::Serialize;

pub const OBJS_TAG: u32 = 0x534A_424F; // 'OBJS' little-endian

const TYPE_VOID: i16 = 0;
const TYPE_OBJECT: i16 = 1;
const TYPE_INTER_OBJECT: i16 = 2;
const TYPE_STRING: i16 = 3;
const TYPE_OCTET: i16 = 4;
const TYPE_REAL: i16 = 5;
const TYPE_BYTE: i16 = 6;
const TYPE_SHORT: i16 = 7;
const TYPE_INTEGER: i16 = 8;
const TYPE_LONG: i16 = 9;
const TYPE_INTER_GENERATOR: i16 = 10;

/// A single resolved slot in an object's data array.
#[derive(Debug, Clone, Serialize)]
pub enum Constant {
    Void,
    /// Either a plain null object slot, or (after the fixup pass) a
    /// resolved reference to another code context by index.
    Object(Option<usize>),
    String(String),
    Octet(Vec<u8>),
    Real(f64),
    Byte(u8),
    Short(u16),
    Integer(i32),
    Long(i64),
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SourcePos {
    pub code_pos: i32,
    pub source_pos: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeContext {
    pub name: String,
    pub context_type: ContextType,
    pub code: Vec<u16>,
    pub data: Vec<Constant>,
    pub max_variable_count: i32,
    pub variable_reserve_count: i32,
    pub max_frame_count: i32,
    pub func_decl_arg_count: i32,
    pub func_decl_unnamed_arg_array_base: i32,
    pub func_decl_collapse_base: i32,
    pub source_positions: Vec<SourcePos>,
    pub super_class_getters: Vec<i32>,
    pub parent: Option<usize>,
    pub prop_setter: Option<usize>,
    pub prop_getter: Option<usize>,
    pub super_class_getter_obj: Option<usize>,
    pub properties: Vec<(String, Option<usize>)>,
}

/// Pending inter-object/inter-generator slot: `obj_index` is the code
/// context this slot must resolve to once every object has been read.
struct PendingSlot {
    owner: usize,
    slot: usize,
    obj_index: i32,
}

fn resolve_index(raw: i32, len: usize) -> Option<usize> {
    if raw >= 0 {
        usize::try_from(raw).ok().filter(|&i| i < len)
    } else {
        None
    }
}

pub struct ObjectArea {
    pub top_level: Option<usize>,
    pub objects: Vec<CodeContext>,
}

impl ObjectArea {
    pub fn read(r: &mut Reader, pool: &ConstantPool) -> Result<Self> {
        let tag = r.read_i32()? as u32;
        let _size = r.read_i32()?;
        ensure!(
            tag == OBJS_TAG,
            "InvalidFormat: expected OBJS tag, got {:#010x}",
            tag
        );

        let top_level = r.read_i32()?;
        let obj_count = r.read_i32()?;
        ensure!(obj_count >= 0, "InvalidFormat: negative object count");
        let obj_count = obj_count as usize;

        let mut objects = Vec::with_capacity(obj_count);
        let mut parents = Vec::with_capacity(obj_count);
        let mut prop_setters = Vec::with_capacity(obj_count);
        let mut prop_getters = Vec::with_capacity(obj_count);
        let mut super_class_getter_objs = Vec::with_capacity(obj_count);
        let mut raw_properties: Vec<Vec<i32>> = Vec::with_capacity(obj_count);
        let mut pending: Vec<PendingSlot> = Vec::new();

        for o in 0..obj_count {
            let tag = r.read_i32()? as u32;
            ensure!(
                tag == FILE_TAG,
                "InvalidFormat: bad object tag for object {}",
                o
            );
            let _objsize = r.read_i32()?;

            let parent = r.read_i32()?;
            let name_idx = r.read_i32()?;
            let context_type_val = r.read_i32()?;
            let max_variable_count = r.read_i32()?;
            let variable_reserve_count = r.read_i32()?;
            let max_frame_count = r.read_i32()?;
            let func_decl_arg_count = r.read_i32()?;
            let func_decl_unnamed_arg_array_base = r.read_i32()?;
            let func_decl_collapse_base = r.read_i32()?;
            let prop_setter = r.read_i32()?;
            let prop_getter = r.read_i32()?;
            let super_class_getter_obj = r.read_i32()?;

            let pos_count = r.read_i32()?;
            let mut source_positions = Vec::new();
            if pos_count > 0 {
                let pos_count = pos_count as usize;
                let code_positions: Vec<i32> =
                    (0..pos_count).map(|_| r.read_i32()).collect::<Result<_>>()?;
                for code_pos in code_positions {
                    let source_pos = r.read_i32()?;
                    source_positions.push(SourcePos { code_pos, source_pos });
                }
            }

            let code_size = r.read_i32()?;
            ensure!(code_size >= 0, "InvalidFormat: negative code size");
            let code_size = code_size as usize;
            let mut code = Vec::with_capacity(code_size);
            for _ in 0..code_size {
                code.push(r.read_u16()?);
            }
            if code_size & 1 != 0 {
                r.skip(2)?;
            }

            let var_count = r.read_i32()?;
            ensure!(var_count >= 0, "InvalidFormat: negative data count");
            let var_count = var_count as usize;
            let mut raw_pairs = Vec::with_capacity(var_count * 2);
            for _ in 0..var_count * 2 {
                raw_pairs.push(r.read_i16()?);
            }

            let mut data = Vec::with_capacity(var_count);
            for i in 0..var_count {
                let type_val = raw_pairs[i * 2];
                let index = raw_pairs[i * 2 + 1] as i32;
                match type_val {
                    TYPE_VOID => data.push(Constant::Void),
                    TYPE_OBJECT => data.push(Constant::Object(None)),
                    TYPE_INTER_OBJECT | TYPE_INTER_GENERATOR => {
                        pending.push(PendingSlot {
                            owner: o,
                            slot: i,
                            obj_index: index,
                        });
                        data.push(Constant::Object(None));
                    }
                    TYPE_STRING => data.push(
                        pool.string_at(index)
                            .map(|s| Constant::String(s.to_string()))
                            .unwrap_or(Constant::Unknown),
                    ),
                    TYPE_OCTET => data.push(
                        pool.octet_at(index)
                            .map(|o| Constant::Octet(o.to_vec()))
                            .unwrap_or(Constant::Unknown),
                    ),
                    TYPE_REAL => data.push(
                        pool.double_at(index).map(Constant::Real).unwrap_or(Constant::Unknown),
                    ),
                    TYPE_BYTE => {
                        data.push(pool.byte_at(index).map(Constant::Byte).unwrap_or(Constant::Unknown))
                    }
                    TYPE_SHORT => data.push(
                        pool.short_at(index).map(Constant::Short).unwrap_or(Constant::Unknown),
                    ),
                    TYPE_INTEGER => {
                        data.push(pool.int_at(index).map(Constant::Integer).unwrap_or(Constant::Unknown))
                    }
                    TYPE_LONG => {
                        data.push(pool.long_at(index).map(Constant::Long).unwrap_or(Constant::Unknown))
                    }
                    _ => data.push(Constant::Unknown),
                }
            }

            let scgetter_count = r.read_i32()?;
            ensure!(scgetter_count >= 0, "InvalidFormat: negative super-getter count");
            let mut super_class_getters = Vec::with_capacity(scgetter_count as usize);
            for _ in 0..scgetter_count {
                super_class_getters.push(r.read_i32()?);
            }

            let prop_count = r.read_i32()?;
            let mut props = Vec::new();
            if prop_count > 0 {
                for _ in 0..prop_count * 2 {
                    props.push(r.read_i32()?);
                }
            }

            let name = pool
                .string_at(name_idx)
                .map(str::to_string)
                .unwrap_or_else(|| format!("obj_{}", o));
            let context_type = ContextType::try_from(context_type_val)
                .unwrap_or(ContextType::TopLevel);

            objects.push(CodeContext {
                name,
                context_type,
                code,
                data,
                max_variable_count,
                variable_reserve_count,
                max_frame_count,
                func_decl_arg_count,
                func_decl_unnamed_arg_array_base,
                func_decl_collapse_base,
                source_positions,
                super_class_getters,
                parent: None,
                prop_setter: None,
                prop_getter: None,
                super_class_getter_obj: None,
                properties: Vec::new(),
            });
            parents.push(parent);
            prop_setters.push(prop_setter);
            prop_getters.push(prop_getter);
            super_class_getter_objs.push(super_class_getter_obj);
            raw_properties.push(props);
        }

        for o in 0..obj_count {
            objects[o].parent = resolve_index(parents[o], obj_count);
            objects[o].prop_setter = resolve_index(prop_setters[o], obj_count);
            objects[o].prop_getter = resolve_index(prop_getters[o], obj_count);
            objects[o].super_class_getter_obj = resolve_index(super_class_getter_objs[o], obj_count);

            let props = &raw_properties[o];
            let mut resolved = Vec::with_capacity(props.len() / 2);
            for pair in props.chunks_exact(2) {
                let pname_idx = pair[0];
                let pobj_idx = pair[1];
                let pname = pool
                    .string_at(pname_idx)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("prop_{}", resolved.len()));
                let pobj = resolve_index(pobj_idx, obj_count);
                resolved.push((pname, pobj));
            }
            objects[o].properties = resolved;
        }

        // Corrected inter-object/inter-generator fixup: the resolved
        // object comes from `obj_index` (the object this slot points
        // at), not from `slot` (the slot's own position).
        for p in pending {
            if let Some(target) = resolve_index(p.obj_index, obj_count) {
                objects[p.owner].data[p.slot] = Constant::Object(Some(target));
            }
        }

        let top_level = resolve_index(top_level, obj_count);

        Ok(ObjectArea { top_level, objects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_objs_with_one_nop() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&OBJS_TAG.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // size
        data.extend_from_slice(&0i32.to_le_bytes()); // top_level
        data.extend_from_slice(&1i32.to_le_bytes()); // obj_count

        data.extend_from_slice(&FILE_TAG.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // objsize
        data.extend_from_slice(&(-1i32).to_le_bytes()); // parent
        data.extend_from_slice(&(-1i32).to_le_bytes()); // name_idx (out of range -> obj_0)
        data.extend_from_slice(&0i32.to_le_bytes()); // context_type = TopLevel
        data.extend_from_slice(&0i32.to_le_bytes()); // max_variable_count
        data.extend_from_slice(&0i32.to_le_bytes()); // variable_reserve_count
        data.extend_from_slice(&0i32.to_le_bytes()); // max_frame_count
        data.extend_from_slice(&0i32.to_le_bytes()); // func_decl_arg_count
        data.extend_from_slice(&0i32.to_le_bytes()); // func_decl_unnamed_arg_array_base
        data.extend_from_slice(&0i32.to_le_bytes()); // func_decl_collapse_base
        data.extend_from_slice(&(-1i32).to_le_bytes()); // prop_setter
        data.extend_from_slice(&(-1i32).to_le_bytes()); // prop_getter
        data.extend_from_slice(&(-1i32).to_le_bytes()); // super_class_getter_obj
        data.extend_from_slice(&0i32.to_le_bytes()); // source pos count
        data.extend_from_slice(&1i32.to_le_bytes()); // code_size = 1
        data.extend_from_slice(&0u16.to_le_bytes()); // nop opcode word
        data.extend_from_slice(&0u16.to_le_bytes()); // pad to 4 bytes (code_size odd)
        data.extend_from_slice(&0i32.to_le_bytes()); // data var count
        data.extend_from_slice(&0i32.to_le_bytes()); // super getter count
        data.extend_from_slice(&0i32.to_le_bytes()); // prop count
        data
    }

    #[test]
    fn reads_single_object_with_one_instruction() {
        let data = empty_objs_with_one_nop();
        let mut r = Reader::new(&data);
        let pool = ConstantPool::default();
        let area = ObjectArea::read(&mut r, &pool).unwrap();
        assert_eq!(area.objects.len(), 1);
        assert_eq!(area.objects[0].code, vec![0]);
        assert_eq!(area.objects[0].name, "obj_0");
        assert!(area.objects[0].parent.is_none());
        assert_eq!(area.top_level, Some(0));
    }

    /// A bare object record with no code and a caller-supplied data
    /// array (as `(type_tag, pool_index)` pairs).
    fn write_object_with_data(data: &mut Vec<u8>, data_entries: &[(i16, i16)]) {
        data.extend_from_slice(&FILE_TAG.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // objsize
        data.extend_from_slice(&(-1i32).to_le_bytes()); // parent
        data.extend_from_slice(&(-1i32).to_le_bytes()); // name_idx
        data.extend_from_slice(&0i32.to_le_bytes()); // context_type
        data.extend_from_slice(&0i32.to_le_bytes()); // max_variable_count
        data.extend_from_slice(&0i32.to_le_bytes()); // variable_reserve_count
        data.extend_from_slice(&0i32.to_le_bytes()); // max_frame_count
        data.extend_from_slice(&0i32.to_le_bytes()); // func_decl_arg_count
        data.extend_from_slice(&0i32.to_le_bytes()); // func_decl_unnamed_arg_array_base
        data.extend_from_slice(&0i32.to_le_bytes()); // func_decl_collapse_base
        data.extend_from_slice(&(-1i32).to_le_bytes()); // prop_setter
        data.extend_from_slice(&(-1i32).to_le_bytes()); // prop_getter
        data.extend_from_slice(&(-1i32).to_le_bytes()); // super_class_getter_obj
        data.extend_from_slice(&0i32.to_le_bytes()); // source pos count
        data.extend_from_slice(&0i32.to_le_bytes()); // code_size = 0
        data.extend_from_slice(&(data_entries.len() as i32).to_le_bytes());
        for (tag, idx) in data_entries {
            data.extend_from_slice(&tag.to_le_bytes());
            data.extend_from_slice(&idx.to_le_bytes());
        }
        data.extend_from_slice(&0i32.to_le_bytes()); // super getter count
        data.extend_from_slice(&0i32.to_le_bytes()); // prop count
    }

    /// Regression test for the corrected INTER_OBJECT fixup (spec.md
    /// §9): object 0's data array has a VOID slot at position 0 and an
    /// INTER_OBJECT slot at position 1 recording `obj_index = 2`. The
    /// owning slot's own worklist position (1) and the recorded target
    /// (2) differ on purpose, and point at distinct decoy objects, so
    /// resolving by slot position instead of by `obj_index` would
    /// silently pick the wrong object and this test would catch it.
    #[test]
    fn inter_object_slot_resolves_by_recorded_index_not_slot_position() {
        let mut data = Vec::new();
        data.extend_from_slice(&OBJS_TAG.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // size
        data.extend_from_slice(&0i32.to_le_bytes()); // top_level
        data.extend_from_slice(&3i32.to_le_bytes()); // obj_count

        // object 0 (owner): slot 0 = VOID, slot 1 = INTER_OBJECT -> obj_index 2
        write_object_with_data(&mut data, &[(TYPE_VOID, 0), (TYPE_INTER_OBJECT, 2)]);
        // object 1: decoy living at the pending slot's own position
        write_object_with_data(&mut data, &[]);
        // object 2: the actual recorded target
        write_object_with_data(&mut data, &[]);

        let mut r = Reader::new(&data);
        let pool = ConstantPool::default();
        let area = ObjectArea::read(&mut r, &pool).unwrap();

        assert_eq!(area.objects.len(), 3);
        match area.objects[0].data[1] {
            Constant::Object(Some(idx)) => {
                assert_eq!(idx, 2, "must resolve to obj_index, not slot position");
                assert_ne!(idx, 1, "must not resolve to the slot's own worklist position");
            }
            ref other => panic!("expected resolved Object(Some(2)), got {:?}", other),
        }
    }
}
