//! Static module type descriptions from the firmware module table.

use crate::codec::{ByteStreamReader, ByteStreamWriter, StreamResult, Streamable};
use serde::Serialize;

pub const MAX_MODULE_NAME_LEN: usize = 8;
pub const DEFAULT_HASH_SHA256_LEN: usize = 32;
pub const SEGMENT_COUNT: usize = 3;

/// Segment attribute bitfield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SegmentFlags(pub u32);

impl SegmentFlags {
    pub fn is_code(self) -> bool {
        self.0 & (1 << 4) != 0
    }

    pub fn is_data(self) -> bool {
        self.0 & (1 << 5) != 0
    }

    pub fn segment_type(self) -> u32 {
        (self.0 >> 8) & 0xF
    }

    /// Segment length in pages
    pub fn length(self) -> u32 {
        self.0 >> 16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SegmentDesc {
    pub flags: SegmentFlags,
    pub v_base_addr: u32,
    pub file_offset: u32,
}

impl Streamable for SegmentDesc {
    const WIRE_SIZE: Option<usize> = Some(12);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            flags: SegmentFlags(reader.read()?),
            v_base_addr: reader.read()?,
            file_offset: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.flags.0);
        writer.write(&self.v_base_addr);
        writer.write(&self.file_offset);
    }
}

/// Module type bitfield: load type, auto start and supported domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ModuleType(pub u32);

impl ModuleType {
    pub fn load_type(self) -> u32 {
        self.0 & 0xF
    }

    pub fn auto_start(self) -> bool {
        self.0 & (1 << 4) != 0
    }

    pub fn domain_ll(self) -> bool {
        self.0 & (1 << 5) != 0
    }

    pub fn domain_dp(self) -> bool {
        self.0 & (1 << 6) != 0
    }
}

/// One entry of the module table (116 bytes on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ModuleEntry {
    pub module_id: u16,
    pub state_flags: u16,
    pub name: [u8; MAX_MODULE_NAME_LEN],
    pub uuid: [u32; 4],
    pub module_type: ModuleType,
    pub hash: Vec<u8>,
    pub entry_point: u32,
    pub cfg_offset: u16,
    pub cfg_count: u16,
    /// Cores allowed to run the module
    pub affinity_mask: u32,
    pub instance_max_count: u16,
    /// Stack required by each instance task (DP), in bytes
    pub instance_stack_size: u16,
    pub segments: [SegmentDesc; SEGMENT_COUNT],
}

impl ModuleEntry {
    /// Module name with trailing NUL padding removed
    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// The module UUID in its registry form, e.g.
    /// `DB264037-6BA1-4DC0-AE16-5C60AD470EDD`.
    ///
    /// The first three fields are stored little endian, the last eight
    /// bytes in order.
    pub fn uuid_string(&self) -> String {
        let bytes: Vec<u8> = self.uuid.iter().flat_map(|word| word.to_le_bytes()).collect();
        let data2 = u16::from_le_bytes([bytes[4], bytes[5]]);
        let data3 = u16::from_le_bytes([bytes[6], bytes[7]]);
        let tail: String = bytes[10..].iter().map(|b| format!("{:02X}", b)).collect();
        format!(
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{}",
            self.uuid[0], data2, data3, bytes[8], bytes[9], tail
        )
    }

    /// Builds an entry with a padded name, for tests and the simulator
    pub fn named(module_id: u16, name: &str) -> Self {
        let mut raw = [0u8; MAX_MODULE_NAME_LEN];
        for (dst, src) in raw.iter_mut().zip(name.bytes()) {
            *dst = src;
        }
        Self {
            module_id,
            name: raw,
            hash: vec![0; DEFAULT_HASH_SHA256_LEN],
            ..Self::default()
        }
    }
}

impl Streamable for ModuleEntry {
    const WIRE_SIZE: Option<usize> = Some(116);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            module_id: reader.read()?,
            state_flags: reader.read()?,
            name: reader.read()?,
            uuid: reader.read()?,
            module_type: ModuleType(reader.read()?),
            hash: reader.read_raw(DEFAULT_HASH_SHA256_LEN)?,
            entry_point: reader.read()?,
            cfg_offset: reader.read()?,
            cfg_count: reader.read()?,
            affinity_mask: reader.read()?,
            instance_max_count: reader.read()?,
            instance_stack_size: reader.read()?,
            segments: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.module_id);
        writer.write(&self.state_flags);
        writer.write(&self.name);
        writer.write(&self.uuid);
        writer.write(&self.module_type.0);
        let mut hash = [0u8; DEFAULT_HASH_SHA256_LEN];
        for (dst, src) in hash.iter_mut().zip(&self.hash) {
            *dst = *src;
        }
        writer.write_raw(&hash);
        writer.write(&self.entry_point);
        writer.write(&self.cfg_offset);
        writer.write(&self.cfg_count);
        writer.write(&self.affinity_mask);
        writer.write(&self.instance_max_count);
        writer.write(&self.instance_stack_size);
        writer.write(&self.segments);
    }
}

/// Reply of the module table query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModulesInfo {
    pub modules: Vec<ModuleEntry>,
}

impl ModulesInfo {
    pub fn allocation_size(count: usize) -> usize {
        4 + count * 116
    }
}

impl Streamable for ModulesInfo {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            modules: reader.read_vec::<u32, ModuleEntry>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write_vec::<u32, ModuleEntry>(&self.modules);
    }
}
