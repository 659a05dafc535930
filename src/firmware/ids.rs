//! Identifier types shared by the firmware structures.

use crate::codec::{ByteStreamReader, ByteStreamWriter, FirmwareEnum, StreamResult, Streamable};
use crate::error::{AgentError, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Module id of the base firmware, the target of every global query
pub const BASE_FW_MODULE_ID: u16 = 0;
pub const BASE_FW_INSTANCE_ID: u16 = 0;

/// First module id of dynamically loaded modules
pub const LOADABLE_MODULE_ID: u16 = 0x1000;

/// A running module instance: `(module id, instance id)`.
///
/// On the wire the pair is one `u32` with the instance id in the low half,
/// i.e. the instance id comes first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CompoundModuleId {
    pub module_id: u16,
    pub instance_id: u16,
}

impl CompoundModuleId {
    pub const fn new(module_id: u16, instance_id: u16) -> Self {
        Self {
            module_id,
            instance_id,
        }
    }

    #[inline]
    pub const fn to_int(self) -> u32 {
        ((self.module_id as u32) << 16) | self.instance_id as u32
    }
}

impl Ord for CompoundModuleId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_int().cmp(&other.to_int())
    }
}

impl PartialOrd for CompoundModuleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for CompoundModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.module_id, self.instance_id)
    }
}

impl fmt::Display for CompoundModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Streamable for CompoundModuleId {
    const WIRE_SIZE: Option<usize> = Some(4);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        let instance_id = reader.read()?;
        let module_id = reader.read()?;
        Ok(Self {
            module_id,
            instance_id,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.instance_id);
        writer.write(&self.module_id);
    }
}

crate::firmware_enum! {
    /// Connector class encoded in bits 8..13 of a [`ConnectorNodeId`]
    pub enum GatewayType {
        HdaHostOutput = 0 => "hda-host-out-gateway",
        HdaHostInput = 1 => "hda-host-in-gateway",
        HdaHostInout = 2 => "hda-host-inout-gateway",
        HdaLinkOutput = 8 => "hda-link-out-gateway",
        HdaLinkInput = 9 => "hda-link-in-gateway",
        HdaLinkInout = 10 => "hda-link-inout-gateway",
        DmicLinkInput = 11 => "dmic-link-in-gateway",
        I2sLinkOutput = 12 => "i2s-link-out-gateway",
        I2sLinkInput = 13 => "i2s-link-in-gateway",
        SlimbusLinkOutput = 14 => "slimbus-link-out-gateway",
        SlimbusLinkInput = 15 => "slimbus-link-in-gateway",
        AlhLinkOutput = 16 => "alh-link-out-gateway",
        AlhLinkInput = 17 => "alh-link-in-gateway",
    }
}

/// Gateway identifier: bits 0..8 virtual index, bits 8..13 connector class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectorNodeId(pub u32);

impl ConnectorNodeId {
    /// Marks "no gateway" in module instance props
    pub const INVALID: ConnectorNodeId = ConnectorNodeId(u32::MAX);

    const INDEX_MASK: u32 = 0xFF;
    const TYPE_SHIFT: u32 = 8;
    const TYPE_MASK: u32 = 0x1F;

    pub fn new(gateway_type: GatewayType, v_index: u8) -> Self {
        let class = gateway_type.to_raw() & Self::TYPE_MASK;
        Self((class << Self::TYPE_SHIFT) | v_index as u32)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn v_index(self) -> u8 {
        (self.0 & Self::INDEX_MASK) as u8
    }

    #[inline]
    pub fn gateway_type(self) -> GatewayType {
        GatewayType::from_raw((self.0 >> Self::TYPE_SHIFT) & Self::TYPE_MASK)
    }
}

impl Default for ConnectorNodeId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for ConnectorNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}#{}", self.gateway_type(), self.v_index())
        } else {
            write!(f, "ConnectorNodeId(INVALID)")
        }
    }
}

impl fmt::Display for ConnectorNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Streamable for ConnectorNodeId {
    const WIRE_SIZE: Option<usize> = Some(4);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        reader.read().map(Self)
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.0);
    }
}

crate::firmware_enum! {
    /// Parameters of the base firmware module
    pub enum BaseFwParam {
        FwConfig = 7 => "fw config",
        HwConfigGet = 8 => "hw config",
        ModulesInfoGet = 9 => "modules info",
        PipelineListInfoGet = 10 => "pipeline list info",
        PipelinePropsGet = 11 => "pipeline props",
        SchedulersInfoGet = 12 => "schedulers info",
        GatewaysInfoGet = 13 => "gateways info",
        MemoryStateInfoGet = 14 => "memory state info",
        PowerStateInfoGet = 15 => "power state info",
        LibrariesInfoGet = 16 => "libraries info",
        PerfMeasurementsState = 17 => "perf measurements state",
        GlobalPerfData = 18 => "global perf data",
    }
}

crate::firmware_enum! {
    /// Parameters every module instance understands
    pub enum BaseModuleParam {
        ModInstEnable = 0xFD => "module instance enable",
        ModInstProps = 0xFE => "module instance props",
    }
}

/// A module parameter id.
///
/// Plain ids name a parameter; extended ids pack an 8-bit parameter type and
/// a 24-bit sub id, e.g. "props of pipeline N".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ParameterId(pub u32);

impl ParameterId {
    const TYPE_BITS: u32 = 8;
    const SUB_ID_BITS: u32 = 24;

    /// Pack `type_tag` and `sub_id` into one id
    pub fn extended(type_tag: u32, sub_id: u32) -> Result<Self> {
        if type_tag >= 1 << Self::TYPE_BITS {
            return Err(AgentError::InvalidArgument(format!(
                "Extended parameter type too large: {} max is: {}",
                type_tag,
                (1u32 << Self::TYPE_BITS) - 1
            )));
        }
        if sub_id >= 1 << Self::SUB_ID_BITS {
            return Err(AgentError::InvalidArgument(format!(
                "Extended parameter sub id too large: {} max is: {}",
                sub_id,
                (1u32 << Self::SUB_ID_BITS) - 1
            )));
        }
        Ok(Self(type_tag | (sub_id << Self::TYPE_BITS)))
    }

    #[inline]
    pub fn type_tag(self) -> u32 {
        self.0 & ((1 << Self::TYPE_BITS) - 1)
    }

    #[inline]
    pub fn sub_id(self) -> u32 {
        self.0 >> Self::TYPE_BITS
    }
}

impl From<BaseFwParam> for ParameterId {
    fn from(param: BaseFwParam) -> Self {
        Self(param.to_raw())
    }
}

impl From<BaseModuleParam> for ParameterId {
    fn from(param: BaseModuleParam) -> Self {
        Self(param.to_raw())
    }
}

impl fmt::Debug for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParameterId({:#x})", self.0)
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use proptest::prelude::*;

    #[test]
    fn test_compound_id_wire_order() {
        let id = CompoundModuleId::new(0x1234, 0x0005);
        assert_eq!(encode(&id), vec![0x05, 0x00, 0x34, 0x12]);
        assert_eq!(decode::<CompoundModuleId>(&[0x05, 0x00, 0x34, 0x12]).unwrap(), id);
    }

    #[test]
    fn test_compound_id_ordering() {
        let mut ids = vec![
            CompoundModuleId::new(2, 0),
            CompoundModuleId::new(1, 9),
            CompoundModuleId::new(1, 2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                CompoundModuleId::new(1, 2),
                CompoundModuleId::new(1, 9),
                CompoundModuleId::new(2, 0),
            ]
        );
        assert_eq!(CompoundModuleId::new(1, 9).to_string(), "(1,9)");
    }

    #[test]
    fn test_connector_node_id_fields() {
        let id = ConnectorNodeId::new(GatewayType::DmicLinkInput, 3);
        assert_eq!(id.0, (11 << 8) | 3);
        assert_eq!(id.gateway_type(), GatewayType::DmicLinkInput);
        assert_eq!(id.v_index(), 3);
        assert!(id.is_valid());
        assert_eq!(id.to_string(), "dmic-link-in-gateway#3");

        assert!(!ConnectorNodeId::default().is_valid());
    }

    #[test]
    fn test_extended_parameter_id() {
        let id = ParameterId::extended(7, 0x00AB_CD).unwrap();
        assert_eq!(id.0, 0x00AB_CD07);
        assert_eq!(id.type_tag(), 7);
        assert_eq!(id.sub_id(), 0x00AB_CD);
    }

    #[test]
    fn test_extended_parameter_id_out_of_range() {
        assert!(matches!(
            ParameterId::extended(0x100, 0),
            Err(AgentError::InvalidArgument(_))
        ));
        assert!(matches!(
            ParameterId::extended(0, 1 << 24),
            Err(AgentError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_base_params_convert() {
        assert_eq!(ParameterId::from(BaseFwParam::PipelinePropsGet).0, 11);
        assert_eq!(ParameterId::from(BaseModuleParam::ModInstProps).0, 0xFE);
    }

    proptest! {
        #[test]
        fn test_extended_id_round_trip(type_tag in 0u32..256, sub_id in 0u32..(1 << 24)) {
            let id = ParameterId::extended(type_tag, sub_id).unwrap();
            prop_assert_eq!(id.type_tag(), type_tag);
            prop_assert_eq!(id.sub_id(), sub_id);
        }

        #[test]
        fn test_compound_id_order_matches_int(a in any::<(u16, u16)>(), b in any::<(u16, u16)>()) {
            let left = CompoundModuleId::new(a.0, a.1);
            let right = CompoundModuleId::new(b.0, b.1);
            prop_assert_eq!(left.cmp(&right), left.to_int().cmp(&right.to_int()));
        }
    }
}
