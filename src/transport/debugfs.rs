//! debugfs transport
//!
//! The Linux audio driver exposes module parameter accesses through a single
//! debugfs entry: the agent writes a request message, then reads the reply
//! back from the same file.
//!
//! # Message layout
//!
//! Every request starts with a `u32` total size, then a two-word header:
//!
//! ```text
//! primary:  module_id:16 | instance_id:8 | type:5 | reserved:3
//! extended: data_size:20 | large_param_id:8 | reserved:4
//! ```
//!
//! Accesses that the driver cannot route directly are *tunneled*: the header
//! names the vendor config parameter (`0xFF`) and is followed by a second
//! `{param_id, param_size}` header naming the real parameter.

use super::power::{CorePower, DEFAULT_CORE_ID};
use super::{Transport, TransportStats};
use crate::codec::{ByteStreamReader, ByteStreamWriter, FirmwareEnum, StreamResult, Streamable};
use crate::error::{AgentError, Result};
use crate::firmware::{BaseModuleParam, ParameterId, LOADABLE_MODULE_ID, MAX_PARAMETER_PAYLOAD_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

pub const SET_GET_CTRL_PATH: &str = "/sys/kernel/debug/snd_soc_skl/modules/set_get_ctrl";
pub const CORE_POWER_PATH: &str = "/sys/kernel/debug/snd_soc_skl/core_power";

/// Large parameter id announcing a tunneled access
pub const VENDOR_CONFIG_PARAM: u32 = 0xFF;

/// Whether an access must be wrapped in a vendor config message.
///
/// Only instance props of built-in modules are reachable directly.
#[allow(clippy::nonminimal_bool)]
pub fn requires_tunneled_access(module_id: u16, param_id: u32) -> bool {
    let props = BaseModuleParam::ModInstProps.to_raw();
    param_id != props || (module_id >= LOADABLE_MODULE_ID && param_id != props)
}

/// Byte-level access to driver control entries
#[cfg_attr(test, mockall::automock)]
pub trait CommandDevice: Send + Sync {
    /// Write `request` to the entry at `path`, then read back at most
    /// `reply_capacity` bytes
    fn command_read(&self, path: &str, request: &[u8], reply_capacity: usize) -> Result<Vec<u8>>;

    /// Write `request` to the entry at `path`
    fn command_write(&self, path: &str, request: &[u8]) -> Result<()>;
}

/// [`CommandDevice`] over real files.
///
/// Accesses are serialized: the driver rejects parallel operations on one
/// entry.
#[derive(Debug, Default)]
pub struct FileCommandDevice {
    lock: Mutex<()>,
}

impl FileCommandDevice {
    fn open(path: &str) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                AgentError::Transport(format!("error while opening debugfs {} file: {}", path, e))
            })
    }

    fn write_request(file: &mut File, path: &str, request: &[u8]) -> Result<()> {
        file.write_all(request).map_err(|e| {
            AgentError::Transport(format!(
                "Failed to write command in file: {}, DebugFs handler returns an exception: {}",
                path, e
            ))
        })
    }
}

impl CommandDevice for FileCommandDevice {
    fn command_read(&self, path: &str, request: &[u8], reply_capacity: usize) -> Result<Vec<u8>> {
        let _lock = self
            .lock
            .lock()
            .map_err(|_| AgentError::Transport("debugfs device lock poisoned".to_string()))?;
        let mut file = Self::open(path)?;
        Self::write_request(&mut file, path, request)?;

        // A short reply is fine: requests are sized for the worst case
        let mut reply = Vec::with_capacity(reply_capacity.min(MAX_PARAMETER_PAYLOAD_SIZE));
        file.seek(SeekFrom::Start(0))
            .and_then(|_| Read::by_ref(&mut file).take(reply_capacity as u64).read_to_end(&mut reply))
            .map_err(|e| {
                AgentError::Transport(format!(
                    "Failed to read command answer from file: {}, DebugFs handler returns an exception: {}",
                    path, e
                ))
            })?;
        Ok(reply)
    }

    fn command_write(&self, path: &str, request: &[u8]) -> Result<()> {
        let _lock = self
            .lock
            .lock()
            .map_err(|_| AgentError::Transport("debugfs device lock poisoned".to_string()))?;
        let mut file = Self::open(path)?;
        Self::write_request(&mut file, path, request)
    }
}

const INSTANCE_ID_MASK: u32 = 0xFF;
const DATA_SIZE_MASK: u32 = 0xF_FFFF;
const PARAM_ID_DATA_MASK: u32 = 0x3FFF_FFFF;

fn primary_word(command: u32, module_id: u16, instance_id: u16) -> u32 {
    module_id as u32 | ((instance_id as u32 & INSTANCE_ID_MASK) << 16) | ((command & 0x1F) << 24)
}

/// Two-word header of a large config access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub primary: u32,
    pub extended: u32,
}

impl MessageHeader {
    pub fn new(
        command: u32,
        module_id: u16,
        instance_id: u16,
        large_param_id: u32,
        parameter_size: usize,
    ) -> Self {
        let data_size = parameter_size.min(MAX_PARAMETER_PAYLOAD_SIZE) as u32;
        Self {
            primary: primary_word(command, module_id, instance_id),
            extended: (data_size & DATA_SIZE_MASK) | ((large_param_id & 0xFF) << 20),
        }
    }

    pub fn data_size(&self) -> usize {
        (self.extended & DATA_SIZE_MASK) as usize
    }

    pub fn large_param_id(&self) -> u32 {
        (self.extended >> 20) & 0xFF
    }
}

impl Streamable for MessageHeader {
    const WIRE_SIZE: Option<usize> = Some(8);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            primary: reader.read()?,
            extended: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.primary);
        writer.write(&self.extended);
    }
}

const TUNNELED_HEADER_SIZE: usize = 8;

/// Second header of a tunneled access, naming the real parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TunneledHeader {
    pub param_id: u32,
    pub param_size: u32,
}

impl Streamable for TunneledHeader {
    const WIRE_SIZE: Option<usize> = Some(TUNNELED_HEADER_SIZE);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            param_id: reader.read()?,
            param_size: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.param_id);
        writer.write(&self.param_size);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LargeConfigCmd {
    Get = 3,
    Set = 4,
}

/// A large parameter read or write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeConfigAccess<'a> {
    header: MessageHeader,
    tunneled: Option<TunneledHeader>,
    payload: &'a [u8],
}

impl<'a> LargeConfigAccess<'a> {
    /// `parameter_size` is the expected reply size for a get, the payload
    /// size for a set
    pub fn new(
        command: LargeConfigCmd,
        module_id: u16,
        instance_id: u16,
        param_id: u32,
        parameter_size: usize,
        payload: &'a [u8],
    ) -> Self {
        let command = command as u32;
        if requires_tunneled_access(module_id, param_id) {
            let tunneled_size = parameter_size + TUNNELED_HEADER_SIZE;
            Self {
                header: MessageHeader::new(
                    command,
                    module_id,
                    instance_id,
                    VENDOR_CONFIG_PARAM,
                    tunneled_size,
                ),
                tunneled: Some(TunneledHeader {
                    param_id,
                    param_size: tunneled_size.min(MAX_PARAMETER_PAYLOAD_SIZE) as u32,
                }),
                payload,
            }
        } else {
            Self {
                header: MessageHeader::new(command, module_id, instance_id, param_id, parameter_size),
                tunneled: None,
                payload,
            }
        }
    }

    pub fn header(&self) -> MessageHeader {
        self.header
    }

    pub fn is_tunneled(&self) -> bool {
        self.tunneled.is_some()
    }

    fn header_len(&self) -> usize {
        match self.tunneled {
            Some(_) => 8 + TUNNELED_HEADER_SIZE,
            None => 8,
        }
    }

    /// Request bytes: total size, header(s), then the raw payload
    pub fn encode(&self) -> Vec<u8> {
        let size = (self.header_len() + self.payload.len()).min(MAX_PARAMETER_PAYLOAD_SIZE) as u32;
        let mut writer = ByteStreamWriter::new();
        writer.write(&size);
        writer.write(&self.header);
        if let Some(tunneled) = &self.tunneled {
            writer.write(tunneled);
        }
        writer.write_raw(self.payload);
        writer.into_inner()
    }

    /// Extract the parameter payload from a driver reply.
    ///
    /// The driver echoes the tunneled header, never the message header. The
    /// payload is clamped to what the driver actually returned.
    pub fn reply_payload<'r>(&self, reply: &'r [u8]) -> StreamResult<&'r [u8]> {
        let mut reader = ByteStreamReader::new(reply);
        let expected = match self.tunneled {
            Some(_) => reader.read::<TunneledHeader>()?.param_size as usize,
            None => self.header.data_size(),
        };
        let payload = reader.remaining_bytes();
        Ok(&payload[..expected.min(payload.len())])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleConfigCmd {
    Set = 1,
    Get = 2,
}

/// Short module config message, used to enable module instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleConfigAccess {
    primary: u32,
    extended: u32,
}

impl ModuleConfigAccess {
    pub fn new(command: ModuleConfigCmd, module_id: u16, instance_id: u16, param_id_data: u32) -> Self {
        Self {
            primary: primary_word(command as u32, module_id, instance_id),
            extended: param_id_data & PARAM_ID_DATA_MASK,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ByteStreamWriter::new();
        writer.write(&8u32);
        writer.write(&self.primary);
        writer.write(&self.extended);
        writer.into_inner()
    }
}

/// [`Transport`] over the driver's debugfs entries
pub struct DebugFsTransport<D: CommandDevice> {
    device: Arc<D>,
    set_get_ctrl_path: String,
    power: CorePower<D>,
    stats: Mutex<TransportStats>,
}

impl<D: CommandDevice> DebugFsTransport<D> {
    /// Transport on the standard debugfs paths, voting for core 0
    pub fn new(device: D) -> Self {
        Self::with_paths(device, SET_GET_CTRL_PATH, CORE_POWER_PATH, DEFAULT_CORE_ID)
    }

    pub fn with_paths(
        device: D,
        set_get_ctrl_path: impl Into<String>,
        core_power_path: impl Into<String>,
        core_id: u32,
    ) -> Self {
        let device = Arc::new(device);
        Self {
            power: CorePower::new(Arc::clone(&device), core_power_path, core_id),
            device,
            set_get_ctrl_path: set_get_ctrl_path.into(),
            stats: Mutex::new(TransportStats::default()),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn update_stats(&self, update: impl FnOnce(&mut TransportStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }

    fn device_error(&self, operation: &str, error: AgentError) -> AgentError {
        self.update_stats(TransportStats::record_failure);
        AgentError::Transport(format!(
            "Get module parameter failed to {} command debugfs in file: {}, Device returns an exception: {}",
            operation, self.set_get_ctrl_path, error
        ))
    }
}

impl<D: CommandDevice> Transport for DebugFsTransport<D> {
    fn query(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        max_reply_size: usize,
    ) -> Result<Vec<u8>> {
        let _power = self.power.hold()?;
        let access = LargeConfigAccess::new(
            LargeConfigCmd::Get,
            module_id,
            instance_id,
            param.0,
            max_reply_size,
            &[],
        );
        tracing::trace!(
            module_id,
            instance_id,
            param = param.0,
            tunneled = access.is_tunneled(),
            "debugfs get"
        );

        let reply = self
            .device
            .command_read(&self.set_get_ctrl_path, &access.encode(), MAX_PARAMETER_PAYLOAD_SIZE)
            .map_err(|e| self.device_error("read", e))?;
        let payload = match access.reply_payload(&reply) {
            Ok(payload) => payload.to_vec(),
            Err(e) => {
                self.update_stats(TransportStats::record_failure);
                return Err(e.into());
            }
        };

        self.update_stats(|stats| stats.record_query(payload.len()));
        Ok(payload)
    }

    fn configure(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        payload: &[u8],
    ) -> Result<()> {
        let _power = self.power.hold()?;
        let request = if param.0 == BaseModuleParam::ModInstEnable.to_raw() {
            ModuleConfigAccess::new(ModuleConfigCmd::Set, module_id, instance_id, param.0).encode()
        } else {
            LargeConfigAccess::new(
                LargeConfigCmd::Set,
                module_id,
                instance_id,
                param.0,
                payload.len(),
                payload,
            )
            .encode()
        };
        tracing::trace!(module_id, instance_id, param = param.0, "debugfs set");

        self.device
            .command_write(&self.set_get_ctrl_path, &request)
            .map_err(|e| self.device_error("write", e))?;

        self.update_stats(TransportStats::record_configure);
        Ok(())
    }

    fn stats(&self) -> TransportStats {
        self.stats.lock().map(|stats| stats.clone()).unwrap_or_default()
    }
}
