//! Audio data format carried by every module pin.

use crate::codec::{ByteStreamReader, ByteStreamWriter, FirmwareEnum, StreamResult, Streamable};
use serde::Serialize;
use std::fmt;

crate::firmware_enum! {
    pub enum ChannelConfig {
        Mono = 0 => "mono",
        Stereo = 1 => "stereo",
        TwoPointOne = 2 => "2.1",
        ThreePointZero = 3 => "3.0",
        ThreePointOne = 4 => "3.1",
        Quatro = 5 => "quatro",
        FourPointZero = 6 => "4.0",
        FivePointZero = 7 => "5.0",
        FivePointOne = 8 => "5.1",
        DualMono = 9 => "dual mono",
        I2sDualStereo0 = 10 => "i2s dual stereo 0",
        I2sDualStereo1 = 11 => "i2s dual stereo 1",
        SevenPointOne = 12 => "7.1",
    }
}

crate::firmware_enum! {
    pub enum InterleavingStyle {
        Samples = 0 => "sample",
        Blocks = 1 => "block",
    }
}

crate::firmware_enum! {
    /// Sample encoding; a single byte on the wire
    pub enum SampleType {
        MsbInteger = 0 => "msb integer",
        LsbInteger = 1 => "lsb integer",
        SignedInteger = 2 => "signed integer",
        UnsignedInteger = 3 => "unsigned integer",
        Float = 4 => "float",
    }
}

/// 24-byte audio format descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioDataFormatIpc {
    pub sampling_frequency: u32,
    pub bit_depth: u32,
    pub channel_map: u32,
    pub channel_config: ChannelConfig,
    pub interleaving_style: InterleavingStyle,
    pub number_of_channels: u8,
    pub valid_bit_depth: u8,
    pub sample_type: SampleType,
    pub reserved: u8,
}

impl AudioDataFormatIpc {
    /// Bytes of one sample across every channel, when the container depth
    /// is a whole number of bytes
    pub fn sample_bytes(&self) -> Option<usize> {
        if self.valid_bit_depth % 8 != 0 {
            return None;
        }
        Some(self.bit_depth as usize / 8 * self.number_of_channels as usize)
    }
}

impl Default for AudioDataFormatIpc {
    /// 48 kHz, 16-bit stereo PCM
    fn default() -> Self {
        Self {
            sampling_frequency: 48_000,
            bit_depth: 16,
            channel_map: 0xFFFF_FF10,
            channel_config: ChannelConfig::Stereo,
            interleaving_style: InterleavingStyle::Samples,
            number_of_channels: 2,
            valid_bit_depth: 16,
            sample_type: SampleType::SignedInteger,
            reserved: 0,
        }
    }
}

impl Streamable for AudioDataFormatIpc {
    const WIRE_SIZE: Option<usize> = Some(24);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            sampling_frequency: reader.read()?,
            bit_depth: reader.read()?,
            channel_map: reader.read()?,
            channel_config: reader.read()?,
            interleaving_style: reader.read()?,
            number_of_channels: reader.read()?,
            valid_bit_depth: reader.read()?,
            sample_type: SampleType::from_raw(reader.read::<u8>()? as u32),
            reserved: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.sampling_frequency);
        writer.write(&self.bit_depth);
        writer.write(&self.channel_map);
        writer.write(&self.channel_config);
        writer.write(&self.interleaving_style);
        writer.write(&self.number_of_channels);
        writer.write(&self.valid_bit_depth);
        writer.write(&(self.sample_type.to_raw() as u8));
        writer.write(&self.reserved);
    }
}

impl fmt::Display for AudioDataFormatIpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config={}/bit_depth={}/sample_type={}/interleaving={}/channel_count={}/valid_bit_depth={}/sampling_frequency={}",
            self.channel_config,
            self.bit_depth,
            self.sample_type,
            self.interleaving_style,
            self.number_of_channels,
            self.valid_bit_depth,
            self.sampling_frequency
        )
    }
}
