//! Accessors for variable-layout structures: single PAN descriptors inside
//! a scan confirm and the lists packed behind a security key-table entry.

use nom::bytes::complete::take;
use nom::multi::count;
use nom::number::complete::be_u8;
use nom::IResult;

use crate::api::confirms::{parse_pan_descriptor, PanDescriptor, ScanConfirm};
use crate::constants::*;
use crate::error::Ca821xError;

impl ScanConfirm {
    /// PAN descriptor at `index` without decoding the ones after it.
    ///
    /// `None` for an ED or orphan scan, or when `index` is past the list.
    pub fn pan_descriptor(&self, index: u8) -> Option<PanDescriptor> {
        if self.scan_type != ACTIVE_SCAN && self.scan_type != PASSIVE_SCAN {
            return None;
        }
        if index >= self.result_list_size {
            return None;
        }
        let mut input = self.result_list.as_slice();
        for _ in 0..index {
            let len = PanDescriptor::encoded_len(input)?;
            input = input.get(len..)?;
        }
        parse_pan_descriptor(input).ok().map(|(_, descriptor)| descriptor)
    }
}

/// Key-id lookup descriptor: lookup data and its size code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyIdLookupDesc {
    pub lookup_data: [u8; 9],
    pub lookup_data_size_code: u8,
}

/// Key-device descriptor flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDeviceDesc(pub u8);

impl KeyDeviceDesc {
    pub fn device_handle(self) -> u8 {
        self.0 & 0x3F
    }

    pub fn unique_device(self) -> bool {
        self.0 & 0x40 != 0
    }

    pub fn blacklisted(self) -> bool {
        self.0 & 0x80 != 0
    }
}

/// Key-usage descriptor flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsageDesc(pub u8);

impl KeyUsageDesc {
    pub fn frame_type(self) -> u8 {
        self.0 & 0x03
    }

    pub fn command_frame_identifier(self) -> u8 {
        self.0 >> 4
    }
}

/// One entry of the MAC key table as read back with an MLME-GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTableEntry {
    pub key: [u8; 16],
    pub lookup_list: Vec<KeyIdLookupDesc>,
    pub device_list: Vec<KeyDeviceDesc>,
    pub usage_list: Vec<KeyUsageDesc>,
}

fn parse_lookup_desc(input: &[u8]) -> IResult<&[u8], KeyIdLookupDesc> {
    let (input, data) = take(9usize)(input)?;
    let (input, lookup_data_size_code) = be_u8(input)?;
    let mut lookup_data = [0u8; 9];
    lookup_data.copy_from_slice(data);
    Ok((input, KeyIdLookupDesc { lookup_data, lookup_data_size_code }))
}

/// Three list counts, the key, then the lists in count order.
pub fn parse_key_table_entry(input: &[u8]) -> IResult<&[u8], KeyTableEntry> {
    let (input, lookup_count) = be_u8(input)?;
    let (input, device_count) = be_u8(input)?;
    let (input, usage_count) = be_u8(input)?;
    let (input, key_bytes) = take(16usize)(input)?;
    let (input, lookup_list) = count(parse_lookup_desc, usize::from(lookup_count))(input)?;
    let (input, devices) = take(device_count)(input)?;
    let (input, usages) = take(usage_count)(input)?;

    let mut key = [0u8; 16];
    key.copy_from_slice(key_bytes);
    Ok((
        input,
        KeyTableEntry {
            key,
            lookup_list,
            device_list: devices.iter().copied().map(KeyDeviceDesc).collect(),
            usage_list: usages.iter().copied().map(KeyUsageDesc).collect(),
        },
    ))
}

impl KeyTableEntry {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Ca821xError> {
        parse_key_table_entry(bytes)
            .map(|(_, entry)| entry)
            .map_err(|_| Ca821xError::Invalid)
    }
}
