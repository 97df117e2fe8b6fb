//! Scan confirm post-filtering.
//!
//! Removes PAN descriptors whose link quality is at or below the acceptance
//! threshold, compacting the result list inside the frame.

use log::debug;

use crate::api::confirms::PanDescriptor;
use crate::constants::*;
use crate::error::MacStatus;
use crate::transport::frame::Message;

const STATUS_OFFSET: usize = 0;
const SCAN_TYPE_OFFSET: usize = 1;
const RESULT_LIST_SIZE_OFFSET: usize = 6;
const RESULT_LIST_OFFSET: usize = 7;

/// Drops weak PAN descriptors from an active or passive scan confirm.
///
/// When filtering empties a list whose status was `SUCCESS` or
/// `LIMIT_REACHED`, the status becomes `NO_BEACON`. Returns the number of
/// descriptors removed.
pub fn filter_scan_confirm(msg: &mut Message, lqi_limit: u8) -> usize {
    if msg.command_id() != MLME_SCAN_CONFIRM || msg.len() < RESULT_LIST_OFFSET {
        return 0;
    }
    let scan_type = msg.byte(SCAN_TYPE_OFFSET);
    if scan_type != ACTIVE_SCAN && scan_type != PASSIVE_SCAN {
        return 0;
    }

    let total = msg.len();
    let declared = msg.byte(RESULT_LIST_SIZE_OFFSET);
    let payload = msg.payload_mut();
    let mut read = RESULT_LIST_OFFSET;
    let mut write = RESULT_LIST_OFFSET;
    let mut kept = 0u8;
    let mut removed = 0usize;

    for _ in 0..declared {
        let Some(len) = PanDescriptor::encoded_len(&payload[read..total]) else {
            break;
        };
        if read + len > total {
            break;
        }
        if payload[read + PanDescriptor::LINK_QUALITY_OFFSET] > lqi_limit {
            payload.copy_within(read..read + len, write);
            write += len;
            kept += 1;
        } else {
            removed += 1;
        }
        read += len;
    }
    if removed == 0 {
        return 0;
    }

    // anything after the parsed descriptors moves up with them
    payload.copy_within(read..total, write);
    let new_len = write + (total - read);
    payload[RESULT_LIST_SIZE_OFFSET] = kept;
    let status = MacStatus(payload[STATUS_OFFSET]);
    if kept == 0 && (status == MacStatus::SUCCESS || status == MacStatus::LIMIT_REACHED) {
        payload[STATUS_OFFSET] = MacStatus::NO_BEACON.0;
    }
    msg.truncate(new_len);
    debug!("Scan confirm: dropped {removed} descriptor(s) at or below LQI {lqi_limit}");
    removed
}
