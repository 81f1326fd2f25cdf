// Copyright (C) 2019, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Frame header and per-frame payload codecs.

use std::collections::VecDeque;

use crate::push::PushId;

use crate::Error;
use crate::Result;

pub const DATA_FRAME_TYPE_ID: u64 = 0x0;
pub const HEADERS_FRAME_TYPE_ID: u64 = 0x1;
pub const PRIORITY_FRAME_TYPE_ID: u64 = 0x2;
pub const CANCEL_PUSH_FRAME_TYPE_ID: u64 = 0x3;
pub const SETTINGS_FRAME_TYPE_ID: u64 = 0x4;
pub const PUSH_PROMISE_FRAME_TYPE_ID: u64 = 0x5;
pub const GOAWAY_FRAME_TYPE_ID: u64 = 0x7;
pub const MAX_PUSH_FRAME_TYPE_ID: u64 = 0xD;

pub const SETTINGS_HEADER_TABLE_SIZE: u64 = 0x1;
pub const SETTINGS_MAX_HEADER_LIST_SIZE: u64 = 0x6;
pub const SETTINGS_QPACK_BLOCKED_STREAMS: u64 = 0x7;
pub const SETTINGS_NUM_PLACEHOLDERS: u64 = 0x9;

/// Frame headers are two varints, between 2 and 16 bytes in total.
pub const MAX_FRAME_HEADER_SIZE: usize = 16;

/// Largest value representable as a variable-length integer.
pub const MAX_VARINT: u64 = (1 << 62) - 1;

/// DATA frame length signalling that a stream carries its body without
/// DATA framing. Sessions that negotiate an unframed body pair this with
/// [`write_unframed_bytes`].
pub const UNFRAMED_DATA_FRAME_LEN: u64 = 0;

// Field positions within the PRIORITY frame's flag byte.
const PRIORITIZED_TYPE_SHIFT: u8 = 6;
const DEPENDENCY_TYPE_SHIFT: u8 = 4;
const PRIORITY_RESERVED_MASK: u8 = 0x0e;
const PRIORITY_EXCLUSIVE_MASK: u8 = 0x01;

// Two-bit element type codes carried in the flag byte.
const PRIORITY_ELEM_REQUEST_STREAM: u8 = 0x0;
const PRIORITY_ELEM_PUSH_STREAM: u8 = 0x1;
const PRIORITY_ELEM_PLACEHOLDER: u8 = 0x2;
const PRIORITY_ELEM_TREE_ROOT: u8 = 0x3;

/// The common frame header: a frame type and the exact payload byte count
/// that follows it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: u64,
    pub length: u64,
}

/// One side of the dependency relation carried by a PRIORITY frame.
///
/// The element id is a stream, push or placeholder id depending on the
/// variant; the tree root carries no id and contributes no bytes on the
/// wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriorityElem {
    RequestStream(u64),
    PushStream(u64),
    Placeholder(u64),
    TreeRoot,
}

impl PriorityElem {
    const fn wire_type(self) -> u8 {
        match self {
            PriorityElem::RequestStream(..) => PRIORITY_ELEM_REQUEST_STREAM,
            PriorityElem::PushStream(..) => PRIORITY_ELEM_PUSH_STREAM,
            PriorityElem::Placeholder(..) => PRIORITY_ELEM_PLACEHOLDER,
            PriorityElem::TreeRoot => PRIORITY_ELEM_TREE_ROOT,
        }
    }

    const fn id(self) -> Option<u64> {
        match self {
            PriorityElem::RequestStream(id) |
            PriorityElem::PushStream(id) |
            PriorityElem::Placeholder(id) => Some(id),

            PriorityElem::TreeRoot => None,
        }
    }
}

/// The priority information carried by a PRIORITY frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorityUpdate {
    pub prioritized: PriorityElem,
    pub dependency: PriorityElem,
    pub weight: u8,
    pub exclusive: bool,
}

/// Identifier for a SETTINGS frame parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingId {
    HeaderTableSize,
    MaxHeaderListSize,
    QpackBlockedStreams,
    NumPlaceholders,

    /// An identifier outside the recognized set. Never produced by the
    /// parser; usable on egress to exercise a peer's tolerance of
    /// reserved identifiers.
    Unknown(u64),
}

impl SettingId {
    pub const fn from_wire(id: u64) -> SettingId {
        match id {
            SETTINGS_HEADER_TABLE_SIZE => SettingId::HeaderTableSize,
            SETTINGS_MAX_HEADER_LIST_SIZE => SettingId::MaxHeaderListSize,
            SETTINGS_QPACK_BLOCKED_STREAMS => SettingId::QpackBlockedStreams,
            SETTINGS_NUM_PLACEHOLDERS => SettingId::NumPlaceholders,

            _ => SettingId::Unknown(id),
        }
    }

    pub const fn to_wire(self) -> u64 {
        match self {
            SettingId::HeaderTableSize => SETTINGS_HEADER_TABLE_SIZE,
            SettingId::MaxHeaderListSize => SETTINGS_MAX_HEADER_LIST_SIZE,
            SettingId::QpackBlockedStreams => SETTINGS_QPACK_BLOCKED_STREAMS,
            SettingId::NumPlaceholders => SETTINGS_NUM_PLACEHOLDERS,

            SettingId::Unknown(id) => id,
        }
    }
}

/// A setting identifier paired with its value, in wire order.
pub type SettingPair = (SettingId, u64);

/// Returns true for frame types whose payload alters QPACK decoder state
/// and therefore may not be reordered past each other.
pub const fn frame_affects_compression(frame_type: u64) -> bool {
    matches!(
        frame_type,
        HEADERS_FRAME_TYPE_ID | PUSH_PROMISE_FRAME_TYPE_ID
    )
}

/// Parses the common frame header.
///
/// Returns [`Error::BufferTooShort`] when the header is not yet complete;
/// the caller should retry from the start of the header once more
/// transport bytes have arrived.
pub fn parse_frame_header(b: &mut octets::Octets) -> Result<FrameHeader> {
    let start = b.off();

    let frame_type = b.get_varint()?;
    let length = b.get_varint()?;

    if b.off() - start > MAX_FRAME_HEADER_SIZE {
        return Err(Error::FrameError);
    }

    Ok(FrameHeader { frame_type, length })
}

/// Writes the common frame header and returns its size.
pub fn write_frame_header(
    b: &mut octets::OctetsMut, frame_type: u64, payload_len: u64,
) -> Result<usize> {
    let before = b.cap();

    b.put_varint(ensure_varint(frame_type)?)?;
    b.put_varint(ensure_varint(payload_len)?)?;

    Ok(before - b.cap())
}

/// Parses a DATA frame payload, returning a view of the body bytes.
pub fn parse_data<'a>(
    b: &mut octets::Octets<'a>, header: &FrameHeader,
) -> Result<&'a [u8]> {
    let payload = payload_region(b, header)?;

    Ok(payload.buf())
}

/// Parses a HEADERS frame payload, returning a view of the QPACK header
/// block.
pub fn parse_headers<'a>(
    b: &mut octets::Octets<'a>, header: &FrameHeader,
) -> Result<&'a [u8]> {
    let payload = payload_region(b, header)?;

    Ok(payload.buf())
}

/// Parses a PRIORITY frame payload.
pub fn parse_priority(
    b: &mut octets::Octets, header: &FrameHeader,
) -> Result<PriorityUpdate> {
    let mut p = payload_region(b, header)?;

    let flags = p.get_u8().map_err(|_| Error::FrameError)?;

    if flags & PRIORITY_RESERVED_MASK != 0 {
        return Err(Error::FrameError);
    }

    let prioritized_type = (flags >> PRIORITIZED_TYPE_SHIFT) & 0x3;
    let dependency_type = (flags >> DEPENDENCY_TYPE_SHIFT) & 0x3;
    let exclusive = flags & PRIORITY_EXCLUSIVE_MASK != 0;

    let prioritized = parse_priority_elem(&mut p, prioritized_type)?;
    let dependency = parse_priority_elem(&mut p, dependency_type)?;

    let weight = p.get_u8().map_err(|_| Error::FrameError)?;

    if p.cap() != 0 {
        return Err(Error::FrameError);
    }

    Ok(PriorityUpdate {
        prioritized,
        dependency,
        weight,
        exclusive,
    })
}

fn parse_priority_elem(
    p: &mut octets::Octets, wire_type: u8,
) -> Result<PriorityElem> {
    let elem = match wire_type {
        PRIORITY_ELEM_TREE_ROOT => PriorityElem::TreeRoot,

        _ => {
            let id = p.get_varint().map_err(|_| Error::FrameError)?;

            match wire_type {
                PRIORITY_ELEM_REQUEST_STREAM =>
                    PriorityElem::RequestStream(id),
                PRIORITY_ELEM_PUSH_STREAM => PriorityElem::PushStream(id),
                PRIORITY_ELEM_PLACEHOLDER => PriorityElem::Placeholder(id),

                _ => unreachable!(),
            }
        },
    };

    Ok(elem)
}

/// Parses a CANCEL_PUSH frame payload, returning the push id to cancel in
/// the internal namespace.
pub fn parse_cancel_push(
    b: &mut octets::Octets, header: &FrameHeader,
) -> Result<PushId> {
    let mut p = payload_region(b, header)?;

    let raw = p.get_varint().map_err(|_| Error::FrameError)?;

    if p.cap() != 0 {
        return Err(Error::FrameError);
    }

    PushId::from_external(raw)
}

/// Parses a SETTINGS frame payload.
///
/// The returned pairs preserve wire order. Identifiers outside the
/// recognized set are consumed and dropped; an identifier that appears
/// twice in one frame is a [`Error::SettingsError`].
pub fn parse_settings(
    b: &mut octets::Octets, header: &FrameHeader,
) -> Result<VecDeque<SettingPair>> {
    let mut p = payload_region(b, header)?;

    let mut settings = VecDeque::new();
    let mut seen = Vec::new();

    while p.cap() > 0 {
        let id = p.get_varint().map_err(|_| Error::FrameError)?;
        let value = p.get_varint().map_err(|_| Error::FrameError)?;

        if seen.contains(&id) {
            return Err(Error::SettingsError);
        }

        seen.push(id);

        match SettingId::from_wire(id) {
            SettingId::Unknown(..) => (),

            known => settings.push_back((known, value)),
        }
    }

    Ok(settings)
}

/// Parses a PUSH_PROMISE frame payload, returning the promised push id in
/// the internal namespace and a view of the QPACK header block.
pub fn parse_push_promise<'a>(
    b: &mut octets::Octets<'a>, header: &FrameHeader,
) -> Result<(PushId, &'a [u8])> {
    let mut p = payload_region(b, header)?;

    let raw = p.get_varint().map_err(|_| Error::FrameError)?;
    let push_id = PushId::from_external(raw)?;

    let header_block =
        p.get_bytes(p.cap()).map_err(|_| Error::FrameError)?.buf();

    Ok((push_id, header_block))
}

/// Parses a GOAWAY frame payload, returning the last accepted stream id.
pub fn parse_goaway(
    b: &mut octets::Octets, header: &FrameHeader,
) -> Result<u64> {
    let mut p = payload_region(b, header)?;

    let stream_id = p.get_varint().map_err(|_| Error::FrameError)?;

    if p.cap() != 0 {
        return Err(Error::FrameError);
    }

    Ok(stream_id)
}

/// Parses a MAX_PUSH_ID frame payload, returning the new maximum push id
/// in the internal namespace.
pub fn parse_max_push_id(
    b: &mut octets::Octets, header: &FrameHeader,
) -> Result<PushId> {
    let mut p = payload_region(b, header)?;

    let raw = p.get_varint().map_err(|_| Error::FrameError)?;

    if p.cap() != 0 {
        return Err(Error::FrameError);
    }

    PushId::from_external(raw)
}

/// Writes an entire DATA frame and returns the number of bytes written.
pub fn write_data(b: &mut octets::OctetsMut, data: &[u8]) -> Result<usize> {
    let before = b.cap();

    write_frame_header(b, DATA_FRAME_TYPE_ID, data.len() as u64)?;
    b.put_bytes(data)?;

    Ok(before - b.cap())
}

/// Appends payload bytes with no frame header, for streams that have
/// negotiated an unframed body.
pub fn write_unframed_bytes(
    b: &mut octets::OctetsMut, data: &[u8],
) -> Result<usize> {
    b.put_bytes(data)?;

    Ok(data.len())
}

/// Writes an entire HEADERS frame and returns the number of bytes written.
pub fn write_headers(
    b: &mut octets::OctetsMut, header_block: &[u8],
) -> Result<usize> {
    let before = b.cap();

    write_frame_header(b, HEADERS_FRAME_TYPE_ID, header_block.len() as u64)?;
    b.put_bytes(header_block)?;

    Ok(before - b.cap())
}

/// Writes an entire PRIORITY frame and returns the number of bytes
/// written.
pub fn write_priority(
    b: &mut octets::OctetsMut, priority: PriorityUpdate,
) -> Result<usize> {
    // Flag byte plus weight byte; element ids only when present.
    let mut payload_len = 2;

    if let Some(id) = priority.prioritized.id() {
        payload_len += octets::varint_len(ensure_varint(id)?);
    }

    if let Some(id) = priority.dependency.id() {
        payload_len += octets::varint_len(ensure_varint(id)?);
    }

    let before = b.cap();

    write_frame_header(b, PRIORITY_FRAME_TYPE_ID, payload_len as u64)?;

    let mut flags = priority.prioritized.wire_type() << PRIORITIZED_TYPE_SHIFT;
    flags |= priority.dependency.wire_type() << DEPENDENCY_TYPE_SHIFT;

    if priority.exclusive {
        flags |= PRIORITY_EXCLUSIVE_MASK;
    }

    b.put_u8(flags)?;

    if let Some(id) = priority.prioritized.id() {
        b.put_varint(id)?;
    }

    if let Some(id) = priority.dependency.id() {
        b.put_varint(id)?;
    }

    b.put_u8(priority.weight)?;

    Ok(before - b.cap())
}

/// Writes an entire CANCEL_PUSH frame and returns the number of bytes
/// written.
pub fn write_cancel_push(
    b: &mut octets::OctetsMut, push_id: PushId,
) -> Result<usize> {
    let id = ensure_varint(push_id.external())?;

    let before = b.cap();

    write_frame_header(
        b,
        CANCEL_PUSH_FRAME_TYPE_ID,
        octets::varint_len(id) as u64,
    )?;
    b.put_varint(id)?;

    Ok(before - b.cap())
}

/// Writes an entire SETTINGS frame and returns the number of bytes
/// written.
pub fn write_settings(
    b: &mut octets::OctetsMut, settings: &VecDeque<SettingPair>,
) -> Result<usize> {
    let mut payload_len = 0;

    for (id, value) in settings {
        payload_len += octets::varint_len(ensure_varint(id.to_wire())?);
        payload_len += octets::varint_len(ensure_varint(*value)?);
    }

    let before = b.cap();

    write_frame_header(b, SETTINGS_FRAME_TYPE_ID, payload_len as u64)?;

    for (id, value) in settings {
        b.put_varint(id.to_wire())?;
        b.put_varint(*value)?;
    }

    Ok(before - b.cap())
}

/// Writes an entire PUSH_PROMISE frame and returns the number of bytes
/// written.
pub fn write_push_promise(
    b: &mut octets::OctetsMut, push_id: PushId, header_block: &[u8],
) -> Result<usize> {
    let id = ensure_varint(push_id.external())?;
    let payload_len = octets::varint_len(id) + header_block.len();

    let before = b.cap();

    write_frame_header(b, PUSH_PROMISE_FRAME_TYPE_ID, payload_len as u64)?;
    b.put_varint(id)?;
    b.put_bytes(header_block)?;

    Ok(before - b.cap())
}

/// Writes an entire GOAWAY frame and returns the number of bytes written.
pub fn write_goaway(
    b: &mut octets::OctetsMut, last_stream_id: u64,
) -> Result<usize> {
    let id = ensure_varint(last_stream_id)?;

    let before = b.cap();

    write_frame_header(b, GOAWAY_FRAME_TYPE_ID, octets::varint_len(id) as u64)?;
    b.put_varint(id)?;

    Ok(before - b.cap())
}

/// Writes an entire MAX_PUSH_ID frame and returns the number of bytes
/// written.
pub fn write_max_push_id(
    b: &mut octets::OctetsMut, push_id: PushId,
) -> Result<usize> {
    let id = ensure_varint(push_id.external())?;

    let before = b.cap();

    write_frame_header(
        b,
        MAX_PUSH_FRAME_TYPE_ID,
        octets::varint_len(id) as u64,
    )?;
    b.put_varint(id)?;

    Ok(before - b.cap())
}

/// A parsed HTTP/3 frame.
///
/// DATA, HEADERS and PUSH_PROMISE payloads borrow from the buffer the
/// cursor was created over rather than copying.
#[derive(Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    Data {
        payload: &'a [u8],
    },

    Headers {
        header_block: &'a [u8],
    },

    Priority {
        priority: PriorityUpdate,
    },

    CancelPush {
        push_id: PushId,
    },

    Settings {
        settings: VecDeque<SettingPair>,
    },

    PushPromise {
        push_id: PushId,
        header_block: &'a [u8],
    },

    Goaway {
        stream_id: u64,
    },

    MaxPushId {
        push_id: PushId,
    },

    Unknown {
        raw_type: u64,
        payload_length: u64,
    },
}

impl<'a> Frame<'a> {
    /// Parses a single frame payload according to `header`, consuming
    /// exactly `header.length` bytes from the cursor.
    ///
    /// Unknown frame types, including reserved and GREASE identifiers,
    /// are skipped without error.
    pub fn parse(
        b: &mut octets::Octets<'a>, header: &FrameHeader,
    ) -> Result<Frame<'a>> {
        let frame = match header.frame_type {
            DATA_FRAME_TYPE_ID => Frame::Data {
                payload: parse_data(b, header)?,
            },

            HEADERS_FRAME_TYPE_ID => Frame::Headers {
                header_block: parse_headers(b, header)?,
            },

            PRIORITY_FRAME_TYPE_ID => Frame::Priority {
                priority: parse_priority(b, header)?,
            },

            CANCEL_PUSH_FRAME_TYPE_ID => Frame::CancelPush {
                push_id: parse_cancel_push(b, header)?,
            },

            SETTINGS_FRAME_TYPE_ID => Frame::Settings {
                settings: parse_settings(b, header)?,
            },

            PUSH_PROMISE_FRAME_TYPE_ID => {
                let (push_id, header_block) = parse_push_promise(b, header)?;

                Frame::PushPromise {
                    push_id,
                    header_block,
                }
            },

            GOAWAY_FRAME_TYPE_ID => Frame::Goaway {
                stream_id: parse_goaway(b, header)?,
            },

            MAX_PUSH_FRAME_TYPE_ID => Frame::MaxPushId {
                push_id: parse_max_push_id(b, header)?,
            },

            _ => {
                b.skip(header.length as usize)
                    .map_err(|_| Error::FrameError)?;

                Frame::Unknown {
                    raw_type: header.frame_type,
                    payload_length: header.length,
                }
            },
        };

        trace!("rx frm {:?}", frame);

        Ok(frame)
    }

    /// Writes the frame, including its header, and returns the number of
    /// bytes written.
    pub fn to_bytes(&self, b: &mut octets::OctetsMut) -> Result<usize> {
        match self {
            Frame::Data { payload } => write_data(b, payload),

            Frame::Headers { header_block } => write_headers(b, header_block),

            Frame::Priority { priority } => write_priority(b, *priority),

            Frame::CancelPush { push_id } => write_cancel_push(b, *push_id),

            Frame::Settings { settings } => write_settings(b, settings),

            Frame::PushPromise {
                push_id,
                header_block,
            } => write_push_promise(b, *push_id, header_block),

            Frame::Goaway { stream_id } => write_goaway(b, *stream_id),

            Frame::MaxPushId { push_id } => write_max_push_id(b, *push_id),

            Frame::Unknown { .. } => unreachable!(),
        }
    }
}

impl std::fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Frame::Data { payload } => {
                write!(f, "DATA len={}", payload.len())?;
            },

            Frame::Headers { header_block } => {
                write!(f, "HEADERS len={}", header_block.len())?;
            },

            Frame::Priority { priority } => {
                write!(
                    f,
                    "PRIORITY prioritized={:?} dependency={:?} weight={} exclusive={}",
                    priority.prioritized,
                    priority.dependency,
                    priority.weight,
                    priority.exclusive
                )?;
            },

            Frame::CancelPush { push_id } => {
                write!(f, "CANCEL_PUSH push_id={}", push_id.external())?;
            },

            Frame::Settings { settings } => {
                write!(f, "SETTINGS len={}", settings.len())?;
            },

            Frame::PushPromise {
                push_id,
                header_block,
            } => {
                write!(
                    f,
                    "PUSH_PROMISE push_id={} len={}",
                    push_id.external(),
                    header_block.len()
                )?;
            },

            Frame::Goaway { stream_id } => {
                write!(f, "GOAWAY stream_id={}", stream_id)?;
            },

            Frame::MaxPushId { push_id } => {
                write!(f, "MAX_PUSH_ID push_id={}", push_id.external())?;
            },

            Frame::Unknown { raw_type, .. } => {
                write!(f, "UNKNOWN raw_type={}", raw_type)?;
            },
        }

        Ok(())
    }
}

// Carves the frame's payload out of the cursor, so parsers cannot read
// past `header.length` and the remainder stays with the caller.
fn payload_region<'a>(
    b: &mut octets::Octets<'a>, header: &FrameHeader,
) -> Result<octets::Octets<'a>> {
    b.get_bytes(header.length as usize)
        .map_err(|_| Error::FrameError)
}

fn ensure_varint(v: u64) -> Result<u64> {
    if v > MAX_VARINT {
        return Err(Error::InternalError);
    }

    Ok(v)
}
