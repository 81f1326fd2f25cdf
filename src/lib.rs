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

//! HTTP/3 frame-layer parser and serializer.
//!
//! This crate translates a byte-oriented QUIC stream into a typed sequence
//! of HTTP/3 control and data frames, and back. It sits between a QUIC
//! transport (which hands it byte ranges through an [`octets::Octets`]
//! cursor) and an HTTP/3 session layer (which receives typed frames and
//! decides what they mean for the connection).
//!
//! The codec is a pure function library: it holds no state between calls,
//! never blocks, and never reorders. Parsers consume from a caller-owned
//! cursor; serializers append to a caller-owned [`octets::OctetsMut`]
//! output region.
//!
//! ## Parsing
//!
//! A frame is parsed in two steps: the common two-varint header first, then
//! the payload once at least `length` bytes are available:
//!
//! ```
//! use hq_codec::frame::{self, Frame};
//!
//! let wire = [0x00, 0x04, 0xde, 0xad, 0xbe, 0xef];
//!
//! let mut b = octets::Octets::with_slice(&wire);
//! let header = frame::parse_frame_header(&mut b)?;
//! assert_eq!(header.length, 4);
//!
//! match Frame::parse(&mut b, &header)? {
//!     Frame::Data { payload } => assert_eq!(payload, [0xde, 0xad, 0xbe, 0xef]),
//!     _ => unreachable!(),
//! }
//! # Ok::<(), hq_codec::Error>(())
//! ```
//!
//! DATA, HEADERS and PUSH_PROMISE payloads are returned as views into the
//! input buffer, so body bytes and QPACK header blocks flow through without
//! being copied.
//!
//! ## Serializing
//!
//! Each `write_*` function in [`frame`] emits a complete frame (header and
//! payload) and returns the number of bytes written:
//!
//! ```
//! use hq_codec::frame;
//!
//! let mut out = [0; 16];
//!
//! let mut b = octets::OctetsMut::with_slice(&mut out);
//! let written = frame::write_goaway(&mut b, 0)?;
//!
//! assert_eq!(out[..written], [0x07, 0x01, 0x00]);
//! # Ok::<(), hq_codec::Error>(())
//! ```
//!
//! Unknown and reserved frame types received from a peer (including GREASE
//! identifiers, see [`grease`]) are skipped without error, as the protocol
//! requires.

#[macro_use]
extern crate log;

/// A specialized [`Result`] type for frame codec operations.
///
/// [`Result`]: https://doc.rust-lang.org/std/result/enum.Result.html
pub type Result<T> = std::result::Result<T, Error>;

/// A frame codec error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The provided buffer is too short.
    ///
    /// On the parsing side this means a frame header could not be completed
    /// with the bytes available; the caller should retry once more transport
    /// data has arrived. On the serializing side the output region is out of
    /// capacity.
    BufferTooShort,

    /// A caller-supplied value cannot be represented on the wire.
    InternalError,

    /// Frame violated layout or size rules.
    FrameError,

    /// Error in the payload of a SETTINGS frame.
    SettingsError,

    /// Stream ID or Push ID was used incorrectly, such as exceeding an
    /// advertised limit, reducing a limit, or being reused.
    ///
    /// The codec never returns this itself; the value is defined for session
    /// layers that enforce advertised limits.
    IdError,
}

impl Error {
    /// Returns the HTTP/3 application error code that a connection close
    /// should carry for this error.
    pub const fn to_wire(self) -> u64 {
        match self {
            Error::InternalError => 0x102,
            Error::FrameError => 0x106,
            Error::IdError => 0x108,
            Error::SettingsError => 0x109,
            Error::BufferTooShort => 0x999,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::convert::From<octets::BufferTooShortError> for Error {
    fn from(_err: octets::BufferTooShortError) -> Self {
        Error::BufferTooShort
    }
}

pub mod frame;
pub mod grease;
pub mod push;
