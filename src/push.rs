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

//! Push-id namespacing.
//!
//! On the wire push ids are plain varints that share numeric space with
//! stream ids. Inside the process the high bit is set so the two id
//! spaces cannot collide.

use crate::Error;
use crate::Result;

/// Bit that moves a wire push id into the internal namespace.
pub const PUSH_ID_NAMESPACE: u64 = 1 << 63;

/// A server push identifier, held in the internal namespace.
///
/// Conversion happens at the codec boundary: parsers return `PushId`
/// values with the namespace bit set, serializers clear it again before
/// the id reaches the wire.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PushId(u64);

impl PushId {
    /// Converts a wire-format push id into the internal namespace.
    ///
    /// A wire value with the namespace bit already set is ill-formed.
    pub fn from_external(raw: u64) -> Result<PushId> {
        if !is_external_push_id(raw) {
            return Err(Error::FrameError);
        }

        Ok(PushId(raw | PUSH_ID_NAMESPACE))
    }

    /// Wraps an id that is already in the internal namespace.
    pub const fn from_internal(raw: u64) -> PushId {
        PushId(raw | PUSH_ID_NAMESPACE)
    }

    /// The wire-format value, with the namespace bit cleared.
    pub const fn external(self) -> u64 {
        self.0 & !PUSH_ID_NAMESPACE
    }

    /// The in-process value, with the namespace bit set.
    pub const fn internal(self) -> u64 {
        self.0
    }
}

impl std::fmt::Debug for PushId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PushId({})", self.external())
    }
}

/// Returns whether `id` carries the internal-namespace bit.
pub const fn is_internal_push_id(id: u64) -> bool {
    id >> 63 == 1
}

/// Returns whether `id` is in the external (wire) namespace.
pub const fn is_external_push_id(id: u64) -> bool {
    id >> 63 == 0
}
