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

//! Reserved GREASE identifiers.
//!
//! HTTP/3 reserves identifiers of the form `0x1f * n + 0x21` for senders
//! to inject and receivers to ignore, so that peers which mishandle
//! unknown extensions are caught early rather than in the field.

const GREASE_ID_FACTOR: u64 = 0x1f;
const GREASE_ID_OFFSET: u64 = 0x21;

/// Largest index whose mapped GREASE identifier still fits in a
/// variable-length integer (`0x1f * n + 0x21 <= 2^62 - 1`).
pub const MAX_GREASE_ID_INDEX: u64 = 0x210842108421083;

/// Maps an index into the reserved GREASE identifier space.
///
/// Returns `None` when the mapped value would not fit in a varint.
pub const fn grease_id(n: u64) -> Option<u64> {
    if n > MAX_GREASE_ID_INDEX {
        return None;
    }

    Some(GREASE_ID_FACTOR * n + GREASE_ID_OFFSET)
}

/// Returns whether `id` belongs to the reserved GREASE space.
pub const fn is_grease_id(id: u64) -> bool {
    id >= GREASE_ID_OFFSET &&
        (id - GREASE_ID_OFFSET) % GREASE_ID_FACTOR == 0
}
