//! Issuance-order gate for one logical query stream.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn epoch(self) -> u64 {
        self.0
    }
}

/// Each started fetch takes a token; only the newest token may publish its
/// response. Older continuations must drop what they received without
/// touching shared state, so the last request *issued* wins regardless of
/// completion order.
#[derive(Debug, Default)]
pub struct RequestGate {
    epoch: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called once per fetch, before the request is sent.
    pub fn begin_request(&self) -> RequestToken {
        RequestToken(self.epoch.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.epoch.load(Ordering::Acquire) == token.0
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}
