//! Scan-track-expire core: name grammar, timestamps, tracked set, directory scan, expiry sweep.

pub mod deletion;
pub mod naming;
pub mod timestamps;
pub mod tracked;
pub mod walker;
