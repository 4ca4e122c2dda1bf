//! Activity output: console status lines and the append-only JSONL log.

pub mod console;
pub mod dual;
pub mod jsonl;
