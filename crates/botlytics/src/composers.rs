//! 🎬 *[the records arrive. they are many. they need brackets. they need commas.]*
//!
//! 📦 **JsonArrayComposer**: frames already-rendered records as `[r1,r2,r3]` without
//! re-parsing them.
//!
//! 🧠 Knowledge graph:
//! - Each buffered record is a JSON object string, rendered once at append time by the
//!   field filter. We trust it. Re-parsing 10 000 records to wrap them in an array would be
//!   a lot of work to arrive at the same bytes.
//! - Capacity math: 2 (brackets) + sum(record lengths) + (n-1) commas. Exact, no realloc.
//!
//! 🦆 The duck asked why we don't use serde. We said "it already had its turn."

/// 📦 Frames rendered records as one JSON array body.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct JsonArrayComposer;

impl JsonArrayComposer {
    #[inline]
    pub(crate) fn compose(&self, records: &[String]) -> String {
        let commas = records.len().saturating_sub(1);
        let exact_size = 2 + records.iter().map(String::len).sum::<usize>() + commas;
        let mut payload = String::with_capacity(exact_size);
        payload.push('[');
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                payload.push(',');
            }
            payload.push_str(record);
        }
        payload.push(']');
        payload
    }
}
