//! Span table: the chunk durations a chunk payload can declare.
//!
//! Span codes are persisted inside chunk payloads, so entries may only ever be
//! appended. Reordering or removing an entry changes the meaning of stored data.

/// Index into [`CHUNK_SPANS`].
pub type SpanCode = u8;

/// Allowed chunk spans in seconds, addressed by [`SpanCode`].
pub const CHUNK_SPANS: [u32; 26] = [
    1,
    5,
    10,
    15,
    20,
    30,
    60,
    90,
    120,
    150,
    300,
    600,
    900,
    1200,
    1800,
    45 * 60,
    3600,
    3600 + 30 * 60,
    2 * 3600,
    3 * 3600,
    4 * 3600,
    5 * 3600,
    6 * 3600,
    8 * 3600,
    12 * 3600,
    24 * 3600,
];

/// Span code of the 2h span.
pub const DEFAULT_SPAN_CODE: SpanCode = 18;

/// Looks up the span for a code.
pub fn chunk_span(code: SpanCode) -> Option<u32> {
    CHUNK_SPANS.get(usize::from(code)).copied()
}

/// Finds the code for a span given in seconds.
pub fn span_code(span: u32) -> Option<SpanCode> {
    CHUNK_SPANS
        .iter()
        .position(|&s| s == span)
        .map(|idx| idx as SpanCode)
}

/// Returns true if `code` addresses an entry of the span table.
pub fn is_valid_span_code(code: SpanCode) -> bool {
    usize::from(code) < CHUNK_SPANS.len()
}

/// Floors `ts` to the start of the span-aligned window containing it.
pub fn align(ts: u32, span: u32) -> u32 {
    if span == 0 {
        return ts;
    }
    ts - ts % span
}
