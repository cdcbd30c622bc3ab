//! Term weighting (spec.md §4.6.5): the engine exposes a TF-IDF-style
//! factor and the raw postings; it never picks a ranking model itself.

/// `w(t) = ln(N / df(t))`, the inverse document frequency. `df == 0` is
/// clamped to `1` since a term absent from the index should never reach
/// scoring (lookups return `NotFound` first).
pub fn idf(n_docs: u32, document_count: u32) -> f32 {
    let df = document_count.max(1) as f64;
    let n = n_docs.max(1) as f64;
    (n / df).ln() as f32
}
