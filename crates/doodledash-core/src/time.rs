/// Returns the current Unix time in milliseconds.
///
/// Scoring compares guess timestamps against the drawing start, so the
/// clock needs sub-second resolution.
pub fn now_ms() -> u64 {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    dur.as_millis() as u64
}
