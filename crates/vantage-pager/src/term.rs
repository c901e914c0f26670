//! Terminal dimension detection.

/// Detect the terminal dimensions as `(columns, rows)`.
///
/// Returns `None` when stdout is not a terminal or the size cannot be
/// determined, e.g. under CI or with output redirected. Callers fall back
/// to configured or default dimensions; detection failure is never an
/// error.
pub fn detect_dimensions() -> Option<(usize, usize)> {
    terminal_size::terminal_size().map(|(w, h)| (w.0 as usize, h.0 as usize))
}
