//! Frame to text rendering.
//!
//! Rendering decodes the frame bytes as UTF-8 (invalid sequences become
//! U+FFFD) and replaces control characters other than `\r`, `\n` and `\t`
//! with `.`, so binary headers stay inert while line structure survives for
//! field extraction.

use log::trace;

use super::types::CapturedFrame;

const PREVIEW_LEN: usize = 64;

/// Renders a frame payload into searchable text.
///
/// Returns `None` when there is nothing to render; the frame is then simply
/// skipped.
pub fn render(frame: &CapturedFrame) -> Option<String> {
    let text = render_bytes(&frame.data)?;
    trace!(
        "frame #{} rendered {} bytes: {}{}",
        frame.sequence,
        frame.data.len(),
        text.chars().take(PREVIEW_LEN).collect::<String>(),
        if text.chars().count() > PREVIEW_LEN { " ..." } else { "" }
    );
    Some(text)
}

pub fn render_bytes(data: &[u8]) -> Option<String> {
    if data.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(data)
        .chars()
        .map(|c| match c {
            '\r' | '\n' | '\t' => c,
            c if c.is_control() => '.',
            c => c,
        })
        .collect();
    Some(text)
}
