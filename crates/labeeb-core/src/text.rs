//! Arabic text normalization and sentinel handling.
//!
//! Transcripts of Saudi-dialect speech spell the same word several ways
//! (hamza on alef or not, ta marbuta or ha, Arabic-Indic or ASCII digits).
//! All keyword matching in Labeeb runs on the output of [`normalize`], and
//! every keyword table is written in normalized form.

use crate::types::CLOSE_CONVERSATION;

/// Fold a transcript into the canonical form used for keyword matching.
///
/// - alef with hamza / madda / wasla -> bare alef
/// - ta marbuta -> ha, alef maqsura -> ya
/// - tashkeel and tatweel removed
/// - Arabic-Indic and extended digits -> ASCII digits
/// - lower-cased, whitespace collapsed, trimmed
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'أ' | 'إ' | 'آ' | 'ٱ' => out.push('ا'),
            'ة' => out.push('ه'),
            'ى' => out.push('ي'),
            '\u{064B}'..='\u{0652}' | '\u{0670}' | '\u{0640}' => {}
            '\u{0660}'..='\u{0669}' => {
                out.push(char::from(b'0' + (c as u32 - 0x0660) as u8));
            }
            '\u{06F0}'..='\u{06F9}' => {
                out.push(char::from(b'0' + (c as u32 - 0x06F0) as u8));
            }
            _ => out.extend(c.to_lowercase()),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a generated reply asks for the conversation to close.
pub fn has_close_marker(reply: &str) -> bool {
    reply.contains(CLOSE_CONVERSATION)
}

/// Remove the close-conversation marker so the text can be spoken.
pub fn strip_close_marker(reply: &str) -> String {
    reply.replace(CLOSE_CONVERSATION, "").trim().to_string()
}

/// Split a normalized utterance into words, dropping punctuation around them.
pub fn words(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '_') || "،؟؛!.".contains(c))
        .filter(|w| !w.is_empty())
}
