//! Filesystem-safe names.
//!
//! Output is safe on FAT32 and exFAT volumes, which is what most portable
//! players use. The rules are deliberately strict so the same name is valid
//! on every target.

/// Characters rejected by FAT32.
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Device names Windows refuses as file names.
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Maximum length of a single path segment in bytes.
pub const MAX_SEGMENT_BYTES: usize = 255;

/// Substituted when nothing usable is left of a name.
pub const EMPTY_NAME: &str = "unnamed";

/// Makes arbitrary text usable as a single path segment.
///
/// Illegal and control characters become `_`, trailing spaces and periods
/// are stripped, reserved device names get a `_` prefix and the result is
/// cut to at most [`MAX_SEGMENT_BYTES`] without splitting a character.
/// Applying it to its own output returns the output unchanged.
pub fn sanitize_segment(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || (c as u32) < 32 {
                '_'
            } else {
                c
            }
        })
        .collect();

    trim_trailing(&mut name);
    truncate_to_bytes(&mut name, MAX_SEGMENT_BYTES);
    // truncation can expose a trailing space or period
    trim_trailing(&mut name);

    if name.is_empty() {
        name.push_str(EMPTY_NAME);
    }

    if is_reserved(&name) {
        name.insert(0, '_');
    }

    name
}

/// Builds `{stem}.{ext}` and keeps the whole segment within
/// [`MAX_SEGMENT_BYTES`] by shortening the stem, never the extension.
pub fn file_name(stem: &str, ext: &str) -> String {
    let ext = if ext.is_empty() {
        String::new()
    } else {
        sanitize_segment(ext)
    };
    let mut stem = sanitize_segment(stem);

    if ext.is_empty() {
        return stem;
    }

    let budget = MAX_SEGMENT_BYTES.saturating_sub(ext.len() + 1).max(1);
    if stem.len() > budget {
        truncate_to_bytes(&mut stem, budget);
        trim_trailing(&mut stem);
        if stem.is_empty() {
            stem.push_str(EMPTY_NAME);
        }
    }

    format!("{}.{}", stem, ext)
}

/// `{prefix}{name}{suffix}` cut to [`MAX_SEGMENT_BYTES`].
///
/// Used for staging files next to a final file. When `name` has to be
/// shortened its stem loses bytes, a short hash of the full name is
/// appended to it and the extension is kept, so distinct names stay
/// distinct.
pub fn affixed_name(name: &str, prefix: &str, suffix: &str) -> String {
    let budget = MAX_SEGMENT_BYTES.saturating_sub(prefix.len() + suffix.len());
    if name.len() <= budget {
        return format!("{}{}{}", prefix, name, suffix);
    }

    let digest = format!("{:x}", md5::compute(name.as_bytes()));
    let hash = &digest[..HASH_LEN];
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let tail = 1 + HASH_LEN + ext.map_or(0, |e| e.len() + 1);

    let mut stem = stem.to_string();
    truncate_to_bytes(&mut stem, budget.saturating_sub(tail));

    match ext {
        Some(ext) => format!("{}{}-{}.{}{}", prefix, stem, hash, ext, suffix),
        None => format!("{}{}-{}{}", prefix, stem, hash, suffix),
    }
}

/// Hex digits of the hash [`affixed_name`] appends.
const HASH_LEN: usize = 8;

fn trim_trailing(name: &mut String) {
    let kept = name.trim_end_matches(|c| c == ' ' || c == '.').len();
    name.truncate(kept);
}

fn truncate_to_bytes(name: &mut String, max: usize) {
    while name.len() > max {
        name.pop();
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}
