/// Used when a server-supplied name reduces to nothing.
pub const FALLBACK_FILENAME: &str = "research_paper.pdf";

const MAX_FILENAME_BYTES: usize = 120;
/// Longest suffix (dot included) still treated as an extension.
const MAX_EXTENSION_BYTES: usize = 16;

/// Reduce a server-supplied filename to one safe path component.
///
/// Directory parts are dropped, characters that are forbidden on common
/// filesystems become `_`, and leading/trailing dots and spaces are removed so
/// the result can never escape the output directory.
pub fn safe_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = last
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let mut cleaned = cleaned.trim_matches(&[' ', '.'][..]).to_string();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        return FALLBACK_FILENAME.to_string();
    }
    if cleaned.len() > MAX_FILENAME_BYTES {
        cleaned = shorten(&cleaned);
    }
    let stem_len = cleaned.find('.').unwrap_or(cleaned.len());
    if is_reserved_windows_name(&cleaned[..stem_len]) {
        cleaned.insert(stem_len, '_');
    }
    cleaned
}

/// Cut the stem so the name fits, keeping the extension.
fn shorten(name: &str) -> String {
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_BYTES => name.split_at(dot),
        _ => (name, ""),
    };
    let mut cut = MAX_FILENAME_BYTES - extension.len();
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    let stem = stem[..cut].trim_end_matches([' ', '.']);
    format!("{stem}{extension}")
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
