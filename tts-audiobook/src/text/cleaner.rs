//! Character-level cleanup before segmentation.
//!
//! Works line by line and never adds or removes a newline, so the paragraph
//! structure handed to the segmenter is unchanged.

/// Characters that trip up TTS engines and their replacements.
const PROBLEMATIC_CHARS: &[(char, &str)] = &[
    ('\u{2018}', "'"),   // Left single quote
    ('\u{2019}', "'"),   // Right single quote
    ('\u{201c}', "\""),  // Left double quote
    ('\u{201d}', "\""),  // Right double quote
    ('\u{00ab}', "\""),  // Left-pointing double angle quote
    ('\u{00bb}', "\""),  // Right-pointing double angle quote
    ('\u{2039}', "'"),   // Single left-pointing angle quote
    ('\u{203a}', "'"),   // Single right-pointing angle quote
    ('\u{2011}', "-"),   // Non-breaking hyphen
    ('\u{2012}', "-"),   // Figure dash
    ('\u{2013}', "-"),   // En dash
    ('\u{2014}', "-"),   // Em dash
    ('\u{2015}', "-"),   // Horizontal bar
    ('\u{2026}', "..."), // Ellipsis
    ('\u{00a0}', " "),   // Non-breaking space
    ('\u{2009}', " "),   // Thin space
    ('\u{202f}', " "),   // Narrow no-break space
    ('\u{200b}', ""),    // Zero-width space
    ('\u{200c}', ""),    // Zero-width non-joiner
    ('\u{200d}', ""),    // Zero-width joiner
    ('\u{00ad}', ""),    // Soft hyphen
    ('\u{feff}', ""),    // BOM
];

/// Clean chapter text for TTS.
///
/// - Replaces smart quotes, dashes, and invisible characters
/// - Drops control characters (tabs become spaces)
/// - Collapses runs of spaces and trims every line
/// - Collapses runs of periods, which some engines read as noise
pub fn clean_text(text: &str) -> String {
    text.split('\n')
        .map(clean_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn clean_line(line: &str) -> String {
    let mut replaced = String::with_capacity(line.len());

    for c in line.chars() {
        match PROBLEMATIC_CHARS.iter().find(|(ch, _)| *ch == c) {
            Some((_, r)) => replaced.push_str(r),
            None if c == '\t' => replaced.push(' '),
            None if c.is_control() => {}
            None => replaced.push(c),
        }
    }

    fix_multiple_periods(&collapse_spaces(&replaced))
}

fn collapse_spaces(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fix_multiple_periods(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_period = false;

    for c in text.chars() {
        if c == '.' {
            if !prev_was_period {
                result.push(c);
            }
            prev_was_period = true;
        } else {
            prev_was_period = false;
            result.push(c);
        }
    }

    result
}
