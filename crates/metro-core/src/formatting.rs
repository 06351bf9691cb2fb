use crate::models::{ChangeEvent, Line, LineStatus};

/// Glyph prefixed to a notification for a line running normally.
pub const OK_GLYPH: &str = "\u{2705}";

/// Glyph prefixed to a notification for a disrupted line.
pub const DISRUPTED_GLYPH: &str = "\u{26A0}\u{FE0F}";

/// Word placed before the line name.
pub const LINE_LABEL: &str = "Linha";

/// Render a status notification for `line`.
///
/// The message gets its first character upper-cased and a trailing full stop
/// if it lacks one. No truncation happens here.
///
/// # Examples
///
/// ```
/// use metro_core::formatting::format_status;
/// use metro_core::models::{Line, LineStatus};
///
/// let status = LineStatus::new("avaria na linha", false).unwrap();
/// assert_eq!(
///     format_status(Line::Amarela, &status),
///     "\u{26A0}\u{FE0F} Linha Amarela: Avaria na linha."
/// );
///
/// let status = LineStatus::new("Circulação normal.", true).unwrap();
/// assert_eq!(
///     format_status(Line::Azul, &status),
///     "\u{2705} Linha Azul: Circulação normal."
/// );
/// ```
pub fn format_status(line: Line, status: &LineStatus) -> String {
    let glyph = if status.is_ok() {
        OK_GLYPH
    } else {
        DISRUPTED_GLYPH
    };

    let mut message = capitalize_first(status.message());
    if !message.ends_with('.') {
        message.push('.');
    }

    format!("{} {} {}: {}", glyph, LINE_LABEL, line.name(), message)
}

/// Shorthand for [`format_status`] over a [`ChangeEvent`].
pub fn format_event(event: &ChangeEvent) -> String {
    format_status(event.line, &event.status)
}

/// Upper-case the first `char` of `text`, leaving the rest untouched.
///
/// # Examples
///
/// ```
/// use metro_core::formatting::capitalize_first;
///
/// assert_eq!(capitalize_first("éstação fechada"), "Éstação fechada");
/// assert_eq!(capitalize_first("já está"), "Já está");
/// assert_eq!(capitalize_first(""), "");
/// ```
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
