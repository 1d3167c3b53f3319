//! Character-scanning tokenizer for raw access-log lines.

/// Split one raw log line into its space-delimited fields.
///
/// The scanner has four logical states: normal, in-bracket, in-quote, and
/// escaped. A space ends the current field only outside both bracket and
/// quote context, so the `[...]` timestamp and the quoted request line,
/// referrer, and user agent each come out as a single field. Bracket,
/// quote, and backslash characters are consumed rather than retained; a
/// backslash escapes the next character, which is appended literally (so
/// `\"` inside a quoted field yields a `"` without ending the field) and
/// scanning resumes in the prior context.
///
/// No field-count validation happens here; callers decide how many fields
/// the layout requires.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_bracket = false;
    let mut in_quote = false;
    let mut escaped = false;

    for ch in line.chars() {
        if escaped {
            field.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == ' ' && !in_bracket && !in_quote {
            fields.push(std::mem::take(&mut field));
        } else if ch == '[' {
            in_bracket = true;
        } else if ch == ']' {
            in_bracket = false;
        } else if ch == '"' {
            in_quote = !in_quote;
        } else {
            field.push(ch);
        }
    }

    // End of line flushes the final field
    fields.push(field);
    fields
}
