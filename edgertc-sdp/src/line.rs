//! Line-oriented helpers only: this crate extracts fields, it does not
//! walk the full SDP grammar (spec.md's "SDP grammar walking beyond
//! field extraction" Non-goal).

/// Splits an SDP message into trimmed, non-empty lines. RFC 4566 lines
/// are terminated by CRLF but tolerant parsers also accept a bare LF.
pub fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(|l| l.trim_end_matches('\r')).filter(|l| !l.is_empty())
}

/// Splits a `<type>=<rest>` line into its type char and the remainder.
pub fn split_type(line: &str) -> Option<(char, &str)> {
    let mut chars = line.char_indices();
    let (_, c) = chars.next()?;
    let (idx, eq) = chars.next()?;
    if eq != '=' {
        return None;
    }
    Some((c, &line[idx + 1..]))
}

/// Splits an `a=` line's body into its attribute name and optional
/// value, on the first `:` (flag attributes like `rtcp-mux` have none).
pub fn split_attribute(body: &str) -> (&str, Option<&str>) {
    match body.split_once(':') {
        Some((name, value)) => (name, Some(value)),
        None => (body, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_attribute_with_value() {
        assert_eq!(split_attribute("ice-ufrag:abc"), ("ice-ufrag", Some("abc")));
    }

    #[test]
    fn splits_flag_attribute() {
        assert_eq!(split_attribute("rtcp-mux"), ("rtcp-mux", None));
    }

    #[test]
    fn splits_type_line() {
        assert_eq!(split_type("m=audio 9 UDP/TLS/RTP/SAVPF 111"), Some(('m', "audio 9 UDP/TLS/RTP/SAVPF 111")));
    }

    #[test]
    fn tolerates_bare_lf() {
        let text = "v=0\na=ice-ufrag:x\n";
        assert_eq!(lines(text).count(), 2);
    }
}
