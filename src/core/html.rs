//! Truncation helpers shared by the renderers. Escaping goes through `html_escape`.

/// Keeps the first `max` characters and appends `…` when something was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(max).collect();
        out.push('…');
        out
    } else {
        s.to_string()
    }
}

/// Cuts to `keep` characters plus `…` once the text is longer than `max`.
pub fn shorten(s: &str, max: usize, keep: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(keep).collect();
        out.push('…');
        out
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let topic = "д".repeat(61);
        let out = truncate_chars(&topic, 60);
        assert_eq!(out.chars().count(), 61);
        assert!(out.ends_with('…'));
        assert_eq!(truncate_chars("short", 60), "short");
    }

    #[test]
    fn shorten_keeps_prefix() {
        let s = "x".repeat(61);
        assert_eq!(shorten(&s, 60, 57).chars().count(), 58);
        assert_eq!(shorten(&"x".repeat(60), 60, 57), "x".repeat(60));
    }
}
