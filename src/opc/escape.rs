use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

const ATTR_SPECIALS: [&str; 8] = ["&", "<", ">", "\"", "'", "\t", "\n", "\r"];
const ATTR_ENTITIES: [&str; 8] = [
    "&amp;", "&lt;", "&gt;", "&quot;", "&apos;", "&#9;", "&#10;", "&#13;",
];

// Built once, shared by every serializer thread
static ATTR_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(ATTR_SPECIALS)
        .expect("Failed to build XML attribute escaper")
});

/// Escape a string for use inside a double-quoted XML attribute value.
///
/// Whitespace control characters are written as character references so
/// that attribute-value normalization on re-read gives back the same
/// string.
///
/// # Examples
///
/// ```
/// use opc_memstore::opc::escape::escape_attr;
/// assert_eq!(escape_attr("a & b"), "a &amp; b");
/// assert_eq!(escape_attr("say \"hi\"\n"), "say &quot;hi&quot;&#10;");
/// ```
#[inline]
pub fn escape_attr(s: &str) -> String {
    if !s.bytes().any(|b| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\'' | b'\t' | b'\n' | b'\r')) {
        return s.to_string();
    }
    ATTR_ESCAPER.replace_all(s, &ATTR_ENTITIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_passthrough() {
        assert_eq!(escape_attr("media/image1.png"), "media/image1.png");
    }

    #[test]
    fn test_all_specials() {
        assert_eq!(
            escape_attr("<&>'\"\t\r"),
            "&lt;&amp;&gt;&apos;&quot;&#9;&#13;"
        );
    }
}
