//! Key adaptation: case-folding and punctuation stripping per the
//! dictionary's attributes, plus mdd resource-path normalization.

use crate::header::Config;

/// Characters stripped from a key when `StripKey=Yes`.
const STRIP_CHARS: [char; 6] = [',', '.', ' ', '\'', '_', '-'];

/// Default key adaptation: strip punctuation (if enabled) then
/// case-fold (if the dictionary isn't case sensitive).
pub fn adapt_key(key: &str, cfg: &Config) -> String {
    let mut out = if cfg.strip_key {
        key.chars().filter(|c| !STRIP_CHARS.contains(c)).collect()
    } else {
        key.to_string()
    };
    if !cfg.case_sensitive {
        out = out.to_lowercase();
    }
    out
}

/// Normalizes an mdd resource path: strip any leading `/` or `\`,
/// convert remaining `/` separators to `\`, then prepend a single `\`,
/// so `/img/a.png`, `\img\a.png`, and `img/a.png` all normalize
/// identically.
pub fn normalize_mdd_path(path: &str) -> String {
    let stripped = path.trim_start_matches(['/', '\\']);
    format!("\\{}", stripped.replace('/', "\\"))
}

/// A caller-supplied override for key adaptation. Boxed so the builder
/// can store either the default or a closure.
pub type KeyMaker = Box<dyn Fn(&str) -> String + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{parse_attrs, Config};

    fn cfg(case_sensitive: bool, strip_key: bool) -> Config {
        let mut attrs_xml = String::from("<Dictionary GeneratedByEngineVersion=\"2.0\" Encoding=\"UTF-8\"");
        attrs_xml.push_str(&format!(
            " KeyCaseSensitive=\"{}\" StripKey=\"{}\"",
            if case_sensitive { "Yes" } else { "No" },
            if strip_key { "Yes" } else { "No" }
        ));
        attrs_xml.push_str("/>");
        let attrs = parse_attrs(&attrs_xml).unwrap();
        Config::from_attributes(&attrs).unwrap()
    }

    #[test]
    fn strips_and_folds_case() {
        let c = cfg(false, true);
        assert_eq!(adapt_key("Don't-Stop", &c), "dontstop");
    }

    #[test]
    fn case_sensitive_keeps_case() {
        let c = cfg(true, true);
        assert_eq!(adapt_key("CAT", &c), "CAT");
    }

    #[test]
    fn no_strip_keeps_punctuation() {
        let c = cfg(false, false);
        assert_eq!(adapt_key("a-b", &c), "a-b");
    }

    #[test]
    fn mdd_path_normalization_variants_agree() {
        let expected = "\\img\\a.png";
        assert_eq!(normalize_mdd_path("/img/a.png"), expected);
        assert_eq!(normalize_mdd_path("\\img\\a.png"), expected);
        assert_eq!(normalize_mdd_path("img/a.png"), expected);
    }
}
