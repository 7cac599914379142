//! Header parsing: the leading XML blob and the derived, version/encoding
//! dependent configuration that the rest of the crate is built around.

use std::collections::HashMap;

use byteorder::{ByteOrder, BE};
use encoding_rs::{Encoding, UTF_16LE, UTF_8};
use regex::Regex;

use crate::error::{Error, Result};
use crate::io::{ByteSource, FileCursor};
use crate::scanner::Scanner;

/// Sanity bound on the header length field; real headers are a few KiB.
const MAX_HEADER_LEN: usize = 16 * 1024 * 1024;

/// String-to-string attribute map parsed from the header's XML element.
/// Populated once during parsing and immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct Attributes(HashMap<String, String>);

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn yes_no(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => v.eq_ignore_ascii_case("yes"),
            None => default,
        }
    }
}

/// Version- and encoding-dependent behavior derived once from the
/// attribute map.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub v2: bool,
    pub encoding: &'static Encoding,
    /// Bit 0: header section encrypted. Bit 1: keyword-index encrypted.
    pub encrypted: u8,
    pub bytes_per_unit: usize,
    /// Whether `read_text`/`read_text_sized` advance past one extra tail
    /// code unit after the decoded text (v2 only).
    pub text_tail: usize,
    pub case_sensitive: bool,
    pub strip_key: bool,
}

impl Config {
    pub fn header_encrypted(&self) -> bool {
        self.encrypted & 0x1 != 0
    }

    pub fn key_index_encrypted(&self) -> bool {
        self.encrypted & 0x2 != 0
    }
}

/// Narrows to the `Dictionary`/`Library_Data` element's opening tag
/// before scanning for attributes, so stray `name="value"`-shaped text
/// inside a `Description` never leaks into the attribute map. Fails if
/// the element itself is absent.
pub(crate) fn parse_attrs(xml: &str) -> Result<Attributes> {
    let tag = Regex::new(r"(?s)<(Dictionary|Library_Data)\b([^>]*)/?>").unwrap();
    let body = tag
        .captures(xml)
        .ok_or(Error::MissingAttribute("Dictionary/Library_Data element"))?
        .get(2)
        .unwrap()
        .as_str()
        .to_string();
    let attr = Regex::new(r#"(?s)(\w+)="((?:[^"])*)""#).unwrap();
    let mut attrs = HashMap::new();
    for cap in attr.captures_iter(&body) {
        attrs.insert(cap[1].to_string(), cap[2].to_string());
    }
    Ok(Attributes(attrs))
}

/// A `Config` used only to drive `Scanner` while reading the header
/// itself. Neither `read_utf16le` nor `checksum` consult any of its
/// fields, so the values here are unused filler.
fn header_scan_cfg() -> Config {
    Config {
        v2: false,
        encoding: UTF_8,
        encrypted: 0,
        bytes_per_unit: 1,
        text_tail: 0,
        case_sensitive: false,
        strip_key: false,
    }
}

/// Reads the 4-byte length-prefixed UTF-16LE XML header, plus its
/// trailing 4-byte checksum (read and discarded; never validated).
/// Returns the parsed attribute map.
pub(crate) fn read_header<S: ByteSource>(cursor: &mut FileCursor<S>) -> Result<Attributes> {
    let len_buf = cursor.fetch(4)?;
    let len = BE::read_u32(&len_buf) as usize;
    if len > MAX_HEADER_LEN {
        return Err(Error::HeaderTooLarge(len));
    }
    let buf = cursor.fetch(len + 4)?;
    let mut scanner = Scanner::new(buf, header_scan_cfg());
    let text = scanner.read_utf16le(len)?;
    scanner.checksum()?;

    let text = text.trim_end_matches('\u{0}');
    parse_attrs(text)
}

/// Absent or empty `Encoding`, like an absent attribute map entirely,
/// falls back to the header's own UTF-16LE rather than UTF-8.
fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        None => Ok(UTF_16LE),
        Some("") => Ok(UTF_16LE),
        Some(label) => {
            let normalized = if label.eq_ignore_ascii_case("utf-16") || label.eq_ignore_ascii_case("utf16") {
                "utf-16le"
            } else {
                label
            };
            Encoding::for_label(normalized.as_bytes())
                .ok_or_else(|| Error::InvalidEncoding(label.to_string()))
        }
    }
}

impl Config {
    pub fn from_attributes(attrs: &Attributes) -> Result<Self> {
        let version_str = attrs.get("GeneratedByEngineVersion").ok_or(Error::NoVersion)?.trim();
        let major: u8 = version_str
            .get(0..1)
            .ok_or_else(|| Error::InvalidVersion(version_str.to_owned()))?
            .parse()
            .map_err(|_| Error::InvalidVersion(version_str.to_owned()))?;
        let v2 = match major {
            1 => false,
            2 => true,
            _ => return Err(Error::UnsupportedVersion(major)),
        };

        let encrypted = match attrs.get("Encrypted") {
            None => 0u8,
            Some(v) if v.eq_ignore_ascii_case("yes") => 1,
            Some(v) if v.eq_ignore_ascii_case("no") || v.is_empty() => 0,
            Some(v) => v.trim().parse().unwrap_or(0),
        };

        let encoding = resolve_encoding(attrs.get("Encoding"))?;
        let bytes_per_unit = if encoding == UTF_16LE { 2 } else { 1 };
        let text_tail = if v2 { 1 } else { 0 };

        Ok(Config {
            v2,
            encoding,
            encrypted,
            bytes_per_unit,
            text_tail,
            case_sensitive: attrs.yes_no("KeyCaseSensitive", false),
            strip_key: attrs.yes_no("StripKey", true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_attributes() {
        let xml = r#"<Dictionary GeneratedByEngineVersion="2.0" Encrypted="0" Encoding="UTF-16" KeyCaseSensitive="No" StripKey="Yes" Title="Test" Description="a=b inside text"/>"#;
        let attrs = parse_attrs(xml).unwrap();
        assert_eq!(attrs.get("GeneratedByEngineVersion"), Some("2.0"));
        assert_eq!(attrs.get("Encoding"), Some("UTF-16"));
        let cfg = Config::from_attributes(&attrs).unwrap();
        assert!(cfg.v2);
        assert_eq!(cfg.bytes_per_unit, 2);
        assert_eq!(cfg.text_tail, 1);
        assert!(!cfg.case_sensitive);
        assert!(cfg.strip_key);
        assert_eq!(cfg.encrypted, 0);
    }

    #[test]
    fn library_data_element_and_v1() {
        let xml = r#"<Library_Data GeneratedByEngineVersion="1.2" Encoding="UTF-8" Encrypted="2"/>"#;
        let attrs = parse_attrs(xml).unwrap();
        let cfg = Config::from_attributes(&attrs).unwrap();
        assert!(!cfg.v2);
        assert_eq!(cfg.bytes_per_unit, 1);
        assert_eq!(cfg.text_tail, 0);
        assert!(cfg.key_index_encrypted());
        assert!(!cfg.header_encrypted());
    }

    #[test]
    fn absent_encoding_defaults_to_utf16le() {
        let attrs = parse_attrs(r#"<Dictionary GeneratedByEngineVersion="2.0"/>"#).unwrap();
        let cfg = Config::from_attributes(&attrs).unwrap();
        assert_eq!(cfg.encoding, UTF_16LE);
        assert_eq!(cfg.bytes_per_unit, 2);
    }

    #[test]
    fn empty_encoding_defaults_to_utf16le() {
        let attrs = parse_attrs(r#"<Dictionary GeneratedByEngineVersion="2.0" Encoding=""/>"#).unwrap();
        let cfg = Config::from_attributes(&attrs).unwrap();
        assert_eq!(cfg.encoding, UTF_16LE);
    }

    #[test]
    fn missing_version_is_error() {
        let attrs = parse_attrs(r#"<Dictionary Encoding="UTF-8"/>"#).unwrap();
        assert!(matches!(Config::from_attributes(&attrs), Err(Error::NoVersion)));
    }

    #[test]
    fn unsupported_major_version_is_rejected() {
        let attrs = parse_attrs(r#"<Dictionary GeneratedByEngineVersion="3.0" Encoding="UTF-8"/>"#).unwrap();
        assert!(matches!(Config::from_attributes(&attrs), Err(Error::UnsupportedVersion(3))));
    }

    #[test]
    fn missing_dictionary_element_is_error() {
        assert!(matches!(parse_attrs("just some text, no element here"), Err(Error::MissingAttribute(_))));
    }
}
