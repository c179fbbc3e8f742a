//! Structural format detection over a bounded content prefix.
//!
//! Each format family has an independent detector. `detect_all` reports every
//! detector that matches; `sniff` resolves overlaps with the fixed priority
//! order in [`NoticeFormat::PRIORITY`]. Filenames are never consulted: archive
//! naming has changed too often to be trusted.

use crate::constants::{ARCHIVE_HEADER_MARKER, LEGACY_MIN_FIELD_LINES, namespaces, roots};
use crate::error::ExtractionError;
use crate::models::NoticeFormat;
use crate::xml::{Element, start_element};
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static FIELD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}:(\s|$)").expect("valid field line pattern"));

static RECORD_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+/\d{6}$").expect("valid record separator pattern"));

/// Root element summary gathered from the prefix without a full parse
#[derive(Debug, Default)]
struct XmlProbe {
    root: Option<Element>,
    /// Local names of the root's children seen within the prefix
    child_names: Vec<String>,
}

/// Detect the format of a document from its first `prefix_bytes` bytes
pub fn sniff(
    bytes: &[u8],
    filename: &str,
    prefix_bytes: usize,
) -> Result<NoticeFormat, ExtractionError> {
    let matches = detect_all(bytes, prefix_bytes);
    if matches.len() > 1 {
        debug!(
            "{} matches {:?}, priority selects {}",
            filename, matches, matches[0]
        );
    }
    matches
        .first()
        .copied()
        .ok_or_else(|| ExtractionError::FormatNotRecognized {
            filename: filename.to_string(),
        })
}

/// Every format whose detector matches, in priority order
pub fn detect_all(bytes: &[u8], prefix_bytes: usize) -> Vec<NoticeFormat> {
    let prefix = decode_prefix(bytes, prefix_bytes);
    let trimmed = prefix.trim_start();

    let probe = if trimmed.starts_with('<') {
        Some(probe_xml(trimmed))
    } else {
        None
    };

    NoticeFormat::PRIORITY
        .into_iter()
        .filter(|format| match (format, &probe) {
            (NoticeFormat::LegacyFieldCoded, None) => is_legacy_field_coded(trimmed),
            (NoticeFormat::LegacyFieldCoded, Some(_)) => false,
            (_, None) => false,
            (NoticeFormat::EarlyStructuredXml, Some(p)) => is_early_structured(p),
            (NoticeFormat::UnifiedNamespacedXml, Some(p)) => is_unified_namespaced(p),
            (NoticeFormat::UblStandard, Some(p)) => is_ubl_standard(p),
        })
        .collect()
}

/// Text view of the prefix. A sequence cut at the boundary is dropped;
/// bytes that are not UTF-8 at all are read as Latin-1.
fn decode_prefix(bytes: &[u8], prefix_bytes: usize) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let window = &bytes[..bytes.len().min(prefix_bytes)];
    match std::str::from_utf8(window) {
        Ok(text) => text.to_string(),
        Err(err) if err.error_len().is_none() => {
            String::from_utf8_lossy(&window[..err.valid_up_to()]).to_string()
        }
        Err(_) => window.iter().map(|&b| b as char).collect(),
    }
}

fn is_legacy_field_coded(text: &str) -> bool {
    let mut lines = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with(ARCHIVE_HEADER_MARKER));
    let Some(first) = lines.next() else {
        return false;
    };
    if !RECORD_SEPARATOR.is_match(first.trim()) && !FIELD_LINE.is_match(first) {
        return false;
    }

    let field_lines = std::iter::once(first)
        .chain(lines)
        .filter(|line| FIELD_LINE.is_match(line))
        .count();
    field_lines >= LEGACY_MIN_FIELD_LINES
}

/// Read the root start tag and the names of its direct children. Reading
/// stops at the first error, which is expected where the prefix is cut.
fn probe_xml(text: &str) -> XmlProbe {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut probe = XmlProbe::default();
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if depth == 0 {
                    match start_element(e) {
                        Ok(root) => probe.root = Some(root),
                        Err(_) => break,
                    }
                } else if depth == 1 {
                    probe
                        .child_names
                        .push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                }
                depth += 1;
            }
            Ok(Event::Empty(ref e)) => {
                if depth == 0 {
                    if let Ok(root) = start_element(e) {
                        probe.root = Some(root);
                    }
                    break;
                } else if depth == 1 {
                    probe
                        .child_names
                        .push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }

    probe
}

fn root_named<'a>(probe: &'a XmlProbe, name: &str) -> Option<&'a Element> {
    probe.root.as_ref().filter(|root| root.name() == name)
}

/// `INTERNAL_OJS` root, or wrapped directly inside a `TED_EXPORT` envelope
fn is_early_structured(probe: &XmlProbe) -> bool {
    root_named(probe, roots::EARLY_STRUCTURED).is_some()
        || (root_named(probe, roots::UNIFIED_EXPORT).is_some()
            && probe.child_names.iter().any(|n| n == roots::EARLY_STRUCTURED))
}

fn is_unified_namespaced(probe: &XmlProbe) -> bool {
    root_named(probe, roots::UNIFIED_EXPORT)
        .and_then(Element::namespace)
        .is_some_and(|ns| ns == namespaces::TED_EXPORT || ns == namespaces::TED_EXPORT_R209)
}

fn is_ubl_standard(probe: &XmlProbe) -> bool {
    root_named(probe, roots::UBL_AWARD_NOTICE)
        .and_then(Element::namespace)
        .is_some_and(|ns| ns == namespaces::UBL_CONTRACT_AWARD_NOTICE)
}
