// Address-book adapter
//
// Reads a vCard export (.vcf), versions 2.1 to 4.0. Only FN and the first
// TEL of each card are used; quoted-printable values (2.1 exports) are
// decoded as UTF-8. Registration in the app is unknown for address-book
// entries, so `is_registered` is a random placeholder until a lookup service
// exists.

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use std::path::PathBuf;
use tokio::sync::Mutex;

use super::{ContactProperty, ContactSource, ContactSourceError, PickRequest};
use crate::models::Contact;

/// Name used for a card without FN
pub const UNNAMED_CONTACT: &str = "Без имени";

/// Chance that an address-book entry is shown as registered
const REGISTERED_PROBABILITY: f64 = 0.7;

lazy_static! {
    static ref PROPERTY_LINE: Regex =
        Regex::new(r"(?i)^(?:item\d+\.)?(BEGIN|END|FN|TEL)((?:;[^:]*)?):(.*)$").unwrap();
}

/// One card as read from the file, before ids and registration are assigned
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VcardEntry {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Parse every card in `text`. Folded lines (continuations starting with a
/// space or tab, or quoted-printable soft breaks) are joined first.
pub fn parse_vcards(text: &str) -> Vec<VcardEntry> {
    let mut unfolded: Vec<String> = Vec::new();
    for raw in text.lines() {
        let line = raw.trim_end_matches('\r');
        if let Some(last) = unfolded.last_mut() {
            // Soft line break: a quoted-printable value ending in "="
            if last.ends_with('=') && is_quoted_printable(last) {
                last.pop();
                last.push_str(line.trim_start());
                continue;
            }
            if let Some(rest) = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t')) {
                last.push_str(rest);
                continue;
            }
        }
        unfolded.push(line.to_string());
    }

    let mut entries = Vec::new();
    let mut current: Option<VcardEntry> = None;

    for line in &unfolded {
        let Some(caps) = PROPERTY_LINE.captures(line) else {
            continue;
        };
        let property = caps[1].to_ascii_uppercase();
        let decoded;
        let value = if caps[2].to_ascii_uppercase().contains("QUOTED-PRINTABLE") {
            decoded = decode_quoted_printable(caps[3].trim());
            decoded.as_str()
        } else {
            caps[3].trim()
        };

        match property.as_str() {
            "BEGIN" if value.eq_ignore_ascii_case("VCARD") => {
                current = Some(VcardEntry::default());
            }
            "END" if value.eq_ignore_ascii_case("VCARD") => {
                if let Some(entry) = current.take() {
                    entries.push(entry);
                }
            }
            "FN" => {
                if let Some(entry) = current.as_mut() {
                    if entry.name.is_none() && !value.is_empty() {
                        entry.name = Some(unescape(value));
                    }
                }
            }
            "TEL" => {
                if let Some(entry) = current.as_mut() {
                    if entry.phone.is_none() && !value.is_empty() {
                        entry.phone = Some(value.trim_start_matches("tel:").to_string());
                    }
                }
            }
            _ => {}
        }
    }

    entries
}

fn is_quoted_printable(line: &str) -> bool {
    line.split(':')
        .next()
        .map_or(false, |head| head.to_ascii_uppercase().contains("QUOTED-PRINTABLE"))
}

/// `=XX` escapes to bytes, read as UTF-8. Malformed escapes are kept as-is.
fn decode_quoted_printable(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'=' && i + 3 <= bytes.len() {
            if let Ok(decoded) = hex::decode(&bytes[i + 1..i + 3]) {
                out.extend_from_slice(&decoded);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn unescape(value: &str) -> String {
    value
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\n", " ")
        .replace("\\\\", "\\")
}

pub struct VcardContactSource {
    path: PathBuf,
    rng: Mutex<StdRng>,
}

impl VcardContactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        VcardContactSource {
            path: path.into(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Fixed seed for the registration placeholder
    pub fn with_seed(path: impl Into<PathBuf>, seed: u64) -> Self {
        VcardContactSource {
            path: path.into(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl ContactSource for VcardContactSource {
    fn name(&self) -> &'static str {
        "vcard"
    }

    async fn pick(&self, request: &PickRequest) -> Result<Vec<Contact>, ContactSourceError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ContactSourceError::Denied(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        let mut entries = parse_vcards(&text);
        debug!("Parsed {} cards from {}", entries.len(), self.path.display());
        if !request.multiple {
            entries.truncate(1);
        }

        let base = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut rng = self.rng.lock().await;

        let contacts: Vec<Contact> = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Contact {
                id: base + index as u64,
                name: entry
                    .name
                    .filter(|_| request.wants(ContactProperty::Name))
                    .unwrap_or_else(|| UNNAMED_CONTACT.to_string()),
                phone: entry
                    .phone
                    .filter(|_| request.wants(ContactProperty::Tel))
                    .unwrap_or_default(),
                avatar: String::new(),
                is_registered: rng.gen_bool(REGISTERED_PROBABILITY),
            })
            .collect();

        info!("Address book returned {} contacts", contacts.len());
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = "BEGIN:VCARD\r\n\
VERSION:3.0\r\n\
FN:Иван Петров\r\n\
TEL;TYPE=CELL:+7 999 123 45 67\r\n\
TEL;TYPE=HOME:+7 495 000 00 00\r\n\
END:VCARD\r\n\
BEGIN:VCARD\r\n\
VERSION:4.0\r\n\
FN:Очень Длинное\r\n\
\x20\x20Имя\r\n\
END:VCARD\r\n\
BEGIN:VCARD\r\n\
VERSION:3.0\r\n\
item1.TEL:tel:+7 999 000 11 22\r\n\
END:VCARD\r\n";

    #[test]
    fn parses_name_and_first_phone() {
        let entries = parse_vcards(BOOK);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name.as_deref(), Some("Иван Петров"));
        assert_eq!(entries[0].phone.as_deref(), Some("+7 999 123 45 67"));
    }

    #[test]
    fn unfolds_continuation_lines() {
        let entries = parse_vcards(BOOK);
        assert_eq!(entries[1].name.as_deref(), Some("Очень Длинное Имя"));
        assert_eq!(entries[1].phone, None);
    }

    #[test]
    fn grouped_tel_without_name() {
        let entries = parse_vcards(BOOK);
        assert_eq!(entries[2].name, None);
        assert_eq!(entries[2].phone.as_deref(), Some("+7 999 000 11 22"));
    }

    #[test]
    fn decodes_quoted_printable_names() {
        let book = "BEGIN:VCARD\r\n\
VERSION:2.1\r\n\
FN;CHARSET=UTF-8;ENCODING=QUOTED-PRINTABLE:=D0=98=D0=B2=D0=B0=D0=BD\r\n\
TEL;CELL:+7 999 123 45 67\r\n\
END:VCARD\r\n\
BEGIN:VCARD\r\n\
VERSION:2.1\r\n\
FN;ENCODING=QUOTED-PRINTABLE:=D0=98=D0=B2=\r\n\
=D0=B0=D0=BD =D0=9F.\r\n\
END:VCARD\r\n";
        let entries = parse_vcards(book);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name.as_deref(), Some("Иван"));
        assert_eq!(entries[0].phone.as_deref(), Some("+7 999 123 45 67"));
        assert_eq!(entries[1].name.as_deref(), Some("Иван П."));
    }

    #[test]
    fn plain_equals_sign_is_not_decoded() {
        let entries = parse_vcards("BEGIN:VCARD\nFN:A=B\nEND:VCARD\n");
        assert_eq!(entries[0].name.as_deref(), Some("A=B"));
    }

    fn book_file() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), BOOK).unwrap();
        file
    }

    #[tokio::test]
    async fn single_pick_keeps_first_card() {
        let file = book_file();
        let source = VcardContactSource::with_seed(file.path(), 3);
        let request = PickRequest {
            properties: vec![ContactProperty::Name],
            multiple: false,
        };
        let contacts = source.pick(&request).await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Иван Петров");
        assert_eq!(contacts[0].phone, "", "Phone was not asked for");
    }

    #[tokio::test]
    async fn unrequested_fields_are_left_out() {
        let file = book_file();
        let source = VcardContactSource::with_seed(file.path(), 3);
        let request = PickRequest {
            properties: vec![ContactProperty::Tel],
            multiple: true,
        };
        let contacts = source.pick(&request).await.unwrap();
        assert_eq!(contacts.len(), 3);
        assert_eq!(contacts[0].name, UNNAMED_CONTACT);
        assert_eq!(contacts[0].phone, "+7 999 123 45 67");
    }

    #[test]
    fn ignores_properties_outside_cards() {
        assert!(parse_vcards("FN:Stray\nTEL:123\n").is_empty());
    }
}
