//! MARC 21 XML (`of=xm`) parsing for UN Digital Library search responses.
//!
//! A search returns a `<collection>` of `<record>`s. For each record:
//!
//! - tag 191 `$a` holds the record's document symbol
//! - tag 993 `$a` holds cross-referenced symbols (drafts, meeting records,
//!   reports)
//!
//! Only the record whose 191 `$a` matches the requested symbol
//! (case-insensitive) is used; the search may return neighbours.

use draftlink_core::{RegistryRecord, normalize_symbol};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

const SYMBOL_TAG: &str = "191";
const XREF_TAG: &str = "993";

#[derive(Error, Debug)]
pub enum MarcError {
    #[error("malformed MARC XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

#[derive(Default)]
struct RecordState {
    symbol: Option<String>,
    related: Vec<String>,
}

/// Parse a MARC XML response and return the record for `target`.
///
/// `Ok(None)` when the response is well-formed but holds no record for the
/// symbol.
pub fn parse_marc_xml(xml: &str, target: &str) -> Result<Option<RegistryRecord>, MarcError> {
    let target_key = normalize_symbol(target);
    let mut reader = Reader::from_str(xml);

    let mut record: Option<RecordState> = None;
    let mut tag: Option<String> = None;
    let mut code: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"record" => record = Some(RecordState::default()),
                b"datafield" => tag = attr(&e, "tag")?,
                b"subfield" => {
                    code = attr(&e, "code")?;
                    text.clear();
                }
                _ => {}
            },
            Event::Text(t) if code.is_some() => text.push_str(&t.unescape()?),
            Event::CData(c) if code.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()))
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"subfield" => {
                    if let Some(state) = record.as_mut()
                        && code.as_deref() == Some("a")
                    {
                        let value = text.trim();
                        match tag.as_deref() {
                            Some(SYMBOL_TAG) if state.symbol.is_none() && !value.is_empty() => {
                                state.symbol = Some(value.to_string())
                            }
                            Some(XREF_TAG) if !value.is_empty() => {
                                state.related.push(value.to_string())
                            }
                            _ => {}
                        }
                    }
                    code = None;
                    text.clear();
                }
                b"datafield" => tag = None,
                b"record" => {
                    if let Some(state) = record.take()
                        && state
                            .symbol
                            .as_deref()
                            .is_some_and(|s| normalize_symbol(s) == target_key)
                    {
                        return Ok(Some(RegistryRecord::from_related(target, state.related)));
                    }
                }
                _ => {}
            },
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, quick_xml::Error> {
    match e.try_get_attribute(name)? {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}
