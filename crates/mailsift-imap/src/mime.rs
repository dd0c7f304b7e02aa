//! Raw RFC 822 message to [`MessageRecord`]
//!
//! Body selection only looks at the immediate children of a multipart root:
//! the first `text/plain` part wins, otherwise the first `text/html` part
//! that comes before any plain part. Nested multiparts (an alternative inside
//! a mixed) are not descended into.

use crate::message::{EmailAddress, MessageRecord};
use crate::{DecodeError, DecodeResult};
use base64::prelude::*;
use encoding_rs::Encoding;
use mail_parser::{Address, HeaderName, MessageParser, MessagePart, MimeHeaders, PartType};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new("<.*?>").expect("tag pattern"));

/// Decode one raw message
pub fn decode_message(raw: &[u8]) -> DecodeResult<MessageRecord> {
    if !has_header_block(raw) {
        return Err(DecodeError::MalformedEnvelope);
    }

    let message = MessageParser::default()
        .parse(raw)
        .ok_or(DecodeError::MalformedEnvelope)?;

    let mut record = MessageRecord {
        subject: message.subject().map(str::to_string),
        from: message.from().and_then(format_addresses),
        date: message
            .header_raw(HeaderName::Date)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        has_attachments: message.attachment_count() > 0,
        ..Default::default()
    };

    let root = message.root_part();
    match &root.body {
        PartType::Multipart(children) => {
            for id in children {
                let Some(part) = message.part(*id) else {
                    continue;
                };

                match mime_type(part).as_str() {
                    "text/plain" => {
                        let payload = raw_payload(raw, part);
                        record.body = decode_payload(payload, part).unwrap_or_else(|e| {
                            debug!("Falling back to undecoded text part: {}", e);
                            String::from_utf8_lossy(payload).into_owned()
                        });
                        break;
                    }
                    "text/html" => {
                        let html = decode_payload(raw_payload(raw, part), part)?;
                        record.body = strip_tags(&html);
                        record.html = Some(html);
                        break;
                    }
                    _ => {}
                }
            }
        }
        _ => {
            record.body = decode_payload(raw_payload(raw, root), root)?;
        }
    }

    Ok(record)
}

/// Remove every `<...>` sequence on a line
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// The first line must be a header field (`Name: value`)
fn has_header_block(raw: &[u8]) -> bool {
    let first_line = raw.split(|&b| b == b'\n').next().unwrap_or_default();
    let Some(colon) = first_line.iter().position(|&b| b == b':') else {
        return false;
    };
    let name = &first_line[..colon];
    !name.is_empty() && name.iter().all(|&b| b.is_ascii_graphic())
}

fn format_addresses(address: &Address<'_>) -> Option<String> {
    let addrs: Vec<EmailAddress> = match address {
        Address::List(list) => list.iter().map(to_email_address).collect(),
        Address::Group(groups) => groups
            .iter()
            .flat_map(|g| g.addresses.iter())
            .map(to_email_address)
            .collect(),
    };

    let formatted: Vec<String> = addrs
        .iter()
        .map(EmailAddress::to_display_string)
        .filter(|s| !s.is_empty())
        .collect();

    if formatted.is_empty() {
        None
    } else {
        Some(formatted.join(", "))
    }
}

fn to_email_address(addr: &mail_parser::Addr<'_>) -> EmailAddress {
    EmailAddress::new(
        addr.name().map(str::to_string),
        addr.address().unwrap_or_default().to_string(),
    )
}

/// Lowercased `type/subtype`; a part without Content-Type is `text/plain`
fn mime_type(part: &MessagePart<'_>) -> String {
    match part.content_type() {
        Some(ct) => format!("{}/{}", ct.ctype(), ct.subtype().unwrap_or_default())
            .to_ascii_lowercase(),
        None => "text/plain".to_string(),
    }
}

/// Body bytes of a part exactly as they appear in the message
///
/// The line break before a boundary delimiter is already left out.
fn raw_payload<'a>(raw: &'a [u8], part: &MessagePart<'_>) -> &'a [u8] {
    let start = (part.raw_body_offset() as usize).min(raw.len());
    let end = (part.raw_end_offset() as usize).clamp(start, raw.len());
    &raw[start..end]
}

/// Undo the transfer encoding, then decode strictly with the declared charset
fn decode_payload(payload: &[u8], part: &MessagePart<'_>) -> DecodeResult<String> {
    let bytes = transfer_decode(payload, part.content_transfer_encoding())?;
    let charset = part.content_type().and_then(|ct| ct.attribute("charset"));
    charset_decode(&bytes, charset)
}

fn transfer_decode<'a>(payload: &'a [u8], encoding: Option<&str>) -> DecodeResult<Cow<'a, [u8]>> {
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        Some("base64") => {
            let compact: Vec<u8> = payload
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            BASE64_STANDARD
                .decode(compact)
                .map(Cow::Owned)
                .map_err(|_| DecodeError::InvalidTransferEncoding("base64".to_string()))
        }
        Some("quoted-printable") => Ok(Cow::Owned(qp_decode(payload))),
        _ => Ok(Cow::Borrowed(payload)),
    }
}

/// Strict charset decoding; a missing charset is read as UTF-8
fn charset_decode(bytes: &[u8], charset: Option<&str>) -> DecodeResult<String> {
    let label = charset
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("utf-8");

    let encoding = Encoding::for_label_no_replacement(label.as_bytes())
        .ok_or_else(|| DecodeError::UnsupportedCharset(label.to_string()))?;

    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| DecodeError::InvalidText(encoding.name().to_string()))
}

/// Quoted-printable decoding (RFC 2045)
///
/// Soft line breaks are dropped for both CRLF and LF endings. Malformed
/// escapes are passed through untouched.
fn qp_decode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] != b'=' {
            out.push(input[i]);
            i += 1;
            continue;
        }

        let rest = &input[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
        } else if rest.starts_with(b"\n") {
            i += 2;
        } else if let Some(byte) = rest
            .get(..2)
            .and_then(|hex| Some(hex_value(hex[0])? << 4 | hex_value(hex[1])?))
        {
            out.push(byte);
            i += 3;
        } else {
            out.push(b'=');
            i += 1;
        }
    }

    out
}

fn hex_value(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|v| v as u8)
}
