// Copyright 2026 `fileupload` Crate Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//! Part header parsing.

use httparse::{self, Status, EMPTY_HEADER};

use mime::{self, Mime};

use percent_encoding::percent_decode_str;

use crate::error::{Error, Result};

use std::str;

/// More headers than this in one part is treated as malformed.
const MAX_PART_HEADERS: usize = 64;

/// The character set used to decode header bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8; invalid sequences are replaced with U+FFFD.
    Utf8,
    /// ISO-8859-1, mapping every byte to the code point of the same value.
    Latin1,
}

impl Charset {
    /// Look up a charset by its IANA label. Unknown labels fall back to UTF-8.
    pub fn from_label(label: &str) -> Charset {
        match &*label.trim().to_ascii_lowercase() {
            "utf-8" | "utf8" => Charset::Utf8,
            "iso-8859-1" | "iso8859-1" | "latin1" | "l1" | "us-ascii" => Charset::Latin1,
            other => {
                warn!("unsupported header charset {:?}, using UTF-8", other);
                Charset::Utf8
            }
        }
    }

    /// Decode `bytes` into a string.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset::Utf8
    }
}

/// The headers of one part, in the order they appeared.
///
/// Header names are matched case-insensitively.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartHeaders {
    entries: Vec<(String, String)>,
}

impl PartHeaders {
    /// Parse a raw header section as returned by `MultipartStream::read_headers()`.
    ///
    /// Continuation lines (starting with a space or tab) are joined to the previous line with a
    /// single space. Lines without a colon are skipped.
    pub fn parse(raw: &[u8], charset: Charset) -> Result<PartHeaders> {
        let unfolded = unfold(raw);
        let mut raw_headers = [EMPTY_HEADER; MAX_PART_HEADERS];

        let entries = match httparse::parse_headers(&unfolded, &mut raw_headers) {
            Ok(Status::Complete((_, parsed))) => parsed.iter()
                .map(|header| (header.name.to_owned(), charset.decode(header.value).trim().to_owned()))
                .collect(),
            Ok(Status::Partial) => return Err(Error::malformed("part headers are not terminated")),
            Err(httparse::Error::TooManyHeaders) => {
                return Err(Error::malformed(format!("more than {} part headers", MAX_PART_HEADERS)))
            }
            Err(err) => {
                warn!("lenient header parsing after httparse error: {}", err);
                parse_lenient(&unfolded, charset)
            }
        };

        let headers = PartHeaders { entries: entries };
        debug!("parsed part headers: {:?}", headers);
        Ok(headers)
    }

    /// The first value of the header `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter()
            .find(|&&(ref key, _)| key.eq_ignore_ascii_case(name))
            .map(|&(_, ref val)| &**val)
    }

    /// Every value of the header `name`, in order.
    pub fn get_all<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a str> + 'n
        where 'a: 'n {
        self.entries.iter()
            .filter(move |&&(ref key, _)| key.eq_ignore_ascii_case(name))
            .map(|&(_, ref val)| &**val)
    }

    /// The distinct header names, in order of first appearance.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();

        for &(ref key, _) in &self.entries {
            if !names.iter().any(|seen| seen.eq_ignore_ascii_case(key)) {
                names.push(key);
            }
        }

        names
    }

    /// The number of header lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The parsed `Content-Disposition` header.
    pub fn content_disposition(&self) -> Option<ContentDisposition> {
        self.get("Content-Disposition").map(ContentDisposition::parse)
    }

    /// The raw `Content-Type` header.
    pub fn content_type_str(&self) -> Option<&str> {
        self.get("Content-Type")
    }

    /// The `Content-Type` header parsed as a MIME type.
    pub fn content_type(&self) -> Option<Mime> {
        self.content_type_str().and_then(|val| match val.parse::<Mime>() {
            Ok(mime) => Some(mime),
            Err(err) => {
                debug!("unparseable Content-Type {:?}: {}", val, err);
                None
            }
        })
    }

    /// The declared `Content-Length` of the part body.
    pub fn content_length(&self) -> Option<u64> {
        self.get("Content-Length").and_then(|val| val.parse().ok())
    }

    /// The form field name, if the disposition is `form-data`.
    pub fn field_name(&self) -> Option<String> {
        self.content_disposition()
            .filter(ContentDisposition::is_form_data)
            .and_then(|disp| disp.field_name().map(str::to_owned))
    }

    /// The file name, if the disposition is `form-data` or `attachment`.
    ///
    /// `Some("")` means the part is a file whose name was left empty.
    pub fn file_name(&self) -> Option<String> {
        self.content_disposition()
            .filter(|disp| disp.is_form_data() || disp.is_attachment())
            .and_then(|disp| disp.file_name().map(str::to_owned))
    }
}

/// A parsed `Content-Disposition` header value.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentDisposition {
    disposition: String,
    params: Vec<(String, String)>,
}

impl ContentDisposition {
    /// Parse a header value such as `form-data; name="field"; filename="a.txt"`.
    pub fn parse(value: &str) -> ContentDisposition {
        let mut params = split_params(value).into_iter();
        let disposition = params.next().map_or(String::new(), |(key, _)| key);

        let mut disp = ContentDisposition {
            disposition: disposition,
            params: Vec::new(),
        };

        let mut extended = Vec::new();

        for (key, val) in params {
            if key.ends_with('*') {
                match decode_ext_value(&val) {
                    Some(decoded) => extended.push((key[..key.len() - 1].to_owned(), decoded)),
                    None => debug!("undecodable extended parameter {}={:?}", key, val),
                }
            } else {
                disp.params.push((key, val));
            }
        }

        // `name*=charset''value` overrides `name=value`
        for (key, val) in extended {
            disp.params.retain(|&(ref existing, _)| *existing != key);
            disp.params.push((key, val));
        }

        disp
    }

    /// The disposition type in lowercase, e.g. `form-data`.
    pub fn disposition_type(&self) -> &str {
        &self.disposition
    }

    /// `true` for `form-data`.
    pub fn is_form_data(&self) -> bool {
        self.disposition == "form-data"
    }

    /// `true` for `attachment`.
    pub fn is_attachment(&self) -> bool {
        self.disposition == "attachment"
    }

    /// A parameter by case-insensitive name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter()
            .find(|&&(ref key, _)| key.eq_ignore_ascii_case(name))
            .map(|&(_, ref val)| &**val)
    }

    /// The `name` parameter.
    pub fn field_name(&self) -> Option<&str> {
        self.param("name")
    }

    /// The trimmed `filename` parameter.
    pub fn file_name(&self) -> Option<&str> {
        self.param("filename").map(str::trim)
    }
}

/// Extract the boundary token from a request `Content-Type` such as
/// `multipart/form-data; boundary=----1234`.
pub fn boundary_from_content_type(content_type: &str) -> Result<Vec<u8>> {
    let mime: Mime = content_type.parse()
        .map_err(|err| Error::InvalidContentType(format!("{:?}: {}", content_type, err)))?;

    if mime.type_() != mime::MULTIPART {
        return Err(Error::InvalidContentType(format!(
            "the request doesn't contain a multipart stream, content type is {:?}", content_type
        )));
    }

    let boundary = mime.get_param(mime::BOUNDARY).map(|val| trim_quotes(val.as_str()));

    match boundary {
        Some(boundary) if !boundary.is_empty() => Ok(boundary.as_bytes().to_vec()),
        _ => Err(Error::InvalidContentType(format!(
            "the request was rejected because no multipart boundary was found in {:?}", content_type
        ))),
    }
}

/// `true` if the MIME type is `multipart/mixed`.
pub fn is_multipart_mixed(mime: &Mime) -> bool {
    mime.type_() == mime::MULTIPART && mime.subtype().as_str().eq_ignore_ascii_case("mixed")
}

fn trim_quotes(s: &str) -> &str {
    s.trim_matches('"')
}

/// Join continuation lines and normalize to one header per line.
fn unfold(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut idx = 0;

    while idx < raw.len() {
        let is_fold = raw[idx] == b'\r'
            && raw.get(idx + 1) == Some(&b'\n')
            && raw.get(idx + 2).map_or(false, |&b| b == b' ' || b == b'\t');

        if is_fold {
            idx += 2;
            while idx < raw.len() && (raw[idx] == b' ' || raw[idx] == b'\t') {
                idx += 1;
            }
            out.push(b' ');
        } else {
            out.push(raw[idx]);
            idx += 1;
        }
    }

    out
}

fn parse_lenient(unfolded: &[u8], charset: Charset) -> Vec<(String, String)> {
    let text = charset.decode(unfolded);

    text.split("\r\n")
        .take_while(|line| !line.is_empty())
        .filter_map(|line| match line.find(':') {
            Some(colon) => Some((line[..colon].trim().to_owned(), line[colon + 1..].trim().to_owned())),
            None => {
                debug!("skipping malformed header line {:?}", line);
                None
            }
        })
        .collect()
}

/// Split `value` at unquoted semicolons into lowercase-keyed `key=value` pairs.
///
/// Quotes around values are removed. A backslash keeps the following quote from ending the
/// value but is itself kept, so unescaped Windows paths survive.
fn split_params(value: &str) -> Vec<(String, String)> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in value.chars() {
        if ch == '"' && !escaped {
            in_quotes = !in_quotes;
        }

        if ch == ';' && !in_quotes {
            segments.push(current);
            current = String::new();
        } else {
            current.push(ch);
        }

        escaped = !escaped && ch == '\\';
    }

    segments.push(current);

    segments.iter()
        .map(|segment| segment.trim())
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.find('=') {
            Some(eq) => (segment[..eq].trim().to_ascii_lowercase(), unquote(segment[eq + 1..].trim())),
            None => (segment.to_ascii_lowercase(), String::new()),
        })
        .collect()
}

fn unquote(val: &str) -> String {
    if val.len() >= 2 && val.starts_with('"') && val.ends_with('"') {
        val[1..val.len() - 1].to_owned()
    } else {
        trim_quotes(val).to_owned()
    }
}

/// Decode an RFC 2231 extended value: `charset'language'percent-encoded`.
fn decode_ext_value(val: &str) -> Option<String> {
    let mut parts = val.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;

    let bytes: Vec<u8> = percent_decode_str(encoded).collect();

    if charset.is_empty() {
        return Some(Charset::Latin1.decode(&bytes));
    }

    match &*charset.to_ascii_lowercase() {
        "utf-8" => str::from_utf8(&bytes).ok().map(str::to_owned),
        "iso-8859-1" | "us-ascii" => Some(Charset::Latin1.decode(&bytes)),
        _ => None,
    }
}
