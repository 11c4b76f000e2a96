//! Domain names in their presentation format.
//!
//! The resolvers keep host names as plain strings all the way down to the
//! wire resolver. This module contains the helpers to check such strings for
//! being valid domain names, to make them absolute, to combine them with a
//! search suffix and, finally, to convert them into their wire format.
//!
//! Presentation format follows [RFC 1035] section 5.1: labels are separated
//! by dots, a backslash followed by a non-digit escapes that character, and
//! a backslash followed by three decimal digits gives the octet with that
//! value.
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035

use core::fmt;

/// The maximum length of a single label in octets.
pub const MAX_LABEL_LEN: usize = 63;

/// The maximum length of a domain name in wire format.
pub const MAX_NAME_LEN: usize = 255;

//------------ Conversion ----------------------------------------------------

/// Converts a name in presentation format into uncompressed wire format.
///
/// Relative names are treated as if they were absolute, i.e., the returned
/// wire format always ends in the root label.
pub fn to_wire(name: &str) -> Result<Vec<u8>, NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name == "." {
        return Ok(vec![0]);
    }

    let mut res = Vec::with_capacity(name.len() + 2);
    let mut label = Vec::with_capacity(MAX_LABEL_LEN);
    let mut chars = name.bytes();
    while let Some(ch) = chars.next() {
        match ch {
            b'.' => {
                if label.is_empty() {
                    return Err(NameError::EmptyLabel);
                }
                push_label(&mut res, &label)?;
                label.clear();
            }
            b'\\' => {
                let ch = chars.next().ok_or(NameError::BadEscape)?;
                if ch.is_ascii_digit() {
                    let mut value = u32::from(ch - b'0');
                    for _ in 0..2 {
                        match chars.next() {
                            Some(ch) if ch.is_ascii_digit() => {
                                value = value * 10 + u32::from(ch - b'0');
                            }
                            _ => return Err(NameError::BadEscape),
                        }
                    }
                    let value = u8::try_from(value)
                        .map_err(|_| NameError::BadEscape)?;
                    label.push(value);
                } else {
                    label.push(ch)
                }
            }
            _ => label.push(ch),
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(NameError::LongLabel);
        }
    }
    if !label.is_empty() {
        push_label(&mut res, &label)?;
    }
    res.push(0);
    if res.len() > MAX_NAME_LEN {
        return Err(NameError::LongName);
    }
    Ok(res)
}

fn push_label(target: &mut Vec<u8>, label: &[u8]) -> Result<(), NameError> {
    if label.len() > MAX_LABEL_LEN {
        return Err(NameError::LongLabel);
    }
    target.push(label.len() as u8);
    target.extend_from_slice(label);
    if target.len() >= MAX_NAME_LEN {
        return Err(NameError::LongName);
    }
    Ok(())
}

/// Returns whether `name` is a syntactically valid domain name.
pub fn is_domain_name(name: &str) -> bool {
    to_wire(name).is_ok()
}

//------------ Absolute Names ------------------------------------------------

/// Returns whether the name ends in an unescaped dot.
pub fn is_fqdn(name: &str) -> bool {
    let Some(head) = name.strip_suffix('.') else {
        return false;
    };
    let escapes = head.bytes().rev().take_while(|&ch| ch == b'\\').count();
    escapes % 2 == 0
}

/// Returns the absolute form of a name by appending a dot if needed.
pub fn fqdn(name: &str) -> String {
    if is_fqdn(name) {
        name.into()
    } else {
        format!("{}.", name)
    }
}

/// Returns the canonical form of a name: absolute and ASCII lowercase.
pub fn canonical(name: &str) -> String {
    fqdn(&name.to_ascii_lowercase())
}

/// Splits a name into its labels, honouring escaped dots.
///
/// The root label is not included, so both `"."` and `""` result in an
/// empty list.
pub fn labels(name: &str) -> Vec<&str> {
    let mut res = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (pos, ch) in name.bytes().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            b'\\' => escaped = true,
            b'.' => {
                if pos > start {
                    res.push(&name[start..pos]);
                }
                start = pos + 1;
            }
            _ => {}
        }
    }
    if start < name.len() {
        res.push(&name[start..]);
    }
    res
}

/// Appends `suffix` to `host`, returning the canonical result.
///
/// A suffix of `"."` results in the host itself made absolute.
pub fn join(host: &str, suffix: &str) -> String {
    let mut all = labels(host);
    all.extend(labels(suffix));
    canonical(&all.join("."))
}

//------------ NameError -----------------------------------------------------

/// A string could not be converted into a domain name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameError {
    /// The name was empty.
    Empty,

    /// The name contained an empty label.
    EmptyLabel,

    /// A label was longer than 63 octets.
    LongLabel,

    /// The name was longer than 255 octets.
    LongName,

    /// An escape sequence was incomplete or out of range.
    BadEscape,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            NameError::Empty => "empty domain name",
            NameError::EmptyLabel => "empty label",
            NameError::LongLabel => "label too long",
            NameError::LongName => "domain name too long",
            NameError::BadEscape => "invalid escape sequence",
        })
    }
}

impl std::error::Error for NameError {}

//============ Testing =======================================================
