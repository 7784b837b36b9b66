use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

pub const MAX_LABEL_LEN: usize = 63;

// https://datatracker.ietf.org/doc/html/rfc1035#section-2.3.4
pub const MAX_NAME_LEN: usize = 255;

// A legitimate name is rarely more than a few hops away from its literal
// labels; anything deeper is treated as a loop.
const MAX_POINTER_HOPS: usize = 32;

const POINTER_TAG: u8 = 0b1100_0000;
const OFFSET_MASK: u16 = 0x3FFF;

/// A domain name as carried on the wire.
///
/// The labels are kept as the raw bytes received, so a decoded name is
/// written back unchanged even when a label holds a '.' or bytes that are not
/// UTF-8. `domain()` is the dotted text form, with such bytes escaped.
///
/// A name read through a compression pointer keeps its own raw bytes (any
/// leading labels plus the pointer), so that writing it again reproduces the
/// pointer rather than the spelled-out labels and the offsets of everything
/// after it stay the same.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Name {
    labels: Vec<Vec<u8>>,
    domain: String,
    compressed: Option<Vec<u8>>,
}

impl Name {
    pub fn new(domain: &str) -> Self {
        Self {
            labels: split_domain(domain),
            domain: domain.to_string(),
            compressed: None,
        }
    }

    /// A name that is written as a pointer to `offset` in the enclosing packet.
    pub fn compressed(domain: &str, offset: u16) -> Self {
        let offset = offset & OFFSET_MASK;
        let pointer = [POINTER_TAG | (offset >> 8) as u8, (offset & 0xFF) as u8];

        Self {
            labels: split_domain(domain),
            domain: domain.to_string(),
            compressed: Some(pointer.to_vec()),
        }
    }

    fn from_labels(labels: Vec<Vec<u8>>, compressed: Option<Vec<u8>>) -> Self {
        Self {
            domain: presentation(&labels),
            labels,
            compressed,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The pointer bytes when the name is nothing but a pointer.
    pub fn pointer(&self) -> Option<[u8; 2]> {
        match self.compressed.as_deref() {
            Some(&[high, low]) => Some([high, low]),
            _ => None,
        }
    }

    pub fn to_bytes(&self, bytes: &mut Vec<u8>) -> Result<()> {
        match &self.compressed {
            Some(raw) => bytes.extend_from_slice(raw),
            None => bytes.extend(encode_labels(&self.labels, &self.domain)?),
        }

        Ok(())
    }

    /// Reads a name at the reader's position. Pointers are resolved against
    /// the whole buffer behind the cursor.
    pub fn parse_from_reader(rdr: &mut Cursor<&[u8]>) -> Result<Self> {
        let packet: &[u8] = *rdr.get_ref();
        let (name, next) = decode_name(packet, rdr.position() as usize)?;
        rdr.set_position(next as u64);

        Ok(name)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.domain)
    }
}

fn split_domain(domain: &str) -> Vec<Vec<u8>> {
    let trimmed = domain.strip_suffix('.').unwrap_or(domain);
    if trimmed.is_empty() {
        return vec![];
    }

    trimmed.split('.').map(|label| label.as_bytes().to_vec()).collect()
}

// Dotted text for a label sequence. '.' and '\' inside a label are
// backslash-escaped, and bytes outside printable ASCII become \DDD.
fn presentation(labels: &[Vec<u8>]) -> String {
    let mut text = String::new();

    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            text.push('.');
        }
        for &b in label {
            match b {
                b'.' | b'\\' => {
                    text.push('\\');
                    text.push(b as char);
                }
                0x21..=0x7E => text.push(b as char),
                _ => text.push_str(&format!("\\{:03}", b)),
            }
        }
    }

    text
}

fn encode_labels(labels: &[Vec<u8>], domain: &str) -> Result<Vec<u8>> {
    let mut qname: Vec<u8> = Vec::with_capacity(domain.len() + 2);

    for label in labels {
        if label.is_empty() {
            return Err(Error::InvalidName(domain.to_string()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong(label.len()));
        }

        qname.push(label.len() as u8);
        qname.extend_from_slice(label);
    }

    qname.push(0);

    if qname.len() > MAX_NAME_LEN {
        return Err(Error::InvalidName(domain.to_string()));
    }

    Ok(qname)
}

// Turns a dotted domain into length-prefixed labels followed by a zero byte.
pub fn domain_to_qname(domain: &str) -> Result<Vec<u8>> {
    encode_labels(&split_domain(domain), domain)
}

/// Decodes the name starting at `offset` in `packet`.
///
/// Returns the name and the offset just past the name's own bytes: two bytes
/// after a pointer, one byte after the terminating zero otherwise. Every
/// pointer must point strictly before itself and at most `MAX_POINTER_HOPS`
/// are followed.
pub fn decode_name(packet: &[u8], offset: usize) -> Result<(Name, usize)> {
    let mut labels: Vec<Vec<u8>> = Vec::new();
    let mut wire_len = 1;
    let mut pos = offset;
    let mut resume_at: Option<usize> = None;
    let mut hops = 0;

    loop {
        let len_byte = *packet
            .get(pos)
            .ok_or_else(|| Error::malformed(format!("name runs past end of packet at {}", pos)))?;

        match len_byte & POINTER_TAG {
            0 if len_byte == 0 => {
                pos += 1;
                break;
            }
            0 => {
                let label_len = len_byte as usize;
                let begin = pos + 1;
                let end = begin + label_len;
                let label_bytes = packet.get(begin..end).ok_or_else(|| {
                    Error::malformed(format!("label at {} runs past end of packet", pos))
                })?;

                wire_len += label_len + 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(Error::malformed(format!(
                        "name at {} is longer than {} bytes",
                        offset, MAX_NAME_LEN
                    )));
                }

                labels.push(label_bytes.to_vec());
                pos = end;
            }
            POINTER_TAG => {
                let low = *packet
                    .get(pos + 1)
                    .ok_or_else(|| Error::malformed(format!("pointer at {} is cut short", pos)))?;
                let target = (u16::from_be_bytes([len_byte, low]) & OFFSET_MASK) as usize;

                if target >= pos {
                    return Err(Error::malformed(format!(
                        "pointer at {} points forward to {}",
                        pos, target
                    )));
                }

                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    let reason = format!("pointer chain from {} is too long", offset);
                    return Err(Error::malformed(reason));
                }

                if resume_at.is_none() {
                    resume_at = Some(pos + 2);
                }

                pos = target;
            }
            _ => {
                return Err(Error::malformed(format!(
                    "unsupported label type {:#04x} at {}",
                    len_byte, pos
                )));
            }
        }
    }

    let (next, compressed) = match resume_at {
        Some(next) => (next, Some(packet[offset..next].to_vec())),
        None => (pos, None),
    };

    Ok((Name::from_labels(labels, compressed), next))
}
