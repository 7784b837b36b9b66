use crate::error::{Error, Result};
use crate::name::Name;
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::time::{SystemTime, UNIX_EPOCH};

// https://datatracker.ietf.org/doc/html/rfc2181#section-8
//
// Values with the most significant bit set are treated as zero.
const MAX_TTL: u32 = i32::MAX as u32;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    name: Name,
    rtype: u16,
    rclass: u16,
    ttl: u32,
    rdata: Vec<u8>,
    expires_at: u64, // unix seconds
}

impl ResourceRecord {
    pub fn new(name: Name, rtype: u16, rclass: u16, ttl: u32, rdata: Vec<u8>) -> Self {
        Self::new_at(name, rtype, rclass, ttl, rdata, unix_now())
    }

    pub fn new_at(name: Name, rtype: u16, rclass: u16, ttl: u32, rdata: Vec<u8>, now: u64) -> Self {
        let ttl = if ttl > MAX_TTL { 0 } else { ttl };

        Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
            expires_at: now + u64::from(ttl),
        }
    }

    pub fn to_bytes(&self, bytes: &mut Vec<u8>) -> Result<()> {
        self.to_bytes_at(bytes, unix_now())
    }

    /// Writes the record with the TTL that remains at `now`.
    pub fn to_bytes_at(&self, bytes: &mut Vec<u8>, now: u64) -> Result<()> {
        let rdlength = u16::try_from(self.rdata.len())
            .map_err(|_| Error::DataTooLong(self.rdata.len()))?;

        self.name.to_bytes(bytes)?;
        bytes.write_u16::<BE>(self.rtype)?;
        bytes.write_u16::<BE>(self.rclass)?;
        bytes.write_u32::<BE>(self.remaining_ttl(now))?;
        bytes.write_u16::<BE>(rdlength)?;
        bytes.extend_from_slice(&self.rdata);

        Ok(())
    }

    pub fn parse_from_reader(rdr: &mut Cursor<&[u8]>) -> Result<Self> {
        Self::parse_from_reader_at(rdr, unix_now())
    }

    pub fn parse_from_reader_at(rdr: &mut Cursor<&[u8]>, now: u64) -> Result<Self> {
        let name = Name::parse_from_reader(rdr)?;
        let rtype = rdr.read_u16::<BE>()?;
        let rclass = rdr.read_u16::<BE>()?;
        let ttl = rdr.read_u32::<BE>()?;
        let rdlength = rdr.read_u16::<BE>()?;

        let mut rdata = vec![0; rdlength as usize];
        rdr.read_exact(&mut rdata)?;

        Ok(Self::new_at(name, rtype, rclass, ttl, rdata, now))
    }

    pub fn remaining_ttl(&self, now: u64) -> u32 {
        // expires_at - now never exceeds the original TTL, which fits in u32
        self.expires_at.saturating_sub(now) as u32
    }

    /// A zero TTL marks a record meant for this answer only.
    pub fn is_one_off(&self) -> bool {
        self.ttl == 0
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn rtype(&self) -> u16 {
        self.rtype
    }

    pub fn rclass(&self) -> u16 {
        self.rclass
    }

    /// The TTL as it was received.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn rdata(&self) -> &[u8] {
        &self.rdata
    }

    pub fn rdlength(&self) -> usize {
        self.rdata.len()
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
