use crate::error::Result;
use crate::name::Name;
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

pub const TYPE_A: u16 = 1;
pub const CLASS_IN: u16 = 1;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Question {
    name: Name,
    qtype: u16,
    qclass: u16,
}

impl Question {
    pub fn new(name: Name, qtype: u16, qclass: u16) -> Self {
        Self { name, qtype, qclass }
    }

    pub fn a_record(domain: &str) -> Self {
        Self::new(Name::new(domain), TYPE_A, CLASS_IN)
    }

    pub fn to_bytes(&self, bytes: &mut Vec<u8>) -> Result<()> {
        self.name.to_bytes(bytes)?;

        bytes.write_u16::<BE>(self.qtype)?;
        bytes.write_u16::<BE>(self.qclass)?;

        Ok(())
    }

    pub fn parse_from_reader(rdr: &mut Cursor<&[u8]>) -> Result<Self> {
        let name = Name::parse_from_reader(rdr)?;

        let qtype = rdr.read_u16::<BE>()?;
        let qclass = rdr.read_u16::<BE>()?;

        let q = Self { name, qtype, qclass };

        Ok(q)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn domain(&self) -> &str {
        self.name.domain()
    }

    pub fn qtype(&self) -> u16 {
        self.qtype
    }

    pub fn qclass(&self) -> u16 {
        self.qclass
    }
}
