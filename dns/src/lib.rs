// https://datatracker.ietf.org/doc/html/rfc1035#section-4

mod error;
mod header;
mod message;
mod name;
mod question;
mod resource_record;

pub use error::{Error, Result};
pub use header::{Header, HEADER_LEN};
pub use message::Message;
pub use name::{decode_name, domain_to_qname, Name, MAX_LABEL_LEN, MAX_NAME_LEN};
pub use question::{Question, CLASS_IN, TYPE_A};
pub use resource_record::{unix_now, ResourceRecord};
