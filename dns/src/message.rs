use crate::error::{Error, Result};
use crate::header::Header;
use crate::question::Question;
use crate::resource_record::{unix_now, ResourceRecord};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

// Header counts are untrusted until the entries are actually read.
const PREALLOCATE_LIMIT: u16 = 16;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<ResourceRecord>,
    authorities: Vec<ResourceRecord>,
    additionals: Vec<ResourceRecord>,
}

impl Message {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }

    /// A query carrying a single question.
    pub fn query(id: u16, flags: u16, question: Question) -> Self {
        let mut msg = Self::new(Header::new(id, flags));
        msg.push_question(question);
        msg
    }

    // 解析 DNS 报文, 压缩指针相对于整个报文
    pub fn parse(packet: &[u8]) -> Result<Self> {
        Self::parse_at(packet, unix_now())
    }

    pub fn parse_at(packet: &[u8], now: u64) -> Result<Self> {
        let mut reader = Cursor::new(packet);

        let header = Header::parse_from_reader(&mut reader)?;

        let mut questions = Vec::with_capacity(header.qd_count().min(PREALLOCATE_LIMIT) as usize);
        for i in 0..header.qd_count() {
            let q = Question::parse_from_reader(&mut reader)
                .map_err(|e| section_error("question", i, header.qd_count(), e))?;
            questions.push(q);
        }

        let answers = parse_records(&mut reader, "answer", header.answer_count(), now)?;
        let authorities =
            parse_records(&mut reader, "authority", header.authority_count(), now)?;
        let additionals =
            parse_records(&mut reader, "additional", header.additional_count(), now)?;

        let msg = Self {
            header,
            questions,
            answers,
            authorities,
            additionals,
        };

        Ok(msg)
    }

    /// Writes the message. Section counts in the header always follow the
    /// sections actually written.
    pub fn to_bytes(&self, bytes: &mut Vec<u8>) -> Result<()> {
        self.to_bytes_at(bytes, unix_now())
    }

    pub fn to_bytes_at(&self, bytes: &mut Vec<u8>, now: u64) -> Result<()> {
        let mut header = self.header.clone();
        header.set_counts(
            section_count(&self.questions)?,
            section_count(&self.answers)?,
            section_count(&self.authorities)?,
            section_count(&self.additionals)?,
        );
        header.to_bytes(bytes)?;

        for q in &self.questions {
            q.to_bytes(bytes)?;
        }
        for r in self.answers.iter().chain(&self.authorities).chain(&self.additionals) {
            r.to_bytes_at(bytes, now)?;
        }

        Ok(())
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(512);
        self.to_bytes(&mut bytes)?;
        Ok(bytes)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn first_question(&self) -> Option<&Question> {
        self.questions.first()
    }

    pub fn answers(&self) -> &[ResourceRecord] {
        &self.answers
    }

    pub fn authorities(&self) -> &[ResourceRecord] {
        &self.authorities
    }

    pub fn additionals(&self) -> &[ResourceRecord] {
        &self.additionals
    }

    pub fn push_question(&mut self, question: Question) {
        self.questions.push(question);
        self.refresh_counts();
    }

    pub fn push_answer(&mut self, record: ResourceRecord) {
        self.answers.push(record);
        self.refresh_counts();
    }

    fn refresh_counts(&mut self) {
        let count = |len: usize| u16::try_from(len).unwrap_or(u16::MAX);
        self.header.set_counts(
            count(self.questions.len()),
            count(self.answers.len()),
            count(self.authorities.len()),
            count(self.additionals.len()),
        );
    }
}

fn parse_records(
    reader: &mut Cursor<&[u8]>,
    section: &str,
    count: u16,
    now: u64,
) -> Result<Vec<ResourceRecord>> {
    let mut records = Vec::with_capacity(count.min(PREALLOCATE_LIMIT) as usize);
    for i in 0..count {
        let record = ResourceRecord::parse_from_reader_at(reader, now)
            .map_err(|e| section_error(section, i, count, e))?;
        records.push(record);
    }

    Ok(records)
}

fn section_error(section: &str, index: u16, count: u16, e: Error) -> Error {
    match e {
        Error::MalformedPacket(reason) => {
            Error::MalformedPacket(format!("{} {} of {}: {}", section, index + 1, count, reason))
        }
        other => other,
    }
}

fn section_count<T>(section: &[T]) -> Result<u16> {
    u16::try_from(section.len()).map_err(|_| Error::TooManyEntries(section.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;
    use crate::question::{CLASS_IN, TYPE_A};

    // dig example.com, answered by a recursive resolver
    const EXAMPLE_RESPONSE: [u8; 45] = [
        0xAB, 0xCD, 0x81, 0x80, 0, 1, 0, 1, 0, 0, 0, 0, // header
        7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, 0, 1, 0, 1, // question
        0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0x0E, 0x10, 0, 4, 93, 184, 216, 34, // answer
    ];

    #[test]
    fn parse_response_test() {
        let msg = Message::parse_at(&EXAMPLE_RESPONSE, 100).unwrap();

        assert_eq!(msg.header().id(), 0xABCD);
        assert_eq!(msg.header().flags(), 0x8180);
        assert_eq!(msg.questions().len(), 1);
        assert_eq!(msg.first_question().unwrap().domain(), "example.com");

        let answer = &msg.answers()[0];
        assert_eq!(answer.name().domain(), "example.com");
        assert_eq!(answer.ttl(), 3600);
        assert_eq!(answer.rdata(), &[93, 184, 216, 34][..]);
        assert!(msg.authorities().is_empty());
        assert!(msg.additionals().is_empty());
    }

    #[test]
    fn reencodes_response_bytes() {
        let msg = Message::parse_at(&EXAMPLE_RESPONSE, 100).unwrap();

        let mut bytes = vec![];
        msg.to_bytes_at(&mut bytes, 100).unwrap();
        assert_eq!(bytes, EXAMPLE_RESPONSE.to_vec());

        // ten seconds later the answer carries ten seconds less
        let mut bytes = vec![];
        msg.to_bytes_at(&mut bytes, 110).unwrap();
        assert_eq!(&bytes[35..39], &3590u32.to_be_bytes());
    }

    #[test]
    fn message_round_trip() {
        let mut msg = Message::query(0x0102, 0x0100, Question::a_record("example.com"));
        let record = ResourceRecord::new_at(
            Name::new("example.com"),
            TYPE_A,
            CLASS_IN,
            60,
            vec![10, 0, 0, 1],
            500,
        );
        msg.push_answer(record);

        let mut bytes = vec![];
        msg.to_bytes_at(&mut bytes, 500).unwrap();
        let decoded = Message::parse_at(&bytes, 500).unwrap();

        assert_eq!(decoded.header().qd_count(), 1);
        assert_eq!(decoded.header().answer_count(), 1);
        assert_eq!(decoded.header().authority_count(), 0);
        assert_eq!(decoded.header().additional_count(), 0);
        assert_eq!(decoded.header().id(), 0x0102);
        assert_eq!(decoded.header().flags(), 0x0100);
        assert_eq!(decoded.questions(), msg.questions());
        assert_eq!(decoded.answers(), msg.answers());
    }

    #[test]
    fn compressed_question_round_trip() {
        let mut msg = Message::query(7, 0, Question::a_record("example.com"));
        // the first question name starts right after the header
        msg.push_question(Question::new(Name::compressed("example.com", 12), 28, CLASS_IN));

        let bytes = msg.to_vec().unwrap();
        let decoded = Message::parse(&bytes).unwrap();

        let first = &decoded.questions()[0];
        let second = &decoded.questions()[1];
        assert_eq!(second.domain(), first.domain());
        assert_eq!(second.name().pointer(), Some([0xC0, 0x0C]));
        assert_eq!(second.qtype(), 28);

        assert_eq!(decoded.to_vec().unwrap(), bytes);
    }

    #[test]
    fn decodes_every_section() {
        let mut packet = Message::query(9, 0x8180, Question::a_record("example.com"))
            .to_vec()
            .unwrap();
        // one answer, one authority record, one additional record
        packet[6..12].copy_from_slice(&[0, 1, 0, 1, 0, 1]);

        let owner = Name::compressed("example.com", 12);
        let records = [
            ResourceRecord::new_at(owner, TYPE_A, CLASS_IN, 60, vec![1, 1, 1, 1], 0),
            ResourceRecord::new_at(Name::new("com"), 2, CLASS_IN, 60, vec![0], 0),
            ResourceRecord::new_at(Name::new(""), 41, 512, 0, vec![], 0),
        ];
        for r in &records {
            r.to_bytes_at(&mut packet, 0).unwrap();
        }

        let decoded = Message::parse_at(&packet, 0).unwrap();
        assert_eq!(decoded.answers(), &records[..1]);
        assert_eq!(decoded.authorities(), &records[1..2]);
        assert_eq!(decoded.additionals(), &records[2..]);
        assert_eq!(decoded.additionals()[0].name().domain(), "");

        let mut bytes = vec![];
        decoded.to_bytes_at(&mut bytes, 0).unwrap();
        assert_eq!(bytes, packet);
    }

    #[test]
    fn question_labels_survive_reencoding() {
        let header = [0x12, 0x34, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0];
        let names: [&[u8]; 2] = [&[3, b'a', b'.', b'b', 0], &[1, 0xFF, 0]];

        for name in names {
            let mut packet = header.to_vec();
            packet.extend_from_slice(name);
            packet.extend_from_slice(&[0, 1, 0, 1]);

            let msg = Message::parse(&packet).unwrap();
            assert_eq!(msg.to_vec().unwrap(), packet);
        }
    }

    #[test]
    fn section_counts_follow_sections() {
        let msg = Message::new(Header::new(1, 0));
        let bytes = msg.to_vec().unwrap();
        assert_eq!(bytes, vec![0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn missing_records_are_malformed() {
        let mut truncated = EXAMPLE_RESPONSE.to_vec();
        truncated.truncate(40);
        assert!(matches!(Message::parse(&truncated), Err(Error::MalformedPacket(_))));

        // header claims two questions but carries one
        let mut short = EXAMPLE_RESPONSE[..29].to_vec();
        short[5] = 2;
        short[7] = 0;
        assert!(matches!(Message::parse(&short), Err(Error::MalformedPacket(_))));

        assert!(matches!(Message::parse(&[0, 1, 2]), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut padded = EXAMPLE_RESPONSE.to_vec();
        padded.extend_from_slice(&[0, 0, 0]);
        let msg = Message::parse(&padded).unwrap();
        assert_eq!(msg.answers().len(), 1);
    }
}
