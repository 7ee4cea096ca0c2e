//! DNS Message Builder
//!
//! Constructs query messages in wire format using `hickory-proto`.

use super::record_type_map::RecordTypeMapper;
use dnsbatch_domain::{DomainError, RecordType};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::str::FromStr;

pub struct MessageBuilder;

impl MessageBuilder {
    /// Builds a recursive query for `domain` and returns its id with the
    /// serialized bytes.
    ///
    /// `domain` is expected to be fully qualified already.
    pub fn build_query(
        domain: &str,
        record_type: RecordType,
    ) -> Result<(u16, Vec<u8>), DomainError> {
        let name = Self::parse_name(domain)?;

        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(RecordTypeMapper::to_hickory(record_type));
        query.set_query_class(DNSClass::IN);

        let id = fastrand::u16(..);
        let mut message = Message::new(id, MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        Ok((id, Self::serialize_message(&message)?))
    }

    /// Parses `domain` the way it will be put on the wire.
    pub fn parse_name(domain: &str) -> Result<Name, DomainError> {
        Name::from_str(domain).map_err(|e| {
            DomainError::InvalidDomainName(format!("Invalid domain '{}': {}", domain, e))
        })
    }

    fn serialize_message(message: &Message) -> Result<Vec<u8>, DomainError> {
        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);

        message.emit(&mut encoder).map_err(|e| {
            DomainError::InvalidDomainName(format!("Failed to serialize DNS message: {}", e))
        })?;

        Ok(buf)
    }
}
