use dnsbatch_domain::{DomainError, RecordType};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::{Name, RData};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DnsResponse {
    pub id: u16,

    pub rcode: ResponseCode,

    pub truncated: bool,

    pub message: Message,
}

impl DnsResponse {
    /// Normalized answers of `record_type`, in the order the server sent them.
    ///
    /// Records of other types in the answer section (a CNAME preceding the A
    /// records it points to, for instance) are skipped.
    pub fn answers(&self, record_type: RecordType) -> Vec<String> {
        let mut out = Vec::new();

        for record in self.message.answers() {
            match (record_type, record.data()) {
                (RecordType::A, RData::A(a)) => out.push(a.0.to_string()),
                (RecordType::AAAA, RData::AAAA(aaaa)) => out.push(aaaa.0.to_string()),
                (RecordType::NS, RData::NS(ns)) => out.push(host(&ns.0)),
                (RecordType::MX, RData::MX(mx)) => out.push(host(mx.exchange())),
                (RecordType::SRV, RData::SRV(srv)) => out.push(host(srv.target())),
                (RecordType::CNAME, RData::CNAME(cname)) => out.push(host(&cname.0)),
                (RecordType::PTR, RData::PTR(ptr)) => out.push(host(&ptr.0)),
                (RecordType::TXT, RData::TXT(txt)) => {
                    out.extend(txt.txt_data().iter().map(|segment| txt_segment(segment)))
                }
                _ => {}
            }
        }

        out
    }
}

/// Host field without the surrounding root separators.
fn host(name: &Name) -> String {
    name.to_utf8().trim_matches('.').to_string()
}

/// TXT character-string as text. UTF-8 is kept as is, backslashes are
/// doubled, and control characters and stray bytes become `\DDD` escapes.
fn txt_segment(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;

    while !rest.is_empty() {
        let (valid, invalid) = match std::str::from_utf8(rest) {
            Ok(text) => (text, 0),
            Err(e) => {
                let (head, _) = rest.split_at(e.valid_up_to());
                let bad = e.error_len().unwrap_or(rest.len() - e.valid_up_to());
                // `head` was just validated.
                (std::str::from_utf8(head).unwrap_or_default(), bad)
            }
        };

        for ch in valid.chars() {
            if ch == '\\' {
                out.push_str("\\\\");
            } else if ch.is_control() {
                let mut buf = [0u8; 4];
                for byte in ch.encode_utf8(&mut buf).bytes() {
                    push_escaped(&mut out, byte);
                }
            } else {
                out.push(ch);
            }
        }

        let consumed = valid.len();
        for &byte in &rest[consumed..consumed + invalid] {
            push_escaped(&mut out, byte);
        }
        rest = &rest[consumed + invalid..];
    }

    out
}

fn push_escaped(out: &mut String, byte: u8) {
    out.push_str(&format!("\\{byte:03}"));
}

pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(response_bytes: &[u8]) -> Result<DnsResponse, DomainError> {
        let message = Message::from_vec(response_bytes).map_err(|e| {
            DomainError::InvalidDnsResponse(format!("Failed to parse DNS response: {}", e))
        })?;

        let rcode = message.response_code();
        let truncated = message.truncated();

        debug!(
            rcode = Self::rcode_to_status(rcode),
            answers = message.answers().len(),
            truncated = truncated,
            "DNS response parsed"
        );

        Ok(DnsResponse {
            id: message.id(),
            rcode,
            truncated,
            message,
        })
    }

    pub fn rcode_to_status(rcode: ResponseCode) -> &'static str {
        match rcode {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::NXDomain => "NXDOMAIN",
            ResponseCode::ServFail => "SERVFAIL",
            ResponseCode::Refused => "REFUSED",
            ResponseCode::NotImp => "NOTIMP",
            ResponseCode::FormErr => "FORMERR",
            _ => "UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{MessageType, OpCode};
    use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR, SRV, TXT};
    use hickory_proto::rr::Record;
    use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::str::FromStr;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn response_with(records: Vec<RData>) -> DnsResponse {
        let mut message = Message::new(42, MessageType::Response, OpCode::Query);
        for rdata in records {
            message.add_answer(Record::from_rdata(name("example.com."), 60, rdata));
        }

        let mut buf = Vec::new();
        let mut encoder = BinEncoder::new(&mut buf);
        message.emit(&mut encoder).unwrap();
        ResponseParser::parse(&buf).unwrap()
    }

    #[test]
    fn test_a_records_keep_server_order() {
        let response = response_with(vec![
            RData::A(A(Ipv4Addr::new(8, 8, 8, 8))),
            RData::A(A(Ipv4Addr::new(8, 8, 4, 4))),
        ]);
        assert_eq!(response.id, 42);
        assert_eq!(response.answers(RecordType::A), vec!["8.8.8.8", "8.8.4.4"]);
    }

    #[test]
    fn test_host_fields_lose_root_separator() {
        let response = response_with(vec![
            RData::NS(NS(name("ns1.example.com."))),
            RData::MX(MX::new(10, name("mx.example.com."))),
            RData::SRV(SRV::new(0, 5, 443, name("sip.example.com."))),
            RData::CNAME(CNAME(name("alias.example.net."))),
        ]);
        assert_eq!(response.answers(RecordType::NS), vec!["ns1.example.com"]);
        assert_eq!(response.answers(RecordType::MX), vec!["mx.example.com"]);
        assert_eq!(response.answers(RecordType::SRV), vec!["sip.example.com"]);
        assert_eq!(response.answers(RecordType::CNAME), vec!["alias.example.net"]);
    }

    #[test]
    fn test_txt_segments_are_flattened() {
        let response = response_with(vec![
            RData::TXT(TXT::new(vec!["v=spf1".to_string(), "-all".to_string()])),
            RData::TXT(TXT::new(vec!["google-site-verification=x".to_string()])),
        ]);
        assert_eq!(
            response.answers(RecordType::TXT),
            vec!["v=spf1", "-all", "google-site-verification=x"]
        );
    }

    #[test]
    fn test_txt_bytes_outside_utf8_are_escaped() {
        let response = response_with(vec![RData::TXT(TXT::from_bytes(vec![
            b"ok\xff\x01".as_ref(),
            b"a\\b".as_ref(),
            "caf\u{e9} \u{1f600}".as_bytes(),
        ]))]);
        assert_eq!(
            response.answers(RecordType::TXT),
            vec!["ok\\255\\001", "a\\\\b", "caf\u{e9} \u{1f600}"]
        );
    }

    #[test]
    fn test_truncated_utf8_sequence_is_escaped_bytewise() {
        assert_eq!(txt_segment(&[b'x', 0xe2, 0x82]), "x\\226\\130");
        assert_eq!(txt_segment(b"tab\there"), "tab\\009here");
        assert_eq!(txt_segment(b""), "");
    }

    #[test]
    fn test_ptr_and_aaaa_answers() {
        let response = response_with(vec![
            RData::PTR(PTR(name("host.example.net."))),
            RData::AAAA(AAAA(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1))),
            RData::AAAA(AAAA(Ipv6Addr::new(0x2606, 0x4700, 0, 0, 0, 0, 0, 0x1111))),
        ]);
        assert_eq!(response.answers(RecordType::PTR), vec!["host.example.net"]);
        assert_eq!(
            response.answers(RecordType::AAAA),
            vec!["2001:db8::1", "2606:4700::1111"]
        );
        assert!(response.answers(RecordType::A).is_empty());
    }

    #[test]
    fn test_other_types_are_skipped() {
        let response = response_with(vec![
            RData::CNAME(CNAME(name("edge.example.net."))),
            RData::A(A(Ipv4Addr::new(192, 0, 2, 1))),
        ]);
        assert_eq!(response.answers(RecordType::A), vec!["192.0.2.1"]);
        assert!(response.answers(RecordType::AAAA).is_empty());
    }

    #[test]
    fn test_garbage_is_invalid_response() {
        let err = ResponseParser::parse(&[0x00, 0x01]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidDnsResponse(_)));
        assert!(err.is_retryable());
    }
}
