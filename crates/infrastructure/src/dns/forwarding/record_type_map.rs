//! Mapping between `dnsbatch_domain::RecordType` and `hickory_proto::rr::RecordType`

use dnsbatch_domain::RecordType;
use hickory_proto::rr::RecordType as HickoryRecordType;

pub struct RecordTypeMapper;

impl RecordTypeMapper {
    pub fn to_hickory(record_type: RecordType) -> HickoryRecordType {
        match record_type {
            RecordType::A => HickoryRecordType::A,
            RecordType::AAAA => HickoryRecordType::AAAA,
            RecordType::NS => HickoryRecordType::NS,
            RecordType::MX => HickoryRecordType::MX,
            RecordType::TXT => HickoryRecordType::TXT,
            RecordType::SRV => HickoryRecordType::SRV,
            RecordType::CNAME => HickoryRecordType::CNAME,
            RecordType::PTR => HickoryRecordType::PTR,
        }
    }

    /// Returns `None` for types outside the supported vocabulary.
    pub fn from_hickory(hickory_type: HickoryRecordType) -> Option<RecordType> {
        match hickory_type {
            HickoryRecordType::A => Some(RecordType::A),
            HickoryRecordType::AAAA => Some(RecordType::AAAA),
            HickoryRecordType::NS => Some(RecordType::NS),
            HickoryRecordType::MX => Some(RecordType::MX),
            HickoryRecordType::TXT => Some(RecordType::TXT),
            HickoryRecordType::SRV => Some(RecordType::SRV),
            HickoryRecordType::CNAME => Some(RecordType::CNAME),
            HickoryRecordType::PTR => Some(RecordType::PTR),
            _ => None,
        }
    }
}
