//! Placeholder engine that answers every well-formed query with NOTIMP.

use crate::engine::{Resolution, ResolutionEngine, ResolveError};
use crate::worker::Query;

const HEADER_LEN: usize = 12;

const FLAG_QR: u8 = 0x80;
const OPCODE_MASK: u8 = 0x78;
const FLAG_RD: u8 = 0x01;

const RCODE_SERVFAIL: u8 = 2;
const RCODE_NOTIMP: u8 = 4;

/// Answers DNS-shaped queries with "not implemented".
///
/// Only the 12-byte header is inspected. Short datagrams and datagrams with the
/// response bit set are malformed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotImplementedEngine;

impl NotImplementedEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ResolutionEngine for NotImplementedEngine {
    fn resolve(
        &mut self,
        query: &Query<'_>,
        answer: &mut Vec<u8>,
    ) -> Result<Resolution, ResolveError> {
        let payload = query.payload();
        if payload.len() < HEADER_LEN {
            return Err(ResolveError::Malformed(format!(
                "{} bytes is shorter than a header",
                payload.len()
            )));
        }
        if payload[2] & FLAG_QR != 0 {
            return Err(ResolveError::Malformed("response bit set".to_string()));
        }

        let header = query.arena().acquire(HEADER_LEN)?;
        header[0] = payload[0];
        header[1] = payload[1];
        header[2] = FLAG_QR | (payload[2] & (OPCODE_MASK | FLAG_RD));
        header[3] = RCODE_NOTIMP;

        answer.extend_from_slice(header);
        Ok(Resolution::Answer)
    }

    fn failure_response(&mut self, query: &Query<'_>, answer: &mut Vec<u8>) -> bool {
        let payload = query.payload();
        if payload.len() < 2 {
            return false;
        }

        answer.extend_from_slice(&payload[..2]);
        answer.extend_from_slice(&[FLAG_QR, RCODE_SERVFAIL]);
        answer.extend_from_slice(&[0; HEADER_LEN - 4]);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Arena;
    use crate::worker::QueryId;

    fn query_header(id: u16, flags: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[..2].copy_from_slice(&id.to_be_bytes());
        bytes[2] = flags;
        bytes[5] = 1;
        bytes
    }

    fn resolve(payload: &[u8]) -> (Result<Resolution, ResolveError>, Vec<u8>) {
        let arena = Arena::with_limit(64 * 1024);
        let query = Query::new_in(
            &arena,
            QueryId::new(),
            payload,
            "127.0.0.1:5300".parse().unwrap(),
        )
        .unwrap();
        let mut answer = Vec::new();
        let result = NotImplementedEngine::new().resolve(&query, &mut answer);
        (result, answer)
    }

    #[test]
    fn answers_with_notimp() {
        let (result, answer) = resolve(&query_header(0xbeef, FLAG_RD));
        assert_eq!(result, Ok(Resolution::Answer));
        assert_eq!(answer.len(), HEADER_LEN);
        assert_eq!(&answer[..2], &[0xbe, 0xef]);
        assert_eq!(answer[2], FLAG_QR | FLAG_RD);
        assert_eq!(answer[3] & 0x0f, RCODE_NOTIMP);
        assert!(answer[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn preserves_opcode() {
        let status_opcode = 2 << 3;
        let (_, answer) = resolve(&query_header(1, status_opcode));
        assert_eq!(answer[2] & OPCODE_MASK, status_opcode);
    }

    #[test]
    fn short_datagram_is_malformed() {
        let (result, answer) = resolve(&[0x12, 0x34, 0x01]);
        assert!(matches!(result, Err(ResolveError::Malformed(_))));
        assert!(answer.is_empty());
    }

    #[test]
    fn empty_datagram_is_malformed() {
        let (result, _) = resolve(&[]);
        assert!(matches!(result, Err(ResolveError::Malformed(_))));
    }

    #[test]
    fn response_is_malformed() {
        let (result, _) = resolve(&query_header(9, FLAG_QR));
        assert!(matches!(result, Err(ResolveError::Malformed(_))));
    }

    #[test]
    fn failure_response_needs_an_id() {
        let arena = Arena::with_limit(64 * 1024);
        let source = "127.0.0.1:5300".parse().unwrap();
        let mut engine = NotImplementedEngine::new();

        let empty = Query::new_in(&arena, QueryId::new(), &[], source).unwrap();
        let mut answer = Vec::new();
        assert!(!engine.failure_response(&empty, &mut answer));
        assert!(answer.is_empty());

        let short = Query::new_in(&arena, QueryId::new(), &[0xab, 0xcd, 0x00], source).unwrap();
        assert!(engine.failure_response(&short, &mut answer));
        assert_eq!(answer.len(), HEADER_LEN);
        assert_eq!(&answer[..4], &[0xab, 0xcd, FLAG_QR, RCODE_SERVFAIL]);
    }
}
