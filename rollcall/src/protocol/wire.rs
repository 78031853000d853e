//! Text encoding of the attendance protocol.
//!
//! Every payload is a single `TAG:BODY` line. Only `LIST` carries a body: a
//! comma-separated sequence of processor ids in insertion order, possibly
//! empty. Parsing splits once on `:`; anything else is a protocol violation.

use crate::error::{SimulationError, SimulationResult};
use crate::message::ProcId;

/// A parsed attendance protocol payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The token carrying the accumulated attendance sequence.
    List(Vec<ProcId>),
    /// "I am starting a fresh ring, reply if alive."
    NewGroup,
    /// "I am alive, include me."
    Present,
}

impl Payload {
    /// Encodes the payload as a `TAG:BODY` line, e.g. `LIST:0,2,1`.
    pub fn encode(&self) -> String {
        match self {
            Payload::List(ids) => {
                let body: Vec<String> = ids.iter().map(ToString::to_string).collect();
                format!("LIST:{}", body.join(","))
            }
            Payload::NewGroup => "NEWGROUP:".to_string(),
            Payload::Present => "PRESENT:".to_string(),
        }
    }

    /// Parses a `TAG:BODY` line.
    ///
    /// An unknown tag or a `LIST` body that is not a comma-separated id
    /// sequence is a fatal [`SimulationError::MalformedMessage`]; it is never
    /// an expected runtime condition.
    pub fn parse(text: &str) -> SimulationResult<Self> {
        let Some((tag, body)) = text.split_once(':') else {
            return Err(SimulationError::MalformedMessage(text.to_string()));
        };
        match tag {
            "LIST" => Ok(Payload::List(parse_ids(text, body)?)),
            "NEWGROUP" => Ok(Payload::NewGroup),
            "PRESENT" => Ok(Payload::Present),
            _ => Err(SimulationError::MalformedMessage(text.to_string())),
        }
    }
}

fn parse_ids(text: &str, body: &str) -> SimulationResult<Vec<ProcId>> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    body.split(',')
        .map(|part| {
            part.parse::<ProcId>()
                .map_err(|_| SimulationError::MalformedMessage(text.to_string()))
        })
        .collect()
}
