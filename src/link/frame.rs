//! Structural view of a well-formed receiver line.
//!
//! A line such as
//!
//! ```text
//! 045  I --- 04:123456 --:------ 04:123456 1F09 003 FF0532
//! ```
//!
//! carries a signal level, a verb, three device addresses (dashes for an
//! unused slot), a four digit hex message code and the payload length.
//! Only this envelope is parsed here; the payload is kept as text.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Address slot that is not in use.
pub const ADDRESS_PLACEHOLDER: &str = "--:------";

const ADDRESS: &str = "(--:------|[0-9]{2}:[0-9]{6})";

static FRAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"^([0-9]{{3}}) ( I| W|RQ|RP) --- {ADDRESS} {ADDRESS} {ADDRESS} ([0-9a-fA-F]{{4}}) ([0-9]{{3}})"
    );
    Regex::new(&pattern).expect("frame pattern is a valid regex")
});

/// Whether `text` starts with a well-formed frame envelope.
pub fn is_frame(text: &str) -> bool {
    FRAME_PATTERN.is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    /// ` I`: unsolicited information.
    I,
    /// ` W`: write.
    W,
    /// `RQ`: request.
    Rq,
    /// `RP`: reply.
    Rp,
}

impl Verb {
    fn parse(field: &str) -> Option<Self> {
        match field {
            " I" => Some(Self::I),
            " W" => Some(Self::W),
            "RQ" => Some(Self::Rq),
            "RP" => Some(Self::Rp),
            _ => None,
        }
    }
}

/// A validated protocol frame as handed to the downstream collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub signal: u16,
    pub verb: Verb,
    /// Source, destination and relay addresses, `None` where the slot is unused.
    pub addresses: [Option<String>; 3],
    pub code: u16,
    pub payload_len: u16,
    /// Whatever follows the length field, trimmed.
    pub payload: String,
    pub raw: String,
    pub received_at: DateTime<Utc>,
}

impl Frame {
    /// Parse the envelope of `text`, or `None` if it is not a frame.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = FRAME_PATTERN.captures(text)?;
        let whole = caps.get(0)?;

        let address = |i: usize| -> Option<Option<String>> {
            let field = caps.get(i)?.as_str();
            Some((field != ADDRESS_PLACEHOLDER).then(|| field.to_string()))
        };

        Some(Self {
            signal: caps.get(1)?.as_str().parse().ok()?,
            verb: Verb::parse(caps.get(2)?.as_str())?,
            addresses: [address(3)?, address(4)?, address(5)?],
            code: u16::from_str_radix(caps.get(6)?.as_str(), 16).ok()?,
            payload_len: caps.get(7)?.as_str().parse().ok()?,
            payload: text[whole.end()..].trim().to_string(),
            raw: text.to_string(),
            received_at: Utc::now(),
        })
    }

    pub fn source(&self) -> Option<&str> {
        self.addresses[0].as_deref()
    }

    /// The message code as it appears on the wire, e.g. `1F09`.
    pub fn code_hex(&self) -> String {
        format!("{:04X}", self.code)
    }
}
