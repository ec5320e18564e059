//! TLS grade ordering and aggregation.

use crate::model::Server;

/// The fixed SSL Labs grade alphabet, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    F = 1,
    E,
    D,
    C,
    B,
    A,
    APlus,
}

impl Grade {
    pub const STRONGEST: Grade = Grade::APlus;

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A+" => Some(Grade::APlus),
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "E" => Some(Grade::E),
            "F" => Some(Grade::F),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }

    /// Rank of a raw grade string; anything outside the alphabet ranks 0.
    pub fn rank(s: &str) -> u8 {
        Self::parse(s).map(|g| g as u8).unwrap_or(0)
    }
}

/// Weakest grade across `servers`, starting from `A+`.
///
/// Unknown grade strings rank below `F` and win, so the result is always
/// either `A+` (empty input) or one of the input strings.
pub fn lowest_grade(servers: &[Server]) -> String {
    let mut lowest = Grade::STRONGEST.as_str();

    for server in servers {
        if Grade::rank(lowest) > Grade::rank(&server.ssl_grade) {
            lowest = server.ssl_grade.as_str();
        }
    }

    lowest.to_string()
}
