use std::time::Duration;

/// Tunables for the wire protocol. Defaults match the recommended
/// values and a liveness counter threshold of 100 stale polls.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    /// How long a single poll of the transport waits for more bytes.
    pub poll_interval: Duration,
    /// Number of consecutive polls with an unchanged bytes-available
    /// count before a command exchange is abandoned as wedged.
    pub liveness_poll_cap: u32,
    /// Timeout applied while streaming a 256-byte flash block.
    pub block_program_timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            poll_interval: Duration::from_millis(100),
            liveness_poll_cap: 100,
            block_program_timeout: Duration::from_secs(3),
        }
    }
}

/// Chipset family reported by `READINFO`, and the baud rate the caller
/// must select before `open_port` for it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Chipset {
    Avr,
    S8515,
}

impl Chipset {
    pub fn baud_rate(self) -> u32 {
        match self {
            Chipset::Avr => 115_200,
            Chipset::S8515 => 512_000,
        }
    }

    pub fn parse(s: &str) -> Option<Chipset> {
        match s {
            "AVR" => Some(Chipset::Avr),
            "8515" => Some(Chipset::S8515),
            _ => None,
        }
    }
}
