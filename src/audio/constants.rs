/// Voice channels carry 48 kHz audio.
pub const SAMPLE_RATE: u64 = 48_000;
