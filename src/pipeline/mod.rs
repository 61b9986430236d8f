pub mod segmenter;
pub mod preamble;
pub mod oracle;
pub mod parser;
pub mod types;
pub mod batch; // Sequential, concurrent and seed-window runners
pub mod processor; // Transcript entry point: clean → segment → extract
