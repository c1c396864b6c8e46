//! Android probe packets: battery, power rails, logcat, packages, game
//! interventions, display state and system properties.

pub mod args;
pub mod module;
pub mod parser;
pub mod probes_tracker;
pub mod tokenizer;

pub use module::{AndroidProbesModule, PacketKind};
pub use parser::AndroidProbesParser;
pub use probes_tracker::AndroidProbesTracker;
pub use tokenizer::tokenize_power_rails;
