pub mod bus;
pub mod decode;
pub mod engine;

pub use bus::{MixBus, ReferenceClock, Renderer, Voice, VoiceHandle, VoiceState};
pub use decode::{decode_file, StemBuffer, SUPPORTED_EXTENSIONS};
pub use engine::AudioEngine;
