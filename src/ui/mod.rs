pub mod mixer;
pub mod theme;
pub mod transport;

pub use mixer::{render_mixer, MixerView};
pub use theme::Theme;
pub use transport::render_transport;
