use ratatui::style::Color;

use stemoxide::transport::NUM_STEMS;

/// Palette for the transport and fader views
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub bg: Color,
    pub fg: Color,
    /// Fault text and the mute flag
    pub alert: Color,
    /// Fader fill and header label per stem, in vocals/other/drums/bass order
    pub stems: [Color; NUM_STEMS],
    pub fader_empty: Color,
    pub handle: Color,
    pub progress: Color,
    /// Paused state and the upper fader zone
    pub warm: Color,
    /// Playing state, solo flag and the top fader zone
    pub hot: Color,
    pub border: Color,
    pub highlight: Color,
    pub dimmed: Color,
}

/// Name and constructor of every built-in theme, in listing order
const THEMES: &[(&str, fn() -> Theme)] = &[
    ("default", Theme::default_theme),
    ("studio", Theme::studio),
    ("tape", Theme::tape),
    ("mono", Theme::mono),
];

impl Theme {
    /// Terminal ANSI colors, follows the user's palette
    pub fn default_theme() -> Self {
        Self {
            name: "default",
            bg: Color::Reset,
            fg: Color::Reset,
            alert: Color::Red,
            stems: [Color::Magenta, Color::Cyan, Color::Yellow, Color::Blue],
            fader_empty: Color::DarkGray,
            handle: Color::White,
            progress: Color::Green,
            warm: Color::Yellow,
            hot: Color::Red,
            border: Color::Gray,
            highlight: Color::LightGreen,
            dimmed: Color::DarkGray,
        }
    }

    /// Dark mixing desk with a distinct strip color per stem
    pub fn studio() -> Self {
        Self {
            name: "studio",
            bg: Color::Rgb(18, 20, 24),
            fg: Color::Rgb(210, 214, 220),
            alert: Color::Rgb(240, 70, 70),
            stems: [
                Color::Rgb(232, 120, 200),
                Color::Rgb(110, 200, 210),
                Color::Rgb(240, 190, 80),
                Color::Rgb(120, 140, 250),
            ],
            fader_empty: Color::Rgb(44, 48, 56),
            handle: Color::Rgb(235, 235, 235),
            progress: Color::Rgb(90, 200, 120),
            warm: Color::Rgb(250, 170, 60),
            hot: Color::Rgb(250, 80, 60),
            border: Color::Rgb(70, 76, 88),
            highlight: Color::Rgb(140, 230, 160),
            dimmed: Color::Rgb(80, 84, 92),
        }
    }

    /// Cream and brown, reel-to-reel deck
    pub fn tape() -> Self {
        Self {
            name: "tape",
            bg: Color::Rgb(34, 26, 20),
            fg: Color::Rgb(236, 220, 190),
            alert: Color::Rgb(220, 80, 50),
            stems: [
                Color::Rgb(230, 160, 120),
                Color::Rgb(200, 190, 140),
                Color::Rgb(220, 130, 70),
                Color::Rgb(170, 140, 100),
            ],
            fader_empty: Color::Rgb(66, 52, 40),
            handle: Color::Rgb(250, 240, 220),
            progress: Color::Rgb(210, 170, 90),
            warm: Color::Rgb(240, 180, 70),
            hot: Color::Rgb(240, 100, 50),
            border: Color::Rgb(120, 96, 70),
            highlight: Color::Rgb(255, 220, 140),
            dimmed: Color::Rgb(96, 80, 64),
        }
    }

    /// Grayscale for monochrome terminals and low vision
    pub fn mono() -> Self {
        Self {
            name: "mono",
            bg: Color::Black,
            fg: Color::White,
            alert: Color::White,
            stems: [Color::Rgb(200, 200, 200); NUM_STEMS],
            fader_empty: Color::Rgb(60, 60, 60),
            handle: Color::White,
            progress: Color::Rgb(200, 200, 200),
            warm: Color::Rgb(225, 225, 225),
            hot: Color::White,
            border: Color::Rgb(160, 160, 160),
            highlight: Color::White,
            dimmed: Color::Rgb(90, 90, 90),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        THEMES
            .iter()
            .find(|(theme, _)| theme.eq_ignore_ascii_case(name))
            .map(|(_, build)| build())
    }

    pub fn available_themes() -> impl Iterator<Item = &'static str> {
        THEMES.iter().map(|(name, _)| *name)
    }

    /// Strip color for a stem, falling back to the text color
    pub fn stem(&self, channel: usize) -> Color {
        self.stems.get(channel).copied().unwrap_or(self.fg)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_theme_resolves() {
        for name in Theme::available_themes() {
            let theme = Theme::from_name(name).unwrap();
            assert_eq!(theme.name, name);
        }
        assert_eq!(Theme::from_name("Studio").map(|t| t.name), Some("studio"));
        assert!(Theme::from_name("no-such-theme").is_none());
    }

    #[test]
    fn stems_are_distinguishable_in_color_themes() {
        for theme in [Theme::default_theme(), Theme::studio(), Theme::tape()] {
            for a in 0..NUM_STEMS {
                for b in a + 1..NUM_STEMS {
                    assert_ne!(theme.stem(a), theme.stem(b), "{} {} {}", theme.name, a, b);
                }
            }
        }
        assert_eq!(Theme::studio().stem(NUM_STEMS), Theme::studio().fg);
    }
}
