use image::Rgb;
use serde::Serialize;

/// Background and stroke colors of a rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub name: &'static str,
    pub background: [u8; 3],
    pub stroke: [u8; 3],
}

impl Theme {
    pub const TRADITIONAL: Theme = Theme::new("traditional", 0xffffff, 0x000000);
    pub const COLORFUL: Theme = Theme::new("colorful", 0xffffff, 0xff6b6b);
    pub const GOLDEN: Theme = Theme::new("golden", 0xfff8e1, 0xff8f00);
    pub const OCEAN: Theme = Theme::new("ocean", 0xe3f2fd, 0x1976d2);
    pub const SUNSET: Theme = Theme::new("sunset", 0xfce4ec, 0xe91e63);
    pub const FOREST: Theme = Theme::new("forest", 0xf1f8e9, 0x388e3c);

    pub const ALL: [Theme; 6] = [
        Theme::TRADITIONAL,
        Theme::COLORFUL,
        Theme::GOLDEN,
        Theme::OCEAN,
        Theme::SUNSET,
        Theme::FOREST,
    ];

    const fn new(name: &'static str, background: u32, stroke: u32) -> Self {
        Self {
            name,
            background: hex(background),
            stroke: hex(stroke),
        }
    }

    /// Look a theme up by name (case-insensitive); unknown or missing names
    /// give [`Theme::TRADITIONAL`].
    pub fn by_name(name: Option<&str>) -> Theme {
        name.and_then(|n| {
            let n = n.trim();
            Theme::ALL
                .into_iter()
                .find(|t| t.name.eq_ignore_ascii_case(n))
        })
        .unwrap_or(Theme::TRADITIONAL)
    }

    #[inline]
    pub fn background_rgb(&self) -> Rgb<u8> {
        Rgb(self.background)
    }

    #[inline]
    pub fn stroke_rgb(&self) -> Rgb<u8> {
        Rgb(self.stroke)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::TRADITIONAL
    }
}

const fn hex(rgb: u32) -> [u8; 3] {
    [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve() {
        assert_eq!(Theme::by_name(Some("ocean")).stroke, [0x19, 0x76, 0xd2]);
        assert_eq!(Theme::by_name(Some("Golden")).background, [0xff, 0xf8, 0xe1]);
        assert_eq!(Theme::by_name(Some("sunset")).stroke, [0xe9, 0x1e, 0x63]);
    }

    #[test]
    fn unknown_or_missing_falls_back_to_traditional() {
        assert_eq!(Theme::by_name(None), Theme::TRADITIONAL);
        assert_eq!(Theme::by_name(Some("neon")), Theme::TRADITIONAL);
        assert_eq!(Theme::TRADITIONAL.background, [255, 255, 255]);
        assert_eq!(Theme::TRADITIONAL.stroke, [0, 0, 0]);
    }
}
