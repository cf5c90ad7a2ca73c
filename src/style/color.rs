use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn to_rgba_u8(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const fn alpha(self) -> u8 {
        self.a
    }

    /// Fully transparent colors are treated as "no paint".
    pub const fn is_none(self) -> bool {
        self.a == 0
    }

    pub fn is_transparent(self) -> bool {
        self.a != 255
    }

    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Linear-space RGBA, straight alpha.
    pub fn to_rgba_f32(self) -> [f32; 4] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
            self.a as f32 / 255.0,
        ]
    }

    /// Parses `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `none` and a few color names.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with('#') {
            return parse_hex(raw.as_bytes());
        }
        let named = match raw.to_ascii_lowercase().as_str() {
            "none" | "transparent" => Color::TRANSPARENT,
            "black" => Color::BLACK,
            "white" => Color::WHITE,
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 128, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "gray" | "grey" => Color::rgb(128, 128, 128),
            "lightgray" | "lightgrey" => Color::rgb(211, 211, 211),
            _ => return None,
        };
        Some(named)
    }
}

fn parse_hex(bytes: &[u8]) -> Option<Color> {
    if !matches!(bytes.len(), 4 | 5 | 7 | 9) || !bytes[1..].iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let rgba = match bytes.len() {
        4 => [
            hex_1_to_u8(bytes[1]) * 17,
            hex_1_to_u8(bytes[2]) * 17,
            hex_1_to_u8(bytes[3]) * 17,
            255,
        ],
        5 => [
            hex_1_to_u8(bytes[1]) * 17,
            hex_1_to_u8(bytes[2]) * 17,
            hex_1_to_u8(bytes[3]) * 17,
            hex_1_to_u8(bytes[4]) * 17,
        ],
        7 => [
            hex_2_to_u8(bytes[1], bytes[2]),
            hex_2_to_u8(bytes[3], bytes[4]),
            hex_2_to_u8(bytes[5], bytes[6]),
            255,
        ],
        _ => [
            hex_2_to_u8(bytes[1], bytes[2]),
            hex_2_to_u8(bytes[3], bytes[4]),
            hex_2_to_u8(bytes[5], bytes[6]),
            hex_2_to_u8(bytes[7], bytes[8]),
        ],
    };
    Some(Color::rgba(rgba[0], rgba[1], rgba[2], rgba[3]))
}

fn hex_1_to_u8(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

fn hex_2_to_u8(hi: u8, lo: u8) -> u8 {
    hex_1_to_u8(hi) * 16 + hex_1_to_u8(lo)
}

static SRGB8_TO_LINEAR: Lazy<[f32; 256]> = Lazy::new(|| {
    let mut t = [0.0f32; 256];
    for (i, slot) in t.iter_mut().enumerate() {
        let c = i as f32 / 255.0;
        *slot = if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        };
    }
    t
});

pub fn srgb_to_linear(c: u8) -> f32 {
    SRGB8_TO_LINEAR[c as usize]
}

#[cfg(test)]
mod tests {
    use super::Color;

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("#00000080"), Some(Color::rgba(0, 0, 0, 128)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#zzz"), None);
    }

    #[test]
    fn none_is_transparent() {
        let none = Color::parse("none").expect("none parses");
        assert!(none.is_none());
        assert_eq!(Color::parse("chartreuse-ish"), None);
    }
}
