use bytemuck::{Pod, Zeroable};

/// A palette entry or true-color value.
///
/// The layout matches a classic `RGBQUAD`-style table entry with the channel order spelled out,
/// so a palette can be viewed as plain bytes. The `reserved` byte is carried along but never
/// takes part in color matching.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Unused by GIF, kept for callers that store alpha or flags in it.
    pub reserved: u8,
}

impl Color {
    /// Black, the value of a freshly allocated palette entry.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// White.
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    /// Creates a color with a zero reserved byte.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, reserved: 0 }
    }

    /// The three color channels in wire order.
    #[must_use]
    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Compares the color channels only, ignoring the reserved byte.
    #[inline]
    #[must_use]
    pub fn same_rgb(self, other: Color) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// Squared euclidean distance over the three color channels.
    #[inline]
    #[must_use]
    pub fn distance_sq(self, other: Color) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// Whether two color tables agree entry by entry, reserved bytes aside.
pub(crate) fn same_table(a: &[Color], b: &[Color]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_rgb(*y))
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Color::rgb(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::{same_table, Color};

    #[test]
    fn distance_ignores_reserved() {
        let a = Color::rgb(10, 20, 30);
        let mut b = a;
        b.reserved = 0xFF;
        assert!(a.same_rgb(b));
        assert_eq!(a.distance_sq(b), 0);
        assert_eq!(a.distance_sq(Color::rgb(13, 24, 30)), 25);
    }

    #[test]
    fn tables_compare_by_channels() {
        let a = [Color::BLACK, Color::rgb(4, 5, 6)];
        let mut b = a;
        b[1].reserved = 7;
        assert!(same_table(&a, &b));
        assert!(!same_table(&a, &b[..1]));
        b[0].g = 1;
        assert!(!same_table(&a, &b));
    }

    #[test]
    fn palette_bytes_layout() {
        let colors = [Color::rgb(1, 2, 3), Color::WHITE];
        let bytes: &[u8] = bytemuck::cast_slice(&colors);
        assert_eq!(bytes, &[1, 2, 3, 0, 0xFF, 0xFF, 0xFF, 0]);
    }
}
