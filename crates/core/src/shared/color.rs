/// An RGB colour, independent of any frame's storage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const WHITE: Rgb = Rgb([255, 255, 255]);

    /// Relative luminance on a 0-255 scale (ITU-R BT.601 weights).
    pub fn luminance(&self) -> f64 {
        let [r, g, b] = self.0;
        0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
    }

    /// Black on light colours, white on dark ones.
    pub fn contrasting_text(&self) -> Rgb {
        if self.luminance() > 127.5 {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        }
    }

    /// Converts HSV (hue in degrees, saturation and value in `[0, 1]`).
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Rgb {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = value * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = value - c;
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb([to_byte(r), to_byte(g), to_byte(b)])
    }
}

/// Fill colour plus the label colour that stays readable on top of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorPair {
    pub fill: Rgb,
    pub label: Rgb,
}

impl ColorPair {
    pub fn from_fill(fill: Rgb) -> Self {
        Self {
            fill,
            label: fill.contrasting_text(),
        }
    }
}

/// Fixed palette used when a model has few enough classes.
pub const SMALL_PALETTE: [Rgb; 8] = [
    Rgb([230, 25, 75]),
    Rgb([60, 180, 75]),
    Rgb([255, 225, 25]),
    Rgb([0, 130, 200]),
    Rgb([245, 130, 48]),
    Rgb([145, 30, 180]),
    Rgb([70, 240, 240]),
    Rgb([240, 50, 230]),
];

/// Deterministic class-id to colour mapping, fixed for the lifetime of a
/// model.
///
/// Up to eight classes use [`SMALL_PALETTE`]; larger label sets get an
/// evenly spaced hue ramp sized to the class count.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassPalette {
    colors: Vec<Rgb>,
}

impl ClassPalette {
    pub fn for_class_count(class_count: usize) -> Self {
        let colors = if class_count <= SMALL_PALETTE.len() {
            SMALL_PALETTE[..class_count.max(1)].to_vec()
        } else {
            (0..class_count)
                .map(|i| Rgb::from_hsv(360.0 * i as f64 / class_count as f64, 0.75, 0.95))
                .collect()
        };
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color_for(&self, class_id: u32) -> Rgb {
        self.colors[class_id as usize % self.colors.len()]
    }

    pub fn pair_for(&self, class_id: u32) -> ColorPair {
        ColorPair::from_fill(self.color_for(class_id))
    }
}
