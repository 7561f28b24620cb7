/// Channel order of the first three channels of a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    Rgb,
    Bgr,
}

/// A single video frame: contiguous interleaved bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only. The pipeline stores
/// its own copy of every frame it is handed; the compositor and the
/// detection worker each operate on private clones, never on the stored
/// buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    format: PixelFormat,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        Self::with_format(data, width, height, channels, PixelFormat::Rgb, index)
    }

    pub fn with_format(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        format: PixelFormat,
        index: usize,
    ) -> Self {
        debug_assert!(channels >= 3, "frames must carry at least three channels");
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            format,
            index,
        }
    }

    /// A frame filled with a single RGB colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * 3)
            .collect();
        Self::new(data, width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Reads the pixel at `(x, y)` as RGB regardless of storage order.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = self.offset(x, y);
        let px = &self.data[offset..offset + 3];
        match self.format {
            PixelFormat::Rgb => [px[0], px[1], px[2]],
            PixelFormat::Bgr => [px[2], px[1], px[0]],
        }
    }

    /// Writes an RGB colour at `(x, y)` in the frame's own channel order.
    /// Out-of-bounds coordinates are ignored.
    pub fn put_rgb(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let offset = self.offset(x as u32, y as u32);
        let ordered = self.ordered(rgb);
        self.data[offset..offset + 3].copy_from_slice(&ordered);
    }

    /// Alpha-blends `rgb` over the pixel at `(x, y)`.
    pub fn blend_rgb(&mut self, x: u32, y: u32, rgb: [u8; 3], alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        let offset = self.offset(x, y);
        let ordered = self.ordered(rgb);
        for (dst, src) in self.data[offset..offset + 3].iter_mut().zip(ordered) {
            let mixed = (*dst as f32) * (1.0 - alpha) + (src as f32) * alpha;
            *dst = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Returns a copy with the first three channels reordered to `format`.
    pub fn to_format(&self, format: PixelFormat) -> Frame {
        let mut converted = self.clone();
        if format != self.format {
            let channels = self.channels as usize;
            for px in converted.data.chunks_exact_mut(channels) {
                px.swap(0, 2);
            }
            converted.format = format;
        }
        converted
    }

    /// `rgb` rearranged into this frame's storage order.
    pub(crate) fn ordered(&self, rgb: [u8; 3]) -> [u8; 3] {
        match self.format {
            PixelFormat::Rgb => rgb,
            PixelFormat::Bgr => [rgb[2], rgb[1], rgb[0]],
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * self.channels as usize
    }
}
