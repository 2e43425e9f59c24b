//! Synthetic TrueType fonts for integration tests.
//!
//! Fonts are assembled table by table so every test controls exactly what
//! the directory holds. Simple glyphs are single two-point contours running
//! from the bottom left to the top right corner of their bounding box, so
//! outline-derived boxes equal the header boxes.

#![allow(dead_code)]

/// One glyph of a synthetic font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestGlyph {
    /// No outline
    Empty,
    /// Outline spanning `[x_min, y_min, x_max, y_max]`
    Simple([i16; 4]),
    /// Components placed at the origin
    Composite(Vec<u16>),
}

/// Description of a synthetic font.
#[derive(Debug, Clone)]
pub struct TestFont {
    /// Glyphs with their advance widths
    pub glyphs: Vec<(TestGlyph, u16)>,
    /// (platform 3) encoding ID and (code, glyph) pairs, ascending by code
    pub cmap: Option<(u16, Vec<(u16, u16)>)>,
    /// Emit `cvt `, `fpgm` and `prep`
    pub hinting: bool,
    /// Store `loca` in long form
    pub long_loca: bool,
}

/// Source glyph of a printable ASCII code in [`TestFont::sample`].
pub fn sample_glyph_for(code: u16) -> u16 {
    match code {
        0x20 => 1,
        0x41 => 5,
        0x42 => 17,
        0x43 => 18,
        0x30..=0x39 => 6 + (code - 0x30),
        _ => 19,
    }
}

impl TestFont {
    /// Twenty glyphs: 17 is a composite of 3 and 9, 18 a composite of 17
    /// and 4, 1 is blank. Every printable ASCII code is mapped.
    pub fn sample() -> Self {
        let mut glyphs = vec![
            (TestGlyph::Simple([50, 0, 450, 700]), 500),
            (TestGlyph::Empty, 250),
            (TestGlyph::Simple([20, -10, 580, 710]), 600),
            (TestGlyph::Simple([10, -20, 300, 500]), 320),
            (TestGlyph::Simple([30, 0, 400, 720]), 440),
        ];
        for i in 5..17i16 {
            glyphs.push((TestGlyph::Simple([i, 0, 300 + 10 * i, 650 + i]), 520 + i as u16));
        }
        glyphs.push((TestGlyph::Composite(vec![3, 9]), 640));
        glyphs.push((TestGlyph::Composite(vec![17, 4]), 700));
        glyphs.push((TestGlyph::Simple([-15, -200, 520, 760]), 700));

        let mapping = (0x20..=0x7E).map(|c| (c, sample_glyph_for(c))).collect();
        Self {
            glyphs,
            cmap: Some((1, mapping)),
            hinting: true,
            long_loca: false,
        }
    }

    /// [`TestFont::sample`] with its codes moved to U+F020..U+F07E under a
    /// Windows Symbol sub-table.
    pub fn symbolic_sample() -> Self {
        let mut font = Self::sample();
        let mapping = (0x20..=0x7E)
            .map(|c| (0xF000 | c, sample_glyph_for(c)))
            .collect();
        font.cmap = Some((0, mapping));
        font
    }

    /// Bounding box a glyph resolves to, following composites.
    pub fn bbox(&self, glyph: u16) -> Option<[i16; 4]> {
        match &self.glyphs[glyph as usize].0 {
            TestGlyph::Empty => None,
            TestGlyph::Simple(bbox) => Some(*bbox),
            TestGlyph::Composite(components) => components
                .iter()
                .filter_map(|&c| self.bbox(c))
                .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]),
        }
    }

    /// Raw outline bytes of a glyph.
    pub fn glyph_data(&self, glyph: u16) -> Vec<u8> {
        let mut out = Vec::new();
        match &self.glyphs[glyph as usize].0 {
            TestGlyph::Empty => {},
            TestGlyph::Simple([x_min, y_min, x_max, y_max]) => {
                push_i16(&mut out, 1);
                for v in [*x_min, *y_min, *x_max, *y_max] {
                    push_i16(&mut out, v);
                }
                push_u16(&mut out, 1); // endPtsOfContours
                push_u16(&mut out, 0); // instructionLength
                out.extend_from_slice(&[0x01, 0x01]); // on curve, word deltas
                push_i16(&mut out, *x_min);
                push_i16(&mut out, x_max - x_min);
                push_i16(&mut out, *y_min);
                push_i16(&mut out, y_max - y_min);
            },
            TestGlyph::Composite(components) => {
                push_i16(&mut out, -1);
                let bbox = self.bbox(glyph).unwrap_or([0; 4]);
                for v in bbox {
                    push_i16(&mut out, v);
                }
                for (i, &component) in components.iter().enumerate() {
                    // ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES
                    let mut flags = 0x0003;
                    if i + 1 < components.len() {
                        flags |= 0x0020;
                    }
                    push_u16(&mut out, flags);
                    push_u16(&mut out, component);
                    push_i16(&mut out, 0);
                    push_i16(&mut out, 0);
                }
            },
        }
        out
    }

    /// Every table of the font, in tag order.
    pub fn tables(&self) -> Vec<([u8; 4], Vec<u8>)> {
        let num_glyphs = self.glyphs.len() as u16;
        let mut glyf = Vec::new();
        let mut offsets = vec![0u32];
        for glyph in 0..num_glyphs {
            glyf.extend(self.glyph_data(glyph));
            offsets.push(glyf.len() as u32);
        }

        let mut tables = Vec::new();
        if let Some((encoding_id, mapping)) = &self.cmap {
            tables.push((*b"cmap", cmap_format4(*encoding_id, mapping)));
        }
        if self.hinting {
            tables.push((*b"cvt ", vec![0x00, 0x10, 0x00, 0x20, 0xFF, 0xF0]));
            tables.push((*b"fpgm", vec![0xB0, 0x00, 0x2C, 0x2D]));
        }
        tables.push((*b"glyf", glyf));
        tables.push((*b"head", self.head()));
        tables.push((*b"hhea", self.hhea()));

        let mut hmtx = Vec::new();
        for glyph in 0..num_glyphs {
            push_u16(&mut hmtx, self.glyphs[glyph as usize].1);
            push_i16(&mut hmtx, self.bbox(glyph).map_or(0, |b| b[0]));
        }
        tables.push((*b"hmtx", hmtx));

        let mut loca = Vec::new();
        for offset in offsets {
            if self.long_loca {
                loca.extend_from_slice(&offset.to_be_bytes());
            } else {
                push_u16(&mut loca, (offset / 2) as u16);
            }
        }
        tables.push((*b"loca", loca));

        let mut maxp = Vec::new();
        push_u32(&mut maxp, 0x0001_0000);
        push_u16(&mut maxp, num_glyphs);
        for value in [2, 1, 4, 2, 1, 0, 0, 0, 0, 16, 0, 2, 2] {
            push_u16(&mut maxp, value);
        }
        tables.push((*b"maxp", maxp));
        if self.hinting {
            tables.push((*b"prep", vec![0xB8, 0x01, 0xFF, 0x85, 0xB0, 0x04, 0x8D]));
        }
        tables
    }

    /// The assembled font file.
    pub fn build(&self) -> Vec<u8> {
        assemble(&self.tables())
    }

    fn head(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_u32(&mut out, 0x0001_0000);
        push_u32(&mut out, 0x0002_0000);
        push_u32(&mut out, 0); // checksumAdjustment
        push_u32(&mut out, 0x5F0F_3CF5);
        push_u16(&mut out, 0x000B);
        push_u16(&mut out, 1000);
        out.extend_from_slice(&[0; 16]); // created, modified
        for v in [-100i16, -300, 1200, 900] {
            push_i16(&mut out, v);
        }
        push_u16(&mut out, 0); // macStyle
        push_u16(&mut out, 8); // lowestRecPPEM
        push_i16(&mut out, 2);
        push_i16(&mut out, self.long_loca as i16);
        push_i16(&mut out, 0);
        out
    }

    fn hhea(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_u32(&mut out, 0x0001_0000);
        for v in [800i16, -200, 90] {
            push_i16(&mut out, v);
        }
        push_u16(&mut out, 1200); // advanceWidthMax
        for v in [-100i16, -50, 1200, 1, 0, 0, 0, 0, 0, 0, 0] {
            push_i16(&mut out, v);
        }
        push_u16(&mut out, self.glyphs.len() as u16);
        out
    }
}

/// Format 4 `cmap` with one platform 3 sub-table, one segment per code.
pub fn cmap_format4(encoding_id: u16, mapping: &[(u16, u16)]) -> Vec<u8> {
    let mut segments: Vec<(u16, u16, i16)> = mapping
        .iter()
        .map(|&(code, glyph)| (code, code, glyph.wrapping_sub(code) as i16))
        .collect();
    segments.push((0xFFFF, 0xFFFF, 1));
    let seg_count = segments.len() as u16;

    let mut out = Vec::new();
    push_u16(&mut out, 0);
    push_u16(&mut out, 1);
    push_u16(&mut out, 3);
    push_u16(&mut out, encoding_id);
    push_u32(&mut out, 12);

    let search_range = 2 * (1u16 << (15 - seg_count.leading_zeros()));
    push_u16(&mut out, 4);
    push_u16(&mut out, 16 + 8 * seg_count);
    push_u16(&mut out, 0);
    push_u16(&mut out, 2 * seg_count);
    push_u16(&mut out, search_range);
    push_u16(&mut out, search_range.trailing_zeros() as u16 - 1);
    push_u16(&mut out, 2 * seg_count - search_range);
    for &(_, end, _) in &segments {
        push_u16(&mut out, end);
    }
    push_u16(&mut out, 0);
    for &(start, _, _) in &segments {
        push_u16(&mut out, start);
    }
    for &(_, _, delta) in &segments {
        push_i16(&mut out, delta);
    }
    for _ in &segments {
        push_u16(&mut out, 0);
    }
    out
}

/// Lay tables out behind an sfnt header and directory, in the given order.
pub fn assemble(tables: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let num_tables = tables.len() as u16;
    let mut out = Vec::new();
    push_u32(&mut out, 0x0001_0000);
    push_u16(&mut out, num_tables);
    let search_range = if num_tables == 0 {
        0
    } else {
        16 * (1u16 << (15 - num_tables.leading_zeros()))
    };
    push_u16(&mut out, search_range);
    push_u16(&mut out, search_range.checked_ilog2().map_or(0, |l| l as u16 - 4));
    push_u16(&mut out, (16 * num_tables).saturating_sub(search_range));

    let mut offset = 12 + 16 * tables.len();
    for (tag, data) in tables {
        out.extend_from_slice(tag);
        push_u32(&mut out, checksum(data));
        push_u32(&mut out, offset as u32);
        push_u32(&mut out, data.len() as u32);
        offset += (data.len() + 3) & !3;
    }
    for (_, data) in tables {
        out.extend_from_slice(data);
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }
    out
}

/// Raw bytes of a table of an assembled font.
pub fn table<'a>(font: &'a [u8], tag: &[u8; 4]) -> Option<&'a [u8]> {
    let num_tables = u16::from_be_bytes([font[4], font[5]]) as usize;
    (0..num_tables).find_map(|i| {
        let record = &font[12 + 16 * i..28 + 16 * i];
        if &record[..4] != tag {
            return None;
        }
        let offset = u32::from_be_bytes([record[8], record[9], record[10], record[11]]) as usize;
        let length = u32::from_be_bytes([record[12], record[13], record[14], record[15]]) as usize;
        font.get(offset..offset + length)
    })
}

/// Tags of an assembled font's directory, in order.
pub fn directory_tags(font: &[u8]) -> Vec<[u8; 4]> {
    let num_tables = u16::from_be_bytes([font[4], font[5]]) as usize;
    (0..num_tables)
        .map(|i| {
            let at = 12 + 16 * i;
            [font[at], font[at + 1], font[at + 2], font[at + 3]]
        })
        .collect()
}

fn checksum(data: &[u8]) -> u32 {
    data.iter()
        .enumerate()
        .fold(0u32, |sum, (i, &b)| sum.wrapping_add((b as u32) << (24 - 8 * (i & 3))))
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Install a test logger once.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
