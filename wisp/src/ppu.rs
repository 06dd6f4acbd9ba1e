use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use tracing::{debug, trace};

use crate::cpu::check_bit_const;

// Notes:
// A tile is 16 bytes, which means that each line is 2 bytes.
// Every pixel has a color-depth of 2. The nth bit of the first byte holds the nth pixel's least
// significant bit of the color depth. The most significant bit is in the corresponding bit of
// second byte. Bit 7 holds the leftmost pixel.

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

/// The number of dots (cycles) that every scan line takes, including the vblank lines.
pub const DOTS_PER_LINE: u16 = 456;

/// The number of scan lines per frame, including the ten vblank lines.
pub const LINES_PER_FRAME: u8 = 154;

/// The mode that the PPU is in. The discriminants are the values reported in the bottom two bits
/// of the STAT register.
#[repr(u8)]
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    derive_more::IsVariant,
    Serialize,
    Deserialize,
)]
pub enum PpuMode {
    /// Also refered to as "Mode 0" in the pandocs.
    HBlank = 0,
    /// Also refered to as "Mode 1" in the pandocs.
    VBlank = 1,
    /// Also refered to as "Mode 2" in the pandocs.
    #[default]
    OamScan = 2,
    /// Also refered to as "Mode 3" in the pandocs.
    Drawing = 3,
}

impl PpuMode {
    /// How many dots the PPU spends in this mode before moving to the next one.
    const fn length(self) -> u16 {
        match self {
            PpuMode::OamScan => 80,
            PpuMode::Drawing => 172,
            PpuMode::HBlank => 204,
            PpuMode::VBlank => DOTS_PER_LINE,
        }
    }
}

/// A completed picture. Each byte is a shade from 0 (lightest) to 3 (darkest), row-major, starting
/// at the top left of the screen.
#[serde_as]
#[derive(Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    #[serde_as(as = "serde_with::Bytes")]
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * SCREEN_WIDTH + x]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks_exact(SCREEN_WIDTH)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        &mut self.pixels[y * SCREEN_WIDTH..(y + 1) * SCREEN_WIDTH]
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.rows() {
            for shade in row {
                write!(f, "{}", [' ', '░', '▒', '█'][(*shade & 0b11) as usize])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// The interrupt requests and notifications that the PPU produced while being ticked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PpuEvents {
    pub vblank: bool,
    pub stat: bool,
    pub frame_ready: bool,
}

/// Maps a color index through a DMG palette register.
#[inline]
fn shade(palette: u8, color: u8) -> u8 {
    (palette >> (2 * color)) & 0b11
}

/// Used to generate pixel color indications, which have a color depth of 2. The pixels are
/// yielded from bit 0 to bit 7, i.e. from right to left.
pub fn zip_bits(hi: u8, lo: u8) -> impl Iterator<Item = u8> {
    (0..8).map(move |i| ((hi >> i) & 1) << 1 | ((lo >> i) & 1))
}

/// One of the forty entries in the Object Attribute Map.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct OamObject {
    y: u8,
    x: u8,
    tile_index: u8,
    attrs: u8,
}

impl OamObject {
    fn new([y, x, tile_index, attrs]: [u8; 4]) -> Self {
        Self {
            y,
            x,
            tile_index,
            attrs,
        }
    }

    /// The screen line of the object's top row. Objects are stored with an offset of 16.
    fn top(&self) -> i16 {
        self.y as i16 - 16
    }

    fn covers_line(&self, ly: u8, height: u8) -> bool {
        (self.top()..self.top() + height as i16).contains(&(ly as i16))
    }

    fn behind_background(&self) -> bool {
        check_bit_const::<7>(self.attrs)
    }

    fn palette(&self) -> usize {
        check_bit_const::<4>(self.attrs) as usize
    }

    /// Returns the color indices of the object's pixels on the given line, from left to right.
    fn row_colors(&self, ly: u8, height: u8, vram: &[u8]) -> [u8; 8] {
        let mut row = (ly as i16 - self.top()) as u8;
        if check_bit_const::<6>(self.attrs) {
            row = height - 1 - row;
        }
        // In 8x16 mode, the bottom bit of the tile index is ignored.
        let tile = if height == 16 {
            self.tile_index & !1
        } else {
            self.tile_index
        };
        let addr = tile as usize * 16 + row as usize * 2;
        let mut colors = [0; 8];
        colors
            .iter_mut()
            .zip(zip_bits(vram[addr + 1], vram[addr]))
            .for_each(|(c, z)| *c = z);
        if !check_bit_const::<5>(self.attrs) {
            colors.reverse();
        }
        colors
    }
}

/// The Pixel Processing Unit. It owns the video RAM, the OAM, and the LCD registers, and renders
/// the screen one scan line at a time when each line's HBlank ends.
#[serde_as]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ppu {
    /// The main video RAM. Accessible through the address range 0x8000 through 0x9FFF.
    #[serde_as(as = "serde_with::Bytes")]
    vram: Vec<u8>,
    /// The Object Attribute Map. Accessible through the address range 0xFE00 through 0xFE9F
    #[serde_as(as = "serde_with::Bytes")]
    oam: [u8; 0xA0],
    mode: PpuMode,
    /// The number of dots spent in the current mode.
    dots: u16,
    /// ADDR FF40
    lcd_control: u8,
    /// ADDR FF41, bits 3-6. The remaining bits are derived from the PPU's state.
    stat_enable: u8,
    /// ADDR FF42
    scroll_y: u8,
    /// ADDR FF43
    scroll_x: u8,
    /// ADDR FF44
    ly: u8,
    /// ADDR FF45
    lyc: u8,
    /// Set when `ly == lyc`. Reported in bit 2 of STAT.
    coincidence: bool,
    /// ADDR FF47
    bg_palette: u8,
    /// ADDR FF48 & FF49
    obj_palettes: [u8; 2],
    /// ADDR FF4A
    window_y: u8,
    /// ADDR FF4B
    window_x: u8,
    /// The window keeps its own line counter, which only advances on lines where the window was
    /// drawn.
    window_line: u8,
    screen: Frame,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            vram: vec![0; 0x2000],
            oam: [0; 0xA0],
            mode: PpuMode::OamScan,
            dots: 0,
            lcd_control: 0,
            stat_enable: 0,
            scroll_y: 0,
            scroll_x: 0,
            ly: 0,
            lyc: 0,
            coincidence: true,
            bg_palette: 0,
            obj_palettes: [0xFF; 2],
            window_y: 0,
            window_x: 0,
            window_line: 0,
            screen: Frame::new(),
        }
    }

    /// The PPU as the boot ROM leaves it: the LCD, background, and tile data at 0x8000 are
    /// enabled.
    pub fn post_boot() -> Self {
        Self {
            lcd_control: 0x91,
            bg_palette: 0xFC,
            ..Self::new()
        }
    }

    pub fn mode(&self) -> PpuMode {
        self.mode
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    /// The most recently rendered picture. Once a frame is reported as ready, this holds the
    /// complete frame until the next one starts drawing at line 0.
    pub fn frame(&self) -> &Frame {
        &self.screen
    }

    fn enabled(&self) -> bool {
        check_bit_const::<7>(self.lcd_control)
    }

    /// Advances the PPU by the given number of dots.
    pub(crate) fn tick(&mut self, cycles: u16) -> PpuEvents {
        let mut events = PpuEvents::default();
        if !self.enabled() {
            return events;
        }
        let mut budget = cycles;
        while budget > 0 {
            let step = (self.mode.length() - self.dots).min(budget);
            self.dots += step;
            budget -= step;
            if self.dots == self.mode.length() {
                self.dots = 0;
                self.advance_mode(&mut events);
            }
        }
        events
    }

    fn advance_mode(&mut self, events: &mut PpuEvents) {
        match self.mode {
            PpuMode::OamScan => self.enter(PpuMode::Drawing, events),
            PpuMode::Drawing => self.enter(PpuMode::HBlank, events),
            PpuMode::HBlank => {
                self.render_line();
                self.set_ly(self.ly + 1, events);
                if self.ly as usize == SCREEN_HEIGHT {
                    trace!(target: "wisp::event", "Entering vblank");
                    events.vblank = true;
                    events.frame_ready = true;
                    self.enter(PpuMode::VBlank, events);
                } else {
                    self.enter(PpuMode::OamScan, events);
                }
            }
            PpuMode::VBlank => {
                if self.ly == LINES_PER_FRAME - 1 {
                    self.window_line = 0;
                    self.set_ly(0, events);
                    self.enter(PpuMode::OamScan, events);
                } else {
                    self.set_ly(self.ly + 1, events);
                }
            }
        }
    }

    fn enter(&mut self, mode: PpuMode, events: &mut PpuEvents) {
        self.mode = mode;
        let fire = match mode {
            PpuMode::HBlank => check_bit_const::<3>(self.stat_enable),
            // The OAM interrupt also fires when entering line 144.
            PpuMode::VBlank => self.stat_enable & 0b0011_0000 != 0,
            PpuMode::OamScan => check_bit_const::<5>(self.stat_enable),
            PpuMode::Drawing => false,
        };
        events.stat |= fire;
    }

    fn set_ly(&mut self, ly: u8, events: &mut PpuEvents) {
        self.ly = ly;
        self.update_coincidence(events);
    }

    fn update_coincidence(&mut self, events: &mut PpuEvents) {
        let was = self.coincidence;
        self.coincidence = self.ly == self.lyc;
        if self.coincidence && !was && check_bit_const::<6>(self.stat_enable) {
            events.stat = true;
        }
    }

    /// Returns to the start of the frame.
    fn reset(&mut self, mode: PpuMode) {
        self.mode = mode;
        self.dots = 0;
        self.ly = 0;
        self.window_line = 0;
        self.coincidence = self.ly == self.lyc;
    }

    pub(crate) fn read_vram(&self, addr: u16) -> u8 {
        self.vram[(addr - 0x8000) as usize]
    }

    pub(crate) fn write_vram(&mut self, addr: u16, value: u8) {
        self.vram[(addr - 0x8000) as usize] = value
    }

    pub(crate) fn read_oam(&self, addr: u16) -> u8 {
        self.oam[(addr - 0xFE00) as usize]
    }

    pub(crate) fn write_oam(&mut self, addr: u16, value: u8) {
        self.oam[(addr - 0xFE00) as usize] = value
    }

    pub(crate) fn read_register(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcd_control,
            0xFF41 => {
                0x80 | self.stat_enable | (self.coincidence as u8) << 2 | self.mode as u8
            }
            0xFF42 => self.scroll_y,
            0xFF43 => self.scroll_x,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.bg_palette,
            0xFF48 => self.obj_palettes[0],
            0xFF49 => self.obj_palettes[1],
            0xFF4A => self.window_y,
            0xFF4B => self.window_x,
            _ => 0xFF,
        }
    }

    /// Writes to one of the LCD registers. Returns `true` if the write raised the STAT interrupt.
    pub(crate) fn write_register(&mut self, addr: u16, value: u8) -> bool {
        let mut events = PpuEvents::default();
        match addr {
            0xFF40 => {
                let was_on = self.enabled();
                self.lcd_control = value;
                match (was_on, self.enabled()) {
                    (true, false) => {
                        debug!(target: "wisp::event", "Disabling LCD");
                        self.reset(PpuMode::HBlank);
                    }
                    (false, true) => {
                        debug!(target: "wisp::event", "Enabling LCD");
                        self.reset(PpuMode::OamScan);
                    }
                    _ => {}
                }
            }
            // The mode and coincidence bits are read-only
            0xFF41 => self.stat_enable = value & 0b0111_1000,
            0xFF42 => self.scroll_y = value,
            0xFF43 => self.scroll_x = value,
            0xFF44 => {
                debug!(target: "wisp::event", "LY written, restarting the frame");
                self.reset(PpuMode::OamScan);
            }
            0xFF45 => {
                self.lyc = value;
                self.update_coincidence(&mut events);
            }
            0xFF47 => self.bg_palette = value,
            0xFF48 => self.obj_palettes[0] = value,
            0xFF49 => self.obj_palettes[1] = value,
            0xFF4A => self.window_y = value,
            0xFF4B => self.window_x = value,
            _ => trace!("Write to unmapped LCD register 0x{addr:0>4X}"),
        }
        events.stat
    }

    /// Looks up the color index of a pixel in a 32x32 tile map.
    fn tile_map_color(&self, map: usize, x: u8, y: u8) -> u8 {
        let tile_index = self.vram[map + (y as usize / 8) * 32 + x as usize / 8];
        let tile = if check_bit_const::<4>(self.lcd_control) {
            tile_index as usize * 16
        } else {
            // Signed indexing relative to 0x9000
            (0x1000 + tile_index as i8 as isize * 16) as usize
        };
        let addr = tile + (y % 8) as usize * 2;
        let bit = 7 - (x % 8);
        ((self.vram[addr + 1] >> bit) & 1) << 1 | ((self.vram[addr] >> bit) & 1)
    }

    /// Draws the current line into the screen buffer. Every pixel carries a priority tag while the
    /// line is built: background color 0 is 0, other background colors are 2, objects that sit
    /// behind the background are 1, and all other objects are 3. A pixel is only overwritten by a
    /// pixel with an equal or higher tag.
    fn render_line(&mut self) {
        let ly = self.ly;
        let mut line = [shade(self.bg_palette, 0); SCREEN_WIDTH];
        let mut tags = [0u8; SCREEN_WIDTH];

        if check_bit_const::<0>(self.lcd_control) {
            let map = if check_bit_const::<3>(self.lcd_control) {
                0x1C00
            } else {
                0x1800
            };
            let y = ly.wrapping_add(self.scroll_y);
            for (px, (pixel, tag)) in line.iter_mut().zip(tags.iter_mut()).enumerate() {
                let x = (px as u8).wrapping_add(self.scroll_x);
                let color = self.tile_map_color(map, x, y);
                *pixel = shade(self.bg_palette, color);
                *tag = if color == 0 { 0 } else { 2 };
            }

            if check_bit_const::<5>(self.lcd_control) && ly >= self.window_y && self.window_x < 167
            {
                let map = if check_bit_const::<6>(self.lcd_control) {
                    0x1C00
                } else {
                    0x1800
                };
                let start = self.window_x as i16 - 7;
                for px in start.max(0)..SCREEN_WIDTH as i16 {
                    let color = self.tile_map_color(map, (px - start) as u8, self.window_line);
                    line[px as usize] = shade(self.bg_palette, color);
                    tags[px as usize] = if color == 0 { 0 } else { 2 };
                }
                self.window_line = self.window_line.wrapping_add(1);
            }
        }

        if check_bit_const::<1>(self.lcd_control) {
            self.render_objects(ly, &mut line, &mut tags);
        }

        self.screen.row_mut(ly as usize).copy_from_slice(&line);
    }

    fn render_objects(&self, ly: u8, line: &mut [u8; SCREEN_WIDTH], tags: &mut [u8; SCREEN_WIDTH]) {
        let height = if check_bit_const::<2>(self.lcd_control) {
            16
        } else {
            8
        };
        // At most ten objects are drawn per line, picked in OAM order.
        let mut objects: heapless::Vec<(usize, OamObject), 10> = heapless::Vec::new();
        for (i, entry) in self.oam.chunks_exact(4).enumerate() {
            let obj = OamObject::new([entry[0], entry[1], entry[2], entry[3]]);
            if obj.covers_line(ly, height) && objects.push((i, obj)).is_err() {
                break;
            }
        }
        // The object with the smallest X (then the smallest OAM index) wins overlaps, so it needs
        // to be drawn last.
        objects.sort_unstable_by(|(i, a), (j, b)| (b.x, j).cmp(&(a.x, i)));

        for (_, obj) in objects {
            let palette = self.obj_palettes[obj.palette()];
            let tag = if obj.behind_background() { 1 } else { 3 };
            for (i, color) in obj.row_colors(ly, height, &self.vram).into_iter().enumerate() {
                let px = obj.x as i16 - 8 + i as i16;
                if color == 0 || !(0..SCREEN_WIDTH as i16).contains(&px) {
                    continue;
                }
                let px = px as usize;
                if tag >= tags[px] {
                    line[px] = shade(palette, color);
                    tags[px] = tag;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{zip_bits, Ppu, PpuEvents, PpuMode, DOTS_PER_LINE, LINES_PER_FRAME};

    /// A PPU with the LCD on, the background on, and unsigned tile data.
    fn lit_ppu() -> Ppu {
        let mut ppu = Ppu::new();
        ppu.write_register(0xFF40, 0x91);
        ppu.write_register(0xFF47, 0xE4);
        ppu
    }

    /// Fills tile `index` with a single color.
    fn solid_tile(ppu: &mut Ppu, index: u16, color: u8) {
        let (lo, hi) = (
            if color & 1 != 0 { 0xFF } else { 0 },
            if color & 2 != 0 { 0xFF } else { 0 },
        );
        for row in 0..8 {
            ppu.write_vram(0x8000 + index * 16 + row * 2, lo);
            ppu.write_vram(0x8000 + index * 16 + row * 2 + 1, hi);
        }
    }

    fn tick_dots(ppu: &mut Ppu, dots: usize) -> Vec<PpuEvents> {
        (0..dots).map(|_| ppu.tick(1)).collect()
    }

    fn render_frame(ppu: &mut Ppu) {
        while !ppu.tick(4).frame_ready {}
    }

    #[test]
    fn test_scan_line_timing() {
        let mut ppu = lit_ppu();
        let mut modes = vec![ppu.mode()];
        for _ in 0..DOTS_PER_LINE {
            ppu.tick(1);
            if modes.last() != Some(&ppu.mode()) {
                modes.push(ppu.mode());
            }
        }
        assert_eq!(
            modes,
            vec![
                PpuMode::OamScan,
                PpuMode::Drawing,
                PpuMode::HBlank,
                PpuMode::OamScan
            ]
        );
        assert_eq!(ppu.ly(), 1);
        assert_eq!(ppu.dots, 0);
    }

    #[test]
    fn test_frame_render_timing() {
        let mut ppu = lit_ppu();
        let events = tick_dots(&mut ppu, DOTS_PER_LINE as usize * LINES_PER_FRAME as usize);
        assert_eq!(ppu.ly(), 0);
        assert_eq!(ppu.mode(), PpuMode::OamScan);
        let vblanks: Vec<_> = events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.vblank.then_some(i + 1))
            .collect();
        assert_eq!(vblanks, vec![144 * DOTS_PER_LINE as usize]);
        assert_eq!(events.iter().filter(|e| e.frame_ready).count(), 1);
    }

    #[test]
    fn large_ticks_match_single_dots() {
        let mut a = lit_ppu();
        let mut b = lit_ppu();
        tick_dots(&mut a, 20 * 70224 / 4);
        for _ in 0..(70224 / 4) {
            b.tick(20);
        }
        assert_eq!(a.ly(), b.ly());
        assert_eq!(a.mode(), b.mode());
        assert_eq!(a.dots, b.dots);
    }

    #[test]
    fn stat_fires_once_per_hblank() {
        let mut ppu = lit_ppu();
        ppu.write_register(0xFF41, 0x08);
        let events = tick_dots(&mut ppu, DOTS_PER_LINE as usize);
        let stats: Vec<_> = events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.stat.then_some(i + 1))
            .collect();
        assert_eq!(stats, vec![80 + 172]);
    }

    #[test]
    fn lyc_coincidence() {
        let mut ppu = lit_ppu();
        ppu.write_register(0xFF41, 0x40);
        assert!(!ppu.write_register(0xFF45, 2));
        assert_eq!(ppu.read_register(0xFF41) & 0x04, 0);
        let events = tick_dots(&mut ppu, 3 * DOTS_PER_LINE as usize);
        assert_eq!(events.iter().filter(|e| e.stat).count(), 1);
        assert_eq!(ppu.ly(), 3);
        let events = tick_dots(&mut ppu, DOTS_PER_LINE as usize);
        assert!(events.iter().all(|e| !e.stat));

        // Writing the current line to LYC raises the interrupt too
        assert!(ppu.write_register(0xFF45, 4));
        assert_eq!(ppu.read_register(0xFF41), 0x80 | 0x40 | 0x04 | PpuMode::OamScan as u8);
    }

    #[test]
    fn stat_writes_keep_read_only_bits() {
        let mut ppu = lit_ppu();
        ppu.write_register(0xFF41, 0xFF);
        assert_eq!(ppu.read_register(0xFF41), 0xFF & !0x01);
        ppu.write_register(0xFF41, 0x00);
        assert_eq!(ppu.read_register(0xFF41), 0x80 | 0x04 | 0x02);
    }

    #[test]
    fn disabled_lcd_holds() {
        let mut ppu = lit_ppu();
        tick_dots(&mut ppu, 1000);
        ppu.write_register(0xFF40, 0x11);
        assert_eq!(ppu.ly(), 0);
        assert_eq!(ppu.mode(), PpuMode::HBlank);
        assert!(tick_dots(&mut ppu, 100_000).iter().all(|e| *e == PpuEvents::default()));
        assert_eq!(ppu.ly(), 0);
        ppu.write_register(0xFF40, 0x91);
        assert_eq!(ppu.mode(), PpuMode::OamScan);
    }

    #[test]
    fn test_bit_zipper() {
        let out = zip_bits(0, 0).collect::<Vec<_>>();
        assert_eq!(vec![0; 8], out);
        let out = zip_bits(0xFF, 0xFF).collect::<Vec<_>>();
        assert_eq!(vec![0b11; 8], out);
        let out = zip_bits(0b1000_0000, 0b1000_0001).collect::<Vec<_>>();
        assert_eq!(vec![1, 0, 0, 0, 0, 0, 0, 0b11], out);
    }

    // This is a simple rendering test. Every tile on the screen will the same, the top line of
    // each tile is lightest and all other lines are darkest.
    #[test]
    fn basic_rendering_test() {
        let mut ppu = lit_ppu();
        for row in 1..8 {
            ppu.write_vram(0x8000 + row * 2, 0xFF);
            ppu.write_vram(0x8000 + row * 2 + 1, 0xFF);
        }
        render_frame(&mut ppu);
        for (i, line) in ppu.frame().rows().enumerate() {
            let expected = if i % 8 == 0 { 0 } else { 3 };
            assert!(line.iter().all(|s| *s == expected), "Line {i} was a mismatch!!");
        }
    }

    #[test]
    fn background_scrolling_and_signed_tiles() {
        let mut ppu = lit_ppu();
        // Signed addressing: tile 0 lives at 0x9000 and tile 0x80 at 0x8800.
        ppu.write_register(0xFF40, 0x81);
        for row in 0..8 {
            ppu.write_vram(0x9000 + row * 2, 0xFF);
        }
        // Only the second column of the map uses tile 0x80, which is blank.
        for y in 0..32 {
            ppu.write_vram(0x9800 + y * 32 + 1, 0x80);
        }
        ppu.write_register(0xFF43, 4);
        render_frame(&mut ppu);
        let row: Vec<_> = ppu.frame().rows().next().unwrap().to_vec();
        assert!(row[..4].iter().all(|s| *s == 1));
        assert!(row[4..12].iter().all(|s| *s == 0));
        assert!(row[12..20].iter().all(|s| *s == 1));
    }

    #[test]
    fn window_covers_background() {
        let mut ppu = lit_ppu();
        solid_tile(&mut ppu, 1, 3);
        for i in 0..0x400 {
            ppu.write_vram(0x9C00 + i, 1);
        }
        // Window at (WX - 7, WY) = (80, 100), using the second map.
        ppu.write_register(0xFF40, 0x91 | 0x20 | 0x40);
        ppu.write_register(0xFF4A, 100);
        ppu.write_register(0xFF4B, 87);
        render_frame(&mut ppu);
        let frame = ppu.frame();
        assert_eq!(frame.pixel(79, 100), 0);
        assert_eq!(frame.pixel(80, 100), 3);
        assert_eq!(frame.pixel(80, 99), 0);
        assert_eq!(frame.pixel(159, 143), 3);
    }

    #[test]
    fn object_priority() {
        let mut ppu = lit_ppu();
        ppu.write_register(0xFF40, 0x93);
        ppu.write_register(0xFF48, 0xE4);
        // Background: the left half of the screen uses color 2, the right half color 0.
        solid_tile(&mut ppu, 1, 2);
        solid_tile(&mut ppu, 2, 1);
        for y in 0..32 {
            for x in 0..10 {
                ppu.write_vram(0x9800 + y * 32 + x, 1);
            }
        }
        // Object 0 sits above the background over color 2.
        let objs: [[u8; 4]; 3] = [
            [16, 8, 2, 0x00],
            // Object 1 sits behind the background over color 2
            [16, 24, 2, 0x80],
            // Object 2 sits behind the background over color 0
            [16, 8 + 100, 2, 0x80],
        ];
        for (i, obj) in objs.iter().enumerate() {
            for (j, byte) in obj.iter().enumerate() {
                ppu.write_oam(0xFE00 + (i * 4 + j) as u16, *byte);
            }
        }
        render_frame(&mut ppu);
        let frame = ppu.frame();
        assert_eq!(frame.pixel(0, 0), 1);
        assert_eq!(frame.pixel(16, 0), 2);
        assert_eq!(frame.pixel(100, 0), 1);
        assert_eq!(frame.pixel(100, 8), 0);
    }

    #[test]
    fn ten_objects_per_line() {
        let mut ppu = lit_ppu();
        ppu.write_register(0xFF40, 0x93);
        ppu.write_register(0xFF48, 0xE4);
        solid_tile(&mut ppu, 1, 3);
        for i in 0..12u16 {
            ppu.write_oam(0xFE00 + i * 4, 16);
            ppu.write_oam(0xFE00 + i * 4 + 1, 8 + 8 * i as u8);
            ppu.write_oam(0xFE00 + i * 4 + 2, 1);
        }
        render_frame(&mut ppu);
        let frame = ppu.frame();
        assert_eq!(frame.pixel(79, 0), 3);
        assert_eq!(frame.pixel(80, 0), 0);
    }

    #[test]
    fn object_flipping() {
        let mut ppu = lit_ppu();
        ppu.write_register(0xFF40, 0x93);
        ppu.write_register(0xFF48, 0xE4);
        // Tile 1 only has its top-left pixel set.
        ppu.write_vram(0x8010, 0x80);
        let objs: [[u8; 4]; 2] = [[16, 8, 1, 0x00], [16, 24, 1, 0x60]];
        for (i, obj) in objs.iter().enumerate() {
            for (j, byte) in obj.iter().enumerate() {
                ppu.write_oam(0xFE00 + (i * 4 + j) as u16, *byte);
            }
        }
        render_frame(&mut ppu);
        let frame = ppu.frame();
        assert_eq!(frame.pixel(0, 0), 1);
        assert_eq!(frame.pixel(23, 7), 1);
        assert_eq!(frame.pixel(16, 0), 0);
    }
}
