//! Oscilloscope widget for ratatui

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Widget},
};

/// Draws the min/max envelope of a block of samples, one column per slice
pub struct Scope<'a> {
    samples: &'a [f32],
    style: Style,
    clip_style: Style,
    block: Option<Block<'a>>,
}

impl<'a> Scope<'a> {
    pub fn new(samples: &'a [f32]) -> Self {
        Self {
            samples,
            style: Style::default(),
            clip_style: Style::default().fg(Color::Red),
            block: None,
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Smallest and largest sample in the slice drawn at column `x`
    fn column_range(&self, x: usize, width: usize) -> (f32, f32) {
        let len = self.samples.len();
        let start = x * len / width;
        let end = ((x + 1) * len / width).max(start + 1).min(len);

        if start >= len {
            return (0.0, 0.0);
        }

        self.samples[start..end]
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)))
    }

    fn render_scope(&self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let half = (area.height.saturating_sub(1) / 2) as f32;
        let center_y = area.y + area.height / 2;

        // Center line first so the trace draws over it
        for x in area.x..area.x + area.width {
            buf.set_string(x, center_y, "─", Style::default());
        }

        if self.samples.is_empty() {
            return;
        }

        // Sample values map onto rows with +1.0 at the top
        let row_of = |value: f32| -> u16 {
            let offset = (value.clamp(-1.0, 1.0) * half).round() as i32;
            (center_y as i32 - offset).clamp(area.y as i32, (area.y + area.height - 1) as i32) as u16
        };

        for x in 0..width {
            let (lo, hi) = self.column_range(x, width);
            let style = if lo < -1.0 || hi > 1.0 {
                self.clip_style
            } else {
                self.style
            };

            let screen_x = area.x + x as u16;
            for y in row_of(hi)..=row_of(lo) {
                buf.set_string(screen_x, y, "│", style);
            }
        }
    }
}

impl Widget for Scope<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        self.render_scope(inner_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(buf: &Buffer, x: u16, height: u16) -> Vec<String> {
        (0..height).map(|y| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn test_scope_empty_draws_center_line() {
        let area = Rect::new(0, 0, 10, 5);
        let mut buf = Buffer::empty(area);
        Scope::new(&[]).render(area, &mut buf);

        assert_eq!(buf[(0, 2)].symbol(), "─");
        assert_eq!(buf[(0, 0)].symbol(), " ");
    }

    #[test]
    fn test_scope_full_scale_spans_height() {
        let samples = [1.0, -1.0];
        let area = Rect::new(0, 0, 1, 5);
        let mut buf = Buffer::empty(area);
        Scope::new(&samples).render(area, &mut buf);

        assert!(column(&buf, 0, 5).iter().all(|s| s == "│"));
    }

    #[test]
    fn test_scope_positive_sample_above_center() {
        let samples = [1.0, 1.0];
        let area = Rect::new(0, 0, 2, 5);
        let mut buf = Buffer::empty(area);
        Scope::new(&samples).render(area, &mut buf);

        // Only the top row holds the trace; the rest keeps the center line
        assert_eq!(column(&buf, 0, 5), vec!["│", " ", "─", " ", " "]);
    }

    #[test]
    fn test_scope_more_columns_than_samples() {
        let samples = [0.0, 0.5, -0.5];
        let area = Rect::new(0, 0, 12, 6);
        let mut buf = Buffer::empty(area);
        Scope::new(&samples).render(area, &mut buf);
    }

    #[test]
    fn test_scope_clipping_uses_clip_style() {
        let samples = [2.0; 4];
        let area = Rect::new(0, 0, 4, 3);
        let mut buf = Buffer::empty(area);
        Scope::new(&samples).render(area, &mut buf);

        assert_eq!(buf[(0, 0)].fg, Color::Red);
    }

    #[test]
    fn test_scope_with_block() {
        let samples = vec![0.5; 10];
        let scope = Scope::new(&samples).block(Block::default().title("Output"));
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        scope.render(area, &mut buf);
    }

    #[test]
    fn test_scope_style() {
        let scope = Scope::new(&[]).style(Style::default().fg(Color::Cyan));
        assert_eq!(scope.style.fg, Some(Color::Cyan));
    }
}
