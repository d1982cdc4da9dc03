use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Fill projected rings with the even-odd rule, sampling each pixel at its
/// centre. Holes are just additional rings.
pub fn fill_rings(canvas: &mut BrailleCanvas, rings: &[Vec<(f64, f64)>]) {
    let max_x = (canvas.width() * 2) as i32 - 1;
    let max_y = (canvas.height() * 4) as i32 - 1;
    if max_x < 0 || max_y < 0 {
        return;
    }

    let (lo, hi) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if lo > hi {
        return;
    }
    let y_start = (lo.floor() as i32).max(0);
    let y_end = (hi.ceil() as i32).min(max_y);

    let mut crossings: Vec<f64> = Vec::new();
    for py in y_start..=y_end {
        let sy = py as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            let n = ring.len();
            if n < 3 {
                continue;
            }
            for i in 0..n {
                let (x0, y0) = ring[i];
                let (x1, y1) = ring[(i + 1) % n];
                if (y0 <= sy) != (y1 <= sy) {
                    crossings.push(x0 + (sy - y0) * (x1 - x0) / (y1 - y0));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            let from = ((span[0] - 0.5).ceil() as i32).max(0);
            let to = ((span[1] - 0.5).floor() as i32).min(max_x);
            for px in from..=to {
                canvas.set_pixel(px as usize, py as usize);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        // Top dots of every character
        assert_eq!(canvas.to_string(), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert_eq!(canvas.to_string(), "⡇\n⡇");
    }

    #[test]
    fn test_fill_square() {
        let mut canvas = BrailleCanvas::new(3, 1);
        let square = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
        fill_rings(&mut canvas, &[square]);
        assert_eq!(canvas.to_string(), "⣿⣿⠀");
    }

    #[test]
    fn test_fill_respects_hole() {
        let mut canvas = BrailleCanvas::new(3, 2);
        let outer = vec![(0.0, 0.0), (6.0, 0.0), (6.0, 8.0), (0.0, 8.0)];
        let hole = vec![(2.0, 2.0), (4.0, 2.0), (4.0, 6.0), (2.0, 6.0)];
        fill_rings(&mut canvas, &[outer, hole]);
        // Middle column loses the dots inside the hole
        let rows: Vec<String> = canvas.rows().collect();
        assert_eq!(rows[0], "⣿⠛⣿");
        assert_eq!(rows[1], "⣿⣤⣿");
    }

    #[test]
    fn test_fill_clips_to_canvas() {
        let mut canvas = BrailleCanvas::new(1, 1);
        let huge = vec![(-50.0, -50.0), (50.0, -50.0), (50.0, 50.0), (-50.0, 50.0)];
        fill_rings(&mut canvas, &[huge]);
        assert_eq!(canvas.to_string(), "⣿");
    }
}
