use crate::types::Sheet;

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// ASCII drawing of one sheet, each piece labelled with its number.
pub fn render_sheet(sheet: &Sheet) -> String {
    if sheet.width == 0 || sheet.height == 0 {
        return String::new();
    }
    let scale = f64::min(
        MAX_WIDTH / sheet.width as f64,
        MAX_HEIGHT / sheet.height as f64,
    );
    let grid_w = (sheet.width as f64 * scale).round() as usize;
    let grid_h = (sheet.height as f64 * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];

    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for p in &sheet.pieces {
        let sx = (p.x as f64 * scale).round() as usize;
        let sy = (p.y as f64 * scale).round() as usize;
        let sw = (p.piece.width as f64 * scale).round() as usize;
        let sh = (p.piece.depth as f64 * scale).round() as usize;

        if sw == 0 || sh == 0 {
            continue;
        }

        draw_rect(&mut grid, sx, sy, sw, sh);

        let label: Vec<char> = format!("#{}", p.piece_number).chars().collect();
        if sw > 2 && sh > 1 {
            let cx = sx + sw / 2;
            let cy = sy + sh / 2;
            let start_x = cx.saturating_sub(label.len() / 2);

            for (i, &ch) in label.iter().enumerate() {
                let x = start_x + i;
                if x > sx && x < sx + sw && cy > sy && cy < sy + sh {
                    grid[cy][x] = ch;
                }
            }
        }
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

fn mark(cell: &mut char, line: char) {
    let crossing = if line == '-' { '|' } else { '-' };
    *cell = if *cell == crossing || *cell == '+' {
        '+'
    } else {
        line
    };
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = match grid.first() {
        Some(row) => row.len(),
        None => return,
    };

    for i in (x..=x + w).filter(|&i| i < cols) {
        for j in [y, y + h].into_iter().filter(|&j| j < rows) {
            mark(&mut grid[j][i], '-');
        }
    }
    for j in (y..=y + h).filter(|&j| j < rows) {
        for i in [x, x + w].into_iter().filter(|&i| i < cols) {
            mark(&mut grid[j][i], '|');
        }
    }
    for cx in [x, x + w] {
        for cy in [y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}
