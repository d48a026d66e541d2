//! # Terminal Rendering
//!
//! Development mode counterpart to [`crate::plotting`]: prints each summary
//! table as a horizontal bar chart on stdout, so a run can be inspected over
//! SSH without opening SVG files.
//!
//! ```text
//! Average Count of Tides Below 0.1 ft
//!  Jan │████████████████████████████████████████    3.00
//!  Feb │                                            0.00
//! ```
//!
//! Bars grow right from a zero column. Negative values grow left of it, which
//! matters for tide heights below the MLLW datum.

/// Width of the bar area in characters (both sides of zero together)
const BAR_WIDTH: usize = 40;
/// Width of the row label column
const LABEL_WIDTH: usize = 4;

/// Render labelled values as a horizontal bar chart.
///
/// Labels are truncated to three characters; values are printed with two
/// decimals. An empty table renders the title and a `(no data)` line.
pub fn render_bars(title: &str, bars: &[(String, f64)]) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');

    if bars.is_empty() {
        out.push_str("  (no data)\n");
        return out;
    }

    let max_pos = bars.iter().fold(0.0f64, |m, (_, v)| m.max(*v));
    let max_neg = bars.iter().fold(0.0f64, |m, (_, v)| m.max(-*v));
    let span = max_pos + max_neg;

    // Columns reserved left of the zero axis for negative bars
    let neg_cols = if span > 0.0 {
        ((max_neg / span) * BAR_WIDTH as f64).round() as usize
    } else {
        0
    };
    let pos_cols = BAR_WIDTH - neg_cols;

    let scale = |v: f64, cols: usize, max: f64| -> usize {
        if max > 0.0 {
            ((v / max) * cols as f64).round() as usize
        } else {
            0
        }
    };

    for (label, value) in bars {
        let short: String = label.chars().take(3).collect();
        let mut row = vec![' '; BAR_WIDTH];
        if *value < 0.0 {
            let len = scale(-value, neg_cols, max_neg);
            for cell in row.iter_mut().take(neg_cols).skip(neg_cols - len) {
                *cell = '░';
            }
        } else {
            let len = scale(*value, pos_cols, max_pos);
            for cell in row.iter_mut().skip(neg_cols).take(len) {
                *cell = '█';
            }
        }
        let (left, right): (String, String) = (
            row[..neg_cols].iter().collect(),
            row[neg_cols..].iter().collect(),
        );
        out.push_str(&format!(
            "{:>width$} {}│{} {:>7.2}\n",
            short,
            left,
            right,
            value,
            width = LABEL_WIDTH
        ));
    }
    out
}

/// Print a bar chart to stdout.
pub fn draw_ascii(title: &str, bars: &[(String, f64)]) {
    println!("{}", render_bars(title, bars));
}
