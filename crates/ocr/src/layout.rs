//! Reassembles scattered OCR tokens into printed rows.

use crate::types::Token;

/// Tokens sharing one inferred row, ordered left to right.
#[derive(Debug, Clone)]
pub struct Line<'a> {
    pub tokens: Vec<&'a Token>,
    /// Mean of the member tokens' vertical centers; infinite for a token with no position.
    pub y_center: f64,
    /// Token texts joined with single spaces.
    pub text: String,
}

impl<'a> Line<'a> {
    fn from_members(mut members: Vec<Placed<'a>>) -> Self {
        members.sort_by(|a, b| a.x.total_cmp(&b.x));
        let y_center = members.iter().map(|m| m.y).sum::<f64>() / members.len() as f64;
        let text = members
            .iter()
            .map(|m| m.token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self { tokens: members.into_iter().map(|m| m.token).collect(), y_center, text }
    }
}

#[derive(Clone, Copy)]
struct Placed<'a> {
    token: &'a Token,
    x: f64,
    y: f64,
}

/// Median of the token heights. Degenerate tokens count as `fallback`.
pub fn median_height(tokens: &[Token], fallback: f64) -> f64 {
    let mut heights: Vec<f64> = tokens.iter().map(|t| t.height().unwrap_or(fallback)).collect();
    if heights.is_empty() {
        return fallback;
    }
    heights.sort_by(f64::total_cmp);
    let mid = heights.len() / 2;
    if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) / 2.0
    } else {
        heights[mid]
    }
}

/// Cluster tokens into lines, top to bottom.
///
/// The vertical tolerance is `median_height * factor`, so it follows the font size
/// of the receipt rather than the image resolution. A token joins the open line when
/// its center lies within the tolerance of the line's *first* token; otherwise it
/// opens a new line.
///
/// Tokens without a usable position (empty or non-finite quad) never join a real
/// row. Each one becomes its own line after the positioned rows, in input order.
pub fn group_into_lines(tokens: &[Token], factor: f64, fallback_height: f64) -> Vec<Line<'_>> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let threshold = median_height(tokens, fallback_height) * factor;

    let (positioned, unplaced): (Vec<&Token>, Vec<&Token>) =
        tokens.iter().partition(|t| t.has_position());

    let mut placed: Vec<Placed<'_>> = positioned
        .into_iter()
        .map(|token| Placed { token, x: token.x_center(), y: token.y_center() })
        .collect();
    placed.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut rows: Vec<Vec<Placed<'_>>> = Vec::new();
    for p in placed {
        match rows.last_mut() {
            Some(row) if (p.y - row[0].y).abs() <= threshold => row.push(p),
            _ => rows.push(vec![p]),
        }
    }

    tracing::trace!(
        tokens = tokens.len(),
        lines = rows.len(),
        unplaced = unplaced.len(),
        threshold,
        "grouped tokens"
    );
    let mut lines: Vec<Line<'_>> = rows.into_iter().map(Line::from_members).collect();
    lines.extend(unplaced.into_iter().map(|token| Line {
        tokens: vec![token],
        y_center: f64::INFINITY,
        text: token.text.clone(),
    }));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn tok(x: f64, y: f64, h: f64, text: &str) -> Token {
        Token::from_rect(x - 10.0, y - h / 2.0, 20.0, h, text, 0.9)
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert!(group_into_lines(&[], 1.6, 12.0).is_empty());
    }

    #[test]
    fn two_rows_of_two() {
        let tokens = vec![
            tok(200.0, 40.0, 10.0, "2.00"),
            tok(20.0, 10.0, 10.0, "Coffee"),
            tok(20.0, 40.0, 10.0, "Bagel"),
            tok(200.0, 10.0, 10.0, "3.50"),
        ];
        let lines = group_into_lines(&tokens, 1.6, 12.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Coffee 3.50");
        assert_eq!(lines[1].text, "Bagel 2.00");
        assert_eq!(lines[0].tokens.len(), 2);
        assert_eq!(lines[0].y_center, 10.0);
    }

    #[test]
    fn slight_skew_stays_on_one_line() {
        let tokens = vec![
            tok(20.0, 100.0, 10.0, "Total"),
            tok(120.0, 104.0, 10.0, "$12.00"),
        ];
        let lines = group_into_lines(&tokens, 1.6, 12.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].y_center, 102.0);
    }

    #[test]
    fn threshold_is_measured_from_line_anchor() {
        // 0 -> 15 -> 30: each step is within 16 of its neighbour, but 30 is 30 away
        // from the anchor at 0, so it opens a new line.
        let tokens = vec![
            tok(10.0, 0.0, 10.0, "a"),
            tok(30.0, 15.0, 10.0, "b"),
            tok(50.0, 30.0, 10.0, "c"),
        ];
        let lines = group_into_lines(&tokens, 1.6, 12.0);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["a b", "c"]);
    }

    #[test]
    fn median_handles_even_count_and_degenerate_tokens() {
        let tokens = vec![
            tok(0.0, 0.0, 10.0, "a"),
            tok(0.0, 50.0, 20.0, "b"),
            Token::new(vec![], "c", 0.1),
            Token::new(vec![Point::new(0.0, 9.0), Point::new(5.0, 9.0)], "d", 0.1),
        ];
        // heights: 10, 20, 12 (fallback), 12 (fallback) -> median 12
        assert_eq!(median_height(&tokens, 12.0), 12.0);
    }

    #[test]
    fn degenerate_token_does_not_abort_grouping() {
        let tokens = vec![tok(10.0, 100.0, 10.0, "Tea"), Token::new(vec![], "ghost", 0.1)];
        let lines = group_into_lines(&tokens, 1.6, 12.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Tea");
        assert_eq!(lines[1].text, "ghost");
    }

    #[test]
    fn unplaced_tokens_never_join_rows_near_the_origin() {
        let nan = Point::new(f64::NAN, 4.0);
        let tokens = vec![
            tok(20.0, 9.0, 18.0, "Coffee"),
            Token::new(vec![], "SKU", 0.1),
            tok(200.0, 9.0, 18.0, "3.50"),
            Token::new(vec![nan, nan, nan, nan], "0001", 0.1),
        ];
        let lines = group_into_lines(&tokens, 1.6, 12.0);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["Coffee 3.50", "SKU", "0001"]);
        assert_eq!(lines[0].y_center, 9.0);
    }
}
