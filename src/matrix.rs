use indexmap::IndexMap;
use nom::IResult;
use nom::Parser;
use nom::bytes::complete::tag;
use nom::character::complete::{digit1, space0, space1};
use nom::combinator::map_res;

/// Lowest record key recognized in a source file.
pub const MIN_KEY: u32 = 1;
/// Highest record key recognized in a source file.
pub const MAX_KEY: u32 = 50;

/// One cell of a color matrix. The color is a 24-bit value kept as its
/// `0x`-prefixed hex spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub color: String,
}

/// Splits a comma-separated payload into points, three tokens at a time.
/// Malformed triples and trailing partial groups are dropped without comment.
pub fn parse_color_data(line: &str) -> Vec<Point> {
    let tokens: Vec<&str> = line.split(',').collect();
    let mut points = Vec::new();
    for triple in tokens.chunks_exact(3) {
        let (Ok(x), Ok(y)) = (
            triple[0].trim().parse::<i32>(),
            triple[1].trim().parse::<i32>(),
        ) else {
            continue;
        };
        let Some(color) = normalize_color(triple[2].trim()) else {
            continue;
        };
        points.push(Point { x, y, color });
    }
    points
}

// Tokens already carrying the 0x marker pass through untouched.
fn normalize_color(token: &str) -> Option<String> {
    if token.contains("0x") {
        Some(token.to_string())
    } else {
        token.parse::<u32>().ok().map(|value| format!("0x{:06X}", value))
    }
}

/// Collects `<key> : <payload>` record lines from a source file. Keys outside
/// 1-50 are ignored; for a repeated key only the first line counts.
pub fn extract_patterns(content: &str) -> IndexMap<u32, Vec<Point>> {
    let mut patterns = IndexMap::new();
    for line in content.lines() {
        let Ok((_, (key, payload))) = record_line(line) else {
            continue;
        };
        if !(MIN_KEY..=MAX_KEY).contains(&key) || patterns.contains_key(&key) {
            continue;
        }
        patterns.insert(key, parse_color_data(payload));
    }
    patterns
}

fn record_line(line: &str) -> IResult<&str, (u32, &str)> {
    let (rest, _) = space0(line)?;
    let (rest, key) = map_res(digit1, |text: &str| text.parse::<u32>()).parse(rest)?;
    let (rest, _) = (space1, tag(":"), space1).parse(rest)?;
    Ok(("", (key, rest)))
}
