use crate::matrix::{MAX_KEY, MIN_KEY, Point};
use indexmap::IndexMap;

/// Renders the extracted patterns as a Lua module: one table entry per
/// present key, ascending, each holding its `{x, y, color}` point tables.
/// Only entries before the last carry a trailing comma.
pub fn generate_matrix_table(patterns: &IndexMap<u32, Vec<Point>>) -> String {
    let mut lua = String::new();
    lua.push_str("-- Color matrix definitions for numbers 1-50\n");
    lua.push_str("local matrix_color_number = {\n");

    let present: Vec<(u32, &[Point])> = (MIN_KEY..=MAX_KEY)
        .filter_map(|key| patterns.get(&key).map(|points| (key, points.as_slice())))
        .collect();
    for (position, (key, points)) in present.iter().enumerate() {
        lua.push_str(&format!("    -- number {}\n", key));
        lua.push_str("    {\n");
        for (index, point) in points.iter().enumerate() {
            lua.push_str(&format!(
                "        {{x = {}, y = {}, color = {}}}{}\n",
                point.x,
                point.y,
                point.color,
                if index + 1 < points.len() { "," } else { "" }
            ));
        }
        lua.push_str(&format!(
            "    }}{}\n",
            if position + 1 < present.len() { "," } else { "" }
        ));
    }

    lua.push_str("}\n\nreturn matrix_color_number\n");
    lua
}
