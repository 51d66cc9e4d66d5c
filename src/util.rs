/// Parses the id out of a resource url such as `https://pokeapi.co/api/v2/pokemon/25/`.
pub fn parse_trailing_id(url: &str) -> Option<i64> {
    url.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .and_then(|segment| segment.parse().ok())
}

pub fn thumbnail_url(sprite_url: &str, id: i64) -> String {
    format!("{sprite_url}/{id}.png")
}

/// Parses a query value leniently: anything that is not a non-zero integer yields `default`.
pub fn int_or(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v != 0)
        .unwrap_or(default)
}
