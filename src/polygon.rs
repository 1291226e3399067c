//! Warning polygon parsing and planar containment.

const EPSILON: f64 = 1e-12;

/// Parses a whitespace-separated `"lat,lon lat,lon ..."` string.
///
/// Tokens that are not two finite numbers are dropped. Fewer than three
/// surviving points means there is no usable polygon.
pub fn parse_polygon(text: &str) -> Option<Vec<(f64, f64)>> {
    let points: Vec<(f64, f64)> = text.split_whitespace().filter_map(parse_point).collect();

    if points.len() < 3 {
        return None;
    }
    Some(points)
}

fn parse_point(token: &str) -> Option<(f64, f64)> {
    let (lat, lon) = token.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some((lat, lon))
}

/// Ray-casting containment test. Longitude is the x axis, latitude the y
/// axis; no antimeridian handling.
pub fn point_in_polygon(lat: f64, lon: f64, polygon: &[(f64, f64)]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (yi, xi) = polygon[i];
        let (yj, xj) = polygon[j];

        if (yi > lat) != (yj > lat) {
            let mut dy = yj - yi;
            if dy.abs() < EPSILON {
                dy = EPSILON;
            }
            let x_intercept = (xj - xi) * (lat - yi) / dy + xi;
            if lon < x_intercept {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}
