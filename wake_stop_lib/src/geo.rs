use geo_types::Point;

/// Great-circle distance between two points in km, haversine formula.
/// Points are (x = longitude, y = latitude) in degrees.
pub fn haversine_km(a: Point, b: Point) -> f64 {
    const R: f64 = 6371.0; // Radius of the earth in km

    let d_lat = (b.y() - a.y()).to_radians();
    let d_lon = (b.x() - a.x()).to_radians();
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();

    let h = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::atan2(f64::sqrt(h), f64::sqrt(1. - h));

    R * c
}
