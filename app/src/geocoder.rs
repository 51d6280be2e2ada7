use anyhow::Context;
use geo_types::point;
use serde::Deserialize;
use wake_stop_lib::session::Destination;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

// Nominatim sends lat/lon as strings.
#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: String,
}

/// Resolve a free-text place name to a destination via the OpenStreetMap
/// Nominatim API. Takes the best hit.
pub async fn geocode(query: &str) -> anyhow::Result<Destination> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("wake-stop/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let results: Vec<SearchResult> = client
        .get(NOMINATIM_URL)
        .query(&[("format", "json"), ("q", query), ("limit", "5")])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let hit = results
        .into_iter()
        .next()
        .with_context(|| format!("No geocoding results for {query:?}"))?;
    result_to_destination(hit)
}

fn result_to_destination(hit: SearchResult) -> anyhow::Result<Destination> {
    let lat: f64 = hit
        .lat
        .parse()
        .with_context(|| format!("Malformed latitude {:?}", hit.lat))?;
    let lon: f64 = hit
        .lon
        .parse()
        .with_context(|| format!("Malformed longitude {:?}", hit.lon))?;

    Ok(Destination {
        position: point!(x: lon, y: lat),
        name: hit.display_name,
    })
}
