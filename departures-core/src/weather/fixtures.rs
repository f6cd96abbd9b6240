//! Current-weather documents for tests, shaped like live responses.

/// A reply with `conditions` as the weather array's descriptions.
pub fn weather_document(conditions: &[&str], temp: f32, wind_speed: f32) -> String {
    let weather: Vec<String> = conditions
        .iter()
        .enumerate()
        .map(|(i, description)| {
            format!(
                r#"{{"id":{},"main":"Clouds","description":"{description}","icon":"04d"}}"#,
                800 + i
            )
        })
        .collect();
    format!(
        r#"{{"coord":{{"lon":-0.13,"lat":51.52}},"weather":[{}],"base":"stations","main":{{"temp":{temp},"feels_like":{},"temp_min":9.5,"temp_max":13.1,"pressure":1012,"humidity":81}},"visibility":10000,"wind":{{"speed":{wind_speed},"deg":240,"gust":9.3}},"clouds":{{"all":75}},"dt":1741946400,"sys":{{"type":2,"id":2075535,"country":"GB","sunrise":1741932662,"sunset":1741975033}},"timezone":0,"id":2643743,"name":"London","cod":200}}"#,
        weather.join(","),
        temp - 1.0
    )
}
