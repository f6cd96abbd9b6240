//! Stop point documents for tests, shaped like live responses.

pub fn arrival(destination: &str, line: &str, seconds: i64) -> String {
    format!(
        r#"{{"$type":"Tfl.Api.Presentation.Entities.Prediction, Tfl.Api.Presentation.Entities","id":"-{seconds}42","operationType":1,"vehicleId":"204","naptanId":"940GZZLUOXC","stationName":"Oxford Circus Underground Station","lineId":"victoria","lineName":"{line}","platformName":"Southbound - Platform 4","direction":"outbound","bearing":"","destinationNaptanId":"940GZZLUBXN","destinationName":"{destination}","timestamp":"2025-03-14T10:00:00.000Z","timeToStation":{seconds},"currentLocation":"At Warren Street","towards":"Brixton","expectedArrival":"2025-03-14T10:04:00Z","timeToLive":"2025-03-14T10:04:00Z","modeName":"tube","timing":{{"$type":"Tfl.Api.Presentation.Entities.PredictionTiming, Tfl.Api.Presentation.Entities","countdownServerAdjustment":"00:00:00","source":"0001-01-01T00:00:00","insert":"0001-01-01T00:00:00","read":"2025-03-14T10:00:00Z","sent":"2025-03-14T10:00:00Z","received":"0001-01-01T00:00:00"}}}}"#
    )
}

/// Four predictions, unsorted, one with no destination.
pub fn arrivals_document() -> String {
    let without_destination = arrival("", "Victoria", 540).replace(r#""destinationName":"","#, "");
    let entries = [
        arrival("Hammersmith (H&C Line)", "Hammersmith & City", 300),
        arrival("Brixton Underground Station", "Victoria", 45),
        without_destination,
        arrival("Walthamstow Central Underground Station", "Victoria", 170),
    ];
    format!("[{}]", entries.join(",\n"))
}

/// `count` flattened disruption entries.
pub fn disruptions_document(count: usize) -> String {
    let entries: Vec<String> = (1..=count)
        .map(|i| {
            format!(
                r#"{{"$type":"Tfl.Api.Presentation.Entities.DisruptedPoint, Tfl.Api.Presentation.Entities","atcoCode":"940GZZLUOXC","fromDate":"2025-03-01T00:00:00Z","toDate":"2025-04-01T00:00:00Z","description":"Oxford Circus Station: Lift {i} is out of service.","commonName":"Oxford Circus Underground Station","type":"Information","mode":"tube","stationAtcoCode":"940GZZLUOXC","appearance":"PlannedWork","additionalInformation":"Use the stairs"}}"#
            )
        })
        .collect();
    format!("[{}]", entries.join(","))
}
