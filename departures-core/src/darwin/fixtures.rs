//! SOAP board documents for tests, shaped like live responses.

#[derive(Debug, Default)]
pub struct ServiceXml<'a> {
    pub std: &'a str,
    pub etd: Option<&'a str>,
    pub platform: Option<&'a str>,
    pub operator: Option<&'a str>,
    pub service_type: Option<&'a str>,
    pub length: Option<&'a str>,
    pub delay_reason: Option<&'a str>,
    pub cancel_reason: Option<&'a str>,
    pub origin: Option<&'a str>,
    pub destination: Option<&'a str>,
    pub via: Option<&'a str>,
    pub calling: &'a [(&'a str, &'a str)],
    pub coaches: &'a [&'a str],
}

fn element(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        out.push_str(&format!("<{name}>{value}</{name}>\n"));
    }
}

pub fn service_xml(s: &ServiceXml<'_>) -> String {
    let mut out = String::from("<lt8:service>\n");
    element(&mut out, "lt4:std", Some(s.std));
    element(&mut out, "lt4:etd", s.etd);
    element(&mut out, "lt4:platform", s.platform);
    element(&mut out, "lt4:operator", s.operator);
    element(&mut out, "lt4:operatorCode", Some("GW"));
    element(&mut out, "lt4:serviceType", s.service_type.or(Some("train")));
    element(&mut out, "lt4:length", s.length);
    element(&mut out, "lt4:delayReason", s.delay_reason);
    element(&mut out, "lt4:cancelReason", s.cancel_reason);
    element(&mut out, "lt4:serviceID", Some("1234567RDNGSTN_"));
    if let Some(origin) = s.origin {
        out.push_str("<lt5:origin><lt4:location>\n");
        element(&mut out, "lt4:locationName", Some(origin));
        element(&mut out, "lt4:crs", Some("XXX"));
        out.push_str("</lt4:location></lt5:origin>\n");
    }
    if let Some(destination) = s.destination {
        out.push_str("<lt5:destination><lt4:location>\n");
        element(&mut out, "lt4:locationName", Some(destination));
        element(&mut out, "lt4:crs", Some("YYY"));
        element(&mut out, "lt4:via", s.via);
        out.push_str("</lt4:location></lt5:destination>\n");
    }
    if !s.coaches.is_empty() {
        out.push_str("<lt6:formation><lt6:coaches>\n");
        for (i, class) in s.coaches.iter().enumerate() {
            out.push_str(&format!(
                "<lt7:coach><lt7:coachClass>{class}</lt7:coachClass><lt7:number>{}</lt7:number></lt7:coach>\n",
                i + 1
            ));
        }
        out.push_str("</lt6:coaches></lt6:formation>\n");
    }
    if !s.calling.is_empty() {
        out.push_str("<lt8:subsequentCallingPoints><lt8:callingPointList>\n");
        for (name, time) in s.calling {
            out.push_str("<lt8:callingPoint>\n");
            element(&mut out, "lt8:locationName", Some(name));
            element(&mut out, "lt8:crs", Some("ZZZ"));
            element(&mut out, "lt8:st", Some(time));
            element(&mut out, "lt8:et", Some("On time"));
            out.push_str("</lt8:callingPoint>\n");
        }
        out.push_str("</lt8:callingPointList></lt8:subsequentCallingPoints>\n");
    }
    out.push_str("</lt8:service>\n");
    out
}

/// A complete response around train services, with no messages.
pub fn wrap_services(location: &str, services: &str) -> String {
    document(location, "", &format!("<lt8:trainServices>\n{services}</lt8:trainServices>\n"))
}

fn document(location: &str, messages: &str, services: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
<soap:Body>
<GetDepBoardWithDetailsResponse xmlns="http://thalesgroup.com/RTTI/2021-11-01/ldb/">
<GetStationBoardResult xmlns:lt="http://thalesgroup.com/RTTI/2012-01-13/ldb/types" xmlns:lt8="http://thalesgroup.com/RTTI/2021-11-01/ldb/types" xmlns:lt4="http://thalesgroup.com/RTTI/2015-11-27/ldb/types">
<lt4:generatedAt>2025-03-14T09:55:12.0391342+00:00</lt4:generatedAt>
<lt4:locationName>{location}</lt4:locationName>
<lt4:crs>RDG</lt4:crs>
{messages}<lt4:platformAvailable>true</lt4:platformAvailable>
{services}</GetStationBoardResult>
</GetDepBoardWithDetailsResponse>
</soap:Body>
</soap:Envelope>
"#
    )
}

/// Reading, with three valid trains, two invalid ones, a bus and a message.
pub fn board_document() -> String {
    let trains = [
        service_xml(&ServiceXml {
            std: "10:45",
            etd: Some("Delayed"),
            platform: Some("9"),
            operator: Some("Great Western Railway"),
            delay_reason: Some("This train has been delayed by a signalling fault..."),
            destination: Some("Oxford &amp; District"),
            ..ServiceXml::default()
        }),
        service_xml(&ServiceXml {
            std: "10:20",
            platform: Some("7"),
            destination: Some("Didcot Parkway"),
            ..ServiceXml::default()
        }),
        service_xml(&ServiceXml {
            std: "10:15",
            etd: Some("On time"),
            platform: Some("4"),
            operator: Some("Great Western Railway"),
            origin: Some("London Paddington"),
            destination: Some("Bristol Temple Meads"),
            via: Some("via Bath Spa"),
            calling: &[("Didcot Parkway", "10:30"), ("Swindon", "10:45")],
            coaches: &["First", "Standard", "Standard"],
            ..ServiceXml::default()
        }),
        service_xml(&ServiceXml {
            std: "10:25",
            etd: Some("On time"),
            ..ServiceXml::default()
        }),
        service_xml(&ServiceXml {
            std: "09:58",
            etd: Some("10:02"),
            platform: Some("1"),
            length: Some("4"),
            destination: Some("Newbury"),
            coaches: &["Standard", "Standard"],
            ..ServiceXml::default()
        }),
    ]
    .concat();
    let bus = service_xml(&ServiceXml {
        std: "10:05",
        etd: Some("On time"),
        service_type: Some("bus"),
        destination: Some("Basingstoke"),
        ..ServiceXml::default()
    });
    let messages = "<lt4:nrccMessages><lt:message>&lt;p&gt;Disruption between Reading &amp; Didcot Parkway.&lt;/p&gt; More details can be found in Latest Travel News.</lt:message></lt4:nrccMessages>\n";
    document(
        "Reading",
        messages,
        &format!(
            "<lt8:trainServices>\n{trains}</lt8:trainServices>\n<lt8:busServices>\n{bus}</lt8:busServices>\n"
        ),
    )
}

/// A WSDL document advertising `location`.
pub fn wsdl_document(location: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<wsdl:definitions xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/" xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/" targetNamespace="http://thalesgroup.com/RTTI/2021-11-01/ldb/">
<wsdl:import namespace="http://thalesgroup.com/RTTI/2021-11-01/ldb/" location="rtti_2021-11-01_ldb.wsdl"/>
<wsdl:service name="ldb">
<wsdl:port name="LDBServiceSoap" binding="ldb:LDBServiceSoap">
<soap:address location="{location}"/>
</wsdl:port>
</wsdl:service>
</wsdl:definitions>
"#
    )
}
