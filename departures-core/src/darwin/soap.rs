//! The departure board request envelope.

/// Build the `GetDepBoardWithDetails` envelope.
///
/// # Examples
///
/// ```
/// use departures_core::darwin::soap::departure_board_request;
///
/// let body = departure_board_request("token", "RDG", 9);
/// assert!(body.contains("<ns0:crs>RDG</ns0:crs>"));
/// assert!(body.contains("<ns0:numRows>9</ns0:numRows>"));
/// ```
pub fn departure_board_request(token: &str, crs: &str, num_rows: usize) -> String {
    format!(
        "<soap-env:Envelope xmlns:soap-env=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soap-env:Header>\
         <ns0:AccessToken xmlns:ns0=\"http://thalesgroup.com/RTTI/2013-11-28/Token/types\">\
         <ns0:TokenValue>{token}</ns0:TokenValue>\
         </ns0:AccessToken>\
         </soap-env:Header>\
         <soap-env:Body>\
         <ns0:GetDepBoardWithDetailsRequest xmlns:ns0=\"http://thalesgroup.com/RTTI/2021-11-01/ldb/\">\
         <ns0:numRows>{num_rows}</ns0:numRows>\
         <ns0:crs>{crs}</ns0:crs>\
         </ns0:GetDepBoardWithDetailsRequest>\
         </soap-env:Body>\
         </soap-env:Envelope>",
        token = escape(token),
        crs = escape(crs),
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_envelope() {
        let expected = concat!(
            r#"<soap-env:Envelope xmlns:soap-env="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<soap-env:Header><ns0:AccessToken xmlns:ns0="http://thalesgroup.com/RTTI/2013-11-28/Token/types">"#,
            r#"<ns0:TokenValue>abc-123</ns0:TokenValue></ns0:AccessToken></soap-env:Header>"#,
            r#"<soap-env:Body><ns0:GetDepBoardWithDetailsRequest xmlns:ns0="http://thalesgroup.com/RTTI/2021-11-01/ldb/">"#,
            r#"<ns0:numRows>9</ns0:numRows><ns0:crs>PAD</ns0:crs>"#,
            r#"</ns0:GetDepBoardWithDetailsRequest></soap-env:Body></soap-env:Envelope>"#,
        );
        assert_eq!(departure_board_request("abc-123", "PAD", 9), expected);
    }

    #[test]
    fn markup_in_token_escaped() {
        let body = departure_board_request("a<b&c", "PAD", 9);
        assert!(body.contains("<ns0:TokenValue>a&lt;b&amp;c</ns0:TokenValue>"));
    }
}
