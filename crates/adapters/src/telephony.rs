//! Carrier instruction documents
//!
//! Builds the XML document returned from the telephony webhook: greet the
//! caller, open a media stream for inbound audio, and keep gathering speech.
//! Provider-neutral; the element vocabulary matches what mainstream carriers
//! accept.

/// Answer document for an incoming call
pub fn carrier_answer_document(greeting: &str, stream_url: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<Response>",
            "<Start><Stream url=\"{stream_url}\"/></Start>",
            "<Say>{greeting}</Say>",
            "<Gather input=\"speech\" timeout=\"5\"/>",
            "</Response>"
        ),
        stream_url = xml_escape(stream_url),
        greeting = xml_escape(greeting),
    )
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
