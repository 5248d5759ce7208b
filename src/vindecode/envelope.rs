//! Request and response envelopes of the decoding protocol.

use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::warn;

use super::fields;
use crate::core::{AttributeValue, DecodeError, DecodedVehicle};

pub const REQUEST_ROOT: &str = "VinDecodeRequest";
pub const RESPONSE_ROOT: &str = "VinDecodeResponse";

fn xml_io(e: std::io::Error) -> DecodeError {
    DecodeError::Malformed(format!("XML write error: {e}"))
}

struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    fn new() -> Result<Self, DecodeError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    fn into_string(self) -> Result<String, DecodeError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| DecodeError::Malformed(format!("XML UTF-8 error: {e}")))
    }

    fn start_element(&mut self, name: &str) -> Result<&mut Self, DecodeError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    fn end_element(&mut self, name: &str) -> Result<&mut Self, DecodeError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, DecodeError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }
}

/// Build the request envelope for a VIN and the requested field codes.
pub fn build_request(vin: &str, requested_fields: &[&str]) -> Result<String, DecodeError> {
    let mut w = XmlWriter::new()?;
    w.start_element(REQUEST_ROOT)?;
    w.text_element("Vin", vin)?;
    w.start_element("RequestedFields")?;
    for field in requested_fields {
        w.text_element("Field", field)?;
    }
    w.end_element("RequestedFields")?;
    w.end_element(REQUEST_ROOT)?;
    w.into_string()
}

/// The response envelope before return-code classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeResponse {
    pub return_code: Option<i32>,
    pub vin: Option<String>,
    pub corrected_vin: Option<String>,
    /// `(field name, raw value)` in document order. Empty values are kept.
    pub fields: Vec<(String, String)>,
}

/// Parse a response envelope into its flat parts.
pub fn parse_response(xml: &str) -> Result<DecodeResponse, DecodeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut resp = DecodeResponse::default();
    let mut path: Vec<String> = Vec::new();
    let mut saw_root = false;
    let mut current_field: Option<(String, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = element_name(e);
                if path.is_empty() {
                    if name != RESPONSE_ROOT {
                        return Err(DecodeError::Malformed(format!(
                            "unexpected root element <{name}>"
                        )));
                    }
                    saw_root = true;
                }
                if name == "Field" && path.last().is_some_and(|p| p == "Fields") {
                    current_field = Some((field_name_attr(e)?, String::new()));
                }
                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = element_name(e);
                if path.is_empty() && name == RESPONSE_ROOT {
                    saw_root = true;
                }
                // <Field name="X"/> is a field present with an empty value.
                if name == "Field" && path.last().is_some_and(|p| p == "Fields") {
                    resp.fields.push((field_name_attr(e)?, String::new()));
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| DecodeError::Malformed(format!("bad text: {err}")))?;
                handle_text(&mut resp, &path, &mut current_field, &text)?;
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).into_owned();
                handle_text(&mut resp, &path, &mut current_field, &text)?;
            }
            Ok(Event::End(_)) => {
                let ended = path.pop().unwrap_or_default();
                if ended == "Field" {
                    if let Some(field) = current_field.take() {
                        resp.fields.push(field);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DecodeError::Malformed(format!("XML parse error: {e}")));
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(DecodeError::Malformed(format!(
            "missing <{RESPONSE_ROOT}> element"
        )));
    }
    Ok(resp)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn field_name_attr(e: &BytesStart<'_>) -> Result<String, DecodeError> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"name" {
            let value = attr
                .unescape_value()
                .map_err(|err| DecodeError::Malformed(format!("bad field name: {err}")))?;
            return Ok(value.trim().to_string());
        }
    }
    Err(DecodeError::Malformed("<Field> without name attribute".into()))
}

fn handle_text(
    resp: &mut DecodeResponse,
    path: &[String],
    current_field: &mut Option<(String, String)>,
    text: &str,
) -> Result<(), DecodeError> {
    let leaf = path.last().map(String::as_str).unwrap_or("");
    let parent = if path.len() >= 2 {
        path[path.len() - 2].as_str()
    } else {
        ""
    };
    if parent != RESPONSE_ROOT && leaf != "Field" {
        return Ok(());
    }
    match leaf {
        "ReturnCode" => {
            let code = text.trim().parse::<i32>().map_err(|_| {
                DecodeError::Malformed(format!("return code '{}' is not a number", text.trim()))
            })?;
            resp.return_code = Some(code);
        }
        "Vin" => resp.vin = Some(text.trim().to_string()),
        "CorrectedVin" => {
            resp.corrected_vin = Some(text.trim().to_string()).filter(|v| !v.is_empty());
        }
        "Field" => {
            if let Some((_, value)) = current_field.as_mut() {
                value.push_str(text);
            }
        }
        _ => {}
    }
    Ok(())
}

impl DecodeResponse {
    /// Classify the return code and extract recognized fields.
    ///
    /// `submitted_vin` is used when the envelope does not echo the VIN.
    pub fn into_decoded(self, submitted_vin: &str) -> Result<DecodedVehicle, DecodeError> {
        let code = self
            .return_code
            .ok_or_else(|| DecodeError::Malformed("missing <ReturnCode>".into()))?;
        if let Some(err) = DecodeError::from_return_code(code) {
            return Err(err);
        }

        let vin = self.vin.unwrap_or_else(|| submitted_vin.to_string());
        let corrected_vin = self.corrected_vin.filter(|c| *c != vin);
        let mut decoded = DecodedVehicle {
            vin,
            corrected_vin,
            return_code: code,
            ..Default::default()
        };

        for (name, raw) in self.fields {
            let Some(value) = AttributeValue::parse(&raw) else {
                continue;
            };
            if fields::is_identity_field(&name) {
                let AttributeValue::Code(id) = value else {
                    warn!(
                        field = name.as_str(),
                        value = raw.as_str(),
                        "non-numeric identity field, ignoring"
                    );
                    continue;
                };
                match name.as_str() {
                    fields::BASE_VEHICLE_ID => decoded.base_vehicle_external_id = Some(id),
                    fields::MAKE_ID => decoded.make_external_id = Some(id),
                    fields::MODEL_ID => decoded.model_external_id = Some(id),
                    fields::SUBMODEL_ID => decoded.submodel_external_id = Some(id),
                    fields::YEAR_ID => decoded.year_id = i32::try_from(id).ok(),
                    fields::REGION_ID => decoded.region_id = Some(id),
                    _ => {}
                }
            } else if fields::is_config_field(&name) {
                decoded.external_config_attributes.insert(name, value);
            }
        }
        Ok(decoded)
    }
}

/// Parse and classify a response envelope in one step.
pub fn decode_response(xml: &str, submitted_vin: &str) -> Result<DecodedVehicle, DecodeError> {
    parse_response(xml)?.into_decoded(submitted_vin)
}
