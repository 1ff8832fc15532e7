//! Legacy advertising payload: a flags record followed by the device name.

/// Maximum size of a legacy advertising payload.
pub const MAX_ADV_LEN: usize = 31;

const AD_TYPE_FLAGS: u8 = 0x01;
const AD_TYPE_SHORT_NAME: u8 = 0x08;
const AD_TYPE_COMPLETE_NAME: u8 = 0x09;

/// LE General Discoverable, BR/EDR not supported.
const FLAGS_GENERAL_DISCOVERABLE: u8 = 0x06;

/// Build the advertising payload for `name`.
///
/// The name is cut at a UTF-8 boundary to fit; a cut name is advertised as
/// the shortened-name record, an intact one as the complete-name record.
pub fn advertising_payload(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_ADV_LEN);
    out.extend_from_slice(&[2, AD_TYPE_FLAGS, FLAGS_GENERAL_DISCOVERABLE]);

    let room = MAX_ADV_LEN - out.len() - 2;
    let mut end = name.len().min(room);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let shown = &name.as_bytes()[..end];
    let ad_type = if end == name.len() {
        AD_TYPE_COMPLETE_NAME
    } else {
        AD_TYPE_SHORT_NAME
    };
    if !shown.is_empty() {
        out.push(shown.len() as u8 + 1);
        out.push(ad_type);
        out.extend_from_slice(shown);
    }
    out
}
