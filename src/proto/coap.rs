// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

/// Default UDP port of a CoAP server.
pub const DEFAULT_PORT: u16 = 5683;

/// Status reported for any CoAP code that has no entry in [`STATUS_TABLE`].
pub const FALLBACK_STATUS: u16 = 500;

/// CoAP response codes (`"c.dd"`) and the HTTP status they translate to.
pub const STATUS_TABLE: [(&str, u16); 21] = [
    ("2.01", 201), // Created
    ("2.02", 204), // Deleted
    ("2.03", 304), // Valid
    ("2.04", 200), // Changed
    ("2.05", 200), // Content
    ("4.00", 400),
    ("4.01", 401),
    ("4.02", 403), // Bad Option
    ("4.03", 403),
    ("4.04", 404),
    ("4.05", 405),
    ("4.06", 406),
    ("4.12", 428), // Precondition Failed
    ("4.13", 413),
    ("4.15", 415),
    ("5.00", 500),
    ("5.01", 501),
    ("5.02", 503), // Bad Gateway
    ("5.03", 503),
    ("5.04", 504),
    ("5.05", 505), // Proxying Not Supported
];

/// Translates a CoAP response code into an HTTP status code.
/// Codes missing from the table map to [`FALLBACK_STATUS`] rather than failing.
pub fn http_status(code: &str) -> u16 {
    STATUS_TABLE
        .iter()
        .find(|(coap, _)| *coap == code)
        .map_or(FALLBACK_STATUS, |&(_, status)| status)
}

/// Formats a raw CoAP code byte as `"c.dd"` (3-bit class, 5-bit detail).
pub fn code_string(raw: u8) -> String {
    format!("{}.{:02}", raw >> 5, raw & 0x1f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_entries() {
        for (code, status) in STATUS_TABLE {
            assert_eq!(http_status(code), status, "CoAP {code}");
        }
        assert_eq!(http_status("2.05"), 200);
        assert_eq!(http_status("4.12"), 428);
        assert_eq!(http_status("5.02"), 503);
    }

    #[test]
    fn unknown_codes_fall_back() {
        for code in ["2.31", "4.08", "4.29", "5.06", "0.00", "", "2.05 Content"] {
            assert_eq!(http_status(code), FALLBACK_STATUS, "CoAP {code:?}");
        }
    }

    #[test]
    fn code_formatting() {
        assert_eq!(code_string(0x45), "2.05");
        assert_eq!(code_string(0x41), "2.01");
        assert_eq!(code_string(0x84), "4.04");
        assert_eq!(code_string(0x8c), "4.12");
        assert_eq!(code_string(0xa5), "5.05");
        assert_eq!(code_string(0x00), "0.00");
    }
}
