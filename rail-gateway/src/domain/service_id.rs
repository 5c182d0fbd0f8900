//! Darwin service identifiers and their packed 128-bit form.
//!
//! Current Darwin service IDs look like `4611018PADTON__`: seven digits
//! followed by eight letters, digits or underscores. Older clients expect a
//! GUID-shaped value instead, so we pack the ID into 128 bits:
//!
//! ```text
//!  nibble 0..7    7..16        16..32
//!  |4611018|  000000000  |50 41 44 54 4F 4E 5F 5F|
//!   digits    padding      suffix bytes as hex
//! ```
//!
//! which prints as the GUID `46110180-0000-0000-5041-44544f4e5f5f`, or as
//! the URL-safe base64 string `RhEBgAAAAABQQURUT05fXw`.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Length of a current-format service ID.
pub const SERVICE_ID_LEN: usize = 15;

/// Number of leading decimal digits in a service ID.
const DIGIT_COUNT: usize = 7;

/// Bits taken by the digit region at the top of the token.
const DIGIT_BITS: u32 = 4 * DIGIT_COUNT as u32;

/// Length of a URL-safe, unpadded base64 encoding of 16 bytes.
const BASE64_TOKEN_LEN: usize = 22;

/// Error returned when a string is not a current-format service ID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid service ID: {reason}")]
pub struct FormatError {
    reason: &'static str,
}

impl FormatError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A current-format Darwin service ID.
///
/// # Examples
///
/// ```
/// use rail_gateway::domain::ServiceId;
///
/// let id = ServiceId::parse("4611018PADTON__").unwrap();
/// let token = id.token();
/// assert_eq!(token.to_guid_string(), "46110180-0000-0000-5041-44544f4e5f5f");
/// assert_eq!(token.decode(), "4611018PADTON__");
///
/// assert!(ServiceId::parse("4611018PADTON").is_err());
/// assert!(ServiceId::parse("46110I8PADTON__").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ServiceId(String);

impl ServiceId {
    /// Validate a current-format service ID.
    pub fn parse(s: &str) -> Result<Self, FormatError> {
        let bytes = s.as_bytes();
        if bytes.len() != SERVICE_ID_LEN {
            return Err(FormatError::new("must be exactly 15 characters"));
        }

        let (digits, suffix) = bytes.split_at(DIGIT_COUNT);
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(FormatError::new("must start with 7 digits"));
        }
        if !suffix
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(FormatError::new(
                "must end with 8 letters, digits or underscores",
            ));
        }

        Ok(Self(s.to_string()))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pack this ID into a 128-bit token.
    pub fn token(&self) -> ServiceToken {
        let (digits, suffix) = self.0.as_bytes().split_at(DIGIT_COUNT);

        let head = digits
            .iter()
            .fold(0u128, |acc, &d| (acc << 4) | u128::from(d - b'0'));
        let tail = suffix
            .iter()
            .fold(0u64, |acc, &c| (acc << 8) | u64::from(c));

        ServiceToken((head << (128 - DIGIT_BITS)) | u128::from(tail))
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceId({})", self.0)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pack a current-format service ID into its 128-bit token.
pub fn encode(id: &str) -> Result<ServiceToken, FormatError> {
    ServiceId::parse(id).map(|id| id.token())
}

/// Unpack a 128-bit token into a service ID string. Never fails.
pub fn decode(token: ServiceToken) -> String {
    token.decode()
}

/// A service ID packed into 128 bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceToken(u128);

impl ServiceToken {
    /// Wrap a raw 128-bit value.
    pub fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// The raw 128-bit value.
    pub fn as_u128(&self) -> u128 {
        self.0
    }

    /// Big-endian bytes of the token.
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Build a token from big-endian bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }

    /// Unpack the token into a service ID string.
    ///
    /// Works on any 128-bit value. Digit nibbles above 9 come out as hex
    /// letters, the padding region is ignored, zero bytes in the suffix are
    /// dropped and the result is topped up with underscores to 15 characters.
    pub fn decode(&self) -> String {
        let mut out = String::with_capacity(SERVICE_ID_LEN);

        for i in 0..DIGIT_COUNT as u32 {
            let nibble = ((self.0 >> (124 - 4 * i)) & 0xF) as u32;
            out.push(char::from_digit(nibble, 16).unwrap_or('0'));
        }

        let suffix: Vec<u8> = (self.0 as u64)
            .to_be_bytes()
            .into_iter()
            .filter(|&b| b != 0)
            .collect();
        out.push_str(&String::from_utf8_lossy(&suffix));

        while out.chars().count() < SERVICE_ID_LEN {
            out.push('_');
        }
        out
    }

    /// Parse a hexadecimal GUID.
    ///
    /// Accepts the hyphenated form, the same wrapped in braces, or 32 bare
    /// hex digits.
    pub fn parse_guid(s: &str) -> Option<Self> {
        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(s);

        let hex: String = match inner.len() {
            32 => inner.to_string(),
            36 => {
                let groups: Vec<&str> = inner.split('-').collect();
                let lens: Vec<usize> = groups.iter().map(|g| g.len()).collect();
                if lens != [8, 4, 4, 4, 12] {
                    return None;
                }
                groups.concat()
            }
            _ => return None,
        };

        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u128::from_str_radix(&hex, 16).ok().map(Self)
    }

    /// Format as a lowercase hyphenated GUID.
    pub fn to_guid_string(&self) -> String {
        let hex = format!("{:032x}", self.0);
        format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }

    /// Decode from URL-safe base64 without padding.
    pub fn from_base64url(s: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(s).ok()?;
        let bytes: [u8; 16] = bytes.try_into().ok()?;
        Some(Self::from_bytes(bytes))
    }

    /// Encode as URL-safe base64 without padding (22 characters).
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.to_bytes())
    }
}

impl fmt::Debug for ServiceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceToken({})", self.to_guid_string())
    }
}

impl fmt::Display for ServiceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_guid_string())
    }
}

/// Which backend call a caller-supplied service identifier should go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceLookup {
    /// A 15-digit running identifier, only known to the staff feed.
    Rid(String),
    /// A service ID for the public service-details call.
    ServiceId(String),
}

/// Work out what kind of identifier a caller sent us.
///
/// Rules are tried in order and the first match wins:
/// RID, hex GUID, URL-safe base64 token, then the raw string.
pub fn resolve_service_id(raw: &str) -> ServiceLookup {
    let id = unescape_path_separators(raw);

    if id.len() == SERVICE_ID_LEN && id.bytes().all(|b| b.is_ascii_digit()) {
        return ServiceLookup::Rid(id);
    }

    if let Some(token) = ServiceToken::parse_guid(&id) {
        return ServiceLookup::ServiceId(token.decode());
    }

    if id.len() == BASE64_TOKEN_LEN
        && let Some(token) = ServiceToken::from_base64url(&id)
    {
        return ServiceLookup::ServiceId(token.decode());
    }

    ServiceLookup::ServiceId(id)
}

/// Undo `%2F` escapes that survive route matching.
fn unescape_path_separators(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.len() >= 3 && tail.as_bytes()[1..3].eq_ignore_ascii_case(b"2f") {
            out.push('/');
            rest = &tail[3..];
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_ids() {
        let token = encode("4611018PADTON__").unwrap();
        assert_eq!(token.to_guid_string(), "46110180-0000-0000-5041-44544f4e5f5f");
        assert_eq!(token.to_base64url(), "RhEBgAAAAABQQURUT05fXw");

        let token = encode("4613377ABRYSTH_").unwrap();
        assert_eq!(token.to_guid_string(), "46133770-0000-0000-4142-52595354485f");

        let token = encode("4629324MNCRPIC_").unwrap();
        assert_eq!(token.to_base64url(), "RikyQAAAAABNTkNSUElDXw");
    }

    #[test]
    fn decode_known_tokens() {
        let token = ServiceToken::parse_guid("46110180-0000-0000-5041-44544f4e5f5f").unwrap();
        assert_eq!(decode(token), "4611018PADTON__");

        let token = ServiceToken::from_base64url("RikyQAAAAABNTkNSUElDXw").unwrap();
        assert_eq!(decode(token), "4629324MNCRPIC_");
    }

    #[test]
    fn encode_rejects_wrong_length() {
        assert!(encode("").is_err());
        assert!(encode("4611018PADTON_").is_err());
        assert!(encode("4611018PADTON___").is_err());
    }

    #[test]
    fn encode_rejects_bad_characters() {
        assert!(encode("461101XPADTON__").is_err());
        assert!(encode("4611018PAD-ON__").is_err());
        assert!(encode("4611018PADTÖN_").is_err());
    }

    #[test]
    fn suffix_may_contain_digits() {
        let token = encode("1234567AB12CD__").unwrap();
        assert_eq!(decode(token), "1234567AB12CD__");
    }

    #[test]
    fn decode_is_total() {
        for value in [0u128, u128::MAX, 0xFFFF_FFFF, 1 << 127] {
            let decoded = decode(ServiceToken::from_u128(value));
            assert!(decoded.chars().count() >= SERVICE_ID_LEN);
        }
        assert_eq!(decode(ServiceToken::from_u128(0)), "0000000________");
    }

    #[test]
    fn decode_restores_trailing_underscores_for_short_suffix() {
        // Only "AB" in the suffix region, zero bytes before it.
        let value = (0x1234567u128 << 100) | 0x4142;
        assert_eq!(decode(ServiceToken::from_u128(value)), "1234567AB______");
    }

    #[test]
    fn guid_formats() {
        assert!(ServiceToken::parse_guid("46110180000000005041").is_none());

        let n = ServiceToken::parse_guid("4611018000000000504144544f4e5f5f").unwrap();
        let braced = ServiceToken::parse_guid("{46110180-0000-0000-5041-44544F4E5F5F}").unwrap();
        let hyphen = ServiceToken::parse_guid("46110180-0000-0000-5041-44544f4e5f5f").unwrap();
        assert_eq!(n, braced);
        assert_eq!(n, hyphen);

        assert!(ServiceToken::parse_guid("46110180-00000-000-5041-44544f4e5f5f").is_none());
        assert!(ServiceToken::parse_guid("g6110180-0000-0000-5041-44544f4e5f5f").is_none());
    }

    #[test]
    fn resolve_rid() {
        assert_eq!(
            resolve_service_id("202401158712345"),
            ServiceLookup::Rid("202401158712345".into())
        );
    }

    #[test]
    fn resolve_guid() {
        assert_eq!(
            resolve_service_id("46110180-0000-0000-5041-44544f4e5f5f"),
            ServiceLookup::ServiceId("4611018PADTON__".into())
        );
    }

    #[test]
    fn resolve_base64url() {
        assert_eq!(
            resolve_service_id("RhEBgAAAAABQQURUT05fXw"),
            ServiceLookup::ServiceId("4611018PADTON__".into())
        );
    }

    #[test]
    fn resolve_canonical_passes_through() {
        assert_eq!(
            resolve_service_id("4611018PADTON__"),
            ServiceLookup::ServiceId("4611018PADTON__".into())
        );
    }

    #[test]
    fn resolve_unescapes_slashes() {
        assert_eq!(
            resolve_service_id("abc%2Fdef%2fghi%41"),
            ServiceLookup::ServiceId("abc/def/ghi%41".into())
        );
    }

    #[test]
    fn resolve_legacy_base64_passes_through() {
        // 24-char standard base64 of 16 bytes, the pre-2023 format
        let legacy = "x7Xk4dz/Ui/rOqwXnpTYIw==";
        assert_eq!(
            resolve_service_id(legacy),
            ServiceLookup::ServiceId(legacy.into())
        );
    }

    #[test]
    fn resolve_rid_wins_over_everything() {
        // 15 digits could never be a GUID or base64 token, but the order is
        // still RID first.
        let lookup = resolve_service_id("000000000000000");
        assert!(matches!(lookup, ServiceLookup::Rid(_)));
    }
}
