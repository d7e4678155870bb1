use std::fmt;

const ATTR_VERSION: u16 = 0x104A;
const ATTR_CREDENTIAL: u16 = 0x100E;
const ATTR_NETWORK_INDEX: u16 = 0x1026;
const ATTR_SSID: u16 = 0x1045;
const ATTR_AUTH_TYPE: u16 = 0x1003;
const ATTR_ENCRYPTION_TYPE: u16 = 0x100F;
const ATTR_NETWORK_KEY: u16 = 0x1027;
const ATTR_MAC_ADDRESS: u16 = 0x1020;

const WSC_VERSION: u8 = 0x10;
const BROADCAST_MAC: [u8; 6] = [0xFF; 6];

/// Wi-Fi authentication type.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WifiAuth {
    /// WPA personal, `0x0002`.
    Wpa,
    /// WEP, `0x0001`.
    Wep,
    /// Open network or unrecognised type, `0x0000`.
    Open,
}

impl WifiAuth {
    /// Parses an authentication name. Any `WPA` variant (`WPA2`, `WPA3`) is
    /// WPA; anything other than WPA or WEP is open.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_uppercase();
        if name.starts_with("WPA") {
            Self::Wpa
        } else if name == "WEP" {
            Self::Wep
        } else {
            Self::Open
        }
    }

    /// Returns the Authentication-Type attribute value.
    #[must_use]
    pub const fn auth_type(self) -> u16 {
        match self {
            Self::Wpa => 0x0002,
            Self::Wep => 0x0001,
            Self::Open => 0x0000,
        }
    }

    /// Returns the Encryption-Type attribute value.
    #[must_use]
    pub const fn encryption_type(self) -> u16 {
        match self {
            Self::Wpa => 0x0008,
            Self::Wep => 0x0002,
            Self::Open => 0x0001,
        }
    }
}

impl fmt::Display for WifiAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wpa => f.write_str("WPA"),
            Self::Wep => f.write_str("WEP"),
            Self::Open => f.write_str("open"),
        }
    }
}

/// A single Wi-Fi network credential.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WifiCredential {
    ssid: String,
    password: String,
    auth: WifiAuth,
}

impl WifiCredential {
    /// Creates a credential. Validation happens in the payload parser.
    #[must_use]
    pub fn new(ssid: impl Into<String>, password: impl Into<String>, auth: WifiAuth) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
            auth,
        }
    }

    /// Returns the network name.
    #[must_use]
    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    /// Returns the network key.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the authentication type.
    #[must_use]
    pub const fn auth(&self) -> WifiAuth {
        self.auth
    }

    /// Encodes the Wi-Fi Simple-Config attribute list.
    ///
    /// Layout: Version, credential count, then one Credential whose declared
    /// length is patched in once its nested attributes are written.
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        push_attribute(&mut payload, ATTR_VERSION, &[WSC_VERSION]);
        push_attribute(&mut payload, ATTR_NETWORK_INDEX, &[0x01]);

        payload.extend_from_slice(&ATTR_CREDENTIAL.to_be_bytes());
        let length_at = payload.len();
        payload.extend_from_slice(&[0x00, 0x00]);
        let body_start = payload.len();

        push_attribute(&mut payload, ATTR_NETWORK_INDEX, &[0x01]);
        push_attribute(&mut payload, ATTR_SSID, self.ssid.as_bytes());
        push_attribute(&mut payload, ATTR_AUTH_TYPE, &self.auth.auth_type().to_be_bytes());
        push_attribute(
            &mut payload,
            ATTR_ENCRYPTION_TYPE,
            &self.auth.encryption_type().to_be_bytes(),
        );
        push_attribute(&mut payload, ATTR_NETWORK_KEY, self.password.as_bytes());
        push_attribute(&mut payload, ATTR_MAC_ADDRESS, &BROADCAST_MAC);

        let body_len = u16::try_from(payload.len() - body_start).unwrap_or(u16::MAX);
        payload[length_at..body_start].copy_from_slice(&body_len.to_be_bytes());
        payload
    }
}

fn push_attribute(out: &mut Vec<u8>, attribute: u16, value: &[u8]) {
    let len = u16::try_from(value.len()).unwrap_or(u16::MAX);
    out.extend_from_slice(&attribute.to_be_bytes());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(value);
}
