//! CAN bus message table and CAN/COM adapter settings.
//!
//! Both live in process memory. The table starts with a fixed set of sample
//! messages and is edited through [`CommunicationsStore`].

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Largest identifier of an extended (29-bit) CAN frame.
pub const MAX_CAN_ID: u32 = 0x1FFF_FFFF;

/// Largest classic CAN data length code.
pub const MAX_DLC: u8 = 8;

/// Highest COM port number accepted in the settings.
pub const MAX_COM_PORT: u16 = 256;

pub const CLOCKS: [&str; 3] = ["8MHz", "16MHz", "20MHz"];

/// Supported bit rates in kbit/s.
pub const BIT_RATES: [u32; 4] = [125, 250, 500, 1000];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommunicationsError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Message {0} not found")]
    NotFound(u32),
}

pub type Result<T> = std::result::Result<T, CommunicationsError>;

fn invalid(field: &'static str, reason: impl Into<String>) -> CommunicationsError {
    CommunicationsError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    On,
    Off,
}

/// Whether the adapter transmits or listens for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Send,
    Receive,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Direction::Send => Direction::Receive,
            Direction::Receive => Direction::Send,
        }
    }
}

/// One row of the CAN message table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanMessage {
    pub id: u32,
    #[serde(flatten)]
    pub fields: CanMessageFields,
}

/// Editable fields of a CAN message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanMessageFields {
    pub name: String,
    pub value: i64,
    pub position: u32,
    pub status: MessageStatus,
    pub direction: Direction,
    /// Hexadecimal identifier with an `H` suffix, e.g. `123H`.
    pub can_id: String,
    /// Data length code.
    pub length: u8,
    /// Space-separated hex bytes, e.g. `14 11 22 AA`.
    pub data_raw: String,
    /// Transmit period in milliseconds.
    pub cycle_time: u32,
}

impl CanMessageFields {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        parse_can_id(&self.can_id)?;
        if self.length > MAX_DLC {
            return Err(invalid("length", format!("must be at most {}", MAX_DLC)));
        }
        parse_data_raw(&self.data_raw)?;
        if self.cycle_time == 0 {
            return Err(invalid("cycle_time", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Parse a `123H` style identifier.
pub fn parse_can_id(can_id: &str) -> Result<u32> {
    let digits = can_id
        .strip_suffix('H')
        .ok_or_else(|| invalid("can_id", "must end with 'H'"))?;
    if digits.is_empty() || digits.len() > 8 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("can_id", "must be hexadecimal"));
    }
    let id = u32::from_str_radix(digits, 16).map_err(|e| invalid("can_id", e.to_string()))?;
    if id > MAX_CAN_ID {
        return Err(invalid("can_id", "exceeds 29 bits"));
    }
    Ok(id)
}

/// Parse space-separated hex bytes.
pub fn parse_data_raw(data_raw: &str) -> Result<Vec<u8>> {
    let bytes = data_raw
        .split_whitespace()
        .map(|token| {
            if token.len() != 2 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid("data_raw", format!("'{}' is not a hex byte", token)));
            }
            u8::from_str_radix(token, 16).map_err(|e| invalid("data_raw", e.to_string()))
        })
        .collect::<Result<Vec<u8>>>()?;
    if bytes.is_empty() {
        return Err(invalid("data_raw", "must contain at least one byte"));
    }
    Ok(bytes)
}

/// CAN/COM adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanSettings {
    pub com_enabled: bool,
    pub can_enabled: bool,
    pub port: String,
    pub clock: String,
    /// kbit/s
    pub bit_rate: u32,
}

impl Default for CanSettings {
    fn default() -> Self {
        Self {
            com_enabled: false,
            can_enabled: false,
            port: "COM1".to_string(),
            clock: "8MHz".to_string(),
            bit_rate: 500,
        }
    }
}

impl CanSettings {
    pub fn validate(&self) -> Result<()> {
        let port = self
            .port
            .strip_prefix("COM")
            .and_then(|n| n.parse::<u16>().ok())
            .filter(|n| (1..=MAX_COM_PORT).contains(n));
        if port.is_none() {
            return Err(invalid(
                "port",
                format!("must be COM1 to COM{}", MAX_COM_PORT),
            ));
        }
        if !CLOCKS.contains(&self.clock.as_str()) {
            return Err(invalid("clock", format!("must be one of {}", CLOCKS.join(", "))));
        }
        if !BIT_RATES.contains(&self.bit_rate) {
            return Err(invalid("bit_rate", "must be 125, 250, 500 or 1000"));
        }
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn sample(
    id: u32,
    name: &str,
    value: i64,
    position: u32,
    status: MessageStatus,
    direction: Direction,
    can_id: &str,
    length: u8,
    data_raw: &str,
    cycle_time: u32,
) -> CanMessage {
    CanMessage {
        id,
        fields: CanMessageFields {
            name: name.to_string(),
            value,
            position,
            status,
            direction,
            can_id: can_id.to_string(),
            length,
            data_raw: data_raw.to_string(),
            cycle_time,
        },
    }
}

/// The sample messages the table starts with.
pub fn sample_messages() -> Vec<CanMessage> {
    use Direction::{Receive, Send};
    use MessageStatus::{Off, On};

    vec![
        sample(1, "Msg_TX_01_XXX", 1000, 0, On, Send, "123H", 6, "14 11 22 AA 00 BB 77 33 99", 20),
        sample(2, "Msg_RX_02_XXX", 500, 0, On, Receive, "111H", 6, "46 11 22 77 AA 78 88 00 00", 100),
        sample(3, "Msg_TX_02_XXX", 800, 1, On, Send, "512H", 7, "00 11 22 45 65 68 CC 89 13", 500),
        sample(4, "Msg_TX_03_XXX", 9000, 0, Off, Send, "889H", 8, "14 11 22 AA 00 BB 22 33 77", 200),
        sample(5, "Msg_RX_04_XXX", 2, 1, Off, Receive, "789H", 2, "00 11 22 00 00 00 00 00 00", 10),
        sample(6, "Msg_TX_07_XXX", 1, 1, On, Send, "345H", 1, "00 11 00 00 00 00 00 00 00", 5),
    ]
}

/// In-memory message table and settings.
#[derive(Default)]
pub struct CommunicationsStore {
    messages: RwLock<Vec<CanMessage>>,
    settings: RwLock<CanSettings>,
}

impl CommunicationsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the sample messages and default settings.
    pub fn seeded() -> Self {
        Self {
            messages: RwLock::new(sample_messages()),
            settings: RwLock::new(CanSettings::default()),
        }
    }

    /// Messages ordered by id, optionally filtered by a case-insensitive
    /// substring of the name.
    pub async fn list(&self, search: Option<&str>) -> Vec<CanMessage> {
        let needle = search.map(str::to_lowercase).unwrap_or_default();
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.fields.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub async fn create(&self, fields: CanMessageFields) -> Result<CanMessage> {
        fields.validate()?;
        let mut messages = self.messages.write().await;
        let id = messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let message = CanMessage { id, fields };
        messages.push(message.clone());
        Ok(message)
    }

    /// Flip a message between SEND and RECEIVE.
    pub async fn toggle_direction(&self, id: u32) -> Result<CanMessage> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(CommunicationsError::NotFound(id))?;
        message.fields.direction = message.fields.direction.toggled();
        Ok(message.clone())
    }

    pub async fn delete(&self, id: u32) -> Result<()> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|m| m.id != id);
        if messages.len() == before {
            return Err(CommunicationsError::NotFound(id));
        }
        Ok(())
    }

    pub async fn settings(&self) -> CanSettings {
        self.settings.read().await.clone()
    }

    pub async fn update_settings(&self, settings: CanSettings) -> Result<CanSettings> {
        settings.validate()?;
        *self.settings.write().await = settings.clone();
        Ok(settings)
    }
}

#[cfg(test)]
mod tests;
