//! Configuration types
//!
//! Board-agnostic settings for the peripheral core. A board either uses
//! [`PeripheralConfig::default`] or provisions a postcard blob (for example
//! from flash) and decodes it with [`PeripheralConfig::from_bytes`].

use heapless::String;

use nbrain_hal::UartConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest console string the handshake can match
pub const MAX_PATTERN_LEN: usize = 32;

/// Longest credential line (without the newline)
pub const MAX_CREDENTIAL_LEN: usize = 32;

/// Longest launch command line (without the newline)
pub const MAX_COMMAND_LEN: usize = 64;

/// Serialized configuration format version
pub const CONFIG_VERSION: u8 = 1;

/// Maximum serialized configuration size
pub const MAX_CONFIG_SIZE: usize = 384;

/// Configuration encode/decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Blob was written by an incompatible firmware
    InvalidVersion,
}

fn text<const N: usize>(s: &str) -> String<N> {
    String::try_from(s).unwrap_or_default()
}

/// Companion console login settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HandshakeConfig {
    /// Login prompt printed by getty
    pub login_prompt: String<MAX_PATTERN_LEN>,
    /// Tail of the root shell prompt
    pub shell_marker: String<MAX_PATTERN_LEN>,
    /// Emergency-mode banner asking for Ctrl-D
    pub maintenance_marker: String<MAX_PATTERN_LEN>,
    /// Byte sent to leave emergency mode
    pub continue_byte: u8,
    pub username: String<MAX_CREDENTIAL_LEN>,
    pub password: String<MAX_CREDENTIAL_LEN>,
    /// Pause between the username and password lines
    pub credential_delay_ms: u32,
    /// Bound on the initial prompt wait; `None` waits for as long as the
    /// companion takes to boot
    pub prompt_timeout_ms: Option<u32>,
    /// Bound on the wait for the shell after sending credentials
    pub login_timeout_ms: u32,
    /// Command line started once logged in
    pub launch_command: Option<String<MAX_COMMAND_LEN>>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            login_prompt: text("login:"),
            shell_marker: text(":~# "),
            maintenance_marker: text("Control-D to continue"),
            continue_byte: 0x04,
            username: text("root"),
            password: String::new(),
            credential_delay_ms: 100,
            prompt_timeout_ms: None,
            login_timeout_ms: 5000,
            launch_command: Some(text("python3 main.py")),
        }
    }
}

/// Text engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayConfig {
    /// Longest a single flush may render for
    pub flush_budget_ms: u32,
    /// Pause of the flush activity when nothing is queued
    pub flush_idle_ms: u32,
    /// Glyph magnification, at least 1
    pub text_scale: u8,
    /// Initial foreground (RGB565)
    pub text_color: u16,
    /// Initial background (RGB565)
    pub background: u16,
    /// Backlight, percent
    pub brightness: u8,
    /// Loading spinner frame period
    pub indicator_period_ms: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            flush_budget_ms: 20,
            flush_idle_ms: 5,
            text_scale: 1,
            text_color: 0xFFFF,
            background: 0x0000,
            brightness: 100,
            indicator_period_ms: 150,
        }
    }
}

/// Video memory sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VramConfig {
    /// Sectors to allocate (256 cells each)
    pub sectors: u16,
    /// Smaller allocation tried when the first one fails
    pub fallback_sectors: u16,
}

impl Default for VramConfig {
    fn default() -> Self {
        Self {
            // 1 MiB: a full 800x480 frame plus headroom
            sectors: 2048,
            fallback_sectors: 256,
        }
    }
}

/// Input multiplexer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputConfig {
    /// Touch polling interval
    pub poll_interval_ms: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5,
        }
    }
}

/// Complete peripheral configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeripheralConfig {
    /// Format version, checked on decode
    pub version: u8,
    /// Companion link baud rate
    pub baudrate: u32,
    pub handshake: HandshakeConfig,
    pub display: DisplayConfig,
    pub vram: VramConfig,
    pub input: InputConfig,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            baudrate: UartConfig::default().baudrate,
            handshake: HandshakeConfig::default(),
            display: DisplayConfig::default(),
            vram: VramConfig::default(),
            input: InputConfig::default(),
        }
    }
}

impl PeripheralConfig {
    /// Serial settings for the companion link
    pub fn link_config(&self) -> UartConfig {
        UartConfig {
            baudrate: self.baudrate,
            ..UartConfig::default()
        }
    }
}

#[cfg(feature = "serde")]
impl PeripheralConfig {
    /// Serialize into `buffer`, returning the used prefix
    pub fn to_bytes<'b>(&self, buffer: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize a blob produced by [`PeripheralConfig::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        if config.version != CONFIG_VERSION {
            return Err(ConfigError::InvalidVersion);
        }
        Ok(config)
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PeripheralConfig::default();
        assert_eq!(config.handshake.login_prompt.as_str(), "login:");
        assert_eq!(config.handshake.shell_marker.as_str(), ":~# ");
        assert_eq!(config.handshake.continue_byte, 0x04);
        assert_eq!(config.handshake.login_timeout_ms, 5000);
        assert_eq!(config.handshake.prompt_timeout_ms, None);
        assert_eq!(config.display.flush_budget_ms, 20);
        assert_eq!(config.input.poll_interval_ms, 5);
        assert_eq!(config.link_config().baudrate, 115200);
    }

    #[test]
    fn test_blob_reloads() {
        let mut config = PeripheralConfig::default();
        config.handshake.password = text("hunter2");
        config.vram.sectors = 512;

        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let bytes = config.to_bytes(&mut buffer).unwrap();
        let loaded = PeripheralConfig::from_bytes(bytes).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let config = PeripheralConfig {
            version: CONFIG_VERSION + 1,
            ..PeripheralConfig::default()
        };
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let bytes = config.to_bytes(&mut buffer).unwrap();
        assert_eq!(
            PeripheralConfig::from_bytes(bytes),
            Err(ConfigError::InvalidVersion)
        );
    }

    #[test]
    fn test_small_buffer_fails() {
        let mut buffer = [0u8; 4];
        assert_eq!(
            PeripheralConfig::default().to_bytes(&mut buffer).map(|b| b.len()),
            Err(ConfigError::Serialize)
        );
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(
            PeripheralConfig::from_bytes(&[0xFF; 3]),
            Err(ConfigError::Deserialize)
        );
    }
}
