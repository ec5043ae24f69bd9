//! Logical channel identifiers.
//!
//! Up to 16 channels multiplex over one physical link; each carries all
//! traffic of a single service. The id occupies one byte on the wire.

use std::fmt;

use crate::error::WireError;

/// Identifier of a logical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ChannelId {
    /// Handshake, version negotiation, service discovery.
    Control = 0,
    /// Touch and button events.
    Input = 1,
    /// Vehicle sensor data (speed, night mode, driving status).
    Sensor = 2,
    /// Video projection stream.
    Video = 3,
    /// Media playback audio.
    MediaAudio = 4,
    /// Voice assistant audio.
    SpeechAudio = 5,
    /// Notification and UI feedback audio.
    SystemAudio = 6,
    /// Microphone capture towards the phone.
    MicrophoneAudio = 7,
    /// Bluetooth pairing handoff.
    Bluetooth = 8,
    /// Wireless projection handoff.
    Wifi = 9,
    /// Turn-by-turn navigation status.
    Navigation = 10,
    /// Media playback metadata.
    MediaStatus = 11,
    /// Media library browsing.
    MediaBrowser = 12,
}

impl ChannelId {
    /// Parse a channel id from its wire byte.
    pub fn from_u8(raw: u8) -> Result<Self, WireError> {
        match raw {
            0 => Ok(ChannelId::Control),
            1 => Ok(ChannelId::Input),
            2 => Ok(ChannelId::Sensor),
            3 => Ok(ChannelId::Video),
            4 => Ok(ChannelId::MediaAudio),
            5 => Ok(ChannelId::SpeechAudio),
            6 => Ok(ChannelId::SystemAudio),
            7 => Ok(ChannelId::MicrophoneAudio),
            8 => Ok(ChannelId::Bluetooth),
            9 => Ok(ChannelId::Wifi),
            10 => Ok(ChannelId::Navigation),
            11 => Ok(ChannelId::MediaStatus),
            12 => Ok(ChannelId::MediaBrowser),
            other => Err(WireError::InvalidChannelId(other)),
        }
    }

    /// Human-readable name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelId::Control => "CONTROL",
            ChannelId::Input => "INPUT",
            ChannelId::Sensor => "SENSOR",
            ChannelId::Video => "VIDEO",
            ChannelId::MediaAudio => "MEDIA_AUDIO",
            ChannelId::SpeechAudio => "SPEECH_AUDIO",
            ChannelId::SystemAudio => "SYSTEM_AUDIO",
            ChannelId::MicrophoneAudio => "MICROPHONE_AUDIO",
            ChannelId::Bluetooth => "BLUETOOTH",
            ChannelId::Wifi => "WIFI",
            ChannelId::Navigation => "NAVIGATION",
            ChannelId::MediaStatus => "MEDIA_STATUS",
            ChannelId::MediaBrowser => "MEDIA_BROWSER",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_every_id() {
        for raw in 0u8..=12 {
            let id = ChannelId::from_u8(raw).unwrap();
            assert_eq!(id as u8, raw);
        }
    }

    #[test]
    fn rejects_unknown_id() {
        assert!(matches!(
            ChannelId::from_u8(13),
            Err(WireError::InvalidChannelId(13))
        ));
        assert!(matches!(
            ChannelId::from_u8(0xFF),
            Err(WireError::InvalidChannelId(0xFF))
        ));
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(ChannelId::Video.to_string(), "VIDEO");
        assert_eq!(ChannelId::Control.as_str(), "CONTROL");
    }
}
