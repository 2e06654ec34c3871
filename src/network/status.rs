//! Voice connection lifecycle status

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection status reported to listeners
///
/// ```text
/// [*] --> NotConnected
/// NotConnected --> ConnectingAwaitingEndpoint: open
/// ConnectingAwaitingEndpoint --> ConnectingAwaitingWebsocketConnect
/// ConnectingAwaitingWebsocketConnect --> ConnectingAwaitingAuthentication
/// ConnectingAwaitingAuthentication --> ConnectingAttemptingUdpDiscovery
/// ConnectingAttemptingUdpDiscovery --> ConnectingAwaitingReady
/// ConnectingAwaitingReady --> Connected
/// Connected --> Error*: connection problem (maybe reconnect)
/// Connected --> Disconnected*: removed by the server
/// Connected --> ShuttingDown: close
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ConnectionStatus {
    /// No connection exists
    #[default]
    NotConnected = 0,
    /// Connection is being closed on request
    ShuttingDown = 1,
    /// Waiting for the voice server endpoint
    ConnectingAwaitingEndpoint = 2,
    /// Opening the voice websocket
    ConnectingAwaitingWebsocketConnect = 3,
    /// Waiting for the voice handshake to be acknowledged
    ConnectingAwaitingAuthentication = 4,
    /// Discovering the external UDP address
    ConnectingAttemptingUdpDiscovery = 5,
    /// Waiting for the session description
    ConnectingAwaitingReady = 6,
    /// Audio can be sent and received
    Connected = 7,
    /// Permission to the channel was revoked
    DisconnectedLostPermission = 8,
    /// The channel was deleted
    DisconnectedChannelDeleted = 9,
    /// The account left or was removed from the guild
    DisconnectedRemovedFromGuild = 10,
    /// Someone disconnected the account from the channel
    DisconnectedKickedFromChannel = 11,
    /// The account was removed while reconnecting
    DisconnectedRemovedDuringReconnect = 12,
    /// The voice server rejected the credentials
    DisconnectedAuthenticationFailure = 13,
    /// The voice region changed and the connection must move
    AudioRegionChange = 14,
    /// The connection dropped
    ErrorLostConnection = 15,
    /// The session could not be resumed
    ErrorCannotResume = 16,
    /// The voice websocket could not be opened
    ErrorWebsocketUnableToConnect = 17,
    /// UDP discovery failed
    ErrorUdpUnableToConnect = 18,
    /// The handshake timed out
    ErrorConnectionTimeout = 19,
    /// Any other connection failure
    ErrorConnectionFailed = 20,
}

impl ConnectionStatus {
    /// All statuses in discriminant order
    pub const ALL: [ConnectionStatus; 21] = [
        Self::NotConnected,
        Self::ShuttingDown,
        Self::ConnectingAwaitingEndpoint,
        Self::ConnectingAwaitingWebsocketConnect,
        Self::ConnectingAwaitingAuthentication,
        Self::ConnectingAttemptingUdpDiscovery,
        Self::ConnectingAwaitingReady,
        Self::Connected,
        Self::DisconnectedLostPermission,
        Self::DisconnectedChannelDeleted,
        Self::DisconnectedRemovedFromGuild,
        Self::DisconnectedKickedFromChannel,
        Self::DisconnectedRemovedDuringReconnect,
        Self::DisconnectedAuthenticationFailure,
        Self::AudioRegionChange,
        Self::ErrorLostConnection,
        Self::ErrorCannotResume,
        Self::ErrorWebsocketUnableToConnect,
        Self::ErrorUdpUnableToConnect,
        Self::ErrorConnectionTimeout,
        Self::ErrorConnectionFailed,
    ];

    /// Convert from u8 value
    pub fn from_u8(value: u8) -> Self {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .unwrap_or(Self::NotConnected)
    }

    /// Check if audio can flow
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if the connection handshake is in progress
    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            Self::ConnectingAwaitingEndpoint
                | Self::ConnectingAwaitingWebsocketConnect
                | Self::ConnectingAwaitingAuthentication
                | Self::ConnectingAttemptingUdpDiscovery
                | Self::ConnectingAwaitingReady
        )
    }

    /// Check if the status describes a connection failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ErrorLostConnection
                | Self::ErrorCannotResume
                | Self::ErrorWebsocketUnableToConnect
                | Self::ErrorUdpUnableToConnect
                | Self::ErrorConnectionTimeout
                | Self::ErrorConnectionFailed
        )
    }

    /// Whether the connection machinery should attempt to reconnect
    pub fn should_reconnect(&self) -> bool {
        self.is_error() || matches!(self, Self::AudioRegionChange)
    }

    /// Protocol-style name, e.g. `ERROR_LOST_CONNECTION`
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotConnected => "NOT_CONNECTED",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::ConnectingAwaitingEndpoint => "CONNECTING_AWAITING_ENDPOINT",
            Self::ConnectingAwaitingWebsocketConnect => "CONNECTING_AWAITING_WEBSOCKET_CONNECT",
            Self::ConnectingAwaitingAuthentication => "CONNECTING_AWAITING_AUTHENTICATION",
            Self::ConnectingAttemptingUdpDiscovery => "CONNECTING_ATTEMPTING_UDP_DISCOVERY",
            Self::ConnectingAwaitingReady => "CONNECTING_AWAITING_READY",
            Self::Connected => "CONNECTED",
            Self::DisconnectedLostPermission => "DISCONNECTED_LOST_PERMISSION",
            Self::DisconnectedChannelDeleted => "DISCONNECTED_CHANNEL_DELETED",
            Self::DisconnectedRemovedFromGuild => "DISCONNECTED_REMOVED_FROM_GUILD",
            Self::DisconnectedKickedFromChannel => "DISCONNECTED_KICKED_FROM_CHANNEL",
            Self::DisconnectedRemovedDuringReconnect => "DISCONNECTED_REMOVED_DURING_RECONNECT",
            Self::DisconnectedAuthenticationFailure => "DISCONNECTED_AUTHENTICATION_FAILURE",
            Self::AudioRegionChange => "AUDIO_REGION_CHANGE",
            Self::ErrorLostConnection => "ERROR_LOST_CONNECTION",
            Self::ErrorCannotResume => "ERROR_CANNOT_RESUME",
            Self::ErrorWebsocketUnableToConnect => "ERROR_WEBSOCKET_UNABLE_TO_CONNECT",
            Self::ErrorUdpUnableToConnect => "ERROR_UDP_UNABLE_TO_CONNECT",
            Self::ErrorConnectionTimeout => "ERROR_CONNECTION_TIMEOUT",
            Self::ErrorConnectionFailed => "ERROR_CONNECTION_FAILED",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_roundtrip() {
        for status in ConnectionStatus::ALL {
            assert_eq!(ConnectionStatus::from_u8(status as u8), status);
        }
    }

    #[test]
    fn test_from_u8_unknown() {
        assert_eq!(ConnectionStatus::from_u8(21), ConnectionStatus::NotConnected);
        assert_eq!(ConnectionStatus::from_u8(255), ConnectionStatus::NotConnected);
    }

    #[test]
    fn test_should_reconnect() {
        let reconnecting: Vec<_> = ConnectionStatus::ALL
            .into_iter()
            .filter(|s| s.should_reconnect())
            .collect();
        assert_eq!(
            reconnecting,
            vec![
                ConnectionStatus::AudioRegionChange,
                ConnectionStatus::ErrorLostConnection,
                ConnectionStatus::ErrorCannotResume,
                ConnectionStatus::ErrorWebsocketUnableToConnect,
                ConnectionStatus::ErrorUdpUnableToConnect,
                ConnectionStatus::ErrorConnectionTimeout,
                ConnectionStatus::ErrorConnectionFailed,
            ]
        );
        assert!(!ConnectionStatus::DisconnectedKickedFromChannel.should_reconnect());
    }

    #[test]
    fn test_state_groups() {
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(ConnectionStatus::ConnectingAwaitingReady.is_connecting());
        assert!(!ConnectionStatus::Connected.is_connecting());
        assert!(!ConnectionStatus::AudioRegionChange.is_error());
    }

    #[test]
    fn test_display_matches_serde() {
        let status = ConnectionStatus::ErrorUdpUnableToConnect;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, format!("\"{}\"", status));
    }
}
