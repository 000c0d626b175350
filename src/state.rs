//! Shared application state
//!
//! One `AppState` is created at startup and shared across every request and
//! WebSocket channel behind an `Arc`. Apart from the connection counters it is
//! read-only.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::config::ServerConfig;
use crate::core::responder::{CompletionResult, Responder};

/// Reason a WebSocket connection was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    GlobalLimitReached,
    PerIpLimitReached,
}

/// Application state shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub responder: Arc<Responder>,
    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, usize>,
}

impl AppState {
    /// Build state with the reqwest-backed responder.
    pub fn new(config: ServerConfig) -> CompletionResult<Arc<Self>> {
        let responder = Responder::from_config(config.completion.clone())?;
        Ok(Self::with_responder(config, responder))
    }

    /// Build state around an existing responder.
    pub fn with_responder(config: ServerConfig, responder: Responder) -> Arc<Self> {
        Arc::new(Self {
            config,
            responder: Arc::new(responder),
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        })
    }

    /// Reserve a WebSocket slot for `ip`.
    ///
    /// The per-IP slot is taken first under the map's entry lock, then the
    /// global slot; a global failure gives the per-IP slot back.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let per_ip_limit = self.config.max_connections_per_ip as usize;

        match self.ip_connections.entry(ip) {
            Entry::Occupied(mut entry) => {
                if *entry.get() >= per_ip_limit {
                    return Err(ConnectionLimitError::PerIpLimitReached);
                }
                *entry.get_mut() += 1;
            }
            Entry::Vacant(entry) => {
                if per_ip_limit == 0 {
                    return Err(ConnectionLimitError::PerIpLimitReached);
                }
                entry.insert(1);
            }
        }

        let acquired = match self.config.max_websocket_connections {
            Some(max) => self
                .ws_connections
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    (current < max).then_some(current + 1)
                })
                .is_ok(),
            None => {
                self.ws_connections.fetch_add(1, Ordering::AcqRel);
                true
            }
        };

        if !acquired {
            self.decrement_ip(ip);
            return Err(ConnectionLimitError::GlobalLimitReached);
        }

        Ok(())
    }

    /// Release a slot previously taken with [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            });
        self.decrement_ip(ip);
    }

    /// Number of open WebSocket channels.
    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::Acquire)
    }

    /// Number of open WebSocket channels from `ip`.
    pub fn ip_connection_count(&self, ip: &IpAddr) -> usize {
        self.ip_connections.get(ip).map(|count| *count).unwrap_or(0)
    }

    fn decrement_ip(&self, ip: IpAddr) {
        if let Entry::Occupied(mut entry) = self.ip_connections.entry(ip) {
            if *entry.get() <= 1 {
                entry.remove();
            } else {
                *entry.get_mut() -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn state_with_limits(global: Option<usize>, per_ip: u32) -> Arc<AppState> {
        let config = ServerConfig {
            max_websocket_connections: global,
            max_connections_per_ip: per_ip,
            ..Default::default()
        };
        AppState::new(config).unwrap()
    }

    #[test]
    fn test_per_ip_limit() {
        let state = state_with_limits(Some(10), 3);
        let ip: IpAddr = Ipv4Addr::new(192, 168, 1, 100).into();

        assert_eq!(state.ws_connection_count(), 0);
        assert_eq!(state.ip_connection_count(&ip), 0);

        for expected in 1..=3 {
            assert!(state.try_acquire_connection(ip).is_ok());
            assert_eq!(state.ws_connection_count(), expected);
            assert_eq!(state.ip_connection_count(&ip), expected);
        }

        assert_eq!(
            state.try_acquire_connection(ip),
            Err(ConnectionLimitError::PerIpLimitReached)
        );
        assert_eq!(state.ws_connection_count(), 3);

        state.release_connection(ip);
        assert_eq!(state.ws_connection_count(), 2);
        assert_eq!(state.ip_connection_count(&ip), 2);

        assert!(state.try_acquire_connection(ip).is_ok());
        assert_eq!(state.ws_connection_count(), 3);
    }

    #[test]
    fn test_global_limit_returns_ip_slot() {
        let state = state_with_limits(Some(5), 10);
        let ips: Vec<IpAddr> = (1..=6)
            .map(|i| Ipv4Addr::new(192, 168, 1, i).into())
            .collect();

        for ip in &ips[0..5] {
            assert!(state.try_acquire_connection(*ip).is_ok());
        }
        assert_eq!(state.ws_connection_count(), 5);

        assert_eq!(
            state.try_acquire_connection(ips[5]),
            Err(ConnectionLimitError::GlobalLimitReached)
        );
        // Rejected attempt must not leak a per-IP slot
        assert_eq!(state.ip_connection_count(&ips[5]), 0);

        state.release_connection(ips[0]);
        assert!(state.try_acquire_connection(ips[5]).is_ok());
    }

    #[test]
    fn test_unlimited_global() {
        let state = state_with_limits(None, 1000);
        let ip: IpAddr = Ipv4Addr::LOCALHOST.into();
        for _ in 0..200 {
            assert!(state.try_acquire_connection(ip).is_ok());
        }
        assert_eq!(state.ws_connection_count(), 200);
    }

    #[test]
    fn test_release_without_acquire_is_harmless() {
        let state = state_with_limits(None, 2);
        let ip: IpAddr = Ipv4Addr::new(10, 0, 0, 1).into();
        state.release_connection(ip);
        assert_eq!(state.ws_connection_count(), 0);
        assert_eq!(state.ip_connection_count(&ip), 0);
    }

    #[test]
    fn test_responder_follows_config() {
        let state = state_with_limits(None, 1);
        assert!(!state.responder.is_remote_enabled());
    }
}
