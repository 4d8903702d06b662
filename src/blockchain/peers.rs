use dashmap::DashSet;
use log::info;
use thiserror::Error;

/// Errors that can occur while registering peers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("Invalid peer address: {0:?}")]
    InvalidAddress(String),
}

/// Reduces a peer address to its canonical `host:port` form
///
/// Accepts full URLs as well as bare `host:port` strings. The scheme,
/// credentials, path, query and fragment are dropped and the host is
/// lower-cased, so `http://Node-1:5000/chain` and `node-1:5000` name the
/// same peer.
pub fn parse_address(address: &str) -> Result<String, PeerError> {
    let invalid = || PeerError::InvalidAddress(address.to_string());

    let trimmed = address.trim();
    let without_scheme = match trimmed.find("://") {
        Some(position) => &trimmed[position + 3..],
        None => trimmed,
    };

    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = match authority.rfind('@') {
        Some(position) => &authority[position + 1..],
        None => authority,
    };

    let (host, port) = match host_port.rsplit_once(':') {
        // bracketed IPv6 without a port, e.g. "[::1]"
        Some((_, rest)) if host_port.ends_with(']') && rest.ends_with(']') => (host_port, None),
        Some((host, port)) => (host, Some(port)),
        None => (host_port, None),
    };

    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    match port {
        Some(port) if port.parse::<u16>().is_err() => Err(invalid()),
        Some(port) => Ok(format!("{}:{}", host.to_ascii_lowercase(), port)),
        None => Ok(host.to_ascii_lowercase()),
    }
}

/// Set of peers this node reconciles its chain with
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: DashSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a peer
    ///
    /// # Returns
    ///
    /// Whether the peer was not known before. Registering a known peer again
    /// changes nothing.
    pub fn register(&self, address: &str) -> Result<bool, PeerError> {
        let peer = parse_address(address)?;
        let added = self.peers.insert(peer.clone());
        if added {
            info!("Registered peer {}", peer);
        }
        Ok(added)
    }

    /// Gets all known peers in sorted order
    pub fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.peers.iter().map(|peer| peer.key().clone()).collect();
        peers.sort();
        peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("http://10.0.0.5:5000").unwrap(), "10.0.0.5:5000");
        assert_eq!(parse_address("10.0.0.5:5000").unwrap(), "10.0.0.5:5000");
        assert_eq!(
            parse_address("https://user:pw@Node-1.Example:8080/chain?x=1#top").unwrap(),
            "node-1.example:8080"
        );
        assert_eq!(parse_address(" localhost ").unwrap(), "localhost");
        assert_eq!(parse_address("http://[::1]:5000/").unwrap(), "[::1]:5000");
        assert_eq!(parse_address("[::1]").unwrap(), "[::1]");
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(parse_address("").is_err());
        assert!(parse_address("http://").is_err());
        assert!(parse_address("http:///chain").is_err());
        assert!(parse_address("host:notaport").is_err());
        assert!(parse_address("host:70000").is_err());
        assert_eq!(
            parse_address(":5000"),
            Err(PeerError::InvalidAddress(":5000".to_string()))
        );
    }

    #[test]
    fn test_register_collapses_duplicates() {
        let registry = PeerRegistry::new();

        assert!(registry.register("http://10.0.0.5:5000").unwrap());
        assert!(!registry.register("10.0.0.5:5000").unwrap());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.peers(), vec!["10.0.0.5:5000".to_string()]);
    }

    #[test]
    fn test_register_invalid_address_leaves_registry_unchanged() {
        let registry = PeerRegistry::new();

        assert!(registry.register("http://").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_peers_are_sorted() {
        let registry = PeerRegistry::new();
        registry.register("10.0.0.7:5000").unwrap();
        registry.register("10.0.0.5:5000").unwrap();

        assert_eq!(
            registry.peers(),
            vec!["10.0.0.5:5000".to_string(), "10.0.0.7:5000".to_string()]
        );
    }
}
