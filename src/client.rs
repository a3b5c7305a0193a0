//! Outbound connections.
//!
//! [`dial`] opens a TCP connection under timer t0 and starts a [`Session`]
//! on it. Data transfer is not started; call
//! [`Session::start_data_transfer`] when ready.
//!
//! ```rust,ignore
//! use voltage_cs104::{client, Asdu, Config, Params, QOI_STATION};
//!
//! let session = client::dial("192.168.1.100:2404", Params::WIDE, Config::default()).await?;
//! session.start_data_transfer().await?;
//! session.send_asdu(&Asdu::interrogation_command(1, QOI_STATION)).await?;
//! ```

use std::time::Duration;

use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::{Config, Params};
use crate::error::{Iec104Error, Result};
use crate::session::{Session, SessionBuilder};

/// Open a TCP connection, failing with [`Iec104Error::ConnectTimeout`]
/// after `t0`.
pub async fn connect<A: ToSocketAddrs>(addr: A, t0: Duration) -> Result<TcpStream> {
    let stream = timeout(t0, TcpStream::connect(addr))
        .await
        .map_err(|_| Iec104Error::ConnectTimeout)??;

    // Disable Nagle's algorithm for low latency
    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "failed to set TCP_NODELAY");
    }
    Ok(stream)
}

/// Connect and start a session without callbacks.
pub async fn dial<A: ToSocketAddrs>(addr: A, params: Params, config: Config) -> Result<Session> {
    dial_with(addr, Session::builder(params, config)).await
}

/// Connect and start a session configured by `builder`.
pub async fn dial_with<A: ToSocketAddrs>(addr: A, builder: SessionBuilder) -> Result<Session> {
    builder.params().validate()?;
    builder.config().validate()?;

    let stream = connect(addr, builder.config().t0).await?;
    if let Ok(peer) = stream.peer_addr() {
        debug!(%peer, "connected");
    }
    builder.open(stream)
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::session::SessionState;

    #[tokio::test]
    async fn test_dial_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (session, accepted) = tokio::join!(
            dial(addr, Params::WIDE, Config::default()),
            listener.accept()
        );
        let session = session.unwrap();
        let (_stream, peer) = accepted.unwrap();
        assert!(peer.ip().is_loopback());

        assert_ne!(session.state(), SessionState::DataTransfer);
        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_dial_rejects_invalid_config() {
        let result = dial(
            "127.0.0.1:2404",
            Params::WIDE,
            Config::new().t2(Duration::from_secs(30)),
        )
        .await;
        assert!(matches!(result, Err(Iec104Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let result = connect(addr, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(Iec104Error::Io(_))));
    }
}
