//! Inbound connections.
//!
//! [`Server`] accepts TCP connections and starts one [`Session`] per
//! connection, all sharing the same parameter set and configuration.

use std::net::SocketAddr;

use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{info, warn};

use crate::config::{Config, Params};
use crate::error::Result;
use crate::session::{Session, SessionBuilder};

/// TCP listener producing sessions.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    params: Params,
    config: Config,
}

impl Server {
    /// Bind to `addr` after validating `params` and `config`.
    pub async fn bind<A: ToSocketAddrs>(addr: A, params: Params, config: Config) -> Result<Self> {
        params.validate()?;
        config.validate()?;
        let listener = TcpListener::bind(addr).await?;
        info!(addr = ?listener.local_addr().ok(), "IEC 104 server listening");
        Ok(Self {
            listener,
            params,
            config,
        })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one connection and start a session without callbacks.
    pub async fn accept(&self) -> Result<(Session, SocketAddr)> {
        self.accept_with(|builder| builder).await
    }

    /// Accept one connection and start a session, letting `configure`
    /// register callbacks before the session runs.
    pub async fn accept_with<F>(&self, configure: F) -> Result<(Session, SocketAddr)>
    where
        F: FnOnce(SessionBuilder) -> SessionBuilder,
    {
        let (stream, peer) = self.listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!(%peer, error = %e, "failed to set TCP_NODELAY");
        }
        info!(%peer, "accepted connection");
        let session = configure(Session::builder(self.params, self.config.clone())).open(stream)?;
        Ok((session, peer))
    }

    /// Accept connections forever, handing each new session to `on_session`.
    ///
    /// Accept failures are logged and do not stop the loop.
    pub async fn serve<F>(self, mut on_session: F) -> Result<()>
    where
        F: FnMut(Session, SocketAddr),
    {
        loop {
            match self.accept().await {
                Ok((session, peer)) => on_session(session, peer),
                Err(e) => warn!(error = %e, "error accepting connection"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio_util::codec::Framed;

    use super::*;
    use crate::codec::{Apdu, Iec104Codec};
    use crate::session::SessionState;
    use crate::types::{Apci, UFunction};

    #[tokio::test]
    async fn test_accept_and_answer_startdt() {
        let server = Server::bind("127.0.0.1:0", Params::WIDE, Config::default())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let (accepted, stream) = tokio::join!(server.accept(), TcpStream::connect(addr));
        let (session, _peer) = accepted.unwrap();
        let mut client = Framed::new(stream.unwrap(), Iec104Codec::new());

        client
            .send(Apdu::u_frame(UFunction::StartDtAct))
            .await
            .unwrap();
        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply.apci, Apci::u_frame(UFunction::StartDtCon));
        assert_eq!(session.state(), SessionState::DataTransfer);

        drop(client);
        assert!(session.wait_closed().await.is_err());
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_params() {
        let params = Params {
            ioa_size: 4,
            ..Params::WIDE
        };
        assert!(Server::bind("127.0.0.1:0", params, Config::default())
            .await
            .is_err());
    }
}
