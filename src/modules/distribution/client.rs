//! Client half of the distribution protocol.

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::trace;

use super::error::{ProtocolError, ProtocolResult};
use crate::codec::{read_message, write_line};
use crate::modules::certificate::CertificateRecord;

/// Sends hostname requests over one established connection.
///
/// The client owns the stream; request/response pairs are strictly
/// sequential because `request` takes `&mut self`.
#[derive(Debug)]
pub struct DistributionClient<S> {
    stream: BufReader<S>,
}

impl<S> DistributionClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Request the certificate chain for `hostname`.
    ///
    /// An empty record in the response means the server has no chain for
    /// this hostname.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidHostname`] if the hostname is empty or
    ///   contains a line break.
    /// - [`ProtocolError::WriteFailed`] if the request cannot be sent.
    /// - [`ProtocolError::Closed`] if the server closed the stream cleanly.
    /// - [`ProtocolError::ReadFailed`] if the response is missing or
    ///   malformed.
    pub async fn request(&mut self, hostname: &str) -> ProtocolResult<CertificateRecord> {
        if hostname.is_empty() || hostname.contains(['\n', '\r']) {
            return Err(ProtocolError::InvalidHostname {
                hostname: hostname.to_string(),
            });
        }

        write_line(self.stream.get_mut(), hostname)
            .await
            .map_err(ProtocolError::WriteFailed)?;

        let record: CertificateRecord = read_message(&mut self.stream)
            .await
            .map_err(ProtocolError::ReadFailed)?
            .ok_or(ProtocolError::Closed)?;

        trace!(hostname = %hostname, cert_count = record.chain().len(), "Received certificate response");

        Ok(record)
    }

    /// Consume the client and return the stream.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{read_line, write_line as send_line};
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_request_and_response() {
        let (client, server) = tokio::io::duplex(4096);
        let mut client = DistributionClient::new(client);

        let peer = tokio::spawn(async move {
            let mut server = BufReader::new(server);
            let line = read_line(&mut server).await.unwrap().unwrap();
            assert_eq!(line, "www.example.com");
            send_line(server.get_mut(), r#"{"chain":["AQID"]}"#).await.unwrap();
            server
        });

        let record = client.request("www.example.com").await.unwrap();
        assert_eq!(record.chain().len(), 1);
        assert_eq!(record.chain()[0].as_ref(), &[1, 2, 3]);

        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_clean_close_is_reported() {
        let (client, mut server) = tokio::io::duplex(4096);
        let mut client = DistributionClient::new(client);
        server.shutdown().await.unwrap();
        drop(server);

        // The write may or may not fail depending on buffering; either way the
        // request does not produce a record.
        assert!(client.request("www.example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let (client, server) = tokio::io::duplex(4096);
        let mut client = DistributionClient::new(client);

        tokio::spawn(async move {
            let mut server = BufReader::new(server);
            let _ = read_line(&mut server).await;
            send_line(server.get_mut(), "not json").await.unwrap();
            server
        });

        assert!(matches!(
            client.request("www.example.com").await,
            Err(ProtocolError::ReadFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_unframeable_hostname() {
        let (client, _server) = tokio::io::duplex(64);
        let mut client = DistributionClient::new(client);

        assert!(matches!(
            client.request("").await,
            Err(ProtocolError::InvalidHostname { .. })
        ));
        assert!(matches!(
            client.request("a\nb").await,
            Err(ProtocolError::InvalidHostname { .. })
        ));
    }
}
