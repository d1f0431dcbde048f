//! Async client speaking the dot-terminated mail protocol.

use pigeon_common::tracing;
use pigeon_store::MessageRecord;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpStream, ToSocketAddrs},
};

use super::error::{ClientError, Result};

/// Size of the buffer a single response is read into.
const BUFFER_SIZE: usize = 4096;

/// A parsed LIST response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Number of messages in the inbox, including any left out of `entries`
    pub total: usize,
    /// `(ordinal, subject)` pairs, possibly truncated by the server
    pub entries: Vec<(usize, String)>,
}

impl Listing {
    fn parse(response: &str) -> Option<Self> {
        let mut lines = response.lines();
        let header = lines.next()?;

        let total = header
            .strip_prefix("There is ")
            .or_else(|| header.strip_prefix("There are "))?
            .split_once(' ')?
            .0
            .parse()
            .ok()?;

        let entries = lines
            .map(|line| {
                let (ordinal, subject) = line.split_once(": ")?;
                Some((ordinal.parse().ok()?, subject.to_string()))
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self { total, entries })
    }
}

/// A connection to a mail server.
///
/// The banner is read when the client is created; every other method writes
/// one request and reads its response.
pub struct MailClient<Stream = TcpStream> {
    stream: Stream,
    banner: String,
}

impl MailClient<TcpStream> {
    /// Connect to the server at `addr` and read its banner.
    ///
    /// # Errors
    /// If the connection cannot be established or the banner is not received
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Self::from_stream(stream).await
    }
}

impl<Stream: AsyncRead + AsyncWrite + Unpin> MailClient<Stream> {
    /// Wrap an established stream and read the server's banner from it.
    ///
    /// # Errors
    /// If the banner cannot be read
    pub async fn from_stream(stream: Stream) -> Result<Self> {
        let mut client = Self {
            stream,
            banner: String::new(),
        };
        client.banner = client.receive().await?;
        tracing::debug!("Connected: {}", client.banner.lines().next().unwrap_or_default());

        Ok(client)
    }

    #[must_use]
    pub fn banner(&self) -> &str {
        &self.banner
    }

    /// Log in as `identity`.
    ///
    /// Returns whether the server accepted the credentials.
    ///
    /// # Errors
    /// If the exchange fails or the server answers with neither acceptance
    /// nor rejection
    pub async fn login(&mut self, identity: &str, secret: &str) -> Result<bool> {
        self.write_frame(identity).await?;
        self.write_frame(secret).await?;

        match self.receive().await?.as_str() {
            "LOGINOK" => Ok(true),
            "NOTOK" => Ok(false),
            other => Err(ClientError::UnexpectedResponse(other.to_string())),
        }
    }

    /// Send a message to `receiver`.
    ///
    /// # Errors
    /// [`ClientError::Rejected`] with the server's reason if it was not stored
    pub async fn send(&mut self, receiver: &str, subject: &str, body: &str) -> Result<()> {
        let response = self
            .raw(&format!("SEND\n{receiver}\n{subject}\n{body}"))
            .await?;
        expect_ok(response)
    }

    /// List the inbox.
    ///
    /// # Errors
    /// If the exchange fails or the response is not a listing
    pub async fn list(&mut self) -> Result<Listing> {
        let response = self.raw("LIST").await?;
        match Listing::parse(&response) {
            Some(listing) => Ok(listing),
            None => Err(failure(response)),
        }
    }

    /// Read the message at `ordinal`.
    ///
    /// # Errors
    /// [`ClientError::Rejected`] if the message does not exist
    pub async fn read(&mut self, ordinal: usize) -> Result<MessageRecord> {
        let response = self.raw(&format!("READ\n{ordinal}")).await?;

        if let Some(record) = response.strip_prefix("OK\n") {
            return MessageRecord::parse(record)
                .ok_or_else(|| ClientError::UnexpectedResponse(response.clone()));
        }

        Err(failure(response))
    }

    /// Delete the message at `ordinal`.
    ///
    /// # Errors
    /// [`ClientError::Rejected`] if the message could not be removed
    pub async fn delete(&mut self, ordinal: usize) -> Result<()> {
        let response = self.raw(&format!("DEL\n{ordinal}")).await?;
        expect_ok(response)
    }

    /// End the session.
    ///
    /// # Errors
    /// If the server does not say goodbye
    pub async fn quit(mut self) -> Result<()> {
        match self.raw("quit").await?.as_str() {
            "OK - goodbye\n" => Ok(()),
            other => Err(ClientError::UnexpectedResponse(other.to_string())),
        }
    }

    /// Send `payload` as one frame and return the server's response verbatim.
    ///
    /// # Errors
    /// If writing fails or the connection closes before a response
    pub async fn raw(&mut self, payload: &str) -> Result<String> {
        self.write_frame(payload).await?;
        self.receive().await
    }

    /// Write raw bytes without adding a frame terminator.
    ///
    /// # Errors
    /// If writing fails
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read a single response transmission.
    ///
    /// # Errors
    /// [`ClientError::ConnectionClosed`] if the server has closed the stream
    pub async fn receive(&mut self) -> Result<String> {
        let mut buffer = [0; BUFFER_SIZE];
        let read = self.stream.read(&mut buffer).await?;
        if read == 0 {
            return Err(ClientError::ConnectionClosed);
        }

        Ok(String::from_utf8_lossy(&buffer[..read]).into_owned())
    }

    async fn write_frame(&mut self, payload: &str) -> Result<()> {
        self.write_raw(format!("{payload}\n.\n").as_bytes()).await
    }
}

fn expect_ok(response: String) -> Result<()> {
    if response == "OK\n" {
        Ok(())
    } else {
        Err(failure(response))
    }
}

fn failure(response: String) -> ClientError {
    if response.starts_with("ERR") {
        ClientError::Rejected(response)
    } else {
        ClientError::UnexpectedResponse(response)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_listing() {
        assert_eq!(
            Listing::parse("There are 0 messages for user bob.\n"),
            Some(Listing {
                total: 0,
                entries: Vec::new()
            })
        );
        assert_eq!(
            Listing::parse("There is 1 message for user bob.\n1: hello\n"),
            Some(Listing {
                total: 1,
                entries: vec![(1, "hello".to_string())]
            })
        );
        assert_eq!(
            Listing::parse("There are 2 messages for user bob.\n1: a: b\n2: c\n"),
            Some(Listing {
                total: 2,
                entries: vec![(1, "a: b".to_string()), (2, "c".to_string())]
            })
        );
    }

    #[test]
    fn test_parse_listing_rejects_other_text() {
        assert_eq!(Listing::parse("OK\n"), None);
        assert_eq!(Listing::parse("There are many messages\n"), None);
        assert_eq!(Listing::parse("There is 1 message for user bob.\nhello\n"), None);
    }

    #[tokio::test]
    async fn test_client_over_duplex() {
        let (client, mut server) = tokio::io::duplex(4096);

        let server = tokio::spawn(async move {
            server.write_all(b"Welcome to test!\r\n").await.unwrap();

            let mut request = vec![0; 21];
            server.read_exact(&mut request).await.unwrap();
            assert_eq!(request, b"alice\n.\nwonderland\n.\n");
            server.write_all(b"LOGINOK").await.unwrap();

            let mut request = vec![0; 9];
            server.read_exact(&mut request).await.unwrap();
            assert_eq!(request, b"READ\n1\n.\n");
            server.write_all(b"OK\nfrom: bob\nhi\n").await.unwrap();
        });

        let mut client = MailClient::from_stream(client).await.unwrap();
        assert_eq!(client.banner(), "Welcome to test!\r\n");
        assert!(client.login("alice", "wonderland").await.unwrap());
        assert_eq!(client.read(1).await.unwrap(), MessageRecord::new("bob", "hi"));

        server.await.unwrap();
    }
}
