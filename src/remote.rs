use std::{
    fmt, io,
    io::{Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use tracing::{debug, instrument};

use crate::oracle::{Format, Oracle, OracleReply};

pub const DEFAULT_HOST: &str = "titan.picoctf.net";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const MENU: &str = "E --> encrypt D --> decrypt. \n";
const ENCRYPT_PROMPT: &str = "enter text to encrypt (encoded length must be less than keysize): ";
const DECRYPT_PROMPT: &str = "Enter text to decrypt: ";
const DECRYPT_DONE: &str = "what should we do for you? \n";

const CIPHERTEXT_MARKER: &str = "ciphertext (m ^ e mod n) ";
const HEX_MARKER: &str = "Hex m: ";
const DECRYPTED_HEX_MARKER: &str = "n): ";
const DECRYPTED_TEXT_MARKER: &str = "text: ";

/// Why a single exchange with the service went wrong. Never leaves this
/// module: callers only ever see `OracleReply::NoAnswer`.
#[derive(Debug)]
enum TransportError {
    Io(io::Error),
    Timeout,
    Closed,
    Malformed(&'static str),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "io error: {}", e),
            TransportError::Timeout => write!(f, "timed out"),
            TransportError::Closed => write!(f, "connection closed by the server"),
            TransportError::Malformed(what) => write!(f, "could not find {} in the reply", what),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Io(err),
        }
    }
}

type Transport<T> = std::result::Result<T, TransportError>;

/// The oracle service over TCP. Every request uses a fresh connection.
#[derive(Clone, Debug)]
pub struct RemoteOracle {
    host: String,
    port: u16,
    timeout: Duration,
}

/// One open connection, reading until the service's prompts.
struct Session {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl Session {
    fn open(host: &str, port: u16, timeout: Duration) -> Transport<Self> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or(TransportError::Malformed("an address for the host"))?;
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(Session {
            stream,
            buffer: Vec::new(),
        })
    }

    /// Everything received up to and including `delimiter`.
    fn recv_until(&mut self, delimiter: &str) -> Transport<String> {
        let delimiter = delimiter.as_bytes();
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(end) = find(&self.buffer, delimiter) {
                let rest = self.buffer.split_off(end + delimiter.len());
                let received = std::mem::replace(&mut self.buffer, rest);
                return Ok(String::from_utf8_lossy(&received).into_owned());
            }
            let read = self.stream.read(&mut chunk)?;
            if read == 0 {
                return Err(TransportError::Closed);
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }

    fn send_line(&mut self, line: &str) -> Transport<()> {
        let mut data = line.as_bytes().to_vec();
        data.push(b'\n');
        self.stream.write_all(&data)?;
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|i| line[i + marker.len()..].trim_end_matches('\r'))
}

/// Decimal ciphertext from an encryption reply.
fn parse_ciphertext(response: &str) -> Option<String> {
    let digits: String = after(response, CIPHERTEXT_MARKER)?
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// The service's hex rendering of the message it read.
fn parse_message_hex(response: &str) -> Option<String> {
    response
        .lines()
        .find_map(|line| after(line, HEX_MARKER))
        .map(|hex| hex.trim().to_string())
}

fn parse_plaintext(response: &str, format: Format) -> Option<String> {
    let mut lines = response.lines();
    let value = match format {
        Format::Hex => lines.next().and_then(|l| after(l, DECRYPTED_HEX_MARKER)),
        Format::Text => lines.nth(1).and_then(|l| after(l, DECRYPTED_TEXT_MARKER)),
    };
    value.map(str::to_string)
}

impl RemoteOracle {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        RemoteOracle {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn session(&self) -> Transport<Session> {
        let mut session = Session::open(&self.host, self.port, self.timeout)?;
        session.recv_until(MENU)?;
        Ok(session)
    }

    /// The full reply to an encryption request; it carries both the ciphertext and `Hex m`.
    fn encryption_response(&self, plaintext: &str) -> Transport<String> {
        let mut session = self.session()?;
        session.send_line("e")?;
        session.recv_until(ENCRYPT_PROMPT)?;
        session.send_line(plaintext)?;
        let response = session.recv_until(MENU)?;
        if parse_ciphertext(&response).is_none() {
            return Err(TransportError::Malformed("the ciphertext"));
        }
        Ok(response)
    }

    fn decryption_response(&self, ciphertext: &str) -> Transport<String> {
        let mut session = self.session()?;
        session.send_line("d")?;
        session.recv_until(DECRYPT_PROMPT)?;
        session.send_line(ciphertext)?;
        session.recv_until(DECRYPT_DONE)
    }

    fn answer(
        &self,
        request: &'static str,
        response: Transport<String>,
        parse: impl FnOnce(&str) -> Option<String>,
        wrap: impl FnOnce(String) -> OracleReply,
    ) -> OracleReply {
        let parsed = response.and_then(|r| parse(&r).ok_or(TransportError::Malformed(request)));
        match parsed {
            Ok(value) => wrap(value),
            Err(e) => {
                debug!(request, error = %e, "no answer from oracle");
                OracleReply::NoAnswer
            }
        }
    }
}

impl Oracle for RemoteOracle {
    #[instrument(skip(self, plaintext))]
    fn encrypt(&mut self, plaintext: &str) -> OracleReply {
        let response = self.encryption_response(plaintext);
        self.answer("ciphertext", response, parse_ciphertext, OracleReply::Ciphertext)
    }

    #[instrument(skip(self, plaintext))]
    fn encrypt_hex(&mut self, plaintext: &str) -> OracleReply {
        let response = self.encryption_response(plaintext);
        self.answer("message hex", response, parse_message_hex, OracleReply::CiphertextHex)
    }

    #[instrument(skip(self, ciphertext))]
    fn decrypt(&mut self, ciphertext: &str, format: Format) -> OracleReply {
        let response = self.decryption_response(ciphertext);
        self.answer(
            "plaintext",
            response,
            |r| parse_plaintext(r, format),
            OracleReply::Plaintext,
        )
    }
}
