use std::{error::Error as _, io, time::Duration};

use lettre::{
    address::Envelope,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{SmtpConnection, TlsParameters},
        extension::ClientId,
    },
};
use log::{debug, info, warn};

use crate::{
    config::Config,
    contact::ContactBook,
    error::{MailError, MailResult, ValidationError},
    message::{compose, Letter},
    Seconds,
};

pub const DEFAULT_PORT: u16 = 465;
pub const DEFAULT_TIMEOUT: Seconds = Seconds::new(5);

const MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// Where to connect and how to log in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Wrap the connection in TLS from the start (SMTPS), plaintext otherwise
    pub use_ssl: bool,
    /// Bounds connecting as well as every read and write on the socket
    pub timeout: Seconds,
}

impl SessionOptions {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            use_ssl: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn use_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    pub fn timeout(mut self, timeout: Seconds) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self::new(&config.user, &config.password, &config.host)
            .port(config.port)
            .use_ssl(config.use_ssl)
            .timeout(config.timeout)
    }
}

/// An open connection able to hand messages to the server
pub trait Relay {
    /// Runs one mail transaction for `message` addressed to `envelope`
    fn transmit(&mut self, envelope: &Envelope, message: &[u8]) -> MailResult<()>;

    /// Ends the session, the connection is released even when this fails
    fn shutdown(&mut self) -> MailResult<()>;
}

impl Relay for SmtpConnection {
    fn transmit(&mut self, envelope: &Envelope, message: &[u8]) -> MailResult<()> {
        let response = self.send(envelope, message).map_err(MailError::Smtp)?;
        debug!("Server accepted message with code {}", response.code());
        Ok(())
    }

    fn shutdown(&mut self) -> MailResult<()> {
        match self.quit() {
            Ok(_) => Ok(()),
            Err(e) => {
                self.abort();
                Err(MailError::Smtp(e))
            }
        }
    }
}

/// An authenticated SMTP session holding the contacts used for every [`MailSession::send`].
///
/// The session must be ended with [`MailSession::close`], dropping it closes the socket
/// without saying goodbye to the server.
pub struct MailSession<R: Relay = SmtpConnection> {
    relay: R,
    contacts: ContactBook,
}

impl MailSession<SmtpConnection> {
    /// Connects, authenticates and sets the sender to the login user
    pub fn connect(options: &SessionOptions) -> MailResult<Self> {
        if options.timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout.into());
        }
        debug!(
            "Connecting to {}:{} (ssl: {}, timeout: {}s)",
            options.host, options.port, options.use_ssl, options.timeout
        );
        let timeout = Some(Duration::from(options.timeout));
        let tls = if options.use_ssl {
            Some(TlsParameters::new(options.host.clone()).map_err(MailError::Connection)?)
        } else {
            None
        };
        let mut connection = SmtpConnection::connect(
            (options.host.as_str(), options.port),
            timeout,
            &ClientId::default(),
            tls.as_ref(),
            None,
        )
        .map_err(|e| {
            if timed_out(&e) {
                MailError::Timeout(e)
            } else {
                MailError::Connection(e)
            }
        })?;

        let credentials = Credentials::new(options.user.clone(), options.password.clone());
        if let Err(e) = connection.auth(MECHANISMS, &credentials) {
            connection.abort();
            return Err(if timed_out(&e) {
                MailError::Timeout(e)
            } else {
                MailError::Authentication(e)
            });
        }
        info!("Logged in to {} as {}", options.host, options.user);

        Ok(Self::with_relay(connection, &options.user))
    }
}

/// A socket read timeout shows up as `WouldBlock` on some platforms and `TimedOut` on others
fn timed_out(error: &lettre::transport::smtp::Error) -> bool {
    if error.is_timeout() {
        return true;
    }
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io_error) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_error.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}

impl<R: Relay> MailSession<R> {
    /// Wraps an already authenticated relay. The sender defaults to `(user, user)` when `user`
    /// is a usable address, otherwise it stays unset until [`MailSession::from_set`].
    pub fn with_relay(relay: R, user: &str) -> Self {
        let mut contacts = ContactBook::default();
        if let Err(e) = contacts.set_from(user, user) {
            debug!("Login {user:?} is not a sender address, From left unset: {e}");
        }
        Self { relay, contacts }
    }

    pub fn from_set(&mut self, address: &str, name: &str) -> MailResult<()> {
        self.contacts.set_from(address, name)
    }

    pub fn to_set<I, A, N>(&mut self, pairs: I) -> MailResult<()>
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: AsRef<str>,
    {
        self.contacts.set_to(pairs)
    }

    pub fn cc_set<I, A, N>(&mut self, pairs: I) -> MailResult<()>
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: AsRef<str>,
    {
        self.contacts.set_cc(pairs)
    }

    pub fn bcc_set<I, A, N>(&mut self, pairs: I) -> MailResult<()>
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: AsRef<str>,
    {
        self.contacts.set_bcc(pairs)
    }

    /// Replaces all four slots at once
    pub fn set_contacts(&mut self, contacts: ContactBook) {
        self.contacts = contacts;
    }

    pub fn contacts(&self) -> &ContactBook {
        &self.contacts
    }

    /// Composes `letter` and hands it to the server. Nothing is transmitted unless the whole
    /// message, attachments included, could be built. The session stays open afterwards.
    pub fn send(&mut self, letter: &Letter) -> MailResult<()> {
        let message = compose(&self.contacts, letter)?;
        let envelope = message.envelope();
        debug!(
            "Sending {:?} from {:?} to {} recipient(s)",
            letter.title,
            envelope.from().map(ToString::to_string),
            envelope.to().len()
        );
        self.relay.transmit(envelope, &message.formatted())?;
        info!("Message {:?} accepted for delivery", letter.title);
        Ok(())
    }

    /// Ends the session with QUIT. Consumes the session so it cannot be used or closed again.
    pub fn close(self) -> MailResult<()> {
        let mut relay = self.relay;
        match relay.shutdown() {
            Ok(()) => {
                debug!("Session closed");
                Ok(())
            }
            Err(e) => {
                warn!("Session did not close cleanly: {e}");
                Err(e)
            }
        }
    }
}
