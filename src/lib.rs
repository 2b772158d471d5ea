//! Compose MIME messages with attachments and deliver them over an authenticated SMTP session.
//!
//! ```no_run
//! use hmail::{Letter, MailSession, SessionOptions};
//!
//! # fn main() -> hmail::MailResult<()> {
//! let options = SessionOptions::new("me@example.com", "secret", "smtp.example.com");
//! let mut session = MailSession::connect(&options)?;
//! session.from_set("me@example.com", "Me")?;
//! session.to_set([("you@example.com", "You"), ("them@example.com", "Them")])?;
//! session.cc_set([("boss@example.com", "Boss")])?;
//! session.send(&Letter::new("Report", "<img src=\"cid:0\"/>").attach("chart.png"))?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```

mod attachment;
mod cli;
mod config;
mod contact;
mod error;
mod logging;
mod message;
mod session;
mod units;

use std::io::{self, Write};

use anyhow::Context;
use log::{info, warn};

pub use attachment::Attachment;
pub use cli::{Cli, LogLevel, Recipient};
pub use config::Config;
pub use contact::{Contact, ContactBook};
pub use error::{MailError, MailResult, ValidationError};
pub use logging::init_logging;
pub use message::{compose, BodyType, Charset, Letter};
pub use session::{MailSession, Relay, SessionOptions, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use units::Seconds;

pub fn run(cli: Cli, config: &Config) -> anyhow::Result<()> {
    let letter = cli.letter().context("Failed to prepare message")?;
    let contacts = cli
        .contacts(config)
        .context("Failed to set up sender and recipients")?;

    if cli.dry_run {
        let message = compose(&contacts, &letter).context("Failed to compose message")?;
        io::stdout()
            .write_all(&message.formatted())
            .context("Failed to write message to stdout")?;
        return Ok(());
    }

    let mut session = MailSession::connect(&SessionOptions::from(config))
        .with_context(|| format!("Failed to open session with {}:{}", config.host, config.port))?;
    session.set_contacts(contacts);
    let sent = session.send(&letter);
    if let Err(e) = session.close() {
        warn!("Failed to close session with {}: {e:?}", config.host);
    }
    sent.context("Failed to send message")?;
    info!("Completed");
    Ok(())
}
