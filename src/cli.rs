use std::{fs, path::PathBuf, str::FromStr};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::{
    error::{MailResult, ValidationError},
    BodyType, Charset, Config, ContactBook, Letter,
};

#[derive(Parser, Clone, Eq, PartialEq, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Compose an email with attachments and deliver it over an authenticated SMTP session."
)]
pub struct Cli {
    /// Specify config file to use
    ///
    /// If not specified uses `config.json` in the current folder
    #[arg(long = "config", short, value_name = "PATH")]
    pub config_filename: Option<String>,

    /// Set logging level to use
    #[arg(long, short, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Folder for the rolling log files
    #[arg(long, value_name = "PATH", default_value = "log")]
    pub log_dir: PathBuf,

    /// Subject of the message
    #[arg(long, short)]
    pub subject: String,

    /// Body of the message
    #[arg(long, short, conflicts_with = "body_file", default_value = "")]
    pub body: String,

    /// Read the body from a file instead
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,

    /// One of plain, html, base64
    #[arg(long, default_value = "html")]
    pub body_type: BodyType,

    /// Character encoding of the body and headers
    #[arg(long, default_value = "utf-8")]
    pub encoding: Charset,

    /// Recipient as `Name <address>` or `address`, repeat for more
    #[arg(long, value_name = "RECIPIENT")]
    pub to: Vec<Recipient>,

    /// Carbon copy recipient, same format as --to
    #[arg(long, value_name = "RECIPIENT")]
    pub cc: Vec<Recipient>,

    /// Blind carbon copy recipient, same format as --to
    #[arg(long, value_name = "RECIPIENT")]
    pub bcc: Vec<Recipient>,

    /// File to attach, repeat for more. The n-th file can be shown inline with `cid:n`
    #[arg(long = "attach", short, value_name = "PATH")]
    pub attachments: Vec<PathBuf>,

    /// Print the composed message instead of sending it
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn get_config_path(&self) -> PathBuf {
        match self.config_filename.as_ref() {
            Some(val) => PathBuf::from(val),
            None => PathBuf::from("config.json"),
        }
    }

    pub fn letter(&self) -> anyhow::Result<Letter> {
        let body = match &self.body_file {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read body from {path:?}"))?,
            None => self.body.clone(),
        };
        Ok(Letter::new(&self.subject, body)
            .attach_all(self.attachments.iter().cloned())
            .body_type(self.body_type)
            .charset(self.encoding))
    }

    /// Sender comes from the config, recipients from the arguments
    pub fn contacts(&self, config: &Config) -> MailResult<ContactBook> {
        let mut book = ContactBook::default();
        book.set_from(&config.user, config.sender_name.as_deref().unwrap_or(""))?;
        book.set_to(self.to.iter().map(Recipient::as_pair))?;
        book.set_cc(self.cc.iter().map(Recipient::as_pair))?;
        book.set_bcc(self.bcc.iter().map(Recipient::as_pair))?;
        Ok(book)
    }
}

/// Address with an optional display name as typed on the command line
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Recipient {
    pub address: String,
    pub name: Option<String>,
}

impl Recipient {
    pub fn as_pair(&self) -> (&str, &str) {
        (&self.address, self.name.as_deref().unwrap_or(""))
    }
}

impl FromStr for Recipient {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (address, name) = match s.strip_suffix('>').and_then(|s| s.rsplit_once('<')) {
            Some((name, address)) => {
                let name = name.trim().trim_matches('"').trim();
                (address.trim(), (!name.is_empty()).then(|| name.to_string()))
            }
            None => (s, None),
        };
        if address.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        Ok(Self {
            address: address.to_string(),
            name,
        })
    }
}

/// Exists to provide better help messages variants copied from LevelFilter as
/// that's the type that is actually needed
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum LogLevel {
    /// Nothing emitted in this mode
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
