use std::fmt::Display;

use lettre::{
    message::{Mailbox, Mailboxes},
    Address,
};
use log::debug;

use crate::error::{MailResult, ValidationError};

/// An address together with the name shown to the reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    address: Address,
    display_name: String,
}

impl Contact {
    /// Builds a contact, falling back to the address when `name` is missing or empty
    pub fn new(address: &str, name: Option<&str>) -> MailResult<Self> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyAddress.into());
        }
        let parsed: Address =
            trimmed
                .parse()
                .map_err(|source| ValidationError::InvalidAddress {
                    address: address.to_string(),
                    source,
                })?;
        let display_name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => trimmed.to_string(),
        };
        Ok(Self {
            address: parsed,
            display_name,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn to_mailbox(&self) -> Mailbox {
        Mailbox::new(Some(self.display_name.clone()), self.address.clone())
    }

    /// Builds contacts from (address, name) pairs keeping order and duplicates.
    /// An empty name means "use the address".
    pub fn from_pairs<I, A, N>(pairs: I) -> MailResult<Vec<Self>>
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: AsRef<str>,
    {
        pairs
            .into_iter()
            .map(|(address, name)| Self::new(address.as_ref(), Some(name.as_ref())))
            .collect()
    }
}

impl Display for Contact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.display_name, self.address)
    }
}

/// The From/To/Cc/Bcc slots of a session. Every setter replaces its whole slot and leaves
/// the previous contents untouched if any pair is invalid.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContactBook {
    from: Option<Contact>,
    to: Vec<Contact>,
    cc: Vec<Contact>,
    bcc: Vec<Contact>,
}

impl ContactBook {
    pub fn set_from(&mut self, address: &str, name: &str) -> MailResult<()> {
        let contact = Contact::new(address, Some(name))?;
        debug!("From set to {contact}");
        self.from = Some(contact);
        Ok(())
    }

    pub fn set_to<I, A, N>(&mut self, pairs: I) -> MailResult<()>
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: AsRef<str>,
    {
        self.to = Contact::from_pairs(pairs)?;
        debug!("To set to {} contact(s)", self.to.len());
        Ok(())
    }

    pub fn set_cc<I, A, N>(&mut self, pairs: I) -> MailResult<()>
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: AsRef<str>,
    {
        self.cc = Contact::from_pairs(pairs)?;
        debug!("Cc set to {} contact(s)", self.cc.len());
        Ok(())
    }

    pub fn set_bcc<I, A, N>(&mut self, pairs: I) -> MailResult<()>
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: AsRef<str>,
    {
        self.bcc = Contact::from_pairs(pairs)?;
        debug!("Bcc set to {} contact(s)", self.bcc.len());
        Ok(())
    }

    pub fn from(&self) -> Option<&Contact> {
        self.from.as_ref()
    }

    pub fn to(&self) -> &[Contact] {
        &self.to
    }

    pub fn cc(&self) -> &[Contact] {
        &self.cc
    }

    pub fn bcc(&self) -> &[Contact] {
        &self.bcc
    }

    /// Envelope recipients: To then Cc then Bcc, duplicates kept
    pub fn recipients(&self) -> Vec<Address> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|contact| contact.address.clone())
            .collect()
    }

    /// All contacts of one slot as a single mailbox list, so they end up in one header
    pub(crate) fn mailboxes(contacts: &[Contact]) -> Option<Mailboxes> {
        if contacts.is_empty() {
            None
        } else {
            Some(contacts.iter().map(Contact::to_mailbox).collect())
        }
    }
}
