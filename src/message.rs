use std::{fmt::Display, path::PathBuf, str::FromStr};

use lettre::{
    address::Envelope,
    message::{
        header::{self, ContentDisposition, ContentId, ContentType},
        MultiPart, SinglePart,
    },
    Message,
};
use log::debug;

use crate::{
    attachment::Attachment,
    contact::ContactBook,
    error::{MailResult, ValidationError},
};

/// How the body text is tagged in its `text/<subtype>` part
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Plain,
    #[default]
    Html,
    Base64,
}

impl BodyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::Plain => "plain",
            BodyType::Html => "html",
            BodyType::Base64 => "base64",
        }
    }
}

impl Display for BodyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BodyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(BodyType::Plain),
            "html" => Ok(BodyType::Html),
            "base64" => Ok(BodyType::Base64),
            other => Err(ValidationError::UnknownBodyType(other.to_string())),
        }
    }
}

/// Character set used for the body and for encoded header words
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    #[default]
    Utf8,
}

impl Charset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
        }
    }
}

impl Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Charset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utf-8" => Ok(Charset::Utf8),
            other => Err(ValidationError::UnknownEncoding(other.to_string())),
        }
    }
}

/// Subject, body and attachments of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Letter {
    pub title: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
    pub body_type: BodyType,
    pub charset: Charset,
}

impl Letter {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            attachments: Vec::new(),
            body_type: BodyType::default(),
            charset: Charset::default(),
        }
    }

    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    pub fn attach_all<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.attachments.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = body_type;
        self
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }
}

/// Builds the multipart message for `letter` addressed with the slots of `contacts`.
///
/// Each slot becomes a single header with all of its contacts comma separated, some clients
/// only show one recipient when a field is repeated. The envelope lists To, Cc then Bcc
/// addresses without removing duplicates. Attachments are read in order and any unreadable
/// file fails the whole message.
pub fn compose(contacts: &ContactBook, letter: &Letter) -> MailResult<Message> {
    let sender = contacts.from().ok_or(ValidationError::MissingSender)?;
    let recipients = contacts.recipients();
    if recipients.is_empty() {
        return Err(ValidationError::NoRecipients.into());
    }
    let envelope = Envelope::new(Some(sender.address().clone()), recipients)?;

    let mut builder = Message::builder()
        .subject(letter.title.as_str())
        .from(sender.to_mailbox())
        .envelope(envelope)
        .keep_bcc();
    if let Some(to) = ContactBook::mailboxes(contacts.to()) {
        builder = builder.header(header::To::from(to));
    }
    if let Some(cc) = ContactBook::mailboxes(contacts.cc()) {
        builder = builder.header(header::Cc::from(cc));
    }
    if let Some(bcc) = ContactBook::mailboxes(contacts.bcc()) {
        builder = builder.header(header::Bcc::from(bcc));
    }

    let body_type = text_content_type(letter.body_type, letter.charset)?;
    let mut parts = MultiPart::mixed().singlepart(
        SinglePart::builder()
            .header(body_type)
            .body(letter.body.clone()),
    );

    for (id, path) in letter.attachments.iter().enumerate() {
        let attachment = Attachment::new(path.as_path(), None)?;
        let content = attachment.read()?;
        debug!(
            "Attaching {:?} as {:?} with content id {id}",
            attachment.path(),
            attachment.display_name()
        );
        parts = parts.singlepart(attachment_part(&attachment, id, content)?);
    }

    let message = builder.multipart(parts)?;
    debug!(
        "Composed message {:?} for {} recipient(s)",
        letter.title,
        message.envelope().to().len()
    );
    Ok(message)
}

fn text_content_type(body_type: BodyType, charset: Charset) -> MailResult<ContentType> {
    content_type(format!("text/{body_type}; charset={charset}"))
}

fn content_type(raw: String) -> MailResult<ContentType> {
    ContentType::parse(&raw).map_err(|_| ValidationError::ContentType(raw).into())
}

/// Content-ID is the bare counter so html bodies can refer to it as `cid:<id>`
fn attachment_part(attachment: &Attachment, id: usize, content: Vec<u8>) -> MailResult<SinglePart> {
    Ok(SinglePart::builder()
        .header(content_type("application/octet-stream".to_string())?)
        .header(ContentDisposition::attachment(attachment.display_name()))
        .header(ContentId::from(id.to_string()))
        .body(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MailError;
    use rstest::rstest;
    use std::io::Write;

    fn book() -> ContactBook {
        let mut book = ContactBook::default();
        book.set_from("a@x.com", "A").unwrap();
        book.set_to([("b@x.com", "B")]).unwrap();
        book.set_cc([("c@x.com", "C")]).unwrap();
        book
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8(message.formatted()).unwrap()
    }

    fn count_header(formatted: &str, name: &str) -> usize {
        formatted
            .split("\r\n")
            .filter(|line| line.starts_with(&format!("{name}: ")))
            .count()
    }

    #[rstest]
    #[case("plain", BodyType::Plain)]
    #[case("html", BodyType::Html)]
    #[case("base64", BodyType::Base64)]
    fn body_type_from_str(#[case] input: &str, #[case] expected: BodyType) {
        let actual: BodyType = input.parse().unwrap();
        assert_eq!(actual, expected);
        assert_eq!(actual.to_string(), input);
    }

    #[rstest]
    #[case("xml")]
    #[case("HTML")]
    #[case("")]
    fn unknown_body_type(#[case] input: &str) {
        let actual = input.parse::<BodyType>();
        assert!(matches!(actual, Err(ValidationError::UnknownBodyType(_))));
    }

    #[rstest]
    #[case("utf-8", true)]
    #[case("UTF-8", false)]
    #[case("Utf-8", false)]
    #[case("utf8", false)]
    #[case("gbk", false)]
    #[case("latin1", false)]
    fn charset_from_str(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(input.parse::<Charset>().is_ok(), ok);
    }

    #[test]
    fn defaults_are_html_and_utf8() {
        let letter = Letter::new("Title", "Body");
        assert_eq!(letter.body_type, BodyType::Html);
        assert_eq!(letter.charset, Charset::Utf8);
        assert!(letter.attachments.is_empty());
    }

    #[test]
    fn end_to_end_headers_and_envelope() {
        // Arrange
        let letter = Letter::new("Hello", "<p>Hi</p>");

        // Act
        let message = compose(&book(), &letter).unwrap();

        // Assert
        let recipients: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|address| address.to_string())
            .collect();
        assert_eq!(recipients, ["b@x.com", "c@x.com"]);
        assert_eq!(
            message.envelope().from().map(|address| address.to_string()),
            Some("a@x.com".to_string())
        );
        let text = formatted(&message);
        assert!(text.contains("\r\nTo: B <b@x.com>\r\n"), "{text}");
        assert!(text.contains("\r\nCc: C <c@x.com>\r\n"), "{text}");
        assert!(text.contains("Content-Type: text/html; charset=utf-8"), "{text}");
        assert_eq!(count_header(&text, "Bcc"), 0);
    }

    #[test]
    fn many_contacts_share_one_header() {
        // Arrange
        let mut book = book();
        book.set_to([("b@x.com", "B"), ("d@x.com", "D"), ("e@x.com", "E")])
            .unwrap();
        book.set_bcc([("f@x.com", "F"), ("g@x.com", "G")]).unwrap();
        let letter = Letter::new("Hello", "Body").body_type(BodyType::Plain);

        // Act
        let text = formatted(&compose(&book, &letter).unwrap());

        // Assert
        assert_eq!(count_header(&text, "To"), 1);
        assert_eq!(count_header(&text, "Bcc"), 1);
        let to_line = text
            .split("\r\n")
            .find(|line| line.starts_with("To: "))
            .unwrap();
        assert_eq!(to_line.matches(',').count(), 2, "{to_line}");
        for address in ["b@x.com", "d@x.com", "e@x.com"] {
            assert!(to_line.contains(address), "{to_line}");
        }
    }

    #[test]
    fn rendering_is_stable_when_list_is_set_twice() {
        // Arrange
        let mut book = book();
        let letter = Letter::new("Hello", "Body");
        let to_line = |book: &ContactBook| {
            let text = formatted(&compose(book, &letter).unwrap());
            text.split("\r\n")
                .find(|line| line.starts_with("To: "))
                .map(str::to_string)
        };

        // Act
        book.set_to([("b@x.com", "B"), ("d@x.com", "D")]).unwrap();
        let first = to_line(&book);
        book.set_to([("b@x.com", "B"), ("d@x.com", "D")]).unwrap();
        let second = to_line(&book);

        // Assert
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let letter = Letter::new("邮件标题", "正文");
        let text = formatted(&compose(&book(), &letter).unwrap());
        let subject = text
            .split("\r\n")
            .find(|line| line.starts_with("Subject: "))
            .unwrap();
        assert!(subject.to_lowercase().contains("=?utf-8?"), "{subject}");
        assert!(!subject.contains("邮件标题"));
    }

    #[test]
    fn base64_body_type_is_tagged() {
        let letter = Letter::new("Hello", "Body").body_type(BodyType::Base64);
        let text = formatted(&compose(&book(), &letter).unwrap());
        assert!(text.contains("Content-Type: text/base64; charset=utf-8"), "{text}");
    }

    #[test]
    fn attachments_get_content_ids_in_order() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.bin");
        std::fs::File::create(&first)
            .unwrap()
            .write_all(b"first")
            .unwrap();
        std::fs::File::create(&second)
            .unwrap()
            .write_all(&[0, 1, 2, 255])
            .unwrap();
        let letter = Letter::new("Files", "<img src=\"cid:0\"/>").attach_all([&first, &second]);

        // Act
        let text = formatted(&compose(&book(), &letter).unwrap());

        // Assert
        let ids: Vec<&str> = text
            .split("\r\n")
            .filter_map(|line| line.strip_prefix("Content-ID: "))
            .collect();
        assert_eq!(ids, ["0", "1"]);
        let first_at = text.find("filename=\"first.txt\"").unwrap();
        let second_at = text.find("filename=\"second.bin\"").unwrap();
        assert!(first_at < second_at);
        assert_eq!(text.matches("Content-Type: application/octet-stream").count(), 2);
        assert_eq!(text.matches("Content-Disposition: attachment;").count(), 2);
    }

    #[test]
    fn missing_attachment_fails_compose() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let letter = Letter::new("Files", "Body").attach(&missing);

        // Act
        let result = compose(&book(), &letter);

        // Assert
        match result {
            Err(MailError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected an io error, got {other:?}"),
        }
    }

    #[test]
    fn no_recipients_is_rejected() {
        let mut book = ContactBook::default();
        book.set_from("a@x.com", "A").unwrap();
        let result = compose(&book, &Letter::new("Hello", "Body"));
        assert!(matches!(
            result,
            Err(MailError::Validation(ValidationError::NoRecipients))
        ));
    }

    #[test]
    fn missing_sender_is_rejected() {
        let mut book = ContactBook::default();
        book.set_to([("b@x.com", "B")]).unwrap();
        let result = compose(&book, &Letter::new("Hello", "Body"));
        assert!(matches!(
            result,
            Err(MailError::Validation(ValidationError::MissingSender))
        ));
    }
}
