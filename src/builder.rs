//! Accumulates message fields and produces [`MimeMessage`] snapshots.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    address::{Address, AddressList, IntoAddresses},
    config::{Credentials, Session, SessionConfig},
    content::{Attachment, Content, ContentType, Multipart, MultipartKind, TextPart, guess_content_type},
    encoding::Charset,
    error::{EmailError, Result},
    message::MimeMessage,
    transport::Transport,
};

/// Which address list a recipient operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
    ReplyTo,
}

/// Builder for email messages.
///
/// Fields can be set in any order. [`build`](Self::build) validates what has
/// been accumulated and freezes it into a [`MimeMessage`]; the builder stays
/// usable afterwards and a later `build` reflects later changes. Failed
/// operations leave the builder exactly as it was.
///
/// # Examples
///
/// ```
/// use missive::MessageBuilder;
///
/// # fn example() -> missive::Result<()> {
/// let mut builder = MessageBuilder::new();
/// builder
///     .set_from("sender@example.com")?
///     .add_to("recipient@example.com")?
///     .set_subject("Hello")
///     .set_text("This is the message body");
///
/// let message = builder.build()?;
/// assert_eq!(message.subject(), Some("Hello"));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    subject: Option<String>,
    from: Option<Address>,
    to: AddressList,
    cc: AddressList,
    bcc: AddressList,
    reply_to: AddressList,
    headers: BTreeMap<String, String>,
    sent_date: Option<DateTime<Utc>>,
    content: Option<Content>,
    content_type: Option<ContentType>,
    charset: Option<Charset>,
    /// Connection fields set directly on the builder.
    connection: SessionConfig,
    /// A session supplied by the caller, preferred over `connection`.
    session: Option<SessionConfig>,
    built: Option<Arc<MimeMessage>>,
}

impl MessageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn list_mut(&mut self, kind: RecipientKind) -> &mut AddressList {
        match kind {
            RecipientKind::To => &mut self.to,
            RecipientKind::Cc => &mut self.cc,
            RecipientKind::Bcc => &mut self.bcc,
            RecipientKind::ReplyTo => &mut self.reply_to,
        }
    }

    /// The current list for `kind`.
    #[must_use]
    pub const fn recipients(&self, kind: RecipientKind) -> &AddressList {
        match kind {
            RecipientKind::To => &self.to,
            RecipientKind::Cc => &self.cc,
            RecipientKind::Bcc => &self.bcc,
            RecipientKind::ReplyTo => &self.reply_to,
        }
    }

    /// Appends one or more addresses to the list selected by `kind`.
    ///
    /// Addresses already in that list are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::AddressFormat`] if any address is malformed, in
    /// which case none are added.
    pub fn add_recipient(
        &mut self,
        kind: RecipientKind,
        addresses: impl IntoAddresses,
    ) -> Result<&mut Self> {
        let addresses = addresses.into_addresses()?;
        let list = self.list_mut(kind);

        let added = addresses
            .into_iter()
            .filter(|address| list.push(address.clone()))
            .count();

        crate::internal!(
            level = TRACE,
            span = "add_recipient" { added = added, total = list.len() },
            "Added {added} {kind:?} recipient(s)"
        );

        Ok(self)
    }

    /// # Errors
    ///
    /// See [`add_recipient`](Self::add_recipient).
    pub fn add_to(&mut self, addresses: impl IntoAddresses) -> Result<&mut Self> {
        self.add_recipient(RecipientKind::To, addresses)
    }

    /// # Errors
    ///
    /// See [`add_recipient`](Self::add_recipient).
    pub fn add_cc(&mut self, addresses: impl IntoAddresses) -> Result<&mut Self> {
        self.add_recipient(RecipientKind::Cc, addresses)
    }

    /// # Errors
    ///
    /// See [`add_recipient`](Self::add_recipient).
    pub fn add_bcc(&mut self, addresses: impl IntoAddresses) -> Result<&mut Self> {
        self.add_recipient(RecipientKind::Bcc, addresses)
    }

    /// Adds a Reply-To address with a display name.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::AddressFormat`] if `address` is malformed.
    pub fn add_reply_to(&mut self, address: &str, name: impl Into<String>) -> Result<&mut Self> {
        let address = Address::with_name(address, name)?;
        self.add_recipient(RecipientKind::ReplyTo, address)
    }

    /// Replaces the list selected by `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::InvalidArgument`] for an empty list and
    /// [`EmailError::AddressFormat`] for a malformed address. The existing
    /// list is kept on error.
    pub fn set_recipients(
        &mut self,
        kind: RecipientKind,
        addresses: impl IntoAddresses,
    ) -> Result<&mut Self> {
        let addresses = addresses.into_addresses()?;
        if addresses.is_empty() {
            return Err(EmailError::InvalidArgument(
                "address list provided was invalid".to_string(),
            ));
        }

        *self.list_mut(kind) = addresses.into_iter().collect();
        Ok(self)
    }

    /// # Errors
    ///
    /// See [`set_recipients`](Self::set_recipients).
    pub fn set_to(&mut self, addresses: impl IntoAddresses) -> Result<&mut Self> {
        self.set_recipients(RecipientKind::To, addresses)
    }

    /// # Errors
    ///
    /// See [`set_recipients`](Self::set_recipients).
    pub fn set_cc(&mut self, addresses: impl IntoAddresses) -> Result<&mut Self> {
        self.set_recipients(RecipientKind::Cc, addresses)
    }

    /// # Errors
    ///
    /// See [`set_recipients`](Self::set_recipients).
    pub fn set_bcc(&mut self, addresses: impl IntoAddresses) -> Result<&mut Self> {
        self.set_recipients(RecipientKind::Bcc, addresses)
    }

    /// # Errors
    ///
    /// See [`set_recipients`](Self::set_recipients).
    pub fn set_reply_to(&mut self, addresses: impl IntoAddresses) -> Result<&mut Self> {
        self.set_recipients(RecipientKind::ReplyTo, addresses)
    }

    #[must_use]
    pub const fn to_addresses(&self) -> &AddressList {
        &self.to
    }

    #[must_use]
    pub const fn cc_addresses(&self) -> &AddressList {
        &self.cc
    }

    #[must_use]
    pub const fn bcc_addresses(&self) -> &AddressList {
        &self.bcc
    }

    #[must_use]
    pub const fn reply_to_addresses(&self) -> &AddressList {
        &self.reply_to
    }

    /// Adds a header, replacing any previous value for the same name.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::InvalidArgument`] if `name` or `value` is
    /// empty, if `name` is not a valid field name, or if it names a field
    /// the message writes itself (`Subject`, `Content-Type`, ...).
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        validate_header(name, value)?;
        self.headers.insert(name.to_string(), value.to_string());
        Ok(self)
    }

    /// Replaces every header.
    ///
    /// # Errors
    ///
    /// Fails like [`add_header`](Self::add_header) on the first bad entry,
    /// leaving the current headers untouched.
    pub fn set_headers<K, V>(
        &mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Result<&mut Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| {
                let (name, value) = (name.into(), value.into());
                validate_header(&name, &value).map(|()| (name, value))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        self.headers = headers;
        Ok(self)
    }

    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// # Errors
    ///
    /// Returns [`EmailError::AddressFormat`] if `address` is malformed.
    pub fn set_from(&mut self, address: &str) -> Result<&mut Self> {
        self.from = Some(address.parse()?);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`EmailError::AddressFormat`] if `address` is malformed.
    pub fn set_from_named(&mut self, address: &str, name: impl Into<String>) -> Result<&mut Self> {
        self.from = Some(Address::with_name(address, name)?);
        Ok(self)
    }

    #[must_use]
    pub const fn from(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    /// Sets the envelope sender that bounces are returned to.
    ///
    /// The value is passed through as-is; transports interpret it.
    pub fn set_bounce_address(&mut self, address: impl Into<String>) -> &mut Self {
        self.connection.bounce_address = Some(address.into());
        self
    }

    /// The explicit bounce address, else the supplied session's.
    #[must_use]
    pub fn bounce_address(&self) -> Option<&str> {
        self.connection.bounce_address.as_deref().or_else(|| {
            self.session
                .as_ref()
                .and_then(|session| session.bounce_address.as_deref())
        })
    }

    pub const fn set_sent_date(&mut self, date: DateTime<Utc>) -> &mut Self {
        self.sent_date = Some(date);
        self
    }

    /// The explicit sent date, or the current time if none was set.
    #[must_use]
    pub fn sent_date(&self) -> DateTime<Utc> {
        self.sent_date.unwrap_or_else(Utc::now)
    }

    /// # Errors
    ///
    /// Returns [`EmailError::InvalidArgument`] for an unknown charset label.
    pub fn set_charset(&mut self, label: &str) -> Result<&mut Self> {
        self.charset = Some(Charset::for_label(label)?);
        Ok(self)
    }

    #[must_use]
    pub const fn charset(&self) -> Option<Charset> {
        self.charset
    }

    pub fn set_content(&mut self, content: Content) -> &mut Self {
        self.content = Some(content);
        self
    }

    /// Sets a plain text body.
    pub fn set_text(&mut self, body: impl Into<String>) -> &mut Self {
        self.set_content(Content::text(body))
    }

    /// Sets an HTML body.
    pub fn set_html(&mut self, body: impl Into<String>) -> &mut Self {
        self.set_content(Content::html(body))
    }

    #[must_use]
    pub const fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// Attaches a file, guessing its content type from `filename`.
    ///
    /// The body becomes `multipart/mixed` with any existing content as its
    /// first part.
    pub fn attach(&mut self, filename: impl Into<String>, data: Vec<u8>) -> &mut Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        self.push_attachment(Attachment {
            filename,
            content_type,
            data,
        })
    }

    /// Attaches a file with an explicit content type.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::InvalidArgument`] if `content_type` does not
    /// parse.
    pub fn attach_with_type(
        &mut self,
        filename: impl Into<String>,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<&mut Self> {
        let content_type = content_type.parse()?;
        Ok(self.push_attachment(Attachment {
            filename: filename.into(),
            content_type,
            data,
        }))
    }

    fn push_attachment(&mut self, attachment: Attachment) -> &mut Self {
        let multipart = match self.content.take() {
            Some(Content::Multipart(mut multipart)) if multipart.kind() == MultipartKind::Mixed => {
                multipart.push(attachment);
                multipart
            }
            Some(content) => Multipart::new(MultipartKind::Mixed)
                .with_part(content)
                .with_part(attachment),
            None => Multipart::new(MultipartKind::Mixed).with_part(attachment),
        };

        self.content = Some(Content::Multipart(multipart));
        self
    }

    /// Sets the content type a single-part body is sent as, e.g.
    /// `application/json` for a JSON payload set with
    /// [`set_text`](Self::set_text). Multipart bodies keep their own types.
    ///
    /// A `charset=` parameter also becomes the message charset.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::InvalidArgument`] if the value does not parse
    /// or names an unknown charset.
    pub fn update_content_type(&mut self, content_type: &str) -> Result<&mut Self> {
        let content_type: ContentType = content_type.parse()?;
        let charset = content_type.charset().map(Charset::for_label).transpose()?;

        if charset.is_some() {
            self.charset = charset;
        }
        self.content_type = Some(content_type);
        Ok(self)
    }

    #[must_use]
    pub const fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    pub fn set_host_name(&mut self, host: impl Into<String>) -> &mut Self {
        self.connection.host = Some(host.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`EmailError::InvalidArgument`] for port 0.
    pub fn set_smtp_port(&mut self, port: u16) -> Result<&mut Self> {
        self.connection.port = non_zero_port(port)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`EmailError::InvalidArgument`] for port 0.
    pub fn set_ssl_smtp_port(&mut self, port: u16) -> Result<&mut Self> {
        self.connection.ssl_port = non_zero_port(port)?;
        Ok(self)
    }

    #[must_use]
    pub const fn smtp_port(&self) -> u16 {
        self.connection.port
    }

    #[must_use]
    pub const fn ssl_smtp_port(&self) -> u16 {
        self.connection.ssl_port
    }

    pub const fn set_ssl_on_connect(&mut self, enabled: bool) -> &mut Self {
        self.connection.tls.ssl_on_connect = enabled;
        self
    }

    pub const fn set_start_tls_enabled(&mut self, enabled: bool) -> &mut Self {
        self.connection.tls.start_tls_enabled = enabled;
        self
    }

    /// Requiring STARTTLS also enables it.
    pub const fn set_start_tls_required(&mut self, required: bool) -> &mut Self {
        self.connection.tls.start_tls_required = required;
        if required {
            self.connection.tls.start_tls_enabled = true;
        }
        self
    }

    pub const fn set_ssl_check_server_identity(&mut self, enabled: bool) -> &mut Self {
        self.connection.tls.check_server_identity = enabled;
        self
    }

    pub fn set_authentication(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        self.connection.credentials = Some(Credentials::new(username, password));
        self
    }

    pub const fn set_socket_connection_timeout(&mut self, millis: u64) -> &mut Self {
        self.connection.timeouts.connection_ms = millis;
        self
    }

    #[must_use]
    pub const fn socket_connection_timeout(&self) -> u64 {
        self.connection.timeouts.connection_ms
    }

    pub const fn set_socket_timeout(&mut self, millis: u64) -> &mut Self {
        self.connection.timeouts.read_ms = millis;
        self
    }

    #[must_use]
    pub const fn socket_timeout(&self) -> u64 {
        self.connection.timeouts.read_ms
    }

    pub const fn set_send_partial(&mut self, enabled: bool) -> &mut Self {
        self.connection.send_partial = enabled;
        self
    }

    pub const fn set_debug(&mut self, enabled: bool) -> &mut Self {
        self.connection.debug = enabled;
        self
    }

    /// Supplies a session configuration, taking precedence over the
    /// builder's own connection fields in [`resolve_session`](Self::resolve_session).
    pub fn set_session(&mut self, session: SessionConfig) -> &mut Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub const fn session(&self) -> Option<&SessionConfig> {
        self.session.as_ref()
    }

    /// The explicit host name, else the supplied session's host.
    ///
    /// This reports the builder's own host first even when a session was
    /// supplied, whereas [`resolve_session`](Self::resolve_session) (and so
    /// [`send`](Self::send)) uses the supplied session as-is. With both set
    /// the two can name different hosts.
    #[must_use]
    pub fn resolve_host_name(&self) -> Option<&str> {
        self.connection
            .host()
            .or_else(|| self.session.as_ref().and_then(SessionConfig::host))
    }

    /// The supplied session, else one synthesized from the builder's
    /// connection fields.
    ///
    /// A supplied session wins over [`set_host_name`](Self::set_host_name)
    /// and the other connection setters, so the host here may differ from
    /// [`resolve_host_name`](Self::resolve_host_name).
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Configuration`] when no session was supplied
    /// and no host name has been set.
    pub fn resolve_session(&self) -> Result<Session> {
        if let Some(session) = &self.session {
            return Ok(Session::new(session.clone()));
        }

        if self.connection.host().is_none() {
            return Err(EmailError::Configuration(
                "cannot find valid hostname for mail session".to_string(),
            ));
        }

        Ok(Session::new(self.connection.clone()))
    }

    fn effective_content(&self) -> Option<Content> {
        match (&self.content, &self.content_type) {
            (Some(Content::Text(part)), Some(content_type)) => {
                Some(Content::Text(TextPart {
                    body: part.body.clone(),
                    content_type: content_type.clone(),
                }))
            }
            (content, _) => content.clone(),
        }
    }

    /// Validates the accumulated fields and freezes them into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::InvalidState`] if there is no To, Cc or Bcc
    /// recipient, or if neither content nor a subject is set. Nothing is
    /// changed on error.
    pub fn build(&mut self) -> Result<Arc<MimeMessage>> {
        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(EmailError::InvalidState(
                "at least one receiver address required".to_string(),
            ));
        }

        if self.content.is_none() && self.subject.is_none() {
            return Err(EmailError::InvalidState(
                "message needs content or a subject".to_string(),
            ));
        }

        let now = Utc::now();
        let message = Arc::new(MimeMessage {
            subject: self.subject.clone(),
            from: self.from.clone(),
            bounce_address: self.bounce_address().map(str::to_string),
            to: self.to.clone(),
            cc: self.cc.clone(),
            bcc: self.bcc.clone(),
            reply_to: self.reply_to.clone(),
            headers: self.headers.clone(),
            sent_date: self.sent_date.unwrap_or(now),
            content: self.effective_content(),
            charset: self.charset.unwrap_or_default(),
            boundary_seed: MimeMessage::next_boundary_seed(now),
        });

        crate::internal!(
            level = DEBUG,
            span = "build" {
                recipients = message.to.len() + message.cc.len() + message.bcc.len(),
                headers = message.headers.len(),
                multipart = message.content.as_ref().map_or(0, Content::multipart_count),
            },
            "Built message"
        );

        self.built = Some(Arc::clone(&message));
        Ok(message)
    }

    /// The snapshot from the last successful [`build`](Self::build).
    #[must_use]
    pub const fn mime_message(&self) -> Option<&Arc<MimeMessage>> {
        self.built.as_ref()
    }

    /// Builds the message and hands it to `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Configuration`] if no session can be resolved,
    /// any error from [`build`](Self::build), or
    /// [`EmailError::Transport`] if delivery fails.
    pub fn send<T: Transport>(&mut self, transport: &T) -> Result<String> {
        let session = self.resolve_session()?;
        let message = self.build()?;

        let host = session.host().unwrap_or("<unknown>");
        let port = session.port();

        let id = transport.send(&session, &message).map_err(|err| {
            crate::internal!(
                level = WARN,
                span = "send" { host = host, port = port },
                "Transport rejected message: {err}"
            );
            EmailError::Transport(Box::new(err))
        })?;

        crate::internal!(
            level = INFO,
            span = "send" { host = host, port = port },
            "Handed message {id} to transport"
        );

        Ok(id)
    }
}

/// Fields the renderer writes from builder state.
const RESERVED_HEADERS: &[&str] = &[
    "Date",
    "From",
    "To",
    "Cc",
    "Bcc",
    "Reply-To",
    "Subject",
    "MIME-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
];

fn validate_header(name: &str, value: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EmailError::InvalidArgument(
            "header name can not be empty".to_string(),
        ));
    }

    if value.is_empty() {
        return Err(EmailError::InvalidArgument(
            "header value can not be empty".to_string(),
        ));
    }

    if name.chars().any(|ch| !ch.is_ascii_graphic() || ch == ':') {
        return Err(EmailError::InvalidArgument(format!(
            "invalid header name {name:?}"
        )));
    }

    if RESERVED_HEADERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(EmailError::InvalidArgument(format!(
            "{name} is written by the message itself and can not be added as a header"
        )));
    }

    Ok(())
}

fn non_zero_port(port: u16) -> Result<u16> {
    if port == 0 {
        Err(EmailError::InvalidArgument(
            "cannot connect to a port number that is less than 1".to_string(),
        ))
    } else {
        Ok(port)
    }
}
