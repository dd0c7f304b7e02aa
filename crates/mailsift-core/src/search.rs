//! Search across several mailboxes
//!
//! Mailboxes are visited in configured order. Within a mailbox the newest
//! match comes first. Each message is fetched and decoded only when the
//! caller polls for it.

use crate::{CoreError, CoreResult};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use mailsift_imap::{
    decode_message, AuthenticatedSession, ImapClient, MailBackend, MessageId, MessageRecord,
    SearchQuery,
};
use tracing::{debug, info};

/// Decoded records, in delivery order; the first error ends the stream
pub type MessageStream<'a> = BoxStream<'a, CoreResult<MessageRecord>>;

/// Runs one query over every configured mailbox of a session
pub struct SearchCoordinator<B: MailBackend = ImapClient> {
    session: AuthenticatedSession<B>,
    mailboxes: Vec<String>,
}

/// Position of a running search
struct Cursor<'a, B: MailBackend> {
    session: &'a mut AuthenticatedSession<B>,
    query: SearchQuery,
    mailboxes: std::vec::IntoIter<String>,
    /// Ascending UIDs of the current mailbox; popped from the back
    pending: Vec<MessageId>,
}

impl<B: MailBackend> SearchCoordinator<B> {
    pub fn new(session: AuthenticatedSession<B>, mailboxes: Vec<String>) -> Self {
        Self { session, mailboxes }
    }

    /// Mailboxes searched, in order
    pub fn mailboxes(&self) -> &[String] {
        &self.mailboxes
    }

    pub fn session(&self) -> &AuthenticatedSession<B> {
        &self.session
    }

    /// Stream every message matching `query`
    ///
    /// Nothing is sent to the server until the stream is polled. Dropping
    /// the stream early leaves the session usable.
    pub fn search(&mut self, query: SearchQuery) -> MessageStream<'_> {
        info!("Searching {:?} for {}", self.mailboxes, query);

        let cursor = Cursor {
            session: &mut self.session,
            query,
            mailboxes: self.mailboxes.clone().into_iter(),
            pending: Vec::new(),
        };
        stream::try_unfold(cursor, next_record).boxed()
    }

    pub fn fetch_all(&mut self) -> MessageStream<'_> {
        self.search(SearchQuery::All)
    }

    /// Messages whose From header contains `sender`
    pub fn fetch_from_sender(&mut self, sender: &str) -> CoreResult<MessageStream<'_>> {
        let query = SearchQuery::from_sender(sender)?;
        Ok(self.search(query))
    }

    /// Messages since a `YYYY-MM-DD` date
    pub fn fetch_since_date(&mut self, date: &str) -> CoreResult<MessageStream<'_>> {
        let query = SearchQuery::since_iso(date)?;
        Ok(self.search(query))
    }

    /// Newest message whose subject contains `text`
    pub async fn fetch_by_subject(&mut self, text: &str) -> CoreResult<Option<MessageRecord>> {
        let query = SearchQuery::subject(text)?;
        self.search(query).try_next().await
    }

    /// Newest message whose body contains `text`
    pub async fn fetch_by_body(&mut self, text: &str) -> CoreResult<Option<MessageRecord>> {
        let query = SearchQuery::body(text)?;
        self.search(query).try_next().await
    }

    pub async fn logout(&mut self) -> CoreResult<()> {
        self.session.logout().await?;
        Ok(())
    }
}

async fn next_record<B: MailBackend>(
    mut cursor: Cursor<'_, B>,
) -> Result<Option<(MessageRecord, Cursor<'_, B>)>, CoreError> {
    loop {
        if let Some(id) = cursor.pending.pop() {
            let raw = cursor.session.fetch_raw(id).await?;
            let record = decode_message(&raw)?;
            return Ok(Some((record, cursor)));
        }

        let Some(mailbox) = cursor.mailboxes.next() else {
            return Ok(None);
        };
        cursor.session.select_mailbox(&mailbox).await?;
        cursor.pending = cursor.session.search(&cursor.query).await?;
        debug!("{} matches in {}", cursor.pending.len(), mailbox);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mailsift_imap::{ImapError, ImapResult, SessionError};
    use std::collections::HashMap;

    fn raw_message(subject: &str) -> Vec<u8> {
        format!(
            "From: Alerts <alerts@example.com>\r\n\
             Subject: {}\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             \r\n\
             body of {}\r\n",
            subject, subject
        )
        .into_bytes()
    }

    #[derive(Default)]
    struct FakeBackend {
        mailboxes: HashMap<String, Vec<(u32, Vec<u8>)>>,
        selected: Option<String>,
        fetched: Vec<(String, u32)>,
        broken_uid: Option<u32>,
    }

    impl FakeBackend {
        fn with_mailbox(mut self, name: &str, subjects: &[(u32, &str)]) -> Self {
            let messages = subjects
                .iter()
                .map(|(uid, subject)| (*uid, raw_message(subject)))
                .collect();
            self.mailboxes.insert(name.to_string(), messages);
            self
        }
    }

    #[async_trait]
    impl MailBackend for FakeBackend {
        async fn select(&mut self, mailbox: &str) -> ImapResult<u32> {
            let messages = self
                .mailboxes
                .get(mailbox)
                .ok_or_else(|| ImapError::FolderNotFound(mailbox.to_string()))?;
            self.selected = Some(mailbox.to_string());
            Ok(messages.len() as u32)
        }

        async fn uid_search(&mut self, _criteria: &str) -> ImapResult<Vec<u32>> {
            let mailbox = self.selected.as_ref().ok_or(ImapError::NotConnected)?;
            let mut uids: Vec<u32> = self.mailboxes[mailbox].iter().map(|(uid, _)| *uid).collect();
            uids.sort_unstable();
            Ok(uids)
        }

        async fn fetch_message(&mut self, uid: u32) -> ImapResult<Vec<u8>> {
            if self.broken_uid == Some(uid) {
                return Err(ImapError::ServerError("BAD fetch".into()));
            }
            let mailbox = self.selected.clone().ok_or(ImapError::NotConnected)?;
            self.fetched.push((mailbox.clone(), uid));
            self.mailboxes[&mailbox]
                .iter()
                .find(|(u, _)| *u == uid)
                .map(|(_, raw)| raw.clone())
                .ok_or(ImapError::MessageNotFound(uid))
        }

        async fn logout(&mut self) -> ImapResult<()> {
            Ok(())
        }
    }

    fn coordinator(backend: FakeBackend) -> SearchCoordinator<FakeBackend> {
        SearchCoordinator::new(
            AuthenticatedSession::new(backend),
            vec!["Junk".to_string(), "Inbox".to_string()],
        )
    }

    fn subjects(records: &[MessageRecord]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.subject.as_deref().unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn test_junk_before_inbox_newest_first() {
        let mut coordinator = coordinator(
            FakeBackend::default()
                .with_mailbox("Inbox", &[(1, "one"), (2, "two"), (3, "three")])
                .with_mailbox("Junk", &[(10, "spam-old"), (11, "spam-new")]),
        );

        let records: Vec<_> = coordinator.fetch_all().try_collect().await.unwrap();

        assert_eq!(
            subjects(&records),
            vec!["spam-new", "spam-old", "three", "two", "one"]
        );
        assert_eq!(records[2].body.trim_end(), "body of three");
        assert_eq!(
            records[0].from.as_deref(),
            Some("Alerts <alerts@example.com>")
        );
    }

    #[tokio::test]
    async fn test_one_fetch_per_id() {
        let mut coordinator = coordinator(
            FakeBackend::default()
                .with_mailbox("Inbox", &[(4, "a"), (9, "b")])
                .with_mailbox("Junk", &[]),
        );

        let records: Vec<_> = coordinator
            .fetch_from_sender("alerts@example.com")
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            coordinator.session().backend().fetched,
            vec![("Inbox".to_string(), 9), ("Inbox".to_string(), 4)]
        );
    }

    #[tokio::test]
    async fn test_empty_search_yields_nothing() {
        let mut coordinator = coordinator(
            FakeBackend::default()
                .with_mailbox("Inbox", &[])
                .with_mailbox("Junk", &[]),
        );

        let records: Vec<_> = coordinator.fetch_all().try_collect().await.unwrap();
        assert!(records.is_empty());
        assert_eq!(coordinator.fetch_by_subject("code").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_early_drop_leaves_session_usable() {
        let mut coordinator = coordinator(
            FakeBackend::default()
                .with_mailbox("Inbox", &[(1, "one"), (2, "two")])
                .with_mailbox("Junk", &[(5, "spam")]),
        );

        let first = coordinator.fetch_by_subject("anything").await.unwrap();
        assert_eq!(first.unwrap().subject.as_deref(), Some("spam"));

        let first_body = coordinator.fetch_by_body("anything").await.unwrap();
        assert_eq!(first_body.unwrap().subject.as_deref(), Some("spam"));

        let all: Vec<_> = coordinator.fetch_all().try_collect().await.unwrap();
        assert_eq!(subjects(&all), vec!["spam", "two", "one"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_ends_stream() {
        let mut backend = FakeBackend::default()
            .with_mailbox("Inbox", &[(1, "one"), (2, "two"), (3, "three")])
            .with_mailbox("Junk", &[]);
        backend.broken_uid = Some(2);
        let mut coordinator = coordinator(backend);

        let mut stream = coordinator.fetch_all();
        assert_eq!(
            stream.try_next().await.unwrap().unwrap().subject.as_deref(),
            Some("three")
        );
        assert!(matches!(
            stream.next().await,
            Some(Err(CoreError::Session(SessionError::FetchFailed { uid: 2, .. })))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_mailbox_is_an_error() {
        let mut coordinator = coordinator(
            FakeBackend::default().with_mailbox("Inbox", &[(1, "one")]),
        );

        let result: CoreResult<Vec<_>> = coordinator.fetch_all().try_collect().await;
        assert!(matches!(
            result,
            Err(CoreError::Session(SessionError::MailboxSelectFailed { ref mailbox, .. }))
                if mailbox == "Junk"
        ));
    }

    #[tokio::test]
    async fn test_invalid_date_is_rejected_before_searching() {
        let mut coordinator = coordinator(FakeBackend::default());

        assert!(matches!(
            coordinator.fetch_since_date("03/05/2024"),
            Err(CoreError::InvalidQuery(_))
        ));
        assert_eq!(coordinator.session().selected_mailbox(), None);
    }

    #[tokio::test]
    async fn test_search_text_with_line_breaks_is_rejected() {
        let mut coordinator = coordinator(
            FakeBackend::default()
                .with_mailbox("Inbox", &[(1, "one")])
                .with_mailbox("Junk", &[]),
        );

        assert!(matches!(
            coordinator.fetch_from_sender("x\r\nA001 DELETE INBOX"),
            Err(CoreError::InvalidQuery(_))
        ));
        assert!(matches!(
            coordinator.fetch_by_subject("a\nA002 LOGOUT").await,
            Err(CoreError::InvalidQuery(_))
        ));
        assert!(matches!(
            coordinator.fetch_by_body("a\rb").await,
            Err(CoreError::InvalidQuery(_))
        ));
        assert_eq!(coordinator.session().selected_mailbox(), None);
        assert!(coordinator.session().backend().fetched.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_message_is_reported() {
        let mut backend = FakeBackend::default().with_mailbox("Junk", &[]);
        backend.mailboxes.insert(
            "Inbox".to_string(),
            vec![(
                1,
                b"Subject: x\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n\xff\xfe\r\n"
                    .to_vec(),
            )],
        );
        let mut coordinator = coordinator(backend);

        let result: CoreResult<Vec<_>> = coordinator.fetch_all().try_collect().await;
        assert!(matches!(result, Err(CoreError::DecodeFailed(_))));
    }
}
